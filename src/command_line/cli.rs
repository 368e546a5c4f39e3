#![allow(clippy::cast_precision_loss)]

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use sudoku_cnf::sat::cnf::EngineState;
use sudoku_cnf::sat::configs::{CnfConfig, QueueOrder, RevokeStrategy};
use sudoku_cnf::sat::literal::{Literal, MAX_COORDINATE};
use sudoku_cnf::sat::propagation::{PropagationQueue, PropagationStack, PropagationStructure};
use sudoku_cnf::sudoku::parse::infer_block_size;
use sudoku_cnf::sudoku::session::Session;
use tikv_jemalloc_ctl::{epoch, stats};

/// Defines the command-line interface of the propagation engine.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(
    name = "sudoku-cnf",
    version,
    about = "Incremental unit propagation over Sudoku puzzles encoded as CNF"
)]
pub(crate) struct Cli {
    /// An optional global path argument. If provided without a subcommand,
    /// it's treated as a puzzle file (or a directory of `.sudoku` files) to propagate.
    #[arg(global = true)]
    pub path: Option<PathBuf>,

    /// Specifies the subcommand to execute (e.g. `propagate`, `clauses`).
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Common options applicable to all commands.
    #[command(flatten)]
    pub common: CommonOptions,
}

/// Enumerates the available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Build the CNF of a puzzle, apply decisions and propagate to a fixed point.
    Propagate {
        /// Path to a puzzle file, or a directory searched for `.sudoku` files.
        #[arg(long)]
        path: PathBuf,

        /// A decision `row,col,value` (1-based), negated with a leading `!`.
        /// Each one is propagated and followed by a full propagation.
        #[arg(long = "decide", value_parser = parse_decision)]
        decisions: Vec<Literal>,

        /// A unit to revoke after all decisions, in the same format as `--decide`.
        #[arg(long = "undo", value_parser = parse_decision)]
        undo: Vec<Literal>,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Print every clause of a puzzle after the forced units have been propagated.
    Clauses {
        /// Path to the puzzle file.
        #[arg(long)]
        path: PathBuf,

        /// Skip satisfied clauses.
        #[arg(long, default_value_t = false)]
        open_only: bool,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Defines common command-line options shared across different subcommands.
#[derive(Args, Debug, Default, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CommonOptions {
    /// Enable debug logging. `RUST_LOG` takes precedence.
    #[arg(short, long, default_value_t = false)]
    pub(crate) debug: bool,

    /// Check the board's exclusivity invariant and that board and engine agree.
    #[arg(short, long, default_value_t = false)]
    pub(crate) verify: bool,

    /// Enable printing of problem and propagation statistics.
    #[arg(short, long, default_value_t = false)]
    pub(crate) stats: bool,

    /// Print the board after loading and after propagation.
    #[arg(short, long, default_value_t = false)]
    pub(crate) print_board: bool,

    /// Block size of the puzzle. Inferred from the number of rows when omitted.
    #[arg(short, long)]
    pub(crate) block_size: Option<usize>,

    /// Order in which queued units are propagated.
    #[arg(long, default_value_t = QueueOrder::Lifo)]
    pub(crate) queue: QueueOrder,

    /// Clauses visited when a unit is revoked.
    #[arg(long, default_value_t = RevokeStrategy::Watched)]
    pub(crate) revoke: RevokeStrategy,
}

impl CommonOptions {
    const fn config(&self) -> CnfConfig {
        CnfConfig {
            revoke: self.revoke,
        }
    }
}

/// Installs the `env_logger` backend. `--debug` lowers the default filter to `debug`.
pub(crate) fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    // a second call (tests, repeated subcommands) keeps the first logger
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

/// Parses a decision `row,col,value`, 1-based, with an optional leading `!` for the negative
/// literal.
///
/// # Errors
///
/// If the text is not three positive integers separated by commas.
pub(crate) fn parse_decision(text: &str) -> Result<Literal, String> {
    let (polarity, body) = text
        .strip_prefix('!')
        .map_or((true, text), |rest| (false, rest));

    let parts = body
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid decision {text:?}: {e}"))?;

    let &[row, col, value] = parts.as_slice() else {
        return Err(format!("invalid decision {text:?}: expected row,col,value"));
    };

    if [row, col, value]
        .iter()
        .any(|&n| n == 0 || n > MAX_COORDINATE + 1)
    {
        return Err(format!(
            "invalid decision {text:?}: components must be in 1..={}",
            MAX_COORDINATE + 1
        ));
    }

    Ok(Literal::new(row - 1, col - 1, value - 1, polarity))
}

/// Propagates a puzzle file, or every `.sudoku` file under a directory.
///
/// # Errors
///
/// If a file cannot be read or parsed, or a decision is outside the board.
pub(crate) fn propagate_path(
    path: &Path,
    decisions: &[Literal],
    undo: &[Literal],
    common: &CommonOptions,
) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("Path does not exist: {}", path.display()));
    }

    if path.is_file() {
        return propagate_file(path, decisions, undo, common);
    }

    for entry in walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }

        if file_path.extension().is_none_or(|ext| ext != "sudoku") {
            log::debug!("Skipping non-puzzle file: {}", file_path.display());
            continue;
        }

        propagate_file(file_path, decisions, undo, common)?;
    }

    Ok(())
}

/// Propagates a single puzzle file with the queue order picked in `common`.
///
/// # Errors
///
/// See [`propagate_path`].
pub(crate) fn propagate_file(
    path: &Path,
    decisions: &[Literal],
    undo: &[Literal],
    common: &CommonOptions,
) -> Result<(), String> {
    match common.queue {
        QueueOrder::Lifo => run::<PropagationStack>(path, decisions, undo, common),
        QueueOrder::Fifo => run::<PropagationQueue>(path, decisions, undo, common),
    }
}

fn load<P: PropagationStructure>(path: &Path, common: &CommonOptions) -> Result<Session<P>, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Unable to read {}: {e}", path.display()))?;

    let size = match common.block_size {
        Some(size) => size,
        None => infer_block_size(&text)
            .map_err(|e| format!("Error parsing puzzle {}: {e}", path.display()))?,
    };

    Session::parse(size, &text, common.config(), &mut ())
        .map_err(|e| format!("Error parsing puzzle {}: {e}", path.display()))
}

fn check_on_board<P: PropagationStructure>(session: &Session<P>, literal: Literal) -> Result<(), String> {
    let full_size = session.board().full_size();
    if [literal.row(), literal.col(), literal.value()]
        .iter()
        .any(|&n| n >= full_size)
    {
        return Err(format!("Decision {literal} is outside the {full_size}x{full_size} board"));
    }
    Ok(())
}

fn run<P: PropagationStructure>(
    path: &Path,
    decisions: &[Literal],
    undo: &[Literal],
    common: &CommonOptions,
) -> Result<(), String> {
    println!("Propagating: {}", path.display());

    let time = std::time::Instant::now();
    let mut session = load::<P>(path, common)?;
    let build_time = time.elapsed();

    if common.print_board {
        println!("Initial board:\n{}", session.board());
    }
    println!("After forced units: {}", session.state());

    let time = std::time::Instant::now();

    for &literal in decisions {
        check_on_board(&session, literal)?;

        match session.user_propagation(literal, &mut ()) {
            Ok(status) => {
                println!("Decide {literal}: {status:?}");
                if status.is_applied() {
                    match session.propagate_all(&mut ()) {
                        Ok(true) => {}
                        Ok(false) => println!("Propagation ran into UNSAT"),
                        Err(e) => println!("Propagation rejected: {e}"),
                    }
                }
            }
            Err(e) => println!("Decide {literal}: rejected, {e}"),
        }
    }

    for &literal in undo {
        check_on_board(&session, literal)?;

        match session.revoke(literal, &mut ()) {
            Ok(()) => println!("Revoke {literal}: {}", session.state()),
            Err(e) => println!("Revoke {literal}: rejected, {e}"),
        }
    }

    let elapsed = time.elapsed();

    if common.verify {
        verify_session(&session)?;
    }

    if common.print_board {
        println!("Board:\n{}", session.board());
    }

    if common.stats {
        print_stats(build_time, elapsed, &session, memory_usage());
    }

    match session.state() {
        EngineState::Sat => println!("\nSATISFIABLE"),
        EngineState::Unsat => println!("\nUNSATISFIABLE"),
        EngineState::Pending => println!(
            "\nPENDING ({} of {} cells fixed)",
            session.board().fixed_count(),
            session.board().full_size().pow(2)
        ),
    }

    Ok(())
}

/// Prints the clauses of a puzzle after its forced units have been propagated.
///
/// # Errors
///
/// If the file cannot be read or parsed.
pub(crate) fn print_clauses(path: &Path, open_only: bool, common: &CommonOptions) -> Result<(), String> {
    let session = load::<PropagationStack>(path, common)?;
    let cnf = session.cnf();

    for (idx, clause) in cnf.clauses().iter().enumerate() {
        if open_only && clause.is_satisfied() {
            continue;
        }
        println!("{idx}: {clause}");
    }

    println!(
        "{} clauses, {} satisfied, {} unsatisfied, {} queued units: {}",
        cnf.clauses().len(),
        cnf.sat_count(),
        cnf.unsat_count(),
        cnf.queued_units().len(),
        session.state()
    );

    Ok(())
}

/// Checks the board's invariant and that every fixed cell is true in the engine.
///
/// # Errors
///
/// If either check fails.
pub(crate) fn verify_session<P: PropagationStructure>(session: &Session<P>) -> Result<(), String> {
    let mismatched = session
        .verify()
        .map_err(|e| format!("Board failed verification: {e}"))?;

    if !mismatched.is_empty() {
        let cells = mismatched
            .iter()
            .map(|(row, col)| format!("({}, {})", row + 1, col + 1))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(format!("Board and engine disagree on {cells}"));
    }

    println!("Verified: true");
    Ok(())
}

const MIB: f64 = 1024.0 * 1024.0;

/// Allocated and resident memory in MiB, as reported by jemalloc.
pub(crate) fn memory_usage() -> Option<(f64, f64)> {
    epoch::advance().ok()?;
    let allocated = stats::allocated::mib().ok()?.read().ok()?;
    let resident = stats::resident::mib().ok()?.read().ok()?;
    Some((allocated as f64 / MIB, resident as f64 / MIB))
}

/// Helper function to print a single statistic line in a formatted table row.
pub(crate) fn stat_line(label: &str, value: impl std::fmt::Display) {
    println!("|  {label:<28} {value:>18}  |");
}

/// Helper function to print a statistic line that includes a rate (value/second).
pub(crate) fn stat_line_with_rate(label: &str, value: usize, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        value as f64 / elapsed
    } else {
        0.0
    };
    println!("|  {label:<20} {value:>12} ({rate:>9.0}/sec)  |");
}

/// Prints a summary of problem and propagation statistics.
///
/// # Arguments
/// * `build_time` - Duration spent parsing, encoding and propagating the forced units.
/// * `elapsed` - Duration spent applying decisions.
/// * `session` - The session after all decisions.
/// * `memory` - Allocated and resident memory in MiB, if jemalloc reported them.
pub(crate) fn print_stats<P: PropagationStructure>(
    build_time: Duration,
    elapsed: Duration,
    session: &Session<P>,
    memory: Option<(f64, f64)>,
) {
    let cnf = session.cnf();
    let s = cnf.stats();
    let board = session.board();
    let total = build_time.as_secs_f64() + elapsed.as_secs_f64();

    println!("\n=======================[ Problem Statistics ]=========================");
    stat_line("Build time (s)", format!("{:.3}", build_time.as_secs_f64()));
    stat_line("Block size", board.size());
    stat_line("Cells (fixed / total)", format!("{} / {}", board.fixed_count(), board.full_size().pow(2)));
    stat_line("Clauses", cnf.clauses().len());
    stat_line("Watched atoms", cnf.watches().len());

    println!("=====================[ Propagation Statistics ]======================");
    stat_line("Satisfied clauses", cnf.sat_count());
    stat_line("Unsatisfied clauses", cnf.unsat_count());
    stat_line("Assigned atoms", cnf.assignment().len());
    stat_line_with_rate("Propagations", s.propagations, total);
    stat_line_with_rate("Revocations", s.revocations, total);
    stat_line("Contradictions", s.contradictions);
    stat_line("Dropped units", s.dropped_units);
    if let Some((allocated, resident)) = memory {
        stat_line("Memory usage (MiB)", format!("{allocated:.2}"));
        stat_line("Resident memory (MiB)", format!("{resident:.2}"));
    }
    stat_line("CPU time (s)", format!("{:.3}", elapsed.as_secs_f64()));
    println!("=====================================================================");
}
