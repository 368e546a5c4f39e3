//! # sudoku-cnf
//!
//! `sudoku-cnf` encodes a Sudoku puzzle as CNF and drives the incremental unit propagation
//! engine from the command line.
//!
//! Building a session propagates every unit the puzzle forces. Decisions given on the command
//! line are then propagated one at a time, each followed by a full propagation, and finally
//! any requested units are revoked.
//!
//! ## Usage
//!
//! ```sh
//! sudoku-cnf [COMMON_OPTIONS] [PATH]
//! sudoku-cnf propagate --path <file|dir> [--decide r,c,v]... [--undo r,c,v]... [COMMON_OPTIONS]
//! sudoku-cnf clauses --path <file> [--open-only] [COMMON_OPTIONS]
//! sudoku-cnf completions <shell>
//! ```
//!
//! Decisions are 1-based `row,col,value` triples; a leading `!` selects the negative literal.
//!
//! ### Common Options
//!
//! -   `-d, --debug`: Enable debug logging (`RUST_LOG` overrides the filter).
//! -   `-v, --verify`: Check the board's exclusivity invariant and board/engine agreement.
//! -   `-s, --stats`: Print problem and propagation statistics, including jemalloc memory figures.
//! -   `-p, --print-board`: Print the board before and after the decisions.
//! -   `-b, --block-size <N>`: Block size; inferred from the row count when omitted.
//! -   `--queue <lifo|fifo>`: Order in which queued units are propagated (default: `lifo`).
//! -   `--revoke <watched|full-scan>`: Clauses visited on revocation (default: `watched`).
//!
//! ## Example Invocations
//!
//! ```sh
//! # Propagate the forced units of a puzzle and print the result
//! sudoku-cnf data/four.sudoku --print-board
//!
//! # Fix (1,2) to 3, eliminate 2 from (2,2), then take the first decision back
//! sudoku-cnf propagate --path data/four.sudoku --decide 1,2,3 --decide '!2,2,2' --undo 1,2,3 --stats
//!
//! # Every puzzle under a directory, FIFO queue
//! sudoku-cnf propagate --path data --queue fifo --verify
//! ```

use crate::command_line::cli::{
    Cli, Commands, init_logging, print_clauses, propagate_path,
};
use clap::{CommandFactory, Parser};

mod command_line;

/// Global allocator using `tikv-jemallocator` for memory usage tracking.
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Propagate {
            path,
            decisions,
            undo,
            common,
        }) => {
            init_logging(common.debug);
            propagate_path(&path, &decisions, &undo, &common)
        }

        Some(Commands::Clauses {
            path,
            open_only,
            common,
        }) => {
            init_logging(common.debug);
            print_clauses(&path, open_only, &common)
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }

        None => match cli.path {
            Some(path) => {
                init_logging(cli.common.debug);
                propagate_path(&path, &[], &[], &cli.common)
            }
            None => Err("No command provided. Use --help for more information.".to_string()),
        },
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
