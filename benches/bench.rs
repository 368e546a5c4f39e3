use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use sudoku_cnf::sat::cnf::SudokuCnf;
use sudoku_cnf::sat::configs::{CnfConfig, RevokeStrategy};
use sudoku_cnf::sat::literal::Literal;
use sudoku_cnf::sat::propagation::{PropagationQueue, PropagationStack, PropagationStructure};
use sudoku_cnf::sudoku::board::Board;
use sudoku_cnf::sudoku::session::Session;

const NINE: &str = include_str!("../data/nine.sudoku");

fn board() -> Board {
    Board::parse(3, NINE).expect("bundled puzzle parses")
}

fn build<P: PropagationStructure>(config: CnfConfig) -> Session<P> {
    Session::new(board(), config, &mut ())
}

fn round_trip<P: PropagationStructure>(config: CnfConfig) {
    let session = build::<P>(config);
    let mut cnf = session.cnf().clone();
    let free = session
        .board()
        .cells()
        .filter(|(_, _, cell)| !cell.is_fixed())
        .map(|(row, col, cell)| (row, col, cell.candidate_values().next()))
        .collect::<Vec<_>>();

    for (row, col, value) in free {
        if let Some(value) = value {
            let lit = Literal::positive(row, col, value);
            if cnf.value(lit.atom()).is_some() {
                continue;
            }
            cnf.propagate_unit(lit, &mut ());
            cnf.revoke_unit(lit, &mut ());
        }
    }

    black_box(cnf);
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("nine - encode", |b| {
        b.iter(|| black_box(SudokuCnf::<PropagationStack>::encode(&board(), CnfConfig::default())));
    });

    let mut group = c.benchmark_group("nine - build and propagate forced units");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("LIFO", |b| {
        b.iter(|| black_box(build::<PropagationStack>(CnfConfig::default())));
    });

    group.bench_function("FIFO", |b| {
        b.iter(|| black_box(build::<PropagationQueue>(CnfConfig::default())));
    });

    group.finish();
}

fn bench_revoke(c: &mut Criterion) {
    let mut group = c.benchmark_group("nine - propagate and revoke every free cell");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("Watched", |b| {
        b.iter(|| round_trip::<PropagationStack>(CnfConfig::default()));
    });

    group.bench_function("Full scan", |b| {
        b.iter(|| {
            round_trip::<PropagationStack>(CnfConfig::default().with_revoke(RevokeStrategy::FullScan));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_revoke);
criterion_main!(benches);
