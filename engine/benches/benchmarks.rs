//! Performance benchmarks for tourney-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use tourney_engine::{
    assemble, check_line, live_feedback, BatchContext, FieldValue, RecordSchema, Reconciler,
    RoundNumber, Snapshot, Topic,
};

fn match_buffer(lines: usize) -> String {
    (0..lines)
        .map(|i| {
            if i % 10 == 3 {
                format!("Team{} Team{} x {}", i, i + 1, i % 5)
            } else {
                format!("Team{} Team{} {} {}", i, i + 1, i % 7, i % 5)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_line_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_checks");
    let teams = RecordSchema::team_registration();
    let matches = RecordSchema::match_result();

    group.bench_function("check_team_line", |b| {
        b.iter(|| check_line(0, black_box("Lions 29/02 1"), teams))
    });

    group.bench_function("check_match_line", |b| {
        b.iter(|| check_line(0, black_box("Lions Tigers 2 3"), matches))
    });

    group.bench_function("live_feedback_partial", |b| {
        b.iter(|| live_feedback(0, black_box("Lions 31/0"), teams))
    });

    group.finish();
}

fn bench_assemble(c: &mut Criterion) {
    let mut group = c.benchmark_group("assemble");
    let context = BatchContext::Round(RoundNumber::new(1).unwrap());

    for lines in [10, 100, 1000] {
        let buffer = match_buffer(lines);
        group.bench_with_input(BenchmarkId::from_parameter(lines), &buffer, |b, buffer| {
            b.iter(|| assemble(black_box(buffer), RecordSchema::match_result(), context))
        });
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");
    let topic = Topic::MatchResults {
        round: RoundNumber::new(1).unwrap(),
    };
    let rows: Vec<_> = (0..500)
        .map(|i| json!({"match_id": i, "team_1_goals": 0, "team_2_goals": 0}))
        .collect();
    let snapshot = Snapshot::from_value(topic, json!({ "match_results": rows })).unwrap();

    group.bench_function("apply_snapshot_with_pending", |b| {
        b.iter_batched(
            || {
                let mut reconciler = Reconciler::with_snapshot(snapshot.clone());
                for row_key in (0..500).step_by(5) {
                    reconciler
                        .apply_local_edit(row_key, "team_1_goals", FieldValue::Integer(1), 0)
                        .unwrap();
                }
                reconciler
            },
            |mut reconciler| reconciler.apply_snapshot(black_box(snapshot.clone())),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

criterion_group!(benches, bench_line_checks, bench_assemble, bench_reconcile);
criterion_main!(benches);
