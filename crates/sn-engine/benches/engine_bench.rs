//! Segment rendering benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sn_engine::{frequency_of, MemorySink, Segment, SynthConfig};
use sn_ir::{evaluate_at_t, Expr};

/// `sin(3t) + 1`
fn wobble() -> Expr {
    Expr::add(
        Expr::sine(Expr::multiply(Expr::number(3.0), Expr::variable("t"))),
        Expr::number(1.0),
    )
}

fn bench_evaluate(c: &mut Criterion) {
    let expr = wobble();
    c.bench_function("evaluate_at_t", |b| {
        b.iter(|| black_box(evaluate_at_t(black_box(&expr), black_box(1.25))))
    });
    c.bench_function("frequency_of", |b| b.iter(|| black_box(frequency_of(black_box(7.3)))));
}

fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_buffer");

    for (name, frames) in [("512", 512usize), ("4096", 4096)] {
        let config = SynthConfig { fade_seconds: 0.0, ..SynthConfig::default() };
        let mut segment = Segment::with_config("sin(3t) + 1", wobble(), 0, 3600, config).unwrap();
        let mut sink = MemorySink::new(44100, frames);
        segment.start(&mut sink).unwrap();

        group.bench_function(name, |b| {
            b.iter(|| {
                sink.consume(frames);
                sink.take_frames();
                black_box(segment.fill_buffer(&mut sink))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_fill);
criterion_main!(benches);
