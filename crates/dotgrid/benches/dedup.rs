//! Deduplication scaling: candidate counts grow with image area, and a naive
//! O(n^2) pass dominates the pipeline above ~10k candidates.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dotgrid::{dedup_circles, DetectedCircle, Rgb};

/// Deterministic pseudo-random candidates spread over a large canvas.
fn candidates(n: usize) -> Vec<DetectedCircle> {
    let mut state = 0x2545f491_4f6cdd1du64;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let x = ((state >> 33) % 20_000) as i32;
            let y = ((state >> 13) % 20_000) as i32;
            DetectedCircle {
                x,
                y,
                radius: 20 + ((state >> 3) % 30) as u32,
                color: Rgb::BLACK,
                confidence: 100.0,
            }
        })
        .collect()
}

fn bench_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_circles");
    for &n in &[1_000usize, 10_000, 100_000] {
        let input = candidates(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &input, |b, input| {
            b.iter(|| dedup_circles(input.clone(), 20.0));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dedup);
criterion_main!(benches);
