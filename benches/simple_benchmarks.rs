//! Simple, single-function benchmarks for the core primitives.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use smpc_core::commitment::Commitment;
use smpc_core::field::FieldElement;
use smpc_core::secret_sharing::ShamirSecretSharing;

fn bench_basic_secret_sharing(c: &mut Criterion) {
    let secret = FieldElement::new(12345);
    let threshold = 3;
    let parties = 5;

    c.bench_function("secret_sharing_share", |b| {
        b.iter(|| {
            let shares = ShamirSecretSharing::share(black_box(secret), black_box(parties), black_box(threshold));
            black_box(shares)
        });
    });

    let shares = ShamirSecretSharing::share(secret, parties, threshold).unwrap();
    c.bench_function("secret_sharing_reconstruct", |b| {
        b.iter(|| {
            let result = ShamirSecretSharing::reconstruct(black_box(&shares[0..threshold]));
            black_box(result)
        });
    });
}

fn bench_field_arithmetic(c: &mut Criterion) {
    let a = FieldElement::new(1_234_567_890);
    let b = FieldElement::new(987_654_321);

    c.bench_function("field_add", |bench| {
        bench.iter(|| black_box(black_box(a) + black_box(b)));
    });

    c.bench_function("field_mul", |bench| {
        bench.iter(|| black_box(black_box(a) * black_box(b)));
    });
}

fn bench_basic_commitments(c: &mut Criterion) {
    let value = FieldElement::new(12345);

    c.bench_function("commit", |bench| {
        bench.iter(|| black_box(Commitment::commit(black_box(value))));
    });

    let commitment = Commitment::commit(value);
    c.bench_function("verify", |bench| {
        bench.iter(|| black_box(commitment.verify(black_box(value))));
    });
}

/// Shares three values at three nodes, sums the same-index shares, and
/// reconstructs, mirroring the additive step a node performs while
/// summing peer contributions before the final reconstruction.
fn bench_simple_sum_workflow(c: &mut Criterion) {
    c.bench_function("sum_three_shamir_secrets", |b| {
        let values = [FieldElement::new(100), FieldElement::new(200), FieldElement::new(300)];
        let threshold = 2;
        let parties = 3;

        b.iter(|| {
            let mut all_shares: Vec<_> = values
                .iter()
                .map(|&v| ShamirSecretSharing::share(v, parties, threshold).unwrap())
                .collect();

            let mut sum_shares = all_shares.remove(0);
            for shares in &all_shares {
                sum_shares = ShamirSecretSharing::add(&sum_shares, shares).unwrap();
            }

            let result = ShamirSecretSharing::reconstruct(&sum_shares[0..threshold]);
            black_box(result)
        });
    });
}

criterion_group!(
    benches,
    bench_basic_secret_sharing,
    bench_field_arithmetic,
    bench_basic_commitments,
    bench_simple_sum_workflow
);

criterion_main!(benches);
