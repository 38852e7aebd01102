//! Performance benchmarks for the coordination engine's cryptographic core.
//!
//! Measures the operations on the hot path of a live computation: field
//! arithmetic, Shamir sharing/reconstruction, Poseidon hashing and
//! commitments, across threshold/party configurations representative of
//! real deployments.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use smpc_core::commitment::Commitment;
use smpc_core::field::{FieldElement, FIELD_PRIME};
use smpc_core::hash::poseidon;
use smpc_core::secret_sharing::ShamirSecretSharing;

fn bench_secret_sharing(c: &mut Criterion) {
    let mut group = c.benchmark_group("secret_sharing");

    let configs = vec![(2, 3), (3, 5), (5, 10), (10, 20)];

    for (threshold, parties) in configs {
        group.bench_with_input(
            BenchmarkId::new("share", format!("t{threshold}_n{parties}")),
            &(threshold, parties),
            |b, &(t, n)| {
                let secret = FieldElement::new(12345);
                b.iter(|| {
                    let shares = ShamirSecretSharing::share(black_box(secret), black_box(n), black_box(t));
                    black_box(shares)
                });
            },
        );

        let secret = FieldElement::new(12345);
        let shares = ShamirSecretSharing::share(secret, parties, threshold).unwrap();
        group.bench_with_input(
            BenchmarkId::new("reconstruct", format!("t{threshold}_n{parties}")),
            &threshold,
            |b, &t| {
                b.iter(|| {
                    let result = ShamirSecretSharing::reconstruct(black_box(&shares[0..t]));
                    black_box(result)
                });
            },
        );

        let other = ShamirSecretSharing::share(FieldElement::new(67890), parties, threshold).unwrap();
        group.bench_with_input(
            BenchmarkId::new("add_shares", format!("t{threshold}_n{parties}")),
            &(threshold, parties),
            |b, &(_t, _n)| {
                b.iter(|| {
                    let sum = ShamirSecretSharing::add(black_box(&shares), black_box(&other));
                    black_box(sum)
                });
            },
        );
    }

    group.finish();
}

fn bench_field_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("field");
    let a = FieldElement::new(1_234_567_890);
    let b = FieldElement::new(9_876_543_210 % FIELD_PRIME);

    group.bench_function("add", |bench| {
        bench.iter(|| black_box(black_box(a) + black_box(b)));
    });
    group.bench_function("mul", |bench| {
        bench.iter(|| black_box(black_box(a) * black_box(b)));
    });
    group.bench_function("inv", |bench| {
        bench.iter(|| black_box(black_box(a).inv()));
    });
    group.finish();
}

fn bench_hashing(c: &mut Criterion) {
    let mut group = c.benchmark_group("poseidon");
    let a = FieldElement::new(1);
    let b = FieldElement::new(2);

    group.bench_function("hash2", |bench| {
        bench.iter(|| black_box(poseidon::hash2(black_box(a), black_box(b))));
    });

    let inputs: Vec<FieldElement> = (0..16).map(FieldElement::new).collect();
    group.bench_function("hash_variable_16", |bench| {
        bench.iter(|| black_box(poseidon::hash_variable(black_box(&inputs))));
    });
    group.finish();
}

fn bench_commitments(c: &mut Criterion) {
    let value = FieldElement::new(12345);
    c.bench_function("commitment_commit", |b| {
        b.iter(|| black_box(Commitment::commit(black_box(value))));
    });

    let commitment = Commitment::commit(value);
    c.bench_function("commitment_verify", |b| {
        b.iter(|| black_box(commitment.verify(black_box(value))));
    });
}

criterion_group!(
    benches,
    bench_secret_sharing,
    bench_field_arithmetic,
    bench_hashing,
    bench_commitments
);
criterion_main!(benches);
