use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use merkle::{
  Blake2b256, Blake3, HashProvider, Keccak256, Sha256, Tree, generate_proof, generate_root, splitmix64, verify_proof,
};

fn values(n: u64) -> Vec<Vec<u8>> {
  (1..=n).map(|i| splitmix64(i).to_le_bytes().to_vec()).collect()
}

fn bench_build(c: &mut Criterion) {
  let mut group = c.benchmark_group("build");
  for n in [1u64 << 10, 1 << 14, 1 << 16] {
    let data = values(n);
    group.bench_with_input(BenchmarkId::new("sequential", n), &data, |b, data| {
      b.iter(|| Tree::builder().parallel_threshold(usize::MAX).build(data.iter().cloned()).unwrap())
    });
    group.bench_with_input(BenchmarkId::new("parallel", n), &data, |b, data| {
      b.iter(|| Tree::builder().build(data.iter().cloned()).unwrap())
    });
    group.bench_with_input(BenchmarkId::new("stateless-root", n), &data, |b, data| {
      b.iter(|| generate_root(black_box(data)).unwrap())
    });
  }
  group.finish();
}

fn bench_proof(c: &mut Criterion) {
  let data = values(1 << 14);
  let tree = Tree::new(data.clone()).unwrap();
  let k = data.len() / 3;
  c.bench_function("proof/tree-bound", |b| b.iter(|| tree.generate_proof(black_box(&data[k])).unwrap()));
  c.bench_function("proof/stateless", |b| b.iter(|| generate_proof(black_box(&data), k).unwrap()));

  let proof = tree.generate_proof_at(k).unwrap();
  c.bench_function("proof/verify", |b| b.iter(|| verify_proof(tree.root(), black_box(&data[k]), &proof)));
}

fn bench_hash(c: &mut Criterion) {
  let left = [1u8; 32];
  let right = [2u8; 32];
  let mut group = c.benchmark_group("hash-branch");
  group.bench_function("blake2b", |b| b.iter(|| Blake2b256.hash_branch(black_box(&left), black_box(&right))));
  group.bench_function("blake3", |b| b.iter(|| Blake3.hash_branch(black_box(&left), black_box(&right))));
  group.bench_function("sha256", |b| b.iter(|| Sha256.hash_branch(black_box(&left), black_box(&right))));
  group.bench_function("keccak256", |b| b.iter(|| Keccak256.hash_branch(black_box(&left), black_box(&right))));
  group.finish();
}

criterion_group!(benches, bench_build, bench_proof, bench_hash);
criterion_main!(benches);
