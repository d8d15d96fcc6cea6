use chrono::Local;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use merkle::{
  Blake2b256, Blake3, Digest, Error, HashProvider, Keccak256, Proof, Result, Sha256, Tree, generate_proof_with,
  generate_root_with, splitmix64, verify_proof_with,
};
use rand::Rng;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

mod stat;

#[derive(Parser)]
#[command(name = "merkle-bench")]
#[command(author, version, about = "Measure Merkle root, proof and verification cost over a synthetic dataset")]
struct Args {
  /// Number of data items in the dataset
  #[arg(default_value_t = 1024 * 1024)]
  leaves: usize,

  /// Item whose proof is generated and verified, picked at random when omitted
  #[arg(short, long)]
  index: Option<usize>,

  #[arg(long, value_enum, default_value_t = Algorithm::Blake2b)]
  hash: Algorithm,

  #[arg(long)]
  salt: Option<String>,

  /// Use distinct pseudo-random 8-byte items instead of a repeated one
  #[arg(short, long, default_value_t = false)]
  random: bool,

  #[arg(long, value_enum, default_value_t = Operation::All)]
  operation: Operation,

  #[arg(short, long, default_value_t = 5)]
  trials: usize,

  /// Output directory for the CSV reports
  #[arg(short, long, default_value_t = {std::env::current_dir().unwrap_or_default().to_string_lossy().into_owned()})]
  output: String,

  #[arg(short, long, default_value_t = Local::now().format("%Y%m%d%H%M%S").to_string())]
  session: String,

  /// Log filter used when RUST_LOG is not set
  #[arg(long, default_value = "info")]
  log_level: String,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
  Blake2b,
  Blake3,
  Sha256,
  Keccak256,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
  Root,
  Proof,
  Verify,
  Tree,
  All,
}

fn main() -> Result<()> {
  let args = Args::parse();
  env_logger::init_from_env(env_logger::Env::default().default_filter_or(&args.log_level));

  if args.leaves == 0 {
    return Err(Error::EmptyInput);
  }
  let output = PathBuf::from(&args.output);
  create_dir_all(&output)?;

  match args.hash {
    Algorithm::Blake2b => run(&args, &output, Blake2b256),
    Algorithm::Blake3 => run(&args, &output, Blake3),
    Algorithm::Sha256 => run(&args, &output, Sha256),
    Algorithm::Keccak256 => run(&args, &output, Keccak256),
  }
}

fn run<H: HashProvider + Clone>(args: &Args, output: &Path, hasher: H) -> Result<()> {
  let index = match args.index {
    Some(index) => index,
    None => rand::rng().random_range(0..args.leaves),
  };
  let bench = Bench {
    data: dataset(args.leaves, args.random),
    index,
    hasher,
    salt: args.salt.as_ref().map(|s| s.as_bytes().to_vec()),
    trials: args.trials.max(1),
    session: args.session.clone(),
    output: output.to_path_buf(),
  };
  info!("{} items, proof for index {}, {} trials", bench.data.len(), bench.index, bench.trials);

  let all = args.operation == Operation::All;
  if all || args.operation == Operation::Root {
    bench.measure("root", RootDriver::default())?;
  }
  if all || args.operation == Operation::Proof {
    bench.measure("proof", ProofDriver::default())?;
  }
  if all || args.operation == Operation::Verify {
    bench.measure("verify", VerifyDriver::new(&bench)?)?;
  }
  if all || args.operation == Operation::Tree {
    bench.measure("tree", TreeDriver::default())?;
  }
  Ok(())
}

/// `n` copies of the same item, or `n` distinct items derived with splitmix64.
fn dataset(n: usize, random: bool) -> Vec<Vec<u8>> {
  if random {
    (1..=n as u64).map(|i| splitmix64(i).to_le_bytes().to_vec()).collect()
  } else {
    vec![b"foo".to_vec(); n]
  }
}

struct Bench<H: HashProvider> {
  data: Vec<Vec<u8>>,
  index: usize,
  hasher: H,
  salt: Option<Vec<u8>>,
  trials: usize,
  session: String,
  output: PathBuf,
}

impl<H: HashProvider> Bench<H> {
  /// Runs `driver` for each trial, recording the elapsed time and the growth of resident memory
  /// while the driver still holds its result.
  fn measure<D: Driver<H>>(&self, id: &str, mut driver: D) -> Result<()> {
    println!("[{id}]");
    let n = self.data.len() as u64;
    let mut times = stat::Report::new(stat::Unit::Milliseconds);
    let mut memory = stat::Report::new(stat::Unit::Bytes);
    for i in 0..self.trials {
      let before = resident_memory();
      let elapse = driver.run(self)?;
      let after = resident_memory();
      let ms = elapse.as_nanos() as f64 / 1000.0 / 1000.0;
      let t = times.add(n, ms);
      let m = memory.add(n, after.saturating_sub(before));
      eprintln!("  [{}/{}] n={n}: {t}; {m}", i + 1, self.trials);
      driver.cleanup(self)?;
    }

    let path = self.output.join(format!("{}-{id}-time.csv", self.session));
    times.save_xy_to_csv(&path, "N", "TIME")?;
    println!("==> The results have been saved in: {}", path.to_string_lossy());
    let path = self.output.join(format!("{}-{id}-memory.csv", self.session));
    memory.save_xy_to_csv(&path, "N", "MEMORY")?;
    println!("==> The results have been saved in: {}", path.to_string_lossy());
    Ok(())
  }
}

fn resident_memory() -> u64 {
  match memory_stats::memory_stats() {
    Some(usage) => usage.physical_mem as u64,
    None => {
      warn!("resident memory is not available on this platform");
      0
    }
  }
}

trait Driver<H: HashProvider> {
  fn run(&mut self, bench: &Bench<H>) -> Result<Duration>;
  fn cleanup(&mut self, _bench: &Bench<H>) -> Result<()> {
    Ok(())
  }
}

#[derive(Default)]
struct RootDriver {
  root: Option<Digest>,
}

impl<H: HashProvider> Driver<H> for RootDriver {
  #[inline(never)]
  fn run(&mut self, bench: &Bench<H>) -> Result<Duration> {
    let start = Instant::now();
    let root = generate_root_with(&bench.data, &bench.hasher, bench.salt.as_deref())?;
    let elapse = start.elapsed();
    self.root = Some(root);
    Ok(elapse)
  }

  fn cleanup(&mut self, _bench: &Bench<H>) -> Result<()> {
    if let Some(root) = self.root.take() {
      info!("root: {}", hex::encode(root));
    }
    Ok(())
  }
}

#[derive(Default)]
struct ProofDriver {
  proof: Option<Proof>,
}

impl<H: HashProvider> Driver<H> for ProofDriver {
  #[inline(never)]
  fn run(&mut self, bench: &Bench<H>) -> Result<Duration> {
    let start = Instant::now();
    let proof = generate_proof_with(&bench.data, bench.index, &bench.hasher, bench.salt.as_deref())?;
    let elapse = start.elapsed();
    self.proof = Some(proof);
    Ok(elapse)
  }

  fn cleanup(&mut self, _bench: &Bench<H>) -> Result<()> {
    if let Some(proof) = self.proof.take() {
      info!("proof: {} hashes, {} bytes", proof.hashes().len(), proof.size());
    }
    Ok(())
  }
}

/// Verifies a proof prepared once against a root computed once.
struct VerifyDriver {
  root: Digest,
  proof: Proof,
}

impl VerifyDriver {
  fn new<H: HashProvider>(bench: &Bench<H>) -> Result<Self> {
    let root = generate_root_with(&bench.data, &bench.hasher, bench.salt.as_deref())?;
    let proof = generate_proof_with(&bench.data, bench.index, &bench.hasher, bench.salt.as_deref())?;
    Ok(VerifyDriver { root, proof })
  }
}

impl<H: HashProvider> Driver<H> for VerifyDriver {
  #[inline(never)]
  fn run(&mut self, bench: &Bench<H>) -> Result<Duration> {
    let leaf = bench.data.get(bench.index).ok_or(Error::IndexOutOfRange {
      index: bench.index as u64,
      len: bench.data.len() as u64,
    })?;
    let start = Instant::now();
    let verified = verify_proof_with(&self.root, leaf, &self.proof, &bench.hasher, bench.salt.as_deref())?;
    let elapse = start.elapsed();
    if !verified {
      return Err(Error::InvalidProof(format!("proof for index {} does not match the root", bench.index)));
    }
    Ok(elapse)
  }
}

/// Builds the full tree, then generates the proof from it.
struct TreeDriver<H> {
  tree: Option<(Tree<H>, Proof)>,
}

impl<H> Default for TreeDriver<H> {
  fn default() -> Self {
    TreeDriver { tree: None }
  }
}

impl<H: HashProvider + Clone> Driver<H> for TreeDriver<H> {
  #[inline(never)]
  fn run(&mut self, bench: &Bench<H>) -> Result<Duration> {
    let start = Instant::now();
    let tree = Tree::with(bench.data.iter().cloned(), bench.hasher.clone(), bench.salt.as_deref())?;
    let proof = tree.generate_proof_at(bench.index)?;
    let elapse = start.elapsed();
    self.tree = Some((tree, proof));
    Ok(elapse)
  }

  fn cleanup(&mut self, _bench: &Bench<H>) -> Result<()> {
    self.tree = None;
    Ok(())
  }
}

pub trait IntoFloat: Copy {
  fn into_f64(self) -> f64;
}

impl IntoFloat for u64 {
  fn into_f64(self) -> f64 {
    self as f64
  }
}

impl IntoFloat for f64 {
  fn into_f64(self) -> f64 {
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn bench<H: HashProvider>(hasher: H, n: usize, index: usize) -> Bench<H> {
    Bench {
      data: dataset(n, true),
      index,
      hasher,
      salt: Some(b"salt".to_vec()),
      trials: 1,
      session: "test".to_string(),
      output: std::env::temp_dir(),
    }
  }

  #[test]
  fn test_verify_driver() {
    let bench = bench(Keccak256, 37, 21);
    let mut driver = VerifyDriver::new(&bench).unwrap();
    for _ in 0..3 {
      driver.run(&bench).unwrap();
    }
  }

  #[test]
  fn test_verify_driver_out_of_range() {
    let bench = bench(Blake2b256, 8, 8);
    assert!(matches!(VerifyDriver::new(&bench), Err(Error::IndexOutOfRange { index: 8, len: 8 })));
  }

  #[test]
  fn test_drivers_write_reports() {
    let dir = tempfile::tempdir().unwrap();
    let mut bench = bench(Blake3, 10, 3);
    bench.output = dir.path().to_path_buf();
    bench.measure("root", RootDriver::default()).unwrap();
    bench.measure("proof", ProofDriver::default()).unwrap();
    bench.measure("verify", VerifyDriver::new(&bench).unwrap()).unwrap();
    bench.measure("tree", TreeDriver::default()).unwrap();
    for id in ["root", "proof", "verify", "tree"] {
      let csv = std::fs::read_to_string(dir.path().join(format!("test-{id}-time.csv"))).unwrap();
      assert!(csv.starts_with("N,TIME\n10,"), "{id}: {csv}");
      assert!(dir.path().join(format!("test-{id}-memory.csv")).exists(), "{id}");
    }
  }
}
