use crate::IntoFloat;
use merkle::Result;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Summary of the samples taken for one dataset size.
#[derive(Debug, Clone)]
pub struct Stat {
  unit: Unit,
  pub count: usize,
  pub mean: f64,
  pub median: f64,
  pub std_dev: f64,
  pub min: f64,
  pub max: f64,
}

impl Stat {
  pub fn from_vec<T: IntoFloat>(unit: Unit, samples: &[T]) -> Stat {
    let mut sorted = samples.iter().map(|y| y.into_f64()).collect::<Vec<_>>();
    sorted.sort_by(f64::total_cmp);
    let count = sorted.len();
    let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
      return Stat { unit, count, mean: f64::NAN, median: f64::NAN, std_dev: f64::NAN, min: f64::NAN, max: f64::NAN };
    };

    let mean = sorted.iter().sum::<f64>() / count as f64;
    let median = match count % 2 {
      0 => (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0,
      _ => sorted[count / 2],
    };
    let std_dev = (sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64).sqrt();
    Stat { unit, count, mean, median, std_dev, min, max }
  }

  /// Half-width of the 2σ band relative to the mean, in percent.
  pub fn spread(&self) -> f64 {
    if self.mean > 0.0 { 200.0 * self.std_dev / self.mean } else { 0.0 }
  }
}

impl Display for Stat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}x {} ±{:.1}% (min {}, median {}, max {})",
      self.count,
      self.unit.format(self.mean),
      self.spread(),
      self.unit.short(self.min),
      self.unit.short(self.median),
      self.unit.short(self.max)
    )
  }
}

#[derive(Debug, Clone, Copy)]
pub enum Unit {
  Bytes,
  Milliseconds,
}

impl Unit {
  /// Symbol, step between prefixes, and the prefixes from the smallest magnitude up.
  fn scale(&self) -> (&'static str, f64, &'static [&'static str]) {
    match self {
      Unit::Bytes => ("B", 1024.0, &["", "k", "M", "G", "T", "P"]),
      Unit::Milliseconds => ("s", 1000.0, &["n", "μ", "m", ""]),
    }
  }

  /// `value` rescaled to the largest prefix that keeps it at or above one.
  fn prefixed(&self, value: f64) -> (f64, &'static str) {
    let (_, step, prefixes) = self.scale();
    let mut value = match self {
      Unit::Bytes => value,
      Unit::Milliseconds => value * 1_000_000.0,
    };
    let mut i = 0;
    while value >= step && i + 1 < prefixes.len() {
      value /= step;
      i += 1;
    }
    (value, prefixes[i])
  }

  pub fn format(&self, value: f64) -> String {
    let (value, prefix) = self.prefixed(value);
    format!("{value:.2}{prefix}{}", self.scale().0)
  }

  pub fn short(&self, value: f64) -> String {
    let (value, prefix) = self.prefixed(value);
    format!("{value:.0}{prefix}")
  }
}

/// Samples grouped by X, e.g. execution times per dataset size.
pub struct Report<X: Display + Copy + std::hash::Hash + Eq + Ord, Y: IntoFloat + Display> {
  unit: Unit,
  data_set: HashMap<X, Vec<Y>>,
}

impl<X: Display + Copy + std::hash::Hash + Eq + Ord, Y: IntoFloat + Display> Report<X, Y> {
  pub fn new(unit: Unit) -> Self {
    Report { unit, data_set: HashMap::new() }
  }

  pub fn add(&mut self, x: X, y: Y) -> Stat {
    self.data_set.entry(x).or_default().push(y);
    self.calculate(x)
  }

  pub fn calculate(&self, x: X) -> Stat {
    let ys = self.data_set.get(&x).map(Vec::as_slice).unwrap_or(&[]);
    Stat::from_vec(self.unit, ys)
  }

  pub fn save_xy_to_csv(&self, path: &Path, x_label: &str, y_labels: &str) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "{x_label},{y_labels}")?;

    let mut xs = self.data_set.keys().copied().collect::<Vec<_>>();
    xs.sort_unstable();
    for x in xs.iter() {
      let ys = self.data_set[x].iter().map(|f| format!("{f}")).collect::<Vec<_>>();
      writeln!(writer, "{},{}", x, ys.join(","))?;
    }

    writer.flush()?;
    Ok(())
  }
}
