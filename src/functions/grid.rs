use crate::SurfaceError;

/// A row-major 2D array of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
  rows: usize,
  cols: usize,
  values: Vec<f64>,
}

impl Field {
  pub fn new(
    shape: (usize, usize),
    values: Vec<f64>,
  ) -> Result<Self, SurfaceError> {
    let (rows, cols) = shape;
    if values.len() != rows * cols {
      return Err(SurfaceError::ShapeMismatch {
        expected: shape,
        found: (values.len(), 1),
      });
    }
    Ok(Field { rows, cols, values })
  }

  pub fn filled(shape: (usize, usize), value: f64) -> Self {
    Field {
      rows: shape.0,
      cols: shape.1,
      values: vec![value; shape.0 * shape.1],
    }
  }

  pub fn zeros(shape: (usize, usize)) -> Self {
    Self::filled(shape, 0.0)
  }

  /// Build from a function of `(row, col)`.
  pub fn from_fn(
    shape: (usize, usize),
    mut f: impl FnMut(usize, usize) -> f64,
  ) -> Self {
    let mut values = Vec::with_capacity(shape.0 * shape.1);
    for row in 0..shape.0 {
      for col in 0..shape.1 {
        values.push(f(row, col));
      }
    }
    Field {
      rows: shape.0,
      cols: shape.1,
      values,
    }
  }

  pub fn shape(&self) -> (usize, usize) {
    (self.rows, self.cols)
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn values(&self) -> &[f64] {
    &self.values
  }

  pub fn values_mut(&mut self) -> &mut [f64] {
    &mut self.values
  }

  pub fn get(&self, row: usize, col: usize) -> Option<f64> {
    if row < self.rows && col < self.cols {
      Some(self.values[row * self.cols + col])
    } else {
      None
    }
  }

  /// `(row, col)` of a flat index.
  pub fn position(&self, index: usize) -> (usize, usize) {
    (index / self.cols, index % self.cols)
  }

  pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
    self.values.chunks(self.cols.max(1))
  }

  pub fn has_non_finite(&self) -> bool {
    self.values.iter().any(|v| !v.is_finite())
  }

  pub fn count_non_finite(&self) -> usize {
    self.values.iter().filter(|v| !v.is_finite()).count()
  }

  /// Smallest and largest finite values, if there are any.
  pub fn finite_range(&self) -> Option<(f64, f64)> {
    let mut range: Option<(f64, f64)> = None;
    for &v in self.values.iter().filter(|v| v.is_finite()) {
      range = Some(match range {
        Some((lo, hi)) => (lo.min(v), hi.max(v)),
        None => (v, v),
      });
    }
    range
  }

  /// Equality that treats NaN payloads as equal to themselves.
  pub fn bitwise_eq(&self, other: &Field) -> bool {
    self.shape() == other.shape()
      && self
        .values
        .iter()
        .zip(&other.values)
        .all(|(a, b)| a.to_bits() == b.to_bits())
  }
}

/// Coordinate mesh over `[-x_bound, x_bound] x [-y_bound, y_bound]`.
///
/// `x[i][j] = x_i` and `y[i][j] = y_j`, so x varies along rows and y along
/// columns. Both arrays have shape `(2 * resolution + 1, 2 * resolution + 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
  x_bound: f64,
  y_bound: f64,
  resolution: usize,
  x: Field,
  y: Field,
}

impl SampleGrid {
  pub fn x(&self) -> &Field {
    &self.x
  }

  pub fn y(&self) -> &Field {
    &self.y
  }

  pub fn shape(&self) -> (usize, usize) {
    self.x.shape()
  }

  pub fn resolution(&self) -> usize {
    self.resolution
  }

  /// Distinct x coordinates, one per row.
  pub fn x_axis(&self) -> Vec<f64> {
    self.x.rows().map(|row| row[0]).collect()
  }

  /// Distinct y coordinates, one per column.
  pub fn y_axis(&self) -> Vec<f64> {
    self.y.rows().next().map(<[f64]>::to_vec).unwrap_or_default()
  }

  /// Whether this grid was built from exactly these parameters.
  pub fn matches(&self, x_bound: f64, y_bound: f64, resolution: usize) -> bool {
    self.x_bound.to_bits() == x_bound.to_bits()
      && self.y_bound.to_bits() == y_bound.to_bits()
      && self.resolution == resolution
  }
}

/// Number of samples along each axis for a resolution.
pub fn points_per_axis(resolution: usize) -> usize {
  2 * resolution + 1
}

/// `2 * resolution + 1` evenly spaced values over `[-bound, bound]`.
///
/// The endpoints are exactly `±bound` and the middle value is exactly zero,
/// so the origin is always sampled.
pub fn symmetric_axis(bound: f64, resolution: usize) -> Vec<f64> {
  if resolution == 0 {
    return vec![0.0];
  }
  let n = points_per_axis(resolution);
  let step = bound / resolution as f64;
  (0..n)
    .map(|i| {
      if i == 0 {
        -bound
      } else if i == n - 1 {
        bound
      } else {
        (i as f64 - resolution as f64) * step
      }
    })
    .collect()
}

/// Build the sample mesh. Pure: identical inputs give bit-identical grids.
pub fn build_grid(x_bound: f64, y_bound: f64, resolution: usize) -> SampleGrid {
  let xs = symmetric_axis(x_bound, resolution);
  let ys = symmetric_axis(y_bound, resolution);
  let shape = (xs.len(), ys.len());

  SampleGrid {
    x_bound,
    y_bound,
    resolution,
    x: Field::from_fn(shape, |i, _| xs[i]),
    y: Field::from_fn(shape, |_, j| ys[j]),
  }
}
