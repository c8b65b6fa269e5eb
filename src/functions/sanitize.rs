//! Repair of non-finite samples.
//!
//! Cells holding NaN or ±Inf are replaced by a cubic scattered-data
//! interpolant fitted to the finite cells. Interpolation happens in index
//! space (`row`, `col`), not in world coordinates. Each invalid cell gets a
//! local polyharmonic spline, `s(p) = Σ wᵢ |p - pᵢ|³ + c₀ + c₁·row + c₂·col`,
//! through its nearest finite neighbours, looked up in an R-tree built once
//! per pass. Finite cells are kept as they are, since an interpolant
//! reproduces its control points.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use tracing::{debug, warn};

use crate::functions::grid::Field;
use crate::SurfaceError;

/// Finite neighbours used per repaired cell.
pub const NEIGHBORS: usize = 24;

const PIVOT_EPSILON: f64 = 1e-10;

/// Statistics about one sanitize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
  /// Cells that were NaN or infinite on input.
  pub invalid: usize,
  /// Cells filled by the cubic interpolant.
  pub interpolated: usize,
  /// Cells filled by inverse-distance weighting because the local cubic
  /// system was singular or produced a non-finite value.
  pub fallback: usize,
  /// No finite cell existed, the output is all NaN.
  pub degenerate: bool,
}

impl SanitizeReport {
  pub fn repaired(&self) -> usize {
    self.interpolated + self.fallback
  }

  /// Turn a degenerate pass into [`SurfaceError::InterpolationDegenerate`]
  /// for callers that want to surface it.
  pub fn ensure_defined(&self) -> Result<(), SurfaceError> {
    if self.degenerate {
      Err(SurfaceError::InterpolationDegenerate)
    } else {
      Ok(())
    }
  }
}

/// Replace every non-finite sample. A field without any returns unchanged.
///
/// When there is no finite sample at all, nothing can be interpolated: the
/// result is all NaN and the report is flagged `degenerate`.
pub fn sanitize(field: Field) -> (Field, SanitizeReport) {
  let invalid = field.count_non_finite();
  if invalid == 0 {
    return (field, SanitizeReport::default());
  }

  let shape = field.shape();
  let controls: Vec<Control> = field
    .values()
    .iter()
    .enumerate()
    .filter(|(_, v)| v.is_finite())
    .map(|(index, &value)| {
      let (row, col) = field.position(index);
      Control { row, col, value }
    })
    .collect();

  if controls.is_empty() {
    warn!(
      rows = shape.0,
      cols = shape.1,
      "no finite samples, surface stays undefined"
    );
    let report = SanitizeReport {
      invalid,
      degenerate: true,
      ..SanitizeReport::default()
    };
    return (Field::filled(shape, f64::NAN), report);
  }

  let mut report = SanitizeReport {
    invalid,
    ..SanitizeReport::default()
  };
  let index = ControlIndex::new(controls);
  let mut repaired = field.clone();

  for (cell, slot) in repaired.values_mut().iter_mut().enumerate() {
    if slot.is_finite() {
      continue;
    }
    let (row, col) = field.position(cell);
    let neighbors = index.nearest(row, col);

    match cubic_estimate(row, col, &neighbors) {
      Some(v) => {
        *slot = v;
        report.interpolated += 1;
      }
      None => {
        *slot = inverse_distance(row, col, &neighbors);
        report.fallback += 1;
      }
    }
  }

  debug!(
    invalid = report.invalid,
    interpolated = report.interpolated,
    fallback = report.fallback,
    "sanitized surface"
  );
  (repaired, report)
}

/// [`sanitize`] without the report.
pub fn sanitize_field(field: Field) -> Field {
  sanitize(field).0
}

#[derive(Debug, Clone, Copy)]
struct Control {
  row: usize,
  col: usize,
  value: f64,
}

impl Control {
  fn offset(&self, row: usize, col: usize) -> (f64, f64) {
    (
      self.row as f64 - row as f64,
      self.col as f64 - col as f64,
    )
  }
}

/// Spatial index over the finite cells of a field.
struct ControlIndex {
  tree: RTree<GeomWithData<[f64; 2], Control>>,
}

impl ControlIndex {
  fn new(controls: Vec<Control>) -> Self {
    let points = controls
      .into_iter()
      .map(|control| {
        GeomWithData::new([control.row as f64, control.col as f64], control)
      })
      .collect();
    ControlIndex {
      tree: RTree::bulk_load(points),
    }
  }

  /// Up to [`NEIGHBORS`] finite cells closest to `(row, col)`. Ties break on
  /// `(row, col)` so the result is deterministic.
  fn nearest(&self, row: usize, col: usize) -> Vec<Control> {
    let query = [row as f64, col as f64];
    let mut found: Vec<(f64, Control)> = Vec::with_capacity(NEIGHBORS + 8);

    // Distances come in non-decreasing order; keep everything tied with
    // the last wanted one.
    for entry in self.tree.nearest_neighbor_iter(&query) {
      let (dr, dc) = entry.data.offset(row, col);
      let distance = dr * dr + dc * dc;
      if found.len() >= NEIGHBORS && distance > found[NEIGHBORS - 1].0 {
        break;
      }
      found.push((distance, entry.data));
    }

    found.sort_by(|a, b| {
      a.0
        .total_cmp(&b.0)
        .then(a.1.row.cmp(&b.1.row))
        .then(a.1.col.cmp(&b.1.col))
    });
    found.truncate(NEIGHBORS);
    found.into_iter().map(|(_, control)| control).collect()
  }
}

fn cubic_kernel(dr: f64, dc: f64) -> f64 {
  let r = (dr * dr + dc * dc).sqrt();
  r * r * r
}

/// Fit the local cubic spline through `neighbors` and evaluate it at the
/// target cell. `None` when the system is singular (fewer than three or
/// collinear neighbours) or the value is not finite.
fn cubic_estimate(row: usize, col: usize, neighbors: &[Control]) -> Option<f64> {
  let n = neighbors.len();
  if n < 3 {
    return None;
  }
  let size = n + 3;
  let offsets: Vec<(f64, f64)> =
    neighbors.iter().map(|c| c.offset(row, col)).collect();

  // [ Φ  P ] [w]   [v]
  // [ Pᵀ 0 ] [c] = [0]
  let mut matrix = vec![vec![0.0; size]; size];
  let mut rhs = vec![0.0; size];
  for i in 0..n {
    for j in 0..n {
      let (dr, dc) = (
        offsets[i].0 - offsets[j].0,
        offsets[i].1 - offsets[j].1,
      );
      matrix[i][j] = cubic_kernel(dr, dc);
    }
    let tail = [1.0, offsets[i].0, offsets[i].1];
    for (k, t) in tail.iter().enumerate() {
      matrix[i][n + k] = *t;
      matrix[n + k][i] = *t;
    }
    rhs[i] = neighbors[i].value;
  }

  let solution = solve_linear(matrix, rhs)?;

  // The target sits at offset (0, 0), so only the constant term survives
  // from the affine tail.
  let value = offsets
    .iter()
    .zip(&solution[..n])
    .map(|(&(dr, dc), w)| w * cubic_kernel(dr, dc))
    .sum::<f64>()
    + solution[n];

  value.is_finite().then_some(value)
}

/// Gaussian elimination with partial pivoting.
fn solve_linear(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
  let n = b.len();
  let scale = a
    .iter()
    .flat_map(|row| row.iter())
    .fold(0.0_f64, |m, v| m.max(v.abs()))
    .max(1.0);

  for col in 0..n {
    let pivot_row = (col..n)
      .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
    if a[pivot_row][col].abs() < PIVOT_EPSILON * scale {
      return None;
    }
    a.swap(col, pivot_row);
    b.swap(col, pivot_row);

    for row in (col + 1)..n {
      let factor = a[row][col] / a[col][col];
      if factor == 0.0 {
        continue;
      }
      for k in col..n {
        a[row][k] -= factor * a[col][k];
      }
      b[row] -= factor * b[col];
    }
  }

  let mut x = vec![0.0; n];
  for row in (0..n).rev() {
    let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
    x[row] = (b[row] - tail) / a[row][row];
  }
  x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Convex combination of neighbour values weighted by `1 / d²`.
fn inverse_distance(row: usize, col: usize, neighbors: &[Control]) -> f64 {
  let mut weight_sum = 0.0;
  let mut value_sum = 0.0;
  for control in neighbors {
    let (dr, dc) = control.offset(row, col);
    let weight = 1.0 / (dr * dr + dc * dc);
    weight_sum += weight;
    value_sum += weight * control.value;
  }
  let value = value_sum / weight_sum;
  if value.is_finite() {
    value
  } else {
    // Weighted sums overflowed; fall back to the nearest value.
    neighbors.first().map_or(f64::NAN, |c| c.value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn finite_field_is_untouched() {
    let field = Field::from_fn((4, 4), |r, c| (r * 4 + c) as f64);
    let (out, report) = sanitize(field.clone());
    assert_eq!(out, field);
    assert_eq!(report, SanitizeReport::default());
  }

  #[test]
  fn single_hole_in_a_plane_is_exact() {
    let mut field =
      Field::from_fn((5, 5), |r, c| 2.0 * r as f64 - c as f64 + 1.0);
    field.values_mut()[12] = f64::NAN;
    let (out, report) = sanitize(field);
    assert_eq!(report.invalid, 1);
    assert_eq!(report.interpolated, 1);
    assert!((out.get(2, 2).unwrap() - 3.0).abs() < 1e-9);
  }

  #[test]
  fn single_finite_sample_fills_everything() {
    let mut field = Field::filled((3, 3), f64::NAN);
    field.values_mut()[4] = 7.0;
    let (out, report) = sanitize(field);
    assert!(out.values().iter().all(|&v| v == 7.0));
    assert_eq!(report.fallback, 8);
  }

  #[test]
  fn collinear_controls_fall_back() {
    let mut field = Field::filled((3, 3), f64::INFINITY);
    field.values_mut()[0] = 1.0;
    field.values_mut()[1] = 2.0;
    field.values_mut()[2] = 3.0;
    let (out, report) = sanitize(field);
    assert!(!out.has_non_finite());
    assert_eq!(report.fallback, 6);
  }

  #[test]
  fn all_invalid_is_degenerate_not_fatal() {
    let field = Field::filled((3, 3), f64::INFINITY);
    let (out, report) = sanitize(field);
    assert!(report.degenerate);
    assert!(report.ensure_defined().is_err());
    assert!(out.values().iter().all(|v| v.is_nan()));
  }

  #[test]
  fn nearest_breaks_ties_by_position() {
    let controls: Vec<Control> = (0..5)
      .flat_map(|row| (0..5).map(move |col| (row, col)))
      .filter(|&(row, col)| (row, col) != (2, 2))
      .map(|(row, col)| Control {
        row,
        col,
        value: (row * 5 + col) as f64,
      })
      .collect();
    let index = ControlIndex::new(controls);

    let near = index.nearest(2, 2);
    assert_eq!(near.len(), NEIGHBORS);
    let first: Vec<(usize, usize)> =
      near.iter().take(4).map(|c| (c.row, c.col)).collect();
    assert_eq!(first, vec![(1, 2), (2, 1), (2, 3), (3, 2)]);

    // Far outside the grid only distance matters.
    let corner = index.nearest(40, 40);
    assert_eq!((corner[0].row, corner[0].col), (4, 4));
  }

  #[test]
  fn large_hole_around_a_small_disc_is_filled() {
    let field = Field::from_fn((61, 61), |r, c| {
      let (dr, dc) = (r as f64 - 30.0, c as f64 - 30.0);
      let inside = 9.0 - dr * dr - dc * dc;
      if inside >= 0.0 {
        inside.sqrt()
      } else {
        f64::NAN
      }
    });
    let invalid = field.count_non_finite();
    let (out, report) = sanitize(field);
    assert_eq!(report.invalid, invalid);
    assert_eq!(report.repaired(), invalid);
    assert!(!out.has_non_finite());
  }

  #[test]
  fn solver_detects_singular_system() {
    let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
    assert!(solve_linear(a, vec![1.0, 2.0]).is_none());
    let a = vec![vec![2.0, 1.0], vec![1.0, 3.0]];
    let x = solve_linear(a, vec![3.0, 5.0]).unwrap();
    assert!((x[0] - 0.8).abs() < 1e-12 && (x[1] - 1.4).abs() < 1e-12);
  }
}
