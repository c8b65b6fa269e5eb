use super::*;

#[test]
fn grid_is_deterministic() {
  let a = build_grid(5.0, 5.0, 2);
  let b = build_grid(5.0, 5.0, 2);
  assert_eq!(a, b);
  assert!(a.x().bitwise_eq(b.x()));
  assert!(a.y().bitwise_eq(b.y()));
}

#[test]
fn axes_are_symmetric_and_hit_zero() {
  let grid = build_grid(5.0, 3.0, 2);
  assert_eq!(grid.x_axis(), vec![-5.0, -2.5, 0.0, 2.5, 5.0]);
  assert_eq!(grid.y_axis(), vec![-3.0, -1.5, 0.0, 1.5, 3.0]);
}

#[test]
fn x_varies_along_rows() {
  let grid = build_grid(5.0, 5.0, 2);
  assert_eq!(grid.x().get(0, 4), Some(-5.0));
  assert_eq!(grid.x().get(4, 0), Some(5.0));
  assert_eq!(grid.y().get(0, 4), Some(5.0));
  assert_eq!(grid.y().get(4, 0), Some(-5.0));
}

#[test]
fn zero_resolution_is_the_origin() {
  let grid = build_grid(5.0, 5.0, 0);
  assert_eq!(grid.shape(), (1, 1));
  assert_eq!(grid.x().get(0, 0), Some(0.0));
}
