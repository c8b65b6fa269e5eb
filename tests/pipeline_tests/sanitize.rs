use super::*;

#[test]
fn reciprocal_is_finite_after_repair() {
  let grid = build_grid(5.0, 5.0, 2);
  let raw = function("1/x").eval_grid(&grid).unwrap();
  assert_eq!(raw.count_non_finite(), 5);
  let (clean, report) = sanitize(raw.clone());
  assert!(!clean.has_non_finite());
  assert_eq!(report.invalid, 5);
  assert_eq!(report.repaired(), 5);
  for (index, value) in raw.values().iter().enumerate() {
    if value.is_finite() {
      assert_eq!(clean.values()[index].to_bits(), value.to_bits());
    }
  }
}

#[test]
fn sanitize_is_idempotent() {
  let grid = build_grid(3.0, 3.0, 6);
  let raw = function("log(x*y)").eval_grid(&grid).unwrap();
  assert!(raw.has_non_finite());
  let (once, _) = sanitize(raw);
  let (twice, report) = sanitize(once.clone());
  assert!(once.bitwise_eq(&twice));
  assert_eq!(report.invalid, 0);
}

#[test]
fn all_invalid_does_not_panic() {
  let field = Field::filled((5, 5), f64::NAN);
  let (out, report) = sanitize(field);
  assert!(report.degenerate);
  let catalog = ColormapCatalog::curated();
  let colors = colorize(&out, catalog.get("inferno").unwrap());
  assert_eq!(colors.shape(), (5, 5));
}

#[test]
fn small_valid_disc_on_a_fine_grid() {
  let grid = build_grid(5.0, 5.0, 100);
  let raw = function("sqrt(1 - (x-1)^2 - (y-1)^2)")
    .eval_grid(&grid)
    .unwrap();
  let invalid = raw.count_non_finite();
  assert!(invalid > 39_000);

  let (clean, report) = sanitize(raw);
  assert_eq!(report.invalid, invalid);
  assert_eq!(report.repaired(), invalid);
  assert!(!report.degenerate);
  assert!(!clean.has_non_finite());
}
