use super::*;

#[test]
fn channels_stay_in_unit_range() {
  let grid = build_grid(5.0, 5.0, 4);
  let field = function("x^3 - 4*y").eval_grid(&grid).unwrap();
  let catalog = ColormapCatalog::curated();
  for name in catalog.names() {
    let colors = colorize(&field, catalog.get(name).unwrap());
    for rgba in colors.colors() {
      assert!(rgba.iter().all(|c| (0.0..=1.0).contains(c)), "{name}");
    }
  }
}

#[test]
fn extremes_hit_the_ends_of_the_ramp() {
  let grid = build_grid(1.0, 1.0, 1);
  let field = function("x").eval_grid(&grid).unwrap();
  let catalog = ColormapCatalog::curated();
  let map = catalog.get("viridis").unwrap();
  let colors = colorize(&field, map);
  assert_eq!(colors.get(0, 0), Some(map.map(0.0)));
  assert_eq!(colors.get(2, 0), Some(map.map(1.0)));
}

#[test]
fn constant_field_does_not_divide_by_zero() {
  let field = Field::filled((3, 3), 0.25);
  let catalog = ColormapCatalog::curated();
  let map = catalog.get("inferno").unwrap();
  let colors = colorize(&field, map);
  assert!(colors.colors().iter().all(|&c| c == map.map(0.25)));
}

#[test]
fn curated_catalog_hides_qualitative_palettes() {
  let catalog = ColormapCatalog::curated();
  for hidden in ["Accent", "Paired", "Dark2", "Pastel1", "tab10", "Set1", "flag", "viridis_r", "gray", "Greys"] {
    assert!(!catalog.contains(hidden), "{hidden}");
  }
  assert!(catalog.contains("inferno"));
  assert!(ColormapCatalog::unfiltered().contains("viridis_r"));
}
