use tracing::{debug, instrument};

use crate::evaluator::NumericFunction;
use crate::functions::colormap::{colorize, ColorField, Colormap};
use crate::functions::grid::{Field, SampleGrid};
use crate::functions::sanitize::{sanitize, SanitizeReport};
use crate::SurfaceError;

/// Everything the render host needs for one surface.
#[derive(Debug, Clone)]
pub struct SurfaceData {
  pub field: Field,
  pub colors: ColorField,
  pub report: SanitizeReport,
}

/// Sample `function` over `grid`. Constant formulas are broadcast, so the
/// result always has the grid's shape.
pub fn sample_surface(
  function: &NumericFunction,
  grid: &SampleGrid,
) -> Result<Field, SurfaceError> {
  let field = function.eval_grid(grid)?;
  if field.shape() != grid.shape() {
    return Err(SurfaceError::ShapeMismatch {
      expected: grid.shape(),
      found: field.shape(),
    });
  }
  Ok(field)
}

/// Full pipeline: sample, repair non-finite samples, colorize.
#[instrument(level = "debug", skip_all, fields(source = function.source()))]
pub fn render_surface(
  function: &NumericFunction,
  grid: &SampleGrid,
  colormap: &Colormap,
) -> Result<SurfaceData, SurfaceError> {
  let raw = sample_surface(function, grid)?;
  let (field, report) = sanitize(raw);
  let colors = colorize(&field, colormap);
  debug!(
    rows = grid.shape().0,
    cols = grid.shape().1,
    repaired = report.repaired(),
    degenerate = report.degenerate,
    "surface rendered"
  );
  Ok(SurfaceData {
    field,
    colors,
    report,
  })
}

/// Zero surface shown before any formula is plotted.
pub fn default_surface(grid: &SampleGrid, colormap: &Colormap) -> SurfaceData {
  let field = Field::zeros(grid.shape());
  let colors = colorize(&field, colormap);
  SurfaceData {
    field,
    colors,
    report: SanitizeReport::default(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::evaluator::{compile_text, SymbolTable};
  use crate::functions::colormap::ColormapCatalog;
  use crate::functions::grid::build_grid;

  #[test]
  fn pipeline_repairs_and_colors() {
    let symbols = SymbolTable::default();
    let f = compile_text("1/x", &symbols).unwrap();
    let grid = build_grid(5.0, 5.0, 2);
    let catalog = ColormapCatalog::curated();
    let data =
      render_surface(&f, &grid, catalog.get("viridis").unwrap()).unwrap();
    assert_eq!(data.report.invalid, 5);
    assert!(!data.field.has_non_finite());
    assert_eq!(data.colors.shape(), grid.shape());
  }

  #[test]
  fn default_surface_is_flat_zero() {
    let grid = build_grid(5.0, 5.0, 3);
    let catalog = ColormapCatalog::curated();
    let map = catalog.get("inferno").unwrap();
    let data = default_surface(&grid, map);
    assert!(data.field.values().iter().all(|&v| v == 0.0));
    assert_eq!(data.colors.get(0, 0), Some(map.map(0.0)));
  }
}
