use crate::functions::colormap::ColormapCatalog;
use crate::functions::grid::{build_grid, SampleGrid};
use crate::SurfaceError;

/// Largest accepted resolution; the grid has `(2r + 1)²` samples.
pub const MAX_RESOLUTION: usize = 500;

/// Plot settings shared by every graph item of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConfig {
  pub x_bound: f64,
  pub y_bound: f64,
  pub resolution: usize,
  pub colormap: String,
  /// Typeset formulas in simplified form.
  pub simplify: bool,
}

impl Default for PlotConfig {
  fn default() -> Self {
    PlotConfig {
      x_bound: 5.0,
      y_bound: 5.0,
      resolution: 20,
      colormap: "inferno".to_string(),
      simplify: false,
    }
  }
}

impl PlotConfig {
  pub fn with_bounds(mut self, x_bound: f64, y_bound: f64) -> Self {
    self.x_bound = x_bound;
    self.y_bound = y_bound;
    self
  }

  pub fn with_resolution(mut self, resolution: usize) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn with_colormap(mut self, name: impl Into<String>) -> Self {
    self.colormap = name.into();
    self
  }

  pub fn with_simplify(mut self, enabled: bool) -> Self {
    self.simplify = enabled;
    self
  }

  pub fn validate(&self, catalog: &ColormapCatalog) -> Result<(), SurfaceError> {
    for (axis, bound) in [("x", self.x_bound), ("y", self.y_bound)] {
      if !bound.is_finite() || bound <= 0.0 {
        return Err(SurfaceError::Config(format!(
          "{} bound must be a finite positive number, got {}",
          axis, bound
        )));
      }
    }
    if self.resolution > MAX_RESOLUTION {
      return Err(SurfaceError::Config(format!(
        "resolution {} exceeds the maximum of {}",
        self.resolution, MAX_RESOLUTION
      )));
    }
    catalog.get(&self.colormap)?;
    Ok(())
  }

  pub fn grid(&self) -> SampleGrid {
    build_grid(self.x_bound, self.y_bound, self.resolution)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = PlotConfig::default();
    assert_eq!(config.resolution, 20);
    assert_eq!(config.colormap, "inferno");
    assert!(config.validate(&ColormapCatalog::curated()).is_ok());
    assert_eq!(config.grid().shape(), (41, 41));
  }

  #[test]
  fn rejects_bad_settings() {
    let catalog = ColormapCatalog::curated();
    let bad_bound = PlotConfig::default().with_bounds(0.0, 5.0);
    assert!(matches!(
      bad_bound.validate(&catalog),
      Err(SurfaceError::Config(_))
    ));
    let nan_bound = PlotConfig::default().with_bounds(5.0, f64::NAN);
    assert!(nan_bound.validate(&catalog).is_err());
    let too_fine = PlotConfig::default().with_resolution(MAX_RESOLUTION + 1);
    assert!(too_fine.validate(&catalog).is_err());
    let hidden = PlotConfig::default().with_colormap("flag");
    assert!(matches!(
      hidden.validate(&catalog),
      Err(SurfaceError::UnknownColormap(_))
    ));
  }
}
