//! One plotted formula and its lifecycle.
//!
//! ```text
//! Uninitialized ──set_equation──▶ Active ◀──toggle_hide──▶ Hidden
//!        │                          │                        │
//!        └──────────── delete ──────┴──────── delete ────────┴──▶ Deleted
//! ```
//!
//! Every failing operation leaves the item exactly as it was.

use tracing::{debug, instrument, warn};

use crate::evaluator::NumericFunction;
use crate::functions::colormap::{colorize, ColorField, Colormap, ColormapCatalog};
use crate::functions::grid::{Field, SampleGrid};
use crate::functions::sanitize::SanitizeReport;
use crate::functions::surface::{default_surface, render_surface, SurfaceData};
use crate::SurfaceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
  /// No formula plotted yet, showing the zero surface.
  Uninitialized,
  Active,
  Hidden,
  Deleted,
}

#[derive(Debug, Clone)]
pub struct GraphItem {
  state: ItemState,
  /// Only meaningful while `Uninitialized`; the other states carry their
  /// own visibility.
  visible: bool,
  equation: Option<NumericFunction>,
  colormap: String,
  resolution: usize,
  surface: Field,
  colors: ColorField,
  report: SanitizeReport,
  revision: u64,
}

impl GraphItem {
  /// Fresh item showing the flat zero surface over `grid`.
  pub fn new(grid: &SampleGrid, colormap: &Colormap) -> Self {
    let data = default_surface(grid, colormap);
    GraphItem {
      state: ItemState::Uninitialized,
      visible: true,
      equation: None,
      colormap: colormap.name().to_string(),
      resolution: grid.resolution(),
      surface: data.field,
      colors: data.colors,
      report: data.report,
      revision: 0,
    }
  }

  pub fn state(&self) -> ItemState {
    self.state
  }

  pub fn is_visible(&self) -> bool {
    match self.state {
      ItemState::Uninitialized => self.visible,
      ItemState::Active => true,
      ItemState::Hidden | ItemState::Deleted => false,
    }
  }

  pub fn equation(&self) -> Option<&NumericFunction> {
    self.equation.as_ref()
  }

  pub fn colormap(&self) -> &str {
    &self.colormap
  }

  pub fn resolution(&self) -> usize {
    self.resolution
  }

  pub fn surface(&self) -> &Field {
    &self.surface
  }

  pub fn colors(&self) -> &ColorField {
    &self.colors
  }

  /// Sanitizer statistics of the current surface.
  pub fn report(&self) -> SanitizeReport {
    self.report
  }

  /// Incremented on every successful surface update.
  pub fn revision(&self) -> u64 {
    self.revision
  }

  fn ensure_alive(&self, action: &'static str) -> Result<(), SurfaceError> {
    if self.state == ItemState::Deleted {
      return Err(SurfaceError::InvalidTransition {
        from: self.state,
        action,
      });
    }
    Ok(())
  }

  fn install(&mut self, data: SurfaceData, resolution: usize) {
    self.surface = data.field;
    self.colors = data.colors;
    self.report = data.report;
    self.resolution = resolution;
    self.revision += 1;
  }

  /// Evaluate `function` over `grid` and replace the surface.
  ///
  /// A hidden item gets the new data but stays hidden; an uninitialized
  /// item that was hidden becomes `Hidden`.
  #[instrument(level = "debug", skip_all, fields(source = function.source()))]
  pub fn set_equation(
    &mut self,
    function: NumericFunction,
    grid: &SampleGrid,
    catalog: &ColormapCatalog,
  ) -> Result<(), SurfaceError> {
    self.ensure_alive("plot")?;
    let data = catalog
      .get(&self.colormap)
      .and_then(|colormap| render_surface(&function, grid, colormap))
      .map_err(|err| {
        warn!(error = %err, "surface update failed, keeping previous surface");
        err
      })?;

    self.install(data, grid.resolution());
    self.equation = Some(function);
    self.state = match self.state {
      ItemState::Uninitialized if !self.visible => ItemState::Hidden,
      ItemState::Hidden => ItemState::Hidden,
      _ => ItemState::Active,
    };
    debug!(revision = self.revision, state = ?self.state, "surface updated");
    Ok(())
  }

  /// Flip visibility, returning the new visibility.
  pub fn toggle_hide(&mut self) -> Result<bool, SurfaceError> {
    self.state = match self.state {
      ItemState::Active => ItemState::Hidden,
      ItemState::Hidden => ItemState::Active,
      ItemState::Uninitialized => {
        self.visible = !self.visible;
        ItemState::Uninitialized
      }
      ItemState::Deleted => {
        return Err(SurfaceError::InvalidTransition {
          from: self.state,
          action: "toggle",
        })
      }
    };
    Ok(self.is_visible())
  }

  /// Terminal transition. Deleting twice is an error.
  pub fn delete(&mut self) -> Result<(), SurfaceError> {
    self.ensure_alive("delete")?;
    self.state = ItemState::Deleted;
    self.equation = None;
    Ok(())
  }

  /// Recolor the current surface without evaluating again.
  pub fn set_colormap(
    &mut self,
    name: &str,
    catalog: &ColormapCatalog,
  ) -> Result<(), SurfaceError> {
    self.ensure_alive("recolor")?;
    let colormap = catalog.get(name)?;
    self.colors = colorize(&self.surface, colormap);
    self.colormap = colormap.name().to_string();
    self.revision += 1;
    Ok(())
  }

  /// Sample again on a new grid: the current equation when there is one,
  /// the zero surface otherwise.
  pub fn set_resolution(
    &mut self,
    grid: &SampleGrid,
    catalog: &ColormapCatalog,
  ) -> Result<(), SurfaceError> {
    self.ensure_alive("resample")?;
    let colormap = catalog.get(&self.colormap)?;
    let data = match &self.equation {
      Some(function) => render_surface(function, grid, colormap)?,
      None => default_surface(grid, colormap),
    };
    self.install(data, grid.resolution());
    Ok(())
  }
}
