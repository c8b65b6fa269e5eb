//! Seams to the outside world: formula typesetting and the 3-D view.
//!
//! The engine only talks to these traits. Failures on this side are logged
//! by the session and never roll back engine state.

use std::collections::HashMap;

use thiserror::Error;

use crate::functions::colormap::ColorField;
use crate::functions::grid::{Field, SampleGrid};
use crate::registry::Identifier;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
  #[error("No surface registered for {0}")]
  UnknownSurface(Identifier),
  #[error("Surface {0} is already present")]
  AlreadyPresent(Identifier),
}

/// Renders a LaTeX string next to the formula of item `id`.
pub trait Typesetter {
  fn typeset(&mut self, id: Identifier, latex: &str) -> Result<(), HostError>;
}

/// Displays colored surfaces.
pub trait RenderHost {
  fn add(
    &mut self,
    id: Identifier,
    grid: &SampleGrid,
    surface: &Field,
    colors: &ColorField,
  ) -> Result<(), HostError>;

  fn update(
    &mut self,
    id: Identifier,
    grid: &SampleGrid,
    surface: &Field,
    colors: &ColorField,
  ) -> Result<(), HostError>;

  fn remove(&mut self, id: Identifier) -> Result<(), HostError>;

  fn show(&mut self, id: Identifier) -> Result<(), HostError>;

  fn hide(&mut self, id: Identifier) -> Result<(), HostError>;
}

/// Keeps the latest typeset string per item.
#[derive(Debug, Clone, Default)]
pub struct RecordingTypesetter {
  latest: HashMap<Identifier, String>,
  calls: usize,
}

impl RecordingTypesetter {
  pub fn latest(&self, id: &Identifier) -> Option<&str> {
    self.latest.get(id).map(String::as_str)
  }

  pub fn calls(&self) -> usize {
    self.calls
  }
}

impl Typesetter for RecordingTypesetter {
  fn typeset(&mut self, id: Identifier, latex: &str) -> Result<(), HostError> {
    self.calls += 1;
    self.latest.insert(id, latex.to_string());
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HostedSurface {
  pub x_axis: Vec<f64>,
  pub y_axis: Vec<f64>,
  pub z: Field,
  pub colors: ColorField,
  pub visible: bool,
  /// Number of `update` calls since `add`.
  pub updates: usize,
}

/// In-memory scene, used headless and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRenderHost {
  surfaces: HashMap<Identifier, HostedSurface>,
}

impl MemoryRenderHost {
  pub fn surface(&self, id: &Identifier) -> Option<&HostedSurface> {
    self.surfaces.get(id)
  }

  pub fn len(&self) -> usize {
    self.surfaces.len()
  }

  pub fn is_empty(&self) -> bool {
    self.surfaces.is_empty()
  }

  fn hosted(&mut self, id: Identifier) -> Result<&mut HostedSurface, HostError> {
    self
      .surfaces
      .get_mut(&id)
      .ok_or(HostError::UnknownSurface(id))
  }
}

impl RenderHost for MemoryRenderHost {
  fn add(
    &mut self,
    id: Identifier,
    grid: &SampleGrid,
    surface: &Field,
    colors: &ColorField,
  ) -> Result<(), HostError> {
    if self.surfaces.contains_key(&id) {
      return Err(HostError::AlreadyPresent(id));
    }
    self.surfaces.insert(
      id,
      HostedSurface {
        x_axis: grid.x_axis(),
        y_axis: grid.y_axis(),
        z: surface.clone(),
        colors: colors.clone(),
        visible: true,
        updates: 0,
      },
    );
    Ok(())
  }

  fn update(
    &mut self,
    id: Identifier,
    grid: &SampleGrid,
    surface: &Field,
    colors: &ColorField,
  ) -> Result<(), HostError> {
    let hosted = self.hosted(id)?;
    hosted.x_axis = grid.x_axis();
    hosted.y_axis = grid.y_axis();
    hosted.z = surface.clone();
    hosted.colors = colors.clone();
    hosted.updates += 1;
    Ok(())
  }

  fn remove(&mut self, id: Identifier) -> Result<(), HostError> {
    self
      .surfaces
      .remove(&id)
      .map(|_| ())
      .ok_or(HostError::UnknownSurface(id))
  }

  fn show(&mut self, id: Identifier) -> Result<(), HostError> {
    self.hosted(id)?.visible = true;
    Ok(())
  }

  fn hide(&mut self, id: Identifier) -> Result<(), HostError> {
    self.hosted(id)?.visible = false;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::functions::colormap::{colorize, ColormapCatalog};
  use crate::functions::grid::build_grid;

  #[test]
  fn memory_host_tracks_surfaces() {
    let grid = build_grid(1.0, 1.0, 1);
    let field = Field::zeros(grid.shape());
    let catalog = ColormapCatalog::curated();
    let colors = colorize(&field, catalog.get("viridis").unwrap());
    let id = Identifier::from_words([1; 8]);

    let mut host = MemoryRenderHost::default();
    assert_eq!(
      host.update(id, &grid, &field, &colors),
      Err(HostError::UnknownSurface(id))
    );
    host.add(id, &grid, &field, &colors).unwrap();
    assert!(host.add(id, &grid, &field, &colors).is_err());
    host.update(id, &grid, &field, &colors).unwrap();
    host.hide(id).unwrap();

    let hosted = host.surface(&id).unwrap();
    assert!(!hosted.visible);
    assert_eq!(hosted.updates, 1);
    assert_eq!(hosted.x_axis, vec![-1.0, 0.0, 1.0]);

    host.remove(id).unwrap();
    assert!(host.is_empty());
  }

  #[test]
  fn recording_typesetter_keeps_latest() {
    let mut typesetter = RecordingTypesetter::default();
    let id = Identifier::from_words([2; 8]);
    typesetter.typeset(id, "x").unwrap();
    typesetter.typeset(id, "x^{2}").unwrap();
    assert_eq!(typesetter.latest(&id), Some("x^{2}"));
    assert_eq!(typesetter.calls(), 2);
  }
}
