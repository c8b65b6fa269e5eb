//! Message-driven front door to the engine.
//!
//! A UI turns user actions into [`Command`]s and feeds them to
//! [`Session::update`], which mutates the graph items and pushes results to
//! the [`Typesetter`] and [`RenderHost`]. Keystrokes only validate and
//! typeset; sampling, repair and coloring happen on an explicit plot.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use crate::config::PlotConfig;
use crate::evaluator::{validate_text, ExpressionCache, SymbolTable, Validity};
use crate::functions::colormap::ColormapCatalog;
use crate::functions::grid::SampleGrid;
use crate::functions::sanitize::SanitizeReport;
use crate::functions::simplify::simplify;
use crate::graph_item::GraphItem;
use crate::host::{
  HostError, MemoryRenderHost, RecordingTypesetter, RenderHost, Typesetter,
};
use crate::registry::{IdentityRegistry, Identifier};
use crate::SurfaceError;

/// Shown in place of the formula while the input is empty.
pub const PLACEHOLDER: &str = "...";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  AddGraphItem,
  EditText { id: Identifier, text: String },
  SetSimplify { id: Identifier, enabled: bool },
  Plot { id: Identifier },
  ToggleHide { id: Identifier },
  Delete { id: Identifier },
  SetColormap { id: Identifier, name: String },
  SetResolution { resolution: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Added(Identifier),
  Typeset { id: Identifier, latex: String },
  /// Input is empty; the placeholder was typeset.
  Placeholder(Identifier),
  /// Input does not compile; the previous typeset output is kept.
  Invalid { id: Identifier, reason: String },
  Plotted {
    id: Identifier,
    revision: u64,
    report: SanitizeReport,
  },
  /// Plot requested while the formula is not valid.
  Skipped { id: Identifier, reason: String },
  /// Evaluation failed; the previous surface is kept.
  PlotFailed { id: Identifier, reason: String },
  Visibility { id: Identifier, visible: bool },
  Deleted(Identifier),
  Recolored(Identifier),
  Resampled { resolution: usize, items: usize },
}

/// Editor-side state of one graph item.
#[derive(Debug, Clone, Default)]
pub struct EquationEntry {
  text: String,
  valid: bool,
  simplify: bool,
  cache: ExpressionCache,
  last_typeset: Option<String>,
}

impl EquationEntry {
  fn new(simplify: bool) -> Self {
    EquationEntry {
      simplify,
      ..EquationEntry::default()
    }
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn is_valid(&self) -> bool {
    self.valid
  }

  pub fn simplify(&self) -> bool {
    self.simplify
  }

  /// Last string sent to the typesetter.
  pub fn last_typeset(&self) -> Option<&str> {
    self.last_typeset.as_deref()
  }

  /// How many times the formula text was actually compiled.
  pub fn compilations(&self) -> usize {
    self.cache.compilations()
  }
}

pub struct Session<
  T: Typesetter = RecordingTypesetter,
  H: RenderHost = MemoryRenderHost,
> {
  config: PlotConfig,
  catalog: ColormapCatalog,
  symbols: SymbolTable,
  grid: SampleGrid,
  registry: IdentityRegistry,
  entries: HashMap<Identifier, EquationEntry>,
  default_item: Identifier,
  typesetter: T,
  host: H,
}

impl Session {
  /// Session with in-memory collaborators.
  pub fn headless(config: PlotConfig) -> Result<Self, SurfaceError> {
    Session::new(
      config,
      RecordingTypesetter::default(),
      MemoryRenderHost::default(),
    )
  }
}

impl<T: Typesetter, H: RenderHost> Session<T, H> {
  /// Start a session with one default, uninitialized graph item.
  pub fn new(
    config: PlotConfig,
    typesetter: T,
    host: H,
  ) -> Result<Self, SurfaceError> {
    Self::with_registry(config, IdentityRegistry::new(), typesetter, host)
  }

  pub fn with_registry(
    config: PlotConfig,
    registry: IdentityRegistry,
    typesetter: T,
    host: H,
  ) -> Result<Self, SurfaceError> {
    let catalog = ColormapCatalog::curated();
    config.validate(&catalog)?;
    let grid = config.grid();
    let mut session = Session {
      config,
      catalog,
      symbols: SymbolTable::default(),
      grid,
      registry,
      entries: HashMap::new(),
      default_item: Identifier::from_words([0; 8]),
      typesetter,
      host,
    };
    session.default_item = session.add_item()?;
    info!(
      resolution = session.config.resolution,
      colormap = %session.config.colormap,
      "session started"
    );
    Ok(session)
  }

  pub fn config(&self) -> &PlotConfig {
    &self.config
  }

  pub fn grid(&self) -> &SampleGrid {
    &self.grid
  }

  pub fn catalog(&self) -> &ColormapCatalog {
    &self.catalog
  }

  pub fn symbols(&self) -> &SymbolTable {
    &self.symbols
  }

  /// The item created at startup. It may have been deleted since.
  pub fn default_item(&self) -> Identifier {
    self.default_item
  }

  pub fn item(&self, id: &Identifier) -> Option<&GraphItem> {
    self.registry.lookup(id)
  }

  pub fn entry(&self, id: &Identifier) -> Option<&EquationEntry> {
    self.entries.get(id)
  }

  pub fn ids(&self) -> Vec<Identifier> {
    self.registry.ids()
  }

  pub fn typesetter(&self) -> &T {
    &self.typesetter
  }

  pub fn host(&self) -> &H {
    &self.host
  }

  #[instrument(level = "debug", skip(self))]
  pub fn update(&mut self, command: Command) -> Result<Outcome, SurfaceError> {
    match command {
      Command::AddGraphItem => self.add_item().map(Outcome::Added),
      Command::EditText { id, text } => {
        self.entry_mut(&id)?.text = text;
        self.refresh_typeset(id)
      }
      Command::SetSimplify { id, enabled } => {
        self.entry_mut(&id)?.simplify = enabled;
        self.refresh_typeset(id)
      }
      Command::Plot { id } => self.plot(id),
      Command::ToggleHide { id } => self.toggle_hide(id),
      Command::Delete { id } => self.delete(id),
      Command::SetColormap { id, name } => self.set_colormap(id, &name),
      Command::SetResolution { resolution } => self.set_resolution(resolution),
    }
  }

  fn entry_mut(
    &mut self,
    id: &Identifier,
  ) -> Result<&mut EquationEntry, SurfaceError> {
    self
      .entries
      .get_mut(id)
      .ok_or(SurfaceError::UnknownItem(*id))
  }

  fn add_item(&mut self) -> Result<Identifier, SurfaceError> {
    let colormap = self.catalog.get(&self.config.colormap)?;
    let item = GraphItem::new(&self.grid, colormap);
    let id = self.registry.register(item)?;
    self.entries.insert(id, EquationEntry::new(self.config.simplify));
    if let Some(item) = self.registry.lookup(&id) {
      log_host(
        self.host.add(id, &self.grid, item.surface(), item.colors()),
        "add",
      );
    }
    info!(id = %id.short(), items = self.registry.len(), "graph item added");
    Ok(id)
  }

  /// Keystroke path: validate the text and typeset it, never sample.
  fn refresh_typeset(&mut self, id: Identifier) -> Result<Outcome, SurfaceError> {
    let entry = self
      .entries
      .get_mut(&id)
      .ok_or(SurfaceError::UnknownItem(id))?;

    match validate_text(&entry.text, &self.symbols) {
      Validity::Empty => {
        entry.valid = false;
        entry.last_typeset = Some(PLACEHOLDER.to_string());
        log_host(self.typesetter.typeset(id, PLACEHOLDER), "typeset");
        Ok(Outcome::Placeholder(id))
      }
      Validity::Invalid(reason) => {
        entry.valid = false;
        debug!(id = %id.short(), %reason, "formula rejected");
        Ok(Outcome::Invalid { id, reason })
      }
      Validity::Valid(expr) => {
        entry.valid = true;
        let latex = simplify(&expr, entry.simplify).to_latex();
        entry.last_typeset = Some(latex.clone());
        log_host(self.typesetter.typeset(id, &latex), "typeset");
        Ok(Outcome::Typeset { id, latex })
      }
    }
  }

  fn plot(&mut self, id: Identifier) -> Result<Outcome, SurfaceError> {
    let entry = self
      .entries
      .get_mut(&id)
      .ok_or(SurfaceError::UnknownItem(id))?;
    if !entry.valid {
      return Ok(Outcome::Skipped {
        id,
        reason: "formula is not valid".to_string(),
      });
    }
    let function = match entry.cache.get_or_compile(&entry.text, &self.symbols) {
      Ok(function) => function.clone(),
      Err(err) => {
        warn!(id = %id.short(), error = %err, "compilation failed");
        return Ok(Outcome::PlotFailed {
          id,
          reason: err.to_string(),
        });
      }
    };

    let item = self
      .registry
      .lookup_mut(&id)
      .ok_or(SurfaceError::UnknownItem(id))?;
    if let Err(err) = item.set_equation(function, &self.grid, &self.catalog) {
      return Ok(Outcome::PlotFailed {
        id,
        reason: err.to_string(),
      });
    }

    let report = item.report();
    if let Err(err) = report.ensure_defined() {
      warn!(id = %id.short(), error = %err, "plotted surface is undefined");
    }
    log_host(
      self.host.update(id, &self.grid, item.surface(), item.colors()),
      "update",
    );
    Ok(Outcome::Plotted {
      id,
      revision: item.revision(),
      report,
    })
  }

  fn toggle_hide(&mut self, id: Identifier) -> Result<Outcome, SurfaceError> {
    let item = self
      .registry
      .lookup_mut(&id)
      .ok_or(SurfaceError::UnknownItem(id))?;
    let visible = item.toggle_hide()?;
    if visible {
      log_host(self.host.show(id), "show");
    } else {
      log_host(self.host.hide(id), "hide");
    }
    Ok(Outcome::Visibility { id, visible })
  }

  fn delete(&mut self, id: Identifier) -> Result<Outcome, SurfaceError> {
    let item = self
      .registry
      .lookup_mut(&id)
      .ok_or(SurfaceError::UnknownItem(id))?;
    item.delete()?;
    self.registry.unregister(&id);
    self.entries.remove(&id);
    log_host(self.host.remove(id), "remove");
    info!(id = %id.short(), items = self.registry.len(), "graph item deleted");
    Ok(Outcome::Deleted(id))
  }

  fn set_colormap(
    &mut self,
    id: Identifier,
    name: &str,
  ) -> Result<Outcome, SurfaceError> {
    let item = self
      .registry
      .lookup_mut(&id)
      .ok_or(SurfaceError::UnknownItem(id))?;
    item.set_colormap(name, &self.catalog)?;
    log_host(
      self.host.update(id, &self.grid, item.surface(), item.colors()),
      "update",
    );
    Ok(Outcome::Recolored(id))
  }

  /// Rebuild the grid and resample every item. Items that fail keep their
  /// previous surface.
  fn set_resolution(&mut self, resolution: usize) -> Result<Outcome, SurfaceError> {
    let config = self.config.clone().with_resolution(resolution);
    config.validate(&self.catalog)?;
    if self.grid.matches(config.x_bound, config.y_bound, resolution) {
      debug!(resolution, "grid unchanged");
      return Ok(Outcome::Resampled {
        resolution,
        items: 0,
      });
    }
    self.grid = config.grid();
    self.config = config;

    let mut resampled = 0;
    for (id, item) in self.registry.iter_mut() {
      match item.set_resolution(&self.grid, &self.catalog) {
        Ok(()) => {
          resampled += 1;
          log_host(
            self.host.update(*id, &self.grid, item.surface(), item.colors()),
            "update",
          );
        }
        Err(err) => {
          warn!(id = %id.short(), error = %err, "resampling failed");
        }
      }
    }
    info!(resolution, items = resampled, "grid rebuilt");
    Ok(Outcome::Resampled {
      resolution,
      items: resampled,
    })
  }
}

/// Host failures never roll back engine state.
fn log_host(result: Result<(), HostError>, action: &str) {
  if let Err(err) = result {
    warn!(action, error = %err, "host call failed");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session() -> Session {
    Session::with_registry(
      PlotConfig::default().with_resolution(2),
      IdentityRegistry::with_seed(11),
      RecordingTypesetter::default(),
      MemoryRenderHost::default(),
    )
    .unwrap()
  }

  fn edit(session: &mut Session, id: Identifier, text: &str) -> Outcome {
    session
      .update(Command::EditText {
        id,
        text: text.to_string(),
      })
      .unwrap()
  }

  #[test]
  fn starts_with_one_default_item() {
    let session = session();
    let id = session.default_item();
    assert_eq!(session.ids(), vec![id]);
    assert!(session.host().surface(&id).is_some());
    assert!(!session.entry(&id).unwrap().is_valid());
  }

  #[test]
  fn keystrokes_typeset_without_sampling() {
    let mut session = session();
    let id = session.default_item();
    let outcome = edit(&mut session, id, "x^2");
    assert_eq!(
      outcome,
      Outcome::Typeset {
        id,
        latex: "x^{2}".to_string()
      }
    );
    assert_eq!(session.typesetter().latest(&id), Some("x^{2}"));
    assert_eq!(session.item(&id).unwrap().revision(), 0);
  }

  #[test]
  fn invalid_text_keeps_previous_typeset() {
    let mut session = session();
    let id = session.default_item();
    edit(&mut session, id, "x + y");
    let outcome = edit(&mut session, id, "x +");
    assert!(matches!(outcome, Outcome::Invalid { .. }));
    assert_eq!(session.typesetter().latest(&id), Some("x + y"));
    assert!(!session.entry(&id).unwrap().is_valid());
  }

  #[test]
  fn empty_text_shows_placeholder() {
    let mut session = session();
    let id = session.default_item();
    assert_eq!(edit(&mut session, id, "   "), Outcome::Placeholder(id));
    assert_eq!(session.typesetter().latest(&id), Some(PLACEHOLDER));
  }

  #[test]
  fn simplify_toggle_retypesets() {
    let mut session = session();
    let id = session.default_item();
    edit(&mut session, id, "x + x");
    let outcome = session
      .update(Command::SetSimplify { id, enabled: true })
      .unwrap();
    assert_eq!(
      outcome,
      Outcome::Typeset {
        id,
        latex: "2 x".to_string()
      }
    );
  }

  #[test]
  fn simplified_typeset_survives_extreme_literals() {
    let mut session = session();
    let id = session.default_item();
    session
      .update(Command::SetSimplify { id, enabled: true })
      .unwrap();
    let text = "-170141183460469231731687303715884105727 - 1 + x";
    match edit(&mut session, id, text) {
      Outcome::Typeset { latex, .. } => assert!(latex.contains('x')),
      other => panic!("unexpected outcome {:?}", other),
    }
    assert!(session.entry(&id).unwrap().is_valid());
    assert!(matches!(
      session.update(Command::Plot { id }).unwrap(),
      Outcome::Plotted { .. }
    ));
  }

  #[test]
  fn plot_updates_item_and_host() {
    let mut session = session();
    let id = session.default_item();
    edit(&mut session, id, "x*y");
    match session.update(Command::Plot { id }).unwrap() {
      Outcome::Plotted { revision, .. } => assert_eq!(revision, 1),
      other => panic!("unexpected outcome {:?}", other),
    }
    let hosted = session.host().surface(&id).unwrap();
    assert_eq!(hosted.z.get(0, 0), Some(25.0));
    assert_eq!(hosted.updates, 1);

    // Same text again reuses the compiled function.
    session.update(Command::Plot { id }).unwrap();
    assert_eq!(session.entry(&id).unwrap().compilations(), 1);
  }

  #[test]
  fn plot_is_skipped_for_invalid_text() {
    let mut session = session();
    let id = session.default_item();
    edit(&mut session, id, "sin(");
    assert!(matches!(
      session.update(Command::Plot { id }).unwrap(),
      Outcome::Skipped { .. }
    ));
  }

  #[test]
  fn delete_retires_the_item() {
    let mut session = session();
    let id = match session.update(Command::AddGraphItem).unwrap() {
      Outcome::Added(id) => id,
      other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(session.ids().len(), 2);
    session.update(Command::Delete { id }).unwrap();
    assert_eq!(session.ids().len(), 1);
    assert!(session.host().surface(&id).is_none());
    assert!(matches!(
      session.update(Command::ToggleHide { id }),
      Err(SurfaceError::UnknownItem(_))
    ));
  }

  #[test]
  fn toggle_reaches_host() {
    let mut session = session();
    let id = session.default_item();
    let outcome = session.update(Command::ToggleHide { id }).unwrap();
    assert_eq!(outcome, Outcome::Visibility { id, visible: false });
    assert!(!session.host().surface(&id).unwrap().visible);
  }

  #[test]
  fn resolution_change_resamples_everything() {
    let mut session = session();
    let id = session.default_item();
    edit(&mut session, id, "x + y");
    session.update(Command::Plot { id }).unwrap();
    let outcome = session
      .update(Command::SetResolution { resolution: 4 })
      .unwrap();
    assert_eq!(
      outcome,
      Outcome::Resampled {
        resolution: 4,
        items: 1
      }
    );
    assert_eq!(session.item(&id).unwrap().surface().shape(), (9, 9));
    let updates = session.host().surface(&id).unwrap().updates;
    let revision = session.item(&id).unwrap().revision();

    let again = session
      .update(Command::SetResolution { resolution: 4 })
      .unwrap();
    assert_eq!(
      again,
      Outcome::Resampled {
        resolution: 4,
        items: 0
      }
    );
    assert_eq!(session.host().surface(&id).unwrap().updates, updates);
    assert_eq!(session.item(&id).unwrap().revision(), revision);
    assert!(session
      .update(Command::SetResolution { resolution: 100_000 })
      .is_err());
    assert_eq!(session.grid().resolution(), 4);
  }

  #[test]
  fn unknown_colormap_is_an_error() {
    let mut session = session();
    let id = session.default_item();
    assert!(session
      .update(Command::SetColormap {
        id,
        name: "Accent".to_string()
      })
      .is_err());
    session
      .update(Command::SetColormap {
        id,
        name: "viridis".to_string(),
      })
      .unwrap();
    assert_eq!(session.item(&id).unwrap().colormap(), "viridis");
  }
}
