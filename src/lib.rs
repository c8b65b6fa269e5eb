use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

pub mod config;
pub mod evaluator;
pub mod functions;
pub mod graph_item;
pub mod host;
pub mod registry;
pub mod session;
pub mod syntax;

pub use config::PlotConfig;
pub use evaluator::{
  validate, validate_text, ExpressionCache, NumericFunction, SymbolTable,
  Validity,
};
pub use functions::colormap::{ColorField, Colormap, ColormapCatalog, Rgba};
pub use functions::grid::{build_grid, Field, SampleGrid};
pub use functions::sanitize::{sanitize, sanitize_field, SanitizeReport};
pub use functions::simplify::{simplify, CanonicalForm};
pub use graph_item::{GraphItem, ItemState};
pub use registry::{IdentityRegistry, Identifier};
pub use session::{Command, Outcome, Session};

#[derive(Parser)]
#[grammar = "surface.pest"]
pub struct ExpressionParser;

#[derive(Error, Debug)]
pub enum SurfaceError {
  #[error("Parse error: {0}")]
  Parse(#[from] Box<pest::error::Error<Rule>>),
  #[error("Empty input")]
  EmptyInput,
  #[error("Validation failure: {0}")]
  ValidationFailure(String),
  #[error("Interpolation degenerate: no finite samples to interpolate from")]
  InterpolationDegenerate,
  #[error("Identifier space exhausted after {attempts} attempts")]
  IdentityExhausted { attempts: usize },
  #[error("Unknown colormap: {0}")]
  UnknownColormap(String),
  #[error("Unknown graph item: {0}")]
  UnknownItem(Identifier),
  #[error("Identifier already issued: {0}")]
  IdentifierInUse(Identifier),
  #[error("Cannot {action} a graph item in state {from:?}")]
  InvalidTransition {
    from: ItemState,
    action: &'static str,
  },
  #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
  ShapeMismatch {
    expected: (usize, usize),
    found: (usize, usize),
  },
  #[error("Invalid configuration: {0}")]
  Config(String),
}

impl ExpressionParser {
  pub fn parse_program(
    input: &str,
  ) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>>
  {
    Self::parse(Rule::Program, input).map_err(Box::new)
  }
}

pub fn parse(
  input: &str,
) -> Result<pest::iterators::Pairs<'_, Rule>, Box<pest::error::Error<Rule>>> {
  ExpressionParser::parse_program(input)
}

/// Parse user text into an expression tree.
///
/// Whitespace-only text is the distinguished "no expression" state and is
/// reported as [`SurfaceError::EmptyInput`] rather than a parse error.
pub fn parse_expression(input: &str) -> Result<syntax::Expr, SurfaceError> {
  let trimmed = input.trim();
  if trimmed.is_empty() {
    return Err(SurfaceError::EmptyInput);
  }

  let mut pairs = parse(trimmed)?;
  let program = pairs.next().ok_or(SurfaceError::EmptyInput)?;
  Ok(syntax::pair_to_expr(program))
}
