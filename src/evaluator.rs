use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument};

use crate::functions::grid::{Field, SampleGrid};
use crate::functions::math::{self, Builtin};
use crate::syntax::{BinaryOperator, Expr, UnaryOperator};
use crate::{parse_expression, SurfaceError};

/// Coordinates of the validity probe.
pub const PROBE_POINT: (f64, f64) = (1.0, 1.0);

/// What an identifier in a formula refers to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Symbol {
  X,
  Y,
  Constant(f64),
  /// Known symbol name without a numeric value (`z`, `theta`, ...).
  Reserved,
}

/// Names visible to the expression engine. Passed explicitly to every
/// compile and validation call.
#[derive(Debug, Clone)]
pub struct SymbolTable {
  x_name: String,
  y_name: String,
  constants: HashMap<String, f64>,
  reserved: HashSet<String>,
}

const RESERVED: &[&str] = &[
  "z", "r", "theta", "phi", "rho", "i", "j", "k", "u", "v", "w",
];

impl Default for SymbolTable {
  fn default() -> Self {
    Self::with_variables("x", "y")
  }
}

impl SymbolTable {
  pub fn with_variables(x_name: &str, y_name: &str) -> Self {
    let constants = math::CONSTANTS
      .iter()
      .map(|(name, value)| (name.to_string(), *value))
      .collect();
    let reserved = RESERVED
      .iter()
      .filter(|name| **name != x_name && **name != y_name)
      .map(|name| name.to_string())
      .collect();
    SymbolTable {
      x_name: x_name.to_string(),
      y_name: y_name.to_string(),
      constants,
      reserved,
    }
  }

  pub fn resolve(&self, name: &str) -> Option<Symbol> {
    if name == self.x_name {
      Some(Symbol::X)
    } else if name == self.y_name {
      Some(Symbol::Y)
    } else if let Some(value) = self.constants.get(name) {
      Some(Symbol::Constant(*value))
    } else if self.reserved.contains(name) {
      Some(Symbol::Reserved)
    } else {
      None
    }
  }
}

/// Instruction tree produced by [`compile`]. Every name is resolved and
/// every call is arity-checked, so evaluation cannot fail.
#[derive(Debug, Clone, PartialEq)]
enum Compiled {
  Const(f64),
  X,
  Y,
  Neg(Box<Compiled>),
  Binary(BinaryOperator, Box<Compiled>, Box<Compiled>),
  Call(Builtin, Vec<Compiled>),
}

impl Compiled {
  fn eval(&self, x: f64, y: f64) -> f64 {
    match self {
      Compiled::Const(v) => *v,
      Compiled::X => x,
      Compiled::Y => y,
      Compiled::Neg(inner) => -inner.eval(x, y),
      Compiled::Binary(op, lhs, rhs) => {
        apply_binary(*op, lhs.eval(x, y), rhs.eval(x, y))
      }
      Compiled::Call(builtin, args) => {
        let values: Vec<f64> = args.iter().map(|a| a.eval(x, y)).collect();
        builtin.apply(&values)
      }
    }
  }

  fn as_const(&self) -> Option<f64> {
    match self {
      Compiled::Const(v) => Some(*v),
      _ => None,
    }
  }
}

fn apply_binary(op: BinaryOperator, a: f64, b: f64) -> f64 {
  match op {
    BinaryOperator::Plus => a + b,
    BinaryOperator::Minus => a - b,
    BinaryOperator::Times => a * b,
    BinaryOperator::Divide => a / b,
    BinaryOperator::Power => math::power(a, b),
  }
}

/// Result of evaluating over coordinate arrays. Constant formulas yield a
/// scalar that must be broadcast to the grid shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
  Scalar(f64),
  Array(Vec<f64>),
}

impl Evaluated {
  pub fn broadcast(self, shape: (usize, usize)) -> Result<Field, SurfaceError> {
    match self {
      Evaluated::Scalar(v) => Ok(Field::filled(shape, v)),
      Evaluated::Array(values) => Field::new(shape, values),
    }
  }
}

/// Compiled, side-effect-free evaluator for one formula.
#[derive(Debug, Clone)]
pub struct NumericFunction {
  source: String,
  expr: Expr,
  code: Compiled,
}

impl NumericFunction {
  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn expr(&self) -> &Expr {
    &self.expr
  }

  /// True when the formula references neither free variable.
  pub fn is_constant(&self) -> bool {
    self.code.as_const().is_some()
  }

  pub fn eval_point(&self, x: f64, y: f64) -> f64 {
    self.code.eval(x, y)
  }

  /// Elementwise evaluation over two equal-length coordinate arrays.
  pub fn eval(&self, xs: &[f64], ys: &[f64]) -> Result<Evaluated, SurfaceError> {
    if xs.len() != ys.len() {
      return Err(SurfaceError::ShapeMismatch {
        expected: (xs.len(), 1),
        found: (ys.len(), 1),
      });
    }
    if let Some(v) = self.code.as_const() {
      return Ok(Evaluated::Scalar(v));
    }
    Ok(Evaluated::Array(
      xs.iter()
        .zip(ys)
        .map(|(&x, &y)| self.code.eval(x, y))
        .collect(),
    ))
  }

  /// Evaluate over a grid, broadcasting constants to the grid shape.
  pub fn eval_grid(&self, grid: &SampleGrid) -> Result<Field, SurfaceError> {
    self
      .eval(grid.x().values(), grid.y().values())?
      .broadcast(grid.shape())
  }
}

/// Compile a parsed formula against `symbols`.
#[instrument(level = "debug", skip_all)]
pub fn compile(
  expr: &Expr,
  symbols: &SymbolTable,
) -> Result<NumericFunction, SurfaceError> {
  compile_source(expr, symbols, crate::syntax::expr_to_string(expr))
}

fn compile_source(
  expr: &Expr,
  symbols: &SymbolTable,
  source: String,
) -> Result<NumericFunction, SurfaceError> {
  let code = compile_node(expr, symbols)?;
  debug!(%source, constant = code.as_const().is_some(), "compiled expression");
  Ok(NumericFunction {
    source,
    expr: expr.clone(),
    code,
  })
}

fn compile_node(
  expr: &Expr,
  symbols: &SymbolTable,
) -> Result<Compiled, SurfaceError> {
  let node = match expr {
    Expr::Integer(n) => Compiled::Const(*n as f64),
    Expr::Real(f) => Compiled::Const(*f),
    Expr::Identifier(name) => match symbols.resolve(name) {
      Some(Symbol::X) => Compiled::X,
      Some(Symbol::Y) => Compiled::Y,
      Some(Symbol::Constant(v)) => Compiled::Const(v),
      Some(Symbol::Reserved) => {
        return Err(SurfaceError::ValidationFailure(format!(
          "symbol '{name}' has no numeric value"
        )));
      }
      None => {
        return Err(SurfaceError::ValidationFailure(format!(
          "unknown symbol '{name}'"
        )));
      }
    },
    Expr::UnaryOp { op, operand } => {
      let inner = compile_node(operand, symbols)?;
      match (op, inner.as_const()) {
        (UnaryOperator::Plus, _) => inner,
        (UnaryOperator::Minus, Some(v)) => Compiled::Const(-v),
        (UnaryOperator::Minus, None) => Compiled::Neg(Box::new(inner)),
      }
    }
    Expr::BinaryOp { op, left, right } => {
      let lhs = compile_node(left, symbols)?;
      let rhs = compile_node(right, symbols)?;
      match (lhs.as_const(), rhs.as_const()) {
        (Some(a), Some(b)) => Compiled::Const(apply_binary(*op, a, b)),
        _ => Compiled::Binary(*op, Box::new(lhs), Box::new(rhs)),
      }
    }
    Expr::FunctionCall { name, args } => {
      let builtin = math::lookup_function(name).ok_or_else(|| {
        SurfaceError::ValidationFailure(format!("unknown function '{name}'"))
      })?;
      let arity = builtin.arity();
      if !arity.accepts(args.len()) {
        return Err(SurfaceError::ValidationFailure(format!(
          "{name} expects {arity} argument(s), got {}",
          args.len()
        )));
      }
      let compiled = args
        .iter()
        .map(|a| compile_node(a, symbols))
        .collect::<Result<Vec<_>, _>>()?;
      let consts: Option<Vec<f64>> =
        compiled.iter().map(Compiled::as_const).collect();
      match consts {
        Some(values) => Compiled::Const(builtin.apply(&values)),
        None => Compiled::Call(builtin, compiled),
      }
    }
  };
  Ok(node)
}

/// Single evaluation at [`PROBE_POINT`]; returns the value when finite.
pub fn probe(
  function: &NumericFunction,
) -> Result<f64, SurfaceError> {
  let (x, y) = PROBE_POINT;
  let value = function.eval_point(x, y);
  if value.is_finite() {
    Ok(value)
  } else {
    Err(SurfaceError::ValidationFailure(format!(
      "probe at ({x}, {y}) gave {}",
      crate::syntax::format_real(value)
    )))
  }
}

/// Cheap correctness gate: compiles and probes once. A valid formula may
/// still be undefined elsewhere on the grid.
pub fn validate(expr: &Expr, symbols: &SymbolTable) -> bool {
  compile(expr, symbols)
    .and_then(|f| probe(&f))
    .is_ok()
}

/// Outcome of validating raw user text.
#[derive(Debug, Clone, PartialEq)]
pub enum Validity {
  /// Blank text: the "no expression" state.
  Empty,
  Invalid(String),
  Valid(Expr),
}

impl Validity {
  pub fn is_valid(&self) -> bool {
    matches!(self, Validity::Valid(_))
  }
}

/// Parse, compile and probe `text`. Never panics, never returns an error:
/// failures are folded into [`Validity::Invalid`].
pub fn validate_text(text: &str, symbols: &SymbolTable) -> Validity {
  let expr = match parse_expression(text) {
    Ok(expr) => expr,
    Err(SurfaceError::EmptyInput) => return Validity::Empty,
    Err(err) => return Validity::Invalid(err.to_string()),
  };
  match compile(&expr, symbols).and_then(|f| probe(&f)) {
    Ok(_) => Validity::Valid(expr),
    Err(err) => Validity::Invalid(err.to_string()),
  }
}

/// Compile `text` from scratch: parse, compile, probe.
pub fn compile_text(
  text: &str,
  symbols: &SymbolTable,
) -> Result<NumericFunction, SurfaceError> {
  let expr = parse_expression(text)?;
  let function = compile_source(&expr, symbols, text.trim().to_string())?;
  probe(&function)?;
  Ok(function)
}

/// Keeps the last compiled function and recompiles only when the source
/// text changes.
#[derive(Debug, Clone, Default)]
pub struct ExpressionCache {
  entry: Option<NumericFunction>,
  compilations: usize,
}

impl ExpressionCache {
  pub fn get_or_compile(
    &mut self,
    text: &str,
    symbols: &SymbolTable,
  ) -> Result<&NumericFunction, SurfaceError> {
    let stale = match &self.entry {
      Some(f) => f.source() != text.trim(),
      None => true,
    };
    if stale {
      let function = compile_text(text, symbols)?;
      self.compilations += 1;
      self.entry = Some(function);
    }
    match &self.entry {
      Some(f) => Ok(f),
      None => Err(SurfaceError::EmptyInput),
    }
  }

  /// Number of actual compilations performed.
  pub fn compilations(&self) -> usize {
    self.compilations
  }
}
