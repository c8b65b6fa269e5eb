use pest::iterators::Pair;

use crate::Rule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
  Plus,
  Minus,
  Times,
  Divide,
  Power,
}

impl BinaryOperator {
  /// Binding strength, higher binds tighter.
  pub fn precedence(self) -> u8 {
    match self {
      BinaryOperator::Plus | BinaryOperator::Minus => 1,
      BinaryOperator::Times | BinaryOperator::Divide => 2,
      BinaryOperator::Power => 4,
    }
  }

  pub fn symbol(self) -> &'static str {
    match self {
      BinaryOperator::Plus => "+",
      BinaryOperator::Minus => "-",
      BinaryOperator::Times => "*",
      BinaryOperator::Divide => "/",
      BinaryOperator::Power => "^",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
  Minus,
  Plus,
}

/// Precedence of a prefix sign: looser than `^`, tighter than `*`.
pub const UNARY_PRECEDENCE: u8 = 3;

/// Parsed formula. Immutable once built by [`crate::parse_expression`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Integer(i128),
  Real(f64),
  Identifier(String),
  UnaryOp {
    op: UnaryOperator,
    operand: Box<Expr>,
  },
  BinaryOp {
    op: BinaryOperator,
    left: Box<Expr>,
    right: Box<Expr>,
  },
  FunctionCall {
    name: String,
    args: Vec<Expr>,
  },
}

impl Expr {
  pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp {
      op,
      left: Box::new(left),
      right: Box::new(right),
    }
  }

  pub fn negate(operand: Expr) -> Expr {
    Expr::UnaryOp {
      op: UnaryOperator::Minus,
      operand: Box::new(operand),
    }
  }

  /// Numeric value of a literal node, if it is one.
  pub fn as_number(&self) -> Option<f64> {
    match self {
      Expr::Integer(n) => Some(*n as f64),
      Expr::Real(f) => Some(*f),
      _ => None,
    }
  }

  /// Names of every identifier referenced, in first-seen order.
  pub fn identifiers(&self) -> Vec<&str> {
    let mut names = Vec::new();
    collect_identifiers(self, &mut names);
    names
  }

  /// Precedence of the outermost node, atoms bind tightest.
  pub fn precedence(&self) -> u8 {
    match self {
      Expr::BinaryOp { op, .. } => op.precedence(),
      Expr::UnaryOp { .. } => UNARY_PRECEDENCE,
      Expr::Integer(n) if *n < 0 => UNARY_PRECEDENCE,
      Expr::Real(f) if *f < 0.0 => UNARY_PRECEDENCE,
      _ => 5,
    }
  }
}

fn collect_identifiers<'a>(expr: &'a Expr, names: &mut Vec<&'a str>) {
  match expr {
    Expr::Identifier(name) => {
      if !names.contains(&name.as_str()) {
        names.push(name);
      }
    }
    Expr::UnaryOp { operand, .. } => collect_identifiers(operand, names),
    Expr::BinaryOp { left, right, .. } => {
      collect_identifiers(left, names);
      collect_identifiers(right, names);
    }
    Expr::FunctionCall { args, .. } => {
      for arg in args {
        collect_identifiers(arg, names);
      }
    }
    Expr::Integer(_) | Expr::Real(_) => {}
  }
}

/// Convert a parse tree produced by the grammar into an [`Expr`].
pub fn pair_to_expr(pair: Pair<Rule>) -> Expr {
  match pair.as_rule() {
    Rule::Program => {
      let inner = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::Expression);
      match inner {
        Some(expression) => pair_to_expr(expression),
        None => unreachable!("Program always wraps one Expression"),
      }
    }
    Rule::Expression | Rule::Term => {
      let mut inner = pair.into_inner();
      let mut acc = match inner.next() {
        Some(first) => pair_to_expr(first),
        None => unreachable!("Expression and Term have a first operand"),
      };
      while let (Some(op_pair), Some(rhs)) = (inner.next(), inner.next()) {
        let op = match op_pair.as_str() {
          "+" => BinaryOperator::Plus,
          "-" => BinaryOperator::Minus,
          "*" => BinaryOperator::Times,
          "/" => BinaryOperator::Divide,
          other => unreachable!("unexpected operator {other}"),
        };
        acc = Expr::binary(op, acc, pair_to_expr(rhs));
      }
      acc
    }
    Rule::Unary => {
      let mut inner = pair.into_inner();
      let first = match inner.next() {
        Some(p) => p,
        None => unreachable!("Unary has at least one child"),
      };
      if first.as_rule() == Rule::Sign {
        let op = if first.as_str() == "-" {
          UnaryOperator::Minus
        } else {
          UnaryOperator::Plus
        };
        let operand = match inner.next() {
          Some(p) => pair_to_expr(p),
          None => unreachable!("Sign is followed by an operand"),
        };
        Expr::UnaryOp {
          op,
          operand: Box::new(operand),
        }
      } else {
        pair_to_expr(first)
      }
    }
    Rule::Power => {
      let mut inner = pair.into_inner();
      let base = match inner.next() {
        Some(p) => pair_to_expr(p),
        None => unreachable!("Power has a base"),
      };
      // inner is now either empty or [PowOp, Unary]
      match (inner.next(), inner.next()) {
        (Some(_), Some(exponent)) => {
          Expr::binary(BinaryOperator::Power, base, pair_to_expr(exponent))
        }
        _ => base,
      }
    }
    Rule::FunctionCall => {
      let mut inner = pair.into_inner();
      let name = match inner.next() {
        Some(p) => p.as_str().to_string(),
        None => unreachable!("FunctionCall starts with its name"),
      };
      let args = inner.map(pair_to_expr).collect();
      Expr::FunctionCall { name, args }
    }
    Rule::Identifier => Expr::Identifier(pair.as_str().to_string()),
    Rule::Number => parse_number(pair.as_str()),
    other => unreachable!("rule {other:?} is never converted directly"),
  }
}

fn parse_number(text: &str) -> Expr {
  let is_integer = text.chars().all(|c| c.is_ascii_digit());
  if is_integer {
    if let Ok(n) = text.parse::<i128>() {
      return Expr::Integer(n);
    }
  }
  // The grammar only admits valid float literals.
  Expr::Real(text.parse::<f64>().unwrap_or(f64::NAN))
}

/// Format a floating-point number for display.
pub fn format_real(f: f64) -> String {
  if f.is_nan() {
    "nan".to_string()
  } else if f.is_infinite() {
    if f > 0.0 { "oo" } else { "-oo" }.to_string()
  } else if f.fract() == 0.0 && f.abs() < 1e15 {
    format!("{:.1}", f)
  } else {
    format!("{}", f)
  }
}

/// Plain-text rendering with minimal parentheses.
pub fn expr_to_string(expr: &Expr) -> String {
  match expr {
    Expr::Integer(n) => n.to_string(),
    Expr::Real(f) => format_real(*f),
    Expr::Identifier(name) => name.clone(),
    Expr::UnaryOp { op, operand } => {
      let sign = match op {
        UnaryOperator::Minus => "-",
        UnaryOperator::Plus => "+",
      };
      format!("{}{}", sign, wrap_operand(operand, UNARY_PRECEDENCE, false))
    }
    Expr::BinaryOp { op, left, right } => {
      let prec = op.precedence();
      let right_assoc = *op == BinaryOperator::Power;
      let lhs = wrap_operand(left, prec, right_assoc);
      let rhs = wrap_operand(right, prec, !right_assoc);
      match op {
        BinaryOperator::Plus | BinaryOperator::Minus => {
          format!("{} {} {}", lhs, op.symbol(), rhs)
        }
        _ => format!("{}{}{}", lhs, op.symbol(), rhs),
      }
    }
    Expr::FunctionCall { name, args } => {
      let parts: Vec<String> = args.iter().map(expr_to_string).collect();
      format!("{}({})", name, parts.join(", "))
    }
  }
}

/// Parenthesize `operand` when it binds looser than its parent, or equally
/// loose on the non-associative side.
fn wrap_operand(operand: &Expr, parent: u8, strict: bool) -> String {
  let inner = expr_to_string(operand);
  let prec = operand.precedence();
  if prec < parent || (strict && prec == parent) {
    format!("({})", inner)
  } else {
    inner
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse_expression;

  #[test]
  fn power_binds_tighter_than_negation() {
    let expr = parse_expression("-x^2").unwrap();
    assert_eq!(
      expr,
      Expr::negate(Expr::binary(
        BinaryOperator::Power,
        Expr::Identifier("x".into()),
        Expr::Integer(2)
      ))
    );
  }

  #[test]
  fn power_is_right_associative() {
    let expr = parse_expression("2^3^2").unwrap();
    assert_eq!(expr_to_string(&expr), "2^3^2");
    match expr {
      Expr::BinaryOp { right, .. } => {
        assert!(matches!(*right, Expr::BinaryOp { .. }))
      }
      other => panic!("unexpected {other:?}"),
    }
  }

  #[test]
  fn double_star_is_power() {
    assert_eq!(
      parse_expression("x**2").unwrap(),
      parse_expression("x^2").unwrap()
    );
  }

  #[test]
  fn subtraction_keeps_grouping() {
    let expr = parse_expression("x - (y - 1)").unwrap();
    assert_eq!(expr_to_string(&expr), "x - (y - 1)");
  }

  #[test]
  fn identifiers_in_order() {
    let expr = parse_expression("y*sin(x) + y").unwrap();
    assert_eq!(expr.identifiers(), vec!["y", "x"]);
  }

  #[test]
  fn scientific_literals_are_reals() {
    assert_eq!(parse_expression("1.5e3").unwrap(), Expr::Real(1500.0));
    assert_eq!(parse_expression("42").unwrap(), Expr::Integer(42));
  }
}
