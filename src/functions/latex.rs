//! LaTeX rendering of formulas for the typesetting host.

use crate::syntax::{format_real, BinaryOperator, Expr, UnaryOperator};

const GREEK: &[&str] = &[
  "alpha", "beta", "gamma", "delta", "epsilon", "zeta", "eta", "theta",
  "iota", "kappa", "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau",
  "upsilon", "phi", "chi", "psi", "omega", "Gamma", "Delta", "Theta",
  "Lambda", "Xi", "Pi", "Sigma", "Upsilon", "Phi", "Psi", "Omega",
];

/// Functions with a dedicated LaTeX command.
const NAMED_OPERATORS: &[&str] = &[
  "sin", "cos", "tan", "cot", "sec", "csc", "sinh", "cosh", "tanh", "log",
  "exp",
];

pub fn expr_to_latex(expr: &Expr) -> String {
  match expr {
    Expr::Integer(n) => n.to_string(),
    Expr::Real(f) if f.is_infinite() => {
      if *f > 0.0 { "\\infty" } else { "-\\infty" }.to_string()
    }
    Expr::Real(f) if f.is_nan() => "\\mathrm{NaN}".to_string(),
    Expr::Real(f) => format_real(*f),
    Expr::Identifier(name) => identifier_to_latex(name),
    Expr::UnaryOp { op, operand } => {
      let sign = match op {
        UnaryOperator::Minus => "-",
        UnaryOperator::Plus => "+",
      };
      format!("{}{}", sign, wrap(operand, expr.precedence(), false))
    }
    Expr::BinaryOp { op, left, right } => binary_to_latex(*op, left, right),
    Expr::FunctionCall { name, args } => call_to_latex(name, args),
  }
}

fn identifier_to_latex(name: &str) -> String {
  match name {
    "oo" | "inf" => "\\infty".to_string(),
    "E" => "e".to_string(),
    _ if GREEK.contains(&name) => format!("\\{}", name),
    _ if name.chars().count() > 1 => format!("\\mathit{{{}}}", name),
    _ => name.to_string(),
  }
}

fn binary_to_latex(op: BinaryOperator, left: &Expr, right: &Expr) -> String {
  let prec = op.precedence();
  match op {
    BinaryOperator::Plus => {
      format!("{} + {}", wrap(left, prec, false), wrap(right, prec, false))
    }
    BinaryOperator::Minus => {
      format!("{} - {}", wrap(left, prec, false), wrap(right, prec, true))
    }
    BinaryOperator::Times => {
      let lhs = wrap(left, prec, false);
      let rhs = wrap(right, prec, false);
      // Juxtaposed digits or signs would read as one number.
      if rhs.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+')
      {
        format!("{} \\cdot {}", lhs, rhs)
      } else {
        format!("{} {}", lhs, rhs)
      }
    }
    BinaryOperator::Divide => format!(
      "\\frac{{{}}}{{{}}}",
      expr_to_latex(left),
      expr_to_latex(right)
    ),
    BinaryOperator::Power => {
      let base = match left {
        Expr::Identifier(name) if name == "E" => "e".to_string(),
        _ => wrap(left, prec, true),
      };
      format!("{}^{{{}}}", base, expr_to_latex(right))
    }
  }
}

fn call_to_latex(name: &str, args: &[Expr]) -> String {
  let rendered: Vec<String> = args.iter().map(expr_to_latex).collect();
  let single = |template: fn(&str) -> String| match rendered.as_slice() {
    [only] => Some(template(only)),
    _ => None,
  };

  let special = match name {
    "sqrt" => single(|a| format!("\\sqrt{{{}}}", a)),
    "cbrt" => single(|a| format!("\\sqrt[3]{{{}}}", a)),
    "abs" | "Abs" => single(|a| format!("\\left|{}\\right|", a)),
    "floor" => single(|a| format!("\\left\\lfloor{{{}}}\\right\\rfloor", a)),
    "ceil" | "ceiling" => {
      single(|a| format!("\\left\\lceil{{{}}}\\right\\rceil", a))
    }
    "exp" => single(|a| format!("e^{{{}}}", a)),
    "log" | "ln" if rendered.len() == 2 => Some(format!(
      "\\log_{{{}}}{{\\left({} \\right)}}",
      rendered[1], rendered[0]
    )),
    "log10" => single(|a| format!("\\log_{{10}}{{\\left({} \\right)}}", a)),
    "log2" => single(|a| format!("\\log_{{2}}{{\\left({} \\right)}}", a)),
    _ => None,
  };
  if let Some(latex) = special {
    return latex;
  }

  let command = match name {
    "ln" => "\\log".to_string(),
    "asin" => "\\operatorname{asin}".to_string(),
    "acos" => "\\operatorname{acos}".to_string(),
    "atan" => "\\operatorname{atan}".to_string(),
    _ if NAMED_OPERATORS.contains(&name) => format!("\\{}", name),
    _ => format!("\\operatorname{{{}}}", name),
  };
  format!("{}{{\\left({} \\right)}}", command, rendered.join(", "))
}

/// Parenthesize with `\left( \right)` when `operand` binds looser than its
/// parent.
fn wrap(operand: &Expr, parent: u8, strict: bool) -> String {
  let inner = expr_to_latex(operand);
  let prec = operand.precedence();
  if prec < parent || (strict && prec == parent) {
    format!("\\left({}\\right)", inner)
  } else {
    inner
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::parse_expression;

  fn latex(text: &str) -> String {
    expr_to_latex(&parse_expression(text).unwrap())
  }

  #[test]
  fn fractions_and_powers() {
    assert_eq!(latex("1/x"), "\\frac{1}{x}");
    assert_eq!(latex("x^2 + y^2"), "x^{2} + y^{2}");
    assert_eq!(latex("(x + 1)^2"), "\\left(x + 1\\right)^{2}");
  }

  #[test]
  fn products_use_cdot_before_numbers() {
    assert_eq!(latex("x*y"), "x y");
    assert_eq!(latex("2*3"), "2 \\cdot 3");
    assert_eq!(latex("(x - y)*(x + y)"), "\\left(x - y\\right) \\left(x + y\\right)");
  }

  #[test]
  fn named_functions() {
    assert_eq!(latex("sin(x)"), "\\sin{\\left(x \\right)}");
    assert_eq!(latex("sqrt(x)"), "\\sqrt{x}");
    assert_eq!(latex("abs(y)"), "\\left|y\\right|");
    assert_eq!(latex("exp(x*y)"), "e^{x y}");
    assert_eq!(latex("log(x, 2)"), "\\log_{2}{\\left(x \\right)}");
    assert_eq!(latex("atan2(y, x)"), "\\operatorname{atan2}{\\left(y, x \\right)}");
  }

  #[test]
  fn symbols() {
    assert_eq!(latex("pi*x"), "\\pi x");
    assert_eq!(latex("E^x"), "e^{x}");
    assert_eq!(latex("theta"), "\\theta");
    assert_eq!(latex("-x"), "-x");
  }
}
