//! Display-only canonicalization of formulas.
//!
//! The simplifier never feeds the numeric evaluator; it only decides what
//! the typeset formula looks like when the user asks for a simplified view.
//!
//! Expressions are lowered into sums, products and powers, then
//! - numeric constants are folded with exact rational arithmetic,
//! - identities like `a + 0`, `a * 1`, `a * 0`, `a ^ 1`, `a ^ 0` vanish,
//! - like terms (`3x - x`) and like factors (`x^2 * x^3`) are collected,
//! - named constants (`pi`, `E`) stay symbolic.

use std::collections::HashMap;
use std::fmt;

use crate::functions::latex::expr_to_latex;
use crate::functions::math::lookup_function;
use crate::syntax::{expr_to_string, BinaryOperator, Expr, UnaryOperator};

const MAX_PASSES: usize = 8;

/// A formula ready for display, either as typed or simplified.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalForm {
  expr: Expr,
  simplified: bool,
}

impl CanonicalForm {
  pub fn expr(&self) -> &Expr {
    &self.expr
  }

  pub fn is_simplified(&self) -> bool {
    self.simplified
  }

  pub fn to_latex(&self) -> String {
    expr_to_latex(&self.expr)
  }
}

impl fmt::Display for CanonicalForm {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", expr_to_string(&self.expr))
  }
}

/// Return `expr` verbatim when `enabled` is false, otherwise its
/// simplified canonical form.
pub fn simplify(expr: &Expr, enabled: bool) -> CanonicalForm {
  if !enabled {
    return CanonicalForm {
      expr: expr.clone(),
      simplified: false,
    };
  }

  let mut term = Term::from_expr(expr);
  for _ in 0..MAX_PASSES {
    let next = term.simplify();
    if next == term {
      break;
    }
    term = next;
  }
  CanonicalForm {
    expr: term.to_expr(),
    simplified: true,
  }
}

// --- exact numbers ---

#[derive(Debug, Clone, Copy, PartialEq)]
enum Number {
  /// Numerator and positive denominator in lowest terms.
  Rational(i128, i128),
  Float(f64),
}

fn gcd(a: i128, b: i128) -> u128 {
  let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
  while b != 0 {
    let t = b;
    b = a % b;
    a = t;
  }
  a
}

impl Number {
  const ZERO: Number = Number::Rational(0, 1);
  const ONE: Number = Number::Rational(1, 1);

  /// `i128::MIN` has no positive counterpart and degrades to a float.
  fn rational(num: i128, den: i128) -> Number {
    if den == 0 {
      return Number::Float(num as f64 / 0.0);
    }
    if num == i128::MIN || den == i128::MIN {
      return Number::Float(num as f64 / den as f64);
    }
    // Both parts are at most i128::MAX in magnitude, so g fits.
    let g = gcd(num, den).max(1) as i128;
    let sign = if den < 0 { -1 } else { 1 };
    Number::Rational(sign * num / g, sign * den / g)
  }

  fn integer(n: i128) -> Number {
    Number::rational(n, 1)
  }

  fn to_f64(self) -> f64 {
    match self {
      Number::Rational(n, d) => n as f64 / d as f64,
      Number::Float(f) => f,
    }
  }

  fn as_integer(self) -> Option<i128> {
    match self {
      Number::Rational(n, 1) => Some(n),
      _ => None,
    }
  }

  fn is_zero(self) -> bool {
    self.to_f64() == 0.0
  }

  fn is_one(self) -> bool {
    self == Number::ONE || self == Number::Float(1.0)
  }

  fn is_negative(self) -> bool {
    self.to_f64() < 0.0
  }

  fn add(self, other: Number) -> Number {
    match (self, other) {
      (Number::Rational(a, b), Number::Rational(c, d)) => {
        let num = a
          .checked_mul(d)
          .and_then(|ad| c.checked_mul(b).and_then(|cb| ad.checked_add(cb)));
        match (num, b.checked_mul(d)) {
          (Some(n), Some(den)) => Number::rational(n, den),
          _ => Number::Float(self.to_f64() + other.to_f64()),
        }
      }
      _ => Number::Float(self.to_f64() + other.to_f64()),
    }
  }

  fn mul(self, other: Number) -> Number {
    match (self, other) {
      (Number::Rational(a, b), Number::Rational(c, d)) => {
        match (a.checked_mul(c), b.checked_mul(d)) {
          (Some(n), Some(den)) => Number::rational(n, den),
          _ => Number::Float(self.to_f64() * other.to_f64()),
        }
      }
      _ => Number::Float(self.to_f64() * other.to_f64()),
    }
  }

  fn neg(self) -> Number {
    match self {
      Number::Rational(n, d) => match n.checked_neg() {
        Some(n) => Number::rational(n, d),
        None => Number::Float(-(n as f64) / d as f64),
      },
      Number::Float(f) => Number::Float(-f),
    }
  }

  /// `self ^ exponent` when it stays exact (rational base, integer
  /// exponent, no overflow, no division by zero).
  fn pow_int(self, exponent: i128) -> Option<Number> {
    let Number::Rational(n, d) = self else {
      return None;
    };
    if n == 0 && exponent < 0 {
      return None;
    }
    let e = u32::try_from(exponent.unsigned_abs()).ok()?;
    let num = n.checked_pow(e)?;
    let den = d.checked_pow(e)?;
    if exponent < 0 {
      Some(Number::rational(den, num))
    } else {
      Some(Number::rational(num, den))
    }
  }

  /// Exact square root of a rational whose parts are perfect squares.
  fn exact_sqrt(self) -> Option<Number> {
    let Number::Rational(n, d) = self else {
      return None;
    };
    if n < 0 {
      return None;
    }
    let root = |v: i128| {
      let r = (v as f64).sqrt().round() as i128;
      (r.checked_mul(r) == Some(v)).then_some(r)
    };
    Some(Number::rational(root(n)?, root(d)?))
  }

  fn to_expr(self) -> Expr {
    match self {
      Number::Rational(n, 1) if n < 0 => Expr::negate(Expr::Integer(-n)),
      Number::Rational(n, 1) => Expr::Integer(n),
      Number::Rational(n, d) => {
        let fraction =
          Expr::binary(BinaryOperator::Divide, Expr::Integer(n.abs()), Expr::Integer(d));
        if n < 0 {
          Expr::negate(fraction)
        } else {
          fraction
        }
      }
      Number::Float(f) if f < 0.0 => Expr::negate(Expr::Real(-f)),
      Number::Float(f) => Expr::Real(f),
    }
  }
}

// --- canonical tree ---

#[derive(Debug, Clone, PartialEq)]
enum Term {
  Num(Number),
  Sym(String),
  Add(Vec<Term>),
  Mul(Vec<Term>),
  Pow(Box<Term>, Box<Term>),
  Call(String, Vec<Term>),
}

impl Term {
  fn from_expr(expr: &Expr) -> Term {
    match expr {
      Expr::Integer(n) => Term::Num(Number::integer(*n)),
      Expr::Real(f) => Term::Num(Number::Float(*f)),
      Expr::Identifier(name) => Term::Sym(name.clone()),
      Expr::UnaryOp {
        op: UnaryOperator::Plus,
        operand,
      } => Term::from_expr(operand),
      Expr::UnaryOp {
        op: UnaryOperator::Minus,
        operand,
      } => Term::Mul(vec![Term::Num(Number::ONE.neg()), Term::from_expr(operand)]),
      Expr::BinaryOp { op, left, right } => {
        let (l, r) = (Term::from_expr(left), Term::from_expr(right));
        match op {
          BinaryOperator::Plus => Term::Add(vec![l, r]),
          BinaryOperator::Minus => Term::Add(vec![
            l,
            Term::Mul(vec![Term::Num(Number::ONE.neg()), r]),
          ]),
          BinaryOperator::Times => Term::Mul(vec![l, r]),
          BinaryOperator::Divide => Term::Mul(vec![
            l,
            Term::Pow(Box::new(r), Box::new(Term::Num(Number::ONE.neg()))),
          ]),
          BinaryOperator::Power => Term::Pow(Box::new(l), Box::new(r)),
        }
      }
      Expr::FunctionCall { name, args } => {
        Term::Call(name.clone(), args.iter().map(Term::from_expr).collect())
      }
    }
  }

  /// Stable identity used to group like terms and order output.
  fn key(&self) -> String {
    expr_to_string(&self.to_expr())
  }

  fn as_number(&self) -> Option<Number> {
    match self {
      Term::Num(n) => Some(*n),
      _ => None,
    }
  }

  /// Polynomial degree estimate for ordering sums.
  fn degree(&self) -> f64 {
    match self {
      Term::Num(_) => 0.0,
      Term::Sym(_) | Term::Call(..) | Term::Add(_) => 1.0,
      Term::Pow(base, exp) => {
        base.degree() * exp.as_number().map_or(1.0, Number::to_f64)
      }
      Term::Mul(factors) => factors.iter().map(Term::degree).sum(),
    }
  }

  fn simplify(&self) -> Term {
    match self {
      Term::Num(_) | Term::Sym(_) => self.clone(),
      Term::Call(name, args) => {
        simplify_call(name, args.iter().map(Term::simplify).collect())
      }
      Term::Pow(base, exp) => simplify_pow(base.simplify(), exp.simplify()),
      Term::Mul(factors) => {
        simplify_mul(factors.iter().map(Term::simplify).collect())
      }
      Term::Add(terms) => simplify_add(terms.iter().map(Term::simplify).collect()),
    }
  }

  /// Split a product into its numeric coefficient and the rest.
  fn split_coefficient(self) -> (Number, Term) {
    match self {
      Term::Num(n) => (n, Term::Num(Number::ONE)),
      Term::Mul(mut factors) => match factors.first().and_then(Term::as_number) {
        Some(coefficient) => {
          factors.remove(0);
          let rest = if factors.len() == 1 {
            factors.remove(0)
          } else {
            Term::Mul(factors)
          };
          (coefficient, rest)
        }
        None => (Number::ONE, Term::Mul(factors)),
      },
      other => (Number::ONE, other),
    }
  }

  /// Split into base and exponent, treating bare factors as `f ^ 1`.
  fn split_power(self) -> (Term, Term) {
    match self {
      Term::Pow(base, exp) => (*base, *exp),
      other => (other, Term::Num(Number::ONE)),
    }
  }

  fn to_expr(&self) -> Expr {
    match self {
      Term::Num(n) => n.to_expr(),
      Term::Sym(name) => Expr::Identifier(name.clone()),
      Term::Call(name, args) => Expr::FunctionCall {
        name: name.clone(),
        args: args.iter().map(Term::to_expr).collect(),
      },
      Term::Pow(base, exp) => match exp.as_number() {
        Some(Number::Rational(1, 2)) => Expr::FunctionCall {
          name: "sqrt".to_string(),
          args: vec![base.to_expr()],
        },
        Some(n) if n.is_negative() => Expr::binary(
          BinaryOperator::Divide,
          Expr::Integer(1),
          Term::Pow(base.clone(), Box::new(Term::Num(n.neg()))).to_expr(),
        ),
        _ => Expr::binary(BinaryOperator::Power, base.to_expr(), exp.to_expr()),
      },
      Term::Mul(factors) => product_to_expr(factors),
      Term::Add(terms) => sum_to_expr(terms),
    }
  }
}

fn simplify_call(name: &str, args: Vec<Term>) -> Term {
  let numbers: Option<Vec<Number>> = args.iter().map(Term::as_number).collect();
  if let (Some(builtin), Some(numbers)) = (lookup_function(name), numbers) {
    let all_integers = numbers.iter().all(|n| n.as_integer().is_some());
    let values: Vec<f64> = numbers.iter().map(|n| n.to_f64()).collect();
    let result = builtin.apply(&values);
    // Fold only when the answer is an exact integer; sin(1) stays symbolic.
    let exact = result.is_finite()
      && result.fract() == 0.0
      && result.abs() < 9.0e15
      && (all_integers || builtin.is_exact_on_integers());
    if exact {
      return Term::Num(Number::integer(result as i128));
    }
  }
  Term::Call(name.to_string(), args)
}

fn simplify_pow(base: Term, exp: Term) -> Term {
  if let Some(e) = exp.as_number() {
    if e.is_zero() {
      return Term::Num(Number::ONE);
    }
    if e.is_one() {
      return base;
    }
  }
  if let Some(b) = base.as_number() {
    if b.is_one() {
      return Term::Num(Number::ONE);
    }
    if let Some(e) = exp.as_number() {
      if let Some(folded) = e.as_integer().and_then(|n| b.pow_int(n)) {
        return Term::Num(folded);
      }
      if e == Number::Rational(1, 2) {
        if let Some(root) = b.exact_sqrt() {
          return Term::Num(root);
        }
      }
    }
  }
  let integer_exp = exp.as_number().and_then(Number::as_integer).is_some();
  match base {
    // (a^b)^n = a^(b*n) for integer n
    Term::Pow(inner_base, inner_exp) if integer_exp => simplify_pow(
      *inner_base,
      simplify_mul(vec![*inner_exp, exp]),
    ),
    // (a*b)^n = a^n * b^n for integer n
    Term::Mul(factors) if integer_exp => simplify_mul(
      factors
        .into_iter()
        .map(|f| simplify_pow(f, exp.clone()))
        .collect(),
    ),
    other => Term::Pow(Box::new(other), Box::new(exp)),
  }
}

fn simplify_mul(factors: Vec<Term>) -> Term {
  let mut flat = Vec::new();
  for factor in factors {
    match factor {
      Term::Mul(inner) => flat.extend(inner),
      other => flat.push(other),
    }
  }

  let mut coefficient = Number::ONE;
  let mut order: Vec<String> = Vec::new();
  let mut groups: HashMap<String, (Term, Vec<Term>)> = HashMap::new();
  for factor in flat {
    if let Some(n) = factor.as_number() {
      coefficient = coefficient.mul(n);
      continue;
    }
    let (base, exp) = factor.split_power();
    let key = base.key();
    match groups.get_mut(&key) {
      Some((_, exps)) => exps.push(exp),
      None => {
        order.push(key.clone());
        groups.insert(key, (base, vec![exp]));
      }
    }
  }

  if coefficient.is_zero() {
    return Term::Num(Number::ZERO);
  }

  let mut rest = Vec::new();
  for key in order {
    let Some((base, exps)) = groups.remove(&key) else {
      continue;
    };
    let exp = if exps.len() == 1 {
      exps.into_iter().next().unwrap_or(Term::Num(Number::ONE))
    } else {
      simplify_add(exps)
    };
    let folded = match simplify_pow(base, exp) {
      Term::Mul(inner) => inner,
      other => vec![other],
    };
    for factor in folded {
      match factor {
        Term::Num(n) => coefficient = coefficient.mul(n),
        other => rest.push(other),
      }
    }
  }

  rest.sort_by_key(|t| (factor_rank(t), t.key()));
  match (rest.len(), coefficient.is_one()) {
    (0, _) => Term::Num(coefficient),
    (1, true) => rest.remove(0),
    (_, true) => Term::Mul(rest),
    _ => {
      let mut factors = vec![Term::Num(coefficient)];
      factors.extend(rest);
      Term::Mul(factors)
    }
  }
}

/// Symbols and their powers first, then calls, then sums.
fn factor_rank(term: &Term) -> u8 {
  match term {
    Term::Num(_) => 0,
    Term::Sym(_) => 1,
    Term::Pow(base, _) => factor_rank(base),
    Term::Call(..) => 2,
    Term::Add(_) => 3,
    Term::Mul(_) => 4,
  }
}

fn simplify_add(terms: Vec<Term>) -> Term {
  let mut flat = Vec::new();
  for term in terms {
    match term {
      Term::Add(inner) => flat.extend(inner),
      other => flat.push(other),
    }
  }

  let mut constant = Number::ZERO;
  let mut order: Vec<String> = Vec::new();
  let mut groups: HashMap<String, (Term, Number)> = HashMap::new();
  for term in flat {
    if let Some(n) = term.as_number() {
      constant = constant.add(n);
      continue;
    }
    let (coefficient, rest) = term.split_coefficient();
    let key = rest.key();
    match groups.get_mut(&key) {
      Some((_, sum)) => *sum = sum.add(coefficient),
      None => {
        order.push(key.clone());
        groups.insert(key, (rest, coefficient));
      }
    }
  }

  let mut collected: Vec<(f64, String, Term)> = Vec::new();
  for key in order {
    let Some((rest, coefficient)) = groups.remove(&key) else {
      continue;
    };
    if coefficient.is_zero() {
      continue;
    }
    let degree = rest.degree();
    let term = if coefficient.is_one() {
      rest
    } else {
      simplify_mul(vec![Term::Num(coefficient), rest])
    };
    collected.push((degree, key, term));
  }

  // Highest degree first, then by name; the constant goes last.
  collected.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
  let mut terms: Vec<Term> = collected.into_iter().map(|(_, _, t)| t).collect();
  if !constant.is_zero() {
    terms.push(Term::Num(constant));
  }

  match terms.len() {
    0 => Term::Num(Number::ZERO),
    1 => terms.remove(0),
    _ => Term::Add(terms),
  }
}

/// Whether a summand should be printed as a subtraction.
fn is_negative_term(term: &Term) -> bool {
  match term {
    Term::Num(n) => n.is_negative(),
    Term::Mul(factors) => factors
      .first()
      .and_then(Term::as_number)
      .is_some_and(Number::is_negative),
    _ => false,
  }
}

fn negated(term: &Term) -> Term {
  match term {
    Term::Num(n) => Term::Num(n.neg()),
    Term::Mul(factors) => {
      let mut factors = factors.clone();
      if let Some(Term::Num(n)) = factors.first_mut() {
        *n = n.neg();
      }
      simplify_mul(factors)
    }
    other => other.clone(),
  }
}

fn sum_to_expr(terms: &[Term]) -> Expr {
  let mut iter = terms.iter();
  let Some(first) = iter.next() else {
    return Expr::Integer(0);
  };
  let mut acc = first.to_expr();
  for term in iter {
    acc = if is_negative_term(term) {
      Expr::binary(BinaryOperator::Minus, acc, negated(term).to_expr())
    } else {
      Expr::binary(BinaryOperator::Plus, acc, term.to_expr())
    };
  }
  acc
}

fn product_to_expr(factors: &[Term]) -> Expr {
  let mut coefficient = Number::ONE;
  let mut numerator: Vec<Expr> = Vec::new();
  let mut denominator: Vec<Expr> = Vec::new();

  for factor in factors {
    match factor {
      Term::Num(n) => coefficient = coefficient.mul(*n),
      Term::Pow(base, exp) => match exp.as_number() {
        Some(e) if e.is_negative() => {
          denominator.push(simplify_pow((**base).clone(), Term::Num(e.neg())).to_expr())
        }
        _ => numerator.push(factor.to_expr()),
      },
      other => numerator.push(other.to_expr()),
    }
  }

  let negative = coefficient.is_negative();
  let magnitude = if negative { coefficient.neg() } else { coefficient };
  match magnitude {
    Number::Rational(n, d) => {
      if n != 1 {
        numerator.insert(0, Expr::Integer(n));
      }
      if d != 1 {
        denominator.insert(0, Expr::Integer(d));
      }
    }
    Number::Float(f) => {
      if f != 1.0 {
        numerator.insert(0, Expr::Real(f));
      }
    }
  }

  let times = |parts: Vec<Expr>| {
    parts
      .into_iter()
      .reduce(|acc, e| Expr::binary(BinaryOperator::Times, acc, e))
  };
  if numerator.is_empty() {
    numerator.push(Expr::Integer(1));
  }
  if negative {
    numerator[0] = Expr::negate(numerator[0].clone());
  }
  let num = times(numerator).unwrap_or(Expr::Integer(1));
  match times(denominator) {
    Some(den) => Expr::binary(BinaryOperator::Divide, num, den),
    None => num,
  }
}
