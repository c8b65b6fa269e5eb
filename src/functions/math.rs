//! Builtin numeric functions and named constants available to formulas.
//!
//! Evaluation is real-only: anything that would leave the reals
//! (`sqrt(-1)`, `log(-2)`, `asin(3)`, `(-8)^(1/3)`) produces NaN for that
//! sample instead of a complex number.

use std::f64::consts::{E, PI, TAU};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
  Sin,
  Cos,
  Tan,
  Cot,
  Sec,
  Csc,
  Asin,
  Acos,
  Atan,
  Atan2,
  Sinh,
  Cosh,
  Tanh,
  Asinh,
  Acosh,
  Atanh,
  Exp,
  Log,
  Log10,
  Log2,
  Sqrt,
  Cbrt,
  Abs,
  Sign,
  Floor,
  Ceiling,
  Round,
  Min,
  Max,
  Mod,
  Pow,
  Hypot,
}

/// Accepted argument counts, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
  pub min: usize,
  pub max: usize,
}

impl Arity {
  const fn exactly(n: usize) -> Self {
    Arity { min: n, max: n }
  }

  pub fn accepts(self, n: usize) -> bool {
    n >= self.min && n <= self.max
  }
}

impl std::fmt::Display for Arity {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    if self.min == self.max {
      write!(f, "{}", self.min)
    } else {
      write!(f, "{} to {}", self.min, self.max)
    }
  }
}

/// Function catalog as `(name, builtin)`; several spellings map to one
/// builtin so that both `abs(x)` and `Abs(x)` work.
const FUNCTIONS: &[(&str, Builtin)] = &[
  ("sin", Builtin::Sin),
  ("cos", Builtin::Cos),
  ("tan", Builtin::Tan),
  ("cot", Builtin::Cot),
  ("sec", Builtin::Sec),
  ("csc", Builtin::Csc),
  ("asin", Builtin::Asin),
  ("acos", Builtin::Acos),
  ("atan", Builtin::Atan),
  ("atan2", Builtin::Atan2),
  ("sinh", Builtin::Sinh),
  ("cosh", Builtin::Cosh),
  ("tanh", Builtin::Tanh),
  ("asinh", Builtin::Asinh),
  ("acosh", Builtin::Acosh),
  ("atanh", Builtin::Atanh),
  ("exp", Builtin::Exp),
  ("log", Builtin::Log),
  ("ln", Builtin::Log),
  ("log10", Builtin::Log10),
  ("log2", Builtin::Log2),
  ("sqrt", Builtin::Sqrt),
  ("cbrt", Builtin::Cbrt),
  ("abs", Builtin::Abs),
  ("Abs", Builtin::Abs),
  ("sign", Builtin::Sign),
  ("floor", Builtin::Floor),
  ("ceiling", Builtin::Ceiling),
  ("ceil", Builtin::Ceiling),
  ("round", Builtin::Round),
  ("Min", Builtin::Min),
  ("min", Builtin::Min),
  ("Max", Builtin::Max),
  ("max", Builtin::Max),
  ("Mod", Builtin::Mod),
  ("mod", Builtin::Mod),
  ("pow", Builtin::Pow),
  ("hypot", Builtin::Hypot),
];

/// Named constants seeded into every default symbol table.
pub const CONSTANTS: &[(&str, f64)] = &[
  ("pi", PI),
  ("E", E),
  ("e", E),
  ("tau", TAU),
  ("oo", f64::INFINITY),
  ("inf", f64::INFINITY),
];

pub fn lookup_function(name: &str) -> Option<Builtin> {
  FUNCTIONS
    .iter()
    .find(|(candidate, _)| *candidate == name)
    .map(|(_, builtin)| *builtin)
}

impl Builtin {
  pub fn arity(self) -> Arity {
    match self {
      Builtin::Log => Arity { min: 1, max: 2 },
      Builtin::Min | Builtin::Max => Arity {
        min: 1,
        max: usize::MAX,
      },
      Builtin::Atan2 | Builtin::Mod | Builtin::Pow | Builtin::Hypot => {
        Arity::exactly(2)
      }
      _ => Arity::exactly(1),
    }
  }

  /// Apply to already-evaluated arguments. Arity is checked at compile time.
  pub fn apply(self, args: &[f64]) -> f64 {
    let a = args.first().copied().unwrap_or(f64::NAN);
    let b = args.get(1).copied().unwrap_or(f64::NAN);
    match self {
      Builtin::Sin => a.sin(),
      Builtin::Cos => a.cos(),
      Builtin::Tan => a.tan(),
      Builtin::Cot => 1.0 / a.tan(),
      Builtin::Sec => 1.0 / a.cos(),
      Builtin::Csc => 1.0 / a.sin(),
      Builtin::Asin => a.asin(),
      Builtin::Acos => a.acos(),
      Builtin::Atan => a.atan(),
      Builtin::Atan2 => a.atan2(b),
      Builtin::Sinh => a.sinh(),
      Builtin::Cosh => a.cosh(),
      Builtin::Tanh => a.tanh(),
      Builtin::Asinh => a.asinh(),
      Builtin::Acosh => a.acosh(),
      Builtin::Atanh => a.atanh(),
      Builtin::Exp => a.exp(),
      // log(a, b) is the logarithm of a in base b
      Builtin::Log if args.len() == 2 => a.ln() / b.ln(),
      Builtin::Log => a.ln(),
      Builtin::Log10 => a.log10(),
      Builtin::Log2 => a.log2(),
      Builtin::Sqrt => a.sqrt(),
      Builtin::Cbrt => a.cbrt(),
      Builtin::Abs => a.abs(),
      Builtin::Sign => sign(a),
      Builtin::Floor => a.floor(),
      Builtin::Ceiling => a.ceil(),
      Builtin::Round => round_half_even(a),
      Builtin::Min => args.iter().copied().fold(f64::INFINITY, nan_min),
      Builtin::Max => args.iter().copied().fold(f64::NEG_INFINITY, nan_max),
      Builtin::Mod => floored_mod(a, b),
      Builtin::Pow => power(a, b),
      Builtin::Hypot => a.hypot(b),
    }
  }

  /// Whether the function maps every integer input it can accept on the
  /// real line to a value worth folding exactly (used by the simplifier).
  pub fn is_exact_on_integers(self) -> bool {
    matches!(
      self,
      Builtin::Abs
        | Builtin::Sign
        | Builtin::Floor
        | Builtin::Ceiling
        | Builtin::Round
        | Builtin::Min
        | Builtin::Max
        | Builtin::Mod
    )
  }
}

/// Real power. `powf` already yields NaN for a negative base with a
/// non-integer exponent, which is the real-only policy.
pub fn power(base: f64, exponent: f64) -> f64 {
  base.powf(exponent)
}

fn sign(a: f64) -> f64 {
  if a.is_nan() {
    f64::NAN
  } else if a > 0.0 {
    1.0
  } else if a < 0.0 {
    -1.0
  } else {
    0.0
  }
}

/// Banker's rounding (half-to-even)
fn round_half_even(f: f64) -> f64 {
  let base = f.trunc();
  let frac = f - base;
  let result = if frac.abs() == 0.5 {
    if base % 2.0 == 0.0 {
      base
    } else if f.is_sign_positive() {
      base + 1.0
    } else {
      base - 1.0
    }
  } else {
    f.round()
  };
  // Handle -0.0
  if result == 0.0 { 0.0 } else { result }
}

/// Modulo with the sign of the divisor.
fn floored_mod(a: f64, b: f64) -> f64 {
  a - b * (a / b).floor()
}

fn nan_min(acc: f64, v: f64) -> f64 {
  if acc.is_nan() || v.is_nan() {
    f64::NAN
  } else {
    acc.min(v)
  }
}

fn nan_max(acc: f64, v: f64) -> f64 {
  if acc.is_nan() || v.is_nan() {
    f64::NAN
  } else {
    acc.max(v)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aliases_resolve_to_one_builtin() {
    assert_eq!(lookup_function("ln"), Some(Builtin::Log));
    assert_eq!(lookup_function("Abs"), lookup_function("abs"));
    assert_eq!(lookup_function("frobnicate"), None);
  }

  #[test]
  fn leaving_the_reals_gives_nan() {
    assert!(Builtin::Sqrt.apply(&[-1.0]).is_nan());
    assert!(Builtin::Log.apply(&[-1.0]).is_nan());
    assert!(Builtin::Asin.apply(&[2.0]).is_nan());
    assert!(power(-8.0, 1.0 / 3.0).is_nan());
    assert_eq!(power(-2.0, 2.0), 4.0);
  }

  #[test]
  fn two_argument_log_uses_second_as_base() {
    assert!((Builtin::Log.apply(&[8.0, 2.0]) - 3.0).abs() < 1e-12);
  }

  #[test]
  fn mod_follows_divisor_sign() {
    assert_eq!(Builtin::Mod.apply(&[-1.0, 3.0]), 2.0);
    assert_eq!(Builtin::Mod.apply(&[7.0, 3.0]), 1.0);
  }

  #[test]
  fn round_is_half_to_even() {
    assert_eq!(Builtin::Round.apply(&[2.5]), 2.0);
    assert_eq!(Builtin::Round.apply(&[3.5]), 4.0);
    assert_eq!(Builtin::Round.apply(&[-0.4]), 0.0);
  }

  #[test]
  fn variadic_min_max() {
    assert_eq!(Builtin::Max.apply(&[1.0, 5.0, 3.0]), 5.0);
    assert_eq!(Builtin::Min.apply(&[1.0, -5.0, 3.0]), -5.0);
    assert!(Builtin::Max.arity().accepts(7));
    assert!(!Builtin::Sin.arity().accepts(2));
  }
}
