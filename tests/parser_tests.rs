use supercalc::parse;

#[cfg(test)]
mod tests {
  use supercalc::syntax::expr_to_string;
  use supercalc::{parse_expression, Rule, SurfaceError};

  use super::*;

  #[test]
  fn test_parse_calculation() {
    let pair = parse("1 + 2").unwrap().next().unwrap();
    assert_eq!(pair.as_rule(), Rule::Program);
  }

  #[test]
  fn test_parse_two_variables() {
    let pair = parse("x^2 + y^2").unwrap().next().unwrap();
    assert_eq!(pair.as_rule(), Rule::Program);
  }

  #[test]
  fn test_parse_function_call() {
    let pair = parse("atan2(y, x) * exp(-x)").unwrap().next().unwrap();
    assert_eq!(pair.as_rule(), Rule::Program);
  }

  #[test]
  fn test_parse_nested_parentheses() {
    assert!(parse("((x + 1) * (y - 1)) / 2").is_ok());
  }

  #[test]
  fn test_rejects_incomplete_input() {
    assert!(parse("x +").is_err());
    assert!(parse("sin(x").is_err());
    assert!(parse("2 3").is_err());
    assert!(parse("x ^").is_err());
  }

  #[test]
  fn test_blank_input_is_empty() {
    assert!(matches!(parse_expression(" \t\n"), Err(SurfaceError::EmptyInput)));
    assert!(matches!(parse_expression("*"), Err(SurfaceError::Parse(_))));
  }

  #[test]
  fn test_precedence_round_trip() {
    for text in ["x + y*2", "(x + y)*2", "-x^2", "x/(y*2)", "x - (y - 1)"] {
      let expr = parse_expression(text).unwrap();
      assert_eq!(expr_to_string(&expr), text);
    }
  }
}
