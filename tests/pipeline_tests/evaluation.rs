use super::*;

mod sampling {
  use super::*;

  fn corner_and_center(text: &str) -> (f64, f64) {
    let grid = build_grid(5.0, 5.0, 2);
    let field = function(text).eval_grid(&grid).unwrap();
    (field.get(0, 0).unwrap(), field.get(2, 2).unwrap())
  }

  #[test]
  fn sum() {
    assert_eq!(corner_and_center("x + y"), (-10.0, 0.0));
  }

  #[test]
  fn product() {
    assert_eq!(corner_and_center("x*y"), (25.0, 0.0));
  }

  #[test]
  fn paraboloid() {
    assert_eq!(corner_and_center("x^2 + y^2"), (50.0, 0.0));
  }

  #[test]
  fn constants_broadcast_to_grid_shape() {
    let grid = build_grid(5.0, 5.0, 3);
    let field = function("2*pi").eval_grid(&grid).unwrap();
    assert_eq!(field.shape(), (7, 7));
    assert!(field
      .values()
      .iter()
      .all(|&v| v == 2.0 * std::f64::consts::PI));
  }

  #[test]
  fn reciprocal_blows_up_on_the_x_zero_line() {
    let grid = build_grid(5.0, 5.0, 2);
    let field = function("1/x").eval_grid(&grid).unwrap();
    for col in 0..5 {
      assert!(field.get(2, col).unwrap().is_infinite());
    }
    assert!(field.get(1, 0).unwrap().is_finite());
  }

  #[test]
  fn out_of_domain_is_nan() {
    let grid = build_grid(5.0, 5.0, 2);
    let field = function("sqrt(x)").eval_grid(&grid).unwrap();
    assert!(field.get(0, 0).unwrap().is_nan());
    assert_eq!(field.get(4, 0), Some(5.0_f64.sqrt()));
  }
}

mod validation {
  use super::*;

  #[test]
  fn accepts_plottable_formulas() {
    let symbols = SymbolTable::default();
    for text in ["x + y", "sin(x)*cos(y)", "exp(-(x^2 + y^2))", "1/x", "E^x"] {
      assert!(validate_text(text, &symbols).is_valid(), "{text}");
    }
  }

  #[test]
  fn rejects_garbage() {
    let symbols = SymbolTable::default();
    for text in ["x +", "sin(", "foo(x)", "q*x", "log()", "theta"] {
      assert!(!validate_text(text, &symbols).is_valid(), "{text}");
    }
  }

  #[test]
  fn empty_is_not_valid() {
    let symbols = SymbolTable::default();
    assert_eq!(
      validate_text("  ", &symbols),
      supercalc::Validity::Empty
    );
  }
}
