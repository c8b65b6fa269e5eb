use super::*;

fn session() -> Session {
  Session::headless(PlotConfig::default().with_resolution(2)).unwrap()
}

fn send(session: &mut Session, command: Command) -> Outcome {
  session.update(command).unwrap()
}

#[test]
fn empty_input_leaves_surface_unchanged() {
  let mut session = session();
  let id = session.default_item();
  send(&mut session, Command::EditText { id, text: "x*y".into() });
  send(&mut session, Command::Plot { id });
  let before = session.item(&id).unwrap().surface().clone();

  let outcome = send(&mut session, Command::EditText { id, text: String::new() });
  assert_eq!(outcome, Outcome::Placeholder(id));
  assert!(!session.entry(&id).unwrap().is_valid());
  assert!(matches!(
    send(&mut session, Command::Plot { id }),
    Outcome::Skipped { .. }
  ));
  assert!(session.item(&id).unwrap().surface().bitwise_eq(&before));
}

#[test]
fn plotting_reciprocal_yields_finite_surface() {
  let mut session = session();
  let id = session.default_item();
  send(&mut session, Command::EditText { id, text: "1/x".into() });
  match send(&mut session, Command::Plot { id }) {
    Outcome::Plotted { report, .. } => assert_eq!(report.invalid, 5),
    other => panic!("unexpected outcome {other:?}"),
  }
  let item = session.item(&id).unwrap();
  assert!(!item.surface().has_non_finite());
  assert_eq!(item.colors().shape(), (5, 5));
}

#[test]
fn full_lifecycle() {
  let mut session = session();
  let id = match send(&mut session, Command::AddGraphItem) {
    Outcome::Added(id) => id,
    other => panic!("unexpected outcome {other:?}"),
  };
  send(&mut session, Command::EditText { id, text: "x^2 - y^2".into() });
  send(&mut session, Command::Plot { id });
  send(&mut session, Command::ToggleHide { id });
  assert!(!session.host().surface(&id).unwrap().visible);
  send(&mut session, Command::SetColormap { id, name: "viridis".into() });
  send(&mut session, Command::ToggleHide { id });
  assert!(session.host().surface(&id).unwrap().visible);
  assert_eq!(send(&mut session, Command::Delete { id }), Outcome::Deleted(id));
  assert!(session.item(&id).is_none());
  assert!(session.update(Command::Plot { id }).is_err());
}

#[test]
fn invalid_config_is_rejected() {
  assert!(Session::headless(PlotConfig::default().with_colormap("nope")).is_err());
}
