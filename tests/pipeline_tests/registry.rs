use super::*;
use std::collections::HashSet;

#[test]
fn thousand_ids_are_distinct() {
  let mut registry = IdentityRegistry::new();
  let ids: HashSet<_> = (0..1000).map(|_| registry.new_id().unwrap()).collect();
  assert_eq!(ids.len(), 1000);
  assert_eq!(registry.issued(), 1000);
}

#[test]
fn seeded_registries_agree() {
  let mut a = IdentityRegistry::with_seed(42);
  let mut b = IdentityRegistry::with_seed(42);
  assert_eq!(a.new_id().unwrap(), b.new_id().unwrap());
}
