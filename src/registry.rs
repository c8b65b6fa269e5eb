use std::collections::{HashMap, HashSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, warn};

use crate::graph_item::GraphItem;
use crate::SurfaceError;

/// Collision retries before giving up on drawing a fresh identifier.
pub const MAX_ID_ATTEMPTS: usize = 64;

/// 512-bit random handle for a graph item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u64; 8]);

impl Identifier {
  pub fn from_words(words: [u64; 8]) -> Self {
    Identifier(words)
  }

  /// Leading 16 hex digits, enough to tell items apart in logs.
  pub fn short(&self) -> String {
    format!("{:016x}", self.0[0])
  }

  fn random(rng: &mut dyn RngCore) -> Self {
    let mut words = [0u64; 8];
    for word in words.iter_mut() {
      *word = rng.next_u64();
    }
    Identifier(words)
  }
}

impl fmt::Display for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for word in self.0 {
      write!(f, "{:016x}", word)?;
    }
    Ok(())
  }
}

impl fmt::Debug for Identifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Identifier({}..)", self.short())
  }
}

/// Owns every live graph item, keyed by identifier.
///
/// An identifier is issued at most once for the lifetime of the registry:
/// unregistering an item retires its id instead of freeing it.
pub struct IdentityRegistry {
  items: HashMap<Identifier, GraphItem>,
  issued: HashSet<Identifier>,
  retired: HashSet<Identifier>,
  rng: Box<dyn RngCore>,
}

impl Default for IdentityRegistry {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for IdentityRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IdentityRegistry")
      .field("live", &self.items.len())
      .field("issued", &self.issued.len())
      .finish()
  }
}

impl IdentityRegistry {
  pub fn new() -> Self {
    Self::with_rng(Box::new(StdRng::from_entropy()))
  }

  /// Deterministic registry for reproducible runs.
  pub fn with_seed(seed: u64) -> Self {
    Self::with_rng(Box::new(StdRng::seed_from_u64(seed)))
  }

  pub fn with_rng(rng: Box<dyn RngCore>) -> Self {
    IdentityRegistry {
      items: HashMap::new(),
      issued: HashSet::new(),
      retired: HashSet::new(),
      rng,
    }
  }

  /// Draw an identifier never issued before and reserve it.
  pub fn new_id(&mut self) -> Result<Identifier, SurfaceError> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
      let id = Identifier::random(self.rng.as_mut());
      if self.issued.insert(id) {
        return Ok(id);
      }
      debug!(attempt, "identifier collision, drawing again");
    }
    warn!(attempts = MAX_ID_ATTEMPTS, "identifier space exhausted");
    Err(SurfaceError::IdentityExhausted {
      attempts: MAX_ID_ATTEMPTS,
    })
  }

  /// Store `item` under a fresh identifier.
  pub fn register(&mut self, item: GraphItem) -> Result<Identifier, SurfaceError> {
    let id = self.new_id()?;
    self.items.insert(id, item);
    debug!(id = %id.short(), live = self.items.len(), "registered graph item");
    Ok(id)
  }

  /// Store `item` under an identifier obtained from [`Self::new_id`] that
  /// has not been used for an item yet.
  pub fn register_with(
    &mut self,
    id: Identifier,
    item: GraphItem,
  ) -> Result<(), SurfaceError> {
    if !self.issued.contains(&id)
      || self.retired.contains(&id)
      || self.items.contains_key(&id)
    {
      return Err(SurfaceError::IdentifierInUse(id));
    }
    self.items.insert(id, item);
    Ok(())
  }

  /// Remove an item. Its identifier stays retired.
  pub fn unregister(&mut self, id: &Identifier) -> Option<GraphItem> {
    let item = self.items.remove(id);
    if item.is_some() {
      self.retired.insert(*id);
      debug!(id = %id.short(), live = self.items.len(), "unregistered graph item");
    }
    item
  }

  pub fn lookup(&self, id: &Identifier) -> Option<&GraphItem> {
    self.items.get(id)
  }

  pub fn lookup_mut(&mut self, id: &Identifier) -> Option<&mut GraphItem> {
    self.items.get_mut(id)
  }

  pub fn contains(&self, id: &Identifier) -> bool {
    self.items.contains_key(id)
  }

  /// Live identifiers in a stable order.
  pub fn ids(&self) -> Vec<Identifier> {
    let mut ids: Vec<Identifier> = self.items.keys().copied().collect();
    ids.sort();
    ids
  }

  pub fn iter_mut(
    &mut self,
  ) -> impl Iterator<Item = (&Identifier, &mut GraphItem)> {
    self.items.iter_mut()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// Identifiers ever issued, live or retired.
  pub fn issued(&self) -> usize {
    self.issued.len()
  }
}
