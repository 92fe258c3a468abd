//! Bookkeeping that keeps background reads and writes from trampling each other.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::Table;

#[derive(Default)]
struct Slot {
  /// Writes started on this table
  issued: AtomicU64,
  /// Writes whose remote reconciliation has finished (either way)
  settled: AtomicU64,
}

/// Per-table write counters.
///
/// A remote snapshot may only overwrite the local copy when no write on that
/// table was outstanding when the read started, and none was issued while it
/// was in flight.
#[derive(Default)]
pub struct WriteVersions {
  slots: [Slot; 3],
}

/// Held for the lifetime of one write; dropping it marks the write settled.
pub struct WriteTicket {
  versions: Arc<WriteVersions>,
  table: Table,
}

impl Drop for WriteTicket {
  fn drop(&mut self) {
    self.versions.slots[self.table.index()]
      .settled
      .fetch_add(1, Ordering::SeqCst);
  }
}

/// Issued-write count observed when a read started.
#[derive(Debug, Clone, Copy)]
pub struct ReadTicket {
  table: Table,
  issued: u64,
}

impl WriteVersions {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn begin_write(self: &Arc<Self>, table: Table) -> WriteTicket {
    self.slots[table.index()].issued.fetch_add(1, Ordering::SeqCst);
    WriteTicket {
      versions: Arc::clone(self),
      table,
    }
  }

  /// None while any write on `table` is still reconciling.
  pub fn begin_read(&self, table: Table) -> Option<ReadTicket> {
    let slot = &self.slots[table.index()];
    let issued = slot.issued.load(Ordering::SeqCst);
    let settled = slot.settled.load(Ordering::SeqCst);
    (issued == settled).then_some(ReadTicket { table, issued })
  }

  /// Whether a snapshot fetched under `ticket` is still newer than local state.
  pub fn is_current(&self, ticket: &ReadTicket) -> bool {
    self.slots[ticket.table.index()].issued.load(Ordering::SeqCst) == ticket.issued
  }
}

/// Ids with an operation awaiting its network round trip.
#[derive(Default)]
pub struct ProcessingSet {
  keys: Mutex<HashSet<String>>,
}

/// Releases its key when dropped, whatever the outcome.
pub struct ProcessingGuard {
  set: Arc<ProcessingSet>,
  key: String,
}

impl Drop for ProcessingGuard {
  fn drop(&mut self) {
    self
      .set
      .keys
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .remove(&self.key);
  }
}

impl ProcessingSet {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  /// Claim `key`, or None if another operation holds it.
  pub fn try_acquire(self: &Arc<Self>, key: String) -> Option<ProcessingGuard> {
    let inserted = self
      .keys
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .insert(key.clone());
    inserted.then(|| ProcessingGuard {
      set: Arc::clone(self),
      key,
    })
  }

  #[cfg(test)]
  pub fn is_processing(&self, key: &str) -> bool {
    self
      .keys
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .contains(key)
  }
}
