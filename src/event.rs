use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::Table;

/// Outcome of the background half of an optimistic write
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
  /// The remote store accepted the change
  Persisted { table: Table, action: &'static str },
  /// The remote call failed; the change only exists in the local cache
  LocalOnly {
    table: Table,
    action: &'static str,
    error: String,
  },
}

impl SyncEvent {
  pub fn table(&self) -> Table {
    match self {
      SyncEvent::Persisted { table, .. } | SyncEvent::LocalOnly { table, .. } => *table,
    }
  }
}

/// Loop events for long-running commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  /// Periodic tick for refresh and flight polling
  Tick,
  /// Ctrl-C
  Quit,
}

/// Produces ticks on a timer and a quit event on ctrl-c
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let tick_tx = tx.clone();
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(tick_rate);
      loop {
        interval.tick().await;
        if tick_tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    tokio::spawn(async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        let _ = tx.send(Event::Quit);
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_ticks_arrive() {
    let mut events = EventHandler::new(Duration::from_millis(5));
    assert_eq!(events.next().await, Some(Event::Tick));
    assert_eq!(events.next().await, Some(Event::Tick));
  }

  #[test]
  fn test_event_table() {
    let event = SyncEvent::LocalOnly {
      table: Table::Menu,
      action: "updateMenuOrder",
      error: "HTTP status 503".into(),
    };
    assert_eq!(event.table(), Table::Menu);
  }
}
