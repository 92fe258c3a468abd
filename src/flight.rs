//! Single-flight background work.
//!
//! A `Flight<T>` runs at most one future at a time on the tokio runtime and
//! hands its result back through a channel. Starting a new flight while one
//! is airborne is refused, which is what keeps a double-submitted checkout
//! from placing two orders.
//!
//! ```ignore
//! let mut checkout = Flight::new();
//! let sync = coordinator.clone();
//! checkout.start(async move { sync.create_order(order).await.map_err(|e| e.to_string()) });
//!
//! // On every tick
//! if checkout.poll() {
//!     // Landed or failed, re-render
//! }
//! ```

use std::future::Future;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum FlightState<T> {
  Idle,
  InFlight,
  Landed(T),
  Failed(String),
}

impl<T> FlightState<T> {
  pub fn is_in_flight(&self) -> bool {
    matches!(self, FlightState::InFlight)
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      FlightState::Failed(e) => Some(e),
      _ => None,
    }
  }
}

pub struct Flight<T> {
  state: FlightState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Flight<T> {
  pub fn new() -> Self {
    Self {
      state: FlightState::Idle,
      receiver: None,
    }
  }

  pub fn state(&self) -> &FlightState<T> {
    &self.state
  }

  pub fn is_in_flight(&self) -> bool {
    self.state.is_in_flight()
  }

  /// Launch `work` unless a flight is already airborne.
  ///
  /// Returns false (and drops `work` unpolled) when refused.
  pub fn start<F>(&mut self, work: F) -> bool
  where
    F: Future<Output = Result<T, String>> + Send + 'static,
  {
    if self.state.is_in_flight() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = FlightState::InFlight;

    tokio::spawn(async move {
      let result = work.await;
      // Receiver may have been dropped with the owner
      let _ = tx.send(result);
    });
    true
  }

  /// Check for a result without blocking. Returns true if the state changed.
  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.settle(Some(result));
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.settle(None);
        true
      }
    }
  }

  /// Wait for the current flight to finish. Returns false if none was airborne.
  pub async fn land(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };
    let result = receiver.recv().await;
    self.settle(result);
    true
  }

  /// Take a landed result, leaving the flight idle.
  pub fn take(&mut self) -> Option<T> {
    match std::mem::replace(&mut self.state, FlightState::Idle) {
      FlightState::Landed(data) => Some(data),
      other => {
        self.state = other;
        None
      }
    }
  }

  fn settle(&mut self, result: Option<Result<T, String>>) {
    self.state = match result {
      Some(Ok(data)) => FlightState::Landed(data),
      Some(Err(e)) => FlightState::Failed(e),
      // Task panicked or was aborted before sending
      None => FlightState::Failed("flight was lost".to_string()),
    };
    self.receiver = None;
  }
}

impl<T: Send + 'static> Default for Flight<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Flight<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Flight")
      .field("state", &self.state)
      .field("airborne", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}
