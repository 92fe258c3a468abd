//! The remote store: a spreadsheet-backed row API behind one endpoint.

mod client;
pub mod protocol;
#[cfg(test)]
pub mod sheet;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Category, MenuItem, NewMenuItem, Order, OrderStatus};
pub use client::HttpRemote;
use protocol::{Envelope, Request, VersionInfo};

/// Why a remote call did not produce a usable answer.
#[derive(Debug, Error)]
pub enum RemoteError {
  /// No endpoint configured
  #[error("remote store is not configured")]
  Unavailable,

  /// Network failure
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// Non-success HTTP status
  #[error("HTTP status {0}")]
  Status(u16),

  /// Body was not JSON, or not the expected shape
  #[error("malformed response: {0}")]
  Malformed(String),

  /// The backend answered `success: false`
  #[error("{0}")]
  Rejected(String),
}

/// A backend that understands the action protocol.
///
/// Implementors only provide `call`; the typed helpers decode its envelope.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
  /// Send one request and return the raw reply envelope.
  async fn call(&self, request: Request) -> Result<Envelope, RemoteError>;

  async fn get_orders(&self) -> Result<Vec<Order>, RemoteError> {
    self.call(Request::GetOrders).await?.into_data()
  }

  async fn create_order(&self, order: Order) -> Result<Order, RemoteError> {
    self.call(Request::CreateOrder { order }).await?.into_data()
  }

  async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> Result<(), RemoteError> {
    let request = Request::UpdateOrderStatus {
      order_id: order_id.to_string(),
      status,
    };
    self.call(request).await?.into_ack().map(drop)
  }

  async fn get_menu(&self) -> Result<Vec<MenuItem>, RemoteError> {
    self.call(Request::GetMenu).await?.into_data()
  }

  async fn add_menu_item(&self, item: NewMenuItem) -> Result<MenuItem, RemoteError> {
    self.call(Request::AddMenuItem { item }).await?.into_data()
  }

  async fn update_menu_item(&self, item: MenuItem) -> Result<(), RemoteError> {
    self.call(Request::UpdateMenuItem { item }).await?.into_ack().map(drop)
  }

  async fn delete_menu_item(&self, item_id: u32) -> Result<(), RemoteError> {
    self.call(Request::DeleteMenuItem { item_id }).await?.into_ack().map(drop)
  }

  async fn update_menu_order(&self, menu_ids: Vec<u32>) -> Result<u64, RemoteError> {
    self.call(Request::UpdateMenuOrder { menu_ids }).await?.into_count()
  }

  async fn get_categories(&self) -> Result<Vec<Category>, RemoteError> {
    self.call(Request::GetCategories).await?.into_data()
  }

  async fn add_category(&self, category: Category) -> Result<(), RemoteError> {
    self.call(Request::AddCategory { category }).await?.into_ack().map(drop)
  }

  async fn delete_category(&self, category: Category) -> Result<(), RemoteError> {
    self.call(Request::DeleteCategory { category }).await?.into_ack().map(drop)
  }

  async fn update_category_order(&self, categories: Vec<Category>) -> Result<u64, RemoteError> {
    self
      .call(Request::UpdateCategoryOrder { categories })
      .await?
      .into_count()
  }

  async fn check_version(&self) -> Result<VersionInfo, RemoteError> {
    self.call(Request::CheckVersion).await?.into_version()
  }
}
