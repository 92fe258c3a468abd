//! Wire types for the spreadsheet endpoint.
//!
//! Every call is one JSON object with an `action` tag; every reply is an
//! envelope with a success flag. Decoding into typed results happens here so
//! nothing past this module handles raw JSON.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use super::RemoteError;
use crate::model::{Category, MenuItem, NewMenuItem, Order, OrderStatus};

/// One variant per backend action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
  GetOrders,
  CreateOrder {
    order: Order,
  },
  UpdateOrderStatus {
    #[serde(rename = "orderId")]
    order_id: String,
    status: OrderStatus,
  },
  GetMenu,
  AddMenuItem {
    item: NewMenuItem,
  },
  UpdateMenuItem {
    item: MenuItem,
  },
  DeleteMenuItem {
    #[serde(rename = "itemId")]
    item_id: u32,
  },
  GetCategories,
  AddCategory {
    category: Category,
  },
  DeleteCategory {
    category: Category,
  },
  UpdateCategoryOrder {
    categories: Vec<Category>,
  },
  UpdateMenuOrder {
    #[serde(rename = "menuIds")]
    menu_ids: Vec<u32>,
  },
  CheckVersion,
}

impl Request {
  /// The action name as sent on the wire.
  pub fn action(&self) -> &'static str {
    match self {
      Request::GetOrders => "getOrders",
      Request::CreateOrder { .. } => "createOrder",
      Request::UpdateOrderStatus { .. } => "updateOrderStatus",
      Request::GetMenu => "getMenu",
      Request::AddMenuItem { .. } => "addMenuItem",
      Request::UpdateMenuItem { .. } => "updateMenuItem",
      Request::DeleteMenuItem { .. } => "deleteMenuItem",
      Request::GetCategories => "getCategories",
      Request::AddCategory { .. } => "addCategory",
      Request::DeleteCategory { .. } => "deleteCategory",
      Request::UpdateCategoryOrder { .. } => "updateCategoryOrder",
      Request::UpdateMenuOrder { .. } => "updateMenuOrder",
      Request::CheckVersion => "checkVersion",
    }
  }
}

/// Reply envelope: `{success, data?, error?, ...extra}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
  pub success: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl Envelope {
  pub fn ok(data: Option<Value>) -> Self {
    Self {
      success: true,
      data,
      ..Self::default()
    }
  }

  pub fn failure(error: impl Into<String>) -> Self {
    Self {
      success: false,
      error: Some(error.into()),
      ..Self::default()
    }
  }

  #[cfg(test)]
  pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.extra.insert(key.to_string(), value.into());
    self
  }

  /// Fail with `Rejected` unless the backend reported success.
  pub fn into_ack(self) -> Result<Self, RemoteError> {
    if self.success {
      Ok(self)
    } else {
      Err(RemoteError::Rejected(
        self.error.unwrap_or_else(|| "unknown error".to_string()),
      ))
    }
  }

  /// Decode `data` into `T`.
  pub fn into_data<T: DeserializeOwned>(self) -> Result<T, RemoteError> {
    let envelope = self.into_ack()?;
    let data = envelope
      .data
      .ok_or_else(|| RemoteError::Malformed("response has no data".to_string()))?;
    serde_json::from_value(data).map_err(|e| RemoteError::Malformed(e.to_string()))
  }

  /// Row count written by a reorder; `data` or a top-level `count`, else 0.
  pub fn into_count(self) -> Result<u64, RemoteError> {
    let envelope = self.into_ack()?;
    let count = envelope
      .data
      .as_ref()
      .and_then(Value::as_u64)
      .or_else(|| envelope.extra.get("count").and_then(Value::as_u64))
      .unwrap_or(0);
    Ok(count)
  }

  /// Version info, from `data` or from top-level fields.
  pub fn into_version(self) -> Result<VersionInfo, RemoteError> {
    let envelope = self.into_ack()?;
    let source = match envelope.data {
      Some(Value::Object(map)) => Value::Object(map),
      _ => Value::Object(envelope.extra),
    };
    serde_json::from_value(source).map_err(|e| RemoteError::Malformed(e.to_string()))
  }
}

/// Deployed backend identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
  pub version: String,
  #[serde(default)]
  pub spreadsheet_name: String,
}
