//! In-process spreadsheet backend speaking the action protocol.
//!
//! Mirrors the deployed web app's row semantics so sync behavior can be
//! exercised without a network.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Mutex;

use super::protocol::{Envelope, Request};
use super::{RemoteError, RemoteStore};
use crate::model::{Category, MenuItem, NewMenuItem, Order};

pub const SHEET_VERSION: &str = "1.0.2";

const ACTIONS: &[&str] = &[
  "getOrders",
  "createOrder",
  "updateOrderStatus",
  "getMenu",
  "addMenuItem",
  "updateMenuItem",
  "deleteMenuItem",
  "getCategories",
  "addCategory",
  "deleteCategory",
  "updateCategoryOrder",
  "updateMenuOrder",
  "checkVersion",
];

#[derive(Default)]
struct Sheets {
  /// Rows in append order (oldest first)
  orders: Vec<Order>,
  menu: Vec<MenuItem>,
  categories: Vec<Category>,
}

#[derive(Default)]
pub struct SheetStore {
  sheets: Mutex<Sheets>,
  calls: Mutex<Vec<String>>,
}

impl SheetStore {
  pub fn new(menu: Vec<MenuItem>, categories: Vec<Category>) -> Self {
    Self {
      sheets: Mutex::new(Sheets {
        orders: Vec::new(),
        menu,
        categories,
      }),
      calls: Mutex::new(Vec::new()),
    }
  }

  /// Actions received so far, in order.
  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn menu(&self) -> Vec<MenuItem> {
    self.sheets.lock().unwrap().menu.clone()
  }

  pub fn categories(&self) -> Vec<Category> {
    self.sheets.lock().unwrap().categories.clone()
  }

  pub fn orders(&self) -> Vec<Order> {
    self.sheets.lock().unwrap().orders.clone()
  }

  /// Mutate the sheets directly, as another client would.
  pub fn edit<R>(&self, f: impl FnOnce(&mut Vec<Order>, &mut Vec<MenuItem>, &mut Vec<Category>) -> R) -> R {
    let mut sheets = self.sheets.lock().unwrap();
    let Sheets {
      orders,
      menu,
      categories,
    } = &mut *sheets;
    f(orders, menu, categories)
  }

  /// Handle one raw request body.
  pub fn handle(&self, body: Value) -> Envelope {
    let action = body
      .get("action")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();
    self.calls.lock().unwrap().push(action.clone());

    if !ACTIONS.contains(&action.as_str()) {
      return Envelope::failure(format!("unknown action: {}", action));
    }

    let request: Request = match serde_json::from_value(body) {
      Ok(r) => r,
      Err(e) => return Envelope::failure(format!("invalid payload: {}", e)),
    };

    let mut sheets = self.sheets.lock().unwrap();
    match request {
      Request::GetOrders => {
        let mut orders = sheets.orders.clone();
        orders.reverse();
        Envelope::ok(Some(json!(orders)))
      }
      Request::CreateOrder { order } => {
        sheets.orders.push(order.clone());
        Envelope::ok(Some(json!(order)))
      }
      Request::UpdateOrderStatus { order_id, status } => {
        match sheets.orders.iter_mut().find(|o| o.id == order_id) {
          Some(order) => {
            order.status = status;
            Envelope::ok(None)
          }
          None => Envelope::failure("order not found"),
        }
      }
      Request::GetMenu => Envelope::ok(Some(json!(sheets.menu))),
      Request::AddMenuItem { item } => {
        let next_id = sheets.menu.iter().map(|m| m.id).max().unwrap_or(0) + 1;
        let created = item.into_item(next_id);
        sheets.menu.push(created.clone());
        Envelope::ok(Some(json!(created)))
      }
      Request::UpdateMenuItem { item } => match sheets.menu.iter_mut().find(|m| m.id == item.id) {
        Some(existing) => {
          *existing = item;
          Envelope::ok(None)
        }
        None => Envelope::failure("menu item not found"),
      },
      Request::DeleteMenuItem { item_id } => {
        match sheets.menu.iter().position(|m| m.id == item_id) {
          Some(pos) => {
            sheets.menu.remove(pos);
            Envelope::ok(None)
          }
          None => Envelope::failure("menu item not found"),
        }
      }
      Request::GetCategories => {
        let categories: Vec<&Category> =
          sheets.categories.iter().filter(|c| !c.is_empty()).collect();
        Envelope::ok(Some(json!(categories)))
      }
      Request::AddCategory { category } => {
        if sheets.categories.contains(&category) {
          Envelope::failure("category already exists")
        } else {
          sheets.categories.push(category);
          Envelope::ok(None)
        }
      }
      Request::DeleteCategory { category } => {
        match sheets.categories.iter().position(|c| *c == category) {
          Some(pos) => {
            sheets.categories.remove(pos);
            Envelope::ok(None)
          }
          None => Envelope::failure("category not found"),
        }
      }
      Request::UpdateCategoryOrder { categories } => {
        sheets.categories = categories
          .iter()
          .map(|c| c.trim().to_string())
          .filter(|c| !c.is_empty())
          .collect();
        Envelope::ok(None).with_extra("count", sheets.categories.len())
      }
      Request::UpdateMenuOrder { menu_ids } => {
        let mut remaining: Vec<Option<MenuItem>> = sheets.menu.drain(..).map(Some).collect();
        let mut sorted = Vec::new();
        for id in &menu_ids {
          if let Some(slot) = remaining
            .iter_mut()
            .find(|s| s.as_ref().is_some_and(|m| m.id == *id))
          {
            sorted.extend(slot.take());
          }
        }
        sorted.extend(remaining.into_iter().flatten());
        sheets.menu = sorted;
        Envelope::ok(None).with_extra("count", sheets.menu.len())
      }
      Request::CheckVersion => Envelope {
        success: true,
        ..Envelope::default()
      }
      .with_extra("version", SHEET_VERSION)
      .with_extra("spreadsheetName", "喵喵豬豬早餐店"),
    }
  }
}

#[async_trait]
impl RemoteStore for SheetStore {
  async fn call(&self, request: Request) -> Result<Envelope, RemoteError> {
    let body = serde_json::to_value(&request).map_err(|e| RemoteError::Malformed(e.to_string()))?;
    Ok(self.handle(body))
  }
}

/// Seed a store with a couple of menu rows.
pub fn small_sheet() -> SheetStore {
  let menu = vec![
    NewMenuItem::new("原味蛋餅", 35, "蛋餅").into_item(1),
    NewMenuItem::new("紅茶", 20, "飲料").into_item(10),
  ];
  SheetStore::new(menu, vec!["蛋餅".into(), "飲料".into()])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_unknown_action() {
    let store = small_sheet();
    let reply = store.handle(json!({ "action": "dropTables" }));
    assert!(!reply.success);
    assert_eq!(reply.error.as_deref(), Some("unknown action: dropTables"));
  }

  #[tokio::test]
  async fn test_add_menu_item_numbers_after_max() {
    let store = small_sheet();
    let created = store
      .add_menu_item(NewMenuItem::new("奶茶", 30, "飲料"))
      .await
      .unwrap();
    assert_eq!(created.id, 11);
  }

  #[tokio::test]
  async fn test_duplicate_category_rejected() {
    let store = small_sheet();
    let result = store.add_category("飲料".into()).await;
    assert!(matches!(result, Err(RemoteError::Rejected(msg)) if msg == "category already exists"));
  }

  #[tokio::test]
  async fn test_menu_order_appends_unlisted() {
    let store = small_sheet();
    let count = store.update_menu_order(vec![10]).await.unwrap();
    assert_eq!(count, 2);
    let ids: Vec<u32> = store.menu().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![10, 1]);
  }

  #[tokio::test]
  async fn test_category_order_drops_blank_names() {
    let store = small_sheet();
    let count = store
      .update_category_order(vec![" 飲料 ".into(), "".into(), "蛋餅".into()])
      .await
      .unwrap();
    assert_eq!(count, 2);
    assert_eq!(store.categories(), vec!["飲料", "蛋餅"]);
  }

  #[tokio::test]
  async fn test_version() {
    let info = small_sheet().check_version().await.unwrap();
    assert_eq!(info.version, SHEET_VERSION);
  }
}
