//! Entity-level CRUD over JSON snapshots held in a key-value store.

use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::storage::KeyValueStore;
use crate::config::SeedConfig;
use crate::model::{Category, MenuItem, NewMenuItem, Order, OrderStatus};

/// Storage key holding the last customer display name.
const USERNAME_KEY: &str = "meowmenu_username";

/// The three mirrored tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Orders,
  Menu,
  Categories,
}

impl Table {
  pub const ALL: [Table; 3] = [Table::Orders, Table::Menu, Table::Categories];

  /// Storage key of the table's snapshot.
  pub fn key(self) -> &'static str {
    match self {
      Table::Orders => "meowmenu_orders",
      Table::Menu => "meowmenu_menu",
      Table::Categories => "meowmenu_categories",
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Table::Orders => "orders",
      Table::Menu => "menu",
      Table::Categories => "categories",
    }
  }

  pub(crate) fn index(self) -> usize {
    match self {
      Table::Orders => 0,
      Table::Menu => 1,
      Table::Categories => 2,
    }
  }
}

/// Synchronous local mirror of the remote tables.
///
/// Every mutation is a read-modify-write of one snapshot, serialized by an
/// internal lock so concurrent writers never lose each other's changes.
#[derive(Clone)]
pub struct LocalCache {
  store: Arc<dyn KeyValueStore>,
  seed: Arc<SeedConfig>,
  write_lock: Arc<Mutex<()>>,
}

impl LocalCache {
  pub fn new(store: Arc<dyn KeyValueStore>, seed: SeedConfig) -> Self {
    Self {
      store,
      seed: Arc::new(seed),
      write_lock: Arc::new(Mutex::new(())),
    }
  }

  /// Write seed data for any table that has never been stored.
  pub fn init(&self) -> Result<()> {
    if self.store.get(Table::Menu.key())?.is_none() {
      self.save(Table::Menu, &self.seed.menu)?;
    }
    if self.store.get(Table::Categories.key())?.is_none() {
      self.save(Table::Categories, &self.seed.categories)?;
    }
    if self.store.get(Table::Orders.key())?.is_none() {
      self.save::<Order>(Table::Orders, &[])?;
    }
    Ok(())
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub fn orders(&self) -> Result<Vec<Order>> {
    self.load(Table::Orders, Vec::new)
  }

  pub fn menu(&self) -> Result<Vec<MenuItem>> {
    self.load(Table::Menu, || self.seed.menu.clone())
  }

  pub fn categories(&self) -> Result<Vec<Category>> {
    self.load(Table::Categories, || self.seed.categories.clone())
  }

  pub fn order(&self, id: &str) -> Result<Option<Order>> {
    Ok(self.orders()?.into_iter().find(|o| o.id == id))
  }

  pub fn menu_item(&self, id: u32) -> Result<Option<MenuItem>> {
    Ok(self.menu()?.into_iter().find(|m| m.id == id))
  }

  // ==========================================================================
  // Whole-table replacement (authoritative snapshots)
  // ==========================================================================

  /// Overwrite the order table, keeping the first record for any repeated id.
  pub fn replace_orders(&self, orders: &[Order]) -> Result<Vec<Order>> {
    let mut seen = HashSet::new();
    let rows: Vec<Order> = orders
      .iter()
      .filter(|o| seen.insert(o.id.clone()))
      .cloned()
      .collect();
    self.modify(Table::Orders, Vec::new, |table: &mut Vec<Order>| {
      *table = rows.clone();
      (true, rows)
    })
  }

  /// Overwrite the menu, keeping the first record for any repeated id.
  pub fn replace_menu(&self, menu: &[MenuItem]) -> Result<Vec<MenuItem>> {
    let mut seen = HashSet::new();
    let rows: Vec<MenuItem> = menu.iter().filter(|m| seen.insert(m.id)).cloned().collect();
    self.modify(Table::Menu, Vec::new, |table: &mut Vec<MenuItem>| {
      *table = rows.clone();
      (true, rows)
    })
  }

  pub fn replace_categories(&self, categories: &[Category]) -> Result<Vec<Category>> {
    self.reorder_categories(categories)
  }

  // ==========================================================================
  // Orders
  // ==========================================================================

  /// Put a new order at the front. Returns false if the id is taken.
  pub fn insert_order(&self, order: &Order) -> Result<bool> {
    self.modify(Table::Orders, Vec::new, |orders: &mut Vec<Order>| {
      if orders.iter().any(|o| o.id == order.id) {
        return (false, false);
      }
      orders.insert(0, order.clone());
      (true, true)
    })
  }

  /// Replace the order with the same id, or put it at the front.
  pub fn upsert_order(&self, order: &Order) -> Result<()> {
    self.modify(Table::Orders, Vec::new, |orders: &mut Vec<Order>| {
      match orders.iter_mut().find(|o| o.id == order.id) {
        Some(existing) => *existing = order.clone(),
        None => orders.insert(0, order.clone()),
      }
      (true, ())
    })
  }

  /// Set an order's status. Returns false if no such order exists.
  pub fn set_order_status(&self, id: &str, status: OrderStatus) -> Result<bool> {
    self.modify(Table::Orders, Vec::new, |orders: &mut Vec<Order>| {
      match orders.iter_mut().find(|o| o.id == id) {
        Some(order) => {
          order.status = status;
          (true, true)
        }
        None => (false, false),
      }
    })
  }

  // ==========================================================================
  // Menu
  // ==========================================================================

  /// Append an item numbered one past the largest existing id.
  pub fn add_menu_item(&self, item: NewMenuItem) -> Result<MenuItem> {
    let seed = || self.seed.menu.clone();
    self.modify(Table::Menu, seed, |menu: &mut Vec<MenuItem>| {
      let next_id = menu.iter().map(|m| m.id).max().unwrap_or(0) + 1;
      let created = item.into_item(next_id);
      menu.push(created.clone());
      (true, created)
    })
  }

  /// Replace the item with the same id. Returns false if it does not exist.
  pub fn update_menu_item(&self, item: &MenuItem) -> Result<bool> {
    let seed = || self.seed.menu.clone();
    self.modify(Table::Menu, seed, |menu: &mut Vec<MenuItem>| {
      match menu.iter_mut().find(|m| m.id == item.id) {
        Some(existing) => {
          *existing = item.clone();
          (true, true)
        }
        None => (false, false),
      }
    })
  }

  /// Remove an item. Returns false if it does not exist.
  pub fn delete_menu_item(&self, id: u32) -> Result<bool> {
    let seed = || self.seed.menu.clone();
    self.modify(Table::Menu, seed, |menu: &mut Vec<MenuItem>| {
      let before = menu.len();
      menu.retain(|m| m.id != id);
      let removed = menu.len() != before;
      (removed, removed)
    })
  }

  /// Rewrite the menu in the given id order.
  ///
  /// Unknown ids are skipped; existing items missing from `ids` keep their
  /// relative order after the listed ones.
  pub fn reorder_menu(&self, ids: &[u32]) -> Result<Vec<MenuItem>> {
    let seed = || self.seed.menu.clone();
    self.modify(Table::Menu, seed, |menu: &mut Vec<MenuItem>| {
      let mut remaining: Vec<Option<MenuItem>> = menu.drain(..).map(Some).collect();
      let mut sorted = Vec::with_capacity(remaining.len());

      for id in ids {
        let slot = remaining
          .iter_mut()
          .find(|slot| slot.as_ref().is_some_and(|m| m.id == *id));
        if let Some(item) = slot.and_then(Option::take) {
          sorted.push(item);
        }
      }
      sorted.extend(remaining.into_iter().flatten());

      *menu = sorted.clone();
      (true, sorted)
    })
  }

  /// Swap a locally numbered item for the record the remote store created.
  ///
  /// The remote record takes the local item's position; any other record
  /// already carrying the remote id is dropped.
  pub fn reconcile_menu_item(&self, local_id: u32, remote: &MenuItem) -> Result<()> {
    let seed = || self.seed.menu.clone();
    self.modify(Table::Menu, seed, |menu: &mut Vec<MenuItem>| {
      let Some(pos) = menu.iter().position(|m| m.id == local_id) else {
        debug!(local_id, "Menu item removed before reconciliation");
        return (false, ());
      };
      menu[pos] = remote.clone();

      let mut index = 0;
      menu.retain(|m| {
        let keep = m.id != remote.id || index == pos;
        index += 1;
        keep
      });
      (true, ())
    })
  }

  // ==========================================================================
  // Categories
  // ==========================================================================

  /// Append a category. Returns false if it already exists.
  pub fn add_category(&self, name: &str) -> Result<bool> {
    let seed = || self.seed.categories.clone();
    self.modify(Table::Categories, seed, |categories: &mut Vec<Category>| {
      if categories.iter().any(|c| c == name) {
        return (false, false);
      }
      categories.push(name.to_string());
      (true, true)
    })
  }

  /// Remove a category. Menu items that reference it are left alone.
  pub fn delete_category(&self, name: &str) -> Result<bool> {
    let seed = || self.seed.categories.clone();
    self.modify(Table::Categories, seed, |categories: &mut Vec<Category>| {
      let before = categories.len();
      categories.retain(|c| c != name);
      let removed = categories.len() != before;
      (removed, removed)
    })
  }

  /// Replace the category list wholesale; omitted names are gone.
  pub fn reorder_categories(&self, categories: &[Category]) -> Result<Vec<Category>> {
    let rows = categories.to_vec();
    let seed = || self.seed.categories.clone();
    self.modify(Table::Categories, seed, |table: &mut Vec<Category>| {
      *table = rows.clone();
      (true, rows)
    })
  }

  // ==========================================================================
  // Session
  // ==========================================================================

  pub fn username(&self) -> Result<Option<String>> {
    self.store.get(USERNAME_KEY)
  }

  pub fn set_username(&self, name: &str) -> Result<()> {
    self.store.set(USERNAME_KEY, name)
  }

  pub fn clear_username(&self) -> Result<()> {
    self.store.remove(USERNAME_KEY)
  }

  // ==========================================================================
  // Snapshot plumbing
  // ==========================================================================

  fn load<T, F>(&self, table: Table, fallback: F) -> Result<Vec<T>>
  where
    T: DeserializeOwned,
    F: FnOnce() -> Vec<T>,
  {
    match self.store.get(table.key())? {
      Some(raw) => match serde_json::from_str(&raw) {
        Ok(rows) => Ok(rows),
        Err(e) => {
          warn!(table = table.name(), error = %e, "Unreadable cache snapshot, using defaults");
          Ok(fallback())
        }
      },
      None => Ok(fallback()),
    }
  }

  fn save<T: Serialize>(&self, table: Table, rows: &[T]) -> Result<()> {
    let raw = serde_json::to_string(rows)
      .map_err(|e| eyre!("Failed to serialize {} snapshot: {}", table.name(), e))?;
    self.store.set(table.key(), &raw)
  }

  /// Load, mutate and (if the closure reports a change) save one table.
  fn modify<T, F, M, R>(&self, table: Table, fallback: F, mutate: M) -> Result<R>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Vec<T>,
    M: FnOnce(&mut Vec<T>) -> (bool, R),
  {
    let _guard = self
      .write_lock
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut rows = self.load(table, fallback)?;
    let (changed, result) = mutate(&mut rows);
    if changed {
      self.save(table, &rows)?;
    }
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::model::{OrderLine, PickupTime};
  use chrono::Utc;

  fn cache() -> LocalCache {
    let cache = LocalCache::new(Arc::new(MemoryStorage::new()), SeedConfig::default());
    cache.init().unwrap();
    cache
  }

  fn empty_cache() -> LocalCache {
    let seed = SeedConfig {
      categories: Vec::new(),
      menu: Vec::new(),
    };
    let cache = LocalCache::new(Arc::new(MemoryStorage::new()), seed);
    cache.init().unwrap();
    cache
  }

  fn order(id: &str, customer: &str) -> Order {
    Order::new(
      id.to_string(),
      customer,
      vec![OrderLine {
        id: 1,
        name: "原味蛋餅".into(),
        price: 35,
        quantity: 1,
      }],
      PickupTime::new(7, 0).unwrap(),
      None,
      Utc::now(),
    )
  }

  fn ids(menu: &[MenuItem]) -> Vec<u32> {
    menu.iter().map(|m| m.id).collect()
  }

  #[test]
  fn test_init_seeds_defaults_once() {
    let cache = cache();
    assert_eq!(cache.menu().unwrap().len(), 14);
    assert_eq!(cache.categories().unwrap(), vec!["蛋餅", "鬆餅", "飲料"]);
    assert!(cache.orders().unwrap().is_empty());

    cache.delete_category("鬆餅").unwrap();
    cache.init().unwrap();
    assert_eq!(cache.categories().unwrap(), vec!["蛋餅", "飲料"]);
  }

  #[test]
  fn test_add_menu_item_starts_at_one_when_empty() {
    let cache = empty_cache();
    let first = cache.add_menu_item(NewMenuItem::new("飯糰", 40, "飯")).unwrap();
    let second = cache.add_menu_item(NewMenuItem::new("漢堡", 55, "堡")).unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);
  }

  #[test]
  fn test_ids_stay_unique_and_increasing() {
    let cache = cache();
    let mut last_assigned = cache.menu().unwrap().iter().map(|m| m.id).max().unwrap();

    for round in 0..5 {
      let created = cache
        .add_menu_item(NewMenuItem::new(format!("new {}", round), 10, "飲料"))
        .unwrap();
      assert!(created.id > last_assigned);
      last_assigned = created.id;

      let mut edited = created.clone();
      edited.price += 5;
      assert!(cache.update_menu_item(&edited).unwrap());

      if round % 2 == 0 {
        assert!(cache.delete_menu_item(created.id).unwrap());
      }

      let menu = cache.menu().unwrap();
      let unique: HashSet<u32> = menu.iter().map(|m| m.id).collect();
      assert_eq!(unique.len(), menu.len());
    }
  }

  #[test]
  fn test_update_and_delete_missing_are_noops() {
    let cache = cache();
    let before = cache.menu().unwrap();
    let ghost = NewMenuItem::new("ghost", 1, "x").into_item(999);
    assert!(!cache.update_menu_item(&ghost).unwrap());
    assert!(!cache.delete_menu_item(999).unwrap());
    assert_eq!(cache.menu().unwrap(), before);
  }

  #[test]
  fn test_reorder_menu_appends_omitted_in_original_order() {
    let cache = cache();
    let menu = cache.reorder_menu(&[10, 3, 42, 10]).unwrap();
    let order = ids(&menu);
    assert_eq!(&order[..2], &[10, 3]);
    assert_eq!(&order[2..], &[1, 2, 4, 5, 6, 7, 8, 9, 11, 12, 13, 14]);
    assert_eq!(ids(&cache.menu().unwrap()), order);
  }

  #[test]
  fn test_reorder_categories_is_exact() {
    let cache = cache();
    let wanted = vec!["飲料".to_string(), "蛋餅".to_string()];
    cache.reorder_categories(&wanted).unwrap();
    assert_eq!(cache.categories().unwrap(), wanted);
  }

  #[test]
  fn test_add_category_rejects_duplicates() {
    let cache = cache();
    assert!(!cache.add_category("飲料").unwrap());
    assert_eq!(cache.categories().unwrap().len(), 3);
    assert!(cache.add_category("飯糰").unwrap());
    assert_eq!(cache.categories().unwrap().last().unwrap(), "飯糰");
  }

  #[test]
  fn test_delete_category_keeps_menu_items() {
    let cache = cache();
    assert!(cache.delete_category("飲料").unwrap());
    assert!(!cache.delete_category("飲料").unwrap());
    assert!(cache.menu().unwrap().iter().any(|m| m.category == "飲料"));
  }

  #[test]
  fn test_orders_newest_first_and_unique() {
    let cache = cache();
    assert!(cache.insert_order(&order("ORD1", "a")).unwrap());
    assert!(cache.insert_order(&order("ORD2", "b")).unwrap());
    assert!(!cache.insert_order(&order("ORD1", "c")).unwrap());

    let orders = cache.orders().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].id, "ORD2");
  }

  #[test]
  fn test_set_status_of_missing_order() {
    let cache = cache();
    assert!(!cache.set_order_status("nope", OrderStatus::Delivered).unwrap());
    assert!(cache.orders().unwrap().is_empty());
  }

  #[test]
  fn test_reconcile_replaces_local_number() {
    let cache = cache();
    let local = cache.add_menu_item(NewMenuItem::new("蘿蔔糕", 40, "點心")).unwrap();
    assert_eq!(local.id, 15);

    // Remote numbered it 3, which collides with an existing local row
    let mut remote = local.clone();
    remote.id = 3;
    cache.reconcile_menu_item(local.id, &remote).unwrap();

    let menu = cache.menu().unwrap();
    assert_eq!(menu.len(), 14);
    assert_eq!(menu.last().unwrap().name, "蘿蔔糕");
    assert_eq!(menu.iter().filter(|m| m.id == 3).count(), 1);
  }

  #[test]
  fn test_corrupt_snapshot_falls_back_to_seed() {
    let store = Arc::new(MemoryStorage::new());
    store.set(Table::Menu.key(), "{not json").unwrap();
    let cache = LocalCache::new(store, SeedConfig::default());
    assert_eq!(cache.menu().unwrap().len(), 14);
  }

  #[test]
  fn test_username_round_trip() {
    let cache = cache();
    assert_eq!(cache.username().unwrap(), None);
    cache.set_username("小明").unwrap();
    assert_eq!(cache.username().unwrap().as_deref(), Some("小明"));
    cache.clear_username().unwrap();
    assert_eq!(cache.username().unwrap(), None);
  }
}
