use chrono::{Local, Utc};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cache::{KeyValueStore, LocalCache, Table};
use crate::checkout::{Cart, PickupSlots};
use crate::config::Config;
use crate::event::SyncEvent;
use crate::flight::Flight;
use crate::model::{generate_order_id, Category, MenuItem, NewMenuItem, Order, OrderStatus, PickupTime};
use crate::remote::RemoteStore;
use crate::sync::{Snapshot, SyncCoordinator, SyncError};

#[derive(Debug, Error)]
pub enum AppError {
  #[error("log in first")]
  NotLoggedIn,

  #[error("name must not be empty")]
  EmptyName,

  #[error("only shop admins can do that")]
  AdminOnly,

  #[error("cart is empty")]
  EmptyCart,

  #[error("an order is already being submitted")]
  SubmitInFlight,

  #[error("checkout failed: {0}")]
  CheckoutFailed(String),

  #[error("no menu item {0}")]
  UnknownMenuItem(u32),

  #[error("{0} is not an available pickup time")]
  InvalidPickupTime(String),

  #[error("no entry at position {0}")]
  NoSuchPosition(usize),

  #[error(transparent)]
  Sync(#[from] SyncError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Who is using the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
  pub name: String,
  pub is_admin: bool,
}

/// Which orders the orders view lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderFilter {
  All,
  #[default]
  Pending,
  Delivered,
  Cancelled,
}

impl OrderFilter {
  pub fn matches(self, status: OrderStatus) -> bool {
    match self {
      OrderFilter::All => true,
      OrderFilter::Pending => status == OrderStatus::Pending,
      OrderFilter::Delivered => status == OrderStatus::Delivered,
      OrderFilter::Cancelled => status == OrderStatus::Cancelled,
    }
  }
}

impl FromStr for OrderFilter {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.trim().eq_ignore_ascii_case("all") {
      return Ok(OrderFilter::All);
    }
    Ok(match s.parse::<OrderStatus>()? {
      OrderStatus::Pending => OrderFilter::Pending,
      OrderStatus::Delivered => OrderFilter::Delivered,
      OrderStatus::Cancelled => OrderFilter::Cancelled,
    })
  }
}

/// Which tables changed since the caller last looked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Changes {
  pub orders: bool,
  pub menu: bool,
  pub categories: bool,
}

impl Changes {
  pub fn any(&self) -> bool {
    self.orders || self.menu || self.categories
  }

  fn mark(&mut self, table: Table) {
    match table {
      Table::Orders => self.orders = true,
      Table::Menu => self.menu = true,
      Table::Categories => self.categories = true,
    }
  }

  fn merge(&mut self, other: Changes) {
    self.orders |= other.orders;
    self.menu |= other.menu;
    self.categories |= other.categories;
  }
}

/// Main application state
pub struct App {
  config: Config,
  sync: SyncCoordinator,
  session: Option<Session>,

  /// Views of the three tables as last loaded
  orders: Vec<Order>,
  menu: Vec<MenuItem>,
  categories: Vec<Category>,

  cart: Cart,
  slots: PickupSlots,
  /// None shows every category
  selected_category: Option<Category>,
  order_filter: OrderFilter,

  checkout: Flight<Order>,
  refresh: Flight<Snapshot>,
  sync_events: mpsc::UnboundedReceiver<SyncEvent>,

  /// Writes the remote store has not accepted yet
  unsynced: usize,
  /// Last inline message for the user
  notice: Option<String>,
}

impl App {
  pub fn new(config: Config, remote: Arc<dyn RemoteStore>, store: Arc<dyn KeyValueStore>) -> AppResult<Self> {
    let (tx, rx) = mpsc::unbounded_channel();
    let cache = LocalCache::new(store, config.defaults.clone());
    let sync = SyncCoordinator::new(remote, cache).with_events(tx);
    sync.init()?;

    let mut app = Self {
      slots: PickupSlots::new(config.pickup),
      config,
      sync,
      session: None,
      orders: Vec::new(),
      menu: Vec::new(),
      categories: Vec::new(),
      cart: Cart::new(),
      selected_category: None,
      order_filter: OrderFilter::default(),
      checkout: Flight::new(),
      refresh: Flight::new(),
      sync_events: rx,
      unsynced: 0,
      notice: None,
    };
    app.load_local()?;
    Ok(app)
  }

  // ==========================================================================
  // Session
  // ==========================================================================

  pub fn login(&mut self, name: &str) -> AppResult<&Session> {
    let name = name.trim();
    if name.is_empty() {
      return Err(AppError::EmptyName);
    }
    self.sync.remember_user(name)?;

    let session = Session {
      name: name.to_string(),
      is_admin: self.config.is_admin(name),
    };
    info!(user = %session.name, admin = session.is_admin, "Logged in");
    Ok(&*self.session.insert(session))
  }

  /// Log in as the last remembered user, if any.
  pub fn restore_session(&mut self) -> AppResult<bool> {
    match self.sync.remembered_user()? {
      Some(name) if !name.trim().is_empty() => {
        self.login(&name)?;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  /// End the session and forget the remembered name.
  pub fn logout(&mut self) -> AppResult<()> {
    self.sync.forget_user()?;
    self.session = None;
    self.cart.clear();
    Ok(())
  }

  pub fn session(&self) -> Option<&Session> {
    self.session.as_ref()
  }

  // ==========================================================================
  // Loading
  // ==========================================================================

  /// Replace the views with the local cache contents.
  pub fn load_local(&mut self) -> AppResult<Changes> {
    let snapshot = self.sync.local_snapshot()?;
    Ok(self.apply_snapshot(snapshot))
  }

  /// Pull all tables and wait for the result.
  pub async fn refresh(&mut self) -> AppResult<Changes> {
    let snapshot = self.sync.refresh().await?;
    Ok(self.apply_snapshot(snapshot))
  }

  /// Start a background refresh; picked up by `tick`.
  pub fn start_refresh(&mut self) -> bool {
    let sync = self.sync.clone();
    self
      .refresh
      .start(async move { sync.refresh().await.map_err(|e| e.to_string()) })
  }

  /// Collect finished background work. Returns the tables whose view changed.
  pub fn tick(&mut self) -> Changes {
    let mut changes = Changes::default();

    if self.checkout.poll() {
      match self.complete_checkout() {
        Ok(order) => {
          self.notice = Some(format!("Order {} placed", order.id));
          changes.orders = true;
        }
        Err(e) => self.notice = Some(e.to_string()),
      }
    }

    if self.refresh.poll() {
      match self.refresh.take() {
        Some(snapshot) => changes.merge(self.apply_snapshot(snapshot)),
        None => {
          if let Some(e) = self.refresh.state().error() {
            warn!(error = e, "Background refresh failed");
          }
          self.refresh = Flight::new();
        }
      }
    }

    let mut touched = Changes::default();
    while let Ok(event) = self.sync_events.try_recv() {
      if let SyncEvent::LocalOnly { action, error, .. } = &event {
        debug!(action, error = %error, "Change kept locally");
        self.unsynced += 1;
      }
      touched.mark(event.table());
    }
    if touched.any() {
      // Write-through may have renumbered or replaced rows
      match self.load_local() {
        Ok(reloaded) => changes.merge(reloaded),
        Err(e) => warn!(error = %e, "Failed to reload local cache"),
      }
    }

    changes
  }

  fn apply_snapshot(&mut self, snapshot: Snapshot) -> Changes {
    let changes = Changes {
      orders: self.orders != snapshot.orders,
      menu: self.menu != snapshot.menu,
      categories: self.categories != snapshot.categories,
    };
    self.orders = snapshot.orders;
    self.menu = snapshot.menu;
    self.categories = snapshot.categories;

    if let Some(selected) = &self.selected_category {
      if !self.categories.contains(selected) {
        self.selected_category = None;
      }
    }
    changes
  }

  // ==========================================================================
  // Cart & checkout
  // ==========================================================================

  pub fn cart(&self) -> &Cart {
    &self.cart
  }

  /// Change how many of an item are in the cart. Only enabled items can be added.
  pub fn change_quantity(&mut self, item_id: u32, delta: i64) -> AppResult<()> {
    if delta > 0 && !self.menu.iter().any(|m| m.id == item_id && m.enabled) {
      return Err(AppError::UnknownMenuItem(item_id));
    }
    self.cart.change_quantity(item_id, delta);
    Ok(())
  }

  pub fn slots(&self) -> &PickupSlots {
    &self.slots
  }

  pub fn default_pickup(&self) -> PickupTime {
    self.slots.default_slot(Local::now().time())
  }

  /// Place the cart as an order. Returns the new order id.
  ///
  /// Only one submission can be in flight; the cart is cleared once it lands,
  /// whatever the outcome.
  pub fn submit_checkout(&mut self, pickup: Option<PickupTime>, note: Option<String>) -> AppResult<String> {
    let customer = self.session.as_ref().ok_or(AppError::NotLoggedIn)?.name.clone();
    if self.checkout.is_in_flight() {
      return Err(AppError::SubmitInFlight);
    }
    if self.cart.is_empty() {
      return Err(AppError::EmptyCart);
    }

    let pickup = pickup.unwrap_or_else(|| self.default_pickup());
    if !self.slots.contains(pickup) {
      return Err(AppError::InvalidPickupTime(pickup.to_string()));
    }
    let lines = self.cart.order_lines(&self.menu).map_err(AppError::UnknownMenuItem)?;

    let now = Utc::now();
    let order = Order::new(generate_order_id(now), customer, lines, pickup, note, now);
    let order_id = order.id.clone();
    info!(order_id = %order_id, pickup = %pickup, "Submitting order");

    let sync = self.sync.clone();
    self
      .checkout
      .start(async move { sync.create_order(order).await.map_err(|e| e.to_string()) });
    Ok(order_id)
  }

  /// Wait for the in-flight checkout and return the placed order.
  pub async fn wait_for_checkout(&mut self) -> AppResult<Order> {
    self.checkout.land().await;
    self.complete_checkout()
  }

  fn complete_checkout(&mut self) -> AppResult<Order> {
    self.cart.clear();
    match self.checkout.take() {
      Some(order) => {
        if !self.orders.iter().any(|o| o.id == order.id) {
          self.orders.insert(0, order.clone());
        }
        Ok(order)
      }
      None => {
        let error = self
          .checkout
          .state()
          .error()
          .unwrap_or("checkout did not finish")
          .to_string();
        self.checkout = Flight::new();
        Err(AppError::CheckoutFailed(error))
      }
    }
  }

  // ==========================================================================
  // Orders
  // ==========================================================================

  /// Deliver or cancel any order (admin).
  pub async fn set_order_status(&mut self, order_id: &str, status: OrderStatus) -> AppResult<()> {
    self.require_admin()?;
    self.sync.update_order_status(order_id, status).await?;
    self.load_local()?;
    Ok(())
  }

  /// Cancel one of the logged-in customer's own pending orders.
  pub async fn cancel_my_order(&mut self, order_id: &str) -> AppResult<()> {
    let name = self.session.as_ref().ok_or(AppError::NotLoggedIn)?.name.clone();
    self.sync.cancel_order(order_id, &name).await?;
    self.load_local()?;
    Ok(())
  }

  // ==========================================================================
  // Menu management (admin)
  // ==========================================================================

  pub async fn add_menu_item(&mut self, item: NewMenuItem) -> AppResult<MenuItem> {
    self.require_admin()?;
    let created = self.sync.add_menu_item(item).await?;
    self.load_local()?;
    Ok(created)
  }

  pub async fn update_menu_item(&mut self, item: MenuItem) -> AppResult<()> {
    self.require_admin()?;
    self.sync.update_menu_item(item).await?;
    self.load_local()?;
    Ok(())
  }

  pub async fn set_menu_item_enabled(&mut self, item_id: u32, enabled: bool) -> AppResult<MenuItem> {
    self.require_admin()?;
    let item = self.sync.set_menu_item_enabled(item_id, enabled).await?;
    self.load_local()?;
    Ok(item)
  }

  pub async fn delete_menu_item(&mut self, item_id: u32) -> AppResult<()> {
    self.require_admin()?;
    self.sync.delete_menu_item(item_id).await?;
    self.cart.remove(item_id);
    self.load_local()?;
    Ok(())
  }

  pub async fn reorder_menu(&mut self, ids: Vec<u32>) -> AppResult<()> {
    self.require_admin()?;
    self.menu = self.sync.reorder_menu(ids).await?;
    Ok(())
  }

  /// Drag the item at `from` to position `to` and save the whole order.
  pub async fn move_menu_item(&mut self, from: usize, to: usize) -> AppResult<()> {
    self.require_admin()?;
    let ids = splice(self.menu.iter().map(|m| m.id).collect(), from, to)?;
    self.reorder_menu(ids).await
  }

  pub async fn add_category(&mut self, name: &str) -> AppResult<()> {
    self.require_admin()?;
    self.sync.add_category(name).await?;
    self.load_local()?;
    Ok(())
  }

  pub async fn delete_category(&mut self, name: &str) -> AppResult<()> {
    self.require_admin()?;
    self.sync.delete_category(name).await?;
    self.load_local()?;
    Ok(())
  }

  pub async fn reorder_categories(&mut self, categories: Vec<Category>) -> AppResult<()> {
    self.require_admin()?;
    self.categories = self.sync.reorder_categories(categories).await?;
    Ok(())
  }

  pub async fn move_category(&mut self, from: usize, to: usize) -> AppResult<()> {
    self.require_admin()?;
    let categories = splice(self.categories.clone(), from, to)?;
    self.reorder_categories(categories).await
  }

  fn require_admin(&self) -> AppResult<()> {
    match &self.session {
      None => Err(AppError::NotLoggedIn),
      Some(session) if !session.is_admin => Err(AppError::AdminOnly),
      Some(_) => Ok(()),
    }
  }

  // ==========================================================================
  // Views
  // ==========================================================================

  pub fn select_category(&mut self, category: Option<Category>) {
    self.selected_category = category;
  }

  pub fn set_order_filter(&mut self, filter: OrderFilter) {
    self.order_filter = filter;
  }

  /// Enabled items in the selected category, in menu order.
  pub fn visible_menu(&self) -> Vec<&MenuItem> {
    self
      .menu
      .iter()
      .filter(|m| m.enabled)
      .filter(|m| self.selected_category.as_ref().map_or(true, |c| &m.category == c))
      .collect()
  }

  /// Orders passing the filter; customers only see their own.
  pub fn visible_orders(&self) -> Vec<&Order> {
    let own = |o: &&Order| match &self.session {
      Some(s) if s.is_admin => true,
      Some(s) => o.customer == s.name,
      None => false,
    };
    self
      .orders
      .iter()
      .filter(own)
      .filter(|o| self.order_filter.matches(o.status))
      .collect()
  }

  pub fn menu(&self) -> &[MenuItem] {
    &self.menu
  }

  pub fn categories(&self) -> &[Category] {
    &self.categories
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn sync(&self) -> &SyncCoordinator {
    &self.sync
  }

  /// Writes kept locally because the remote store refused or was unreachable.
  pub fn unsynced_writes(&self) -> usize {
    self.unsynced
  }

  pub fn take_notice(&mut self) -> Option<String> {
    self.notice.take()
  }

  /// Wait for background writes, then fold their outcomes into the views.
  pub async fn flush(&mut self) -> Changes {
    self.sync.flush().await;
    self.tick()
  }
}

/// Move the element at `from` to `to`.
fn splice<T>(mut items: Vec<T>, from: usize, to: usize) -> AppResult<Vec<T>> {
  if from >= items.len() {
    return Err(AppError::NoSuchPosition(from));
  }
  if to >= items.len() {
    return Err(AppError::NoSuchPosition(to));
  }
  let item = items.remove(from);
  items.insert(to, item);
  Ok(items)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::config::ApiConfig;
  use crate::remote::sheet::{small_sheet, SheetStore};
  use crate::remote::HttpRemote;

  fn offline_app() -> App {
    let remote = HttpRemote::new(&ApiConfig::default()).unwrap();
    App::new(Config::default(), Arc::new(remote), Arc::new(MemoryStorage::new())).unwrap()
  }

  fn online_app(sheet: Arc<SheetStore>) -> App {
    App::new(Config::default(), sheet, Arc::new(MemoryStorage::new())).unwrap()
  }

  fn seven_thirty() -> Option<PickupTime> {
    PickupTime::new(7, 30)
  }

  #[test]
  fn test_login() {
    let mut app = offline_app();
    assert!(matches!(app.login("   "), Err(AppError::EmptyName)));

    let session = app.login(" 小明 ").unwrap();
    assert_eq!(session.name, "小明");
    assert!(!session.is_admin);

    assert!(app.login("喵喵店長").unwrap().is_admin);
  }

  #[test]
  fn test_restore_session() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
    let remote = Arc::new(HttpRemote::new(&ApiConfig::default()).unwrap());

    let mut first = App::new(Config::default(), remote.clone(), store.clone()).unwrap();
    assert!(!first.restore_session().unwrap());
    first.login("小明").unwrap();

    let mut second = App::new(Config::default(), remote.clone(), store.clone()).unwrap();
    assert!(second.restore_session().unwrap());
    assert_eq!(second.session().unwrap().name, "小明");

    second.logout().unwrap();
    assert!(second.session().is_none());
    let mut third = App::new(Config::default(), remote, store).unwrap();
    assert!(!third.restore_session().unwrap());
  }

  #[tokio::test]
  async fn test_checkout_total_and_lines() {
    let mut app = offline_app();
    app.login("小明").unwrap();
    app.change_quantity(1, 2).unwrap();
    app.change_quantity(10, 1).unwrap();
    assert_eq!(app.cart().total(app.menu()), 90);

    app.submit_checkout(seven_thirty(), Some("少冰".into())).unwrap();
    let order = app.wait_for_checkout().await.unwrap();

    assert_eq!(order.total, 90);
    assert_eq!(order.items.len(), 2);
    assert_eq!(order.items[0].quantity, 2);
    assert_eq!(order.items[1].quantity, 1);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.note.as_deref(), Some("少冰"));
    assert!(app.cart().is_empty());
    assert_eq!(app.visible_orders().len(), 1);
  }

  #[tokio::test]
  async fn test_double_submit_places_one_order() {
    let sheet = Arc::new(small_sheet());
    let mut app = online_app(sheet.clone());
    app.login("小明").unwrap();
    app.change_quantity(1, 1).unwrap();

    app.submit_checkout(seven_thirty(), None).unwrap();
    assert!(matches!(
      app.submit_checkout(seven_thirty(), None),
      Err(AppError::SubmitInFlight)
    ));

    app.wait_for_checkout().await.unwrap();
    app.flush().await;

    assert_eq!(sheet.orders().len(), 1);
    assert_eq!(app.sync().local_snapshot().unwrap().orders.len(), 1);
    // Cart was cleared by the landing, so a third click has nothing to send
    assert!(matches!(
      app.submit_checkout(seven_thirty(), None),
      Err(AppError::EmptyCart)
    ));
  }

  #[tokio::test]
  async fn test_checkout_validation() {
    let mut app = offline_app();
    assert!(matches!(
      app.submit_checkout(None, None),
      Err(AppError::NotLoggedIn)
    ));

    app.login("小明").unwrap();
    assert!(matches!(app.submit_checkout(None, None), Err(AppError::EmptyCart)));

    assert!(matches!(app.change_quantity(99, 1), Err(AppError::UnknownMenuItem(99))));
    app.change_quantity(1, 1).unwrap();
    assert!(matches!(
      app.submit_checkout(PickupTime::new(14, 0), None),
      Err(AppError::InvalidPickupTime(t)) if t == "14:00"
    ));
    assert!(!app.checkout.is_in_flight());
  }

  #[tokio::test]
  async fn test_order_status_permissions() {
    let mut app = offline_app();
    app.login("小明").unwrap();
    app.change_quantity(1, 1).unwrap();
    let order_id = app.submit_checkout(seven_thirty(), None).unwrap();
    app.wait_for_checkout().await.unwrap();
    app.flush().await;

    assert!(matches!(
      app.set_order_status(&order_id, OrderStatus::Delivered).await,
      Err(AppError::AdminOnly)
    ));

    app.login("小華").unwrap();
    assert!(matches!(
      app.cancel_my_order(&order_id).await,
      Err(AppError::Sync(SyncError::NotOrderOwner))
    ));

    app.login("小明").unwrap();
    app.cancel_my_order(&order_id).await.unwrap();
    app.flush().await;

    app.login("豬豬店長").unwrap();
    app.set_order_filter(OrderFilter::Cancelled);
    assert_eq!(app.visible_orders().len(), 1);
    assert!(matches!(
      app.set_order_status(&order_id, OrderStatus::Delivered).await,
      Err(AppError::Sync(SyncError::InvalidTransition { .. }))
    ));
    assert_eq!(app.unsynced_writes(), 2);
  }

  #[tokio::test]
  async fn test_menu_management_requires_admin() {
    let mut app = offline_app();
    assert!(matches!(app.add_category("飯糰").await, Err(AppError::NotLoggedIn)));

    app.login("小明").unwrap();
    assert!(matches!(app.add_category("飯糰").await, Err(AppError::AdminOnly)));
    assert!(matches!(app.delete_menu_item(1).await, Err(AppError::AdminOnly)));
    assert!(matches!(app.move_category(0, 1).await, Err(AppError::AdminOnly)));

    app.login("喵喵店長").unwrap();
    app.add_category("飯糰").await.unwrap();
    assert_eq!(app.categories().last().map(String::as_str), Some("飯糰"));
  }

  #[tokio::test]
  async fn test_visible_menu() {
    let mut app = offline_app();
    app.login("喵喵店長").unwrap();
    app.set_menu_item_enabled(10, false).await.unwrap();

    assert_eq!(app.visible_menu().len(), 13);
    app.select_category(Some("飲料".into()));
    let drinks: Vec<u32> = app.visible_menu().iter().map(|m| m.id).collect();
    assert_eq!(drinks, vec![11, 12, 13, 14]);

    // Hidden items cannot be added to the cart
    assert!(matches!(app.change_quantity(10, 1), Err(AppError::UnknownMenuItem(10))));

    // Deleting the selected category resets the filter
    app.delete_category("飲料").await.unwrap();
    assert_eq!(app.visible_menu().len(), 13);
  }

  #[tokio::test]
  async fn test_drag_reordering() {
    let mut app = offline_app();
    app.login("喵喵店長").unwrap();

    app.move_category(2, 0).await.unwrap();
    assert_eq!(app.categories(), ["飲料", "蛋餅", "鬆餅"]);

    app.move_menu_item(0, 13).await.unwrap();
    assert_eq!(app.menu().last().unwrap().id, 1);
    assert_eq!(app.menu().first().unwrap().id, 2);

    assert!(matches!(
      app.move_category(5, 0).await,
      Err(AppError::NoSuchPosition(5))
    ));
  }

  #[tokio::test]
  async fn test_tick_picks_up_background_results() {
    let sheet = Arc::new(small_sheet());
    let mut app = online_app(sheet.clone());
    app.login("喵喵店長").unwrap();

    let created = app.add_menu_item(NewMenuItem::new("蘿蔔糕", 40, "點心")).await.unwrap();
    assert_eq!(created.id, 15);

    let changes = app.flush().await;
    assert!(changes.menu);
    assert!(app.menu().iter().any(|m| m.id == 11 && m.name == "蘿蔔糕"));
    assert_eq!(app.unsynced_writes(), 0);

    assert!(app.start_refresh());
    assert!(!app.start_refresh());
    while app.refresh.is_in_flight() {
      tokio::task::yield_now().await;
      app.tick();
    }
    assert_eq!(app.menu(), sheet.menu().as_slice());
  }

  #[test]
  fn test_order_filter_parse() {
    assert_eq!("all".parse::<OrderFilter>(), Ok(OrderFilter::All));
    assert_eq!("Delivered".parse::<OrderFilter>(), Ok(OrderFilter::Delivered));
    assert!("soon".parse::<OrderFilter>().is_err());
    assert_eq!(OrderFilter::default(), OrderFilter::Pending);
  }
}
