//! Sync coordinator: local-first CRUD over the three tables with background
//! reconciliation against the remote store.
//!
//! Writes are applied to the local cache immediately and returned to the
//! caller; the matching remote call runs in a spawned task whose outcome is
//! published as a [`SyncEvent`]. Reads prefer the remote snapshot but never
//! let it overwrite a local change that has not settled yet.

mod guard;

use color_eyre::Report;
use futures::future::join_all;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{LocalCache, Table};
use crate::event::SyncEvent;
use crate::model::{Category, MenuItem, NewMenuItem, Order, OrderStatus};
use crate::remote::protocol::VersionInfo;
use crate::remote::{RemoteError, RemoteStore};
use guard::{ProcessingGuard, ProcessingSet, WriteTicket, WriteVersions};

/// Logical outcomes a caller may need to show to the user.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
  #[error("category already exists")]
  CategoryExists,

  #[error("category not found: {0}")]
  CategoryNotFound(String),

  #[error("category name is empty")]
  EmptyCategory,

  #[error("menu item not found: {0}")]
  MenuItemNotFound(u32),

  #[error("order not found: {0}")]
  OrderNotFound(String),

  #[error("order {0} already exists")]
  DuplicateOrder(String),

  #[error("cannot change a {from} order to {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("only the customer who placed an order can cancel it")]
  NotOrderOwner,

  #[error("order total {stated} does not match its lines ({computed})")]
  TotalMismatch { stated: u32, computed: u32 },

  /// Another operation on the same record is still waiting on the network
  #[error("{0} is already being processed")]
  Busy(String),

  #[error("local storage failed: {0}")]
  Storage(String),
}

impl From<Report> for SyncError {
  fn from(e: Report) -> Self {
    SyncError::Storage(format!("{:#}", e))
  }
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// All three tables as of one refresh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  pub orders: Vec<Order>,
  pub menu: Vec<MenuItem>,
  pub categories: Vec<Category>,
}

/// How the deployed backend compares to the version we expect.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionStatus {
  Current(VersionInfo),
  Mismatch(VersionInfo),
  Rejected(String),
  Unreachable(String),
}

#[derive(Clone)]
pub struct SyncCoordinator {
  remote: Arc<dyn RemoteStore>,
  cache: LocalCache,
  versions: Arc<WriteVersions>,
  processing: Arc<ProcessingSet>,
  /// Serializes "bump write version + mutate cache" against "check version +
  /// store snapshot". Never held across an await.
  commit: Arc<Mutex<()>>,
  tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
  events: Option<UnboundedSender<SyncEvent>>,
}

impl SyncCoordinator {
  pub fn new(remote: Arc<dyn RemoteStore>, cache: LocalCache) -> Self {
    Self {
      remote,
      cache,
      versions: WriteVersions::new(),
      processing: ProcessingSet::new(),
      commit: Arc::new(Mutex::new(())),
      tasks: Arc::new(Mutex::new(Vec::new())),
      events: None,
    }
  }

  /// Publish background reconciliation outcomes on `tx`.
  pub fn with_events(mut self, tx: UnboundedSender<SyncEvent>) -> Self {
    self.events = Some(tx);
    self
  }

  /// Seed the local cache on first use.
  pub fn init(&self) -> SyncResult<()> {
    Ok(self.cache.init()?)
  }

  pub fn remembered_user(&self) -> SyncResult<Option<String>> {
    Ok(self.cache.username()?)
  }

  pub fn remember_user(&self, name: &str) -> SyncResult<()> {
    Ok(self.cache.set_username(name)?)
  }

  pub fn forget_user(&self) -> SyncResult<()> {
    Ok(self.cache.clear_username()?)
  }

  /// Wait for every background write started so far (and any they started).
  pub async fn flush(&self) {
    loop {
      let pending = std::mem::take(&mut *lock(&self.tasks));
      if pending.is_empty() {
        break;
      }
      for result in join_all(pending).await {
        if let Err(e) = result {
          warn!(error = %e, "Background sync task failed");
        }
      }
    }
  }

  // ==========================================================================
  // Reads
  // ==========================================================================

  pub async fn orders(&self) -> SyncResult<Vec<Order>> {
    self
      .read(
        Table::Orders,
        self.remote.get_orders(),
        LocalCache::orders,
        LocalCache::replace_orders,
      )
      .await
  }

  pub async fn menu(&self) -> SyncResult<Vec<MenuItem>> {
    self
      .read(
        Table::Menu,
        self.remote.get_menu(),
        LocalCache::menu,
        LocalCache::replace_menu,
      )
      .await
  }

  pub async fn categories(&self) -> SyncResult<Vec<Category>> {
    self
      .read(
        Table::Categories,
        self.remote.get_categories(),
        LocalCache::categories,
        LocalCache::replace_categories,
      )
      .await
  }

  /// Pull all three tables concurrently.
  pub async fn refresh(&self) -> SyncResult<Snapshot> {
    let (orders, menu, categories) = tokio::join!(self.orders(), self.menu(), self.categories());
    Ok(Snapshot {
      orders: orders?,
      menu: menu?,
      categories: categories?,
    })
  }

  /// The local copy of every table, without touching the network.
  pub fn local_snapshot(&self) -> SyncResult<Snapshot> {
    Ok(Snapshot {
      orders: self.cache.orders()?,
      menu: self.cache.menu()?,
      categories: self.cache.categories()?,
    })
  }

  pub async fn check_version(&self, expected: &str) -> VersionStatus {
    match self.remote.check_version().await {
      Ok(info) if info.version == expected => VersionStatus::Current(info),
      Ok(info) => {
        warn!(expected, found = %info.version, "Backend version mismatch");
        VersionStatus::Mismatch(info)
      }
      Err(RemoteError::Rejected(msg)) => VersionStatus::Rejected(msg),
      Err(e) => VersionStatus::Unreachable(e.to_string()),
    }
  }

  // ==========================================================================
  // Orders
  // ==========================================================================

  /// Record a new order locally and persist it in the background.
  pub async fn create_order(&self, order: Order) -> SyncResult<Order> {
    let computed = order.computed_total();
    if order.total != computed {
      return Err(SyncError::TotalMismatch {
        stated: order.total,
        computed,
      });
    }

    // Held until the created row is written back, so a status change cannot
    // be overwritten by it
    let guard = self.claim(format!("order:{}", order.id))?;

    let ticket = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Orders);
      if !self.cache.insert_order(&order)? {
        return Err(SyncError::DuplicateOrder(order.id));
      }
      ticket
    };
    info!(order_id = %order.id, total = order.total, "Order placed");

    let remote = Arc::clone(&self.remote);
    let cache = self.cache.clone();
    let payload = order.clone();
    self.reconcile(Table::Orders, "createOrder", ticket, Some(guard), async move {
      let created = remote.create_order(payload).await?;
      if let Err(e) = cache.upsert_order(&created) {
        warn!(order_id = %created.id, error = %e, "Failed to write through created order");
      }
      Ok(())
    });

    Ok(order)
  }

  /// Move an order to a terminal status (admin).
  ///
  /// An order missing locally is looked up remotely first, so the transition
  /// is checked against its current status either way.
  pub async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> SyncResult<()> {
    let guard = self.claim(format!("order:{}", order_id))?;
    self.find_order(order_id).await?;
    self.apply_status(order_id, status, guard)
  }

  /// Cancel an order on behalf of the customer who placed it.
  pub async fn cancel_order(&self, order_id: &str, requester: &str) -> SyncResult<()> {
    let guard = self.claim(format!("order:{}", order_id))?;

    let order = self.find_order(order_id).await?;
    if order.customer != requester {
      return Err(SyncError::NotOrderOwner);
    }

    self.apply_status(order_id, OrderStatus::Cancelled, guard)
  }

  /// The locally cached order, else whatever a fresh read of the orders
  /// table turns up (which also caches it).
  async fn find_order(&self, order_id: &str) -> SyncResult<Order> {
    if let Some(order) = self.cache.order(order_id)? {
      return Ok(order);
    }
    self
      .orders()
      .await?
      .into_iter()
      .find(|o| o.id == order_id)
      .ok_or_else(|| SyncError::OrderNotFound(order_id.to_string()))
  }

  fn apply_status(&self, order_id: &str, status: OrderStatus, guard: ProcessingGuard) -> SyncResult<()> {
    let ticket = {
      let _commit = self.lock_commit();
      let current = self
        .cache
        .order(order_id)?
        .ok_or_else(|| SyncError::OrderNotFound(order_id.to_string()))?;
      if !current.status.can_transition_to(status) {
        return Err(SyncError::InvalidTransition {
          from: current.status,
          to: status,
        });
      }
      let ticket = self.versions.begin_write(Table::Orders);
      self.cache.set_order_status(order_id, status)?;
      ticket
    };
    info!(order_id, %status, "Order status changed");

    let remote = Arc::clone(&self.remote);
    let id = order_id.to_string();
    self.reconcile(Table::Orders, "updateOrderStatus", ticket, Some(guard), async move {
      remote.update_order_status(&id, status).await
    });
    Ok(())
  }

  // ==========================================================================
  // Menu
  // ==========================================================================

  /// Add an item under a provisional local id; the remote id replaces it
  /// once the backend has numbered the row.
  pub async fn add_menu_item(&self, item: NewMenuItem) -> SyncResult<MenuItem> {
    let (ticket, local, guard) = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Menu);
      let local = self.cache.add_menu_item(item.clone())?;
      // Edits to the provisional id would be lost when the remote row replaces it
      let guard = self.processing.try_acquire(format!("menu:{}", local.id));
      (ticket, local, guard)
    };
    info!(item_id = local.id, name = %local.name, "Menu item added");

    let remote = Arc::clone(&self.remote);
    let cache = self.cache.clone();
    let local_id = local.id;
    self.reconcile(Table::Menu, "addMenuItem", ticket, guard, async move {
      let created = remote.add_menu_item(item).await?;
      if created.id != local_id {
        debug!(local_id, remote_id = created.id, "Renumbering menu item");
      }
      if let Err(e) = cache.reconcile_menu_item(local_id, &created) {
        warn!(local_id, error = %e, "Failed to write through created menu item");
      }
      Ok(())
    });

    Ok(local)
  }

  pub async fn update_menu_item(&self, item: MenuItem) -> SyncResult<()> {
    let guard = self.claim(format!("menu:{}", item.id))?;
    self.apply_menu_update(item, guard).await
  }

  /// Show or hide an item on the customer menu.
  pub async fn set_menu_item_enabled(&self, item_id: u32, enabled: bool) -> SyncResult<MenuItem> {
    let guard = self.claim(format!("menu:{}", item_id))?;

    let mut item = match self.cache.menu_item(item_id)? {
      Some(item) => item,
      None => self
        .menu()
        .await?
        .into_iter()
        .find(|m| m.id == item_id)
        .ok_or(SyncError::MenuItemNotFound(item_id))?,
    };
    item.enabled = enabled;

    self.apply_menu_update(item.clone(), guard).await?;
    Ok(item)
  }

  async fn apply_menu_update(&self, item: MenuItem, guard: ProcessingGuard) -> SyncResult<()> {
    let staged = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Menu);
      self.cache.update_menu_item(&item)?.then_some(ticket)
    };

    match staged {
      Some(ticket) => {
        info!(item_id = item.id, "Menu item updated");
        let remote = Arc::clone(&self.remote);
        self.reconcile(Table::Menu, "updateMenuItem", ticket, Some(guard), async move {
          remote.update_menu_item(item).await
        });
        Ok(())
      }
      None => {
        let id = item.id;
        self
          .remote_only(
            Table::Menu,
            "updateMenuItem",
            self.remote.update_menu_item(item),
            SyncError::MenuItemNotFound(id),
          )
          .await
      }
    }
  }

  pub async fn delete_menu_item(&self, item_id: u32) -> SyncResult<()> {
    let guard = self.claim(format!("menu:{}", item_id))?;

    let staged = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Menu);
      self.cache.delete_menu_item(item_id)?.then_some(ticket)
    };

    match staged {
      Some(ticket) => {
        info!(item_id, "Menu item deleted");
        let remote = Arc::clone(&self.remote);
        self.reconcile(Table::Menu, "deleteMenuItem", ticket, Some(guard), async move {
          remote.delete_menu_item(item_id).await
        });
        Ok(())
      }
      None => {
        self
          .remote_only(
            Table::Menu,
            "deleteMenuItem",
            self.remote.delete_menu_item(item_id),
            SyncError::MenuItemNotFound(item_id),
          )
          .await
      }
    }
  }

  /// Rewrite the menu order; ids left out keep their relative order at the end.
  pub async fn reorder_menu(&self, ids: Vec<u32>) -> SyncResult<Vec<MenuItem>> {
    let (ticket, menu) = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Menu);
      (ticket, self.cache.reorder_menu(&ids)?)
    };
    info!(count = menu.len(), "Menu reordered");

    let remote = Arc::clone(&self.remote);
    self.reconcile(Table::Menu, "updateMenuOrder", ticket, None, async move {
      let written = remote.update_menu_order(ids).await?;
      debug!(written, "Menu order written");
      Ok(())
    });

    Ok(menu)
  }

  // ==========================================================================
  // Categories
  // ==========================================================================

  pub async fn add_category(&self, name: &str) -> SyncResult<()> {
    let name = name.trim();
    if name.is_empty() {
      return Err(SyncError::EmptyCategory);
    }

    let ticket = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Categories);
      if !self.cache.add_category(name)? {
        return Err(SyncError::CategoryExists);
      }
      ticket
    };
    info!(category = name, "Category added");

    let remote = Arc::clone(&self.remote);
    let category = name.to_string();
    self.reconcile(Table::Categories, "addCategory", ticket, None, async move {
      remote.add_category(category).await
    });
    Ok(())
  }

  /// Remove a category. Menu items that reference it keep their category.
  pub async fn delete_category(&self, name: &str) -> SyncResult<()> {
    let staged = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Categories);
      self.cache.delete_category(name)?.then_some(ticket)
    };

    match staged {
      Some(ticket) => {
        info!(category = name, "Category deleted");
        let remote = Arc::clone(&self.remote);
        let category = name.to_string();
        self.reconcile(Table::Categories, "deleteCategory", ticket, None, async move {
          remote.delete_category(category).await
        });
        Ok(())
      }
      None => {
        self
          .remote_only(
            Table::Categories,
            "deleteCategory",
            self.remote.delete_category(name.to_string()),
            SyncError::CategoryNotFound(name.to_string()),
          )
          .await
      }
    }
  }

  /// Replace the category list with `categories`, in that order.
  ///
  /// Names are trimmed and blanks dropped, matching what the backend stores.
  pub async fn reorder_categories(&self, categories: Vec<Category>) -> SyncResult<Vec<Category>> {
    let rows: Vec<Category> = categories
      .iter()
      .map(|c| c.trim().to_string())
      .filter(|c| !c.is_empty())
      .collect();

    let (ticket, stored) = {
      let _commit = self.lock_commit();
      let ticket = self.versions.begin_write(Table::Categories);
      (ticket, self.cache.reorder_categories(&rows)?)
    };
    info!(count = stored.len(), "Categories reordered");

    let remote = Arc::clone(&self.remote);
    self.reconcile(Table::Categories, "updateCategoryOrder", ticket, None, async move {
      let written = remote.update_category_order(rows).await?;
      debug!(written, "Category order written");
      Ok(())
    });

    Ok(stored)
  }

  // ==========================================================================
  // Plumbing
  // ==========================================================================

  /// Fetch a table remotely and store it, unless a local write got in the way.
  async fn read<T, F>(
    &self,
    table: Table,
    fetch: F,
    load: fn(&LocalCache) -> color_eyre::Result<Vec<T>>,
    store: fn(&LocalCache, &[T]) -> color_eyre::Result<Vec<T>>,
  ) -> SyncResult<Vec<T>>
  where
    F: Future<Output = Result<Vec<T>, RemoteError>>,
  {
    let Some(read) = self.versions.begin_read(table) else {
      debug!(table = table.name(), "Write in flight, serving local copy");
      return Ok(load(&self.cache)?);
    };

    match fetch.await {
      Ok(rows) => {
        let _commit = self.lock_commit();
        if self.versions.is_current(&read) {
          Ok(store(&self.cache, &rows)?)
        } else {
          debug!(table = table.name(), "Discarding snapshot older than a local write");
          Ok(load(&self.cache)?)
        }
      }
      Err(e) => {
        warn!(table = table.name(), error = %e, "Remote read failed, using local cache");
        Ok(load(&self.cache)?)
      }
    }
  }

  /// Forward a change the local cache cannot apply; `missing` if the remote
  /// refuses too.
  async fn remote_only<F>(&self, table: Table, action: &'static str, call: F, missing: SyncError) -> SyncResult<()>
  where
    F: Future<Output = Result<(), RemoteError>>,
  {
    let _ticket = self.versions.begin_write(table);
    match call.await {
      Ok(()) => {
        info!(table = table.name(), action, "Applied remotely for a record missing locally");
        Ok(())
      }
      Err(e) => {
        debug!(table = table.name(), action, error = %e, "No local or remote record");
        Err(missing)
      }
    }
  }

  /// Run the remote half of a write in the background.
  fn reconcile<F>(
    &self,
    table: Table,
    action: &'static str,
    ticket: WriteTicket,
    guard: Option<ProcessingGuard>,
    call: F,
  ) where
    F: Future<Output = Result<(), RemoteError>> + Send + 'static,
  {
    let events = self.events.clone();
    let handle = tokio::spawn(async move {
      let event = match call.await {
        Ok(()) => {
          info!(table = table.name(), action, "Change persisted");
          SyncEvent::Persisted { table, action }
        }
        Err(e) => {
          warn!(table = table.name(), action, error = %e, "Remote write failed, kept locally");
          SyncEvent::LocalOnly {
            table,
            action,
            error: e.to_string(),
          }
        }
      };
      drop(guard);
      drop(ticket);
      if let Some(tx) = events {
        let _ = tx.send(event);
      }
    });

    let mut tasks = lock(&self.tasks);
    tasks.retain(|h| !h.is_finished());
    tasks.push(handle);
  }

  fn claim(&self, key: String) -> SyncResult<ProcessingGuard> {
    match self.processing.try_acquire(key.clone()) {
      Some(guard) => Ok(guard),
      None => Err(SyncError::Busy(key)),
    }
  }

  fn lock_commit(&self) -> MutexGuard<'_, ()> {
    lock(&self.commit)
  }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
