use clap::Subcommand;
use color_eyre::{eyre::eyre, Result};
use std::str::FromStr;
use std::time::{Duration, Instant};

use crate::app::{App, AppError, Changes, OrderFilter};
use crate::event::{Event, EventHandler};
use crate::model::{NewMenuItem, Order, OrderStatus, PickupTime};
use crate::sync::VersionStatus;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Show the menu
  Menu {
    /// Only items in this category
    #[arg(short, long)]
    category: Option<String>,
  },
  /// List categories in display order
  Categories,
  /// List pickup times
  Slots,
  /// Place an order
  Order {
    /// Menu item id, optionally with a quantity: 3 or 3x2
    #[arg(short, long = "item", required = true)]
    items: Vec<CartEntry>,
    /// Pickup time (HH:MM); defaults to the next available slot
    #[arg(short, long)]
    pickup: Option<PickupTime>,
    #[arg(short, long)]
    note: Option<String>,
  },
  /// List orders
  Orders {
    /// all, pending, delivered or cancelled
    #[arg(short, long, default_value = "pending")]
    filter: OrderFilter,
  },
  /// Mark an order delivered (admin)
  Deliver { id: String },
  /// Cancel an order (your own, or any as admin)
  Cancel { id: String },
  /// Manage categories (admin)
  #[command(subcommand)]
  Category(CategoryCommand),
  /// Manage menu items (admin)
  #[command(subcommand)]
  Item(ItemCommand),
  /// Pull every table from the remote store
  Sync,
  /// Keep refreshing and print what changes
  Watch {
    /// Seconds between refreshes
    #[arg(short, long, default_value_t = 10)]
    interval: u64,
  },
  /// Compare the remote store version with the expected one
  Version,
  /// Forget the remembered display name
  Logout,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
  Add { name: String },
  Remove { name: String },
  /// Move the category at position FROM to position TO (1-based)
  Move { from: usize, to: usize },
  /// Replace the list with exactly these names, in order
  Reorder {
    #[arg(required = true)]
    names: Vec<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum ItemCommand {
  Add {
    name: String,
    price: u32,
    category: String,
    #[arg(short, long)]
    image: Option<String>,
  },
  Edit {
    id: u32,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<u32>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    image: Option<String>,
  },
  Enable { id: u32 },
  Disable { id: u32 },
  Remove { id: u32 },
  /// Move the item at position FROM to position TO (1-based)
  Move { from: usize, to: usize },
  /// Put these ids first; the rest keep their order after them
  Reorder {
    #[arg(required = true)]
    ids: Vec<u32>,
  },
}

/// One `--item` argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartEntry {
  pub id: u32,
  pub quantity: u32,
}

impl FromStr for CartEntry {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (id, quantity) = match s.trim().split_once(['x', 'X', '*']) {
      Some((id, qty)) => (id, qty),
      None => (s.trim(), "1"),
    };
    let id = id.trim().parse::<u32>().map_err(|_| format!("invalid item id '{}'", id))?;
    let quantity = quantity
      .trim()
      .parse::<u32>()
      .ok()
      .filter(|q| *q > 0)
      .ok_or_else(|| format!("invalid quantity '{}'", quantity))?;
    Ok(Self { id, quantity })
  }
}

pub async fn run(app: &mut App, command: Command) -> Result<()> {
  match command {
    Command::Menu { category } => {
      app.refresh().await?;
      app.select_category(category);
      print_menu(app);
    }
    Command::Categories => {
      app.refresh().await?;
      for (pos, category) in app.categories().iter().enumerate() {
        println!("{:>2}. {}", pos + 1, category);
      }
    }
    Command::Slots => {
      let default = app.default_pickup();
      for slot in app.slots().slots() {
        let marker = if slot == default { " *" } else { "" };
        println!("{}{}", slot, marker);
      }
    }
    Command::Order {
      items,
      pickup,
      note,
    } => {
      for entry in items {
        app.change_quantity(entry.id, i64::from(entry.quantity))?;
      }
      app.submit_checkout(pickup, note)?;
      let order = app.wait_for_checkout().await?;
      println!("Placed {}", order.id);
      print_order(&order);
    }
    Command::Orders { filter } => {
      app.refresh().await?;
      app.set_order_filter(filter);
      let orders = app.visible_orders();
      if orders.is_empty() {
        println!("No orders");
      }
      for order in orders {
        print_order(order);
      }
    }
    Command::Deliver { id } => {
      app.set_order_status(&id, OrderStatus::Delivered).await?;
      println!("Delivered {}", id);
    }
    Command::Cancel { id } => {
      let is_admin = app.session().is_some_and(|s| s.is_admin);
      if is_admin {
        app.set_order_status(&id, OrderStatus::Cancelled).await?;
      } else {
        app.cancel_my_order(&id).await?;
      }
      println!("Cancelled {}", id);
    }
    Command::Category(command) => run_category(app, command).await?,
    Command::Item(command) => run_item(app, command).await?,
    Command::Sync => {
      let changes = app.refresh().await?;
      print_changes(changes);
    }
    Command::Watch { interval } => watch(app, Duration::from_secs(interval.max(1))).await?,
    Command::Version => {
      let expected = app.config().api.expected_version.clone();
      match app.sync().check_version(&expected).await {
        VersionStatus::Current(info) => {
          println!("{} {} (up to date)", info.spreadsheet_name, info.version)
        }
        VersionStatus::Mismatch(info) => println!(
          "{} {} (expected {})",
          info.spreadsheet_name, info.version, expected
        ),
        VersionStatus::Rejected(msg) => return Err(eyre!("Remote store refused version check: {}", msg)),
        VersionStatus::Unreachable(msg) => println!("Remote store unreachable: {}", msg),
      }
    }
    Command::Logout => {
      app.logout()?;
      println!("Logged out");
    }
  }

  app.flush().await;
  if let Some(notice) = app.take_notice() {
    println!("{}", notice);
  }
  if let Some(warning) = unsynced_warning(app.unsynced_writes()) {
    eprintln!("{}", warning);
  }
  Ok(())
}

/// Only writes made by this run are counted; earlier runs are not tracked.
fn unsynced_warning(count: usize) -> Option<String> {
  (count > 0).then(|| {
    format!(
      "{} change(s) made in this run were saved locally only; the remote store did not accept them",
      count
    )
  })
}

async fn run_category(app: &mut App, command: CategoryCommand) -> Result<()> {
  match command {
    CategoryCommand::Add { name } => app.add_category(&name).await?,
    CategoryCommand::Remove { name } => app.delete_category(&name).await?,
    CategoryCommand::Move { from, to } => app.move_category(index(from)?, index(to)?).await?,
    CategoryCommand::Reorder { names } => app.reorder_categories(names).await?,
  }
  for (pos, category) in app.categories().iter().enumerate() {
    println!("{:>2}. {}", pos + 1, category);
  }
  Ok(())
}

async fn run_item(app: &mut App, command: ItemCommand) -> Result<()> {
  match command {
    ItemCommand::Add {
      name,
      price,
      category,
      image,
    } => {
      let mut item = NewMenuItem::new(name, price, category);
      if let Some(image) = image {
        item = item.with_image(image);
      }
      let created = app.add_menu_item(item).await?;
      println!("Added #{} {}", created.id, created.name);
    }
    ItemCommand::Edit {
      id,
      name,
      price,
      category,
      image,
    } => {
      let mut item = app
        .menu()
        .iter()
        .find(|m| m.id == id)
        .cloned()
        .ok_or(AppError::UnknownMenuItem(id))?;
      if let Some(name) = name {
        item.name = name;
      }
      if let Some(price) = price {
        item.price = price;
      }
      if let Some(category) = category {
        item.category = category;
      }
      if let Some(image) = image {
        item.image = image;
      }
      app.update_menu_item(item).await?;
      println!("Updated #{}", id);
    }
    ItemCommand::Enable { id } => {
      let item = app.set_menu_item_enabled(id, true).await?;
      println!("#{} {} is on the menu", item.id, item.name);
    }
    ItemCommand::Disable { id } => {
      let item = app.set_menu_item_enabled(id, false).await?;
      println!("#{} {} is hidden", item.id, item.name);
    }
    ItemCommand::Remove { id } => {
      app.delete_menu_item(id).await?;
      println!("Removed #{}", id);
    }
    ItemCommand::Move { from, to } => {
      app.move_menu_item(index(from)?, index(to)?).await?;
      print_menu(app);
    }
    ItemCommand::Reorder { ids } => {
      app.reorder_menu(ids).await?;
      print_menu(app);
    }
  }
  Ok(())
}

async fn watch(app: &mut App, interval: Duration) -> Result<()> {
  let mut events = EventHandler::new(Duration::from_millis(250));
  app.start_refresh();
  let mut last_refresh = Instant::now();

  while let Some(event) = events.next().await {
    match event {
      Event::Quit => break,
      Event::Tick => {
        let changes = app.tick();
        if changes.any() {
          print_changes(changes);
        }
        if let Some(notice) = app.take_notice() {
          println!("{}", notice);
        }
        if last_refresh.elapsed() >= interval && app.start_refresh() {
          last_refresh = Instant::now();
        }
      }
    }
  }
  Ok(())
}

/// 1-based position from the command line to a list index.
fn index(position: usize) -> Result<usize> {
  position
    .checked_sub(1)
    .ok_or_else(|| eyre!("Positions start at 1"))
}

fn print_menu(app: &App) {
  let is_admin = app.session().is_some_and(|s| s.is_admin);
  if is_admin {
    // Admins see hidden items too
    for item in app.menu() {
      let hidden = if item.enabled { "" } else { "  (hidden)" };
      println!(
        "{:>3}  {} {}  ${}  [{}]{}",
        item.id,
        item.image_or_placeholder(),
        item.name,
        item.price,
        item.category,
        hidden
      );
    }
    return;
  }

  for item in app.visible_menu() {
    println!(
      "{:>3}  {} {}  ${}  [{}]",
      item.id,
      item.image_or_placeholder(),
      item.name,
      item.price,
      item.category
    );
  }
}

fn print_order(order: &Order) {
  println!(
    "{}  {}  pickup {}  ${}  {}",
    order.id, order.customer, order.pickup_time, order.total, order.status
  );
  for line in &order.items {
    println!("    {} x{}  ${}", line.name, line.quantity, line.subtotal());
  }
  if let Some(note) = &order.note {
    println!("    note: {}", note);
  }
}

fn print_changes(changes: Changes) {
  let mut tables = Vec::new();
  if changes.menu {
    tables.push("menu");
  }
  if changes.categories {
    tables.push("categories");
  }
  if changes.orders {
    tables.push("orders");
  }
  if tables.is_empty() {
    println!("Up to date");
  } else {
    println!("Updated: {}", tables.join(", "));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::MemoryStorage;
  use crate::config::Config;
  use crate::model::OrderLine;
  use crate::remote::sheet::{small_sheet, SheetStore};
  use chrono::Utc;
  use clap::Parser;
  use std::sync::Arc;

  #[derive(Parser, Debug)]
  struct TestArgs {
    #[command(subcommand)]
    command: Command,
  }

  #[test]
  fn test_cart_entry_parsing() {
    assert_eq!("3".parse::<CartEntry>(), Ok(CartEntry { id: 3, quantity: 1 }));
    assert_eq!("1x2".parse::<CartEntry>(), Ok(CartEntry { id: 1, quantity: 2 }));
    assert_eq!("10X3".parse::<CartEntry>(), Ok(CartEntry { id: 10, quantity: 3 }));
    assert!("x2".parse::<CartEntry>().is_err());
    assert!("4x0".parse::<CartEntry>().is_err());
  }

  #[test]
  fn test_order_command() {
    let args = TestArgs::try_parse_from([
      "meowmenu", "order", "--item", "1x2", "--item", "10", "--pickup", "07:30",
    ])
    .unwrap();
    match args.command {
      Command::Order { items, pickup, note } => {
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], CartEntry { id: 1, quantity: 2 });
        assert_eq!(pickup, PickupTime::new(7, 30));
        assert_eq!(note, None);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn test_orders_filter_defaults_to_pending() {
    let args = TestArgs::try_parse_from(["meowmenu", "orders"]).unwrap();
    assert!(matches!(
      args.command,
      Command::Orders {
        filter: OrderFilter::Pending
      }
    ));
    assert!(TestArgs::try_parse_from(["meowmenu", "orders", "--filter", "later"]).is_err());
  }

  #[test]
  fn test_positions_are_one_based() {
    assert_eq!(index(1).unwrap(), 0);
    assert!(index(0).is_err());
  }

  #[test]
  fn test_unsynced_warning_covers_this_run() {
    assert_eq!(unsynced_warning(0), None);
    assert!(unsynced_warning(2).unwrap().starts_with("2 change(s) made in this run"));
  }

  fn online_app(sheet: Arc<SheetStore>, user: &str) -> App {
    let mut app = App::new(Config::default(), sheet, Arc::new(MemoryStorage::new())).unwrap();
    app.login(user).unwrap();
    app
  }

  #[tokio::test]
  async fn test_orders_command_reads_remote() {
    let sheet = Arc::new(small_sheet());
    let placed = Order::new(
      "ORDOTHER".to_string(),
      "小華",
      vec![OrderLine {
        id: 10,
        name: "紅茶".into(),
        price: 20,
        quantity: 1,
      }],
      PickupTime::new(8, 0).unwrap(),
      None,
      Utc::now(),
    );
    sheet.edit(|orders, _, _| orders.push(placed));

    let mut app = online_app(sheet.clone(), "喵喵店長");
    assert!(app.visible_orders().is_empty());

    run(&mut app, Command::Orders { filter: OrderFilter::All }).await.unwrap();
    assert!(sheet.calls().iter().any(|a| a == "getOrders"));
    assert_eq!(app.visible_orders().len(), 1);
    assert_eq!(app.visible_orders()[0].id, "ORDOTHER");
  }

  #[tokio::test]
  async fn test_menu_and_categories_commands_read_remote() {
    let sheet = Arc::new(small_sheet());
    let mut app = online_app(sheet.clone(), "小明");
    assert_eq!(app.menu().len(), 14);

    run(&mut app, Command::Menu { category: None }).await.unwrap();
    assert!(sheet.calls().iter().any(|a| a == "getMenu"));
    assert_eq!(app.menu(), sheet.menu().as_slice());

    run(&mut app, Command::Categories).await.unwrap();
    assert!(sheet.calls().iter().any(|a| a == "getCategories"));
    assert_eq!(app.categories(), ["蛋餅", "飲料"]);
  }
}
