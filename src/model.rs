//! Shop domain types shared by the cache, the remote protocol and the app.

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Image shown for menu items that have none.
pub const PLACEHOLDER_IMAGE: &str = "🍴";

/// Category names carry no identity beyond their text.
pub type Category = String;

/// A menu entry. Position in the menu list is its display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
  pub id: u32,
  pub name: String,
  pub price: u32,
  pub category: String,
  #[serde(default)]
  pub image: String,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
}

impl MenuItem {
  /// Image to display, falling back to the placeholder.
  pub fn image_or_placeholder(&self) -> &str {
    if self.image.is_empty() {
      PLACEHOLDER_IMAGE
    } else {
      &self.image
    }
  }
}

/// A menu item that has not been numbered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMenuItem {
  pub name: String,
  pub price: u32,
  pub category: String,
  #[serde(default)]
  pub image: String,
  #[serde(default = "default_enabled")]
  pub enabled: bool,
}

impl NewMenuItem {
  pub fn new(name: impl Into<String>, price: u32, category: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      price,
      category: category.into(),
      image: String::new(),
      enabled: true,
    }
  }

  pub fn with_image(mut self, image: impl Into<String>) -> Self {
    self.image = image.into();
    self
  }

  /// Assign an id, substituting the placeholder for an empty image.
  pub fn into_item(self, id: u32) -> MenuItem {
    let image = if self.image.trim().is_empty() {
      PLACEHOLDER_IMAGE.to_string()
    } else {
      self.image
    };
    MenuItem {
      id,
      name: self.name,
      price: self.price,
      category: self.category,
      image,
      enabled: self.enabled,
    }
  }
}

fn default_enabled() -> bool {
  true
}

/// Order lifecycle. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  pub fn is_terminal(self) -> bool {
    !matches!(self, OrderStatus::Pending)
  }

  /// Only pending orders move, and only forward.
  pub fn can_transition_to(self, next: OrderStatus) -> bool {
    self == OrderStatus::Pending && next.is_terminal()
  }

  pub fn as_str(self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "pending" => Ok(OrderStatus::Pending),
      "delivered" => Ok(OrderStatus::Delivered),
      "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
      other => Err(format!("unknown order status '{}'", other)),
    }
  }
}

/// One line of an order, priced at the moment it was added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
  pub id: u32,
  pub name: String,
  pub price: u32,
  pub quantity: u32,
}

impl OrderLine {
  pub fn subtotal(&self) -> u32 {
    self.price * self.quantity
  }
}

/// Wall-clock pickup slot, serialized as "HH:MM".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PickupTime {
  hour: u8,
  minute: u8,
}

impl PickupTime {
  pub fn new(hour: u8, minute: u8) -> Option<Self> {
    (hour < 24 && minute < 60).then_some(Self { hour, minute })
  }

  pub fn hour(&self) -> u8 {
    self.hour
  }

  pub fn minute(&self) -> u8 {
    self.minute
  }

  /// Wall-clock hour and minute of `dt` in its own zone.
  pub fn at<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
    Self {
      hour: dt.hour() as u8,
      minute: dt.minute() as u8,
    }
  }
}

impl fmt::Display for PickupTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.hour, self.minute)
  }
}

impl FromStr for PickupTime {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    if let Some((h, m)) = s.split_once(':') {
      if m.len() == 2 && (1..=2).contains(&h.len()) {
        if let (Ok(hour), Ok(minute)) = (h.parse::<u8>(), m.parse::<u8>()) {
          return PickupTime::new(hour, minute).ok_or_else(|| format!("invalid pickup time '{}'", s));
        }
      }
    }

    // The spreadsheet may hand back a time cell as a UTC timestamp; the shop
    // means the time on its own clock
    DateTime::parse_from_rfc3339(s)
      .map(|dt| Self::at(&dt.with_timezone(&Local)))
      .map_err(|_| format!("invalid pickup time '{}'", s))
  }
}

impl Serialize for PickupTime {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for PickupTime {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

/// A placed order. Lines and total are fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: String,
  pub customer: String,
  pub items: Vec<OrderLine>,
  pub total: u32,
  pub pickup_time: PickupTime,
  #[serde(
    default,
    deserialize_with = "empty_as_none",
    skip_serializing_if = "Option::is_none"
  )]
  pub note: Option<String>,
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

impl Order {
  /// Build a pending order; the total is always derived from the lines.
  pub fn new(
    id: String,
    customer: impl Into<String>,
    items: Vec<OrderLine>,
    pickup_time: PickupTime,
    note: Option<String>,
    created_at: DateTime<Utc>,
  ) -> Self {
    let total = items.iter().map(OrderLine::subtotal).sum();
    Self {
      id,
      customer: customer.into(),
      items,
      total,
      pickup_time,
      note: note.filter(|n| !n.trim().is_empty()),
      status: OrderStatus::Pending,
      created_at,
    }
  }

  pub fn computed_total(&self) -> u32 {
    self.items.iter().map(OrderLine::subtotal).sum()
  }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let v: Option<String> = Option::deserialize(deserializer)?;
  Ok(v.filter(|s| !s.trim().is_empty()))
}

static LAST_ORDER_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Generate a time-based order id ("ORD" + base-36 milliseconds).
///
/// Ids are strictly increasing within the process even when called twice in
/// the same millisecond.
pub fn generate_order_id(now: DateTime<Utc>) -> String {
  let wanted = now.timestamp_millis();
  let mut last = LAST_ORDER_MILLIS.load(Ordering::SeqCst);
  let millis = loop {
    let next = wanted.max(last + 1);
    match LAST_ORDER_MILLIS.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
      Ok(_) => break next,
      Err(actual) => last = actual,
    }
  };
  format!("ORD{}", to_base36(millis.max(0) as u64))
}

fn to_base36(mut n: u64) -> String {
  const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
  if n == 0 {
    return "0".to_string();
  }
  let mut out = Vec::new();
  while n > 0 {
    out.push(DIGITS[(n % 36) as usize]);
    n /= 36;
  }
  out.reverse();
  String::from_utf8(out).unwrap_or_default()
}
