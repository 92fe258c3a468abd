use chrono::{Duration, NaiveTime, Timelike};

use crate::config::PickupConfig;
use crate::model::{MenuItem, OrderLine, PickupTime};

/// Minutes between "now" and the earliest suggested pickup.
const PICKUP_LEAD_MINUTES: i64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
  pub item_id: u32,
  pub quantity: u32,
}

/// An order in progress. Lines keep the order they were first added in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
  lines: Vec<CartLine>,
}

impl Cart {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn lines(&self) -> &[CartLine] {
    &self.lines
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Add `delta` to an item's quantity; the line goes away at zero or below.
  pub fn change_quantity(&mut self, item_id: u32, delta: i64) {
    match self.lines.iter().position(|l| l.item_id == item_id) {
      Some(pos) => {
        let next = i64::from(self.lines[pos].quantity) + delta;
        if next <= 0 {
          self.lines.remove(pos);
        } else {
          self.lines[pos].quantity = u32::try_from(next).unwrap_or(u32::MAX);
        }
      }
      None if delta > 0 => self.lines.push(CartLine {
        item_id,
        quantity: u32::try_from(delta).unwrap_or(u32::MAX),
      }),
      None => {}
    }
  }

  pub fn remove(&mut self, item_id: u32) {
    self.lines.retain(|l| l.item_id != item_id);
  }

  pub fn clear(&mut self) {
    self.lines.clear();
  }

  /// Price the cart against `menu`. Errors with the first id the menu lacks.
  pub fn order_lines(&self, menu: &[MenuItem]) -> Result<Vec<OrderLine>, u32> {
    self
      .lines
      .iter()
      .map(|line| {
        let item = menu.iter().find(|m| m.id == line.item_id).ok_or(line.item_id)?;
        Ok(OrderLine {
          id: item.id,
          name: item.name.clone(),
          price: item.price,
          quantity: line.quantity,
        })
      })
      .collect()
  }

  /// Sum of price × quantity; lines whose item vanished count as zero.
  pub fn total(&self, menu: &[MenuItem]) -> u32 {
    self
      .lines
      .iter()
      .filter_map(|line| {
        menu
          .iter()
          .find(|m| m.id == line.item_id)
          .map(|m| m.price * line.quantity)
      })
      .sum()
  }
}

/// The grid of pickup times customers may choose from.
#[derive(Debug, Clone, Copy)]
pub struct PickupSlots {
  config: PickupConfig,
}

impl PickupSlots {
  pub fn new(config: PickupConfig) -> Self {
    Self { config }
  }

  /// Every slot from `start_hour:00` through the last one in `end_hour`.
  pub fn slots(&self) -> Vec<PickupTime> {
    let step = usize::from(self.config.interval_minutes.max(1));
    (self.config.start_hour..=self.config.end_hour)
      .flat_map(|hour| (0..60u8).step_by(step).filter_map(move |minute| PickupTime::new(hour, minute)))
      .collect()
  }

  /// A little after `now`, pulled into opening hours and onto the grid.
  pub fn default_slot(&self, now: NaiveTime) -> PickupTime {
    let target = now + Duration::minutes(PICKUP_LEAD_MINUTES);
    let hour = (target.hour() as u8).clamp(self.config.start_hour, self.config.end_hour);
    let interval = self.config.interval_minutes.max(1);
    let minute = (target.minute() as u8) / interval * interval;
    PickupTime::new(hour, minute).unwrap_or_else(|| self.first_slot())
  }

  pub fn contains(&self, time: PickupTime) -> bool {
    let interval = self.config.interval_minutes.max(1);
    (self.config.start_hour..=self.config.end_hour).contains(&time.hour())
      && time.minute() % interval == 0
  }

  fn first_slot(&self) -> PickupTime {
    PickupTime::new(self.config.start_hour, 0).unwrap_or_default()
  }
}
