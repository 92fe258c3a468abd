use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::MenuItem;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  /// Display names that get the admin views
  #[serde(default = "default_admin_users")]
  pub admin_users: Vec<String>,
  #[serde(default)]
  pub pickup: PickupConfig,
  /// Seed data written to the local cache on first use
  #[serde(default)]
  pub defaults: SeedConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      admin_users: default_admin_users(),
      pickup: PickupConfig::default(),
      defaults: SeedConfig::default(),
      cache: CacheConfig::default(),
      logging: LoggingConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Remote store endpoint. Unset means local-only operation.
  pub url: Option<String>,
  /// Backend version this build was written against
  #[serde(default = "default_expected_version")]
  pub expected_version: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      url: None,
      expected_version: default_expected_version(),
    }
  }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PickupConfig {
  pub start_hour: u8,
  pub end_hour: u8,
  pub interval_minutes: u8,
}

impl Default for PickupConfig {
  fn default() -> Self {
    Self {
      start_hour: 6,
      end_hour: 12,
      interval_minutes: 10,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
  #[serde(default = "default_categories")]
  pub categories: Vec<String>,
  #[serde(default = "default_menu")]
  pub menu: Vec<MenuItem>,
}

impl Default for SeedConfig {
  fn default() -> Self {
    Self {
      categories: default_categories(),
      menu: default_menu(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
  /// SQLite file for the local cache (default: $XDG_DATA_HOME/meowmenu/cache.db)
  pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for daily log files; console only when unset
  pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      directory: None,
    }
  }
}

fn default_expected_version() -> String {
  "1.0.2".to_string()
}

fn default_log_level() -> String {
  "warn".to_string()
}

fn default_admin_users() -> Vec<String> {
  vec!["喵喵店長".to_string(), "豬豬店長".to_string()]
}

fn default_categories() -> Vec<String> {
  ["蛋餅", "鬆餅", "飲料"].iter().map(|c| c.to_string()).collect()
}

fn default_menu() -> Vec<MenuItem> {
  const ROWS: &[(u32, &str, u32, &str, &str)] = &[
    (1, "原味蛋餅", 35, "蛋餅", "🥚"),
    (2, "起司蛋餅", 45, "蛋餅", "🧀"),
    (3, "玉米蛋餅", 45, "蛋餅", "🌽"),
    (4, "鮪魚蛋餅", 50, "蛋餅", "🐟"),
    (5, "培根蛋餅", 50, "蛋餅", "🥓"),
    (6, "原味鬆餅", 40, "鬆餅", "🧇"),
    (7, "巧克力鬆餅", 50, "鬆餅", "🍫"),
    (8, "蜂蜜鬆餅", 50, "鬆餅", "🍯"),
    (9, "奶油鬆餅", 45, "鬆餅", "🧈"),
    (10, "紅茶", 20, "飲料", "🍵"),
    (11, "奶茶", 30, "飲料", "🥛"),
    (12, "豆漿", 25, "飲料", "🫘"),
    (13, "咖啡", 35, "飲料", "☕"),
    (14, "柳橙汁", 40, "飲料", "🍊"),
  ];

  ROWS
    .iter()
    .map(|&(id, name, price, category, image)| MenuItem {
      id,
      name: name.to_string(),
      price,
      category: category.to_string(),
      image: image.to_string(),
      enabled: true,
    })
    .collect()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./meowmenu.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/meowmenu/config.yaml
  ///
  /// Falls back to built-in defaults when no file exists, since the shop works
  /// without a remote store.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Some(url) = Self::api_url_override() {
      config.api.url = Some(url);
    }

    config.validate()?;
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("meowmenu.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("meowmenu").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    Ok(config)
  }

  /// Remote endpoint from the environment.
  ///
  /// MEOWMENU_API_URL wins over the config file; an empty value is ignored.
  fn api_url_override() -> Option<String> {
    std::env::var("MEOWMENU_API_URL")
      .ok()
      .map(|u| u.trim().to_string())
      .filter(|u| !u.is_empty())
  }

  fn validate(&self) -> Result<()> {
    let p = &self.pickup;
    if p.start_hour > p.end_hour || p.end_hour > 23 {
      return Err(eyre!(
        "Invalid pickup hours {}..{}: need start <= end <= 23",
        p.start_hour,
        p.end_hour
      ));
    }
    if p.interval_minutes == 0 || p.interval_minutes > 60 {
      return Err(eyre!(
        "Invalid pickup interval {}: must be between 1 and 60 minutes",
        p.interval_minutes
      ));
    }
    Ok(())
  }

  pub fn is_admin(&self, name: &str) -> bool {
    self.admin_users.iter().any(|a| a == name)
  }
}
