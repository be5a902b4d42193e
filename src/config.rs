//! Configuration loading and management.
//!
//! Sources, lowest priority first: built-in defaults, a YAML file (explicit
//! path or `points-ledger/config.yaml`), `POINTS_LEDGER_*` environment
//! variables, then CLI flags applied by the binary.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-level config file probed when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "points-ledger/config.yaml";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub rewards: RewardsConfig,

    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            bind: default_bind(),
            port: default_port(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("points-ledger/ledger.db")
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Bearer token settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
        }
    }
}

fn default_jwt_secret() -> String {
    "dev-secret".to_string()
}

/// Fixed bonuses paid when a referral is established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_bonus_to_referrer")]
    pub bonus_to_referrer: i64,

    #[serde(default = "default_bonus_to_referred")]
    pub bonus_to_referred: i64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            bonus_to_referrer: default_bonus_to_referrer(),
            bonus_to_referred: default_bonus_to_referred(),
        }
    }
}

fn default_bonus_to_referrer() -> i64 {
    50
}

fn default_bonus_to_referred() -> i64 {
    10
}

/// Leaderboard page size bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> u32 {
    10
}

fn default_max_limit() -> u32 {
    100
}

impl LeaderboardConfig {
    /// Bring a caller-supplied limit into `1..=max_limit`.
    ///
    /// Missing or non-positive values fall back to the default; oversized
    /// values are capped rather than rejected.
    pub fn clamp(&self, requested: Option<i64>) -> u32 {
        let max = self.max_limit.max(1);
        match requested {
            Some(n) if n > 0 => n.min(i64::from(max)) as u32,
            _ => self.default_limit.clamp(1, max),
        }
    }
}

impl Config {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from the explicit path, else the project file if present, else
    /// defaults; then apply environment overrides.
    ///
    /// An explicit path that cannot be read is an error. The project file is
    /// optional.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(DEFAULT_CONFIG_PATH)?,
            None => Self::default(),
        };

        config.apply_env_with(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would let an operation lower a balance.
    pub fn validate(&self) -> Result<()> {
        if self.rewards.bonus_to_referrer < 0 {
            bail!(
                "rewards.bonus_to_referrer must not be negative (got {})",
                self.rewards.bonus_to_referrer
            );
        }
        if self.rewards.bonus_to_referred < 0 {
            bail!(
                "rewards.bonus_to_referred must not be negative (got {})",
                self.rewards.bonus_to_referred
            );
        }
        Ok(())
    }

    /// Apply `POINTS_LEDGER_*` overrides read through `lookup`.
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db_path) = lookup("POINTS_LEDGER_DB_PATH") {
            self.server.db_path = PathBuf::from(db_path);
        }

        if let Some(port) = lookup("POINTS_LEDGER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }

        if let Some(secret) = lookup("POINTS_LEDGER_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }

        if let Some(bonus) =
            lookup("POINTS_LEDGER_BONUS_TO_REFERRER").and_then(|v| v.parse().ok())
        {
            self.rewards.bonus_to_referrer = bonus;
        }

        if let Some(bonus) =
            lookup("POINTS_LEDGER_BONUS_TO_REFERRED").and_then(|v| v.parse().ok())
        {
            self.rewards.bonus_to_referred = bonus;
        }
    }

    /// Ensure the database directory exists.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}
