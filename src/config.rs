use crate::domain::AccountId;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub afdian_webhook_token: String,
    pub kofi_verification_token: String,
    pub admin_token: Option<String>,
    pub product_catalog_path: Option<String>,
    pub analytics_url: Option<String>,
    pub ranking_denylist: Vec<AccountId>,
    pub ledger: LedgerConfig,
}

/// Economy constants handed to the ledger components at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Days credited per purchased membership month.
    pub days_per_month: i64,
    pub daily_bonus_normal: i64,
    pub daily_bonus_premium: i64,
    /// Member points charged to reset all properties.
    pub member_reset_cost: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            days_per_month: 31,
            daily_bonus_normal: 100,
            daily_bonus_premium: 300,
            member_reset_cost: 1000,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = required(&env_map, "DATABASE_PATH")?;
        let afdian_webhook_token = required(&env_map, "AFDIAN_WEBHOOK_TOKEN")?;
        let kofi_verification_token = required(&env_map, "KOFI_VERIFICATION_TOKEN")?;

        let admin_token = optional(&env_map, "ADMIN_TOKEN");
        let product_catalog_path = optional(&env_map, "PRODUCT_CATALOG_PATH");
        let analytics_url = optional(&env_map, "ANALYTICS_URL");

        let defaults = LedgerConfig::default();
        let ledger = LedgerConfig {
            days_per_month: positive_int(&env_map, "DAYS_PER_MONTH", defaults.days_per_month)?,
            daily_bonus_normal: positive_int(
                &env_map,
                "DAILY_BONUS_NORMAL",
                defaults.daily_bonus_normal,
            )?,
            daily_bonus_premium: positive_int(
                &env_map,
                "DAILY_BONUS_PREMIUM",
                defaults.daily_bonus_premium,
            )?,
            member_reset_cost: positive_int(
                &env_map,
                "MEMBER_RESET_COST",
                defaults.member_reset_cost,
            )?,
        };

        let ranking_denylist = parse_denylist_from_map(&env_map)?;

        Ok(Config {
            port,
            database_path,
            afdian_webhook_token,
            kofi_verification_token,
            admin_token,
            product_catalog_path,
            analytics_url,
            ranking_denylist,
            ledger,
        })
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn positive_int(
    env_map: &HashMap<String, String>,
    key: &str,
    default: i64,
) -> Result<i64, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(key.to_string(), "must be a positive integer".to_string())
            }),
    }
}

fn parse_denylist_from_map(
    env_map: &HashMap<String, String>,
) -> Result<Vec<AccountId>, ConfigError> {
    let Some(ids) = env_map.get("RANKING_DENYLIST") else {
        return Ok(Vec::new());
    };

    let mut parsed = ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(AccountId::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::InvalidValue("RANKING_DENYLIST".to_string(), e.to_string()))?;

    parsed.sort();
    parsed.dedup();
    Ok(parsed)
}
