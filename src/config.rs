//! Process configuration loaded from the environment.
//!
//! Every value is read once at startup. Missing or malformed required values
//! are fatal and reported before any loop starts.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Duration;
use thiserror::Error;

use crate::connectors::{Address, KeyError, WalletKey};

pub const DEFAULT_APP_ID: u64 = 2020762574;
pub const DEFAULT_CONTRACT_ADDRESS: &str =
    "7TL5PKBGPH4W7LEZW5SW5BGC4TH32XVFV5NVTXE4HTTPVK2JUJODCVTHSU";
pub const DEFAULT_TRIGGER_APP_ARG: &str = "XrzHXA==";
pub const DEFAULT_BUY_METHOD: &str = "buyCoin(uint64,uint64)void";
pub const DEFAULT_REPORT_LINK_BASE: &str = "https://rug.ninja";

const DEFAULT_MIN_AMOUNT_OUT: u64 = 1000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_RETENTION_SECS: u64 = 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Invalid wallet key: {0}")]
    Key(#[from] KeyError),

    #[error("WALLET_ADDRESS {configured} does not match key address {derived}")]
    AddressMismatch { configured: String, derived: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Validated sniper configuration.
#[derive(Clone)]
pub struct SniperConfig {
    pub algod_address: String,
    pub algod_token: String,
    pub app_id: u64,
    pub contract_address: Address,
    pub wallet: WalletKey,
    /// Payment per attempt, in microAlgos.
    pub purchase_amount: u64,
    pub workers: usize,
    pub min_amount_out: u64,
    /// Decoded trigger argument.
    pub trigger: Vec<u8>,
    pub buy_method_signature: String,
    pub start_round: Option<u64>,
    pub watermark_seed: u64,
    pub poll_interval: Duration,
    pub group_retention: Duration,
    pub report_link_base: String,
    pub log_format: LogFormat,
}

impl SniperConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let algod_address = get("ALGOD_ADDRESS").ok_or(ConfigError::Missing("ALGOD_ADDRESS"))?;
        validate_http_url("ALGOD_ADDRESS", &algod_address)?;

        let wallet = match (get("WALLET_MNEMONIC"), get("WALLET_PRIVATE_KEY")) {
            (Some(phrase), _) => WalletKey::from_mnemonic(&phrase)?,
            (None, Some(key)) => WalletKey::from_private_key_base64(&key)?,
            (None, None) => return Err(ConfigError::Missing("WALLET_MNEMONIC or WALLET_PRIVATE_KEY")),
        };

        if let Some(configured) = get("WALLET_ADDRESS") {
            let derived = wallet.address().encode();
            if configured != derived {
                return Err(ConfigError::AddressMismatch { configured, derived });
            }
        }

        let contract_raw = get("CONTRACT_ADDRESS").unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string());
        let contract_address = contract_raw.parse::<Address>().map_err(|e| ConfigError::Invalid {
            name: "CONTRACT_ADDRESS",
            reason: e.to_string(),
        })?;

        let trigger_raw = get("TRIGGER_APP_ARG").unwrap_or_else(|| DEFAULT_TRIGGER_APP_ARG.to_string());
        let trigger = BASE64.decode(&trigger_raw).map_err(|e| ConfigError::Invalid {
            name: "TRIGGER_APP_ARG",
            reason: e.to_string(),
        })?;

        let workers: usize = parse_required(&get, "WORKERS")?;
        if workers == 0 {
            return Err(ConfigError::Invalid {
                name: "WORKERS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("compact") => LogFormat::Compact,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: format!("expected compact or json, got {}", other),
                })
            }
        };

        Ok(Self {
            algod_address,
            algod_token: get("ALGOD_TOKEN").unwrap_or_default(),
            app_id: parse_or(&get, "CONTRACT_APP_ID", DEFAULT_APP_ID)?,
            contract_address,
            wallet,
            purchase_amount: parse_required(&get, "PURCHASE_AMOUNT")?,
            workers,
            min_amount_out: parse_or(&get, "MIN_AMOUNT_OUT", DEFAULT_MIN_AMOUNT_OUT)?,
            trigger,
            buy_method_signature: get("BUY_METHOD_SIGNATURE")
                .unwrap_or_else(|| DEFAULT_BUY_METHOD.to_string()),
            start_round: parse_optional(&get, "START_ROUND")?,
            watermark_seed: parse_or(&get, "WATERMARK_SEED", 0)?,
            poll_interval: Duration::from_millis(parse_or(
                &get,
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            group_retention: Duration::from_secs(parse_or(
                &get,
                "PROCESSED_GROUP_RETENTION_SECS",
                DEFAULT_RETENTION_SECS,
            )?),
            report_link_base: get("REPORT_LINK_BASE")
                .unwrap_or_else(|| DEFAULT_REPORT_LINK_BASE.to_string()),
            log_format,
        })
    }
}

impl std::fmt::Debug for SniperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SniperConfig")
            .field("algod_address", &self.algod_address)
            .field("algod_token", &"[REDACTED]")
            .field("app_id", &self.app_id)
            .field("contract_address", &self.contract_address)
            .field("wallet", &self.wallet)
            .field("purchase_amount", &self.purchase_amount)
            .field("workers", &self.workers)
            .field("min_amount_out", &self.min_amount_out)
            .field("start_round", &self.start_round)
            .field("watermark_seed", &self.watermark_seed)
            .field("poll_interval", &self.poll_interval)
            .field("group_retention", &self.group_retention)
            .finish_non_exhaustive()
    }
}

fn parse_optional<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                reason: format!("`{}`: {}", raw, e),
            })
        })
        .transpose()
}

fn parse_required<T, G>(get: &G, name: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    parse_optional(get, name)?.ok_or(ConfigError::Missing(name))
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    Ok(parse_optional(get, name)?.unwrap_or(default))
}

fn validate_http_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
    let parsed = raw.parse::<reqwest::Url>().map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("not a valid URL `{}`: {}", raw, e),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("must use http(s) scheme, got `{}`", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn private_key() -> (String, String) {
        let key = WalletKey::from_seed([8u8; 32]);
        let mut raw = vec![8u8; 32];
        raw.extend_from_slice(key.address().as_bytes());
        (BASE64.encode(raw), key.address().encode())
    }

    fn base_env() -> HashMap<&'static str, String> {
        let (key, _) = private_key();
        HashMap::from([
            ("ALGOD_ADDRESS", "http://localhost:4001".to_string()),
            ("WALLET_PRIVATE_KEY", key),
            ("PURCHASE_AMOUNT", "2000000".to_string()),
            ("WORKERS", "5".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<SniperConfig, ConfigError> {
        SniperConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.contract_address.encode(), DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(config.trigger, vec![0x5e, 0xbc, 0xc7, 0x5c]);
        assert_eq!(config.min_amount_out, 1000);
        assert_eq!(config.workers, 5);
        assert_eq!(config.purchase_amount, 2_000_000);
        assert_eq!(config.start_round, None);
        assert_eq!(config.watermark_seed, 0);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.group_retention, Duration::from_secs(3600));
        assert_eq!(config.buy_method_signature, DEFAULT_BUY_METHOD);
        assert_eq!(config.log_format, LogFormat::Compact);
        assert!(config.algod_token.is_empty());
    }

    #[test]
    fn test_missing_required() {
        for key in ["ALGOD_ADDRESS", "PURCHASE_AMOUNT", "WORKERS"] {
            let mut env = base_env();
            env.remove(key);
            assert!(
                matches!(load(&env), Err(ConfigError::Missing(k)) if k == key),
                "{}",
                key
            );
        }

        let mut env = base_env();
        env.remove("WALLET_PRIVATE_KEY");
        assert!(matches!(load(&env), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let cases = [
            ("WORKERS", "0"),
            ("WORKERS", "many"),
            ("ALGOD_ADDRESS", "ftp://node"),
            ("TRIGGER_APP_ARG", "not base64!"),
            ("CONTRACT_ADDRESS", "NOTANADDRESS"),
            ("START_ROUND", "-1"),
            ("LOG_FORMAT", "xml"),
        ];
        for (key, value) in cases {
            let mut env = base_env();
            env.insert(key, value.to_string());
            assert!(
                matches!(load(&env), Err(ConfigError::Invalid { name, .. }) if name == key),
                "{}={}",
                key,
                value
            );
        }
    }

    #[test]
    fn test_wallet_address_must_match() {
        let (_, address) = private_key();
        let mut env = base_env();
        env.insert("WALLET_ADDRESS", address);
        assert!(load(&env).is_ok());

        env.insert("WALLET_ADDRESS", DEFAULT_CONTRACT_ADDRESS.to_string());
        assert!(matches!(load(&env), Err(ConfigError::AddressMismatch { .. })));
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let mut env = base_env();
        env.insert("START_ROUND", "12345".to_string());
        env.insert("WATERMARK_SEED", "999".to_string());
        env.insert("LOG_FORMAT", "json".to_string());
        env.insert("ALGOD_TOKEN", "   ".to_string());
        let config = load(&env).unwrap();
        assert_eq!(config.start_round, Some(12345));
        assert_eq!(config.watermark_seed, 999);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.algod_token.is_empty());
    }

    #[test]
    fn test_debug_redacts_wallet() {
        let config = load(&base_env()).unwrap();
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains(&base_env()["WALLET_PRIVATE_KEY"]));
    }
}
