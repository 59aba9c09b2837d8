use std::time::Duration;

use secrecy::SecretString;

use tipper_ledger::LedgerConfig;

const DEFAULT_DATABASE_URL: &str = "sqlite://tipper.db";
const DEFAULT_WORKERS: usize = 8;
const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DEDUP_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Process configuration. Every secret and every ledger parameter must come
/// from the environment; only operational knobs have defaults.
#[derive(Debug)]
pub struct Config {
    pub slack_token: SecretString,
    pub tip_reaction: String,
    pub tip_amount: u128,
    pub ledger: LedgerConfig,
    pub port: u16,
    pub database_url: String,
    pub workers: usize,
    pub ledger_timeout: Duration,
    pub dedup_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };

        let tip_amount = parse(required("SLACK_TIP_AMOUNT")?, "SLACK_TIP_AMOUNT")?;
        if tip_amount == 0 {
            return Err(ConfigError::Invalid {
                var: "SLACK_TIP_AMOUNT",
                reason: "must be greater than zero".into(),
            });
        }

        let config = Config {
            slack_token: SecretString::new(required("SLACK_BOT_TOKEN")?),
            tip_reaction: required("SLACK_TIP_REACTION")?,
            tip_amount,
            ledger: LedgerConfig {
                endpoint: required("ETH_API_ENDPOINT")?,
                token_address: required("ERC20_TOKEN_ADDRESS")?,
                key_json: SecretString::new(required("ETH_KEY_JSON")?),
                passphrase: SecretString::new(required("ETH_PASSWORD")?),
            },
            port: parse(required("TIPPER_PORT")?, "TIPPER_PORT")?,
            database_url: lookup("DATABASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.into()),
            workers: optional(&lookup, "TIPPER_WORKERS", DEFAULT_WORKERS)?,
            ledger_timeout: Duration::from_secs(optional(
                &lookup,
                "TIPPER_LEDGER_TIMEOUT_SECS",
                DEFAULT_LEDGER_TIMEOUT_SECS,
            )?),
            dedup_capacity: optional(&lookup, "TIPPER_DEDUP_CAPACITY", DEFAULT_DEDUP_CAPACITY)?,
        };

        if config.workers == 0 {
            return Err(ConfigError::Invalid {
                var: "TIPPER_WORKERS",
                reason: "must be at least 1".into(),
            });
        }

        Ok(config)
    }
}

fn parse<T>(raw: String, var: &'static str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn optional<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => parse(raw, var),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn base() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("SLACK_BOT_TOKEN", "xoxb-1"),
            ("SLACK_TIP_REACTION", "tip"),
            ("SLACK_TIP_AMOUNT", "100"),
            ("ERC20_TOKEN_ADDRESS", "0x0BA7846EfbDa22e8dE9C6d225EDE295510CEdb4E"),
            ("ETH_API_ENDPOINT", "http://localhost:8545"),
            ("ETH_KEY_JSON", r#"{"address":"8d0cb63a00f8130faa634986f16981e7fd9cde2b"}"#),
            ("ETH_PASSWORD", "pw"),
            ("TIPPER_PORT", "20020"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config, ConfigError> {
        Config::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
    }

    #[test]
    fn full_config_with_defaults() {
        let config = load(&base()).unwrap();
        assert_eq!(config.tip_reaction, "tip");
        assert_eq!(config.tip_amount, 100);
        assert_eq!(config.port, 20020);
        assert_eq!(config.ledger.passphrase.expose_secret(), "pw");
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.ledger_timeout, Duration::from_secs(30));
    }

    #[test]
    fn every_required_variable_is_enforced() {
        for var in base().keys() {
            let mut vars = base();
            vars.remove(var);
            match load(&vars) {
                Err(ConfigError::Missing(missing)) => assert_eq!(missing, *var),
                other => panic!("expected {} to be required, got {:?}", var, other.map(|_| ())),
            }
        }
    }

    #[test]
    fn blank_secret_counts_as_missing() {
        let mut vars = base();
        vars.insert("ETH_PASSWORD", "  ");
        assert!(matches!(load(&vars), Err(ConfigError::Missing("ETH_PASSWORD"))));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let mut vars = base();
        vars.insert("SLACK_TIP_AMOUNT", "-5");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "SLACK_TIP_AMOUNT", .. })
        ));

        let mut vars = base();
        vars.insert("TIPPER_PORT", "http");
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { var: "TIPPER_PORT", .. })));

        let mut vars = base();
        vars.insert("TIPPER_WORKERS", "0");
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { var: "TIPPER_WORKERS", .. })));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let config = load(&base()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("xoxb-1"));
        assert!(!debug.contains("\"pw\""));
    }
}
