//! Runtime configuration from environment variables (optionally via `.env`).
//!
//! | Variable                 | Default            |
//! |--------------------------|--------------------|
//! | `ORDER_BENCH_DB`         | `orders.db`        |
//! | `ORDER_BENCH_ORDER_ID`   | `1`                |
//! | `ORDER_BENCH_WARMUP`     | `10`               |
//! | `ORDER_BENCH_SAMPLES`    | `100`              |
//! | `ORDER_BENCH_STRATEGIES` | all four           |
//! | `ORDER_BENCH_SEED`       | `true`             |
//! | `ORDER_BENCH_LOG_LEVEL`  | `info`             |
//! | `ORDER_BENCH_LOG_FILE`   | `order-bench.log`  |

use crate::strategy::Strategy;
use log::LevelFilter;
use order_core::BenchError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_DB: &str = "orders.db";
pub const DEFAULT_LOG_FILE: &str = "order-bench.log";

#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    pub database: String,
    pub order_id: i64,
    pub warmup: u32,
    pub samples: u32,
    pub strategies: Vec<Strategy>,
    pub seed: bool,
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DB.to_string(),
            order_id: 1,
            warmup: 10,
            samples: 100,
            strategies: Strategy::ALL.to_vec(),
            seed: true,
            log_level: LevelFilter::Info,
            log_file: Some(DEFAULT_LOG_FILE.to_string()),
        }
    }
}

impl BenchConfig {
    /// Load `.env` if present, then read the process environment.
    ///
    /// Returns the configuration together with a warning for every value that
    /// fell back to its default, for the caller to log once logging is up.
    pub fn from_env() -> Result<(Self, Vec<String>), BenchError> {
        // A missing .env is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Malformed values fall back to their default
    /// with a warning; an unknown strategy name is an error.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(Self, Vec<String>), BenchError> {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut warnings = Vec::new();

        let strategies = match get("ORDER_BENCH_STRATEGIES") {
            Some(list) => parse_strategies(&list)?,
            None => defaults.strategies,
        };

        let order_id = parse_or(
            "ORDER_BENCH_ORDER_ID",
            get("ORDER_BENCH_ORDER_ID"),
            defaults.order_id,
            &mut warnings,
        );
        let warmup = parse_or(
            "ORDER_BENCH_WARMUP",
            get("ORDER_BENCH_WARMUP"),
            defaults.warmup,
            &mut warnings,
        );
        let mut samples = parse_or(
            "ORDER_BENCH_SAMPLES",
            get("ORDER_BENCH_SAMPLES"),
            defaults.samples,
            &mut warnings,
        );
        if samples == 0 {
            warnings.push("ORDER_BENCH_SAMPLES=0 takes no samples, using 1".to_string());
            samples = 1;
        }
        let seed = match get("ORDER_BENCH_SEED") {
            Some(raw) => parse_bool("ORDER_BENCH_SEED", &raw, defaults.seed, &mut warnings),
            None => defaults.seed,
        };
        let log_level = match get("ORDER_BENCH_LOG_LEVEL") {
            Some(raw) => parse_log_level(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "ORDER_BENCH_LOG_LEVEL={raw} is not a log level, using info"
                ));
                defaults.log_level
            }),
            None => defaults.log_level,
        };

        let config = Self {
            database: get("ORDER_BENCH_DB").unwrap_or(defaults.database),
            order_id,
            warmup,
            samples,
            strategies,
            seed,
            log_level,
            log_file: resolve_log_file(lookup("ORDER_BENCH_LOG_FILE")),
        };
        Ok((config, warnings))
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T, warnings: &mut Vec<String>) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warnings.push(format!("{key}={raw} is not valid, using {default}"));
            default
        }),
        None => default,
    }
}

fn parse_bool(key: &str, raw: &str, default: bool, warnings: &mut Vec<String>) -> bool {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warnings.push(format!("{key}={raw} is not a boolean, using {default}"));
            default
        }
    }
}

pub fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

/// Unset means the default file; empty or `none` disables file logging.
fn resolve_log_file(value: Option<String>) -> Option<String> {
    match value {
        Some(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => Some(DEFAULT_LOG_FILE.to_string()),
    }
}

fn parse_strategies(list: &str) -> Result<Vec<Strategy>, BenchError> {
    let mut strategies = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        let strategy: Strategy = name.parse()?;
        if !strategies.contains(&strategy) {
            strategies.push(strategy);
        }
    }
    if strategies.is_empty() {
        return Err(BenchError::Config(
            "ORDER_BENCH_STRATEGIES names no strategy".to_string(),
        ));
    }
    Ok(strategies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<(BenchConfig, Vec<String>), BenchError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BenchConfig::from_lookup(|key| vars.get(key).cloned())
    }

    fn config(pairs: &[(&str, &str)]) -> Result<BenchConfig, BenchError> {
        load(pairs).map(|(config, _)| config)
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(config(&[]).unwrap(), BenchConfig::default());
    }

    #[test]
    fn values_are_read_from_lookup() {
        let cfg = config(&[
            ("ORDER_BENCH_DB", "file:bench?mode=memory&cache=shared"),
            ("ORDER_BENCH_ORDER_ID", "42"),
            ("ORDER_BENCH_WARMUP", "0"),
            ("ORDER_BENCH_SAMPLES", "5"),
            ("ORDER_BENCH_STRATEGIES", "join, parallel,join"),
            ("ORDER_BENCH_SEED", "no"),
            ("ORDER_BENCH_LOG_LEVEL", "DEBUG"),
            ("ORDER_BENCH_LOG_FILE", "none"),
        ])
        .unwrap();

        assert_eq!(cfg.database, "file:bench?mode=memory&cache=shared");
        assert_eq!(cfg.order_id, 42);
        assert_eq!(cfg.warmup, 0);
        assert_eq!(cfg.samples, 5);
        assert_eq!(cfg.strategies, vec![Strategy::Join, Strategy::Parallel]);
        assert!(!cfg.seed);
        assert_eq!(cfg.log_level, LevelFilter::Debug);
        assert_eq!(cfg.log_file, None);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let cfg = config(&[
            ("ORDER_BENCH_ORDER_ID", "one"),
            ("ORDER_BENCH_SAMPLES", "0"),
            ("ORDER_BENCH_LOG_LEVEL", "loud"),
        ])
        .unwrap();
        assert_eq!(cfg.order_id, 1);
        assert_eq!(cfg.samples, 1);
        assert_eq!(cfg.log_level, LevelFilter::Info);
    }

    #[test]
    fn fallbacks_are_reported_as_warnings() {
        let (cfg, warnings) = load(&[
            ("ORDER_BENCH_SAMPLES", "many"),
            ("ORDER_BENCH_SEED", "maybe"),
        ])
        .unwrap();
        assert_eq!(cfg.samples, 100);
        assert!(cfg.seed);
        assert_eq!(
            warnings,
            vec![
                "ORDER_BENCH_SAMPLES=many is not valid, using 100".to_string(),
                "ORDER_BENCH_SEED=maybe is not a boolean, using true".to_string(),
            ]
        );

        let (_, warnings) = load(&[("ORDER_BENCH_SAMPLES", "25")]).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = config(&[("ORDER_BENCH_STRATEGIES", "sequential,hash-join")]).unwrap_err();
        assert!(matches!(err, BenchError::Config(msg) if msg.contains("hash-join")));
    }

    #[test]
    fn log_file_defaults_and_can_be_disabled() {
        assert_eq!(resolve_log_file(None).as_deref(), Some(DEFAULT_LOG_FILE));
        assert_eq!(resolve_log_file(Some("  ".into())), None);
        assert_eq!(
            resolve_log_file(Some("bench.log".into())).as_deref(),
            Some("bench.log")
        );
    }
}
