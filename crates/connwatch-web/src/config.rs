use connwatch_engine::{CollisionPolicy, EngineConfig};

pub const DEFAULT_TCP_ADDR: &str = "127.0.0.1:9219";
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:9230";

pub const LISTEN_ENV: &str = "CONNWATCH_LISTEN";
pub const HTTP_ENV: &str = "CONNWATCH_HTTP";
pub const MAX_CLOSED_ROWS_ENV: &str = "CONNWATCH_MAX_CLOSED_ROWS";
pub const VISIBLE_ROWS_ENV: &str = "CONNWATCH_VISIBLE_ROWS";
pub const LOAD_MORE_STEP_ENV: &str = "CONNWATCH_LOAD_MORE_STEP";
pub const LEDGER_COLLISION_ENV: &str = "CONNWATCH_LEDGER_COLLISION";
pub const QUICK_FILTER_ENV: &str = "CONNWATCH_QUICK_FILTER";

/// Values given on the command line; each one wins over its environment variable.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub listen: Option<String>,
    pub http: Option<String>,
    pub max_closed_rows: Option<u32>,
    pub visible_rows: Option<u32>,
    pub load_more_step: Option<u32>,
    pub keep_first: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebConfig {
    pub tcp_addr: String,
    pub http_addr: String,
    pub engine: EngineConfig,
    pub initial_filter: Option<String>,
}

impl WebConfig {
    pub fn from_env(overrides: &ConfigOverrides) -> Result<Self, String> {
        Self::resolve(|key| std::env::var(key).ok(), overrides)
    }

    pub fn resolve(
        env: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, String> {
        let defaults = EngineConfig::default();
        let rows = |cli: Option<u32>, key: &str, default: usize| -> Result<usize, String> {
            match cli {
                Some(value) => Ok(value as usize),
                None => match env(key) {
                    Some(raw) => raw
                        .trim()
                        .parse::<usize>()
                        .map_err(|e| format!("invalid {key}={raw:?}: {e}")),
                    None => Ok(default),
                },
            }
        };

        let collision = if overrides.keep_first {
            CollisionPolicy::KeepFirst
        } else {
            match env(LEDGER_COLLISION_ENV) {
                Some(name) => CollisionPolicy::from_name(name.trim()).ok_or_else(|| {
                    format!(
                        "invalid {LEDGER_COLLISION_ENV}={name:?}: expected keep-first or refresh-latest"
                    )
                })?,
                None => defaults.collision,
            }
        };

        Ok(Self {
            tcp_addr: overrides
                .listen
                .clone()
                .or_else(|| env(LISTEN_ENV))
                .unwrap_or_else(|| DEFAULT_TCP_ADDR.into()),
            http_addr: overrides
                .http
                .clone()
                .or_else(|| env(HTTP_ENV))
                .unwrap_or_else(|| DEFAULT_HTTP_ADDR.into()),
            engine: EngineConfig {
                max_closed_rows: rows(
                    overrides.max_closed_rows,
                    MAX_CLOSED_ROWS_ENV,
                    defaults.max_closed_rows,
                )?,
                initial_rows: rows(
                    overrides.visible_rows,
                    VISIBLE_ROWS_ENV,
                    defaults.initial_rows,
                )?,
                load_more_step: rows(
                    overrides.load_more_step,
                    LOAD_MORE_STEP_ENV,
                    defaults.load_more_step,
                )?,
                collision,
            },
            initial_filter: env(QUICK_FILTER_ENV).filter(|text| !text.is_empty()),
        })
    }
}
