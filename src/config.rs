use config::{Config, Environment, File};
use serde::Deserialize;

/// Defaults shared by every subcommand. Command-line flags take precedence.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_prefix")]
    pub user_prefix: String,

    #[serde(default = "default_database_url")]
    pub database_url: String,

    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    #[serde(default = "default_timeline_limit")]
    pub timeline_limit: u32,

    #[serde(default = "default_runs")]
    pub runs: u32,

    #[serde(default = "default_warmup_rounds")]
    pub warmup_rounds: u32,

    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_user_prefix() -> String {
    "user".to_string()
}

fn default_database_url() -> String {
    #[cfg(feature = "postgres")]
    {
        "postgres://localhost/tinyinsta".to_string()
    }
    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    {
        "sqlite:seed.db?mode=rwc".to_string()
    }
}

fn default_database_max_connections() -> u32 {
    10
}

fn default_out_dir() -> String {
    "out".to_string()
}

fn default_timeline_limit() -> u32 {
    20
}

fn default_runs() -> u32 {
    3
}

fn default_warmup_rounds() -> u32 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_prefix: default_user_prefix(),
            database_url: default_database_url(),
            database_max_connections: default_database_max_connections(),
            out_dir: default_out_dir(),
            timeline_limit: default_timeline_limit(),
            runs: default_runs(),
            warmup_rounds: default_warmup_rounds(),
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load `.env`, then an optional `timeline-bench.{toml,yaml,json}` in the
    /// working directory, then `TIMELINE_BENCH__*` environment variables.
    pub fn new() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("timeline-bench").required(false))
            .add_source(
                Environment::with_prefix("TIMELINE_BENCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
