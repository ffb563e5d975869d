//! 🔧 App Configuration: the sacred env-and-TOML-to-struct pipeline.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment. Layers, later wins:
//! 1. serde defaults (bucket `open-data`, base path `datasets`, page size 2000, Asia/Seoul, six tables)
//! 2. `TBX_*` env vars, `__` for nesting (`TBX_SOURCE_CONFIG__PAGE_SIZE=500`)
//! 3. the deployment's existing env names (`SUPABASE_URL`, `SUPABASE_SERVICE_ROLE_KEY`,
//!    `SUPABASE_BUCKET`, `SUPABASE_BASE_PATH`, `RENTAL_DATE_COL`)
//! 4. an optional TOML file

use std::path::Path;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use reqwest::Url;
use serde::Deserialize;
use tracing::info;

use crate::backends::{BackendConfig, RestSourceConfig, StorageSinkConfig};
use crate::supervisors::{ExportTarget, default_targets};

/// 🗺️ Existing deployment env names and where they land in `AppConfig`.
const LEGACY_ENV_KEYS: [(&str, &str); 5] = [
    ("SUPABASE_URL", "backend.url"),
    ("SUPABASE_SERVICE_ROLE_KEY", "backend.service_role_key"),
    ("SUPABASE_BUCKET", "sink_config.bucket"),
    ("SUPABASE_BASE_PATH", "sink_config.base_path"),
    ("RENTAL_DATE_COL", "source_config.rental_date_col"),
];

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 📡 Base URL and service key, shared by the REST and storage APIs.
    pub backend: BackendConfig,
    #[serde(default)]
    pub source_config: RestSourceConfig,
    #[serde(default)]
    pub sink_config: StorageSinkConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🧭 Run-level knobs: which calendar the date stamp follows and which tables go out.
#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// 🌏 IANA zone name for the run date stamp.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// 📋 Export targets, in export order.
    #[serde(default = "default_targets")]
    pub targets: Vec<ExportTarget>,
}

fn default_timezone() -> String {
    "Asia/Seoul".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            targets: default_targets(),
        }
    }
}

impl AppConfig {
    /// 🌏 The configured zone, parsed. `validate` has already vouched for it.
    pub fn timezone(&self) -> Result<Tz> {
        self.runtime.timezone.parse::<Tz>().map_err(|err| {
            anyhow::anyhow!(
                "💀 '{}' is not a timezone chrono-tz has heard of: {}",
                self.runtime.timezone,
                err
            )
        })
    }

    /// 🔒 Catch the config mistakes that would otherwise surface three tables into a run.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.backend.url).context(format!(
            "💀 backend.url '{}' is not a valid URL.",
            self.backend.url
        ))?;
        if self.backend.service_role_key.trim().is_empty() {
            anyhow::bail!("💀 backend.service_role_key is empty. The backend will not be impressed.");
        }
        if self.source_config.page_size == 0 {
            anyhow::bail!("💀 source_config.page_size is 0. The offset would never move.");
        }
        self.timezone()?;
        if self.runtime.targets.is_empty() {
            anyhow::bail!("💀 runtime.targets is empty. Nothing to export is a strange way to spend a cron slot.");
        }
        if let Some(blank) = self.runtime.targets.iter().position(|t| t.table.trim().is_empty()) {
            anyhow::bail!("💀 runtime.targets[{}] has a blank table name.", blank);
        }
        Ok(())
    }
}

/// 🗺️ The deployment's existing env names, remapped onto nested config keys.
fn legacy_env() -> Env {
    Env::raw()
        .only(&LEGACY_ENV_KEYS.map(|(env_name, _)| env_name))
        .map(|key| {
            for (env_name, config_path) in LEGACY_ENV_KEYS {
                if key.as_str().eq_ignore_ascii_case(env_name) {
                    return config_path.into();
                }
            }
            key.into()
        })
}

/// 🚀 Load the config from env vars, an optional TOML file, and the sheer power of hoping.
///
/// - `None` → env vars only.
/// - `Some(path)` → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Fails if required keys are missing, if anything is unparseable, or if `validate` objects.
pub fn load_config(config_file_name: Option<&Path>) -> Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new()
        .merge(Env::prefixed("TBX_").split("__"))
        .merge(legacy_env());

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables \
             (TBX_*, SUPABASE_*, RENTAL_DATE_COL). Is backend.url set? Is the TOML actually TOML?",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables \
                 (TBX_*, SUPABASE_*, RENTAL_DATE_COL). SUPABASE_URL and \
                 SUPABASE_SERVICE_ROLE_KEY are required. Classic."
            .to_string(),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .validate()
        .context("💀 Configuration parsed, but it does not make sense.")?;
    Ok(app_config)
}
