//! 🚀 tbx-cli: the front door, the bouncer, the maitre d' of tbx.
//!
//! 🎬 *[narrator voice]* "It all started with a cron entry and a simple main() function..."
//! 📦 Thin wrapper: set up logging, find the config, hand everything to `tbx::run`,
//! print the recap. Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "tbx.toml";

/// 🗺️ Which TOML file to layer on top of the env, if any.
///
/// - `tbx some.toml` → that file, and it had better exist
/// - `tbx` → `tbx.toml` in the cwd if it's there, env vars only if it isn't
fn resolve_config_file(path_arg: Option<&str>) -> Result<Option<PathBuf>> {
    match path_arg {
        Some(path_arg) => {
            let config_file = Path::new(path_arg);
            let exists = config_file.try_exists().context(format!(
                "💀 Couldn't even check whether the config file exists. Was checking here: '{}'",
                config_file.display()
            ))?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file not found: '{}'. Maybe it's an issue with pwd/cwd and relative paths. \
                     In that case, use an absolute path, to be absolutely certain.",
                    config_file.display()
                );
            }
            Ok(Some(config_file.to_path_buf()))
        }
        None => {
            let config_file = Path::new(DEFAULT_CONFIG_FILE);
            // -- 💤 no default file is fine; the env is a perfectly good config file with extra steps
            match config_file.try_exists() {
                Ok(true) => Ok(Some(config_file.to_path_buf())),
                _ => Ok(None),
            }
        }
    }
}

/// 🚀 main(): where it all begins. The "I pressed F5 and held my breath" moment.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Find the config file, or decide we don't need one
/// 3. Load config (the moment of truth)
/// 4. Run the export (send it and pray 🙏)
/// 5. Print the recap, or handle errors (cry), exit 1
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 📡 Set up tracing: RUST_LOG if set, info otherwise
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    let result = async {
        let config_file = resolve_config_file(args.get(1).map(String::as_str))?;
        let app_config = tbx::app_config::load_config(config_file.as_deref()).context(
            "💀 In tbx-cli, main, we couldn't load the configuration. Check SUPABASE_URL, \
             SUPABASE_SERVICE_ROLE_KEY, and the TOML file if there is one.",
        )?;
        tbx::run(app_config).await
    }
    .await;

    match result {
        Ok(report) => {
            println!("{}", tbx::render_summary(&report.outcomes));
            Ok(())
        }
        Err(err) => {
            error!("💀 error: {}", err);
            // -- 🧅 peel the onion of sadness, one layer at a time
            let mut the_vibes_are_giving_connection_issues = false;
            for cause in err.chain().skip(1) {
                error!("⚠️  cause: {}", cause);
                let cause_str = cause.to_string();
                if cause_str.contains("error sending request")
                    || cause_str.contains("connection refused")
                    || cause_str.contains("Connection refused")
                    || cause_str.contains("tcp connect error")
                    || cause_str.contains("dns error")
                {
                    the_vibes_are_giving_connection_issues = true;
                }
            }

            if the_vibes_are_giving_connection_issues {
                error!(
                    "🔧 hint: the backend isn't reachable. Double-check SUPABASE_URL, \
                    and that the project isn't paused. Even databases need a nudge sometimes. ☕"
                );
            }

            // 🗑️ Exit with prejudice. The orchestrator reading our exit code deserves the truth.
            std::process::exit(1);
        }
    }
}
