//! Shared configuration paths and environment loading.
//!
//! Provider API keys live in `~/.athena/.env.local`.
//!
//! # Environment Variables
//!
//! - `ATHENA_STATE_DIR`: Override the base state directory

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::debug;

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "ATHENA_STATE_DIR";

/// Default state directory name under home.
const DEFAULT_STATE_DIR: &str = ".athena";

const ENV_FILE: &str = ".env.local";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Athena state directory.
///
/// Resolved once from:
/// 1. `ATHENA_STATE_DIR` if set
/// 2. `~/.athena` if a home directory is available
/// 3. `.athena` in the current directory
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Environment file holding provider secrets.
pub fn env_file() -> PathBuf {
    state_dir().join(ENV_FILE)
}

/// Load environment variables from the state directory, then from a
/// local `.env.local` or `.env`.
///
/// Variables already set in the process environment take precedence.
/// Returns the files that were loaded.
pub fn load_env() -> Vec<PathBuf> {
    let mut loaded = Vec::new();

    let env_path = env_file();
    if env_path.exists() && dotenvy::from_path(&env_path).is_ok() {
        loaded.push(env_path);
    }

    match dotenvy::from_filename(ENV_FILE).or_else(|_| dotenvy::dotenv()) {
        Ok(path) => loaded.push(path),
        Err(e) => debug!(error = %e, "No local env file"),
    }

    loaded
}
