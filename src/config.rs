//! Runtime configuration read from the environment.

use anyhow::{Context, Result, bail};

pub const DEFAULT_DATABASE_ID: &str = "(default)";
pub const DEFAULT_FETCH_CONCURRENCY: usize = 16;
const MAX_FETCH_CONCURRENCY: usize = 256;

/// Settings shared by every function.
///
/// ```text
/// FIRESTORE_PROJECT_ID=my-project      # or GOOGLE_CLOUD_PROJECT
/// FIRESTORE_DATABASE_ID=(default)
/// FIRESTORE_EMULATOR_HOST=localhost:8080
/// FIRESTORE_ACCESS_TOKEN=ya29....      # not needed with the emulator
/// FETCH_CONCURRENCY=16
/// LOG_FILE_PATH=logs/functions.log
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub project_id: String,
    pub database_id: String,
    pub emulator_host: Option<String>,
    pub access_token: Option<String>,
    pub fetch_concurrency: usize,
    pub log_file_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let project_id = get("FIRESTORE_PROJECT_ID")
            .or_else(|| get("GOOGLE_CLOUD_PROJECT"))
            .context("FIRESTORE_PROJECT_ID or GOOGLE_CLOUD_PROJECT must be set")?;

        let emulator_host = get("FIRESTORE_EMULATOR_HOST");
        let access_token = get("FIRESTORE_ACCESS_TOKEN");
        if emulator_host.is_none() && access_token.is_none() {
            bail!("FIRESTORE_ACCESS_TOKEN must be set unless FIRESTORE_EMULATOR_HOST is used");
        }

        let fetch_concurrency = match get("FETCH_CONCURRENCY") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("FETCH_CONCURRENCY must be a number, got '{raw}'"))?
                .clamp(1, MAX_FETCH_CONCURRENCY),
            None => DEFAULT_FETCH_CONCURRENCY,
        };

        Ok(Self {
            project_id,
            database_id: get("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|| DEFAULT_DATABASE_ID.to_string()),
            emulator_host,
            access_token,
            fetch_concurrency,
            log_file_path: get("LOG_FILE_PATH"),
        })
    }
}
