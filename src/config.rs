use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{DuplicatePolicy, UpdateArgs};

pub const TOKEN_ENV: &str = "TELEGRAM_TOKEN";
pub const CHAT_ID_ENV: &str = "TELEGRAM_CHAT_ID";
pub const API_BASE_ENV: &str = "TELEGRAM_API_BASE";
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const CATALOGUE_FILE_NAME: &str = "tracks.json";

/// Bot API credentials. `Debug` never prints the token.
#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub chat_id: String,
}

impl Credentials {
    pub fn from_env() -> anyhow::Result<Self> {
        let token = require_env(TOKEN_ENV)?;
        let chat_id = require_env(CHAT_ID_ENV)?;
        Ok(Self { token, chat_id })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

fn require_env(name: &str) -> anyhow::Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_owned()),
        Ok(_) => anyhow::bail!("{name} is set but empty"),
        Err(_) => anyhow::bail!("{name} is not set"),
    }
}

/// Where the run reads and writes its state.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub log: PathBuf,
    pub html: PathBuf,
    pub catalogue: PathBuf,
}

impl StatePaths {
    pub fn new(log: impl Into<PathBuf>, html: impl Into<PathBuf>) -> Self {
        let html = html.into();
        let catalogue = catalogue_path_for(&html);
        Self {
            log: log.into(),
            html,
            catalogue,
        }
    }
}

pub fn catalogue_path_for(html: &Path) -> PathBuf {
    html.with_file_name(CATALOGUE_FILE_NAME)
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub credentials: Credentials,
    pub api_base: String,
    pub paths: StatePaths,
    pub limit: u16,
    pub marker: String,
    pub on_duplicate: DuplicatePolicy,
    pub timeout: Duration,
    pub title: String,
    pub dry_run: bool,
}

impl UpdateConfig {
    /// Builds the run configuration. Fails before any I/O when credentials are missing.
    pub fn from_args(args: UpdateArgs) -> anyhow::Result<Self> {
        let credentials = Credentials::from_env()?;
        let api_base = std::env::var(API_BASE_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_owned());

        if args.marker.trim().is_empty() {
            anyhow::bail!("--marker must not be empty");
        }
        if args.limit == 0 {
            anyhow::bail!("--limit must be > 0");
        }

        Ok(Self {
            credentials,
            api_base,
            paths: StatePaths::new(args.log, args.html),
            limit: args.limit,
            marker: args.marker,
            on_duplicate: args.on_duplicate,
            timeout: Duration::from_secs(args.timeout_secs.max(1)),
            title: args.title,
            dry_run: args.dry_run,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_sits_next_to_html() {
        let paths = StatePaths::new("docs/log.json", "docs/index.html");
        assert_eq!(paths.catalogue, PathBuf::from("docs/tracks.json"));
    }

    #[test]
    fn credentials_debug_hides_token() {
        let credentials = Credentials {
            token: "123:secret".to_owned(),
            chat_id: "-100".to_owned(),
        };
        let printed = format!("{credentials:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("-100"));
    }
}
