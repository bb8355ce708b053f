use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, File, FileFormat};
use serde::Deserialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

pub const REPAIRS_FILE: &str = "repairs_data.csv";
pub const TRUCKS_FILE: &str = "trucks_data.csv";
pub const ALERTS_FILE: &str = "alerts_data.csv";
pub const BACKUPS_DIR: &str = "Backups";
pub const SECRETS_FILE: &str = "secrets.toml";

/// Locations of the three data files and the backups folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub dir: PathBuf,
    pub repairs: PathBuf,
    pub trucks: PathBuf,
    pub alerts: PathBuf,
    pub backups: PathBuf,
}

impl DataPaths {
    pub fn new(dir: &Path) -> Self {
        DataPaths {
            dir: dir.to_path_buf(),
            repairs: dir.join(REPAIRS_FILE),
            trucks: dir.join(TRUCKS_FILE),
            alerts: dir.join(ALERTS_FILE),
            backups: dir.join(BACKUPS_DIR),
        }
    }
}

/// `[auth.cookie]`. The signing `key` must be present in the file but is
/// not carried past validation.
#[derive(Debug, Clone, Deserialize)]
pub struct CookieSettings {
    pub name: String,
    pub expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    pub name: String,
    /// bcrypt hash
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The `[auth]` block of the secrets file.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub cookie: CookieSettings,
    /// Keyed by lower-cased user name.
    pub users: BTreeMap<String, UserEntry>,
}

/// Load and validate auth settings. Any problem here is fatal: the
/// application must not reach the store without a working gate.
pub fn load_auth_settings(path: &Path) -> StoreResult<AuthSettings> {
    let fail = |msg: String| StoreError::Configuration(format!("{} ({})", msg, path.display()));

    if !path.exists() {
        return Err(fail("secrets file not found".to_string()));
    }

    let cfg = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(true))
        .build()
        .map_err(|e| fail(format!("couldn't parse secrets: {}", e)))?;

    if cfg.get_table("auth").is_err() {
        return Err(fail("No [auth] block found".to_string()));
    }

    let cookie: CookieSettings = cfg
        .get("auth.cookie")
        .map_err(|_| fail("Missing cookie settings under [auth.cookie]".to_string()))?;
    let key = cfg.get_string("auth.cookie.key").unwrap_or_default();
    if cookie.name.trim().is_empty() || key.trim().is_empty() || cookie.expiry_days <= 0 {
        return Err(fail(
            "Cookie settings need a name, a key and a positive expiry_days".to_string(),
        ));
    }

    let users: BTreeMap<String, UserEntry> = cfg
        .get("auth.credentials.usernames")
        .map_err(|_| {
            fail("Missing credentials under [auth.credentials.usernames]".to_string())
        })?;
    if users.is_empty() {
        return Err(fail("No users defined under [auth.credentials.usernames]".to_string()));
    }

    debug!(users = users.len(), "loaded auth settings");
    Ok(AuthSettings {
        cookie,
        users: users
            .into_iter()
            .map(|(user, entry)| (user.to_lowercase(), entry))
            .collect(),
    })
}
