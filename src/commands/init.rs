use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::Path;

use repair_tracker::config::DataPaths;
use repair_tracker::models::table_from_records;
use repair_tracker::persistence::Table;
use repair_tracker::seed;
use repair_tracker::store::Clock;

const COOKIE_NAME: &str = "repair_tracker";
const COOKIE_EXPIRY_DAYS: i64 = 30;

// serde_json string escapes are a subset of TOML basic-string escapes.
fn toml_string(s: &str) -> Result<String> {
    serde_json::to_string(s).context("Failed to quote TOML value")
}

fn secrets_toml(user: &str, password: &str) -> Result<String> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
    // bcrypt output carries a fresh random salt, so it doubles as a signing key.
    let key = bcrypt::hash(Utc::now().to_rfc3339(), 4).context("Failed to generate cookie key")?;
    let user_key = user.trim().to_lowercase();

    Ok(format!(
        "[auth.cookie]\nname = {}\nkey = {}\nexpiry_days = {}\n\n[auth.credentials.usernames.{}]\nname = {}\npassword = {}\n",
        toml_string(COOKIE_NAME)?,
        toml_string(&key)?,
        COOKIE_EXPIRY_DAYS,
        toml_string(&user_key)?,
        toml_string(user.trim())?,
        toml_string(&hash)?,
    ))
}

fn write_table(path: &Path, table: &Table, force: bool) -> Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    let bytes = table
        .to_csv_bytes()
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

pub fn run(
    data_dir: &Path,
    secrets: &Path,
    account: Option<(String, String)>,
    clock: Clock,
    force: bool,
) -> Result<()> {
    let paths = DataPaths::new(data_dir);
    fs::create_dir_all(&paths.backups)
        .with_context(|| format!("Failed to create {}", paths.backups.display()))?;

    let trucks = seed::default_trucks();
    let tables = [
        (&paths.trucks, table_from_records(&trucks)),
        (&paths.alerts, table_from_records(&seed::default_alert_types())),
        (
            &paths.repairs,
            table_from_records(&seed::sample_repairs(clock.today(), &trucks)),
        ),
    ];

    for (path, table) in &tables {
        if write_table(path, table, force)? {
            println!("Created {}", path.display());
        } else {
            println!("Kept existing {}", path.display());
        }
    }

    if secrets.exists() {
        println!("Using secrets at {}", secrets.display());
    } else if let Some((user, password)) = account {
        if let Some(parent) = secrets.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(secrets, secrets_toml(&user, &password)?)
            .with_context(|| format!("Failed to write {}", secrets.display()))?;
        println!("Created {} with user '{}'", secrets.display(), user.trim());
    } else {
        eprintln!(
            "Warning: no secrets file at {}. Re-run with --user to create the first account.",
            secrets.display()
        );
    }

    println!("Repair tracker initialized in {}", data_dir.display());
    Ok(())
}

pub fn hash_password(password: &str) -> Result<()> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
    println!("{}", hash);
    Ok(())
}
