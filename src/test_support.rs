//! Fixtures shared by the unit tests of the library and the CLI.

use std::collections::BTreeMap;

use crate::config::{AuthSettings, CookieSettings, UserEntry};

pub const USER: &str = "rigo";
pub const PASSWORD: &str = "wrench";

/// One account, `rigo` / `wrench`, hashed at the cheapest bcrypt cost.
pub fn settings() -> Result<AuthSettings, bcrypt::BcryptError> {
    let mut users = BTreeMap::new();
    users.insert(
        USER.to_string(),
        UserEntry {
            name: "Rigo".to_string(),
            password: bcrypt::hash(PASSWORD, 4)?,
            email: None,
        },
    );
    Ok(AuthSettings {
        cookie: CookieSettings {
            name: "repair_tracker".to_string(),
            expiry_days: 30,
        },
        users,
    })
}
