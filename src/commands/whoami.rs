use anyhow::Result;

use repair_tracker::auth::Session;
use repair_tracker::config::DataPaths;

pub fn run(session: &Session, paths: &DataPaths) -> Result<()> {
    println!("Signed in as {} ({})", session.display_name(), session.username());
    println!(
        "Session {} valid until {}",
        session.cookie_name(),
        session.expires_at().format("%Y-%m-%d %H:%M UTC")
    );
    println!("Data directory: {}", paths.dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::session;
    use std::path::Path;

    #[test]
    fn test_whoami() {
        let session = session();
        assert!(run(&session, &DataPaths::new(Path::new("."))).is_ok());
    }
}
