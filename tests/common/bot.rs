//! Test bot management.
//!
//! Spawns bantracker instances pointed at a [`super::FakeNetwork`].

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use tempfile::TempDir;

/// A running bot process with its own config and database.
pub struct TestBot {
    child: Child,
    dir: TempDir,
}

impl TestBot {
    /// Spawn the bot. `bot_section` is appended under `[bot]`.
    pub fn spawn(port: u16, bot_section: &str) -> anyhow::Result<Self> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("bantracker.toml");
        let config = format!(
            r##"
[server]
host = "127.0.0.1"
port = {port}
nick = "bot"
reconnect_delay_secs = 1

[database]
path = "{db}"

[limits]
lines_per_second = 100
burst = 100

[bot]
channels = ["#test"]
privilege_timeout_secs = 2
list_timeout_secs = 5
{bot_section}
"##,
            db = dir.path().join("bans.db").display(),
        );
        std::fs::write(&config_path, config)?;

        let child = Command::new(env!("CARGO_BIN_EXE_bantracker"))
            .arg(&config_path)
            .env("RUST_LOG", "bantracker=debug")
            .spawn()?;

        Ok(Self { child, dir })
    }

    /// Path of the bot's database file.
    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("bans.db")
    }

    /// Pool on the bot's database, for inspection only.
    pub async fn db(&self) -> anyhow::Result<SqlitePool> {
        let options = SqliteConnectOptions::new().filename(self.db_path());
        Ok(SqlitePool::connect_with(options).await?)
    }

    /// Poll the `active` flags of every record for `mask`, oldest first,
    /// until `check` accepts them.
    pub async fn wait_for_rows<F>(&self, mask: &str, check: F) -> anyhow::Result<Vec<bool>>
    where
        F: Fn(&[bool]) -> bool,
    {
        let pool = self.db().await?;
        for _ in 0..50 {
            let rows: Vec<bool> =
                sqlx::query_scalar("SELECT active FROM bans WHERE mask = ? ORDER BY id")
                    .bind(mask)
                    .fetch_all(&pool)
                    .await?;
            if check(&rows) {
                return Ok(rows);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("database never reached the expected state for {mask}")
    }
}

impl Drop for TestBot {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
