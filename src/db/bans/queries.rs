//! Restriction record queries.
//!
//! Every write that touches more than one row runs in a transaction, so a
//! failure leaves the table as it was.

use std::collections::HashSet;

use super::models::{BanRecord, DueRestriction, RestrictionKind};
use crate::db::DbError;
use sqlx::SqlitePool;

type BanRow = (
    i64,
    String,
    i64,
    String,
    String,
    i64,
    Option<i64>,
    Option<String>,
    bool,
    Option<String>,
    Option<i64>,
    Option<String>,
    Option<i64>,
    Option<i64>,
);

fn record_from_row(row: BanRow) -> BanRecord {
    let (
        id,
        channel,
        kind,
        mask,
        set_by,
        set_at,
        duration,
        reason,
        active,
        reason_set_by,
        reason_set_at,
        duration_set_by,
        duration_set_at,
        removed_at,
    ) = row;
    BanRecord {
        id,
        channel,
        kind: RestrictionKind::from_db(kind),
        mask,
        set_by,
        set_at,
        duration,
        reason,
        active,
        reason_set_by,
        reason_set_at,
        duration_set_by,
        duration_set_at,
        removed_at,
    }
}

/// Repository for restriction records.
pub struct BanRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BanRepository<'a> {
    /// Create a new ban repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new active record and return its id.
    ///
    /// An existing active record for the same `(channel, kind, mask)` is
    /// expired first, in the same transaction.
    pub async fn add(
        &self,
        channel: &str,
        kind: RestrictionKind,
        mask: &str,
        set_by: &str,
        set_at: i64,
    ) -> Result<i64, DbError> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE bans SET active = 0, removed_at = ?
            WHERE channel = ? AND kind = ? AND mask = ? AND active = 1
            "#,
        )
        .bind(now)
        .bind(channel)
        .bind(kind.as_db())
        .bind(mask)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO bans (channel, kind, mask, set_by, set_at, active)
            VALUES (?, ?, ?, ?, ?, 1)
            "#,
        )
        .bind(channel)
        .bind(kind.as_db())
        .bind(mask)
        .bind(set_by)
        .bind(set_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// Mark the active record for `(channel, kind, mask)` inactive.
    ///
    /// Returns `false` when there was nothing active to expire.
    pub async fn set_expired(
        &self,
        channel: &str,
        kind: RestrictionKind,
        mask: &str,
    ) -> Result<bool, DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE bans SET active = 0, removed_at = ?
            WHERE channel = ? AND kind = ? AND mask = ? AND active = 1
            "#,
        )
        .bind(now)
        .bind(channel)
        .bind(kind.as_db())
        .bind(mask)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Masks of every active record of `kind` in `channel`.
    pub async fn active_masks(
        &self,
        channel: &str,
        kind: RestrictionKind,
    ) -> Result<HashSet<String>, DbError> {
        let rows = sqlx::query_scalar::<_, String>(
            "SELECT mask FROM bans WHERE channel = ? AND kind = ? AND active = 1",
        )
        .bind(channel)
        .bind(kind.as_db())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Active, duration-bearing records whose expiry is at or before `timestamp`.
    pub async fn due_before(&self, timestamp: i64) -> Result<Vec<DueRestriction>, DbError> {
        let rows = sqlx::query_as::<_, (String, i64, String)>(
            r#"
            SELECT channel, kind, mask
            FROM bans
            WHERE active = 1 AND duration IS NOT NULL AND set_at + duration <= ?
            ORDER BY channel, id
            "#,
        )
        .bind(timestamp)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(channel, kind, mask)| DueRestriction {
                channel,
                kind: RestrictionKind::from_db(kind),
                mask,
            })
            .collect())
    }

    /// Fetch a record by id.
    pub async fn get(&self, id: i64) -> Result<Option<BanRecord>, DbError> {
        let row = sqlx::query_as::<_, BanRow>(
            r#"
            SELECT id, channel, kind, mask, set_by, set_at, duration, reason, active,
                   reason_set_by, reason_set_at, duration_set_by, duration_set_at, removed_at
            FROM bans
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(record_from_row))
    }

    /// Whether a record with this id exists (active or not).
    pub async fn exists(&self, id: i64) -> Result<bool, DbError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT 1 FROM bans WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Id of the most recently added active record in `channel`.
    pub async fn last_active(&self, channel: &str) -> Result<Option<i64>, DbError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM bans WHERE channel = ? AND active = 1 ORDER BY id DESC LIMIT 1",
        )
        .bind(channel)
        .fetch_optional(self.pool)
        .await?;
        Ok(id)
    }

    /// Set the reason, recording who changed it and when.
    pub async fn set_reason(&self, id: i64, actor: &str, reason: &str) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE bans SET reason = ?, reason_set_by = ?, reason_set_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reason)
        .bind(actor)
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::RecordNotFound(id));
        }
        Ok(())
    }

    /// Set the duration in seconds (`None` = indefinite), recording who
    /// changed it and when.
    pub async fn set_duration(
        &self,
        id: i64,
        actor: &str,
        duration: Option<i64>,
    ) -> Result<(), DbError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE bans SET duration = ?, duration_set_by = ?, duration_set_at = ?
            WHERE id = ?
            "#,
        )
        .bind(duration)
        .bind(actor)
        .bind(now)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::RecordNotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, RestrictionKind};

    const CHAN: &str = "#test";

    #[tokio::test]
    async fn add_twice_keeps_one_active() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        bans.set_expired(CHAN, RestrictionKind::Ban, "*!*@bad").await.unwrap();
        let first = bans.add(CHAN, RestrictionKind::Ban, "*!*@bad", "op!o@h", 100).await.unwrap();
        bans.set_expired(CHAN, RestrictionKind::Ban, "*!*@bad").await.unwrap();
        let second = bans.add(CHAN, RestrictionKind::Ban, "*!*@bad", "op!o@h", 200).await.unwrap();

        assert!(second > first);
        let active = bans.active_masks(CHAN, RestrictionKind::Ban).await.unwrap();
        assert_eq!(active.len(), 1);
        assert!(!bans.get(first).await.unwrap().unwrap().active);
        assert!(bans.get(second).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn add_expires_duplicate_itself() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        let first = bans.add(CHAN, RestrictionKind::Ban, "m", "a", 1).await.unwrap();
        let second = bans.add(CHAN, RestrictionKind::Ban, "m", "a", 2).await.unwrap();
        let old = bans.get(first).await.unwrap().unwrap();
        assert!(!old.active);
        assert!(old.removed_at.is_some());
        assert!(bans.get(second).await.unwrap().unwrap().active);
    }

    #[tokio::test]
    async fn set_expired_is_idempotent() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        bans.add(CHAN, RestrictionKind::Quiet, "q!*@*", "a", 1).await.unwrap();
        assert!(bans.set_expired(CHAN, RestrictionKind::Quiet, "q!*@*").await.unwrap());
        assert!(!bans.set_expired(CHAN, RestrictionKind::Quiet, "q!*@*").await.unwrap());
        assert!(!bans.set_expired(CHAN, RestrictionKind::Ban, "never").await.unwrap());
    }

    #[tokio::test]
    async fn kinds_are_separate() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        bans.add(CHAN, RestrictionKind::Ban, "x!*@*", "a", 1).await.unwrap();
        bans.add(CHAN, RestrictionKind::Quiet, "x!*@*", "a", 1).await.unwrap();
        assert_eq!(bans.active_masks(CHAN, RestrictionKind::Ban).await.unwrap().len(), 1);
        assert_eq!(bans.active_masks(CHAN, RestrictionKind::Quiet).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn due_before_selects_by_expiry() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        let due = bans.add(CHAN, RestrictionKind::Ban, "due", "a", 1000).await.unwrap();
        let later = bans.add(CHAN, RestrictionKind::Ban, "later", "a", 1000).await.unwrap();
        let forever = bans.add(CHAN, RestrictionKind::Ban, "forever", "a", 0).await.unwrap();
        let gone = bans.add(CHAN, RestrictionKind::Ban, "gone", "a", 0).await.unwrap();

        bans.set_duration(due, "a", Some(60)).await.unwrap();
        bans.set_duration(later, "a", Some(61)).await.unwrap();
        bans.set_duration(gone, "a", Some(1)).await.unwrap();
        bans.set_expired(CHAN, RestrictionKind::Ban, "gone").await.unwrap();
        let _ = forever;

        let found = bans.due_before(1060).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].mask, "due");
        assert_eq!(found[0].kind, RestrictionKind::Ban);

        assert_eq!(bans.due_before(1061).await.unwrap().len(), 2);
        assert!(bans.due_before(1059).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn last_active_and_exists() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        assert_eq!(bans.last_active(CHAN).await.unwrap(), None);
        let a = bans.add(CHAN, RestrictionKind::Ban, "a", "x", 1).await.unwrap();
        let b = bans.add(CHAN, RestrictionKind::Quiet, "b", "x", 2).await.unwrap();
        bans.add("#other", RestrictionKind::Ban, "c", "x", 3).await.unwrap();

        assert_eq!(bans.last_active(CHAN).await.unwrap(), Some(b));
        bans.set_expired(CHAN, RestrictionKind::Quiet, "b").await.unwrap();
        assert_eq!(bans.last_active(CHAN).await.unwrap(), Some(a));

        assert!(bans.exists(b).await.unwrap());
        assert!(!bans.exists(9999).await.unwrap());
    }

    #[tokio::test]
    async fn edits_record_actor() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        let id = bans.add(CHAN, RestrictionKind::Ban, "m", "op!o@h", 5).await.unwrap();
        bans.set_reason(id, "op!o@h", "spamming").await.unwrap();
        bans.set_duration(id, "other!o@h", Some(3600)).await.unwrap();

        let record = bans.get(id).await.unwrap().unwrap();
        assert_eq!(record.reason.as_deref(), Some("spamming"));
        assert_eq!(record.reason_set_by.as_deref(), Some("op!o@h"));
        assert_eq!(record.duration, Some(3600));
        assert_eq!(record.duration_set_by.as_deref(), Some("other!o@h"));
        assert_eq!(record.expires_at(), Some(3605));
    }

    #[tokio::test]
    async fn edits_fail_for_unknown_id() {
        let db = Database::new(":memory:").await.unwrap();
        let bans = db.bans();

        assert!(matches!(
            bans.set_reason(42, "a", "r").await,
            Err(crate::db::DbError::RecordNotFound(42))
        ));
        assert!(bans.set_duration(42, "a", None).await.is_err());
    }
}
