use chrono::{DateTime, Utc};
use mls_common::Rupees;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{ActivityRecord, NewActivity},
};

#[derive(Debug, FromRow)]
struct ActivityRow {
    id: i64,
    kind: String,
    message: String,
    amount: i64,
    unit: String,
    actor_type: String,
    actor_id: String,
    meta: String,
    created_at: DateTime<Utc>,
}

impl ActivityRow {
    fn into_record(self) -> ActivityRecord {
        // A malformed meta document only degrades the audit view, never the ledger.
        let meta = serde_json::from_str(&self.meta).unwrap_or(serde_json::Value::Null);
        ActivityRecord {
            id: self.id,
            kind: self.kind.into(),
            message: self.message,
            amount: Rupees::from(self.amount),
            unit: self.unit,
            actor_type: self.actor_type.into(),
            actor_id: self.actor_id,
            meta,
            created_at: self.created_at,
        }
    }
}

pub async fn insert_activity(
    activity: &NewActivity,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO activity (kind, message, amount, unit, actor_type, actor_id, meta)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(activity.kind.to_string())
    .bind(&activity.message)
    .bind(activity.amount.value())
    .bind(&activity.unit)
    .bind(activity.actor_type.to_string())
    .bind(&activity.actor_id)
    .bind(activity.meta.to_string())
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn recent_activity(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<ActivityRecord>, SqliteDatabaseError> {
    let rows = sqlx::query_as::<_, ActivityRow>(
        r#"
        SELECT id, kind, message, amount, unit, actor_type, actor_id, meta, created_at
        FROM activity
        ORDER BY created_at DESC, id DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(ActivityRow::into_record).collect())
}
