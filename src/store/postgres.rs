use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{PhoneStore, StoreError};
use crate::model::{PhoneChanges, PhoneFilter, PhoneRecord, PhoneStatus, RecordId};
use crate::schema::{PhoneNumber, CREATE_TABLE};

const SELECT_RECORDS: &str =
    "SELECT id, phone, country, status, note, created_at, updated_at FROM phonenumber WHERE TRUE";

#[derive(Debug, FromRow)]
struct PhoneRow {
    id: Uuid,
    phone: String,
    country: Option<String>,
    status: String,
    note: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<PhoneRow> for PhoneRecord {
    type Error = StoreError;

    fn try_from(row: PhoneRow) -> Result<Self, Self::Error> {
        let status = PhoneStatus::from_str(&row.status)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(PhoneRecord {
            id: RecordId(row.id),
            phone: row.phone,
            country: row.country,
            status,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Postgres-backed store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects to `database_url`, optionally overriding the database name,
    /// and makes sure the collection table exists.
    pub async fn connect(
        database_url: &str,
        database_name: Option<&str>,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let mut options = PgConnectOptions::from_str(database_url)?;
        if let Some(name) = database_name {
            options = options.database(name);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect_with(options)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PhoneFilter) {
    if let Some(status) = &filter.status {
        qb.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(query) = &filter.query {
        // strpos keeps the match literal; no LIKE or regex metacharacters apply.
        qb.push(" AND (");
        for (i, column) in ["phone", "note", "country"].into_iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push("strpos(lower(")
                .push(column)
                .push("), lower(")
                .push_bind(query.clone())
                .push(")) > 0");
        }
        qb.push(")");
    }
}

/// Appends only the supplied fields, then `updated_at`, then the id match.
fn push_changes(
    qb: &mut QueryBuilder<'_, Postgres>,
    changes: &PhoneChanges,
    now: DateTime<Utc>,
    id: RecordId,
) {
    let mut set = qb.separated(", ");
    if let Some(phone) = &changes.phone {
        set.push("phone = ").push_bind_unseparated(phone.clone());
    }
    if let Some(country) = &changes.country {
        set.push("country = ").push_bind_unseparated(country.clone());
    }
    if let Some(status) = changes.status {
        set.push("status = ").push_bind_unseparated(status.as_str());
    }
    if let Some(note) = &changes.note {
        set.push("note = ").push_bind_unseparated(note.clone());
    }
    set.push("updated_at = ").push_bind_unseparated(now);
    qb.push(" WHERE id = ").push_bind(id.0);
}

#[async_trait]
impl PhoneStore for PgStore {
    async fn find(
        &self,
        filter: &PhoneFilter,
        limit: Option<i64>,
    ) -> Result<Vec<PhoneRecord>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_RECORDS);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY seq");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows: Vec<PhoneRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(PhoneRecord::try_from).collect()
    }

    async fn insert(
        &self,
        record: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<RecordId, StoreError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO phonenumber (phone, country, status, note, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING id",
        )
        .bind(record.phone())
        .bind(record.country())
        .bind(record.status().as_str())
        .bind(record.note())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(RecordId(id))
    }

    async fn update(
        &self,
        id: RecordId,
        changes: &PhoneChanges,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE phonenumber SET ");
        push_changes(&mut qb, changes, now, id);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: RecordId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM phonenumber WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables \
             WHERE table_schema = current_schema() ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_sql_binds_each_search_column() {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_RECORDS);
        push_filter(
            &mut qb,
            &PhoneFilter::new(Some("has_fb".into()), Some("5.5".into())),
        );
        let sql = qb.sql();
        assert!(sql.contains("AND status = $1"));
        assert!(sql.contains("strpos(lower(phone), lower($2)) > 0"));
        assert!(sql.contains("strpos(lower(note), lower($3)) > 0"));
        assert!(sql.contains("strpos(lower(country), lower($4)) > 0"));
    }

    #[test]
    fn update_sets_only_given_fields() {
        let changes = PhoneChanges {
            status: Some(PhoneStatus::HasFb),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE phonenumber SET ");
        push_changes(&mut qb, &changes, Utc::now(), RecordId::new_random());
        assert_eq!(
            qb.sql(),
            "UPDATE phonenumber SET status = $1, updated_at = $2 WHERE id = $3"
        );
    }

    #[test]
    fn update_sets_every_field_in_column_order() {
        let changes = PhoneChanges {
            phone: Some("555".into()),
            country: Some("us".into()),
            status: Some(PhoneStatus::Review),
            note: Some("n".into()),
        };
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE phonenumber SET ");
        push_changes(&mut qb, &changes, Utc::now(), RecordId::new_random());
        assert_eq!(
            qb.sql(),
            "UPDATE phonenumber SET phone = $1, country = $2, status = $3, note = $4, \
             updated_at = $5 WHERE id = $6"
        );
    }

    #[test]
    fn empty_filter_adds_no_conditions() {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_RECORDS);
        push_filter(&mut qb, &PhoneFilter::default());
        assert_eq!(qb.sql(), SELECT_RECORDS);
    }

    #[test]
    fn unknown_stored_status_is_invalid_data() {
        let row = PhoneRow {
            id: Uuid::new_v4(),
            phone: "1".into(),
            country: None,
            status: "archived".into(),
            note: None,
            created_at: None,
            updated_at: None,
        };
        assert!(matches!(
            PhoneRecord::try_from(row),
            Err(StoreError::InvalidData(_))
        ));
    }
}
