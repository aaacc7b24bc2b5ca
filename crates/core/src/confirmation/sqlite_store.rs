//! SQLite-backed confirmation store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    ConfirmationFilter, ConfirmationRecord, ConfirmationStore, ConfirmationUpsert, LabOrder,
    StoreError, SyncStatus,
};

const SELECT_COLUMNS: &str = "correlation_id, lab_order_id, organization_id, facility_id, accession_number, received_time, message, raw_payload, sync_status, sync_error, retrieved_at, acknowledged_at, created_at, updated_at";

/// Linkage columns are only filled when empty; payload columns only
/// overwrite with non-null values; status and error are always written.
const UPSERT_SQL: &str = r#"
INSERT INTO lab_order_confirmations (
    correlation_id, lab_order_id, organization_id, facility_id, accession_number,
    received_time, message, raw_payload, sync_status, sync_error,
    retrieved_at, acknowledged_at, created_at, updated_at
) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
ON CONFLICT(correlation_id) DO UPDATE SET
    lab_order_id = COALESCE(lab_order_confirmations.lab_order_id, excluded.lab_order_id),
    organization_id = COALESCE(lab_order_confirmations.organization_id, excluded.organization_id),
    facility_id = COALESCE(lab_order_confirmations.facility_id, excluded.facility_id),
    accession_number = COALESCE(excluded.accession_number, lab_order_confirmations.accession_number),
    received_time = COALESCE(excluded.received_time, lab_order_confirmations.received_time),
    message = COALESCE(excluded.message, lab_order_confirmations.message),
    raw_payload = COALESCE(excluded.raw_payload, lab_order_confirmations.raw_payload),
    sync_status = excluded.sync_status,
    sync_error = excluded.sync_error,
    retrieved_at = COALESCE(excluded.retrieved_at, lab_order_confirmations.retrieved_at),
    acknowledged_at = COALESCE(excluded.acknowledged_at, lab_order_confirmations.acknowledged_at),
    updated_at = excluded.updated_at
"#;

/// SQLite-backed confirmation store.
pub struct SqliteConfirmationStore {
    conn: Mutex<Connection>,
}

impl SqliteConfirmationStore {
    /// Create a new SQLite store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS lab_order_confirmations (
                correlation_id TEXT PRIMARY KEY,
                lab_order_id TEXT,
                organization_id TEXT,
                facility_id TEXT,
                accession_number TEXT,
                received_time TEXT,
                message TEXT,
                raw_payload TEXT,
                sync_status TEXT NOT NULL,
                sync_error TEXT,
                retrieved_at TEXT,
                acknowledged_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_confirmations_status ON lab_order_confirmations(sync_status);
            CREATE INDEX IF NOT EXISTS idx_confirmations_accession ON lab_order_confirmations(accession_number);
            CREATE INDEX IF NOT EXISTS idx_confirmations_updated_at ON lab_order_confirmations(updated_at);

            CREATE TABLE IF NOT EXISTS lab_orders (
                id TEXT PRIMARY KEY,
                accession_number TEXT,
                organization_id TEXT,
                facility_id TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_lab_orders_accession ON lab_orders(accession_number);
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    /// Insert or replace a local lab order (seeding and tests).
    pub fn insert_lab_order(&self, order: &LabOrder) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO lab_orders (id, accession_number, organization_id, facility_id) VALUES (?, ?, ?, ?)",
            params![
                order.id,
                order.accession_number,
                order.organization_id,
                order.facility_id
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    fn build_where_clause(filter: &ConfirmationFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        let where_clause = match filter.status {
            Some(status) => {
                params.push(Box::new(status.as_str()));
                "WHERE sync_status = ?".to_string()
            }
            None => String::new(),
        };

        (where_clause, params)
    }

    fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
        value.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ConfirmationRecord> {
        let status_str: String = row.get(8)?;
        let created_at: String = row.get(12)?;
        let updated_at: String = row.get(13)?;

        // Only this store writes the column, so unknown values mean a corrupt row.
        let sync_status = status_str.parse().unwrap_or(SyncStatus::Error);

        Ok(ConfirmationRecord {
            correlation_id: row.get(0)?,
            lab_order_id: row.get(1)?,
            organization_id: row.get(2)?,
            facility_id: row.get(3)?,
            accession_number: row.get(4)?,
            received_time: row.get(5)?,
            message: row.get(6)?,
            raw_payload: row.get(7)?,
            sync_status,
            sync_error: row.get(9)?,
            retrieved_at: Self::parse_timestamp(row.get(10)?),
            acknowledged_at: Self::parse_timestamp(row.get(11)?),
            created_at: Self::parse_timestamp(Some(created_at)).unwrap_or_else(Utc::now),
            updated_at: Self::parse_timestamp(Some(updated_at)).unwrap_or_else(Utc::now),
        })
    }

    fn get_locked(
        conn: &Connection,
        correlation_id: &str,
    ) -> Result<Option<ConfirmationRecord>, StoreError> {
        conn.query_row(
            &format!(
                "SELECT {} FROM lab_order_confirmations WHERE correlation_id = ?",
                SELECT_COLUMNS
            ),
            params![correlation_id],
            Self::row_to_record,
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl ConfirmationStore for SqliteConfirmationStore {
    fn get(&self, correlation_id: &str) -> Result<Option<ConfirmationRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, correlation_id)
    }

    fn upsert(&self, upsert: ConfirmationUpsert) -> Result<ConfirmationRecord, StoreError> {
        upsert.validate().map_err(StoreError::InvalidRecord)?;

        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        conn.execute(
            UPSERT_SQL,
            params![
                upsert.correlation_id,
                upsert.linkage.lab_order_id,
                upsert.linkage.organization_id,
                upsert.linkage.facility_id,
                upsert.accession_number,
                upsert.received_time,
                upsert.message,
                upsert.raw_payload,
                upsert.sync_status.as_str(),
                upsert.sync_error,
                upsert.retrieved_at.map(|t| t.to_rfc3339()),
                upsert.acknowledged_at.map(|t| t.to_rfc3339()),
                now,
            ],
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Self::get_locked(&conn, &upsert.correlation_id)?.ok_or_else(|| {
            StoreError::Database(format!(
                "confirmation {} missing after upsert",
                upsert.correlation_id
            ))
        })
    }

    fn find_order_by_accession(
        &self,
        accession_number: &str,
    ) -> Result<Option<LabOrder>, StoreError> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, accession_number, organization_id, facility_id FROM lab_orders WHERE accession_number = ? ORDER BY id LIMIT 1",
            params![accession_number],
            |row| {
                Ok(LabOrder {
                    id: row.get(0)?,
                    accession_number: row.get(1)?,
                    organization_id: row.get(2)?,
                    facility_id: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list(&self, filter: &ConfirmationFilter) -> Result<Vec<ConfirmationRecord>, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM lab_order_confirmations {} ORDER BY updated_at DESC, correlation_id ASC LIMIT ? OFFSET ?",
            SELECT_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_record)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut records = Vec::new();
        for row_result in rows {
            records.push(row_result.map_err(|e| StoreError::Database(e.to_string()))?);
        }

        Ok(records)
    }

    fn count(&self, filter: &ConfirmationFilter) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM lab_order_confirmations {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        conn.query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::Linkage;

    fn create_test_store() -> SqliteConfirmationStore {
        SqliteConfirmationStore::in_memory().unwrap()
    }

    fn test_order() -> LabOrder {
        LabOrder {
            id: "order-1".to_string(),
            accession_number: "12345".to_string(),
            organization_id: Some("org-1".to_string()),
            facility_id: Some("fac-1".to_string()),
        }
    }

    #[test]
    fn test_upsert_creates_record() {
        let store = create_test_store();
        let now = Utc::now();

        let record = store
            .upsert(
                ConfirmationUpsert::retrieved("g-1", now)
                    .with_accession_number(Some("12345".to_string()))
                    .with_raw_payload("Accession:12345"),
            )
            .unwrap();

        assert_eq!(record.correlation_id, "g-1");
        assert_eq!(record.sync_status, SyncStatus::Retrieved);
        assert_eq!(record.accession_number.as_deref(), Some("12345"));
        assert_eq!(record.raw_payload.as_deref(), Some("Accession:12345"));
        assert!(record.retrieved_at.is_some());
        assert!(record.acknowledged_at.is_none());
    }

    #[test]
    fn test_upsert_same_id_keeps_one_row() {
        let store = create_test_store();
        let now = Utc::now();

        store
            .upsert(
                ConfirmationUpsert::retrieved("g-1", now)
                    .with_accession_number(Some("111".to_string())),
            )
            .unwrap();
        store
            .upsert(
                ConfirmationUpsert::retrieved("g-1", now)
                    .with_accession_number(Some("222".to_string())),
            )
            .unwrap();

        assert_eq!(store.count(&ConfirmationFilter::new()).unwrap(), 1);
        let record = store.get("g-1").unwrap().unwrap();
        assert_eq!(record.accession_number.as_deref(), Some("222"));
    }

    #[test]
    fn test_partial_upsert_preserves_payload_fields() {
        let store = create_test_store();
        let now = Utc::now();

        store
            .upsert(
                ConfirmationUpsert::retrieved("g-1", now)
                    .with_accession_number(Some("12345".to_string()))
                    .with_received_time(Some("20240115103000".to_string()))
                    .with_raw_payload("raw"),
            )
            .unwrap();
        let record = store
            .upsert(ConfirmationUpsert::acknowledged("g-1", Utc::now()))
            .unwrap();

        assert_eq!(record.sync_status, SyncStatus::Acknowledged);
        assert_eq!(record.accession_number.as_deref(), Some("12345"));
        assert_eq!(record.received_time.as_deref(), Some("20240115103000"));
        assert_eq!(record.raw_payload.as_deref(), Some("raw"));
        assert!(record.retrieved_at.is_some());
        assert!(record.acknowledged_at.is_some());
    }

    #[test]
    fn test_error_upsert_creates_missing_record() {
        let store = create_test_store();

        let record = store
            .upsert(ConfirmationUpsert::error("g-err", "HTTP 503: unavailable"))
            .unwrap();

        assert_eq!(record.sync_status, SyncStatus::Error);
        assert_eq!(record.sync_error.as_deref(), Some("HTTP 503: unavailable"));
        assert!(record.retrieved_at.is_none());
    }

    #[test]
    fn test_success_write_clears_error() {
        let store = create_test_store();

        store
            .upsert(ConfirmationUpsert::error("g-1", "timeout"))
            .unwrap();
        let record = store
            .upsert(ConfirmationUpsert::retrieved("g-1", Utc::now()))
            .unwrap();

        assert_eq!(record.sync_status, SyncStatus::Retrieved);
        assert!(record.sync_error.is_none());
    }

    #[test]
    fn test_linkage_only_fills_empty_columns() {
        let store = create_test_store();
        let now = Utc::now();

        store
            .upsert(ConfirmationUpsert::retrieved("g-1", now).with_linkage(Linkage {
                lab_order_id: Some("order-old".to_string()),
                organization_id: None,
                facility_id: None,
            }))
            .unwrap();
        let record = store
            .upsert(ConfirmationUpsert::retrieved("g-1", now).with_linkage(Linkage {
                lab_order_id: Some("order-new".to_string()),
                organization_id: Some("org-1".to_string()),
                facility_id: Some("fac-1".to_string()),
            }))
            .unwrap();

        assert_eq!(record.lab_order_id.as_deref(), Some("order-old"));
        assert_eq!(record.organization_id.as_deref(), Some("org-1"));
        assert_eq!(record.facility_id.as_deref(), Some("fac-1"));
    }

    #[test]
    fn test_upsert_rejects_invalid_record() {
        let store = create_test_store();
        let mut upsert = ConfirmationUpsert::error("g-1", "x");
        upsert.sync_error = None;

        let err = store.upsert(upsert).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert!(store.get("g-1").unwrap().is_none());
    }

    #[test]
    fn test_get_nonexistent_record() {
        let store = create_test_store();
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_find_order_by_accession() {
        let store = create_test_store();
        store.insert_lab_order(&test_order()).unwrap();

        let order = store.find_order_by_accession("12345").unwrap().unwrap();
        assert_eq!(order.id, "order-1");
        assert_eq!(order.facility_id.as_deref(), Some("fac-1"));

        assert!(store.find_order_by_accession("99999").unwrap().is_none());
    }

    #[test]
    fn test_list_and_count_by_status() {
        let store = create_test_store();
        let now = Utc::now();

        store
            .upsert(ConfirmationUpsert::acknowledged("g-1", now))
            .unwrap();
        store
            .upsert(ConfirmationUpsert::acknowledged("g-2", now))
            .unwrap();
        store.upsert(ConfirmationUpsert::error("g-3", "boom")).unwrap();

        let acked = ConfirmationFilter::new().with_status(SyncStatus::Acknowledged);
        assert_eq!(store.count(&acked).unwrap(), 2);
        assert_eq!(store.list(&acked).unwrap().len(), 2);

        let errors = store
            .list(&ConfirmationFilter::new().with_status(SyncStatus::Error))
            .unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].correlation_id, "g-3");

        assert_eq!(store.count(&ConfirmationFilter::new()).unwrap(), 3);
    }

    #[test]
    fn test_list_pagination() {
        let store = create_test_store();
        for i in 0..5 {
            store
                .upsert(ConfirmationUpsert::retrieved(format!("g-{}", i), Utc::now()))
                .unwrap();
        }

        let page = store
            .list(&ConfirmationFilter::new().with_limit(2).with_offset(0))
            .unwrap();
        assert_eq!(page.len(), 2);

        let rest = store
            .list(&ConfirmationFilter::new().with_limit(10).with_offset(2))
            .unwrap();
        assert_eq!(rest.len(), 3);
    }

    #[test]
    fn test_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labsync.db");

        {
            let store = SqliteConfirmationStore::new(&path).unwrap();
            store
                .upsert(ConfirmationUpsert::acknowledged("g-1", Utc::now()))
                .unwrap();
        }

        let reopened = SqliteConfirmationStore::new(&path).unwrap();
        let record = reopened.get("g-1").unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Acknowledged);
    }
}
