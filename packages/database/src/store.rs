//! Snapshot table writes.

use async_trait::async_trait;
use switchy_database::{Database, DatabaseError, DatabaseValue};

use crate::snapshot::{self, ColumnLimits, Snapshot};
use crate::{DbError, WriteStage};

/// Destination for rendered snapshots.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Replaces the stored snapshot with `snapshot`. Either every row is
    /// replaced or the previous contents are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the write fails.
    async fn replace(&self, snapshot: &Snapshot) -> Result<(), DbError>;
}

/// [`SnapshotSink`] over a `switchy_database` connection.
pub struct SwitchyStore {
    db: Box<dyn Database>,
    table: String,
}

impl std::fmt::Debug for SwitchyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchyStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SwitchyStore {
    /// Wraps `db`, writing snapshots to `table`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidTable`] if `table` is not a plain
    /// identifier.
    pub fn new(db: Box<dyn Database>, table: impl Into<String>) -> Result<Self, DbError> {
        let table = table.into();
        if !snapshot::is_valid_table_name(&table) {
            return Err(DbError::InvalidTable(table));
        }
        Ok(Self { db, table })
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The underlying connection.
    #[must_use]
    pub fn database(&self) -> &dyn Database {
        self.db.as_ref()
    }

    fn persistence(&self, stage: WriteStage, source: DatabaseError) -> DbError {
        DbError::Persistence {
            stage,
            table: self.table.clone(),
            source,
        }
    }
}

#[async_trait]
impl SnapshotSink for SwitchyStore {
    async fn replace(&self, snapshot: &Snapshot) -> Result<(), DbError> {
        let delete_sql = format!("DELETE FROM {}", self.table);
        let insert_sql = snapshot.insert_sql(&self.table);
        let params: Vec<DatabaseValue> = snapshot
            .rows()
            .into_iter()
            .flatten()
            .map(|value| DatabaseValue::String(value.to_string()))
            .collect();

        let txn = self
            .db
            .begin_transaction()
            .await
            .map_err(|e| self.persistence(WriteStage::Begin, e))?;

        let written = async {
            txn.exec_raw(&delete_sql)
                .await
                .map_err(|e| self.persistence(WriteStage::Delete, e))?;
            txn.exec_raw_params(&insert_sql, &params)
                .await
                .map_err(|e| self.persistence(WriteStage::Insert, e))?;
            Ok::<_, DbError>(())
        }
        .await;

        if let Err(e) = written {
            if let Err(rollback) = txn.rollback().await {
                log::error!("Failed to roll back snapshot write to {}: {rollback}", self.table);
            }
            return Err(e);
        }

        txn.commit()
            .await
            .map_err(|e| self.persistence(WriteStage::Commit, e))?;

        log::debug!(
            "Replaced snapshot in {} ({} columns)",
            self.table,
            snapshot.columns().len()
        );

        Ok(())
    }
}

/// Creates `table` with room for `limits` dynamic columns if it does not
/// already exist.
///
/// # Errors
///
/// Returns [`DbError`] if `table` is not a plain identifier or the DDL
/// fails.
pub async fn create_table(
    db: &dyn Database,
    table: &str,
    limits: ColumnLimits,
) -> Result<(), DbError> {
    if !snapshot::is_valid_table_name(table) {
        return Err(DbError::InvalidTable(table.to_string()));
    }

    db.exec_raw(&snapshot::create_table_sql(table, limits))
        .await?;

    log::info!(
        "Ensured snapshot table {table} ({} area, {} department columns)",
        limits.areas,
        limits.departments
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;
    use moosicbox_json_utils::database::ToValue as _;
    use syncloc_occupancy_models::CycleAggregate;

    use super::*;
    use crate::db::connect;
    use crate::snapshot::{AreaColumn, Reference, TIMESTAMP_FORMAT};

    const LIMITS: ColumnLimits = ColumnLimits {
        areas: 4,
        departments: 4,
    };

    fn snapshot(at: &str, area_count: u64) -> Snapshot {
        let mut agg = CycleAggregate::zeroed(["Main"], ["Ops"]);
        agg.area_person_count.insert("Main".to_string(), area_count);
        Snapshot::build(
            &agg,
            Reference {
                areas: &[AreaColumn {
                    id: "1",
                    name: "Main",
                }],
                departments: &["Ops"],
                site_count: 2,
            },
            LIMITS,
            NaiveDateTime::parse_from_str(at, TIMESTAMP_FORMAT).unwrap(),
        )
    }

    /// A file-backed sink so every pooled connection sees the same data.
    async fn open(dir: &tempfile::TempDir) -> Box<dyn Database> {
        let dsn = format!("sqlite://{}", dir.path().join("sink.db").display());
        connect(&dsn).await.unwrap()
    }

    async fn store(dir: &tempfile::TempDir) -> SwitchyStore {
        let db = open(dir).await;
        create_table(db.as_ref(), "tb_inwell", LIMITS).await.unwrap();
        SwitchyStore::new(db, "tb_inwell").unwrap()
    }

    async fn stored(store: &SwitchyStore) -> Vec<(String, String, String)> {
        store
            .database()
            .query_raw_params(
                "SELECT UPDATE_TIME_, TOTAL_AREA_, COL_1_ FROM tb_inwell ORDER BY rowid",
                &[],
            )
            .await
            .unwrap()
            .iter()
            .map(|row| {
                (
                    row.to_value("UPDATE_TIME_").unwrap_or_default(),
                    row.to_value("TOTAL_AREA_").unwrap_or_default(),
                    row.to_value("COL_1_").unwrap_or_default(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn replace_writes_three_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.replace(&snapshot("2024-03-05 12:00:00", 7)).await.unwrap();

        let rows = stored(&store).await;
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            (
                "2024-03-05 12:00:00".to_string(),
                "1".to_string(),
                "7".to_string()
            )
        );
        assert_eq!(rows[1].2, "1");
        assert_eq!(rows[2].2, "Main");
        assert_eq!(rows[2].1, "Total areas");
    }

    #[tokio::test]
    async fn replace_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.replace(&snapshot("2024-03-05 12:00:00", 7)).await.unwrap();
        store.replace(&snapshot("2024-03-05 12:00:05", 3)).await.unwrap();

        let rows = stored(&store).await;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|(time, _, _)| time == "2024-03-05 12:00:05"));
        assert_eq!(rows[0].2, "3");
    }

    #[tokio::test]
    async fn failed_insert_keeps_previous_rows() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        // Too narrow for the snapshot's department column.
        create_table(
            db.as_ref(),
            "tb_inwell",
            ColumnLimits {
                areas: 4,
                departments: 0,
            },
        )
        .await
        .unwrap();
        db.exec_raw("INSERT INTO tb_inwell (UPDATE_TIME_) VALUES ('old')")
            .await
            .unwrap();
        let store = SwitchyStore::new(db, "tb_inwell").unwrap();

        let err = store
            .replace(&snapshot("2024-03-05 12:00:00", 7))
            .await
            .unwrap_err();
        match err {
            DbError::Persistence { stage, table, .. } => {
                assert_eq!(stage, WriteStage::Insert);
                assert_eq!(table, "tb_inwell");
            }
            other => panic!("unexpected error: {other}"),
        }

        let rows = store
            .database()
            .query_raw_params("SELECT UPDATE_TIME_ FROM tb_inwell", &[])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].to_value::<String>("UPDATE_TIME_").unwrap(),
            "old"
        );
    }

    #[tokio::test]
    async fn missing_table_fails_at_delete() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        let store = SwitchyStore::new(db, "tb_missing").unwrap();

        let err = store
            .replace(&snapshot("2024-03-05 12:00:00", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Persistence {
                stage: WriteStage::Delete,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rejects_unsafe_table_names() {
        let dir = tempfile::tempdir().unwrap();
        let db = open(&dir).await;
        assert!(matches!(
            create_table(db.as_ref(), "t; DROP TABLE x", LIMITS).await,
            Err(DbError::InvalidTable(_))
        ));
        assert!(matches!(
            SwitchyStore::new(db, "bad name"),
            Err(DbError::InvalidTable(_))
        ));
    }

    #[test]
    fn write_stage_renders_lowercase() {
        assert_eq!(WriteStage::Delete.to_string(), "delete");
        assert_eq!(WriteStage::Insert.as_ref(), "insert");
    }
}
