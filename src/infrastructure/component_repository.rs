//! SQLite component repository
//!
//! Table names come from [`ComponentKind::table`], never from user input, so they are
//! formatted into the SQL; every value is bound.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteExecutor, SqlitePool};

use crate::domain::component::{
    ComponentKind, ComponentRecord, CoolingRecord, PowerRecord, PsuRecord, StorageRecord,
};
use crate::domain::repositories::{ComponentRepository, InsertOutcome};

fn columns(kind: ComponentKind) -> &'static str {
    match kind {
        ComponentKind::Cpu | ComponentKind::Gpu | ComponentKind::Ram => "name, consumption",
        ComponentKind::Psu => "name, wattage",
        ComponentKind::Storage => "name, consumption, type",
        ComponentKind::Cooling => "name, size, has_led",
    }
}

fn record_from_row(kind: ComponentKind, row: &SqliteRow) -> sqlx::Result<ComponentRecord> {
    let name: String = row.try_get("name")?;
    let record = match kind {
        ComponentKind::Cpu | ComponentKind::Gpu | ComponentKind::Ram => {
            let power = PowerRecord {
                name,
                consumption: row.try_get("consumption")?,
            };
            match kind {
                ComponentKind::Cpu => ComponentRecord::Cpu(power),
                ComponentKind::Gpu => ComponentRecord::Gpu(power),
                _ => ComponentRecord::Ram(power),
            }
        }
        ComponentKind::Psu => {
            let wattage: i64 = row.try_get("wattage")?;
            ComponentRecord::Psu(PsuRecord {
                name,
                wattage: u32::try_from(wattage).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            })
        }
        ComponentKind::Storage => ComponentRecord::Storage(StorageRecord {
            name,
            consumption: row.try_get("consumption")?,
            storage_type: row.try_get("type")?,
        }),
        ComponentKind::Cooling => ComponentRecord::Cooling(CoolingRecord {
            name,
            size: row.try_get("size")?,
            has_led: row.try_get("has_led")?,
        }),
    };
    Ok(record)
}

/// Escape `LIKE` wildcards so the fragment matches literally (with `ESCAPE '\'`)
pub fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len() + 2);
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Whether a row with exactly this name exists (case-sensitive)
pub async fn name_exists<'e, E>(executor: E, kind: ComponentKind, name: &str) -> sqlx::Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let sql = format!("SELECT 1 FROM {} WHERE name = ?", kind.table());
    let found = sqlx::query(&sql).bind(name).fetch_optional(executor).await?;
    Ok(found.is_some())
}

/// Plain `INSERT` of one record into its own table
pub async fn insert_record<'e, E>(executor: E, record: &ComponentRecord) -> sqlx::Result<()>
where
    E: SqliteExecutor<'e>,
{
    let table = record.kind().table();
    match record {
        ComponentRecord::Cpu(r) | ComponentRecord::Gpu(r) | ComponentRecord::Ram(r) => {
            let sql = format!("INSERT INTO {table} (name, consumption) VALUES (?, ?)");
            sqlx::query(&sql)
                .bind(&r.name)
                .bind(&r.consumption)
                .execute(executor)
                .await?;
        }
        ComponentRecord::Psu(r) => {
            let sql = format!("INSERT INTO {table} (name, wattage) VALUES (?, ?)");
            sqlx::query(&sql)
                .bind(&r.name)
                .bind(i64::from(r.wattage))
                .execute(executor)
                .await?;
        }
        ComponentRecord::Storage(r) => {
            let sql = format!("INSERT INTO {table} (name, consumption, type) VALUES (?, ?, ?)");
            sqlx::query(&sql)
                .bind(&r.name)
                .bind(&r.consumption)
                .bind(&r.storage_type)
                .execute(executor)
                .await?;
        }
        ComponentRecord::Cooling(r) => {
            let sql = format!("INSERT INTO {table} (name, size, has_led) VALUES (?, ?, ?)");
            sqlx::query(&sql)
                .bind(&r.name)
                .bind(&r.size)
                .bind(r.has_led)
                .execute(executor)
                .await?;
        }
    }
    Ok(())
}

#[derive(Clone)]
pub struct SqliteComponentRepository {
    pool: SqlitePool,
}

impl SqliteComponentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ComponentRepository for SqliteComponentRepository {
    async fn list(&self, kind: ComponentKind) -> Result<Vec<ComponentRecord>> {
        let sql = format!("SELECT {} FROM {} ORDER BY name", columns(kind), kind.table());
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", kind.table()))?;

        rows.iter()
            .map(|row| record_from_row(kind, row).map_err(Into::into))
            .collect()
    }

    async fn search(&self, kind: ComponentKind, fragment: &str) -> Result<Vec<ComponentRecord>> {
        let sql = format!(
            r"SELECT {} FROM {} WHERE name LIKE ? ESCAPE '\' ORDER BY name",
            columns(kind),
            kind.table()
        );
        let pattern = format!("%{}%", escape_like(fragment));
        let rows = sqlx::query(&sql)
            .bind(pattern)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to search {}", kind.table()))?;

        rows.iter()
            .map(|row| record_from_row(kind, row).map_err(Into::into))
            .collect()
    }

    async fn create(&self, record: &ComponentRecord) -> Result<InsertOutcome> {
        let kind = record.kind();
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        if name_exists(&mut *tx, kind, record.name()).await? {
            return Ok(InsertOutcome::AlreadyExists);
        }
        insert_record(&mut *tx, record)
            .await
            .with_context(|| format!("Failed to insert into {}", kind.table()))?;
        tx.commit().await.context("Failed to commit insert")?;

        Ok(InsertOutcome::Inserted)
    }

    async fn count(&self, kind: ComponentKind) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", kind.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database_connection::DatabaseConnection;

    async fn repository() -> SqliteComponentRepository {
        let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        SqliteComponentRepository::new(db.pool().clone())
    }

    fn cpu(name: &str, consumption: &str) -> ComponentRecord {
        ComponentRecord::Cpu(PowerRecord {
            name: name.into(),
            consumption: consumption.into(),
        })
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("RTX 4090"), "RTX 4090");
    }

    #[tokio::test]
    async fn test_create_then_duplicate() {
        let repo = repository().await;

        assert_eq!(repo.create(&cpu("Ryzen 5 5600X", "65 W")).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            repo.create(&cpu("Ryzen 5 5600X", "95 W")).await.unwrap(),
            InsertOutcome::AlreadyExists
        );
        assert_eq!(repo.count(ComponentKind::Cpu).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let repo = repository().await;
        for name in ["Ryzen 7 7700", "Core i5-12400", "Athlon 3000G"] {
            repo.create(&cpu(name, "65 W")).await.unwrap();
        }

        let names: Vec<String> = repo
            .list(ComponentKind::Cpu)
            .await
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();

        assert_eq!(names, vec!["Athlon 3000G", "Core i5-12400", "Ryzen 7 7700"]);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_literal() {
        let repo = repository().await;
        repo.create(&cpu("Ryzen 5 5600X", "65 W")).await.unwrap();
        repo.create(&cpu("Ryzen_Test 100%", "1 W")).await.unwrap();

        assert_eq!(repo.search(ComponentKind::Cpu, "ryzen").await.unwrap().len(), 2);
        assert_eq!(repo.search(ComponentKind::Cpu, "5600x").await.unwrap().len(), 1);
        assert_eq!(repo.search(ComponentKind::Cpu, "_").await.unwrap().len(), 1);
        assert_eq!(repo.search(ComponentKind::Cpu, "100%").await.unwrap().len(), 1);
        assert!(repo.search(ComponentKind::Cpu, "xeon").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_every_kind_round_trips() {
        let repo = repository().await;
        let records = vec![
            ComponentRecord::Psu(PsuRecord { name: "RM750x".into(), wattage: 750 }),
            ComponentRecord::Ram(PowerRecord { name: "DDR5-6000 2x16".into(), consumption: "10 W".into() }),
            ComponentRecord::Storage(StorageRecord {
                name: "990 Pro".into(),
                consumption: "7 W".into(),
                storage_type: "NVMe".into(),
            }),
            ComponentRecord::Cooling(CoolingRecord { name: "NH-D15".into(), size: "165 mm".into(), has_led: false }),
        ];

        for record in &records {
            repo.create(record).await.unwrap();
            assert_eq!(repo.list(record.kind()).await.unwrap(), vec![record.clone()]);
        }
        assert!(repo.ping().await.is_ok());
    }
}
