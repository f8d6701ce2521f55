use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

use super::BASE_DB_VERSION;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Only mutated when optional field assignments are passed
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }

    fn from_sql(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            "BLOB" => Some(&SqlType::Blob),
            _ => None,
        }
    }
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'static str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(&format!("CREATE TABLE {} ({});", self.name, columns), params![])?;

        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX {} ON {}({});",
                    index_name, self.name, column_name
                ),
                params![],
            )?;
        }
        Ok(())
    }

    /// Checks that the table on disk has the expected columns, in order.
    pub fn validate(&self, conn: &Connection) -> Result<()> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual: Vec<(String, String, bool, bool)> = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)? == 1,
                    row.get::<_, i32>(5)? == 1,
                ))
            })?
            .collect::<Result<_, _>>()?;

        if actual.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}",
                self.name,
                actual.len(),
                self.columns.len()
            );
        }

        for ((name, sql_type, non_null, is_primary_key), expected) in
            actual.iter().zip(self.columns.iter())
        {
            if name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    name
                );
            }
            if SqlType::from_sql(sql_type) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    sql_type
                );
            }
            if *non_null != expected.non_null || *is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} constraint mismatch",
                    self.name,
                    expected.name
                );
            }
        }

        for (index_name, _) in self.indices {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Opens (or creates) a connection and brings it to the latest of `schemas`.
///
/// `schemas` must be ordered by version, starting at 0.
pub fn open_versioned(conn: Connection, is_new: bool, schemas: &[VersionedSchema]) -> Result<Connection> {
    let latest = schemas.last().context("No schema versions declared")?;
    if is_new {
        latest.create(&conn)?;
        return Ok(conn);
    }

    let db_version = conn
        .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
        .context("Failed to read database version")?
        - BASE_DB_VERSION as i64;

    if db_version < 0 {
        bail!(
            "Database version {} is too old, does not contain base db version {}",
            db_version,
            BASE_DB_VERSION
        );
    }
    let version = db_version as usize;
    let current = schemas
        .get(version)
        .with_context(|| format!("Database version {} is too new", version))?;
    current.validate(&conn)?;

    let mut latest_from = version;
    for schema in schemas.iter().skip(version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating db from version {} to {}",
                latest_from, schema.version
            );
            migration_fn(&conn)?;
        }
        latest_from = schema.version;
    }
    conn.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
        [],
    )?;

    Ok(conn)
}
