use std::fs;
use std::sync::LazyLock;

use camino::Utf8Path;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, ToSql, params};

use crate::domain::{Fields, VocabularyToken};
use crate::error::LoaderError;

const SCHEMA: &str = include_str!("schema.sql");

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub trait ChadoStore {
    fn select_keys(
        &self,
        table: &str,
        pkey: &str,
        conditions: &Fields,
    ) -> Result<Vec<i64>, LoaderError>;

    fn insert(&self, table: &str, pkey: &str, values: &Fields)
    -> Result<Option<i64>, LoaderError>;

    fn term_ids_by_accession(&self, token: &VocabularyToken) -> Result<Vec<i64>, LoaderError>;

    fn organism_ids_by_name(&self, name: &str) -> Result<Vec<i64>, LoaderError>;

    fn record_exists(&self, table: &str, pkey: &str, id: i64) -> Result<bool, LoaderError>;
}

impl<T: ChadoStore + ?Sized> ChadoStore for &T {
    fn select_keys(
        &self,
        table: &str,
        pkey: &str,
        conditions: &Fields,
    ) -> Result<Vec<i64>, LoaderError> {
        (**self).select_keys(table, pkey, conditions)
    }

    fn insert(
        &self,
        table: &str,
        pkey: &str,
        values: &Fields,
    ) -> Result<Option<i64>, LoaderError> {
        (**self).insert(table, pkey, values)
    }

    fn term_ids_by_accession(&self, token: &VocabularyToken) -> Result<Vec<i64>, LoaderError> {
        (**self).term_ids_by_accession(token)
    }

    fn organism_ids_by_name(&self, name: &str) -> Result<Vec<i64>, LoaderError> {
        (**self).organism_ids_by_name(name)
    }

    fn record_exists(&self, table: &str, pkey: &str, id: i64) -> Result<bool, LoaderError> {
        (**self).record_exists(table, pkey, id)
    }
}

pub fn check_identifier(name: &str) -> Result<(), LoaderError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(LoaderError::InvalidResolveRequest(format!(
            "unsafe SQL identifier {name:?}"
        )))
    }
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Utf8Path) -> Result<Self, LoaderError> {
        if let Some(parent) = path.parent() {
            if !parent.as_str().is_empty() {
                fs::create_dir_all(parent.as_std_path())
                    .map_err(|err| LoaderError::Filesystem(err.to_string()))?;
            }
        }
        Self::from_connection(Connection::open(path.as_std_path())?)
    }

    pub fn open_in_memory() -> Result<Self, LoaderError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, LoaderError> {
        conn.execute_batch(
            "
            PRAGMA foreign_keys=ON;
            PRAGMA busy_timeout=30000;
            ",
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside one transaction. Any error or panic in `f` rolls back
    /// everything it wrote.
    pub fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, LoaderError>,
    ) -> Result<T, LoaderError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        let mut guard = TransactionGuard {
            conn: &self.conn,
            finished: false,
        };
        let value = f(self)?;
        self.conn.execute_batch("COMMIT")?;
        guard.finished = true;
        Ok(value)
    }

    pub fn add_organism(
        &self,
        genus: &str,
        species: &str,
        infraspecific_name: Option<&str>,
    ) -> Result<i64, LoaderError> {
        let id = self.conn.query_row(
            "INSERT INTO organism (genus, species, infraspecific_name) VALUES (?1, ?2, ?3)
             RETURNING organism_id",
            params![genus, species, infraspecific_name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn add_project(&self, name: &str) -> Result<i64, LoaderError> {
        let id = self.conn.query_row(
            "INSERT INTO project (name) VALUES (?1) RETURNING project_id",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn add_term(
        &self,
        cv: &str,
        token: &VocabularyToken,
        name: &str,
    ) -> Result<i64, LoaderError> {
        self.conn.execute(
            "INSERT INTO db (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![token.db()],
        )?;
        self.conn.execute(
            "INSERT INTO cv (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
            params![cv],
        )?;
        self.conn.execute(
            "INSERT INTO dbxref (db_id, accession)
             SELECT db_id, ?2 FROM db WHERE name = ?1
             ON CONFLICT (db_id, accession, version) DO NOTHING",
            params![token.db(), token.accession()],
        )?;
        let id = self.conn.query_row(
            "INSERT INTO cvterm (cv_id, name, dbxref_id)
             SELECT cv.cv_id, ?3, dbxref.dbxref_id
             FROM cv, dbxref JOIN db ON db.db_id = dbxref.db_id
             WHERE cv.name = ?4 AND db.name = ?1 AND dbxref.accession = ?2
             RETURNING cvterm_id",
            params![token.db(), token.accession(), name, cv],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn collect_keys(&self, sql: &str, values: &[&dyn ToSql]) -> Result<Vec<i64>, LoaderError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(values, |row| row.get::<_, i64>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }
}

impl ChadoStore for SqliteStore {
    fn select_keys(
        &self,
        table: &str,
        pkey: &str,
        conditions: &Fields,
    ) -> Result<Vec<i64>, LoaderError> {
        check_identifier(table)?;
        check_identifier(pkey)?;
        let mut clauses = Vec::with_capacity(conditions.len());
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(conditions.len());
        for (index, (column, value)) in conditions.iter().enumerate() {
            check_identifier(column)?;
            clauses.push(format!("{column} = ?{}", index + 1));
            values.push(value);
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let sql = format!("SELECT {pkey} FROM {table}{where_clause} ORDER BY {pkey}");
        self.collect_keys(&sql, &values)
    }

    fn insert(
        &self,
        table: &str,
        pkey: &str,
        values: &Fields,
    ) -> Result<Option<i64>, LoaderError> {
        check_identifier(table)?;
        check_identifier(pkey)?;
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(values.len());
        for (index, (column, value)) in values.iter().enumerate() {
            check_identifier(column)?;
            columns.push(column);
            placeholders.push(format!("?{}", index + 1));
            bound.push(value);
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}) RETURNING {pkey}",
            columns.join(", "),
            placeholders.join(", ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let key = stmt
            .query_row(bound.as_slice(), |row| row.get::<_, Option<i64>>(0))
            .optional()?;
        Ok(key.flatten())
    }

    fn term_ids_by_accession(&self, token: &VocabularyToken) -> Result<Vec<i64>, LoaderError> {
        self.collect_keys(
            "SELECT cvterm.cvterm_id FROM cvterm
             JOIN dbxref ON dbxref.dbxref_id = cvterm.dbxref_id
             JOIN db ON db.db_id = dbxref.db_id
             WHERE db.name = ?1 AND dbxref.accession = ?2
             ORDER BY cvterm.cvterm_id",
            &[&token.db(), &token.accession()],
        )
    }

    fn organism_ids_by_name(&self, name: &str) -> Result<Vec<i64>, LoaderError> {
        self.collect_keys(
            "SELECT organism_id FROM organism
             WHERE TRIM(genus || ' ' || species || ' ' || COALESCE(infraspecific_name, '')) = ?1
             ORDER BY organism_id",
            &[&name],
        )
    }

    fn record_exists(&self, table: &str, pkey: &str, id: i64) -> Result<bool, LoaderError> {
        check_identifier(table)?;
        check_identifier(pkey)?;
        let sql = format!("SELECT 1 FROM {table} WHERE {pkey} = ?1");
        let found = self
            .conn
            .query_row(&sql, params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }
}

struct TransactionGuard<'a> {
    conn: &'a Connection,
    finished: bool,
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %err, "rollback failed");
            }
        }
    }
}
