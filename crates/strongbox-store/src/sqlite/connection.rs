//! [`Database`] implementation for a SQLite connection
//!
//! `PRAGMA foreign_keys` is per connection, so a restore must run every
//! statement on the same [`Connection`]; the pool hands one out for the
//! duration of an operation.

use rusqlite::{Connection, params, params_from_iter, types::Value as SqlValue};

use strongbox_core::Row;

use super::value::{self, SqlCell};
use super::sanitize_error;
use crate::database::{Database, DbError, DbOperation, DbResult, quote_identifier};

const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
     ORDER BY name";

// Generated columns (hidden 2 and 3) and virtual table hidden columns are skipped
const WRITABLE_COLUMNS_SQL: &str =
    "SELECT name FROM pragma_table_xinfo(?1) WHERE hidden = 0 ORDER BY cid";

const CASCADING_REFERENCES_SQL: &str = "SELECT 1 FROM pragma_foreign_key_list(?1) \
     WHERE \"table\" = ?2 COLLATE NOCASE \
     AND on_delete IN ('CASCADE', 'SET NULL', 'SET DEFAULT') \
     LIMIT 1";

fn db_err(operation: DbOperation) -> impl Fn(rusqlite::Error) -> DbError {
    move |e| DbError::new(operation, sanitize_error(&e))
}

impl Database for Connection {
    fn list_tables(&self) -> DbResult<Vec<String>> {
        let map_err = db_err(DbOperation::ListTables);
        let mut stmt = self.prepare(LIST_TABLES_SQL).map_err(&map_err)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(&map_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(&map_err)?;
        Ok(names)
    }

    fn fetch_rows(&self, table: &str) -> DbResult<Vec<Row>> {
        let map_err = db_err(DbOperation::Select);
        let writable = writable_columns(self, table).map_err(&map_err)?;
        // No columns means no such table; let the SELECT report it
        let column_list = if writable.is_empty() {
            "*".to_string()
        } else {
            writable
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let sql = format!("SELECT {} FROM {}", column_list, quote_identifier(table));
        let mut stmt = self.prepare(&sql).map_err(&map_err)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([]).map_err(&map_err)?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().map_err(&map_err)? {
            let mut record = Row::new();
            for (index, column) in columns.iter().enumerate() {
                let cell = row.get_ref(index).map_err(&map_err)?;
                record.insert(column.clone(), value::to_json(cell));
            }
            records.push(record);
        }
        Ok(records)
    }

    fn count_rows(&self, table: &str) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = self
            .query_row(&sql, [], |row| row.get(0))
            .map_err(db_err(DbOperation::Count))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn truncate(&self, table: &str) -> DbResult<()> {
        let sql = format!("DELETE FROM {}", quote_identifier(table));
        self.execute(&sql, []).map_err(db_err(DbOperation::Truncate))?;
        Ok(())
    }

    fn insert_row(&self, table: &str, columns: &[String], row: &Row) -> DbResult<()> {
        let map_err = db_err(DbOperation::Insert);

        if columns.is_empty() {
            let sql = format!("INSERT INTO {} DEFAULT VALUES", quote_identifier(table));
            self.execute(&sql, []).map_err(&map_err)?;
            return Ok(());
        }

        let column_list = columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            column_list,
            placeholders
        );

        let values = columns.iter().map(|column| {
            row.get(column)
                .map(value::to_sql)
                .unwrap_or(SqlCell::Value(SqlValue::Null))
        });

        let mut stmt = self.prepare_cached(&sql).map_err(&map_err)?;
        stmt.execute(params_from_iter(values)).map_err(&map_err)?;
        Ok(())
    }

    fn foreign_key_checks(&self) -> DbResult<bool> {
        let enabled: i64 = self
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .map_err(db_err(DbOperation::ForeignKeys))?;
        Ok(enabled == 1)
    }

    fn set_foreign_key_checks(&self, enabled: bool) -> DbResult<()> {
        let pragma = if enabled {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        };
        self.execute_batch(pragma).map_err(db_err(DbOperation::ForeignKeys))
    }

    fn cascading_dependents(&self, table: &str) -> DbResult<Vec<String>> {
        let map_err = db_err(DbOperation::Schema);
        let mut stmt = self.prepare_cached(CASCADING_REFERENCES_SQL).map_err(&map_err)?;

        let mut dependents = Vec::new();
        for candidate in self.list_tables()? {
            if candidate.eq_ignore_ascii_case(table) {
                continue;
            }
            if stmt.exists(params![candidate, table]).map_err(&map_err)? {
                dependents.push(candidate);
            }
        }
        Ok(dependents)
    }

    fn begin_read(&self) -> DbResult<()> {
        self.execute_batch("BEGIN DEFERRED;").map_err(db_err(DbOperation::Transaction))
    }

    fn end_read(&self) -> DbResult<()> {
        self.execute_batch("COMMIT;").map_err(db_err(DbOperation::Transaction))
    }
}

fn writable_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare_cached(WRITABLE_COLUMNS_SQL)?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn memory_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL, weight REAL, data BLOB);
             CREATE TABLE \"odd \"\"name\" (v TEXT);
             INSERT INTO widgets VALUES (1, 'A', 1.5, x'0102');
             INSERT INTO widgets VALUES (2, 'B', NULL, NULL);",
        )
        .unwrap();
        conn
    }

    fn row(value: serde_json::Value) -> Row {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_list_tables_sorted_and_excludes_internal() {
        let conn = memory_db();
        conn.execute_batch("CREATE TABLE auto (id INTEGER PRIMARY KEY AUTOINCREMENT);")
            .unwrap();
        let tables = conn.list_tables().unwrap();
        assert_eq!(tables, vec!["auto", "odd \"name", "widgets"]);
    }

    #[test]
    fn test_fetch_rows_preserves_columns_and_values() {
        let conn = memory_db();
        let rows = conn.fetch_rows("widgets").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].keys().collect::<Vec<_>>(),
            vec!["id", "name", "weight", "data"]
        );
        assert_eq!(rows[0]["weight"], json!(1.5));
        assert_eq!(rows[0]["data"], json!({"__blob": "AQI="}));
        assert_eq!(rows[1]["weight"], json!(null));
    }

    #[test]
    fn test_fetch_missing_table_errors() {
        let conn = memory_db();
        let error = conn.fetch_rows("nope").unwrap_err();
        assert_eq!(error.operation, DbOperation::Select);
        assert!(error.details.contains("no such table"));
    }

    #[test]
    fn test_truncate_count_insert() {
        let conn = memory_db();
        assert_eq!(conn.count_rows("widgets").unwrap(), 2);

        conn.truncate("widgets").unwrap();
        assert_eq!(conn.count_rows("widgets").unwrap(), 0);

        let columns = vec!["id".to_string(), "name".to_string(), "data".to_string()];
        conn.insert_row(
            "widgets",
            &columns,
            &row(json!({"id": 9, "name": "Z", "data": {"__blob": "AQI="}})),
        )
        .unwrap();

        let rows = conn.fetch_rows("widgets").unwrap();
        assert_eq!(rows[0]["id"], json!(9));
        assert_eq!(rows[0]["data"], json!({"__blob": "AQI="}));
    }

    #[test]
    fn test_insert_constraint_violation_is_reported() {
        let conn = memory_db();
        let columns = vec!["id".to_string(), "name".to_string()];
        let error = conn
            .insert_row("widgets", &columns, &row(json!({"id": 3, "name": null})))
            .unwrap_err();
        assert_eq!(error.operation, DbOperation::Insert);
        assert!(error.details.contains("NOT NULL"));
    }

    #[test]
    fn test_quoted_table_names_work() {
        let conn = memory_db();
        let columns = vec!["v".to_string()];
        conn.insert_row("odd \"name", &columns, &row(json!({"v": "ok"}))).unwrap();
        assert_eq!(conn.count_rows("odd \"name").unwrap(), 1);
    }

    #[test]
    fn test_foreign_key_toggle() {
        let conn = memory_db();
        conn.set_foreign_key_checks(true).unwrap();
        assert!(conn.foreign_key_checks().unwrap());
        conn.set_foreign_key_checks(false).unwrap();
        assert!(!conn.foreign_key_checks().unwrap());
    }

    #[test]
    fn test_generated_columns_are_not_dumped() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE g (
                 a INTEGER,
                 b INTEGER GENERATED ALWAYS AS (a * 2) VIRTUAL,
                 c INTEGER GENERATED ALWAYS AS (a + 1) STORED,
                 d TEXT
             );
             INSERT INTO g (a, d) VALUES (1, 'x'), (2, 'y');",
        )
        .unwrap();

        let rows = conn.fetch_rows("g").unwrap();
        assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["a", "d"]);

        conn.truncate("g").unwrap();
        let columns: Vec<String> = rows[0].keys().cloned().collect();
        for row in &rows {
            conn.insert_row("g", &columns, row).unwrap();
        }
        let computed: Vec<(i64, i64)> = conn
            .prepare("SELECT b, c FROM g ORDER BY a")
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(computed, vec![(2, 2), (4, 3)]);
    }

    #[test]
    fn test_non_utf8_text_survives_dump_and_insert() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (v TEXT);
             INSERT INTO t VALUES (CAST(x'ff41' AS TEXT));",
        )
        .unwrap();

        let rows = conn.fetch_rows("t").unwrap();
        assert_eq!(rows[0]["v"], json!({"__text_bytes": "/0E="}));

        conn.truncate("t").unwrap();
        conn.insert_row("t", &["v".to_string()], &rows[0]).unwrap();

        let (hex, kind): (String, String) = conn
            .query_row("SELECT hex(v), typeof(v) FROM t", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();
        assert_eq!(hex, "FF41");
        assert_eq!(kind, "text");
    }

    #[test]
    fn test_cascading_dependents() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE parents (id INTEGER PRIMARY KEY);
             CREATE TABLE cascades (id INTEGER, p INTEGER REFERENCES parents(id) ON DELETE CASCADE);
             CREATE TABLE nulls (id INTEGER, p INTEGER REFERENCES Parents(id) ON DELETE SET NULL);
             CREATE TABLE plain (id INTEGER, p INTEGER REFERENCES parents(id));
             CREATE TABLE tree (id INTEGER PRIMARY KEY, up INTEGER REFERENCES tree(id) ON DELETE CASCADE);",
        )
        .unwrap();

        assert_eq!(
            conn.cascading_dependents("parents").unwrap(),
            vec!["cascades", "nulls"]
        );
        assert!(conn.cascading_dependents("tree").unwrap().is_empty());
        assert!(conn.cascading_dependents("plain").unwrap().is_empty());
    }

    #[test]
    fn test_read_transaction_brackets() {
        let conn = memory_db();
        conn.begin_read().unwrap();
        assert!(!conn.is_autocommit());
        assert_eq!(conn.fetch_rows("widgets").unwrap().len(), 2);
        conn.end_read().unwrap();
        assert!(conn.is_autocommit());

        let error = conn.end_read().unwrap_err();
        assert_eq!(error.operation, DbOperation::Transaction);
    }
}
