//! Backup on one database, restore into another.

use std::collections::BTreeSet;

use strongbox::core::{BackupError, SecretString};
use strongbox::store::{
    BackupEngine, Database, EngineConfigBuilder, LocalBackupStore, SqliteDatabase, TableOutcome,
};

const SCHEMA: &str = "
    CREATE TABLE customers (id INTEGER PRIMARY KEY, email TEXT NOT NULL UNIQUE);
    CREATE TABLE orders (
        id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        total REAL
    );";

fn open(path: &std::path::Path, secret: &str, backups: &std::path::Path) -> BackupEngine {
    let config = EngineConfigBuilder::new()
        .database_path(path)
        .backup_secret(SecretString::new(secret.to_string()))
        .backup_dir(backups)
        .pool_size(2)
        .build()
        .unwrap();
    BackupEngine::open(&config).unwrap()
}

#[test]
fn test_disaster_recovery_into_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    let backups = dir.path().join("backups");

    let source = SqliteDatabase::open(dir.path().join("source.db"), 1).unwrap();
    source
        .acquire()
        .unwrap()
        .execute_batch(&format!(
            "{SCHEMA}
             INSERT INTO customers VALUES (1, 'a@example.com'), (2, 'b@example.com');
             INSERT INTO orders VALUES (10, 2, 99.5), (11, 1, 0.25);"
        ))
        .unwrap();
    let source_engine = BackupEngine::new(
        source.clone(),
        &SecretString::new("shared-secret".to_string()),
        LocalBackupStore::new(&backups),
    );
    let artifact = source_engine.create_backup().unwrap();

    // A replacement host: same schema and secret, no data
    let target_path = dir.path().join("target.db");
    SqliteDatabase::open(&target_path, 1)
        .unwrap()
        .acquire()
        .unwrap()
        .execute_batch(SCHEMA)
        .unwrap();
    let target_engine = open(&target_path, "shared-secret", &backups);

    let stored = target_engine.list_backups().unwrap();
    assert_eq!(stored.len(), 1);
    let bytes = target_engine.read_backup(&stored[0].name).unwrap();
    assert_eq!(bytes, artifact.bytes);

    let report = target_engine.restore_full(&bytes).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.rows_inserted(), 4);
    assert_eq!(report.tables["orders"].outcome, TableOutcome::Restored);

    let target = SqliteDatabase::open(&target_path, 1).unwrap();
    let conn = target.acquire().unwrap();
    assert_eq!(
        conn.fetch_rows("orders").unwrap(),
        source.acquire().unwrap().fetch_rows("orders").unwrap()
    );
    assert!(conn.foreign_key_checks().unwrap());
}

#[test]
fn test_other_secret_cannot_restore() {
    let dir = tempfile::tempdir().unwrap();
    let backups = dir.path().join("backups");
    let db_path = dir.path().join("app.db");

    let owner = open(&db_path, "first-secret", &backups);
    SqliteDatabase::open(&db_path, 1)
        .unwrap()
        .acquire()
        .unwrap()
        .execute_batch(&format!("{SCHEMA} INSERT INTO customers VALUES (1, 'x@example.com');"))
        .unwrap();
    let artifact = owner.create_backup().unwrap();

    let stranger = open(&db_path, "second-secret", &backups);
    let selection = BTreeSet::from(["customers".to_string()]);

    assert!(matches!(
        stranger.preview(&artifact.bytes),
        Err(BackupError::AuthenticationFailed)
    ));
    assert!(matches!(
        stranger.restore_selective(&artifact.bytes, &selection),
        Err(BackupError::AuthenticationFailed)
    ));
}
