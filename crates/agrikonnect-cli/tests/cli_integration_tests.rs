//! CLI integration tests
//!
//! Run the built `agrikonnect` binary against scratch databases and migration
//! directories.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn setup_workspace(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
    let db_path = temp_dir.path().join("storage").join("shop.db");
    let dir = temp_dir.path().join("migrations");
    fs::create_dir_all(&dir).unwrap();

    fs::write(
        dir.join("V1__create_products.sql"),
        "CREATE TABLE products (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
    )
    .unwrap();
    fs::write(
        dir.join("V2__seed_products.sql"),
        "INSERT INTO products (name) VALUES ('maize; white');",
    )
    .unwrap();

    (db_path, dir)
}

fn run(temp_dir: &TempDir, db: &Path, dir: &Path, args: &[&str]) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_agrikonnect");
    Command::new(cli_bin)
        .current_dir(temp_dir.path())
        .env("RUST_LOG", "off")
        .args(args)
        .args(["--db", db.to_str().unwrap(), "--dir", dir.to_str().unwrap()])
        .output()
        .expect("Failed to execute CLI")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_cli_migrate_then_rerun() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);

    let output = run(&temp_dir, &db_path, &dir, &["migrate"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Migrated:  V1__create_products.sql"));
    assert!(out.contains("Migrated:  V2__seed_products.sql"));
    assert!(out.contains("Applied 2 migration(s)."));

    let conn = Connection::open(&db_path).unwrap();
    let name: String = conn
        .query_row("SELECT name FROM products", [], |row| row.get(0))
        .unwrap();
    assert_eq!(name, "maize; white");
    drop(conn);

    let output = run(&temp_dir, &db_path, &dir, &["migrate"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Migration 1 already executed."));
    assert!(out.contains("Migration 2 already executed."));
    assert!(out.contains("Nothing to migrate."));
}

#[test]
fn test_cli_failed_migration_exits_non_zero() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);
    fs::write(dir.join("V3__broken.sql"), "INSERT INTO nowhere VALUES (1);").unwrap();

    let output = run(&temp_dir, &db_path, &dir, &["migrate"]);
    assert_eq!(output.status.code(), Some(1));

    let err = stderr(&output);
    assert!(err.contains("Error: [ERR_MIGRATION_FAILED]"), "Stderr: {}", err);
    assert!(err.contains("(version: 3)"));
    assert!(stdout(&output).contains("Failed:    V3__broken.sql"));

    let conn = Connection::open(&db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_cli_dry_run_and_status_do_not_create_database() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);

    let output = run(&temp_dir, &db_path, &dir, &["migrate", "--dry-run"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Pending:   migration 1"));
    assert!(out.contains("2 migration(s) pending."));

    let output = run(&temp_dir, &db_path, &dir, &["status"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("V2__seed_products.sql"));

    assert!(!db_path.exists());
}

#[test]
fn test_cli_target_and_status_json() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);

    let output = run(&temp_dir, &db_path, &dir, &["migrate", "--target", "V1"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Held back: migration 2 (target 1)"));

    let output = run(&temp_dir, &db_path, &dir, &["status", "--json"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let rows = json["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["version"], 1);
    assert_eq!(rows[0]["state"], "applied");
    assert!(rows[0]["executed_at"].is_string());
    assert_eq!(rows[1]["state"], "pending");
    assert!(rows[1]["executed_at"].is_null());
    assert_eq!(json["orphaned"].as_array().unwrap().len(), 0);
}

#[test]
fn test_cli_verify_detects_drift() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);

    assert!(run(&temp_dir, &db_path, &dir, &["migrate"]).status.success());

    let output = run(&temp_dir, &db_path, &dir, &["verify"]);
    assert!(output.status.success(), "Stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Verified 2 applied migration(s)."));

    fs::write(
        dir.join("V2__seed_products.sql"),
        "INSERT INTO products (name) VALUES ('sorghum');",
    )
    .unwrap();

    let output = run(&temp_dir, &db_path, &dir, &["verify"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("[ERR_CHECKSUM_MISMATCH]"));

    let output = run(&temp_dir, &db_path, &dir, &["status"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("yes*"));
}

#[test]
fn test_cli_invalid_filename_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);
    fs::write(dir.join("add_orders.sql"), "CREATE TABLE orders (id INTEGER);").unwrap();

    let output = run(&temp_dir, &db_path, &dir, &["migrate"]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("[ERR_INVALID_FILENAME]"), "Stderr: {}", err);
    assert!(err.contains("add_orders.sql"));
}

#[test]
fn test_cli_new_scaffolds_next_version() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);

    let output = run(
        &temp_dir,
        &db_path,
        &dir,
        &["new", "add", "farmer", "orders"],
    );
    assert!(output.status.success(), "Stderr: {}", stderr(&output));

    let created = dir.join("V3__add_farmer_orders.sql");
    assert!(created.exists());
    assert!(stdout(&output).contains("V3__add_farmer_orders.sql"));
}

#[test]
fn test_cli_config_file_and_env() {
    let temp_dir = TempDir::new().unwrap();
    let (db_path, dir) = setup_workspace(&temp_dir);
    fs::write(
        temp_dir.path().join("agrikonnect.toml"),
        format!(
            "[database]\npath = {:?}\n\n[migrations]\ndirectory = {:?}\n",
            db_path.to_str().unwrap(),
            dir.to_str().unwrap()
        ),
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_agrikonnect"))
        .current_dir(temp_dir.path())
        .env("RUST_LOG", "off")
        .env("AGRIKONNECT__MIGRATIONS__LEDGER_TABLE", "schema_history")
        .arg("migrate")
        .output()
        .expect("Failed to execute CLI");
    assert!(output.status.success(), "Stderr: {}", stderr(&output));

    let conn = Connection::open(&db_path).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_history", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}
