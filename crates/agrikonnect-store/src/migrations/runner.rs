//! Migration runner
//!
//! Applies pending migrations in ascending version order, each inside its own
//! `BEGIN IMMEDIATE` transaction, and stops at the first failure.

use crate::errors::{checksum_mismatch, from_rusqlite, migration_failed, statement_error, Result};
use crate::migrations::discovery::list_migrations;
use crate::migrations::ledger::Ledger;
use crate::migrations::listener::{MigrationListener, NoopListener};
use agrikonnect_core::config::{ChecksumPolicy, MigrateConfig};
use agrikonnect_core::core_types::schema::{OP_APPLY_MIGRATION, OP_MIGRATE, OP_STATUS, OP_VERIFY};
use agrikonnect_core::core_types::RequestContext;
use agrikonnect_core::errors::{ExError, ExErrorKind};
use agrikonnect_core::model::{
    AppliedMigration, LedgerEntry, MigrateReport, MigrationFile, MigrationState, StatusReport,
    StatusRow, Version,
};
use agrikonnect_core::{log_op_end, log_op_error, log_op_start};
use rusqlite::{Batch, Connection, TransactionBehavior};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Knobs for a single `migrate` run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrateOptions {
    /// Compute the pending list without writing anything
    pub dry_run: bool,
    /// Highest version to apply; later pending versions are held back
    pub target: Option<Version>,
}

/// Applies migrations from one directory to one database
#[derive(Debug, Clone)]
pub struct Migrator {
    directory: PathBuf,
    ledger: Ledger,
    checksum_policy: ChecksumPolicy,
    context: RequestContext,
}

/// Result of applying one file
enum ApplyOutcome {
    Applied(AppliedMigration),
    /// Another runner recorded the version first
    AlreadyApplied,
}

impl Migrator {
    /// Runner over `directory` with the default ledger table and a fresh
    /// request context
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ledger: Ledger::default(),
            checksum_policy: ChecksumPolicy::default(),
            context: RequestContext::new(),
        }
    }

    /// Runner configured from the `migrations` section
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Schema`: the configured ledger table name is invalid
    pub fn from_config(config: &MigrateConfig) -> Result<Self> {
        let ledger = Ledger::new(config.migrations.ledger_table.clone())?;
        Ok(Self::new(config.migrations.directory.clone())
            .with_ledger(ledger)
            .with_checksum_policy(config.migrations.checksum_policy))
    }

    pub fn with_ledger(mut self, ledger: Ledger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn with_checksum_policy(mut self, policy: ChecksumPolicy) -> Self {
        self.checksum_policy = policy;
        self
    }

    /// Attach the caller's request context; its id tags every log event and
    /// error of the run
    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Apply every pending migration
    pub fn migrate(&self, conn: &mut Connection) -> Result<MigrateReport> {
        self.migrate_with(conn, &MigrateOptions::default(), &mut NoopListener)
    }

    /// Apply pending migrations according to `options`, reporting progress to
    /// `listener`.
    ///
    /// Migrations committed before a failure stay applied; the failure is
    /// returned and no later migration is attempted.
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Schema`: ledger table cannot be created
    /// - `ExErrorKind::Discovery` / `InvalidFilename` / `DuplicateVersion`: the
    ///   directory cannot be turned into a migration list; nothing is applied
    /// - `ExErrorKind::ChecksumMismatch`: drift under [`ChecksumPolicy::Fail`]
    /// - `ExErrorKind::MigrationFailed`: a migration rolled back
    pub fn migrate_with(
        &self,
        conn: &mut Connection,
        options: &MigrateOptions,
        listener: &mut dyn MigrationListener,
    ) -> Result<MigrateReport> {
        let start = Instant::now();
        log_op_start!(
            OP_MIGRATE,
            request_id = %self.context.request_id,
            actor = self.context.actor.as_deref(),
            directory = %self.directory.display(),
            dry_run = options.dry_run
        );

        match self.run(conn, options, listener) {
            Ok(report) => {
                log_op_end!(
                    OP_MIGRATE,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %self.context.request_id,
                    applied = report.applied_count(),
                    skipped = report.skipped_count(),
                    pending = report.pending.len()
                );
                Ok(report)
            }
            Err(err) => {
                let err = self.tag(err);
                log_op_error!(
                    OP_MIGRATE,
                    err,
                    duration_ms = start.elapsed().as_millis() as u64,
                    request_id = %self.context.request_id
                );
                Err(err)
            }
        }
    }

    fn run(
        &self,
        conn: &mut Connection,
        options: &MigrateOptions,
        listener: &mut dyn MigrationListener,
    ) -> Result<MigrateReport> {
        if !options.dry_run {
            self.ledger.ensure_schema(conn)?;
        }
        let files = list_migrations(&self.directory)?;
        let applied = self.ledger.list_applied(conn)?;

        self.check_drift(&files, &applied)?;

        let mut report = MigrateReport {
            dry_run: options.dry_run,
            ..MigrateReport::default()
        };

        for file in &files {
            if applied.contains_key(&file.version) {
                tracing::info!(
                    request_id = %self.context.request_id,
                    version = file.version.get(),
                    "Migration {} already executed.",
                    file.version
                );
                listener.on_skipped(file);
                report.skipped.push(file.version);
                continue;
            }

            if options.target.is_some_and(|target| file.version > target) {
                report.held_back.push(file.version);
                continue;
            }

            if options.dry_run {
                report.pending.push(file.version);
                continue;
            }

            let state = MigrationState::Pending.transition(file.version, MigrationState::Applying)?;
            listener.on_applying(file);

            match self.apply_one(conn, file) {
                Ok(ApplyOutcome::Applied(done)) => {
                    state.transition(file.version, MigrationState::Applied)?;
                    listener.on_applied(file, &done);
                    report.applied.push(done);
                }
                Ok(ApplyOutcome::AlreadyApplied) => {
                    tracing::info!(
                        request_id = %self.context.request_id,
                        version = file.version.get(),
                        "Migration {} already executed.",
                        file.version
                    );
                    listener.on_skipped(file);
                    report.skipped.push(file.version);
                }
                Err(err) => {
                    let err = self.tag(err);
                    state.transition(file.version, MigrationState::Failed)?;
                    listener.on_failed(file, &err);
                    return Err(err);
                }
            }
        }

        Ok(report)
    }

    /// Run one file and its ledger insert in a single transaction
    fn apply_one(&self, conn: &mut Connection, file: &MigrationFile) -> Result<ApplyOutcome> {
        let start = Instant::now();
        log_op_start!(
            OP_APPLY_MIGRATION,
            request_id = %self.context.request_id,
            version = file.version.get(),
            filename = %file.filename
        );

        let result = self.apply_in_transaction(conn, file);
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Some(statements)) => {
                log_op_end!(
                    OP_APPLY_MIGRATION,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id,
                    version = file.version.get(),
                    statements = statements
                );
                Ok(ApplyOutcome::Applied(AppliedMigration {
                    version: file.version,
                    filename: file.filename.clone(),
                    statements,
                    duration_ms,
                }))
            }
            Ok(None) => {
                log_op_end!(
                    OP_APPLY_MIGRATION,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id,
                    version = file.version.get(),
                    skipped = true
                );
                Ok(ApplyOutcome::AlreadyApplied)
            }
            Err(cause) => {
                let err = self.tag(migration_failed(file, cause));
                log_op_error!(
                    OP_APPLY_MIGRATION,
                    err,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id,
                    version = file.version.get()
                );
                Err(err)
            }
        }
    }

    /// Returns the number of statements executed, or `None` when the version
    /// was recorded by someone else after the ledger was read. Dropping the
    /// transaction without committing rolls it back.
    fn apply_in_transaction(&self, conn: &mut Connection, file: &MigrationFile) -> Result<Option<usize>> {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;

        if self.ledger.contains(&tx, file.version)? {
            return Ok(None);
        }

        let statements = execute_statements(&tx, &file.sql)?;
        self.ledger.record(&tx, file)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(Some(statements))
    }

    /// Pair every discovered file with its ledger state. Never writes.
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::Discovery` / `InvalidFilename` / `DuplicateVersion`
    /// - `ExErrorKind::Persistence`: the ledger cannot be read
    pub fn status(&self, conn: &Connection) -> Result<StatusReport> {
        let start = Instant::now();
        log_op_start!(OP_STATUS, request_id = %self.context.request_id);

        let result = self.build_status(conn).map_err(|e| self.tag(e));
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => {
                log_op_end!(
                    OP_STATUS,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id,
                    applied = report.applied_count(),
                    pending = report.pending().count()
                );
            }
            Err(err) => {
                log_op_error!(
                    OP_STATUS,
                    err,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id
                );
            }
        }
        result
    }

    fn build_status(&self, conn: &Connection) -> Result<StatusReport> {
        let files = list_migrations(&self.directory)?;
        let applied = self.ledger.list_applied(conn)?;

        let rows = files
            .iter()
            .map(|file| match applied.get(&file.version) {
                Some(entry) => StatusRow {
                    version: file.version,
                    filename: file.filename.clone(),
                    description: file.description.clone(),
                    state: MigrationState::Applied,
                    executed_at: Some(entry.executed_at),
                    modified: entry.checksum != file.checksum,
                },
                None => StatusRow {
                    version: file.version,
                    filename: file.filename.clone(),
                    description: file.description.clone(),
                    state: MigrationState::Pending,
                    executed_at: None,
                    modified: false,
                },
            })
            .collect();

        let on_disk: BTreeSet<Version> = files.iter().map(|f| f.version).collect();
        let orphaned = applied
            .into_values()
            .filter(|entry| !on_disk.contains(&entry.version))
            .collect();

        Ok(StatusReport { rows, orphaned })
    }

    /// Check every applied file against its recorded checksum.
    ///
    /// Returns the number of applied migrations verified.
    ///
    /// ## Errors
    ///
    /// - `ExErrorKind::ChecksumMismatch`: the first drifted migration
    pub fn verify(&self, conn: &Connection) -> Result<usize> {
        let start = Instant::now();
        log_op_start!(OP_VERIFY, request_id = %self.context.request_id);

        let result = self.check_checksums(conn).map_err(|e| self.tag(e));

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(verified) => {
                log_op_end!(
                    OP_VERIFY,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id,
                    applied = *verified
                );
            }
            Err(err) => {
                log_op_error!(
                    OP_VERIFY,
                    err,
                    duration_ms = duration_ms,
                    request_id = %self.context.request_id
                );
            }
        }
        result
    }

    fn check_checksums(&self, conn: &Connection) -> Result<usize> {
        let files = list_migrations(&self.directory)?;
        let applied = self.ledger.list_applied(conn)?;
        if let Some((file, entry)) = drifted(&files, &applied).next() {
            return Err(checksum_mismatch(file, &entry.checksum));
        }
        Ok(files
            .iter()
            .filter(|f| applied.contains_key(&f.version))
            .count())
    }

    fn check_drift(
        &self,
        files: &[MigrationFile],
        applied: &BTreeMap<Version, LedgerEntry>,
    ) -> Result<()> {
        for (file, entry) in drifted(files, applied) {
            match self.checksum_policy {
                ChecksumPolicy::Fail => return Err(checksum_mismatch(file, &entry.checksum)),
                ChecksumPolicy::Warn => tracing::warn!(
                    request_id = %self.context.request_id,
                    version = file.version.get(),
                    filename = %file.filename,
                    recorded = %entry.checksum,
                    current = %file.checksum,
                    "Applied migration has been modified since it was executed"
                ),
            }
        }
        Ok(())
    }

    fn tag(&self, err: ExError) -> ExError {
        if err.request_id().is_some() {
            err
        } else {
            err.with_request_id(self.context.request_id.clone())
        }
    }
}

/// Applied files whose content no longer matches the ledger
fn drifted<'a>(
    files: &'a [MigrationFile],
    applied: &'a BTreeMap<Version, LedgerEntry>,
) -> impl Iterator<Item = (&'a MigrationFile, &'a LedgerEntry)> + 'a {
    files.iter().filter_map(move |file| {
        applied
            .get(&file.version)
            .filter(|entry| entry.checksum != file.checksum)
            .map(|entry| (file, entry))
    })
}

/// Execute every statement of `sql` in order using SQLite's own parser, so
/// semicolons inside literals, comments and trigger bodies stay intact.
///
/// Returns the number of statements executed. Errors carry the 1-based
/// ordinal of the failing statement.
fn execute_statements(conn: &Connection, sql: &str) -> Result<usize> {
    let mut batch = Batch::new(conn, sql);
    let mut executed = 0;

    loop {
        let ordinal = executed + 1;
        let mut stmt = match batch.next() {
            Ok(Some(stmt)) => stmt,
            Ok(None) => break,
            Err(e) => return Err(statement_error(ordinal, e)),
        };

        if let Some(text) = stmt.expanded_sql() {
            if is_transaction_control(&text) {
                return Err(ExError::new(ExErrorKind::Persistence)
                    .with_op("execute_statement")
                    .with_statement(ordinal)
                    .with_message("Migration bodies must not manage transactions"));
            }
        }

        let mut rows = stmt.raw_query();
        while rows.next().map_err(|e| statement_error(ordinal, e))?.is_some() {}

        executed = ordinal;
    }

    if conn.is_autocommit() {
        return Err(ExError::new(ExErrorKind::Persistence)
            .with_op("execute_statement")
            .with_message("Migration body ended the enclosing transaction"));
    }

    Ok(executed)
}

/// Whether a statement opens or closes a transaction or savepoint
fn is_transaction_control(sql: &str) -> bool {
    let keyword: String = skip_comments(sql)
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    matches!(
        keyword.as_str(),
        "BEGIN" | "COMMIT" | "END" | "ROLLBACK" | "SAVEPOINT" | "RELEASE"
    )
}

fn skip_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return sql;
        }
    }
}

/// Apply every pending migration in `directory` with default settings
pub fn apply_migrations(conn: &mut Connection, directory: impl AsRef<Path>) -> Result<MigrateReport> {
    Migrator::new(directory.as_ref()).migrate(conn)
}
