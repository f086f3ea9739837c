use agrikonnect_core_types::RequestId;
use thiserror::Error;

/// Result type alias using the canonical [`ExError`]
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure surfaced by the migration tooling is classified into one of
/// these kinds. Each kind maps to a stable error code that tests, scripts and
/// the CLI can match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Discovery
    /// Migration directory is missing, not a directory, or unreadable
    Discovery,
    /// A `.sql` file does not follow `V<digits>__<description>.sql`
    InvalidFilename,
    /// Two files share a version, or the ledger already holds the version
    DuplicateVersion,

    // Ledger
    /// Ledger table cannot be created or its name is not a plain identifier
    Schema,

    // Apply
    /// A statement inside a migration failed and the transaction rolled back
    MigrationFailed,
    /// An applied migration's file no longer matches its recorded checksum
    ChecksumMismatch,

    // Input
    InvalidInput,
    AlreadyExists,
    Config,

    // Integration/IO
    Io,
    Persistence,
    Concurrency,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::Discovery => "ERR_DISCOVERY",
            ExErrorKind::InvalidFilename => "ERR_INVALID_FILENAME",
            ExErrorKind::DuplicateVersion => "ERR_DUPLICATE_VERSION",
            ExErrorKind::Schema => "ERR_SCHEMA",
            ExErrorKind::MigrationFailed => "ERR_MIGRATION_FAILED",
            ExErrorKind::ChecksumMismatch => "ERR_CHECKSUM_MISMATCH",
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification (`kind`) for programmatic handling plus the
/// context an operator needs to diagnose a failed run: the operation, the
/// migration version and file, the failing statement and the underlying
/// database message.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    version: Option<String>,
    filename: Option<String>,
    statement: Option<usize>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            version: None,
            filename: None,
            statement: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add migration version context
    pub fn with_version(mut self, version: impl ToString) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Add migration filename context
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Add the 1-based ordinal of the failing statement
    pub fn with_statement(mut self, ordinal: usize) -> Self {
        self.statement = Some(ordinal);
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the migration version context, if any
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Get the migration filename context, if any
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Get the failing statement ordinal, if any
    pub fn statement(&self) -> Option<usize> {
        self.statement
    }

    /// Get the request ID context, if any
    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;

        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }

        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }

        if let Some(version) = &self.version {
            write!(f, " (version: {})", version)?;
        }

        if let Some(filename) = &self.filename {
            write!(f, " (file: {})", filename)?;
        }

        if let Some(statement) = self.statement {
            write!(f, " (statement: {})", statement)?;
        }

        if let Some(source) = &self.source {
            write!(f, "; caused by {}", source)?;
        }

        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Validation failures raised by the migration domain model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationModelError {
    /// File name does not follow `V<digits>__<description>.sql`
    #[error("Invalid migration filename '{filename}': {reason}")]
    InvalidFilename { filename: String, reason: String },

    /// Version string (e.g. a `--target` argument) could not be parsed
    #[error("Invalid migration version '{input}'")]
    InvalidVersion { input: String },

    /// Two migration files resolve to the same version
    #[error("Duplicate migration version {version}: '{first}' and '{second}'")]
    DuplicateVersion {
        version: String,
        first: String,
        second: String,
    },

    /// Ledger table name is not a plain SQL identifier
    #[error("Invalid ledger table name '{name}'")]
    InvalidLedgerTable { name: String },

    /// Description produced an empty file name slug
    #[error("Invalid migration description '{description}'")]
    InvalidDescription { description: String },

    /// Migration state machine was asked for a transition it does not allow
    #[error("Illegal migration state transition for version {version}: {from} -> {to}")]
    IllegalTransition {
        version: String,
        from: String,
        to: String,
    },
}

/// Conversion from model errors to the canonical facility
impl From<MigrationModelError> for ExError {
    fn from(err: MigrationModelError) -> Self {
        let message = err.to_string();
        match err {
            MigrationModelError::InvalidFilename { filename, .. } => {
                ExError::new(ExErrorKind::InvalidFilename)
                    .with_op("parse_filename")
                    .with_filename(filename)
                    .with_message(message)
            }
            MigrationModelError::InvalidVersion { .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("parse_version")
                    .with_message(message)
            }
            MigrationModelError::DuplicateVersion {
                version, second, ..
            } => ExError::new(ExErrorKind::DuplicateVersion)
                .with_op("discover_migrations")
                .with_version(version)
                .with_filename(second)
                .with_message(message),
            MigrationModelError::InvalidLedgerTable { .. } => ExError::new(ExErrorKind::Schema)
                .with_op("ledger_table")
                .with_message(message),
            MigrationModelError::InvalidDescription { .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_op("new_migration")
                    .with_message(message)
            }
            MigrationModelError::IllegalTransition { version, .. } => {
                ExError::new(ExErrorKind::Internal)
                    .with_op("migration_state")
                    .with_version(version)
                    .with_message(message)
            }
        }
    }
}
