use mvx_core_types::Role;
use thiserror::Error;

/// Result type alias using MvxError
pub type Result<T> = std::result::Result<T, MvxError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised by the model kernel. Each kind maps to a stable error code that can be
/// used for programmatic error handling, testing, and host-application dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    /// Tag capacity, tag kind or data kind mismatch
    ConstraintViolation,
    /// Missing tag index, identifier, path or command target
    NotFound,
    /// Explicit identifier collision in the identifier pool
    DuplicateKey,
    /// Operation not permitted in the current state
    InvalidOperation,

    // Integration
    Serialization,
    Config,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::DuplicateKey => "ERR_DUPLICATE_KEY",
            ExErrorKind::InvalidOperation => "ERR_INVALID_OPERATION",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Config => "ERR_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    item_id: Option<String>,
    tag: Option<String>,
    row: Option<usize>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            item_id: None,
            tag: None,
            row: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add item context (identifier or handle)
    pub fn with_item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    /// Add tag context
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Add row context
    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
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

    /// Get the item context, if any
    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref()
    }

    /// Get the tag context, if any
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Get the row context, if any
    pub fn row(&self) -> Option<usize> {
        self.row
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
        if let Some(item_id) = &self.item_id {
            write!(f, " (item: {})", item_id)?;
        }
        if let Some(tag) = &self.tag {
            write!(f, " (tag: {})", tag)?;
        }
        if let Some(row) = self.row {
            write!(f, " (row: {})", row)?;
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

/// Error taxonomy for model, command and projection operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MvxError {
    // ===== Constraint Violations =====
    /// Tag was never declared on the item
    #[error("Tag not registered: '{tag}'")]
    TagNotRegistered { tag: String },

    /// Tag declared twice on the same item
    #[error("Tag already registered: '{tag}'")]
    DuplicateTag { tag: String },

    /// Bounded tag already holds its maximum number of children
    #[error("Tag '{tag}' is full (max {max})")]
    TagFull { tag: String, max: usize },

    /// Tag restricts the model types it accepts
    #[error("Tag '{tag}' does not accept items of type '{model_type}'")]
    TypeNotAllowed { tag: String, model_type: String },

    /// Insert position past the end of the tag
    #[error("Row {row} is out of range for tag '{tag}' holding {len} items")]
    RowOutOfRange { tag: String, row: usize, len: usize },

    /// Tag still holds children and cannot be withdrawn
    #[error("Tag '{tag}' still holds {len} items")]
    TagNotEmpty { tag: String, len: usize },

    /// Taking would leave a bounded tag below its minimum
    #[error("Tag '{tag}' cannot hold fewer than {min} items")]
    BelowMinimum { tag: String, min: usize },

    /// Role already holds a value of a different kind
    #[error("Role {role} holds {expected} data, got {actual}")]
    DataKindMismatch {
        role: Role,
        expected: String,
        actual: String,
    },

    /// Item cannot be moved to the requested place
    #[error("Illegal move: {reason}")]
    IllegalMove { reason: String },

    // ===== Not Found =====
    /// Handle does not resolve to a live item
    #[error("Item not found: {item}")]
    ItemNotFound { item: String },

    /// No child at the given tag index
    #[error("No item at {tag}[{row}]")]
    SlotEmpty { tag: String, row: usize },

    /// Stored path no longer resolves against the tree
    #[error("Path does not resolve: {path}")]
    PathNotResolved { path: String },

    /// Identifier is not registered in the pool
    #[error("Identifier not registered: {identifier}")]
    IdentifierNotFound { identifier: String },

    /// Model type absent from the item catalogue
    #[error("Unknown model type: '{model_type}'")]
    UnknownModelType { model_type: String },

    /// Projection index does not address a cell
    #[error("No cell at row {row}, column {column}")]
    CellNotFound { row: usize, column: usize },

    // ===== Duplicate Keys =====
    /// Identifier already registered for another item
    #[error("Duplicate identifier: {identifier}")]
    DuplicateKey { identifier: String },

    /// Item already has a registered identifier
    #[error("Item {item} is already registered as {identifier}")]
    ItemAlreadyRegistered { item: String, identifier: String },

    // ===== Invalid Operations =====
    /// Property tags hold exactly one item for the item's whole life
    #[error("Cannot {op} on property tag '{tag}'")]
    PropertyImmutable { tag: String, op: String },

    /// The root item cannot be taken or moved
    #[error("Cannot {op} the root item")]
    RootImmutable { op: String },

    /// Mutation attempted from a listener while a command is running
    #[error("Re-entrant {op} while a command is in progress")]
    ReentrantMutation { op: String },

    /// EndMacro without a matching BeginMacro
    #[error("No macro is open")]
    NoOpenMacro,

    /// Undo/redo operation on a model without a command stack
    #[error("Undo/redo is not enabled: cannot {op}")]
    UndoRedoDisabled { op: String },

    /// Command lifecycle transition not allowed from its current state
    #[error("Cannot {op} command '{description}' in state {state}")]
    InvalidCommandState {
        description: String,
        state: String,
        op: String,
    },

    /// Obsolete commands are never undone
    #[error("Command '{description}' is obsolete")]
    ObsoleteCommand { description: String },

    /// Cell presents a non-editable item
    #[error("Item {item} is not editable")]
    NotEditable { item: String },

    /// Model was destroyed
    #[error("Model has been destroyed")]
    ModelDestroyed,

    // ===== Generic Errors =====
    /// Serialization error (JSON encoding/decoding)
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MvxError {
    /// Classify this error in the canonical taxonomy
    pub fn kind(&self) -> ExErrorKind {
        match self {
            MvxError::TagNotRegistered { .. }
            | MvxError::DuplicateTag { .. }
            | MvxError::TagFull { .. }
            | MvxError::TypeNotAllowed { .. }
            | MvxError::RowOutOfRange { .. }
            | MvxError::BelowMinimum { .. }
            | MvxError::TagNotEmpty { .. }
            | MvxError::DataKindMismatch { .. }
            | MvxError::IllegalMove { .. } => ExErrorKind::ConstraintViolation,

            MvxError::ItemNotFound { .. }
            | MvxError::SlotEmpty { .. }
            | MvxError::PathNotResolved { .. }
            | MvxError::IdentifierNotFound { .. }
            | MvxError::UnknownModelType { .. }
            | MvxError::CellNotFound { .. } => ExErrorKind::NotFound,

            MvxError::DuplicateKey { .. } | MvxError::ItemAlreadyRegistered { .. } => {
                ExErrorKind::DuplicateKey
            }

            MvxError::PropertyImmutable { .. }
            | MvxError::RootImmutable { .. }
            | MvxError::ReentrantMutation { .. }
            | MvxError::NoOpenMacro
            | MvxError::UndoRedoDisabled { .. }
            | MvxError::InvalidCommandState { .. }
            | MvxError::ObsoleteCommand { .. }
            | MvxError::NotEditable { .. }
            | MvxError::ModelDestroyed => ExErrorKind::InvalidOperation,

            MvxError::Serialization { .. } => ExErrorKind::Serialization,
            MvxError::Config { .. } => ExErrorKind::Config,
            MvxError::Internal { .. } => ExErrorKind::Internal,
        }
    }
}

/// Conversion from MvxError to ExError
///
/// Carries the structured context (tag, row, item) of each variant into the
/// canonical facility so hosts can react on kind and code alone.
impl From<MvxError> for ExError {
    fn from(err: MvxError) -> Self {
        let base = ExError::new(err.kind()).with_message(err.to_string());
        match err {
            MvxError::TagNotRegistered { tag }
            | MvxError::DuplicateTag { tag }
            | MvxError::TagFull { tag, .. }
            | MvxError::TypeNotAllowed { tag, .. }
            | MvxError::BelowMinimum { tag, .. }
            | MvxError::TagNotEmpty { tag, .. } => base.with_tag(tag),

            MvxError::RowOutOfRange { tag, row, .. } | MvxError::SlotEmpty { tag, row } => {
                base.with_tag(tag).with_row(row)
            }

            MvxError::PropertyImmutable { tag, op } => base.with_tag(tag).with_op(op),

            MvxError::ItemNotFound { item }
            | MvxError::NotEditable { item }
            | MvxError::ItemAlreadyRegistered { item, .. } => base.with_item_id(item),

            MvxError::IdentifierNotFound { identifier }
            | MvxError::DuplicateKey { identifier } => base.with_item_id(identifier),

            MvxError::CellNotFound { row, .. } => base.with_row(row),

            MvxError::RootImmutable { op }
            | MvxError::ReentrantMutation { op }
            | MvxError::UndoRedoDisabled { op }
            | MvxError::InvalidCommandState { op, .. } => base.with_op(op),

            MvxError::DataKindMismatch { .. }
            | MvxError::IllegalMove { .. }
            | MvxError::PathNotResolved { .. }
            | MvxError::UnknownModelType { .. }
            | MvxError::NoOpenMacro
            | MvxError::ObsoleteCommand { .. }
            | MvxError::ModelDestroyed
            | MvxError::Serialization { .. }
            | MvxError::Config { .. }
            | MvxError::Internal { .. } => base,
        }
    }
}

/// Conversion from serde_json::Error to MvxError
impl From<serde_json::Error> for MvxError {
    fn from(err: serde_json::Error) -> Self {
        MvxError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Conversion from toml::de::Error to MvxError
impl From<toml::de::Error> for MvxError {
    fn from(err: toml::de::Error) -> Self {
        MvxError::Config {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_codes() {
        let cases = [
            (
                ExErrorKind::ConstraintViolation,
                "ERR_CONSTRAINT_VIOLATION",
            ),
            (ExErrorKind::NotFound, "ERR_NOT_FOUND"),
            (ExErrorKind::DuplicateKey, "ERR_DUPLICATE_KEY"),
            (ExErrorKind::InvalidOperation, "ERR_INVALID_OPERATION"),
        ];
        for (kind, expected_code) in cases {
            assert_eq!(kind.code(), expected_code, "Wrong code for {:?}", kind);
        }
    }

    #[test]
    fn test_slot_empty_carries_tag_and_row() {
        let err: ExError = MvxError::SlotEmpty {
            tag: "children".to_string(),
            row: 3,
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.tag(), Some("children"));
        assert_eq!(err.row(), Some(3));
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err: ExError = MvxError::NoOpenMacro.into();
        let text = err.to_string();
        assert!(text.starts_with("[ERR_INVALID_OPERATION]"));
        assert!(text.contains("No macro is open"));
    }

    #[test]
    fn test_source_chain() {
        let inner = ExError::new(ExErrorKind::NotFound);
        let outer = ExError::new(ExErrorKind::Internal).with_source(inner);
        assert_eq!(
            outer.source_error().map(|e| e.kind()),
            Some(ExErrorKind::NotFound)
        );
    }
}
