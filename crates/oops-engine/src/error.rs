//! Error taxonomy and message catalog
//!
//! Every error carries a numeric id and renders its message from a
//! template in which `%msg%` is replaced by the offending name or type.
//!
//! | ID   | Kind                                | Template                                        |
//! |------|-------------------------------------|-------------------------------------------------|
//! | 1000 | type mismatch                       | `Invalid signature, %msg% expected.`            |
//! | 1001 | strict type mismatch                | `Invalid signature, strict %msg% expected.`     |
//! | 2000 | missing argument                    | `Missing argument, %msg% is undefined.`         |
//! | 3000 | index out of range                  | `%msg% is out of range.`                        |
//! | 4000 | protected access                    | `%msg% is protected.`                           |
//! | 4001 | internal access                     | `%msg% is internal.`                            |
//! | 4002 | super access                        | `%msg% not defined in super.`                   |
//! | 4010 | disposed instance                   | `%msg% disposed.`                               |
//! | 4020 | duplicate packaging                 | `%msg% is already packaged.`                    |
//! | 4100 | declaration outside the constructor | `%msg% must be invoked within the instance.`    |

use crate::scope::ScopeKind;
use thiserror::Error;

/// Result alias used throughout the crate
pub type OopsResult<T> = Result<T, OopsError>;

/// Well-known error ids
pub mod error_ids {
    /// Value does not carry the expected type in its chain
    pub const TYPE_MISMATCH: u16 = 1000;
    /// Value is not exactly of the expected type
    pub const STRICT_TYPE_MISMATCH: u16 = 1001;
    /// Required value was not supplied
    pub const ARGUMENT_MISSING: u16 = 2000;
    /// Position outside collection bounds
    pub const INDEX_OUT_OF_RANGE: u16 = 3000;
    /// Unauthorized protected call
    pub const PROTECTED: u16 = 4000;
    /// Unauthorized internal call
    pub const INTERNAL: u16 = 4001;
    /// Super method not forwarded or caller not in chain
    pub const SUPER: u16 = 4002;
    /// Instance chain has been disposed
    pub const DISPOSED: u16 = 4010;
    /// Type token already lives in a namespace
    pub const ALREADY_PACKAGED: u16 = 4020;
    /// Scope declaration outside the declaring type's constructor
    pub const OUTSIDE_INSTANCE: u16 = 4100;
}

/// Look up the message template for an error id
pub fn template(id: u16) -> Option<&'static str> {
    use error_ids::*;
    match id {
        TYPE_MISMATCH => Some("Invalid signature, %msg% expected."),
        STRICT_TYPE_MISMATCH => Some("Invalid signature, strict %msg% expected."),
        ARGUMENT_MISSING => Some("Missing argument, %msg% is undefined."),
        INDEX_OUT_OF_RANGE => Some("%msg% is out of range."),
        PROTECTED => Some("%msg% is protected."),
        INTERNAL => Some("%msg% is internal."),
        SUPER => Some("%msg% not defined in super."),
        DISPOSED => Some("%msg% disposed."),
        ALREADY_PACKAGED => Some("%msg% is already packaged."),
        OUTSIDE_INSTANCE => Some("%msg% must be invoked within the instance."),
        _ => None,
    }
}

/// Render a message for `id`, substituting `detail` into the template.
///
/// Templates without a `%msg%` placeholder get the detail appended as
/// `" - detail"`. Unknown ids render the bare detail.
pub fn format_message(id: u16, detail: &str) -> String {
    match template(id) {
        Some(msg) if detail.is_empty() => msg.to_string(),
        Some(msg) if msg.contains("%msg%") => msg.replace("%msg%", detail),
        Some(msg) => format!("{} - {}", msg, detail),
        None => detail.to_string(),
    }
}

/// Why an operation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IllegalReason {
    /// A scoped method was invoked by an unauthorized caller
    Scope(ScopeKind),
    /// The instance's chain has been disposed
    Disposed,
    /// The type token already lives in a namespace
    AlreadyPackaged,
    /// A declaration was attempted outside the declaring type's constructor
    OutsideInstance,
}

impl IllegalReason {
    /// Numeric id of this reason
    pub fn id(self) -> u16 {
        match self {
            IllegalReason::Scope(kind) => kind.error_id(),
            IllegalReason::Disposed => error_ids::DISPOSED,
            IllegalReason::AlreadyPackaged => error_ids::ALREADY_PACKAGED,
            IllegalReason::OutsideInstance => error_ids::OUTSIDE_INSTANCE,
        }
    }
}

/// Coarse error classification, one per builtin diagnostic type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`OopsError::TypeMismatch`]
    TypeMismatch,
    /// See [`OopsError::ArgumentMissing`]
    ArgumentMissing,
    /// See [`OopsError::IndexOutOfRange`]
    IndexOutOfRange,
    /// See [`OopsError::IllegalOperation`]
    IllegalOperation,
}

/// Runtime errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OopsError {
    /// A value's chain does not contain (or, strictly, is not) the expected type
    #[error("{}", type_mismatch_message(.expected, .strict))]
    TypeMismatch {
        /// Expected type, usually `"Type in argument"`
        expected: String,
        /// Exact-type check rather than chain membership
        strict: bool,
    },

    /// A required value was not supplied
    #[error("{}", format_message(error_ids::ARGUMENT_MISSING, .name))]
    ArgumentMissing {
        /// Name of the missing value
        name: String,
    },

    /// A position argument falls outside the valid bounds
    #[error("{}", format_message(error_ids::INDEX_OUT_OF_RANGE, .what))]
    IndexOutOfRange {
        /// Description of the offending position
        what: String,
    },

    /// Unauthorized scoped call, disposed instance or refused registration
    #[error("{}", format_message(.reason.id(), .subject))]
    IllegalOperation {
        /// Which rule refused the operation
        reason: IllegalReason,
        /// Method name, qualified instance name or type name
        subject: String,
    },
}

fn type_mismatch_message(expected: &str, strict: &bool) -> String {
    let id = if *strict {
        error_ids::STRICT_TYPE_MISMATCH
    } else {
        error_ids::TYPE_MISMATCH
    };
    format_message(id, expected)
}

impl OopsError {
    /// Unauthorized scoped call
    pub fn scope(kind: ScopeKind, method: impl Into<String>) -> Self {
        OopsError::IllegalOperation {
            reason: IllegalReason::Scope(kind),
            subject: method.into(),
        }
    }

    /// Operation on a disposed instance
    pub fn disposed(subject: impl Into<String>) -> Self {
        OopsError::IllegalOperation {
            reason: IllegalReason::Disposed,
            subject: subject.into(),
        }
    }

    /// Declaration outside the declaring type's constructor
    pub fn outside_instance(operation: impl Into<String>) -> Self {
        OopsError::IllegalOperation {
            reason: IllegalReason::OutsideInstance,
            subject: operation.into(),
        }
    }

    /// Duplicate namespace registration
    pub fn already_packaged(subject: impl Into<String>) -> Self {
        OopsError::IllegalOperation {
            reason: IllegalReason::AlreadyPackaged,
            subject: subject.into(),
        }
    }

    /// Value of the wrong type; `strict` for exact-type checks
    pub fn type_mismatch(expected: impl Into<String>, strict: bool) -> Self {
        OopsError::TypeMismatch {
            expected: expected.into(),
            strict,
        }
    }

    /// Missing value
    pub fn argument_missing(name: impl Into<String>) -> Self {
        OopsError::ArgumentMissing { name: name.into() }
    }

    /// Out of range position
    pub fn out_of_range(what: impl Into<String>) -> Self {
        OopsError::IndexOutOfRange { what: what.into() }
    }

    /// Numeric id from the message catalog
    pub fn id(&self) -> u16 {
        match self {
            OopsError::TypeMismatch { strict: false, .. } => error_ids::TYPE_MISMATCH,
            OopsError::TypeMismatch { strict: true, .. } => error_ids::STRICT_TYPE_MISMATCH,
            OopsError::ArgumentMissing { .. } => error_ids::ARGUMENT_MISSING,
            OopsError::IndexOutOfRange { .. } => error_ids::INDEX_OUT_OF_RANGE,
            OopsError::IllegalOperation { reason, .. } => reason.id(),
        }
    }

    /// Coarse classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            OopsError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            OopsError::ArgumentMissing { .. } => ErrorKind::ArgumentMissing,
            OopsError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            OopsError::IllegalOperation { .. } => ErrorKind::IllegalOperation,
        }
    }

    /// Whether this is an `IllegalOperation`
    pub fn is_illegal_operation(&self) -> bool {
        matches!(self, OopsError::IllegalOperation { .. })
    }

    /// The refusal reason, for `IllegalOperation` errors
    pub fn illegal_reason(&self) -> Option<IllegalReason> {
        match self {
            OopsError::IllegalOperation { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}
