//! Scoped method access
//!
//! Instances carry three method sets besides their public surface:
//! protected, internal and super. Every call into one of them names an
//! explicit [`Caller`] and is authorized by the [`ScopeGuard`] before the
//! method body runs.

mod guard;
mod method;

pub use guard::ScopeGuard;
pub use method::{Invocation, MethodFn, ScopedMethod, ScopedMethodSets};

use crate::error::error_ids;
use crate::types::TypeToken;
use std::fmt;

/// Method visibility levels enforced at call time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Callable by types in the instance's chain
    Protected,
    /// Callable by types in the chain or sharing a namespace with it
    Internal,
    /// Explicitly forwarded overridden implementations
    Super,
}

impl ScopeKind {
    /// Error id raised when a call in this scope is refused
    pub fn error_id(self) -> u16 {
        match self {
            ScopeKind::Protected => error_ids::PROTECTED,
            ScopeKind::Internal => error_ids::INTERNAL,
            ScopeKind::Super => error_ids::SUPER,
        }
    }

    /// Lower-case scope name
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Protected => "protected",
            ScopeKind::Internal => "internal",
            ScopeKind::Super => "super",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability identifying the logical caller of a scoped method.
///
/// Only the runtime creates typed callers. A constructor body gets the
/// caller of the type being constructed and a method body (public or
/// scoped) gets the caller of the type that declared the method. Code
/// outside an instance reaches its scoped methods through the instance's
/// public methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Caller {
    ty: Option<TypeToken>,
}

impl Caller {
    pub(crate) fn of(ty: TypeToken) -> Self {
        Self { ty: Some(ty) }
    }

    /// A caller without a type; never authorized for scoped access
    pub fn anonymous() -> Self {
        Self { ty: None }
    }

    /// Type this caller acts as
    pub fn type_token(&self) -> Option<TypeToken> {
        self.ty
    }
}
