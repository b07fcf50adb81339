//! Oops Object-Model Engine
//!
//! A runtime object model with class-style inheritance chains and scoped
//! method access:
//! - **Types**: nominal type tokens, declared ahead of use (`types` module)
//! - **Runtime**: addresses, chains, the construction protocol and the
//!   diagnostic collector (`runtime` module)
//! - **Scopes**: protected, internal and super method sets guarded by an
//!   explicit caller capability (`scope` module)
//! - **Packages**: namespaces mapping keys to types (`packages` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use oops_engine::{Runtime, TypeDef, Value};
//!
//! let runtime = Runtime::new();
//! let base = runtime.define(TypeDef::new("Base").init(|cx| {
//!     cx.set_protected("greet", |_| Ok(Value::from("hello")))
//! }))?;
//! let derived = runtime.define(TypeDef::new("Derived").extends(base).init(|cx| {
//!     cx.set_public("hello", |inv| inv.this().call_protected(&inv.caller(), "greet", &[]))
//! }))?;
//!
//! let obj = runtime.new_object(derived)?;
//! assert!(obj.is_instance_of(base)?);
//! assert_eq!(obj.call("hello", &[])?, "hello");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Error taxonomy and message catalog
pub mod error;

/// Type definitions and the type registry
pub mod types;

/// Namespaces
pub mod packages;

/// Scoped method sets and their guard
pub mod scope;

/// Instances
pub mod object;

/// Runtime, chains and construction
pub mod runtime;

/// Well-known builtin types
pub mod builtins;

/// Runtime options
pub mod config;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ConfigError, RuntimeOptions};
pub use error::{ErrorKind, IllegalReason, OopsError, OopsResult};
pub use object::Object;
pub use packages::{NamespaceId, ScopeInfo};
pub use runtime::{Address, BuildSession, BuildState, Chain, CollectorStats, Construct, Runtime};
pub use scope::{Caller, Invocation, ScopeKind};
pub use types::{TypeDef, TypeInfo, TypeToken};

/// Dynamic value used for arguments, return values and fields
pub use serde_json::Value;
