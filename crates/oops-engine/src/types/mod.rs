//! Type definitions
//!
//! Types are declared ahead of use with a [`TypeDef`] and receive an
//! identity-only [`TypeToken`] from the [`TypeRegistry`].

mod registry;

pub use registry::{ArgsFn, BaseSpec, InitFn, TypeDef, TypeInfo, TypeRegistry, TypeToken};
