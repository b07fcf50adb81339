//! Well-known types installed in every runtime
//!
//! These tokens match the definition order in [`install`].

use crate::error::{ErrorKind, OopsResult};
use crate::packages::PackageRegistry;
use crate::runtime::Construct;
use crate::types::{TypeDef, TypeRegistry, TypeToken};

/// Root of every non-root type (`core.Object`)
pub const OBJECT: TypeToken = TypeToken(0);
/// Base diagnostic type (`core.Error`); instances are collected after one cycle
pub const ERROR: TypeToken = TypeToken(1);
/// `error.ArgumentError`
pub const ARGUMENT_ERROR: TypeToken = TypeToken(2);
/// `error.TypeError`
pub const TYPE_ERROR: TypeToken = TypeToken(3);
/// `error.RangeError`
pub const RANGE_ERROR: TypeToken = TypeToken(4);
/// `error.IllegalOperationError`
pub const ILLEGAL_OPERATION_ERROR: TypeToken = TypeToken(5);

/// Field holding the numeric error id of a diagnostic object
pub const FIELD_ID: &str = "id";
/// Field holding the rendered message of a diagnostic object
pub const FIELD_MESSAGE: &str = "message";

/// Diagnostic type materializing errors of `kind`
pub fn diagnostic_type(kind: ErrorKind) -> TypeToken {
    match kind {
        ErrorKind::ArgumentMissing => ARGUMENT_ERROR,
        ErrorKind::TypeMismatch => TYPE_ERROR,
        ErrorKind::IndexOutOfRange => RANGE_ERROR,
        ErrorKind::IllegalOperation => ILLEGAL_OPERATION_ERROR,
    }
}

fn error_init(cx: &mut Construct<'_>) -> OopsResult<()> {
    let id = cx.arg(0)?.clone();
    let message = cx.arg(1)?.clone();
    cx.set_field(FIELD_ID, id);
    cx.set_field(FIELD_MESSAGE, message);
    Ok(())
}

pub(crate) fn install(types: &mut TypeRegistry, packages: &mut PackageRegistry) -> OopsResult<()> {
    let object = types.define(TypeDef::new("Object"), None)?;
    packages.register("core", "Object", object)?;

    let error = types.define(TypeDef::new("Error").init(error_init), Some(object))?;
    packages.register("core", "Error", error)?;

    for (name, expected) in [
        ("ArgumentError", ARGUMENT_ERROR),
        ("TypeError", TYPE_ERROR),
        ("RangeError", RANGE_ERROR),
        ("IllegalOperationError", ILLEGAL_OPERATION_ERROR),
    ] {
        let token = types.define(TypeDef::new(name).extends(error), Some(object))?;
        debug_assert_eq!(token, expected);
        packages.register("error", name, token)?;
    }

    debug_assert_eq!(object, OBJECT);
    debug_assert_eq!(error, ERROR);
    Ok(())
}
