//! Call-time and declaration-time authorization

use super::{Caller, ScopeKind, ScopedMethod};
use crate::error::{OopsError, OopsResult};
use crate::packages::PackageRegistry;
use crate::types::TypeToken;

/// Authorizes scoped calls against one instance's chain.
///
/// The guard borrows the chain and the namespace registry for the
/// duration of a single check; it never runs method bodies.
pub struct ScopeGuard<'a> {
    chain: &'a [TypeToken],
    packages: &'a PackageRegistry,
}

impl<'a> ScopeGuard<'a> {
    /// Guard for an instance whose baked chain is `chain`
    pub fn new(chain: &'a [TypeToken], packages: &'a PackageRegistry) -> Self {
        Self { chain, packages }
    }

    /// Whether `caller` may enter `kind` on this instance, ignoring
    /// whether the method exists.
    pub fn authorizes(&self, kind: ScopeKind, caller: &Caller) -> bool {
        let Some(ty) = caller.type_token() else {
            return false;
        };
        let in_chain = self.chain.contains(&ty);

        match kind {
            ScopeKind::Protected | ScopeKind::Super => in_chain,
            ScopeKind::Internal => in_chain || self.shares_namespace(ty),
        }
    }

    /// System namespaces hold the implicit root of every chain, so
    /// membership in them never grants internal access.
    fn shares_namespace(&self, ty: TypeToken) -> bool {
        let Some(namespace) = self.packages.lookup(ty) else {
            return false;
        };
        if self.packages.is_system(namespace) {
            return false;
        }
        self.chain
            .iter()
            .any(|member| self.packages.lookup(*member) == Some(namespace))
    }

    /// Full call check: authorization first, then entry lookup.
    ///
    /// Returns the entry to invoke. A missing protected or internal entry
    /// is `ArgumentMissing`; a missing or shadowed super entry reports
    /// "not defined in super".
    pub fn check<'m>(
        &self,
        kind: ScopeKind,
        caller: &Caller,
        name: &str,
        entry: Option<&'m ScopedMethod>,
    ) -> OopsResult<&'m ScopedMethod> {
        if !self.authorizes(kind, caller) {
            tracing::debug!(scope = %kind, method = name, caller = ?caller.type_token(), "scoped call denied");
            return Err(OopsError::scope(kind, name));
        }

        match (kind, entry) {
            (ScopeKind::Super, Some(entry)) if entry.is_forwarded() => Ok(entry),
            (ScopeKind::Super, _) => Err(OopsError::scope(ScopeKind::Super, name)),
            (_, Some(entry)) => Ok(entry),
            (_, None) => Err(OopsError::argument_missing(format!("{} method {}", kind, name))),
        }
    }

    /// Declaration guard: only the type whose constructor body is running
    /// on the instance may populate its scoped sets.
    pub fn check_declaration(
        caller: &Caller,
        constructing: Option<TypeToken>,
        operation: &str,
    ) -> OopsResult<()> {
        match (caller.type_token(), constructing) {
            (Some(ty), Some(current)) if ty == current => Ok(()),
            _ => Err(OopsError::outside_instance(operation)),
        }
    }
}
