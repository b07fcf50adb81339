//! Scoped method storage

use super::{Caller, ScopeKind};
use crate::error::{OopsError, OopsResult};
use crate::object::Object;
use crate::types::TypeToken;
use crate::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Body of a scoped method
pub type MethodFn = Arc<dyn Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync>;

/// Arguments and identity handed to a running scoped method
pub struct Invocation<'a> {
    this: &'a Object,
    caller: Caller,
    name: &'a str,
    args: &'a [Value],
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(this: &'a Object, caller: Caller, name: &'a str, args: &'a [Value]) -> Self {
        Self {
            this,
            caller,
            name,
            args,
        }
    }

    /// The instance the method runs on
    pub fn this(&self) -> &'a Object {
        self.this
    }

    /// Caller capability of the declaring type, for nested scoped calls
    pub fn caller(&self) -> Caller {
        self.caller
    }

    /// Name the method was invoked under
    pub fn name(&self) -> &str {
        self.name
    }

    /// All positional arguments
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Positional argument `index`
    pub fn arg(&self, index: usize) -> OopsResult<&'a Value> {
        self.args.get(index).ok_or_else(|| {
            OopsError::out_of_range(format!("argument {} of {}", index, self.name))
        })
    }
}

/// One entry of a scoped method set
#[derive(Clone)]
pub struct ScopedMethod {
    declared_by: TypeToken,
    kind: ScopeKind,
    forwarded: bool,
    func: MethodFn,
}

impl ScopedMethod {
    fn new(declared_by: TypeToken, kind: ScopeKind, func: MethodFn) -> Self {
        Self {
            declared_by,
            kind,
            forwarded: true,
            func,
        }
    }

    /// Type whose constructor declared the implementation
    pub fn declared_by(&self) -> TypeToken {
        self.declared_by
    }

    /// Set this entry lives in
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Whether a super entry has been opted in for calls
    pub fn is_forwarded(&self) -> bool {
        self.forwarded
    }

    pub(crate) fn func(&self) -> MethodFn {
        Arc::clone(&self.func)
    }
}

impl fmt::Debug for ScopedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedMethod")
            .field("declared_by", &self.declared_by)
            .field("kind", &self.kind)
            .field("forwarded", &self.forwarded)
            .finish()
    }
}

/// The protected, internal and super sets of one instance
#[derive(Debug, Default)]
pub struct ScopedMethodSets {
    protected: FxHashMap<String, ScopedMethod>,
    internal: FxHashMap<String, ScopedMethod>,
    super_: FxHashMap<String, ScopedMethod>,
}

impl ScopedMethodSets {
    /// Create empty sets
    pub fn new() -> Self {
        Self::default()
    }

    fn set_of(&self, kind: ScopeKind) -> &FxHashMap<String, ScopedMethod> {
        match kind {
            ScopeKind::Protected => &self.protected,
            ScopeKind::Internal => &self.internal,
            ScopeKind::Super => &self.super_,
        }
    }

    /// Declare `name` in `kind`.
    ///
    /// Replacing a protected or internal entry while no super entry exists
    /// for `name` archives the replaced implementation into the super set,
    /// shadowed until [`ScopedMethodSets::expose_super`] forwards it.
    /// Super declarations are forwarded immediately.
    pub fn declare(&mut self, kind: ScopeKind, name: &str, declared_by: TypeToken, func: MethodFn) {
        let method = ScopedMethod::new(declared_by, kind, func);
        let previous = match kind {
            ScopeKind::Protected => self.protected.insert(name.to_string(), method),
            ScopeKind::Internal => self.internal.insert(name.to_string(), method),
            ScopeKind::Super => {
                self.super_.insert(name.to_string(), method);
                return;
            }
        };

        if let Some(previous) = previous {
            if !self.super_.contains_key(name) {
                let archived = ScopedMethod {
                    kind: ScopeKind::Super,
                    forwarded: false,
                    ..previous
                };
                self.super_.insert(name.to_string(), archived);
            }
        }
    }

    /// Opt an archived super entry in for calls.
    pub fn expose_super(&mut self, name: &str) -> OopsResult<()> {
        match self.super_.get_mut(name) {
            Some(entry) => {
                entry.forwarded = true;
                Ok(())
            }
            None => Err(OopsError::argument_missing(format!("super method {}", name))),
        }
    }

    /// Entry for `name` in `kind`
    pub fn get(&self, kind: ScopeKind, name: &str) -> Option<&ScopedMethod> {
        self.set_of(kind).get(name)
    }

    /// Whether `name` is declared in `kind`
    pub fn contains(&self, kind: ScopeKind, name: &str) -> bool {
        self.set_of(kind).contains_key(name)
    }

    /// Sorted names declared in `kind`
    pub fn names(&self, kind: ScopeKind) -> Vec<String> {
        let mut names: Vec<String> = self.set_of(kind).keys().cloned().collect();
        names.sort();
        names
    }
}
