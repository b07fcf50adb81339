//! Instances and their public hooks

use crate::error::{OopsError, OopsResult};
use crate::runtime::{Address, Chain, Runtime};
use crate::scope::{Caller, Invocation, MethodFn, ScopeGuard, ScopeKind, ScopedMethodSets};
use crate::types::TypeToken;
use crate::Value;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a constructed instance. Clones share the same instance.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    runtime: Runtime,
    type_token: TypeToken,
    weak: bool,
    /// Set once, by the first bake of the build session
    address: OnceCell<Address>,
    state: Mutex<ObjectState>,
}

#[derive(Default)]
struct ObjectState {
    /// Type whose constructor body is currently running on this instance
    constructing: Option<TypeToken>,
    scopes: ScopedMethodSets,
    /// Public methods with their declaring type
    public: FxHashMap<String, (TypeToken, MethodFn)>,
    fields: FxHashMap<String, Value>,
}

impl Object {
    pub(crate) fn new(runtime: Runtime, type_token: TypeToken, weak: bool) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                runtime,
                type_token,
                weak,
                address: OnceCell::new(),
                state: Mutex::new(ObjectState::default()),
            }),
        }
    }

    pub(crate) fn bind_address(&self, address: Address) {
        // A second bake of the same session merges into the first address
        if let Err(rebaked) = self.inner.address.set(address) {
            debug_assert_eq!(
                self.address(),
                Some(rebaked),
                "rebake supplied a different address"
            );
        }
    }

    pub(crate) fn enter_constructor(&self, ty: TypeToken) -> Option<TypeToken> {
        self.inner.state.lock().constructing.replace(ty)
    }

    pub(crate) fn leave_constructor(&self, previous: Option<TypeToken>) {
        self.inner.state.lock().constructing = previous;
    }

    /// Address of the instance; `None` for weak instances
    pub fn address(&self) -> Option<Address> {
        self.inner.address.get().copied()
    }

    /// Most-derived type of the instance
    pub fn type_token(&self) -> TypeToken {
        self.inner.type_token
    }

    /// Declared name of the most-derived type
    pub fn name(&self) -> String {
        self.inner
            .runtime
            .type_name(self.inner.type_token)
            .unwrap_or_default()
    }

    /// Whether the instance was built without an address
    pub fn is_weak(&self) -> bool {
        self.inner.weak
    }

    /// Runtime that built the instance
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    fn disposed_error(&self) -> OopsError {
        let address = self.address().map(|a| a.as_u64()).unwrap_or(0);
        OopsError::disposed(format!("{}@{}", self.name(), address))
    }

    /// Baked chain of the instance.
    ///
    /// Weak and not yet baked instances report a chain holding only their
    /// own type; disposed instances fail with `IllegalOperation`.
    pub fn chain(&self) -> OopsResult<Chain> {
        match self.address() {
            None => Ok(Chain::from_tokens(&[self.inner.type_token])),
            Some(address) => self
                .inner
                .runtime
                .chain_of(address)
                .ok_or_else(|| self.disposed_error()),
        }
    }

    /// Whether `token` contributed to this instance
    pub fn is_instance_of(&self, token: TypeToken) -> OopsResult<bool> {
        match self.address() {
            None => Ok(token == self.inner.type_token),
            Some(address) => self
                .inner
                .runtime
                .with_chain(address, |chain| chain.contains(token))
                .ok_or_else(|| self.disposed_error()),
        }
    }

    /// Whether the chain entry has been removed
    pub fn is_disposed(&self) -> bool {
        match self.address() {
            None => false,
            Some(address) => self.inner.runtime.chain_of(address).is_none(),
        }
    }

    /// Remove the chain entry. Returns `false` if there was none.
    pub fn dispose(&self) -> bool {
        match self.address() {
            Some(address) => self.inner.runtime.dispose(address),
            None => false,
        }
    }

    fn declare(&self, kind: ScopeKind, caller: &Caller, name: &str, func: MethodFn, operation: &str) -> OopsResult<()> {
        let mut state = self.inner.state.lock();
        ScopeGuard::check_declaration(caller, state.constructing, operation)?;
        let declared_by = state.constructing.unwrap_or(self.inner.type_token);
        state.scopes.declare(kind, name, declared_by, func);
        Ok(())
    }

    /// Declare a public method; only valid from the running constructor.
    ///
    /// A later declaration under the same name replaces the earlier one.
    pub fn set_public<F>(&self, caller: &Caller, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        let mut state = self.inner.state.lock();
        ScopeGuard::check_declaration(caller, state.constructing, "setPublic")?;
        let declared_by = state.constructing.unwrap_or(self.inner.type_token);
        state.public.insert(name.to_string(), (declared_by, Arc::new(func)));
        Ok(())
    }

    /// Whether a public method `name` is declared
    pub fn has_method(&self, name: &str) -> bool {
        self.inner.state.lock().public.contains_key(name)
    }

    /// Invoke a public method.
    ///
    /// Anyone holding the instance may call it. The body receives the
    /// caller capability of its declaring type, so scoped calls made from
    /// it act on behalf of that type.
    pub fn call(&self, name: &str, args: &[Value]) -> OopsResult<Value> {
        let resolved = self
            .inner
            .state
            .lock()
            .public
            .get(name)
            .map(|(declared_by, func)| (*declared_by, Arc::clone(func)));

        let Some((declared_by, func)) = resolved else {
            return Err(OopsError::argument_missing(format!("method {}", name)));
        };
        let invocation = Invocation::new(self, Caller::of(declared_by), name, args);
        func(&invocation)
    }

    /// Declare a protected method; only valid from the running constructor
    pub fn set_protected<F>(&self, caller: &Caller, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.declare(ScopeKind::Protected, caller, name, Arc::new(func), "setProtected")
    }

    /// Declare an internal method; only valid from the running constructor
    pub fn set_internal<F>(&self, caller: &Caller, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.declare(ScopeKind::Internal, caller, name, Arc::new(func), "setInternal")
    }

    /// Declare and forward a super method; only valid from the running
    /// constructor
    pub fn set_super<F>(&self, caller: &Caller, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.declare(ScopeKind::Super, caller, name, Arc::new(func), "setSuper")
    }

    /// Forward the implementation archived under `name` to super callers
    pub fn expose_super(&self, caller: &Caller, name: &str) -> OopsResult<()> {
        let mut state = self.inner.state.lock();
        ScopeGuard::check_declaration(caller, state.constructing, "setSuper")?;
        state.scopes.expose_super(name)
    }

    /// Whether `name` is declared in `kind`
    pub fn has_scoped(&self, kind: ScopeKind, name: &str) -> bool {
        self.inner.state.lock().scopes.contains(kind, name)
    }

    /// Names declared in `kind`
    pub fn scoped_names(&self, kind: ScopeKind) -> Vec<String> {
        self.inner.state.lock().scopes.names(kind)
    }

    /// Invoke a scoped method after authorizing `caller`.
    ///
    /// The method body runs without any runtime lock held and receives the
    /// caller capability of its declaring type.
    pub fn call_scoped(&self, kind: ScopeKind, caller: &Caller, name: &str, args: &[Value]) -> OopsResult<Value> {
        let Some(address) = self.address() else {
            return Err(OopsError::scope(kind, name));
        };

        let resolved = self.inner.runtime.with_chain(address, |chain| {
            let packages = self.inner.runtime.packages();
            let state = self.inner.state.lock();
            let guard = ScopeGuard::new(chain.as_slice(), &packages);
            guard
                .check(kind, caller, name, state.scopes.get(kind, name))
                .map(|entry| (entry.declared_by(), entry.func()))
        });

        let (declared_by, func) = match resolved {
            Some(result) => result?,
            None => return Err(self.disposed_error()),
        };
        let invocation = Invocation::new(self, Caller::of(declared_by), name, args);
        func(&invocation)
    }

    /// Invoke a protected method
    pub fn call_protected(&self, caller: &Caller, name: &str, args: &[Value]) -> OopsResult<Value> {
        self.call_scoped(ScopeKind::Protected, caller, name, args)
    }

    /// Invoke an internal method
    pub fn call_internal(&self, caller: &Caller, name: &str, args: &[Value]) -> OopsResult<Value> {
        self.call_scoped(ScopeKind::Internal, caller, name, args)
    }

    /// Invoke a forwarded super method
    pub fn call_super(&self, caller: &Caller, name: &str, args: &[Value]) -> OopsResult<Value> {
        self.call_scoped(ScopeKind::Super, caller, name, args)
    }

    /// Read a field
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.inner.state.lock().fields.get(name).cloned()
    }

    /// Write a field, returning the previous value
    pub fn set_field(&self, name: &str, value: Value) -> Option<Value> {
        self.inner.state.lock().fields.insert(name.to_string(), value)
    }

    /// `[namespace.Key@address]`, `[namespace.Key]` for unaddressed
    /// instances, `[name]` for unpackaged types
    pub fn q_name(&self) -> String {
        match (self.inner.runtime.scope_of(self.inner.type_token), self.address()) {
            (Some(scope), Some(address)) => format!("[{}@{}]", scope.qualified(), address),
            (Some(scope), None) => format!("[{}]", scope.qualified()),
            (None, _) => format!("[{}]", self.name()),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.runtime.scope_of(self.inner.type_token) {
            Some(scope) => write!(f, "[{}]", scope.key),
            None => write!(f, "[{}]", self.name()),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type_token", &self.inner.type_token)
            .field("address", &self.address())
            .field("weak", &self.inner.weak)
            .finish()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Object {}
