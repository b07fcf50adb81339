//! Construction protocol
//!
//! One [`BuildSession`] exists per top-level construction. It collects the
//! tokens of every type whose constructor starts (most-derived first),
//! bakes them into the chain registry when a base path bottoms out, and
//! completes once the outermost type is bound.
//!
//! ```text
//! Unregistered --register--> Registering --bake--> Baked --complete--> Completed
//!                                 ^                  |
//!                                 +----register------+
//! ```

use super::{Address, Chain, Runtime};
use crate::error::{OopsError, OopsResult};
use crate::object::Object;
use crate::scope::{Caller, Invocation};
use crate::types::{TypeInfo, TypeToken};
use crate::Value;
use rustc_hash::FxHashSet;

/// Progress of a build session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Nothing registered yet
    Unregistered,
    /// Tokens pending that are not in the chain yet
    Registering,
    /// Every pending token is in the chain
    Baked,
    /// Session finished; pending list cleared
    Completed,
}

/// Pending chain of one construction
pub struct BuildSession {
    runtime: Runtime,
    pending: Vec<TypeToken>,
    /// Number of leading pending tokens already baked
    baked: usize,
    address: Option<Address>,
    state: BuildState,
    visited: FxHashSet<TypeToken>,
}

impl BuildSession {
    pub(crate) fn new(runtime: Runtime) -> Self {
        Self {
            runtime,
            pending: Vec::new(),
            baked: 0,
            address: None,
            state: BuildState::Unregistered,
            visited: FxHashSet::default(),
        }
    }

    /// Record that `token`'s constructor started. Returns `false` if it
    /// was already pending.
    pub fn register(&mut self, token: TypeToken) -> bool {
        if self.pending.contains(&token) {
            return false;
        }
        self.pending.push(token);
        self.state = BuildState::Registering;
        true
    }

    /// Publish the pending tokens.
    ///
    /// The first bake allocates an address and stores the pending list as
    /// its chain. Later bakes merge into the stored chain, failing with
    /// `IllegalOperation` if it was disposed in the meantime.
    pub fn bake(&mut self) -> OopsResult<Address> {
        let address = match self.address {
            None => {
                let address = self.runtime.allocate_address();
                self.runtime
                    .chains()
                    .store_chain(address, Chain::from_tokens(&self.pending));
                tracing::debug!(address = address.as_u64(), tokens = self.pending.len(), "baked chain");
                address
            }
            Some(address) => {
                let appended = self
                    .runtime
                    .chains()
                    .merge_into_chain(address, &self.pending)?;
                tracing::debug!(address = address.as_u64(), appended, "merged chain");
                address
            }
        };

        self.address = Some(address);
        self.baked = self.pending.len();
        self.state = BuildState::Baked;
        Ok(address)
    }

    /// End the session and run one diagnostic collection cycle
    pub fn complete(&mut self) {
        self.pending.clear();
        self.baked = 0;
        self.state = BuildState::Completed;
        self.runtime.collect(self.address);
    }

    /// Tokens registered since the session started or last completed
    pub fn pending(&self) -> &[TypeToken] {
        &self.pending
    }

    /// Whether some pending token is not in the chain yet
    pub fn has_unbaked(&self) -> bool {
        self.pending.len() > self.baked
    }

    /// Current state
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Address assigned by the first bake
    pub fn address(&self) -> Option<Address> {
        self.address
    }
}

/// Context handed to a constructor body
pub struct Construct<'a> {
    this: &'a Object,
    info: &'a TypeInfo,
    args: &'a [Value],
}

impl<'a> Construct<'a> {
    /// Instance under construction
    pub fn this(&self) -> &'a Object {
        self.this
    }

    /// Type whose body is running
    pub fn current(&self) -> TypeToken {
        self.info.token
    }

    /// Caller capability of the running type
    pub fn caller(&self) -> Caller {
        Caller::of(self.info.token)
    }

    /// Runtime building the instance
    pub fn runtime(&self) -> &'a Runtime {
        self.this.runtime()
    }

    /// Constructor arguments of the running type
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Positional argument, or `IndexOutOfRange`
    pub fn arg(&self, index: usize) -> OopsResult<&'a Value> {
        self.args.get(index).ok_or_else(|| {
            OopsError::out_of_range(format!("argument {} of {}", index, self.info.name))
        })
    }

    /// Declare a public method on the instance
    pub fn set_public<F>(&self, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.this.set_public(&self.caller(), name, func)
    }

    /// Declare a protected method on the instance
    pub fn set_protected<F>(&self, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.this.set_protected(&self.caller(), name, func)
    }

    /// Declare an internal method on the instance
    pub fn set_internal<F>(&self, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.this.set_internal(&self.caller(), name, func)
    }

    /// Declare and forward a super method on the instance
    pub fn set_super<F>(&self, name: &str, func: F) -> OopsResult<()>
    where
        F: Fn(&Invocation<'_>) -> OopsResult<Value> + Send + Sync + 'static,
    {
        self.this.set_super(&self.caller(), name, func)
    }

    /// Forward the implementation archived under `name` to super callers
    pub fn expose_super(&self, name: &str) -> OopsResult<()> {
        self.this.expose_super(&self.caller(), name)
    }

    /// Read a field of the instance
    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.this.get_field(name)
    }

    /// Write a field of the instance
    pub fn set_field(&self, name: &str, value: Value) {
        self.this.set_field(name, value);
    }
}

pub(crate) fn construct(runtime: &Runtime, token: TypeToken, args: &[Value]) -> OopsResult<Object> {
    let info = runtime
        .type_info(token)
        .ok_or_else(|| OopsError::out_of_range(format!("type {}", token)))?;

    let object = Object::new(runtime.clone(), token, info.weak);
    let mut session = BuildSession::new(runtime.clone());

    match build(runtime, &mut session, &object, &info, args, true) {
        Ok(()) => Ok(object),
        Err(err) => {
            if let Some(address) = object.address() {
                runtime.dispose(address);
            }
            tracing::debug!(ty = %info.name, error = %err, "construction rolled back");
            Err(err)
        }
    }
}

fn build(
    runtime: &Runtime,
    session: &mut BuildSession,
    object: &Object,
    info: &TypeInfo,
    args: &[Value],
    outermost: bool,
) -> OopsResult<()> {
    // Shared ancestors run once per instance
    if !session.visited.insert(info.token) {
        return Ok(());
    }

    let addressed = !object.is_weak();
    if addressed {
        session.register(info.token);
    }

    for base in &info.bases {
        let base_info = runtime
            .type_info(base.token)
            .ok_or_else(|| OopsError::out_of_range(format!("base type {} of {}", base.token, info.name)))?;
        let base_args = base.map_args(args);
        build(runtime, session, object, &base_info, &base_args, false)?;
    }

    if addressed && session.has_unbaked() {
        let address = session.bake()?;
        object.bind_address(address);
    }

    runtime.bind(info.token);
    if addressed && outermost {
        session.complete();
    }

    if let Some(init) = info.init() {
        let previous = object.enter_constructor(info.token);
        let mut cx = Construct {
            this: object,
            info,
            args,
        };
        let result = init(&mut cx);
        object.leave_constructor(previous);
        result?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    #[test]
    fn test_session_states() {
        let runtime = Runtime::new();
        let mut session = runtime.begin_session();
        assert_eq!(session.state(), BuildState::Unregistered);

        assert!(session.register(builtins::ERROR));
        assert!(!session.register(builtins::ERROR));
        assert!(session.register(builtins::OBJECT));
        assert_eq!(session.state(), BuildState::Registering);
        assert!(session.has_unbaked());

        let address = session.bake().unwrap();
        assert_eq!(session.state(), BuildState::Baked);
        assert!(!session.has_unbaked());
        assert_eq!(
            runtime.chain_of(address).unwrap().as_slice(),
            &[builtins::ERROR, builtins::OBJECT]
        );

        session.complete();
        assert_eq!(session.state(), BuildState::Completed);
        assert!(session.pending().is_empty());
        assert_eq!(session.address(), Some(address));
    }

    #[test]
    fn test_second_bake_merges() {
        let runtime = Runtime::new();
        let mut session = runtime.begin_session();
        session.register(builtins::TYPE_ERROR);
        session.register(builtins::OBJECT);
        let first = session.bake().unwrap();

        session.register(builtins::ERROR);
        let second = session.bake().unwrap();

        assert_eq!(first, second);
        assert_eq!(runtime.num_addresses(), 1);
        assert_eq!(
            runtime.chain_of(first).unwrap().as_slice(),
            &[builtins::TYPE_ERROR, builtins::OBJECT, builtins::ERROR]
        );
    }

    #[test]
    fn test_bake_after_dispose_fails() {
        let runtime = Runtime::new();
        let mut session = runtime.begin_session();
        session.register(builtins::OBJECT);
        let address = session.bake().unwrap();
        runtime.dispose(address);

        session.register(builtins::ERROR);
        let err = session.bake().unwrap_err();
        assert!(err.is_illegal_operation());
    }
}
