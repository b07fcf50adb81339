//! The runtime: owner of every registry
//!
//! A [`Runtime`] is a cheap handle; clones share the same registries.
//! Each runtime has its own address space, type tokens and namespaces, so
//! independent runtimes never observe each other's instances.

mod address;
mod chain_registry;
mod collector;
mod construction;

pub use address::{Address, AddressAllocator};
pub use chain_registry::{Chain, ChainRegistry};
pub use collector::{CollectorStats, DiagnosticCollector};
pub use construction::{BuildSession, BuildState, Construct};

use crate::builtins;
use crate::config::RuntimeOptions;
use crate::error::{OopsError, OopsResult};
use crate::object::Object;
use crate::packages::{assign_namespace, NamespaceId, PackageRegistry, ScopeInfo};
use crate::types::{TypeDef, TypeInfo, TypeRegistry, TypeToken};
use crate::Value;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};
use std::sync::Arc;

/// Handle to one object-model runtime
#[derive(Clone)]
pub struct Runtime {
    shared: Arc<RuntimeShared>,
}

struct RuntimeShared {
    options: RuntimeOptions,
    types: RwLock<TypeRegistry>,
    addresses: AddressAllocator,
    chains: Mutex<ChainRegistry>,
    packages: RwLock<PackageRegistry>,
    collector: Mutex<DiagnosticCollector>,
}

impl Runtime {
    /// Runtime with default options
    pub fn new() -> Self {
        Self::with_options(RuntimeOptions::default())
    }

    /// Runtime with the builtin types installed and the configured
    /// namespaces created
    pub fn with_options(options: RuntimeOptions) -> Self {
        let mut types = TypeRegistry::new();
        let mut packages = PackageRegistry::with_system_namespaces();
        if let Err(err) = builtins::install(&mut types, &mut packages) {
            // Fresh registries cannot refuse the builtin definitions
            panic!("failed to install builtin types: {}", err);
        }
        for name in &options.namespaces {
            packages.ensure(name);
        }

        Self {
            shared: Arc::new(RuntimeShared {
                options,
                types: RwLock::new(types),
                addresses: AddressAllocator::new(),
                chains: Mutex::new(ChainRegistry::new()),
                packages: RwLock::new(packages),
                collector: Mutex::new(DiagnosticCollector::new()),
            }),
        }
    }

    /// Options the runtime was created with
    pub fn options(&self) -> &RuntimeOptions {
        &self.shared.options
    }

    // ===== Types =====

    /// Register a type.
    ///
    /// A definition without bases extends [`builtins::OBJECT`]. If the
    /// definition names a package whose key is already taken, nothing is
    /// defined and the registration error is returned.
    pub fn define(&self, mut def: TypeDef) -> OopsResult<TypeToken> {
        let package = def.take_package();
        let mut types = self.shared.types.write();
        let mut packages = self.shared.packages.write();
        if let Some((namespace, key)) = &package {
            packages.check_available(namespace, key)?;
        }

        let token = types.define(def, Some(builtins::OBJECT))?;
        tracing::trace!(token = token.as_u32(), "defined type");

        if let Some((namespace, key)) = package {
            packages.register(&namespace, &key, token)?;
        }
        Ok(token)
    }

    /// Metadata of `token`
    pub fn type_info(&self, token: TypeToken) -> Option<Arc<TypeInfo>> {
        self.shared.types.read().get(token)
    }

    /// Declared name of `token`
    pub fn type_name(&self, token: TypeToken) -> Option<String> {
        self.shared.types.read().name_of(token).map(str::to_string)
    }

    /// First type defined with `name`
    pub fn type_by_name(&self, name: &str) -> Option<TypeToken> {
        self.shared.types.read().get_by_name(name).map(|info| info.token)
    }

    /// Linearized ancestry of `token`, most-derived first
    pub fn ancestry(&self, token: TypeToken) -> Option<Vec<TypeToken>> {
        self.type_info(token).map(|info| info.ancestry.clone())
    }

    // ===== Construction =====

    /// Build an instance of `token`
    pub fn construct(&self, token: TypeToken, args: &[Value]) -> OopsResult<Object> {
        construction::construct(self, token, args)
    }

    /// Build an instance of `token` without arguments
    pub fn new_object(&self, token: TypeToken) -> OopsResult<Object> {
        self.construct(token, &[])
    }

    /// Start a session for driving the construction protocol by hand
    pub fn begin_session(&self) -> BuildSession {
        BuildSession::new(self.clone())
    }

    pub(crate) fn allocate_address(&self) -> Address {
        self.shared.addresses.allocate()
    }

    pub(crate) fn chains(&self) -> MutexGuard<'_, ChainRegistry> {
        self.shared.chains.lock()
    }

    pub(crate) fn packages(&self) -> RwLockReadGuard<'_, PackageRegistry> {
        self.shared.packages.read()
    }

    /// Bind step: auto-package `token` if enabled
    pub(crate) fn bind(&self, token: TypeToken) {
        if self.shared.options.auto_package {
            self.auto_package(token);
        }
    }

    fn auto_package(&self, token: TypeToken) {
        let Some(info) = self.type_info(token) else {
            return;
        };

        let mut packages = self.shared.packages.write();
        let Some(id) = assign_namespace(token, &info.ancestry, &packages) else {
            return;
        };
        let Some(namespace) = packages.get(id).map(|ns| ns.name().to_string()) else {
            return;
        };

        match packages.register(&namespace, &info.name, token) {
            Ok(_) => tracing::debug!(ty = %info.name, namespace = %namespace, "auto-packaged type"),
            Err(err) => tracing::warn!(ty = %info.name, namespace = %namespace, error = %err, "auto-packaging refused"),
        }
    }

    /// One collection cycle after a completed construction
    pub(crate) fn collect(&self, completed: Option<Address>) {
        if !self.shared.options.collect_diagnostics {
            return;
        }

        let diagnostic = completed.filter(|address| {
            self.with_chain(*address, |chain| chain.contains(builtins::ERROR))
                .unwrap_or(false)
        });
        let evicted = self.shared.collector.lock().cycle(diagnostic);

        if let Some(address) = evicted {
            if self.dispose(address) {
                tracing::trace!(address = address.as_u64(), "collected diagnostic");
            }
        }
    }

    // ===== Chains =====

    /// Chain of `address`; `None` once disposed
    pub fn chain_of(&self, address: Address) -> Option<Chain> {
        self.shared.chains.lock().chain_of(address).cloned()
    }

    pub(crate) fn with_chain<R>(&self, address: Address, f: impl FnOnce(&Chain) -> R) -> Option<R> {
        let chains = self.shared.chains.lock();
        chains.chain_of(address).map(f)
    }

    /// Number of live addresses
    pub fn num_addresses(&self) -> usize {
        self.shared.chains.lock().num_addresses()
    }

    /// Drop the chain of `address`. Returns `false` if it was already gone.
    pub fn dispose(&self, address: Address) -> bool {
        let removed = self.shared.chains.lock().dispose(address);
        if removed {
            tracing::debug!(address = address.as_u64(), "disposed");
        }
        removed
    }

    /// Drop every chain. Addresses keep counting from where they were.
    pub fn dispose_all(&self) -> usize {
        self.shared.collector.lock().clear();
        let count = self.shared.chains.lock().dispose_all();
        tracing::debug!(count, "disposed all addresses");
        count
    }

    /// Dispose everything and release this handle
    pub fn teardown(self) -> usize {
        self.dispose_all()
    }

    // ===== Namespaces =====

    /// Register `token` under `key` in `namespace`; first registration wins
    pub fn register_type(&self, token: TypeToken, namespace: &str, key: &str) -> OopsResult<NamespaceId> {
        self.shared.packages.write().register(namespace, key, token)
    }

    /// Move `token` to `key` in `namespace`
    pub fn reassign_type(&self, token: TypeToken, namespace: &str, key: &str) -> OopsResult<NamespaceId> {
        self.shared.packages.write().reassign(token, namespace, key)
    }

    /// Name of the namespace holding `token`
    pub fn namespace_of(&self, token: TypeToken) -> Option<String> {
        let packages = self.shared.packages.read();
        let id = packages.lookup(token)?;
        packages.get(id).map(|ns| ns.name().to_string())
    }

    /// Name of the first namespace with an entry keyed `key`
    pub fn namespace_by_type_name(&self, key: &str) -> Option<String> {
        let packages = self.shared.packages.read();
        let id = packages.lookup_by_name(key)?;
        packages.get(id).map(|ns| ns.name().to_string())
    }

    /// Placement of `token`
    pub fn scope_of(&self, token: TypeToken) -> Option<ScopeInfo> {
        self.shared.packages.read().scope_of(token)
    }

    /// Names of all namespaces, in creation order
    pub fn namespaces(&self) -> Vec<String> {
        self.shared
            .packages
            .read()
            .iter()
            .map(|ns| ns.name().to_string())
            .collect()
    }

    // ===== Checks and diagnostics =====

    fn expected_name(&self, token: TypeToken) -> String {
        let name = self
            .scope_of(token)
            .map(|scope| scope.key)
            .or_else(|| self.type_name(token))
            .unwrap_or_else(|| token.to_string());
        format!("{} in argument", name)
    }

    /// Require `value` to be present and to have `expected` in its chain
    pub fn is_or_throw(&self, name: &str, value: Option<&Object>, expected: TypeToken) -> OopsResult<()> {
        let value = value.ok_or_else(|| OopsError::argument_missing(name))?;
        if value.is_instance_of(expected)? {
            Ok(())
        } else {
            Err(OopsError::type_mismatch(self.expected_name(expected), false))
        }
    }

    /// Require `value` to be present and exactly of type `expected`
    pub fn expect_exact(&self, name: &str, value: Option<&Object>, expected: TypeToken) -> OopsResult<()> {
        let value = value.ok_or_else(|| OopsError::argument_missing(name))?;
        if value.type_token() == expected {
            Ok(())
        } else {
            Err(OopsError::type_mismatch(self.expected_name(expected), true))
        }
    }

    /// Materialize `err` as an instance of the matching builtin error type.
    ///
    /// The instance carries the `id` and `message` fields and is collected
    /// one construction cycle after it was built.
    pub fn diagnostic(&self, err: &OopsError) -> OopsResult<Object> {
        let args = [Value::from(err.id()), Value::from(err.to_string())];
        self.construct(builtins::diagnostic_type(err.kind()), &args)
    }

    /// Address of the diagnostic waiting for the next cycle
    pub fn pending_diagnostic(&self) -> Option<Address> {
        self.shared.collector.lock().pending()
    }

    /// Collector statistics
    pub fn collector_stats(&self) -> CollectorStats {
        self.shared.collector.lock().stats().clone()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.shared.options)
            .field("types", &self.shared.types.read().len())
            .field("addresses", &self.num_addresses())
            .finish()
    }
}
