//! Namespaces ("packages")
//!
//! A namespace maps human-readable keys to type tokens. Every token lives
//! in at most one namespace: the first registration is authoritative and
//! only [`PackageRegistry::reassign`] moves a token afterwards.
//!
//! Namespaces are used by the scope guard for internal access and by the
//! runtime to place unregistered types next to their nearest packaged
//! ancestor (see [`assign_namespace`]).

use crate::error::{OopsError, OopsResult};
use crate::types::TypeToken;
use rustc_hash::FxHashMap;

/// Namespaces created by every runtime before any user type is defined
pub const SYSTEM_NAMESPACES: &[&str] = &["core", "error"];

/// Index of a namespace in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespaceId(u32);

impl NamespaceId {
    /// Raw index
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A named grouping of type tokens
#[derive(Debug, Clone)]
pub struct Namespace {
    id: NamespaceId,
    name: String,
    entries: Vec<(String, TypeToken)>,
    by_key: FxHashMap<String, TypeToken>,
}

impl Namespace {
    fn new(id: NamespaceId, name: String) -> Self {
        Self {
            id,
            name,
            entries: Vec::new(),
            by_key: FxHashMap::default(),
        }
    }

    /// Namespace id
    pub fn id(&self) -> NamespaceId {
        self.id
    }

    /// Namespace name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token registered under `key`
    pub fn get(&self, key: &str) -> Option<TypeToken> {
        self.by_key.get(key).copied()
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = (&str, TypeToken)> {
        self.entries.iter().map(|(key, token)| (key.as_str(), *token))
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the namespace has no types
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, key: String, token: TypeToken) {
        self.by_key.insert(key.clone(), token);
        self.entries.push((key, token));
    }

    fn remove(&mut self, token: TypeToken) {
        self.entries.retain(|(_, t)| *t != token);
        self.by_key.retain(|_, t| *t != token);
    }
}

/// Resolved placement of a type, the union of the four `scopeOf` queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeInfo {
    /// Namespace id
    pub namespace: NamespaceId,
    /// Namespace name
    pub namespace_name: String,
    /// Key of the type inside the namespace
    pub key: String,
    /// The type itself
    pub token: TypeToken,
}

impl ScopeInfo {
    /// `namespace.Key`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.namespace_name, self.key)
    }
}

/// Store for all namespaces of a runtime
#[derive(Debug, Default)]
pub struct PackageRegistry {
    /// Namespaces indexed by id
    namespaces: Vec<Namespace>,
    /// Namespace name to id
    by_name: FxHashMap<String, NamespaceId>,
    /// Reverse index: token to its namespace and key
    index: FxHashMap<TypeToken, (NamespaceId, String)>,
}

impl PackageRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the empty system namespaces
    pub fn with_system_namespaces() -> Self {
        let mut registry = Self::new();
        for name in SYSTEM_NAMESPACES {
            registry.ensure(name);
        }
        registry
    }

    /// Get or create the namespace called `name`
    pub fn ensure(&mut self, name: &str) -> NamespaceId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = NamespaceId(self.namespaces.len() as u32);
        self.namespaces.push(Namespace::new(id, name.to_string()));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Namespace by id
    pub fn get(&self, id: NamespaceId) -> Option<&Namespace> {
        self.namespaces.get(id.0 as usize)
    }

    /// Namespace by name
    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Whether `id` is one of the [`SYSTEM_NAMESPACES`]
    pub fn is_system(&self, id: NamespaceId) -> bool {
        self.get(id)
            .map(|ns| SYSTEM_NAMESPACES.contains(&ns.name()))
            .unwrap_or(false)
    }

    /// Register `token` under `key` in `namespace`.
    ///
    /// Fails with `IllegalOperation` if the token already lives in a
    /// namespace or the key is taken by another token; the registry is
    /// left unchanged in both cases.
    pub fn register(&mut self, namespace: &str, key: &str, token: TypeToken) -> OopsResult<NamespaceId> {
        if let Some((existing, existing_key)) = self.index.get(&token) {
            let existing_name = self.get(*existing).map(|ns| ns.name()).unwrap_or("?");
            tracing::warn!(
                token = token.as_u32(),
                packaged_as = %format!("{}.{}", existing_name, existing_key),
                requested = %format!("{}.{}", namespace, key),
                "type already packaged"
            );
            return Err(OopsError::already_packaged(format!(
                "{}.{}",
                existing_name, existing_key
            )));
        }
        self.check_available(namespace, key)?;

        let id = self.ensure(namespace);
        self.namespaces[id.0 as usize].insert(key.to_string(), token);
        self.index.insert(token, (id, key.to_string()));
        Ok(id)
    }

    /// Fails with `IllegalOperation` if `key` is taken in `namespace`
    pub fn check_available(&self, namespace: &str, key: &str) -> OopsResult<()> {
        match self.namespace(namespace).and_then(|ns| ns.get(key)) {
            Some(_) => Err(OopsError::already_packaged(format!("{}.{}", namespace, key))),
            None => Ok(()),
        }
    }

    /// Move `token` to `key` in `namespace`, whether or not it was packaged
    pub fn reassign(&mut self, token: TypeToken, namespace: &str, key: &str) -> OopsResult<NamespaceId> {
        if let Some((old, _)) = self.index.remove(&token) {
            self.namespaces[old.0 as usize].remove(token);
        }
        self.register(namespace, key, token)
    }

    /// Namespace holding `token`
    pub fn lookup(&self, token: TypeToken) -> Option<NamespaceId> {
        self.index.get(&token).map(|(id, _)| *id)
    }

    /// First namespace, in creation order, with an entry keyed `key`.
    ///
    /// Discovery only: keys are not identities, so the scope guard never
    /// uses this.
    pub fn lookup_by_name(&self, key: &str) -> Option<NamespaceId> {
        self.namespaces
            .iter()
            .find(|ns| ns.get(key).is_some())
            .map(|ns| ns.id())
    }

    /// Key `token` is registered under
    pub fn key_of(&self, token: TypeToken) -> Option<&str> {
        self.index.get(&token).map(|(_, key)| key.as_str())
    }

    /// Full placement of `token`
    pub fn scope_of(&self, token: TypeToken) -> Option<ScopeInfo> {
        let (id, key) = self.index.get(&token)?;
        let ns = self.get(*id)?;
        Some(ScopeInfo {
            namespace: *id,
            namespace_name: ns.name().to_string(),
            key: key.clone(),
            token,
        })
    }

    /// Iterate namespaces in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.iter()
    }
}

/// Namespace an unregistered type should join.
///
/// `ancestry` is the type's own linearized chain, most-derived first. The
/// first ancestor (skipping `token` itself) packaged outside the system
/// namespaces decides, so the declaration order of multiple bases picks
/// the namespace. Returns `None` if `token` is already packaged or no
/// ancestor qualifies.
pub fn assign_namespace(
    token: TypeToken,
    ancestry: &[TypeToken],
    registry: &PackageRegistry,
) -> Option<NamespaceId> {
    if registry.lookup(token).is_some() {
        return None;
    }
    ancestry
        .iter()
        .filter(|ancestor| **ancestor != token)
        .filter_map(|ancestor| registry.lookup(*ancestor))
        .find(|id| !registry.is_system(*id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IllegalReason;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = PackageRegistry::with_system_namespaces();
        let id = registry.register("model", "Element", TypeToken(5)).unwrap();

        assert_eq!(registry.lookup(TypeToken(5)), Some(id));
        assert_eq!(registry.key_of(TypeToken(5)), Some("Element"));
        assert_eq!(registry.lookup_by_name("Element"), Some(id));
        assert_eq!(registry.namespace("model").unwrap().len(), 1);
        assert!(!registry.is_system(id));
        assert!(registry.is_system(registry.namespace("core").unwrap().id()));
    }

    #[test]
    fn test_first_registration_wins() {
        let mut registry = PackageRegistry::new();
        let first = registry.register("model", "Element", TypeToken(5)).unwrap();

        let err = registry.register("event", "Element", TypeToken(5)).unwrap_err();
        assert_eq!(err.illegal_reason(), Some(IllegalReason::AlreadyPackaged));
        assert_eq!(err.to_string(), "model.Element is already packaged.");

        assert_eq!(registry.lookup(TypeToken(5)), Some(first));
        assert!(registry.namespace("event").is_none());
    }

    #[test]
    fn test_key_collision_rejected() {
        let mut registry = PackageRegistry::new();
        registry.register("model", "Element", TypeToken(5)).unwrap();
        assert!(registry.register("model", "Element", TypeToken(6)).is_err());
        assert_eq!(registry.lookup(TypeToken(6)), None);
    }

    #[test]
    fn test_reassign_moves_token() {
        let mut registry = PackageRegistry::new();
        registry.register("model", "Element", TypeToken(5)).unwrap();
        let moved = registry.reassign(TypeToken(5), "event", "Dispatcher").unwrap();

        assert_eq!(registry.lookup(TypeToken(5)), Some(moved));
        assert!(registry.namespace("model").unwrap().is_empty());
        assert_eq!(registry.scope_of(TypeToken(5)).unwrap().qualified(), "event.Dispatcher");
    }

    #[test]
    fn test_assign_namespace_first_packaged_ancestor() {
        let mut registry = PackageRegistry::with_system_namespaces();
        registry.register("core", "Object", TypeToken(0)).unwrap();
        registry.register("model", "Element", TypeToken(5)).unwrap();
        registry.register("event", "Dispatcher", TypeToken(6)).unwrap();

        // Mixed(7) extends Element(5) then Dispatcher(6)
        let ancestry = [TypeToken(7), TypeToken(5), TypeToken(0), TypeToken(6)];
        let assigned = assign_namespace(TypeToken(7), &ancestry, &registry);
        assert_eq!(assigned, registry.lookup(TypeToken(5)));

        let swapped = [TypeToken(7), TypeToken(6), TypeToken(0), TypeToken(5)];
        let assigned = assign_namespace(TypeToken(7), &swapped, &registry);
        assert_eq!(assigned, registry.lookup(TypeToken(6)));
    }

    #[test]
    fn test_assign_namespace_none() {
        let mut registry = PackageRegistry::new();
        registry.register("model", "Element", TypeToken(5)).unwrap();

        assert_eq!(assign_namespace(TypeToken(5), &[TypeToken(5)], &registry), None);
        assert_eq!(assign_namespace(TypeToken(9), &[TypeToken(9), TypeToken(8)], &registry), None);
    }

    #[test]
    fn test_assign_namespace_skips_system() {
        let mut registry = PackageRegistry::with_system_namespaces();
        registry.register("core", "Object", TypeToken(0)).unwrap();
        registry.register("error", "ArgumentError", TypeToken(2)).unwrap();

        assert_eq!(assign_namespace(TypeToken(9), &[TypeToken(9), TypeToken(0)], &registry), None);
        assert_eq!(
            assign_namespace(TypeToken(9), &[TypeToken(9), TypeToken(2), TypeToken(0)], &registry),
            None
        );
    }
}
