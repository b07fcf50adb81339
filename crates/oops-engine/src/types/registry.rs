//! Type registry
//!
//! Every constructible type is described once by a [`TypeDef`]: its
//! name, its bases in declaration order, whether it is weak, and the
//! constructor body that declares scoped methods. The registry turns the
//! definition into an immutable [`TypeInfo`] with a precomputed ancestry.

use crate::error::{OopsError, OopsResult};
use crate::runtime::Construct;
use crate::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of a type. Equality is by token, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeToken(pub(crate) u32);

impl TypeToken {
    /// Raw token value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Constructor body of a type
pub type InitFn = Arc<dyn Fn(&mut Construct<'_>) -> OopsResult<()> + Send + Sync>;

/// Maps the arguments of a derived constructor to the arguments of a base
pub type ArgsFn = Arc<dyn Fn(&[Value]) -> Vec<Value> + Send + Sync>;

/// One declared base of a type
#[derive(Clone)]
pub struct BaseSpec {
    /// Base type
    pub token: TypeToken,
    args: Option<ArgsFn>,
}

impl BaseSpec {
    /// Arguments the base constructor receives; the derived arguments are
    /// forwarded unchanged when no mapper was given.
    pub fn map_args(&self, args: &[Value]) -> Vec<Value> {
        match &self.args {
            Some(mapper) => mapper(args),
            None => args.to_vec(),
        }
    }
}

impl fmt::Debug for BaseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseSpec")
            .field("token", &self.token)
            .field("mapped_args", &self.args.is_some())
            .finish()
    }
}

/// Declaration of a type, consumed by [`crate::Runtime::define`]
pub struct TypeDef {
    name: String,
    bases: Vec<BaseSpec>,
    weak: bool,
    init: Option<InitFn>,
    package: Option<(String, String)>,
}

impl TypeDef {
    /// New type called `name`. Without explicit bases the type extends the
    /// builtin `Object` root.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bases: Vec::new(),
            weak: false,
            init: None,
            package: None,
        }
    }

    /// Add a base; its constructor receives the derived arguments unchanged
    pub fn extends(mut self, base: TypeToken) -> Self {
        self.bases.push(BaseSpec {
            token: base,
            args: None,
        });
        self
    }

    /// Add a base whose constructor arguments are computed by `mapper`
    pub fn extends_with<F>(mut self, base: TypeToken, mapper: F) -> Self
    where
        F: Fn(&[Value]) -> Vec<Value> + Send + Sync + 'static,
    {
        self.bases.push(BaseSpec {
            token: base,
            args: Some(Arc::new(mapper)),
        });
        self
    }

    /// Instances of this type get no address and no chain
    pub fn weak(mut self) -> Self {
        self.weak = true;
        self
    }

    /// Constructor body
    pub fn init<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut Construct<'_>) -> OopsResult<()> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(body));
        self
    }

    /// Register the type under `key` in `namespace` at definition time
    pub fn packaged(mut self, namespace: impl Into<String>, key: impl Into<String>) -> Self {
        self.package = Some((namespace.into(), key.into()));
        self
    }

    /// Declared name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn take_package(&mut self) -> Option<(String, String)> {
        self.package.take()
    }
}

/// Registered type metadata
pub struct TypeInfo {
    /// Token of this type
    pub token: TypeToken,
    /// Declared name
    pub name: String,
    /// Direct bases in declaration order
    pub bases: Vec<BaseSpec>,
    /// Weak instances skip addressing
    pub weak: bool,
    /// Linearized ancestry, most-derived first, without duplicates
    pub ancestry: Vec<TypeToken>,
    init: Option<InitFn>,
}

impl TypeInfo {
    /// Constructor body, if any
    pub fn init(&self) -> Option<InitFn> {
        self.init.clone()
    }

    /// Whether the type has no bases
    pub fn is_root(&self) -> bool {
        self.bases.is_empty()
    }

    /// Whether `other` is this type or one of its ancestors
    pub fn inherits(&self, other: TypeToken) -> bool {
        self.ancestry.contains(&other)
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("bases", &self.bases)
            .field("weak", &self.weak)
            .field("ancestry", &self.ancestry)
            .finish()
    }
}

/// Registry of type definitions
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Types indexed by token
    types: Vec<Arc<TypeInfo>>,
    /// Name to the first token defined with it
    name_to_token: FxHashMap<String, TypeToken>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// `implicit_root` is appended as the only base when the definition
    /// names none. Unknown base tokens are rejected.
    pub fn define(&mut self, def: TypeDef, implicit_root: Option<TypeToken>) -> OopsResult<TypeToken> {
        let token = TypeToken(self.types.len() as u32);
        let mut bases = def.bases;
        if bases.is_empty() {
            if let Some(root) = implicit_root {
                bases.push(BaseSpec {
                    token: root,
                    args: None,
                });
            }
        }

        for base in &bases {
            if self.get(base.token).is_none() {
                return Err(OopsError::out_of_range(format!(
                    "base type {} of {}",
                    base.token, def.name
                )));
            }
        }

        let mut ancestry = vec![token];
        for base in &bases {
            for ancestor in &self.types[base.token.0 as usize].ancestry {
                if !ancestry.contains(ancestor) {
                    ancestry.push(*ancestor);
                }
            }
        }

        let info = TypeInfo {
            token,
            name: def.name.clone(),
            bases,
            weak: def.weak,
            ancestry,
            init: def.init,
        };
        self.types.push(Arc::new(info));
        self.name_to_token.entry(def.name).or_insert(token);
        Ok(token)
    }

    /// Type by token
    pub fn get(&self, token: TypeToken) -> Option<Arc<TypeInfo>> {
        self.types.get(token.0 as usize).cloned()
    }

    /// First type defined with `name`
    pub fn get_by_name(&self, name: &str) -> Option<Arc<TypeInfo>> {
        self.name_to_token.get(name).and_then(|token| self.get(*token))
    }

    /// Name of `token`
    pub fn name_of(&self, token: TypeToken) -> Option<&str> {
        self.types.get(token.0 as usize).map(|info| info.name.as_str())
    }

    /// Number of defined types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is defined
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate over all types
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeInfo>> {
        self.types.iter()
    }
}
