//! Per-address inheritance chains

use super::address::Address;
use crate::error::{OopsError, OopsResult};
use crate::types::TypeToken;
use rustc_hash::FxHashMap;

/// Ordered, duplicate-free list of the types that built one instance,
/// most-derived first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain(Vec<TypeToken>);

impl Chain {
    /// Build a chain, dropping repeated tokens after their first appearance
    pub fn from_tokens(tokens: &[TypeToken]) -> Self {
        let mut chain = Chain(Vec::with_capacity(tokens.len()));
        chain.merge(tokens);
        chain
    }

    /// Append tokens not yet present, keeping first-appearance order.
    /// Returns how many were appended.
    pub fn merge(&mut self, tokens: &[TypeToken]) -> usize {
        let before = self.0.len();
        for token in tokens {
            if !self.0.contains(token) {
                self.0.push(*token);
            }
        }
        self.0.len() - before
    }

    /// Whether `token` contributed to the instance
    pub fn contains(&self, token: TypeToken) -> bool {
        self.0.contains(&token)
    }

    /// The most-derived type
    pub fn most_derived(&self) -> Option<TypeToken> {
        self.0.first().copied()
    }

    /// Tokens as a slice
    pub fn as_slice(&self) -> &[TypeToken] {
        &self.0
    }

    /// Iterate tokens
    pub fn iter(&self) -> impl Iterator<Item = &TypeToken> {
        self.0.iter()
    }

    /// Number of tokens
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Chains of all live instances, keyed by address
#[derive(Debug, Default)]
pub struct ChainRegistry {
    chains: FxHashMap<Address, Chain>,
}

impl ChainRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `chain` with `address`, replacing any previous chain
    pub fn store_chain(&mut self, address: Address, chain: Chain) {
        self.chains.insert(address, chain);
    }

    /// Append `tokens` not yet recorded for `address`.
    ///
    /// Fails with `IllegalOperation` if the address has been disposed.
    pub fn merge_into_chain(&mut self, address: Address, tokens: &[TypeToken]) -> OopsResult<usize> {
        match self.chains.get_mut(&address) {
            Some(chain) => Ok(chain.merge(tokens)),
            None => Err(OopsError::disposed(format!("@{}", address))),
        }
    }

    /// Chain of `address`; `None` once disposed
    pub fn chain_of(&self, address: Address) -> Option<&Chain> {
        self.chains.get(&address)
    }

    /// Remove the chain of `address`. Returns `false` (and changes
    /// nothing) if it was already gone.
    pub fn dispose(&mut self, address: Address) -> bool {
        self.chains.remove(&address).is_some()
    }

    /// Remove every chain, returning how many were removed
    pub fn dispose_all(&mut self) -> usize {
        let count = self.chains.len();
        self.chains.clear();
        count
    }

    /// Number of live chains
    pub fn num_addresses(&self) -> usize {
        self.chains.len()
    }
}
