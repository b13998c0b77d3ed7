// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Content addressed identities of packages and steps.

use std::collections::BTreeMap;
use std::fmt;

use sha2::{Digest, Sha256};

use crate::environment::Env;

#[cfg(test)]
#[path = "./variant_test.rs"]
mod variant_test;

/// Fixed width content hash identifying a variant.
///
/// Two steps with equal identities produce identical output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantId([u8; 32]);

impl VariantId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First eight hex digits, for display.
    pub fn short(&self) -> String {
        self.to_string()[..8].to_string()
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VariantId({})", self.short())
    }
}

/// Incremental builder of a [`VariantId`].
///
/// Every field is length prefixed so that adjacent fields can never be
/// confused with each other.
pub(crate) struct VariantHasher(Sha256);

impl VariantHasher {
    /// Start a hash in the given domain (e.g. "input" or "step").
    pub fn new(domain: &str) -> Self {
        let mut hasher = Self(Sha256::new());
        hasher.str(domain);
        hasher
    }

    fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.0.update((bytes.len() as u64).to_le_bytes());
        self.0.update(bytes);
        self
    }

    pub fn str(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    pub fn flag(&mut self, value: bool) -> &mut Self {
        self.bytes(&[u8::from(value)])
    }

    pub fn id(&mut self, id: &VariantId) -> &mut Self {
        self.bytes(id.as_bytes())
    }

    /// Hash a mapping independent of its insertion order.
    pub fn env(&mut self, env: &Env) -> &mut Self {
        let mut entries: Vec<_> = env.iter().collect();
        entries.sort();
        self.0.update((entries.len() as u64).to_le_bytes());
        for (key, value) in entries {
            self.str(key).str(value);
        }
        self
    }

    pub fn properties(&mut self, props: &BTreeMap<String, String>) -> &mut Self {
        self.0.update((props.len() as u64).to_le_bytes());
        for (key, value) in props {
            self.str(key).str(value);
        }
        self
    }

    pub fn ids<'a>(&mut self, ids: impl IntoIterator<Item = &'a VariantId>) -> &mut Self {
        let ids: Vec<_> = ids.into_iter().collect();
        self.0.update((ids.len() as u64).to_le_bytes());
        for id in ids {
            self.id(id);
        }
        self
    }

    pub fn finish(&mut self) -> VariantId {
        VariantId(self.0.clone().finalize().into())
    }
}
