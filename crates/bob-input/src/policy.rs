// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Version gated policies.
//!
//! Every policy switches a default behavior in a backward incompatible way.
//! Projects get the legacy behavior unless they either declare a
//! `bobMinimumVersion` at or above the policy's activation version, or set
//! the policy explicitly in `config.yaml`:
//!
//! ```yaml
//! bobMinimumVersion: "0.15"
//! policies:
//!   relativeIncludes: false
//! ```

use serde::Deserialize;

use crate::version::Version;

#[cfg(test)]
#[path = "./policy_test.rs"]
mod policy_test;

/// Known policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Resolve relative include/require paths against the including file.
    RelativeIncludes,
    /// Build and package steps have no network access unless requested.
    OfflineBuild,
    /// The sandbox setting does not influence variant identities.
    SandboxInvariant,
}

impl Policy {
    pub const ALL: [Policy; 3] = [
        Policy::RelativeIncludes,
        Policy::OfflineBuild,
        Policy::SandboxInvariant,
    ];

    /// Name of the policy as written in `config.yaml`.
    pub fn name(self) -> &'static str {
        match self {
            Policy::RelativeIncludes => "relativeIncludes",
            Policy::OfflineBuild => "offlineBuild",
            Policy::SandboxInvariant => "sandboxInvariant",
        }
    }

    /// First version whose projects get the new behavior by default.
    pub fn since(self) -> Version {
        match self {
            Policy::RelativeIncludes => Version::new(&[0, 13]),
            Policy::OfflineBuild => Version::new(&[0, 15]),
            Policy::SandboxInvariant => Version::new(&[0, 15]),
        }
    }
}

/// Explicit policy settings from the `policies` section of `config.yaml`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PolicySettings {
    #[serde(default)]
    pub relative_includes: Option<bool>,
    #[serde(default)]
    pub offline_build: Option<bool>,
    #[serde(default)]
    pub sandbox_invariant: Option<bool>,
}

impl PolicySettings {
    fn get(&self, policy: Policy) -> Option<bool> {
        match policy {
            Policy::RelativeIncludes => self.relative_includes,
            Policy::OfflineBuild => self.offline_build,
            Policy::SandboxInvariant => self.sandbox_invariant,
        }
    }
}

/// The project's policy table: minimum version plus explicit overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicySet {
    minimum_version: Option<Version>,
    settings: PolicySettings,
}

impl PolicySet {
    pub fn new(minimum_version: Option<Version>, settings: PolicySettings) -> Self {
        Self {
            minimum_version,
            settings,
        }
    }

    pub fn minimum_version(&self) -> Option<&Version> {
        self.minimum_version.as_ref()
    }

    /// Whether the policy resolves to its new behavior.
    pub fn is_current(&self, policy: Policy) -> bool {
        match self.settings.get(policy) {
            Some(explicit) => explicit,
            None => self
                .minimum_version
                .as_ref()
                .is_some_and(|v| *v >= policy.since()),
        }
    }

    /// Freeze the table into the behavior record used during resolution.
    pub fn behavior(&self) -> Behavior {
        Behavior {
            relative_includes: self.is_current(Policy::RelativeIncludes),
            offline_build: self.is_current(Policy::OfflineBuild),
            sandbox_invariant: self.is_current(Policy::SandboxInvariant),
        }
    }
}

/// Resolved policy behavior, passed by value to every component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Behavior {
    pub relative_includes: bool,
    pub offline_build: bool,
    pub sandbox_invariant: bool,
}

impl Behavior {
    /// Network access of build and package steps that do not request it.
    pub fn default_net_access(&self) -> bool {
        !self.offline_build
    }

    /// Whether the sandbox setting is part of the variant identity.
    pub fn sandbox_affects_variant(&self) -> bool {
        !self.sandbox_invariant
    }
}
