// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Source code management descriptors of checkout steps.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::Result;
use crate::environment::{Env, substitute};

#[cfg(test)]
#[path = "./scm_test.rs"]
mod scm_test;

/// One source checked out by a checkout step.
///
/// All string properties may reference environment variables; they are
/// substituted when the owning package is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "scm", rename_all = "lowercase", deny_unknown_fields)]
pub enum Scm {
    Git {
        url: String,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default)]
        tag: Option<String>,
        #[serde(default)]
        commit: Option<String>,
        #[serde(default)]
        dir: Option<String>,
    },
    Svn {
        url: String,
        #[serde(default)]
        revision: Option<String>,
        #[serde(default)]
        dir: Option<String>,
    },
    Cvs {
        cvsroot: String,
        module: String,
        #[serde(default)]
        rev: Option<String>,
        #[serde(default)]
        dir: Option<String>,
    },
    Url {
        url: String,
        #[serde(default, rename = "fileName")]
        file_name: Option<String>,
        #[serde(default, rename = "digestSHA1")]
        digest_sha1: Option<String>,
        #[serde(default)]
        dir: Option<String>,
    },
}

impl Scm {
    /// Kind of the SCM as written in recipes.
    pub fn kind(&self) -> &'static str {
        match self {
            Scm::Git { .. } => "git",
            Scm::Svn { .. } => "svn",
            Scm::Cvs { .. } => "cvs",
            Scm::Url { .. } => "url",
        }
    }

    /// Directory inside the checkout workspace, `.` when not given.
    pub fn dir(&self) -> &str {
        let dir = match self {
            Scm::Git { dir, .. } | Scm::Svn { dir, .. } | Scm::Cvs { dir, .. } | Scm::Url { dir, .. } => {
                dir
            }
        };
        dir.as_deref().unwrap_or(".")
    }

    /// Flat view of all set properties, including `scm` and `dir`.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("scm".to_string(), self.kind().to_string());
        props.insert("dir".to_string(), self.dir().to_string());
        let mut set = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                props.insert(key.to_string(), v.clone());
            }
        };
        match self {
            Scm::Git {
                url,
                branch,
                tag,
                commit,
                ..
            } => {
                set("url", &Some(url.clone()));
                set("branch", branch);
                set("tag", tag);
                set("commit", commit);
            }
            Scm::Svn { url, revision, .. } => {
                set("url", &Some(url.clone()));
                set("revision", revision);
            }
            Scm::Cvs {
                cvsroot,
                module,
                rev,
                ..
            } => {
                set("cvsroot", &Some(cvsroot.clone()));
                set("module", &Some(module.clone()));
                set("rev", rev);
            }
            Scm::Url {
                url,
                file_name,
                digest_sha1,
                ..
            } => {
                set("url", &Some(url.clone()));
                set("fileName", &Some(file_name.clone().unwrap_or_else(|| url_file_name(url))));
                set("digestSHA1", digest_sha1);
            }
        }
        props
    }

    /// Substitute all string properties against `env`.
    pub fn substitute(&self, env: &Env, context: &str) -> Result<Scm> {
        let s = |v: &String| substitute(v, env, context);
        let o = |v: &Option<String>| v.as_ref().map(|v| substitute(v, env, context)).transpose();
        Ok(match self {
            Scm::Git {
                url,
                branch,
                tag,
                commit,
                dir,
            } => Scm::Git {
                url: s(url)?,
                branch: o(branch)?,
                tag: o(tag)?,
                commit: o(commit)?,
                dir: o(dir)?,
            },
            Scm::Svn { url, revision, dir } => Scm::Svn {
                url: s(url)?,
                revision: o(revision)?,
                dir: o(dir)?,
            },
            Scm::Cvs {
                cvsroot,
                module,
                rev,
                dir,
            } => Scm::Cvs {
                cvsroot: s(cvsroot)?,
                module: s(module)?,
                rev: o(rev)?,
                dir: o(dir)?,
            },
            Scm::Url {
                url,
                file_name,
                digest_sha1,
                dir,
            } => Scm::Url {
                url: s(url)?,
                file_name: o(file_name)?,
                digest_sha1: o(digest_sha1)?,
                dir: o(dir)?,
            },
        })
    }
}

/// Last path segment of a URL.
fn url_file_name(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}
