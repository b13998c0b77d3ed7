// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Environment mappings and variable substitution.
//!
//! Values may reference other variables with a small shell-like syntax:
//!
//! | Expression          | Result                                             |
//! |---------------------|----------------------------------------------------|
//! | `${VAR}`            | value of `VAR`, error if unset                     |
//! | `${VAR:-default}`   | value of `VAR`, or `default` if unset or empty     |
//! | `${VAR-default}`    | value of `VAR`, or `default` if unset              |
//! | `${VAR:+alternate}` | `alternate` if `VAR` is set and non-empty, else "" |
//! | `${VAR+alternate}`  | `alternate` if `VAR` is set, else ""               |
//! | `$$`                | a literal `$`                                      |
//!
//! Default and alternate words are substituted themselves, but only when
//! they are used.

use indexmap::IndexMap;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./environment_test.rs"]
mod environment_test;

/// An order preserving environment mapping.
pub type Env = IndexMap<String, String>;

/// Substitute all variable references in `text` using `env`.
///
/// `context` names the place the text came from and is only used for
/// error messages.
pub fn substitute(text: &str, env: &Env, context: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];
        if let Some(after) = tail.strip_prefix('$') {
            out.push('$');
            rest = after;
        } else if let Some(body_start) = tail.strip_prefix('{') {
            let end = matching_brace(body_start).ok_or_else(|| Error::BadSubstitution {
                text: text.to_string(),
                context: context.to_string(),
                message: "missing closing '}'".to_string(),
            })?;
            out.push_str(&expand(&body_start[..end], text, env, context)?);
            rest = &body_start[end + 1..];
        } else {
            out.push('$');
            rest = tail;
        }
    }
    out.push_str(rest);

    Ok(out)
}

/// Index of the `}` closing an expression whose body starts at `body`.
fn matching_brace(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn expand(body: &str, text: &str, env: &Env, context: &str) -> Result<String> {
    let name_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    let (name, op) = body.split_at(name_len);
    if name.is_empty() {
        return Err(Error::BadSubstitution {
            text: text.to_string(),
            context: context.to_string(),
            message: "missing variable name".to_string(),
        });
    }

    let value = env.get(name);
    let (use_word, word) = if let Some(word) = op.strip_prefix(":-") {
        (value.is_none_or(|v| v.is_empty()), word)
    } else if let Some(word) = op.strip_prefix('-') {
        (value.is_none(), word)
    } else if let Some(word) = op.strip_prefix(":+") {
        return if value.is_some_and(|v| !v.is_empty()) {
            substitute(word, env, context)
        } else {
            Ok(String::new())
        };
    } else if let Some(word) = op.strip_prefix('+') {
        return if value.is_some() {
            substitute(word, env, context)
        } else {
            Ok(String::new())
        };
    } else if op.is_empty() {
        return value.cloned().ok_or_else(|| Error::UndefinedVariable {
            name: name.to_string(),
            context: context.to_string(),
        });
    } else {
        return Err(Error::BadSubstitution {
            text: text.to_string(),
            context: context.to_string(),
            message: format!("unsupported operator '{op}'"),
        });
    };

    match value {
        Some(v) if !use_word => Ok(v.clone()),
        _ => substitute(word, env, context),
    }
}

/// Truth test of a substituted string: empty and `"0"` are false.
pub fn is_true(value: &str) -> bool {
    !(value.is_empty() || value == "0")
}

/// Evaluate a dependency guard (`if:` expression).
pub fn evaluate_guard(condition: &str, env: &Env, context: &str) -> Result<bool> {
    substitute(condition, env, context).map(|v| is_true(&v))
}

/// Apply `overrides` on top of `base`.
///
/// Overrides are evaluated in declaration order. Each value may reference
/// the base environment and any override declared before it; references to
/// later entries see the base value or fail if there is none.
pub fn resolve_mapping(base: &Env, overrides: &Env, context: &str) -> Result<Env> {
    let mut env = base.clone();
    for (key, value) in overrides {
        let value = substitute(value, &env, &format!("{context}, variable '{key}'"))?;
        env.insert(key.clone(), value);
    }
    Ok(env)
}

/// Substitute every value of `mapping` against `env` without merging.
pub fn substitute_mapping(mapping: &Env, env: &Env, context: &str) -> Result<Env> {
    mapping
        .iter()
        .map(|(key, value)| {
            substitute(value, env, &format!("{context}, variable '{key}'"))
                .map(|v| (key.clone(), v))
        })
        .collect()
}

/// Restrict `env` to the given variable names, skipping unset ones.
pub fn filter<'a>(env: &Env, names: impl IntoIterator<Item = &'a String>) -> Env {
    names
        .into_iter()
        .filter_map(|name| env.get(name).map(|v| (name.clone(), v.clone())))
        .collect()
}
