//! `%NAME%` variable expansion for expandable strings.
//!
//! The store keeps expandable strings exactly as written. Readers expand
//! them against an [`Environment`], usually through
//! [`ConfigStore::get_expanded`](super::ConfigStore::get_expanded).
//!
//! Rules:
//!
//! - `%NAME%` is replaced with the variable's value.
//! - A reference to an unknown variable is left as written.
//! - `%%` is left as a literal pair of percent signs.
//! - A `%` without a closing `%` is left as written.

use std::collections::HashMap;

/// A source of variables for expansion.
pub trait Environment {
    /// Look up a variable.
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed set of variables. Names match case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, builder-style.
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.vars.insert(name.as_ref().to_lowercase(), value.into());
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(&name.to_lowercase()).cloned()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut env = Self::new();
        for (name, value) in iter {
            env.set(name, value);
        }
        env
    }
}

/// Expand every `%NAME%` reference in `input`.
pub fn expand(input: &str, env: &dyn Environment) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('%') {
        out.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        let Some(close) = after_open.find('%') else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after_open[..close];
        match (name.is_empty(), env.var(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => {
                out.push('%');
                out.push_str(name);
                out.push('%');
            }
        }
        rest = &after_open[close + 1..];
    }

    out.push_str(rest);
    out
}
