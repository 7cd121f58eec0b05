//! Cache key layout.
//!
//! `veil:<scope>:f:<category>:<lookup key>` for forward entries and
//! `veil:<scope>:t:<substitute>` for the reverse index. Scope and category are
//! percent-escaped so a `:` inside them cannot bleed into a neighbouring scope.

use veil_core::constants::CACHE_KEY_PREFIX;
use veil_core::models::{Category, ScopeId};

fn escape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(c),
        }
    }
    out
}

/// Every key of `scope` starts with this.
pub fn scope_prefix(scope: &ScopeId) -> String {
    format!("{CACHE_KEY_PREFIX}:{}:", escape(scope.as_str()))
}

pub fn forward_key(scope: &ScopeId, category: &Category, lookup_key: &str) -> String {
    format!(
        "{}f:{}:{lookup_key}",
        scope_prefix(scope),
        escape(category.as_str())
    )
}

pub fn token_key(scope: &ScopeId, substitute: &str) -> String {
    format!("{}t:{substitute}", scope_prefix(scope))
}

/// Glob pattern matching every key of `scope`, for `SCAN MATCH`.
pub fn scope_pattern(scope: &ScopeId) -> String {
    let mut pattern = String::new();
    for c in scope_prefix(scope).chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}
