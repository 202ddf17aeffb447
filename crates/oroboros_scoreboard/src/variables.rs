//! # Render Strategies
//!
//! Extension points injected into a board at construction:
//!
//! - [`UpdateHook`]: runs first in every render cycle and may rewrite rows
//! - [`VariableResolver`]: substitutes dynamic placeholders in each row
//!
//! Both report failure through [`RenderError`], which stops the board.
//! Closures implement both traits.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RenderError;
use crate::rows::RowStore;

/// Substitutes dynamic values into a template row.
///
/// Runs once per row per frame. The result is shared by every viewer of
/// the board, so it must not depend on who is watching.
pub trait VariableResolver: Send {
    /// Resolves placeholders in `row`.
    ///
    /// # Errors
    ///
    /// Any error aborts the frame and stops the board.
    fn resolve<'a>(&self, row: &'a str) -> Result<Cow<'a, str>, RenderError>;
}

/// Runs at the start of every render cycle.
pub trait UpdateHook: Send {
    /// Called once per tick before rows are rendered.
    ///
    /// # Errors
    ///
    /// Any error aborts the frame and stops the board.
    fn on_update(&mut self, rows: &mut RowStore) -> Result<(), RenderError>;
}

/// Resolver that returns rows unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityResolver;

impl VariableResolver for IdentityResolver {
    #[inline]
    fn resolve<'a>(&self, row: &'a str) -> Result<Cow<'a, str>, RenderError> {
        Ok(Cow::Borrowed(row))
    }
}

impl<F> VariableResolver for F
where
    F: Fn(&str) -> Result<String, RenderError> + Send,
{
    fn resolve<'a>(&self, row: &'a str) -> Result<Cow<'a, str>, RenderError> {
        self(row).map(Cow::Owned)
    }
}

/// Hook that does nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHook;

impl UpdateHook for NoopHook {
    #[inline]
    fn on_update(&mut self, _rows: &mut RowStore) -> Result<(), RenderError> {
        Ok(())
    }
}

impl<F> UpdateHook for F
where
    F: FnMut(&mut RowStore) -> Result<(), RenderError> + Send,
{
    fn on_update(&mut self, rows: &mut RowStore) -> Result<(), RenderError> {
        self(rows)
    }
}

/// `{name}` placeholder resolver backed by a shared value map.
///
/// Clones share the same map, so the host keeps one clone to publish
/// values while the board renders with another.
///
/// ```rust,ignore
/// let vars = PlaceholderResolver::new();
/// vars.set("online", "12");
/// // "Players: {online}" renders as "Players: 12"
/// ```
#[derive(Clone, Debug, Default)]
pub struct PlaceholderResolver {
    values: Arc<RwLock<HashMap<String, String>>>,
    strict: bool,
}

impl PlaceholderResolver {
    /// Creates a resolver that leaves unknown placeholders in place.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes unknown placeholders a render failure.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Publishes a value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(name.into(), value.into());
    }

    /// Withdraws a value.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.values.write().remove(name)
    }

    /// Current value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }
}

impl VariableResolver for PlaceholderResolver {
    fn resolve<'a>(&self, row: &'a str) -> Result<Cow<'a, str>, RenderError> {
        if !row.contains('{') {
            return Ok(Cow::Borrowed(row));
        }

        let values = self.values.read();
        let mut out = String::with_capacity(row.len());
        let mut rest = row;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                rest = "";
                break;
            };

            let name = &after[..close];
            match values.get(name) {
                Some(value) => out.push_str(value),
                None if self.strict => {
                    return Err(RenderError::Variable {
                        row: row.to_owned(),
                        reason: format!("unknown placeholder {{{name}}}"),
                    });
                }
                None => out.push_str(&rest[open..=open + 1 + close]),
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        Ok(Cow::Owned(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let out = IdentityResolver.resolve("Players: {online}").unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(out, "Players: {online}");
    }

    #[test]
    fn test_placeholders() {
        let vars = PlaceholderResolver::new();
        vars.set("online", "12");
        vars.set("max", "64");

        assert_eq!(vars.resolve("Players: {online}/{max}").unwrap(), "Players: 12/64");
        assert_eq!(vars.resolve("No vars").unwrap(), "No vars");
        assert_eq!(vars.resolve("Keep {unknown} as is").unwrap(), "Keep {unknown} as is");
        assert_eq!(vars.resolve("Open {brace").unwrap(), "Open {brace");
    }

    #[test]
    fn test_clones_share_values() {
        let host = PlaceholderResolver::new();
        let board = host.clone();
        host.set("map", "Arena");
        assert_eq!(board.resolve("Map: {map}").unwrap(), "Map: Arena");
        assert_eq!(host.remove("map").as_deref(), Some("Arena"));
        assert_eq!(board.get("map"), None);
    }

    #[test]
    fn test_strict_unknown_fails() {
        let vars = PlaceholderResolver::new().strict();
        let err = vars.resolve("Kills: {kills}").unwrap_err();
        assert!(matches!(err, RenderError::Variable { .. }));
    }

    #[test]
    fn test_closure_strategies() {
        let upper = |row: &str| -> Result<String, RenderError> { Ok(row.to_uppercase()) };
        assert_eq!(upper.resolve("mode: solo").unwrap(), "MODE: SOLO");

        let mut ticks = 0u32;
        let mut hook = move |rows: &mut RowStore| -> Result<(), RenderError> {
            ticks += 1;
            rows.clear();
            rows.add_row(format!("Tick: {ticks}"));
            Ok(())
        };
        let mut rows = RowStore::new();
        hook.on_update(&mut rows).unwrap();
        hook.on_update(&mut rows).unwrap();
        assert_eq!(rows.as_slice(), ["Tick: 2"]);
    }
}
