//! Resource registry and name selectors.
//!
//! A [`Catalog`] is the ordered registry a scheduling run resolves selectors
//! against. Selectors are logical-name patterns: an exact name, or a prefix
//! with a trailing `*`. A wildcard selection captures the matched value onto
//! the selection result — which is why the dependency graph substitutes
//! registered instances for raw dependency references instead of deriving
//! fresh ones.

use indexmap::IndexMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, TabflowError};
use crate::resource::{ResourceHandle, TabularResource};

/// A logical-name pattern: exact, or prefix + trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector(String);

impl Selector {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn pattern(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.ends_with('*')
    }

    /// The part of `name` matched by a trailing wildcard, when this selector
    /// matches at all.
    pub fn capture<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self.0.strip_suffix('*') {
            Some(prefix) => name.strip_prefix(prefix),
            None => (self.0 == name).then_some(""),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.capture(name).is_some()
    }
}

/// One resource matched by a selector, with the captured wildcard value.
#[derive(Clone)]
pub struct Selection {
    pub resource: ResourceHandle,
    /// What the `*` matched; empty for an exact selector.
    pub captured: String,
}

impl std::fmt::Debug for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selection")
            .field("resource", &self.resource.logical_name())
            .field("captured", &self.captured)
            .finish()
    }
}

/// Ordered, shared registry of resources keyed by logical name.
#[derive(Clone, Default)]
pub struct Catalog {
    inner: Arc<RwLock<IndexMap<String, ResourceHandle>>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under its logical name. Replaces a same-named
    /// entry.
    pub fn register(&self, resource: ResourceHandle) {
        let name = resource.logical_name().to_string();
        self.inner.write().unwrap().insert(name, resource);
    }

    pub fn get(&self, name: &str) -> Option<ResourceHandle> {
        self.inner.read().unwrap().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.inner.read().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap().is_empty()
    }

    /// Resources matching `selector`, in registration order.
    ///
    /// With `strict` set, a selector matching nothing is an error.
    pub fn select(&self, selector: &Selector, strict: bool) -> Result<Vec<Selection>> {
        let matched: Vec<Selection> = self
            .inner
            .read()
            .unwrap()
            .iter()
            .filter(|(name, _)| selector.matches(name))
            .map(|(name, resource)| Selection {
                resource: resource.clone(),
                captured: selector.capture(name).unwrap_or_default().to_string(),
            })
            .collect();
        if strict && matched.is_empty() {
            return Err(TabflowError::EmptySelection {
                selector: selector.pattern().to_string(),
            });
        }
        Ok(matched)
    }

    /// Resolve several selectors, concatenating matches in selector order.
    pub fn select_all(&self, selectors: &[Selector], strict: bool) -> Result<Vec<Selection>> {
        let mut out = Vec::new();
        for selector in selectors {
            out.extend(self.select(selector, strict)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTable;
    use crate::resource::TabularResource;
    use crate::schema::Schema;
    use crate::TabflowError;

    fn catalog() -> Catalog {
        let c = Catalog::new();
        c.register(MemoryTable::new("sales_2024", Schema::empty()).into_handle());
        c.register(MemoryTable::new("sales_2025", Schema::empty()).into_handle());
        c.register(MemoryTable::new("customers", Schema::empty()).into_handle());
        c
    }

    #[test]
    fn exact_selector_matches_one() {
        let matched = catalog().select(&Selector::new("customers"), true).unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].resource.logical_name(), "customers");
        assert_eq!(matched[0].captured, "");
    }

    #[test]
    fn wildcard_selector_captures_the_matched_tail() {
        let matched = catalog().select(&Selector::new("sales_*"), true).unwrap();
        let captured: Vec<&str> = matched.iter().map(|s| s.captured.as_str()).collect();
        assert_eq!(captured, vec!["2024", "2025"]);
    }

    #[test]
    fn strict_selection_errors_on_no_match() {
        let err = catalog().select(&Selector::new("ghost_*"), true).unwrap_err();
        assert!(matches!(err, TabflowError::EmptySelection { .. }));
    }

    #[test]
    fn relaxed_selection_returns_the_empty_set() {
        let matched = catalog().select(&Selector::new("ghost_*"), false).unwrap();
        assert!(matched.is_empty());
    }
}
