//! Interned names.
//!
//! The parser interns every name it reads (types, fields, arguments,
//! directives, variables) and the AST carries the [`Text`] handle. Lowering
//! resolves handles back to owned strings, so an interner lives exactly as
//! long as one document's parse.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use std::cell::RefCell;

/// Handle to a name in an [`Interner`]. Handles are dense and numbered in
/// first-seen order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Text(u32);

impl Text {
    #[allow(clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Deduplicating name store for one document.
#[derive(Debug, Default)]
pub struct Interner {
    names: RefCell<IndexSet<Box<str>, FxBuildHasher>>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&self, name: &str) -> Text {
        let mut names = self.names.borrow_mut();
        if let Some(index) = names.get_index_of(name) {
            return Text::from_index(index);
        }
        let (index, _) = names.insert_full(Box::from(name));
        Text::from_index(index)
    }

    /// The name behind `text`. A handle from another interner that is out
    /// of range resolves to the empty string.
    #[must_use]
    pub fn get(&self, text: Text) -> String {
        self.names
            .borrow()
            .get_index(text.index())
            .map(|name| name.to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let interner = Interner::new();
        let user = interner.intern("User");
        let query = interner.intern("Query");

        assert_eq!(interner.intern("User"), user);
        assert_ne!(user, query);
        assert!(user < query);
    }

    #[test]
    fn test_get_round_trips_names() {
        let interner = Interner::new();
        let name = interner.intern("__typename");
        assert_eq!(interner.get(name), "__typename");
    }

    #[test]
    fn test_foreign_handle_is_empty() {
        let other = Interner::new();
        other.intern("a");
        let b = other.intern("b");

        let interner = Interner::new();
        assert_eq!(interner.get(b), "");
    }
}
