//! Name atomization.
//!
//! Every element, attribute, prefix and namespace name a reader hands out is
//! interned in a [`NameTable`]. Two [`Atom`]s for the same text obtained from the
//! same table share one allocation, so hot comparisons (`node.local_name() ==
//! names.entry`) usually resolve with a single pointer check.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// An interned string owned by a [`NameTable`].
#[derive(Clone)]
pub struct Atom(Rc<str>);

impl Atom {
    /// Returns true if both atoms are the same interned instance.
    pub fn ptr_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Atom {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Atom {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Atom {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Atom) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for Atom {}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Atom {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Interning table for XML names.
///
/// A table lives as long as the token source that owns it; atoms handed out by
/// one table are never compared by identity against atoms of another.
#[derive(Debug, Default)]
pub struct NameTable {
    names: HashSet<Atom>,
    empty: Option<Atom>,
}

impl NameTable {
    pub fn new() -> Self {
        let mut table = Self::default();
        table.empty = Some(table.add(""));
        table
    }

    /// Interns `name`, returning the canonical atom for it.
    pub fn add(&mut self, name: &str) -> Atom {
        if let Some(existing) = self.names.get(name) {
            return existing.clone();
        }
        let atom = Atom(Rc::from(name));
        self.names.insert(atom.clone());
        atom
    }

    /// Looks up an already interned name without adding it.
    pub fn get(&self, name: &str) -> Option<Atom> {
        self.names.get(name).cloned()
    }

    /// The atom for the empty string.
    pub fn empty(&mut self) -> Atom {
        match &self.empty {
            Some(atom) => atom.clone(),
            None => {
                let atom = self.add("");
                self.empty = Some(atom.clone());
                atom
            }
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_returns_same_instance() {
        let mut table = NameTable::new();
        let a = table.add("entry");
        let b = table.add(&String::from("entry"));
        assert!(a.ptr_eq(&b));
        assert_eq!(a, "entry");
    }

    #[test]
    fn test_distinct_names() {
        let mut table = NameTable::new();
        let a = table.add("feed");
        let b = table.add("entry");
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, b);
        // "" plus the two names
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_get_does_not_insert() {
        let mut table = NameTable::new();
        assert!(table.get("link").is_none());
        let link = table.add("link");
        assert!(table.get("link").unwrap().ptr_eq(&link));
    }

    #[test]
    fn test_atoms_from_different_tables_compare_by_value() {
        let mut first = NameTable::new();
        let mut second = NameTable::new();
        let a = first.add("title");
        let b = second.add("title");
        assert!(!a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_atom() {
        let mut table = NameTable::new();
        let e1 = table.empty();
        let e2 = table.add("");
        assert!(e1.ptr_eq(&e2));
    }
}
