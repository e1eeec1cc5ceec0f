use std::collections::BTreeMap;

use crate::lang::ast::Identifier;

/// Flat, program lifetime variable table
///
/// The language has no blocks or functions, so a single scope is all there is. Entries are
/// created or overwritten by assignment and never removed.
pub struct Variables<T> {
    inner: BTreeMap<Identifier, T>,
}

impl<T> Variables<T> {
    pub fn new() -> Self {
        Variables {
            inner: BTreeMap::default(),
        }
    }

    pub fn get(&self, ident: &Identifier) -> Option<&T> {
        self.inner.get(ident)
    }

    pub fn insert(&mut self, ident: Identifier, val: T) {
        self.inner.insert(ident, val);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &T)> {
        self.inner.iter()
    }
}

impl<T> Default for Variables<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn test_insert_overwrite() {
    let mut vars = Variables::new();
    assert!(vars.is_empty());
    assert_eq!(vars.get(&Identifier("x".to_string())), None);

    vars.insert(Identifier("x".to_string()), 1);
    vars.insert(Identifier("a".to_string()), 2);
    vars.insert(Identifier("x".to_string()), 3);

    assert_eq!(vars.len(), 2);
    assert_eq!(vars.get(&Identifier("x".to_string())), Some(&3));

    let names: Vec<String> = vars.iter().map(|(ident, _)| ident.to_string()).collect();
    assert_eq!(names, vec!["a", "x"]);
}
