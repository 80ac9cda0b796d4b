use std::rc::Rc;

use rpds::HashTrieMap;

use crate::{builtins::Builtins, term::TermRef};

#[derive(Debug, Clone)]
pub struct Symbol {
    pub term: TermRef,
    pub arity: usize,
}

/// Named definitions visible to the parser.
///
/// The map is persistent: [`SymbolTable::extended`] yields a private copy
/// that shares everything with its parent and is simply dropped when done.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashTrieMap<Rc<str>, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins(builtins: &Builtins) -> Self {
        builtins
            .entries()
            .into_iter()
            .fold(Self::new(), |table, (name, term, arity)| {
                table.extended(name, term, arity)
            })
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// A copy of this table with `name` bound; `self` is left untouched.
    pub fn extended(&self, name: impl Into<Rc<str>>, term: TermRef, arity: usize) -> Self {
        Self {
            entries: self.entries.insert(name.into(), Symbol { term, arity }),
        }
    }

    /// A copy of this table with `names` unbound, for scopes whose
    /// parameters shadow definitions.
    pub fn without<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Self {
        let mut entries = self.entries.clone();
        for name in names {
            entries.remove_mut(name);
        }
        Self { entries }
    }

    /// Adds a new entry in place. Existing names are never overwritten.
    pub fn define(&mut self, name: impl Into<Rc<str>>, term: TermRef, arity: usize) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.entries.insert_mut(name, Symbol { term, arity });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.size()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by name.
    pub fn sorted(&self) -> Vec<(&str, &Symbol)> {
        let mut v: Vec<_> = self.entries.iter().map(|(k, s)| (&**k, s)).collect();
        v.sort_unstable_by_key(|(k, _)| *k);
        v
    }
}
