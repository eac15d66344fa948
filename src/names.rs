//! Symbol table interning names to small integer IDs.
//!
//! Every other component refers to devices, ports and keywords by
//! [`NameId`]. IDs are handed out in order of first lookup, starting at 0,
//! and are never recycled.

use std::collections::HashMap;
use std::fmt;

/// Identifier of an interned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameId(pub usize);

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The name table.
#[derive(Debug, Clone, Default)]
pub struct Names {
    strings: Vec<String>,
    ids: HashMap<String, NameId>,
}

impl Names {
    /// Create an empty name table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the IDs of the given strings, interning any that are unseen.
    ///
    /// The result has the same order as the input.
    pub fn lookup<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<NameId> {
        names.iter().map(|name| self.lookup_one(name.as_ref())).collect()
    }

    /// Return the ID of a single string, interning it if unseen.
    pub fn lookup_one(&mut self, name: &str) -> NameId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = NameId(self.strings.len());
        self.strings.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Return the ID of a string without interning it.
    pub fn query(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    /// Return the string for an ID, if the ID has been handed out.
    pub fn get_name_string(&self, id: NameId) -> Option<&str> {
        self.strings.get(id.0).map(String::as_str)
    }

    /// Number of interned names.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
