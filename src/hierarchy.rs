//! Inverted inheritance graph: type name to its direct subtypes.

use std::collections::BTreeSet;

use crate::multimap::NameMultimap;
use crate::pool::TypeDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtypeIndex {
    subtypes: NameMultimap,
}

impl SubtypeIndex {
    /// Registers every type under its superclass and each interface it
    /// implements. Names outside the corpus become keys nobody asks for.
    pub fn build<'a>(descriptors: impl IntoIterator<Item = &'a TypeDescriptor>) -> Self {
        let mut subtypes = NameMultimap::new();
        for descriptor in descriptors {
            if let Some(super_name) = descriptor.class.super_name.as_deref() {
                subtypes.insert(super_name, &descriptor.name);
            }
            for interface in &descriptor.class.interfaces {
                subtypes.insert(interface, &descriptor.name);
            }
        }
        Self { subtypes }
    }

    pub fn subtypes_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.subtypes.get(name)
    }
}
