//! Distribution unit membership: unit name to the types it declares.

use crate::multimap::NameMultimap;
use crate::pool::TypeDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitIndex {
    members: NameMultimap,
}

impl UnitIndex {
    pub fn build<'a>(descriptors: impl IntoIterator<Item = &'a TypeDescriptor>) -> Self {
        let mut members = NameMultimap::new();
        for descriptor in descriptors {
            members.insert(&descriptor.unit, &descriptor.name);
        }
        Self { members }
    }

    pub fn declares_all<'a>(&self, unit: &str, names: impl IntoIterator<Item = &'a String>) -> bool {
        self.members.contains_all(unit, names)
    }
}
