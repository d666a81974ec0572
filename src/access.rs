//! Decides whether a sealing type may list a subtype as permitted.
//!
//! Nested types are never permitted. Same-package types always are.
//! Anything else must be a public class declared in the owner's unit.

use std::collections::HashMap;

use crate::diag::Diagnostics;
use crate::pool::{TypeDescriptor, class_path, is_nested, package_of};

pub struct AccessChecker<'a> {
    by_path: HashMap<&'a str, &'a TypeDescriptor>,
    diagnostics: Diagnostics,
}

impl<'a> AccessChecker<'a> {
    pub fn new(
        descriptors: impl IntoIterator<Item = &'a TypeDescriptor>,
        diagnostics: Diagnostics,
    ) -> Self {
        let by_path = descriptors
            .into_iter()
            .map(|d| (d.path.as_str(), d))
            .collect();
        Self {
            by_path,
            diagnostics,
        }
    }

    pub fn is_permittable(&self, owner: &str, candidate: &str, owner_unit: &str) -> bool {
        if is_nested(candidate) {
            return false;
        }
        if package_of(owner) == package_of(candidate) {
            return true;
        }

        let path = class_path(owner_unit, candidate);
        match self.by_path.get(path.as_str()) {
            Some(descriptor) => descriptor.class.is_public(),
            None => {
                self.diagnostics.warn(format_args!(
                    "Entry {candidate} not found in unit {owner_unit}"
                ));
                false
            }
        }
    }

    pub fn all_permittable<'n>(
        &self,
        owner: &str,
        candidates: impl IntoIterator<Item = &'n String>,
        owner_unit: &str,
    ) -> bool {
        candidates
            .into_iter()
            .all(|candidate| self.is_permittable(owner, candidate, owner_unit))
    }
}
