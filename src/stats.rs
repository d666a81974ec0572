use serde::Serialize;
use std::ops::{Add, AddAssign};

use crate::diag::Diagnostics;

/// Counters gathered while classifying one corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub total: u64,
    pub no_subtypes: u64,
    pub became_final: u64,
    pub with_subtypes: u64,
    pub not_yet_sealed: u64,
    pub sealed: u64,
}

impl Stats {
    pub fn lines(&self) -> [(&'static str, u64); 6] {
        [
            ("#Classes/interfaces found", self.total),
            ("#Classes without subclasses", self.no_subtypes),
            ("#Classes not already final", self.became_final),
            ("#Classes/interfaces with subclasses", self.with_subtypes),
            ("#Classes/interfaces not already sealed", self.not_yet_sealed),
            (
                "#Classes/interfaces with only local subclasses",
                self.sealed,
            ),
        ]
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (label, value) in self.lines() {
            out.push_str(&format!("{label}: {value}\n"));
        }
        out
    }

    pub fn report(&self, diagnostics: &Diagnostics) {
        for (label, value) in self.lines() {
            diagnostics.info(format_args!("{label}: {value}"));
        }
    }
}

impl AddAssign for Stats {
    fn add_assign(&mut self, other: Self) {
        self.total += other.total;
        self.no_subtypes += other.no_subtypes;
        self.became_final += other.became_final;
        self.with_subtypes += other.with_subtypes;
        self.not_yet_sealed += other.not_yet_sealed;
        self.sealed += other.sealed;
    }
}

impl Add for Stats {
    type Output = Self;

    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}
