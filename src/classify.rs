//! Per-type decision: mark final, seal, or leave alone.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::access::AccessChecker;
use crate::config::SealConfig;
use crate::hierarchy::SubtypeIndex;
use crate::pool::TypeDescriptor;
use crate::stats::Stats;
use crate::units::UnitIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "subtypes", rename_all = "snake_case")]
pub enum Decision {
    NoOp,
    MarkFinal,
    Seal(BTreeSet<String>),
}

impl Decision {
    pub fn is_no_op(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("unchanged"),
            Self::MarkFinal => f.write_str("final"),
            Self::Seal(subtypes) => {
                let names: Vec<&str> = subtypes.iter().map(String::as_str).collect();
                write!(f, "sealed to [{}]", names.join(", "))
            }
        }
    }
}

/// Read-only view over one run's indexes.
pub struct Classifier<'a> {
    subtypes: &'a SubtypeIndex,
    units: &'a UnitIndex,
    access: &'a AccessChecker<'a>,
    config: &'a SealConfig,
}

impl<'a> Classifier<'a> {
    pub fn new(
        subtypes: &'a SubtypeIndex,
        units: &'a UnitIndex,
        access: &'a AccessChecker<'a>,
        config: &'a SealConfig,
    ) -> Self {
        Self {
            subtypes,
            units,
            access,
            config,
        }
    }

    pub fn classify(&self, descriptor: &TypeDescriptor, stats: &mut Stats) -> Decision {
        if !self.config.unit_filter.accepts(&descriptor.unit) {
            return Decision::NoOp;
        }
        stats.total += 1;

        match self.subtypes.subtypes_of(&descriptor.name) {
            Some(subtypes) if !subtypes.is_empty() => {
                self.classify_with_subtypes(descriptor, subtypes, stats)
            }
            _ => self.classify_leaf(descriptor, stats),
        }
    }

    fn classify_leaf(&self, descriptor: &TypeDescriptor, stats: &mut Stats) -> Decision {
        stats.no_subtypes += 1;
        let class = &descriptor.class;
        if class.is_interface() || class.is_final() || !self.config.enable_final {
            return Decision::NoOp;
        }

        self.config
            .diagnostics
            .debug(format_args!("Marking {} as final", descriptor.name));
        stats.became_final += 1;
        Decision::MarkFinal
    }

    fn classify_with_subtypes(
        &self,
        descriptor: &TypeDescriptor,
        subtypes: &BTreeSet<String>,
        stats: &mut Stats,
    ) -> Decision {
        stats.with_subtypes += 1;
        if descriptor.class.is_sealed() {
            return Decision::NoOp;
        }
        stats.not_yet_sealed += 1;

        let unit = descriptor.unit.as_str();
        let local = self.units.declares_all(unit, subtypes)
            && self.access.all_permittable(&descriptor.name, subtypes, unit);
        if !local || !self.config.enable_seal {
            return Decision::NoOp;
        }

        let decision = Decision::Seal(subtypes.clone());
        self.config
            .diagnostics
            .debug(format_args!("Sealing {}: {decision}", descriptor.name));
        stats.sealed += 1;
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitFilter;
    use crate::fixtures::{ClassBuilder, descriptor};

    struct Run {
        corpus: Vec<TypeDescriptor>,
        config: SealConfig,
    }

    impl Run {
        fn new(corpus: Vec<TypeDescriptor>) -> Self {
            Self {
                corpus,
                config: SealConfig::default(),
            }
        }

        fn decide(&self, name: &str) -> (Decision, Stats) {
            let subtypes = SubtypeIndex::build(&self.corpus);
            let units = UnitIndex::build(&self.corpus);
            let access = AccessChecker::new(&self.corpus, self.config.diagnostics);
            let classifier = Classifier::new(&subtypes, &units, &access, &self.config);
            let target = self
                .corpus
                .iter()
                .find(|d| d.name == name)
                .expect("type in corpus");
            let mut stats = Stats::default();
            let decision = classifier.classify(target, &mut stats);
            (decision, stats)
        }
    }

    fn seal(names: &[&str]) -> Decision {
        Decision::Seal(names.iter().map(|n| n.to_string()).collect())
    }

    fn abcd(unit_of_c: &str) -> Vec<TypeDescriptor> {
        vec![
            descriptor("U", &ClassBuilder::new("p/A")),
            descriptor("U", &ClassBuilder::new("p/B").extends("p/A")),
            descriptor(unit_of_c, &ClassBuilder::new("p/C").extends("p/A")),
            descriptor("U", &ClassBuilder::new("p/D").extends("p/C")),
        ]
    }

    #[test]
    fn single_unit_hierarchy_is_finalized_and_sealed() {
        let run = Run::new(abcd("U"));
        assert_eq!(run.decide("p/D").0, Decision::MarkFinal);
        assert_eq!(run.decide("p/B").0, Decision::MarkFinal);
        assert_eq!(run.decide("p/C").0, seal(&["p/D"]));
        assert_eq!(run.decide("p/A").0, seal(&["p/B", "p/C"]));
    }

    #[test]
    fn subtype_in_another_unit_blocks_sealing() {
        let run = Run::new(abcd("V"));
        assert_eq!(run.decide("p/A").0, Decision::NoOp);
        assert_eq!(run.decide("p/B").0, Decision::MarkFinal);
        // D lives in U while C lives in V
        assert_eq!(run.decide("p/C").0, Decision::NoOp);
        assert_eq!(run.decide("p/D").0, Decision::MarkFinal);
    }

    #[test]
    fn interfaces_are_never_marked_final() {
        let run = Run::new(vec![descriptor("U", &ClassBuilder::new("p/I").interface())]);
        let (decision, stats) = run.decide("p/I");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats.no_subtypes, 1);
        assert_eq!(stats.became_final, 0);
    }

    #[test]
    fn interfaces_with_local_implementations_are_sealed() {
        let run = Run::new(vec![
            descriptor("U", &ClassBuilder::new("p/I").interface()),
            descriptor("U", &ClassBuilder::new("p/Impl").implements("p/I")),
        ]);
        assert_eq!(run.decide("p/I").0, seal(&["p/Impl"]));
    }

    #[test]
    fn already_final_types_are_left_alone() {
        let run = Run::new(vec![descriptor("U", &ClassBuilder::new("p/A").final_())]);
        let (decision, stats) = run.decide("p/A");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats.total, 1);
        assert_eq!(stats.no_subtypes, 1);
    }

    #[test]
    fn existing_permitted_list_is_never_overwritten() {
        let run = Run::new(vec![
            descriptor("U", &ClassBuilder::new("p/A").permits(&["p/Old"])),
            descriptor("U", &ClassBuilder::new("p/B").extends("p/A")),
        ]);
        let (decision, stats) = run.decide("p/A");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats.with_subtypes, 1);
        assert_eq!(stats.not_yet_sealed, 0);
    }

    #[test]
    fn empty_permitted_list_counts_as_unsealed() {
        let run = Run::new(vec![
            descriptor("U", &ClassBuilder::new("p/A").permits(&[])),
            descriptor("U", &ClassBuilder::new("p/B").extends("p/A")),
        ]);
        assert_eq!(run.decide("p/A").0, seal(&["p/B"]));
    }

    #[test]
    fn nested_subtype_blocks_sealing() {
        let run = Run::new(vec![
            descriptor("U", &ClassBuilder::new("p/A")),
            descriptor("U", &ClassBuilder::new("p/B").extends("p/A")),
            descriptor("U", &ClassBuilder::new("p/A$1").extends("p/A")),
        ]);
        let (decision, stats) = run.decide("p/A");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats.not_yet_sealed, 1);
        assert_eq!(stats.sealed, 0);
    }

    #[test]
    fn non_public_subtype_in_other_package_blocks_sealing() {
        let hidden = Run::new(vec![
            descriptor("U", &ClassBuilder::new("p/A").public()),
            descriptor("U", &ClassBuilder::new("q/B").extends("p/A")),
        ]);
        assert_eq!(hidden.decide("p/A").0, Decision::NoOp);

        let exported = Run::new(vec![
            descriptor("U", &ClassBuilder::new("p/A").public()),
            descriptor("U", &ClassBuilder::new("q/B").public().extends("p/A")),
        ]);
        assert_eq!(exported.decide("p/A").0, seal(&["q/B"]));
    }

    #[test]
    fn switches_disable_each_rewrite() {
        let mut run = Run::new(abcd("U"));
        run.config.enable_final = false;
        let (decision, stats) = run.decide("p/D");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats.became_final, 0);
        assert_eq!(run.decide("p/A").0, seal(&["p/B", "p/C"]));

        run.config.enable_final = true;
        run.config.enable_seal = false;
        let (decision, stats) = run.decide("p/A");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats.not_yet_sealed, 1);
        assert_eq!(stats.sealed, 0);
    }

    #[test]
    fn rejected_units_are_skipped_entirely() {
        let mut run = Run::new(abcd("U"));
        run.config.unit_filter = UnitFilter::Only(BTreeSet::from(["V".to_string()]));
        let (decision, stats) = run.decide("p/D");
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn counters_follow_the_scenario() {
        let run = Run::new(abcd("U"));
        let total = ["p/A", "p/B", "p/C", "p/D"]
            .iter()
            .map(|name| run.decide(name).1)
            .fold(Stats::default(), |acc, s| acc + s);
        assert_eq!(
            total,
            Stats {
                total: 4,
                no_subtypes: 2,
                became_final: 2,
                with_subtypes: 2,
                not_yet_sealed: 2,
                sealed: 2,
            }
        );
    }

    #[test]
    fn decision_display_names_subtypes() {
        assert_eq!(seal(&["p/C", "p/B"]).to_string(), "sealed to [p/B, p/C]");
        assert_eq!(Decision::MarkFinal.to_string(), "final");
    }
}
