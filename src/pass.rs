//! One full, stateless run over a corpus.
//!
//! 1. Parse every class entry into a [`TypeDescriptor`].
//! 2. Build the subtype and unit indexes side by side.
//! 3. Classify and rewrite each entry independently.
//!
//! Output entries keep the input order and paths; only entries with a
//! decision other than `NoOp` carry new bytes.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::access::AccessChecker;
use crate::classify::{Classifier, Decision};
use crate::config::SealConfig;
use crate::hierarchy::SubtypeIndex;
use crate::pool::{ResourceEntry, TypeDescriptor};
use crate::rewrite;
use crate::stats::Stats;
use crate::units::UnitIndex;

#[derive(Debug, Clone, Serialize)]
pub struct Change {
    pub path: String,
    pub decision: Decision,
    pub sha256: String,
}

#[derive(Debug)]
pub struct SealOutput {
    pub entries: Vec<ResourceEntry>,
    pub changes: Vec<Change>,
    pub stats: Stats,
}

type Classified = (ResourceEntry, Option<Change>, Stats);

#[derive(Debug, Clone, Default)]
pub struct SealPass {
    config: SealConfig,
}

impl SealPass {
    pub fn new(config: SealConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, entries: Vec<ResourceEntry>) -> Result<SealOutput> {
        let diagnostics = self.config.diagnostics;

        let parsed: Vec<Option<TypeDescriptor>> = entries
            .par_iter()
            .map(|entry| {
                if entry.is_class() {
                    TypeDescriptor::read(entry).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<Result<_>>()?;
        let descriptors: Vec<&TypeDescriptor> = parsed.iter().flatten().collect();

        let (subtypes, units) = rayon::join(
            || SubtypeIndex::build(descriptors.iter().copied()),
            || UnitIndex::build(descriptors.iter().copied()),
        );
        let access = AccessChecker::new(descriptors.iter().copied(), diagnostics);
        let classifier = Classifier::new(&subtypes, &units, &access, &self.config);

        let results: Vec<Classified> = entries
            .into_par_iter()
            .zip(parsed.par_iter())
            .map(|(entry, descriptor)| -> Result<Classified> {
                diagnostics.trace(format_args!("Analyzing resource {}", entry.path));
                let mut stats = Stats::default();
                let Some(descriptor) = descriptor else {
                    return Ok((entry, None, stats));
                };

                let decision = classifier.classify(descriptor, &mut stats);
                if decision.is_no_op() {
                    return Ok((entry, None, stats));
                }

                let bytes = rewrite::apply(&decision, &descriptor.class, &entry.bytes)
                    .with_context(|| format!("Failed to rewrite class file: {}", entry.path))?;
                let change = Change {
                    path: entry.path.clone(),
                    decision,
                    sha256: hash_bytes(&bytes),
                };
                Ok((entry.with_content(bytes), Some(change), stats))
            })
            .collect::<Result<_>>()?;

        let mut output = SealOutput {
            entries: Vec::with_capacity(results.len()),
            changes: Vec::new(),
            stats: Stats::default(),
        };
        for (entry, change, stats) in results {
            output.entries.push(entry);
            output.changes.extend(change);
            output.stats += stats;
        }

        output.stats.report(&diagnostics);
        Ok(output)
    }
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
