//! # class-sealer
//!
//! Closed-world analysis over a complete set of JVM class files. Every
//! class without subclasses is marked `final`; every class or interface
//! whose subclasses all live in its own unit and are visible to it gets a
//! `PermittedSubclasses` attribute.
//!
//! ## Architecture
//!
//! - **pool**: Corpus entries and the `/<unit>/<name>.class` path convention
//! - **classfile**: Class file reader (constant pool, flags, hierarchy, permitted subclasses)
//! - **rewrite**: Byte-preserving application of a decision to a class file
//! - **multimap**: Name to set-of-names map shared by both indexes
//! - **hierarchy**: Inverted inheritance graph
//! - **units**: Unit membership index
//! - **access**: Permitted-subclass accessibility check
//! - **classify**: Per-type decision (final, seal, no-op)
//! - **stats**: Run counters and summary
//! - **config**: Unit filter, switches and diagnostic level
//! - **diag**: Per-run diagnostic level on top of `tracing`
//! - **pass**: The full parse, index, classify, rewrite run
//! - **archive**: Jar and exploded-directory corpora on disk

pub mod access;
pub mod archive;
pub mod classfile;
pub mod classify;
pub mod cli;
pub mod config;
pub mod diag;
pub mod hierarchy;
pub mod multimap;
pub mod pass;
pub mod pool;
pub mod rewrite;
pub mod stats;
pub mod units;

#[cfg(test)]
mod fixtures;
