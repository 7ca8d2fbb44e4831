//! Compilation driver — runs extraction then hydration over one build
//! context and turns the collected diagnostics into the final result.
//!
//! Each [`Compilation`] owns its id counters and accumulators, so any number
//! of parses can run side by side.

use std::collections::BTreeMap;
use std::fmt::Display;

use tracing::{debug, warn};

use super::error::{Diagnostic, ParseFailure};
use super::extract::{extract_patches, Entry};
use super::hydrate::hydrate_patches;
use super::tokenizer::tokenize;
use crate::config::ParseConfig;
use crate::document::{ArrayId, Document, PatchId};

/// A successful parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub document: Document,
    /// Non-fatal diagnostics about skipped constructs.
    pub warnings: Vec<Diagnostic>,
}

/// Shared mutable state of one parse.
#[derive(Debug)]
pub struct Compilation {
    pub document: Document,
    /// Statement group of each patch, filled by extraction, drained by hydration.
    pub groups: BTreeMap<PatchId, Vec<Entry>>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub config: ParseConfig,
    next_patch: u32,
    next_array: u32,
}

impl Compilation {
    pub fn new(config: ParseConfig) -> Self {
        Self {
            document: Document::default(),
            groups: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            config,
            next_patch: 0,
            next_array: 0,
        }
    }

    pub fn next_patch_id(&mut self) -> PatchId {
        let id = PatchId(self.next_patch);
        self.next_patch += 1;
        id
    }

    pub fn next_array_id(&mut self) -> ArrayId {
        let id = ArrayId(self.next_array);
        self.next_array += 1;
        id
    }

    pub fn error(&mut self, line_index: usize, message: impl Display) {
        debug!(line = line_index, %message, "parse error");
        self.errors.push(Diagnostic::new(line_index, message.to_string()));
    }

    pub fn warn(&mut self, line_index: usize, message: impl Display) {
        warn!(line = line_index, %message, "parse warning");
        self.warnings.push(Diagnostic::new(line_index, message.to_string()));
    }

    pub fn finish(self) -> Result<Parsed, ParseFailure> {
        if self.errors.is_empty() {
            debug!(
                patches = self.document.patches.len(),
                arrays = self.document.arrays.len(),
                warnings = self.warnings.len(),
                "patch parsed"
            );
            Ok(Parsed {
                document: self.document,
                warnings: self.warnings,
            })
        } else {
            Err(ParseFailure {
                errors: self.errors,
                warnings: self.warnings,
            })
        }
    }
}

/// Parse a whole patch text with the given configuration.
pub fn compile(source: &str, config: ParseConfig) -> Result<Parsed, ParseFailure> {
    let statements = tokenize(source);
    let mut compilation = Compilation::new(config);
    extract_patches(&mut compilation, statements);
    hydrate_patches(&mut compilation);
    compilation.finish()
}
