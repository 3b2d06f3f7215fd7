//! Restoration of verified originals into downstream output.
//!
//! Two passes run over the same output, independently of each other:
//!
//! 1. **Restoration**: one left-to-right scan over placeholder-shaped tokens.
//!    A token mapped to a restorable entry is replaced by its original value;
//!    every other token is copied through. Inserted values are never
//!    rescanned, so an original that happens to look like a placeholder is
//!    never expanded.
//! 2. **Hallucination detection**: a second scan of the unmodified output
//!    reports every placeholder-shaped token that has no mapping entry.
//!
//! Neither pass can fail; everything noteworthy lands in
//! [`RestorationStats`].

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use serde::Serialize;
use slog::{debug, info, o, warn, Logger};

use crate::{
    error::RestorationWarning,
    mapping::PlaceholderMap,
    placeholder,
    slog::RestorationSummary,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RestorationStats {
    /// Placeholder-shaped tokens in the output, repeats included.
    pub total_placeholders_found: usize,
    /// Occurrences replaced by an original value.
    pub restored_count: usize,
    /// Distinct placeholders restored, in order of first appearance.
    pub restored_placeholders: Vec<String>,
    /// Distinct unmapped tokens, in order of first appearance.
    pub hallucinated_placeholders: Vec<String>,
    /// Mapped placeholders that never appeared, in mapping order.
    pub unused_placeholders: Vec<String>,
    /// Mapped, non-restorable placeholders left in place.
    pub withheld_placeholders: Vec<String>,
    pub restoration_time: Duration,
    pub warnings: Vec<RestorationWarning>,
}

impl RestorationStats {
    pub fn has_hallucinations(&self) -> bool {
        !self.hallucinated_placeholders.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Restoration {
    pub text: String,
    pub stats: RestorationStats,
}

struct RestorationPass<'a> {
    text: String,
    restored_count: usize,
    restored: Vec<String>,
    withheld: Vec<String>,
    present: HashSet<&'a str>,
}

fn restoration_pass<'a>(output: &'a str, mapping: &PlaceholderMap) -> RestorationPass<'a> {
    let mut pass = RestorationPass {
        text: String::with_capacity(output.len()),
        restored_count: 0,
        restored: Vec::new(),
        withheld: Vec::new(),
        present: HashSet::new(),
    };
    let mut cursor = 0;
    for token in placeholder::scan(output) {
        let Some(entry) = mapping.get(token.text) else {
            continue;
        };
        let first_sighting = pass.present.insert(token.text);
        match mapping.original_value(token.text) {
            Some(original) => {
                pass.text.push_str(&output[cursor..token.range.start]);
                pass.text.push_str(original);
                cursor = token.range.end;
                pass.restored_count += 1;
                if first_sighting {
                    pass.restored.push(entry.placeholder.clone());
                }
            }
            None if first_sighting => pass.withheld.push(entry.placeholder.clone()),
            None => {}
        }
    }
    pass.text.push_str(&output[cursor..]);
    pass
}

/// Returns the token count and the distinct unmapped tokens.
fn hallucination_pass(output: &str, mapping: &PlaceholderMap) -> (usize, Vec<String>) {
    let mut found = 0;
    let mut seen = HashSet::new();
    let mut hallucinated = Vec::new();
    for token in placeholder::scan(output) {
        found += 1;
        if !mapping.contains(token.text) && seen.insert(token.text) {
            hallucinated.push(token.text.to_owned());
        }
    }
    (found, hallucinated)
}

/// Writes verified originals back into downstream output.
#[derive(Clone, Debug)]
pub struct Restorer {
    logger: Logger,
}

impl Restorer {
    pub fn new() -> Self {
        Self {
            logger: crate::slog::discard(),
        }
    }

    #[must_use]
    pub fn with_logger(mut self, logger: &Logger) -> Self {
        self.logger = logger.new(o!("component" => "restorer"));
        self
    }

    /// Restores `output` against `mapping`.
    ///
    /// The mapping is only ever consulted by placeholder.
    pub fn restore(&self, output: &str, mapping: &PlaceholderMap) -> Restoration {
        let started = Instant::now();

        let pass = restoration_pass(output, mapping);
        let (total_placeholders_found, hallucinated) = hallucination_pass(output, mapping);
        let unused: Vec<String> = mapping
            .placeholders()
            .filter(|p| !pass.present.contains(p))
            .map(str::to_owned)
            .collect();

        let warnings = unused
            .iter()
            .cloned()
            .map(RestorationWarning::Unused)
            .chain(hallucinated.iter().cloned().map(RestorationWarning::Hallucinated))
            .chain(pass.withheld.iter().cloned().map(RestorationWarning::Withheld))
            .collect();

        let stats = RestorationStats {
            total_placeholders_found,
            restored_count: pass.restored_count,
            restored_placeholders: pass.restored,
            hallucinated_placeholders: hallucinated,
            unused_placeholders: unused,
            withheld_placeholders: pass.withheld,
            restoration_time: started.elapsed(),
            warnings,
        };

        if stats.has_hallucinations() {
            warn!(self.logger, "output contains unmapped placeholders";
                "hallucinated" => stats.hallucinated_placeholders.join(","),
            );
        }
        for placeholder in &stats.unused_placeholders {
            debug!(self.logger, "mapped placeholder unused"; "placeholder" => placeholder.as_str());
        }
        info!(self.logger, "restoration complete"; "stats" => RestorationSummary::new(&stats));

        Restoration {
            text: pass.text,
            stats,
        }
    }
}

impl Default for Restorer {
    fn default() -> Self {
        Self::new()
    }
}
