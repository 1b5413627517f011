//! Greedy set-cover selection over hex cells.
//!
//! Given the AOI hex universe and the footprint hex set of every
//! accepted scene, the selector repeatedly picks the scene covering the most
//! yet-uncovered cells, assigns it exactly that subset, and removes the
//! subset from the uncovered pool.
//!
//! Ties on marginal gain are broken by lexicographically smallest scene
//! id, making the selection a documented total order: the same inputs
//! produce the same selection on every run and platform.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use tracing::{debug, info};

use crate::grid::HexCell;

/// Result of a completed greedy selection.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Scene ids in pick order; a permutation of a subset of the
    /// candidates, with no repeats.
    pub order: Vec<String>,

    /// Scene id → the uncovered cells it was assigned when picked.
    /// Assignments are disjoint; their union is the covered area.
    pub assignments: HashMap<String, HashSet<HexCell>>,

    /// Universe cells no selected scene covers.
    pub uncovered: HashSet<HexCell>,
}

impl Selection {
    /// Total number of covered cells.
    pub fn covered_count(&self) -> usize {
        self.assignments.values().map(HashSet::len).sum()
    }

    /// Whether the whole universe was covered.
    pub fn is_complete(&self) -> bool {
        self.uncovered.is_empty()
    }
}

/// Errors from coverage selection.
#[derive(Debug)]
pub enum CoverageError {
    /// No candidate improves coverage while cells remain uncovered.
    ///
    /// Carries the partial selection: everything picked so far plus the
    /// final uncovered set (the universe minus the union of all candidate
    /// sets).
    Exhausted(Selection),
}

impl fmt::Display for CoverageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageError::Exhausted(selection) => write!(
                f,
                "coverage exhausted: {} cells covered by {} scenes, {} cells unreachable",
                selection.covered_count(),
                selection.order.len(),
                selection.uncovered.len()
            ),
        }
    }
}

impl std::error::Error for CoverageError {}

/// Greedily select scenes until the universe is covered.
///
/// Candidates are keyed in a `BTreeMap` so the tie-break (smallest scene
/// id) is a total, reproducible order. Terminates in at most
/// `candidates.len()` iterations; each iteration strictly shrinks the
/// uncovered set or ends the selection.
///
/// Returns `Err(CoverageError::Exhausted)` the moment the best marginal
/// gain drops to zero with cells still uncovered; exhaustion is surfaced
/// explicitly, never looped over.
pub fn select(
    universe: &HashSet<HexCell>,
    candidates: &BTreeMap<String, HashSet<HexCell>>,
) -> Result<Selection, CoverageError> {
    let mut uncovered: HashSet<HexCell> = universe.clone();
    let mut remaining: BTreeMap<&str, &HashSet<HexCell>> = candidates
        .iter()
        .map(|(id, cells)| (id.as_str(), cells))
        .collect();

    let mut order = Vec::new();
    let mut assignments = HashMap::new();

    while !uncovered.is_empty() {
        // Highest marginal gain wins; BTreeMap iteration order means the
        // first candidate seen at the best gain has the smallest id.
        let mut best: Option<(&str, usize)> = None;
        for (id, cells) in &remaining {
            let gain = cells.intersection(&uncovered).count();
            if best.map_or(true, |(_, best_gain)| gain > best_gain) {
                best = Some((*id, gain));
            }
        }

        let best_gain = best.map_or(0, |(_, gain)| gain);
        if best_gain == 0 {
            info!(
                covered = assignments.values().map(HashSet::len).sum::<usize>(),
                uncovered = uncovered.len(),
                "Coverage exhausted before the universe was covered"
            );
            return Err(CoverageError::Exhausted(Selection {
                order,
                assignments,
                uncovered,
            }));
        }

        let (best_id, _) = best.unwrap_or(("", 0));
        let cells = match remaining.remove(best_id) {
            Some(cells) => cells,
            // best_gain > 0 implies the candidate exists in `remaining`.
            None => break,
        };
        let assigned: HashSet<HexCell> = cells.intersection(&uncovered).copied().collect();
        for cell in &assigned {
            uncovered.remove(cell);
        }

        debug!(scene = best_id, assigned = assigned.len(), "Selected scene");
        order.push(best_id.to_string());
        assignments.insert(best_id.to_string(), assigned);
    }

    info!(scenes = order.len(), "Coverage selection complete");
    Ok(Selection {
        order,
        assignments,
        uncovered,
    })
}
