//! Primary-set selection and bounded dependency closure.
//!
//! Curation is two pure passes over the parsed index: rank eligible
//! packages by popularity and admit the ones above the score threshold,
//! then breadth-first-walk their `Depends` edges to pull in the minimal
//! extra set that satisfies declared dependencies within a budget.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::io::{self, Write};
use std::path::Path;

use thiserror::Error;

use crate::depends::parse_depends;
use crate::index::PackageIndex;
use crate::policy::CurationPolicy;

/// Errors raised while writing curation artifacts.
#[derive(Error, Debug)]
pub enum CurateError {
    /// Underlying IO failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Atomic rename of a finished artifact failed.
    #[error("failed to persist artifact: {0}")]
    Persist(#[from] tempfile::PersistError),
}

/// The outcome of a curation run: primary set plus its dependency closure.
///
/// The two sets are disjoint by construction; their union is the allow-set
/// the filtering half consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuratedSet {
    /// Top-ranked eligible packages (plus force-included seeds).
    pub primary: BTreeSet<String>,
    /// Additional packages reachable from the primary set via `Depends`.
    pub dependencies: BTreeSet<String>,
}

impl CuratedSet {
    /// The combined allow-set: primary ∪ dependencies.
    pub fn allowed(&self) -> BTreeSet<String> {
        self.primary.union(&self.dependencies).cloned().collect()
    }

    /// Write the three curation artifacts into `dir`:
    /// `packages.txt` (primary), `deps.txt` (dependencies), and `all.txt`
    /// (the combined allow-list read back by the filter).
    ///
    /// Each file is a sorted newline-separated name list with a trailing
    /// newline, written atomically as a whole unit.
    ///
    /// # Errors
    ///
    /// Returns [`CurateError`] if a file cannot be created or persisted.
    pub fn write_artifacts(&self, dir: &Path) -> Result<(), CurateError> {
        std::fs::create_dir_all(dir)?;
        write_name_list(&dir.join("packages.txt"), &self.primary)?;
        write_name_list(&dir.join("deps.txt"), &self.dependencies)?;
        write_name_list(&dir.join("all.txt"), &self.allowed())?;
        Ok(())
    }
}

fn write_name_list(path: &Path, names: &BTreeSet<String>) -> Result<(), CurateError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    for name in names {
        tmp.write_all(name.as_bytes())?;
        tmp.write_all(b"\n")?;
    }
    tmp.persist(path)?;
    Ok(())
}

/// Run the full curation pass: seed force-includes, rank and select the
/// primary set, then resolve its dependency closure.
pub fn curate(
    index: &PackageIndex,
    popcon: &HashMap<String, u64>,
    policy: &CurationPolicy,
) -> CuratedSet {
    let seeds: BTreeSet<String> = policy
        .force_include
        .iter()
        .filter(|name| index.contains(name))
        .cloned()
        .collect();

    let primary = select_primary(index, popcon, policy, &seeds);
    tracing::info!(primary = primary.len(), "selected primary set");

    let dependencies = resolve_dependencies(&primary, index, policy.dependency_budget);
    tracing::info!(dependencies = dependencies.len(), "resolved dependency closure");

    CuratedSet {
        primary,
        dependencies,
    }
}

/// Select the primary set by popularity score.
///
/// Eligible entries (per the policy's relevance predicate) are scored with
/// the popularity signal (absent names score 0) and sorted descending by
/// score with an ascending-name tie-break, so the selection is reproducible
/// run to run. The sorted sequence is admitted in a single scan until the
/// first entry below the threshold; the primary budget caps absolute size
/// as a secondary bound. `seeds` enter first, regardless of score and
/// relevance, but count against the budget like everything else: a seed
/// set larger than the budget is truncated in name order.
pub fn select_primary(
    index: &PackageIndex,
    popcon: &HashMap<String, u64>,
    policy: &CurationPolicy,
    seeds: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut scored: Vec<(u64, &str)> = index
        .iter()
        .filter(|entry| policy.is_relevant(entry))
        .map(|entry| {
            let score = popcon.get(&entry.name).copied().unwrap_or(0);
            (score, entry.name.as_str())
        })
        .collect();
    scored.sort_unstable_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));

    let mut primary: BTreeSet<String> = seeds
        .iter()
        .take(policy.primary_budget)
        .cloned()
        .collect();
    for (score, name) in scored {
        if score < policy.score_threshold {
            // Sorted descending: nothing further can qualify.
            break;
        }
        if primary.len() >= policy.primary_budget {
            break;
        }
        primary.insert(name.to_string());
    }
    primary
}

/// Resolve the bounded dependency closure of `primary`.
///
/// Breadth-first over `Depends` edges: the queue is seeded with the primary
/// set in iteration order and the seen-set starts as the primary set. A
/// dequeued name that is missing from the index contributes no edges. Each
/// extracted dependency that is unseen and present in the index is marked
/// seen, added to the result, and enqueued. Traversal stops the moment the
/// result reaches `budget` or the queue drains.
///
/// FIFO discipline is load-bearing: when the budget runs out mid-traversal
/// it decides which names got in, so the discovery order must be exact.
pub fn resolve_dependencies(
    primary: &BTreeSet<String>,
    index: &PackageIndex,
    budget: usize,
) -> BTreeSet<String> {
    let mut deps: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = primary.iter().cloned().collect();
    let mut seen: HashSet<String> = primary.iter().cloned().collect();

    'outer: while let Some(name) = queue.pop_front() {
        if deps.len() >= budget {
            break;
        }
        let Some(entry) = index.get(&name) else {
            continue;
        };
        let Some(dep_str) = entry.field("Depends") else {
            continue;
        };
        for dep in parse_depends(dep_str) {
            if !seen.contains(&dep) && index.contains(&dep) {
                seen.insert(dep.clone());
                deps.insert(dep.clone());
                if deps.len() >= budget {
                    break 'outer;
                }
                queue.push_back(dep);
            }
        }
    }

    // Disjoint from primary by construction; subtraction is defensive.
    &deps - primary
}
