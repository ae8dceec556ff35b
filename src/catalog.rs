//! The perfect-clear queue catalog: generation and persistence.

use std::cmp;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use log::{debug, info};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::gameplay::{Board, Shape};
use crate::physics::Physics;
use crate::placement::TransitionCache;
use crate::queue::{Queue, MAX_QUEUE};
use crate::reverse;

/// The set of queues that can perfect-clear the empty four-wide field.
///
/// Kept sorted by `(length, lexical)` for output, with a hash set on the
/// side for membership tests from the planner.
pub struct PcCatalog {
    queues: Vec<Queue>,
    members: AHashSet<Queue>,
    longest: usize,
}

impl PcCatalog {
    /// Build a catalog from raw queues, sorting and deduplicating.
    pub fn from_queues(mut queues: Vec<Queue>) -> PcCatalog {
        queues.sort_unstable_by_key(|queue| queue.natural_order_key());
        queues.dedup();

        let members = queues.iter().copied().collect();
        let longest = queues.iter().map(|queue| queue.len()).max().unwrap_or(0);

        PcCatalog {
            queues,
            members,
            longest,
        }
    }

    /// Read a catalog file: a count line, then that many queue lines.
    /// Content past the promised count is ignored.
    pub fn load(path: impl AsRef<Path>) -> Result<PcCatalog> {
        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();

        let count: usize = lines
            .next()
            .ok_or_else(|| Error::parse(1, "missing queue count"))?
            .trim()
            .parse()
            .map_err(|_| Error::parse(1, "queue count is not an integer"))?;

        let mut queues = Vec::with_capacity(count);
        for i in 0..count {
            let line = lines.next().ok_or_else(|| {
                Error::parse(i + 1, format!("expected {} queues, found {}", count, i))
            })?;
            let queue = line
                .trim()
                .parse::<Queue>()
                .map_err(|e| Error::parse(i + 2, e.to_string()))?;
            queues.push(queue);
        }

        debug!("loaded {} perfect-clear queues", queues.len());
        Ok(PcCatalog::from_queues(queues))
    }

    /// Write the catalog in the format [`load`] reads.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place, so an interrupted write never leaves a truncated catalog.
    ///
    /// [`load`]: PcCatalog::load
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let mut text = self.queues.len().to_string();
        for queue in &self.queues {
            text.push('\n');
            text.push_str(&queue.to_string());
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// The queues, sorted by `(length, lexical)`.
    pub fn queues(&self) -> &[Queue] {
        &self.queues
    }

    pub fn contains(&self, queue: Queue) -> bool {
        self.members.contains(&queue)
    }

    /// Length of the longest queue in the catalog.
    pub fn longest(&self) -> usize {
        self.longest
    }
}

/// Enumerate every queue of at most `n` pieces that can perfect-clear the
/// empty board, keeping intermediate stacks below `h` rows.
///
/// If `path` already exists and `regenerate` is false, the persisted
/// catalog is returned instead of searching. A fresh search always writes
/// its result back to `path`.
///
/// The search is a bidirectional BFS over `(board, history)` pairs: a
/// short backward sweep from the empty board discovers everything that
/// can finish a clear within a few pieces, then a forward sweep from the
/// empty board meets it at shared interior boards. Both sweeps share one
/// transition cache; the frontier's transitions are computed in parallel
/// each depth, while the bookkeeping stays sequential so results are
/// reproducible.
pub fn generate_pc_catalog(
    physics: &Physics,
    path: impl AsRef<Path>,
    n: usize,
    h: u8,
    regenerate: bool,
) -> Result<PcCatalog> {
    let path = path.as_ref();

    if !regenerate && path.exists() {
        return PcCatalog::load(path);
    }

    if n > MAX_QUEUE {
        return Err(Error::QueueTooLong(n));
    }
    // No stack of n pieces outgrows n rows, so a taller cap buys nothing.
    let h = cmp::min(n as u8, h);
    if h > 12 {
        return Err(Error::HeightTooLarge(h));
    }

    info!(
        "generating perfect-clear queues: up to {} pieces, height cap {}",
        n, h
    );

    let cache = TransitionCache::new();
    let max_board = (1u64 << (4 * h as u32)) - 1;

    let n_back = n / 4 + 1;
    let n_fwd = n.saturating_sub(n_back);

    // Backward sweep: which interior boards can finish a clear, and with
    // which closing queues.
    let mut backward_reachable: AHashMap<Board, BTreeSet<Queue>> = AHashMap::new();
    let mut visited: AHashSet<(Board, Queue)> = AHashSet::new();
    let mut frontier: Vec<(Board, Queue)> = vec![(Board::empty(), Queue::empty())];

    for depth in 0..n_back {
        let expansions: Vec<(Board, Queue)> = frontier
            .par_iter()
            .flat_map_iter(|&(board, history)| {
                let mut found = Vec::new();
                for shape in Shape::ALL {
                    for &prev in reverse::prev_boards_shared(physics, &cache, board, shape).iter()
                    {
                        if prev.0 > 0 && prev.0 < max_board {
                            found.push((prev, history.push_first(shape)));
                        }
                    }
                }
                found
            })
            .collect();

        frontier = Vec::new();
        for (board, history) in expansions {
            backward_reachable.entry(board).or_default().insert(history);
            if visited.insert((board, history)) && depth + 1 < n_back {
                frontier.push((board, history));
            }
        }

        debug!(
            "backward depth {}: frontier {}, {} boards reach a clear, {} transitions computed",
            depth + 1,
            frontier.len(),
            backward_reachable.len(),
            cache.computed()
        );
    }

    // Forward sweep, meeting the backward table at interior boards.
    let mut forward_reachable: AHashMap<Board, BTreeSet<Queue>> = AHashMap::new();
    let mut visited: AHashSet<(Board, Queue)> = AHashSet::new();
    let mut frontier: Vec<(Board, Queue)> = vec![(Board::empty(), Queue::empty())];

    for depth in 0..n_fwd {
        let keys: Vec<(Board, Shape)> = {
            let mut seen = AHashSet::new();
            let mut keys = Vec::new();
            for &(board, _) in &frontier {
                for shape in Shape::ALL {
                    if seen.insert((board, shape)) {
                        keys.push((board, shape));
                    }
                }
            }
            keys
        };
        cache.warm(physics, &keys);

        let mut next = Vec::new();
        for &(board, history) in &frontier {
            for shape in Shape::ALL {
                for &next_board in cache.forward(physics, board, shape).iter() {
                    if next_board.0 > 0 && next_board.0 < max_board {
                        let new_history = history.push_last(shape);

                        if backward_reachable.contains_key(&next_board) {
                            forward_reachable
                                .entry(next_board)
                                .or_default()
                                .insert(new_history);
                        }
                        if visited.insert((next_board, new_history)) && depth + 1 < n_fwd {
                            next.push((next_board, new_history));
                        }
                    }
                }
            }
        }

        debug!(
            "forward depth {}: frontier {}, {} meeting boards, {} transitions computed",
            depth + 1,
            next.len(),
            forward_reachable.len(),
            cache.computed()
        );
        frontier = next;
    }

    // Splice the halves together at every shared interior board.
    let mut pcs: BTreeSet<Queue> = BTreeSet::new();
    for (board, firsts) in &forward_reachable {
        if let Some(seconds) = backward_reachable.get(board) {
            for &first in firsts {
                for &second in seconds {
                    pcs.insert(first.concat(second));
                }
            }
        }
    }

    // The lone single-piece queue: an I fills and clears the bottom row.
    // The split search never sees one-piece paths, so it goes in by hand.
    pcs.insert(Queue::empty().push_last(Shape::I));

    let catalog = PcCatalog::from_queues(pcs.into_iter().collect());
    info!("found {} perfect-clear queues", catalog.queues().len());

    catalog.save(path)?;
    Ok(catalog)
}
