//! Backward placement enumeration: the boards a lock could have come from.

use std::collections::BTreeSet;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::gameplay::{Board, Rotation, Shape, MAX_ROWS};
use crate::physics::Physics;
use crate::placement::TransitionCache;

/// A multiset of row heights to re-insert, weakly increasing.
type Insertion = SmallVec<[u8; 4]>;

/// All ways to insert at most `max_lines` full rows into a board of
/// `height` rows.
///
/// Each result is a weakly increasing multiset of heights drawn from
/// `[0, height]`; repeated heights stack several full rows at the same
/// seam. The recursion partitions on whether the topmost seam is used,
/// so no multiset is produced twice.
fn lines_to_insert(height: usize, max_lines: i8) -> Vec<Insertion> {
    let mut out = Vec::new();

    if max_lines == 1 {
        out.push(SmallVec::new());
        for h in 0..=height {
            out.push(SmallVec::from_slice(&[h as u8]));
        }
    } else {
        for mut insertion in lines_to_insert(height, max_lines - 1) {
            insertion.push(height as u8);
            out.push(insertion);
        }

        if height > 0 {
            out.extend(lines_to_insert(height - 1, max_lines));
        } else {
            out.push(SmallVec::new());
        }
    }

    out
}

/// Superimpose full rows onto `rows` at the given seam heights.
fn with_inserted_lines(rows: &[u8], insertion: &Insertion) -> Vec<u8> {
    let mut candidate = Vec::with_capacity(rows.len() + insertion.len());
    let mut previous = 0;

    for &seam in insertion {
        candidate.extend_from_slice(&rows[previous..seam as usize]);
        candidate.push(0b1111);
        previous = seam as usize;
    }
    candidate.extend_from_slice(&rows[previous..]);

    candidate
}

/// Every board from which locking `shape` can produce `board`, sorted
/// ascending.
///
/// Candidate priors come from re-inserting the rows the lock could have
/// cleared (at most the piece's bounding width) and peeling the piece off
/// every position where all four minoes sit on filled cells. That
/// over-generates, so each candidate is confirmed by running the forward
/// enumerator through the shared cache. The result itself is memoized in
/// the cache too; the catalog search revisits boards often.
pub fn prev_boards(
    physics: &Physics,
    cache: &TransitionCache,
    board: Board,
    shape: Shape,
) -> Vec<Board> {
    prev_boards_shared(physics, cache, board, shape).to_vec()
}

/// [`prev_boards`] behind the cache's `Arc`, for callers that only read.
pub(crate) fn prev_boards_shared(
    physics: &Physics,
    cache: &TransitionCache,
    board: Board,
    shape: Shape,
) -> Arc<Vec<Board>> {
    if let Some(boards) = cache.backward_get(board, shape) {
        return boards;
    }

    let boards = Arc::new(compute_prev_boards(physics, cache, board, shape));
    cache.backward_put(board, shape, boards.clone());
    boards
}

fn compute_prev_boards(
    physics: &Physics,
    cache: &TransitionCache,
    board: Board,
    shape: Shape,
) -> Vec<Board> {
    let rows = board.rows();
    let mut candidates = BTreeSet::new();

    for insertion in lines_to_insert(rows.len(), physics.width(shape)) {
        let candidate = with_inserted_lines(&rows, &insertion);
        if candidate.len() > MAX_ROWS as usize {
            // No prior this tall fits the board representation, and no
            // lock reaching through the ceiling can be confirmed anyway.
            continue;
        }

        let candidate_bits = Board::from_rows(&candidate).0;

        for row in 0..candidate.len() as i8 {
            for col in 0..4 {
                for rotation in Rotation::ALL {
                    let mut piece_bits = 0u64;
                    let covered = physics.minoes(shape, rotation).iter().all(|&(dy, dx)| {
                        let r = row + dy;
                        let c = col + dx;

                        let filled = (0..4).contains(&c)
                            && (0..candidate.len() as i8).contains(&r)
                            && candidate[r as usize] & (1 << c) != 0;
                        if filled {
                            piece_bits |= 1 << (4 * r + c);
                        }
                        filled
                    });

                    if covered {
                        let prior = Board(candidate_bits - piece_bits);
                        if prior.rows().iter().all(|&row| row != 0b1111) {
                            candidates.insert(prior);
                        }
                    }
                }
            }
        }
    }

    candidates
        .into_iter()
        .filter(|&prior| cache.forward(physics, prior, shape).contains(&board))
        .collect()
}

/// Every board from which locking each shape of `queue` in order can end
/// at `board`, sorted ascending.
pub fn prev_boards_before_queue(
    physics: &Physics,
    cache: &TransitionCache,
    board: Board,
    queue: &str,
) -> Result<Vec<Board>> {
    let shapes = queue
        .chars()
        .map(|c| Shape::from_char(c).ok_or(Error::UnknownShape(c)))
        .collect::<Result<Vec<Shape>>>()?;

    let mut boards = vec![board];

    for &shape in shapes.iter().rev() {
        let mut previous: Vec<Board> = boards
            .iter()
            .flat_map(|&board| prev_boards(physics, cache, board, shape))
            .collect();
        previous.sort_unstable();
        previous.dedup();
        boards = previous;
    }

    Ok(boards)
}
