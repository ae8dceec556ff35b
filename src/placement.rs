//! Forward placement enumeration under instant gravity.

use std::sync::Arc;

use bitvec::prelude::{bitvec, BitVec};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::gameplay::{Board, Piece, Shape, Turn};
use crate::physics::Physics;
use crate::sync::{Counter, ShardedMap};

/// Walks every rest position a shape can reach on a board.
///
/// Starts from the 100g spawn position and explores slides and kick-aware
/// rotations. Gravity is instant, so every reachable state is already a
/// rest state; the iterator yields each exactly once, paired with the
/// board produced by locking it there (full rows cleared).
///
/// Distinct rest states can lock into the same board, so callers wanting
/// boards must deduplicate; see [`next_boards`].
pub struct PiecePlacer<'a> {
    physics: &'a Physics,
    board: Board,
    queue: Vec<Piece>,
    seen: BitVec,
}

impl<'a> PiecePlacer<'a> {
    pub fn new(physics: &'a Physics, board: Board, shape: Shape) -> PiecePlacer<'a> {
        let mut queue = Vec::new();
        let mut seen = bitvec![0; 0x400];

        if let Some(piece) = Piece::spawn(physics, board, shape) {
            seen.set(piece.pack() as usize, true);
            queue.push(piece);
        }

        PiecePlacer {
            physics,
            board,
            queue,
            seen,
        }
    }
}

impl<'a> Iterator for PiecePlacer<'a> {
    type Item = (Piece, Board);

    fn next(&mut self) -> Option<Self::Item> {
        let piece = self.queue.pop()?;

        let moves = [
            piece.slid(self.physics, self.board, -1),
            piece.slid(self.physics, self.board, 1),
            piece.rotated(self.physics, self.board, Turn::Clockwise),
            piece.rotated(self.physics, self.board, Turn::Half),
            piece.rotated(self.physics, self.board, Turn::CounterClockwise),
        ];

        for new_piece in moves.into_iter().flatten() {
            if !self.seen[new_piece.pack() as usize] {
                self.seen.set(new_piece.pack() as usize, true);
                self.queue.push(new_piece);
            }
        }

        Some((piece, piece.lock(self.physics, self.board)))
    }
}

/// Every board reachable by locking `shape` on `board`, sorted ascending.
///
/// An empty result means the shape cannot be placed at all; that is a
/// normal outcome, not an error.
pub fn next_boards(physics: &Physics, board: Board, shape: Shape) -> Vec<Board> {
    let mut boards: Vec<Board> = PiecePlacer::new(physics, board, shape)
        .map(|(_, board)| board)
        .collect();

    boards.sort_unstable();
    boards.dedup();
    boards
}

/// Every board reachable by locking each shape of `queue` in order,
/// sorted ascending.
pub fn next_boards_after_queue(physics: &Physics, board: Board, queue: &str) -> Result<Vec<Board>> {
    let mut boards = vec![board];

    for c in queue.chars() {
        let shape = Shape::from_char(c).ok_or(Error::UnknownShape(c))?;

        let mut next: Vec<Board> = boards
            .iter()
            .flat_map(|&board| next_boards(physics, board, shape))
            .collect();
        next.sort_unstable();
        next.dedup();
        boards = next;
    }

    Ok(boards)
}

/// Memoized placement transitions, shared across searches.
///
/// The backward enumerator confirms its candidates against forward
/// transitions, so the catalog search threads one cache through both
/// directions and most forward lookups hit. Backward results are
/// memoized in the same cache (see [`crate::reverse::prev_boards`]).
/// Results are behind `Arc`s; cloning one out of the map is cheap.
pub struct TransitionCache {
    forward: ShardedMap<(Board, Shape), Arc<Vec<Board>>>,
    backward: ShardedMap<(Board, Shape), Arc<Vec<Board>>>,
    computed: Counter,
}

impl TransitionCache {
    pub fn new() -> TransitionCache {
        TransitionCache {
            forward: ShardedMap::new(),
            backward: ShardedMap::new(),
            computed: Counter::zero(),
        }
    }

    /// `next_boards(board, shape)`, computing it at most once per key.
    pub fn forward(&self, physics: &Physics, board: Board, shape: Shape) -> Arc<Vec<Board>> {
        if let Some(boards) = self.forward.get(&(board, shape)) {
            return boards;
        }

        let boards = Arc::new(next_boards(physics, board, shape));
        self.forward.insert((board, shape), boards.clone());
        self.computed.increment();
        boards
    }

    /// Fill the cache for many keys at once on the rayon pool.
    pub fn warm(&self, physics: &Physics, keys: &[(Board, Shape)]) {
        keys.par_iter().for_each(|&(board, shape)| {
            self.forward(physics, board, shape);
        });
    }

    /// Number of transition lists computed so far (for progress logs).
    pub fn computed(&self) -> u64 {
        self.computed.get()
    }

    pub(crate) fn backward_get(&self, board: Board, shape: Shape) -> Option<Arc<Vec<Board>>> {
        self.backward.get(&(board, shape))
    }

    pub(crate) fn backward_put(&self, board: Board, shape: Shape, boards: Arc<Vec<Board>>) {
        self.backward.insert((board, shape), boards);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::tests::srs;

    #[test]
    fn o_on_an_empty_board() {
        let physics = srs();
        let boards = next_boards(&physics, Board::empty(), Shape::O);

        // Three columns pairs: 0-1, 1-2, 2-3.
        assert_eq!(boards, vec![Board(0x33), Board(0x66), Board(0xCC)]);
        assert!(boards.contains(&Board(51)));
    }

    #[test]
    fn i_on_an_empty_board() {
        let physics = srs();
        let boards = next_boards(&physics, Board::empty(), Shape::I);

        // Flat on the floor fills row 0, which clears to the empty board.
        // Vertical placements reach every column through kicks and slides.
        assert_eq!(
            boards,
            vec![
                Board(0),
                Board(0x1111),
                Board(0x2222),
                Board(0x4444),
                Board(0x8888),
            ]
        );
    }

    #[test]
    fn s_rests_on_the_stack() {
        let physics = srs();

        // A flat S on the floor: lower row columns 0-1, upper row 1-2.
        let boards = next_boards(&physics, Board::empty(), Shape::S);
        assert!(boards.contains(&Board::from_rows(&[0b0011, 0b0110])));

        // Every result must already have its full rows cleared.
        for shape in Shape::ALL {
            for board in next_boards(&physics, Board::empty(), shape) {
                assert!(board.rows().iter().all(|&row| row != 0b1111));
            }
        }
    }

    #[test]
    fn sealed_board_has_no_placements() {
        let physics = srs();

        // Fifteen rows with only column 3 open: an O cannot spawn below
        // the ceiling, and nothing can be placed.
        let tall = Board(0x0777_7777_7777_7777);
        assert_eq!(next_boards(&physics, tall, Shape::O), vec![]);
    }

    #[test]
    fn queue_fold_matches_manual_fold() {
        let physics = srs();

        let one = next_boards(&physics, Board::empty(), Shape::O);
        let mut two: Vec<Board> = one
            .iter()
            .flat_map(|&b| next_boards(&physics, b, Shape::O))
            .collect();
        two.sort_unstable();
        two.dedup();

        assert_eq!(
            next_boards_after_queue(&physics, Board::empty(), "OO").unwrap(),
            two
        );

        // Two O pieces side by side clear the bottom two rows.
        assert!(two.contains(&Board::empty()));

        assert!(matches!(
            next_boards_after_queue(&physics, Board::empty(), "OX"),
            Err(Error::UnknownShape('X'))
        ));
    }

    #[test]
    fn cache_memoizes_forward_transitions() {
        let physics = srs();
        let cache = TransitionCache::new();

        let direct = next_boards(&physics, Board::empty(), Shape::T);
        assert_eq!(*cache.forward(&physics, Board::empty(), Shape::T), direct);
        assert_eq!(*cache.forward(&physics, Board::empty(), Shape::T), direct);
        assert_eq!(cache.computed(), 1);

        cache.warm(
            &physics,
            &[(Board::empty(), Shape::I), (Board::empty(), Shape::T)],
        );
        assert_eq!(cache.computed(), 2);
        assert_eq!(
            *cache.forward(&physics, Board::empty(), Shape::I),
            next_boards(&physics, Board::empty(), Shape::I)
        );
    }

    #[test]
    fn deterministic_output() {
        let physics = srs();
        let board = Board::from_rows(&[0b0011, 0b0001]);

        for shape in Shape::ALL {
            assert_eq!(
                next_boards(&physics, board, shape),
                next_boards(&physics, board, shape)
            );
        }
    }
}
