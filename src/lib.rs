//! Reachability and search for four-wide perfect clears.
//!
//! Boards are four columns wide and identified by a packed integer
//! fingerprint ([`Board`]). Piece geometry and kick tables are loaded from
//! text files into a [`Physics`] table; everything downstream is generic
//! over whatever rotation system those files describe.
//!
//! On top of the board model sit four layers:
//!
//! - [`next_boards`] walks every placement a shape can reach under
//!   instant gravity and kick-aware rotation.
//! - [`prev_boards`] inverts a lock: every board the current one could
//!   have come from, confirmed against the forward enumerator.
//! - [`generate_pc_catalog`] runs both directions from the empty board
//!   and splices them into the complete catalog of perfect-clear queues.
//! - [`max_pcs`] plans the most consecutive clears a long preview admits
//!   under a one-piece hold, using the catalog as its oracle.

pub mod catalog;
pub mod error;
pub mod gameplay;
pub mod physics;
pub mod placement;
pub mod planner;
pub mod queue;
pub mod reverse;
mod sync;

pub use catalog::{generate_pc_catalog, PcCatalog};
pub use error::{Error, Result};
pub use gameplay::{Board, Piece, Rotation, Shape, Turn};
pub use physics::Physics;
pub use placement::{next_boards, next_boards_after_queue, PiecePlacer, TransitionCache};
pub use planner::max_pcs;
pub use queue::Queue;
pub use reverse::{prev_boards, prev_boards_before_queue};
