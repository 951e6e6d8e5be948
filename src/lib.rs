//! Turns a sliding-block solution path (a JSON list of board snapshots) into
//! its first board plus the list of single-block moves between snapshots.

pub mod board;
pub mod error;
pub mod moves;

pub use board::{parse_snapshots, read_snapshots, validate, Block, Position, Snapshot};
pub use error::{Error, Malformed};
pub use moves::{extract_moves, find_move, verify, Move, MoveRecord};
