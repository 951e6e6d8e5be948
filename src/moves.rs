use std::fmt;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::board::{validate, Position, Snapshot};
use crate::error::{Error, Malformed};

/// A block sliding to a new position. Serialized as `[block, [x, y]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "(usize, Position)", into = "(usize, Position)")]
pub struct Move {
    pub block: usize,
    pub to: Position,
}

impl Move {
    pub fn new(block: usize, to: Position) -> Self {
        Self { block, to }
    }
}

impl From<(usize, Position)> for Move {
    fn from((block, to): (usize, Position)) -> Self {
        Self { block, to }
    }
}

impl From<Move> for (usize, Position) {
    fn from(movement: Move) -> Self {
        (movement.block, movement.to)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {} -> {}", self.block, self.to)
    }
}

/// The first snapshot plus the moves that lead through the rest of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub initial: Snapshot,
    pub moves: Vec<Move>,
}

impl MoveRecord {
    /// Applies the moves to a copy of `initial`, returning `initial` followed
    /// by the board after each move.
    pub fn replay(&self) -> Result<Vec<Snapshot>, Error> {
        let mut boards = Vec::with_capacity(self.moves.len() + 1);
        let mut board = self.initial.clone();
        boards.push(board.clone());

        for movement in &self.moves {
            if !board.apply_move(movement) {
                return Err(Malformed::MoveOutOfRange {
                    block: movement.block,
                    blocks: board.blocks.len(),
                }
                .into());
            }
            boards.push(board.clone());
        }

        Ok(boards)
    }
}

/// Indices of the blocks whose position differs between two boards, ascending.
fn moved_blocks<'a>(prev: &'a Snapshot, curr: &'a Snapshot) -> impl Iterator<Item = usize> + 'a {
    prev.blocks
        .iter()
        .zip(&curr.blocks)
        .enumerate()
        .filter(|(_, (before, after))| !before.position.same_place(&after.position))
        .map(|(index, _)| index)
}

/// The lowest-indexed block that changed position between two boards, and
/// the indices of any other blocks that changed too.
fn scan_transition(prev: &Snapshot, curr: &Snapshot) -> Option<(Move, Vec<usize>)> {
    let mut moved = moved_blocks(prev, curr);
    let block = moved.next()?;
    let movement = Move::new(block, curr.blocks[block].position.clone());
    Some((movement, moved.collect()))
}

/// The move between two consecutive boards.
///
/// Only the lowest-indexed block that changed position is reported. Any
/// other block that also moved in the same transition is not: one transition
/// is one move. Returns `None` when nothing moved.
pub fn find_move(prev: &Snapshot, curr: &Snapshot) -> Option<Move> {
    scan_transition(prev, curr).map(|(movement, _)| movement)
}

/// Reduces a snapshot sequence to its first snapshot and the move made in
/// each following transition.
///
/// The sequence is validated up front, so either the whole record is
/// produced or an error is returned.
pub fn extract_moves(snapshots: &[Snapshot]) -> Result<MoveRecord, Error> {
    validate(snapshots)?;
    let (initial, rest) = snapshots.split_first().ok_or(Malformed::Empty)?;

    let (_, moves) = rest.iter().enumerate().fold(
        (initial, Vec::with_capacity(rest.len())),
        |(prev, mut moves), (offset, curr)| {
            let snapshot = offset + 1;
            match scan_transition(prev, curr) {
                Some((movement, ignored)) => {
                    if !ignored.is_empty() {
                        warn!(
                            "snapshot {}: blocks {:?} also moved, only block {} is recorded",
                            snapshot, ignored, movement.block
                        );
                    }
                    debug!("snapshot {}: {}", snapshot, movement);
                    moves.push(movement);
                }
                None => warn!("snapshot {}: no block moved", snapshot),
            }

            (curr, moves)
        },
    );

    info!(
        "extracted {} moves from {} snapshots",
        moves.len(),
        snapshots.len()
    );

    Ok(MoveRecord {
        initial: initial.clone(),
        moves,
    })
}

/// Checks that replaying `record` ends on the positions of the last snapshot.
pub fn verify(snapshots: &[Snapshot], record: &MoveRecord) -> Result<(), Error> {
    validate(snapshots)?;
    let replayed = record.replay()?;
    let (Some(last), Some(end)) = (snapshots.last(), replayed.last()) else {
        return Err(Malformed::Empty.into());
    };

    // `record` may come from a different sequence than `snapshots`.
    if end.blocks.len() != last.blocks.len() {
        return Err(Malformed::BlockCountChanged {
            snapshot: snapshots.len() - 1,
            expected: end.blocks.len(),
            actual: last.blocks.len(),
        }
        .into());
    }

    let mismatch = moved_blocks(end, last).next();
    match mismatch {
        Some(block) => Err(Error::ReplayMismatch { block }),
        None => Ok(()),
    }
}
