use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Malformed};
use crate::moves::Move;

/// Boards larger than this are listed block by block instead of drawn.
const MAX_RENDER_CELLS: u64 = 1 << 16;

/// The `position` array of a block, kept exactly as it was read.
///
/// Only the first two coordinates take part in comparisons, and they compare
/// by numeric value so `1` and `1.0` are the same place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(Vec<Number>);

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self(vec![x.into(), y.into()])
    }

    pub fn coordinates(&self) -> &[Number] {
        &self.0
    }

    fn coordinate(&self, axis: usize) -> Option<f64> {
        self.0.get(axis).and_then(Number::as_f64)
    }

    pub fn same_place(&self, other: &Position) -> bool {
        (0..2).all(|axis| self.coordinate(axis) == other.coordinate(axis))
    }

    /// Grid cell `(column, row)` when both coordinates are non-negative integers.
    fn cell(&self) -> Option<(u64, u64)> {
        Some((self.0.first()?.as_u64()?, self.0.get(1)?.as_u64()?))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (axis, value) in self.0.iter().enumerate() {
            if axis > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub position: Position,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            extra: Map::new(),
        }
    }

    /// Footprint `(width, height)` from the block's `size` field, if it has one.
    pub fn extent(&self) -> Option<(u64, u64)> {
        dimensions(self.extra.get("size")?)
    }
}

/// One board state. Block order is block identity across snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub blocks: Vec<Block>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            extra: Map::new(),
        }
    }

    /// Board `(width, height)` from the snapshot's `size` field, if it has one.
    pub fn board_size(&self) -> Option<(u64, u64)> {
        dimensions(self.extra.get("size")?)
    }

    /// Moves a block to its new position. Returns `false` and leaves the
    /// snapshot untouched if the block does not exist.
    pub fn apply_move(&mut self, movement: &Move) -> bool {
        match self.blocks.get_mut(movement.block) {
            Some(block) => {
                block.position = movement.to.clone();
                true
            }
            None => false,
        }
    }

    fn grid(&self) -> Option<Vec<Vec<char>>> {
        let (width, height) = self.board_size()?;
        if width == 0
            || height == 0
            || width > MAX_RENDER_CELLS
            || height > MAX_RENDER_CELLS
            || width * height > MAX_RENDER_CELLS
        {
            return None;
        }

        let footprints = self
            .blocks
            .iter()
            .map(|block| Some((block.position.cell()?, block.extent()?)))
            .collect::<Option<Vec<_>>>()?;

        let mut grid = vec![vec![' '; width as usize]; height as usize];
        for (index, ((x, y), (w, h))) in footprints.into_iter().enumerate() {
            let label = std::char::from_digit((index % 36) as u32, 36).unwrap_or('#');

            for row in y..y.saturating_add(h).min(height) {
                for column in x..x.saturating_add(w).min(width) {
                    grid[row as usize][column as usize] = label;
                }
            }
        }
        Some(grid)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(grid) = self.grid() else {
            for (index, block) in self.blocks.iter().enumerate() {
                if index > 0 {
                    writeln!(f)?;
                }
                write!(f, "{}: {}", index, block.position)?;
            }
            return Ok(());
        };

        let width = grid.first().map_or(0, Vec::len);
        let separator = "-".repeat(width + 2);

        writeln!(f, "{}", separator)?;
        for row in &grid {
            let line: String = row.iter().collect();
            writeln!(f, "|{}|", line)?;
        }
        write!(f, "{}", separator)
    }
}

fn dimensions(value: &Value) -> Option<(u64, u64)> {
    match value.as_array()?.as_slice() {
        [width, height, ..] => Some((width.as_u64()?, height.as_u64()?)),
        _ => None,
    }
}

/// Checks what the extractor relies on: at least one snapshot, every snapshot
/// with the same non-zero number of blocks, every position with two coordinates.
pub fn validate(snapshots: &[Snapshot]) -> Result<(), Malformed> {
    let expected = snapshots.first().ok_or(Malformed::Empty)?.blocks.len();

    for (snapshot, board) in snapshots.iter().enumerate() {
        if board.blocks.is_empty() {
            return Err(Malformed::NoBlocks { snapshot });
        }
        if board.blocks.len() != expected {
            return Err(Malformed::BlockCountChanged {
                snapshot,
                expected,
                actual: board.blocks.len(),
            });
        }
        for (block, entry) in board.blocks.iter().enumerate() {
            let len = entry.position.coordinates().len();
            if len < 2 {
                return Err(Malformed::ShortPosition {
                    snapshot,
                    block,
                    len,
                });
            }
        }
    }

    Ok(())
}

/// Parses and validates a JSON snapshot sequence.
pub fn parse_snapshots(input: &str) -> Result<Vec<Snapshot>, Error> {
    let snapshots: Vec<Snapshot> = serde_json::from_str(input)?;
    validate(&snapshots)?;
    Ok(snapshots)
}

/// Reads a JSON snapshot sequence to the end, then parses and validates it.
/// Bytes that are not UTF-8 are a parse error, not a read error.
pub fn read_snapshots<R: Read>(mut reader: R) -> Result<Vec<Snapshot>, Error> {
    let mut input = Vec::new();
    reader.read_to_end(&mut input)?;
    let snapshots: Vec<Snapshot> = serde_json::from_slice(&input)?;
    validate(&snapshots)?;
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn board(positions: &[(i64, i64)]) -> Snapshot {
        Snapshot::new(
            positions
                .iter()
                .map(|&(x, y)| Block::new(Position::new(x, y)))
                .collect(),
        )
    }

    #[test]
    fn integer_and_float_coordinates_are_the_same_place() {
        let a: Position = serde_json::from_value(json!([1, 2])).unwrap();
        let b: Position = serde_json::from_value(json!([1.0, 2.0])).unwrap();
        let c: Position = serde_json::from_value(json!([1, 3])).unwrap();

        assert!(a.same_place(&b));
        assert!(!a.same_place(&c));
    }

    #[test]
    fn extra_coordinates_are_ignored_when_comparing() {
        let a: Position = serde_json::from_value(json!([4, 5, 0])).unwrap();
        let b: Position = serde_json::from_value(json!([4, 5, 9])).unwrap();
        assert!(a.same_place(&b));
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let value = json!({
            "size": [4, 5],
            "blocks": [{"position": [0, 0], "size": [2, 2], "name": "A"}]
        });
        let snapshot: Snapshot = serde_json::from_value(value.clone()).unwrap();

        assert_eq!(snapshot.board_size(), Some((4, 5)));
        assert_eq!(snapshot.blocks[0].extent(), Some((2, 2)));
        assert_eq!(serde_json::to_value(&snapshot).unwrap(), value);
    }

    #[test]
    fn missing_blocks_is_a_parse_error() {
        let err = parse_snapshots(r#"[{"tiles": []}]"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn non_numeric_position_is_a_parse_error() {
        let err = parse_snapshots(r#"[{"blocks": [{"position": ["a", 0]}]}]"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn empty_sequence_is_malformed() {
        assert_eq!(validate(&[]), Err(Malformed::Empty));
        assert!(matches!(
            parse_snapshots("[]"),
            Err(Error::Malformed(Malformed::Empty))
        ));
    }

    #[test]
    fn snapshot_without_blocks_is_malformed() {
        let snapshots = vec![board(&[(0, 0)]), Snapshot::new(Vec::new())];
        assert_eq!(
            validate(&snapshots),
            Err(Malformed::NoBlocks { snapshot: 1 })
        );
    }

    #[test]
    fn changing_block_count_is_malformed() {
        let snapshots = vec![board(&[(0, 0), (1, 1)]), board(&[(0, 0)])];
        assert_eq!(
            validate(&snapshots),
            Err(Malformed::BlockCountChanged {
                snapshot: 1,
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn short_position_is_malformed() {
        let err = parse_snapshots(r#"[{"blocks": [{"position": [0, 0]}, {"position": [3]}]}]"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Malformed(Malformed::ShortPosition {
                snapshot: 0,
                block: 1,
                len: 1
            })
        ));
    }

    #[test]
    fn apply_move_rejects_unknown_blocks() {
        let mut snapshot = board(&[(0, 0), (1, 1)]);

        assert!(snapshot.apply_move(&Move::new(1, Position::new(2, 1))));
        assert_eq!(snapshot, board(&[(0, 0), (2, 1)]));

        assert!(!snapshot.apply_move(&Move::new(2, Position::new(5, 5))));
        assert_eq!(snapshot, board(&[(0, 0), (2, 1)]));
    }

    #[test]
    fn renders_grid_when_sizes_are_known() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "size": [3, 2],
            "blocks": [
                {"position": [0, 0], "size": [2, 1]},
                {"position": [2, 0], "size": [1, 2]}
            ]
        }))
        .unwrap();

        assert_eq!(snapshot.to_string(), "-----\n|001|\n|  1|\n-----");
    }

    #[test]
    fn renders_positions_without_sizes() {
        let snapshot = board(&[(0, 0), (2, 1)]);
        assert_eq!(snapshot.to_string(), "0: [0, 0]\n1: [2, 1]");
    }

    #[test]
    fn degenerate_or_huge_boards_fall_back_to_listing() {
        let zero_height: Snapshot = serde_json::from_value(json!({
            "size": [1099511627776u64, 0],
            "blocks": [{"position": [0, 0], "size": [1, 1]}]
        }))
        .unwrap();
        assert_eq!(zero_height.to_string(), "0: [0, 0]");

        let huge_width: Snapshot = serde_json::from_value(json!({
            "size": [1099511627776u64, 1],
            "blocks": [{"position": [0, 0], "size": [1, 1]}]
        }))
        .unwrap();
        assert_eq!(huge_width.to_string(), "0: [0, 0]");
    }

    #[test]
    fn block_without_size_falls_back_to_listing() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "size": [2, 1],
            "blocks": [{"position": [0, 0], "size": [1, 1]}, {"position": [1, 0]}]
        }))
        .unwrap();
        assert_eq!(snapshot.to_string(), "0: [0, 0]\n1: [1, 0]");
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let input: &[u8] = b"[{\"blocks\":[{\"position\":[0,0],\"name\":\"\xff\"}]}]";
        assert!(matches!(read_snapshots(input), Err(Error::Parse(_))));
    }

    #[test]
    fn reads_snapshots_from_bytes() {
        let input: &[u8] = br#"[{"blocks":[{"position":[0,0]}]}]"#;
        assert_eq!(read_snapshots(input).unwrap(), vec![board(&[(0, 0)])]);
    }

    #[test]
    fn growing_board_is_malformed() {
        let snapshots = vec![board(&[(0, 0)]), board(&[(0, 0), (1, 1)])];
        assert_eq!(
            validate(&snapshots),
            Err(Malformed::BlockCountChanged {
                snapshot: 1,
                expected: 1,
                actual: 2
            })
        );
        assert!(matches!(
            crate::moves::extract_moves(&snapshots),
            Err(Error::Malformed(Malformed::BlockCountChanged {
                snapshot: 1,
                expected: 1,
                actual: 2
            }))
        ));
    }

    #[test]
    fn first_snapshot_without_blocks_is_malformed() {
        let err = parse_snapshots(r#"[{"blocks": []}, {"blocks": [{"position": [0, 0]}]}]"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Malformed(Malformed::NoBlocks { snapshot: 0 })
        ));
    }
}
