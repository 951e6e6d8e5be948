use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Input is not a valid snapshot sequence: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Malformed input: {0}")]
    Malformed(#[from] Malformed),
    #[error("Replay does not reproduce the final snapshot, block {block} ends up elsewhere")]
    ReplayMismatch { block: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Malformed {
    #[error("the snapshot sequence is empty")]
    Empty,
    #[error("snapshot {snapshot} has no blocks")]
    NoBlocks { snapshot: usize },
    #[error("snapshot {snapshot} has {actual} blocks, expected {expected}")]
    BlockCountChanged {
        snapshot: usize,
        expected: usize,
        actual: usize,
    },
    #[error("block {block} of snapshot {snapshot} has {len} coordinates, expected at least 2")]
    ShortPosition {
        snapshot: usize,
        block: usize,
        len: usize,
    },
    #[error("move refers to block {block} but the board has {blocks} blocks")]
    MoveOutOfRange { block: usize, blocks: usize },
}
