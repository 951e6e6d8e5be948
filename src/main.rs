use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use slider_moves::{extract_moves, read_snapshots, verify};

#[derive(Parser, Debug)]
#[command(name = "slider-moves")]
#[command(about = "Compress a sliding-block solution path into its initial board and a list of moves")]
struct Cli {
    /// Snapshot file to read (standard input when omitted)
    input: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Print every board of the replayed move list to standard error
    #[arg(long)]
    render: bool,

    /// Fail unless replaying the moves ends on the last snapshot
    #[arg(long)]
    verify: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    let snapshots = match &cli.input {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            read_snapshots(file).with_context(|| format!("reading {}", path.display()))?
        }
        None => read_snapshots(io::stdin().lock()).context("reading standard input")?,
    };
    info!("read {} snapshots", snapshots.len());

    let record = extract_moves(&snapshots).context("extracting moves")?;

    if cli.verify {
        verify(&snapshots, &record).context("verifying moves")?;
    }

    if cli.render {
        for (step, board) in record.replay()?.iter().enumerate() {
            eprintln!("{}:\n{}\n", step, board);
        }
    }

    let output = if cli.pretty {
        serde_json::to_string_pretty(&record)?
    } else {
        serde_json::to_string(&record)?
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", output).context("writing output")?;
    Ok(())
}
