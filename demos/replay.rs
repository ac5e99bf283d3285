use std::fs::File;
use std::io::BufReader;

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use nodeboard::{DashboardLogger, Recording, Replay};

/// Replays a recorded build through the dashboard.
#[derive(Parser, Debug)]
struct Args {
    /// JSON-lines recording of build events.
    #[clap(index = 1, default_value = "demos/build.jsonl")]
    recording: Utf8PathBuf,

    /// Number of build nodes; taken from the recording when omitted.
    #[clap(long)]
    nodes: Option<usize>,

    /// Redraw interval in milliseconds.
    #[clap(long, default_value_t = 33)]
    interval: u64,
}

fn main() -> anyhow::Result<()> {
    nodeboard::init_logging()?;
    let args = Args::parse();

    let file = File::open(&args.recording)
        .with_context(|| format!("Couldn't open {}", args.recording))?;
    let recording = Recording::from_reader(BufReader::new(file))?;
    let nodes = args.nodes.unwrap_or_else(|| recording.node_count());

    let mut source = Replay::new();
    let mut logger = DashboardLogger::new()
        .refresh_interval(std::time::Duration::from_millis(args.interval));
    logger.initialize(&mut source, nodes)?;

    source.play(&recording);
    logger.shutdown();

    Ok(())
}
