#![forbid(unsafe_code)]
//! A live, in-place terminal dashboard for a running build.
//!
//! While the build engine works, the bottom of the terminal shows one row per
//! busy node: the project it is building, the target it is running and how
//! long that project has been going. Whenever a project the user actually
//! asked for finishes, a single `completed` line scrolls up above the rows.
//!
//! ```no_run
//! use nodeboard::{DashboardLogger, Recording, Replay};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = std::fs::File::open("build.jsonl")?;
//! let recording = Recording::from_reader(std::io::BufReader::new(file))?;
//!
//! let mut source = Replay::new();
//! let mut logger = DashboardLogger::new();
//! logger.initialize(&mut source, recording.node_count())?;
//!
//! source.play(&recording);
//! logger.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! Warnings and errors are not something this dashboard can show. Receiving
//! one is treated as a bug in whoever wired the logger up, and the event
//! handler panics.

mod dashboard;
mod error;
mod identity;
mod logger;
mod notable;
mod refresh;
mod render;
mod replay;
#[cfg(feature = "logging")]
mod utils;

pub use crate::dashboard::{Dashboard, NodeSlot, ProjectTimer, SharedDashboard};
pub use crate::error::*;
pub use crate::identity::{Identity, NodeIndex, ProjectContext, ProjectInstance};
pub use crate::logger::{
    BuildEvent, BuildEventContext, DashboardLogger, EventHandler, EventSource, Verbosity,
};
pub use crate::notable::is_notable;
pub use crate::refresh::{DEFAULT_INTERVAL, Refresher};
pub use crate::render::{Surface, format_completion, format_row};
pub use crate::replay::{RecordedEvent, Recording, Replay};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
