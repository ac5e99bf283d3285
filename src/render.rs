//! Erase-then-redraw rendering of the node table.
//!
//! The dashboard lives at the bottom of the terminal. Every frame first moves
//! the cursor back over the rows printed last time and clears to the end of
//! the screen, then prints the current rows. Completion lines are slipped in
//! between the erase and the redraw, so they scroll up into the history while
//! the dashboard stays pinned below them.

use std::io::{self, Write};
use std::time::Duration;

use camino::Utf8Path;
use console::Term;

use crate::dashboard::NodeSlot;

pub(crate) const BOLD: &str = "\x1b[1m";
pub(crate) const NORMAL_INTENSITY: &str = "\x1b[22m";

/// A terminal-like sink that knows how many columns it has.
pub trait Surface: Write + Send {
    fn width(&self) -> usize;

    /// Whether cursor movement is going to be interpreted.
    fn is_terminal(&self) -> bool {
        true
    }
}

impl Surface for Term {
    fn width(&self) -> usize {
        usize::from(self.size().1)
    }

    fn is_terminal(&self) -> bool {
        self.is_term()
    }
}

/// Formats one dashboard row, cut to fit in `width - 1` columns so the
/// terminal never wraps it onto a second line.
pub fn format_row(path: &Utf8Path, target: &str, elapsed: Duration, width: usize) -> String {
    let line = format!("{path} {target} ({:.1}s)", elapsed.as_secs_f64());
    console::truncate_str(&line, width.saturating_sub(1), "").into_owned()
}

/// The line printed once a notable project finishes.
pub fn format_completion(path: &Utf8Path, elapsed: Duration) -> String {
    format!(
        "{path} {BOLD}completed{NORMAL_INTENSITY} ({:.1}s)",
        elapsed.as_secs_f64()
    )
}

pub struct Console<S> {
    surface: S,
    /// Rows printed by the last redraw that reached the surface.
    used_rows: usize,
}

impl<S> Console<S>
where
    S: Surface,
{
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            used_rows: 0,
        }
    }

    pub fn used_rows(&self) -> usize {
        self.used_rows
    }

    /// Replaces the dashboard with the current state of `nodes`.
    pub fn refresh(&mut self, nodes: &[Option<NodeSlot>]) -> io::Result<()> {
        let mut frame = self.erase();
        let rows = self.redraw(&mut frame, nodes);
        self.present(frame, rows)
    }

    /// Prints `line` above the dashboard.
    pub fn announce(&mut self, line: &str, nodes: &[Option<NodeSlot>]) -> io::Result<()> {
        let mut frame = self.erase();
        frame.push_str(line);
        frame.push('\n');
        let rows = self.redraw(&mut frame, nodes);
        self.present(frame, rows)
    }

    /// Removes the dashboard without drawing it again.
    pub fn clear(&mut self) -> io::Result<()> {
        let frame = self.erase();
        self.present(frame, 0)
    }

    /// The dashboard block is one blank line plus `used_rows` rows, and the
    /// cursor sits right below it, so going up `used_rows + 1` lines lands on
    /// its first line.
    fn erase(&self) -> String {
        if self.used_rows == 0 {
            return String::new();
        }

        format!("\x1b[{}F\x1b[0J", self.used_rows + 1)
    }

    fn redraw(&self, frame: &mut String, nodes: &[Option<NodeSlot>]) -> usize {
        let width = self.surface.width();
        let mut printed = 0;

        for slot in nodes.iter().flatten() {
            if printed == 0 {
                frame.push('\n');
            }
            let row = format_row(&slot.path, &slot.target, slot.timer.elapsed(), width);
            frame.push_str(&row);
            frame.push('\n');
            printed += 1;
        }

        printed
    }

    /// Writes the frame and only then records how many rows it left on
    /// screen. A failed write keeps the previous count.
    fn present(&mut self, frame: String, rows: usize) -> io::Result<()> {
        if !frame.is_empty() {
            self.surface.write_all(frame.as_bytes())?;
            self.surface.flush()?;
        }

        self.used_rows = rows;
        Ok(())
    }
}
