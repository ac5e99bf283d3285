use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::dashboard::SharedDashboard;
use crate::render::Surface;

/// Roughly thirty frames per second.
pub const DEFAULT_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 30);

/// Background thread that redraws the dashboard at a fixed cadence.
pub struct Refresher {
    stop: Sender<()>,
    thread: JoinHandle<()>,
}

impl Refresher {
    pub fn spawn<S>(dashboard: SharedDashboard<S>, interval: Duration) -> io::Result<Self>
    where
        S: Surface + 'static,
    {
        let (stop, signal) = channel();
        let thread = thread::Builder::new()
            .name("nodeboard-refresh".into())
            .spawn(move || run(dashboard, interval, signal))?;

        Ok(Self { stop, thread })
    }

    /// Signals the thread and waits for it to write its final erase.
    pub fn stop(self) {
        // The thread may already be gone if it panicked; join reports that.
        let _ = self.stop.send(());

        if self.thread.join().is_err() {
            tracing::error!("refresh thread panicked");
        }
    }
}

fn run<S>(dashboard: SharedDashboard<S>, interval: Duration, signal: Receiver<()>)
where
    S: Surface,
{
    tracing::debug!(?interval, "refresh thread started");

    loop {
        match signal.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {
                if let Err(e) = dashboard.lock().refresh() {
                    tracing::error!("failed to redraw the dashboard: {e}");
                }
            }
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Err(e) = dashboard.lock().clear() {
        tracing::error!("failed to erase the dashboard: {e}");
    }

    tracing::debug!("refresh thread stopped");
}

#[cfg(test)]
mod test {
    use std::time::Instant;

    use super::*;
    use crate::dashboard::Dashboard;
    use crate::identity::{NodeIndex, ProjectContext, ProjectInstance};
    use crate::render::testing::Capture;

    fn busy_dashboard() -> (SharedDashboard<Capture>, Capture) {
        let capture = Capture::new(80);
        let shared = SharedDashboard::new(Dashboard::new(1, capture.clone()));
        {
            let mut board = shared.lock();
            let ctx = ProjectContext(1);
            board.project_started(ctx, ProjectInstance(1), "a.proj".into(), "");
            board
                .target_started(
                    NodeIndex::from_node_id(1, 1).unwrap(),
                    ctx,
                    "a.proj".into(),
                    "Build".into(),
                )
                .unwrap();
        }
        (shared, capture)
    }

    #[test]
    fn test_redraws_until_stopped() {
        let (shared, capture) = busy_dashboard();

        let refresher = Refresher::spawn(shared.clone(), Duration::from_millis(5)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while capture.count("a.proj Build (") < 2 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        refresher.stop();

        assert!(capture.count("a.proj Build (") >= 2);
        assert!(capture.text().ends_with("\x1b[2F\x1b[0J"));
        assert_eq!(shared.lock().used_rows(), 0);

        // Nothing is written once stop has returned.
        let before = capture.text();
        thread::sleep(Duration::from_millis(30));
        assert_eq!(capture.text(), before);
    }

    #[test]
    fn test_stop_before_first_frame() {
        let (shared, capture) = busy_dashboard();

        let refresher = Refresher::spawn(shared, Duration::from_secs(60)).unwrap();
        refresher.stop();

        assert_eq!(capture.text(), "");
    }
}
