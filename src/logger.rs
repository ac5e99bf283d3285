//! The boundary with the build engine.
//!
//! The engine knows nothing about the dashboard. It hands the logger an
//! [`EventSource`] to subscribe to and the number of nodes it is going to
//! run; the logger translates every [`BuildEvent`] into a call on the
//! [`Dashboard`](crate::Dashboard) and keeps the refresh thread alive until
//! [`shutdown`](DashboardLogger::shutdown).

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8PathBuf;
use console::Term;
use serde::{Deserialize, Serialize};

use crate::dashboard::{Dashboard, SharedDashboard};
use crate::error::DashboardError;
use crate::identity::Identity;
use crate::refresh::{DEFAULT_INTERVAL, Refresher};
use crate::render::Surface;

/// Who produced an event, as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEventContext {
    /// 1-based.
    pub node_id: i32,
    pub project_context_id: i32,
    pub project_instance_id: i32,
}

impl BuildEventContext {
    pub fn identity(&self, node_count: usize) -> Identity {
        Identity::resolve(
            self.project_context_id,
            self.project_instance_id,
            self.node_id,
            node_count,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuildEvent {
    BuildStarted,
    BuildFinished,
    ProjectStarted {
        context: BuildEventContext,
        project_file: Utf8PathBuf,
        /// Requested targets joined with `;`, empty for a default build.
        #[serde(default)]
        target_names: String,
    },
    ProjectFinished {
        context: BuildEventContext,
        project_file: Utf8PathBuf,
    },
    TargetStarted {
        context: BuildEventContext,
        project_file: Utf8PathBuf,
        target_name: String,
    },
    TargetFinished {
        context: BuildEventContext,
        project_file: Utf8PathBuf,
        target_name: String,
    },
    TaskStarted {
        context: BuildEventContext,
        task_name: String,
    },
    Message {
        context: Option<BuildEventContext>,
        message: String,
    },
    Warning {
        context: Option<BuildEventContext>,
        message: String,
    },
    Error {
        context: Option<BuildEventContext>,
        message: String,
    },
}

impl BuildEvent {
    pub fn context(&self) -> Option<&BuildEventContext> {
        match self {
            BuildEvent::BuildStarted | BuildEvent::BuildFinished => None,
            BuildEvent::ProjectStarted { context, .. }
            | BuildEvent::ProjectFinished { context, .. }
            | BuildEvent::TargetStarted { context, .. }
            | BuildEvent::TargetFinished { context, .. }
            | BuildEvent::TaskStarted { context, .. } => Some(context),
            BuildEvent::Message { context, .. }
            | BuildEvent::Warning { context, .. }
            | BuildEvent::Error { context, .. } => context.as_ref(),
        }
    }
}

/// Callback invoked by the engine, possibly from many threads at once.
pub type EventHandler = Arc<dyn Fn(&BuildEvent) + Send + Sync>;

/// Anything that delivers build events.
pub trait EventSource {
    fn subscribe(&mut self, handler: EventHandler);
}

/// Output detail requested by the engine. The dashboard only knows one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    Quiet,
    #[default]
    Minimal,
    Normal,
    Detailed,
    Diagnostic,
}

pub struct DashboardLogger<S = Term> {
    surface: Option<S>,
    interval: Duration,
    dashboard: Option<SharedDashboard<S>>,
    refresher: Option<Refresher>,
}

impl DashboardLogger<Term> {
    /// A logger drawing to standard output.
    pub fn new() -> Self {
        Self::with_surface(Term::stdout())
    }
}

impl Default for DashboardLogger<Term> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> DashboardLogger<S> {
    pub fn with_surface(surface: S) -> Self {
        Self {
            surface: Some(surface),
            interval: DEFAULT_INTERVAL,
            dashboard: None,
            refresher: None,
        }
    }

    /// How often the dashboard is redrawn between events.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::Minimal
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        tracing::debug!(?verbosity, "ignoring requested verbosity");
    }

    /// State of the running build, `None` before initialization and after
    /// shutdown.
    pub fn dashboard(&self) -> Option<&SharedDashboard<S>> {
        self.dashboard.as_ref()
    }

    /// Stops the refresh thread and returns once the dashboard has been
    /// erased from the terminal.
    pub fn shutdown(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.stop();
        }
        self.dashboard = None;
    }
}

impl<S> DashboardLogger<S>
where
    S: Surface + 'static,
{
    /// Subscribes to `source` and starts the refresh thread.
    ///
    /// # Panics
    ///
    /// The subscribed handler panics on warnings, errors and on events that
    /// refer to a project context that never started. The dashboard has no
    /// way to show the former and cannot stay correct after the latter.
    pub fn initialize(
        &mut self,
        source: &mut dyn EventSource,
        node_count: usize,
    ) -> Result<(), DashboardError> {
        let surface = self
            .surface
            .take()
            .ok_or(DashboardError::AlreadyInitialized)?;

        if !surface.is_terminal() {
            tracing::warn!("output is not a terminal, the dashboard will print raw escape codes");
        }

        let dashboard = SharedDashboard::new(Dashboard::new(node_count, surface));

        let board = dashboard.clone();
        source.subscribe(Arc::new(move |event: &BuildEvent| {
            if let Err(err) = dispatch(&board, node_count, event) {
                tracing::error!("{err}");
                panic!("{err}");
            }
        }));

        self.refresher = Some(Refresher::spawn(dashboard.clone(), self.interval)?);
        self.dashboard = Some(dashboard);

        tracing::debug!(node_count, "dashboard logger initialized");
        Ok(())
    }
}

impl<S> Drop for DashboardLogger<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch<S>(
    board: &SharedDashboard<S>,
    node_count: usize,
    event: &BuildEvent,
) -> Result<(), DashboardError>
where
    S: Surface,
{
    match event {
        BuildEvent::BuildStarted
        | BuildEvent::BuildFinished
        | BuildEvent::TaskStarted { .. }
        | BuildEvent::Message { .. } => Ok(()),

        BuildEvent::Warning { message, .. } => Err(DashboardError::UnsupportedEvent {
            kind: "warning",
            message: message.clone(),
        }),
        BuildEvent::Error { message, .. } => Err(DashboardError::UnsupportedEvent {
            kind: "error",
            message: message.clone(),
        }),

        BuildEvent::ProjectStarted {
            context,
            project_file,
            target_names,
        } => {
            let id = context.identity(node_count);
            board
                .lock()
                .project_started(id.context, id.instance, project_file.clone(), target_names);
            Ok(())
        }
        BuildEvent::ProjectFinished { context, .. } => {
            let id = context.identity(node_count);
            board.lock().project_finished(id.context, id.instance)
        }
        BuildEvent::TargetStarted {
            context,
            project_file,
            target_name,
        } => {
            let id = context.identity(node_count);
            let Some(node) = id.node else {
                tracing::warn!(node_id = context.node_id, node_count, "node out of range");
                return Ok(());
            };
            board.lock().target_started(
                node,
                id.context,
                project_file.clone(),
                target_name.clone(),
            )
        }
        BuildEvent::TargetFinished { context, .. } => {
            let Some(node) = context.identity(node_count).node else {
                tracing::warn!(node_id = context.node_id, node_count, "node out of range");
                return Ok(());
            };
            board.lock().target_finished(node);
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::identity::NodeIndex;
    use crate::render::testing::Capture;
    use crate::replay::Replay;

    fn ctx(node_id: i32, context: i32, instance: i32) -> BuildEventContext {
        BuildEventContext {
            node_id,
            project_context_id: context,
            project_instance_id: instance,
        }
    }

    fn project_started(context: BuildEventContext, path: &str, targets: &str) -> BuildEvent {
        BuildEvent::ProjectStarted {
            context,
            project_file: path.into(),
            target_names: targets.into(),
        }
    }

    fn project_finished(context: BuildEventContext, path: &str) -> BuildEvent {
        BuildEvent::ProjectFinished {
            context,
            project_file: path.into(),
        }
    }

    fn target_started(context: BuildEventContext, path: &str, target: &str) -> BuildEvent {
        BuildEvent::TargetStarted {
            context,
            project_file: path.into(),
            target_name: target.into(),
        }
    }

    fn target_finished(context: BuildEventContext, path: &str, target: &str) -> BuildEvent {
        BuildEvent::TargetFinished {
            context,
            project_file: path.into(),
            target_name: target.into(),
        }
    }

    fn logger(node_count: usize) -> (DashboardLogger<Capture>, Replay, Capture) {
        let capture = Capture::new(80);
        let mut logger =
            DashboardLogger::with_surface(capture.clone()).refresh_interval(Duration::from_secs(60));
        let mut source = Replay::new();
        logger.initialize(&mut source, node_count).unwrap();
        (logger, source, capture)
    }

    #[test]
    fn test_scenario_two_nodes() {
        let (mut logger, source, capture) = logger(2);
        let board = logger.dashboard().unwrap().clone();
        let node = |id| NodeIndex::from_node_id(id, 2).unwrap();

        source.dispatch(&BuildEvent::BuildStarted);
        source.dispatch(&project_started(ctx(1, 1, 1), "app.proj", ""));
        source.dispatch(&target_started(ctx(1, 1, 1), "app.proj", "Build"));
        assert_eq!(board.lock().slot(node(1)).unwrap().target(), "Build");

        source.dispatch(&target_started(ctx(2, 1, 1), "app.proj", "Restore"));
        assert_eq!(board.lock().slot(node(2)).unwrap().target(), "Restore");

        source.dispatch(&target_finished(ctx(2, 1, 1), "app.proj", "Restore"));
        assert!(board.lock().slot(node(2)).is_none());

        source.dispatch(&project_finished(ctx(1, 1, 1), "app.proj"));
        source.dispatch(&BuildEvent::BuildFinished);

        logger.shutdown();
        assert_eq!(capture.count("app.proj \x1b[1mcompleted\x1b[22m ("), 1);
        assert!(capture.text().ends_with("\x1b[0J"));
    }

    #[test]
    fn test_scenario_introspection_only() {
        let (mut logger, source, capture) = logger(2);

        source.dispatch(&project_started(ctx(1, 2, 2), "lib.proj", "GetTargetFrameworks"));
        source.dispatch(&project_finished(ctx(1, 2, 2), "lib.proj"));

        logger.shutdown();
        assert_eq!(capture.count("completed"), 0);
    }

    #[test]
    fn test_ignored_events() {
        let (mut logger, source, capture) = logger(1);

        source.dispatch(&BuildEvent::BuildStarted);
        source.dispatch(&BuildEvent::TaskStarted {
            context: ctx(1, 1, 1),
            task_name: "Csc".into(),
        });
        source.dispatch(&BuildEvent::Message {
            context: None,
            message: "hello".into(),
        });
        source.dispatch(&BuildEvent::BuildFinished);

        logger.shutdown();
        assert_eq!(capture.text(), "");
    }

    #[test]
    fn test_out_of_range_node_is_ignored() {
        let (logger, source, _) = logger(1);
        let board = logger.dashboard().unwrap().clone();

        source.dispatch(&project_started(ctx(1, 1, 1), "app.proj", ""));
        source.dispatch(&target_started(ctx(2, 1, 1), "app.proj", "Build"));
        source.dispatch(&target_finished(ctx(0, 1, 1), "app.proj", "Build"));

        let board = board.lock();
        assert_eq!(board.node_count(), 1);
        assert!(board.slot(NodeIndex::from_node_id(1, 1).unwrap()).is_none());
    }

    #[test]
    #[should_panic(expected = "unsupported event: warning")]
    fn test_warning_is_fatal() {
        let (_logger, source, _) = logger(1);
        source.dispatch(&BuildEvent::Warning {
            context: None,
            message: "CS0168".into(),
        });
    }

    #[test]
    #[should_panic(expected = "unsupported event: error")]
    fn test_error_is_fatal() {
        let (_logger, source, _) = logger(1);
        source.dispatch(&BuildEvent::Error {
            context: Some(ctx(1, 1, 1)),
            message: "CS1002".into(),
        });
    }

    #[test]
    #[should_panic(expected = "never started")]
    fn test_finish_without_start_is_fatal() {
        let (_logger, source, _) = logger(1);
        source.dispatch(&project_finished(ctx(1, 9, 9), "ghost.proj"));
    }

    #[test]
    fn test_initialize_twice() {
        let (mut logger, mut source, _) = logger(1);
        let err = logger.initialize(&mut source, 1).unwrap_err();
        assert!(matches!(err, DashboardError::AlreadyInitialized));
    }

    #[test]
    fn test_shutdown_erases_and_discards_state() {
        let (mut logger, source, capture) = logger(1);
        let board = logger.dashboard().unwrap().clone();

        source.dispatch(&project_started(ctx(1, 1, 1), "app.proj", ""));
        source.dispatch(&target_started(ctx(1, 1, 1), "app.proj", "Build"));
        board.lock().refresh().unwrap();
        assert_eq!(board.lock().used_rows(), 1);

        logger.shutdown();

        assert!(logger.dashboard().is_none());
        assert!(capture.text().ends_with("\x1b[2F\x1b[0J"));
        assert_eq!(board.lock().used_rows(), 0);

        // A second shutdown has nothing left to do.
        logger.shutdown();
        assert_eq!(capture.count("\x1b[0J"), 1);
    }

    #[test]
    fn test_verbosity_is_fixed() {
        let (mut logger, _, _) = logger(1);
        logger.set_verbosity(Verbosity::Diagnostic);
        assert_eq!(logger.verbosity(), Verbosity::Minimal);
    }

    #[test]
    fn test_event_context() {
        assert!(BuildEvent::BuildStarted.context().is_none());
        let event = target_started(ctx(3, 4, 5), "a.proj", "Build");
        let id = event.context().unwrap().identity(4);
        assert_eq!(id.node.map(NodeIndex::get), Some(2));
    }
}
