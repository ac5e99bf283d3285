use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::DashboardError;
use crate::identity::{NodeIndex, ProjectContext, ProjectInstance};
use crate::notable::is_notable;
use crate::render::{Console, Surface, format_completion};

/// Monotonic clock started when a project context starts.
#[derive(Debug, Clone, Copy)]
pub struct ProjectTimer(Instant);

impl ProjectTimer {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

/// What a single node is busy with right now.
#[derive(Debug, Clone)]
pub struct NodeSlot {
    pub(crate) path: Utf8PathBuf,
    pub(crate) target: String,
    pub(crate) timer: ProjectTimer,
}

impl NodeSlot {
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

#[derive(Debug)]
struct ProjectRecord {
    notable: bool,
    path: Utf8PathBuf,
    targets: String,
    timer: ProjectTimer,
}

/// All mutable state of one build: the node table, per-context records and
/// the terminal they are drawn to.
///
/// Every method expects to be called with the surrounding lock held, see
/// [`SharedDashboard`]. Nothing is ever evicted; the whole thing is dropped
/// at the end of the build.
pub struct Dashboard<S> {
    nodes: Vec<Option<NodeSlot>>,
    projects: HashMap<ProjectContext, ProjectRecord>,
    /// First context seen for each instance. Only that context may announce
    /// the instance as completed.
    owners: HashMap<ProjectInstance, ProjectContext>,
    console: Console<S>,
}

impl<S> Dashboard<S>
where
    S: Surface,
{
    pub fn new(node_count: usize, surface: S) -> Self {
        Self {
            nodes: vec![None; node_count],
            projects: HashMap::new(),
            owners: HashMap::new(),
            console: Console::new(surface),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn slot(&self, node: NodeIndex) -> Option<&NodeSlot> {
        self.nodes.get(node.get()).and_then(Option::as_ref)
    }

    pub fn used_rows(&self) -> usize {
        self.console.used_rows()
    }

    pub fn project_started(
        &mut self,
        context: ProjectContext,
        instance: ProjectInstance,
        path: Utf8PathBuf,
        targets: &str,
    ) {
        let notable = is_notable(targets);
        tracing::debug!(?context, ?instance, %path, targets, notable, "project started");

        self.projects.insert(
            context,
            ProjectRecord {
                notable,
                path,
                targets: targets.to_owned(),
                timer: ProjectTimer::start(),
            },
        );
        self.owners.entry(instance).or_insert(context);
    }

    pub fn project_finished(
        &mut self,
        context: ProjectContext,
        instance: ProjectInstance,
    ) -> Result<(), DashboardError> {
        let record = self
            .projects
            .get(&context)
            .ok_or(DashboardError::MissingContext {
                event: "project finished",
                context,
            })?;

        let owner = self.owners.get(&instance) == Some(&context);
        tracing::debug!(
            ?context,
            ?instance,
            targets = %record.targets,
            owner,
            "project finished"
        );

        if record.notable && owner {
            let line = format_completion(&record.path, record.timer.elapsed());
            self.console.announce(&line, &self.nodes)?;
        }

        Ok(())
    }

    pub fn target_started(
        &mut self,
        node: NodeIndex,
        context: ProjectContext,
        path: Utf8PathBuf,
        target: String,
    ) -> Result<(), DashboardError> {
        let timer = self
            .projects
            .get(&context)
            .ok_or(DashboardError::MissingContext {
                event: "target started",
                context,
            })?
            .timer;

        if let Some(slot) = self.nodes.get_mut(node.get()) {
            if let Some(previous) = slot {
                tracing::warn!(?node, target = %previous.target, "node slot overwritten");
            }
            *slot = Some(NodeSlot {
                path,
                target,
                timer,
            });
        }

        Ok(())
    }

    pub fn target_finished(&mut self, node: NodeIndex) {
        if let Some(slot) = self.nodes.get_mut(node.get()) {
            *slot = None;
        }
    }

    /// Erases the rows printed last time and draws the node table again.
    pub fn refresh(&mut self) -> io::Result<()> {
        self.console.refresh(&self.nodes)
    }

    /// Erases the rows printed last time and leaves the screen empty.
    pub fn clear(&mut self) -> io::Result<()> {
        self.console.clear()
    }
}

/// The one lock every event handler and the refresh thread go through.
pub struct SharedDashboard<S>(Arc<Mutex<Dashboard<S>>>);

impl<S> Clone for SharedDashboard<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S> SharedDashboard<S> {
    pub fn new(dashboard: Dashboard<S>) -> Self {
        Self(Arc::new(Mutex::new(dashboard)))
    }

    /// Handlers never panic with the guard held, so the state behind a
    /// poisoned lock is still whole.
    pub fn lock(&self) -> MutexGuard<'_, Dashboard<S>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
