//! Small value identities derived from the engine's event metadata.
//!
//! The engine tags every event with a context id, an instance id and the id
//! of the node that produced it. These are plain integers on the wire; here
//! they are wrapped so that a context can never be confused with an instance
//! when used as a map key.

/// One logical run (evaluation plus build) of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectContext(pub i32);

/// One in-memory project object. The engine may re-enter the same instance
/// under several contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectInstance(pub i32);

/// Zero-based position in the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Converts the engine's 1-based node id into a table index, rejecting
    /// ids that fall outside a table of `node_count` rows.
    pub fn from_node_id(node_id: i32, node_count: usize) -> Option<Self> {
        let index = usize::try_from(node_id).ok()?.checked_sub(1)?;
        (index < node_count).then_some(NodeIndex(index))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// Everything the dashboard needs to know about who sent an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub context: ProjectContext,
    pub instance: ProjectInstance,
    /// `None` when the engine reported a node id outside the table.
    pub node: Option<NodeIndex>,
}

impl Identity {
    pub fn resolve(context_id: i32, instance_id: i32, node_id: i32, node_count: usize) -> Self {
        Self {
            context: ProjectContext(context_id),
            instance: ProjectInstance(instance_id),
            node: NodeIndex::from_node_id(node_id, node_count),
        }
    }
}
