//! Editing commands and undo/redo history.
//!
//! Every user action on the canvas maps to one [`GraphCommand`]. Commands are
//! serde-tagged so scripts of them can be stored as JSON:
//!
//! ```json
//! [
//!   {"command": "add_block", "block": {"kind": "pass"}},
//!   {"command": "attach", "parent": 1, "edge": "down", "child": 2}
//! ]
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{BlockId, BlockKind, BranchKind, CanvasPos, Edge};
use crate::error::GraphError;
use crate::graph::BlockGraph;

/// One atomic edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum GraphCommand {
    AddBlock {
        block: BlockKind,
        #[serde(default)]
        canvas: CanvasPos,
    },
    Attach {
        parent: BlockId,
        edge: Edge,
        child: BlockId,
    },
    Detach {
        parent: BlockId,
        edge: Edge,
    },
    Insert {
        parent: BlockId,
        edge: Edge,
        child: BlockId,
    },
    Move {
        block: BlockId,
        parent: BlockId,
        edge: Edge,
    },
    Delete {
        block: BlockId,
    },
    Edit {
        block: BlockId,
        kind: BlockKind,
    },
    SetCanvas {
        block: BlockId,
        canvas: CanvasPos,
    },
    AttachBranch {
        header: BlockId,
        branch: BranchKind,
    },
    DetachBranch {
        header: BlockId,
        branch: BranchKind,
    },
}

impl GraphCommand {
    /// Stable snake_case name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            GraphCommand::AddBlock { .. } => "add_block",
            GraphCommand::Attach { .. } => "attach",
            GraphCommand::Detach { .. } => "detach",
            GraphCommand::Insert { .. } => "insert",
            GraphCommand::Move { .. } => "move",
            GraphCommand::Delete { .. } => "delete",
            GraphCommand::Edit { .. } => "edit",
            GraphCommand::SetCanvas { .. } => "set_canvas",
            GraphCommand::AttachBranch { .. } => "attach_branch",
            GraphCommand::DetachBranch { .. } => "detach_branch",
        }
    }
}

/// What a successful command did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Created { id: BlockId },
    Linked,
    Detached { id: Option<BlockId> },
    Removed { ids: Vec<BlockId> },
    Updated,
}

impl BlockGraph {
    /// Run one command. On `Err` the graph is unchanged.
    pub fn apply(&mut self, command: &GraphCommand) -> Result<CommandOutcome, GraphError> {
        debug!(command = command.name(), "applying command");
        let outcome = match command {
            GraphCommand::AddBlock { block, canvas } => CommandOutcome::Created {
                id: self.create_block(block.clone(), *canvas)?,
            },
            GraphCommand::Attach {
                parent,
                edge,
                child,
            } => {
                self.attach(*parent, *edge, *child)?;
                CommandOutcome::Linked
            }
            GraphCommand::Detach { parent, edge } => CommandOutcome::Detached {
                id: self.detach(*parent, *edge)?,
            },
            GraphCommand::Insert {
                parent,
                edge,
                child,
            } => {
                self.insert(*parent, *edge, *child)?;
                CommandOutcome::Linked
            }
            GraphCommand::Move {
                block,
                parent,
                edge,
            } => {
                self.move_block(*block, *parent, *edge)?;
                CommandOutcome::Linked
            }
            GraphCommand::Delete { block } => CommandOutcome::Removed {
                ids: self.delete_block(*block)?,
            },
            GraphCommand::Edit { block, kind } => {
                self.edit_block(*block, kind.clone())?;
                CommandOutcome::Updated
            }
            GraphCommand::SetCanvas { block, canvas } => {
                self.set_canvas(*block, *canvas)?;
                CommandOutcome::Updated
            }
            GraphCommand::AttachBranch { header, branch } => CommandOutcome::Created {
                id: self.attach_optional_branch(*header, *branch)?,
            },
            GraphCommand::DetachBranch { header, branch } => CommandOutcome::Removed {
                ids: self.detach_optional_branch(*header, *branch)?,
            },
        };
        Ok(outcome)
    }
}

/// A graph plus bounded snapshot undo/redo.
#[derive(Debug, Clone)]
pub struct EditHistory {
    graph: BlockGraph,
    undo: VecDeque<BlockGraph>,
    redo: Vec<BlockGraph>,
    limit: usize,
}

impl EditHistory {
    /// Wrap `graph`, keeping at most `limit` undo steps.
    pub fn new(graph: BlockGraph, limit: usize) -> Self {
        EditHistory {
            graph,
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit,
        }
    }

    pub fn graph(&self) -> &BlockGraph {
        &self.graph
    }

    pub fn into_graph(self) -> BlockGraph {
        self.graph
    }

    /// Apply a command, recording the prior state for undo.
    ///
    /// A failed command leaves graph and history as they were.
    pub fn apply(&mut self, command: &GraphCommand) -> Result<CommandOutcome, GraphError> {
        let snapshot = self.graph.clone();
        match self.graph.apply(command) {
            Ok(outcome) => {
                self.push_undo(snapshot);
                self.redo.clear();
                Ok(outcome)
            }
            Err(err) => {
                self.graph = snapshot;
                Err(err)
            }
        }
    }

    fn push_undo(&mut self, snapshot: BlockGraph) {
        if self.limit == 0 {
            return;
        }
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }

    /// Step back one command. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        let current = self.restore(previous);
        self.redo.push(current);
        true
    }

    /// Re-apply the last undone command.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        let current = self.restore(next);
        self.push_undo(current);
        true
    }

    /// Swap in a snapshot. Ids handed out since it was taken stay spent.
    fn restore(&mut self, snapshot: BlockGraph) -> BlockGraph {
        let next_id = self.graph.next_id;
        let current = std::mem::replace(&mut self.graph, snapshot);
        self.graph.next_id = self.graph.next_id.max(next_id);
        current
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
}

// ============================================================================
// Tests
// ============================================================================
