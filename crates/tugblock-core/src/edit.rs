//! Cascading deletion and optional branches.
//!
//! A compound header owns its body, its Holder and the branch chain hanging
//! off that Holder:
//!
//! ```text
//! if ─Bottom→ H0 ─Down→ elif ─Bottom→ H1 ─Down→ else ─Bottom→ H2
//! │                      │                       │
//! Indent                 Indent                  Indent
//! ```
//!
//! Branches are kept sorted by rank (`elif`/`except`, then `else`, then
//! `finally`). A branch's own `down` stays empty; whatever follows the whole
//! construct hangs off the header's `down`.

use std::collections::BTreeSet;

use tracing::debug;

use crate::block::{BlockId, BranchKind, CanvasPos, Edge};
use crate::error::GraphError;
use crate::graph::BlockGraph;

impl BlockGraph {
    /// Branch chain of `header`, in order.
    pub fn branches(&self, header: BlockId) -> Result<Vec<BlockId>, GraphError> {
        let mut chain = Vec::new();
        let mut holder = self.block(header)?.holder();
        while let Some(next) = holder.and_then(|h| self.get(h)).and_then(|h| h.down()) {
            if chain.len() > self.len() {
                break;
            }
            chain.push(next);
            holder = self.block(next)?.holder();
        }
        Ok(chain)
    }

    /// Whether `header` carries at least one branch of `kind`.
    pub fn has_branch(&self, header: BlockId, kind: BranchKind) -> Result<bool, GraphError> {
        Ok(self
            .branches(header)?
            .into_iter()
            .any(|id| self.branch_kind_of(id) == Some(kind)))
    }

    fn branch_kind_of(&self, id: BlockId) -> Option<BranchKind> {
        self.get(id)?.kind().branch_kind()
    }

    /// Attach a new, empty optional branch to `header` at its rank position.
    pub fn attach_optional_branch(
        &mut self,
        header: BlockId,
        kind: BranchKind,
    ) -> Result<BlockId, GraphError> {
        let head = self.block(header)?;
        if !kind.applies_to(head.kind()) {
            return Err(GraphError::BranchNotApplicable {
                header,
                header_kind: head.kind().name(),
                branch: kind,
            });
        }
        let mut anchor = head.holder().ok_or_else(|| {
            GraphError::invalid_edge(header, Edge::Bottom, "header has no holder")
        })?;

        let chain = self.branches(header)?;
        if kind.is_unique() && chain.iter().any(|&b| self.branch_kind_of(b) == Some(kind)) {
            return Err(GraphError::AlreadyAttached {
                header,
                branch: kind,
            });
        }
        for &branch in &chain {
            let fits_after = self
                .branch_kind_of(branch)
                .is_some_and(|existing| existing.rank() <= kind.rank());
            if !fits_after {
                break;
            }
            if let Some(holder) = self.block(branch)?.holder() {
                anchor = holder;
            }
        }

        let id = self.spawn(kind.default_block(), CanvasPos::default());
        let following = self.unlink(anchor, Edge::Down);
        self.link(anchor, Edge::Down, id);
        if let Some(following) = following {
            if let Some(own_holder) = self.block(id)?.holder() {
                self.link(own_holder, Edge::Down, following);
            }
        }
        self.refresh_depths(header)?;
        debug!(header = %header, branch = %kind, block = %id, "attached optional branch");
        Ok(id)
    }

    /// Remove the last attached branch of `kind`, with its body.
    pub fn detach_optional_branch(
        &mut self,
        header: BlockId,
        kind: BranchKind,
    ) -> Result<Vec<BlockId>, GraphError> {
        let branch = self
            .branches(header)?
            .into_iter()
            .rev()
            .find(|&b| self.branch_kind_of(b) == Some(kind))
            .ok_or(GraphError::BranchNotAttached {
                header,
                branch: kind,
            })?;
        self.delete_block(branch)
    }

    /// Remove one specific branch of `header`, with its body.
    pub fn detach_branch(
        &mut self,
        header: BlockId,
        branch: BlockId,
    ) -> Result<Vec<BlockId>, GraphError> {
        if !self.branches(header)?.contains(&branch) {
            return Err(GraphError::NotInBranchChain { header, branch });
        }
        self.delete_block(branch)
    }

    /// Delete a block and everything it owns, splicing its continuation into
    /// the slot that pointed at it. Returns the removed ids, Holders included.
    ///
    /// A compound header takes its body, its Holder and every branch with it.
    /// A branch takes its body and Holder; the next branch moves up.
    pub fn delete_block(&mut self, id: BlockId) -> Result<Vec<BlockId>, GraphError> {
        let block = self.block(id)?;
        if block.kind().is_holder() {
            return Err(GraphError::HolderNotDeletable { id });
        }
        let is_branch = block.kind().is_branch();
        let predecessor = block.predecessor();
        let canvas = block.canvas();
        let holder = block.holder();
        let indent = block.indent();

        // (owner, slot) of the continuation that survives the delete.
        let continuation_slot = if is_branch {
            holder.map(|h| (h, Edge::Down))
        } else {
            Some((id, Edge::Down))
        };

        let mut doomed = BTreeSet::from([id]);
        if let Some(body) = indent {
            doomed.extend(self.reachable_from(body));
        }
        if let Some(holder) = holder {
            if is_branch {
                doomed.insert(holder);
            } else {
                doomed.extend(self.reachable_from(holder));
            }
        }

        let continuation =
            continuation_slot.and_then(|(owner, edge)| self.unlink(owner, edge));
        if let Some((parent, edge)) = predecessor {
            self.unlink(parent, edge);
        }
        for doomed_id in &doomed {
            self.blocks.remove(doomed_id);
        }

        match (predecessor, continuation) {
            (Some((parent, edge)), Some(next)) => self.link(parent, edge, next),
            (None, Some(next)) => self.block_mut(next)?.canvas = canvas,
            _ => {}
        }
        if let Some((parent, _)) = predecessor {
            self.refresh_depths(parent)?;
        } else if let Some(next) = continuation {
            self.recompute_depths(next)?;
        }

        debug!(block = %id, removed = doomed.len(), "deleted block");
        Ok(doomed.into_iter().collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
