//! Block graph: arena, linking, traversal and code emission.
//!
//! [`BlockGraph`] owns every [`Block`] in a `BTreeMap` keyed by [`BlockId`].
//! Edges are ids, so the graph is the only place that can keep a block's
//! `predecessor` consistent with the slot that points at it.
//!
//! All mutations validate first and write second. An `Err` from any method
//! here leaves the graph untouched.
//!
//! Deletion and optional branches live in [`crate::edit`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::block::{Block, BlockId, BlockKind, CanvasPos, Edge};
use crate::error::GraphError;

/// Default bound on visits per traversal.
pub const DEFAULT_ITERATION_CAP: usize = 10_000;

/// Default comment line placed above emitted code.
pub const DEFAULT_HEADER: &str = "# Auto-Generated by tugblock";

/// Default indentation unit.
pub const DEFAULT_INDENT: &str = "    ";

/// Options controlling [`BlockGraph::emit_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Repeated once per depth level.
    pub indent: String,
    /// First line of the output. Empty disables it.
    pub header: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        EmitOptions {
            indent: DEFAULT_INDENT.to_string(),
            header: DEFAULT_HEADER.to_string(),
        }
    }
}

/// Result of [`BlockGraph::traverse`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Traversal {
    /// Non-Holder blocks in emission order with their depth below the root.
    pub entries: Vec<(BlockId, usize)>,
    /// True when the iteration cap stopped the walk early.
    pub aborted: bool,
}

impl Traversal {
    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }
}

/// How [`BlockGraph::renumber`] assigns display numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingMode {
    /// Strictly ascending in emission order; clears `moved`.
    #[default]
    Sequential,
    /// Existing numbers kept; new blocks take the next free number.
    Sticky,
}

/// Display annotation for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberInfo {
    pub id: BlockId,
    pub number: u32,
    pub depth: usize,
    pub moved: bool,
}

/// Arena of blocks plus the linearization engine.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockGraph {
    pub(crate) blocks: BTreeMap<BlockId, Block>,
    pub(crate) next_id: u32,
    iteration_cap: usize,
}

impl Default for BlockGraph {
    fn default() -> Self {
        BlockGraph::new()
    }
}

impl BlockGraph {
    pub fn new() -> Self {
        BlockGraph {
            blocks: BTreeMap::new(),
            next_id: 1,
            iteration_cap: DEFAULT_ITERATION_CAP,
        }
    }

    pub fn with_iteration_cap(mut self, cap: usize) -> Self {
        self.iteration_cap = cap;
        self
    }

    pub fn iteration_cap(&self) -> usize {
        self.iteration_cap
    }

    pub fn set_iteration_cap(&mut self, cap: usize) {
        self.iteration_cap = cap;
    }

    // ------------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(&id)
    }

    /// Look up a block, failing with `BlockNotFound`.
    pub fn block(&self, id: BlockId) -> Result<&Block, GraphError> {
        self.blocks.get(&id).ok_or(GraphError::BlockNotFound { id })
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, GraphError> {
        self.blocks
            .get_mut(&id)
            .ok_or(GraphError::BlockNotFound { id })
    }

    /// All blocks in id order, Holders included.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    fn alloc_id(&mut self) -> BlockId {
        let id = BlockId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register an unlinked block under its own id.
    ///
    /// Registry only: no Holder is created and no edges are touched.
    pub fn add_block(&mut self, block: Block) -> Result<(), GraphError> {
        let id = block.id();
        if self.blocks.contains_key(&id) {
            return Err(GraphError::DuplicateBlock { id });
        }
        self.next_id = self.next_id.max(id.as_u32() + 1);
        self.blocks.insert(id, block);
        Ok(())
    }

    /// Unregister a block without cascading into its statements.
    ///
    /// The slot pointing at it is cleared and its body and continuation
    /// become detached roots. A header's Holder goes with it, and so do its
    /// optional branches, whose bodies are released as roots. A removed
    /// branch is spliced out of its chain. Holders cannot be removed on
    /// their own.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Block, GraphError> {
        let block = self.block(id)?;
        if block.kind().is_holder() {
            return Err(GraphError::HolderNotDeletable { id });
        }
        let is_branch = block.kind().is_branch();
        let predecessor = block.predecessor();
        let holder = block.holder();
        let mut released: Vec<BlockId> = [block.down(), block.indent()].into_iter().flatten().collect();
        let mut sentinels: Vec<BlockId> = holder.into_iter().collect();

        let next_branch = if is_branch {
            holder.and_then(|h| self.get(h)).and_then(Block::down)
        } else {
            for branch in self.branches(id)? {
                let owned = self.block(branch)?;
                sentinels.push(branch);
                sentinels.extend(owned.holder());
                released.extend(owned.indent());
            }
            None
        };

        if let Some((parent, edge)) = predecessor {
            self.unlink(parent, edge);
        }
        let removed = self.blocks.remove(&id).ok_or(GraphError::BlockNotFound { id })?;
        for sentinel in &sentinels {
            self.blocks.remove(sentinel);
        }
        for child in released {
            if let Some(successor) = self.blocks.get_mut(&child) {
                successor.predecessor = None;
            }
            self.recompute_depths(child)?;
        }
        if let (Some((parent, edge)), Some(next)) = (predecessor, next_branch) {
            self.link(parent, edge, next);
            self.refresh_depths(parent)?;
        }
        debug!(block = %id, dropped = sentinels.len(), "removed block from registry");
        Ok(removed)
    }

    /// Create a block from the palette.
    ///
    /// Compound kinds get an empty body and a fresh Holder. Optional branches
    /// and Holders come only from [`attach_optional_branch`](Self::attach_optional_branch).
    pub fn create_block(&mut self, kind: BlockKind, canvas: CanvasPos) -> Result<BlockId, GraphError> {
        if kind.is_holder() {
            return Err(GraphError::InvalidKind {
                kind: kind.name(),
                reason: "holders are created with their header".to_string(),
            });
        }
        if kind.is_branch() {
            return Err(GraphError::InvalidKind {
                kind: kind.name(),
                reason: "optional branches are attached to a header".to_string(),
            });
        }
        let id = self.spawn(kind, canvas);
        debug!(block = %id, "created block");
        Ok(id)
    }

    /// Allocate a block and, for compound kinds, its Holder.
    pub(crate) fn spawn(&mut self, kind: BlockKind, canvas: CanvasPos) -> BlockId {
        let id = self.alloc_id();
        self.spawn_with_id(id, kind, canvas);
        id
    }

    pub(crate) fn spawn_with_id(&mut self, id: BlockId, kind: BlockKind, canvas: CanvasPos) {
        let compound = kind.is_compound();
        let mut block = Block::new(id, kind);
        block.canvas = canvas;
        self.blocks.insert(id, block);
        if compound {
            let holder = self.alloc_id();
            self.blocks.insert(holder, Block::new(holder, BlockKind::Holder));
            self.link(id, Edge::Bottom, holder);
        }
    }

    /// Replace a block's parameters. The variant must not change.
    pub fn edit_block(&mut self, id: BlockId, kind: BlockKind) -> Result<(), GraphError> {
        let block = self.block_mut(id)?;
        if !block.kind().same_variant(&kind) {
            return Err(GraphError::KindMismatch {
                id,
                expected: block.kind().name(),
                found: kind.name(),
            });
        }
        block.set_kind(kind);
        debug!(block = %id, "edited block");
        Ok(())
    }

    pub fn set_canvas(&mut self, id: BlockId, canvas: CanvasPos) -> Result<(), GraphError> {
        self.block_mut(id)?.canvas = canvas;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Linking
    // ------------------------------------------------------------------------

    /// Checks on the owning side of a link.
    fn check_parent_slot(&self, parent: BlockId, edge: Edge) -> Result<&Block, GraphError> {
        let owner = self.block(parent)?;
        match edge {
            Edge::Bottom => {
                return Err(GraphError::invalid_edge(
                    parent,
                    edge,
                    "bottom edges are managed by the graph",
                ))
            }
            Edge::Indent if !owner.kind().is_compound() => {
                return Err(GraphError::invalid_edge(
                    parent,
                    edge,
                    format!("{} blocks have no body", owner.kind().name()),
                ))
            }
            Edge::Down if owner.kind().is_holder() => {
                return Err(GraphError::invalid_edge(
                    parent,
                    edge,
                    "a holder's down slot carries the branch chain",
                ))
            }
            Edge::Down if owner.kind().is_branch() => {
                return Err(GraphError::invalid_edge(
                    parent,
                    edge,
                    "code after a branch continues on its header",
                ))
            }
            _ => {}
        }
        Ok(owner)
    }

    /// Checks on the linked side.
    fn check_linkable(&self, parent: BlockId, edge: Edge, child: BlockId) -> Result<(), GraphError> {
        let target = self.block(child)?;
        if target.kind().is_holder() || target.kind().is_branch() {
            return Err(GraphError::invalid_edge(
                parent,
                edge,
                format!("{} is a {} block and cannot be linked directly", child, target.kind().name()),
            ));
        }
        Ok(())
    }

    fn validate_link(
        &self,
        parent: BlockId,
        edge: Edge,
        child: BlockId,
        allow_occupied: bool,
    ) -> Result<(), GraphError> {
        if parent == child {
            return Err(GraphError::invalid_edge(parent, edge, "a block cannot follow itself"));
        }
        let owner = self.check_parent_slot(parent, edge)?;
        if !allow_occupied {
            if let Some(occupant) = owner.slot(edge) {
                return Err(GraphError::invalid_edge(
                    parent,
                    edge,
                    format!("slot already holds {occupant}"),
                ));
            }
        }
        self.check_linkable(parent, edge, child)?;
        if let Some((owner_id, _)) = self.block(child)?.predecessor() {
            return Err(GraphError::invalid_edge(
                parent,
                edge,
                format!("{child} is already linked from {owner_id}"),
            ));
        }
        if self.root(parent)? == child {
            return Err(GraphError::invalid_edge(
                parent,
                edge,
                format!("linking {child} would create a cycle"),
            ));
        }
        Ok(())
    }

    /// Write both sides of an edge. Callers have validated.
    pub(crate) fn link(&mut self, parent: BlockId, edge: Edge, child: BlockId) {
        if let Some(owner) = self.blocks.get_mut(&parent) {
            *owner.slot_mut(edge) = Some(child);
        }
        if let Some(target) = self.blocks.get_mut(&child) {
            target.predecessor = Some((parent, edge));
        }
    }

    /// Clear both sides of an edge, returning the former occupant.
    pub(crate) fn unlink(&mut self, parent: BlockId, edge: Edge) -> Option<BlockId> {
        let child = self.blocks.get_mut(&parent)?.slot_mut(edge).take()?;
        if let Some(target) = self.blocks.get_mut(&child) {
            target.predecessor = None;
        }
        Some(child)
    }

    /// Link `child` into an empty `edge` slot of `parent`.
    pub fn attach(&mut self, parent: BlockId, edge: Edge, child: BlockId) -> Result<(), GraphError> {
        self.attach_unrefreshed(parent, edge, child)?;
        self.refresh_depths(parent)?;
        Ok(())
    }

    /// [`attach`](Self::attach) without the depth refresh, for bulk loads.
    pub(crate) fn attach_unrefreshed(
        &mut self,
        parent: BlockId,
        edge: Edge,
        child: BlockId,
    ) -> Result<(), GraphError> {
        self.validate_link(parent, edge, child, false)?;
        self.link(parent, edge, child);
        debug!(parent = %parent, edge = %edge, child = %child, "attached block");
        Ok(())
    }

    /// Cut the `edge` link of `parent`. The detached block keeps its subtree
    /// and becomes a root. Returns `None` when the slot was empty.
    pub fn detach(&mut self, parent: BlockId, edge: Edge) -> Result<Option<BlockId>, GraphError> {
        let owner = self.block(parent)?;
        if edge == Edge::Bottom {
            return Err(GraphError::invalid_edge(
                parent,
                edge,
                "bottom edges are managed by the graph",
            ));
        }
        if edge == Edge::Down && owner.kind().is_holder() {
            return Err(GraphError::invalid_edge(
                parent,
                edge,
                "branches are removed with detach_branch",
            ));
        }
        let Some(child) = self.unlink(parent, edge) else {
            return Ok(None);
        };
        self.refresh_depths(parent)?;
        self.recompute_depths(child)?;
        debug!(parent = %parent, edge = %edge, child = %child, "detached block");
        Ok(Some(child))
    }

    /// Link `child` into a possibly occupied slot.
    ///
    /// The displaced occupant is re-attached below the last block of the
    /// inserted chain.
    pub fn insert(&mut self, parent: BlockId, edge: Edge, child: BlockId) -> Result<(), GraphError> {
        self.validate_link(parent, edge, child, true)?;
        let tail = self.last_in_chain(child)?;
        let displaced = self.unlink(parent, edge);
        self.link(parent, edge, child);
        if let Some(displaced) = displaced {
            self.link(tail, Edge::Down, displaced);
        }
        self.refresh_depths(parent)?;
        debug!(parent = %parent, edge = %edge, child = %child, "inserted block");
        Ok(())
    }

    /// Move `id` and everything chained below it to `parent.edge`.
    pub fn move_block(&mut self, id: BlockId, parent: BlockId, edge: Edge) -> Result<(), GraphError> {
        if id == parent {
            return Err(GraphError::invalid_edge(parent, edge, "a block cannot follow itself"));
        }
        self.check_parent_slot(parent, edge)?;
        self.check_linkable(parent, edge, id)?;
        if self.reachable_from(id).contains(&parent) {
            return Err(GraphError::invalid_edge(
                parent,
                edge,
                format!("{parent} is inside the chain being moved"),
            ));
        }

        let old_parent = self.block(id)?.predecessor();
        if let Some((owner, old_edge)) = old_parent {
            self.unlink(owner, old_edge);
        }
        let tail = self.last_in_chain(id)?;
        let displaced = self.unlink(parent, edge);
        self.link(parent, edge, id);
        if let Some(displaced) = displaced {
            self.link(tail, Edge::Down, displaced);
        }
        self.block_mut(id)?.moved = true;

        if let Some((owner, _)) = old_parent {
            self.refresh_depths(owner)?;
        }
        self.refresh_depths(parent)?;
        debug!(block = %id, parent = %parent, edge = %edge, "moved block");
        Ok(())
    }

    /// Last block reached by following `down` from `id`.
    pub fn last_in_chain(&self, id: BlockId) -> Result<BlockId, GraphError> {
        let mut current = id;
        let mut steps = 0;
        while let Some(next) = self.block(current)?.down() {
            steps += 1;
            if steps > self.blocks.len() {
                break;
            }
            current = next;
        }
        Ok(current)
    }

    /// Every block reachable from `start` over any edge, `start` included.
    pub(crate) fn reachable_from(&self, start: BlockId) -> BTreeSet<BlockId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some(block) = self.blocks.get(&id) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            stack.extend([block.down, block.indent, block.holder].into_iter().flatten());
        }
        seen
    }

    // ------------------------------------------------------------------------
    // Roots and depth
    // ------------------------------------------------------------------------

    /// Follow predecessors to the top of the tree containing `id`.
    pub fn root(&self, id: BlockId) -> Result<BlockId, GraphError> {
        let mut current = id;
        let mut steps = 0;
        while let Some((parent, _)) = self.block(current)?.predecessor() {
            steps += 1;
            if steps > self.blocks.len() {
                break;
            }
            current = parent;
        }
        Ok(current)
    }

    /// Distinct roots of all non-Holder blocks, ordered by `(canvas.y, id)`.
    pub fn root_blocks(&self) -> Vec<BlockId> {
        let mut roots = BTreeSet::new();
        for block in self.blocks.values() {
            if block.kind().is_holder() {
                continue;
            }
            if let Ok(root) = self.root(block.id()) {
                roots.insert(root);
            }
        }
        let mut roots: Vec<BlockId> = roots.into_iter().collect();
        roots.sort_by(|a, b| {
            let ya = self.blocks.get(a).map(|blk| blk.canvas.y).unwrap_or_default();
            let yb = self.blocks.get(b).map(|blk| blk.canvas.y).unwrap_or_default();
            ya.total_cmp(&yb).then(a.cmp(b))
        });
        roots
    }

    /// Number of `Indent` edges between `id` and its root.
    pub fn depth_of(&self, id: BlockId) -> Result<usize, GraphError> {
        let mut depth = 0;
        let mut current = id;
        let mut steps = 0;
        while let Some((parent, edge)) = self.block(current)?.predecessor() {
            if edge == Edge::Indent {
                depth += 1;
            }
            steps += 1;
            if steps > self.blocks.len() {
                break;
            }
            current = parent;
        }
        Ok(depth)
    }

    /// Store fresh depths on every block under `subtree_root`.
    pub fn recompute_depths(&mut self, subtree_root: BlockId) -> Result<(), GraphError> {
        let base = self.depth_of(subtree_root)?;
        let (visits, _) = self.walk(subtree_root, base);
        for (id, depth) in visits {
            if let Some(block) = self.blocks.get_mut(&id) {
                block.depth = depth;
            }
        }
        Ok(())
    }

    /// Recompute depths for the whole tree containing `id`.
    pub(crate) fn refresh_depths(&mut self, id: BlockId) -> Result<(), GraphError> {
        let root = self.root(id)?;
        self.recompute_depths(root)
    }

    pub(crate) fn refresh_all_depths(&mut self) -> Result<(), GraphError> {
        let roots: Vec<BlockId> = self
            .blocks
            .values()
            .filter(|b| b.is_root())
            .map(Block::id)
            .collect();
        for root in roots {
            self.recompute_depths(root)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------------

    /// Pre-order walk including Holders: node, indent (+1), holder, down.
    fn walk(&self, start: BlockId, base_depth: usize) -> (Vec<(BlockId, usize)>, bool) {
        let mut visits = Vec::new();
        let mut stack = vec![(start, base_depth)];
        while let Some((id, depth)) = stack.pop() {
            if visits.len() >= self.iteration_cap {
                warn!(
                    start = %start,
                    cap = self.iteration_cap,
                    "traversal aborted at iteration cap"
                );
                return (visits, true);
            }
            let Some(block) = self.blocks.get(&id) else {
                continue;
            };
            visits.push((id, depth));
            if let Some(down) = block.down {
                stack.push((down, depth));
            }
            if let Some(holder) = block.holder {
                stack.push((holder, depth));
            }
            if let Some(indent) = block.indent {
                stack.push((indent, depth + 1));
            }
        }
        (visits, false)
    }

    /// Non-Holder blocks under `root` in emission order.
    ///
    /// Hitting the iteration cap returns what was visited so far with
    /// `aborted` set; it never fails.
    pub fn traverse(&self, root: BlockId) -> Traversal {
        let (visits, aborted) = self.walk(root, 0);
        let entries = visits
            .into_iter()
            .filter(|(id, _)| {
                self.blocks
                    .get(id)
                    .is_some_and(|block| !block.kind().is_holder())
            })
            .collect();
        Traversal { entries, aborted }
    }

    // ------------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------------

    /// Source text for the whole canvas with default options.
    pub fn emit(&self) -> String {
        self.emit_with(&EmitOptions::default())
    }

    pub fn emit_with(&self, options: &EmitOptions) -> String {
        let fragments: Vec<String> = self
            .root_blocks()
            .into_iter()
            .map(|root| self.fragment(root, options))
            .collect();

        let mut out = String::new();
        if !options.header.is_empty() {
            out.push_str(&options.header);
            out.push('\n');
        }
        if !fragments.is_empty() {
            out.push_str(&fragments.join("\n\n"));
            out.push('\n');
        }
        out
    }

    /// Source text for the tree rooted at `root`, without header.
    pub fn emit_root(&self, root: BlockId, options: &EmitOptions) -> Result<String, GraphError> {
        self.block(root)?;
        Ok(self.fragment(root, options))
    }

    fn fragment(&self, root: BlockId, options: &EmitOptions) -> String {
        let traversal = self.traverse(root);
        traversal
            .entries
            .iter()
            .filter_map(|(id, depth)| {
                let block = self.blocks.get(id)?;
                Some(block.render_line(&options.indent.repeat(*depth)))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ------------------------------------------------------------------------
    // Numbering
    // ------------------------------------------------------------------------

    /// Assign display numbers in emission order.
    pub fn renumber(&mut self, mode: NumberingMode) -> Vec<NumberInfo> {
        let order: Vec<(BlockId, usize)> = self
            .root_blocks()
            .into_iter()
            .flat_map(|root| self.traverse(root).entries)
            .collect();

        let mut next = match mode {
            NumberingMode::Sequential => 0,
            NumberingMode::Sticky => order
                .iter()
                .filter_map(|(id, _)| self.blocks.get(id)?.display_number)
                .max()
                .map_or(0, |max| max + 1),
        };

        let mut numbers = Vec::with_capacity(order.len());
        for (id, depth) in order {
            let Some(block) = self.blocks.get_mut(&id) else {
                continue;
            };
            let number = match (mode, block.display_number) {
                (NumberingMode::Sticky, Some(existing)) => existing,
                _ => {
                    let assigned = next;
                    next += 1;
                    assigned
                }
            };
            block.display_number = Some(number);
            if mode == NumberingMode::Sequential {
                block.moved = false;
            }
            numbers.push(NumberInfo {
                id,
                number,
                depth,
                moved: block.moved,
            });
        }
        numbers
    }
}

// ============================================================================
// Tests
// ============================================================================
