//! Persisted tree document.
//!
//! A [`BlockDocument`] is the JSON form of a graph: one nested [`DocNode`]
//! per root, Holders left out. The branch chain of a header is written as a
//! `bottom` entry (first branch), nested again under each branch for the next.
//!
//! ```json
//! {
//!   "schemaVersion": 1,
//!   "roots": [{
//!     "id": 1, "kind": "if", "params": {...},
//!     "displayDepth": 0, "canvasX": 0.0, "canvasY": 0.0,
//!     "nextBlocks": [
//!       {"edge": "indent", "node": {...}},
//!       {"edge": "bottom", "node": {"kind": "else", ...}},
//!       {"edge": "down", "node": {...}}
//!     ]
//!   }]
//! }
//! ```
//!
//! Both directions are iterative, so long chains do not grow the call stack.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockId, BlockKind, CanvasPos, Edge};
use crate::error::{DocumentError, GraphError};
use crate::graph::BlockGraph;

/// Current document schema version.
pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;

/// Whole-canvas document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDocument {
    pub schema_version: u32,
    #[serde(default)]
    pub roots: Vec<DocNode>,
}

/// One block and the blocks linked below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocNode {
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default)]
    pub display_depth: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_y: Option<f64>,
    #[serde(default)]
    pub next_blocks: Vec<NextBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextBlock {
    pub edge: Edge,
    pub node: DocNode,
}

fn edge_rank(edge: Edge) -> u8 {
    match edge {
        Edge::Indent => 0,
        Edge::Bottom => 1,
        Edge::Down => 2,
    }
}

impl BlockDocument {
    /// Parse a document. Nesting grows with chain length, so the default
    /// recursion limit is lifted.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        deserializer.disable_recursion_limit();
        let document = BlockDocument::deserialize(&mut deserializer)?;
        deserializer.end()?;
        Ok(document)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

// ============================================================================
// Serialize
// ============================================================================

impl BlockGraph {
    /// Snapshot the graph as a document, roots in emission order.
    pub fn serialize(&self) -> BlockDocument {
        let roots = self
            .root_blocks()
            .into_iter()
            .filter_map(|root| self.serialize_root(root))
            .collect();
        BlockDocument {
            schema_version: DOCUMENT_SCHEMA_VERSION,
            roots,
        }
    }

    fn serialize_root(&self, root: BlockId) -> Option<DocNode> {
        // Pre-order list of (block, parent index and edge).
        let mut order: Vec<(&Block, Option<(usize, Edge)>)> = Vec::new();
        let mut stack = vec![(root, None)];
        while let Some((id, link)) = stack.pop() {
            let Some(block) = self.get(id) else {
                continue;
            };
            let index = order.len();
            order.push((block, link));
            if let Some(down) = block.down() {
                stack.push((down, Some((index, Edge::Down))));
            }
            let first_branch = block
                .holder()
                .and_then(|h| self.get(h))
                .and_then(Block::down);
            if let Some(branch) = first_branch {
                stack.push((branch, Some((index, Edge::Bottom))));
            }
            if let Some(indent) = block.indent() {
                stack.push((indent, Some((index, Edge::Indent))));
            }
        }

        // Children always follow their parent, so build back to front.
        let mut pending: Vec<Vec<NextBlock>> = vec![Vec::new(); order.len()];
        let mut root_node = None;
        for index in (0..order.len()).rev() {
            let (block, link) = order[index];
            let mut next_blocks = std::mem::take(&mut pending[index]);
            next_blocks.sort_by_key(|next| edge_rank(next.edge));
            let node = doc_node(block, next_blocks);
            match link {
                Some((parent, edge)) => pending[parent].push(NextBlock { edge, node }),
                None => root_node = Some(node),
            }
        }
        root_node
    }
}

fn doc_node(block: &Block, next_blocks: Vec<NextBlock>) -> DocNode {
    let (canvas_x, canvas_y) = if block.is_root() {
        (Some(block.canvas().x), Some(block.canvas().y))
    } else {
        (None, None)
    };
    DocNode {
        id: block.id(),
        kind: block.kind().clone(),
        display_depth: block.depth(),
        display_number: block.display_number(),
        canvas_x,
        canvas_y,
        next_blocks,
    }
}

// ============================================================================
// Deserialize
// ============================================================================

/// A node flattened out of the tree, with the link that reached it.
struct Record<'a> {
    node: &'a DocNode,
    parent: Option<(BlockId, Edge)>,
}

impl BlockGraph {
    /// Rebuild a live graph from a document.
    ///
    /// Every compound node gets a fresh Holder. Links go through the same
    /// validation as [`attach`](Self::attach), and branch chains are checked
    /// for applicability, uniqueness and order.
    pub fn deserialize(document: &BlockDocument) -> Result<BlockGraph, DocumentError> {
        if document.schema_version != DOCUMENT_SCHEMA_VERSION {
            return Err(DocumentError::UnsupportedVersion {
                found: document.schema_version,
                expected: DOCUMENT_SCHEMA_VERSION,
            });
        }

        let records = flatten(document)?;

        let mut graph = BlockGraph::new();
        graph.next_id = records
            .iter()
            .map(|r| r.node.id.as_u32())
            .max()
            .map_or(1, |max| max + 1);

        for record in &records {
            let node = record.node;
            let canvas = match record.parent {
                None => CanvasPos::new(
                    node.canvas_x.unwrap_or_default(),
                    node.canvas_y.unwrap_or_default(),
                ),
                Some(_) => CanvasPos::default(),
            };
            graph.spawn_with_id(node.id, node.kind.clone(), canvas);
            graph.block_mut(node.id)?.display_number = node.display_number;
        }

        for record in &records {
            let node = record.node;
            match record.parent {
                None if node.kind.is_branch() => {
                    return Err(DocumentError::invalid_structure(
                        node.id,
                        "an optional branch cannot be a root",
                    ));
                }
                None => {}
                Some((parent, Edge::Bottom)) => link_branch(&mut graph, parent, node)?,
                Some((parent, edge)) => {
                    if edge == Edge::Indent && !graph.block(parent)?.kind().is_compound() {
                        return Err(DocumentError::invalid_structure(
                            parent,
                            "indent edge on a block without a body",
                        ));
                    }
                    graph.attach_unrefreshed(parent, edge, node.id)?;
                }
            }
        }

        validate_branch_chains(&graph)?;
        graph.refresh_all_depths()?;
        Ok(graph)
    }

    pub fn from_json(json: &str) -> Result<BlockGraph, DocumentError> {
        BlockGraph::deserialize(&BlockDocument::from_json(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        self.serialize().to_json_pretty()
    }
}

/// Walk the document tree into a flat list, checking ids and edge usage.
fn flatten(document: &BlockDocument) -> Result<Vec<Record<'_>>, DocumentError> {
    let mut records = Vec::new();
    let mut seen = BTreeSet::new();
    let mut stack: Vec<Record<'_>> = document
        .roots
        .iter()
        .rev()
        .map(|node| Record { node, parent: None })
        .collect();

    while let Some(record) = stack.pop() {
        let node = record.node;
        if !seen.insert(node.id) {
            return Err(DocumentError::DuplicateId { id: node.id });
        }
        if node.kind.is_holder() {
            return Err(DocumentError::UnexpectedHolder { id: node.id });
        }
        let mut edges = BTreeMap::new();
        for next in &node.next_blocks {
            if edges.insert(edge_rank(next.edge), next.edge).is_some() {
                return Err(DocumentError::invalid_structure(
                    node.id,
                    format!("repeated {} edge", next.edge),
                ));
            }
        }
        for next in node.next_blocks.iter().rev() {
            stack.push(Record {
                node: &next.node,
                parent: Some((node.id, next.edge)),
            });
        }
        records.push(record);
    }
    Ok(records)
}

/// Link `node` as the first branch after `parent`'s Holder.
fn link_branch(graph: &mut BlockGraph, parent: BlockId, node: &DocNode) -> Result<(), DocumentError> {
    let owner = graph.block(parent)?;
    if !owner.kind().is_compound() {
        return Err(DocumentError::invalid_structure(
            parent,
            "bottom edge on a block without a body",
        ));
    }
    if !node.kind.is_branch() {
        return Err(DocumentError::invalid_structure(
            node.id,
            format!("{} cannot hang off a bottom edge", node.kind.name()),
        ));
    }
    let holder = owner
        .holder()
        .ok_or_else(|| DocumentError::invalid_structure(parent, "compound block without holder"))?;
    graph.link(holder, Edge::Down, node.id);
    Ok(())
}

/// Every header's chain must hold applicable branches, unique ones at most
/// once, in rank order.
fn validate_branch_chains(graph: &BlockGraph) -> Result<(), DocumentError> {
    for block in graph.blocks() {
        if !block.kind().is_compound() || block.kind().is_branch() {
            continue;
        }
        let header = block.id();
        let mut last_rank = 0;
        let mut unique_seen = BTreeSet::new();
        for branch in graph.branches(header)? {
            let Some(kind) = graph.block(branch)?.kind().branch_kind() else {
                continue;
            };
            if !kind.applies_to(block.kind()) {
                return Err(GraphError::BranchNotApplicable {
                    header,
                    header_kind: block.kind().name(),
                    branch: kind,
                }
                .into());
            }
            if kind.is_unique() && !unique_seen.insert(kind.as_str()) {
                return Err(GraphError::AlreadyAttached {
                    header,
                    branch: kind,
                }
                .into());
            }
            if kind.rank() < last_rank {
                return Err(DocumentError::invalid_structure(
                    branch,
                    format!("{kind} is out of order in the branch chain"),
                ));
            }
            last_rank = kind.rank();
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
