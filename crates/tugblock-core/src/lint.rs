//! Soft checks over a graph.
//!
//! Lints never block emission; they tell the host which blocks to flag.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::block::{Block, BlockId, BlockKind};
use crate::graph::BlockGraph;

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

/// Deepest nesting accepted without a [`DiagnosticKind::DepthExceeded`].
pub const DEFAULT_MAX_DEPTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintOptions {
    pub max_depth: usize,
}

impl Default for LintOptions {
    fn default() -> Self {
        LintOptions {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DepthExceeded,
    Incomplete,
    InvalidIdentifier,
    TraversalAborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub block: BlockId,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    fn new(block: BlockId, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            block,
            kind,
            message: message.into(),
        }
    }
}

/// Check whether `name` is a usable Python identifier.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !PYTHON_KEYWORDS.contains(&name)
}

/// Run every lint, in emission order.
pub fn check(graph: &BlockGraph, options: &LintOptions) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for root in graph.root_blocks() {
        let traversal = graph.traverse(root);
        if traversal.aborted {
            diagnostics.push(Diagnostic::new(
                root,
                DiagnosticKind::TraversalAborted,
                format!(
                    "traversal stopped after {} blocks; output is truncated",
                    traversal.entries.len()
                ),
            ));
        }
        for (id, depth) in traversal.entries {
            let Some(block) = graph.get(id) else {
                continue;
            };
            if depth > options.max_depth {
                diagnostics.push(Diagnostic::new(
                    id,
                    DiagnosticKind::DepthExceeded,
                    format!(
                        "block depth {depth} exceeds the limit of {}",
                        options.max_depth
                    ),
                ));
            }
            check_block(block, &mut diagnostics);
        }
    }
    diagnostics
}

fn check_block(block: &Block, out: &mut Vec<Diagnostic>) {
    let id = block.id();
    let mut incomplete = |what: &str| {
        out.push(Diagnostic::new(
            id,
            DiagnosticKind::Incomplete,
            format!("{} block is missing {what}", block.kind().name()),
        ))
    };
    match block.kind() {
        BlockKind::Class(p) if p.name.trim().is_empty() => incomplete("a name"),
        BlockKind::Def(p) if p.name.trim().is_empty() => incomplete("a name"),
        BlockKind::If(p) | BlockKind::Elif(p) if p.conditions.is_empty() => {
            incomplete("a condition")
        }
        BlockKind::For(p) => match (p.target.trim().is_empty(), p.iterable.trim().is_empty()) {
            (true, true) => incomplete("a target and an iterable"),
            (true, false) => incomplete("a target"),
            (false, true) => incomplete("an iterable"),
            (false, false) => {}
        },
        BlockKind::While(p) if p.condition.trim().is_empty() => incomplete("a condition"),
        BlockKind::Code(p) if p.text.trim().is_empty() => incomplete("code"),
        _ => {}
    }

    let mut names: Vec<&str> = Vec::new();
    match block.kind() {
        BlockKind::Class(p) => names.push(&p.name),
        BlockKind::Def(p) => {
            names.push(&p.name);
            names.extend(
                p.params
                    .iter()
                    .filter(|param| !param.name.is_empty())
                    .map(|param| param.name.as_str()),
            );
        }
        _ => {}
    }
    for name in names {
        if !name.is_empty() && !is_identifier(name) {
            out.push(Diagnostic::new(
                id,
                DiagnosticKind::InvalidIdentifier,
                format!("'{name}' is not a valid identifier"),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{CanvasPos, ClassParams, DefParam, DefParams, Edge, ForParams};

    #[test]
    fn test_identifier_rules() {
        assert!(is_identifier("value_1"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("has-dash"));
        assert!(!is_identifier("class"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_depth_exceeded() {
        let mut g = BlockGraph::new();
        let mut parent = g.create_block(BlockKind::if_raw("a"), CanvasPos::default()).unwrap();
        for _ in 0..7 {
            let next = g.create_block(BlockKind::if_raw("a"), CanvasPos::default()).unwrap();
            g.attach(parent, Edge::Indent, next).unwrap();
            parent = next;
        }
        let diagnostics = check(&g, &LintOptions::default());
        let deep: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::DepthExceeded)
            .collect();
        assert_eq!(deep.len(), 1);
        assert_eq!(deep[0].block, parent);
    }

    #[test]
    fn test_incomplete_blocks() {
        let mut g = BlockGraph::new();
        let class = g
            .create_block(BlockKind::Class(ClassParams::default()), CanvasPos::default())
            .unwrap();
        let code = g.create_block(BlockKind::code("  "), CanvasPos::default()).unwrap();
        g.attach(class, Edge::Indent, code).unwrap();
        let diagnostics = check(&g, &LintOptions::default());
        let incomplete: Vec<BlockId> = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Incomplete)
            .map(|d| d.block)
            .collect();
        assert_eq!(incomplete, vec![class, code]);
    }

    #[test]
    fn test_for_missing_both_fields() {
        let mut g = BlockGraph::new();
        let empty = g
            .create_block(BlockKind::For(ForParams::default()), CanvasPos::default())
            .unwrap();
        let half = g
            .create_block(
                BlockKind::For(ForParams {
                    target: "i".to_string(),
                    iterable: String::new(),
                }),
                CanvasPos::new(0.0, 10.0),
            )
            .unwrap();
        let diagnostics = check(&g, &LintOptions::default());
        let messages: Vec<(BlockId, &str)> = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Incomplete)
            .map(|d| (d.block, d.message.as_str()))
            .collect();
        assert_eq!(
            messages,
            vec![
                (empty, "for block is missing a target and an iterable"),
                (half, "for block is missing an iterable"),
            ]
        );
    }

    #[test]
    fn test_invalid_identifiers() {
        let mut g = BlockGraph::new();
        let def = BlockKind::Def(DefParams {
            name: "2fast".to_string(),
            params: vec![DefParam::positional("ok"), DefParam::positional("lambda")],
        });
        let id = g.create_block(def, CanvasPos::default()).unwrap();
        let diagnostics = check(&g, &LintOptions::default());
        let bad: Vec<&str> = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::InvalidIdentifier)
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(
            bad,
            vec![
                "'2fast' is not a valid identifier",
                "'lambda' is not a valid identifier"
            ]
        );
        assert!(diagnostics.iter().all(|d| d.block == id));
    }

    #[test]
    fn test_traversal_aborted() {
        let mut g = BlockGraph::new().with_iteration_cap(2);
        let a = g.create_block(BlockKind::Pass, CanvasPos::default()).unwrap();
        let b = g.create_block(BlockKind::Pass, CanvasPos::default()).unwrap();
        let c = g.create_block(BlockKind::Pass, CanvasPos::default()).unwrap();
        g.attach(a, Edge::Down, b).unwrap();
        g.attach(b, Edge::Down, c).unwrap();
        let diagnostics = check(&g, &LintOptions::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::TraversalAborted);
        assert_eq!(diagnostics[0].block, a);
    }
}
