//! Block entity: identifiers, edge slots, kind-specific parameters.
//!
//! A [`Block`] is one statement or compound header on the canvas. Blocks never
//! reference each other directly; every edge is a [`BlockId`] looked up in the
//! owning [`BlockGraph`](crate::graph::BlockGraph) arena.
//!
//! # Edges
//!
//! | Slot | Edge | Meaning |
//! |------|------|---------|
//! | `down` | [`Edge::Down`] | next statement at the same depth |
//! | `indent` | [`Edge::Indent`] | first statement of the nested body |
//! | `holder` | [`Edge::Bottom`] | the Holder closing the body (compound headers only) |
//!
//! A Holder's `down` slot carries the header's optional branch chain
//! (`elif`/`else`/`except`/`finally`), each branch owning its own Holder.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::render;

// ============================================================================
// Identity
// ============================================================================

/// Stable identifier of a block within one graph. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Create a new block ID.
    pub fn new(id: u32) -> Self {
        BlockId(id)
    }

    /// Get the raw u32 value.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blk_{}", self.0)
    }
}

/// Kind of link between a block and one of its successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Edge {
    /// Sequential continuation at the same depth.
    Down,
    /// Nested body, one level deeper.
    Indent,
    /// Header to its Holder. Managed by the graph only.
    Bottom,
}

impl Edge {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::Down => "down",
            Edge::Indent => "indent",
            Edge::Bottom => "bottom",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas position. Only the `y` of root blocks affects emission order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasPos {
    pub x: f64,
    pub y: f64,
}

impl CanvasPos {
    pub fn new(x: f64, y: f64) -> Self {
        CanvasPos { x, y }
    }
}

// ============================================================================
// Parameters
// ============================================================================

/// One `left op right` comparison of an `if`/`elif` header.
///
/// Any part may be empty; a free-form condition can live entirely in `left`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    pub left: String,
    pub op: String,
    pub right: String,
}

impl Condition {
    pub fn new(left: impl Into<String>, op: impl Into<String>, right: impl Into<String>) -> Self {
        Condition {
            left: left.into(),
            op: op.into(),
            right: right.into(),
        }
    }

    /// Condition held entirely in `left`.
    pub fn raw(text: impl Into<String>) -> Self {
        Condition::new(text, "", "")
    }
}

/// Boolean connector placed between two consecutive conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl Connector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connector::And => "and",
            Connector::Or => "or",
        }
    }
}

/// Payload shared by `if` and `elif`.
///
/// `connectors[i]` joins `conditions[i]` and `conditions[i + 1]`; a missing
/// connector defaults to `and`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionParams {
    pub conditions: Vec<Condition>,
    pub connectors: Vec<Connector>,
}

impl ConditionParams {
    /// Single condition, no connectors.
    pub fn single(condition: Condition) -> Self {
        ConditionParams {
            conditions: vec![condition],
            connectors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassParams {
    pub name: String,
    pub parents: Vec<String>,
}

/// How a `def` parameter binds its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    #[default]
    Positional,
    /// `*name`
    VarArgs,
    /// `**name`
    KwArgs,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefParam {
    pub name: String,
    pub default: String,
    pub kind: ParamKind,
}

impl DefParam {
    pub fn positional(name: impl Into<String>) -> Self {
        DefParam {
            name: name.into(),
            ..DefParam::default()
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<String>) -> Self {
        DefParam {
            name: name.into(),
            default: default.into(),
            kind: ParamKind::Positional,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefParams {
    pub name: String,
    pub params: Vec<DefParam>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForParams {
    pub target: String,
    pub iterable: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WhileParams {
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptParams {
    pub exception: String,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnParams {
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyParams {
    pub decorator: String,
}

impl Default for PropertyParams {
    fn default() -> Self {
        PropertyParams {
            decorator: "@property".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportEntry {
    pub module: String,
    pub alias: String,
}

impl ImportEntry {
    pub fn new(module: impl Into<String>, alias: impl Into<String>) -> Self {
        ImportEntry {
            module: module.into(),
            alias: alias.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportParams {
    pub entries: Vec<ImportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeParams {
    pub text: String,
}

// ============================================================================
// Block Kind
// ============================================================================

/// What a block represents, with exactly the fields that kind needs.
///
/// Serialized adjacently tagged: `{"kind": "if", "params": {...}}`. Kinds
/// without parameters serialize as `{"kind": "else"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum BlockKind {
    Class(ClassParams),
    Def(DefParams),
    If(ConditionParams),
    Elif(ConditionParams),
    Else,
    For(ForParams),
    ForElse,
    While(WhileParams),
    Try,
    Except(ExceptParams),
    Finally,
    Break,
    Continue,
    Pass,
    Return(ReturnParams),
    Property(PropertyParams),
    Import(ImportParams),
    Code(CodeParams),
    Holder,
}

impl BlockKind {
    /// Free-text code block.
    pub fn code(text: impl Into<String>) -> Self {
        BlockKind::Code(CodeParams { text: text.into() })
    }

    /// `if` header with a single raw condition.
    pub fn if_raw(condition: impl Into<String>) -> Self {
        BlockKind::If(ConditionParams::single(Condition::raw(condition)))
    }

    /// Palette default for a kind name, as dropped from the palette.
    ///
    /// Optional branches and holders are not on the palette.
    pub fn palette_default(name: &str) -> Option<BlockKind> {
        let kind = match name {
            "class" => BlockKind::Class(ClassParams::default()),
            "def" => BlockKind::Def(DefParams::default()),
            "if" => BlockKind::If(ConditionParams::default()),
            "for" => BlockKind::For(ForParams::default()),
            "while" => BlockKind::While(WhileParams::default()),
            "try" => BlockKind::Try,
            "break" => BlockKind::Break,
            "continue" => BlockKind::Continue,
            "pass" => BlockKind::Pass,
            "return" => BlockKind::Return(ReturnParams::default()),
            "property" => BlockKind::Property(PropertyParams::default()),
            "import" => BlockKind::Import(ImportParams::default()),
            "code" => BlockKind::Code(CodeParams::default()),
            _ => return None,
        };
        Some(kind)
    }

    /// Stable snake_case name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Class(_) => "class",
            BlockKind::Def(_) => "def",
            BlockKind::If(_) => "if",
            BlockKind::Elif(_) => "elif",
            BlockKind::Else => "else",
            BlockKind::For(_) => "for",
            BlockKind::ForElse => "for_else",
            BlockKind::While(_) => "while",
            BlockKind::Try => "try",
            BlockKind::Except(_) => "except",
            BlockKind::Finally => "finally",
            BlockKind::Break => "break",
            BlockKind::Continue => "continue",
            BlockKind::Pass => "pass",
            BlockKind::Return(_) => "return",
            BlockKind::Property(_) => "property",
            BlockKind::Import(_) => "import",
            BlockKind::Code(_) => "code",
            BlockKind::Holder => "holder",
        }
    }

    /// Headers that own a nested body and a Holder.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            BlockKind::Class(_)
                | BlockKind::Def(_)
                | BlockKind::If(_)
                | BlockKind::Elif(_)
                | BlockKind::Else
                | BlockKind::For(_)
                | BlockKind::ForElse
                | BlockKind::While(_)
                | BlockKind::Try
                | BlockKind::Except(_)
                | BlockKind::Finally
        )
    }

    pub fn is_holder(&self) -> bool {
        matches!(self, BlockKind::Holder)
    }

    /// Optional branch kinds live only in a header's branch chain.
    pub fn is_branch(&self) -> bool {
        self.branch_kind().is_some()
    }

    pub fn branch_kind(&self) -> Option<BranchKind> {
        match self {
            BlockKind::Elif(_) => Some(BranchKind::Elif),
            BlockKind::Else => Some(BranchKind::Else),
            BlockKind::ForElse => Some(BranchKind::ForElse),
            BlockKind::Except(_) => Some(BranchKind::Except),
            BlockKind::Finally => Some(BranchKind::Finally),
            _ => None,
        }
    }

    /// True when both kinds are the same variant, ignoring parameters.
    pub fn same_variant(&self, other: &BlockKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Optional branches a compound header may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchKind {
    Elif,
    Else,
    ForElse,
    Except,
    Finally,
}

impl BranchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchKind::Elif => "elif",
            BranchKind::Else => "else",
            BranchKind::ForElse => "for_else",
            BranchKind::Except => "except",
            BranchKind::Finally => "finally",
        }
    }

    /// Whether `header` may carry this branch.
    pub fn applies_to(&self, header: &BlockKind) -> bool {
        matches!(
            (header, self),
            (BlockKind::If(_), BranchKind::Elif | BranchKind::Else)
                | (BlockKind::For(_), BranchKind::ForElse)
                | (BlockKind::Try, BranchKind::Except | BranchKind::Finally)
        )
    }

    /// At most one of these per header.
    pub fn is_unique(&self) -> bool {
        !matches!(self, BranchKind::Elif | BranchKind::Except)
    }

    /// Position in the chain: elif/except, then else, then finally.
    pub fn rank(&self) -> u8 {
        match self {
            BranchKind::Elif | BranchKind::Except => 0,
            BranchKind::Else | BranchKind::ForElse => 1,
            BranchKind::Finally => 2,
        }
    }

    /// Fresh block kind with default parameters.
    pub fn default_block(&self) -> BlockKind {
        match self {
            BranchKind::Elif => BlockKind::Elif(ConditionParams::default()),
            BranchKind::Else => BlockKind::Else,
            BranchKind::ForElse => BlockKind::ForElse,
            BranchKind::Except => BlockKind::Except(ExceptParams::default()),
            BranchKind::Finally => BlockKind::Finally,
        }
    }
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Block
// ============================================================================

/// One node of the block graph.
///
/// Edge slots are only writable by the graph, which keeps `predecessor` and
/// the owner's slot consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    id: BlockId,
    kind: BlockKind,
    pub(crate) predecessor: Option<(BlockId, Edge)>,
    pub(crate) down: Option<BlockId>,
    pub(crate) indent: Option<BlockId>,
    pub(crate) holder: Option<BlockId>,
    pub(crate) depth: usize,
    pub(crate) display_number: Option<u32>,
    pub(crate) moved: bool,
    pub(crate) canvas: CanvasPos,
}

impl Block {
    /// Create an unlinked block.
    pub fn new(id: BlockId, kind: BlockKind) -> Self {
        Block {
            id,
            kind,
            predecessor: None,
            down: None,
            indent: None,
            holder: None,
            depth: 0,
            display_number: None,
            moved: false,
            canvas: CanvasPos::default(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: BlockKind) {
        self.kind = kind;
    }

    /// Owner of the incoming edge and which slot it uses.
    pub fn predecessor(&self) -> Option<(BlockId, Edge)> {
        self.predecessor
    }

    pub fn down(&self) -> Option<BlockId> {
        self.down
    }

    pub fn indent(&self) -> Option<BlockId> {
        self.indent
    }

    pub fn holder(&self) -> Option<BlockId> {
        self.holder
    }

    /// Successor in the given slot.
    pub fn slot(&self, edge: Edge) -> Option<BlockId> {
        match edge {
            Edge::Down => self.down,
            Edge::Indent => self.indent,
            Edge::Bottom => self.holder,
        }
    }

    pub(crate) fn slot_mut(&mut self, edge: Edge) -> &mut Option<BlockId> {
        match edge {
            Edge::Down => &mut self.down,
            Edge::Indent => &mut self.indent,
            Edge::Bottom => &mut self.holder,
        }
    }

    /// Nesting level as of the last depth recomputation.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn display_number(&self) -> Option<u32> {
        self.display_number
    }

    /// Set by moves, cleared by sequential renumbering.
    pub fn is_moved(&self) -> bool {
        self.moved
    }

    pub fn canvas(&self) -> CanvasPos {
        self.canvas
    }

    pub fn is_root(&self) -> bool {
        self.predecessor.is_none()
    }

    /// Source text for this block, every line prefixed by `indent`.
    ///
    /// Holders render as the empty string; emission skips them.
    pub fn render_line(&self, indent: &str) -> String {
        render::render_line(&self.kind, indent)
    }
}

// ============================================================================
// Tests
// ============================================================================
