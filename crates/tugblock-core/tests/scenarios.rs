//! End-to-end scenarios and graph properties
//!
//! These tests drive the public API the way an editor host does: create
//! blocks, link them, edit the structure, then read back emitted text,
//! depths and documents.

use std::collections::BTreeSet;

use tugblock_core::block::{
    ClassParams, Condition, ConditionParams, DefParam, DefParams, ExceptParams, ForParams,
    WhileParams,
};
use tugblock_core::{
    BlockGraph, BlockId, BlockKind, BranchKind, CanvasPos, Edge, EditHistory, GraphCommand,
};

const HEADER: &str = "# Auto-Generated by tugblock\n";

fn create(graph: &mut BlockGraph, kind: BlockKind) -> BlockId {
    graph.create_block(kind, CanvasPos::default()).unwrap()
}

fn code(graph: &mut BlockGraph, text: &str) -> BlockId {
    create(graph, BlockKind::code(text))
}

/// `if (x > 0) :` with body `print(x)` followed by `print('done')`.
fn scenario_a() -> (BlockGraph, BlockId, BlockId, BlockId) {
    let mut g = BlockGraph::new();
    let head = create(
        &mut g,
        BlockKind::If(ConditionParams::single(Condition::new("x", ">", "0"))),
    );
    let body = code(&mut g, "print(x)");
    let done = code(&mut g, "print('done')");
    g.attach(head, Edge::Indent, body).unwrap();
    g.attach(head, Edge::Down, done).unwrap();
    (g, head, body, done)
}

/// A graph touching every compound kind and branch.
fn program() -> BlockGraph {
    let mut g = BlockGraph::new();
    let class = create(
        &mut g,
        BlockKind::Class(ClassParams {
            name: "Counter".to_string(),
            parents: vec!["object".to_string()],
        }),
    );
    let def = create(
        &mut g,
        BlockKind::Def(DefParams {
            name: "run".to_string(),
            params: vec![DefParam::positional("self"), DefParam::with_default("n", "3")],
        }),
    );
    let for_loop = create(
        &mut g,
        BlockKind::For(ForParams {
            target: "i".to_string(),
            iterable: "range(n)".to_string(),
        }),
    );
    let try_block = create(&mut g, BlockKind::Try);
    let step = code(&mut g, "self.step(i)");
    let while_loop = create(
        &mut g,
        BlockKind::While(WhileParams {
            condition: "self.busy".to_string(),
        }),
    );
    let wait = code(&mut g, "self.wait()");
    let ret = create(&mut g, BlockKind::Return(Default::default()));

    g.attach(class, Edge::Indent, def).unwrap();
    g.attach(def, Edge::Indent, for_loop).unwrap();
    g.attach(for_loop, Edge::Indent, try_block).unwrap();
    g.attach(try_block, Edge::Indent, step).unwrap();
    g.attach(for_loop, Edge::Down, while_loop).unwrap();
    g.attach(while_loop, Edge::Indent, wait).unwrap();
    g.attach(while_loop, Edge::Down, ret).unwrap();

    let except = g.attach_optional_branch(try_block, BranchKind::Except).unwrap();
    g.edit_block(
        except,
        BlockKind::Except(ExceptParams {
            exception: "ValueError".to_string(),
            alias: "e".to_string(),
        }),
    )
    .unwrap();
    let handler = code(&mut g, "continue_on(e)");
    g.attach(except, Edge::Indent, handler).unwrap();
    let fin = g.attach_optional_branch(try_block, BranchKind::Finally).unwrap();
    let cleanup = code(&mut g, "self.flush()");
    g.attach(fin, Edge::Indent, cleanup).unwrap();
    let for_else = g.attach_optional_branch(for_loop, BranchKind::ForElse).unwrap();
    let pass = create(&mut g, BlockKind::Pass);
    g.attach(for_else, Edge::Indent, pass).unwrap();

    g.create_block(BlockKind::code("c = Counter()"), CanvasPos::new(0.0, 500.0))
        .unwrap();
    g
}

const PROGRAM_TEXT: &str = "\
class Counter(object) :
    def run(self, n = 3) :
        for i in range(n) :
            try:
                self.step(i)
            except ValueError as e :
                continue_on(e)
            finally:
                self.flush()
        else:
            pass
        while self.busy :
            self.wait()
        return

c = Counter()
";

mod scenarios {
    use super::*;

    #[test]
    fn scenario_a_if_with_body_and_continuation() {
        let (g, ..) = scenario_a();
        assert_eq!(
            g.emit(),
            format!("{HEADER}if (x > 0) :\n    print(x)\nprint('done')\n")
        );
    }

    #[test]
    fn scenario_b_delete_body_statement() {
        let (mut g, head, body, done) = scenario_a();
        assert_eq!(g.delete_block(body).unwrap(), vec![body]);
        assert_eq!(g.block(head).unwrap().indent(), None);
        assert_eq!(g.block(done).unwrap().depth(), 0);
        assert_eq!(g.emit(), format!("{HEADER}if (x > 0) :\nprint('done')\n"));
    }

    #[test]
    fn scenario_c_attach_else_with_body() {
        let (mut g, head, ..) = scenario_a();
        let els = g.attach_optional_branch(head, BranchKind::Else).unwrap();
        let neg = code(&mut g, "print('neg')");
        g.attach(els, Edge::Indent, neg).unwrap();

        assert_eq!(g.block(els).unwrap().depth(), 0);
        assert_eq!(g.block(neg).unwrap().depth(), 1);
        assert_eq!(
            g.emit(),
            format!("{HEADER}if (x > 0) :\n    print(x)\nelse:\n    print('neg')\nprint('done')\n")
        );
    }

    #[test]
    fn full_program_emits_expected_text() {
        assert_eq!(program().emit(), format!("{HEADER}{PROGRAM_TEXT}"));
    }
}

mod properties {
    use super::*;

    #[test]
    fn depth_follows_predecessor_edge() {
        let g = program();
        for block in g.blocks() {
            match block.predecessor() {
                None => assert_eq!(block.depth(), 0, "root {}", block.id()),
                Some((parent, edge)) => {
                    let parent_depth = g.block(parent).unwrap().depth();
                    let expected = parent_depth + usize::from(edge == Edge::Indent);
                    assert_eq!(block.depth(), expected, "block {}", block.id());
                    assert_eq!(g.depth_of(block.id()).unwrap(), expected);
                }
            }
        }
    }

    #[test]
    fn traversal_visits_each_block_once() {
        let g = program();
        let mut visited = Vec::new();
        for root in g.root_blocks() {
            let traversal = g.traverse(root);
            assert!(!traversal.aborted);
            visited.extend(traversal.ids());
        }
        let unique: BTreeSet<BlockId> = visited.iter().copied().collect();
        assert_eq!(unique.len(), visited.len());
        let expected: BTreeSet<BlockId> = g
            .blocks()
            .filter(|b| !b.kind().is_holder())
            .map(|b| b.id())
            .collect();
        assert_eq!(unique, expected);
    }

    #[test]
    fn emit_is_idempotent() {
        let g = program();
        assert_eq!(g.emit(), g.emit());
    }

    #[test]
    fn attach_then_detach_branch_restores_text() {
        let mut g = program();
        let before = g.emit();
        let try_block = g
            .blocks()
            .find(|b| matches!(b.kind(), BlockKind::Try))
            .map(|b| b.id())
            .unwrap();
        g.attach_optional_branch(try_block, BranchKind::Except).unwrap();
        assert_ne!(g.emit(), before);
        g.detach_optional_branch(try_block, BranchKind::Except).unwrap();
        assert_eq!(g.emit(), before);

        let (mut g, head, ..) = scenario_a();
        let before = g.emit();
        for kind in [BranchKind::Elif, BranchKind::Else] {
            g.attach_optional_branch(head, kind).unwrap();
            g.detach_optional_branch(head, kind).unwrap();
            assert_eq!(g.emit(), before);
        }
    }

    #[test]
    fn deleting_compound_removes_only_what_it_owns() {
        let mut g = program();
        let for_loop = g
            .blocks()
            .find(|b| matches!(b.kind(), BlockKind::For(_)))
            .map(|b| b.id())
            .unwrap();
        let def = g.block(for_loop).unwrap().predecessor().unwrap().0;
        let before_len = g.len();

        let removed = g.delete_block(for_loop).unwrap();
        // for + holder, try + holder + step, except + holder + handler,
        // finally + holder + cleanup, for-else + holder + pass
        assert_eq!(removed.len(), 14);
        assert_eq!(g.len(), before_len - 14);

        assert_eq!(
            g.emit(),
            format!(
                "{HEADER}class Counter(object) :\n    def run(self, n = 3) :\n        \
                 while self.busy :\n            self.wait()\n        return\n\nc = Counter()\n"
            )
        );
        let while_loop = g.block(def).unwrap().indent().unwrap();
        assert!(matches!(g.block(while_loop).unwrap().kind(), BlockKind::While(_)));
    }

    #[test]
    fn document_round_trip() {
        let mut g = program();
        g.renumber(tugblock_core::NumberingMode::Sequential);
        let doc = g.serialize();
        let rebuilt = BlockGraph::deserialize(&doc).unwrap();
        assert_eq!(rebuilt.serialize(), doc);
        assert_eq!(rebuilt.emit(), g.emit());

        let json = g.to_json_pretty().unwrap();
        let from_json = BlockGraph::from_json(&json).unwrap();
        assert_eq!(from_json.to_json_pretty().unwrap(), json);
    }

    #[test]
    fn iteration_cap_truncates_without_failing() {
        let mut g = program();
        g.set_iteration_cap(4);
        let text = g.emit();
        assert!(text.starts_with(HEADER));
        assert!(text.contains("class Counter(object) :"));
        assert!(!text.contains("self.flush()"));
    }
}

mod history {
    use super::*;

    #[test]
    fn command_script_with_undo_redo() {
        let script: Vec<GraphCommand> = serde_json::from_str(
            r#"[
                {"command": "add_block", "block": {"kind": "if", "params": {"conditions": [{"left": "x", "op": ">", "right": "0"}]}}},
                {"command": "add_block", "block": {"kind": "code", "params": {"text": "print(x)"}}},
                {"command": "add_block", "block": {"kind": "code", "params": {"text": "print('done')"}}},
                {"command": "attach", "parent": 1, "edge": "indent", "child": 3},
                {"command": "attach", "parent": 1, "edge": "down", "child": 4}
            ]"#,
        )
        .unwrap();

        let mut history = EditHistory::new(BlockGraph::new(), 100);
        for command in &script {
            history.apply(command).unwrap();
        }
        let scenario_text = format!("{HEADER}if (x > 0) :\n    print(x)\nprint('done')\n");
        assert_eq!(history.graph().emit(), scenario_text);

        history
            .apply(&GraphCommand::Delete {
                block: BlockId::new(3),
            })
            .unwrap();
        assert_eq!(
            history.graph().emit(),
            format!("{HEADER}if (x > 0) :\nprint('done')\n")
        );

        assert!(history.undo());
        assert_eq!(history.graph().emit(), scenario_text);
        assert!(history.redo());
        assert!(!history.graph().contains(BlockId::new(3)));
    }
}
