//! Source rendering for single blocks.
//!
//! One pure function per [`BlockKind`] variant. Missing parameters render as
//! empty segments so a half-edited block still produces text.

use crate::block::{
    BlockKind, ClassParams, ConditionParams, DefParam, DefParams, ExceptParams, ForParams,
    ImportParams, ParamKind, ReturnParams, WhileParams,
};

/// Render `kind` with every line prefixed by `indent`.
///
/// Blank lines inside multi-line kinds stay blank. Holders render as `""`.
pub fn render_line(kind: &BlockKind, indent: &str) -> String {
    if kind.is_holder() {
        return String::new();
    }
    prefix_lines(&render(kind), indent)
}

/// Unindented source text for `kind`.
pub fn render(kind: &BlockKind) -> String {
    match kind {
        BlockKind::Class(p) => render_class(p),
        BlockKind::Def(p) => render_def(p),
        BlockKind::If(p) => render_conditional("if", p),
        BlockKind::Elif(p) => render_conditional("elif", p),
        BlockKind::Else | BlockKind::ForElse => "else:".to_string(),
        BlockKind::For(p) => render_for(p),
        BlockKind::While(p) => render_while(p),
        BlockKind::Try => "try:".to_string(),
        BlockKind::Except(p) => render_except(p),
        BlockKind::Finally => "finally:".to_string(),
        BlockKind::Break => "break".to_string(),
        BlockKind::Continue => "continue".to_string(),
        BlockKind::Pass => "pass".to_string(),
        BlockKind::Return(p) => render_return(p),
        BlockKind::Property(p) => format!("@{}", p.decorator.trim_start_matches('@')),
        BlockKind::Import(p) => render_import(p),
        BlockKind::Code(p) => p.text.clone(),
        BlockKind::Holder => String::new(),
    }
}

fn prefix_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_string();
    }
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{indent}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_class(p: &ClassParams) -> String {
    let parents: Vec<&str> = p
        .parents
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if parents.is_empty() {
        format!("class {} :", p.name)
    } else {
        format!("class {}({}) :", p.name, parents.join(", "))
    }
}

fn render_def(p: &DefParams) -> String {
    let params: Vec<String> = p
        .params
        .iter()
        .filter(|param| !param.name.is_empty())
        .map(render_def_param)
        .collect();
    format!("def {}({}) :", p.name, params.join(", "))
}

fn render_def_param(param: &DefParam) -> String {
    match param.kind {
        ParamKind::VarArgs => format!("*{}", param.name),
        ParamKind::KwArgs => format!("**{}", param.name),
        ParamKind::Positional if param.default.is_empty() => param.name.clone(),
        ParamKind::Positional => format!("{} = {}", param.name, param.default),
    }
}

/// `if (a > 0) and (b) :`
fn render_conditional(keyword: &str, p: &ConditionParams) -> String {
    let mut out = String::from(keyword);
    for (i, condition) in p.conditions.iter().enumerate() {
        if i > 0 {
            let connector = p.connectors.get(i - 1).copied().unwrap_or_default();
            out.push(' ');
            out.push_str(connector.as_str());
        }
        let parts: Vec<&str> = [&condition.left, &condition.op, &condition.right]
            .into_iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        out.push_str(" (");
        out.push_str(&parts.join(" "));
        out.push(')');
    }
    out.push_str(" :");
    out
}

fn render_for(p: &ForParams) -> String {
    format!("for {} in {} :", p.target, p.iterable)
}

fn render_while(p: &WhileParams) -> String {
    format!("while {} :", p.condition)
}

fn render_except(p: &ExceptParams) -> String {
    match (p.exception.is_empty(), p.alias.is_empty()) {
        (true, _) => "except:".to_string(),
        (false, true) => format!("except {} :", p.exception),
        (false, false) => format!("except {} as {} :", p.exception, p.alias),
    }
}

fn render_return(p: &ReturnParams) -> String {
    let values: Vec<&str> = p
        .values
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() {
        "return".to_string()
    } else {
        format!("return {}", values.join(", "))
    }
}

fn render_import(p: &ImportParams) -> String {
    let lines: Vec<String> = p
        .entries
        .iter()
        .filter(|e| !e.module.is_empty())
        .map(|e| {
            if e.alias.is_empty() {
                format!("import {}", e.module)
            } else {
                format!("import {} as {}", e.module, e.alias)
            }
        })
        .collect();
    if lines.is_empty() {
        "import".to_string()
    } else {
        lines.join("\n")
    }
}

// ============================================================================
// Tests
// ============================================================================
