//! Deterministic tree rendering of a composed [`crate::workflow::Workflow`]
//!

use crate::workflow::{NodeTag, Workflow};

struct Line {
    text: String,
    children: Vec<Line>,
}

fn descriptor(workflow: &Workflow) -> String {
    match workflow.tag() {
        NodeTag::Task => format!("{} (Task)", workflow.name()),
        tag => format!("{} [{}]", workflow.name(), tag.label()),
    }
}

fn describe(workflow: &Workflow) -> Line {
    Line {
        text: descriptor(workflow),
        children: node_children(workflow),
    }
}

fn labeled(label: &str, child: &Workflow) -> Line {
    Line {
        text: format!("{label} -> {}", descriptor(child)),
        children: node_children(child),
    }
}

fn node_children(workflow: &Workflow) -> Vec<Line> {
    use crate::workflow::*;

    match workflow.kind() {
        NodeKind::Task(_) => Vec::new(),
        NodeKind::Sequence(n) => n.children().iter().map(describe).collect(),
        NodeKind::Parallel(n) => n.children().iter().map(describe).collect(),
        NodeKind::Conditional(n) => {
            let mut lines = vec![labeled("When True", n.when_true())];
            if let Some(when_false) = n.when_false() {
                lines.push(labeled("When False", when_false));
            }
            lines
        }
        NodeKind::Switch(n) => {
            let mut lines: Vec<Line> = n
                .branches()
                .iter()
                .map(|(key, child)| labeled(&format!("CASE \"{key}\""), child))
                .collect();
            if let Some(default) = n.default_branch() {
                lines.push(labeled("DEFAULT", default));
            }
            lines
        }
        NodeKind::ForEach(n) => {
            vec![labeled(
                &format!("FOR EACH ({} IN {})", n.item_variable(), n.items_key()),
                n.body(),
            )]
        }
        NodeKind::Repeat(n) => {
            vec![labeled(
                &format!("REPEAT {} TIMES (index: {})", n.times(), n.index_variable()),
                n.body(),
            )]
        }
        NodeKind::Fallback(n) => vec![
            labeled("TRY (Primary)", n.primary()),
            labeled("ON FAILURE", n.fallback()),
        ],
        NodeKind::RateLimited(n) => vec![describe(n.child())],
        NodeKind::Timeout(n) => vec![describe(n.child())],
        NodeKind::Saga(n) => n
            .steps()
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let mut children = vec![labeled("ACTION", &step.action)];
                if let Some(compensation) = &step.compensation {
                    children.push(labeled("REVERT", compensation));
                }
                Line {
                    text: format!("STEP {}: {}", index + 1, step.name),
                    children,
                }
            })
            .collect(),
        NodeKind::Javascript(n) => {
            vec![Line {
                text: format!("SRC -> {} (eval)", n.render_origin()),
                children: Vec::new(),
            }]
        }
    }
}

fn render_lines(line: &Line, prefix: &str, connector: &str, out: &mut String) {
    out.push_str(prefix);
    out.push_str(connector);
    out.push_str(&line.text);
    out.push('\n');

    let child_prefix = format!("{prefix}{}", if connector == "└── " { "    " } else { "│   " });
    let last_index = line.children.len().saturating_sub(1);
    for (index, child) in line.children.iter().enumerate() {
        let child_connector = if index == last_index { "└── " } else { "├── " };
        render_lines(child, &child_prefix, child_connector, out);
    }
}

/// Renders `root` into a deterministic multi-line tree string, terminated
/// with a trailing newline.
pub fn render(root: &Workflow) -> String {
    let mut out = String::new();
    render_lines(&describe(root), "", "└── ", &mut out);
    out
}
