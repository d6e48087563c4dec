//! Process tree construction and manipulation.
//!
//! Builds the relationship tree around the monitored process: its parent as
//! a predecessor and its whole recursive descendant set as children. The
//! tree is rebuilt from scratch each cycle.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

use super::handle::ProcessHandle;
use super::metrics::ProcessRef;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRole {
    Current,
    Parent,
    Child,
}

/// A node in the process tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessTreeNode {
    pub pid: u32,
    pub name: String,
    pub role: NodeRole,
    /// Display only: the process that actually spawned this one. For a
    /// grandchild this differs from the monitored pid.
    pub parent_pid: Option<u32>,
    /// Distance from the monitored process (0 for it and its parent).
    pub depth: usize,
    pub children: Vec<ProcessTreeNode>,
}

impl ProcessTreeNode {
    fn count(&self) -> usize {
        1 + self.children.iter().map(ProcessTreeNode::count).sum::<usize>()
    }

    fn collect_edges(&self, edges: &mut Vec<(u32, u32)>) {
        for child in &self.children {
            edges.push((self.pid, child.pid));
            child.collect_edges(edges);
        }
    }
}

/// The monitored process, its parent and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessTree {
    pub parent: Option<ProcessTreeNode>,
    pub root: ProcessTreeNode,
}

impl ProcessTree {
    /// Total nodes including the root and the parent.
    pub fn node_count(&self) -> usize {
        self.root.count() + usize::from(self.parent.is_some())
    }

    pub fn descendant_count(&self) -> usize {
        self.root.count() - 1
    }

    /// Directed edges `(from, to)`: parent to root, then every node to each
    /// of its children, depth first.
    pub fn edges(&self) -> Vec<(u32, u32)> {
        let mut edges = Vec::new();
        if let Some(parent) = &self.parent {
            edges.push((parent.pid, self.root.pid));
        }
        self.root.collect_edges(&mut edges);
        edges
    }

    /// Graphviz DOT rendering of the tree.
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph process_tree {\n");
        let mut nodes = Vec::new();
        if let Some(parent) = &self.parent {
            nodes.push(parent);
        }
        let mut stack = vec![&self.root];
        while let Some(node) = stack.pop() {
            nodes.push(node);
            stack.extend(node.children.iter().rev());
        }

        for node in nodes {
            let shape = match node.role {
                NodeRole::Current => "doublecircle",
                NodeRole::Parent => "box",
                NodeRole::Child => "ellipse",
            };
            let _ = writeln!(
                dot,
                "  \"{}\" [label=\"{}\\n{}\", shape={}];",
                node.pid,
                escape_label(&node.name),
                node.pid,
                shape
            );
        }
        for (from, to) in self.edges() {
            let _ = writeln!(dot, "  \"{}\" -> \"{}\";", from, to);
        }
        dot.push('}');
        dot
    }
}

fn escape_label(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Query the handle for its relatives and assemble the tree.
pub fn build_process_tree(handle: &mut dyn ProcessHandle) -> Result<ProcessTree> {
    let root = ProcessRef::new(handle.pid(), None, handle.name()?);
    let parent = handle.parent()?;
    let descendants = handle.children(true)?;
    Ok(assemble_tree(root, parent, &descendants))
}

/// Build a tree from already queried relatives.
///
/// Every descendant, however deep, becomes a direct child of the root so the
/// edges are parent to root and root to each descendant. Children are
/// ordered by ascending pid; duplicates and the root itself are skipped.
pub fn assemble_tree(
    root: ProcessRef,
    parent: Option<ProcessRef>,
    descendants: &[ProcessRef],
) -> ProcessTree {
    let mut seen = HashSet::new();
    let mut children: Vec<ProcessTreeNode> = descendants
        .iter()
        .filter(|process| process.pid != root.pid && seen.insert(process.pid))
        .map(|process| ProcessTreeNode {
            pid: process.pid,
            name: process.name.clone(),
            role: NodeRole::Child,
            parent_pid: process.parent_pid,
            depth: 1,
            children: Vec::new(),
        })
        .collect();
    children.sort_by_key(|node| node.pid);

    ProcessTree {
        parent: parent.map(|p| ProcessTreeNode {
            pid: p.pid,
            name: p.name,
            role: NodeRole::Parent,
            parent_pid: p.parent_pid,
            depth: 0,
            children: Vec::new(),
        }),
        root: ProcessTreeNode {
            pid: root.pid,
            name: root.name,
            role: NodeRole::Current,
            parent_pid: root.parent_pid,
            depth: 0,
            children,
        },
    }
}

/// A flattened tree row with indentation information
#[derive(Debug, Clone)]
pub struct FlattenedProcess {
    pub pid: u32,
    pub name: String,
    pub role: NodeRole,
    pub parent_pid: Option<u32>,
    pub depth: usize,
    pub is_last: bool,
    pub parent_chain: Vec<bool>, // For drawing tree lines
}

/// Flatten the tree into display rows: parent first, then the monitored
/// process and its descendants one level below it.
pub fn flatten_tree(tree: &ProcessTree) -> Vec<FlattenedProcess> {
    let mut result = Vec::new();
    let base_depth = match &tree.parent {
        Some(parent) => {
            result.push(FlattenedProcess {
                pid: parent.pid,
                name: parent.name.clone(),
                role: NodeRole::Parent,
                parent_pid: parent.parent_pid,
                depth: 0,
                is_last: true,
                parent_chain: Vec::new(),
            });
            1
        }
        None => 0,
    };
    let chain = if base_depth > 0 { vec![true] } else { Vec::new() };
    flatten_node(&tree.root, base_depth, &mut result, true, chain);
    result
}

fn flatten_node(
    node: &ProcessTreeNode,
    base_depth: usize,
    result: &mut Vec<FlattenedProcess>,
    is_last: bool,
    mut parent_chain: Vec<bool>,
) {
    result.push(FlattenedProcess {
        pid: node.pid,
        name: node.name.clone(),
        role: node.role,
        parent_pid: node.parent_pid,
        depth: node.depth + base_depth,
        is_last,
        parent_chain: parent_chain.clone(),
    });

    if !node.children.is_empty() {
        parent_chain.push(is_last);
        let num_children = node.children.len();

        for (i, child) in node.children.iter().enumerate() {
            let child_is_last = i == num_children - 1;
            flatten_node(child, base_depth, result, child_is_last, parent_chain.clone());
        }
    }
}

/// Generate tree indentation string (like htop)
pub fn format_tree_indent(flattened: &FlattenedProcess) -> String {
    let mut indent = String::new();

    // The first chain entry belongs to the top row, which draws no connector.
    for &is_parent_last in flattened.parent_chain.iter().skip(1) {
        if is_parent_last {
            indent.push_str("  ");
        } else {
            indent.push_str("│ ");
        }
    }

    if flattened.depth > 0 {
        if flattened.is_last {
            indent.push_str("└─");
        } else {
            indent.push_str("├─");
        }
    }

    indent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> ProcessRef {
        ProcessRef::new(100, Some(1), "app")
    }

    #[test]
    fn test_parent_and_two_children() {
        let tree = assemble_tree(
            target(),
            Some(ProcessRef::new(1, None, "init")),
            &[
                ProcessRef::new(102, Some(100), "worker-b"),
                ProcessRef::new(101, Some(100), "worker-a"),
            ],
        );

        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.descendant_count(), 2);
        assert_eq!(tree.root.role, NodeRole::Current);
        assert_eq!(tree.parent.as_ref().unwrap().role, NodeRole::Parent);
        assert_eq!(tree.edges(), vec![(1, 100), (100, 101), (100, 102)]);
        assert!(tree
            .root
            .children
            .iter()
            .all(|c| c.role == NodeRole::Child && c.depth == 1));
    }

    #[test]
    fn test_grandchildren_are_children_of_root() {
        let tree = assemble_tree(
            target(),
            None,
            &[
                ProcessRef::new(205, Some(101), "grep"),
                ProcessRef::new(101, Some(100), "shell"),
            ],
        );

        assert!(tree.parent.is_none());
        assert_eq!(tree.descendant_count(), 2);
        assert_eq!(tree.edges(), vec![(100, 101), (100, 205)]);
        let grep = &tree.root.children[1];
        assert_eq!(grep.role, NodeRole::Child);
        assert_eq!(grep.depth, 1);
        assert_eq!(grep.parent_pid, Some(101));
        assert!(grep.children.is_empty());
    }

    #[test]
    fn test_duplicates_and_root_are_skipped() {
        let tree = assemble_tree(
            target(),
            None,
            &[
                ProcessRef::new(100, Some(1), "app"),
                ProcessRef::new(300, Some(101), "late"),
                ProcessRef::new(300, Some(101), "late"),
            ],
        );
        assert_eq!(tree.edges(), vec![(100, 300)]);
    }

    #[test]
    fn test_no_relatives() {
        let tree = assemble_tree(target(), None, &[]);
        assert_eq!(tree.node_count(), 1);
        assert!(tree.edges().is_empty());
    }

    #[test]
    fn test_flatten_tree() {
        let tree = assemble_tree(
            target(),
            Some(ProcessRef::new(1, None, "init")),
            &[
                ProcessRef::new(101, Some(100), "a"),
                ProcessRef::new(102, Some(100), "b"),
            ],
        );
        let flat = flatten_tree(&tree);

        let pids: Vec<u32> = flat.iter().map(|f| f.pid).collect();
        assert_eq!(pids, vec![1, 100, 101, 102]);
        assert_eq!(flat[0].depth, 0);
        assert_eq!(flat[1].depth, 1);
        assert_eq!(flat[2].depth, 2);
        assert_eq!(format_tree_indent(&flat[0]), "");
        assert_eq!(format_tree_indent(&flat[1]), "└─");
        assert_eq!(format_tree_indent(&flat[2]), "  ├─");
        assert_eq!(format_tree_indent(&flat[3]), "  └─");
    }

    #[test]
    fn test_dot_export() {
        let tree = assemble_tree(
            ProcessRef::new(100, Some(1), "my \"app\""),
            Some(ProcessRef::new(1, None, "init")),
            &[ProcessRef::new(101, Some(100), "child")],
        );
        let dot = tree.to_dot();

        assert!(dot.starts_with("digraph process_tree {"));
        assert!(dot.contains("\"1\" -> \"100\";"));
        assert!(dot.contains("\"100\" -> \"101\";"));
        assert!(dot.contains("my \\\"app\\\""));
        assert!(dot.ends_with('}'));
    }
}
