use procwatch::core::profiler::fake::FakeProcess;
use procwatch::core::profiler::{build_process_tree, flatten_tree, NodeRole, ProcessRef};

#[test]
fn test_tree_with_parent_and_two_children() {
    let mut fake = FakeProcess::new(100, "server")
        .with_parent(ProcessRef::new(1, None, "init"))
        .with_descendants(vec![
            ProcessRef::new(102, Some(100), "worker-b"),
            ProcessRef::new(101, Some(100), "worker-a"),
        ]);

    let tree = build_process_tree(&mut fake).unwrap();

    assert_eq!(tree.node_count(), 4);
    assert_eq!(tree.edges(), vec![(1, 100), (100, 101), (100, 102)]);

    let rows = flatten_tree(&tree);
    let roles: Vec<NodeRole> = rows.iter().map(|r| r.role).collect();
    assert_eq!(
        roles,
        vec![NodeRole::Parent, NodeRole::Current, NodeRole::Child, NodeRole::Child]
    );
    assert!(rows[3].is_last);
}

#[test]
fn test_grandchild_hangs_off_the_target() {
    let mut fake = FakeProcess::new(100, "shell")
        .with_parent(ProcessRef::new(1, None, "init"))
        .with_descendants(vec![
            ProcessRef::new(101, Some(100), "make"),
            ProcessRef::new(205, Some(101), "cc"),
        ]);

    let tree = build_process_tree(&mut fake).unwrap();

    assert_eq!(tree.edges(), vec![(1, 100), (100, 101), (100, 205)]);
    assert!(tree
        .root
        .children
        .iter()
        .all(|child| child.role == NodeRole::Child && child.children.is_empty()));
    assert_eq!(tree.root.children[1].parent_pid, Some(101));
}

#[test]
fn test_tree_without_parent_or_children() {
    let mut fake = FakeProcess::new(7, "lonely");
    let tree = build_process_tree(&mut fake).unwrap();

    assert!(tree.parent.is_none());
    assert_eq!(tree.node_count(), 1);
    assert!(tree.edges().is_empty());
}

#[test]
fn test_dot_export_lists_every_edge() {
    let mut fake = FakeProcess::new(100, "server")
        .with_parent(ProcessRef::new(1, None, "init"))
        .with_descendants(vec![ProcessRef::new(101, Some(100), "worker")]);

    let dot = build_process_tree(&mut fake).unwrap().to_dot();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("\"1\" -> \"100\""));
    assert!(dot.contains("\"100\" -> \"101\""));
    assert!(dot.ends_with('}'));
}
