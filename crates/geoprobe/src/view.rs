//! Expand/collapse state over a materialized tree.
//!
//! Nodes are addressed by their index path from the root (`[]` is the root,
//! `[1, 0]` the first child of the root's second child). Only rows under
//! expanded parents are visible.

use std::collections::HashSet;
use std::fmt::Write;

use crate::node::ObjectNode;

/// Index path from the root to a node.
pub type NodePath = Vec<usize>;

/// One visible row of a [`TreeView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub path: NodePath,
    pub depth: usize,
    pub text: String,
    pub expandable: bool,
    pub expanded: bool,
}

impl Row {
    fn marker(&self) -> char {
        match (self.expandable, self.expanded) {
            (false, _) => ' ',
            (true, false) => '+',
            (true, true) => '-',
        }
    }
}

/// A result tree together with which of its nodes are expanded.
#[derive(Debug, Clone)]
pub struct TreeView {
    root: ObjectNode,
    expanded: HashSet<NodePath>,
}

impl TreeView {
    /// Wrap a tree; initially only the collapsed root row is visible.
    #[must_use]
    pub fn new(root: ObjectNode) -> Self {
        Self {
            root,
            expanded: HashSet::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &ObjectNode {
        &self.root
    }

    /// The node at `path`, if any.
    #[must_use]
    pub fn node(&self, path: &[usize]) -> Option<&ObjectNode> {
        path.iter()
            .try_fold(&self.root, |node, &i| node.children.get(i))
    }

    #[must_use]
    pub fn is_expanded(&self, path: &[usize]) -> bool {
        self.expanded.contains(path)
    }

    /// Expand the node at `path`. Leaves and unknown paths are ignored.
    pub fn expand(&mut self, path: &[usize]) {
        if self.node(path).is_some_and(|n| !n.is_leaf()) {
            self.expanded.insert(path.to_vec());
        }
    }

    /// Collapse the node at `path`, keeping its descendants' own state.
    pub fn collapse(&mut self, path: &[usize]) {
        self.expanded.remove(path);
    }

    /// Flip the expansion of the node at `path`.
    pub fn toggle(&mut self, path: &[usize]) {
        if self.is_expanded(path) {
            self.collapse(path);
        } else {
            self.expand(path);
        }
    }

    /// Expand every container in the tree.
    pub fn expand_all(&mut self) {
        self.expand_to_depth(usize::MAX);
    }

    /// Collapse every node in the tree.
    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    /// Expand every container shallower than `depth`; depth 0 is the root.
    pub fn expand_to_depth(&mut self, depth: usize) {
        let mut pending: Vec<(NodePath, &ObjectNode)> = vec![(Vec::new(), &self.root)];

        while let Some((path, node)) = pending.pop() {
            if node.is_leaf() || path.len() >= depth {
                continue;
            }
            for (i, child) in node.children.iter().enumerate() {
                let mut child_path = path.clone();
                child_path.push(i);
                pending.push((child_path, child));
            }
            self.expanded.insert(path);
        }
    }

    /// The rows currently visible, in display order.
    #[must_use]
    pub fn visible_rows(&self) -> Vec<Row> {
        let mut rows = Vec::new();
        let mut pending: Vec<(NodePath, &ObjectNode)> = vec![(Vec::new(), &self.root)];

        while let Some((path, node)) = pending.pop() {
            let expanded = self.expanded.contains(&path);
            if expanded {
                // Reversed so the first child is popped first.
                for (i, child) in node.children.iter().enumerate().rev() {
                    let mut child_path = path.clone();
                    child_path.push(i);
                    pending.push((child_path, child));
                }
            }
            rows.push(Row {
                depth: path.len(),
                path,
                text: node.display(),
                expandable: !node.is_leaf(),
                expanded,
            });
        }

        rows
    }

    /// Render the visible rows, two spaces of indentation per level.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for row in self.visible_rows() {
            let indent = "  ".repeat(row.depth);
            let _ = writeln!(out, "{indent}{} {}", row.marker(), row.text);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::materialize;

    fn view() -> TreeView {
        TreeView::new(materialize(
            "result",
            &json!({
                "statusCode": 200,
                "resourceSets": [
                    {"estimatedTotal": 1, "resources": [{"name": "Seattle, WA"}]}
                ],
                "errors": []
            }),
        ))
    }

    fn texts(view: &TreeView) -> Vec<String> {
        view.visible_rows().into_iter().map(|r| r.text).collect()
    }

    #[test]
    fn test_starts_collapsed() {
        let view = view();
        assert_eq!(texts(&view), ["result: {3 fields}"]);
        assert!(!view.is_expanded(&[]));
    }

    #[test]
    fn test_expand_root() {
        let mut view = view();
        view.expand(&[]);
        assert_eq!(
            texts(&view),
            [
                "result: {3 fields}",
                "statusCode: 200",
                "resourceSets: [1 item]",
                "errors: [] (empty)",
            ]
        );
    }

    #[test]
    fn test_expand_leaf_is_ignored() {
        let mut view = view();
        view.expand(&[0]);
        view.expand(&[2]);
        view.expand(&[9, 9]);
        assert!(!view.is_expanded(&[0]));
        assert!(!view.is_expanded(&[2]));
        assert!(!view.is_expanded(&[9, 9]));
    }

    #[test]
    fn test_expand_all_and_collapse_all() {
        let mut view = view();
        view.expand_all();
        let rows = view.visible_rows();
        assert_eq!(rows.len(), view.root().node_count());
        assert_eq!(rows.last().unwrap().text, "errors: [] (empty)");
        let name = rows.iter().find(|r| r.text == "name: Seattle, WA").unwrap();
        assert_eq!(name.path, [1, 0, 1, 0, 0]);
        assert_eq!(name.depth, 5);

        view.collapse_all();
        assert_eq!(view.visible_rows().len(), 1);
    }

    #[test]
    fn test_collapse_keeps_descendant_state() {
        let mut view = view();
        view.expand(&[]);
        view.expand(&[1]);
        view.collapse(&[]);
        assert_eq!(view.visible_rows().len(), 1);

        view.toggle(&[]);
        assert!(texts(&view).contains(&"0: {2 fields}".to_string()));
    }

    #[test]
    fn test_expand_to_depth() {
        let mut view = view();
        view.expand_to_depth(2);
        assert!(view.is_expanded(&[]));
        assert!(view.is_expanded(&[1]));
        assert!(!view.is_expanded(&[1, 0]));
    }

    #[test]
    fn test_render() {
        let mut view = view();
        view.expand_to_depth(2);
        assert_eq!(
            view.render(),
            "- result: {3 fields}\n\
             \x20   statusCode: 200\n\
             \x20 - resourceSets: [1 item]\n\
             \x20   + 0: {2 fields}\n\
             \x20   errors: [] (empty)\n"
        );
    }
}
