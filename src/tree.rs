//! Canonical-path resolution for branching conversation exports.
//!
//! Tree exports store every edit and regeneration as a node in a mapping
//! `node id -> { message?, parent?, children[] }`. Only one root-to-leaf
//! path is the conversation the user actually sees; the rest are abandoned
//! branches. Sorting every node by timestamp interleaves those branches, so
//! resolution works on the graph instead:
//!
//! 1. Use the export's `current_node` pointer as the leaf when it names a
//!    node in the mapping.
//! 2. Otherwise descend from the root, taking the most recently created
//!    child at every branch point, until a node has no children.
//! 3. Walk `parent` links from that leaf back to the root and reverse.
//!
//! Nodes off the path are never emitted. Cycles and dangling parent links
//! are reported as [`TreeError`]s rather than looped over.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::error::TreeError;

/// A node of a tree-mapping export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

impl TreeNode {
    /// `message.create_time`, when present and numeric.
    fn created(&self) -> Option<f64> {
        self.message.as_ref()?.get("create_time")?.as_f64()
    }
}

pub type NodeMapping = HashMap<String, TreeNode>;

/// Parse the `mapping` object of an export into typed nodes.
pub fn parse_mapping(raw: &Map<String, Value>) -> Result<NodeMapping, TreeError> {
    raw.iter()
        .map(|(id, node)| {
            TreeNode::deserialize(node)
                .map(|n| (id.clone(), n))
                .map_err(|e| TreeError::InvalidNode {
                    node: id.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Resolve the canonical path, returned as node ids ordered root to leaf.
pub fn resolve_path<'a>(
    mapping: &'a NodeMapping,
    current_node: Option<&str>,
) -> Result<Vec<&'a str>, TreeError> {
    if mapping.is_empty() {
        return Err(TreeError::EmptyMapping);
    }

    let leaf = match current_node.and_then(|id| mapping.get_key_value(id)) {
        Some((id, _)) => id.as_str(),
        None => {
            if let Some(id) = current_node {
                tracing::debug!(node = id, "current_node not in mapping; using latest branch");
            }
            latest_leaf(mapping)?
        }
    };

    let mut path = Vec::new();
    let mut visited = HashSet::new();
    let mut cursor = leaf;
    loop {
        if !visited.insert(cursor) {
            return Err(TreeError::Cycle(cursor.to_string()));
        }
        path.push(cursor);
        let Some(node) = mapping.get(cursor) else {
            break;
        };
        match node.parent.as_deref() {
            None => break,
            Some(parent) => match mapping.get_key_value(parent) {
                Some((parent_id, _)) => cursor = parent_id.as_str(),
                None => {
                    return Err(TreeError::DanglingParent {
                        node: cursor.to_string(),
                        parent: parent.to_string(),
                    })
                }
            },
        }
    }

    path.reverse();
    Ok(path)
}

/// Resolve the canonical path and return the nodes that carry a message.
pub fn resolve_messages<'a>(
    mapping: &'a NodeMapping,
    current_node: Option<&str>,
) -> Result<Vec<(&'a str, &'a Value)>, TreeError> {
    let path = resolve_path(mapping, current_node)?;
    Ok(path
        .into_iter()
        .filter_map(|id| {
            let message = mapping.get(id)?.message.as_ref()?;
            if message.is_null() {
                None
            } else {
                Some((id, message))
            }
        })
        .collect())
}

/// Descend from the root along the most recently created child.
fn latest_leaf(mapping: &NodeMapping) -> Result<&str, TreeError> {
    let mut roots: Vec<&str> = mapping
        .iter()
        .filter(|(_, node)| node.parent.is_none())
        .map(|(id, _)| id.as_str())
        .collect();
    roots.sort_unstable();

    let root = roots
        .iter()
        .find(|id| mapping.get(**id).is_some_and(|n| !n.children.is_empty()))
        .or_else(|| roots.first())
        .copied()
        .ok_or(TreeError::NoRoot)?;

    let mut visited = HashSet::new();
    let mut cursor = root;
    loop {
        if !visited.insert(cursor) {
            return Err(TreeError::Cycle(cursor.to_string()));
        }
        let Some(node) = mapping.get(cursor) else {
            return Ok(cursor);
        };
        match latest_child(mapping, node) {
            Some(child) => cursor = child,
            None => return Ok(cursor),
        }
    }
}

/// The child with the highest creation time. Untimed children rank below
/// timed ones; ties go to the later entry in `children`.
fn latest_child<'a>(mapping: &'a NodeMapping, node: &TreeNode) -> Option<&'a str> {
    let mut best: Option<(&'a str, Option<f64>)> = None;
    for child_id in &node.children {
        let Some((id, child)) = mapping.get_key_value(child_id.as_str()) else {
            tracing::debug!(child = %child_id, "child id missing from mapping");
            continue;
        };
        let created = child.created();
        let better = match best {
            None => true,
            Some((_, best_created)) => match (created, best_created) {
                (Some(a), Some(b)) => a >= b,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => true,
            },
        };
        if better {
            best = Some((id.as_str(), created));
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapping(value: Value) -> NodeMapping {
        parse_mapping(value.as_object().unwrap()).unwrap()
    }

    fn msg(text: &str, t: f64) -> Value {
        json!({ "content": { "parts": [text] }, "create_time": t })
    }

    /// root -> q1 -> { a1_old (t=5), a1_new (t=9) }; a1_old -> q2_old.
    fn branching() -> Value {
        json!({
            "root": { "message": null, "parent": null, "children": ["q1"] },
            "q1": { "message": msg("question", 1.0), "parent": "root", "children": ["a1_old", "a1_new"] },
            "a1_old": { "message": msg("old answer", 5.0), "parent": "q1", "children": ["q2_old"] },
            "q2_old": { "message": msg("abandoned follow-up", 6.0), "parent": "a1_old", "children": [] },
            "a1_new": { "message": msg("new answer", 9.0), "parent": "q1", "children": [] }
        })
    }

    #[test]
    fn explicit_pointer_wins() {
        let m = mapping(branching());
        let path = resolve_path(&m, Some("q2_old")).unwrap();
        assert_eq!(path, vec!["root", "q1", "a1_old", "q2_old"]);
    }

    #[test]
    fn fallback_follows_latest_child() {
        let m = mapping(branching());
        let path = resolve_path(&m, None).unwrap();
        assert_eq!(path, vec!["root", "q1", "a1_new"]);
    }

    #[test]
    fn unknown_pointer_falls_back() {
        let m = mapping(branching());
        let path = resolve_path(&m, Some("nope")).unwrap();
        assert_eq!(path, vec!["root", "q1", "a1_new"]);
    }

    #[test]
    fn messages_skip_placeholders_and_abandoned_branches() {
        let m = mapping(branching());
        let ids: Vec<&str> = resolve_messages(&m, None)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["q1", "a1_new"]);
    }

    #[test]
    fn path_order_beats_timestamp_order() {
        // The earlier turn carries a later timestamp than its reply.
        let m = mapping(json!({
            "r": { "parent": null, "children": ["a"] },
            "a": { "message": msg("first", 100.0), "parent": "r", "children": ["b"] },
            "b": { "message": msg("second", 10.0), "parent": "a", "children": [] }
        }));
        let ids: Vec<&str> = resolve_messages(&m, None)
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn single_message_mapping() {
        let m = mapping(json!({
            "r": { "parent": null, "children": ["a"] },
            "a": { "message": msg("only", 1.0), "parent": "r", "children": [] }
        }));
        assert_eq!(resolve_messages(&m, None).unwrap().len(), 1);
    }

    #[test]
    fn cycle_is_an_error() {
        let m = mapping(json!({
            "a": { "message": msg("x", 1.0), "parent": "b", "children": ["b"] },
            "b": { "message": msg("y", 2.0), "parent": "a", "children": ["a"] }
        }));
        assert_eq!(resolve_path(&m, None), Err(TreeError::NoRoot));
        assert!(matches!(resolve_path(&m, Some("a")), Err(TreeError::Cycle(_))));
    }

    #[test]
    fn descent_cycle_is_an_error() {
        let m = mapping(json!({
            "r": { "parent": null, "children": ["a"] },
            "a": { "message": msg("x", 1.0), "parent": "r", "children": ["r"] }
        }));
        assert!(matches!(resolve_path(&m, None), Err(TreeError::Cycle(_))));
    }

    #[test]
    fn dangling_parent_is_an_error() {
        let m = mapping(json!({
            "r": { "parent": null, "children": [] },
            "a": { "message": msg("x", 1.0), "parent": "ghost", "children": [] }
        }));
        assert_eq!(
            resolve_path(&m, Some("a")),
            Err(TreeError::DanglingParent {
                node: "a".to_string(),
                parent: "ghost".to_string()
            })
        );
    }

    #[test]
    fn empty_mapping_is_an_error() {
        assert_eq!(resolve_path(&NodeMapping::new(), None), Err(TreeError::EmptyMapping));
    }

    #[test]
    fn missing_children_are_ignored() {
        let m = mapping(json!({
            "r": { "parent": null, "children": ["gone", "a"] },
            "a": { "message": msg("x", 1.0), "parent": "r", "children": ["also_gone"] }
        }));
        assert_eq!(resolve_path(&m, None).unwrap(), vec!["r", "a"]);
    }

    #[test]
    fn untimed_siblings_tie_break_on_position() {
        let m = mapping(json!({
            "r": { "parent": null, "children": ["x", "y"] },
            "x": { "message": { "content": { "parts": ["x"] } }, "parent": "r", "children": [] },
            "y": { "message": { "content": { "parts": ["y"] } }, "parent": "r", "children": [] }
        }));
        assert_eq!(resolve_path(&m, None).unwrap(), vec!["r", "y"]);
    }

    #[test]
    fn malformed_node_is_reported() {
        let raw = json!({ "r": { "parent": 7, "children": [] } });
        let err = parse_mapping(raw.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, TreeError::InvalidNode { .. }));
    }
}
