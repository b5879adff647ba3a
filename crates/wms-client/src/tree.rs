//! Advertised layer hierarchy and name lookup.

use serde::{Deserialize, Serialize};

use harvest_common::{BoundingBox, CrsCode};

/// One node of a service's advertised layer hierarchy.
///
/// A node with no children is a data layer, requestable in GetMap. A node
/// with children is a grouping folder; folders organize the catalog but are
/// not themselves requested.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDescription {
    /// Machine name used in GetMap LAYERS. May be empty on folder nodes.
    pub name: String,

    /// Human-readable title.
    pub title: String,

    /// CRS codes advertised on this node.
    pub crs: Vec<CrsCode>,

    /// Advertised geographic extent, if present.
    pub bbox: Option<BoundingBox>,

    /// Whether the layer answers GetFeatureInfo.
    pub queryable: bool,

    /// Child nodes, in document order.
    pub children: Vec<ServiceDescription>,
}

impl ServiceDescription {
    /// True if this node is a data layer rather than a grouping folder.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// All data layers under this node, in depth-first document order.
    pub fn leaves(&self) -> Vec<&ServiceDescription> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(node: &'a ServiceDescription, out: &mut Vec<&'a ServiceDescription>) {
    for child in &node.children {
        if child.is_leaf() {
            out.push(child);
        } else {
            collect_leaves(child, out);
        }
    }
}

/// Find the first data layer named `layer_name` beneath `node`.
///
/// The walk is depth-first over children in document order. Only leaf nodes
/// are compared: a folder whose own name equals the target is traversed
/// into, never returned. Names match by exact string equality. A miss is a
/// normal outcome and returns `None`.
pub fn find_layer<'a>(
    node: &'a ServiceDescription,
    layer_name: &str,
) -> Option<&'a ServiceDescription> {
    let mut layer = None;
    for child in &node.children {
        if child.is_leaf() {
            if child.name == layer_name {
                return Some(child);
            }
            continue;
        }
        layer = find_layer(child, layer_name);
        if layer.is_some() {
            break;
        }
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str) -> ServiceDescription {
        ServiceDescription {
            name: name.to_string(),
            title: name.to_string(),
            ..Default::default()
        }
    }

    fn folder(name: &str, children: Vec<ServiceDescription>) -> ServiceDescription {
        ServiceDescription {
            name: name.to_string(),
            title: name.to_string(),
            children,
            ..Default::default()
        }
    }

    /// Tree used by several cases below:
    /// Root -> [ Folder "A" -> [ Leaf "X", Leaf "Y" ], Leaf "X" ]
    fn sample_tree() -> ServiceDescription {
        folder(
            "Root",
            vec![folder("A", vec![leaf("X"), leaf("Y")]), leaf("X")],
        )
    }

    #[test]
    fn finds_first_leaf_in_depth_first_order() {
        let root = sample_tree();
        let hit = find_layer(&root, "X").unwrap();
        // The leaf under folder "A" comes first in the walk, not the
        // top-level leaf with the same name.
        assert_eq!(hit.name, "X");
        assert!(std::ptr::eq(hit, &root.children[0].children[0]));
    }

    #[test]
    fn missing_name_is_none() {
        let root = sample_tree();
        assert!(find_layer(&root, "Z").is_none());
    }

    #[test]
    fn folder_names_never_match() {
        // "A" exists only as a folder; no leaf carries the name.
        let root = sample_tree();
        assert!(find_layer(&root, "A").is_none());

        let deep = folder("Root", vec![folder("Roads", vec![leaf("Roads_1")])]);
        assert!(find_layer(&deep, "Roads").is_none());
    }

    #[test]
    fn childless_root_is_none() {
        let root = leaf("only");
        assert!(find_layer(&root, "missing").is_none());
    }

    #[test]
    fn match_is_exact() {
        let root = folder("Root", vec![leaf("roads"), leaf("Roads ")]);
        assert!(find_layer(&root, "Roads").is_none());
        assert!(find_layer(&root, "roads").is_some());
    }

    #[test]
    fn deep_nesting_resolves() {
        let mut node = leaf("target");
        for i in 0..40 {
            node = folder(&format!("level{}", i), vec![node]);
        }
        assert_eq!(find_layer(&node, "target").unwrap().name, "target");
    }

    #[test]
    fn later_sibling_subtree_is_searched() {
        let root = folder(
            "Root",
            vec![
                folder("empty", vec![leaf("other")]),
                folder("B", vec![folder("C", vec![leaf("wanted")])]),
            ],
        );
        assert_eq!(find_layer(&root, "wanted").unwrap().name, "wanted");
    }

    #[test]
    fn leaves_walk_is_depth_first() {
        let root = sample_tree();
        let names: Vec<&str> = root.leaves().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y", "X"]);
    }
}
