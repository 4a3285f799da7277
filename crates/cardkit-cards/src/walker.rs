//! Breadth-first card walker with inherited views
//!
//! Every nested mapping in a card (a spell inside a trigger, a sub-spell
//! inside a spell, a condition inside either) is visited once. Alongside
//! each node the walker carries its inherited view: the fields of all its
//! ancestors, closer ancestors winning, overridden by the node's own fields.
//! Merging is shallow. A nested mapping in a child replaces the inherited
//! one outright.
//!
//! Nodes are mappings reachable either directly under a key or as elements
//! of an array under a key. Scalars and arrays of scalars are leaves.

use cardkit_core::{CardDocument, NodePath, PathStep, node_at, node_at_mut};
use serde_json::Value;
use std::collections::VecDeque;

/// One visited mapping and its structural context
#[derive(Debug, Clone)]
pub struct TraversalNode<'a> {
    /// The mapping itself
    pub node: &'a CardDocument,
    /// The mapping that holds it, `None` at the root
    pub parent: Option<&'a CardDocument>,
    /// Key in `parent` it hangs under, `None` at the root
    pub key: Option<&'a str>,
    /// Ancestor fields overridden by this node's own fields
    pub inherited: CardDocument,
    /// Location from the root
    pub path: NodePath,
}

impl TraversalNode<'_> {
    /// Distance from the root; the root is at depth 0
    pub fn depth(&self) -> usize {
        self.path.depth()
    }
}

/// Copy `base` and overwrite it with the top-level fields of `own`
///
/// The view owns its values, so inherited nested subtrees are cloned for
/// every node. An array of N mappings under the root queues N views of about N fields
/// each, which is quadratic in memory until they are drained.
fn inherit(base: &CardDocument, own: &CardDocument) -> CardDocument {
    let mut view = base.clone();
    for (key, value) in own {
        view.insert(key.clone(), value.clone());
    }
    view
}

/// Child mappings of `node` in field order, with the key and step to each
fn children(node: &CardDocument) -> Vec<(&str, PathStep, &CardDocument)> {
    let mut found = Vec::new();
    for (key, value) in node {
        match value {
            Value::Object(child) => {
                found.push((key.as_str(), PathStep::Field(key.clone()), child));
            }
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    if let Value::Object(child) = item {
                        let step = PathStep::Element {
                            key: key.clone(),
                            index,
                        };
                        found.push((key.as_str(), step, child));
                    }
                }
            }
            _ => {}
        }
    }
    found
}

/// Lazy breadth-first iterator over the nodes of a card
#[derive(Debug)]
pub struct CardWalk<'a> {
    queue: VecDeque<TraversalNode<'a>>,
}

/// Walk `card` breadth-first, starting at the root
///
/// The root node's inherited view is the card itself. The card is never
/// modified.
pub fn walk_card(card: &CardDocument) -> CardWalk<'_> {
    let root = TraversalNode {
        node: card,
        parent: None,
        key: None,
        inherited: card.clone(),
        path: NodePath::root(),
    };
    CardWalk {
        queue: VecDeque::from([root]),
    }
}

impl<'a> Iterator for CardWalk<'a> {
    type Item = TraversalNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.queue.pop_front()?;

        for (key, step, child) in children(current.node) {
            self.queue.push_back(TraversalNode {
                node: child,
                parent: Some(current.node),
                key: Some(key),
                inherited: inherit(&current.inherited, child),
                path: current.path.join(step),
            });
        }

        Some(current)
    }
}

/// A node handed to the [`walk_card_mut`] callback
#[derive(Debug)]
pub struct NodeMut<'a> {
    /// The mapping, editable in place
    pub node: &'a mut CardDocument,
    /// Key in the parent it hangs under, `None` at the root
    pub key: Option<&'a str>,
    /// Inherited view as of the moment the node was reached
    pub inherited: &'a CardDocument,
    /// Location from the root
    pub path: &'a NodePath,
}

/// Walk `card` breadth-first, letting `visit` edit each node in place
///
/// A node's children are discovered after `visit` returns for it, so
/// anything the callback adds, removes, or rewrites beneath a node is what
/// the walk continues into. Children inherit from the node's fields as they
/// stand after the edit.
pub fn walk_card_mut<F>(card: &mut CardDocument, mut visit: F)
where
    F: FnMut(NodeMut<'_>),
{
    // Each entry holds the inherited view of the node's parent
    let mut queue = VecDeque::from([(NodePath::root(), CardDocument::new())]);

    while let Some((path, parent_view)) = queue.pop_front() {
        let Some(node) = node_at_mut(card, &path) else {
            continue;
        };

        let inherited = inherit(&parent_view, node);
        visit(NodeMut {
            node,
            key: path.last_key(),
            inherited: &inherited,
            path: &path,
        });

        let Some(node) = node_at(card, &path) else {
            continue;
        };
        let view = inherit(&parent_view, node);
        for (_, step, _) in children(node) {
            queue.push_back((path.join(step), view.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardkit_core::parse_document;
    use serde_json::json;

    fn doc(value: Value) -> CardDocument {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    fn keys(map: &CardDocument) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_simple_nested_walk() {
        let card = doc(json!({"a": 1, "nested": {"b": 2}}));
        let nodes: Vec<_> = walk_card(&card).collect();

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].inherited, card);
        assert!(nodes[0].parent.is_none());
        assert!(nodes[0].key.is_none());

        assert_eq!(nodes[1].key, Some("nested"));
        assert_eq!(nodes[1].parent, Some(&card));
        assert_eq!(nodes[1].inherited["a"], 1);
        assert_eq!(nodes[1].inherited["b"], 2);
        // The inherited "nested" field is still the parent's
        assert_eq!(nodes[1].inherited["nested"], json!({"b": 2}));
    }

    #[test]
    fn test_child_overrides_ancestors_shallowly() {
        let card = doc(json!({
            "target": "ENEMY_HERO",
            "value": 1,
            "options": {"deep": true},
            "spell": {
                "value": 3,
                "options": {"other": false},
                "subSpell": {"target": "SELF"}
            }
        }));

        let nodes: Vec<_> = walk_card(&card).collect();
        let sub = nodes
            .iter()
            .find(|n| n.key == Some("subSpell"))
            .unwrap();

        assert_eq!(sub.inherited["target"], "SELF");
        assert_eq!(sub.inherited["value"], 3);
        assert_eq!(sub.inherited["options"], json!({"other": false}));
        assert_eq!(sub.depth(), 2);
    }

    #[test]
    fn test_inherited_view_is_parent_view_plus_own_fields() {
        let card = parse_document(
            r#"{
                "name": "Ancient of War",
                "type": "MINION",
                "battlecry": {
                    "targetSelection": "NONE",
                    "spell": {"class": "BuffSpell", "value": 5},
                    "options": [
                        {"spell": {"class": "BuffSpell", "hpBonus": 5}, "description": "+5 Health"},
                        {"spell": {"class": "BuffSpell", "attackBonus": 5}},
                        "plain"
                    ]
                }
            }"#,
        )
        .unwrap();

        let nodes: Vec<_> = walk_card(&card).collect();
        for node in &nodes[1..] {
            let parent = nodes
                .iter()
                .find(|candidate| {
                    node.parent
                        .is_some_and(|p| std::ptr::eq(p, candidate.node))
                })
                .unwrap();

            for (key, value) in node.node {
                assert_eq!(&node.inherited[key], value);
            }
            for (key, value) in &parent.inherited {
                if !node.node.contains_key(key) {
                    assert_eq!(&node.inherited[key], value);
                }
            }
        }
    }

    #[test]
    fn test_breadth_first_order() {
        let card = doc(json!({
            "first": {"deep": {"deeper": {}}},
            "list": [{"x": 1}, 2, {"y": {"z": 3}}],
            "second": {}
        }));

        let nodes: Vec<_> = walk_card(&card).collect();
        let depths: Vec<usize> = nodes.iter().map(TraversalNode::depth).collect();
        assert_eq!(depths, vec![0, 1, 1, 1, 1, 2, 2, 3]);

        let paths: Vec<String> = nodes.iter().map(|n| n.path.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "",
                "/first",
                "/list/0",
                "/list/2",
                "/second",
                "/first/deep",
                "/list/2/y",
                "/first/deep/deeper",
            ]
        );
    }

    #[test]
    fn test_list_elements_share_parent_and_key() {
        let card = doc(json!({"trigger": [{"a": 1}, {"b": 2}]}));
        let nodes: Vec<_> = walk_card(&card).collect();

        assert_eq!(nodes.len(), 3);
        for node in &nodes[1..] {
            assert_eq!(node.key, Some("trigger"));
            assert_eq!(node.parent, Some(&card));
        }
        assert!(!nodes[1].inherited.contains_key("b"));
        assert!(!nodes[2].inherited.contains_key("a"));
    }

    #[test]
    fn test_scalars_are_leaves() {
        let card = doc(json!({"a": 1, "b": "two", "c": [1, 2, 3], "d": null, "e": [[{"x": 1}]]}));
        assert_eq!(walk_card(&card).count(), 1);
    }

    #[test]
    fn test_inherited_view_keeps_ancestor_key_order() {
        let card = doc(json!({"name": "X", "type": "SPELL", "spell": {"extra": 1, "type": "OVERRIDE"}}));
        let nodes: Vec<_> = walk_card(&card).collect();
        assert_eq!(keys(&nodes[1].inherited), vec!["name", "type", "spell", "extra"]);
        assert_eq!(nodes[1].inherited["type"], "OVERRIDE");
    }

    #[test]
    fn test_walk_does_not_modify_card() {
        let card = doc(json!({"a": {"b": {"c": 1}}}));
        let before = card.clone();
        for _ in walk_card(&card) {}
        assert_eq!(card, before);
    }

    #[test]
    fn test_walk_card_mut_edits_nodes() {
        let mut card = doc(json!({
            "type": "SPELL",
            "spell": {"class": "DamageSpell", "value": 2},
            "trigger": [{"spell": {"class": "DamageSpell"}}]
        }));

        let mut visited = Vec::new();
        walk_card_mut(&mut card, |mut node| {
            visited.push(node.path.to_string());
            if node.node.get("class").and_then(Value::as_str) == Some("DamageSpell") {
                node.node.insert("class".into(), json!("MissilesSpell"));
            }
        });

        assert_eq!(visited, vec!["", "/spell", "/trigger/0", "/trigger/0/spell"]);
        assert_eq!(card["spell"]["class"], "MissilesSpell");
        assert_eq!(card["trigger"][0]["spell"]["class"], "MissilesSpell");
    }

    #[test]
    fn test_walk_card_mut_descends_into_added_children() {
        let mut card = doc(json!({"spell": {"class": "MetaSpell"}}));

        let mut seen = Vec::new();
        walk_card_mut(&mut card, |mut node| {
            if node.key == Some("spell") {
                node.node.insert("spell1".into(), json!({"class": "DrawCardSpell"}));
                node.node.insert("tag".into(), json!("added"));
            }
            if node.key == Some("spell1") {
                seen.push(node.inherited.get("tag").cloned());
            }
        });

        assert_eq!(seen, vec![Some(json!("added"))]);
        assert_eq!(card["spell"]["spell1"]["class"], "DrawCardSpell");
    }

    #[test]
    fn test_walk_card_mut_root_view_is_card() {
        let mut card = doc(json!({"a": 1, "b": {"c": 2}}));
        let snapshot = card.clone();
        let mut root_view = None;
        walk_card_mut(&mut card, |node| {
            if node.path.is_root() {
                root_view = Some(node.inherited.clone());
            }
        });
        assert_eq!(root_view, Some(snapshot));
    }
}
