//! # Document Nodes
//!
//! A node is either an element with ordered children or a text leaf.
//! The wire form is a plain attribute map: elements carry a `children`
//! array, leaves carry a `text` string, and every other key is a
//! non-structural attribute (`type`, `isBold`, `backgroundColor`, ...).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const CHILDREN_KEY: &str = "children";
pub const TEXT_KEY: &str = "text";

pub const BOLD_MARK: &str = "isBold";
pub const ITALIC_MARK: &str = "isItalic";
pub const STRIKETHROUGH_MARK: &str = "isStrikethrough";
pub const BACKGROUND_COLOR_MARK: &str = "backgroundColor";

pub type Attributes = Map<String, Value>;

/// Tree element. Children are owned exclusively by their element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum Node {
    Element {
        children: Vec<Node>,
        attributes: Attributes,
    },
    Text {
        text: String,
        attributes: Attributes,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid node: {0}")]
pub struct InvalidNode(pub String);

/// Formatting marks carried by a text leaf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextMarks {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub background_color: Option<String>,
}

impl Node {
    pub fn element(children: Vec<Node>) -> Self {
        Node::Element {
            children,
            attributes: Attributes::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text {
            text: text.into(),
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter. Reserved keys are ignored.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if !is_reserved(&key) {
            self.attributes_mut().insert(key, value.into());
        }
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text { .. })
    }

    pub fn is_element(&self) -> bool {
        matches!(self, Node::Element { .. })
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Element { children, .. } => Some(children),
            Node::Text { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element { children, .. } => Some(children),
            Node::Text { .. } => None,
        }
    }

    pub fn text_content(&self) -> Option<&str> {
        match self {
            Node::Text { text, .. } => Some(text),
            Node::Element { .. } => None,
        }
    }

    pub fn attributes(&self) -> &Attributes {
        match self {
            Node::Element { attributes, .. } | Node::Text { attributes, .. } => attributes,
        }
    }

    pub fn attributes_mut(&mut self) -> &mut Attributes {
        match self {
            Node::Element { attributes, .. } | Node::Text { attributes, .. } => attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes().get(key)
    }

    /// Formatting marks of a leaf; `None` for elements.
    pub fn marks(&self) -> Option<TextMarks> {
        let Node::Text { attributes, .. } = self else {
            return None;
        };
        let flag = |key: &str| attributes.get(key).and_then(Value::as_bool).unwrap_or(false);

        Some(TextMarks {
            bold: flag(BOLD_MARK),
            italic: flag(ITALIC_MARK),
            strikethrough: flag(STRIKETHROUGH_MARK),
            background_color: attributes
                .get(BACKGROUND_COLOR_MARK)
                .and_then(Value::as_str)
                .filter(|color| !color.is_empty())
                .map(str::to_string),
        })
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text { text, .. } => text.clone(),
            Node::Element { children, .. } => children.iter().map(Node::plain_text).collect(),
        }
    }
}

pub(crate) fn is_reserved(key: &str) -> bool {
    key == CHILDREN_KEY || key == TEXT_KEY
}

impl TryFrom<Value> for Node {
    type Error = InvalidNode;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(InvalidNode(format!("expected an object, got {other}"))),
        };

        match (map.remove(CHILDREN_KEY), map.remove(TEXT_KEY)) {
            (Some(_), Some(_)) => Err(InvalidNode(
                "node cannot have both children and text".to_string(),
            )),
            (Some(Value::Array(items)), None) => {
                let children = items
                    .into_iter()
                    .map(Node::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Node::Element {
                    children,
                    attributes: map,
                })
            }
            (None, Some(Value::String(text))) => Ok(Node::Text {
                text,
                attributes: map,
            }),
            (Some(other), None) => Err(InvalidNode(format!("children must be an array, got {other}"))),
            (None, Some(other)) => Err(InvalidNode(format!("text must be a string, got {other}"))),
            (None, None) => Err(InvalidNode("node has neither children nor text".to_string())),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        let (mut map, key, content) = match node {
            Node::Element {
                children,
                attributes,
            } => (
                attributes,
                CHILDREN_KEY,
                Value::Array(children.into_iter().map(Value::from).collect()),
            ),
            Node::Text { text, attributes } => (attributes, TEXT_KEY, Value::String(text)),
        };
        map.insert(key.to_string(), content);
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_element_and_leaf() {
        let node: Node = serde_json::from_value(json!({
            "type": "paragraph",
            "children": [{ "text": "hi", "isBold": true }]
        }))
        .unwrap();

        assert!(node.is_element());
        assert_eq!(node.attribute("type"), Some(&json!("paragraph")));

        let leaf = &node.children().unwrap()[0];
        assert_eq!(leaf.text_content(), Some("hi"));
        assert!(leaf.marks().unwrap().bold);
        assert!(!leaf.marks().unwrap().italic);
    }

    #[test]
    fn test_rejects_text_and_children() {
        let result: Result<Node, _> =
            serde_json::from_value(json!({ "text": "a", "children": [] }));
        assert!(result.is_err());

        let result: Result<Node, _> = serde_json::from_value(json!({ "type": "void" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_serializes_back_to_attribute_map() {
        let node = Node::element(vec![Node::text("a").with_attribute(BACKGROUND_COLOR_MARK, "red")])
            .with_attribute("type", "paragraph");

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "paragraph",
                "children": [{ "text": "a", "backgroundColor": "red" }]
            })
        );
    }

    #[test]
    fn test_with_attribute_ignores_reserved_keys() {
        let node = Node::text("a").with_attribute(TEXT_KEY, "b");
        assert_eq!(node.text_content(), Some("a"));
        assert!(node.attributes().is_empty());
    }

    #[test]
    fn test_plain_text() {
        let node = Node::element(vec![
            Node::element(vec![Node::text("ab"), Node::text("c")]),
            Node::text("d"),
        ]);
        assert_eq!(node.plain_text(), "abcd");
    }
}
