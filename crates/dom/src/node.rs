use serde::Serialize;

/// Stable handle into a [`Document`](crate::Document) arena.
///
/// Handles stay valid for the lifetime of the document: detaching a subtree
/// tombstones its nodes instead of reusing slots, so a stale handle held
/// across mutations reports `is_attached == false` rather than aliasing an
/// unrelated node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[must_use]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    /// Lowercased at construction; HTML tag names are case-insensitive.
    pub tag: String,
    /// Insertion-ordered; last write wins on duplicate names.
    pub attributes: Vec<(String, String)>,
    /// Split from the `class` attribute, kept in sync on writes.
    pub classes: Vec<String>,
}

impl ElementData {
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) {
        if name == "class" {
            self.classes = split_classes(value);
        }
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.to_string();
        } else {
            self.attributes.push((name.to_string(), value.to_string()));
        }
    }

    pub(crate) fn remove_attribute(&mut self, name: &str) {
        if name == "class" {
            self.classes.clear();
        }
        self.attributes.retain(|(n, _)| n != name);
    }

    pub(crate) fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

pub(crate) fn split_classes(value: &str) -> Vec<String> {
    value
        .split_ascii_whitespace()
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attached: bool,
}

impl Node {
    pub(crate) fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }
}

/// Builder for a new element, used with [`Document::append_element`].
///
/// Mirrors the attribute surface a page author controls: tag, id, classes,
/// arbitrary attributes.
///
/// ```
/// use pagemark_dom::{Document, DocumentQuery, ElementInit};
///
/// let mut doc = Document::new();
/// let root = doc.root();
/// let hero = doc.append_element(root, ElementInit::new("div").id("hero").class("banner wide"));
/// assert_eq!(doc.element_id(hero), Some("hero"));
/// ```
#[derive(Debug, Clone)]
pub struct ElementInit {
    pub(crate) tag: String,
    pub(crate) attributes: Vec<(String, String)>,
}

impl ElementInit {
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    #[must_use]
    pub fn class(self, classes: &str) -> Self {
        self.attr("class", classes)
    }

    pub(crate) fn into_data(self) -> ElementData {
        let mut data = ElementData {
            tag: self.tag,
            attributes: Vec::new(),
            classes: Vec::new(),
        };
        for (name, value) in self.attributes {
            data.set_attribute(&name, &value);
        }
        data
    }
}
