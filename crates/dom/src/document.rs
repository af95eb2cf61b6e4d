use crate::node::{ElementInit, Node, NodeData, NodeId};
use crate::provider::DocumentQuery;
use crate::query::{self, SelectorList};
use crate::Result;

/// Arena-backed document tree: the reference implementation of the
/// [`DocumentQuery`] contract.
///
/// Nodes are owned by the arena and addressed through [`NodeId`] handles.
/// Detaching a subtree tombstones its nodes (handles stay valid, attachment
/// checks turn false) — callers holding a handle across mutations never
/// dangle, they just observe the node leaving the page, which is exactly the
/// situation anchor reconciliation has to detect.
///
/// Handles are `u32`, so a document holds at most `u32::MAX` nodes over its
/// lifetime (tombstones included); appending past that panics.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    revision: u64,
}

impl Document {
    /// Create a document holding a single root `html` element.
    #[must_use]
    pub fn new() -> Self {
        let root_node = Node {
            data: NodeData::Element(ElementInit::new("html").into_data()),
            parent: None,
            children: Vec::new(),
            attached: true,
        };
        Self {
            nodes: vec![root_node],
            root: NodeId(0),
            revision: 0,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Monotonic mutation counter. A change-feed host can snapshot this to
    /// skip batches in which nothing actually changed.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn append_element(&mut self, parent: NodeId, init: ElementInit) -> NodeId {
        let data = NodeData::Element(init.into_data());
        self.append_node(parent, data)
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append_node(parent, NodeData::Text(text.to_string()))
    }

    fn append_node(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(
            self.node(parent).element().is_some(),
            "append target must be an element"
        );
        let id = NodeId(u32::try_from(self.nodes.len()).expect("node arena overflow"));
        let attached = self.node(parent).attached;
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
            attached,
        });
        self.nodes[parent.index()].children.push(id);
        self.revision += 1;
        id
    }

    /// Detach `node` and its subtree. The root cannot be detached. Handles
    /// into the subtree stay valid and report `is_attached == false`.
    pub fn remove_node(&mut self, node: NodeId) {
        if node == self.root {
            log::warn!("ignoring attempt to detach the document root");
            return;
        }
        if let Some(parent) = self.node(node).parent {
            self.nodes[parent.index()].children.retain(|c| *c != node);
        }
        self.nodes[node.index()].parent = None;
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            self.nodes[current.index()].attached = false;
            stack.extend(self.nodes[current.index()].children.iter().copied());
        }
        self.revision += 1;
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        if let Some(el) = self.nodes[node.index()].element_mut() {
            el.set_attribute(&name, value);
            self.revision += 1;
        }
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        if let Some(el) = self.nodes[node.index()].element_mut() {
            el.remove_attribute(&name);
            self.revision += 1;
        }
    }

    /// Replace an element's children with a single text node (the
    /// `textContent` setter), or rewrite a text node in place.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        match &mut self.nodes[node.index()].data {
            NodeData::Text(existing) => {
                *existing = text.to_string();
                self.revision += 1;
            }
            NodeData::Element(_) => {
                let children: Vec<NodeId> = self.nodes[node.index()].children.clone();
                for child in children {
                    self.remove_node(child);
                }
                self.append_text(node, text);
            }
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[must_use]
    pub fn is_element(&self, node: NodeId) -> bool {
        self.node(node).element().is_some()
    }

    /// 1-based position among the parent's element children, as
    /// `:nth-child` counts it. `None` for the root and for text nodes.
    #[must_use]
    pub fn nth_child_index(&self, node: NodeId) -> Option<u32> {
        let parent = self.node(node).parent?;
        let mut index = 0u32;
        for child in &self.node(parent).children {
            if self.node(*child).element().is_some() {
                index += 1;
                if *child == node {
                    return Some(index);
                }
            }
        }
        None
    }

    /// 1-based position among same-tag element siblings (`:nth-of-type`).
    #[must_use]
    pub fn nth_of_type_index(&self, node: NodeId) -> Option<u32> {
        let tag = self.node(node).element()?.tag.clone();
        let parent = self.node(node).parent?;
        let mut index = 0u32;
        for child in &self.node(parent).children {
            if let Some(el) = self.node(*child).element() {
                if el.tag == tag {
                    index += 1;
                    if *child == node {
                        return Some(index);
                    }
                }
            }
        }
        None
    }

    fn for_each_element(&self, mut f: impl FnMut(NodeId)) {
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            if self.node(current).element().is_some() {
                f(current);
            }
            // Reverse push keeps the traversal in document order.
            for child in self.node(current).children.iter().rev() {
                stack.push(*child);
            }
        }
    }

    pub(crate) fn matching_elements(&self, list: &SelectorList) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_element(|id| {
            if query::matches(self, id, list) {
                out.push(id);
            }
        });
        out
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentQuery for Document {
    fn all_elements(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.for_each_element(|id| out.push(id));
        out
    }

    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        let mut out = Vec::new();
        self.for_each_element(|id| {
            if self.node(id).element().is_some_and(|el| el.tag == tag) {
                out.push(id);
            }
        });
        out
    }

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let list = query::parse_selector_list(selector)?;
        Ok(self.matching_elements(&list))
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.node(node).element().map(|el| el.tag.as_str())
    }

    fn element_id(&self, node: NodeId) -> Option<&str> {
        self.node(node).element().and_then(|el| el.attribute("id"))
    }

    fn classes(&self, node: NodeId) -> Vec<&str> {
        self.node(node)
            .element()
            .map(|el| el.classes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.node(node).element().and_then(|el| el.attribute(&name))
    }

    fn attributes(&self, node: NodeId) -> Vec<(&str, &str)> {
        self.node(node)
            .element()
            .map(|el| {
                el.attributes
                    .iter()
                    .map(|(n, v)| (n.as_str(), v.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            match &self.node(current).data {
                NodeData::Text(text) => out.push_str(text),
                NodeData::Element(_) => {
                    for child in self.node(current).children.iter().rev() {
                        stack.push(*child);
                    }
                }
            }
        }
        out
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .children
            .iter()
            .copied()
            .filter(|c| self.node(*c).element().is_some())
            .collect()
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.node(node).attached
    }
}
