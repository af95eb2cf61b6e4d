use crate::node::NodeId;
use crate::Result;

/// Read-side contract a host page exposes to the anchoring engine.
///
/// [`crate::Document`] is the in-tree implementation; an embedder wrapping a
/// real browser DOM implements the same trait. Two guarantees matter to
/// callers and must hold for every implementation:
///
/// * `all_elements`, `elements_by_tag` and `query_selector_all` return
///   elements in document order (preorder). Resolution breaks score ties by
///   position in these lists, so order is part of the contract.
/// * `query_selector_all` reports malformed selector syntax as
///   [`crate::QueryError::Syntax`] instead of panicking. Selector validation
///   leans on that signal.
pub trait DocumentQuery {
    /// Every attached element, in document order.
    fn all_elements(&self) -> Vec<NodeId>;

    /// Attached elements with the given tag name (matched case-insensitively),
    /// in document order.
    fn elements_by_tag(&self, tag: &str) -> Vec<NodeId>;

    /// Attached elements matching a selector, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>>;

    /// How many attached elements match. The default just counts the match
    /// list; hosts with a cheaper path may override.
    fn count_matches(&self, selector: &str) -> Result<usize> {
        Ok(self.query_selector_all(selector)?.len())
    }

    /// Lowercased tag name, or `None` for text nodes.
    fn tag_name(&self, node: NodeId) -> Option<&str>;

    /// Value of the `id` attribute, if present.
    fn element_id(&self, node: NodeId) -> Option<&str>;

    /// Class tokens in attribute order. Empty for text nodes.
    fn classes(&self, node: NodeId) -> Vec<&str>;

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;

    /// All attributes as `(name, value)` pairs in insertion order.
    fn attributes(&self, node: NodeId) -> Vec<(&str, &str)>;

    /// Concatenated text of the node and its descendants, untrimmed.
    fn text_content(&self, node: NodeId) -> String;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Child nodes filtered to elements, in document order.
    fn element_children(&self, node: NodeId) -> Vec<NodeId>;

    /// False once the node (or an ancestor) has been detached from the tree.
    fn is_attached(&self, node: NodeId) -> bool;
}
