//! Owned DOM arena for the editing surface.
//!
//! Nodes live in a flat `Vec` and are addressed by [`NodeId`]. Removing a
//! node only detaches it from its parent; the slot stays allocated so ids held
//! by callers never dangle during a tree walk. [`DomTree::compact`] reclaims
//! detached slots once no walk is in progress.

mod metrics;
mod serialize;
pub mod tags;

pub use metrics::TextMetrics;

/// ID used to address nodes in the DOM arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The container every tree is created with.
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

/// Element payload: lowercase tag name and attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed node tree rooted at [`NodeId::ROOT`].
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Creates a tree whose root is an element named `root_tag`.
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(ElementData::new(root_tag)),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of allocated slots, attached or not.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData::new(tag)))
    }

    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: Vec<(String, String)>) -> NodeId {
        let mut data = ElementData::new(tag);
        data.attrs = attrs;
        self.push(NodeKind::Element(data))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Element(data)) => Some(data),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let Some(node) = self.node_mut(id) {
            if let NodeKind::Text(text) = &mut node.kind {
                *text = value.into();
            }
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Text(_)))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|data| data.tag.as_str())
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|child| *child == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    /// True when `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == NodeId::ROOT {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Detaches `id` from its parent. Its own subtree stays intact.
    pub fn remove(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Inserts `child` under `parent` ahead of `reference`, or at the end when
    /// `reference` is `None` or not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if child == NodeId::ROOT || child == parent || self.is_ancestor(child, parent) {
            return;
        }
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }

        self.remove(child);
        let position = reference.and_then(|reference| {
            self.children(parent)
                .iter()
                .position(|existing| *existing == reference)
        });

        if let Some(parent_node) = self.node_mut(parent) {
            match position {
                Some(index) => parent_node.children.insert(index, child),
                None => parent_node.children.push(child),
            }
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Inserts `child` right after `reference` within the reference's parent.
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        let next = self.next_sibling(reference);
        self.insert_before(parent, child, next);
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|data| data.attr(name))
    }

    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        self.element(id)
            .map(|data| data.attrs.iter().map(|(key, _)| key.clone()).collect())
            .unwrap_or_default()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(data) = self.element_mut(id) else {
            return;
        };
        if let Some(slot) = data
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            slot.1 = value.to_owned();
            return;
        }
        data.attrs
            .push((name.to_ascii_lowercase(), value.to_owned()));
    }

    /// Keeps only the attributes `keep` accepts; returns how many were dropped.
    pub fn retain_attributes(
        &mut self,
        id: NodeId,
        mut keep: impl FnMut(&str, &str) -> bool,
    ) -> usize {
        let Some(data) = self.element_mut(id) else {
            return 0;
        };
        let before = data.attrs.len();
        data.attrs.retain(|(name, value)| keep(name, value));
        before - data.attrs.len()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attribute(id, "class")
            .is_some_and(|value| value.split_ascii_whitespace().any(|item| item == class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let next = match self.attribute(id, "class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_owned(),
        };
        self.set_attribute(id, "class", &next);
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub fn descendant_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|node| self.is_element(*node))
            .collect()
    }

    /// Nearest ancestor-or-self element matching `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&DomTree, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.is_element(node) && predicate(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_owned();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// True when the element carries `contenteditable="false"` itself.
    pub fn is_explicitly_non_editable(&self, id: NodeId) -> bool {
        self.attribute(id, "contenteditable")
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("false"))
    }

    /// Inherited editability: the nearest element with a `contenteditable`
    /// attribute decides, and everything defaults to editable.
    pub fn is_content_editable(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(value) = self.attribute(node, "contenteditable") {
                return !value.trim().eq_ignore_ascii_case("false");
            }
            current = self.parent(node);
        }
        true
    }

    /// Deep-copies `source_id` (and its subtree) from `source` into this tree.
    /// The copy is created detached.
    pub fn import_subtree(&mut self, source: &DomTree, source_id: NodeId) -> Option<NodeId> {
        let kind = source.kind(source_id)?.clone();
        let copy = self.push(kind);
        for child in source.children(source_id) {
            if let Some(child_copy) = self.import_subtree(source, *child) {
                self.append_child(copy, child_copy);
            }
        }
        Some(copy)
    }

    /// Drops every slot that is not reachable from the root and renumbers the
    /// rest in document order. Returns the new id of each old slot, or `None`
    /// for the dropped ones. Every id held before the call must be remapped.
    pub fn compact(&mut self) -> Vec<Option<NodeId>> {
        let order: Vec<NodeId> = std::iter::once(NodeId::ROOT)
            .chain(self.descendants(NodeId::ROOT))
            .collect();
        let mut remap = vec![None; self.nodes.len()];
        for (new, old) in order.iter().enumerate() {
            if let Some(slot) = remap.get_mut(old.0) {
                *slot = Some(NodeId(new));
            }
        }

        let mut slots: Vec<Option<Node>> = std::mem::take(&mut self.nodes)
            .into_iter()
            .map(Some)
            .collect();
        self.nodes = order
            .iter()
            .filter_map(|old| slots.get_mut(old.0).and_then(Option::take))
            .map(|mut node| {
                node.parent = node.parent.and_then(|parent| remap[parent.0]);
                node.children = node
                    .children
                    .iter()
                    .filter_map(|child| remap[child.0])
                    .collect();
                node
            })
            .collect();
        remap
    }

    pub fn metrics(&self) -> TextMetrics {
        TextMetrics::measure(self)
    }
}
