use std::collections::HashSet;

/// Index of a node inside a [`Document`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered attribute list. Names are unique; insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attributes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|attr| attr.name == name)
    }

    /// Set a value, replacing in place if the name already exists
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.0.push(Attribute { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|attr| attr.name == name)?;
        Some(self.0.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name
    pub tag: String,
    pub attributes: Attributes,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Attributes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a parsed document or fragment
    Document,
    Element(Element),
    Text(String),
    Comment(String),
    /// Markup declaration such as `<!DOCTYPE html>`, stored without `<!` and `>`
    Doctype(String),
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Node this one was copied from by [`Document::extract`]
    origin: Option<NodeId>,
    /// Pass number that generated this node (0 for parsed input)
    stamp: u32,
}

impl NodeData {
    fn new(kind: NodeKind, stamp: u32) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            origin: None,
            stamp,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn origin(&self) -> Option<NodeId> {
        self.origin
    }

    pub fn stamp(&self) -> u32 {
        self.stamp
    }

    pub fn as_element(&self) -> Option<&Element> {
        match &self.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }
}

/// Arena-backed markup tree.
///
/// Every node is owned by the arena; tree structure is expressed through
/// child lists and non-owning parent links. Detached nodes remain in the
/// arena but are unreachable from the root, so a `NodeId` never dangles.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
    passes: u32,
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(NodeKind::Document, 0)],
            root: NodeId(0),
            passes: 0,
        }
    }

    /// Single-node fragment rooted at a node of the given kind
    pub fn from_root(kind: NodeKind) -> Self {
        Self {
            nodes: vec![NodeData::new(kind, 0)],
            root: NodeId(0),
            passes: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Start a new pass and return its stamp. Stamps are unique within one
    /// document no matter how many merges it goes through.
    pub fn next_pass(&mut self) -> u32 {
        self.passes += 1;
        self.passes
    }

    /// Number of passes run over this document
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn stamp(&self, id: NodeId) -> u32 {
        self.nodes[id.0].stamp
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.nodes[id.0].as_element()
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attributes.get(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element_mut(id) {
            element.attributes.set(name, value);
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)
            .and_then(|element| element.attributes.remove(name))
    }

    /// Allocate an unattached node
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        self.create_stamped(kind, 0)
    }

    pub fn create_stamped(&mut self, kind: NodeKind, stamp: u32) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData::new(kind, stamp));
        id
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.create(NodeKind::Element(Element::new(tag.to_ascii_lowercase())))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.create(NodeKind::Text(text.to_string()))
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Unlink a node from its parent. Nodes without a parent (including
    /// the root) are left as they are.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
    }

    /// Put `replacement` at the position `target` occupies and detach `target`
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) {
        if target == replacement {
            return;
        }
        let Some(parent) = self.nodes[target.0].parent else {
            return;
        };
        self.detach(replacement);
        let children = &mut self.nodes[parent.0].children;
        if let Some(slot) = children.iter_mut().find(|child| **child == target) {
            *slot = replacement;
        }
        self.nodes[replacement.0].parent = Some(parent);
        self.nodes[target.0].parent = None;
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Whether the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// `id` and all of its descendants in document order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.nodes[current.0].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Attached elements carrying any of `names`, in document order
    pub fn query_attribute(&self, names: &[&str]) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| match self.element(id) {
                Some(element) => names.iter().any(|name| element.attributes.contains(name)),
                None => false,
            })
            .collect()
    }

    /// Attached elements with the given tag, in document order
    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.tag(id) == Some(tag))
            .collect()
    }

    /// First attached element whose `id` attribute equals `value`
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.attribute(id, "id") == Some(value))
    }

    /// Child nodes of `id` that are elements
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.nodes[child.0].is_element())
            .collect()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match &self.nodes[node.0].kind {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Deep copy of the subtree at `id` as a standalone fragment whose root
    /// is the copied node. Every copied node remembers where it came from,
    /// which [`Document::graft`] uses to keep identities stable.
    pub fn extract(&self, id: NodeId) -> Document {
        let mut fragment = Document {
            nodes: Vec::new(),
            root: NodeId(0),
            passes: 0,
        };
        fragment.root = fragment.copy_from(self, id, true);
        fragment
    }

    /// Copy the subtree at `source_id` of `source` into this arena, returning
    /// the unattached copy. Copies are stamped with `stamp`.
    pub fn import(&mut self, source: &Document, source_id: NodeId, stamp: u32) -> NodeId {
        let id = self.copy_from(source, source_id, false);
        for node in self.descendants(id) {
            self.nodes[node.0].stamp = stamp;
        }
        id
    }

    /// Append copies of all children of `source`'s root under `parent`
    pub fn append_fragment(&mut self, parent: NodeId, source: &Document, stamp: u32) {
        for &child in source.children(source.root) {
            let copy = self.import(source, child, stamp);
            self.append_child(parent, copy);
        }
    }

    /// Replace the children of `parent` with copies of `source`'s top-level nodes
    pub fn replace_children(&mut self, parent: NodeId, source: &Document, stamp: u32) {
        self.clear_children(parent);
        self.append_fragment(parent, source, stamp);
    }

    fn copy_from(&mut self, source: &Document, source_id: NodeId, keep_origin: bool) -> NodeId {
        let data = source.get(source_id);
        let mut copy = NodeData::new(data.kind.clone(), data.stamp);
        if keep_origin {
            copy.origin = Some(source_id);
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(copy);
        for &child in data.children() {
            let child_copy = self.copy_from(source, child, keep_origin);
            self.nodes[child_copy.0].parent = Some(id);
            self.nodes[id.0].children.push(child_copy);
        }
        id
    }

    /// Splice a fragment previously obtained from [`Document::extract`] in
    /// place of `target`.
    ///
    /// Fragment nodes that originate from `target`'s subtree reuse their
    /// original ids, so surviving nodes keep their identity; all other
    /// fragment nodes are allocated fresh. Nodes of the old subtree that do
    /// not appear in the fragment end up detached. Returns the id now
    /// standing where `target` was.
    pub fn graft(&mut self, target: NodeId, fragment: &Document) -> NodeId {
        let reusable: HashSet<NodeId> = self.descendants(target).into_iter().collect();
        let mut claimed = HashSet::new();
        let new_root = self.adopt(fragment, fragment.root, &reusable, &mut claimed);
        if new_root != target {
            self.replace(target, new_root);
        }
        new_root
    }

    fn adopt(
        &mut self,
        fragment: &Document,
        fragment_id: NodeId,
        reusable: &HashSet<NodeId>,
        claimed: &mut HashSet<NodeId>,
    ) -> NodeId {
        let data = fragment.get(fragment_id);
        let id = match data.origin {
            Some(origin) if reusable.contains(&origin) && claimed.insert(origin) => {
                self.nodes[origin.0].kind = data.kind.clone();
                self.nodes[origin.0].stamp = data.stamp;
                self.clear_children(origin);
                origin
            }
            _ => self.create_stamped(data.kind.clone(), data.stamp),
        };
        for &child in data.children() {
            let adopted = self.adopt(fragment, child, reusable, claimed);
            self.append_child(id, adopted);
        }
        id
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
