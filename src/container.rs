//! Container tree arena and structural operations.
//!
//! Threads are forests of [`Container`] nodes. Each container wraps zero or
//! one [`Message`] (zero for "dummy" placeholders standing in for ids that
//! were referenced but never seen) plus an ordered list of children. Nodes
//! live in an arena owned by a [`Forest`] and are addressed by copyable
//! [`ContainerId`] handles; parent links are plain back-references, so no
//! reference-counted cycles are possible.
//!
//! All traversals that scale with thread depth use explicit work stacks
//! rather than native recursion, so near-linear reply chains of arbitrary
//! length are safe.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Handle addressing a [`Container`] within its [`Forest`].
///
/// Handles are only meaningful for the forest that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContainerId(usize);

/// A tree node wrapping zero-or-one message plus its ordered children.
#[derive(Debug, Clone)]
pub struct Container<P = ()> {
    message: Option<Message<P>>,
    parent: Option<ContainerId>,
    children: Vec<ContainerId>,
}

impl<P> Container<P> {
    /// Get the message held by this container, if any.
    pub fn message(&self) -> Option<&Message<P>> {
        self.message.as_ref()
    }

    /// Check if this is a dummy container (referenced but never seen).
    pub fn is_dummy(&self) -> bool {
        self.message.is_none()
    }

    /// Get the parent container, if any.
    pub fn parent(&self) -> Option<ContainerId> {
        self.parent
    }

    /// Get the ordered children of this container.
    pub fn children(&self) -> &[ContainerId] {
        &self.children
    }
}

/// A forest of containers: the arena plus the ordered root set.
///
/// This is the output of [`thread`](crate::thread). Roots are containers
/// with no parent; every structural operation goes through the forest so
/// that the attach/detach pairing invariant holds at all times.
#[derive(Debug, Clone)]
pub struct Forest<P = ()> {
    nodes: Vec<Container<P>>,
    roots: Vec<ContainerId>,
}

impl<P> Default for Forest<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Forest<P> {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    fn node(&self, id: ContainerId) -> &Container<P> {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: ContainerId) -> &mut Container<P> {
        &mut self.nodes[id.0]
    }

    // === Allocation and access ===

    /// Allocate a new empty (dummy) container.
    pub fn alloc(&mut self) -> ContainerId {
        let id = ContainerId(self.nodes.len());
        self.nodes.push(Container {
            message: None,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a container holding the given message.
    pub fn alloc_with(&mut self, message: Message<P>) -> ContainerId {
        let id = self.alloc();
        self.node_mut(id).message = Some(message);
        id
    }

    /// Get a container by handle.
    pub fn container(&self, id: ContainerId) -> &Container<P> {
        self.node(id)
    }

    /// Get the message held by a container, if any.
    pub fn message(&self, id: ContainerId) -> Option<&Message<P>> {
        self.node(id).message.as_ref()
    }

    /// Store a message in a container, replacing any previous one.
    ///
    /// Existing parent/child links are not disturbed.
    pub fn set_message(&mut self, id: ContainerId, message: Message<P>) {
        self.node_mut(id).message = Some(message);
    }

    /// The ordered root set of the forest.
    pub fn roots(&self) -> &[ContainerId] {
        &self.roots
    }

    pub(crate) fn set_roots(&mut self, roots: Vec<ContainerId>) {
        self.roots = roots;
    }

    /// Number of threads (roots) in the forest.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    /// Check if the forest has no threads.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of present messages across all threads.
    pub fn total_messages(&self) -> usize {
        self.roots
            .iter()
            .map(|&root| self.messages(root).count())
            .sum()
    }

    // === Linking ===

    /// Attach `child` as the last child of `parent`.
    ///
    /// If `child` currently has a parent it is detached from that parent's
    /// child list first, so a container is owned by at most one child list
    /// at a time. Children keep insertion order.
    pub fn add_child(&mut self, parent: ContainerId, child: ContainerId) {
        if let Some(old_parent) = self.node(child).parent {
            let pos = self
                .node(old_parent)
                .children
                .iter()
                .position(|&c| c == child)
                .expect("parent link without matching child entry");
            self.node_mut(old_parent).children.remove(pos);
        }
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Detach `child` from `parent`, clearing its parent link.
    ///
    /// # Panics
    ///
    /// Panics if `child` is not currently a child of `parent`; that is a
    /// precondition violation in the caller.
    pub fn remove_child(&mut self, parent: ContainerId, child: ContainerId) {
        let pos = self
            .node(parent)
            .children
            .iter()
            .position(|&c| c == child)
            .expect("container is not a child of the given parent");
        self.node_mut(parent).children.remove(pos);
        self.node_mut(child).parent = None;
    }

    // === Traversal ===

    /// Check whether `target` is reachable from `root` through child links.
    ///
    /// A container counts as its own descendant. The search is an iterative
    /// depth-first walk with a seen-set, so it terminates even on malformed
    /// structure that contains duplicated links.
    pub fn has_descendant(&self, root: ContainerId, target: ContainerId) -> bool {
        let mut stack = vec![root];
        let mut seen = HashSet::new();

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            seen.insert(id);
            for &child in &self.node(id).children {
                if !seen.contains(&child) {
                    stack.push(child);
                }
            }
        }
        false
    }

    /// Number of containers in the subtree rooted at `id`, including `id`.
    pub fn size(&self, id: ContainerId) -> usize {
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            count += 1;
            stack.extend(self.node(current).children.iter().copied());
        }
        count
    }

    /// Distance from `id` to the root of its tree.
    pub fn depth(&self, id: ContainerId) -> usize {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            depth += 1;
            current = parent;
        }
        depth
    }

    /// Pre-order sequence of every container in the subtree rooted at `id`.
    pub fn flatten(&self, id: ContainerId) -> Vec<ContainerId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            // Push children in reverse so they come out left-to-right.
            for &child in self.node(current).children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Iterate over the present messages of the subtree rooted at `id` in
    /// pre-order, skipping dummy containers.
    pub fn messages(&self, id: ContainerId) -> Messages<'_, P> {
        Messages {
            forest: self,
            stack: vec![id],
        }
    }

    // === Projection and display ===

    /// Build the serializable projection of the subtree rooted at `id`.
    pub fn outline(&self, id: ContainerId) -> Outline {
        // Assemble bottom-up from a reversed pre-order so deep chains do
        // not recurse.
        let order = self.flatten(id);
        let mut built: HashMap<ContainerId, Outline> = HashMap::with_capacity(order.len());

        for &current in order.iter().rev() {
            let node = self.node(current);
            let children = node
                .children
                .iter()
                .map(|child| built.remove(child).expect("children built before parent"))
                .collect();
            let parent = node
                .parent
                .and_then(|p| self.message(p))
                .map(|m| m.message_id.clone());
            built.insert(
                current,
                Outline {
                    id: node.message.as_ref().map(|m| m.message_id.clone()),
                    parent,
                    children,
                },
            );
        }

        built.remove(&id).expect("root was built")
    }

    /// Render the subtree rooted at `id` as an indented text outline.
    ///
    /// One line per container, `"> "` repeated per depth level, showing the
    /// subject or `(no message)` for dummies. Meant for logs and manual
    /// inspection, not machine consumption.
    pub fn render(&self, id: ContainerId) -> String {
        let mut out = String::new();
        let mut stack = vec![(id, 0usize)];
        while let Some((current, level)) = stack.pop() {
            for _ in 0..level {
                out.push_str("> ");
            }
            match self.message(current) {
                Some(msg) => out.push_str(&msg.subject),
                None => out.push_str("(no message)"),
            }
            out.push('\n');
            for &child in self.node(current).children.iter().rev() {
                stack.push((child, level + 1));
            }
        }
        out
    }

    // === Restructuring ===

    /// Collapse leading dummy containers of a thread.
    ///
    /// While the node is a dummy with at least one child, its first child
    /// is promoted into its place and the remaining children are moved
    /// under the promoted child. Returns the handle of the new subtree
    /// root; if `root` was in the forest's root set, the entry is updated.
    pub fn collapse_empty(&mut self, root: ContainerId) -> ContainerId {
        let mut current = root;
        while self.node(current).is_dummy() && !self.node(current).children.is_empty() {
            let children: Vec<ContainerId> = self.node(current).children.clone();
            let promoted = children[0];
            self.remove_child(current, promoted);
            for &sibling in &children[1..] {
                self.remove_child(current, sibling);
                self.add_child(promoted, sibling);
            }
            current = promoted;
        }
        if current != root {
            if let Some(slot) = self.roots.iter().position(|&r| r == root) {
                self.roots[slot] = current;
            }
        }
        current
    }
}

/// Iterator over the present messages of a subtree, in pre-order.
///
/// Dummy containers are skipped; only containers holding a message yield
/// an item.
pub struct Messages<'a, P> {
    forest: &'a Forest<P>,
    stack: Vec<ContainerId>,
}

impl<'a, P> Iterator for Messages<'a, P> {
    type Item = &'a Message<P>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            for &child in self.forest.node(id).children.iter().rev() {
                self.stack.push(child);
            }
            if let Some(msg) = self.forest.node(id).message.as_ref() {
                return Some(msg);
            }
        }
    }
}

/// Plain serializable projection of a container subtree.
///
/// Carries the message identifier (absent for dummies), the parent's
/// identifier if the parent holds a message, and the ordered child
/// projections. Used for structural comparison against reference outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Message-ID of the container, or `None` for a dummy.
    pub id: Option<String>,
    /// Message-ID of the parent container, if the parent has a message.
    pub parent: Option<String>,
    /// Projections of the children, in child-list order.
    pub children: Vec<Outline>,
}
