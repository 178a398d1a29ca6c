//! The static state tree.
//!
//! A [`Hierarchy`] is built once by [`HierarchyBuilder`](crate::HierarchyBuilder),
//! validated, and then shared read-only (usually behind an `Arc`) by every
//! [`StateMachine`](crate::StateMachine) bound to it. Nodes are stored densely
//! and addressed by index; each node carries its parent link and depth so the
//! ancestry predicates are plain parent walks.
//!
//! The transition rules live here as pure functions over the tree. For a
//! transition requested by `source` while `active` is the active leaf:
//!
//! - exits run from `active` upward and stop after the first level `X` with
//!   `X` enclosing `source` and `parent(X)` enclosing `parent(target)`;
//! - entries run downward to `target` starting from the first level `Y` on the
//!   target's branch with `Y` enclosing `source`, or `parent(Y)` enclosing
//!   `source` while `source` does not enclose `Y`.
//!
//! Together the two rules exit and enter every node strictly below the least
//! common ancestor of `parent(source)` and `parent(target)` exactly once.

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;

use crate::Stateful;

/// Index of a node inside its [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StateId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Composite { initial: StateId },
    Leaf,
}

pub(crate) struct Node<S, CTX, E>
where
    S: Send + Sync,
    CTX: Send,
    E: Sync,
{
    pub(crate) state: S,
    pub(crate) parent: Option<StateId>,
    pub(crate) depth: usize,
    pub(crate) kind: Kind,
    pub(crate) behavior: Box<dyn Stateful<S, CTX, E>>,
}

/// Exit and entry sequences of one transition, as computed by
/// [`Hierarchy::transition_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPath<S> {
    /// States exited, innermost first
    pub exits: Vec<S>,
    /// States entered before init resolution, outermost first
    pub entries: Vec<S>,
    /// States entered while descending through default children
    pub descent: Vec<S>,
    /// Leaf that is active once the transition completes
    pub leaf: S,
}

/// An immutable, validated tree of states.
pub struct Hierarchy<S, CTX, E>
where
    S: Send + Sync,
    CTX: Send,
    E: Sync,
{
    nodes: Vec<Node<S, CTX, E>>,
    index: HashMap<S, StateId>,
    root: StateId,
}

impl<S, CTX, E> Hierarchy<S, CTX, E>
where
    S: Clone + Debug + Eq + Hash + Send + Sync,
    CTX: Send,
    E: Sync,
{
    pub(crate) fn from_parts(
        nodes: Vec<Node<S, CTX, E>>,
        index: HashMap<S, StateId>,
        root: StateId,
    ) -> Self {
        Self { nodes, index, root }
    }

    pub(crate) fn node(&self, id: StateId) -> &Node<S, CTX, E> {
        &self.nodes[id.0]
    }

    pub(crate) fn id_of(&self, state: &S) -> Option<StateId> {
        self.index.get(state).copied()
    }

    pub(crate) fn root_id(&self) -> StateId {
        self.root
    }

    #[cfg_attr(not(feature = "plantuml"), allow(dead_code))]
    pub(crate) fn children(&self, id: StateId) -> impl Iterator<Item = StateId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.parent == Some(id))
            .map(|(i, _)| StateId(i))
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    ///
    /// `None` stands for a virtual node above the root, which encloses
    /// everything and is enclosed by nothing but itself.
    pub(crate) fn encloses(&self, ancestor: Option<StateId>, node: Option<StateId>) -> bool {
        let Some(ancestor) = ancestor else {
            return true;
        };
        let Some(mut node) = node else {
            return false;
        };
        let depth = self.node(ancestor).depth;
        while self.node(node).depth > depth {
            match self.node(node).parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
        node == ancestor
    }

    pub(crate) fn exit_ids(
        &self,
        active: StateId,
        source: StateId,
        target: StateId,
    ) -> Vec<StateId> {
        let target_parent = self.node(target).parent;
        let mut exits = Vec::new();
        let mut level = active;
        loop {
            exits.push(level);
            let parent = self.node(level).parent;
            if self.encloses(parent, target_parent) && self.encloses(Some(level), Some(source)) {
                break;
            }
            match parent {
                Some(parent) => level = parent,
                None => break,
            }
        }
        exits
    }

    pub(crate) fn entry_ids(&self, source: StateId, target: StateId) -> Vec<StateId> {
        let mut entries = Vec::new();
        let mut level = target;
        loop {
            entries.push(level);
            let parent = self.node(level).parent;
            let stop = self.encloses(Some(level), Some(source))
                || (self.encloses(parent, Some(source))
                    && !self.encloses(Some(source), Some(level)));
            match parent {
                Some(parent) if !stop => level = parent,
                _ => break,
            }
        }
        entries.reverse();
        entries
    }

    /// Default children entered when resolving `from` down to a leaf, and that leaf.
    pub(crate) fn descent_ids(&self, from: StateId) -> (Vec<StateId>, StateId) {
        let mut entered = Vec::new();
        let mut level = from;
        while let Kind::Composite { initial } = self.node(level).kind {
            entered.push(initial);
            level = initial;
        }
        (entered, level)
    }

    fn states_of(&self, ids: &[StateId]) -> Vec<S> {
        ids.iter().map(|id| self.node(*id).state.clone()).collect()
    }

    /// The root state
    pub fn root(&self) -> &S {
        &self.node(self.root).state
    }

    /// Number of states in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A built hierarchy always has at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all states in declaration order
    pub fn states(&self) -> impl Iterator<Item = &S> + '_ {
        self.nodes.iter().map(|node| &node.state)
    }

    /// True if the state was declared in this hierarchy
    pub fn contains(&self, state: &S) -> bool {
        self.index.contains_key(state)
    }

    /// Parent of a state; `None` for the root or an unknown state
    pub fn parent_of(&self, state: &S) -> Option<&S> {
        let id = self.id_of(state)?;
        self.node(id).parent.map(|parent| &self.node(parent).state)
    }

    /// Default child of a composite; `None` for leaves or unknown states
    pub fn initial_of(&self, state: &S) -> Option<&S> {
        let id = self.id_of(state)?;
        match self.node(id).kind {
            Kind::Composite { initial } => Some(&self.node(initial).state),
            Kind::Leaf => None,
        }
    }

    /// True if the state is a leaf
    pub fn is_leaf(&self, state: &S) -> bool {
        self.id_of(state)
            .is_some_and(|id| self.node(id).kind == Kind::Leaf)
    }

    /// Distance from the root, which has depth 0
    pub fn depth_of(&self, state: &S) -> Option<usize> {
        self.id_of(state).map(|id| self.node(id).depth)
    }

    /// True if `ancestor` is a strict ancestor of `state`
    pub fn is_ancestor_of(&self, ancestor: &S, state: &S) -> bool {
        ancestor != state && self.is_equal_or_ancestor_of(ancestor, state)
    }

    /// True if `ancestor` is `state` or one of its ancestors
    pub fn is_equal_or_ancestor_of(&self, ancestor: &S, state: &S) -> bool {
        match (self.id_of(ancestor), self.id_of(state)) {
            (Some(ancestor), Some(state)) => self.encloses(Some(ancestor), Some(state)),
            _ => false,
        }
    }

    /// States from the root down to `state`, inclusive
    pub fn path_to(&self, state: &S) -> Option<Vec<S>> {
        let mut id = self.id_of(state)?;
        let mut path = vec![self.node(id).state.clone()];
        while let Some(parent) = self.node(id).parent {
            path.push(self.node(parent).state.clone());
            id = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Leaf reached by following default children from the root
    pub fn initial_leaf(&self) -> &S {
        let (_, leaf) = self.descent_ids(self.root);
        &self.node(leaf).state
    }

    /// Compute, without running anything, what a transition to `target`
    /// requested by `source` does while `active` is the active leaf.
    ///
    /// Returns `None` if a state is unknown, `active` is not a leaf, or
    /// `source` does not enclose `active`.
    pub fn transition_path(&self, active: &S, source: &S, target: &S) -> Option<TransitionPath<S>> {
        let active = self.id_of(active)?;
        let source = self.id_of(source)?;
        let target = self.id_of(target)?;
        if self.node(active).kind != Kind::Leaf || !self.encloses(Some(source), Some(active)) {
            return None;
        }
        let (descent, leaf) = self.descent_ids(target);
        Some(TransitionPath {
            exits: self.states_of(&self.exit_ids(active, source, target)),
            entries: self.states_of(&self.entry_ids(source, target)),
            descent: self.states_of(&descent),
            leaf: self.node(leaf).state.clone(),
        })
    }

    /// Render the tree as a PlantUML state diagram
    #[cfg(feature = "plantuml")]
    #[cfg_attr(docsrs, doc(cfg(feature = "plantuml")))]
    pub fn to_plantuml(&self) -> String {
        crate::plantuml::generate_plantuml(self, &[], None)
    }
}

impl<S, CTX, E> Debug for Hierarchy<S, CTX, E>
where
    S: Debug + Send + Sync,
    CTX: Send,
    E: Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hierarchy")
            .field("root", &self.nodes[self.root.0].state)
            .field("states", &self.nodes.iter().map(|n| &n.state).collect::<Vec<_>>())
            .finish()
    }
}
