//! Builder pattern implementation for state hierarchies

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

use crate::hierarchy::{Kind, Node, StateId};
use crate::{BuildError, Hierarchy, Stateful};

struct Declaration<S, CTX, E>
where
    S: Send + Sync,
    CTX: Send,
    E: Sync,
{
    state: S,
    parent: Option<S>,
    initial: Option<S>,
    behavior: Box<dyn Stateful<S, CTX, E>>,
}

/// Builder for constructing a [`Hierarchy`]
///
/// Every state is declared with its parent and its behavior. Composites (the
/// root included) also name their default child, which must be one of their
/// direct children. [`build`](Self::build) checks the declarations form a
/// single rooted tree before anything can run on it.
pub struct HierarchyBuilder<S, CTX, E>
where
    S: Send + Sync,
    CTX: Send,
    E: Sync,
{
    declarations: Vec<Declaration<S, CTX, E>>,
}

impl<S, CTX, E> Default for HierarchyBuilder<S, CTX, E>
where
    S: Clone + Debug + Eq + Hash + Send + Sync,
    CTX: Send,
    E: Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S, CTX, E> HierarchyBuilder<S, CTX, E>
where
    S: Clone + Debug + Eq + Hash + Send + Sync,
    CTX: Send,
    E: Sync,
{
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            declarations: Vec::new(),
        }
    }

    fn declare<T>(mut self, state: S, parent: Option<S>, initial: Option<S>, behavior: T) -> Self
    where
        T: Stateful<S, CTX, E> + 'static,
    {
        self.declarations.push(Declaration {
            state,
            parent,
            initial,
            behavior: Box::new(behavior),
        });
        self
    }

    /// Declare the root state and its default child
    pub fn root<T>(self, state: S, initial: S, behavior: T) -> Self
    where
        T: Stateful<S, CTX, E> + 'static,
    {
        self.declare(state, None, Some(initial), behavior)
    }

    /// Declare a composite state under `parent`, descending into `initial` by default
    pub fn composite<T>(self, state: S, parent: S, initial: S, behavior: T) -> Self
    where
        T: Stateful<S, CTX, E> + 'static,
    {
        self.declare(state, Some(parent), Some(initial), behavior)
    }

    /// Declare a leaf state under `parent`
    pub fn leaf<T>(self, state: S, parent: S, behavior: T) -> Self
    where
        T: Stateful<S, CTX, E> + 'static,
    {
        self.declare(state, Some(parent), None, behavior)
    }

    /// Validate the declarations and build the hierarchy
    pub fn build(self) -> Result<Hierarchy<S, CTX, E>, BuildError<S>> {
        let declarations = self.declarations;
        let count = declarations.len();

        let mut index = HashMap::with_capacity(count);
        for (i, decl) in declarations.iter().enumerate() {
            if index.insert(decl.state.clone(), StateId(i)).is_some() {
                return Err(BuildError::DuplicateState(decl.state.clone()));
            }
        }

        let mut root: Option<StateId> = None;
        let mut parents = Vec::with_capacity(count);
        for (i, decl) in declarations.iter().enumerate() {
            let Some(parent) = &decl.parent else {
                if let Some(first) = root {
                    return Err(BuildError::MultipleRoots(
                        declarations[first.0].state.clone(),
                        decl.state.clone(),
                    ));
                }
                root = Some(StateId(i));
                parents.push(None);
                continue;
            };
            let Some(&parent_id) = index.get(parent) else {
                return Err(BuildError::UnknownParent {
                    state: decl.state.clone(),
                    parent: parent.clone(),
                });
            };
            if declarations[parent_id.0].initial.is_none() {
                return Err(BuildError::ParentIsLeaf {
                    state: decl.state.clone(),
                    parent: parent.clone(),
                });
            }
            parents.push(Some(parent_id));
        }
        let root = root.ok_or(BuildError::MissingRoot)?;

        let mut kinds = Vec::with_capacity(count);
        for (i, decl) in declarations.iter().enumerate() {
            let kind = match &decl.initial {
                None => Kind::Leaf,
                Some(initial) => {
                    let Some(&initial_id) = index.get(initial) else {
                        return Err(BuildError::UnknownInitial {
                            state: decl.state.clone(),
                            initial: initial.clone(),
                        });
                    };
                    if parents[initial_id.0] != Some(StateId(i)) {
                        return Err(BuildError::InitialNotChild {
                            state: decl.state.clone(),
                            initial: initial.clone(),
                        });
                    }
                    Kind::Composite {
                        initial: initial_id,
                    }
                }
            };
            kinds.push(kind);
        }

        // With a single root and every parent resolved, a walk that runs
        // longer than the tree is big can only be going round a cycle.
        let mut depths = Vec::with_capacity(count);
        for (i, decl) in declarations.iter().enumerate() {
            let mut depth = 0;
            let mut level = StateId(i);
            while let Some(parent) = parents[level.0] {
                depth += 1;
                if depth >= count {
                    return Err(BuildError::Cycle(decl.state.clone()));
                }
                level = parent;
            }
            depths.push(depth);
        }

        let nodes: Vec<Node<S, CTX, E>> = declarations
            .into_iter()
            .zip(parents)
            .zip(kinds.into_iter().zip(depths))
            .map(|((decl, parent), (kind, depth))| Node {
                state: decl.state,
                parent,
                depth,
                kind,
                behavior: decl.behavior,
            })
            .collect();

        debug!(states = nodes.len(), root = ?nodes[root.0].state, "hierarchy built");
        Ok(Hierarchy::from_parts(nodes, index, root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Passive;

    type Builder = HierarchyBuilder<&'static str, (), ()>;

    #[test]
    fn test_builds_valid_tree() {
        let h = Builder::new()
            .root("top", "a", Passive)
            .leaf("a", "top", Passive)
            .leaf("b", "top", Passive)
            .build()
            .unwrap();
        assert_eq!(h.len(), 3);
        assert_eq!(h.initial_leaf(), &"a");
        assert_eq!(h.depth_of(&"b"), Some(1));
    }

    #[test]
    fn test_duplicate_state() {
        let err = Builder::new()
            .root("top", "a", Passive)
            .leaf("a", "top", Passive)
            .leaf("a", "top", Passive)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::DuplicateState("a"));
    }

    #[test]
    fn test_missing_root() {
        let err = Builder::new().build().unwrap_err();
        assert_eq!(err, BuildError::MissingRoot);
    }

    #[test]
    fn test_multiple_roots() {
        let err = Builder::new()
            .root("top", "a", Passive)
            .leaf("a", "top", Passive)
            .root("other", "b", Passive)
            .leaf("b", "other", Passive)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::MultipleRoots("top", "other"));
    }

    #[test]
    fn test_unknown_parent() {
        let err = Builder::new()
            .root("top", "a", Passive)
            .leaf("a", "top", Passive)
            .leaf("b", "nowhere", Passive)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownParent {
                state: "b",
                parent: "nowhere"
            }
        );
    }

    #[test]
    fn test_parent_is_leaf() {
        let err = Builder::new()
            .root("top", "a", Passive)
            .leaf("a", "top", Passive)
            .leaf("b", "a", Passive)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::ParentIsLeaf {
                state: "b",
                parent: "a"
            }
        );
    }

    #[test]
    fn test_initial_must_be_declared_child() {
        let err = Builder::new()
            .root("top", "ghost", Passive)
            .leaf("a", "top", Passive)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::UnknownInitial {
                state: "top",
                initial: "ghost"
            }
        );

        let err = Builder::new()
            .root("top", "b", Passive)
            .composite("p", "top", "b", Passive)
            .leaf("b", "p", Passive)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            BuildError::InitialNotChild {
                state: "top",
                initial: "b"
            }
        );
    }

    #[test]
    fn test_cycle() {
        let err = Builder::new()
            .root("top", "a", Passive)
            .leaf("a", "top", Passive)
            .composite("x", "y", "y", Passive)
            .composite("y", "x", "x", Passive)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::Cycle("x"));
    }
}
