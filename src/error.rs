//! Error types for the state machine

use std::fmt::{self, Debug};
use thiserror::Error;

/// Result type alias for state machine operations
pub type Result<T, S> = std::result::Result<T, Error<S>>;

/// Result returned by entry, exit, init and transition actions
pub type ActionResult = std::result::Result<(), ActionError>;

/// Errors that can occur while a machine is running
#[derive(Error, Debug)]
pub enum Error<S: Debug> {
    /// State machine has not been initialized
    #[error("State machine not initialized")]
    StateMachineNotInitialized,

    /// A handler requested a transition to a state the hierarchy doesn't know
    #[error("State {0:?} not registered")]
    StateNotRegistered(S),

    /// A handler answered the event with [`Response::Error`](crate::Response::Error)
    #[error("Invalid event in state {0:?}: {1}")]
    InvalidEvent(S, String),

    /// An action callback failed part way through a transition or descent
    #[error("State {state:?} {phase} action failed: {source}")]
    Action {
        /// State whose callback failed
        state: S,
        /// Which callback was running
        phase: Phase,
        /// The callback's error
        #[source]
        source: ActionError,
    },
}

/// The callback that was running when an [`Error::Action`] occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// `on_entry`
    Entry,
    /// `on_exit`
    Exit,
    /// `on_init`
    Init,
    /// `on_transition`
    Transition,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Entry => "entry",
            Phase::Exit => "exit",
            Phase::Init => "init",
            Phase::Transition => "transition",
        };
        f.write_str(name)
    }
}

/// Error returned by an action callback
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ActionError(pub String);

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Configuration defects found while building a [`Hierarchy`](crate::Hierarchy)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError<S: Debug> {
    /// The same state was declared twice
    #[error("State {0:?} declared more than once")]
    DuplicateState(S),

    /// No root state was declared
    #[error("No root state declared")]
    MissingRoot,

    /// More than one state was declared as root
    #[error("Multiple root states declared: {0:?} and {1:?}")]
    MultipleRoots(S, S),

    /// A state names a parent that was never declared
    #[error("State {state:?} has undeclared parent {parent:?}")]
    UnknownParent {
        /// The child
        state: S,
        /// The missing parent
        parent: S,
    },

    /// A state names a leaf as its parent
    #[error("State {state:?} has leaf {parent:?} as its parent")]
    ParentIsLeaf {
        /// The child
        state: S,
        /// The leaf named as parent
        parent: S,
    },

    /// A composite names an initial state that was never declared
    #[error("Composite {state:?} has undeclared initial state {initial:?}")]
    UnknownInitial {
        /// The composite
        state: S,
        /// The missing initial state
        initial: S,
    },

    /// A composite's initial state is not one of its direct children
    #[error("Initial state {initial:?} of composite {state:?} is not its child")]
    InitialNotChild {
        /// The composite
        state: S,
        /// The initial state it names
        initial: S,
    },

    /// Following parents from this state never reaches the root
    #[error("State {0:?} is part of a parent cycle")]
    Cycle(S),
}
