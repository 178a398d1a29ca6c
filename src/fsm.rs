//! A hierarchical state machine engine with UML statechart exit/entry ordering.
//!
//! # Type Parameters
//! - `S`: State identifier type. Must implement `Hash`, `Eq`, `Clone`, `Send`, `Sync` and `Debug`.
//! - `CTX`: Per-machine context handed to every callback. Must implement `Send`.
//! - `E`: Event type. Must implement `Debug`, `Send` and `Sync`.
//!
//! # Model
//! - The state tree is a [`Hierarchy`], built once and shared read-only by any
//!   number of machines.
//! - Only leaves are ever active. Composites group leaves and provide shared
//!   handling and entry/exit behavior through [`Stateful`].
//! - An event goes to the active leaf first and bubbles to the parent whenever a
//!   handler answers [`Response::Super`]. An event nobody consumes is ignored.
//! - A transition exits from the active leaf up to the boundary computed by the
//!   hierarchy, runs the requesting state's [`Stateful::on_transition`], enters
//!   down to the target and then descends through default children to a leaf.
//!
//! # Errors
//! Transitions are not transactional. When a callback fails the remaining steps
//! are skipped and the active leaf stays whatever the completed steps left it.
use async_trait::async_trait;
use std::sync::Arc;
use std::{fmt::Debug, hash::Hash};
use tracing::{debug, trace, warn};

use crate::hierarchy::{Kind, StateId};
use crate::{ActionError, ActionResult, Error, Hierarchy, Phase};

#[cfg(feature = "plantuml")]
use crate::plantuml::generate_plantuml;

#[async_trait]
/// Behavior attached to one node of the hierarchy.
///
/// Behaviors are shared by every machine running on a hierarchy, so they take
/// `&self`; anything a machine needs to remember lives in the context.
pub trait Stateful<S, CTX, E>: Send + Sync
where
    S: Send + Sync,
    CTX: Send,
    E: Sync,
{
    /// Called when an event reaches this state.
    ///
    /// Return [`Response::Super`] to let the parent look at the event.
    async fn on_event(&self, event: &E, context: &mut CTX) -> Response<S>;

    /// Called when the state is entered.
    async fn on_entry(&self, _context: &mut CTX) -> ActionResult {
        Ok(())
    }

    /// Called when the state is exited.
    async fn on_exit(&self, _context: &mut CTX) -> ActionResult {
        Ok(())
    }

    /// Called on a composite right before its default child is entered.
    async fn on_init(&self, _context: &mut CTX) -> ActionResult {
        Ok(())
    }

    /// Called on the state that requested a transition, after the exits and
    /// before the entries.
    async fn on_transition(&self, _event: &E, _target: &S, _context: &mut CTX) -> ActionResult {
        Ok(())
    }
}

/// Response type for event handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<S> {
    /// Event consumed, no transition
    Handled,
    /// An error occurred, with a message
    Error(String),
    /// Transition to a new state
    Transition(S),
    /// Delegate to the parent state
    Super,
}

/// A behavior with no actions that delegates every event.
///
/// Useful for composites that only exist to group their children, such as a
/// bare root.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passive;

#[async_trait]
impl<S, CTX, E> Stateful<S, CTX, E> for Passive
where
    S: Send + Sync,
    CTX: Send,
    E: Sync,
{
    async fn on_event(&self, _event: &E, _context: &mut CTX) -> Response<S> {
        Response::Super
    }
}

/// What [`StateMachine::dispatch`] did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<S> {
    /// A handler consumed the event without transitioning
    Handled {
        /// State whose handler consumed it
        by: S,
    },
    /// A handler requested a transition and it completed
    Transitioned {
        /// State whose handler requested it
        by: S,
        /// Requested target
        target: S,
        /// Leaf active afterwards
        active: S,
    },
    /// The event bubbled past the root unconsumed
    Ignored,
}

/// A running instance of a [`Hierarchy`].
pub struct StateMachine<S, CTX, E>
where
    S: Clone + Debug + Eq + Hash + Send + Sync + 'static,
    CTX: Send + 'static,
    E: Debug + Send + Sync + 'static,
{
    hierarchy: Arc<Hierarchy<S, CTX, E>>,
    active: Option<StateId>,
    context: CTX,

    // Unique (source, target) pairs, in the order first seen
    #[cfg(feature = "plantuml")]
    transition_log: Vec<(S, S)>,
}

impl<S, CTX, E> StateMachine<S, CTX, E>
where
    S: Clone + Debug + Eq + Hash + Send + Sync + 'static,
    CTX: Send + 'static,
    E: Debug + Send + Sync + 'static,
{
    /// Bind a new machine to a hierarchy. Nothing runs until [`init`](Self::init).
    pub fn new(hierarchy: Arc<Hierarchy<S, CTX, E>>, context: CTX) -> Self {
        Self {
            hierarchy,
            active: None,
            context,

            #[cfg(feature = "plantuml")]
            transition_log: Vec::new(),
        }
    }

    /// Bind a new machine and run its initial descent
    pub async fn start(
        hierarchy: Arc<Hierarchy<S, CTX, E>>,
        context: CTX,
    ) -> Result<Self, Error<S>> {
        let mut machine = Self::new(hierarchy, context);
        machine.init().await?;
        Ok(machine)
    }

    /// Descend from the root through default children to the initial leaf,
    /// entering every state below the root on the way.
    ///
    /// Calling it again restarts the descent without running any exits.
    pub async fn init(&mut self) -> Result<(), Error<S>> {
        let root = self.hierarchy.root_id();
        debug!(root = ?self.hierarchy.node(root).state, "initializing state machine");
        self.resolve(root).await
    }

    /// Deliver an event to the active leaf and let it bubble up until some
    /// state consumes it.
    pub async fn dispatch(&mut self, event: &E) -> Result<Outcome<S>, Error<S>> {
        let active = self.active.ok_or(Error::StateMachineNotInitialized)?;
        let hierarchy = Arc::clone(&self.hierarchy);
        debug!(state = ?hierarchy.node(active).state, ?event, "dispatching event");

        let mut level = active;
        loop {
            let node = hierarchy.node(level);
            match node.behavior.on_event(event, &mut self.context).await {
                Response::Handled => {
                    debug!(by = ?node.state, "event handled");
                    return Ok(Outcome::Handled {
                        by: node.state.clone(),
                    });
                }
                Response::Super => match node.parent {
                    Some(parent) => {
                        trace!(
                            from = ?node.state,
                            to = ?hierarchy.node(parent).state,
                            "delegating to superstate"
                        );
                        level = parent;
                    }
                    None => {
                        debug!(?event, "event ignored");
                        return Ok(Outcome::Ignored);
                    }
                },
                Response::Transition(target) => {
                    let Some(target_id) = hierarchy.id_of(&target) else {
                        return Err(Error::StateNotRegistered(target));
                    };
                    self.transition(active, level, target_id, event).await?;
                    let active = self.active.unwrap_or(target_id);
                    return Ok(Outcome::Transitioned {
                        by: node.state.clone(),
                        target,
                        active: hierarchy.node(active).state.clone(),
                    });
                }
                Response::Error(e) => {
                    return Err(Error::InvalidEvent(node.state.clone(), e));
                }
            }
        }
    }

    async fn transition(
        &mut self,
        active: StateId,
        source: StateId,
        target: StateId,
        event: &E,
    ) -> Result<(), Error<S>> {
        let hierarchy = Arc::clone(&self.hierarchy);
        let source_node = hierarchy.node(source);
        let target_node = hierarchy.node(target);
        debug!(source = ?source_node.state, target = ?target_node.state, "transition");

        for id in hierarchy.exit_ids(active, source, target) {
            let node = hierarchy.node(id);
            trace!(state = ?node.state, "exit");
            node.behavior
                .on_exit(&mut self.context)
                .await
                .map_err(|e| action_failed(&node.state, Phase::Exit, e))?;
        }

        source_node
            .behavior
            .on_transition(event, &target_node.state, &mut self.context)
            .await
            .map_err(|e| action_failed(&source_node.state, Phase::Transition, e))?;

        for id in hierarchy.entry_ids(source, target) {
            self.enter(&hierarchy, id).await?;
        }

        #[cfg(feature = "plantuml")]
        {
            let pair = (source_node.state.clone(), target_node.state.clone());
            if !self.transition_log.contains(&pair) {
                self.transition_log.push(pair);
            }
        }

        self.resolve(target).await
    }

    async fn enter(
        &mut self,
        hierarchy: &Hierarchy<S, CTX, E>,
        id: StateId,
    ) -> Result<(), Error<S>> {
        let node = hierarchy.node(id);
        trace!(state = ?node.state, "entry");
        node.behavior
            .on_entry(&mut self.context)
            .await
            .map_err(|e| action_failed(&node.state, Phase::Entry, e))
    }

    // Init resolution: a leaf becomes active, a composite descends into its
    // default child.
    async fn resolve(&mut self, from: StateId) -> Result<(), Error<S>> {
        let hierarchy = Arc::clone(&self.hierarchy);
        let mut level = from;
        loop {
            let node = hierarchy.node(level);
            match node.kind {
                Kind::Leaf => {
                    self.active = Some(level);
                    debug!(state = ?node.state, "active state");
                    return Ok(());
                }
                Kind::Composite { initial } => {
                    trace!(state = ?node.state, "init");
                    node.behavior
                        .on_init(&mut self.context)
                        .await
                        .map_err(|e| action_failed(&node.state, Phase::Init, e))?;
                    self.enter(&hierarchy, initial).await?;
                    level = initial;
                }
            }
        }
    }

    /// Get the active leaf
    pub fn current_state(&self) -> Option<S> {
        self.active.map(|id| self.hierarchy.node(id).state.clone())
    }

    /// True if the active leaf is `state` or one of its descendants
    pub fn is_in(&self, state: &S) -> bool {
        match (self.hierarchy.id_of(state), self.active) {
            (Some(state), Some(active)) => self.hierarchy.encloses(Some(state), Some(active)),
            _ => false,
        }
    }

    /// States from the root down to the active leaf; empty before init
    pub fn active_path(&self) -> Vec<S> {
        self.current_state()
            .and_then(|state| self.hierarchy.path_to(&state))
            .unwrap_or_default()
    }

    /// Get the hierarchy this machine runs on
    pub fn hierarchy(&self) -> &Arc<Hierarchy<S, CTX, E>> {
        &self.hierarchy
    }

    /// Get a reference to the context
    pub fn context(&self) -> &CTX {
        &self.context
    }

    /// Get a mutable reference to the context
    pub fn context_mut(&mut self) -> &mut CTX {
        &mut self.context
    }

    /// Consume the machine and return its context
    pub fn into_context(self) -> CTX {
        self.context
    }

    /// Export the hierarchy, the transitions taken so far and the active leaf
    /// as a PlantUML diagram
    #[cfg(feature = "plantuml")]
    pub fn export_plantuml(&self) -> String {
        generate_plantuml(
            &self.hierarchy,
            &self.transition_log,
            self.current_state().as_ref(),
        )
    }

    /// Stub for export_plantuml when feature is disabled
    #[cfg(not(feature = "plantuml"))]
    pub fn export_plantuml(&self) -> String {
        String::from("PlantUML export not available (requires 'plantuml' feature)")
    }
}

fn action_failed<S: Clone + Debug>(state: &S, phase: Phase, source: ActionError) -> Error<S> {
    warn!(?state, %phase, error = %source, "action failed");
    Error::Action {
        state: state.clone(),
        phase,
        source,
    }
}
