//! # Hierarchical State Machine Engine
//!
//! An execution engine for UML-statechart-style hierarchical state machines.
//! States form a fixed tree; only leaves are ever active, and composites exist to
//! group leaves and share handling, entry and exit behavior.
//!
//! ## Features
//!
//! - 🌳 **Static Hierarchies**: Declare the tree once, validate it, share it across machines
//! - 🫧 **Event Bubbling**: Unhandled events travel from the active leaf toward the root
//! - 🔀 **Correct Transitions**: Exit and entry actions run in UML order around the LCA
//! - ⬇️ **Init Descent**: Composite targets descend through their default children to a leaf
//! - 🔄 **Async/Await Support**: Callbacks are async, dispatch runs each event to completion
//! - 📊 **PlantUML Export**: Diagram of the tree and the transitions taken (`plantuml` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use hsm_engine::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq, Eq, Hash)]
//! enum State { Device, Off, On }
//!
//! #[derive(Debug)]
//! enum Event { PowerOn, PowerOff }
//!
//! struct Context { power_level: u8 }
//!
//! struct OffState;
//!
//! #[async_trait]
//! impl Stateful<State, Context, Event> for OffState {
//!     async fn on_event(&self, event: &Event, _context: &mut Context) -> Response<State> {
//!         match event {
//!             Event::PowerOn => Response::Transition(State::On),
//!             _ => Response::Super,
//!         }
//!     }
//! }
//!
//! struct OnState;
//!
//! #[async_trait]
//! impl Stateful<State, Context, Event> for OnState {
//!     async fn on_event(&self, event: &Event, _context: &mut Context) -> Response<State> {
//!         match event {
//!             Event::PowerOff => Response::Transition(State::Off),
//!             _ => Response::Super,
//!         }
//!     }
//!
//!     async fn on_entry(&self, context: &mut Context) -> ActionResult {
//!         context.power_level = 100;
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let hierarchy = HierarchyBuilder::new()
//!     .root(State::Device, State::Off, Passive)
//!     .leaf(State::Off, State::Device, OffState)
//!     .leaf(State::On, State::Device, OnState)
//!     .build()?;
//!
//! let mut fsm = StateMachine::start(Arc::new(hierarchy), Context { power_level: 0 }).await?;
//! fsm.dispatch(&Event::PowerOn).await?;
//! assert_eq!(fsm.current_state(), Some(State::On));
//! assert_eq!(fsm.context().power_level, 100);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

pub use async_trait::async_trait;

mod builder;
mod error;
mod fsm;
mod hierarchy;

#[cfg(feature = "plantuml")]
mod plantuml;

pub use builder::HierarchyBuilder;
pub use error::{ActionError, ActionResult, BuildError, Error, Phase, Result};
pub use fsm::{Outcome, Passive, Response, StateMachine, Stateful};
pub use hierarchy::{Hierarchy, TransitionPath};

pub mod prelude {
    //! Prelude module for convenient imports
    pub use crate::{
        ActionError, ActionResult, BuildError, Error, Hierarchy, HierarchyBuilder, Outcome,
        Passive, Response, StateMachine, Stateful,
    };
    pub use async_trait::async_trait;
}
