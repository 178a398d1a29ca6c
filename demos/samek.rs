//! The reference statechart from Miro Samek's "Practical Statecharts in C/C++"
//!
//! ```text
//! |-init-----------------------------------------------------|
//! |                           s0                             |
//! |----------------------------------------------------------|
//! |                                                          |
//! |    |-init-----------|        |-------------------------| |
//! |    |       s1       |---c--->|            s2           | |
//! |    |----------------|<--c----|-------------------------| |
//! |    |                |        |                         | |
//! |<-d-| |-init-------| |        | |-init----------------| | |
//! |    | |     s11    |<----f----| |          s21        | | |
//! | /--| |------------| |        | |---------------------| | |
//! | a  | |            | |        | |                     | | |
//! | \->| |            |------g--------->|-init------|    | | |
//! |    | |____________| |        | |-b->|    s211   |---g--->|
//! |    |----b---^       |------f------->|           |    | | |
//! |    |________________|        | |<-d-|___________|<--e----|
//! |                              | |_____________________| | |
//! |                              |_________________________| |
//! |__________________________________________________________|
//! ```
//!
//! Each signal letter `a`..`h` is dispatched to one machine and the resulting
//! entry/exit/init trace is printed. Anything else is rejected.
//!
//! Run with: cargo run --example samek -- --signals abdeh
//! Set `RUST_LOG=hsm_engine=trace` to watch the engine itself.

use std::io::{self, BufRead};
use std::sync::Arc;

use clap::Parser;
use hsm_engine::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Signals from the original driver program
const DEFAULT_SIGNALS: &str = "abdeifiifabddeghhcgcc";

#[derive(Parser, Debug)]
#[command(about = "Feed signal letters to the reference hierarchical state machine")]
struct Args {
    /// Signal letters to dispatch, in order
    #[arg(short, long)]
    signals: Option<String>,

    /// Read signal letters from stdin instead, one line at a time
    #[arg(long, conflicts_with = "signals")]
    stdin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HsmState {
    Top,
    S0,
    S1,
    S11,
    S2,
    S21,
    S211,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl TryFrom<char> for Signal {
    type Error = char;

    fn try_from(c: char) -> Result<Self, Self::Error> {
        const SIGNALS: [Signal; 8] = [
            Signal::A,
            Signal::B,
            Signal::C,
            Signal::D,
            Signal::E,
            Signal::F,
            Signal::G,
            Signal::H,
        ];
        match c {
            'a'..='h' => Ok(SIGNALS[c as usize - 'a' as usize]),
            _ => Err(c),
        }
    }
}

#[derive(Debug, Default)]
struct TestHsm {
    foo: bool,
    trace: String,
}

struct HsmNode(HsmState);

impl HsmNode {
    fn name(&self) -> String {
        format!("{:?}", self.0)
    }
}

#[async_trait]
impl Stateful<HsmState, TestHsm, Signal> for HsmNode {
    async fn on_event(&self, signal: &Signal, hsm: &mut TestHsm) -> Response<HsmState> {
        use HsmState::*;

        match (self.0, signal) {
            (S0, Signal::E) => Response::Transition(S211),
            (S1, Signal::A) => Response::Transition(S1),
            (S1, Signal::B) => Response::Transition(S11),
            (S1, Signal::C) => Response::Transition(S2),
            (S1, Signal::D) => Response::Transition(S0),
            (S1, Signal::F) => Response::Transition(S211),
            (S11, Signal::G) => Response::Transition(S211),
            (S11, Signal::H) if hsm.foo => {
                hsm.trace.push_str("s11-H;");
                hsm.foo = false;
                Response::Handled
            }
            (S2, Signal::C) => Response::Transition(S1),
            (S2, Signal::F) => Response::Transition(S11),
            (S21, Signal::B) => Response::Transition(S211),
            (S21, Signal::H) if !hsm.foo => Response::Transition(S21),
            (S211, Signal::D) => Response::Transition(S21),
            (S211, Signal::G) => Response::Transition(S0),
            _ => Response::Super,
        }
    }

    async fn on_entry(&self, hsm: &mut TestHsm) -> ActionResult {
        hsm.trace.push_str(&format!("{}-ENTRY;", self.name()));
        Ok(())
    }

    async fn on_exit(&self, hsm: &mut TestHsm) -> ActionResult {
        hsm.trace.push_str(&format!("{}-EXIT;", self.name()));
        Ok(())
    }

    async fn on_init(&self, hsm: &mut TestHsm) -> ActionResult {
        hsm.trace.push_str(&format!("{}-INIT;", self.name()));
        Ok(())
    }

    async fn on_transition(
        &self,
        signal: &Signal,
        _target: &HsmState,
        hsm: &mut TestHsm,
    ) -> ActionResult {
        hsm.trace
            .push_str(&format!("{}-{:?};", self.name().to_lowercase(), signal));
        if self.0 == HsmState::S21 && *signal == Signal::H {
            hsm.foo = true;
        }
        Ok(())
    }
}

type Machine = StateMachine<HsmState, TestHsm, Signal>;

fn create_hierarchy() -> Result<Hierarchy<HsmState, TestHsm, Signal>, BuildError<HsmState>> {
    use HsmState::*;

    HierarchyBuilder::new()
        .root(Top, S0, HsmNode(Top))
        .composite(S0, Top, S1, HsmNode(S0))
        .composite(S1, S0, S11, HsmNode(S1))
        .leaf(S11, S1, HsmNode(S11))
        .composite(S2, S0, S21, HsmNode(S2))
        .composite(S21, S2, S211, HsmNode(S21))
        .leaf(S211, S21, HsmNode(S211))
        .build()
}

/// Dispatch one signal letter; returns false without dispatching if the
/// letter is not a signal.
async fn feed(hsm: &mut Machine, c: char) -> Result<bool, Error<HsmState>> {
    let signal = match Signal::try_from(c) {
        Ok(signal) => signal,
        Err(c) => {
            warn!(input = ?c, "not a signal");
            return Ok(false);
        }
    };

    let outcome = hsm.dispatch(&signal).await?;
    let trace = std::mem::take(&mut hsm.context_mut().trace);
    println!("Signal<-{}: {}", c, trace);
    info!(?outcome, state = ?hsm.current_state(), "dispatched");
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut hsm = Machine::start(Arc::new(create_hierarchy()?), TestHsm::default())
        .await?;
    println!("{}", std::mem::take(&mut hsm.context_mut().trace));

    if args.stdin {
        for line in io::stdin().lock().lines() {
            for c in line?.chars() {
                feed(&mut hsm, c).await?;
            }
        }
    } else {
        let signals = args.signals.as_deref().unwrap_or(DEFAULT_SIGNALS);
        for c in signals.chars() {
            feed(&mut hsm, c).await?;
        }
    }

    #[cfg(feature = "plantuml")]
    println!("\n{}", hsm.export_plantuml());

    Ok(())
}
