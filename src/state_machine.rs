//! Per-user dialog state machine
//!
//! Pure transitions in the Elm Architecture style: `transition` decides the
//! next state and the effects, the coordinator performs the I/O.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{DialogState, Intent, UserId};
pub use transition::{transition, TransitionResult};
