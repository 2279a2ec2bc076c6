//! Runtime for dialogs and the daily digest
//!
//! The coordinator drives per-user dialogs through the pure state machine and
//! owns the digest scheduler; all I/O goes through the traits in `traits`.

mod coordinator;
mod digest;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use coordinator::{Coordinator, Dispatch};
pub use traits::*;

use crate::telegram::TelegramSender;
use crate::weather::{LoggingResolver, OpenWeatherService};

/// Type alias for the production coordinator with concrete implementations
pub type ProductionCoordinator =
    Coordinator<DatabaseStore, LoggingResolver<OpenWeatherService>, TelegramSender>;
