//! Agent
//!
//! - `cognition`: decisions, the reply parser, histories and command reports.
//!   Pure, no async or IO.
//! - `core`: the turn loop that asks the decision service, runs commands and
//!   records what happened.
//! - `logger`: process-wide debug log behind `debug_log!`/`info_log!`/`error_log!`.

pub mod cognition;
pub mod core;
pub mod logger;

mod integration_tests;

pub use self::core::Agent;
pub use cognition::{Decision, Message, MessageKind, Sender, StepOutcome};
