//! Tutor side of the dialogue: instruction building, session setup, and
//! per-turn exchange with the model.

pub mod exchange;
pub mod instructions;
pub mod session;

pub use exchange::{Reply, ReplyOutcome, RetryPolicy};
pub use session::{SessionConfigurator, TutorSession};
