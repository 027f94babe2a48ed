//! Argos: a Socratic evaluative dialogue tutor.
//!
//! A student discusses a topic with a model-backed tutor that questions
//! rather than answers, following a discipline rubric. At the end of the
//! session a structured report scores the student's reasoning process and
//! the coherence of their AI-usage declaration.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod credentials;
pub mod export;
pub mod logging;
pub mod providers;
pub mod report;
pub mod rubric;
pub mod transcript;
pub mod tutor;
