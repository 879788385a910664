//! Executive-search orchestration core.
//!
//! A [`search::SearchOrchestrator`] drives each search run through sourcing, forensic
//! auditing, rubric evaluation and matchmaking, producing a ranked shortlist with
//! justifications. Configuration, telemetry and the application error type live alongside
//! so the service binary can stay thin.

pub mod config;
pub mod error;
pub mod search;
pub mod telemetry;
