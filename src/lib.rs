//! Field Guardian: an LLM-driven consultation pipeline for smallholder
//! fields.
//!
//! The library is organized around one linear run per request: collectors
//! gather field data from external collaborators, two reasoning steps ask a
//! language model to detect problems and plan low-cost solutions (with
//! validation, one retry, and deterministic fallback), and the outcome is
//! appended to the consultation history.
pub mod cli;
pub mod pipeline;
pub mod providers;
pub mod settings;
pub mod state;
