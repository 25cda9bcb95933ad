//! callscribe: desktop meeting recorder core.
//!
//! Detects video-call windows, correlates them with calendar events, drives
//! an external capture engine, and persists meeting notes and transcripts to
//! a local document store.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod dispatch;
pub mod engine;
pub mod global;
pub mod notify;
pub mod orchestrator;
pub mod session;
pub mod store;
