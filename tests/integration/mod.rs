//! Integration Tests Module
//!
//! End-to-end tests of the RulePilot pipeline against a scripted completion
//! provider and in-memory oracles. Tests cover decomposition and streaming,
//! the score-and-repair loop, rule conversion, completion retries and
//! configuration loading.

// Shared scripted provider and mock oracles
mod support;

// Decomposition, generation and iteration loop tests
mod pipeline_test;

// Repair controller feedback ordering tests
mod repair_test;

// Segment classification and conversion tests
mod conversion_test;

// Completion client retry tests
mod client_test;

// Configuration loading tests
mod config_test;
