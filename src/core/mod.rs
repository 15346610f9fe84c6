// src/core/mod.rs

//! The scanning engine: catalog, probes, orchestration and aggregation.
//! Everything outside this module (CLI, report writing) only produces a
//! `ScanConfig` or consumes a `ScanReport`.

/// Data structures shared across the engine: severities, categories,
/// findings, probe outcomes and the scan report.
pub mod models;

/// The error taxonomy: fatal configuration errors and recoverable
/// transport failures.
pub mod error;

/// The static, process-wide table of test definitions and the factory
/// resolving ids to probes.
pub mod catalog;

/// The shared HTTP transport every probe sends through.
pub mod http;

/// One detection heuristic per OWASP API Top 10 category.
pub mod probes;

/// Bounded-parallel probe execution and report assembly.
pub mod orchestrator;

/// Pure summary computation over findings and failures.
pub mod aggregator;
