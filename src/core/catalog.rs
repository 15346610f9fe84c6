// src/core/catalog.rs

//! The static test catalog: the process-wide, read-only table of every
//! detection heuristic the scanner knows, one per OWASP API Top 10
//! category. Catalog order is stable and drives selection display and
//! report ordering, so reports stay reproducible across runs.

use crate::core::error::ConfigError;
use crate::core::models::{OwaspCategory, Severity, TestDefinition};
use crate::core::probes::Probe;

/// The centralized, static registry of all test definitions.
///
/// Order matters: it is the deterministic order used when listing tests
/// and when assembling findings in the final report.
static CATALOG: &[TestDefinition] = &[
    TestDefinition {
        id: "bola",
        category: OwaspCategory::Bola,
        title: "Object-level authorization bypass",
        severity: Severity::Critical,
        enabled: true,
    },
    TestDefinition {
        id: "broken-auth",
        category: OwaspCategory::BrokenAuthentication,
        title: "Missing or bypassable authentication",
        severity: Severity::Critical,
        enabled: true,
    },
    TestDefinition {
        id: "object-property",
        category: OwaspCategory::BrokenObjectPropertyAuthorization,
        title: "Mass assignment of protected object properties",
        severity: Severity::High,
        enabled: true,
    },
    TestDefinition {
        id: "resource-consumption",
        category: OwaspCategory::UnrestrictedResourceConsumption,
        title: "Missing rate limiting",
        severity: Severity::High,
        enabled: true,
    },
    TestDefinition {
        id: "function-auth",
        category: OwaspCategory::BrokenFunctionAuthorization,
        title: "Privileged function exposed without authorization",
        severity: Severity::High,
        enabled: true,
    },
    TestDefinition {
        id: "ssrf",
        category: OwaspCategory::Ssrf,
        title: "Server-side request forgery via URL parameter",
        severity: Severity::High,
        enabled: true,
    },
    TestDefinition {
        id: "misconfiguration",
        category: OwaspCategory::SecurityMisconfiguration,
        title: "Security misconfiguration",
        severity: Severity::Low,
        enabled: true,
    },
    TestDefinition {
        id: "inventory",
        category: OwaspCategory::ImproperInventoryManagement,
        title: "Undocumented or deprecated API surface exposed",
        severity: Severity::Medium,
        enabled: true,
    },
    TestDefinition {
        id: "injection",
        category: OwaspCategory::Injection,
        title: "SQL/NoSQL injection",
        severity: Severity::Critical,
        enabled: true,
    },
];

/// All test definitions, in stable catalog order.
pub fn definitions() -> &'static [TestDefinition] {
    CATALOG
}

/// Looks up a definition by id.
pub fn definition(id: &str) -> Option<&'static TestDefinition> {
    CATALOG.iter().find(|d| d.id == id)
}

/// Resolves a test id to its definition and probe variant, or fails with
/// `UnknownTestId` before any network call is made.
pub fn resolve(id: &str) -> Result<(&'static TestDefinition, Probe), ConfigError> {
    let def = definition(id).ok_or_else(|| ConfigError::UnknownTestId(id.to_string()))?;
    let probe = match def.category {
        OwaspCategory::Bola => Probe::Bola,
        OwaspCategory::BrokenAuthentication => Probe::BrokenAuthentication,
        OwaspCategory::BrokenObjectPropertyAuthorization => Probe::ObjectProperty,
        OwaspCategory::UnrestrictedResourceConsumption => Probe::ResourceConsumption,
        OwaspCategory::BrokenFunctionAuthorization => Probe::FunctionAuthorization,
        OwaspCategory::Ssrf => Probe::Ssrf,
        OwaspCategory::SecurityMisconfiguration => Probe::Misconfiguration,
        OwaspCategory::ImproperInventoryManagement => Probe::Inventory,
        OwaspCategory::Injection => Probe::Injection,
    };
    Ok((def, probe))
}
