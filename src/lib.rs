// src/lib.rs

//! apisentry: an OWASP API Security Top 10 scanner. The library exposes
//! the scanning engine; the binary wraps it in a CLI that produces a
//! `ScanConfig` and renders the resulting `ScanReport`.

pub mod core;
pub mod logging;
