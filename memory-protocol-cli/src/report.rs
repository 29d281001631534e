//! Result reporting
//!
//! Renders per-handle outcomes as plain text or JSON.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;

/// Outcome of copying one file through the protocol and back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub input: String,
    pub identifier: String,
    pub bytes_written: u64,
    pub reported_size: u64,
    pub bytes_read: u64,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Outcome of opening one identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Render reports as pretty JSON
pub fn to_json<T: Serialize>(reports: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(reports)?)
}

pub fn copy_text(reports: &[CopyReport]) -> String {
    let mut out = String::new();
    for r in reports {
        let status = if r.verified { "✓" } else { "✗" };
        let _ = writeln!(
            out,
            "{} {} -> {} ({} written, size {}, {} read)",
            status, r.input, r.identifier, r.bytes_written, r.reported_size, r.bytes_read
        );
        if let Some(output) = &r.output {
            let _ = writeln!(out, "    saved to {}", output);
        }
    }
    out
}

pub fn probe_text(reports: &[ProbeReport]) -> String {
    let mut out = String::new();
    for r in reports {
        match (&r.size, &r.error) {
            (_, Some(error)) => {
                let _ = writeln!(out, "✗ {}: {}", r.identifier, error);
            }
            (Some(size), None) => {
                let _ = writeln!(out, "✓ {}: {} bytes", r.identifier, size);
            }
            (None, None) => {
                let _ = writeln!(out, "✓ {}: size unknown", r.identifier);
            }
        }
    }
    out
}
