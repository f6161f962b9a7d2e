//! Formatted output helpers for CLI commands.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use statping_common::types::LogicalId;

/// Strips the `AWS::` prefix from a resource type.
#[must_use]
pub fn short_type(resource_type: &str) -> &str {
    resource_type.strip_prefix("AWS::").unwrap_or(resource_type)
}

/// Formats a per-type resource count as an aligned table, followed by the
/// total.
#[must_use]
pub fn format_type_counts(counts: &BTreeMap<&str, usize>) -> String {
    let width = counts.keys().map(|t| short_type(t).len()).max().unwrap_or(0);
    let mut out = String::new();
    for (resource_type, count) in counts {
        let _ = writeln!(out, "  {:<width$}  {count}", short_type(resource_type));
    }
    let total: usize = counts.values().sum();
    let _ = write!(out, "  {total} resource(s)");
    out
}

/// Formats a dependency list, or `-` when there is none.
#[must_use]
pub fn format_dependencies(dependencies: &[LogicalId]) -> String {
    if dependencies.is_empty() {
        return "-".to_string();
    }
    dependencies
        .iter()
        .map(LogicalId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
