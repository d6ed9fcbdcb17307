//! Sync cycle reports.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use stockpile_core::{ResourceSlot, ResourceTypeId};
use stockpile_sync::{ChangedPair, PushReport};

use crate::metrics::MetricsSnapshot;

/// Unique identifier for a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(Uuid);

impl CycleId {
    /// Create a new random cycle ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CycleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-type totals at the end of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Resource type.
    pub resource_type: ResourceTypeId,
    /// Summed capacity.
    pub capacity: f64,
    /// Summed stored amount.
    pub stored: f64,
    /// Summed reservation ledger.
    pub reserved: f64,
}

impl From<&ResourceSlot> for AggregateRow {
    fn from(aggregate: &ResourceSlot) -> Self {
        Self {
            resource_type: aggregate.resource_type,
            capacity: aggregate.capacity,
            stored: aggregate.stored,
            reserved: aggregate.reserved,
        }
    }
}

/// A diagnostic message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level.
    pub level: DiagnosticLevel,
    /// Message.
    pub message: String,
    /// Additional context.
    pub context: Option<String>,
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

/// Complete report of one sync cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Unique cycle ID.
    pub cycle_id: CycleId,
    /// Positions visited by the push.
    pub visited: usize,
    /// Positions written by the push.
    pub written: usize,
    /// Changed `(container, resource)` pairs.
    pub changed: Vec<ChangedPair>,
    /// Per-type totals after the cycle.
    pub aggregates: Vec<AggregateRow>,
    /// Collected metrics.
    pub metrics: MetricsSnapshot,
    /// Diagnostic messages.
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    /// Create a report from a push outcome.
    ///
    /// Every consistency warning becomes a warning diagnostic.
    pub fn new(push: &PushReport, metrics: MetricsSnapshot) -> Self {
        let mut report = Self {
            cycle_id: CycleId::new(),
            visited: push.visited,
            written: push.written,
            changed: push.changed_pairs(),
            aggregates: Vec::new(),
            metrics,
            diagnostics: Vec::new(),
        };

        for warning in &push.warnings {
            report.add_diagnostic(Diagnostic {
                level: DiagnosticLevel::Warning,
                message: warning.to_string(),
                context: Some(warning.kind().to_string()),
            });
        }

        report
    }

    /// Attach per-type totals.
    pub fn with_aggregates<'a, I>(mut self, aggregates: I) -> Self
    where
        I: IntoIterator<Item = &'a ResourceSlot>,
    {
        self.aggregates = aggregates.into_iter().map(AggregateRow::from).collect();
        self
    }

    /// Add a diagnostic message.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add an info diagnostic.
    pub fn add_info(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Info,
            message: message.into(),
            context: None,
        });
    }

    /// Add an error diagnostic.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            level: DiagnosticLevel::Error,
            message: message.into(),
            context: None,
        });
    }

    /// Check if the cycle finished without warnings or errors.
    pub fn is_clean(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.level == DiagnosticLevel::Info)
    }

    /// Format as human-readable text.
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Sync Report: {}\n", self.cycle_id));
        output.push_str(&format!(
            "Visited: {}  Written: {}  Changed: {}\n",
            self.visited,
            self.written,
            self.changed.len()
        ));

        if !self.changed.is_empty() {
            output.push_str("\nChanged:\n");
            for pair in &self.changed {
                output.push_str(&format!("  {} {}\n", pair.container, pair.resource_type));
            }
        }

        if !self.aggregates.is_empty() {
            output.push_str("\nAggregates:\n");
            for row in &self.aggregates {
                output.push_str(&format!(
                    "  {}: stored {} / {} (reserved {})\n",
                    row.resource_type, row.stored, row.capacity, row.reserved
                ));
            }
        }

        output.push_str("\nMetrics:\n");
        output.push_str(&format!("  Cycle Time: {:?}\n", self.metrics.timing.cycle_time));
        output.push_str(&format!("  Pull Time: {:?}\n", self.metrics.timing.pull_time));
        output.push_str(&format!("  Push Time: {:?}\n", self.metrics.timing.push_time));
        output.push_str(&format!(
            "  Slots Pulled: {}\n",
            self.metrics.slots.last_slot_count
        ));

        if !self.diagnostics.is_empty() {
            output.push_str("\nDiagnostics:\n");
            for diag in &self.diagnostics {
                let level = match diag.level {
                    DiagnosticLevel::Info => "INFO",
                    DiagnosticLevel::Warning => "WARN",
                    DiagnosticLevel::Error => "ERROR",
                };
                output.push_str(&format!("  [{}] {}\n", level, diag.message));
            }
        }

        output
    }

    /// Format as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Format as pretty JSON string.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
