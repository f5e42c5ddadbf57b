//! Phase outcomes and the pipeline report collector
//!
//! The pipeline's error taxonomy is explicit: a phase either succeeds,
//! succeeds with data-integrity warnings, or fails fatally. Warnings
//! aggregate into the final report and never abort the run; a fatal
//! outcome stops the pipeline at that phase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one pipeline phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseOutcome {
    /// The phase completed with nothing to report
    Success,
    /// The phase completed; listed oddities need human attention
    Warning(Vec<String>),
    /// The phase failed; the pipeline stops here
    Fatal(String),
}

impl PhaseOutcome {
    /// Whether this outcome stops the pipeline
    pub fn is_fatal(&self) -> bool {
        matches!(self, PhaseOutcome::Fatal(_))
    }

    /// Warnings carried by this outcome
    pub fn warnings(&self) -> &[String] {
        match self {
            PhaseOutcome::Warning(w) => w,
            _ => &[],
        }
    }
}

/// A named phase together with its outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseResult {
    /// Phase name
    pub phase: String,
    /// What happened
    pub outcome: PhaseOutcome,
}

/// Aggregated result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineReport {
    /// When the run started
    pub started_at: Option<DateTime<Utc>>,
    /// Phase results in execution order
    pub phases: Vec<PhaseResult>,
}

impl PipelineReport {
    /// Start a new report stamped with the current time
    pub fn begin() -> Self {
        Self {
            started_at: Some(Utc::now()),
            phases: Vec::new(),
        }
    }

    /// Record a phase outcome
    pub fn record(&mut self, phase: &'static str, outcome: PhaseOutcome) {
        self.phases.push(PhaseResult {
            phase: phase.to_string(),
            outcome,
        });
    }

    /// Whether any phase failed fatally
    pub fn is_fatal(&self) -> bool {
        self.phases.iter().any(|p| p.outcome.is_fatal())
    }

    /// All warnings across phases, in phase order
    pub fn warnings(&self) -> Vec<&str> {
        self.phases
            .iter()
            .flat_map(|p| p.outcome.warnings())
            .map(String::as_str)
            .collect()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.phases {
            match &p.outcome {
                PhaseOutcome::Success => writeln!(f, "{}: ok", p.phase)?,
                PhaseOutcome::Warning(warnings) => {
                    writeln!(f, "{}: ok with {} warning(s)", p.phase, warnings.len())?;
                    for w in warnings {
                        writeln!(f, "  warning: {w}")?;
                    }
                }
                PhaseOutcome::Fatal(msg) => writeln!(f, "{}: FAILED: {msg}", p.phase)?,
            }
        }
        Ok(())
    }
}
