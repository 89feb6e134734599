//! Non-fatal diagnostics emitted by plugins while a conversion runs.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Pipeline phase a warning was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Input plugin `load`.
    Load,
    /// A middleware `process`.
    Middleware,
    /// Output plugin `dump`.
    Dump,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Middleware => write!(f, "middleware"),
            Self::Dump => write!(f, "dump"),
        }
    }
}

/// A single non-fatal diagnostic, e.g. a lossy conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionWarning {
    /// Where it was raised.
    pub phase: Phase,
    /// Plugin or middleware id that raised it.
    pub source: String,
    /// The message.
    pub message: String,
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {}] {}", self.phase, self.source, self.message)
    }
}

/// Ordered collection of warnings for one pipeline run.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<ConversionWarning>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a sink that tags everything it receives with `phase` and `source`.
    pub fn sink<'a>(&'a mut self, phase: Phase, source: &'a str) -> WarningSink<'a> {
        WarningSink {
            phase,
            source,
            warnings: &mut self.warnings,
        }
    }

    /// Number of warnings collected so far.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Consumes the collector, returning warnings in emission order.
    pub fn into_warnings(self) -> Vec<ConversionWarning> {
        self.warnings
    }
}

/// Handle passed to plugin operations for reporting warnings.
#[derive(Debug)]
pub struct WarningSink<'a> {
    phase: Phase,
    source: &'a str,
    warnings: &'a mut Vec<ConversionWarning>,
}

impl WarningSink<'_> {
    /// Records a warning. Never interrupts the conversion.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(phase = %self.phase, source = %self.source, "{}", message);
        self.warnings.push(ConversionWarning {
            phase: self.phase,
            source: self.source.to_string(),
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_keep_order_and_tags() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.sink(Phase::Load, "json").warn("first");
        {
            let mut sink = diagnostics.sink(Phase::Middleware, "transpose_key");
            sink.warn("second");
            sink.warn("third");
        }

        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[0].phase, Phase::Load);
        assert_eq!(warnings[1].source, "transpose_key");
        assert_eq!(warnings[2].message, "third");
        assert_eq!(warnings[2].to_string(), "[middleware transpose_key] third");
    }
}
