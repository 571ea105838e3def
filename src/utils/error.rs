//! Error handling for Texmdx conversions
//!
//! The transformation core itself has no fatal errors: malformed input is
//! recovered locally and unknown commands pass through. The error type here
//! covers the graphics boundary (missing toolchain, failed render) and file
//! I/O around it.

use std::fmt;

use crate::core::latex2mdx::{ConversionWarning, WarningKind};

/// Conversion error type
#[derive(Debug, Clone)]
pub enum ConversionError {
    /// No usable graphics toolchain was found; surfaced before any
    /// conversion attempt
    RendererUnavailable { message: String },
    /// A single graphic failed to render
    RenderFailed { message: String },
    /// IO error (for file operations)
    IoError { message: String },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::RendererUnavailable { message } => {
                write!(f, "Renderer unavailable: {}", message)
            }
            ConversionError::RenderFailed { message } => {
                write!(f, "Render failed: {}", message)
            }
            ConversionError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<std::io::Error> for ConversionError {
    fn from(err: std::io::Error) -> Self {
        ConversionError::IoError {
            message: err.to_string(),
        }
    }
}

/// Result type for conversion operations
pub type ConversionResult<T> = Result<T, ConversionError>;

// Convenience constructors for errors
impl ConversionError {
    pub fn renderer_unavailable(message: impl Into<String>) -> Self {
        ConversionError::RendererUnavailable {
            message: message.into(),
        }
    }

    pub fn render_failed(message: impl Into<String>) -> Self {
        ConversionError::RenderFailed {
            message: message.into(),
        }
    }
}

// =============================================================================
// CLI Diagnostic System
// =============================================================================

/// Severity level for CLI diagnostics (determines coloring).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    /// Critical errors (red)
    Error,
    /// Warnings (yellow) - e.g., a graphic kept as LaTeX source
    Warning,
    /// Informational (cyan) - e.g., an environment left unchanged
    Info,
}

/// Diagnostic wrapper for CLI output, giving conversion warnings a severity
/// and a color.
#[derive(Debug, Clone)]
pub struct CliDiagnostic {
    /// Severity level
    pub severity: DiagnosticSeverity,
    /// Warning kind as string (e.g., "graphics failed")
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Location context (e.g., an environment name or filename base)
    pub location: Option<String>,
}

impl CliDiagnostic {
    /// Create a new diagnostic.
    pub fn new(
        severity: DiagnosticSeverity,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CliDiagnostic {
            severity,
            kind: kind.into(),
            message: message.into(),
            location: None,
        }
    }

    /// Wrap a conversion warning for display.
    pub fn from_warning(warning: &ConversionWarning) -> Self {
        let severity = match warning.kind {
            WarningKind::GraphicsFailed | WarningKind::IterationLimit => {
                DiagnosticSeverity::Warning
            }
            WarningKind::UnterminatedEnvironment => DiagnosticSeverity::Info,
        };
        CliDiagnostic {
            severity,
            kind: warning.kind.to_string(),
            message: warning.message.clone(),
            location: warning.location.clone(),
        }
    }

    /// Get ANSI color code for this diagnostic's severity.
    pub fn color_code(&self) -> &'static str {
        match self.severity {
            DiagnosticSeverity::Error => "\x1b[31m",   // red
            DiagnosticSeverity::Warning => "\x1b[33m", // yellow
            DiagnosticSeverity::Info => "\x1b[36m",    // cyan
        }
    }
}

impl fmt::Display for CliDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref location) = self.location {
            write!(f, "[{}] {}: {}", self.kind, location, self.message)
        } else {
            write!(f, "[{}] {}", self.kind, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_unavailable_display() {
        let err = ConversionError::renderer_unavailable("nothing installed");
        assert!(err.to_string().contains("Renderer unavailable"));
        assert!(err.to_string().contains("nothing installed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConversionError = io.into();
        assert!(matches!(err, ConversionError::IoError { .. }));
    }

    #[test]
    fn test_diagnostic_from_warning() {
        let warning = ConversionWarning::graphics_failed("a_tikz_0", "boom");
        let diagnostic = CliDiagnostic::from_warning(&warning);
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Warning);
        assert!(diagnostic.to_string().contains("a_tikz_0"));
    }

    #[test]
    fn test_severity_colors_differ() {
        let warn = CliDiagnostic::new(DiagnosticSeverity::Warning, "k", "m");
        let info = CliDiagnostic::new(DiagnosticSeverity::Info, "k", "m");
        assert_ne!(warn.color_code(), info.color_code());
    }
}
