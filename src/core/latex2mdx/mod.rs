//! LaTeX to MDX converter
//!
//! This module implements the text-pass LaTeX to MDX converter. A document
//! flows through a fixed sequence of rewriting passes; passes with
//! overlapping syntax domains are kept apart by the math protection protocol
//! in [`protect`] and by brace-balanced scanning in [`utils`].

pub mod boxes;
pub mod math;
pub mod metadata;
pub mod pipeline;
pub mod protect;
pub mod structure;
pub mod utils;

pub use boxes::BoxNormalizer;
pub use math::MathNormalizer;
pub use metadata::Metadata;
pub use pipeline::{MdxConverter, MdxOptions};
pub use structure::StructureNormalizer;

// =============================================================================
// Warning System
// =============================================================================

/// Kind of warning generated during conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A graphic could not be rendered; its LaTeX source was kept
    GraphicsFailed,
    /// A bounded rewriting loop hit its iteration limit
    IterationLimit,
    /// An environment had no closing marker and was left unchanged
    UnterminatedEnvironment,
}

impl std::fmt::Display for WarningKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningKind::GraphicsFailed => write!(f, "graphics failed"),
            WarningKind::IterationLimit => write!(f, "iteration limit"),
            WarningKind::UnterminatedEnvironment => write!(f, "unterminated environment"),
        }
    }
}

/// A warning generated during LaTeX to MDX conversion
#[derive(Debug, Clone)]
pub struct ConversionWarning {
    /// The kind of warning
    pub kind: WarningKind,
    /// Human-readable message
    pub message: String,
    /// Location context (e.g., an environment name or a filename base)
    pub location: Option<String>,
}

impl ConversionWarning {
    /// Create a new warning
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        ConversionWarning {
            kind,
            message: message.into(),
            location: None,
        }
    }

    /// Add location context to the warning
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Create a per-graphic failure warning
    pub fn graphics_failed(name_base: &str, detail: &str) -> Self {
        ConversionWarning::new(
            WarningKind::GraphicsFailed,
            format!("graphic kept as LaTeX source: {}", detail),
        )
        .with_location(name_base.to_string())
    }

    /// Create an iteration-limit warning
    pub fn iteration_limit(stage: &str) -> Self {
        ConversionWarning::new(
            WarningKind::IterationLimit,
            format!("{} stopped at its iteration bound; raw markup may remain", stage),
        )
        .with_location(stage.to_string())
    }

    /// Create an unterminated-environment warning
    pub fn unterminated_environment(name: &str) -> Self {
        ConversionWarning::new(
            WarningKind::UnterminatedEnvironment,
            format!("no matching \\end{{{}}}; environment left unchanged", name),
        )
        .with_location(name.to_string())
    }
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {}: {}", self.kind, location, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Conversion output with warnings and any generated image filenames
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The converted MDX document, frontmatter included
    pub content: String,
    /// Relative filenames of images written by the graphics renderer
    pub images: Vec<String>,
    /// Any warnings generated during conversion
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionOutput {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display_with_location() {
        let warning = ConversionWarning::unterminated_environment("dem_box");
        let text = warning.to_string();
        assert!(text.contains("unterminated environment"));
        assert!(text.contains("dem_box"));
    }

    #[test]
    fn test_graphics_warning_carries_name_base() {
        let warning = ConversionWarning::graphics_failed("intro_tikz_0", "latex exited with 1");
        assert_eq!(warning.kind, WarningKind::GraphicsFailed);
        assert_eq!(warning.location.as_deref(), Some("intro_tikz_0"));
    }
}
