//! Texmdx - LaTeX to MDX converter with KaTeX-ready math
//!
//! Texmdx turns a LaTeX document into an MDX document whose math renders
//! under a KaTeX pipeline. Structural markup (sections, emphasis, lists,
//! callout boxes, tables, graphics) becomes Markdown/MDX; mathematical
//! content is carried over exactly, shielded from the structural passes by a
//! protect/restore protocol.
//!
//! # Quick start
//!
//! ```
//! let mdx = texmdx::latex_to_mdx("\\section{Intro}\n\\[x^2\\]");
//! assert!(mdx.contains("## Intro"));
//! assert!(mdx.contains("x^2"));
//! ```
//!
//! The full pipeline, graphics rendering included, goes through
//! [`MdxConverter`]:
//!
//! ```no_run
//! use texmdx::{MdxConverter, MdxOptions, TikzRenderer};
//!
//! # fn main() -> texmdx::ConversionResult<()> {
//! let renderer = TikzRenderer::new("./images")?;
//! let mut converter = MdxConverter::new(MdxOptions::default())
//!     .with_renderer(Box::new(renderer));
//! let output = converter.convert("\\begin{document}...\\end{document}");
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod tikz;
pub mod utils;

pub use crate::core::latex2mdx::metadata::{
    extract_metadata, render_frontmatter, slugify, Metadata,
};
pub use crate::core::latex2mdx::{
    BoxNormalizer, ConversionOutput, ConversionWarning, MathNormalizer, MdxConverter,
    MdxOptions, StructureNormalizer, WarningKind,
};
pub use crate::tikz::{detect_tool, GraphicsRenderer, SvgTool, TikzRenderer};
pub use crate::utils::error::{
    CliDiagnostic, ConversionError, ConversionResult, DiagnosticSeverity,
};

/// Convert a LaTeX document to MDX, graphics left as LaTeX source.
pub fn latex_to_mdx(input: &str) -> String {
    latex_to_mdx_with_report(input).content
}

/// Convert a LaTeX document to MDX, returning warnings alongside the content.
pub fn latex_to_mdx_with_report(input: &str) -> ConversionOutput {
    MdxConverter::new(MdxOptions::default()).convert(input)
}
