//! TikZ and PGFPlots rendering via external typesetting tools
//!
//! The pipeline only sees the [`GraphicsRenderer`] trait: given a graphics
//! source string and a filename base, produce a saved SVG and return its
//! filename, or fail. The shipped implementation compiles a standalone LaTeX
//! document in a scratch directory and converts the result with whichever
//! SVG toolchain is installed, preferring `latex` + `dvisvgm`, then
//! `pdflatex` + `pdf2svg`, then `pdflatex` + `inkscape`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::utils::error::{ConversionError, ConversionResult};

/// Boundary between the conversion core and graphics rendering.
///
/// `render` receives the raw environment body and the desired filename base
/// (title slug plus sequence counter) and returns the stable relative
/// filename of the written image. Failure is per-graphic and non-fatal to the
/// caller.
pub trait GraphicsRenderer {
    fn render(&mut self, source: &str, name_base: &str) -> ConversionResult<String>;
}

/// Available SVG conversion toolchains, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvgTool {
    /// `latex` to DVI, then `dvisvgm` (most robust)
    Dvisvgm,
    /// `pdflatex` to PDF, then `pdf2svg`
    Pdf2Svg,
    /// `pdflatex` to PDF, then `inkscape`
    Inkscape,
}

impl SvgTool {
    fn converter(&self) -> &'static str {
        match self {
            SvgTool::Dvisvgm => "dvisvgm",
            SvgTool::Pdf2Svg => "pdf2svg",
            SvgTool::Inkscape => "inkscape",
        }
    }

    fn compiler(&self) -> &'static str {
        match self {
            SvgTool::Dvisvgm => "latex",
            SvgTool::Pdf2Svg | SvgTool::Inkscape => "pdflatex",
        }
    }
}

/// Detect the best usable toolchain: both the compiler and the SVG converter
/// must be runnable.
pub fn detect_tool() -> Option<SvgTool> {
    [SvgTool::Dvisvgm, SvgTool::Pdf2Svg, SvgTool::Inkscape]
        .into_iter()
        .find(|tool| runnable(tool.converter()) && runnable(tool.compiler()))
}

fn runnable(program: &str) -> bool {
    // only spawnability matters; some of these tools exit non-zero on --version
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

/// Renders `tikzpicture` sources to SVG files in an output directory.
pub struct TikzRenderer {
    output_dir: PathBuf,
    tool: SvgTool,
}

impl TikzRenderer {
    /// Auto-detect the toolchain. Fails up front, before any conversion is
    /// attempted, when no usable toolchain is installed.
    pub fn new(output_dir: impl Into<PathBuf>) -> ConversionResult<Self> {
        let Some(tool) = detect_tool() else {
            return Err(ConversionError::renderer_unavailable(
                "no DVI/PDF to SVG toolchain found; install dvisvgm (with latex), \
                 pdf2svg or inkscape (with pdflatex)",
            ));
        };
        log::info!("using graphics toolchain: {}", tool.converter());
        Self::with_tool(output_dir, tool)
    }

    /// Use a specific toolchain, skipping detection.
    pub fn with_tool(output_dir: impl Into<PathBuf>, tool: SvgTool) -> ConversionResult<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(TikzRenderer { output_dir, tool })
    }

    pub fn tool(&self) -> SvgTool {
        self.tool
    }
}

impl GraphicsRenderer for TikzRenderer {
    fn render(&mut self, source: &str, name_base: &str) -> ConversionResult<String> {
        let scratch = tempfile::tempdir()?;
        let tex_path = scratch.path().join("graphic.tex");
        fs::write(&tex_path, standalone_document(source))?;

        let filename = format!("{}.svg", name_base);
        let svg_path = self.output_dir.join(&filename);

        match self.tool {
            SvgTool::Dvisvgm => {
                let dvi_path = scratch.path().join("graphic.dvi");
                compile(self.tool.compiler(), scratch.path(), &tex_path, &dvi_path)?;
                run_converter(
                    Command::new("dvisvgm")
                        .args(["--no-fonts", "--exact"])
                        .arg(&dvi_path)
                        .arg("-o")
                        .arg(&svg_path)
                        .current_dir(scratch.path()),
                )?;
            }
            SvgTool::Pdf2Svg => {
                let pdf_path = scratch.path().join("graphic.pdf");
                compile(self.tool.compiler(), scratch.path(), &tex_path, &pdf_path)?;
                run_converter(Command::new("pdf2svg").arg(&pdf_path).arg(&svg_path))?;
            }
            SvgTool::Inkscape => {
                let pdf_path = scratch.path().join("graphic.pdf");
                compile(self.tool.compiler(), scratch.path(), &tex_path, &pdf_path)?;
                run_converter(
                    Command::new("inkscape")
                        .arg(&pdf_path)
                        .arg("--export-plain-svg")
                        .arg(&svg_path),
                )?;
            }
        }

        if !svg_path.exists() {
            return Err(ConversionError::render_failed(
                "converter exited successfully but wrote no SVG",
            ));
        }
        Ok(filename)
    }
}

/// Compile the scratch document and require the expected artifact.
fn compile(
    program: &str,
    scratch: &Path,
    tex_path: &Path,
    artifact: &Path,
) -> ConversionResult<()> {
    let output = Command::new(program)
        .arg("-interaction=nonstopmode")
        .arg("-output-directory")
        .arg(scratch)
        .arg(tex_path)
        .current_dir(scratch)
        .output()?;
    if !output.status.success() || !artifact.exists() {
        return Err(ConversionError::render_failed(format!(
            "{} failed: {}",
            program,
            failure_detail(&output.stdout, &output.stderr)
        )));
    }
    Ok(())
}

fn run_converter(command: &mut Command) -> ConversionResult<()> {
    let output = command.output()?;
    if !output.status.success() {
        return Err(ConversionError::render_failed(format!(
            "SVG conversion failed: {}",
            failure_detail(&output.stdout, &output.stderr)
        )));
    }
    Ok(())
}

/// TeX engines report errors on stdout; converters on stderr. Take whichever
/// has content, trimmed to the tail.
fn failure_detail(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let detail = if stderr.trim().is_empty() {
        String::from_utf8_lossy(stdout).into_owned()
    } else {
        stderr.into_owned()
    };
    let detail = detail.trim();
    match detail.char_indices().nth_back(399) {
        Some((at, _)) => format!("...{}", &detail[at..]),
        None => detail.to_string(),
    }
}

/// Standalone wrapper document for one graphic; works for both `latex` and
/// `pdflatex`.
fn standalone_document(source: &str) -> String {
    format!(
        "\\documentclass{{standalone}}\n\
         \\usepackage{{tikz}}\n\
         \\usepackage{{pgfplots}}\n\
         \\pgfplotsset{{compat=1.18}}\n\
         \\usetikzlibrary{{arrows.meta, shapes, positioning}}\n\
         \\begin{{document}}\n\
         \\begin{{tikzpicture}}\n\
         {}\n\
         \\end{{tikzpicture}}\n\
         \\end{{document}}\n",
        source.trim()
    )
}
