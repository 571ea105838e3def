//! Document pipeline
//!
//! Fixed, order-dependent sequence of passes from a LaTeX document string to
//! the final MDX document. Each step's output is the next step's input; the
//! ordering rationale lives with each step below. No state survives a run.

use lazy_static::lazy_static;
use regex::Regex;

use super::boxes::BoxNormalizer;
use super::math::{strip_math_incompatible, MathNormalizer};
use super::metadata::{extract_metadata, render_frontmatter, slugify};
use super::protect::{protect_math, restore_math};
use super::structure::{convert_tabular_to_array, StructureNormalizer};
use super::utils::scan_balanced;
use super::{ConversionOutput, ConversionWarning};
use crate::tikz::GraphicsRenderer;

lazy_static! {
    static ref MINIPAGE_BEGIN: Regex = Regex::new(r"\\begin\{minipage\}\{[^}]+\}").unwrap();
    static ref VSPACE: Regex = Regex::new(r"\\vspace\*?\{[^}]+\}").unwrap();
    static ref HSPACE: Regex = Regex::new(r"\\hspace\*?\{[^}]+\}").unwrap();
    static ref FOOTNOTE: Regex = Regex::new(r"\\footnote\{[^}]+\}").unwrap();
    static ref ADDCONTENTSLINE: Regex =
        Regex::new(r"\\addcontentsline\{[^}]+\}\{[^}]+\}\{[^}]+\}").unwrap();
    static ref LEFTSKIP: Regex = Regex::new(r"\\leftskip\s+[+-]?\d+pt").unwrap();
    static ref ITEMSEP_LENGTH: Regex =
        Regex::new(r"\\setlength\{?\\itemsep\}?\{[^}]+\}").unwrap();
    static ref LSTLISTING_BEGIN: Regex =
        Regex::new(r"\\begin\{lstlisting\}(?:\[[^\]]*\])?").unwrap();
    static ref TIKZ_ENV: Regex =
        Regex::new(r"(?s)\\begin\{tikzpicture\}(.*?)\\end\{tikzpicture\}").unwrap();
    static ref EXCESS_BLANK_LINES: Regex = Regex::new(r"\n\s*\n\s*\n+").unwrap();
}

/// Conversion options.
#[derive(Debug, Clone)]
pub struct MdxOptions {
    /// URL prefix for generated image references
    pub image_url_prefix: String,
    /// Bound on list environments converted per document
    pub max_list_iterations: usize,
    /// Bound on box nesting depth and document re-scans
    pub max_box_depth: usize,
}

impl Default for MdxOptions {
    fn default() -> Self {
        MdxOptions {
            image_url_prefix: "/blogs/images".to_string(),
            max_list_iterations: 64,
            max_box_depth: 8,
        }
    }
}

/// The LaTeX to MDX document converter.
///
/// Holds configuration and an optional graphics renderer; everything mutable
/// during a run is local to [`MdxConverter::convert`], so one converter can
/// process any number of documents.
pub struct MdxConverter {
    options: MdxOptions,
    math: MathNormalizer,
    structure: StructureNormalizer,
    boxes: BoxNormalizer,
    renderer: Option<Box<dyn GraphicsRenderer>>,
}

impl MdxConverter {
    pub fn new(options: MdxOptions) -> Self {
        let structure = StructureNormalizer::new(options.max_list_iterations);
        let boxes = BoxNormalizer::new(options.max_box_depth);
        MdxConverter {
            options,
            math: MathNormalizer::new(),
            structure,
            boxes,
            renderer: None,
        }
    }

    /// Attach a graphics renderer; without one, graphics environments pass
    /// through as LaTeX source.
    pub fn with_renderer(mut self, renderer: Box<dyn GraphicsRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Run the full pipeline over one document.
    pub fn convert(&mut self, input: &str) -> ConversionOutput {
        let mut warnings = Vec::new();
        let mut images = Vec::new();

        let metadata = extract_metadata(input);
        let slug = metadata
            .title
            .as_deref()
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| "document".to_string());

        let content = strip_preamble(input);
        let content = remove_layout_commands(&content);
        let content = convert_lstlisting(&content);
        // equation cleanup runs before any math protection: these commands
        // live inside spans that are about to turn opaque
        let content = strip_math_incompatible(&content);
        // tables before protection too, so cell math dissolves into the block
        let content = convert_tabular_to_array(&content);
        let content = self.convert_graphics(&content, &slug, &mut warnings, &mut images);

        let structure = &self.structure;
        let (content, box_warnings) = self
            .boxes
            .convert(&content, &|body: &str| structure.convert_lists(body).0);
        warnings.extend(box_warnings);

        let content = self.math.convert(&content);
        let (content, structure_warnings) = self.structure.convert(&content);
        warnings.extend(structure_warnings);

        let content = postprocess(&content);

        ConversionOutput {
            content: format!("{}{}", render_frontmatter(&metadata), content),
            images,
            warnings,
        }
    }

    /// Replace each `tikzpicture` block with an image reference produced by
    /// the renderer. A failed render keeps the block and records a warning;
    /// the sequence counter still advances so filenames stay stable.
    fn convert_graphics(
        &mut self,
        content: &str,
        slug: &str,
        warnings: &mut Vec<ConversionWarning>,
        images: &mut Vec<String>,
    ) -> String {
        let prefix = self.options.image_url_prefix.trim_end_matches('/').to_string();
        let Some(renderer) = self.renderer.as_mut() else {
            return content.to_string();
        };
        let mut counter = 0usize;
        TIKZ_ENV
            .replace_all(content, |caps: &regex::Captures| {
                let name_base = format!("{}_tikz_{}", slug, counter);
                counter += 1;
                match renderer.render(&caps[1], &name_base) {
                    Ok(filename) => {
                        log::info!("rendered graphic {}", filename);
                        images.push(filename.clone());
                        format!("\n![TikZ Graph]({}/{})\n", prefix, filename)
                    }
                    Err(err) => {
                        log::warn!("graphic {} failed: {}", name_base, err);
                        warnings.push(ConversionWarning::graphics_failed(
                            &name_base,
                            &err.to_string(),
                        ));
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

/// Keep only the text between the document-body markers. With either marker
/// missing the whole input is the body.
fn strip_preamble(content: &str) -> String {
    const BEGIN: &str = "\\begin{document}";
    const END: &str = "\\end{document}";
    match (content.find(BEGIN), content.find(END)) {
        (Some(begin), Some(end)) if begin + BEGIN.len() <= end => {
            content[begin + BEGIN.len()..end].trim().to_string()
        }
        _ => content.trim().to_string(),
    }
}

/// Remove spacing, page-layout and minipage markup with no MDX counterpart.
fn remove_layout_commands(content: &str) -> String {
    let content = MINIPAGE_BEGIN.replace_all(content, "");
    let content = content.replace("\\end{minipage}", "");
    let content = VSPACE.replace_all(&content, "");
    let content = HSPACE.replace_all(&content, "");
    let content = FOOTNOTE.replace_all(&content, "");
    let content = ADDCONTENTSLINE.replace_all(&content, "");
    let content = content.replace("\\newpage", "");
    let content = LEFTSKIP.replace_all(&content, "");
    ITEMSEP_LENGTH.replace_all(&content, "").into_owned()
}

/// `lstlisting` environments become fenced code blocks; the optional
/// configuration argument is dropped.
fn convert_lstlisting(content: &str) -> String {
    let content = LSTLISTING_BEGIN.replace_all(content, "```");
    content.replace("\\end{lstlisting}", "```")
}

/// Final cleanup: strip `\textcolor` outside math, flatten indentation so
/// the renderer cannot mistake lines for code blocks, and collapse runs of
/// blank lines.
fn postprocess(content: &str) -> String {
    let content = strip_textcolor_outside_math(content);

    let lines: Vec<&str> = content
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                line.trim_start()
            }
        })
        .collect();
    let content = lines.join("\n");

    let content = EXCESS_BLANK_LINES.replace_all(&content, "\n\n");
    content.trim().to_string()
}

/// Strip `\textcolor{color}{text}` down to `text` everywhere outside math.
///
/// Runs after math and structure conversion, so the math spans it must avoid
/// are located with the same protect/restore protocol, scoped to this step.
fn strip_textcolor_outside_math(content: &str) -> String {
    let (guarded, spans) = protect_math(content);
    let stripped = strip_textcolor(&guarded);
    restore_math(stripped, &spans)
}

fn strip_textcolor(content: &str) -> String {
    const MARKER: &str = "\\textcolor{";
    let mut out = String::with_capacity(content.len());
    let mut pos = 0usize;
    while let Some(found) = content[pos..].find(MARKER) {
        let start = pos + found;
        out.push_str(&content[pos..start]);
        let color_start = start + MARKER.len();
        let parsed = scan_balanced(content, color_start).and_then(|(_, after_color)| {
            if content.as_bytes().get(after_color) == Some(&b'{') {
                scan_balanced(content, after_color + 1)
            } else {
                None
            }
        });
        match parsed {
            Some((text, after_text)) => {
                out.push_str(text);
                pos = after_text;
            }
            None => {
                out.push_str(MARKER);
                pos = start + MARKER.len();
            }
        }
    }
    out.push_str(&content[pos..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(input: &str) -> String {
        MdxConverter::new(MdxOptions::default()).convert(input).content
    }

    #[test]
    fn test_preamble_stripped() {
        let input = "\\usepackage{amsmath}\n\\begin{document}\nbody\n\\end{document}";
        assert_eq!(convert(input), "---\n---\n\nbody");
    }

    #[test]
    fn test_missing_markers_keep_whole_input() {
        assert_eq!(strip_preamble("no markers here"), "no markers here");
        assert_eq!(
            strip_preamble("\\begin{document} only opener"),
            "\\begin{document} only opener"
        );
    }

    #[test]
    fn test_layout_commands_removed() {
        let result = remove_layout_commands(
            "\\vspace{1cm}a\\hspace*{2pt}b\\footnote{x}c\\newpage d\\leftskip -10pt e",
        );
        assert_eq!(result, "abc d e");
    }

    #[test]
    fn test_itemsep_both_spellings_removed() {
        assert_eq!(
            remove_layout_commands("\\setlength{\\itemsep}{0pt}x\\setlength\\itemsep{1pt}y"),
            "xy"
        );
    }

    #[test]
    fn test_minipage_markers_removed() {
        assert_eq!(
            remove_layout_commands("\\begin{minipage}{0.5\\textwidth}inner\\end{minipage}"),
            "inner"
        );
    }

    #[test]
    fn test_lstlisting_fenced() {
        assert_eq!(
            convert_lstlisting("\\begin{lstlisting}[language=Python]\ncode\n\\end{lstlisting}"),
            "```\ncode\n```"
        );
    }

    #[test]
    fn test_textcolor_stripped_outside_math_only() {
        let input = "\\textcolor{red}{warning} and $\\textcolor{blue}{x}$";
        assert_eq!(
            strip_textcolor_outside_math(input),
            "warning and $\\textcolor{blue}{x}$"
        );
    }

    #[test]
    fn test_textcolor_nested_braces() {
        assert_eq!(
            strip_textcolor_outside_math("\\textcolor{red}{a \\textbf{b} c}"),
            "a \\textbf{b} c"
        );
    }

    #[test]
    fn test_textcolor_malformed_kept() {
        assert_eq!(
            strip_textcolor_outside_math("\\textcolor{red} no text arg"),
            "\\textcolor{red} no text arg"
        );
    }

    #[test]
    fn test_indentation_flattened() {
        assert_eq!(postprocess("    indented\n\ttabbed"), "indented\ntabbed");
    }

    #[test]
    fn test_blank_lines_collapsed() {
        assert_eq!(postprocess("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_round_trip_document() {
        let input = "\\section{Intro}\n\\[x^2\\]\nSee \\textbf{bold} and \\url{http://x}.";
        let result = convert(input);
        let heading = result.find("## Intro").expect("heading");
        let math = result.find("$$\nx^2\n$$").expect("display math");
        let bold = result.find("**bold**").expect("bold");
        let url = result.find("[http://x](http://x)").expect("url");
        assert!(heading < math && math < bold && bold < url);
    }

    #[test]
    fn test_frontmatter_prepended() {
        let result = convert("\\title{Series}\n\\author{Abel}\n\\begin{document}x\\end{document}");
        assert!(result.starts_with("---\ntitle: \"Series\"\nauthor: \"Abel\"\n---\n\n"));
    }

    #[test]
    fn test_box_bodies_get_list_conversion() {
        let input = "\\begin{dem_box}{T}\n\\begin{itemize}\n\\item a\n\\end{itemize}\n\\end{dem_box}";
        let result = convert(input);
        assert!(result.contains("<DemBox title=\"T\">"));
        assert!(result.contains("- a"));
        assert!(!result.contains("\\begin{itemize}"));
    }

    #[test]
    fn test_table_cells_keep_no_inline_math() {
        let input = "\\begin{tabular}{cc}\n$a$ & $b^2$ \\\\\n\\end{tabular}";
        let result = convert(input);
        assert!(result.contains("\\begin{array}{cc}"));
        assert!(!result.contains("$a$"));
        assert!(result.contains("b^2"));
    }
}
