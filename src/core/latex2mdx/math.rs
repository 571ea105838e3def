//! Math conversion for LaTeX to MDX
//!
//! Rewrites LaTeX math delimiters and environments into the `$`/`$$` pair
//! that a KaTeX pipeline renders, and applies the command substitutions KaTeX
//! needs. Math that is already canonical is protected up front so it is never
//! converted twice.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::protect::{protect_math, restore_math};
use super::utils::{scan_balanced, split_top_level_rows};

/// Environments KaTeX renders natively; they are wrapped in `$$` with their
/// own `\begin{}...\end{}` markers kept inside the delimiters.
const MATH_ENV_NAMES: [&str; 4] = ["align", "gather", "multline", "equation"];

/// Command substitutions applied inside converted documents for KaTeX
/// compatibility.
const MATH_REPLACEMENTS: [(&str, &str); 2] = [("\\mbox{", "\\text{"), ("\\;", "\\,")];

lazy_static! {
    static ref MATH_ENVS: Vec<Regex> = MATH_ENV_NAMES
        .iter()
        .map(|name| {
            Regex::new(&format!(
                r"(?s)\\begin\{{{0}\*?\}}.*?\\end\{{{0}\*?\}}",
                name
            ))
            .unwrap()
        })
        .collect();
    static ref INLINE_PAREN: Regex = Regex::new(r"(?s)\\\((.*?)\\\)").unwrap();
    static ref DISPLAY_BRACKET: Regex = Regex::new(r"(?s)\\\[(.*?)\\\]").unwrap();
    static ref TAG_CMD: Regex = Regex::new(r"\\tag\{[^}]*\}").unwrap();
    static ref LABEL_CMD: Regex = Regex::new(r"\\label\{[^}]*\}").unwrap();
    static ref EQREF_CMD: Regex = Regex::new(r"\\eqref\{[^}]*\}").unwrap();
    static ref HYPERREF_CMD: Regex = Regex::new(r"\\hyperref\[[^\]]*\]\{([^}]*)\}").unwrap();
}

/// Stateless math pass; all per-call state is on the stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct MathNormalizer;

impl MathNormalizer {
    pub fn new() -> Self {
        MathNormalizer
    }

    /// Convert every LaTeX math construct in `content` to canonical
    /// MDX/KaTeX delimiters.
    ///
    /// Environment wrapping runs before bracket-delimiter conversion so that
    /// an environment nested inside stray brackets still wraps whole.
    pub fn convert(&self, content: &str) -> String {
        let (content, spans) = protect_math(content);

        let mut content = content;
        for pattern in MATH_ENVS.iter() {
            content = pattern
                .replace_all(&content, |caps: &Captures| {
                    format!("$$\n{}\n$$", &caps[0])
                })
                .into_owned();
        }

        content = DISPLAY_BRACKET
            .replace_all(&content, |caps: &Captures| {
                format!("$$\n{}\n$$", caps[1].trim())
            })
            .into_owned();
        content = INLINE_PAREN
            .replace_all(&content, |caps: &Captures| format!("${}$", caps[1].trim()))
            .into_owned();

        for (from, to) in MATH_REPLACEMENTS {
            content = content.replace(from, to);
        }

        restore_math(content, &spans)
    }
}

/// Remove or rename equation commands KaTeX cannot render.
///
/// Runs before any math protection: these commands live inside math spans,
/// so they must be gone before the spans turn opaque.
pub fn strip_math_incompatible(content: &str) -> String {
    let content = TAG_CMD.replace_all(content, "");
    let content = LABEL_CMD.replace_all(&content, "");
    let content = EQREF_CMD.replace_all(&content, "");
    let content = HYPERREF_CMD.replace_all(&content, "${1}");
    let content = content
        .replace("\\underbracket", "\\underbrace")
        .replace("\\overbracket", "\\overbrace")
        .replace("\\Lint", "\\int");
    flatten_substack(&content)
}

/// Flatten `\substack{a\\b}` to `a, b`; KaTeX renders the stacked form badly.
///
/// Rows are split on `\\` at brace depth zero only. An unterminated
/// `\substack{` is left in place and scanning continues past it.
fn flatten_substack(content: &str) -> String {
    const MARKER: &str = "\\substack{";
    let mut out = String::with_capacity(content.len());
    let mut pos = 0usize;
    while let Some(found) = content[pos..].find(MARKER) {
        let start = pos + found;
        let arg_start = start + MARKER.len();
        match scan_balanced(content, arg_start) {
            Some((body, after)) => {
                out.push_str(&content[pos..start]);
                let rows: Vec<String> = split_top_level_rows(body)
                    .into_iter()
                    .map(|row| row.trim().to_string())
                    .filter(|row| !row.is_empty())
                    .collect();
                out.push_str(&rows.join(", "));
                pos = after;
            }
            None => {
                out.push_str(&content[pos..arg_start]);
                pos = arg_start;
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

    #[test]
    fn test_align_environment_wrapped() {
        let converter = MathNormalizer::new();
        let result = converter.convert("\\begin{align*}\nx &= y\n\\end{align*}");
        assert_eq!(result, "$$\n\\begin{align*}\nx &= y\n\\end{align*}\n$$");
    }

    #[test]
    fn test_every_math_environment_wrapped() {
        let converter = MathNormalizer::new();
        for name in ["align", "gather", "multline", "equation"] {
            let input = format!("\\begin{{{0}}}x\\end{{{0}}}", name);
            let result = converter.convert(&input);
            assert!(result.starts_with("$$\n"), "{}: {}", name, result);
            assert!(result.contains(&input), "{}: {}", name, result);
        }
    }

    #[test]
    fn test_bracket_delimiters_converted() {
        let converter = MathNormalizer::new();
        assert_eq!(converter.convert("\\[ x^2 \\]"), "$$\nx^2\n$$");
        assert_eq!(converter.convert("\\( e^x \\)"), "$e^x$");
    }

    #[test]
    fn test_existing_math_not_double_converted() {
        let converter = MathNormalizer::new();
        let input = "$$x$$ and \\[y\\]";
        assert_eq!(converter.convert(input), "$$x$$ and $$\ny\n$$");
    }

    #[test]
    fn test_katex_substitutions() {
        let converter = MathNormalizer::new();
        assert_eq!(
            converter.convert("\\(\\mbox{area}\\;x\\)"),
            "$\\text{area}\\,x$"
        );
    }

    #[test]
    fn test_substitutions_skip_protected_spans() {
        let converter = MathNormalizer::new();
        // already-canonical math is restored verbatim, substitutions included
        assert_eq!(converter.convert("$\\mbox{x}$"), "$\\mbox{x}$");
    }

    #[test]
    fn test_strip_tag_label_eqref() {
        let result = strip_math_incompatible("x \\tag{1} y \\label{eq:a} z \\eqref{eq:a}");
        assert_eq!(result, "x  y  z ");
    }

    #[test]
    fn test_hyperref_reduced_to_text() {
        assert_eq!(
            strip_math_incompatible("see \\hyperref[sec:intro]{the intro}"),
            "see the intro"
        );
    }

    #[test]
    fn test_bracket_command_renames() {
        assert_eq!(
            strip_math_incompatible("\\underbracket{x} \\overbracket{y} \\Lint_0^1"),
            "\\underbrace{x} \\overbrace{y} \\int_0^1"
        );
    }

    #[test]
    fn test_substack_flattened() {
        assert_eq!(
            strip_math_incompatible("\\sum_{\\substack{i \\\\ j}}"),
            "\\sum_{i, j}"
        );
    }

    #[test]
    fn test_substack_nested_braces() {
        assert_eq!(
            strip_math_incompatible("\\substack{i \\in \\{1,2\\} \\\\ j > 0}"),
            "i \\in \\{1,2\\}, j > 0"
        );
    }

    #[test]
    fn test_substack_unterminated_left_alone() {
        assert_eq!(
            strip_math_incompatible("\\substack{never closed"),
            "\\substack{never closed"
        );
    }
}
