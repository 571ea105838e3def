//! Structural markup conversion for LaTeX to MDX
//!
//! Sectioning, text emphasis, lists, tables, images and links. Every pass in
//! this module runs with math spans protected; the only exception is table
//! conversion, which the pipeline calls before any protection because table
//! cells carry inline math that must dissolve into the emitted array block.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::protect::{protect_math, restore_math};
use super::utils::scan_balanced;
use super::ConversionWarning;

lazy_static! {
    static ref SECTION: Regex = Regex::new(r"\\section\*?\{([^}]+)\}").unwrap();
    static ref SUBSECTION: Regex = Regex::new(r"\\subsection\*?\{([^}]+)\}").unwrap();
    static ref SUBSUBSECTION: Regex = Regex::new(r"\\subsubsection\*?\{([^}]+)\}").unwrap();
    static ref TEXTBF: Regex = Regex::new(r"\\textbf\{([^}]+)\}").unwrap();
    static ref TEXTIT: Regex = Regex::new(r"\\textit\{([^}]+)\}").unwrap();
    static ref EMPH: Regex = Regex::new(r"\\emph\{([^}]+)\}").unwrap();
    static ref UNDERLINE: Regex = Regex::new(r"\\underline\{([^}]+)\}").unwrap();
    static ref CENTER_ENV: Regex =
        Regex::new(r"(?s)\\begin\{center\}(.*?)\\end\{center\}").unwrap();
    static ref TABULAR_ENV: Regex =
        Regex::new(r"(?s)\\begin\{tabular\}(\{[^}]*\})(.*?)\\end\{tabular\}").unwrap();
    static ref CENTER_TABULAR: Regex = Regex::new(
        r"(?s)\\begin\{center\}\s*\\begin\{tabular\}(\{[^}]*\})(.*?)\\end\{tabular\}\s*\\end\{center\}"
    )
    .unwrap();
    static ref INCLUDEGRAPHICS: Regex =
        Regex::new(r"\\includegraphics(?:\[[^\]]*\])?\{([^}]+)\}").unwrap();
    static ref URL_CMD: Regex = Regex::new(r"\\url\{([^}]+)\}").unwrap();
    static ref HREF_CMD: Regex = Regex::new(r"\\href\{([^}]+)\}\{([^}]+)\}").unwrap();
    static ref NOINDENT: Regex = Regex::new(r"\\noindent\s*").unwrap();
    static ref NEWPAGE: Regex = Regex::new(r"\\newpage\s*").unwrap();
    static ref MAKETITLE: Regex = Regex::new(r"\\maketitle\s*").unwrap();
    static ref TABLEOFCONTENTS: Regex = Regex::new(r"\\tableofcontents\s*").unwrap();
    static ref HYPERSETUP: Regex = Regex::new(r"\\hypersetup\{[^}]*\}\s*").unwrap();
    static ref NO_BACKGROUND: Regex = Regex::new(r"(?i)\\NoBgThispage\s*").unwrap();
}

#[derive(Clone, Copy)]
enum ListStyle {
    Bullet,
    Ordered,
}

impl ListStyle {
    fn begin_marker(&self) -> &'static str {
        match self {
            ListStyle::Bullet => "\\begin{itemize}",
            ListStyle::Ordered => "\\begin{enumerate}",
        }
    }

    fn end_marker(&self) -> &'static str {
        match self {
            ListStyle::Bullet => "\\end{itemize}",
            ListStyle::Ordered => "\\end{enumerate}",
        }
    }
}

/// Structural rewriting pass. Holds only its iteration bound; compiled
/// patterns are module-level statics built once.
#[derive(Debug, Clone, Copy)]
pub struct StructureNormalizer {
    max_list_iterations: usize,
}

impl StructureNormalizer {
    pub fn new(max_list_iterations: usize) -> Self {
        StructureNormalizer {
            max_list_iterations,
        }
    }

    /// Convert all structural markup in `content`, math protected throughout.
    pub fn convert(&self, content: &str) -> (String, Vec<ConversionWarning>) {
        let (content, spans) = protect_math(content);

        let content = resolve_texorpdfstring(&content);
        let content = unwrap_center(&content);
        let content = convert_sections(&content);
        let content = convert_text_formatting(&content);
        let (content, warnings) = self.convert_lists(&content);
        let content = convert_images_and_urls(&content);
        let content = remove_presentation_commands(&content);

        (restore_math(content, &spans), warnings)
    }

    /// Convert `itemize`/`enumerate` environments to Markdown lists.
    ///
    /// Environments convert innermost-first, one per step, until none
    /// remains, so an outer list only ever sees a settled body. The loop is
    /// bounded by the configured iteration count.
    pub fn convert_lists(&self, content: &str) -> (String, Vec<ConversionWarning>) {
        let mut content = content.to_string();
        let mut warnings = Vec::new();
        let mut iterations = 0usize;
        while let Some(next) = convert_innermost_list(&content) {
            content = next;
            iterations += 1;
            if iterations >= self.max_list_iterations {
                log::warn!(
                    "list conversion stopped after {} environments",
                    iterations
                );
                warnings.push(ConversionWarning::iteration_limit("list conversion"));
                break;
            }
        }

        // unmatched markers from malformed nesting
        let content = content
            .replace("\\begin{itemize}", "")
            .replace("\\end{itemize}", "")
            .replace("\\begin{enumerate}", "")
            .replace("\\end{enumerate}", "");
        (content, warnings)
    }
}

/// Convert the innermost complete list environment: the one whose `\end`
/// marker comes first in the document, paired with the nearest preceding
/// `\begin` of the same kind. Returns `None` when no complete environment
/// remains; an `\end` with no matching `\begin` is skipped over.
fn convert_innermost_list(content: &str) -> Option<String> {
    let mut search_from = 0usize;
    loop {
        let bullet_end = content[search_from..]
            .find(ListStyle::Bullet.end_marker())
            .map(|at| (search_from + at, ListStyle::Bullet));
        let ordered_end = content[search_from..]
            .find(ListStyle::Ordered.end_marker())
            .map(|at| (search_from + at, ListStyle::Ordered));
        let (end_at, style) = match (bullet_end, ordered_end) {
            (Some(bullet), Some(ordered)) => {
                if bullet.0 <= ordered.0 {
                    bullet
                } else {
                    ordered
                }
            }
            (Some(bullet), None) => bullet,
            (None, Some(ordered)) => ordered,
            (None, None) => return None,
        };
        match content[..end_at].rfind(style.begin_marker()) {
            Some(begin_at) => {
                let body = &content[begin_at + style.begin_marker().len()..end_at];
                let mut next = String::with_capacity(content.len());
                next.push_str(&content[..begin_at]);
                next.push_str(&render_items(body, style));
                next.push_str(&content[end_at + style.end_marker().len()..]);
                return Some(next);
            }
            None => search_from = end_at + style.end_marker().len(),
        }
    }
}

/// Convert `tabular` environments to a display-math `array` block.
///
/// Must run before math protection: cell text carries inline delimiters that
/// are stripped here, since the whole table becomes one math block. The
/// column-spec argument is preserved verbatim.
pub fn convert_tabular_to_array(content: &str) -> String {
    let content = CENTER_TABULAR.replace_all(content, |caps: &Captures| {
        render_array(&caps[1], &caps[2])
    });
    TABULAR_ENV
        .replace_all(&content, |caps: &Captures| render_array(&caps[1], &caps[2]))
        .into_owned()
}

fn render_array(column_spec: &str, body: &str) -> String {
    let body = body.replace('$', "").replace("\\(", "").replace("\\)", "");
    format!(
        "\n$$\n\\begin{{array}}{}{}\\end{{array}}\n$$\n",
        column_spec, body
    )
}

/// Resolve `\texorpdfstring{tex}{plain}` to its first argument, both
/// arguments brace-balanced. Malformed occurrences are left in place.
fn resolve_texorpdfstring(content: &str) -> String {
    const MARKER: &str = "\\texorpdfstring";
    let mut out = String::with_capacity(content.len());
    let mut pos = 0usize;
    while let Some(found) = content[pos..].find(MARKER) {
        let start = pos + found;
        let first_arg = start + MARKER.len();
        let parsed = if content.as_bytes().get(first_arg) == Some(&b'{') {
            scan_balanced(content, first_arg + 1).and_then(|(tex, after_tex)| {
                if content.as_bytes().get(after_tex) == Some(&b'{') {
                    scan_balanced(content, after_tex + 1).map(|(_, after_plain)| (tex, after_plain))
                } else {
                    None
                }
            })
        } else {
            None
        };
        match parsed {
            Some((tex, after)) => {
                out.push_str(&content[pos..start]);
                out.push_str(tex);
                pos = after;
            }
            None => {
                out.push_str(&content[pos..first_arg]);
                pos = first_arg;
            }
        }
    }
    out.push_str(&content[pos..]);
    out
}

fn unwrap_center(content: &str) -> String {
    CENTER_ENV
        .replace_all(content, |caps: &Captures| {
            format!("\n{}\n", caps[1].trim())
        })
        .into_owned()
}

fn convert_sections(content: &str) -> String {
    let content = SECTION.replace_all(content, "## ${1}");
    let content = SUBSECTION.replace_all(&content, "### ${1}");
    SUBSUBSECTION.replace_all(&content, "#### ${1}").into_owned()
}

fn convert_text_formatting(content: &str) -> String {
    let content = TEXTBF.replace_all(content, "**${1}**");
    let content = TEXTIT.replace_all(&content, "*${1}*");
    let content = EMPH.replace_all(&content, "*${1}*");
    UNDERLINE
        .replace_all(&content, "<u>${1}</u>")
        .into_owned()
}

fn convert_images_and_urls(content: &str) -> String {
    let content = INCLUDEGRAPHICS.replace_all(content, "![](${1})");
    let content = URL_CMD.replace_all(&content, "[${1}](${1})");
    HREF_CMD.replace_all(&content, "[${2}](${1})").into_owned()
}

fn remove_presentation_commands(content: &str) -> String {
    let content = NOINDENT.replace_all(content, "");
    let content = NEWPAGE.replace_all(&content, "\n\n");
    let content = MAKETITLE.replace_all(&content, "");
    let content = TABLEOFCONTENTS.replace_all(&content, "");
    let content = HYPERSETUP.replace_all(&content, "");
    let content = NO_BACKGROUND.replace_all(&content, "");
    content
        .replace("\\begin{center}", "")
        .replace("\\end{center}", "")
}

fn render_items(items_text: &str, style: ListStyle) -> String {
    let mut lines = Vec::new();
    let mut ordinal = 1usize;
    for (label, body) in split_items(items_text) {
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        match label {
            // explicit labels win over the list's own numbering
            Some(label) => lines.push(format!("- **{}** {}", label, body)),
            None => match style {
                ListStyle::Bullet => lines.push(format!("- {}", body)),
                ListStyle::Ordered => {
                    lines.push(format!("{}. {}", ordinal, body));
                    ordinal += 1;
                }
            },
        }
    }
    if lines.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", lines.join("\n"))
    }
}

/// Split a list-environment body into `(label, body)` items on `\item`
/// boundaries. Text before the first `\item` is dropped.
fn split_items(text: &str) -> Vec<(Option<String>, String)> {
    let positions = item_positions(text);
    let mut items = Vec::new();
    for (index, &start) in positions.iter().enumerate() {
        let end = positions.get(index + 1).copied().unwrap_or(text.len());
        let mut cursor = start + "\\item".len();
        let mut label = None;
        if text.as_bytes().get(cursor) == Some(&b'[') {
            if let Some(close) = text[cursor + 1..end].find(']') {
                label = Some(text[cursor + 1..cursor + 1 + close].to_string());
                cursor += close + 2;
            }
        }
        items.push((label, text[cursor..end].to_string()));
    }
    items
}

fn item_positions(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut positions = Vec::new();
    let mut pos = 0usize;
    while let Some(found) = text[pos..].find("\\item") {
        let at = pos + found;
        let after = at + "\\item".len();
        // \itemsep and friends are longer commands, not item markers
        if bytes.get(after).map_or(true, |b| !b.is_ascii_alphabetic()) {
            positions.push(at);
        }
        pos = after;
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalizer() -> StructureNormalizer {
        StructureNormalizer::new(10)
    }

    #[test]
    fn test_sections_to_headings() {
        let (result, _) = normalizer().convert(
            "\\section{One}\n\\subsection*{Two}\n\\subsubsection{Three}",
        );
        assert_eq!(result, "## One\n### Two\n#### Three");
    }

    #[test]
    fn test_text_formatting() {
        let (result, _) =
            normalizer().convert("\\textbf{b} \\textit{i} \\emph{e} \\underline{u}");
        assert_eq!(result, "**b** *i* *e* <u>u</u>");
    }

    #[test]
    fn test_math_untouched_during_structure_pass() {
        let (result, _) = normalizer().convert("$\\textbf{not bold}$ but \\textbf{bold}");
        assert_eq!(result, "$\\textbf{not bold}$ but **bold**");
    }

    #[test]
    fn test_texorpdfstring_keeps_first_argument() {
        let (result, _) =
            normalizer().convert("\\section{\\texorpdfstring{$L^2$}{L2} spaces}");
        assert_eq!(result, "## $L^2$ spaces");
    }

    #[test]
    fn test_texorpdfstring_malformed_left_alone() {
        let (result, _) = normalizer().convert("\\texorpdfstring{open");
        assert_eq!(result, "\\texorpdfstring{open");
    }

    #[test]
    fn test_itemize_to_bullets() {
        let (result, _) = normalizer()
            .convert("\\begin{itemize}\n\\item uno\n\\item dos\n\\end{itemize}");
        assert_eq!(result, "\n- uno\n- dos\n");
    }

    #[test]
    fn test_enumerate_ordinals_skip_labeled_items() {
        let input = "\\begin{enumerate}\n\\item first\n\\item[Def.] labeled\n\\item second\n\\end{enumerate}";
        let (result, _) = normalizer().convert(input);
        assert_eq!(result, "\n1. first\n- **Def.** labeled\n2. second\n");
    }

    #[test]
    fn test_empty_items_dropped() {
        let (result, _) =
            normalizer().convert("\\begin{itemize}\n\\item\n\\item kept\n\\end{itemize}");
        assert_eq!(result, "\n- kept\n");
    }

    #[test]
    fn test_nested_lists_settle() {
        let input = "\\begin{itemize}\\item outer \\begin{itemize}\\item inner\\end{itemize}\\end{itemize}";
        let (result, _) = normalizer().convert(input);
        assert!(!result.contains("\\begin{itemize}"));
        assert!(!result.contains("\\end{itemize}"));
        assert!(result.contains("inner"));
        assert!(result.contains("outer"));
    }

    #[test]
    fn test_images_and_links() {
        let (result, _) = normalizer().convert(
            "\\includegraphics[width=2cm]{fig.png} \\url{http://x} \\href{http://y}{site}",
        );
        assert_eq!(result, "![](fig.png) [http://x](http://x) [site](http://y)");
    }

    #[test]
    fn test_presentation_commands_removed() {
        let (result, _) =
            normalizer().convert("\\noindent\\maketitle\\tableofcontents\\nobgthispage text");
        assert_eq!(result, "text");
    }

    #[test]
    fn test_center_unwrapped() {
        let (result, _) = normalizer().convert("\\begin{center}\nhello\n\\end{center}");
        assert_eq!(result.trim(), "hello");
    }

    #[test]
    fn test_tabular_to_array_strips_inline_math() {
        let input = "\\begin{tabular}{cc}\n$a$ & $b$ \\\\\n\\end{tabular}";
        let result = convert_tabular_to_array(input);
        assert!(result.contains("\\begin{array}{cc}"));
        assert!(result.contains("$$"));
        assert!(!result.contains("$a$"));
        assert!(result.contains("a & b"));
    }

    #[test]
    fn test_center_tabular_collapses_to_one_block() {
        let input = "\\begin{center}\\begin{tabular}{c|c}1 & 2\\end{tabular}\\end{center}";
        let result = convert_tabular_to_array(input);
        assert!(!result.contains("center"));
        assert!(result.contains("\\begin{array}{c|c}"));
    }

    #[test]
    fn test_itemsep_is_not_an_item() {
        assert_eq!(item_positions("\\itemsep stuff \\item real"), vec![15]);
    }
}
