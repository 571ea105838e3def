//! Callout box conversion
//!
//! Course documents wrap theorems, proofs and examples in custom `*_box`
//! environments taking a brace-delimited title. Each becomes a tagged MDX
//! container with the title as an attribute. Boxes nest (a proof box inside a
//! theorem box), so bodies convert depth-first: the innermost box is finished
//! before an outer box treats its body as final content.

use lazy_static::lazy_static;
use phf::phf_map;
use regex::Regex;

use super::utils::scan_balanced;
use super::ConversionWarning;

/// Known box environments and their MDX container tags.
static BOX_TAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "dem_box" => "DemBox",
    "ejem_box" => "EjemBox",
    "ej_box" => "EjBox",
};

/// Tag for `*_box` environments without a dedicated mapping.
const DEFAULT_BOX_TAG: &str = "Box";

lazy_static! {
    static ref BOX_BEGIN: Regex = Regex::new(r"\\begin\{(\w+_box)\}").unwrap();
}

/// Recursive box rewriting pass, bounded by a maximum depth that also caps
/// re-runs over the whole document.
#[derive(Debug, Clone, Copy)]
pub struct BoxNormalizer {
    max_depth: usize,
}

impl BoxNormalizer {
    pub fn new(max_depth: usize) -> Self {
        BoxNormalizer { max_depth }
    }

    /// Convert every `*_box` environment in `content` to a tagged container.
    ///
    /// `processor` runs over each box body after nested boxes have been
    /// converted and before the body is substituted; the pipeline passes list
    /// conversion. A box with no closing marker is left untouched.
    pub fn convert<F>(&self, content: &str, processor: &F) -> (String, Vec<ConversionWarning>)
    where
        F: Fn(&str) -> String,
    {
        let mut current = content.to_string();
        let mut warnings = Vec::new();
        let mut rounds = 0usize;
        loop {
            if !BOX_BEGIN.is_match(&current) {
                break;
            }
            if rounds >= self.max_depth {
                log::warn!("box conversion stopped after {} passes", rounds);
                warnings.push(ConversionWarning::iteration_limit("box conversion"));
                break;
            }
            let mut pass_warnings = Vec::new();
            let next = self.convert_pass(&current, processor, 0, &mut pass_warnings);
            let stable = next == current;
            current = next;
            rounds += 1;
            if stable {
                // whatever is left will stay; keep its diagnostics
                warnings.extend(pass_warnings);
                break;
            }
        }
        (current, warnings)
    }

    fn convert_pass<F>(
        &self,
        content: &str,
        processor: &F,
        depth: usize,
        warnings: &mut Vec<ConversionWarning>,
    ) -> String
    where
        F: Fn(&str) -> String,
    {
        if depth >= self.max_depth {
            return content.to_string();
        }
        let mut out = String::with_capacity(content.len());
        let mut pos = 0usize;
        while let Some(caps) = BOX_BEGIN.captures_at(content, pos) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let name = name.as_str();
            let after_begin = whole.end();

            if content.as_bytes().get(after_begin) != Some(&b'{') {
                // a box without a title argument is not ours to rewrite
                out.push_str(&content[pos..after_begin]);
                pos = after_begin;
                continue;
            }
            let Some((title, after_title)) = scan_balanced(content, after_begin + 1) else {
                out.push_str(&content[pos..after_begin]);
                pos = after_begin;
                continue;
            };

            let end_marker = format!("\\end{{{}}}", name);
            let Some(end_rel) = content[after_title..].find(&end_marker) else {
                warnings.push(ConversionWarning::unterminated_environment(name));
                out.push_str(&content[pos..after_title]);
                pos = after_title;
                continue;
            };

            let body = &content[after_title..after_title + end_rel];
            let after_end = after_title + end_rel + end_marker.len();

            let inner = self.convert_pass(body, processor, depth + 1, warnings);
            let inner = processor(&inner);
            let tag = BOX_TAGS.get(name).copied().unwrap_or(DEFAULT_BOX_TAG);
            let title = html_escape::encode_double_quoted_attribute(title);

            out.push_str(&content[pos..whole.start()]);
            out.push_str(&format!(
                "<{} title=\"{}\">\n\n{}\n\n</{}>",
                tag,
                title,
                inner.trim(),
                tag
            ));
            pos = after_end;
        }
        out.push_str(&content[pos..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn convert(content: &str) -> (String, Vec<ConversionWarning>) {
        BoxNormalizer::new(8).convert(content, &|body: &str| body.to_string())
    }

    #[test]
    fn test_simple_box() {
        let (result, warnings) =
            convert("\\begin{dem_box}{Proof of 1.2}\nbody text\n\\end{dem_box}");
        assert_eq!(
            result,
            "<DemBox title=\"Proof of 1.2\">\n\nbody text\n\n</DemBox>"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_family_member_gets_default_tag() {
        let (result, _) = convert("\\begin{teo_box}{T}\nx\n\\end{teo_box}");
        assert!(result.starts_with("<Box title=\"T\">"));
        assert!(result.ends_with("</Box>"));
    }

    #[test]
    fn test_nested_boxes_convert_innermost_first() {
        let input = "\\begin{dem_box}{Outer}\nbefore\n\\begin{ejem_box}{Inner}\ndeep\n\\end{ejem_box}\nafter\n\\end{dem_box}";
        let (result, _) = convert(input);
        assert!(result.starts_with("<DemBox title=\"Outer\">"));
        assert!(result.contains("<EjemBox title=\"Inner\">\n\ndeep\n\n</EjemBox>"));
        assert!(result.ends_with("</DemBox>"));
        assert!(!result.contains("\\begin{ejem_box}"));
    }

    #[test]
    fn test_sequential_same_name_boxes() {
        let input = "\\begin{ej_box}{1}\na\n\\end{ej_box}\ntext\n\\begin{ej_box}{2}\nb\n\\end{ej_box}";
        let (result, _) = convert(input);
        assert_eq!(
            result,
            "<EjBox title=\"1\">\n\na\n\n</EjBox>\ntext\n<EjBox title=\"2\">\n\nb\n\n</EjBox>"
        );
    }

    #[test]
    fn test_title_with_escaped_braces() {
        let (result, _) = convert("\\begin{dem_box}{A \\{nested\\} B}\nx\n\\end{dem_box}");
        assert!(result.contains("title=\"A \\{nested\\} B\""));
    }

    #[test]
    fn test_title_quotes_escaped() {
        let (result, _) = convert("\\begin{dem_box}{say \"hi\"}\nx\n\\end{dem_box}");
        assert!(result.contains("title=\"say &quot;hi&quot;\""));
    }

    #[test]
    fn test_unterminated_box_left_untouched() {
        let input = "\\begin{dem_box}{T}\ntrailing content stays";
        let (result, warnings) = convert(input);
        assert_eq!(result, input);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].location.as_deref(), Some("dem_box"));
    }

    #[test]
    fn test_body_processor_applied() {
        let (result, _) = BoxNormalizer::new(8).convert(
            "\\begin{dem_box}{T}\nraw\n\\end{dem_box}",
            &|body: &str| body.replace("raw", "cooked"),
        );
        assert!(result.contains("cooked"));
    }

    #[test]
    fn test_missing_title_argument_skipped() {
        let input = "\\begin{dem_box}\nno title here\n\\end{dem_box}";
        let (result, _) = convert(input);
        assert_eq!(result, input);
    }
}
