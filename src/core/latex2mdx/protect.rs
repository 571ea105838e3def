//! Math span protection
//!
//! Passes that rewrite document structure must not touch math content, and
//! math passes must not re-convert math that is already canonical. Both use
//! the same protocol: delimited math spans are swapped for opaque placeholder
//! tokens before the pass and swapped back afterwards, verbatim.
//!
//! Display spans (`$$...$$`) are matched before inline spans (`$...$`);
//! otherwise the dollars of a display pair would be mis-read as inline
//! delimiters.

const PLACEHOLDER_PREFIX: &str = "__TEXMDX_MATH_";
const PLACEHOLDER_SUFFIX: &str = "__";

fn placeholder(index: usize) -> String {
    format!("{}{}{}", PLACEHOLDER_PREFIX, index, PLACEHOLDER_SUFFIX)
}

/// Replace every delimited math span with a placeholder token.
///
/// Returns the guarded text and the removed spans in creation order,
/// delimiters included. After this call the guarded text contains no
/// unescaped `$` (well-formed input assumed; a stray unmatched `$` is copied
/// through untouched rather than swallowing the rest of the document).
pub fn protect_math(input: &str) -> (String, Vec<String>) {
    let mut spans = Vec::new();
    let guarded = protect_display(input, &mut spans);
    let guarded = protect_inline(&guarded, &mut spans);
    (guarded, spans)
}

/// Put the protected spans back, in index order, each exactly once.
///
/// Idempotent when no placeholders remain in `content`.
pub fn restore_math(content: String, spans: &[String]) -> String {
    let mut content = content;
    for (index, span) in spans.iter().enumerate() {
        let token = placeholder(index);
        if let Some(at) = content.find(&token) {
            content.replace_range(at..at + token.len(), span);
        }
    }
    content
}

fn protect_display(input: &str, spans: &mut Vec<String>) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(input.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                out.push(b'\\');
                i += 1;
                if i < bytes.len() {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b'$' if i + 1 < bytes.len() && bytes[i + 1] == b'$' => {
                match find_display_close(bytes, i + 2) {
                    Some(close) => {
                        out.extend_from_slice(placeholder(spans.len()).as_bytes());
                        spans.push(input[i..close + 2].to_string());
                        i = close + 2;
                    }
                    None => {
                        // unterminated display pair, copy and move on
                        out.extend_from_slice(b"$$");
                        i += 2;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

/// Find the index of the closing `$$` of a display span, scanning from
/// `from`. A `\\` line break just before the closing pair is part of the
/// span, as are escaped dollars.
fn find_display_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'$' if j + 1 < bytes.len() && bytes[j + 1] == b'$' => return Some(j),
            _ => j += 1,
        }
    }
    None
}

fn protect_inline(input: &str, spans: &mut Vec<String>) -> String {
    let bytes = input.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(input.len());
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                out.push(b'\\');
                i += 1;
                if i < bytes.len() {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b'$' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'$' {
                    // leftover display remnant, not an inline span
                    out.extend_from_slice(b"$$");
                    i += 2;
                    continue;
                }
                match find_inline_close(bytes, i + 1) {
                    Some(close) => {
                        out.extend_from_slice(placeholder(spans.len()).as_bytes());
                        spans.push(input[i..close + 1].to_string());
                        i = close + 1;
                    }
                    None => {
                        out.push(b'$');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).unwrap_or_else(|_| input.to_string())
}

/// Find the closing `$` of an inline span. The content may not contain an
/// unescaped `$`, and the closing dollar may not be doubled, so the first
/// unescaped `$` either closes the span or rules the match out.
fn find_inline_close(bytes: &[u8], from: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'$' => {
                if j + 1 < bytes.len() && bytes[j + 1] == b'$' {
                    return None;
                }
                return Some(j);
            }
            _ => j += 1,
        }
    }
    None
}
