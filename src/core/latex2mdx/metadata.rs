//! Metadata extraction and frontmatter generation
//!
//! Pulls `\title`, `\author` and `\date` out of the preamble and renders the
//! MDX frontmatter block. The title also feeds the slug used to name
//! generated image files.

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // one level of nested braces is enough for \title{\textbf{..} ..}
    static ref TITLE_CMD: Regex = Regex::new(r"\\title\{((?:[^{}]|\{[^}]*\})*)\}").unwrap();
    static ref AUTHOR_CMD: Regex = Regex::new(r"\\author\{([^}]+)\}").unwrap();
    static ref DATE_CMD: Regex = Regex::new(r"\\date\{([^}]+)\}").unwrap();
    static ref BOLD_WRAPPER: Regex = Regex::new(r"\\textbf\{([^}]+)\}").unwrap();
}

/// Slugs are capped so generated filenames stay manageable.
const MAX_SLUG_LEN: usize = 50;

/// Recognized document metadata. Absent fields are omitted from the
/// frontmatter, never emitted as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.date.is_none()
    }
}

/// Extract recognized metadata commands from `content`. Bold wrappers inside
/// the title are unwrapped to their plain content before storage; anything
/// unrecognized is ignored.
pub fn extract_metadata(content: &str) -> Metadata {
    let title = TITLE_CMD.captures(content).map(|caps| {
        BOLD_WRAPPER
            .replace_all(&caps[1], "${1}")
            .trim()
            .to_string()
    });
    let author = AUTHOR_CMD
        .captures(content)
        .map(|caps| caps[1].trim().to_string());
    let date = DATE_CMD
        .captures(content)
        .map(|caps| caps[1].trim().to_string());
    Metadata {
        title,
        author,
        date,
    }
}

/// Render the frontmatter block: `---` fences with one `key: "value"` line
/// per present field, in title/author/date order.
pub fn render_frontmatter(metadata: &Metadata) -> String {
    let mut out = String::from("---\n");
    let fields = [
        ("title", &metadata.title),
        ("author", &metadata.author),
        ("date", &metadata.date),
    ];
    for (key, value) in fields {
        if let Some(value) = value {
            out.push_str(&format!("{}: \"{}\"\n", key, value));
        }
    }
    out.push_str("---\n\n");
    out
}

/// Derive a filesystem-safe slug from a title.
///
/// NFKD normalization lets diacritics fall out with the dropped non-ASCII
/// characters; runs of anything non-alphanumeric collapse to single hyphens;
/// long slugs are cut back to the last hyphen inside the cap.
pub fn slugify(text: &str) -> String {
    let folded: String = text.nfkd().filter(char::is_ascii).collect();
    let mut slug = String::with_capacity(folded.len());
    let mut prev_dash = false;
    for ch in folded.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            prev_dash = false;
        } else if !prev_dash {
            slug.push('-');
            prev_dash = true;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.len() > MAX_SLUG_LEN {
        let head = &slug[..MAX_SLUG_LEN];
        match head.rfind('-') {
            Some(cut) => head[..cut].to_string(),
            None => head.to_string(),
        }
    } else {
        slug
    }
}
