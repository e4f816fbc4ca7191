//! Literal anchor search and fragment insertion.
//!
//! No regular expressions: anchors are plain substrings so output stays
//! byte-for-byte reproducible.

use tailpatch_types::patch::{InsertMode, PatchAnchor, SectionStatus};

/// Outcome of a single-occurrence search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorMatch<'a> {
    Found {
        prefix: &'a str,
        anchor: &'a str,
        suffix: &'a str,
    },
    NotFound,
    Ambiguous {
        count: usize,
    },
}

/// Split `content` around the only occurrence of `anchor`.
///
/// Occurrences are counted with overlap, so `"aa"` in `"aaa"` is ambiguous.
/// An empty anchor never matches.
pub fn split_unique<'a>(content: &'a str, anchor: &str) -> AnchorMatch<'a> {
    match count_occurrences(content, anchor) {
        0 => AnchorMatch::NotFound,
        1 => {
            // count_occurrences found exactly one match, so find() succeeds.
            let Some(start) = content.find(anchor) else {
                return AnchorMatch::NotFound;
            };
            let end = start + anchor.len();
            AnchorMatch::Found {
                prefix: &content[..start],
                anchor: &content[start..end],
                suffix: &content[end..],
            }
        }
        count => AnchorMatch::Ambiguous { count },
    }
}

/// Overlapping occurrence count.
pub fn count_occurrences(content: &str, anchor: &str) -> usize {
    let Some(first_char) = anchor.chars().next() else {
        return 0;
    };
    let step = first_char.len_utf8();

    let mut count = 0;
    let mut from = 0;
    while let Some(pos) = content[from..].find(anchor) {
        count += 1;
        from += pos + step;
    }
    count
}

/// The text that goes next to the anchor for `fragment`.
pub fn render_insertion(anchor: &PatchAnchor, fragment: &str) -> String {
    let delim = anchor.delimiter.as_deref().unwrap_or("");
    match anchor.mode {
        InsertMode::After => format!("\n{}{}{}", anchor.spacer, fragment, delim),
        InsertMode::Before => format!("{}{}\n{}", fragment, delim, anchor.spacer),
    }
}

/// Insert `fragment` at the unique occurrence of `anchor.text`.
///
/// On a miss the returned status is `AnchorNotFound` or `AnchorAmbiguous`
/// and no content is produced.
pub fn insert_at_anchor(
    content: &str,
    anchor: &PatchAnchor,
    fragment: &str,
) -> Result<String, SectionStatus> {
    match split_unique(content, &anchor.text) {
        AnchorMatch::Found {
            prefix,
            anchor: matched,
            suffix,
        } => {
            let insertion = render_insertion(anchor, fragment);
            let mut out = String::with_capacity(content.len() + insertion.len());
            out.push_str(prefix);
            match anchor.mode {
                InsertMode::After => {
                    out.push_str(matched);
                    out.push_str(&insertion);
                }
                InsertMode::Before => {
                    out.push_str(&insertion);
                    out.push_str(matched);
                }
            }
            out.push_str(suffix);
            Ok(out)
        }
        AnchorMatch::NotFound => Err(SectionStatus::AnchorNotFound),
        AnchorMatch::Ambiguous { count } => Err(SectionStatus::AnchorAmbiguous { count }),
    }
}
