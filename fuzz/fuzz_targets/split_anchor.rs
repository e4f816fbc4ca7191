#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tailpatch_edit::{AnchorMatch, count_occurrences, insert_at_anchor, split_unique};
use tailpatch_types::patch::PatchAnchor;

#[derive(Debug, Arbitrary)]
struct Input {
    content: String,
    anchor: String,
    fragment: String,
    after: bool,
}

fuzz_target!(|input: Input| {
    match split_unique(&input.content, &input.anchor) {
        AnchorMatch::Found {
            prefix,
            anchor,
            suffix,
        } => {
            assert_eq!(format!("{prefix}{anchor}{suffix}"), input.content);
            assert_eq!(count_occurrences(&input.content, &input.anchor), 1);
        }
        AnchorMatch::Ambiguous { count } => assert!(count >= 2),
        AnchorMatch::NotFound => {
            assert!(input.anchor.is_empty() || !input.content.contains(&input.anchor))
        }
    }

    let anchor = if input.after {
        PatchAnchor::after(input.anchor.as_str())
    } else {
        PatchAnchor::before(input.anchor.as_str())
    };
    if let Ok(out) = insert_at_anchor(&input.content, &anchor, &input.fragment) {
        assert!(out.len() > input.content.len() || input.fragment.is_empty());
        assert!(out.contains(&input.fragment));
    }
});
