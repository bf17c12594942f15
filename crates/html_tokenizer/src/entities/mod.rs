//! Named character reference decoder.
//!
//! The reference table is packed into one contiguous `u16` array encoding a
//! trie, assembled once at startup. The array layout is private to this
//! module; the tokenizer only sees the walk: one node per code point, with
//! the most recent terminal match recorded so overshoot can be rewound.
//!
//! Node layout, one node per slice of words:
//! - word 0: header — bits 14..16 hold the value length in UTF-16 code units
//!   (0, 1 or 2), bits 0..14 hold the branch count;
//! - `value_len` words: the value, UTF-16 encoded (two units are either a
//!   surrogate pair or two scalar values);
//! - `branch_count` words: branch keys, sorted ascending;
//! - `branch_count` words: branch targets (word index of the child node).

use std::collections::BTreeMap;
use std::sync::LazyLock;

mod table;

use table::NAMED_REFS;

const VALUE_LEN_SHIFT: u16 = 14;
const BRANCH_COUNT_MASK: u16 = (1 << VALUE_LEN_SHIFT) - 1;

static DECODE_TRIE: LazyLock<Vec<u16>> = LazyLock::new(|| build_trie(NAMED_REFS));

/// A recorded terminal match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NamedMatch {
    units: [u16; 2],
    unit_len: u8,
    /// Code points of the name this match spans, counted from the first code
    /// point after `&`.
    pub consumed: usize,
    /// The match did not end on `;` (legacy reference).
    pub without_semicolon: bool,
}

impl NamedMatch {
    /// Append the decoded value (one or two code points).
    pub fn push_value_onto(&self, out: &mut String) {
        for decoded in char::decode_utf16(self.units[..usize::from(self.unit_len)].iter().copied())
        {
            match decoded {
                Ok(ch) => out.push(ch),
                Err(_) => unreachable!("trie values are well-formed UTF-16"),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WalkStep {
    /// The walk descended one node; feed the next code point.
    Advanced,
    /// The walk ended; consult `rewind()` and `into_match()`.
    Done,
}

/// Incremental walk over the packed trie, fed one code point at a time by the
/// named-character-reference state.
#[derive(Debug)]
pub(crate) struct NamedWalker {
    node: usize,
    consumed: usize,
    /// Code points consumed past the most recent terminal match.
    excess: usize,
    best: Option<NamedMatch>,
    rewind: usize,
    done: bool,
}

impl NamedWalker {
    pub fn new() -> Self {
        Self {
            node: 0,
            consumed: 0,
            excess: 0,
            best: None,
            rewind: 0,
            done: false,
        }
    }

    pub fn step(&mut self, ch: char) -> WalkStep {
        debug_assert!(!self.done, "walker stepped after completion");
        let trie: &[u16] = &DECODE_TRIE;
        self.consumed += 1;
        let Some(child) = determine_branch(trie, self.node, ch) else {
            // The miss code point is an over-read on top of any excess.
            self.rewind = self.excess + 1;
            self.done = true;
            return WalkStep::Done;
        };
        self.node = child;
        self.excess += 1;

        let header = trie[child];
        let value_len = usize::from(header >> VALUE_LEN_SHIFT);
        let branch_count = usize::from(header & BRANCH_COUNT_MASK);
        if value_len > 0 {
            let mut units = [0u16; 2];
            units[..value_len].copy_from_slice(&trie[child + 1..child + 1 + value_len]);
            self.best = Some(NamedMatch {
                units,
                unit_len: value_len as u8,
                consumed: self.consumed,
                without_semicolon: ch != ';',
            });
            self.excess = 0;
            if branch_count == 0 {
                self.rewind = 0;
                self.done = true;
                return WalkStep::Done;
            }
        }
        WalkStep::Advanced
    }

    /// End the walk without a miss code point (end of input reached).
    pub fn finish_at_end_of_input(&mut self) {
        debug_assert!(!self.done, "walker finished after completion");
        self.rewind = self.excess;
        self.done = true;
    }

    /// Code points to rewind so the cursor lands just past the match (or back
    /// at the start when nothing matched). Valid once the walk is done.
    pub fn rewind(&self) -> usize {
        debug_assert!(self.done, "rewind queried before completion");
        self.rewind
    }

    pub fn into_match(self) -> Option<NamedMatch> {
        debug_assert!(self.done, "match queried before completion");
        self.best
    }
}

fn determine_branch(trie: &[u16], node: usize, ch: char) -> Option<usize> {
    // Reference names are ASCII; anything outside the BMP cannot match.
    let key = u16::try_from(u32::from(ch)).ok()?;
    let header = trie[node];
    let value_len = usize::from(header >> VALUE_LEN_SHIFT);
    let branch_count = usize::from(header & BRANCH_COUNT_MASK);
    let keys_at = node + 1 + value_len;
    let keys = &trie[keys_at..keys_at + branch_count];
    let pos = keys.binary_search(&key).ok()?;
    Some(usize::from(trie[keys_at + branch_count + pos]))
}

#[derive(Default)]
struct BuildNode {
    value: Option<&'static str>,
    children: BTreeMap<u16, BuildNode>,
}

fn build_trie(refs: &[(&'static str, &'static str)]) -> Vec<u16> {
    let mut root = BuildNode::default();
    for &(name, value) in refs {
        debug_assert!(
            name.is_ascii() && !name.is_empty(),
            "reference names are non-empty ASCII: {name:?}"
        );
        let mut node = &mut root;
        for byte in name.bytes() {
            node = node.children.entry(u16::from(byte)).or_default();
        }
        assert!(
            node.value.replace(value).is_none(),
            "duplicate named reference {name:?}"
        );
    }
    let mut out = Vec::new();
    emit_node(&root, &mut out);
    out
}

fn emit_node(node: &BuildNode, out: &mut Vec<u16>) -> u16 {
    let at = u16::try_from(out.len()).expect("packed trie exceeds u16 addressing");
    let units: Vec<u16> = node
        .value
        .map(|v| v.encode_utf16().collect())
        .unwrap_or_default();
    assert!(units.len() <= 2, "reference value wider than two UTF-16 units");
    let branch_count = node.children.len();
    assert!(
        branch_count <= usize::from(BRANCH_COUNT_MASK),
        "branch count does not fit the header"
    );
    out.push(((units.len() as u16) << VALUE_LEN_SHIFT) | branch_count as u16);
    out.extend_from_slice(&units);
    for &key in node.children.keys() {
        out.push(key);
    }
    let targets_at = out.len();
    out.extend(std::iter::repeat_n(0, branch_count));
    for (i, child) in node.children.values().enumerate() {
        let child_at = emit_node(child, out);
        out[targets_at + i] = child_at;
    }
    at
}

#[cfg(test)]
mod tests {
    use super::{NamedWalker, WalkStep, table::NAMED_REFS};

    /// Feed `input` to a fresh walker; returns the decoded value (if any),
    /// the code points kept after rewinding, and the rewind itself.
    fn walk(input: &str) -> (Option<String>, usize, usize) {
        let mut walker = NamedWalker::new();
        let mut fed = 0usize;
        let mut ended_early = true;
        for ch in input.chars() {
            fed += 1;
            if walker.step(ch) == WalkStep::Done {
                ended_early = false;
                break;
            }
        }
        if ended_early {
            walker.finish_at_end_of_input();
        }
        let rewind = walker.rewind();
        let kept = fed - rewind;
        let value = walker.into_match().map(|m| {
            let mut s = String::new();
            m.push_value_onto(&mut s);
            s
        });
        (value, kept, rewind)
    }

    #[test]
    fn every_table_entry_decodes_to_its_value() {
        for &(name, value) in NAMED_REFS {
            // A space can never extend a reference name, so it is a safe
            // terminator for the semicolon-less entries.
            let input = format!("{name} ");
            let (decoded, kept, _) = walk(&input);
            assert_eq!(decoded.as_deref(), Some(value), "entry {name:?}");
            assert_eq!(kept, name.chars().count(), "entry {name:?}");
        }
    }

    #[test]
    fn semicolon_terminated_names_end_on_a_leaf() {
        let (decoded, kept, rewind) = walk("amp;");
        assert_eq!(decoded.as_deref(), Some("&"));
        assert_eq!(kept, 4);
        assert_eq!(rewind, 0);
    }

    #[test]
    fn legacy_prefix_match_rewinds_the_tail() {
        // "notit;" walks not -> noti (alive via notin;) -> miss at the second t.
        let (decoded, kept, rewind) = walk("notit;");
        assert_eq!(decoded.as_deref(), Some("\u{00AC}"));
        assert_eq!(kept, 3);
        assert_eq!(rewind, 2);
    }

    #[test]
    fn longer_match_wins_over_legacy_prefix() {
        let (decoded, kept, _) = walk("notin;x");
        assert_eq!(decoded.as_deref(), Some("\u{2209}"));
        assert_eq!(kept, 6);
    }

    #[test]
    fn unmatched_name_rewinds_everything() {
        let (decoded, kept, _) = walk("xyz;");
        assert_eq!(decoded, None);
        assert_eq!(kept, 0);
    }

    #[test]
    fn miss_on_the_first_code_point_is_a_clean_rewind() {
        let (decoded, kept, rewind) = walk("!");
        assert_eq!(decoded, None);
        assert_eq!(kept, 0);
        assert_eq!(rewind, 1);
    }

    #[test]
    fn end_of_input_mid_walk_keeps_the_recorded_match() {
        // Input ends right after a legacy match with live continuations.
        let (decoded, kept, rewind) = walk("not");
        assert_eq!(decoded.as_deref(), Some("\u{00AC}"));
        assert_eq!(kept, 3);
        assert_eq!(rewind, 0);
    }

    #[test]
    fn end_of_input_mid_walk_rewinds_unmatched_excess() {
        let (decoded, kept, rewind) = walk("noti");
        assert_eq!(decoded.as_deref(), Some("\u{00AC}"));
        assert_eq!(kept, 3);
        assert_eq!(rewind, 1);
    }

    #[test]
    fn two_code_point_values_decode() {
        let (decoded, _, _) = walk("fjlig;");
        assert_eq!(decoded.as_deref(), Some("fj"));
        let (decoded, _, _) = walk("NotEqualTilde;");
        assert_eq!(decoded.as_deref(), Some("\u{2242}\u{0338}"));
    }

    #[test]
    fn supplementary_plane_values_decode_from_surrogate_pairs() {
        let (decoded, _, _) = walk("Afr;");
        assert_eq!(decoded.as_deref(), Some("\u{1D504}"));
        let (decoded, _, _) = walk("aopf;");
        assert_eq!(decoded.as_deref(), Some("\u{1D552}"));
    }

    #[test]
    fn without_semicolon_flag_tracks_the_terminating_code_point() {
        let mut walker = NamedWalker::new();
        for ch in "amp ".chars() {
            if walker.step(ch) == WalkStep::Done {
                break;
            }
        }
        let matched = walker.into_match().expect("legacy match");
        assert!(matched.without_semicolon);

        let mut walker = NamedWalker::new();
        for ch in "amp;".chars() {
            if walker.step(ch) == WalkStep::Done {
                break;
            }
        }
        let matched = walker.into_match().expect("full match");
        assert!(!matched.without_semicolon);
    }
}
