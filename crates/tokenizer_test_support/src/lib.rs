//! Test harness for the tokenizer: deterministic chunk plans, a recording
//! handler, token snapshots and the JSON fixture corpus.
//!
//! The chunk plans are the backbone of the streaming-parity tests: any split
//! of an input must yield the same tokens and the same parse errors (with the
//! same positions) as feeding it whole.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use html_tokenizer::{
    CharacterKind, CharacterToken, CommentToken, DoctypeToken, EofToken, ParseError, State,
    TagId, TagToken, Token, TokenHandler, Tokenizer, TokenizerCtl, TokenizerOptions,
};
use serde::Deserialize;

/// How to slice an input into `write` calls. Sizes and indices count code
/// points (the tokenizer ingests `&str` chunks, so byte-unaligned splits do
/// not arise).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkPlan {
    Fixed { size: usize },
    Sizes { sizes: Vec<usize> },
    Boundaries { indices: Vec<usize> },
}

impl ChunkPlan {
    pub fn fixed(size: usize) -> Self {
        Self::Fixed { size }
    }

    pub fn sizes(sizes: impl Into<Vec<usize>>) -> Self {
        Self::Sizes {
            sizes: sizes.into(),
        }
    }

    pub fn boundaries(indices: impl Into<Vec<usize>>) -> Self {
        Self::Boundaries {
            indices: indices.into(),
        }
    }

    pub fn for_each_chunk(&self, input: &str, mut f: impl FnMut(&str)) {
        // Byte offset of each code-point index, plus the end sentinel.
        let mut offsets: Vec<usize> = input.char_indices().map(|(at, _)| at).collect();
        offsets.push(input.len());
        let count = offsets.len() - 1;

        let cut = |from: usize, to: usize| &input[offsets[from]..offsets[to]];
        match self {
            ChunkPlan::Fixed { size } => {
                assert!(*size > 0, "chunk size must be > 0");
                let mut at = 0usize;
                while at < count {
                    let end = (at + size).min(count);
                    f(cut(at, end));
                    at = end;
                }
            }
            ChunkPlan::Sizes { sizes } => {
                let mut at = 0usize;
                for size in sizes {
                    assert!(*size > 0, "chunk size must be > 0");
                    if at >= count {
                        break;
                    }
                    let end = (at + size).min(count);
                    f(cut(at, end));
                    at = end;
                }
                if at < count {
                    f(cut(at, count));
                }
            }
            ChunkPlan::Boundaries { indices } => {
                let mut points: Vec<usize> = indices
                    .iter()
                    .copied()
                    .filter(|&at| at > 0 && at < count)
                    .collect();
                points.sort_unstable();
                points.dedup();
                let mut last = 0usize;
                for at in points {
                    f(cut(last, at));
                    last = at;
                }
                if last < count {
                    f(cut(last, count));
                }
            }
        }
    }
}

/// The standing plan set for parity runs over larger inputs.
pub fn default_chunk_plans() -> Vec<ChunkPlan> {
    vec![
        ChunkPlan::fixed(1),
        ChunkPlan::fixed(2),
        ChunkPlan::fixed(3),
        ChunkPlan::fixed(7),
        ChunkPlan::fixed(64),
        ChunkPlan::sizes(vec![1, 1, 2, 1, 4, 8, 16, 3, 7]),
        ChunkPlan::sizes(vec![2, 3, 1, 5, 1, 1, 9, 2]),
    ]
}

/// One single-cut plan per interior split point; exhaustive for short inputs.
pub fn every_split_plan(input: &str) -> Vec<ChunkPlan> {
    let count = input.chars().count();
    (1..count).map(|at| ChunkPlan::boundaries(vec![at])).collect()
}

/// Records the stream and emulates the tree constructor's mode switches for
/// the raw-text and foreign-content elements.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub tokens: Vec<Token>,
    pub errors: Vec<ParseError>,
    pub emulate_tree: bool,
}

impl RecordingHandler {
    pub fn tree_aware() -> Self {
        Self {
            emulate_tree: true,
            ..Self::default()
        }
    }
}

impl TokenHandler for RecordingHandler {
    fn on_start_tag(&mut self, token: &mut TagToken, ctl: &mut TokenizerCtl) {
        if self.emulate_tree {
            match token.tag_id {
                TagId::Script => ctl.set_state(State::ScriptData),
                TagId::Title | TagId::Textarea => ctl.set_state(State::Rcdata),
                TagId::Style | TagId::Xmp | TagId::Noembed | TagId::Noframes => {
                    ctl.set_state(State::Rawtext)
                }
                TagId::Plaintext => ctl.set_state(State::Plaintext),
                TagId::Svg | TagId::Math => ctl.set_in_foreign_node(true),
                _ => {}
            }
        }
        self.tokens.push(Token::StartTag(token.clone()));
    }

    fn on_end_tag(&mut self, token: &TagToken, ctl: &mut TokenizerCtl) {
        if self.emulate_tree && matches!(token.tag_id, TagId::Svg | TagId::Math) {
            ctl.set_in_foreign_node(false);
        }
        self.tokens.push(Token::EndTag(token.clone()));
    }

    fn on_comment(&mut self, token: &CommentToken, _ctl: &mut TokenizerCtl) {
        self.tokens.push(Token::Comment(token.clone()));
    }

    fn on_doctype(&mut self, token: &DoctypeToken, _ctl: &mut TokenizerCtl) {
        self.tokens.push(Token::Doctype(token.clone()));
    }

    fn on_character(&mut self, token: &CharacterToken, _ctl: &mut TokenizerCtl) {
        self.tokens.push(Token::Character(token.clone()));
    }

    fn on_whitespace_character(&mut self, token: &CharacterToken, _ctl: &mut TokenizerCtl) {
        self.tokens.push(Token::Character(token.clone()));
    }

    fn on_null_character(&mut self, token: &CharacterToken, _ctl: &mut TokenizerCtl) {
        self.tokens.push(Token::Character(token.clone()));
    }

    fn on_eof(&mut self, token: &EofToken, _ctl: &mut TokenizerCtl) {
        self.tokens.push(Token::Eof(token.clone()));
    }

    fn on_parse_error(&mut self, error: &ParseError) {
        self.errors.push(*error);
    }
}

/// Tokenize the whole input in a single terminal write.
pub fn run_whole(input: &str) -> RecordingHandler {
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), RecordingHandler::tree_aware());
    tokenizer.write(input, true);
    tokenizer.into_handler()
}

/// Tokenize under a chunk plan, closing the stream with an empty terminal
/// write.
pub fn run_chunked(input: &str, plan: &ChunkPlan) -> RecordingHandler {
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), RecordingHandler::tree_aware());
    plan.for_each_chunk(input, |chunk| tokenizer.write(chunk, false));
    tokenizer.write("", true);
    tokenizer.into_handler()
}

/// Assert that a chunk plan reproduces the whole-input stream exactly,
/// locations and error positions included.
pub fn assert_chunk_parity(input: &str, plan: &ChunkPlan) {
    let whole = run_whole(input);
    let chunked = run_chunked(input, plan);
    assert_eq!(
        whole.tokens, chunked.tokens,
        "tokens diverge under {plan:?} for {input:?}"
    );
    assert_eq!(
        whole.errors, chunked.errors,
        "errors diverge under {plan:?} for {input:?}"
    );
}

/// Compact one-line-per-token rendering for fixtures and failure output.
pub fn format_tokens(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(format_token).collect()
}

pub fn format_token(token: &Token) -> String {
    match token {
        Token::StartTag(tag) => {
            let mut line = format!("StartTag({}", tag.name);
            for attr in &tag.attrs {
                let _ = write!(&mut line, " {}=\"{}\"", attr.name, attr.value);
            }
            if tag.self_closing {
                line.push_str(" /");
            }
            line.push(')');
            line
        }
        Token::EndTag(tag) => format!("EndTag({})", tag.name),
        Token::Comment(comment) => format!("Comment({})", comment.data),
        Token::Doctype(doctype) => format!(
            "Doctype({} public={} system={} quirks={})",
            doctype.name.as_deref().unwrap_or("-"),
            doctype.public_id.as_deref().unwrap_or("-"),
            doctype.system_id.as_deref().unwrap_or("-"),
            doctype.force_quirks
        ),
        Token::Character(run) => {
            let kind = match run.kind {
                CharacterKind::Character => "Text",
                CharacterKind::Whitespace => "Space",
                CharacterKind::Null => "Null",
            };
            format!("{kind}({})", run.chars)
        }
        Token::Eof(_) => "Eof".to_string(),
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FixtureCase {
    pub name: String,
    pub input: String,
    pub tokens: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FixtureFile {
    pub cases: Vec<FixtureCase>,
}

pub fn load_fixture_file(path: &Path) -> FixtureFile {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture file {path:?}: {err}"));
    let fixture: FixtureFile = serde_json::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture file {path:?}: {err}"));
    assert!(!fixture.cases.is_empty(), "empty fixture file {path:?}");
    fixture
}

#[cfg(test)]
mod tests {
    use super::ChunkPlan;

    fn chunks(plan: &ChunkPlan, input: &str) -> Vec<String> {
        let mut out = Vec::new();
        plan.for_each_chunk(input, |chunk| out.push(chunk.to_string()));
        out
    }

    #[test]
    fn fixed_plan_covers_the_input_exactly_once() {
        let plan = ChunkPlan::fixed(3);
        assert_eq!(chunks(&plan, "abcdefgh"), vec!["abc", "def", "gh"]);
    }

    #[test]
    fn plans_split_on_code_points_not_bytes() {
        let plan = ChunkPlan::fixed(1);
        assert_eq!(chunks(&plan, "é🙂"), vec!["é", "🙂"]);
    }

    #[test]
    fn sizes_plan_flushes_the_tail() {
        let plan = ChunkPlan::sizes(vec![1, 2]);
        assert_eq!(chunks(&plan, "abcdef"), vec!["a", "bc", "def"]);
    }

    #[test]
    fn boundary_plan_normalizes_indices() {
        let plan = ChunkPlan::boundaries(vec![4, 2, 2, 99, 0]);
        assert_eq!(chunks(&plan, "abcdef"), vec!["ab", "cd", "ef"]);
    }
}
