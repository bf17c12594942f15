//! The consumer seam: token callbacks and the writable feedback surface.

use crate::error::ParseError;
use crate::token::{CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken};
use crate::tokenizer::State;

/// Receiver of the token stream.
///
/// Callbacks run synchronously, in token order, from inside the tokenizer
/// loop. Each token callback also receives the [`TokenizerCtl`] so a tree
/// constructor can switch the machine's mode (RCDATA/RAWTEXT/script data,
/// foreign content) before the next code point is consumed — mode switches
/// applied after the callback returns would already be one token too late.
///
/// Tokens are borrowed for the duration of the callback only.
pub trait TokenHandler {
    /// `token` is mutable so the consumer can record
    /// [`TagToken::ack_self_closing`].
    fn on_start_tag(&mut self, token: &mut TagToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_end_tag(&mut self, token: &TagToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_comment(&mut self, token: &CommentToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_doctype(&mut self, token: &DoctypeToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_character(&mut self, token: &CharacterToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_whitespace_character(&mut self, token: &CharacterToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_null_character(&mut self, token: &CharacterToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_eof(&mut self, token: &EofToken, ctl: &mut TokenizerCtl) {
        let _ = (token, ctl);
    }

    fn on_parse_error(&mut self, error: &ParseError) {
        let _ = error;
    }
}

/// The tokenizer fields a consumer may write back during a callback.
///
/// This struct lives inside the tokenizer; callbacks borrow it mutably while
/// the rest of the machine is quiescent. Everything else about the tokenizer
/// is off-limits to consumers.
#[derive(Debug)]
pub struct TokenizerCtl {
    pub(crate) state: State,
    pub(crate) return_state: State,
    pub(crate) in_foreign_node: bool,
    /// Lowercased name of the most recent start tag; drives the
    /// appropriate-end-tag check in RCDATA/RAWTEXT/script data.
    pub(crate) last_start_tag_name: String,
    pub(crate) paused: bool,
    /// Chunks queued by `insert_html_at_current_pos` during a callback; the
    /// machine splices them at the cursor when the callback returns.
    pub(crate) pending_insertions: Vec<String>,
}

impl TokenizerCtl {
    pub(crate) fn new() -> Self {
        Self {
            state: State::Data,
            return_state: State::Data,
            in_foreign_node: false,
            last_start_tag_name: String::new(),
            paused: false,
            pending_insertions: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    pub fn return_state(&self) -> State {
        self.return_state
    }

    pub fn set_return_state(&mut self, state: State) {
        self.return_state = state;
    }

    pub fn in_foreign_node(&self) -> bool {
        self.in_foreign_node
    }

    pub fn set_in_foreign_node(&mut self, in_foreign_node: bool) {
        self.in_foreign_node = in_foreign_node;
    }

    pub fn last_start_tag_name(&self) -> &str {
        &self.last_start_tag_name
    }

    /// `name` must already be lowercase.
    pub fn set_last_start_tag_name(&mut self, name: &str) {
        debug_assert!(
            !name.bytes().any(|b| b.is_ascii_uppercase()),
            "last start tag name must be lowercased: {name:?}"
        );
        self.last_start_tag_name.clear();
        self.last_start_tag_name.push_str(name);
    }

    /// Suspend the loop after the current callback; `Tokenizer::resume`
    /// continues it.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Queue markup to be spliced immediately after the cursor once the
    /// current callback returns (the `document.write` path).
    pub fn insert_html_at_current_pos(&mut self, chunk: &str) {
        self.pending_insertions.push(chunk.to_string());
    }
}
