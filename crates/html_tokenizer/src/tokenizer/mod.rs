//! The tokenizer state machine.
//!
//! A push-driven automaton over the preprocessor's code-point stream. One
//! dispatch handles one state; dispatch is a dense match over the state enum.
//!
//! Hibernation invariant: a state function performs no side effect before its
//! first consume, and every consume can suspend (`Err(Hibernated)`). Before
//! each dispatch the machine snapshots the consumed-code-point counter; when a
//! consume observes end-of-chunk mid-state, the dispatch unwinds, the counter
//! delta is rewound and the loop deactivates. The next `write` re-runs the
//! interrupted state from its entry, so a partial chunk never produces a
//! partial token and lookaheads are safely retryable.
//!
//! Emission invariant: a pending character run is flushed before any
//! non-character token, with the non-character token's start position closing
//! the run's half-open span.

mod char_ref;
mod states;

#[cfg(test)]
mod tests;

pub use states::State;

use std::mem;

use crate::error::{ParseError, ParseErrorCode};
use crate::handler::{TokenHandler, TokenizerCtl};
use crate::location::{Location, Position};
use crate::preprocessor::{Advance, Lookahead, Preprocessor};
use crate::tags::TagId;
use crate::token::{
    Attribute, CharacterKind, CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken,
};

const REPLACEMENT: char = '\u{FFFD}';

/// Construction options.
#[derive(Clone, Copy, Debug)]
pub struct TokenizerOptions {
    /// When false, emitted tokens carry no location spans; parse errors still
    /// carry line/col/offset.
    pub source_code_location_info: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            source_code_location_info: true,
        }
    }
}

/// Marker for a consume that ran out of buffered input mid-state.
struct Hibernated;

type StateResult = Result<(), Hibernated>;

#[derive(Debug, Default)]
struct TagScratch {
    start: Position,
    name: String,
    is_end: bool,
    self_closing: bool,
    attrs: Vec<Attribute>,
    attr_open: bool,
    attr_discard: bool,
    attr_start: Position,
    attr_name: String,
    attr_value: String,
}

#[derive(Debug, Default)]
struct CommentScratch {
    start: Position,
    data: String,
}

#[derive(Debug, Default)]
struct DoctypeScratch {
    start: Position,
    name: Option<String>,
    public_id: Option<String>,
    system_id: Option<String>,
    force_quirks: bool,
}

/// Streaming HTML5 tokenizer.
///
/// Feed input with [`write`](Tokenizer::write); tokens and parse errors reach
/// the handler synchronously. The tree constructor writes mode switches back
/// through the [`TokenizerCtl`] passed to each callback, or between writes via
/// [`ctl_mut`](Tokenizer::ctl_mut).
pub struct Tokenizer<H: TokenHandler> {
    options: TokenizerOptions,
    handler: H,
    input: Preprocessor,
    ctl: TokenizerCtl,
    active: bool,
    eof_emitted: bool,
    consumed_since_dispatch: usize,
    tag: TagScratch,
    comment: CommentScratch,
    doctype: DoctypeScratch,
    char_kind: Option<CharacterKind>,
    char_buf: String,
    char_start: Position,
    char_ref_buf: String,
    char_ref_start: Position,
    char_ref_code: u32,
}

impl<H: TokenHandler> Tokenizer<H> {
    pub fn new(options: TokenizerOptions, handler: H) -> Self {
        Self {
            options,
            handler,
            input: Preprocessor::new(),
            ctl: TokenizerCtl::new(),
            active: false,
            eof_emitted: false,
            consumed_since_dispatch: 0,
            tag: TagScratch::default(),
            comment: CommentScratch::default(),
            doctype: DoctypeScratch::default(),
            char_kind: None,
            char_buf: String::new(),
            char_start: Position::START,
            char_ref_buf: String::new(),
            char_ref_start: Position::START,
            char_ref_code: 0,
        }
    }

    /// Feed a chunk and run until the machine hibernates, pauses or emits EOF.
    pub fn write(&mut self, chunk: &str, is_last: bool) {
        assert!(!self.eof_emitted, "write after EOF was emitted");
        self.input.write(chunk, is_last);
        self.run();
    }

    /// UTF-16 ingestion variant of [`write`](Tokenizer::write).
    pub fn write_utf16(&mut self, chunk: &[u16], is_last: bool) {
        assert!(!self.eof_emitted, "write after EOF was emitted");
        self.input.write_utf16(chunk, is_last);
        self.run();
    }

    /// Splice markup at the cursor and continue tokenizing.
    pub fn insert_html_at_current_pos(&mut self, chunk: &str) {
        assert!(!self.eof_emitted, "insertion after EOF was emitted");
        self.input.insert_html_at_current_pos(chunk);
        self.run();
    }

    /// Suspend the loop; checked at the loop head.
    pub fn pause(&mut self) {
        self.ctl.paused = true;
    }

    /// Clear the pause flag and re-enter the loop.
    pub fn resume(&mut self) {
        if !self.ctl.paused {
            return;
        }
        self.ctl.paused = false;
        self.run();
    }

    /// The writable-by-consumer surface, for use between writes.
    pub fn ctl(&self) -> &TokenizerCtl {
        &self.ctl
    }

    pub fn ctl_mut(&mut self) -> &mut TokenizerCtl {
        &mut self.ctl
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    fn run(&mut self) {
        if self.eof_emitted {
            return;
        }
        self.splice_pending_insertions();
        self.active = true;
        while self.active && !self.ctl.paused && !self.eof_emitted {
            self.consumed_since_dispatch = 0;
            if self.dispatch().is_err() {
                // End of chunk mid-state: rewind to the state entry and wait
                // for the next write.
                self.input.retreat(self.consumed_since_dispatch);
                self.active = false;
            }
        }
    }

    fn dispatch(&mut self) -> StateResult {
        match self.ctl.state {
            State::Data => self.step_data(),
            State::Rcdata => self.step_rcdata(),
            State::Rawtext => self.step_rawtext(),
            State::ScriptData => self.step_script_data(),
            State::Plaintext => self.step_plaintext(),
            State::TagOpen => self.step_tag_open(),
            State::EndTagOpen => self.step_end_tag_open(),
            State::TagName => self.step_tag_name(),
            State::RcdataLessThanSign => self.step_rcdata_less_than_sign(),
            State::RcdataEndTagOpen => {
                self.step_text_end_tag_open(State::RcdataEndTagName, State::Rcdata)
            }
            State::RcdataEndTagName => self.step_text_end_tag_name(State::Rcdata),
            State::RawtextLessThanSign => self.step_rawtext_less_than_sign(),
            State::RawtextEndTagOpen => {
                self.step_text_end_tag_open(State::RawtextEndTagName, State::Rawtext)
            }
            State::RawtextEndTagName => self.step_text_end_tag_name(State::Rawtext),
            State::ScriptDataLessThanSign => self.step_script_data_less_than_sign(),
            State::ScriptDataEndTagOpen => {
                self.step_text_end_tag_open(State::ScriptDataEndTagName, State::ScriptData)
            }
            State::ScriptDataEndTagName => self.step_text_end_tag_name(State::ScriptData),
            State::ScriptDataEscapeStart => self.step_script_data_escape_start(),
            State::ScriptDataEscapeStartDash => self.step_script_data_escape_start_dash(),
            State::ScriptDataEscaped => self.step_script_data_escaped(),
            State::ScriptDataEscapedDash => self.step_script_data_escaped_dash(),
            State::ScriptDataEscapedDashDash => self.step_script_data_escaped_dash_dash(),
            State::ScriptDataEscapedLessThanSign => self.step_script_data_escaped_less_than_sign(),
            State::ScriptDataEscapedEndTagOpen => self.step_text_end_tag_open(
                State::ScriptDataEscapedEndTagName,
                State::ScriptDataEscaped,
            ),
            State::ScriptDataEscapedEndTagName => {
                self.step_text_end_tag_name(State::ScriptDataEscaped)
            }
            State::ScriptDataDoubleEscapeStart => self.step_script_data_double_escape_start(),
            State::ScriptDataDoubleEscaped => self.step_script_data_double_escaped(),
            State::ScriptDataDoubleEscapedDash => self.step_script_data_double_escaped_dash(),
            State::ScriptDataDoubleEscapedDashDash => {
                self.step_script_data_double_escaped_dash_dash()
            }
            State::ScriptDataDoubleEscapedLessThanSign => {
                self.step_script_data_double_escaped_less_than_sign()
            }
            State::ScriptDataDoubleEscapeEnd => self.step_script_data_double_escape_end(),
            State::BeforeAttributeName => self.step_before_attribute_name(),
            State::AttributeName => self.step_attribute_name(),
            State::AfterAttributeName => self.step_after_attribute_name(),
            State::BeforeAttributeValue => self.step_before_attribute_value(),
            State::AttributeValueDoubleQuoted => self.step_attribute_value_double_quoted(),
            State::AttributeValueSingleQuoted => self.step_attribute_value_single_quoted(),
            State::AttributeValueUnquoted => self.step_attribute_value_unquoted(),
            State::AfterAttributeValueQuoted => self.step_after_attribute_value_quoted(),
            State::SelfClosingStartTag => self.step_self_closing_start_tag(),
            State::BogusComment => self.step_bogus_comment(),
            State::MarkupDeclarationOpen => self.step_markup_declaration_open(),
            State::CommentStart => self.step_comment_start(),
            State::CommentStartDash => self.step_comment_start_dash(),
            State::Comment => self.step_comment(),
            State::CommentLessThanSign => self.step_comment_less_than_sign(),
            State::CommentLessThanSignBang => self.step_comment_less_than_sign_bang(),
            State::CommentLessThanSignBangDash => self.step_comment_less_than_sign_bang_dash(),
            State::CommentLessThanSignBangDashDash => {
                self.step_comment_less_than_sign_bang_dash_dash()
            }
            State::CommentEndDash => self.step_comment_end_dash(),
            State::CommentEnd => self.step_comment_end(),
            State::CommentEndBang => self.step_comment_end_bang(),
            State::Doctype => self.step_doctype(),
            State::BeforeDoctypeName => self.step_before_doctype_name(),
            State::DoctypeName => self.step_doctype_name(),
            State::AfterDoctypeName => self.step_after_doctype_name(),
            State::AfterDoctypePublicKeyword => self.step_after_doctype_public_keyword(),
            State::BeforeDoctypePublicIdentifier => self.step_before_doctype_public_identifier(),
            State::DoctypePublicIdentifierDoubleQuoted => {
                self.step_doctype_public_identifier_quoted('"')
            }
            State::DoctypePublicIdentifierSingleQuoted => {
                self.step_doctype_public_identifier_quoted('\'')
            }
            State::AfterDoctypePublicIdentifier => self.step_after_doctype_public_identifier(),
            State::BetweenDoctypePublicAndSystemIdentifiers => {
                self.step_between_doctype_public_and_system_identifiers()
            }
            State::AfterDoctypeSystemKeyword => self.step_after_doctype_system_keyword(),
            State::BeforeDoctypeSystemIdentifier => self.step_before_doctype_system_identifier(),
            State::DoctypeSystemIdentifierDoubleQuoted => {
                self.step_doctype_system_identifier_quoted('"')
            }
            State::DoctypeSystemIdentifierSingleQuoted => {
                self.step_doctype_system_identifier_quoted('\'')
            }
            State::AfterDoctypeSystemIdentifier => self.step_after_doctype_system_identifier(),
            State::BogusDoctype => self.step_bogus_doctype(),
            State::CdataSection => self.step_cdata_section(),
            State::CdataSectionBracket => self.step_cdata_section_bracket(),
            State::CdataSectionEnd => self.step_cdata_section_end(),
            State::CharacterReference => self.step_character_reference(),
            State::NamedCharacterReference => self.step_named_character_reference(),
            State::AmbiguousAmpersand => self.step_ambiguous_ampersand(),
            State::NumericCharacterReference => self.step_numeric_character_reference(),
            State::HexadecimalCharacterReferenceStart => {
                self.step_hexadecimal_character_reference_start()
            }
            State::HexadecimalCharacterReference => self.step_hexadecimal_character_reference(),
            State::DecimalCharacterReference => self.step_decimal_character_reference(),
            State::NumericCharacterReferenceEnd => self.step_numeric_character_reference_end(),
        }
    }

    // ---- consumption helpers ----

    /// Consume one code point. `Ok(None)` is end of stream; `Err` is the
    /// hibernation unwind.
    fn consume(&mut self) -> Result<Option<char>, Hibernated> {
        match self.input.advance() {
            Advance::Char(ch) => {
                self.consumed_since_dispatch += 1;
                self.forward_input_errors();
                Ok(Some(ch))
            }
            Advance::Eof => {
                self.forward_input_errors();
                Ok(None)
            }
            Advance::EndOfChunk => Err(Hibernated),
        }
    }

    fn unconsume(&mut self, n: usize) {
        debug_assert!(
            n <= self.consumed_since_dispatch,
            "unconsume({n}) crosses the dispatch snapshot"
        );
        self.input.retreat(n);
        self.consumed_since_dispatch -= n;
    }

    /// Retreat one code point and transition; the reprocessing state sees the
    /// same code point again.
    fn reconsume_in(&mut self, state: State) {
        self.unconsume(1);
        self.switch(state);
    }

    /// Consume `n` code points a lookahead has already verified to be
    /// buffered, returning them through `each`.
    fn advance_known(&mut self, n: usize, mut each: impl FnMut(&mut Self, char)) {
        for _ in 0..n {
            match self.consume() {
                Ok(Some(ch)) => each(self, ch),
                _ => unreachable!("lookahead verified {n} buffered code points"),
            }
        }
    }

    /// Non-consuming window comparison; `Err` when more input is needed.
    fn starts_with(&mut self, pattern: &str, case_sensitive: bool) -> Result<bool, Hibernated> {
        match self.input.starts_with(pattern, case_sensitive) {
            Lookahead::Match => Ok(true),
            Lookahead::NoMatch => Ok(false),
            Lookahead::NeedData => Err(Hibernated),
        }
    }

    /// Non-consuming peek; `Ok(None)` is end of stream.
    fn peek(&mut self, n: usize) -> Result<Option<char>, Hibernated> {
        match self.input.peek(n) {
            Advance::Char(ch) => Ok(Some(ch)),
            Advance::Eof => Ok(None),
            Advance::EndOfChunk => Err(Hibernated),
        }
    }

    fn switch(&mut self, state: State) {
        #[cfg(any(test, feature = "trace-states"))]
        if self.ctl.state != state {
            log::trace!(
                target: "tokenizer",
                "state {:?} -> {:?} @{}",
                self.ctl.state,
                state,
                self.input.position().offset
            );
        }
        self.ctl.state = state;
    }

    // ---- parse errors ----

    fn forward_input_errors(&mut self) {
        while let Some(error) = self.input.pop_error() {
            self.handler.on_parse_error(&error);
        }
    }

    /// Report at the most recently consumed code point.
    fn err_behind(&mut self, code: ParseErrorCode) {
        let at = self.input.position_of_last();
        self.handler.on_parse_error(&ParseError::new(code, at));
    }

    /// Report at the cursor (used for end-of-stream conditions).
    fn err_at_cursor(&mut self, code: ParseErrorCode) {
        let at = self.input.position();
        self.handler.on_parse_error(&ParseError::new(code, at));
    }

    fn err_at(&mut self, code: ParseErrorCode, at: Position) {
        self.handler.on_parse_error(&ParseError::new(code, at));
    }

    // ---- character runs ----

    fn classify(ch: char) -> CharacterKind {
        match ch {
            '\0' => CharacterKind::Null,
            ch if is_html_whitespace(ch) => CharacterKind::Whitespace,
            _ => CharacterKind::Character,
        }
    }

    /// Append to the pending character run, flushing on a kind change.
    /// `start` is the source position of the code point (for decoded
    /// references: of the `&` that started the reference).
    fn emit_code_point_at(&mut self, ch: char, start: Position) {
        let kind = Self::classify(ch);
        if self.char_kind != Some(kind) {
            self.flush_char_run(start);
            self.char_kind = Some(kind);
            self.char_start = start;
        }
        self.char_buf.push(ch);
    }

    /// Append the just-consumed code point to the pending character run.
    fn emit_current_char(&mut self, ch: char) {
        let start = self.input.position_of_last();
        self.emit_code_point_at(ch, start);
    }

    /// Flush the pending run, closing its half-open span at `end`.
    fn flush_char_run(&mut self, end: Position) {
        let Some(kind) = self.char_kind.take() else {
            return;
        };
        let chars = mem::take(&mut self.char_buf);
        debug_assert!(!chars.is_empty(), "a pending run is never empty");
        let location = self
            .options
            .source_code_location_info
            .then(|| Location::new(self.char_start, end));
        let token = CharacterToken {
            kind,
            chars,
            location,
        };
        #[cfg(any(test, feature = "trace-states"))]
        log::trace!(target: "tokenizer", "emit {:?} run ({} chars)", kind, token.chars.len());
        match kind {
            CharacterKind::Character => self.handler.on_character(&token, &mut self.ctl),
            CharacterKind::Whitespace => {
                self.handler.on_whitespace_character(&token, &mut self.ctl)
            }
            CharacterKind::Null => self.handler.on_null_character(&token, &mut self.ctl),
        }
        self.splice_pending_insertions();
    }

    fn splice_pending_insertions(&mut self) {
        if self.ctl.pending_insertions.is_empty() {
            return;
        }
        // Queued chunks splice as one unit so their relative order holds.
        let joined = mem::take(&mut self.ctl.pending_insertions).concat();
        self.input.insert_html_at_current_pos(&joined);
    }

    // ---- token scratch and emission ----

    fn begin_tag(&mut self, start: Position, is_end: bool) {
        self.tag = TagScratch {
            start,
            is_end,
            ..TagScratch::default()
        };
    }

    fn begin_attribute(&mut self) {
        self.finish_pending_attribute();
        self.tag.attr_open = true;
        self.tag.attr_start = self.input.position();
    }

    /// Duplicate check on leaving the attribute-name state: first wins, the
    /// duplicate is dropped at finalization.
    fn leave_attribute_name(&mut self) {
        let duplicate = self
            .tag
            .attrs
            .iter()
            .any(|attr| attr.name == self.tag.attr_name);
        if duplicate {
            let at = self.tag.attr_start;
            self.err_at(ParseErrorCode::DuplicateAttribute, at);
            self.tag.attr_discard = true;
        }
    }

    fn finish_pending_attribute(&mut self) {
        if !self.tag.attr_open {
            return;
        }
        if self.tag.attr_discard {
            self.tag.attr_name.clear();
            self.tag.attr_value.clear();
        } else {
            let name = mem::take(&mut self.tag.attr_name);
            let value = mem::take(&mut self.tag.attr_value);
            self.tag.attrs.push(Attribute {
                name,
                value,
                prefix: None,
                namespace: None,
            });
        }
        self.tag.attr_open = false;
        self.tag.attr_discard = false;
    }

    fn emit_current_tag(&mut self) {
        self.finish_pending_attribute();
        let scratch = mem::take(&mut self.tag);
        self.flush_char_run(scratch.start);
        let end = self.input.position();
        let location = self
            .options
            .source_code_location_info
            .then(|| Location::new(scratch.start, end));
        let tag_id = TagId::from_name(&scratch.name);
        let mut token = TagToken {
            name: scratch.name,
            tag_id,
            self_closing: scratch.self_closing,
            ack_self_closing: false,
            attrs: scratch.attrs,
            location,
        };
        #[cfg(any(test, feature = "trace-states"))]
        log::trace!(
            target: "tokenizer",
            "emit {} tag <{}>",
            if scratch.is_end { "end" } else { "start" },
            token.name
        );
        if scratch.is_end {
            if !token.attrs.is_empty() {
                self.err_at(ParseErrorCode::EndTagWithAttributes, scratch.start);
            }
            if token.self_closing {
                self.err_at(ParseErrorCode::EndTagWithTrailingSolidus, scratch.start);
            }
            self.handler.on_end_tag(&token, &mut self.ctl);
        } else {
            self.ctl.last_start_tag_name.clear();
            self.ctl.last_start_tag_name.push_str(&token.name);
            self.handler.on_start_tag(&mut token, &mut self.ctl);
        }
        self.splice_pending_insertions();
    }

    fn begin_comment(&mut self, start: Position) {
        self.comment = CommentScratch {
            start,
            data: String::new(),
        };
    }

    fn emit_current_comment(&mut self) {
        let scratch = mem::take(&mut self.comment);
        self.flush_char_run(scratch.start);
        let end = self.input.position();
        let location = self
            .options
            .source_code_location_info
            .then(|| Location::new(scratch.start, end));
        let token = CommentToken {
            data: scratch.data,
            location,
        };
        self.handler.on_comment(&token, &mut self.ctl);
        self.splice_pending_insertions();
    }

    fn begin_doctype(&mut self, start: Position) {
        self.doctype = DoctypeScratch {
            start,
            ..DoctypeScratch::default()
        };
    }

    fn emit_current_doctype(&mut self) {
        let scratch = mem::take(&mut self.doctype);
        self.flush_char_run(scratch.start);
        let end = self.input.position();
        let location = self
            .options
            .source_code_location_info
            .then(|| Location::new(scratch.start, end));
        let token = DoctypeToken {
            name: scratch.name,
            public_id: scratch.public_id,
            system_id: scratch.system_id,
            force_quirks: scratch.force_quirks,
            location,
        };
        self.handler.on_doctype(&token, &mut self.ctl);
        self.splice_pending_insertions();
    }

    fn emit_eof(&mut self) {
        let at = self.input.position();
        self.flush_char_run(at);
        let location = self
            .options
            .source_code_location_info
            .then(|| Location::new(at, at));
        let token = EofToken { location };
        self.handler.on_eof(&token, &mut self.ctl);
        self.eof_emitted = true;
    }

    // ---- text states ----

    fn step_data(&mut self) -> StateResult {
        // Data is the only state with no backtrack window behind it.
        self.input.drop_parsed_chunk();
        match self.consume()? {
            Some('&') => {
                self.ctl.return_state = State::Data;
                self.switch(State::CharacterReference);
            }
            Some('<') => self.switch(State::TagOpen),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char('\0');
            }
            Some(ch) => self.emit_current_char(ch),
            None => self.emit_eof(),
        }
        Ok(())
    }

    fn step_rcdata(&mut self) -> StateResult {
        match self.consume()? {
            Some('&') => {
                self.ctl.return_state = State::Rcdata;
                self.switch(State::CharacterReference);
            }
            Some('<') => self.switch(State::RcdataLessThanSign),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
            }
            Some(ch) => self.emit_current_char(ch),
            None => self.emit_eof(),
        }
        Ok(())
    }

    fn step_rawtext(&mut self) -> StateResult {
        match self.consume()? {
            Some('<') => self.switch(State::RawtextLessThanSign),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
            }
            Some(ch) => self.emit_current_char(ch),
            None => self.emit_eof(),
        }
        Ok(())
    }

    fn step_script_data(&mut self) -> StateResult {
        match self.consume()? {
            Some('<') => self.switch(State::ScriptDataLessThanSign),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
            }
            Some(ch) => self.emit_current_char(ch),
            None => self.emit_eof(),
        }
        Ok(())
    }

    fn step_plaintext(&mut self) -> StateResult {
        match self.consume()? {
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
            }
            Some(ch) => self.emit_current_char(ch),
            None => self.emit_eof(),
        }
        Ok(())
    }

    // ---- tag states ----

    fn step_tag_open(&mut self) -> StateResult {
        match self.consume()? {
            Some('!') => self.switch(State::MarkupDeclarationOpen),
            Some('/') => self.switch(State::EndTagOpen),
            Some(ch) if ch.is_ascii_alphabetic() => {
                // The '<' sits two code points back from the cursor.
                let start = self.input.position_back(2);
                self.begin_tag(start, false);
                self.reconsume_in(State::TagName);
            }
            Some('?') => {
                self.err_behind(ParseErrorCode::UnexpectedQuestionMarkInsteadOfTagName);
                let start = self.input.position_back(2);
                self.begin_comment(start);
                self.reconsume_in(State::BogusComment);
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::InvalidFirstCharacterOfTagName);
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                self.reconsume_in(State::Data);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofBeforeTagName);
                let lt = self.input.position_back(1);
                self.emit_code_point_at('<', lt);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_end_tag_open(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if ch.is_ascii_alphabetic() => {
                let start = self.input.position_back(3);
                self.begin_tag(start, true);
                self.reconsume_in(State::TagName);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingEndTagName);
                self.switch(State::Data);
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::InvalidFirstCharacterOfTagName);
                let start = self.input.position_back(3);
                self.begin_comment(start);
                self.reconsume_in(State::BogusComment);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofBeforeTagName);
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                let solidus = self.input.position_back(1);
                self.emit_code_point_at('/', solidus);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_tag_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => self.switch(State::BeforeAttributeName),
            Some('/') => self.switch(State::SelfClosingStartTag),
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some(ch) if ch.is_ascii_uppercase() => self.tag.name.push(ch.to_ascii_lowercase()),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.tag.name.push(REPLACEMENT);
            }
            Some(ch) => self.tag.name.push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    // ---- RCDATA / RAWTEXT / script data end-tag handling ----

    fn step_rcdata_less_than_sign(&mut self) -> StateResult {
        match self.consume()? {
            Some('/') => self.switch(State::RcdataEndTagOpen),
            Some(_) => {
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                self.reconsume_in(State::Rcdata);
            }
            None => {
                let lt = self.input.position_back(1);
                self.emit_code_point_at('<', lt);
                self.reconsume_at_eof(State::Rcdata);
            }
        }
        Ok(())
    }

    fn step_rawtext_less_than_sign(&mut self) -> StateResult {
        match self.consume()? {
            Some('/') => self.switch(State::RawtextEndTagOpen),
            Some(_) => {
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                self.reconsume_in(State::Rawtext);
            }
            None => {
                let lt = self.input.position_back(1);
                self.emit_code_point_at('<', lt);
                self.reconsume_at_eof(State::Rawtext);
            }
        }
        Ok(())
    }

    fn step_script_data_less_than_sign(&mut self) -> StateResult {
        match self.consume()? {
            Some('/') => self.switch(State::ScriptDataEndTagOpen),
            Some('!') => {
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                let bang = self.input.position_back(1);
                self.emit_code_point_at('!', bang);
                self.switch(State::ScriptDataEscapeStart);
            }
            Some(_) => {
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                self.reconsume_in(State::ScriptData);
            }
            None => {
                let lt = self.input.position_back(1);
                self.emit_code_point_at('<', lt);
                self.reconsume_at_eof(State::ScriptData);
            }
        }
        Ok(())
    }

    /// Shared by the four `*EndTagOpen` states: the appropriate-end-tag
    /// check. `</` is already consumed. If the window case-insensitively
    /// matches the last start tag's name followed by whitespace, `/` or `>`,
    /// an end-tag token is built and the buffer advanced past the name;
    /// otherwise `</` is emitted as text and the machine falls back.
    fn step_text_end_tag_open(&mut self, name_state: State, fallback: State) -> StateResult {
        let name = self.ctl.last_start_tag_name.clone();
        if !name.is_empty() && self.appropriate_end_tag_ahead(&name)? {
            let name_len = name.chars().count();
            let start = self.input.position_back(2);
            self.begin_tag(start, true);
            self.tag.name = name;
            self.advance_known(name_len, |_, _| {});
            self.switch(name_state);
            return Ok(());
        }
        let lt = self.input.position_back(2);
        self.emit_code_point_at('<', lt);
        let solidus = self.input.position_back(1);
        self.emit_code_point_at('/', solidus);
        self.switch(fallback);
        Ok(())
    }

    fn appropriate_end_tag_ahead(&mut self, name: &str) -> Result<bool, Hibernated> {
        if !self.starts_with(name, false)? {
            return Ok(false);
        }
        match self.peek(name.chars().count())? {
            Some(ch) => Ok(is_html_whitespace(ch) || ch == '/' || ch == '>'),
            None => Ok(false),
        }
    }

    /// Entered only with whitespace, `/` or `>` next (the open state verified
    /// the terminator). The guard stays total anyway: any other code point
    /// re-emits the tag as text.
    fn step_text_end_tag_name(&mut self, fallback: State) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => self.switch(State::BeforeAttributeName),
            Some('/') => self.switch(State::SelfClosingStartTag),
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some(_) => {
                let scratch = mem::take(&mut self.tag);
                let back = scratch.name.chars().count() + 3;
                let mut at = self.input.position_back(back);
                self.emit_code_point_at('<', at);
                at = self.input.position_back(back - 1);
                self.emit_code_point_at('/', at);
                for (i, ch) in scratch.name.chars().enumerate() {
                    let at = self.input.position_back(back - 2 - i);
                    self.emit_code_point_at(ch, at);
                }
                self.reconsume_in(fallback);
            }
            None => self.reconsume_at_eof(fallback),
        }
        Ok(())
    }

    /// EOF counterpart of `reconsume_in`: nothing was consumed, so only the
    /// state changes; the target state observes EOF itself.
    fn reconsume_at_eof(&mut self, state: State) {
        self.switch(state);
    }

    // ---- script data escaping ----

    fn step_script_data_escape_start(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.emit_current_char('-');
                self.switch(State::ScriptDataEscapeStartDash);
            }
            Some(_) => self.reconsume_in(State::ScriptData),
            None => self.reconsume_at_eof(State::ScriptData),
        }
        Ok(())
    }

    fn step_script_data_escape_start_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.emit_current_char('-');
                self.switch(State::ScriptDataEscapedDashDash);
            }
            Some(_) => self.reconsume_in(State::ScriptData),
            None => self.reconsume_at_eof(State::ScriptData),
        }
        Ok(())
    }

    fn step_script_data_escaped(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.emit_current_char('-');
                self.switch(State::ScriptDataEscapedDash);
            }
            Some('<') => self.switch(State::ScriptDataEscapedLessThanSign),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
            }
            Some(ch) => self.emit_current_char(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInScriptHtmlCommentLikeText);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_script_data_escaped_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.emit_current_char('-');
                self.switch(State::ScriptDataEscapedDashDash);
            }
            Some('<') => self.switch(State::ScriptDataEscapedLessThanSign),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
                self.switch(State::ScriptDataEscaped);
            }
            Some(ch) => {
                self.emit_current_char(ch);
                self.switch(State::ScriptDataEscaped);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInScriptHtmlCommentLikeText);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_script_data_escaped_dash_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.emit_current_char('-'),
            Some('<') => self.switch(State::ScriptDataEscapedLessThanSign),
            Some('>') => {
                self.emit_current_char('>');
                self.switch(State::ScriptData);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
                self.switch(State::ScriptDataEscaped);
            }
            Some(ch) => {
                self.emit_current_char(ch);
                self.switch(State::ScriptDataEscaped);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInScriptHtmlCommentLikeText);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_script_data_escaped_less_than_sign(&mut self) -> StateResult {
        match self.consume()? {
            Some('/') => self.switch(State::ScriptDataEscapedEndTagOpen),
            Some(ch) if ch.is_ascii_alphabetic() => {
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                self.reconsume_in(State::ScriptDataDoubleEscapeStart);
            }
            Some(_) => {
                let lt = self.input.position_back(2);
                self.emit_code_point_at('<', lt);
                self.reconsume_in(State::ScriptDataEscaped);
            }
            None => {
                let lt = self.input.position_back(1);
                self.emit_code_point_at('<', lt);
                self.reconsume_at_eof(State::ScriptDataEscaped);
            }
        }
        Ok(())
    }

    /// Double-escape entry: the literal token `script` (case-insensitive)
    /// followed by whitespace, `/` or `>`. The matched code points are script
    /// text either way; on a match the machine additionally flips into the
    /// double-escaped mode.
    fn step_script_data_double_escape_start(&mut self) -> StateResult {
        if self.script_keyword_ahead()? {
            self.advance_known("script".len(), |this, ch| this.emit_current_char(ch));
            let terminator = match self.consume() {
                Ok(Some(ch)) => ch,
                _ => unreachable!("terminator was verified by lookahead"),
            };
            self.emit_current_char(terminator);
            self.switch(State::ScriptDataDoubleEscaped);
        } else {
            self.switch(State::ScriptDataEscaped);
        }
        Ok(())
    }

    fn step_script_data_double_escaped(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.emit_current_char('-');
                self.switch(State::ScriptDataDoubleEscapedDash);
            }
            Some('<') => {
                self.emit_current_char('<');
                self.switch(State::ScriptDataDoubleEscapedLessThanSign);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
            }
            Some(ch) => self.emit_current_char(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInScriptHtmlCommentLikeText);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_script_data_double_escaped_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.emit_current_char('-');
                self.switch(State::ScriptDataDoubleEscapedDashDash);
            }
            Some('<') => {
                self.emit_current_char('<');
                self.switch(State::ScriptDataDoubleEscapedLessThanSign);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
                self.switch(State::ScriptDataDoubleEscaped);
            }
            Some(ch) => {
                self.emit_current_char(ch);
                self.switch(State::ScriptDataDoubleEscaped);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInScriptHtmlCommentLikeText);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_script_data_double_escaped_dash_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.emit_current_char('-'),
            Some('<') => {
                self.emit_current_char('<');
                self.switch(State::ScriptDataDoubleEscapedLessThanSign);
            }
            Some('>') => {
                self.emit_current_char('>');
                self.switch(State::ScriptData);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.emit_current_char(REPLACEMENT);
                self.switch(State::ScriptDataDoubleEscaped);
            }
            Some(ch) => {
                self.emit_current_char(ch);
                self.switch(State::ScriptDataDoubleEscaped);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInScriptHtmlCommentLikeText);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_script_data_double_escaped_less_than_sign(&mut self) -> StateResult {
        match self.consume()? {
            Some('/') => {
                self.emit_current_char('/');
                self.switch(State::ScriptDataDoubleEscapeEnd);
            }
            Some(_) => self.reconsume_in(State::ScriptDataDoubleEscaped),
            None => self.reconsume_at_eof(State::ScriptDataDoubleEscaped),
        }
        Ok(())
    }

    fn step_script_data_double_escape_end(&mut self) -> StateResult {
        if self.script_keyword_ahead()? {
            self.advance_known("script".len(), |this, ch| this.emit_current_char(ch));
            let terminator = match self.consume() {
                Ok(Some(ch)) => ch,
                _ => unreachable!("terminator was verified by lookahead"),
            };
            self.emit_current_char(terminator);
            self.switch(State::ScriptDataEscaped);
        } else {
            self.switch(State::ScriptDataDoubleEscaped);
        }
        Ok(())
    }

    fn script_keyword_ahead(&mut self) -> Result<bool, Hibernated> {
        if !self.starts_with("script", false)? {
            return Ok(false);
        }
        match self.peek("script".len())? {
            Some(ch) => Ok(is_html_whitespace(ch) || ch == '/' || ch == '>'),
            None => Ok(false),
        }
    }

    // ---- attribute states ----

    fn step_before_attribute_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('/') | Some('>') => self.reconsume_in(State::AfterAttributeName),
            Some('=') => {
                self.err_behind(ParseErrorCode::UnexpectedEqualsSignBeforeAttributeName);
                self.begin_attribute();
                self.tag.attr_start = self.input.position_of_last();
                self.tag.attr_name.push('=');
                self.switch(State::AttributeName);
            }
            Some(_) => {
                self.begin_attribute();
                self.reconsume_in(State::AttributeName);
                self.tag.attr_start = self.input.position();
            }
            None => self.reconsume_at_eof(State::AfterAttributeName),
        }
        Ok(())
    }

    fn step_attribute_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {
                self.leave_attribute_name();
                self.reconsume_in(State::AfterAttributeName);
            }
            Some('/') | Some('>') => {
                self.leave_attribute_name();
                self.reconsume_in(State::AfterAttributeName);
            }
            Some('=') => {
                self.leave_attribute_name();
                self.switch(State::BeforeAttributeValue);
            }
            Some(ch) if ch.is_ascii_uppercase() => {
                self.tag.attr_name.push(ch.to_ascii_lowercase());
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.tag.attr_name.push(REPLACEMENT);
            }
            Some(ch @ ('"' | '\'' | '<')) => {
                self.err_behind(ParseErrorCode::UnexpectedCharacterInAttributeName);
                self.tag.attr_name.push(ch);
            }
            Some(ch) => self.tag.attr_name.push(ch),
            None => {
                self.leave_attribute_name();
                self.reconsume_at_eof(State::AfterAttributeName);
            }
        }
        Ok(())
    }

    fn step_after_attribute_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('/') => self.switch(State::SelfClosingStartTag),
            Some('=') => self.switch(State::BeforeAttributeValue),
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some(_) => {
                self.begin_attribute();
                self.reconsume_in(State::AttributeName);
                self.tag.attr_start = self.input.position();
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_before_attribute_value(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('"') => self.switch(State::AttributeValueDoubleQuoted),
            Some('\'') => self.switch(State::AttributeValueSingleQuoted),
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingAttributeValue);
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some(_) => self.reconsume_in(State::AttributeValueUnquoted),
            None => self.reconsume_at_eof(State::AttributeValueUnquoted),
        }
        Ok(())
    }

    fn step_attribute_value_double_quoted(&mut self) -> StateResult {
        match self.consume()? {
            Some('"') => self.switch(State::AfterAttributeValueQuoted),
            Some('&') => {
                self.ctl.return_state = State::AttributeValueDoubleQuoted;
                self.switch(State::CharacterReference);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.tag.attr_value.push(REPLACEMENT);
            }
            Some(ch) => self.tag.attr_value.push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_attribute_value_single_quoted(&mut self) -> StateResult {
        match self.consume()? {
            Some('\'') => self.switch(State::AfterAttributeValueQuoted),
            Some('&') => {
                self.ctl.return_state = State::AttributeValueSingleQuoted;
                self.switch(State::CharacterReference);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.tag.attr_value.push(REPLACEMENT);
            }
            Some(ch) => self.tag.attr_value.push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_attribute_value_unquoted(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => self.switch(State::BeforeAttributeName),
            Some('&') => {
                self.ctl.return_state = State::AttributeValueUnquoted;
                self.switch(State::CharacterReference);
            }
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.tag.attr_value.push(REPLACEMENT);
            }
            Some(ch @ ('"' | '\'' | '<' | '=' | '`')) => {
                self.err_behind(ParseErrorCode::UnexpectedCharacterInUnquotedAttributeValue);
                self.tag.attr_value.push(ch);
            }
            Some(ch) => self.tag.attr_value.push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_after_attribute_value_quoted(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => self.switch(State::BeforeAttributeName),
            Some('/') => self.switch(State::SelfClosingStartTag),
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingWhitespaceBetweenAttributes);
                self.reconsume_in(State::BeforeAttributeName);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_self_closing_start_tag(&mut self) -> StateResult {
        match self.consume()? {
            Some('>') => {
                self.tag.self_closing = true;
                self.switch(State::Data);
                self.emit_current_tag();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::UnexpectedSolidusInTag);
                self.reconsume_in(State::BeforeAttributeName);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInTag);
                self.emit_eof();
            }
        }
        Ok(())
    }

    // ---- comment states ----

    fn step_bogus_comment(&mut self) -> StateResult {
        match self.consume()? {
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_comment();
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.comment.data.push(REPLACEMENT);
            }
            Some(ch) => self.comment.data.push(ch),
            None => {
                self.emit_current_comment();
                self.emit_eof();
            }
        }
        Ok(())
    }

    /// `<!` is consumed. Dispatch on `--`, `DOCTYPE` and `[CDATA[`; the
    /// lookaheads hibernate on a short window, so a keyword split across
    /// chunks retries intact.
    fn step_markup_declaration_open(&mut self) -> StateResult {
        let start = self.input.position_back(2);
        if self.starts_with("--", true)? {
            self.begin_comment(start);
            self.advance_known(2, |_, _| {});
            self.switch(State::CommentStart);
            return Ok(());
        }
        if self.starts_with("DOCTYPE", false)? {
            self.begin_doctype(start);
            self.advance_known(7, |_, _| {});
            self.switch(State::Doctype);
            return Ok(());
        }
        if self.starts_with("[CDATA[", true)? {
            self.advance_known(7, |_, _| {});
            if self.ctl.in_foreign_node {
                self.switch(State::CdataSection);
            } else {
                self.err_behind(ParseErrorCode::CdataInHtmlContent);
                self.begin_comment(start);
                self.comment.data.push_str("[CDATA[");
                self.switch(State::BogusComment);
            }
            return Ok(());
        }
        self.err_at_cursor(ParseErrorCode::IncorrectlyOpenedComment);
        self.begin_comment(start);
        self.switch(State::BogusComment);
        Ok(())
    }

    fn step_comment_start(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.switch(State::CommentStartDash),
            Some('>') => {
                self.err_behind(ParseErrorCode::AbruptClosingOfEmptyComment);
                self.switch(State::Data);
                self.emit_current_comment();
            }
            Some(_) => self.reconsume_in(State::Comment),
            None => self.reconsume_at_eof(State::Comment),
        }
        Ok(())
    }

    fn step_comment_start_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.switch(State::CommentEnd),
            Some('>') => {
                self.err_behind(ParseErrorCode::AbruptClosingOfEmptyComment);
                self.switch(State::Data);
                self.emit_current_comment();
            }
            Some(_) => {
                self.comment.data.push('-');
                self.reconsume_in(State::Comment);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInComment);
                self.emit_current_comment();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_comment(&mut self) -> StateResult {
        match self.consume()? {
            Some('<') => {
                self.comment.data.push('<');
                self.switch(State::CommentLessThanSign);
            }
            Some('-') => self.switch(State::CommentEndDash),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.comment.data.push(REPLACEMENT);
            }
            Some(ch) => self.comment.data.push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInComment);
                self.emit_current_comment();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_comment_less_than_sign(&mut self) -> StateResult {
        match self.consume()? {
            Some('!') => {
                self.comment.data.push('!');
                self.switch(State::CommentLessThanSignBang);
            }
            Some('<') => self.comment.data.push('<'),
            Some(_) => self.reconsume_in(State::Comment),
            None => self.reconsume_at_eof(State::Comment),
        }
        Ok(())
    }

    fn step_comment_less_than_sign_bang(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.switch(State::CommentLessThanSignBangDash),
            Some(_) => self.reconsume_in(State::Comment),
            None => self.reconsume_at_eof(State::Comment),
        }
        Ok(())
    }

    fn step_comment_less_than_sign_bang_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.switch(State::CommentLessThanSignBangDashDash),
            Some(_) => self.reconsume_in(State::CommentEndDash),
            None => self.reconsume_at_eof(State::CommentEndDash),
        }
        Ok(())
    }

    fn step_comment_less_than_sign_bang_dash_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('>') => self.reconsume_in(State::CommentEnd),
            Some(_) => {
                self.err_behind(ParseErrorCode::NestedComment);
                self.reconsume_in(State::CommentEnd);
            }
            None => self.reconsume_at_eof(State::CommentEnd),
        }
        Ok(())
    }

    fn step_comment_end_dash(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => self.switch(State::CommentEnd),
            Some(_) => {
                self.comment.data.push('-');
                self.reconsume_in(State::Comment);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInComment);
                self.emit_current_comment();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_comment_end(&mut self) -> StateResult {
        match self.consume()? {
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_comment();
            }
            Some('!') => self.switch(State::CommentEndBang),
            Some('-') => self.comment.data.push('-'),
            Some(_) => {
                self.comment.data.push_str("--");
                self.reconsume_in(State::Comment);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInComment);
                self.emit_current_comment();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_comment_end_bang(&mut self) -> StateResult {
        match self.consume()? {
            Some('-') => {
                self.comment.data.push_str("--!");
                self.switch(State::CommentEndDash);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::IncorrectlyClosedComment);
                self.switch(State::Data);
                self.emit_current_comment();
            }
            Some(_) => {
                self.comment.data.push_str("--!");
                self.reconsume_in(State::Comment);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInComment);
                self.emit_current_comment();
                self.emit_eof();
            }
        }
        Ok(())
    }

    // ---- DOCTYPE states ----

    fn step_doctype(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => self.switch(State::BeforeDoctypeName),
            Some('>') => self.reconsume_in(State::BeforeDoctypeName),
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingWhitespaceBeforeDoctypeName);
                self.reconsume_in(State::BeforeDoctypeName);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_before_doctype_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some(ch) if ch.is_ascii_uppercase() => {
                self.doctype.name = Some(ch.to_ascii_lowercase().to_string());
                self.switch(State::DoctypeName);
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.doctype.name = Some(REPLACEMENT.to_string());
                self.switch(State::DoctypeName);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingDoctypeName);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(ch) => {
                self.doctype.name = Some(ch.to_string());
                self.switch(State::DoctypeName);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_doctype_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => self.switch(State::AfterDoctypeName),
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(ch) if ch.is_ascii_uppercase() => {
                self.doctype_name_push(ch.to_ascii_lowercase());
            }
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.doctype_name_push(REPLACEMENT);
            }
            Some(ch) => self.doctype_name_push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn doctype_name_push(&mut self, ch: char) {
        self.doctype.name.get_or_insert_with(String::new).push(ch);
    }

    fn step_after_doctype_name(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(_) => {
                self.unconsume(1);
                if self.starts_with("PUBLIC", false)? {
                    self.advance_known(6, |_, _| {});
                    self.switch(State::AfterDoctypePublicKeyword);
                } else if self.starts_with("SYSTEM", false)? {
                    self.advance_known(6, |_, _| {});
                    self.switch(State::AfterDoctypeSystemKeyword);
                } else {
                    self.err_at_cursor(ParseErrorCode::InvalidCharacterSequenceAfterDoctypeName);
                    self.doctype.force_quirks = true;
                    self.switch(State::BogusDoctype);
                }
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_after_doctype_public_keyword(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {
                self.switch(State::BeforeDoctypePublicIdentifier)
            }
            Some('"') => {
                self.err_behind(ParseErrorCode::MissingWhitespaceAfterDoctypePublicKeyword);
                self.doctype.public_id = Some(String::new());
                self.switch(State::DoctypePublicIdentifierDoubleQuoted);
            }
            Some('\'') => {
                self.err_behind(ParseErrorCode::MissingWhitespaceAfterDoctypePublicKeyword);
                self.doctype.public_id = Some(String::new());
                self.switch(State::DoctypePublicIdentifierSingleQuoted);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingDoctypePublicIdentifier);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingQuoteBeforeDoctypePublicIdentifier);
                self.doctype.force_quirks = true;
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_before_doctype_public_identifier(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('"') => {
                self.doctype.public_id = Some(String::new());
                self.switch(State::DoctypePublicIdentifierDoubleQuoted);
            }
            Some('\'') => {
                self.doctype.public_id = Some(String::new());
                self.switch(State::DoctypePublicIdentifierSingleQuoted);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingDoctypePublicIdentifier);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingQuoteBeforeDoctypePublicIdentifier);
                self.doctype.force_quirks = true;
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_doctype_public_identifier_quoted(&mut self, quote: char) -> StateResult {
        match self.consume()? {
            Some(ch) if ch == quote => self.switch(State::AfterDoctypePublicIdentifier),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.doctype_public_id_push(REPLACEMENT);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::AbruptDoctypePublicIdentifier);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(ch) => self.doctype_public_id_push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn doctype_public_id_push(&mut self, ch: char) {
        self.doctype
            .public_id
            .get_or_insert_with(String::new)
            .push(ch);
    }

    fn step_after_doctype_public_identifier(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {
                self.switch(State::BetweenDoctypePublicAndSystemIdentifiers)
            }
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some('"') => {
                self.err_behind(
                    ParseErrorCode::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
                );
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierDoubleQuoted);
            }
            Some('\'') => {
                self.err_behind(
                    ParseErrorCode::MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
                );
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierSingleQuoted);
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingQuoteBeforeDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_between_doctype_public_and_system_identifiers(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some('"') => {
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierDoubleQuoted);
            }
            Some('\'') => {
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierSingleQuoted);
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingQuoteBeforeDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_after_doctype_system_keyword(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {
                self.switch(State::BeforeDoctypeSystemIdentifier)
            }
            Some('"') => {
                self.err_behind(ParseErrorCode::MissingWhitespaceAfterDoctypeSystemKeyword);
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierDoubleQuoted);
            }
            Some('\'') => {
                self.err_behind(ParseErrorCode::MissingWhitespaceAfterDoctypeSystemKeyword);
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierSingleQuoted);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingQuoteBeforeDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_before_doctype_system_identifier(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('"') => {
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierDoubleQuoted);
            }
            Some('\'') => {
                self.doctype.system_id = Some(String::new());
                self.switch(State::DoctypeSystemIdentifierSingleQuoted);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::MissingDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingQuoteBeforeDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_doctype_system_identifier_quoted(&mut self, quote: char) -> StateResult {
        match self.consume()? {
            Some(ch) if ch == quote => self.switch(State::AfterDoctypeSystemIdentifier),
            Some('\0') => {
                self.err_behind(ParseErrorCode::UnexpectedNullCharacter);
                self.doctype_system_id_push(REPLACEMENT);
            }
            Some('>') => {
                self.err_behind(ParseErrorCode::AbruptDoctypeSystemIdentifier);
                self.doctype.force_quirks = true;
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(ch) => self.doctype_system_id_push(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn doctype_system_id_push(&mut self, ch: char) {
        self.doctype
            .system_id
            .get_or_insert_with(String::new)
            .push(ch);
    }

    fn step_after_doctype_system_identifier(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if is_html_whitespace(ch) => {}
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::UnexpectedCharacterAfterDoctypeSystemIdentifier);
                self.reconsume_in(State::BogusDoctype);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::EofInDoctype);
                self.doctype.force_quirks = true;
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_bogus_doctype(&mut self) -> StateResult {
        match self.consume()? {
            Some('>') => {
                self.switch(State::Data);
                self.emit_current_doctype();
            }
            Some('\0') => self.err_behind(ParseErrorCode::UnexpectedNullCharacter),
            Some(_) => {}
            None => {
                self.emit_current_doctype();
                self.emit_eof();
            }
        }
        Ok(())
    }

    // ---- CDATA states ----

    fn step_cdata_section(&mut self) -> StateResult {
        match self.consume()? {
            Some(']') => self.switch(State::CdataSectionBracket),
            Some(ch) => self.emit_current_char(ch),
            None => {
                self.err_at_cursor(ParseErrorCode::EofInCdata);
                self.emit_eof();
            }
        }
        Ok(())
    }

    fn step_cdata_section_bracket(&mut self) -> StateResult {
        match self.consume()? {
            Some(']') => self.switch(State::CdataSectionEnd),
            Some(_) => {
                let bracket = self.input.position_back(2);
                self.emit_code_point_at(']', bracket);
                self.reconsume_in(State::CdataSection);
            }
            None => {
                let bracket = self.input.position_back(1);
                self.emit_code_point_at(']', bracket);
                self.reconsume_at_eof(State::CdataSection);
            }
        }
        Ok(())
    }

    fn step_cdata_section_end(&mut self) -> StateResult {
        match self.consume()? {
            Some('>') => self.switch(State::Data),
            Some(']') => {
                let bracket = self.input.position_back(3);
                self.emit_code_point_at(']', bracket);
            }
            Some(_) => {
                let first = self.input.position_back(3);
                self.emit_code_point_at(']', first);
                let second = self.input.position_back(2);
                self.emit_code_point_at(']', second);
                self.reconsume_in(State::CdataSection);
            }
            None => {
                let first = self.input.position_back(2);
                self.emit_code_point_at(']', first);
                let second = self.input.position_back(1);
                self.emit_code_point_at(']', second);
                self.reconsume_at_eof(State::CdataSection);
            }
        }
        Ok(())
    }
}

pub(crate) fn is_html_whitespace(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\u{C}')
}
