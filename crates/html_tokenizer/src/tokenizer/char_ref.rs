//! The character-reference chain.
//!
//! Entered on `&` from the data, RCDATA and attribute-value states. Named
//! references walk the packed trie one code point per step, so a chunk
//! boundary mid-name unwinds through the normal hibernation path and the walk
//! re-runs intact on the next write. `char_ref_buf` holds the raw code points
//! consumed so far (`&`, `&#`, `&#x`) for the literal-flush recovery paths.

use super::{REPLACEMENT, State, StateResult, Tokenizer};
use crate::entities::{NamedWalker, WalkStep};
use crate::error::ParseErrorCode;
use crate::handler::TokenHandler;
use crate::preprocessor::is_noncharacter;

/// The C1 control range of a numeric reference decodes per Windows-1252.
/// Holes in that table (0x81, 0x8D, 0x8F, 0x90, 0x9D) pass through.
const C1_REMAP: &[(u32, char)] = &[
    (0x80, '\u{20AC}'),
    (0x82, '\u{201A}'),
    (0x83, '\u{0192}'),
    (0x84, '\u{201E}'),
    (0x85, '\u{2026}'),
    (0x86, '\u{2020}'),
    (0x87, '\u{2021}'),
    (0x88, '\u{02C6}'),
    (0x89, '\u{2030}'),
    (0x8A, '\u{0160}'),
    (0x8B, '\u{2039}'),
    (0x8C, '\u{0152}'),
    (0x8E, '\u{017D}'),
    (0x91, '\u{2018}'),
    (0x92, '\u{2019}'),
    (0x93, '\u{201C}'),
    (0x94, '\u{201D}'),
    (0x95, '\u{2022}'),
    (0x96, '\u{2013}'),
    (0x97, '\u{2014}'),
    (0x98, '\u{02DC}'),
    (0x99, '\u{2122}'),
    (0x9A, '\u{0161}'),
    (0x9B, '\u{203A}'),
    (0x9C, '\u{0153}'),
    (0x9E, '\u{017E}'),
    (0x9F, '\u{0178}'),
];

impl<H: TokenHandler> Tokenizer<H> {
    /// The reference is being decoded inside an attribute value.
    fn char_ref_in_attribute(&self) -> bool {
        matches!(
            self.ctl.return_state,
            State::AttributeValueDoubleQuoted
                | State::AttributeValueSingleQuoted
                | State::AttributeValueUnquoted
        )
    }

    /// Flush the raw consumed code points (`&`, `&#`, ...) as literal text:
    /// into the attribute value, or as character tokens anchored at the `&`.
    fn flush_char_ref_literal(&mut self) {
        let buf = std::mem::take(&mut self.char_ref_buf);
        if self.char_ref_in_attribute() {
            self.tag.attr_value.push_str(&buf);
        } else {
            for ch in buf.chars() {
                self.emit_code_point_at(ch, self.char_ref_start);
            }
        }
    }

    fn flush_char_ref_char(&mut self, ch: char) {
        self.char_ref_buf.clear();
        if self.char_ref_in_attribute() {
            self.tag.attr_value.push(ch);
        } else {
            self.emit_code_point_at(ch, self.char_ref_start);
        }
    }

    pub(super) fn step_character_reference(&mut self) -> StateResult {
        // Idempotent under hibernation replay: the `&` sits one code point
        // behind the cursor until this state commits.
        self.char_ref_buf.clear();
        self.char_ref_buf.push('&');
        self.char_ref_start = self.input.position_of_last();
        match self.consume()? {
            Some(ch) if ch.is_ascii_alphanumeric() => {
                self.reconsume_in(State::NamedCharacterReference);
            }
            Some('#') => {
                self.char_ref_buf.push('#');
                self.switch(State::NumericCharacterReference);
            }
            Some(_) => {
                self.flush_char_ref_literal();
                self.reconsume_in(self.ctl.return_state);
            }
            None => {
                self.flush_char_ref_literal();
                self.reconsume_at_eof(self.ctl.return_state);
            }
        }
        Ok(())
    }

    pub(super) fn step_named_character_reference(&mut self) -> StateResult {
        let mut walker = NamedWalker::new();
        loop {
            match self.consume()? {
                Some(ch) => {
                    if walker.step(ch) == WalkStep::Done {
                        break;
                    }
                }
                None => {
                    walker.finish_at_end_of_input();
                    break;
                }
            }
        }
        self.unconsume(walker.rewind());

        match walker.into_match() {
            Some(matched) => {
                if matched.without_semicolon && self.char_ref_in_attribute() {
                    // Historical quirk: `&param=x` style attribute values do
                    // not decode. The name is rewound and re-consumed as
                    // plain attribute text behind a literal `&`.
                    let next = self.peek(0)?;
                    if matches!(next, Some(ch) if ch == '=' || ch.is_ascii_alphanumeric()) {
                        self.unconsume(matched.consumed);
                        self.flush_char_ref_literal();
                        self.switch(self.ctl.return_state);
                        return Ok(());
                    }
                }
                if matched.without_semicolon {
                    self.err_at_cursor(ParseErrorCode::MissingSemicolonAfterCharacterReference);
                }
                self.char_ref_buf.clear();
                let mut decoded = String::new();
                matched.push_value_onto(&mut decoded);
                if self.char_ref_in_attribute() {
                    self.tag.attr_value.push_str(&decoded);
                } else {
                    for ch in decoded.chars() {
                        self.emit_code_point_at(ch, self.char_ref_start);
                    }
                }
                self.switch(self.ctl.return_state);
            }
            None => {
                self.flush_char_ref_literal();
                self.switch(State::AmbiguousAmpersand);
            }
        }
        Ok(())
    }

    pub(super) fn step_ambiguous_ampersand(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if ch.is_ascii_alphanumeric() => {
                if self.char_ref_in_attribute() {
                    self.tag.attr_value.push(ch);
                } else {
                    self.emit_current_char(ch);
                }
            }
            Some(';') => {
                self.err_behind(ParseErrorCode::UnknownNamedCharacterReference);
                self.reconsume_in(self.ctl.return_state);
            }
            Some(_) => self.reconsume_in(self.ctl.return_state),
            None => self.reconsume_at_eof(self.ctl.return_state),
        }
        Ok(())
    }

    pub(super) fn step_numeric_character_reference(&mut self) -> StateResult {
        self.char_ref_code = 0;
        match self.consume()? {
            Some(ch @ ('x' | 'X')) => {
                self.char_ref_buf.push(ch);
                self.switch(State::HexadecimalCharacterReferenceStart);
            }
            Some(ch) if ch.is_ascii_digit() => {
                self.reconsume_in(State::DecimalCharacterReference);
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::AbsenceOfDigitsInNumericCharacterReference);
                self.flush_char_ref_literal();
                self.reconsume_in(self.ctl.return_state);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::AbsenceOfDigitsInNumericCharacterReference);
                self.flush_char_ref_literal();
                self.reconsume_at_eof(self.ctl.return_state);
            }
        }
        Ok(())
    }

    pub(super) fn step_hexadecimal_character_reference_start(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if ch.is_ascii_hexdigit() => {
                self.reconsume_in(State::HexadecimalCharacterReference);
            }
            Some(_) => {
                self.err_behind(ParseErrorCode::AbsenceOfDigitsInNumericCharacterReference);
                self.flush_char_ref_literal();
                self.reconsume_in(self.ctl.return_state);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::AbsenceOfDigitsInNumericCharacterReference);
                self.flush_char_ref_literal();
                self.reconsume_at_eof(self.ctl.return_state);
            }
        }
        Ok(())
    }

    pub(super) fn step_hexadecimal_character_reference(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if ch.is_ascii_digit() => self.accumulate_reference_code(16, ch as u32 - 0x30),
            Some(ch @ 'A'..='F') => self.accumulate_reference_code(16, ch as u32 - 0x37),
            Some(ch @ 'a'..='f') => self.accumulate_reference_code(16, ch as u32 - 0x57),
            Some(';') => self.switch(State::NumericCharacterReferenceEnd),
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingSemicolonAfterCharacterReference);
                self.reconsume_in(State::NumericCharacterReferenceEnd);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::MissingSemicolonAfterCharacterReference);
                self.reconsume_at_eof(State::NumericCharacterReferenceEnd);
            }
        }
        Ok(())
    }

    pub(super) fn step_decimal_character_reference(&mut self) -> StateResult {
        match self.consume()? {
            Some(ch) if ch.is_ascii_digit() => self.accumulate_reference_code(10, ch as u32 - 0x30),
            Some(';') => self.switch(State::NumericCharacterReferenceEnd),
            Some(_) => {
                self.err_behind(ParseErrorCode::MissingSemicolonAfterCharacterReference);
                self.reconsume_in(State::NumericCharacterReferenceEnd);
            }
            None => {
                self.err_at_cursor(ParseErrorCode::MissingSemicolonAfterCharacterReference);
                self.reconsume_at_eof(State::NumericCharacterReferenceEnd);
            }
        }
        Ok(())
    }

    fn accumulate_reference_code(&mut self, radix: u32, digit: u32) {
        // Saturation keeps the accumulator above 0x10FFFF once it overflows,
        // which the end state folds to U+FFFD.
        self.char_ref_code = self
            .char_ref_code
            .saturating_mul(radix)
            .saturating_add(digit);
    }

    /// Consumes nothing: validates the accumulated code, remaps or replaces
    /// it, flushes and returns to the entry state.
    pub(super) fn step_numeric_character_reference_end(&mut self) -> StateResult {
        let code = self.char_ref_code;
        let ch = match code {
            0 => {
                self.err_at_cursor(ParseErrorCode::NullCharacterReference);
                REPLACEMENT
            }
            code if code > 0x10FFFF => {
                self.err_at_cursor(ParseErrorCode::CharacterReferenceOutsideUnicodeRange);
                REPLACEMENT
            }
            code if (0xD800..=0xDFFF).contains(&code) => {
                self.err_at_cursor(ParseErrorCode::SurrogateCharacterReference);
                REPLACEMENT
            }
            code if is_noncharacter(code) => {
                self.err_at_cursor(ParseErrorCode::NoncharacterCharacterReference);
                char::from_u32(code).unwrap_or(REPLACEMENT)
            }
            code if code == 0x0D || is_control(code) => {
                self.err_at_cursor(ParseErrorCode::ControlCharacterReference);
                match C1_REMAP.iter().find(|&&(from, _)| from == code) {
                    Some(&(_, to)) => to,
                    None => char::from_u32(code).unwrap_or(REPLACEMENT),
                }
            }
            code => char::from_u32(code).unwrap_or(REPLACEMENT),
        };
        self.flush_char_ref_char(ch);
        self.switch(self.ctl.return_state);
        Ok(())
    }
}

/// A control per the numeric-reference rules: C0 or C1, excluding the ASCII
/// whitespace the reference rules admit.
fn is_control(code: u32) -> bool {
    let is_c0_or_c1 = code < 0x20 || (0x7F..=0x9F).contains(&code);
    is_c0_or_c1 && !matches!(code, 0x09 | 0x0A | 0x0C | 0x20)
}
