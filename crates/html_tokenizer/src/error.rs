//! Parse errors reported during tokenization.
//!
//! Errors are data, not control flow: every code is reported through the
//! handler at the position of the offending code point and tokenization
//! continues under the per-state recovery rules.

use crate::location::Position;

/// The error codes of the HTML tokenization stage, including the input-stream
/// preprocessing errors.
///
/// `as_code()` returns the conventional kebab-case name, which is what test
/// snapshots and diagnostics print.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseErrorCode {
    // Input stream preprocessing.
    ControlCharacterInInputStream,
    NoncharacterInInputStream,
    SurrogateInInputStream,

    // Tags.
    EofBeforeTagName,
    EofInTag,
    MissingEndTagName,
    InvalidFirstCharacterOfTagName,
    UnexpectedQuestionMarkInsteadOfTagName,
    UnexpectedSolidusInTag,
    EndTagWithAttributes,
    EndTagWithTrailingSolidus,

    // Attributes.
    MissingWhitespaceBetweenAttributes,
    UnexpectedCharacterInAttributeName,
    UnexpectedEqualsSignBeforeAttributeName,
    MissingAttributeValue,
    UnexpectedCharacterInUnquotedAttributeValue,
    DuplicateAttribute,

    // Comments.
    AbruptClosingOfEmptyComment,
    EofInComment,
    IncorrectlyOpenedComment,
    IncorrectlyClosedComment,
    NestedComment,
    EofInScriptHtmlCommentLikeText,

    // DOCTYPE.
    EofInDoctype,
    MissingWhitespaceBeforeDoctypeName,
    MissingDoctypeName,
    InvalidCharacterSequenceAfterDoctypeName,
    MissingWhitespaceAfterDoctypePublicKeyword,
    MissingDoctypePublicIdentifier,
    MissingQuoteBeforeDoctypePublicIdentifier,
    AbruptDoctypePublicIdentifier,
    MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers,
    MissingWhitespaceAfterDoctypeSystemKeyword,
    MissingDoctypeSystemIdentifier,
    MissingQuoteBeforeDoctypeSystemIdentifier,
    AbruptDoctypeSystemIdentifier,
    UnexpectedCharacterAfterDoctypeSystemIdentifier,

    // CDATA.
    CdataInHtmlContent,
    EofInCdata,

    // Character references.
    AbsenceOfDigitsInNumericCharacterReference,
    MissingSemicolonAfterCharacterReference,
    UnknownNamedCharacterReference,
    NullCharacterReference,
    CharacterReferenceOutsideUnicodeRange,
    SurrogateCharacterReference,
    NoncharacterCharacterReference,
    ControlCharacterReference,

    // Text.
    UnexpectedNullCharacter,
}

impl ParseErrorCode {
    pub fn as_code(self) -> &'static str {
        use ParseErrorCode::*;
        match self {
            ControlCharacterInInputStream => "control-character-in-input-stream",
            NoncharacterInInputStream => "noncharacter-in-input-stream",
            SurrogateInInputStream => "surrogate-in-input-stream",
            EofBeforeTagName => "eof-before-tag-name",
            EofInTag => "eof-in-tag",
            MissingEndTagName => "missing-end-tag-name",
            InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
            UnexpectedQuestionMarkInsteadOfTagName => {
                "unexpected-question-mark-instead-of-tag-name"
            }
            UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            EndTagWithAttributes => "end-tag-with-attributes",
            EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",
            MissingWhitespaceBetweenAttributes => "missing-whitespace-between-attributes",
            UnexpectedCharacterInAttributeName => "unexpected-character-in-attribute-name",
            UnexpectedEqualsSignBeforeAttributeName => {
                "unexpected-equals-sign-before-attribute-name"
            }
            MissingAttributeValue => "missing-attribute-value",
            UnexpectedCharacterInUnquotedAttributeValue => {
                "unexpected-character-in-unquoted-attribute-value"
            }
            DuplicateAttribute => "duplicate-attribute",
            AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
            EofInComment => "eof-in-comment",
            IncorrectlyOpenedComment => "incorrectly-opened-comment",
            IncorrectlyClosedComment => "incorrectly-closed-comment",
            NestedComment => "nested-comment",
            EofInScriptHtmlCommentLikeText => "eof-in-script-html-comment-like-text",
            EofInDoctype => "eof-in-doctype",
            MissingWhitespaceBeforeDoctypeName => "missing-whitespace-before-doctype-name",
            MissingDoctypeName => "missing-doctype-name",
            InvalidCharacterSequenceAfterDoctypeName => {
                "invalid-character-sequence-after-doctype-name"
            }
            MissingWhitespaceAfterDoctypePublicKeyword => {
                "missing-whitespace-after-doctype-public-keyword"
            }
            MissingDoctypePublicIdentifier => "missing-doctype-public-identifier",
            MissingQuoteBeforeDoctypePublicIdentifier => {
                "missing-quote-before-doctype-public-identifier"
            }
            AbruptDoctypePublicIdentifier => "abrupt-doctype-public-identifier",
            MissingWhitespaceBetweenDoctypePublicAndSystemIdentifiers => {
                "missing-whitespace-between-doctype-public-and-system-identifiers"
            }
            MissingWhitespaceAfterDoctypeSystemKeyword => {
                "missing-whitespace-after-doctype-system-keyword"
            }
            MissingDoctypeSystemIdentifier => "missing-doctype-system-identifier",
            MissingQuoteBeforeDoctypeSystemIdentifier => {
                "missing-quote-before-doctype-system-identifier"
            }
            AbruptDoctypeSystemIdentifier => "abrupt-doctype-system-identifier",
            UnexpectedCharacterAfterDoctypeSystemIdentifier => {
                "unexpected-character-after-doctype-system-identifier"
            }
            CdataInHtmlContent => "cdata-in-html-content",
            EofInCdata => "eof-in-cdata",
            AbsenceOfDigitsInNumericCharacterReference => {
                "absence-of-digits-in-numeric-character-reference"
            }
            MissingSemicolonAfterCharacterReference => {
                "missing-semicolon-after-character-reference"
            }
            UnknownNamedCharacterReference => "unknown-named-character-reference",
            NullCharacterReference => "null-character-reference",
            CharacterReferenceOutsideUnicodeRange => "character-reference-outside-unicode-range",
            SurrogateCharacterReference => "surrogate-character-reference",
            NoncharacterCharacterReference => "noncharacter-character-reference",
            ControlCharacterReference => "control-character-reference",
            UnexpectedNullCharacter => "unexpected-null-character",
        }
    }
}

/// A reported parse error, positioned at the offending code point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub at: Position,
}

impl ParseError {
    pub fn new(code: ParseErrorCode, at: Position) -> Self {
        Self { code, at }
    }
}
