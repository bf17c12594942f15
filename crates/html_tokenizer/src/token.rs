//! Token data model.
//!
//! Tokens are built incrementally in the tokenizer's scratch and handed to
//! the handler by reference on emission; a handler that keeps one past its
//! callback must clone it. Tag names arrive already lowercased.

use crate::location::Location;
use crate::tags::TagId;

/// A single attribute of a tag token.
///
/// Attribute order is first-occurrence order; a repeated name is dropped at
/// tag-finalization time with a `duplicate-attribute` error (the first wins).
/// `prefix`/`namespace` stay `None` at the tokenization layer; the tree
/// constructor fills them for foreign-content attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub prefix: Option<String>,
    pub namespace: Option<String>,
}

/// Start-tag or end-tag token; the two share one shape and are distinguished
/// by which handler callback receives them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagToken {
    /// Lowercased tag name.
    pub name: String,
    pub tag_id: TagId,
    pub self_closing: bool,
    /// Set by the tree constructor when it honors `self_closing`.
    pub ack_self_closing: bool,
    pub attrs: Vec<Attribute>,
    pub location: Option<Location>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentToken {
    pub data: String,
    pub location: Option<Location>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoctypeToken {
    pub name: Option<String>,
    pub public_id: Option<String>,
    pub system_id: Option<String>,
    pub force_quirks: bool,
    pub location: Option<Location>,
}

/// Classification of a coalesced character run.
///
/// Invariant: adjacent character tokens never share a kind — a kind change
/// flushes the pending run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CharacterKind {
    Character,
    Whitespace,
    Null,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterToken {
    pub kind: CharacterKind,
    pub chars: String,
    pub location: Option<Location>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EofToken {
    pub location: Option<Location>,
}

/// Union of the token variants, used where a uniform stream is convenient
/// (collection, snapshots). The handler interface receives the typed structs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    StartTag(TagToken),
    EndTag(TagToken),
    Comment(CommentToken),
    Doctype(DoctypeToken),
    Character(CharacterToken),
    Eof(EofToken),
}
