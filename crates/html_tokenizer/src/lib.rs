//! Streaming HTML5 tokenizer.
//!
//! A push-driven tokenizer for the WHATWG HTML tokenization algorithm. Input
//! arrives in chunks through [`Tokenizer::write`]; tokens and parse errors are
//! delivered synchronously, in stream order, to a [`TokenHandler`] supplied at
//! construction.
//!
//! Invariants:
//! - Chunk-equivalence: feeding input in one chunk or many chunks yields the
//!   same tokens and the same parse errors at the same positions.
//! - A partial chunk never produces a partial token: when the buffer runs dry
//!   mid-construct, the machine rewinds to the last state entry and suspends
//!   until the next `write` (hibernation).
//! - Handler callbacks observe tokens in emission order; a pending character
//!   run is always flushed before any non-character token.
//!
//! The tree constructor drives mode switches (RCDATA/RAWTEXT/script data,
//! foreign content) by writing back through [`TokenizerCtl`] inside its
//! callbacks.

mod entities;
mod error;
mod handler;
mod location;
mod preprocessor;
mod tags;
mod token;
mod tokenizer;

pub use error::{ParseError, ParseErrorCode};
pub use handler::{TokenHandler, TokenizerCtl};
pub use location::{Location, Position};
pub use preprocessor::{Advance, Lookahead, Preprocessor};
pub use tags::TagId;
pub use token::{
    Attribute, CharacterKind, CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken,
    Token,
};
pub use tokenizer::{State, Tokenizer, TokenizerOptions};
