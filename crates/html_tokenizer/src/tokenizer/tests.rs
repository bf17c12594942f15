use super::{State, Tokenizer, TokenizerOptions};
use crate::error::ParseError;
use crate::handler::{TokenHandler, TokenizerCtl};
use crate::tags::TagId;
use crate::token::{
    CharacterKind, CharacterToken, CommentToken, DoctypeToken, EofToken, TagToken, Token,
};
use std::fmt::Write as _;

/// Collects the stream and emulates the tree constructor's mode switches for
/// the raw-text elements, so RCDATA/RAWTEXT/script data paths are reachable
/// from markup alone.
#[derive(Default)]
struct Sink {
    tokens: Vec<Token>,
    errors: Vec<ParseError>,
    emulate_tree: bool,
    pause_on_start_tag: bool,
    insert_on_script: Option<String>,
}

impl TokenHandler for Sink {
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
        if token.tag_id == TagId::Script
            && let Some(chunk) = self.insert_on_script.take()
        {
            ctl.insert_html_at_current_pos(&chunk);
        }
        if self.pause_on_start_tag {
            ctl.pause();
        }
        self.tokens.push(Token::StartTag(token.clone()));
    }

    fn on_end_tag(&mut self, token: &TagToken, ctl: &mut TokenizerCtl) {
        if self.emulate_tree
            && matches!(token.tag_id, TagId::Svg | TagId::Math)
        {
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

fn tree_aware_sink() -> Sink {
    Sink {
        emulate_tree: true,
        ..Sink::default()
    }
}

fn tokenize(input: &str) -> Sink {
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), tree_aware_sink());
    tokenizer.write(input, true);
    tokenizer.into_handler()
}

fn snapshot(tokens: &[Token]) -> Vec<String> {
    tokens.iter().map(fmt_token).collect()
}

fn fmt_token(token: &Token) -> String {
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
            format!("{kind}({})", run.chars.escape_debug())
        }
        Token::Eof(_) => "Eof".to_string(),
    }
}

fn error_codes(sink: &Sink) -> Vec<&'static str> {
    sink.errors.iter().map(|e| e.code.as_code()).collect()
}

#[test]
fn start_tag_text_end_tag() {
    let sink = tokenize("<p class=\"a\">hi</p>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "StartTag(p class=\"a\")",
            "Text(hi)",
            "EndTag(p)",
            "Eof",
        ]
    );
    assert!(sink.errors.is_empty());
}

#[test]
fn tag_names_and_attribute_names_fold_to_lowercase() {
    let sink = tokenize("<DIV CLASS=Box ID=a></DIV>");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert_eq!(tag.name, "div");
    assert_eq!(tag.tag_id, TagId::Div);
    assert_eq!(tag.attrs[0].name, "class");
    // Attribute values keep their case.
    assert_eq!(tag.attrs[0].value, "Box");
    assert_eq!(tag.attrs[1].name, "id");
}

#[test]
fn comment_token_keeps_inner_data() {
    let sink = tokenize("<!-- x -->");
    assert_eq!(snapshot(&sink.tokens), vec!["Comment( x )", "Eof"]);
    assert!(sink.errors.is_empty());
}

#[test]
fn named_references_in_data() {
    let sink = tokenize("&amp;&notin;&notit;");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Text(&\u{2209}\u{00AC}it;)", "Eof"]
    );
    assert_eq!(
        error_codes(&sink),
        vec!["missing-semicolon-after-character-reference"]
    );
}

#[test]
fn unknown_named_reference_is_left_literal() {
    let sink = tokenize("&noentity;");
    assert_eq!(snapshot(&sink.tokens), vec!["Text(&noentity;)", "Eof"]);
    assert_eq!(
        error_codes(&sink),
        vec!["unknown-named-character-reference"]
    );
}

#[test]
fn bare_ampersand_is_literal_text() {
    let sink = tokenize("fish & chips");
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "Text(fish)",
            "Space( )",
            "Text(&)",
            "Space( )",
            "Text(chips)",
            "Eof"
        ]
    );
    assert!(sink.errors.is_empty());
}

#[test]
fn doctype_html() {
    let sink = tokenize("<!DOCTYPE html>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Doctype(html public=- system=- quirks=false)", "Eof"]
    );
    assert!(sink.errors.is_empty());
}

#[test]
fn doctype_with_public_and_system_identifiers() {
    let sink = tokenize(
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.01//EN\" \"http://www.w3.org/TR/html4/strict.dtd\">",
    );
    let Token::Doctype(doctype) = &sink.tokens[0] else {
        panic!("expected a doctype, got {:?}", sink.tokens[0]);
    };
    assert_eq!(doctype.name.as_deref(), Some("html"));
    assert_eq!(doctype.public_id.as_deref(), Some("-//W3C//DTD HTML 4.01//EN"));
    assert_eq!(
        doctype.system_id.as_deref(),
        Some("http://www.w3.org/TR/html4/strict.dtd")
    );
    assert!(!doctype.force_quirks);
    assert!(sink.errors.is_empty());
}

#[test]
fn abrupt_doctype_public_identifier_forces_quirks() {
    let sink = tokenize("<!DOCTYPE html PUBLIC \"oops>");
    let Token::Doctype(doctype) = &sink.tokens[0] else {
        panic!("expected a doctype, got {:?}", sink.tokens[0]);
    };
    assert!(doctype.force_quirks);
    assert_eq!(error_codes(&sink), vec!["abrupt-doctype-public-identifier"]);
}

#[test]
fn script_double_escape_round_trip() {
    let sink = tokenize("<script><!--<script>x</script>--></script>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "StartTag(script)",
            "Text(<!--<script>x</script>-->)",
            "EndTag(script)",
            "Eof",
        ]
    );
    assert!(sink.errors.is_empty());
}

#[test]
fn duplicate_attribute_first_wins() {
    let sink = tokenize("<a x=1 x=2>");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert_eq!(tag.attrs.len(), 1);
    assert_eq!(tag.attrs[0].name, "x");
    assert_eq!(tag.attrs[0].value, "1");
    assert_eq!(error_codes(&sink), vec!["duplicate-attribute"]);
    // The error points at the second `x`.
    assert_eq!(sink.errors[0].at.offset, 7);
}

#[test]
fn character_runs_coalesce_and_split_on_kind_changes() {
    let sink = tokenize("ab \t\ncd");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Text(ab)", "Space( \\t\\n)", "Text(cd)", "Eof"]
    );
}

#[test]
fn null_in_data_is_its_own_run_kind() {
    let sink = tokenize("a\0b");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Text(a)", "Null(\\0)", "Text(b)", "Eof"]
    );
    assert_eq!(error_codes(&sink), vec!["unexpected-null-character"]);
}

#[test]
fn pending_run_flushes_before_a_tag() {
    let sink = tokenize("x<b>y");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Text(x)", "StartTag(b)", "Text(y)", "Eof"]
    );
}

#[test]
fn rcdata_references_decode_but_tags_stay_text() {
    let sink = tokenize("<title>a &amp; </x></title>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "StartTag(title)",
            "Text(a)",
            "Space( )",
            "Text(&)",
            "Space( )",
            "Text(</x>)",
            "EndTag(title)",
            "Eof",
        ]
    );
}

#[test]
fn rawtext_decodes_no_references() {
    let sink = tokenize("<style>a&amp;b</style>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["StartTag(style)", "Text(a&amp;b)", "EndTag(style)", "Eof"]
    );
}

#[test]
fn appropriate_end_tag_is_case_insensitive() {
    let sink = tokenize("<title>x</TITLE>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["StartTag(title)", "Text(x)", "EndTag(title)", "Eof"]
    );
}

#[test]
fn non_matching_end_tag_in_script_data_stays_text() {
    let sink = tokenize("<script>x</scripty");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["StartTag(script)", "Text(x</scripty)", "Eof"]
    );
}

#[test]
fn numeric_references_decode() {
    let sink = tokenize("&#65;&#x41;&#x2209;");
    assert_eq!(snapshot(&sink.tokens), vec!["Text(AA\u{2209})", "Eof"]);
    assert!(sink.errors.is_empty());
}

#[test]
fn numeric_reference_error_folding() {
    let sink = tokenize("&#0;&#xD800;&#x110000;&#x80;&#xFDD0;");
    let Token::Character(run) = &sink.tokens[0] else {
        panic!("expected a character run, got {:?}", sink.tokens[0]);
    };
    assert_eq!(run.chars, "\u{FFFD}\u{FFFD}\u{FFFD}\u{20AC}\u{FDD0}");
    assert_eq!(
        error_codes(&sink),
        vec![
            "null-character-reference",
            "surrogate-character-reference",
            "character-reference-outside-unicode-range",
            "control-character-reference",
            "noncharacter-character-reference",
        ]
    );
}

#[test]
fn numeric_reference_without_digits_is_literal() {
    let sink = tokenize("&#;&#x;");
    assert_eq!(snapshot(&sink.tokens), vec!["Text(&#;&#x;)", "Eof"]);
    assert_eq!(
        error_codes(&sink),
        vec![
            "absence-of-digits-in-numeric-character-reference",
            "absence-of-digits-in-numeric-character-reference",
        ]
    );
}

#[test]
fn numeric_reference_missing_semicolon_still_decodes() {
    let sink = tokenize("&#65 x");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Text(A)", "Space( )", "Text(x)", "Eof"]
    );
    assert_eq!(
        error_codes(&sink),
        vec!["missing-semicolon-after-character-reference"]
    );
}

#[test]
fn attribute_value_legacy_reference_rule() {
    // `&not` followed by `=`/alphanumeric inside an attribute stays literal.
    let sink = tokenize("<a href=\"x?a=b&not=c\">");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert_eq!(tag.attrs[0].value, "x?a=b&not=c");
    assert!(sink.errors.is_empty());

    // Outside that carve-out the legacy reference decodes with an error.
    let sink = tokenize("<a href=\"&not-\">");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert_eq!(tag.attrs[0].value, "\u{00AC}-");
    assert_eq!(
        error_codes(&sink),
        vec!["missing-semicolon-after-character-reference"]
    );
}

#[test]
fn eof_in_tag_discards_the_partial_tag() {
    let sink = tokenize("<div cls");
    assert_eq!(snapshot(&sink.tokens), vec!["Eof"]);
    assert_eq!(error_codes(&sink), vec!["eof-in-tag"]);
}

#[test]
fn eof_in_comment_emits_the_partial_comment() {
    let sink = tokenize("<!--x");
    assert_eq!(snapshot(&sink.tokens), vec!["Comment(x)", "Eof"]);
    assert_eq!(error_codes(&sink), vec!["eof-in-comment"]);
}

#[test]
fn eof_in_doctype_forces_quirks() {
    let sink = tokenize("<!DOCTYPE htm");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Doctype(htm public=- system=- quirks=true)", "Eof"]
    );
    assert_eq!(error_codes(&sink), vec!["eof-in-doctype"]);
}

#[test]
fn cdata_in_foreign_content_is_text() {
    let sink = tokenize("<svg><![CDATA[x]]y]]></svg>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "StartTag(svg)",
            "Text(x]]y)",
            "EndTag(svg)",
            "Eof",
        ]
    );
    assert!(sink.errors.is_empty());
}

#[test]
fn cdata_in_html_content_is_a_bogus_comment() {
    let sink = tokenize("<![CDATA[x]]>");
    assert_eq!(snapshot(&sink.tokens), vec!["Comment([CDATA[x]])", "Eof"]);
    assert_eq!(error_codes(&sink), vec!["cdata-in-html-content"]);
}

#[test]
fn processing_instruction_becomes_bogus_comment() {
    let sink = tokenize("<?xml version=\"1.0\"?>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Comment(?xml version=\"1.0\"?)", "Eof"]
    );
    assert_eq!(
        error_codes(&sink),
        vec!["unexpected-question-mark-instead-of-tag-name"]
    );
}

#[test]
fn empty_end_tag_vanishes_with_an_error() {
    // No token is emitted for `</>`, so the surrounding characters coalesce
    // into one run.
    let sink = tokenize("a</>b");
    assert_eq!(snapshot(&sink.tokens), vec!["Text(ab)", "Eof"]);
    assert_eq!(error_codes(&sink), vec!["missing-end-tag-name"]);
}

#[test]
fn end_tag_with_attributes_is_reported() {
    let sink = tokenize("</p x=1>");
    assert_eq!(error_codes(&sink), vec!["end-tag-with-attributes"]);
    let sink = tokenize("</p/>");
    assert_eq!(error_codes(&sink), vec!["end-tag-with-trailing-solidus"]);
}

#[test]
fn self_closing_flag_is_set() {
    let sink = tokenize("<br/>");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert!(tag.self_closing);
    assert!(!tag.ack_self_closing);
}

#[test]
fn nested_comment_markup_reports_nested_comment() {
    let sink = tokenize("<!-- a <!-- b --> c -->");
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "Comment( a <!-- b )",
            "Space( )",
            "Text(c)",
            "Space( )",
            "Text(-->)",
            "Eof"
        ]
    );
    assert_eq!(error_codes(&sink), vec!["nested-comment"]);
}

#[test]
fn plaintext_consumes_everything() {
    let sink = tokenize("<plaintext></plaintext>");
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["StartTag(plaintext)", "Text(</plaintext>)", "Eof"]
    );
}

#[test]
fn token_locations_reconstruct_the_source() {
    let input = "<p id=x>hi\nthere</p>";
    let sink = tokenize(input);
    let chars: Vec<char> = input.chars().collect();
    for token in &sink.tokens {
        let location = match token {
            Token::StartTag(t) => t.location,
            Token::EndTag(t) => t.location,
            Token::Character(t) => t.location,
            Token::Eof(t) => t.location,
            Token::Comment(t) => t.location,
            Token::Doctype(t) => t.location,
        };
        let location = location.expect("locations are on by default");
        assert!(location.start.offset <= location.end.offset);
        assert!(location.start.line <= location.end.line);
        let source: String = chars[location.start.offset..location.end.offset]
            .iter()
            .collect();
        match token {
            Token::StartTag(t) => {
                assert!(source.starts_with('<') && source.ends_with('>'), "{source}");
                assert!(source[1..].starts_with(&t.name));
            }
            Token::EndTag(t) => {
                assert!(source.starts_with("</"), "{source}");
                assert!(source[2..].starts_with(&t.name));
            }
            Token::Character(t) => assert_eq!(source, t.chars),
            Token::Eof(_) => assert!(source.is_empty()),
            _ => {}
        }
    }
}

#[test]
fn token_locations_track_lines_and_columns() {
    let sink = tokenize("a\n<b>");
    let Token::StartTag(tag) = &sink.tokens[2] else {
        panic!("expected a start tag, got {:?}", sink.tokens[2]);
    };
    let location = tag.location.expect("locations are on by default");
    assert_eq!(location.start.line, 2);
    assert_eq!(location.start.col, 1);
    assert_eq!(location.start.offset, 2);
    assert_eq!(location.end.col, 4);
}

#[test]
fn locations_can_be_disabled() {
    let mut tokenizer = Tokenizer::new(
        TokenizerOptions {
            source_code_location_info: false,
        },
        tree_aware_sink(),
    );
    tokenizer.write("<p>x</p>", true);
    let sink = tokenizer.into_handler();
    for token in &sink.tokens {
        let location = match token {
            Token::StartTag(t) | Token::EndTag(t) => t.location,
            Token::Character(t) => t.location,
            Token::Eof(t) => t.location,
            Token::Comment(t) => t.location,
            Token::Doctype(t) => t.location,
        };
        assert!(location.is_none(), "unexpected location on {token:?}");
    }
}

#[test]
fn pause_suspends_the_loop_and_resume_continues() {
    let sink = Sink {
        emulate_tree: true,
        pause_on_start_tag: true,
        ..Sink::default()
    };
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), sink);
    tokenizer.write("<a>x<b>y", true);
    assert_eq!(
        snapshot(&tokenizer.handler().tokens),
        vec!["StartTag(a)"],
        "the loop must stop at the pausing callback"
    );
    tokenizer.handler_mut().pause_on_start_tag = false;
    tokenizer.resume();
    assert_eq!(
        snapshot(&tokenizer.handler().tokens),
        vec!["StartTag(a)", "Text(x)", "StartTag(b)", "Text(y)", "Eof"]
    );
}

#[test]
fn insertion_during_a_callback_is_tokenized_next() {
    let sink = Sink {
        emulate_tree: false,
        insert_on_script: Some("<b>w</b>".to_string()),
        ..Sink::default()
    };
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), sink);
    tokenizer.write("<script></script>tail", true);
    let sink = tokenizer.into_handler();
    assert_eq!(
        snapshot(&sink.tokens),
        vec![
            "StartTag(script)",
            "StartTag(b)",
            "Text(w)",
            "EndTag(b)",
            "EndTag(script)",
            "Text(tail)",
            "Eof",
        ]
    );
}

#[test]
fn insert_html_at_current_pos_between_writes() {
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), tree_aware_sink());
    tokenizer.write("<a>", false);
    tokenizer.insert_html_at_current_pos("<i>");
    tokenizer.write("</a>", true);
    let sink = tokenizer.into_handler();
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["StartTag(a)", "StartTag(i)", "EndTag(a)", "Eof"]
    );
}

#[test]
fn state_is_writable_between_writes() {
    let mut tokenizer = Tokenizer::new(TokenizerOptions::default(), Sink::default());
    tokenizer.ctl_mut().set_state(State::Plaintext);
    tokenizer.write("<not a tag>", true);
    let sink = tokenizer.into_handler();
    assert_eq!(
        snapshot(&sink.tokens),
        vec!["Text(<not)", "Space( )", "Text(a)", "Space( )", "Text(tag>)", "Eof"]
    );
}

#[test]
fn whitespace_only_input_is_a_whitespace_run() {
    let sink = tokenize(" \t\n ");
    assert_eq!(snapshot(&sink.tokens), vec!["Space( \\t\\n )", "Eof"]);
}

#[test]
fn unquoted_attribute_value_terminates_on_whitespace() {
    let sink = tokenize("<a href=x.png alt=y>");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert_eq!(tag.attrs[0].value, "x.png");
    assert_eq!(tag.attrs[1].value, "y");
    assert!(sink.errors.is_empty());
}

#[test]
fn missing_attribute_value_is_reported() {
    let sink = tokenize("<a href=>");
    let Token::StartTag(tag) = &sink.tokens[0] else {
        panic!("expected a start tag, got {:?}", sink.tokens[0]);
    };
    assert_eq!(tag.attrs[0].value, "");
    assert_eq!(error_codes(&sink), vec!["missing-attribute-value"]);
}
