use criterion::{Criterion, black_box, criterion_group, criterion_main};

use html_tokenizer::{
    CharacterToken, CommentToken, DoctypeToken, EofToken, ParseError, State, TagId, TagToken,
    TokenHandler, Tokenizer, TokenizerCtl, TokenizerOptions,
};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

/// Counts instead of collecting: keeps the bench on the tokenizer, not on
/// token cloning.
#[derive(Default)]
struct CountingHandler {
    tokens: u64,
    errors: u64,
}

impl TokenHandler for CountingHandler {
    fn on_start_tag(&mut self, token: &mut TagToken, ctl: &mut TokenizerCtl) {
        if token.tag_id == TagId::Script {
            ctl.set_state(State::ScriptData);
        }
        self.tokens += 1;
    }

    fn on_end_tag(&mut self, _token: &TagToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_comment(&mut self, _token: &CommentToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_doctype(&mut self, _token: &DoctypeToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_character(&mut self, _token: &CharacterToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_whitespace_character(&mut self, _token: &CharacterToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_null_character(&mut self, _token: &CharacterToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_eof(&mut self, _token: &EofToken, _ctl: &mut TokenizerCtl) {
        self.tokens += 1;
    }

    fn on_parse_error(&mut self, _error: &ParseError) {
        self.errors += 1;
    }
}

fn make_blocks(blocks: usize) -> String {
    let mut out = String::with_capacity(blocks * 52);
    for _ in 0..blocks {
        out.push_str("<div class=box><span>hello &amp; bye</span><img src=x></div>");
    }
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri");
        body.push('<');
        body.push_str("pt");
    }
    body.push_str("</script>");
    body
}

fn tokenize_counting(input: &str) -> u64 {
    let mut tokenizer = Tokenizer::new(
        TokenizerOptions::default(),
        CountingHandler::default(),
    );
    tokenizer.write(input, true);
    tokenizer.into_handler().tokens
}

fn bench_tokenize_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_small", |b| {
        b.iter(|| black_box(tokenize_counting(black_box(&input))));
    });
}

fn bench_tokenize_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_tokenize_large", |b| {
        b.iter(|| black_box(tokenize_counting(black_box(&input))));
    });
}

fn bench_tokenize_chunked(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_chunked_7", |b| {
        b.iter(|| {
            let mut tokenizer = Tokenizer::new(
                TokenizerOptions::default(),
                CountingHandler::default(),
            );
            let mut rest = input.as_str();
            while !rest.is_empty() {
                let mut end = rest.len().min(7);
                while !rest.is_char_boundary(end) {
                    end -= 1;
                }
                let (chunk, tail) = rest.split_at(end);
                tokenizer.write(chunk, false);
                rest = tail;
            }
            tokenizer.write("", true);
            black_box(tokenizer.into_handler().tokens)
        });
    });
}

fn bench_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(64 * 1024);
    c.bench_function("bench_rawtext_adversarial", |b| {
        b.iter(|| black_box(tokenize_counting(black_box(&input))));
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_tokenize_large,
    bench_tokenize_chunked,
    bench_rawtext_adversarial
);
criterion_main!(benches);
