//! Streaming `<title>` extraction.
//!
//! Response bodies are untrusted and may be unbounded, so the body is fed to
//! an HTML tokenizer one chunk at a time and scanning stops at the end of the
//! first title element. At most [`MAX_SCAN_BYTES`] are read before giving up.

use std::io;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Bodies with no complete title within this many bytes have no title.
pub const MAX_SCAN_BYTES: usize = 1 << 20;

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum TitleError {
    #[error("failed to read response body")]
    Read(#[source] io::Error),
}

#[derive(Debug, Default, PartialEq, Eq)]
enum Scan {
    #[default]
    Searching,
    InTitle,
    Done,
}

/// Collects the character data of the first `<title>`.
///
/// The tokenizer has no tree builder behind it, so this sink switches it into
/// the raw text states that HTML gives `title`, `script` and friends.
#[derive(Default)]
struct TitleSink {
    scan: Scan,
    title: String,
}

impl TitleSink {
    fn start_tag(&mut self, name: &str) -> TokenSinkResult<()> {
        match name {
            "title" => {
                self.scan = Scan::InTitle;
                TokenSinkResult::RawData(RawKind::Rcdata)
            }
            "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "plaintext" => TokenSinkResult::Plaintext,
            _ => TokenSinkResult::Continue,
        }
    }

    fn is_done(&self) -> bool {
        self.scan == Scan::Done
    }

    fn into_title(self) -> Option<String> {
        match self.scan {
            Scan::Done => Some(self.title.trim().to_string()),
            _ => None,
        }
    }
}

impl TokenSink for TitleSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match self.scan {
            Scan::Searching => match token {
                Token::TagToken(tag) if tag.kind == TagKind::StartTag => {
                    return self.start_tag(&tag.name);
                }
                _ => {}
            },
            Scan::InTitle => match token {
                Token::CharacterTokens(text) => self.title.push_str(&text),
                Token::NullCharacterToken | Token::ParseError(_) => {}
                _ => self.scan = Scan::Done,
            },
            Scan::Done => {}
        }
        TokenSinkResult::Continue
    }
}

/// Turns a byte stream into text, holding back a code point split across reads.
/// Invalid sequences become U+FFFD.
#[derive(Default)]
struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut text = String::with_capacity(self.pending.len());
        let mut rest = self.pending.as_slice();
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        let consumed = self.pending.len() - rest.len();
        self.pending.drain(..consumed);
        text
    }

    fn finish(self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

/// Returns the text of the first `<title>` element in `body`.
///
/// Running out of markup, or scanning [`MAX_SCAN_BYTES`] without closing a
/// title, yields `Ok(None)`. A failure of the underlying reader is an error.
pub async fn extract_title<R>(mut body: R) -> Result<Option<String>, TitleError>
where
    R: AsyncRead + Unpin,
{
    let mut tokenizer = Tokenizer::new(TitleSink::default(), TokenizerOpts::default());
    let mut input = BufferQueue::new();
    let mut decoder = Utf8Stream::default();
    let mut chunk = [0u8; READ_CHUNK];
    let mut scanned = 0;

    while !tokenizer.sink.is_done() {
        let budget = MAX_SCAN_BYTES - scanned;
        if budget == 0 {
            log::debug!("No title within the first {MAX_SCAN_BYTES} bytes");
            return Ok(None);
        }

        let want = budget.min(READ_CHUNK);
        let read = body
            .read(&mut chunk[..want])
            .await
            .map_err(TitleError::Read)?;
        if read == 0 {
            let tail = std::mem::take(&mut decoder).finish();
            if !tail.is_empty() {
                input.push_back(StrTendril::from(tail));
                let _ = tokenizer.feed(&mut input);
            }
            tokenizer.end();
            break;
        }
        scanned += read;

        let text = decoder.decode(&chunk[..read]);
        if !text.is_empty() {
            input.push_back(StrTendril::from(text));
            let _ = tokenizer.feed(&mut input);
        }
    }

    Ok(tokenizer.sink.into_title())
}
