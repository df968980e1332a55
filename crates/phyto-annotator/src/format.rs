//! Tagged-stream formats
//!
//! - Token rows: `token\tlemma\tpos`, blank line = sentence boundary
//!   (output of the external tokenizer/POS tagger)
//! - IOB rows: `token\tlemma\tpos\tIOB-tag`, blank line = sentence boundary
//! - Chunks: space-separated `token__TAG` pairs, one sentence per line
//!
//! Readers never abort on a malformed line. The offending line is recorded
//! as a [`LineError`]; only I/O failures are fatal. A malformed row inside
//! a sentence keeps its position as an `O` token so that later tokens
//! keep their sentence-relative indices.

use std::io::{BufRead, Write};
use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use phyto_core::{PhytoError, Result, Tag};

/// A format error recorded against one input line (1-based)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineError {
    pub line: usize,
    pub message: String,
}

impl From<LineError> for PhytoError {
    fn from(e: LineError) -> Self {
        PhytoError::Format {
            line: e.line,
            message: e.message,
        }
    }
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Supported tagged-stream layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    Iob,
    Chunks,
}

impl FromStr for TagFormat {
    type Err = PhytoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "iob" => Ok(Self::Iob),
            "chunks" => Ok(Self::Chunks),
            _ => Err(PhytoError::ConfigError(format!(
                "Unknown tag format '{s}' (expected iob or chunks)"
            ))),
        }
    }
}

// ============================================================================
// Rows
// ============================================================================

/// One untagged token row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRow {
    pub token: String,
    pub lemma: String,
    pub pos: String,
}

impl TokenRow {
    /// Parse `token\tlemma\tpos`
    pub fn parse(line: &str, line_no: usize) -> std::result::Result<Self, LineError> {
        match line.split('\t').collect::<Vec<_>>().as_slice() {
            [token, lemma, pos] => Ok(Self {
                token: token.to_string(),
                lemma: lemma.to_string(),
                pos: pos.to_string(),
            }),
            fields => Err(LineError {
                line: line_no,
                message: format!("expected 3 tab-separated fields, found {}", fields.len()),
            }),
        }
    }

    /// Write this row with its tag appended as a fourth column
    pub fn write_tagged<W: Write>(&self, writer: &mut W, tag: &Tag) -> std::io::Result<()> {
        writeln!(writer, "{}\t{}\t{}\t{}", self.token, self.lemma, self.pos, tag)
    }
}

/// One IOB-tagged row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRow {
    pub token: String,
    pub lemma: String,
    pub pos: String,
    pub tag: Tag,
}

impl TaggedRow {
    /// Parse `token\tlemma\tpos\tIOB`
    pub fn parse(line: &str, line_no: usize) -> std::result::Result<Self, LineError> {
        match line.split('\t').collect::<Vec<_>>().as_slice() {
            [token, lemma, pos, tag] => {
                let tag = tag.parse::<Tag>().map_err(|e| LineError {
                    line: line_no,
                    message: e.to_string(),
                })?;
                Ok(Self {
                    token: token.to_string(),
                    lemma: lemma.to_string(),
                    pos: pos.to_string(),
                    tag,
                })
            }
            fields => Err(LineError {
                line: line_no,
                message: format!("expected 4 tab-separated fields, found {}", fields.len()),
            }),
        }
    }
}

/// Parse one `token__TAG` chunk; the split is at the last `__`
pub fn parse_chunk(chunk: &str, line_no: usize) -> std::result::Result<(String, Tag), LineError> {
    let (token, tag) = chunk.rsplit_once("__").ok_or_else(|| LineError {
        line: line_no,
        message: format!("cannot split chunk '{chunk}' at '__'"),
    })?;
    let tag = tag.parse::<Tag>().map_err(|e| LineError {
        line: line_no,
        message: e.to_string(),
    })?;
    Ok((token.to_string(), tag))
}

/// Render a tagged sentence in chunk notation
pub fn chunk_line<S: AsRef<str>>(tokens: &[S], tags: &[Tag]) -> String {
    tokens
        .iter()
        .zip(tags)
        .map(|(token, tag)| format!("{}__{}", token.as_ref(), tag))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Tag streams
// ============================================================================

/// A normalized `(token, tag)` stream with explicit sentence ends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamItem {
    Token { token: String, tag: Tag },
    EndOfSentence,
}

/// A tag stream plus the format errors met while reading it
#[derive(Debug, Clone, Default)]
pub struct TagStream {
    pub items: Vec<StreamItem>,
    pub errors: Vec<LineError>,
}

impl TagStream {
    /// Number of sentence boundaries in the stream
    pub fn sentence_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, StreamItem::EndOfSentence))
            .count()
    }

    fn record(&mut self, error: LineError) {
        warn!(line = error.line, "Malformed line: {}", error.message);
        self.errors.push(error);
    }
}

/// Read a tagged stream in either format
///
/// Every sentence, including the last one when the input lacks a final
/// boundary, is terminated by [`StreamItem::EndOfSentence`]. Runs of
/// blank lines do not produce empty sentences.
pub fn read_tag_stream<R: BufRead>(reader: R, format: TagFormat) -> Result<TagStream> {
    match format {
        TagFormat::Iob => read_iob(reader),
        TagFormat::Chunks => read_chunks(reader),
    }
}

fn read_iob<R: BufRead>(reader: R) -> Result<TagStream> {
    let mut stream = TagStream::default();
    let mut open = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_error("tagged input", e))?;
        if line.is_empty() {
            if open {
                stream.items.push(StreamItem::EndOfSentence);
                open = false;
            }
            continue;
        }

        // A malformed row still occupies its slot in the sentence
        open = true;
        match TaggedRow::parse(&line, idx + 1) {
            Ok(row) => stream.items.push(StreamItem::Token {
                token: row.token,
                tag: row.tag,
            }),
            Err(e) => {
                stream.record(e);
                stream.items.push(StreamItem::Token {
                    token: leading_field(&line).to_string(),
                    tag: Tag::Outside,
                });
            }
        }
    }

    if open {
        stream.items.push(StreamItem::EndOfSentence);
    }
    Ok(stream)
}

fn read_chunks<R: BufRead>(reader: R) -> Result<TagStream> {
    let mut stream = TagStream::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| io_error("chunk input", e))?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed: std::result::Result<Vec<_>, _> = line
            .split(' ')
            .filter(|c| !c.is_empty())
            .map(|chunk| parse_chunk(chunk, idx + 1))
            .collect();

        // A bad chunk drops the whole line; the sentence still counts so
        // that ordinals keep matching line order
        match parsed {
            Ok(pairs) => stream.items.extend(
                pairs
                    .into_iter()
                    .map(|(token, tag)| StreamItem::Token { token, tag }),
            ),
            Err(e) => stream.record(e),
        }
        stream.items.push(StreamItem::EndOfSentence);
    }

    Ok(stream)
}

/// Rewrite IOB rows as one space-joined tokenized sentence per line
///
/// Returns the number of sentences written.
pub fn write_sentence_lines<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<usize> {
    let mut sentence: Vec<String> = Vec::new();
    let mut written = 0;

    let mut flush = |sentence: &mut Vec<String>, writer: &mut W| -> Result<()> {
        if !sentence.is_empty() {
            writeln!(writer, "{}", sentence.join(" ")).map_err(|e| io_error("sentence output", e))?;
            sentence.clear();
            written += 1;
        }
        Ok(())
    };

    for line in reader.lines() {
        let line = line.map_err(|e| io_error("tagged input", e))?;
        if line.is_empty() {
            flush(&mut sentence, &mut writer)?;
        } else if let Some(token) = line.split('\t').next() {
            sentence.push(token.to_string());
        }
    }
    flush(&mut sentence, &mut writer)?;
    writer.flush().map_err(|e| io_error("sentence output", e))?;

    Ok(written)
}

/// First tab-separated field of a row, the token column
pub(crate) fn leading_field(line: &str) -> &str {
    line.split('\t').next().unwrap_or_default()
}

pub(crate) fn io_error(what: &str, source: std::io::Error) -> PhytoError {
    PhytoError::Io {
        path: what.into(),
        source,
    }
}

// ============================================================================
// Tests
// ============================================================================
