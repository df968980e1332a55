//! Corpus annotation
//!
//! Tags token-row corpora (`token\tlemma\tpos`) with gazetteer IOB labels,
//! writing `token\tlemma\tpos\tIOB` rows. A malformed row is reported and
//! written back unchanged with an `O` tag, so the output stays aligned
//! row for row with its input.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use phyto_core::{PhytoError, Result, Tag};

use crate::format::{io_error, leading_field, LineError, TokenRow};
use crate::gazetteer::GazetteerStore;
use crate::matcher::SentenceMatcher;
use crate::resolver::SpanResolver;

/// Input files picked up in directory mode
pub const TOKEN_FILE_SUFFIX: &str = ".tok.pos.txt";

/// Suffix replacing `.txt` on annotated output files
pub const IOB_FILE_SUFFIX: &str = ".iob.txt";

/// Counts reported after annotating one or more files
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnnotationSummary {
    pub files: usize,
    pub sentences: usize,
    pub tokens: usize,
    /// Number of `B-` tags emitted
    pub entities: usize,
    pub errors: Vec<LineError>,
}

impl AnnotationSummary {
    pub fn merge(&mut self, other: AnnotationSummary) {
        self.files += other.files;
        self.sentences += other.sentences;
        self.tokens += other.tokens;
        self.entities += other.entities;
        self.errors.extend(other.errors);
    }
}

/// One input row of the sentence being collected
enum CorpusRow {
    Token(TokenRow),
    /// Raw text of a row that did not parse
    Malformed(String),
}

impl CorpusRow {
    fn token(&self) -> Option<&str> {
        match self {
            CorpusRow::Token(row) => Some(&row.token),
            CorpusRow::Malformed(_) => None,
        }
    }

    fn write_tagged<W: Write>(&self, writer: &mut W, tag: &Tag) -> std::io::Result<()> {
        match self {
            CorpusRow::Token(row) => row.write_tagged(writer, tag),
            CorpusRow::Malformed(raw) => writeln!(writer, "{raw}\t{tag}"),
        }
    }
}

/// Tags sentences against a gazetteer store
pub struct Annotator<'a> {
    matcher: SentenceMatcher<'a>,
    resolver: SpanResolver,
}

impl<'a> Annotator<'a> {
    pub fn new(store: &'a GazetteerStore) -> Self {
        Self {
            matcher: SentenceMatcher::new(store),
            resolver: SpanResolver::new(),
        }
    }

    /// Tag one tokenized sentence
    pub fn tag<S: AsRef<str>>(&mut self, sentence: &[S]) -> Result<Vec<Tag>> {
        let matches = self.matcher.find(sentence);
        self.resolver.resolve(sentence.len(), &matches)
    }

    /// Annotate a token-row stream
    pub fn annotate_corpus<R: BufRead, W: Write>(
        &mut self,
        reader: R,
        mut writer: W,
    ) -> Result<AnnotationSummary> {
        let mut summary = AnnotationSummary::default();
        let mut rows: Vec<CorpusRow> = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| io_error("token input", e))?;
            if line.is_empty() {
                self.flush_sentence(&mut rows, &mut writer, &mut summary)?;
                continue;
            }
            match TokenRow::parse(&line, idx + 1) {
                Ok(row) => rows.push(CorpusRow::Token(row)),
                Err(e) => {
                    warn!(
                        line = e.line,
                        token = leading_field(&line),
                        "Malformed row left untagged: {}",
                        e.message
                    );
                    summary.errors.push(e);
                    rows.push(CorpusRow::Malformed(line));
                }
            }
        }
        self.flush_sentence(&mut rows, &mut writer, &mut summary)?;

        writer.flush().map_err(|e| io_error("annotated output", e))?;
        Ok(summary)
    }

    fn flush_sentence<W: Write>(
        &mut self,
        rows: &mut Vec<CorpusRow>,
        writer: &mut W,
        summary: &mut AnnotationSummary,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        // Malformed rows stay `O` and split the sentence into runs that
        // are tagged independently, so no span crosses them
        let mut tags = vec![Tag::Outside; rows.len()];
        let mut start = 0;
        while start < rows.len() {
            let run: Vec<&str> = rows[start..].iter().map_while(CorpusRow::token).collect();
            if run.is_empty() {
                start += 1;
                continue;
            }
            let run_tags = self.tag(&run)?;
            tags[start..start + run.len()].clone_from_slice(&run_tags);
            start += run.len();
        }

        let out_err = |e| io_error("annotated output", e);
        for (row, tag) in rows.iter().zip(&tags) {
            row.write_tagged(writer, tag).map_err(out_err)?;
        }
        writeln!(writer).map_err(out_err)?;

        summary.sentences += 1;
        summary.tokens += rows.len();
        summary.entities += tags.iter().filter(|t| t.is_begin()).count();
        rows.clear();
        Ok(())
    }

    /// Annotate one file into `output`
    pub fn annotate_file(&mut self, input: &Path, output: &Path) -> Result<AnnotationSummary> {
        let reader = File::open(input).map_err(|e| PhytoError::Io {
            path: input.to_path_buf(),
            source: e,
        })?;
        let writer = File::create(output).map_err(|e| PhytoError::Io {
            path: output.to_path_buf(),
            source: e,
        })?;

        let mut summary = self.annotate_corpus(BufReader::new(reader), BufWriter::new(writer))?;
        summary.files = 1;

        info!(
            file = %input.display(),
            sentences = summary.sentences,
            entities = summary.entities,
            errors = summary.errors.len(),
            "Annotated file"
        );
        Ok(summary)
    }

    /// Annotate every `*.tok.pos.txt` file of a directory in name order
    pub fn annotate_dir(&mut self, dir: &Path) -> Result<AnnotationSummary> {
        let io_err = |e| PhytoError::Io {
            path: dir.to_path_buf(),
            source: e,
        };

        let mut inputs = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let is_token_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TOKEN_FILE_SUFFIX));
            if path.is_file() && is_token_file {
                inputs.push(path);
            }
        }
        inputs.sort();

        let mut summary = AnnotationSummary::default();
        for input in inputs {
            let output = iob_output_path(&input);
            summary.merge(self.annotate_file(&input, &output)?);
        }
        Ok(summary)
    }
}

/// `corpus.tok.pos.txt` -> `corpus.tok.pos.iob.txt`
pub fn iob_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name.strip_suffix(".txt").unwrap_or(&name);
    input.with_file_name(format!("{stem}{IOB_FILE_SUFFIX}"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gazetteer::Gazetteer;
    use crate::metrics::Evaluator;
    use phyto_core::SpanLengthRule;
    use std::io::Cursor;

    fn store() -> GazetteerStore {
        GazetteerStore::new(vec![
            Gazetteer::new("lat_genus", ["Angelonia", "Bellis"], SpanLengthRule::Tokens).unwrap(),
            Gazetteer::new(
                "lat_species",
                ["Bellis perennis", "Calceolaria integrifolia", "Viola odorata"],
                SpanLengthRule::Tokens,
            )
            .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_tag_sentence() {
        let store = store();
        let mut annotator = Annotator::new(&store);

        let tags = annotator.tag(&["Angelonia", "species", "found"]).unwrap();
        let rendered: Vec<String> = tags.iter().map(Tag::to_string).collect();
        assert_eq!(rendered, vec!["B-lat_genus", "O", "O"]);
    }

    #[test]
    fn test_smaller_gazetteer_claims_shared_token() {
        let store = store();
        let mut annotator = Annotator::new(&store);

        // lat_genus (2 entries) outranks lat_species (3 entries)
        let tags = annotator.tag(&["Bellis", "perennis"]).unwrap();
        let rendered: Vec<String> = tags.iter().map(Tag::to_string).collect();
        assert_eq!(rendered, vec!["B-lat_genus", "O"]);
    }

    #[test]
    fn test_annotate_corpus() {
        let store = store();
        let mut annotator = Annotator::new(&store);
        let input = "Sie\tsie\tPPER\nfand\tfinden\tVVFIN\nCalceolaria\tCalceolaria\tNE\n\
                     integrifolia\tintegrifolia\tNE\n\nkaputt\nAngelonia\tAngelonia\tNE";

        let mut out = Vec::new();
        let summary = annotator.annotate_corpus(Cursor::new(input), &mut out).unwrap();

        assert_eq!(summary.sentences, 2);
        assert_eq!(summary.tokens, 6);
        assert_eq!(summary.entities, 2);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].line, 6);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Sie\tsie\tPPER\tO\n\
             fand\tfinden\tVVFIN\tO\n\
             Calceolaria\tCalceolaria\tNE\tB-lat_species\n\
             integrifolia\tintegrifolia\tNE\tI-lat_species\n\
             \n\
             kaputt\tO\n\
             Angelonia\tAngelonia\tNE\tB-lat_genus\n\
             \n"
        );
    }

    #[test]
    fn test_malformed_row_keeps_rows_aligned() {
        let store = store();
        let mut annotator = Annotator::new(&store);
        let input = "Die\tdie\tART\n\
                     Gewöhnliche\tADJA\n\
                     Bellis\tBellis\tNE\n";

        let mut silver = Vec::new();
        let summary = annotator.annotate_corpus(Cursor::new(input), &mut silver).unwrap();
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].line, 2);

        let gold = "Die\tdie\tART\tO\n\
                    Gewöhnliche\tgewöhnlich\tADJA\tO\n\
                    Bellis\tBellis\tNE\tB-lat_genus\n\
                    \n";
        let evaluation = Evaluator::new()
            .evaluate(Cursor::new(silver), Cursor::new(gold))
            .unwrap();
        assert_eq!(evaluation.metrics.true_positives, 1);
        assert_eq!(evaluation.metrics.false_negatives, 0);
        assert_eq!(evaluation.metrics.spurious, 0);
    }

    #[test]
    fn test_malformed_row_splits_multiword_match() {
        let store = store();
        let mut annotator = Annotator::new(&store);
        let input = "Viola\tViola\tNE\nkaputt\nodorata\todorata\tNE\n";

        let mut out = Vec::new();
        let summary = annotator.annotate_corpus(Cursor::new(input), &mut out).unwrap();
        assert_eq!(summary.entities, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Viola\tViola\tNE\tO\nkaputt\tO\nodorata\todorata\tNE\tO\n\n"
        );
    }

    #[test]
    fn test_iob_output_path() {
        assert_eq!(
            iob_output_path(Path::new("/data/corpus_de.tok.pos.txt")),
            PathBuf::from("/data/corpus_de.tok.pos.iob.txt")
        );
    }

    #[test]
    fn test_annotate_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.tok.pos.txt"),
            "Viola\tViola\tNE\nodorata\todorata\tNE\n\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "skip me\n").unwrap();

        let store = store();
        let summary = Annotator::new(&store).annotate_dir(dir.path()).unwrap();
        assert_eq!(summary.files, 1);
        assert_eq!(summary.entities, 1);

        let written = std::fs::read_to_string(dir.path().join("a.tok.pos.iob.txt")).unwrap();
        assert!(written.contains("Viola\tViola\tNE\tB-lat_species"));
        assert!(written.contains("odorata\todorata\tNE\tI-lat_species"));
    }
}
