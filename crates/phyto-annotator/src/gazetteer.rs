//! Gazetteer storage and classification
//!
//! A gazetteer is a named dictionary of plant-name surface forms, loaded
//! from one file per category. Each gazetteer is classified as unigram or
//! multiword from its longest entry, and the store keeps gazetteers in an
//! explicit priority order that decides which category wins a contested
//! token during tagging.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use aho_corasick::AhoCorasick;
use tracing::{debug, info};

use phyto_core::{AnnotationConfig, PhytoError, Result, SpanLengthRule};

// ============================================================================
// Gazetteer
// ============================================================================

/// Classification derived from the longest entry of a gazetteer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GazetteerKind {
    Unigram,
    Multiword,
}

impl std::fmt::Display for GazetteerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unigram => write!(f, "unigram"),
            Self::Multiword => write!(f, "multiword"),
        }
    }
}

/// An immutable dictionary of names for one entity category
#[derive(Debug, Clone)]
pub struct Gazetteer {
    category: String,
    entries: BTreeSet<String>,
    /// Multi-token entries split on single spaces, keyed by first token
    phrases: HashMap<String, Vec<Vec<String>>>,
    max_span_length: usize,
    kind: GazetteerKind,
    /// Substring automaton over all entries, used as a cheap sentence filter
    prefilter: Option<AhoCorasick>,
    source: Option<PathBuf>,
}

impl Gazetteer {
    /// Build a gazetteer from in-memory entries. Empty entries are dropped.
    pub fn new<I, S>(category: impl Into<String>, entries: I, rule: SpanLengthRule) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let category = category.into();
        let entries: BTreeSet<String> = entries
            .into_iter()
            .map(Into::into)
            .filter(|e: &String| !e.is_empty())
            .collect();

        let max_spaces = entries
            .iter()
            .map(|e| e.matches(' ').count())
            .max()
            .unwrap_or(0);
        let max_span_length = match rule {
            SpanLengthRule::Tokens => 1 + max_spaces,
            SpanLengthRule::LegacySpaces => max_spaces.max(1),
        };
        let kind = if max_span_length == 1 {
            GazetteerKind::Unigram
        } else {
            GazetteerKind::Multiword
        };

        let mut phrases: HashMap<String, Vec<Vec<String>>> = HashMap::new();
        if kind == GazetteerKind::Multiword {
            for entry in entries.iter().filter(|e| e.contains(' ')) {
                let tokens: Vec<String> = entry.split(' ').map(str::to_string).collect();
                phrases.entry(tokens[0].clone()).or_default().push(tokens);
            }
        }

        let prefilter = if entries.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::new(&entries).map_err(|e| {
                PhytoError::ConfigError(format!(
                    "Failed to build matcher for gazetteer '{category}': {e}"
                ))
            })?;
            Some(automaton)
        };

        Ok(Self {
            category,
            entries,
            phrases,
            max_span_length,
            kind,
            prefilter,
            source: None,
        })
    }

    /// Load a gazetteer file; the category is the file name without extension
    pub fn from_file(path: &Path, rule: SpanLengthRule) -> Result<Self> {
        let category = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PhytoError::ConfigError(format!("Invalid gazetteer file name: {}", path.display()))
            })?
            .to_string();

        let bytes = std::fs::read(path).map_err(|e| PhytoError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let content =
            String::from_utf8(bytes).map_err(|_| PhytoError::Encoding(path.to_path_buf()))?;

        let mut gazetteer = Self::new(category, content.lines(), rule)?;
        gazetteer.source = Some(path.to_path_buf());
        Ok(gazetteer)
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn kind(&self) -> GazetteerKind {
        self.kind
    }

    /// Length in tokens of the longest entry, as measured by the load rule
    pub fn max_span_length(&self) -> usize {
        self.max_span_length
    }

    /// Number of distinct entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// File this gazetteer was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// True if any entry occurs as a substring of `text`
    pub fn occurs_in(&self, text: &str) -> bool {
        self.prefilter
            .as_ref()
            .is_some_and(|automaton| automaton.is_match(text))
    }

    /// Multi-token entries whose first token is `first`
    pub(crate) fn phrases_starting_with(&self, first: &str) -> &[Vec<String>] {
        self.phrases.get(first).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Overlap priority among categories
///
/// Categories pinned explicitly come first, in the listed order. All other
/// categories follow by ascending dictionary size, ties broken by name.
#[derive(Debug, Clone, Default)]
pub struct Priority {
    pinned: Vec<String>,
}

impl Priority {
    pub fn new(pinned: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            pinned: pinned.into_iter().map(Into::into).collect(),
        }
    }

    fn key<'a>(&self, gazetteer: &'a Gazetteer) -> (usize, usize, &'a str) {
        let pinned = self
            .pinned
            .iter()
            .position(|c| c == gazetteer.category())
            .unwrap_or(usize::MAX);
        (pinned, gazetteer.len(), gazetteer.category())
    }

    /// Sort gazetteers from highest to lowest priority
    pub fn sort(&self, gazetteers: &mut [Gazetteer]) {
        gazetteers.sort_by(|a, b| self.key(a).cmp(&self.key(b)));
    }
}

// ============================================================================
// Gazetteer Store
// ============================================================================

/// All loaded gazetteers, in priority order
#[derive(Debug, Clone, Default)]
pub struct GazetteerStore {
    gazetteers: Vec<Gazetteer>,
    by_category: HashMap<String, usize>,
}

impl GazetteerStore {
    /// Build a store with the default (cardinality) priority
    pub fn new(gazetteers: Vec<Gazetteer>) -> Result<Self> {
        Self::with_priority(gazetteers, &Priority::default())
    }

    /// Build a store; fails if two gazetteers share a category
    pub fn with_priority(mut gazetteers: Vec<Gazetteer>, priority: &Priority) -> Result<Self> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (idx, gazetteer) in gazetteers.iter().enumerate() {
            if let Some(first) = seen.insert(gazetteer.category(), idx) {
                return Err(PhytoError::DuplicateCategory {
                    category: gazetteer.category().to_string(),
                    first: source_or_memory(&gazetteers[first]),
                    second: source_or_memory(gazetteer),
                });
            }
        }

        priority.sort(&mut gazetteers);
        let by_category = gazetteers
            .iter()
            .enumerate()
            .map(|(idx, g)| (g.category().to_string(), idx))
            .collect();

        Ok(Self {
            gazetteers,
            by_category,
        })
    }

    /// Load every gazetteer file in one directory with default settings
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let config = AnnotationConfig {
            gazetteer_dirs: vec![dir.as_ref().to_path_buf()],
            ..AnnotationConfig::default()
        };
        Self::from_config(&config)
    }

    /// Load and merge all configured gazetteer directories
    pub fn from_config(config: &AnnotationConfig) -> Result<Self> {
        let mut gazetteers = Vec::new();
        for dir in &config.gazetteer_dirs {
            for path in gazetteer_files(dir, config.gazetteer_extension.as_deref())? {
                let gazetteer = Gazetteer::from_file(&path, config.span_length_rule)?;
                debug!(
                    category = gazetteer.category(),
                    entries = gazetteer.len(),
                    kind = %gazetteer.kind(),
                    "Loaded gazetteer"
                );
                gazetteers.push(gazetteer);
            }
        }

        let priority = Priority::new(config.priority.iter().cloned());
        let store = Self::with_priority(gazetteers, &priority)?;
        info!(
            gazetteers = store.len(),
            unigram = store.iter().filter(|g| g.kind() == GazetteerKind::Unigram).count(),
            multiword = store.iter().filter(|g| g.kind() == GazetteerKind::Multiword).count(),
            "Gazetteer store ready"
        );
        Ok(store)
    }

    pub fn get(&self, category: &str) -> Option<&Gazetteer> {
        self.by_category.get(category).map(|&idx| &self.gazetteers[idx])
    }

    /// Priority rank of a category (0 wins over everything)
    pub fn rank(&self, category: &str) -> Option<usize> {
        self.by_category.get(category).copied()
    }

    /// Gazetteers from highest to lowest priority
    pub fn iter(&self) -> impl Iterator<Item = &Gazetteer> {
        self.gazetteers.iter()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.gazetteers.iter().map(Gazetteer::category)
    }

    pub fn len(&self) -> usize {
        self.gazetteers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gazetteers.is_empty()
    }
}

fn source_or_memory(gazetteer: &Gazetteer) -> PathBuf {
    gazetteer
        .source()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("<memory>"))
}

/// Regular, non-hidden files of a directory, sorted by name
fn gazetteer_files(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    let io_err = |e| PhytoError::Io {
        path: dir.to_path_buf(),
        source: e,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() {
            continue;
        }
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if let Some(ext) = extension {
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
        }
        files.push(path);
    }

    files.sort();
    Ok(files)
}

// ============================================================================
// Tests
// ============================================================================
