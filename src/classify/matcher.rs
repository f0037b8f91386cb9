use std::cell::{Cell, OnceCell};
use std::marker::PhantomData;

use regex::Regex;

use super::Group;
use crate::config::ConfigError;

/// Compile a pattern so that it only matches at the start of a path.
///
/// The pattern need not consume the whole path: `^airflow/api` matches
/// `airflow/api/common.py`.
fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{pattern})"))
}

/// Compiled regex patterns for every member of a group enum.
#[derive(Debug)]
pub struct PatternTable<G: Group> {
    regexes: Vec<Vec<Regex>>,
    _group: PhantomData<G>,
}

impl<G: Group> PatternTable<G> {
    /// Compile the patterns `source` yields for each group member.
    pub fn compile<'a>(mut source: impl FnMut(G) -> &'a [String]) -> Result<Self, ConfigError> {
        let mut regexes = Vec::with_capacity(G::ALL.len());
        for &group in G::ALL {
            let compiled = source(group)
                .iter()
                .map(|pattern| {
                    anchored(pattern).map_err(|source| ConfigError::InvalidPattern {
                        group: group.key().to_string(),
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            regexes.push(compiled);
        }
        Ok(Self {
            regexes,
            _group: PhantomData,
        })
    }

    /// Check whether `path` matches any pattern of `group`.
    pub fn is_match(&self, group: G, path: &str) -> bool {
        self.regexes[group.index()].iter().any(|re| re.is_match(path))
    }

    /// The ordered subsequence of `files` matching `group`.
    pub fn matching(&self, group: G, files: &[String]) -> Vec<String> {
        files
            .iter()
            .filter(|f| self.is_match(group, f))
            .cloned()
            .collect()
    }

    /// Number of patterns configured for `group`.
    pub fn pattern_count(&self, group: G) -> usize {
        self.regexes[group.index()].len()
    }
}

/// Per-run memo of match results, one slot per group member.
///
/// A slot is filled the first time its group is queried and never
/// recomputed; the file list is fixed for the lifetime of a run.
#[derive(Debug)]
pub struct MatchCache<G: Group> {
    slots: Vec<OnceCell<Vec<String>>>,
    computed: Cell<usize>,
    _group: PhantomData<G>,
}

impl<G: Group> Default for MatchCache<G> {
    fn default() -> Self {
        Self {
            slots: G::ALL.iter().map(|_| OnceCell::new()).collect(),
            computed: Cell::new(0),
            _group: PhantomData,
        }
    }
}

impl<G: Group> MatchCache<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files matching `group`, computed on first use.
    pub fn get_or_match(&self, group: G, table: &PatternTable<G>, files: &[String]) -> &[String] {
        self.slots[group.index()].get_or_init(|| {
            self.computed.set(self.computed.get() + 1);
            let matched = table.matching(group, files);
            if matched.is_empty() {
                log::info!("{} did not match any file", group.key());
            } else {
                log::info!("{} matched {} files", group.key(), matched.len());
                log::debug!("{}: {:?}", group.key(), matched);
            }
            matched
        })
    }

    /// How many distinct groups have been matched so far.
    pub fn computations(&self) -> usize {
        self.computed.get()
    }
}
