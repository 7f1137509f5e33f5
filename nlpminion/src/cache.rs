//! Cache of previously parsed sentences.
//!
//! Each line holds a sentence and a record of how it was handled:
//!
//! ```text
//! how many rivers are in texas ? ||| (True, "answer(count(river(loc_2(stateid('texas')))))", "42")
//! ```
use std::fmt;
use std::io::{BufRead, Write};

use hashbrown::HashMap;

use crate::common::FIELD_SEPARATOR;
use crate::errors::{MinionError, Result};
use crate::store::KeyValueStore;

/// Record stored for one sentence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// Whether the answer obtained for the sentence was correct.
    pub correct: bool,

    /// Meaning representation produced for the sentence.
    pub mrl: String,

    /// Answer obtained by executing the meaning representation.
    pub answer: String,
}

impl CacheEntry {
    /// Creates a new record.
    pub fn new<M, A>(correct: bool, mrl: M, answer: A) -> Self
    where
        M: Into<String>,
        A: Into<String>,
    {
        Self {
            correct,
            mrl: mrl.into(),
            answer: answer.into(),
        }
    }

    /// Parses `(True, "mrl", "answer")`.
    fn parse(s: &str) -> Result<Self> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| MinionError::invalid_format("cache", format!("not a tuple: {s:?}")))?;

        let (correct, rest) = inner.split_once(", ").ok_or_else(|| {
            MinionError::invalid_format("cache", format!("expected three fields: {s:?}"))
        })?;
        // The answer is the last quoted field; the MRL may itself contain `", "`.
        let (mrl, answer) = unquote(rest)?.rsplit_once("\", \"").ok_or_else(|| {
            MinionError::invalid_format("cache", format!("expected three fields: {s:?}"))
        })?;

        let correct = match correct {
            "True" => true,
            "False" => false,
            _ => {
                return Err(MinionError::invalid_format(
                    "cache",
                    format!("invalid boolean: {correct:?}"),
                ));
            }
        };
        Ok(Self::new(correct, mrl, answer))
    }
}

fn unquote(s: &str) -> Result<&str> {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| MinionError::invalid_format("cache", format!("unquoted field: {s:?}")))
}

impl fmt::Display for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let correct = if self.correct { "True" } else { "False" };
        write!(f, "({}, \"{}\", \"{}\")", correct, self.mrl, self.answer)
    }
}

/// Sentence-keyed store of [`CacheEntry`] records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cache {
    map: HashMap<String, CacheEntry>,
}

impl Cache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record of `sentence`, if cached.
    pub fn get(&self, sentence: &str) -> Option<&CacheEntry> {
        self.map.get(sentence)
    }

    /// Stores `entry` for `sentence`, returning the previous record.
    pub fn insert<S>(&mut self, sentence: S, entry: CacheEntry) -> Option<CacheEntry>
    where
        S: Into<String>,
    {
        self.map.insert(sentence.into(), entry)
    }

    /// Removes the record of `sentence`.
    pub fn remove(&mut self, sentence: &str) -> Option<CacheEntry> {
        self.map.remove(sentence)
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Checks if `sentence` is cached.
    pub fn contains_key(&self, sentence: &str) -> bool {
        self.map.contains_key(sentence)
    }

    /// Number of cached sentences.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Checks if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over the records in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn sorted_entries(&self) -> Vec<(&str, &CacheEntry)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl KeyValueStore for Cache {
    /// Lines starting with the field separator belong to sentences without a translation and
    /// are skipped.
    fn read_entries<R>(&mut self, rdr: R) -> Result<()>
    where
        R: BufRead,
    {
        for line in rdr.lines() {
            let line = line?;
            if line.starts_with(FIELD_SEPARATOR) {
                continue;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (sentence, entry) = line.split_once(FIELD_SEPARATOR).ok_or_else(|| {
                MinionError::invalid_format("cache", format!("missing separator in {line:?}"))
            })?;
            self.insert(sentence, CacheEntry::parse(entry)?);
        }
        Ok(())
    }

    fn write_entries<W>(&self, mut wtr: W) -> Result<()>
    where
        W: Write,
    {
        for (sentence, entry) in self.sorted_entries() {
            writeln!(wtr, "{}{}{}", sentence, FIELD_SEPARATOR, entry)?;
        }
        Ok(())
    }
}

impl fmt::Display for Cache {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("{")?;
        for (i, (sentence, entry)) in self.sorted_entries().into_iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{sentence}': {entry}")?;
        }
        f.write_str("}")
    }
}
