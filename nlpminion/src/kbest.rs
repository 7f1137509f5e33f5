//! K-best lists returned by the decoder.
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use hashbrown::HashMap;

use crate::bleu::BleuScorer;
use crate::errors::{MinionError, Result};
use crate::feature_vector::FeatureVector;
use crate::translation::Translation;

/// Translations of one or more input sentences in decoder output order.
///
/// Decoder ranks are assigned on construction: the n-th translation of an input gets rank
/// n - 1. BLEU ranks are assigned by [`KbestList::score_bleu`] and
/// [`KbestList::score_bleu_by_id`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KbestList {
    translations: Vec<Translation>,
}

impl KbestList {
    /// Creates a list from translations in decoder output order.
    pub fn new(translations: Vec<Translation>) -> Self {
        let mut list = Self { translations };
        for group in list.groups() {
            for (rank, i) in group.into_iter().enumerate() {
                list.translations[i].set_decoder_rank(rank);
            }
        }
        list
    }

    /// Reads one translation per line, skipping blank lines.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when a line is not a valid k-best entry.
    pub fn from_reader<R>(rdr: R) -> Result<Self>
    where
        R: BufRead,
    {
        let mut translations = vec![];
        for line in rdr.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            translations.push(Translation::from_kbest_line(&line)?);
        }
        Ok(Self::new(translations))
    }

    /// Number of translations over all inputs.
    pub fn len(&self) -> usize {
        self.translations.len()
    }

    /// Checks if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    /// Iterates over the translations in decoder output order.
    pub fn iter(&self) -> std::slice::Iter<'_, Translation> {
        self.translations.iter()
    }

    /// Input identifiers in order of first appearance.
    pub fn ids(&self) -> Vec<&str> {
        self.groups()
            .into_iter()
            .map(|g| self.translations[g[0]].id())
            .collect()
    }

    /// Translations of input `id` in decoder order.
    pub fn entries<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Translation> {
        self.translations.iter().filter(move |t| t.id() == id)
    }

    /// Translation of input `id` the decoder scored best.
    pub fn best_by_decoder(&self, id: &str) -> Option<&Translation> {
        self.entries(id).find(|t| t.decoder_rank() == Some(0))
    }

    /// Translation of input `id` with the highest BLEU, once scored.
    pub fn oracle(&self, id: &str) -> Option<&Translation> {
        self.entries(id).find(|t| t.bleu_rank() == Some(0))
    }

    /// Scores every translation against the same references and ranks by BLEU.
    ///
    /// Intended for the output of a single input sentence.
    pub fn score_bleu<S>(&mut self, scorer: &BleuScorer, references: &[S]) -> Result<()>
    where
        S: AsRef<str>,
    {
        for t in &mut self.translations {
            let bleu = scorer.score(t.string(), references)?;
            t.set_bleu_score(bleu);
        }
        self.assign_bleu_ranks();
        Ok(())
    }

    /// Scores every translation against `references[id]` and ranks by BLEU.
    ///
    /// Identifiers are 0-based line numbers of the decoder input, as the decoder assigns them
    /// when reading a file.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when an identifier is not a number or has no references.
    pub fn score_bleu_by_id<S>(&mut self, scorer: &BleuScorer, references: &[Vec<S>]) -> Result<()>
    where
        S: AsRef<str>,
    {
        for t in &mut self.translations {
            let idx: usize = t.id().parse()?;
            let refs = references.get(idx).ok_or_else(|| {
                MinionError::invalid_argument(
                    "references",
                    format!("no references for sentence {idx}"),
                )
            })?;
            let bleu = scorer.score(t.string(), refs)?;
            t.set_bleu_score(bleu);
        }
        self.assign_bleu_ranks();
        Ok(())
    }

    /// Sums `features(decoder best) - features(oracle)` over the inputs.
    ///
    /// Inputs whose decoder best is already the oracle, or that are not scored yet, contribute
    /// nothing. A descent step along the result moves the weights toward the oracles.
    pub fn hope_fear_gradient(&self) -> FeatureVector {
        let mut gradient = FeatureVector::new();
        for group in self.groups() {
            let best = group
                .iter()
                .copied()
                .find(|&i| self.translations[i].decoder_rank() == Some(0));
            let oracle = group
                .iter()
                .copied()
                .find(|&i| self.translations[i].bleu_rank() == Some(0));
            if let (Some(best), Some(oracle)) = (best, oracle)
                && best != oracle
            {
                gradient.add(self.translations[best].features());
                gradient.subtract(self.translations[oracle].features());
            }
        }
        gradient
    }

    /// Indices of the translations of each input, in order of first appearance.
    fn groups(&self) -> Vec<Vec<usize>> {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = vec![];
        for (i, t) in self.translations.iter().enumerate() {
            let g = *index.entry(t.id()).or_insert_with(|| {
                groups.push(vec![]);
                groups.len() - 1
            });
            groups[g].push(i);
        }
        groups
    }

    fn assign_bleu_ranks(&mut self) {
        for mut group in self.groups() {
            let bleu = |i: usize| self.translations[i].bleu_score().unwrap_or(f64::NEG_INFINITY);
            // Stable, so ties stay in decoder order.
            group.sort_by(|&a, &b| bleu(b).total_cmp(&bleu(a)));
            for (rank, i) in group.into_iter().enumerate() {
                self.translations[i].set_bleu_rank(rank);
            }
        }
    }
}

impl FromStr for KbestList {
    type Err = MinionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reader(s.as_bytes())
    }
}

impl fmt::Display for KbestList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for t in &self.translations {
            writeln!(f, "{}", t.to_kbest_line())?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a KbestList {
    type Item = &'a Translation;
    type IntoIter = std::slice::Iter<'a, Translation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
