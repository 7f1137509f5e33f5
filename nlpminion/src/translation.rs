//! Decoder output records.
use std::fmt;
use std::str::FromStr;

use crate::common::FIELD_SEPARATOR;
use crate::errors::{MinionError, Result};
use crate::feature_vector::FeatureVector;

/// One translation as returned by the decoder.
///
/// The decoder fields are fixed on construction. The BLEU score and the ranks are filled in
/// later by [`KbestList`](crate::KbestList).
#[derive(Clone, Debug, PartialEq)]
pub struct Translation {
    id: String,
    string: String,
    features: FeatureVector,
    decoder_score: f64,
    bleu_score: Option<f64>,
    decoder_rank: Option<usize>,
    bleu_rank: Option<usize>,
}

impl Translation {
    /// Creates a new record.
    pub fn new<I, S>(id: I, string: S, features: FeatureVector, decoder_score: f64) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            string: string.into(),
            features,
            decoder_score,
            bleu_score: None,
            decoder_rank: None,
            bleu_rank: None,
        }
    }

    /// Parses one line of a k-best list.
    ///
    /// The line has the form `id ||| string ||| feature=value ... ||| score`.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when the line does not have exactly four fields, or when
    /// a feature or the score cannot be parsed.
    pub fn from_kbest_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim().split(FIELD_SEPARATOR).collect();
        let &[id, string, features, score] = fields.as_slice() else {
            return Err(MinionError::invalid_format(
                "kbest",
                format!("expected 4 fields, got {}: {line:?}", fields.len()),
            ));
        };
        Ok(Self::new(
            id.trim(),
            string.trim(),
            features.parse()?,
            score.trim().parse()?,
        ))
    }

    /// Renders the record back into k-best format.
    pub fn to_kbest_line(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}{sep}{}",
            self.id,
            self.string,
            self.features,
            self.decoder_score,
            sep = FIELD_SEPARATOR,
        )
    }

    /// Identifier of the input sentence.
    #[inline(always)]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Translated string.
    #[inline(always)]
    pub fn string(&self) -> &str {
        &self.string
    }

    /// Feature values the decoder fired for this translation.
    #[inline(always)]
    pub fn features(&self) -> &FeatureVector {
        &self.features
    }

    /// Model score reported by the decoder.
    #[inline(always)]
    pub fn decoder_score(&self) -> f64 {
        self.decoder_score
    }

    /// Per-sentence BLEU, once scored.
    #[inline(always)]
    pub fn bleu_score(&self) -> Option<f64> {
        self.bleu_score
    }

    /// 0-based position among the translations of the same input in decoder order.
    #[inline(always)]
    pub fn decoder_rank(&self) -> Option<usize> {
        self.decoder_rank
    }

    /// 0-based position among the translations of the same input in descending BLEU.
    #[inline(always)]
    pub fn bleu_rank(&self) -> Option<usize> {
        self.bleu_rank
    }

    /// Sets the per-sentence BLEU.
    pub fn set_bleu_score(&mut self, score: f64) {
        self.bleu_score = Some(score);
    }

    /// Sets the position in decoder order.
    pub fn set_decoder_rank(&mut self, rank: usize) {
        self.decoder_rank = Some(rank);
    }

    /// Sets the position in descending BLEU.
    pub fn set_bleu_rank(&mut self, rank: usize) {
        self.bleu_rank = Some(rank);
    }
}

impl FromStr for Translation {
    type Err = MinionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_kbest_line(s)
    }
}

struct Field<T>(Option<T>);

impl<T: fmt::Display> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.0 {
            Some(v) => v.fmt(f),
            None => f.write_str("None"),
        }
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<{}:{}:{}:{}:{}>",
            self.string,
            self.decoder_score,
            Field(self.bleu_score),
            Field(self.decoder_rank),
            Field(self.bleu_rank),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "1 ||| where there are restaurants in edinburgh where smoking is not allowed ? ||| Glue=2 LanguageModel=-30.2871 WordPenalty=-5.21129 ||| -4.73151\n";

    #[test]
    fn test_parse() {
        let t: Translation = LINE.parse().unwrap();
        assert_eq!(t.id(), "1");
        assert_eq!(
            t.string(),
            "where there are restaurants in edinburgh where smoking is not allowed ?"
        );
        assert_eq!(t.decoder_score(), -4.73151);
        assert_eq!(t.features().get("Glue"), Some(2.0));
        assert_eq!(t.features().get("LanguageModel"), Some(-30.2871));
        assert_eq!(t.features().len(), 3);
        assert_eq!(t.bleu_score(), None);
        assert_eq!(t.decoder_rank(), None);
        assert_eq!(t.bleu_rank(), None);
    }

    #[test]
    fn test_no_features() {
        let t: Translation = "0 ||| a b |||  ||| 0.5".parse().unwrap();
        assert!(t.features().is_empty());
        assert_eq!(t.decoder_score(), 0.5);
    }

    #[test]
    fn test_wrong_field_count() {
        let e = "0 ||| a b ||| 0.5".parse::<Translation>().unwrap_err();
        assert!(matches!(e, MinionError::InvalidFormat(_)));
    }

    #[test]
    fn test_bad_score() {
        let e = "0 ||| a ||| F=1 ||| high".parse::<Translation>().unwrap_err();
        assert!(matches!(e, MinionError::ParseFloat(_)));
    }

    #[test]
    fn test_to_kbest_line() {
        let t: Translation = "3 ||| a b ||| b=2 a=1 ||| -1.5".parse().unwrap();
        assert_eq!(t.to_kbest_line(), "3 ||| a b ||| a=1.0 b=2.0 ||| -1.5");
        assert_eq!(t.to_kbest_line().parse::<Translation>().unwrap(), t);
    }

    #[test]
    fn test_display() {
        let mut t: Translation = "3 ||| a b ||| a=1 ||| -1.5".parse().unwrap();
        assert_eq!(t.to_string(), "<a b:-1.5:None:None:None>");
        t.set_bleu_score(0.25);
        t.set_decoder_rank(0);
        t.set_bleu_rank(2);
        assert_eq!(t.to_string(), "<a b:-1.5:0.25:0:2>");

        let mut t: Translation = "0 ||| c |||  ||| 2".parse().unwrap();
        t.set_decoder_rank(1);
        assert_eq!(t.to_string(), "<c:2:None:1:None>");
    }
}
