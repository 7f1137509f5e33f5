//! Per-sentence BLEU (Nakov et al., 2012).
//!
//! Corpus-level BLEU is not computed here; see [`BleuScript`](crate::decoder::BleuScript).
use hashbrown::HashMap;

use crate::common::{DEFAULT_NGRAM_ORDER, DEFAULT_SMOOTH};
use crate::errors::{MinionError, Result};

/// Scorer of per-sentence BLEU.
///
/// ```
/// use nlpminion::BleuScorer;
///
/// let scorer = BleuScorer::new().order(1)?;
/// let bleu = scorer.score(
///     "at how many places can i go climbing in paris ?",
///     &["in how many spots can i go climbing in paris ?"],
/// )?;
/// assert!((bleu - 9.0 / 11.0).abs() < 1e-12);
/// # Ok::<(), nlpminion::errors::MinionError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BleuScorer {
    order: usize,
    smooth: f64,
}

impl Default for BleuScorer {
    fn default() -> Self {
        Self {
            order: DEFAULT_NGRAM_ORDER,
            smooth: DEFAULT_SMOOTH,
        }
    }
}

impl BleuScorer {
    /// Creates a scorer of 4-gram BLEU without smoothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum n-gram order.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when `order` is zero.
    pub fn order(mut self, order: usize) -> Result<Self> {
        if order == 0 {
            return Err(MinionError::invalid_argument(
                "order",
                "the n-gram order must be positive",
            ));
        }
        self.order = order;
        Ok(self)
    }

    /// Sets the constant added to the matched reference length in the brevity penalty.
    pub const fn smooth(mut self, smooth: f64) -> Self {
        self.smooth = smooth;
        self
    }

    /// Maximum n-gram order.
    pub const fn ngram_order(&self) -> usize {
        self.order
    }

    /// Smoothing constant of the brevity penalty.
    pub const fn smoothing(&self) -> f64 {
        self.smooth
    }

    /// Scores `hyp` against one or more references.
    ///
    /// An empty hypothesis scores 0, as does a hypothesis sharing no unigram with the
    /// references.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when `references` is empty, even for an empty hypothesis.
    pub fn score<S>(&self, hyp: &str, references: &[S]) -> Result<f64>
    where
        S: AsRef<str>,
    {
        // Checked before the empty-hypothesis shortcut.
        if references.is_empty() {
            return Err(MinionError::invalid_argument(
                "references",
                "at least one reference is required",
            ));
        }

        let hyp_tokens = tokenize(hyp);
        if hyp_tokens.is_empty() {
            return Ok(0.0);
        }
        let ref_tokens: Vec<Vec<&str>> = references.iter().map(|r| tokenize(r.as_ref())).collect();

        let mut log_bleu = 0.0;
        for n in 1..=self.order {
            match log_precision(&hyp_tokens, &ref_tokens, n) {
                Some(p) => log_bleu += p,
                None => return Ok(0.0),
            }
        }

        let longest_ref = ref_tokens.iter().map(Vec::len).max().unwrap_or(0);
        log_bleu /= self.order.min(longest_ref) as f64;
        log_bleu += brevity_penalty(hyp_tokens.len(), &ref_tokens, self.smooth);

        Ok(log_bleu.exp())
    }
}

/// Per-sentence BLEU of `hyp` against `references` with n-gram order `n`.
///
/// Shorthand for `BleuScorer::new().order(n)?.smooth(smooth).score(hyp, references)`.
pub fn per_sentence_bleu<S>(hyp: &str, references: &[S], n: usize, smooth: f64) -> Result<f64>
where
    S: AsRef<str>,
{
    BleuScorer::new().order(n)?.smooth(smooth).score(hyp, references)
}

/// Log of the clipped n-gram precision of order `n`.
///
/// Each hypothesis n-gram is credited at most as often as it occurs in the reference that
/// contains it most often. From bigrams on, one is added to both the matches and the total.
/// Returns `None` when `n` is zero or there is no match to take the logarithm of.
pub fn ngram_log_precision<S>(hyp: &str, references: &[S], n: usize) -> Option<f64>
where
    S: AsRef<str>,
{
    if n == 0 {
        return None;
    }
    let hyp_tokens = tokenize(hyp);
    let ref_tokens: Vec<Vec<&str>> = references.iter().map(|r| tokenize(r.as_ref())).collect();
    log_precision(&hyp_tokens, &ref_tokens, n)
}

fn tokenize(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}

fn count_ngrams<'a, 't>(tokens: &'a [&'t str], n: usize) -> HashMap<&'a [&'t str], usize> {
    let mut counts = HashMap::new();
    for ngram in tokens.windows(n) {
        *counts.entry(ngram).or_insert(0) += 1;
    }
    counts
}

fn log_precision(hyp: &[&str], references: &[Vec<&str>], n: usize) -> Option<f64> {
    let hyp_counts = count_ngrams(hyp, n);
    let ref_counts: Vec<_> = references.iter().map(|r| count_ngrams(r, n)).collect();

    let mut total = 0;
    let mut clipped = 0;
    for (ngram, &count) in &hyp_counts {
        let max_ref = ref_counts
            .iter()
            .filter_map(|c| c.get(ngram))
            .copied()
            .max()
            .unwrap_or(0);
        clipped += count.min(max_ref);
        total += count;
    }

    let add = if n >= 2 { 1.0 } else { 0.0 };
    let matched = clipped as f64 + add;
    if matched == 0.0 {
        return None;
    }
    Some(matched.ln() - (total as f64 + add).ln())
}

/// Log-domain brevity penalty against the reference closest in length.
///
/// `|hyp_len - ref_len| + ref_len` is minimized so that, among references equally far from
/// the hypothesis, the shorter one is chosen.
fn brevity_penalty(hyp_len: usize, references: &[Vec<&str>], smooth: f64) -> f64 {
    let mut best: Option<(usize, usize)> = None;
    for r in references {
        let diff = hyp_len.abs_diff(r.len()) + r.len();
        if best.is_none_or(|(d, _)| diff < d) {
            best = Some((diff, r.len()));
        }
    }
    let best_len = best.map_or(0, |(_, len)| len);
    (1.0 - (best_len as f64 + smooth) / hyp_len as f64).min(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENT: &str = "at how many places can i go climbing in paris ?";
    const REF: &str = "in how many spots can i go climbing in paris ?";

    #[track_caller]
    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_unigram() {
        assert_close(per_sentence_bleu(SENT, &[REF], 1, 0.0).unwrap(), 0.8181818181818182);
    }

    #[test]
    fn test_4gram() {
        assert_close(per_sentence_bleu(SENT, &[REF], 4, 0.0).unwrap(), 0.667354307257489);
    }

    #[test]
    fn test_multiple_references() {
        let refs = [REF, "in how many places can i go climbing in paris ?"];
        assert_close(per_sentence_bleu(SENT, &refs, 1, 0.0).unwrap(), 0.9090909090909092);
    }

    #[test]
    fn test_reference_order_irrelevant() {
        let refs = ["in how many places can i go climbing in paris ?", REF];
        assert_close(per_sentence_bleu(SENT, &refs, 1, 0.0).unwrap(), 0.9090909090909092);
    }

    #[test]
    fn test_no_overlap() {
        let sent = "this is a completely different string !";
        assert_eq!(per_sentence_bleu(sent, &[REF], 1, 0.0).unwrap(), 0.0);
        assert_eq!(per_sentence_bleu(sent, &[REF], 4, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_clipping() {
        let sent = "in in how many places can i go climbing in paris ?";
        assert_close(per_sentence_bleu(sent, &[REF], 1, 0.0).unwrap(), 0.8333333333333335);
    }

    #[test]
    fn test_identical() {
        for n in 1..=6 {
            assert_close(per_sentence_bleu(REF, &[REF], n, 0.0).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_identical_short() {
        // Orders beyond the sentence length contribute log(1/1).
        for n in 1..=6 {
            assert_close(per_sentence_bleu("hello world", &["hello world"], n, 0.0).unwrap(), 1.0);
        }
    }

    #[test]
    fn test_empty_hypothesis() {
        assert_eq!(per_sentence_bleu("", &[REF], 4, 0.0).unwrap(), 0.0);
        assert_eq!(per_sentence_bleu("  \t ", &[REF], 4, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_reference() {
        assert_eq!(per_sentence_bleu(SENT, &[""], 4, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_no_reference() {
        let refs: [&str; 0] = [];
        assert!(matches!(
            per_sentence_bleu(SENT, &refs, 4, 0.0),
            Err(MinionError::InvalidArgument(_))
        ));
        assert!(matches!(
            per_sentence_bleu("", &refs, 4, 0.0),
            Err(MinionError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_order() {
        assert!(matches!(BleuScorer::new().order(0), Err(MinionError::InvalidArgument(_))));
        assert_eq!(ngram_log_precision(SENT, &[REF], 0), None);
    }

    #[test]
    fn test_brevity_penalty() {
        // 3 of 3 unigrams match, but the reference has 6 tokens.
        let bleu = per_sentence_bleu("how many places", &["how many places can i go"], 1, 0.0);
        assert_close(bleu.unwrap(), (1.0f64 - 6.0 / 3.0).exp());
    }

    #[test]
    fn test_brevity_penalty_never_increases() {
        let cases = [
            ("how many places", "how many places can i go"),
            (SENT, REF),
            ("in in how many places can i go climbing in paris ?", REF),
            ("go climbing", "can i go climbing in paris ?"),
        ];
        for (hyp, reference) in cases {
            for n in 1..=4 {
                let precision: f64 = (1..=n)
                    .map(|i| ngram_log_precision(hyp, &[reference], i).unwrap())
                    .sum::<f64>()
                    / n.min(reference.split_whitespace().count()) as f64;
                let bleu = per_sentence_bleu(hyp, &[reference], n, 0.0).unwrap();
                assert!(bleu <= precision.exp() + 1e-15, "{hyp:?} n={n}");
            }
        }
    }

    #[test]
    fn test_brevity_prefers_shorter_reference() {
        // Both references are 1 token away from the hypothesis; the shorter is chosen,
        // so no penalty applies.
        let hyp = "a b c";
        let bleu = per_sentence_bleu(hyp, &["a b c d", "a b"], 1, 0.0).unwrap();
        assert_close(bleu, 1.0);
        let bleu = per_sentence_bleu(hyp, &["a b", "a b c d"], 1, 0.0).unwrap();
        assert_close(bleu, 1.0);
    }

    #[test]
    fn test_smooth() {
        let unsmoothed = per_sentence_bleu(SENT, &[REF], 1, 0.0).unwrap();
        let smoothed = per_sentence_bleu(SENT, &[REF], 1, 1.0).unwrap();
        assert_close(smoothed, unsmoothed * (1.0f64 - 12.0 / 11.0).exp());
    }

    #[test]
    fn test_ngram_log_precision() {
        assert_close(
            ngram_log_precision(SENT, &[REF], 2).unwrap(),
            8.0f64.ln() - 11.0f64.ln(),
        );
        assert_eq!(ngram_log_precision("x y", &["a b"], 1), None);
        assert_close(ngram_log_precision("x y", &["a b"], 2).unwrap(), -2.0f64.ln());
    }

    #[test]
    fn test_builder() {
        let scorer = BleuScorer::new().order(2).unwrap().smooth(0.5);
        assert_eq!(scorer.ngram_order(), 2);
        assert_eq!(scorer.smoothing(), 0.5);
        assert_eq!(BleuScorer::default().ngram_order(), DEFAULT_NGRAM_ORDER);
    }
}
