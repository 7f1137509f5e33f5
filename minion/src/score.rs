use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use nlpminion::BleuScorer;
use nlpminion::errors::MinionError;
use nlpminion::store;

#[derive(Parser, Debug)]
#[clap(name = "score", about = "Per-sentence BLEU scorer")]
pub struct Args {
    /// Hypotheses, one per line. `.gz` and `.zst` files are decompressed.
    #[clap(short = 'i', long)]
    input: PathBuf,

    /// Reference file, line-aligned with the input. Repeat for multiple references.
    #[clap(short = 'r', long = "reference", required = true)]
    references: Vec<PathBuf>,

    /// Maximum n-gram order.
    #[clap(short = 'n', long, default_value = "4")]
    order: usize,

    /// Constant added to the reference length in the brevity penalty.
    #[clap(long, default_value = "0.0")]
    smooth: f64,
}

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Scoring failed: {0}")]
    Minion(#[from] MinionError),

    #[error("{hyps} hypotheses but {refs} references")]
    LineCount { hyps: usize, refs: usize },
}

/// Scores the i-th hypothesis against the i-th row of references.
pub fn score_lines(
    scorer: &BleuScorer,
    hyps: &[String],
    refs: &[Vec<String>],
) -> Result<Vec<f64>, ScoreError> {
    if hyps.len() != refs.len() {
        return Err(ScoreError::LineCount {
            hyps: hyps.len(),
            refs: refs.len(),
        });
    }
    let scores = hyps
        .iter()
        .zip(refs)
        .map(|(hyp, refs)| scorer.score(hyp, refs))
        .collect::<Result<_, _>>()?;
    Ok(scores)
}

pub fn run(args: Args) -> Result<(), ScoreError> {
    let scorer = BleuScorer::new().order(args.order)?.smooth(args.smooth);
    let hyps = store::read_lines(&args.input)?;
    let refs = store::read_parallel(&args.references)?;

    let scores = score_lines(&scorer, &hyps, &refs)?;
    for bleu in &scores {
        println!("{bleu}");
    }
    if !scores.is_empty() {
        log::info!(
            "average of {} sentences: {}",
            scores.len(),
            scores.iter().sum::<f64>() / scores.len() as f64
        );
    }
    Ok(())
}
