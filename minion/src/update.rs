use std::io;
use std::path::{Path, PathBuf};

use clap::Parser;
use thiserror::Error;

use nlpminion::errors::MinionError;
use nlpminion::{
    Adadelta, BleuScorer, FeatureVector, KbestList, KeyValueStore, OptimizerState, store,
};

#[derive(Parser, Debug)]
#[clap(name = "update", about = "Adadelta weight update")]
pub struct Args {
    /// Current weights, one `name value` pair per line.
    #[clap(short = 'w', long)]
    weights: PathBuf,

    /// Gradient, in the same format as the weights.
    #[clap(short = 'g', long, required_unless_present = "kbest", conflicts_with = "kbest")]
    gradient: Option<PathBuf>,

    /// K-best list to derive the gradient from. Requires references.
    #[clap(long, requires = "references")]
    kbest: Option<PathBuf>,

    /// Reference file, line-aligned with the decoder input of the k-best list.
    #[clap(short = 'r', long = "reference")]
    references: Vec<PathBuf>,

    /// A file to which the updated weights are written.
    #[clap(short = 'o', long)]
    output: PathBuf,

    /// Directory holding the optimizer state between runs. Created if missing.
    #[clap(long)]
    state_dir: Option<PathBuf>,

    /// Decay constant of the running averages.
    #[clap(long, default_value = "0.95")]
    rho: f64,

    /// Conditioning constant of the update.
    #[clap(long, default_value = "1e-6")]
    epsilon: f64,

    /// Maximum n-gram order of per-sentence BLEU when scoring the k-best list.
    #[clap(short = 'n', long, default_value = "4")]
    order: usize,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Update failed: {0}")]
    Minion(#[from] MinionError),

    #[error("Either a gradient or a k-best list is required")]
    MissingGradient,
}

/// Sums `features(decoder best) - features(oracle)` over a scored k-best list.
fn kbest_gradient(
    kbest: &Path,
    references: &[PathBuf],
    scorer: &BleuScorer,
) -> Result<FeatureVector, UpdateError> {
    let mut list = KbestList::from_reader(store::open_reader(kbest)?)?;
    let refs = store::read_parallel(references)?;
    list.score_bleu_by_id(scorer, &refs)?;
    Ok(list.hope_fear_gradient())
}

pub fn run(args: Args) -> Result<(), UpdateError> {
    let gradient = match (&args.gradient, &args.kbest) {
        (Some(path), _) => {
            let mut gradient = FeatureVector::new();
            gradient.read_path(path)?;
            gradient
        }
        (None, Some(kbest)) => {
            let scorer = BleuScorer::new().order(args.order)?;
            kbest_gradient(kbest, &args.references, &scorer)?
        }
        (None, None) => return Err(UpdateError::MissingGradient),
    };

    let mut weights = FeatureVector::new();
    weights.read_path(&args.weights)?;

    let state = match &args.state_dir {
        Some(dir) => OptimizerState::read_dir(dir)?,
        None => OptimizerState::new(),
    };
    let mut adadelta = Adadelta::new()
        .rho(args.rho)?
        .epsilon(args.epsilon)?
        .with_state(state);

    let delta = adadelta.update(&gradient);
    weights.add(&delta);
    weights.write_path(&args.output)?;
    log::info!(
        "updated {} of {} weights into {}",
        delta.len(),
        weights.len(),
        args.output.display()
    );

    if let Some(dir) = &args.state_dir {
        adadelta.state().write_dir(dir)?;
    }
    Ok(())
}
