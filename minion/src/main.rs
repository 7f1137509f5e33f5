mod corpus_bleu;
mod kbest;
mod score;
mod translate;
mod update;

use clap::{ArgAction, Parser};
use env_logger::Env;
use log::LevelFilter;
use thiserror::Error;

use crate::{
    corpus_bleu::CorpusBleuError, kbest::KbestError, score::ScoreError,
    translate::TranslateError, update::UpdateError,
};

#[derive(Parser, Debug)]
#[clap(name = "minion", version)]
struct Cli {
    /// Increase verbosity (-v, -vv).
    #[clap(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq).
    #[clap(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    /// Translate a file or a single sentence with the decoder.
    Translate(translate::Args),

    /// Produce a k-best list, optionally ranked by per-sentence BLEU.
    Kbest(kbest::Args),

    /// Score hypotheses line by line with per-sentence BLEU.
    Score(score::Args),

    /// Score a test set with the external corpus-BLEU tool.
    CorpusBleu(corpus_bleu::Args),

    /// Apply one Adadelta step to a weights file.
    Update(update::Args),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Translate(#[from] TranslateError),
    #[error(transparent)]
    Kbest(#[from] KbestError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    CorpusBleu(#[from] CorpusBleuError),
    #[error(transparent)]
    Update(#[from] UpdateError),
}

/// Level requested by `-v`/`-q`, or `None` to leave `RUST_LOG` in charge.
fn verbosity_filter(verbose: u8, quiet: u8) -> Option<LevelFilter> {
    match (quiet, verbose) {
        (0, 0) => None,
        (0, 1) => Some(LevelFilter::Debug),
        (0, _) => Some(LevelFilter::Trace),
        (1, _) => Some(LevelFilter::Warn),
        _ => Some(LevelFilter::Error),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    if let Some(level) = verbosity_filter(verbose, quiet) {
        builder.filter_level(level);
    }
    let _ = builder.try_init();
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Translate(args) => Ok(translate::run(args)?),
        Command::Kbest(args) => Ok(kbest::run(args)?),
        Command::Score(args) => Ok(score::run(args)?),
        Command::CorpusBleu(args) => Ok(corpus_bleu::run(args)?),
        Command::Update(args) => Ok(update::run(args)?),
    }
}
