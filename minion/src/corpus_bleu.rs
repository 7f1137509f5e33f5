use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use nlpminion::BleuScript;
use nlpminion::errors::MinionError;

#[derive(Parser, Debug)]
#[clap(name = "corpus-bleu", about = "Corpus BLEU via an external tool")]
pub struct Args {
    /// Corpus-BLEU tool, called as `<script> -r <references> -i <input>`.
    #[clap(short = 's', long)]
    script: PathBuf,

    /// Reference translations, one per line.
    #[clap(short = 'r', long)]
    references: PathBuf,

    /// Translations to score, one per line.
    #[clap(short = 'i', long)]
    input: PathBuf,
}

#[derive(Debug, Error)]
pub enum CorpusBleuError {
    #[error("Scoring failed: {0}")]
    Minion(#[from] MinionError),
}

pub fn run(args: Args) -> Result<(), CorpusBleuError> {
    let bleu = BleuScript::new(args.script).score(&args.references, &args.input)?;
    println!("{bleu}");
    Ok(())
}
