use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use nlpminion::Decoder;
use nlpminion::errors::MinionError;

#[derive(Parser, Debug)]
#[clap(name = "translate", about = "Decoder front end")]
pub struct Args {
    /// Decoder binary.
    #[clap(short = 'd', long)]
    decoder: PathBuf,

    /// Decoder configuration file.
    #[clap(short = 'c', long)]
    config: PathBuf,

    /// Weights file passed to the decoder.
    #[clap(short = 'w', long)]
    weights: PathBuf,

    /// File with one sentence per line.
    #[clap(short = 'i', long, required_unless_present = "sentence", conflicts_with = "sentence")]
    input: Option<PathBuf>,

    /// Single sentence to translate.
    #[clap(short = 's', long)]
    sentence: Option<String>,
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Translation failed: {0}")]
    Minion(#[from] MinionError),

    #[error("Either an input file or a sentence is required")]
    MissingInput,
}

pub fn run(args: Args) -> Result<(), TranslateError> {
    let decoder = Decoder::new(args.decoder, args.config, args.weights);
    let output = match (&args.input, &args.sentence) {
        (Some(input), _) => decoder.translate_file(input)?,
        (None, Some(sentence)) => decoder.translate_sentence(sentence)?,
        (None, None) => return Err(TranslateError::MissingInput),
    };
    print!("{output}");
    Ok(())
}
