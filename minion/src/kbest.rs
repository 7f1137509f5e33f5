use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use nlpminion::errors::MinionError;
use nlpminion::{BleuScorer, Decoder, KbestList, Translation, store};

#[derive(Parser, Debug)]
#[clap(name = "kbest", about = "K-best lists from the decoder")]
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
    #[clap(short = 'i', long)]
    input: PathBuf,

    /// Size of the unique k-best list.
    #[clap(short = 'k', long, default_value = "100")]
    kbest: usize,

    /// Reference file, line-aligned with the input. With references, the translations of each
    /// sentence are printed in descending per-sentence BLEU.
    #[clap(short = 'r', long = "reference")]
    references: Vec<PathBuf>,

    /// Maximum n-gram order of per-sentence BLEU.
    #[clap(short = 'n', long, default_value = "4")]
    order: usize,

    /// Constant added to the reference length in the brevity penalty.
    #[clap(long, default_value = "0.0")]
    smooth: f64,
}

#[derive(Debug, Error)]
pub enum KbestError {
    #[error("K-best generation failed: {0}")]
    Minion(#[from] MinionError),
}

/// Translations grouped by input and ordered by BLEU rank within each input.
fn ranked(list: &KbestList) -> Vec<&Translation> {
    let mut ranked = vec![];
    for id in list.ids() {
        let mut entries: Vec<_> = list.entries(id).collect();
        entries.sort_by_key(|t| t.bleu_rank());
        ranked.extend(entries);
    }
    ranked
}

pub fn run(args: Args) -> Result<(), KbestError> {
    let decoder = Decoder::new(args.decoder, args.config, args.weights).kbest(args.kbest);
    let mut list = decoder.translate_kbest(&args.input)?;
    log::info!("{} translations for {} inputs", list.len(), list.ids().len());

    if args.references.is_empty() {
        print!("{list}");
        return Ok(());
    }

    let scorer = BleuScorer::new().order(args.order)?.smooth(args.smooth);
    let refs = store::read_parallel(&args.references)?;
    list.score_bleu_by_id(&scorer, &refs)?;
    for t in ranked(&list) {
        println!("{} {}", t.id(), t);
    }
    Ok(())
}
