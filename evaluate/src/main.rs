use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use env_logger::Env;

use nlpminion::{BleuScorer, KbestList, store};

#[derive(Parser, Debug)]
#[clap(name = "evaluate", about = "Average per-sentence BLEU of a test set")]
struct Args {
    /// Translations, one per line.
    #[clap(short = 'i', long, required_unless_present = "kbest", conflicts_with = "kbest")]
    input: Option<PathBuf>,

    /// K-best list. Reports the BLEU of the decoder's first choices and of the oracles.
    #[clap(short = 'k', long)]
    kbest: Option<PathBuf>,

    /// Reference file, line-aligned with the test set. Repeat for multiple references.
    #[clap(short = 'r', long = "reference", required = true)]
    references: Vec<PathBuf>,

    /// Maximum n-gram order.
    #[clap(short = 'n', long, default_value = "4")]
    order: usize,

    /// Constant added to the reference length in the brevity penalty.
    #[clap(long, default_value = "0.0")]
    smooth: f64,
}

fn average(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Average BLEU of the i-th hypothesis against the i-th row of references.
fn average_bleu(
    scorer: &BleuScorer,
    hyps: &[String],
    refs: &[Vec<String>],
) -> Result<f64, Box<dyn Error>> {
    if hyps.len() != refs.len() {
        return Err(format!("{} translations but {} references", hyps.len(), refs.len()).into());
    }
    let mut scores = Vec::with_capacity(hyps.len());
    for (hyp, refs) in hyps.iter().zip(refs) {
        scores.push(scorer.score(hyp, refs)?);
    }
    Ok(average(&scores))
}

/// Number of inputs, and average BLEU of the decoder's first choices and of the oracles.
fn kbest_bleu(
    scorer: &BleuScorer,
    list: &mut KbestList,
    refs: &[Vec<String>],
) -> Result<(usize, f64, f64), Box<dyn Error>> {
    list.score_bleu_by_id(scorer, refs)?;

    let mut best = vec![];
    let mut oracle = vec![];
    for id in list.ids() {
        best.extend(list.best_by_decoder(id).and_then(|t| t.bleu_score()));
        oracle.extend(list.oracle(id).and_then(|t| t.bleu_score()));
    }
    Ok((best.len(), average(&best), average(&oracle)))
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let scorer = BleuScorer::new().order(args.order)?.smooth(args.smooth);
    let refs = store::read_parallel(&args.references)?;
    log::info!("Loaded {} references per sentence", args.references.len());

    if let Some(kbest) = args.kbest {
        let mut list = KbestList::from_reader(store::open_reader(kbest)?)?;
        let (num_inputs, best, oracle) = kbest_bleu(&scorer, &mut list, &refs)?;
        println!("Sentences = {num_inputs}");
        println!("1-best BLEU = {best}");
        println!("Oracle BLEU = {oracle}");
        return Ok(());
    }

    let Some(input) = args.input else {
        return Err("either an input or a k-best list is required".into());
    };
    let hyps = store::read_lines(input)?;
    let bleu = average_bleu(&scorer, &hyps, &refs)?;
    println!("Sentences = {}", hyps.len());
    println!("BLEU = {bleu}");

    Ok(())
}
