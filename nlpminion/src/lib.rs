//! # nlpminion
//!
//! nlpminion holds the pieces of a tuning loop around an external machine translation
//! decoder: sparse feature vectors, per-sentence BLEU, k-best lists and Adadelta updates.
//!
//! ## Examples
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! use nlpminion::{Adadelta, BleuScorer, FeatureVector, KbestList};
//!
//! let mut kbest: KbestList = "\
//! 0 ||| where is paris ? ||| LanguageModel=-3 Glue=2 ||| -1.2
//! 0 ||| where paris is ? ||| LanguageModel=-5 Glue=1 ||| -2.5"
//!     .parse()?;
//! let references = vec![vec!["where is paris ?"]];
//!
//! kbest.score_bleu_by_id(&BleuScorer::new(), &references)?;
//! assert_eq!(kbest.oracle("0").unwrap().string(), "where is paris ?");
//!
//! // The decoder already prefers the oracle, so there is nothing to learn.
//! let gradient = kbest.hope_fear_gradient();
//! assert!(gradient.is_empty());
//!
//! let mut weights: FeatureVector = "LanguageModel=0.5 Glue=0.1".parse()?;
//! let mut adadelta = Adadelta::new();
//! weights.add(&adadelta.update(&gradient));
//! assert_eq!(weights.value("Glue"), 0.1);
//! # Ok(())
//! # }
//! ```
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod bleu;
pub mod cache;
pub mod common;
pub mod decoder;
pub mod errors;
pub mod feature_vector;
pub mod kbest;
pub mod optimizer;
pub mod store;
pub mod translation;


pub use bleu::{BleuScorer, per_sentence_bleu};
pub use cache::{Cache, CacheEntry};
pub use decoder::{BleuScript, Decoder};
pub use feature_vector::FeatureVector;
pub use kbest::KbestList;
pub use optimizer::{Adadelta, OptimizerState};
pub use store::KeyValueStore;
pub use translation::Translation;

/// Version number of this library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
