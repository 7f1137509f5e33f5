//! Common settings in nlpminion.

/// Separator between the fields of a k-best entry and of a cache entry.
pub const FIELD_SEPARATOR: &str = " ||| ";

/// Separator between the items of an inline feature string.
pub const FEATURE_ITEM_SEPARATOR: &str = " ";

/// Separator between the name and the value of an inline feature.
pub const FEATURE_KEY_VALUE_SEPARATOR: &str = "=";

/// Separator between the key and the value in a feature file.
pub const FEATURE_FILE_SEPARATOR: &str = " ";

/// Number of decimals written for a feature value before trailing zeros are trimmed.
pub const VALUE_DECIMALS: usize = 16;

/// Default maximum n-gram order of per-sentence BLEU.
pub const DEFAULT_NGRAM_ORDER: usize = 4;

/// Default smoothing constant added to the reference length in the brevity penalty.
pub const DEFAULT_SMOOTH: f64 = 0.0;

/// Default decay constant of Adadelta.
pub const DEFAULT_RHO: f64 = 0.95;

/// Default conditioning constant of Adadelta.
pub const DEFAULT_EPSILON: f64 = 1.0e-6;

/// File name of the accumulated squared gradient in an optimizer state directory.
pub const ACCUM_GRAD_FILE: &str = "adadelta.grad";

/// File name of the accumulated squared update in an optimizer state directory.
pub const ACCUM_UPDATE_FILE: &str = "adadelta.update";
