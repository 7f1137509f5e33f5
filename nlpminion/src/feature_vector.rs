//! Sparse feature vectors.
use std::fmt;
use std::io::{BufRead, Write};
use std::str::FromStr;

use hashbrown::HashMap;

use crate::common::{
    FEATURE_FILE_SEPARATOR, FEATURE_ITEM_SEPARATOR, FEATURE_KEY_VALUE_SEPARATOR, VALUE_DECIMALS,
};
use crate::errors::{MinionError, Result};
use crate::store::KeyValueStore;

/// Sparse vector of named decoder features.
///
/// Missing keys are implicitly zero. Two vectors are equal when they hold the same keys with
/// the same values; an explicit `0.0` entry is therefore not equal to a missing key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    map: HashMap<String, f64>,
}

impl FeatureVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `key=value` items separated by `item_sep`.
    ///
    /// Empty items are skipped, so an empty string yields an empty vector.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when an item lacks `key_val_sep` or its value is not a
    /// floating-point number.
    pub fn parse(s: &str, item_sep: &str, key_val_sep: &str) -> Result<Self> {
        let mut vector = Self::new();
        for item in s.split(item_sep) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            let (key, val) = item.split_once(key_val_sep).ok_or_else(|| {
                MinionError::invalid_format(
                    "feature",
                    format!("missing separator {key_val_sep:?} in {item:?}"),
                )
            })?;
            vector.insert(key, val.parse()?);
        }
        Ok(vector)
    }

    /// Returns the value of `key`, if present.
    #[inline(always)]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.map.get(key).copied()
    }

    /// Returns the value of `key`, or zero if it is absent.
    #[inline(always)]
    pub fn value(&self, key: &str) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    /// Sets `key` to `val`, returning the previous value.
    pub fn insert<K>(&mut self, key: K, val: f64) -> Option<f64>
    where
        K: Into<String>,
    {
        self.map.insert(key.into(), val)
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<f64> {
        self.map.remove(key)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Checks if `key` has an entry.
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Checks if no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over the entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.map.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Returns the entries sorted by key.
    pub fn sorted_entries(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Mutable reference to the value of `key`, inserting zero first if it is absent.
    pub(crate) fn value_mut(&mut self, key: &str) -> &mut f64 {
        self.map.entry_ref(key).or_insert(0.0)
    }

    /// Adds `other` elementwise over the union of keys.
    pub fn add(&mut self, other: &Self) -> &mut Self {
        for (key, val) in other.iter() {
            *self.value_mut(key) += val;
        }
        self
    }

    /// Subtracts `other` elementwise over the union of keys.
    pub fn subtract(&mut self, other: &Self) -> &mut Self {
        for (key, val) in other.iter() {
            *self.value_mut(key) -= val;
        }
        self
    }

    /// Multiplies every stored entry by `x`.
    pub fn scale(&mut self, x: f64) -> &mut Self {
        for val in self.map.values_mut() {
            *val *= x;
        }
        self
    }

    /// Inner product over the shared keys.
    pub fn dot(&self, other: &Self) -> f64 {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().map(|(k, v)| v * large.value(k)).sum()
    }

    /// Reads `key<sep>value` lines, overwriting existing keys.
    ///
    /// Blank lines are skipped.
    pub fn read_lines<R>(&mut self, rdr: R, sep: &str) -> Result<()>
    where
        R: BufRead,
    {
        for line in rdr.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, val) = line.split_once(sep).ok_or_else(|| {
                MinionError::invalid_format(
                    "feature file",
                    format!("missing separator {sep:?} in {line:?}"),
                )
            })?;
            self.insert(key, val.trim().parse()?);
        }
        Ok(())
    }

    /// Writes one `key<sep>value` line per entry in key order.
    pub fn write_lines<W>(&self, mut wtr: W, sep: &str) -> Result<()>
    where
        W: Write,
    {
        for (key, val) in self.sorted_entries() {
            writeln!(wtr, "{key}{sep}{}", format_value(val))?;
        }
        Ok(())
    }
}

/// Formats `val` with 16 decimals, trims trailing zeros, and keeps at least one decimal digit.
///
/// ```
/// use nlpminion::feature_vector::format_value;
///
/// assert_eq!(format_value(1.0), "1.0");
/// assert_eq!(format_value(-0.0044721287995992225), "-0.0044721287995992");
/// ```
pub fn format_value(val: f64) -> String {
    let mut s = format!("{:.*}", VALUE_DECIMALS, val);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').len();
        s.truncate(trimmed);
        if s.ends_with('.') {
            s.push('0');
        }
    }
    s
}

impl FromStr for FeatureVector {
    type Err = MinionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s, FEATURE_ITEM_SEPARATOR, FEATURE_KEY_VALUE_SEPARATOR)
    }
}

impl fmt::Display for FeatureVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, (key, val)) in self.sorted_entries().into_iter().enumerate() {
            if i != 0 {
                f.write_str(FEATURE_ITEM_SEPARATOR)?;
            }
            write!(f, "{}{}{}", key, FEATURE_KEY_VALUE_SEPARATOR, format_value(val))?;
        }
        Ok(())
    }
}

impl KeyValueStore for FeatureVector {
    fn read_entries<R>(&mut self, rdr: R) -> Result<()>
    where
        R: BufRead,
    {
        self.read_lines(rdr, FEATURE_FILE_SEPARATOR)
    }

    fn write_entries<W>(&self, wtr: W) -> Result<()>
    where
        W: Write,
    {
        self.write_lines(wtr, FEATURE_FILE_SEPARATOR)
    }
}

impl<K> FromIterator<(K, f64)> for FeatureVector
where
    K: Into<String>,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        Self {
            map: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl<K> Extend<(K, f64)> for FeatureVector
where
    K: Into<String>,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = (K, f64)>,
    {
        self.map
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(s: &str) -> FeatureVector {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse() {
        let v = fv("LanguageModel=-12.5 Glue=2 PassThrough=0");
        assert_eq!(v.len(), 3);
        assert_eq!(v.get("LanguageModel"), Some(-12.5));
        assert_eq!(v.get("Glue"), Some(2.0));
        assert_eq!(v.get("PassThrough"), Some(0.0));
        assert_eq!(v.get("Missing"), None);
        assert_eq!(v.value("Missing"), 0.0);
    }

    #[test]
    fn test_parse_empty() {
        assert!(fv("").is_empty());
        assert!(fv("   ").is_empty());
    }

    #[test]
    fn test_parse_custom_separators() {
        let v = FeatureVector::parse("a:1.5,b:-2", ",", ":").unwrap();
        assert_eq!(v, fv("a=1.5 b=-2"));
    }

    #[test]
    fn test_parse_missing_separator() {
        let e = "a=1 b".parse::<FeatureVector>().unwrap_err();
        assert!(matches!(e, MinionError::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_bad_value() {
        let e = "a=one".parse::<FeatureVector>().unwrap_err();
        assert!(matches!(e, MinionError::ParseFloat(_)));
    }

    #[test]
    fn test_add_union() {
        let mut v = fv("a=1 b=2");
        v.add(&fv("b=3 c=-4"));
        assert_eq!(v, fv("a=1 b=5 c=-4"));
    }

    #[test]
    fn test_subtract_union() {
        let mut v = fv("a=1 b=2");
        v.subtract(&fv("b=3 c=-4"));
        assert_eq!(v, fv("a=1 b=-1 c=4"));
    }

    #[test]
    fn test_scale() {
        let mut v = fv("a=1 b=-2.5");
        v.scale(2.0);
        assert_eq!(v, fv("a=2 b=-5"));
    }

    #[test]
    fn test_chained() {
        let mut v = fv("a=1");
        v.add(&fv("b=1")).scale(3.0).subtract(&fv("a=1"));
        assert_eq!(v, fv("a=2 b=3"));
    }

    fn sum(x: &FeatureVector, y: &FeatureVector) -> FeatureVector {
        let mut z = x.clone();
        z.add(y);
        z
    }

    fn difference(x: &FeatureVector, y: &FeatureVector) -> FeatureVector {
        let mut z = x.clone();
        z.subtract(y);
        z
    }

    fn scaled(x: &FeatureVector, a: f64) -> FeatureVector {
        let mut z = x.clone();
        z.scale(a);
        z
    }

    #[test]
    fn test_add_associative() {
        let x = fv("a=1 b=2");
        let y = fv("b=4 c=8");
        let z = fv("a=16 c=32 d=64");
        assert_eq!(sum(&sum(&x, &y), &z), sum(&x, &sum(&y, &z)));
    }

    #[test]
    fn test_subtract_associative() {
        let x = fv("a=1 b=2");
        let y = fv("b=4 c=8");
        let z = fv("a=16 c=32 d=64");
        assert_eq!(difference(&difference(&x, &y), &z), difference(&x, &sum(&y, &z)));
    }

    #[test]
    fn test_scale_distributes() {
        let x = fv("a=1 b=2");
        let y = fv("b=4 c=8");
        assert_eq!(scaled(&sum(&x, &y), 0.5), sum(&scaled(&x, 0.5), &scaled(&y, 0.5)));
    }

    #[test]
    fn test_dot() {
        assert_eq!(fv("a=1 b=2").dot(&fv("b=3 c=4")), 6.0);
        assert_eq!(fv("").dot(&fv("b=3")), 0.0);
    }

    #[test]
    fn test_eq_explicit_zero() {
        assert_ne!(fv("a=0"), fv(""));
        assert_eq!(fv("a=1 b=2"), fv("b=2 a=1"));
    }

    #[test]
    fn test_remove_clear() {
        let mut v = fv("a=1 b=2");
        assert_eq!(v.remove("a"), Some(1.0));
        assert_eq!(v.remove("a"), None);
        assert!(v.contains_key("b"));
        v.clear();
        assert!(v.is_empty());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(1.0), "1.0");
        assert_eq!(format_value(0.5), "0.5");
        assert_eq!(format_value(-2.0), "-2.0");
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(0.1), "0.1");
        assert_eq!(format_value(0.004472133120656804), "0.0044721331206568");
        assert_eq!(format_value(123456.25), "123456.25");
    }

    #[test]
    fn test_display_sorted() {
        let v = fv("b=0.5 a=1 c=-3.25");
        assert_eq!(v.to_string(), "a=1.0 b=0.5 c=-3.25");
    }

    #[test]
    fn test_display_round_trip() {
        let v = fv("LanguageModel=-12.345678 Glue=2 WordPenalty=-4.342944819032518");
        let w = fv(&v.to_string());
        assert_eq!(v.len(), w.len());
        for (key, val) in v.iter() {
            assert!((val - w.value(key)).abs() < 1e-15, "{key}");
        }
    }

    #[test]
    fn test_lines_round_trip() {
        let v = fv("b=0.5 a=1 c=-3.25");
        let mut buf = vec![];
        v.write_entries(&mut buf).unwrap();
        assert_eq!(String::from_utf8(buf.clone()).unwrap(), "a 1.0\nb 0.5\nc -3.25\n");

        let mut w = FeatureVector::new();
        w.read_entries(buf.as_slice()).unwrap();
        assert_eq!(v, w);
    }

    #[test]
    fn test_read_lines_missing_separator() {
        let mut v = FeatureVector::new();
        let e = v.read_entries("a 1\nb\n".as_bytes()).unwrap_err();
        assert!(matches!(e, MinionError::InvalidFormat(_)));
    }

    #[test]
    fn test_collect() {
        let v: FeatureVector = [("a", 1.0), ("b", 2.0)].into_iter().collect();
        assert_eq!(v, fv("a=1 b=2"));
        let mut w = FeatureVector::new();
        w.extend([("c".to_string(), 3.0)]);
        assert_eq!(w, fv("c=3"));
    }
}
