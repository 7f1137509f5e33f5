//! Line-oriented key-value files.
//!
//! [`FeatureVector`](crate::FeatureVector), [`Cache`](crate::Cache) and
//! [`OptimizerState`](crate::optimizer::OptimizerState) all persist as one entry per line.
//! The codec is chosen from the file extension: `.gz` is read and written with gzip,
//! `.zst` with zstd, and anything else as plain text.
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

use crate::errors::{MinionError, Result};

const ZSTD_LEVEL: i32 = 19;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Codec {
    Plain,
    Gzip,
    Zstd,
}

impl Codec {
    fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());
        match extension.as_deref() {
            Some("gz") => Self::Gzip,
            Some("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

/// Opens `path` for buffered reading, decompressing it if the extension asks for it.
pub fn open_reader<P>(path: P) -> io::Result<Box<dyn BufRead>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let rdr: Box<dyn BufRead> = match Codec::from_path(path) {
        Codec::Gzip => Box::new(BufReader::new(MultiGzDecoder::new(file))),
        Codec::Zstd => Box::new(BufReader::new(zstd::Decoder::new(file)?)),
        Codec::Plain => Box::new(BufReader::new(file)),
    };
    Ok(rdr)
}

/// Creates `path` for writing, compressing it if the extension asks for it.
///
/// [`StoreWriter::finish`] must be called to flush the compressed stream.
pub fn create_writer<P>(path: P) -> io::Result<StoreWriter>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = BufWriter::new(File::create(path)?);
    let wtr = match Codec::from_path(path) {
        Codec::Gzip => StoreWriter::Gzip(GzEncoder::new(file, Compression::default())),
        Codec::Zstd => StoreWriter::Zstd(zstd::Encoder::new(file, ZSTD_LEVEL)?),
        Codec::Plain => StoreWriter::Plain(file),
    };
    Ok(wtr)
}

/// Writer returned by [`create_writer`].
pub enum StoreWriter {
    /// Uncompressed file.
    Plain(BufWriter<File>),
    /// Gzip-compressed file.
    Gzip(GzEncoder<BufWriter<File>>),
    /// Zstd-compressed file.
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

impl StoreWriter {
    /// Finishes the compressed stream, if any, and flushes the file.
    pub fn finish(self) -> io::Result<()> {
        let mut file = match self {
            Self::Plain(file) => file,
            Self::Gzip(encoder) => encoder.finish()?,
            Self::Zstd(encoder) => encoder.finish()?,
        };
        file.flush()
    }
}

impl Write for StoreWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Plain(w) => w.write(buf),
            Self::Gzip(w) => w.write(buf),
            Self::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Plain(w) => w.flush(),
            Self::Gzip(w) => w.flush(),
            Self::Zstd(w) => w.flush(),
        }
    }
}

/// Reads the lines of `path` without their terminators.
pub fn read_lines<P>(path: P) -> Result<Vec<String>>
where
    P: AsRef<Path>,
{
    Ok(open_reader(path)?.lines().collect::<io::Result<_>>()?)
}

/// Reads line-aligned files, such as several reference translations of one test set.
///
/// The i-th row of the result holds the i-th line of every file, in the order of `paths`.
///
/// # Errors
///
/// [`MinionError`] is returned when the files differ in their number of lines.
pub fn read_parallel<P>(paths: &[P]) -> Result<Vec<Vec<String>>>
where
    P: AsRef<Path>,
{
    let mut rows: Vec<Vec<String>> = vec![];
    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let lines = read_lines(path)?;
        if i == 0 {
            rows = lines.into_iter().map(|line| vec![line]).collect();
            continue;
        }
        if lines.len() != rows.len() {
            return Err(MinionError::invalid_format(
                "parallel",
                format!(
                    "{} has {} lines, expected {}",
                    path.display(),
                    lines.len(),
                    rows.len()
                ),
            ));
        }
        for (row, line) in rows.iter_mut().zip(lines) {
            row.push(line);
        }
    }
    Ok(rows)
}

/// Storage of key-value data with one entry per line.
pub trait KeyValueStore {
    /// Adds every entry read from `rdr`, overwriting existing keys.
    fn read_entries<R>(&mut self, rdr: R) -> Result<()>
    where
        R: BufRead;

    /// Writes every entry to `wtr`.
    fn write_entries<W>(&self, wtr: W) -> Result<()>
    where
        W: Write;

    /// Adds every entry stored in the file at `path`.
    fn read_path<P>(&mut self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let rdr = open_reader(path)?;
        self.read_entries(rdr)
    }

    /// Writes every entry to the file at `path`, replacing it.
    fn write_path<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let mut wtr = create_writer(path)?;
        self.write_entries(&mut wtr)?;
        wtr.finish()?;
        Ok(())
    }
}
