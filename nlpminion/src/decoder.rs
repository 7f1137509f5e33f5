//! Shims around the external decoder and the corpus-BLEU tool.
//!
//! Neither tool is reimplemented here. The processes are run to completion and their standard
//! output is returned; standard error goes to the log.
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::errors::{MinionError, Result};
use crate::kbest::KbestList;

/// Command line of a cdec-style decoder.
///
/// The decoder is called as `<bin> -c <config> -w <weights> [-i <input>] [-k <n> -r]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoder {
    bin: PathBuf,
    config: PathBuf,
    weights: PathBuf,
    kbest: usize,
}

impl Decoder {
    /// Creates a decoder call that returns one translation per input.
    pub fn new<B, C, W>(bin: B, config: C, weights: W) -> Self
    where
        B: Into<PathBuf>,
        C: Into<PathBuf>,
        W: Into<PathBuf>,
    {
        Self {
            bin: bin.into(),
            config: config.into(),
            weights: weights.into(),
            kbest: 0,
        }
    }

    /// Requests a unique k-best list of size `n`; `0` disables it.
    pub const fn kbest(mut self, n: usize) -> Self {
        self.kbest = n;
        self
    }

    /// Requested k-best size, `0` when disabled.
    pub const fn kbest_size(&self) -> usize {
        self.kbest
    }

    /// Translates every line of `input`.
    pub fn translate_file<P>(&self, input: P) -> Result<String>
    where
        P: AsRef<Path>,
    {
        let mut cmd = self.command();
        cmd.arg("-i").arg(input.as_ref());
        self.push_kbest_args(&mut cmd);
        run_captured(cmd, None)
    }

    /// Translates a single sentence passed on standard input.
    pub fn translate_sentence(&self, sentence: &str) -> Result<String> {
        let mut cmd = self.command();
        self.push_kbest_args(&mut cmd);
        run_captured(cmd, Some(&format!("{sentence}\n")))
    }

    /// Translates `input` and parses the k-best output.
    ///
    /// # Errors
    ///
    /// [`MinionError`] is returned when no k-best size is set or the output is not a k-best
    /// list.
    pub fn translate_kbest<P>(&self, input: P) -> Result<KbestList>
    where
        P: AsRef<Path>,
    {
        if self.kbest == 0 {
            return Err(MinionError::invalid_argument(
                "kbest",
                "a k-best size must be set before requesting a k-best list",
            ));
        }
        self.translate_file(input)?.parse()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.bin);
        cmd.arg("-c").arg(&self.config).arg("-w").arg(&self.weights);
        cmd
    }

    fn push_kbest_args(&self, cmd: &mut Command) {
        if self.kbest != 0 {
            cmd.arg("-k").arg(self.kbest.to_string()).arg("-r");
        }
    }
}

/// External corpus-BLEU tool, called as `<script> -r <references> -i <input>`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BleuScript {
    script: PathBuf,
}

impl BleuScript {
    /// Wraps the tool at `script`.
    pub fn new<P>(script: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            script: script.into(),
        }
    }

    /// Scores the translations in `input` and returns the tool's trimmed output.
    pub fn score<R, I>(&self, references: R, input: I) -> Result<String>
    where
        R: AsRef<Path>,
        I: AsRef<Path>,
    {
        let mut cmd = Command::new(&self.script);
        cmd.arg("-r")
            .arg(references.as_ref())
            .arg("-i")
            .arg(input.as_ref());
        Ok(run_captured(cmd, None)?.trim().to_string())
    }
}

/// Runs `cmd` to completion and returns its standard output.
///
/// A non-zero exit status is only logged.
fn run_captured(mut cmd: Command, stdin: Option<&str>) -> Result<String> {
    log::debug!("running {cmd:?}");
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let mut child = cmd.spawn()?;
    // Input is fed from another thread while the output pipes are drained.
    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => {
            let input = input.to_string();
            Some(thread::spawn(move || pipe.write_all(input.as_bytes())))
        }
        _ => None,
    };
    let output = child.wait_with_output()?;

    if let Some(writer) = writer {
        let written = writer
            .join()
            .map_err(|_| io::Error::other("stdin writer panicked"))?;
        match written {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                log::debug!(
                    "{} closed its input before reading all of it",
                    cmd.get_program().to_string_lossy()
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !output.stderr.is_empty() {
        log::debug!(
            "{} stderr: {}",
            cmd.get_program().to_string_lossy(),
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    if !output.status.success() {
        log::warn!(
            "{} exited with {}",
            cmd.get_program().to_string_lossy(),
            output.status
        );
    }

    String::from_utf8(output.stdout).map_err(|e| MinionError::from(e.utf8_error()))
}
