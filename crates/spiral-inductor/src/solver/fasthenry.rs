//! FastHenry process runner.
//!
//! The deck is written into a private temporary directory, FastHenry runs
//! there, and the `Zc.mat` it leaves behind is parsed. The directory is
//! removed when the runner returns, whether or not the solver succeeded.

use super::impedance::ImpedanceMatrix;
use super::model::SimulationModel;
use super::SimulationRunner;
use crate::error::{InductorError, Result};
use log::{debug, info};
use num_complex::Complex64;
use std::fs::File;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

const DECK_NAME: &str = "inductor.inp";
const RESULT_NAME: &str = "Zc.mat";
const STDERR_NAME: &str = "fasthenry.err";

#[derive(Debug, Clone)]
pub struct FastHenryConfig {
    /// Path to the FastHenry executable (default: "fasthenry" in PATH).
    pub executable: String,
    pub timeout_secs: u64,
}

impl Default for FastHenryConfig {
    fn default() -> Self {
        Self {
            executable: "fasthenry".to_string(),
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FastHenryRunner {
    pub config: FastHenryConfig,
}

impl FastHenryRunner {
    pub fn new(config: FastHenryConfig) -> Self {
        Self { config }
    }
}

impl SimulationRunner for FastHenryRunner {
    fn run(&self, model: &SimulationModel) -> Result<Vec<ImpedanceMatrix>> {
        let workdir = tempfile::tempdir()
            .map_err(|e| InductorError::SolverInvocation(format!("temp dir: {e}")))?;
        let deck = workdir.path().join(DECK_NAME);
        std::fs::write(&deck, model.to_fasthenry())?;
        debug!("wrote {}", deck.display());

        // stderr goes to a file so a chatty solver never blocks on a full pipe.
        let stderr_path = workdir.path().join(STDERR_NAME);
        let stderr_file = File::create(&stderr_path)?;

        let started = Instant::now();
        let child = Command::new(&self.config.executable)
            .arg(DECK_NAME)
            .current_dir(workdir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file))
            .spawn()
            .map_err(|e| {
                InductorError::SolverInvocation(format!("cannot start {}: {e}", self.config.executable))
            })?;
        let status = wait_with_timeout(child, Duration::from_secs(self.config.timeout_secs))?;
        if !status.success() {
            let stderr = std::fs::read(&stderr_path).unwrap_or_default();
            return Err(InductorError::SolverInvocation(format!(
                "{} exited with {}\nstderr: {}",
                self.config.executable,
                status,
                String::from_utf8_lossy(&stderr)
            )));
        }
        info!("FastHenry finished in {:.2?}", started.elapsed());

        let text = std::fs::read_to_string(workdir.path().join(RESULT_NAME)).map_err(|e| {
            InductorError::SolverInvocation(format!("no {RESULT_NAME} produced: {e}"))
        })?;
        let matrices = parse_zc(&text)
            .map_err(|e| InductorError::SolverInvocation(format!("unreadable {RESULT_NAME}: {e}")))?;
        if matrices.is_empty() {
            return Err(InductorError::SolverInvocation(format!(
                "{RESULT_NAME} holds no impedance matrix"
            )));
        }
        Ok(matrices)
    }
}

fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<ExitStatus> {
    let start = Instant::now();
    let poll_interval = Duration::from_millis(50);
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if start.elapsed() > timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(InductorError::SolverInvocation(format!(
                "timed out after {} s",
                timeout.as_secs()
            )));
        }
        std::thread::sleep(poll_interval);
    }
}

/// Parse every matrix block of a FastHenry `Zc.mat` file.
///
/// Each block starts with
/// `Impedance matrix for frequency = 1e+06 2 x 2` followed by one line
/// per row of `re +imj` pairs.
pub fn parse_zc(text: &str) -> Result<Vec<ImpedanceMatrix>> {
    let mut matrices = Vec::new();
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    while let Some(line) = lines.next() {
        let Some(rest) = line
            .strip_prefix("Impedance matrix for frequency")
            .map(|r| r.trim_start().trim_start_matches('=').trim())
        else {
            continue;
        };
        let (frequency_hz, rows, cols) = parse_header(rest)?;
        if rows != cols {
            return Err(InductorError::MalformedImpedance(format!(
                "matrix is not square: {rows} x {cols}"
            )));
        }
        let mut entries = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            let line = lines.next().ok_or_else(|| {
                InductorError::MalformedImpedance(format!("missing row {row} at {frequency_hz} Hz"))
            })?;
            let values = parse_row(line)?;
            if values.len() != cols {
                return Err(InductorError::MalformedImpedance(format!(
                    "row {row} has {} entries, expected {cols}",
                    values.len()
                )));
            }
            entries.extend(values);
        }
        matrices.push(ImpedanceMatrix::new(frequency_hz, rows, entries)?);
    }
    Ok(matrices)
}

fn parse_header(rest: &str) -> Result<(f64, usize, usize)> {
    let bad = || InductorError::MalformedImpedance(format!("bad matrix header: {rest}"));
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    match tokens.as_slice() {
        [freq, rows, "x", cols] => Ok((
            freq.parse().map_err(|_| bad())?,
            rows.parse().map_err(|_| bad())?,
            cols.parse().map_err(|_| bad())?,
        )),
        _ => Err(bad()),
    }
}

fn parse_number(token: &str) -> Result<f64> {
    token
        .parse()
        .map_err(|_| InductorError::MalformedImpedance(format!("not a number: {token}")))
}

/// Split `1.5e-3-2.1j` style tokens into real and imaginary parts.
fn split_joined(body: &str) -> Option<(&str, &str)> {
    let bytes = body.as_bytes();
    (1..bytes.len())
        .rev()
        .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'))
        .map(|i| (&body[..i], &body[i..]))
}

fn parse_row(line: &str) -> Result<Vec<Complex64>> {
    let mut values = Vec::new();
    let mut pending_re: Option<f64> = None;
    for token in line.split_whitespace() {
        match (token.strip_suffix('j'), pending_re.take()) {
            (Some(im), Some(re)) => values.push(Complex64::new(re, parse_number(im)?)),
            (Some(body), None) => {
                let (re, im) = split_joined(body).ok_or_else(|| {
                    InductorError::MalformedImpedance(format!("imaginary part without real: {token}"))
                })?;
                values.push(Complex64::new(parse_number(re)?, parse_number(im)?));
            }
            (None, None) => pending_re = Some(parse_number(token)?),
            (None, Some(_)) => {
                return Err(InductorError::MalformedImpedance(format!(
                    "two real parts in a row near {token}"
                )))
            }
        }
    }
    if pending_re.is_some() {
        return Err(InductorError::MalformedImpedance(format!(
            "dangling real part in row: {line}"
        )));
    }
    Ok(values)
}
