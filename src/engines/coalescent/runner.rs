//! Invocation of the external coalescent simulator and parsing of its
//! best-likelihood output table.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::EngineError;

/// Wrapper around the simulator binary. One instance per engine; the
/// binary path is validated at construction.
#[derive(Debug, Clone)]
pub struct CoalescentRunner {
    binary: PathBuf,
    n_simulations: usize,
    n_ecm_loops: usize,
}

impl CoalescentRunner {
    pub fn new(binary: PathBuf, n_simulations: usize, n_ecm_loops: usize) -> Result<Self, EngineError> {
        if !binary.exists() {
            return Err(EngineError::BinaryMissing(binary));
        }
        Ok(Self {
            binary,
            n_simulations,
            n_ecm_loops,
        })
    }

    /// Run one maximization over the input files `{prefix}.tpl`,
    /// `{prefix}.est` and `{prefix}.def` inside `workdir`. `multi_sfs`
    /// selects the multidimensional observed-SFS mode.
    pub fn run(&self, workdir: &Path, prefix: &str, multi_sfs: bool) -> Result<(), EngineError> {
        let mut command = Command::new(&self.binary);
        command
            .current_dir(workdir)
            .arg("-t")
            .arg(format!("{prefix}.tpl"))
            .arg("-e")
            .arg(format!("{prefix}.est"))
            .arg("-F")
            .arg(format!("{prefix}.def"))
            .arg("-d")
            .arg("-M")
            .arg("-n")
            .arg(self.n_simulations.to_string())
            .arg("-L")
            .arg(self.n_ecm_loops.to_string());
        if multi_sfs {
            command.arg("--multiSFS");
        }
        log::debug!(
            "Running coalescent simulator in {}: {:?}",
            workdir.display(),
            command
        );
        let output = command.output()?;
        if !output.status.success() {
            log::debug!(
                "Simulator stderr: {}",
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(EngineError::ProcessFailed(output.status));
        }
        Ok(())
    }
}

/// Read the maximized log-likelihood from the run's output table at
/// `workdir/prefix/prefix.bestlhoods`: a header row followed by data rows;
/// the result is the last column of the last row.
pub fn read_best_likelihood(workdir: &Path, prefix: &str) -> Result<f64, EngineError> {
    let path = workdir.join(prefix).join(format!("{prefix}.bestlhoods"));
    let table_error = |reason: &str| EngineError::ResultTable {
        path: path.clone(),
        reason: reason.to_string(),
    };
    let content = fs::read_to_string(&path)
        .map_err(|e| table_error(&format!("cannot read file ({e})")))?;
    let row = content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .last()
        .ok_or_else(|| table_error("no data row after header"))?;
    let last = row
        .split_whitespace()
        .last()
        .ok_or_else(|| table_error("empty data row"))?;
    last.parse::<f64>()
        .map_err(|_| table_error(&format!("last column '{last}' is not a number")))
}
