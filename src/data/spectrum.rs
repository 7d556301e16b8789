//! In-memory site-frequency spectrum and its pure transform pipeline.

use ndarray::{ArrayD, Dimension, IxDyn};
use statrs::function::factorial::ln_binomial;

use crate::errors::DataError;

/// Multidimensional allele-count histogram with population labels and a
/// polarization flag. All transforms return a new spectrum; nothing mutates
/// in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    /// Entry `[i1, .., ik]` counts sites with `ij` derived alleles in
    /// population `j`. Axis length = sample size + 1.
    pub data: ArrayD<f64>,
    pub pop_ids: Vec<String>,
    /// `true` once polarization has been discarded (no outgroup).
    pub folded: bool,
}

impl Spectrum {
    pub fn new(data: ArrayD<f64>, pop_ids: Vec<String>, folded: bool) -> Self {
        Self {
            data,
            pop_ids,
            folded,
        }
    }

    /// Haploid sample size per population (axis length minus one).
    pub fn sample_sizes(&self) -> Vec<usize> {
        self.data.shape().iter().map(|&s| s - 1).collect()
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    /// The fixed (monomorphic) corner cells, excluded from likelihood and
    /// scaling sums.
    pub fn is_corner(&self, index: &[usize]) -> bool {
        index.iter().all(|&i| i == 0)
            || index
                .iter()
                .zip(self.data.shape())
                .all(|(&i, &s)| i == s - 1)
    }

    /// Sum over non-corner cells.
    pub fn total(&self) -> f64 {
        self.data
            .indexed_iter()
            .filter(|(idx, _)| !self.is_corner(idx.slice()))
            .map(|(_, &v)| v)
            .sum()
    }

    /// Default labels `Pop 1..Pop N` for data without its own.
    pub fn with_default_labels(mut self) -> Self {
        if self.pop_ids.is_empty() {
            self.pop_ids = (1..=self.ndim()).map(|i| format!("Pop {i}")).collect();
        }
        self
    }

    /// Reorder axes to match `new_labels`. The requested labels must be a
    /// permutation of the present ones.
    pub fn reorder_labels(&self, new_labels: &[String]) -> Result<Spectrum, DataError> {
        if new_labels == self.pop_ids.as_slice() {
            return Ok(self.clone());
        }
        let mismatch = || DataError::LabelMismatch {
            present: self.pop_ids.join(", "),
        };
        if new_labels.len() != self.ndim() {
            return Err(mismatch());
        }
        let mut perm = Vec::with_capacity(new_labels.len());
        for label in new_labels {
            let axis = self
                .pop_ids
                .iter()
                .position(|p| p == label)
                .ok_or_else(mismatch)?;
            if perm.contains(&axis) {
                return Err(mismatch());
            }
            perm.push(axis);
        }
        let data = self
            .data
            .clone()
            .permuted_axes(IxDyn(&perm))
            .as_standard_layout()
            .into_owned();
        Ok(Spectrum::new(data, new_labels.to_vec(), self.folded))
    }

    /// Project to new sample sizes by hypergeometric down-sampling, one axis
    /// at a time. Projecting to the current sizes returns the spectrum
    /// unchanged; projecting up is an error.
    pub fn project(&self, new_sizes: &[usize]) -> Result<Spectrum, DataError> {
        let current = self.sample_sizes();
        if new_sizes == current.as_slice() {
            return Ok(self.clone());
        }
        if new_sizes.len() != current.len() {
            return Err(DataError::Projection(format!(
                "expected {} sizes, got {}",
                current.len(),
                new_sizes.len()
            )));
        }
        let mut data = self.data.clone();
        for (axis, (&m, &n)) in new_sizes.iter().zip(&current).enumerate() {
            if m > n {
                return Err(DataError::Projection(format!(
                    "cannot project axis {axis} up from {n} to {m}"
                )));
            }
            if m < n {
                data = project_axis(&data, axis, m);
            }
        }
        Ok(Spectrum::new(data, self.pop_ids.clone(), self.folded))
    }

    /// Discard polarization: below the half-total diagonal each cell gains
    /// its mirrored counterpart, cells on the diagonal keep their average
    /// with the mirror, and cells above it are zeroed.
    pub fn fold(&self) -> Spectrum {
        if self.folded {
            return self.clone();
        }
        let shape = self.data.shape().to_vec();
        let total: usize = shape.iter().map(|&s| s - 1).sum();
        let mut out = self.data.clone();
        for (idx, &value) in self.data.indexed_iter() {
            let derived: usize = idx.slice().iter().sum();
            let mirror: Vec<usize> = idx
                .slice()
                .iter()
                .zip(&shape)
                .map(|(&i, &s)| s - 1 - i)
                .collect();
            let mirrored = self.data[IxDyn(&mirror)];
            out[idx] = match (2 * derived).cmp(&total) {
                std::cmp::Ordering::Less => value + mirrored,
                std::cmp::Ordering::Equal => (value + mirrored) / 2.0,
                std::cmp::Ordering::Greater => 0.0,
            };
        }
        Spectrum::new(out, self.pop_ids.clone(), true)
    }

    /// Apply a requested polarization change. Restoring an outgroup that the
    /// data does not have is impossible and fails.
    pub fn change_outgroup(&self, new_outgroup: Option<bool>) -> Result<Spectrum, DataError> {
        match new_outgroup {
            None => Ok(self.clone()),
            Some(true) => {
                if self.folded {
                    Err(DataError::NoOutgroup)
                } else {
                    Ok(self.clone())
                }
            }
            Some(false) => Ok(self.fold()),
        }
    }
}

/// Down-sample one axis from its current size `n` to `m` haploid samples.
/// Entry `i` redistributes over `j` with hypergeometric weights
/// `C(i,j) * C(n-i, m-j) / C(n,m)`.
fn project_axis(data: &ArrayD<f64>, axis: usize, m: usize) -> ArrayD<f64> {
    let n = data.shape()[axis] - 1;
    let mut shape = data.shape().to_vec();
    shape[axis] = m + 1;
    let mut out = ArrayD::zeros(IxDyn(&shape));
    let ln_total = ln_binomial(n as u64, m as u64);
    for (idx, &value) in data.indexed_iter() {
        if value == 0.0 {
            continue;
        }
        let i = idx[axis];
        let j_min = m.saturating_sub(n - i);
        for j in j_min..=m.min(i) {
            let weight = (ln_binomial(i as u64, j as u64)
                + ln_binomial((n - i) as u64, (m - j) as u64)
                - ln_total)
                .exp();
            let mut out_idx = idx.clone();
            out_idx[axis] = j;
            out[out_idx] += value * weight;
        }
    }
    out
}
