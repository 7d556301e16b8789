//! Description of how observed spectrum data should be loaded.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Describes an observed site-frequency-spectrum file and the transforms to
/// apply while loading it. Engines only write back through the explicit
/// setters when inferring values the caller left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SfsDataHolder {
    /// Path of the spectrum or SNP-table file.
    pub filename: PathBuf,
    /// Declared population labels; `None` keeps the file's own (or default)
    /// labels.
    pub population_labels: Option<Vec<String>>,
    /// Declared sample-size projections; `None` keeps the file's sizes.
    pub projections: Option<Vec<usize>>,
    /// Requested polarization: `Some(false)` folds the data, `Some(true)`
    /// requires an outgroup to be present.
    pub outgroup: Option<bool>,
    /// Sequence length behind the spectrum, for theta0 derivation.
    pub sequence_length: Option<f64>,
}

impl SfsDataHolder {
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        Self {
            filename: filename.into(),
            population_labels: None,
            projections: None,
            outgroup: None,
            sequence_length: None,
        }
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.population_labels = Some(labels);
        self
    }

    pub fn with_projections(mut self, projections: Vec<usize>) -> Self {
        self.projections = Some(projections);
        self
    }

    pub fn with_outgroup(mut self, outgroup: bool) -> Self {
        self.outgroup = Some(outgroup);
        self
    }

    pub fn with_sequence_length(mut self, length: f64) -> Self {
        self.sequence_length = Some(length);
        self
    }

    /// Engines call this after reading to record inferred values.
    pub fn set_projections(&mut self, projections: Vec<usize>) {
        self.projections = Some(projections);
    }
}
