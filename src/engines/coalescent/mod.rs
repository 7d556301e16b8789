//! Likelihood evaluation through an external coalescent simulator.
//!
//! Each evaluation writes the simulator's three input files and a renamed
//! copy of the observed spectrum into a fresh temporary directory, runs one
//! maximization restricted to the supplied parameter values, and reads the
//! observed log-likelihood back from the output table.

pub mod files;
pub mod runner;

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use crate::data::{read_sfs, SfsDataHolder, Spectrum};
use crate::engines::{Engine, EngineSettings};
use crate::errors::EngineError;
use crate::model::{DemographicModel, TreeModel, Values};

pub use files::{
    generate_input_files, is_multi_sfs, rename_sfs_file, ComplexParam, ComplexParamTable,
    InputFiles, DEFAULT_MUTATION_RATE,
};
pub use runner::{read_best_likelihood, CoalescentRunner};

/// Base name for generated input files and observed-SFS copies.
pub const PREFIX: &str = "demograph_fsc2";

/// Engine backed by the external coalescent simulator.
#[derive(Debug)]
pub struct CoalescentEngine {
    runner: CoalescentRunner,
    data_holder: Option<SfsDataHolder>,
    /// Observed spectrum, read once per holder and reused across
    /// evaluations for its sample sizes.
    spectrum: Option<Spectrum>,
    model: Option<DemographicModel>,
}

impl CoalescentEngine {
    /// Build from settings. Fails when no simulator path is configured.
    pub fn new(settings: &EngineSettings) -> Result<Self, EngineError> {
        let path = settings
            .coalescent_path
            .clone()
            .ok_or(EngineError::NotConfigured("a coalescent simulator path"))?;
        let runner = CoalescentRunner::new(path, settings.n_simulations, settings.n_ecm_loops)?;
        Ok(Self {
            runner,
            data_holder: None,
            spectrum: None,
            model: None,
        })
    }

    pub fn set_data(&mut self, holder: SfsDataHolder) {
        self.spectrum = None;
        self.data_holder = Some(holder);
    }

    pub fn set_model(&mut self, model: DemographicModel) {
        self.model = Some(model);
    }

    fn observed_spectrum(&mut self) -> Result<&Spectrum, EngineError> {
        if self.spectrum.is_none() {
            let holder = self
                .data_holder
                .as_mut()
                .ok_or(EngineError::NotConfigured("data"))?;
            let spectrum = read_sfs(holder)?;
            holder.set_projections(spectrum.sample_sizes());
            self.spectrum = Some(spectrum);
        }
        Ok(self.spectrum.as_ref().unwrap())
    }

    /// Translate the current model to the tree representation the simulator
    /// configuration is generated from. Epoch models are converted; tree
    /// models pass through with the values as given.
    fn tree_model(&self, values: &Values) -> Result<(TreeModel, Values), EngineError> {
        let model = self.model.as_ref().ok_or(EngineError::NotConfigured("a model"))?;
        match model {
            DemographicModel::Epoch(epoch) => Ok(epoch.to_tree(values)?),
            DemographicModel::Tree(tree) => Ok((tree.clone(), values.clone())),
        }
    }

    fn copy_observed_sfs(&self, workdir: &Path) -> Result<bool, EngineError> {
        let holder = self
            .data_holder
            .as_ref()
            .ok_or(EngineError::NotConfigured("data"))?;
        let file_name = holder
            .filename
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| EngineError::SfsFileName(holder.filename.display().to_string()))?;
        let renamed = rename_sfs_file(file_name, PREFIX)?;
        fs::copy(&holder.filename, workdir.join(&renamed))?;
        Ok(is_multi_sfs(&renamed))
    }
}

impl Engine for CoalescentEngine {
    fn id(&self) -> &'static str {
        "fastsimcoal2"
    }

    /// One likelihood evaluation at `values`: generate inputs, run the
    /// simulator in a temporary directory, read the observed likelihood.
    fn evaluate(&mut self, values: &Values) -> Result<f64, EngineError> {
        let sample_sizes = self.observed_spectrum()?.sample_sizes();
        let (tree, tree_values) = self.tree_model(values)?;
        let bindings = tree.var2value(&tree_values)?;
        let mutation_rate = tree.mutation_rate.unwrap_or(DEFAULT_MUTATION_RATE);
        let inputs = generate_input_files(&tree, &bindings, &sample_sizes, mutation_rate)?;

        let workdir = TempDir::with_prefix(PREFIX)?;
        let multi_sfs = self.copy_observed_sfs(workdir.path())?;
        fs::write(workdir.path().join(format!("{PREFIX}.tpl")), &inputs.template)?;
        fs::write(workdir.path().join(format!("{PREFIX}.est")), &inputs.estimation)?;
        fs::write(workdir.path().join(format!("{PREFIX}.def")), &inputs.definitions)?;

        self.runner.run(workdir.path(), PREFIX, multi_sfs)?;
        read_best_likelihood(workdir.path(), PREFIX)
    }
}
