//! Central error types for models, data loading and engine evaluation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or resolving demographic models.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A variable with this name is already present in the pool.
    #[error("Pool already has a variable with the same name ({0})")]
    NameConflict(String),

    /// A value vector or mapping referenced a variable the model does not have.
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// A value vector did not cover the model's variables.
    #[error("Expected {expected} parameter values, got {got}")]
    ValueCountMismatch { expected: usize, got: usize },

    /// A numeric value was supplied for a dynamic variable or vice versa.
    #[error("Variable '{name}' expects a {expected} value")]
    ValueTypeMismatch { name: String, expected: &'static str },

    /// An event of an unexpected kind was encountered during translation.
    #[error("Wrong event type: expected {expected}, found {found}")]
    WrongEventType {
        expected: &'static str,
        found: &'static str,
    },

    /// The model has no epoch events to derive leaves from.
    #[error("Model has no epoch events")]
    EmptyModel,

    /// Linear size trajectories have no closed-form simulator growth rate.
    #[error("Linear dynamic for population {pop} cannot be expressed as a growth-rate formula")]
    UnsupportedDynamic { pop: usize },

    /// A growth-rate formula did not have the expected `log(Nt/N0)/t` shape
    /// over named size variables.
    #[error("Growth-rate formula must be log(Nt/N0)/t over named sizes, got {0}")]
    GrowthFormulaShape(String),
}

/// Errors raised while reading and transforming spectrum data.
#[derive(Debug, Error)]
pub enum DataError {
    /// IO error while opening or reading a data file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Neither recognized parser accepted the file.
    #[error(
        "Data filename extension is neither .fs (.sfs) nor .txt; \
         dense parse failed ({dense}), SNP parse failed ({snp})"
    )]
    UnknownFormat { dense: String, snp: String },

    /// Malformed dense spectrum file.
    #[error("Invalid spectrum file: {0}")]
    Parse(String),

    /// SNP header columns do not encode a whole number of populations.
    #[error("Cannot calculate number of populations from SNP header with {ncols} columns")]
    SnpHeader { ncols: usize },

    /// A SNP data row could not be parsed.
    #[error("Malformed SNP data row {line}: {reason}")]
    SnpRow { line: usize, reason: String },

    /// Requested labels do not match the labels present in the data.
    #[error("Wrong population labels, labels present are: {present}")]
    LabelMismatch { present: String },

    /// Requested projection sizes are incompatible with the data.
    #[error("Wrong projections of SFS: {0}")]
    Projection(String),

    /// Folded data cannot regain ancestral/derived polarization.
    #[error("Data does not have outgroup")]
    NoOutgroup,
}

/// Errors raised by engine evaluation.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Data or model has not been set before `evaluate`.
    #[error("Please set {0} for the engine before evaluating")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// A spectrum-based numerical backend failed to simulate.
    #[error("Solver '{id}' failed: {message}")]
    Solver { id: &'static str, message: String },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The coalescent simulator binary is not configured or missing.
    #[error("Coalescent simulator binary not found: {0}")]
    BinaryMissing(PathBuf),

    /// The external process exited with a failure status.
    #[error("Coalescent simulator failed with {0}")]
    ProcessFailed(std::process::ExitStatus),

    /// The best-likelihood output table could not be parsed.
    #[error("Cannot parse best-likelihood table {path}: {reason}")]
    ResultTable { path: PathBuf, reason: String },

    /// An observed-SFS filename matched none of the recognized conventions.
    #[error(
        "File name {0} does not conform to expected formats \
         (*DAFpop0.obs, *jointDAFpop1_0.obs, *DSFS.obs)"
    )]
    SfsFileName(String),
}
