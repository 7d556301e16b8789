//! Optimizer-facing workflow over the spectrum engine: load data from disk,
//! evaluate a parameter point, query theta and the ancestral size.

use std::fs;
use std::io::Write;

use ndarray::{Array, IxDyn};

use demograph::data::{SfsDataHolder, Spectrum};
use demograph::engines::{
    Engine, EngineRegistry, EngineSettings, GridSizes, SfsSolver, SpectrumEngine,
};
use demograph::errors::EngineError;
use demograph::model::{Bindings, EpochModel, Values, Variable, VariableKind};

fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

/// Backend returning a fixed expected spectrum whatever the point.
struct FixedSolver {
    output: Vec<f64>,
}

impl SfsSolver for FixedSolver {
    fn id(&self) -> &'static str {
        "dadi"
    }

    fn simulate(
        &mut self,
        _model: &EpochModel,
        _bindings: &Bindings,
        sample_sizes: &[usize],
        _grid: &GridSizes,
    ) -> Result<Spectrum, EngineError> {
        let shape: Vec<usize> = sample_sizes.iter().map(|&s| s + 1).collect();
        let data = Array::from_shape_vec(IxDyn(&shape), self.output.clone()).unwrap();
        Ok(Spectrum::new(data, vec!["Pop 1".to_string()], false))
    }
}

fn one_pop_model() -> EpochModel {
    let mut model = EpochModel::default();
    model
        .variables
        .push(Variable::new(
            "N1",
            VariableKind::PopulationSize,
            (100.0, 100_000.0),
        ))
        .unwrap();
    model.mutation_rate = Some(2.5e-8);
    model
}

#[test]
fn test_evaluate_from_file_and_theta() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one_pop.fs");
    let mut file = fs::File::create(&path).unwrap();
    file.write_all(b"5 unfolded \"YRI\"\n0 8 4 2 0\n").unwrap();

    let holder = SfsDataHolder::new(&path).with_sequence_length(1e6);
    let mut engine = SpectrumEngine::new(
        FixedSolver {
            output: vec![0.0, 4.0, 2.0, 1.0, 0.0],
        },
        GridSizes::Sizes(vec![40, 50, 60]),
    );
    engine.set_data(&holder).unwrap();
    engine.set_model(one_pop_model());
    assert_eq!(engine.id(), "dadi");

    let values = Values::from_nums(&[10_000.0]);
    let log_likelihood = engine.evaluate(&values).unwrap();
    assert!(log_likelihood.is_finite());

    // observed total 14 against expected total 7
    let grid = GridSizes::Sizes(vec![40, 50, 60]);
    let theta = engine.get_theta(&values, &grid).unwrap();
    assert!(approx_eq(theta, 2.0, 1e-12));

    // theta0 = 4 * mu * L = 0.1
    let n_anc = engine.get_n_ancestral(theta).unwrap();
    assert!(approx_eq(n_anc, 20.0, 1e-9));
}

#[test]
fn test_evaluate_unconfigured_engine() {
    let mut engine = SpectrumEngine::new(FixedSolver { output: vec![] }, GridSizes::Scalar(0.01));
    let err = engine.evaluate(&Values::from_nums(&[1.0])).unwrap_err();
    assert!(matches!(err, EngineError::NotConfigured(_)));
}

#[test]
fn test_registry_gates_coalescent_engine() {
    let registry = EngineRegistry::new(&EngineSettings::default());
    assert!(registry.is_available("dadi"));
    assert!(registry.is_available("moments"));
    assert!(!registry.is_available("fastsimcoal2"));

    let settings = EngineSettings {
        coalescent_path: Some(std::path::PathBuf::from("/opt/fsc27")),
        ..EngineSettings::default()
    };
    assert!(EngineRegistry::new(&settings).is_available("fastsimcoal2"));
}
