//! Engine evaluating models against an observed spectrum through a
//! numerical solver, with a theta cache keyed by parameter point and grid.

use std::collections::HashMap;

use ndarray::Dimension;

use crate::data::{read_sfs, SfsDataHolder, Spectrum};
use crate::engines::{Engine, GridSizes};
use crate::engines::solver::SfsSolver;
use crate::errors::EngineError;
use crate::model::{Bindings, EpochModel, ParamValue, Values};

/// Stable cache key: pool-ordered `(name, value bits)` pairs plus the grid
/// configuration, so equivalent vector- and map-shaped calls hit the same
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    params: Vec<(String, u64)>,
    grid: GridKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GridKey {
    Scalar(u64),
    Sizes(Vec<usize>),
}

fn cache_key(bindings: &Bindings, grid: &GridSizes) -> CacheKey {
    let params = bindings
        .iter()
        .map(|(var, value)| {
            let bits = match value {
                ParamValue::Num(x) => x.to_bits(),
                // dynamic markers are discrete; encode the discriminant
                ParamValue::Dynamic(d) => *d as u64,
            };
            (var.name().to_string(), bits)
        })
        .collect();
    let grid = match grid {
        GridSizes::Scalar(x) => GridKey::Scalar(x.to_bits()),
        GridSizes::Sizes(sizes) => GridKey::Sizes(sizes.clone()),
    };
    CacheKey { params, grid }
}

/// Engine for the spectrum-based numerical backends.
///
/// `evaluate` simulates an expected spectrum, computes the composite
/// multinomial log-likelihood against the observed one and caches the
/// optimal scaling factor (theta) for the evaluated point, since the
/// optimizer queries likelihood and theta separately for the same point.
#[derive(Debug)]
pub struct SpectrumEngine<S> {
    solver: S,
    data: Option<Spectrum>,
    data_holder: Option<SfsDataHolder>,
    model: Option<EpochModel>,
    default_grid: GridSizes,
    theta_cache: HashMap<CacheKey, f64>,
}

impl<S: SfsSolver> SpectrumEngine<S> {
    pub fn new(solver: S, default_grid: GridSizes) -> Self {
        Self {
            solver,
            data: None,
            data_holder: None,
            model: None,
            default_grid,
            theta_cache: HashMap::new(),
        }
    }

    /// Load the observed spectrum described by `holder`.
    pub fn set_data(&mut self, holder: &SfsDataHolder) -> Result<(), EngineError> {
        self.data = Some(read_sfs(holder)?);
        self.data_holder = Some(holder.clone());
        Ok(())
    }

    /// Use an already-loaded spectrum.
    pub fn set_spectrum(&mut self, spectrum: Spectrum) {
        self.data = Some(spectrum);
    }

    pub fn set_model(&mut self, model: EpochModel) {
        self.model = Some(model);
    }

    pub fn data(&self) -> Option<&Spectrum> {
        self.data.as_ref()
    }

    /// Simulate at `values` on `grid`, cache theta for the point and return
    /// the composite log-likelihood.
    pub fn evaluate_on_grid(
        &mut self,
        values: &Values,
        grid: &GridSizes,
    ) -> Result<f64, EngineError> {
        let model = self.model.as_ref().ok_or(EngineError::NotConfigured("model"))?;
        let data = self.data.as_ref().ok_or(EngineError::NotConfigured("data"))?;
        let bindings = model.var2value(values)?;
        let sample_sizes = data.sample_sizes();
        let simulated = self
            .solver
            .simulate(model, &bindings, &sample_sizes, grid)?;
        let theta = optimal_sfs_scaling(&simulated, data);
        let log_likelihood = ll_multinomial(&simulated, data);
        self.theta_cache.insert(cache_key(&bindings, grid), theta);
        Ok(log_likelihood)
    }

    /// Theta for an evaluated point. A miss is recoverable: it logs a
    /// warning and runs one extra evaluation to fill the cache.
    pub fn get_theta(&mut self, values: &Values, grid: &GridSizes) -> Result<f64, EngineError> {
        let model = self.model.as_ref().ok_or(EngineError::NotConfigured("model"))?;
        let key = cache_key(&model.var2value(values)?, grid);
        if !self.theta_cache.contains_key(&key) {
            log::warn!("Additional evaluation for theta. Nothing to worry if seldom.");
            self.evaluate_on_grid(values, grid)?;
        }
        Ok(self.theta_cache[&key])
    }

    /// Ancestral population size `theta / theta0`, with `theta0` explicit
    /// on the model or derived as `4 * mu * sequence_length`. `None` when
    /// neither source is configured.
    pub fn get_n_ancestral(&self, theta: f64) -> Option<f64> {
        let model = self.model.as_ref()?;
        let theta0 = match model.theta0 {
            Some(theta0) => theta0,
            None => {
                let mu = model.mutation_rate?;
                let length = self.data_holder.as_ref()?.sequence_length?;
                4.0 * mu * length
            }
        };
        Some(theta / theta0)
    }
}

impl<S: SfsSolver> Engine for SpectrumEngine<S> {
    fn id(&self) -> &'static str {
        self.solver.id()
    }

    fn evaluate(&mut self, values: &Values) -> Result<f64, EngineError> {
        let grid = self.default_grid.clone();
        self.evaluate_on_grid(values, &grid)
    }
}

/// Optimal multiplicative scaling of `model` onto `data` over the
/// polymorphic (non-corner) cells.
pub fn optimal_sfs_scaling(model: &Spectrum, data: &Spectrum) -> f64 {
    data.total() / model.total()
}

/// Composite multinomial log-likelihood of `data` under `model` scaled by
/// its optimal theta. Spectrum bins are treated as independent Poisson
/// counts; the monomorphic corners are excluded.
pub fn ll_multinomial(model: &Spectrum, data: &Spectrum) -> f64 {
    use statrs::function::gamma::ln_gamma;

    let theta = optimal_sfs_scaling(model, data);
    let mut log_likelihood = 0.0;
    for (idx, &observed) in data.data.indexed_iter() {
        if data.is_corner(idx.slice()) {
            continue;
        }
        let expected = theta * model.data[idx.clone()];
        if expected <= 0.0 {
            if observed > 0.0 {
                return f64::NEG_INFINITY;
            }
            continue;
        }
        log_likelihood += observed * expected.ln() - expected - ln_gamma(observed + 1.0);
    }
    log_likelihood
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};
    use std::cell::Cell;
    use std::rc::Rc;

    fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
        (a - b).abs() < eps
    }

    /// Solver returning a fixed spectrum and counting invocations.
    struct CountingSolver {
        calls: Rc<Cell<usize>>,
        output: Vec<f64>,
    }

    impl SfsSolver for CountingSolver {
        fn id(&self) -> &'static str {
            "counting"
        }

        fn simulate(
            &mut self,
            _model: &EpochModel,
            _bindings: &Bindings,
            sample_sizes: &[usize],
            _grid: &GridSizes,
        ) -> Result<Spectrum, EngineError> {
            self.calls.set(self.calls.get() + 1);
            let shape: Vec<usize> = sample_sizes.iter().map(|&s| s + 1).collect();
            let data = Array::from_shape_vec(IxDyn(&shape), self.output.clone()).unwrap();
            Ok(Spectrum::new(data, vec!["Pop 1".to_string()], false))
        }
    }

    fn observed() -> Spectrum {
        let data =
            Array::from_shape_vec(IxDyn(&[5]), vec![0.0, 8.0, 4.0, 2.0, 0.0]).unwrap();
        Spectrum::new(data, vec!["Pop 1".to_string()], false)
    }

    fn engine(calls: Rc<Cell<usize>>) -> SpectrumEngine<CountingSolver> {
        let solver = CountingSolver {
            calls,
            output: vec![0.0, 4.0, 2.0, 1.0, 0.0],
        };
        let mut engine = SpectrumEngine::new(solver, GridSizes::Sizes(vec![10, 20, 30]));
        engine.set_spectrum(observed());
        let mut model = EpochModel::default();
        model
            .variables
            .push(crate::model::Variable::new(
                "N1",
                crate::model::VariableKind::PopulationSize,
                (1.0, 1e5),
            ))
            .unwrap();
        engine.set_model(model);
        engine
    }

    #[test]
    fn test_evaluate_requires_configuration() {
        let solver = CountingSolver {
            calls: Rc::new(Cell::new(0)),
            output: vec![],
        };
        let mut engine = SpectrumEngine::new(solver, GridSizes::Scalar(0.01));
        let err = engine.evaluate(&Values::from_nums(&[1.0])).unwrap_err();
        assert!(matches!(err, EngineError::NotConfigured(_)));
    }

    #[test]
    fn test_theta_cached_by_evaluate() {
        let calls = Rc::new(Cell::new(0));
        let mut engine = engine(calls.clone());
        let values = Values::from_nums(&[1000.0]);
        let grid = GridSizes::Sizes(vec![10, 20, 30]);

        engine.evaluate_on_grid(&values, &grid).unwrap();
        assert_eq!(calls.get(), 1);

        let theta = engine.get_theta(&values, &grid).unwrap();
        // observed total 14, model total 7
        assert!(approx_eq(theta, 2.0, 1e-12));
        // no second simulation for the cached point
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_theta_cache_miss_triggers_one_evaluation() {
        let calls = Rc::new(Cell::new(0));
        let mut engine = engine(calls.clone());
        let values = Values::from_nums(&[2000.0]);
        let grid = GridSizes::Scalar(0.01);

        let theta = engine.get_theta(&values, &grid).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(approx_eq(theta, 2.0, 1e-12));
    }

    #[test]
    fn test_cache_key_ignores_values_shape() {
        let calls = Rc::new(Cell::new(0));
        let mut engine = engine(calls.clone());
        let grid = GridSizes::Sizes(vec![10, 20, 30]);

        engine
            .evaluate_on_grid(&Values::from_nums(&[1000.0]), &grid)
            .unwrap();
        let mut map = std::collections::HashMap::new();
        map.insert("N1".to_string(), ParamValue::Num(1000.0));
        engine.get_theta(&Values::Map(map), &grid).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_distinct_grids_are_distinct_points() {
        let calls = Rc::new(Cell::new(0));
        let mut engine = engine(calls.clone());
        let values = Values::from_nums(&[1000.0]);

        engine
            .evaluate_on_grid(&values, &GridSizes::Sizes(vec![10, 20, 30]))
            .unwrap();
        engine
            .get_theta(&values, &GridSizes::Sizes(vec![40, 50, 60]))
            .unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_ll_multinomial_value() {
        let model = Spectrum::new(
            Array::from_shape_vec(IxDyn(&[3]), vec![0.0, 2.0, 0.0]).unwrap(),
            vec!["P".to_string()],
            false,
        );
        let data = Spectrum::new(
            Array::from_shape_vec(IxDyn(&[3]), vec![0.0, 3.0, 0.0]).unwrap(),
            vec!["P".to_string()],
            false,
        );
        // theta = 3/2, expected = 3; ll = 3 ln 3 - 3 - ln(3!)
        let expected = 3.0 * 3.0_f64.ln() - 3.0 - 6.0_f64.ln();
        assert!(approx_eq(ll_multinomial(&model, &data), expected, 1e-12));
    }

    #[test]
    fn test_n_ancestral_sources() {
        let calls = Rc::new(Cell::new(0));
        let mut engine = engine(calls);
        assert!(engine.get_n_ancestral(10.0).is_none());

        let mut model = EpochModel::default();
        model.theta0 = Some(2.0);
        engine.set_model(model);
        assert!(approx_eq(engine.get_n_ancestral(10.0).unwrap(), 5.0, 1e-12));

        let mut model = EpochModel::default();
        model.mutation_rate = Some(2.5e-8);
        engine.set_model(model);
        // no sequence length configured either
        assert!(engine.get_n_ancestral(10.0).is_none());
    }
}
