//! Validated parameter sets for signal flow algorithms.
//!
//! The field set is fixed; values are checked by the setters so an invalid
//! configuration is rejected before any computation runs.

use crate::engine::errors::SignalFlowError;
use crate::engine::weights::DegreeNorm;

/// Default propagation rate.
pub const DEFAULT_ALPHA: f64 = 0.5;

/// Default iteration cap for the iterative solver.
pub const DEFAULT_LIM_ITER: usize = 1000;

/// Default convergence threshold on `‖x(t+1) - x(t)‖`.
pub const DEFAULT_TOL: f64 = 1e-5;

/// Parameters shared by the propagation family and the path enumerator.
///
/// `alpha` doubles as the scalar link weight of the path enumerator.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    alpha: f64,
    lim_iter: usize,
    tol: f64,
    apply_weight_norm: bool,
    weight_norm: DegreeNorm,
    use_rel_change: bool,
    exsol_forbidden: bool,
    no_inputs: bool,
    max_path_length: Option<usize>,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            alpha: DEFAULT_ALPHA,
            lim_iter: DEFAULT_LIM_ITER,
            tol: DEFAULT_TOL,
            apply_weight_norm: false,
            weight_norm: DegreeNorm::Both,
            use_rel_change: false,
            exsol_forbidden: false,
            no_inputs: false,
            max_path_length: None,
        }
    }
}

impl ParameterSet {
    /// Propagation rate α ∈ (0, 1). It controls the portion of signal flow
    /// in determining the activity.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> Result<(), SignalFlowError> {
        if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
            return Err(SignalFlowError::invalid_parameter(
                "alpha",
                format!("should be within (0,1), got {}", alpha),
            ));
        }
        self.alpha = alpha;
        Ok(())
    }

    /// Maximum number of iterations of the iterative solver.
    pub fn lim_iter(&self) -> usize {
        self.lim_iter
    }

    pub fn set_lim_iter(&mut self, lim_iter: usize) -> Result<(), SignalFlowError> {
        if lim_iter == 0 {
            return Err(SignalFlowError::invalid_parameter(
                "lim_iter",
                "should be greater than 0",
            ));
        }
        self.lim_iter = lim_iter;
        Ok(())
    }

    /// Convergence threshold of the iterative solver.
    pub fn tol(&self) -> f64 {
        self.tol
    }

    pub fn set_tol(&mut self, tol: f64) -> Result<(), SignalFlowError> {
        if !tol.is_finite() || tol <= 0.0 {
            return Err(SignalFlowError::invalid_parameter(
                "tol",
                format!("should be finite and > 0, got {}", tol),
            ));
        }
        self.tol = tol;
        Ok(())
    }

    /// Apply degree normalization when building the weight matrix.
    pub fn apply_weight_norm(&self) -> bool {
        self.apply_weight_norm
    }

    pub fn set_apply_weight_norm(&mut self, value: bool) {
        self.apply_weight_norm = value;
    }

    /// Which degree sums divide the adjacency when `apply_weight_norm` is set.
    pub fn weight_norm(&self) -> DegreeNorm {
        self.weight_norm
    }

    pub fn set_weight_norm(&mut self, norm: DegreeNorm) {
        self.weight_norm = norm;
    }

    /// The normalization the weight builder applies, if any.
    pub fn degree_norm(&self) -> Option<DegreeNorm> {
        self.apply_weight_norm.then_some(self.weight_norm)
    }

    /// Report `x_condition - x_control` instead of the raw steady state.
    pub fn use_rel_change(&self) -> bool {
        self.use_rel_change
    }

    pub fn set_use_rel_change(&mut self, value: bool) {
        self.use_rel_change = value;
    }

    /// Forbid the exact solution, i.e. always use the iterative method.
    pub fn exsol_forbidden(&self) -> bool {
        self.exsol_forbidden
    }

    pub fn set_exsol_forbidden(&mut self, value: bool) {
        self.exsol_forbidden = value;
    }

    /// Do not apply the dataset's global inputs.
    pub fn no_inputs(&self) -> bool {
        self.no_inputs
    }

    pub fn set_no_inputs(&mut self, value: bool) {
        self.no_inputs = value;
    }

    /// Maximum number of links in an enumerated path (`None` = unbounded).
    pub fn max_path_length(&self) -> Option<usize> {
        self.max_path_length
    }

    pub fn set_max_path_length(&mut self, value: Option<usize>) {
        self.max_path_length = value;
    }

    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, SignalFlowError> {
        self.set_alpha(alpha)?;
        Ok(self)
    }

    pub fn with_lim_iter(mut self, lim_iter: usize) -> Result<Self, SignalFlowError> {
        self.set_lim_iter(lim_iter)?;
        Ok(self)
    }

    pub fn with_tol(mut self, tol: f64) -> Result<Self, SignalFlowError> {
        self.set_tol(tol)?;
        Ok(self)
    }

    /// Tolerance for a model's built-in defaults, where the value is a
    /// known-valid constant.
    pub(crate) fn with_default_tol(mut self, tol: f64) -> Self {
        debug_assert!(tol.is_finite() && tol > 0.0);
        self.tol = tol;
        self
    }

    pub fn with_apply_weight_norm(mut self, value: bool) -> Self {
        self.apply_weight_norm = value;
        self
    }

    pub fn with_weight_norm(mut self, norm: DegreeNorm) -> Self {
        self.weight_norm = norm;
        self
    }

    pub fn with_use_rel_change(mut self, value: bool) -> Self {
        self.use_rel_change = value;
        self
    }

    pub fn with_exsol_forbidden(mut self, value: bool) -> Self {
        self.exsol_forbidden = value;
        self
    }

    pub fn with_no_inputs(mut self, value: bool) -> Self {
        self.no_inputs = value;
        self
    }

    pub fn with_max_path_length(mut self, value: Option<usize>) -> Self {
        self.max_path_length = value;
        self
    }
}

/// Loosely typed parameter overrides, e.g. read from a JSON config file.
///
/// Every present field is routed through the validating setter of
/// [`ParameterSet`]. [`ParameterConfig::apply_to`] on an algorithm's own
/// parameters keeps its defaults for absent fields; the `TryFrom` conversion
/// starts from [`ParameterSet::default`] instead.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterConfig {
    pub alpha: Option<f64>,
    pub lim_iter: Option<usize>,
    pub tol: Option<f64>,
    pub apply_weight_norm: Option<bool>,
    pub weight_norm: Option<DegreeNorm>,
    pub use_rel_change: Option<bool>,
    pub exsol_forbidden: Option<bool>,
    pub no_inputs: Option<bool>,
    pub max_path_length: Option<usize>,
}

#[cfg(feature = "serde")]
impl ParameterConfig {
    /// Applies the present fields on top of `params`.
    pub fn apply_to(&self, params: &mut ParameterSet) -> Result<(), SignalFlowError> {
        if let Some(alpha) = self.alpha {
            params.set_alpha(alpha)?;
        }
        if let Some(lim_iter) = self.lim_iter {
            params.set_lim_iter(lim_iter)?;
        }
        if let Some(tol) = self.tol {
            params.set_tol(tol)?;
        }
        if let Some(v) = self.apply_weight_norm {
            params.set_apply_weight_norm(v);
        }
        if let Some(norm) = self.weight_norm {
            params.set_weight_norm(norm);
        }
        if let Some(v) = self.use_rel_change {
            params.set_use_rel_change(v);
        }
        if let Some(v) = self.exsol_forbidden {
            params.set_exsol_forbidden(v);
        }
        if let Some(v) = self.no_inputs {
            params.set_no_inputs(v);
        }
        if self.max_path_length.is_some() {
            params.set_max_path_length(self.max_path_length);
        }
        Ok(())
    }
}

/// Builds a [`ParameterSet`] from the propagation-family defaults. Use
/// [`ParameterConfig::apply_to`] to override a specific algorithm's defaults.
#[cfg(feature = "serde")]
impl TryFrom<ParameterConfig> for ParameterSet {
    type Error = SignalFlowError;

    fn try_from(config: ParameterConfig) -> Result<Self, Self::Error> {
        let mut params = ParameterSet::default();
        config.apply_to(&mut params)?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_propagation_family() {
        let p = ParameterSet::default();
        assert_eq!(p.alpha(), 0.5);
        assert_eq!(p.lim_iter(), 1000);
        assert_eq!(p.tol(), 1e-5);
        assert!(!p.apply_weight_norm());
        assert_eq!(p.weight_norm(), DegreeNorm::Both);
        assert_eq!(p.degree_norm(), None);
        assert!(!p.use_rel_change());
        assert!(!p.exsol_forbidden());
        assert!(!p.no_inputs());
        assert_eq!(p.max_path_length(), None);
    }

    #[test]
    fn alpha_rejects_closed_interval_bounds() {
        let mut p = ParameterSet::default();
        assert!(p.set_alpha(0.0).is_err());
        assert!(p.set_alpha(1.0).is_err());
        assert!(p.set_alpha(f64::NAN).is_err());
        assert_eq!(p.alpha(), 0.5, "rejected value must not be stored");
        p.set_alpha(0.9).unwrap();
        assert_eq!(p.alpha(), 0.9);
    }

    #[test]
    fn lim_iter_and_tol_are_range_checked() {
        let mut p = ParameterSet::default();
        assert!(p.set_lim_iter(0).is_err());
        assert!(p.set_tol(0.0).is_err());
        assert!(p.set_tol(-1e-3).is_err());
        assert!(p.set_tol(f64::INFINITY).is_err());
        p.set_lim_iter(10).unwrap();
        p.set_tol(1e-10).unwrap();
        assert_eq!(p.lim_iter(), 10);
        assert_eq!(p.tol(), 1e-10);
    }

    #[test]
    fn chained_builders_propagate_errors() {
        let p = ParameterSet::default()
            .with_alpha(0.3)
            .and_then(|p| p.with_lim_iter(50))
            .map(|p| p.with_use_rel_change(true))
            .unwrap();
        assert_eq!(p.alpha(), 0.3);
        assert_eq!(p.lim_iter(), 50);
        assert!(p.use_rel_change());

        assert!(ParameterSet::default().with_alpha(1.5).is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_overrides_only_present_fields() {
        let config: ParameterConfig =
            serde_json::from_str(r#"{"alpha": 0.7, "use_rel_change": true}"#).unwrap();
        let params = ParameterSet::try_from(config).unwrap();
        assert_eq!(params.alpha(), 0.7);
        assert!(params.use_rel_change());
        assert_eq!(params.lim_iter(), DEFAULT_LIM_ITER);
    }

    #[test]
    fn degree_norm_follows_the_switch() {
        let p = ParameterSet::default().with_weight_norm(DegreeNorm::In);
        assert_eq!(p.degree_norm(), None);
        let p = p.with_apply_weight_norm(true);
        assert_eq!(p.degree_norm(), Some(DegreeNorm::In));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_applied_to_model_defaults_keeps_them() {
        use crate::engine::models::cyclic::{CyclicPathSummation, CPS_DEFAULT_TOL};
        use crate::engine::solver::PropagationModel;

        let config: ParameterConfig =
            serde_json::from_str(r#"{"alpha": 0.3, "weight_norm": "out"}"#).unwrap();
        let mut params = CyclicPathSummation.default_params();
        config.apply_to(&mut params).unwrap();
        assert_eq!(params.alpha(), 0.3);
        assert_eq!(params.tol(), CPS_DEFAULT_TOL);
        assert!(params.exsol_forbidden());
        assert_eq!(params.weight_norm(), DegreeNorm::Out);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_is_validated() {
        let config: ParameterConfig = serde_json::from_str(r#"{"alpha": 2.0}"#).unwrap();
        assert!(ParameterSet::try_from(config).is_err());
        assert!(serde_json::from_str::<ParameterConfig>(r#"{"beta": 1.0}"#).is_err());
    }
}
