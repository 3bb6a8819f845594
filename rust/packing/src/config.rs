// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Session parameters.
//!
//! [`PackingParams`] is the loose input shape: every field optional, as a
//! host or a JSON job supplies it. [`PackingConfig`] is the validated form
//! the session runs on.

use serde::{Deserialize, Serialize};

use crate::context::RadiusLimits;
use crate::error::{Error, Result};

/// Default probability of seeding at a tensor-field node.
pub const DEFAULT_TENSOR_BIAS: f64 = 0.7;
/// Default rejection-sampling attempts per seeded ellipsoid.
pub const DEFAULT_SAMPLING_ATTEMPTS: usize = 10_000;

/// Raw session inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PackingParams {
    /// Centres of fixed ellipsoids.
    pub existing_points: Vec<[f64; 3]>,
    pub initial_number: Option<usize>,
    pub min_radius: Option<f64>,
    pub max_radius: Option<f64>,
    pub max_iterations: Option<u64>,
    pub step_scale: Option<f64>,
    pub seed: Option<u64>,
    pub tensor_bias: Option<f64>,
    pub parallel: Option<bool>,
    pub total_iteration_limit: Option<u64>,
    pub sampling_attempts: Option<usize>,
}

/// Validated session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingConfig {
    pub existing_points: Vec<[f64; 3]>,
    /// Movable ellipsoids seeded at start, on top of the fixed ones.
    pub initial_number: usize,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Steps allowed without a collision-free state before the session stops.
    pub max_iterations: u64,
    /// Multiplier on every averaged separation force.
    #[serde(default = "default_step_scale")]
    pub step_scale: f64,
    /// Seed for the session's random source; entropy when `None`.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_tensor_bias")]
    pub tensor_bias: f64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Hard cap on lifetime steps.
    #[serde(default)]
    pub total_iteration_limit: Option<u64>,
    #[serde(default = "default_sampling_attempts")]
    pub sampling_attempts: usize,
}

fn default_step_scale() -> f64 {
    1.0
}

fn default_tensor_bias() -> f64 {
    DEFAULT_TENSOR_BIAS
}

fn default_parallel() -> bool {
    true
}

fn default_sampling_attempts() -> usize {
    DEFAULT_SAMPLING_ATTEMPTS
}

impl PackingConfig {
    /// Configuration with defaults for every optional setting.
    pub fn new(initial_number: usize, min_radius: f64, max_radius: f64, max_iterations: u64) -> Self {
        Self {
            existing_points: Vec::new(),
            initial_number,
            min_radius,
            max_radius,
            max_iterations,
            step_scale: default_step_scale(),
            seed: None,
            tensor_bias: DEFAULT_TENSOR_BIAS,
            parallel: true,
            total_iteration_limit: None,
            sampling_attempts: DEFAULT_SAMPLING_ATTEMPTS,
        }
    }

    pub fn with_existing_points(mut self, points: Vec<[f64; 3]>) -> Self {
        self.existing_points = points;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_step_scale(mut self, step_scale: f64) -> Self {
        self.step_scale = step_scale;
        self
    }

    pub fn with_total_iteration_limit(mut self, limit: u64) -> Self {
        self.total_iteration_limit = Some(limit);
        self
    }

    /// Check every field, returning the first problem found.
    pub fn validate(&self) -> Result<()> {
        RadiusLimits::new(self.min_radius, self.max_radius)?;
        if self.max_iterations == 0 {
            return Err(Error::invalid("max_iterations", "must be at least 1"));
        }
        validate_step_scale(self.step_scale)?;
        if !(0.0..=1.0).contains(&self.tensor_bias) {
            return Err(Error::invalid(
                "tensor_bias",
                format!("{} is not a probability", self.tensor_bias),
            ));
        }
        if self.sampling_attempts == 0 {
            return Err(Error::invalid("sampling_attempts", "must be at least 1"));
        }
        if self.total_iteration_limit == Some(0) {
            return Err(Error::invalid("total_iteration_limit", "must be at least 1"));
        }
        if let Some(p) = self
            .existing_points
            .iter()
            .find(|p| p.iter().any(|c| !c.is_finite()))
        {
            return Err(Error::invalid(
                "existing_points",
                format!("non-finite point {:?}", p),
            ));
        }
        Ok(())
    }

    pub fn radius_limits(&self) -> Result<RadiusLimits> {
        RadiusLimits::new(self.min_radius, self.max_radius)
    }
}

/// Step scales must be finite and positive.
pub(crate) fn validate_step_scale(step_scale: f64) -> Result<()> {
    if step_scale.is_finite() && step_scale > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(
            "step_scale",
            format!("{} is not a finite positive number", step_scale),
        ))
    }
}

impl TryFrom<PackingParams> for PackingConfig {
    type Error = Error;

    fn try_from(params: PackingParams) -> Result<Self> {
        let config = Self {
            existing_points: params.existing_points,
            initial_number: params
                .initial_number
                .ok_or(Error::MissingParameter("initial_number"))?,
            min_radius: params.min_radius.ok_or(Error::MissingParameter("min_radius"))?,
            max_radius: params.max_radius.ok_or(Error::MissingParameter("max_radius"))?,
            max_iterations: params
                .max_iterations
                .ok_or(Error::MissingParameter("max_iterations"))?,
            step_scale: params.step_scale.unwrap_or_else(default_step_scale),
            seed: params.seed,
            tensor_bias: params.tensor_bias.unwrap_or(DEFAULT_TENSOR_BIAS),
            parallel: params.parallel.unwrap_or(true),
            total_iteration_limit: params.total_iteration_limit,
            sampling_attempts: params.sampling_attempts.unwrap_or(DEFAULT_SAMPLING_ATTEMPTS),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PackingParams {
        PackingParams {
            initial_number: Some(10),
            min_radius: Some(0.5),
            max_radius: Some(1.0),
            max_iterations: Some(100),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config = PackingConfig::try_from(params()).unwrap();
        assert_eq!(config.step_scale, 1.0);
        assert_eq!(config.tensor_bias, DEFAULT_TENSOR_BIAS);
        assert!(config.parallel);
        assert_eq!(config.sampling_attempts, DEFAULT_SAMPLING_ATTEMPTS);
        assert_eq!(config, PackingConfig::new(10, 0.5, 1.0, 100));
    }

    #[test]
    fn missing_parameters_are_named() {
        let mut p = params();
        p.max_radius = None;
        match PackingConfig::try_from(p) {
            Err(Error::MissingParameter(name)) => assert_eq!(name, "max_radius"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut p = params();
        p.min_radius = Some(2.0);
        assert!(matches!(
            PackingConfig::try_from(p),
            Err(Error::InvalidParameter { .. })
        ));

        let mut p = params();
        p.max_iterations = Some(0);
        assert!(matches!(
            PackingConfig::try_from(p),
            Err(Error::InvalidParameter { name: "max_iterations", .. })
        ));

        let mut p = params();
        p.step_scale = Some(f64::NAN);
        assert!(PackingConfig::try_from(p).is_err());
    }

    #[test]
    fn params_deserialize_from_partial_json() {
        let p: PackingParams = serde_json::from_str(
            r#"{ "initial_number": 3, "min_radius": 0.2, "max_radius": 0.4,
                 "max_iterations": 50, "existing_points": [[1, 2, 3]] }"#,
        )
        .unwrap();
        let config = PackingConfig::try_from(p).unwrap();
        assert_eq!(config.existing_points, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(config.seed, None);
    }
}
