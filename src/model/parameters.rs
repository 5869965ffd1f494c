//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::horizon::{Horizon, SeasonID};
use crate::input::{deserialise_proportion, input_err_msg, read_toml};
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::path::{Path, PathBuf};

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_leap_years_investment, u32, 10);
define_param_default!(default_discount_rate, f64, 0.05);
define_param_default!(default_wacc, f64, 0.05);
define_param_default!(default_num_scenarios, u32, 1);
define_param_default!(default_emission_cap, bool, true);
define_param_default!(default_regular_length, u32, 168);
define_param_default!(default_peak_length, u32, 24);
define_param_default!(default_transport_storage_fixed_cost, f64, 1_149_873.72);
define_param_default!(default_capture_fraction, f64, 0.9);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// Number of investment periods
    pub num_periods: u32,
    /// Number of years each investment period represents
    #[serde(default = "default_leap_years_investment")]
    pub leap_years_investment: u32,
    /// Discount rate applied to future costs
    #[serde(default = "default_discount_rate")]
    pub discount_rate: f64,
    /// Weighted average cost of capital, used to annualise capital costs
    #[serde(default = "default_wacc")]
    pub wacc: f64,
    /// Number of equally likely operational scenarios
    #[serde(default = "default_num_scenarios")]
    pub num_scenarios: u32,
    /// Representative seasons
    pub seasons: SeasonParameters,
    /// Optional modules
    #[serde(default)]
    pub modules: ModuleFlags,
    /// Whether emissions are limited by a cap. If not, emissions are priced instead.
    #[serde(default = "default_emission_cap")]
    pub emission_cap: bool,
    /// Output folder of a previous run whose capacities should be fixed.
    ///
    /// Relative paths are relative to the model directory.
    #[serde(default)]
    pub out_of_sample: Option<PathBuf>,
    /// The LP solver to use
    #[serde(default)]
    pub solver: Solver,
    /// Carbon capture and storage parameters
    #[serde(default)]
    pub ccs: CcsParameters,
}

/// The `[seasons]` section of the model file
#[derive(Debug, Deserialize, PartialEq)]
pub struct SeasonParameters {
    /// Names of the regular seasons, in order
    pub regular: Vec<SeasonID>,
    /// Hours per regular season
    #[serde(default = "default_regular_length")]
    pub regular_length: u32,
    /// Number of peak seasons
    #[serde(default)]
    pub num_peak: u32,
    /// Hours per peak season
    #[serde(default = "default_peak_length")]
    pub peak_length: u32,
}

/// The `[modules]` section of the model file
#[derive(Debug, Deserialize, PartialEq, Default, Clone, Copy)]
pub struct ModuleFlags {
    /// Model a heat balance alongside the electricity balance
    #[serde(default)]
    pub heat: bool,
    /// Model flexible demand as storage
    #[serde(default)]
    pub demand_response: bool,
    /// Apply exogenous changes to hourly loads
    #[serde(default)]
    pub load_change: bool,
}

/// The `[ccs]` section of the model file
#[derive(Debug, Deserialize, PartialEq)]
pub struct CcsParameters {
    /// Fixed cost of transporting and storing captured CO2
    #[serde(default = "default_transport_storage_fixed_cost")]
    pub transport_storage_fixed_cost: f64,
    /// Fraction of emissions captured
    #[serde(default = "default_capture_fraction")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub capture_fraction: f64,
}

impl Default for CcsParameters {
    fn default() -> Self {
        Self {
            transport_storage_fixed_cost: default_transport_storage_fixed_cost(),
            capture_fraction: default_capture_fraction(),
        }
    }
}

/// The solver used for the optimisation
#[derive(DeserializeLabeledStringEnum, Debug, PartialEq, Default, Clone, Copy)]
pub enum Solver {
    /// The HiGHS solver
    #[default]
    #[string = "highs"]
    Highs,
}

/// Check that the `num_periods` parameter is valid
fn check_num_periods(value: u32) -> Result<()> {
    ensure!(value > 0, "num_periods cannot be zero");

    Ok(())
}

/// Check that the `leap_years_investment` parameter is valid
fn check_leap_years_investment(value: u32) -> Result<()> {
    ensure!(value > 0, "leap_years_investment cannot be zero");

    Ok(())
}

/// Check that a rate is a finite number of at least zero
fn check_rate(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number of at least zero"
    );

    Ok(())
}

/// Check that the `num_scenarios` parameter is valid
fn check_num_scenarios(value: u32) -> Result<()> {
    ensure!(value > 0, "num_scenarios cannot be zero");

    Ok(())
}

/// Check that the `[seasons]` section is valid
fn check_seasons(seasons: &SeasonParameters) -> Result<()> {
    ensure!(
        !seasons.regular.is_empty(),
        "At least one regular season is required"
    );
    ensure!(
        seasons.regular_length > 0,
        "regular_length cannot be zero"
    );
    ensure!(
        seasons.num_peak == 0 || seasons.peak_length > 0,
        "peak_length cannot be zero when there are peak seasons"
    );

    Ok(())
}

/// Check that the CCS transport and storage cost is valid
fn check_transport_storage_fixed_cost(value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "ccs.transport_storage_fixed_cost must be a finite number of at least zero"
    );

    Ok(())
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        check_num_periods(self.num_periods)?;
        check_leap_years_investment(self.leap_years_investment)?;
        check_rate(self.discount_rate, "discount_rate")?;
        check_rate(self.wacc, "wacc")?;
        check_num_scenarios(self.num_scenarios)?;
        check_seasons(&self.seasons)?;

        // capture_fraction already validated with deserialise_proportion
        check_transport_storage_fixed_cost(self.ccs.transport_storage_fixed_cost)?;

        Ok(())
    }

    /// Create the planning horizon described by these parameters
    pub fn horizon(&self) -> Result<Horizon> {
        Horizon::new(
            self.num_periods,
            self.leap_years_investment,
            &self.seasons.regular,
            self.seasons.regular_length,
            self.seasons.num_peak,
            self.seasons.peak_length,
            self.num_scenarios,
        )
    }
}
