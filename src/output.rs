//! The module responsible for writing output data to disk.
use crate::capacity::{
    ConverterCapacityRow, GeneratorCapacityRow, NeighbourhoodCapacityRow, StorageCapacityRow,
    TransmissionCapacityRow,
};
use crate::derivation::DerivedParameters;
use crate::generator::GeneratorID;
use crate::horizon::{Hour, Period, ScenarioID};
use crate::model::Model;
use crate::network::NodeID;
use crate::optimisation::Solution;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
pub const DEFAULT_RESULTS_ROOT: &str = "empire_results";

/// The output file name for the objective value
const OBJECTIVE_FILE_NAME: &str = "objective.csv";

/// The output file name for generator capacities
pub const GENERATOR_CAPACITIES_FILE_NAME: &str = "generator_capacities.csv";

/// The output file name for transmission capacities
pub const TRANSMISSION_CAPACITIES_FILE_NAME: &str = "transmission_capacities.csv";

/// The output file name for storage capacities
pub const STORAGE_CAPACITIES_FILE_NAME: &str = "storage_capacities.csv";

/// The output file name for converter capacities
pub const CONVERTER_CAPACITIES_FILE_NAME: &str = "converter_capacities.csv";

/// The output file name for neighbourhood capacities
pub const NEIGHBOURHOOD_CAPACITIES_FILE_NAME: &str = "neighbourhood_capacities.csv";

/// The output file name for generator output
const GENERATION_FILE_NAME: &str = "generation.csv";

/// The output file name for electricity prices
const ELECTRICITY_PRICES_FILE_NAME: &str = "electricity_prices.csv";

/// The output file name for heat prices
const HEAT_PRICES_FILE_NAME: &str = "heat_prices.csv";

/// The output file name for CO2 prices
const EMISSION_PRICES_FILE_NAME: &str = "emission_prices.csv";

/// The output file name for negative loads which were replaced
const ADJUSTED_NEGATIVE_LOAD_FILE_NAME: &str = "adjusted_negative_load.csv";

/// The output file name for derived investment costs
const INVESTMENT_COSTS_FILE_NAME: &str = "debug_investment_costs.csv";

/// Get the output folder for a model, which is named after the model folder
pub fn get_output_dir(model_dir: &Path, results_root: &Path) -> Result<PathBuf> {
    // Get the model name from the dir path. This ends up being convoluted because we need to check
    // for all possible errors. Ugh.
    let model_dir = model_dir
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok(results_root.join(model_name))
}

/// Create a new output directory for the model, if it doesn't already exist.
///
/// A non-empty directory is only reused if `allow_overwrite` is set, in which case its contents
/// are deleted.
///
/// # Returns
///
/// Whether an existing folder is being overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Use --overwrite to overwrite it."
        );

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the objective CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ObjectiveRow {
    objective: f64,
    fixed_investment_cost: f64,
}

/// Represents a row in the generation CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GenerationRow {
    node: NodeID,
    generator: GeneratorID,
    hour: Hour,
    period: Period,
    scenario: ScenarioID,
    generation: f64,
}

/// Represents a row in the electricity and heat price CSV files
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct PriceRow {
    node: NodeID,
    hour: Hour,
    period: Period,
    scenario: ScenarioID,
    price: f64,
}

/// Represents a row in the CO2 price CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EmissionPriceRow {
    period: Period,
    scenario: ScenarioID,
    price: f64,
}

/// Represents a row in the investment cost CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct InvestmentCostRow {
    asset_type: String,
    id: String,
    period: Period,
    cost: f64,
}

/// Write rows to a new CSV file
fn write_csv<T, I>(file_path: &Path, rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the results of a solved model to the output folder
///
/// # Arguments
///
/// * `output_path` - Folder where files will be saved
/// * `model` - The model which was solved
/// * `derived` - Parameters derived from the model
/// * `solution` - The solution
/// * `save_debug_info` - Whether to include extra CSV files for debugging the model
pub fn write_results(
    output_path: &Path,
    model: &Model,
    derived: &DerivedParameters,
    solution: &Solution,
    save_debug_info: bool,
) -> Result<()> {
    write_csv(
        &output_path.join(OBJECTIVE_FILE_NAME),
        [ObjectiveRow {
            objective: solution.objective_value(),
            fixed_investment_cost: solution.variables().objective_offset,
        }],
    )?;
    write_capacities(output_path, solution)?;
    write_generation(output_path, solution)?;
    write_prices(output_path, model, solution)?;
    write_csv(
        &output_path.join(ADJUSTED_NEGATIVE_LOAD_FILE_NAME),
        &derived.loads.adjustments,
    )?;

    if save_debug_info {
        write_investment_costs(output_path, derived)?;
    }

    Ok(())
}

/// Write the capacity files, which can be read back for out-of-sample runs
fn write_capacities(output_path: &Path, solution: &Solution) -> Result<()> {
    let variables = solution.variables();
    let columns = solution.columns();

    let rows = variables.generator_capacity.iter_values(columns).map(
        |((node, generator, period), values)| GeneratorCapacityRow {
            node: node.clone(),
            generator: generator.clone(),
            period: *period,
            invested: values.invested,
            installed: values.installed,
        },
    );
    write_csv(&output_path.join(GENERATOR_CAPACITIES_FILE_NAME), rows)?;

    let rows = variables.transmission_capacity.iter_values(columns).map(
        |((from_node, to_node, period), values)| TransmissionCapacityRow {
            from_node: from_node.clone(),
            to_node: to_node.clone(),
            period: *period,
            invested: values.invested,
            installed: values.installed,
        },
    );
    write_csv(&output_path.join(TRANSMISSION_CAPACITIES_FILE_NAME), rows)?;

    // Power and energy capacities share their keys and order
    let rows = variables
        .storage_power_capacity
        .iter_values(columns)
        .zip(variables.storage_energy_capacity.iter_values(columns))
        .map(|(((node, storage, period), power), (_, energy))| StorageCapacityRow {
            node: node.clone(),
            storage: storage.clone(),
            period: *period,
            power_invested: power.invested,
            power_installed: power.installed,
            energy_invested: energy.invested,
            energy_installed: energy.installed,
        });
    write_csv(&output_path.join(STORAGE_CAPACITIES_FILE_NAME), rows)?;

    if let Some(heat) = &variables.heat {
        let rows = heat.converter_capacity.iter_values(columns).map(
            |((node, converter, period), values)| ConverterCapacityRow {
                node: node.clone(),
                converter: converter.clone(),
                period: *period,
                invested: values.invested,
                installed: values.installed,
            },
        );
        write_csv(&output_path.join(CONVERTER_CAPACITIES_FILE_NAME), rows)?;

        let rows = heat.neighbourhood_capacity.iter_values(columns).map(
            |((node, neighbourhood, period), values)| NeighbourhoodCapacityRow {
                node: node.clone(),
                neighbourhood: neighbourhood.clone(),
                period: *period,
                invested: values.invested,
                installed: values.installed,
            },
        );
        write_csv(&output_path.join(NEIGHBOURHOOD_CAPACITIES_FILE_NAME), rows)?;
    }

    Ok(())
}

/// Write the output of every generator in every hour
fn write_generation(output_path: &Path, solution: &Solution) -> Result<()> {
    let rows = solution.iter_generation().map(
        |((node, generator, hour, period, scenario), generation)| GenerationRow {
            node: node.clone(),
            generator: generator.clone(),
            hour: *hour,
            period: *period,
            scenario: scenario.clone(),
            generation,
        },
    );
    write_csv(&output_path.join(GENERATION_FILE_NAME), rows)
}

/// Write electricity, heat and CO2 prices
fn write_prices(output_path: &Path, model: &Model, solution: &Solution) -> Result<()> {
    let to_row = |((node, hour, period, scenario), price): (&(NodeID, Hour, Period, ScenarioID), f64)| {
        PriceRow {
            node: node.clone(),
            hour: *hour,
            period: *period,
            scenario: scenario.clone(),
            price,
        }
    };
    write_csv(
        &output_path.join(ELECTRICITY_PRICES_FILE_NAME),
        solution.iter_electricity_prices().map(to_row),
    )?;

    let capabilities = model.capabilities();
    if capabilities.heat {
        write_csv(
            &output_path.join(HEAT_PRICES_FILE_NAME),
            solution.iter_heat_prices().map(to_row),
        )?;
    }

    if capabilities.emission_cap {
        let rows = solution
            .iter_emission_prices()
            .map(|((period, scenario), price)| EmissionPriceRow {
                period: *period,
                scenario: scenario.clone(),
                price,
            });
        write_csv(&output_path.join(EMISSION_PRICES_FILE_NAME), rows)?;
    }

    Ok(())
}

/// Write the derived per-period investment cost of every kind of asset
fn write_investment_costs(output_path: &Path, derived: &DerivedParameters) -> Result<()> {
    fn rows<'a, K: 'a>(
        asset_type: &'a str,
        costs: impl Iterator<Item = (&'a K, f64)> + 'a,
        id: impl Fn(&K) -> (String, Period) + 'a,
    ) -> impl Iterator<Item = InvestmentCostRow> + 'a {
        costs.map(move |(key, cost)| {
            let (id, period) = id(key);
            InvestmentCostRow {
                asset_type: asset_type.to_string(),
                id,
                period,
                cost,
            }
        })
    }

    let costs = &derived.investment_costs;
    let all_rows = rows("generator", costs.generator.iter(), |(id, period)| {
        (id.to_string(), *period)
    })
    .chain(rows(
        "storage_power",
        costs.storage_power.iter(),
        |(id, period)| (id.to_string(), *period),
    ))
    .chain(rows(
        "storage_energy",
        costs.storage_energy.iter(),
        |(id, period)| (id.to_string(), *period),
    ))
    .chain(rows(
        "transmission",
        costs.transmission.iter(),
        |(from, to, period)| (format!("{from}-{to}"), *period),
    ))
    .chain(rows("converter", costs.converter.iter(), |(id, period)| {
        (id.to_string(), *period)
    }))
    .chain(rows(
        "neighbourhood",
        costs.neighbourhood.iter(),
        |(id, period)| (id.to_string(), *period),
    ));
    write_csv(&output_path.join(INVESTMENT_COSTS_FILE_NAME), all_rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::derive_parameters;
    use crate::fixture::model;
    use crate::optimisation::solve_model;
    use itertools::Itertools;
    use rstest::rstest;
    use std::fs::File;
    use tempfile::tempdir;

    fn read_rows<T: serde::de::DeserializeOwned>(file_path: &Path) -> Vec<T> {
        csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[test]
    fn test_get_output_dir() {
        let temp_dir = tempdir().unwrap();
        let model_dir = temp_dir.path().join("my_model");
        fs::create_dir(&model_dir).unwrap();
        assert_eq!(
            get_output_dir(&model_dir, Path::new("results")).unwrap(),
            Path::new("results").join("my_model")
        );
    }

    #[test]
    fn test_create_output_directory_new_directory() {
        let temp_dir = tempdir().unwrap();
        let output_dir = temp_dir.path().join("results");
        assert!(!create_output_directory(&output_dir, false).unwrap());
        assert!(output_dir.is_dir());
    }

    #[test]
    fn test_create_output_directory_existing_empty_directory() {
        let temp_dir = tempdir().unwrap();
        assert!(!create_output_directory(temp_dir.path(), false).unwrap());
    }

    #[test]
    fn test_create_output_directory_existing_non_empty_directory() {
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("file.txt");
        File::create(&file_path).unwrap();

        assert!(create_output_directory(temp_dir.path(), false).is_err());
        assert!(file_path.is_file());

        assert!(create_output_directory(temp_dir.path(), true).unwrap());
        assert!(!file_path.exists());
    }

    #[test]
    fn test_write_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("prices.csv");
        let row = EmissionPriceRow {
            period: 2,
            scenario: "scenario1".into(),
            price: 42.0,
        };
        write_csv(&file_path, [&row]).unwrap();
        let records: Vec<EmissionPriceRow> = read_rows(&file_path);
        assert_eq!(records, [row]);
    }

    #[rstest]
    fn test_write_results(model: Model) {
        let derived = derive_parameters(&model).unwrap();
        let solution = solve_model(&model, &derived).unwrap();
        let dir = tempdir().unwrap();
        write_results(dir.path(), &model, &derived, &solution, true).unwrap();

        let objective: Vec<ObjectiveRow> = read_rows(&dir.path().join(OBJECTIVE_FILE_NAME));
        assert_eq!(objective.len(), 1);
        assert_eq!(objective[0].objective, solution.objective_value());

        let capacities: Vec<GeneratorCapacityRow> =
            read_rows(&dir.path().join(GENERATOR_CAPACITIES_FILE_NAME));
        assert_eq!(capacities.len(), 3 * 2);
        let storage: Vec<StorageCapacityRow> =
            read_rows(&dir.path().join(STORAGE_CAPACITIES_FILE_NAME));
        assert_eq!(storage.len(), 2 * 2);

        let prices: Vec<PriceRow> = read_rows(&dir.path().join(ELECTRICITY_PRICES_FILE_NAME));
        assert_eq!(prices.len(), 2 * 8 * 2 * 2);
        assert!(dir.path().join(EMISSION_PRICES_FILE_NAME).is_file());
        assert!(dir.path().join(INVESTMENT_COSTS_FILE_NAME).is_file());
        assert!(!dir.path().join(HEAT_PRICES_FILE_NAME).exists());
        assert!(!dir.path().join(CONVERTER_CAPACITIES_FILE_NAME).exists());
    }
}
