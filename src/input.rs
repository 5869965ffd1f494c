//! Common routines for handling input data.
use crate::id::{HasID, IDLike};
use crate::model::{Model, ModelParameters, SystemParameters};
use anyhow::{Context, Result, bail, ensure};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use log::{info, warn};
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod demand_response;
pub mod generator;
pub mod heat;
pub mod network;
pub mod out_of_sample;
pub mod storage;
pub mod table;
use demand_response::{DEMAND_RESPONSE_DIR_NAME, read_demand_response_module};
use generator::{read_generator_parameters, read_generators};
use heat::{HEAT_DIR_NAME, read_heat_entities, read_heat_module};
use network::{read_network, read_node_parameters, read_transmission_parameters};
use out_of_sample::read_fixed_capacities;
use storage::{read_storage_parameters, read_storages};
use table::{KnownIDs, fill_param_table, read_relation};

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }

    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// A missing file is treated as an empty one.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(serde::de::Error::custom("Value must be between 0 and 1"));
    }

    Ok(value)
}

/// Format an error message to include the file path. To be used with `anyhow::Context`.
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Read a CSV file of items with IDs.
///
/// As this function is only ever used for top-level CSV files (i.e. the ones which actually define
/// the IDs for a given type), we use an ordered map to maintain the order in the input files.
pub fn read_csv_id_file<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    fn fill_and_validate_map<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
    where
        T: HasID<ID> + DeserializeOwned,
    {
        let mut map = IndexMap::new();
        for record in read_csv::<T>(file_path)? {
            let id = record.get_id().clone();
            ensure!(!id.to_string().is_empty(), "IDs cannot be empty");
            let existing = map.insert(id.clone(), record).is_some();
            ensure!(!existing, "Duplicate ID found: {id}");
        }

        Ok(map)
    }

    fill_and_validate_map(file_path).with_context(|| input_err_msg(file_path))
}

/// Check that a value read from a file is finite and strictly positive
pub fn check_positive(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value > 0.0,
        "{name} must be a finite number greater than zero (got {value})"
    );

    Ok(())
}

/// Check that a value read from a file is finite and not negative
pub fn check_non_negative(value: f64, name: &str) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite number of at least zero (got {value})"
    );

    Ok(())
}

/// Read system-wide parameters.
///
/// CO2 caps are only read when the emission cap is enabled, and CO2 prices only when it is not.
fn read_system_parameters(
    model_dir: &Path,
    ids: &KnownIDs,
    emission_cap: bool,
) -> Result<SystemParameters> {
    let mut params = SystemParameters::default();
    let file_path = model_dir.join("season_scale.csv");
    fill_param_table(&mut params.season_scale, &file_path, ids)?;
    for (season, scale) in params.season_scale.iter() {
        check_positive(scale, "Season scale")
            .with_context(|| format!("Invalid scale for season {season}"))
            .with_context(|| input_err_msg(&file_path))?;
    }

    if emission_cap {
        fill_param_table(&mut params.co2_cap, &model_dir.join("co2_cap.csv"), ids)?;
    } else {
        fill_param_table(&mut params.co2_price, &model_dir.join("co2_price.csv"), ids)?;
    }
    fill_param_table(
        &mut params.ccs_variable_cost,
        &model_dir.join("ccs_variable_costs.csv"),
        ids,
    )?;

    Ok(params)
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The fully loaded model, or an error if any input file is missing or invalid.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;
    let horizon = parameters.horizon()?;
    let modules = parameters.modules;

    let network = read_network(model_dir)?;
    let generators = read_generators(model_dir, modules.heat)?;
    let technologies: IndexSet<_> = generators
        .values()
        .map(|generator| generator.technology.clone())
        .collect();
    let storages = read_storages(model_dir, &modules)?;
    let (converters, neighbourhoods) = if modules.heat {
        read_heat_entities(&model_dir.join(HEAT_DIR_NAME))?
    } else {
        Default::default()
    };

    let ids = KnownIDs {
        nodes: &network.nodes,
        generators: &generators,
        technologies: &technologies,
        storages: &storages,
        line_types: &network.line_types,
        seasons: &horizon.seasons,
        scenarios: &horizon.scenarios,
        converters: modules.heat.then_some(&converters),
        neighbourhoods: modules.heat.then_some(&neighbourhoods),
    };

    let generators_of_node = read_relation(&model_dir.join("node_generators.csv"), &ids)?;
    let storages_of_node = read_relation(&model_dir.join("node_storages.csv"), &ids)?;
    let node_parameters = read_node_parameters(model_dir, &ids, modules.load_change)?;
    let transmission_parameters = read_transmission_parameters(model_dir, &network, &ids)?;
    let generator_parameters = read_generator_parameters(model_dir, &ids)?;
    let storage_parameters = read_storage_parameters(model_dir, &ids)?;
    let system_parameters = read_system_parameters(model_dir, &ids, parameters.emission_cap)?;

    let heat = if modules.heat {
        Some(read_heat_module(
            &model_dir.join(HEAT_DIR_NAME),
            converters.clone(),
            neighbourhoods.clone(),
            &ids,
            modules.load_change,
        )?)
    } else {
        None
    };
    let demand_response = if modules.demand_response {
        Some(read_demand_response_module(
            &model_dir.join(DEMAND_RESPONSE_DIR_NAME),
            &storages,
            &ids,
        )?)
    } else {
        None
    };

    let fixed_capacities = match &parameters.out_of_sample {
        Some(_) if modules.demand_response => {
            warn!(
                "Out-of-sample mode is not supported with the demand response module. \
                Capacities will be optimised instead."
            );
            None
        }
        Some(results_dir) => {
            let results_dir = model_dir.join(results_dir);
            info!(
                "Fixing capacities to those in {} (out-of-sample mode)",
                results_dir.display()
            );
            Some(read_fixed_capacities(
                &results_dir,
                &network,
                &ids,
                modules.heat,
            )?)
        }
        None => None,
    };

    Ok(Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        horizon,
        network,
        node_parameters,
        transmission_parameters,
        generators,
        technologies,
        generators_of_node,
        generator_parameters,
        storages,
        storages_of_node,
        storage_parameters,
        system_parameters,
        heat,
        demand_response,
        fixed_capacities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::GenericID;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Record {
        id: GenericID,
        value: u32,
    }

    impl HasID<GenericID> for Record {
        fn get_id(&self) -> &GenericID {
            &self.id
        }
    }

    /// Create an example CSV file in dir_path
    fn create_csv_file(dir_path: &Path, contents: &str) -> PathBuf {
        let file_path = dir_path.join("test.csv");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
        file_path
    }

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nhello,1\nworld,2\n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(
            records,
            &[
                Record {
                    id: "hello".into(),
                    value: 1,
                },
                Record {
                    id: "world".into(),
                    value: 2,
                }
            ]
        );

        // Whitespace around values is trimmed
        let file_path = create_csv_file(dir.path(), "id , value\n hello , 1 \n");
        let records: Vec<Record> = read_csv(&file_path).unwrap().collect();
        assert_eq!(records[0].value, 1);

        // File with no data rows
        let file_path = create_csv_file(dir.path(), "id,value\n");
        assert!(read_csv::<Record>(&file_path).is_err());
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );

        // Missing file
        let file_path = dir.path().join("missing.csv");
        assert!(
            read_csv_optional::<Record>(&file_path)
                .unwrap()
                .next()
                .is_none()
        );
    }

    #[test]
    fn test_read_csv_id_file() {
        let dir = tempdir().unwrap();
        let file_path = create_csv_file(dir.path(), "id,value\nb,1\na,2\n");
        let map: IndexMap<GenericID, Record> = read_csv_id_file(&file_path).unwrap();
        assert_eq!(map.keys().map(ToString::to_string).collect_vec(), ["b", "a"]);

        let file_path = create_csv_file(dir.path(), "id,value\na,1\na,2\n");
        let result: Result<IndexMap<GenericID, Record>> = read_csv_id_file(&file_path);
        assert_eq!(
            result.unwrap_err().chain().nth(1).unwrap().to_string(),
            "Duplicate ID found: a"
        );
    }

    #[test]
    fn test_read_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test.toml");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "value = 1").unwrap();
        }

        #[derive(Debug, Deserialize, PartialEq)]
        struct Value {
            value: u32,
        }

        assert_eq!(read_toml::<Value>(&file_path).unwrap(), Value { value: 1 });

        // Invalid TOML
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "bad toml syntax").unwrap();
        }
        assert!(read_toml::<Value>(&file_path).is_err());
    }

    #[derive(Debug, Deserialize)]
    struct Proportion {
        #[serde(deserialize_with = "deserialise_proportion")]
        value: f64,
    }

    #[rstest::rstest]
    #[case(0.0, true)]
    #[case(0.5, true)]
    #[case(1.0, true)]
    #[case(-0.1, false)]
    #[case(1.1, false)]
    fn test_deserialise_proportion(#[case] value: f64, #[case] valid: bool) {
        let result: Result<Proportion, _> = toml::from_str(&format!("value = {value:?}"));
        assert_eq!(result.is_ok(), valid);
    }

    #[rstest::rstest]
    #[case(1.0, true)]
    #[case(0.0, false)]
    #[case(-1.0, false)]
    #[case(f64::INFINITY, false)]
    fn test_check_positive(#[case] value: f64, #[case] valid: bool) {
        assert_eq!(check_positive(value, "lifetime").is_ok(), valid);
    }
}
