//! Code for reading the heat module from the `heat` subdirectory of a model.
use super::table::{KnownIDs, ParamTable, fill_param_table, read_relation};
use super::*;
use crate::heat::{ConverterMap, HeatModule, HeatParameters, NeighbourhoodID, NeighbourhoodMap};
use crate::horizon::ScenarioID;
use crate::id::{HasID, IDLike};
use crate::network::NodeID;
use indexmap::IndexSet;
use std::path::Path;

/// Subdirectory of the model directory containing heat module files
pub const HEAT_DIR_NAME: &str = "heat";

/// Read an optional file of entities with IDs. A missing file means there are none.
fn read_optional_id_file<T, ID: IDLike>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    if file_path.exists() {
        read_csv_id_file(file_path)
    } else {
        Ok(IndexMap::new())
    }
}

/// Read converter and neighbourhood types.
///
/// Both files are optional, as a heat model may rely on generators and storage alone.
pub fn read_heat_entities(heat_dir: &Path) -> Result<(ConverterMap, NeighbourhoodMap)> {
    let file_path = heat_dir.join("converters.csv");
    let converters: ConverterMap = read_optional_id_file(&file_path)?;
    for converter in converters.values() {
        check_positive(converter.lifetime, "lifetime")
            .and_then(|()| check_positive(converter.efficiency, "efficiency"))
            .with_context(|| format!("Invalid parameters for converter {}", converter.id))
            .with_context(|| input_err_msg(&file_path))?;
    }

    let file_path = heat_dir.join("neighbourhoods.csv");
    let neighbourhoods: NeighbourhoodMap = read_optional_id_file(&file_path)?;
    for neighbourhood in neighbourhoods.values() {
        check_positive(neighbourhood.lifetime, "lifetime")
            .and_then(|()| check_non_negative(neighbourhood.co2_quota, "co2_quota"))
            .with_context(|| format!("Invalid parameters for neighbourhood {}", neighbourhood.id))
            .with_context(|| input_err_msg(&file_path))?;
    }

    Ok((converters, neighbourhoods))
}

/// Read the heat module.
///
/// # Arguments
///
/// * `heat_dir` - The heat subdirectory of the model directory
/// * `converters` - Converter types, as read by [`read_heat_entities`]
/// * `neighbourhoods` - Neighbourhood types, as read by [`read_heat_entities`]
/// * `ids` - Known entity IDs
/// * `load_change` - Whether the load change module is enabled
pub fn read_heat_module(
    heat_dir: &Path,
    converters: ConverterMap,
    neighbourhoods: NeighbourhoodMap,
    ids: &KnownIDs,
    load_change: bool,
) -> Result<HeatModule> {
    let converters_of_node = if converters.is_empty() {
        IndexSet::new()
    } else {
        read_relation(&heat_dir.join("node_converters.csv"), ids)?
    };
    let neighbourhoods_of_node = if neighbourhoods.is_empty() {
        IndexSet::new()
    } else {
        read_relation(&heat_dir.join("node_neighbourhoods.csv"), ids)?
    };

    let parameters = read_heat_parameters(heat_dir, ids, load_change)?;

    Ok(HeatModule {
        converters,
        converters_of_node,
        neighbourhoods,
        neighbourhoods_of_node,
        parameters,
    })
}

fn read_heat_parameters(heat_dir: &Path, ids: &KnownIDs, load_change: bool) -> Result<HeatParameters> {
    let mut params = HeatParameters::default();
    fill_param_table(
        &mut params.value_of_lost_heat,
        &heat_dir.join("heat_value_of_lost_load.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.annual_demand,
        &heat_dir.join("heat_annual_demand.csv"),
        ids,
    )?;
    fill_param_table(&mut params.load_profile, &heat_dir.join("heat_load.csv"), ids)?;
    if load_change {
        fill_param_table(
            &mut params.load_change,
            &heat_dir.join("heat_load_change.csv"),
            ids,
        )?;
    }

    fill_param_table(
        &mut params.converter_capital_cost,
        &heat_dir.join("converter_capital_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.converter_fixed_om_cost,
        &heat_dir.join("converter_fixed_om_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.converter_initial_capacity,
        &heat_dir.join("converter_initial_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.converter_max_built_capacity,
        &heat_dir.join("converter_max_built_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.converter_max_installed_capacity,
        &heat_dir.join("converter_max_installed_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.converter_availability,
        &heat_dir.join("converter_availability.csv"),
        ids,
    )?;

    fill_param_table(
        &mut params.neighbourhood_capital_cost,
        &heat_dir.join("neighbourhood_capital_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.neighbourhood_fixed_om_cost,
        &heat_dir.join("neighbourhood_fixed_om_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.neighbourhood_initial_capacity,
        &heat_dir.join("neighbourhood_initial_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.neighbourhood_max_built_capacity,
        &heat_dir.join("neighbourhood_max_built_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.neighbourhood_max_installed_capacity,
        &heat_dir.join("neighbourhood_max_installed_capacities.csv"),
        ids,
    )?;

    let hourly_tables: [(&mut ParamTable<(NodeID, NeighbourhoodID, u32, ScenarioID)>, &str); 4] = [
        (
            &mut params.neighbourhood_conversion_efficiency,
            "neighbourhood_conversion_efficiency.csv",
        ),
        (
            &mut params.neighbourhood_electricity_availability,
            "neighbourhood_electricity_availability.csv",
        ),
        (
            &mut params.neighbourhood_heat_availability,
            "neighbourhood_heat_availability.csv",
        ),
        (
            &mut params.neighbourhood_conversion_availability,
            "neighbourhood_conversion_availability.csv",
        ),
    ];
    for (table, file_name) in hourly_tables {
        fill_param_table(table, &heat_dir.join(file_name), ids)?;
    }

    Ok(params)
}
