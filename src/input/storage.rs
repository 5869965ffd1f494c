//! Code for reading storage types and their parameters.
use super::table::{KnownIDs, ParamTable, fill_param_table};
use super::*;
use crate::model::parameters::ModuleFlags;
use crate::network::NodeID;
use crate::storage::{StorageCarrier, StorageID, StorageMap, StorageParameters};
use std::path::Path;

const STORAGES_FILE_NAME: &str = "storages.csv";

/// Read storage types from the model directory.
///
/// Heat storage needs the heat module and demand response storage needs the demand response
/// module.
pub fn read_storages(model_dir: &Path, modules: &ModuleFlags) -> Result<StorageMap> {
    let file_path = model_dir.join(STORAGES_FILE_NAME);
    let storages: StorageMap = read_csv_id_file(&file_path)?;
    validate_storages(&storages, modules).with_context(|| input_err_msg(&file_path))?;

    Ok(storages)
}

fn validate_storages(storages: &StorageMap, modules: &ModuleFlags) -> Result<()> {
    for storage in storages.values() {
        check_positive(storage.lifetime, "lifetime")
            .and_then(|()| check_efficiency(storage.charge_efficiency, "charge_efficiency"))
            .and_then(|()| check_efficiency(storage.discharge_efficiency, "discharge_efficiency"))
            .and_then(|()| check_efficiency(storage.bleed_efficiency, "bleed_efficiency"))
            .and_then(|()| {
                check_positive(storage.discharge_to_charge_ratio, "discharge_to_charge_ratio")
            })
            .and_then(|()| match storage.power_to_energy {
                Some(ratio) => check_positive(ratio, "power_to_energy"),
                None => Ok(()),
            })
            .with_context(|| format!("Invalid parameters for storage {}", storage.id))?;

        match storage.carrier {
            StorageCarrier::Heat => ensure!(
                modules.heat,
                "Storage {} is heat storage, but the heat module is not enabled",
                storage.id
            ),
            StorageCarrier::DemandResponse => ensure!(
                modules.demand_response,
                "Storage {} is demand response, but the demand response module is not enabled",
                storage.id
            ),
            StorageCarrier::Electricity => {}
        }
    }

    Ok(())
}

fn check_efficiency(value: f64, name: &str) -> Result<()> {
    ensure!(
        value > 0.0 && value <= 1.0,
        "{name} must be in the range (0, 1] (got {value})"
    );

    Ok(())
}

/// Read cost and capacity parameters for storages.
///
/// Both the power and energy ratings have a file for each parameter, prefixed with
/// `storage_power_` and `storage_energy_` respectively.
pub fn read_storage_parameters(model_dir: &Path, ids: &KnownIDs) -> Result<StorageParameters> {
    let mut params = StorageParameters::default();

    let cost_tables: [(&mut ParamTable<(StorageID, u32)>, &str); 4] = [
        (&mut params.power_capital_cost, "storage_power_capital_costs.csv"),
        (&mut params.power_fixed_om_cost, "storage_power_fixed_om_costs.csv"),
        (&mut params.energy_capital_cost, "storage_energy_capital_costs.csv"),
        (
            &mut params.energy_fixed_om_cost,
            "storage_energy_fixed_om_costs.csv",
        ),
    ];
    for (table, file_name) in cost_tables {
        fill_param_table(table, &model_dir.join(file_name), ids)?;
    }

    let capacity_tables: [(&mut ParamTable<(NodeID, StorageID, u32)>, &str); 4] = [
        (
            &mut params.power_initial_capacity,
            "storage_power_initial_capacities.csv",
        ),
        (
            &mut params.energy_initial_capacity,
            "storage_energy_initial_capacities.csv",
        ),
        (
            &mut params.power_max_built_capacity,
            "storage_power_max_built_capacities.csv",
        ),
        (
            &mut params.energy_max_built_capacity,
            "storage_energy_max_built_capacities.csv",
        ),
    ];
    for (table, file_name) in capacity_tables {
        fill_param_table(table, &model_dir.join(file_name), ids)?;
    }

    fill_param_table(
        &mut params.power_max_installed_capacity,
        &model_dir.join("storage_power_max_installed_capacities.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.energy_max_installed_capacity,
        &model_dir.join("storage_energy_max_installed_capacities.csv"),
        ids,
    )?;

    Ok(params)
}
