//! Code for reading the capacities of a previous run, which are fixed in out-of-sample mode.
use super::table::{KeyPart, KnownIDs};
use super::*;
use crate::capacity::{
    CapacityAsset, CapacityValues, ConverterCapacityRow, FixedCapacities, GeneratorCapacityRow,
    NeighbourhoodCapacityRow, StorageCapacityRow, TransmissionCapacityRow,
};
use crate::horizon::Period;
use crate::network::Network;
use crate::output::{
    CONVERTER_CAPACITIES_FILE_NAME, GENERATOR_CAPACITIES_FILE_NAME,
    NEIGHBOURHOOD_CAPACITIES_FILE_NAME, STORAGE_CAPACITIES_FILE_NAME,
    TRANSMISSION_CAPACITIES_FILE_NAME,
};
use std::path::Path;

/// Read a capacity file written by a previous run. Unlike parameter files, it must exist.
fn read_capacity_file<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    ensure!(
        file_path.is_file(),
        "Capacity file {} not found. Out-of-sample runs need the output folder of a previous run.",
        file_path.display()
    );
    read_csv_optional(file_path)
}

/// Add an entry to the fixed capacities, checking the values
fn insert_capacity(
    capacities: &mut FixedCapacities,
    asset: CapacityAsset,
    period: Period,
    invested: f64,
    installed: f64,
) -> Result<()> {
    check_non_negative(invested, "invested")
        .and_then(|()| check_non_negative(installed, "installed"))
        .with_context(|| format!("Invalid capacity for {asset:?} in period {period}"))?;
    ensure!(
        capacities
            .insert(asset.clone(), period, CapacityValues { invested, installed })
            .is_none(),
        "Duplicate capacity for {asset:?} in period {period}"
    );

    Ok(())
}

/// Read the capacities chosen by a previous run.
///
/// # Arguments
///
/// * `results_dir` - The output folder of the previous run
/// * `network` - The transmission network. Lines must be given in the orientation of their arc.
/// * `ids` - Known entity IDs
/// * `heat_enabled` - Whether to read converter and neighbourhood capacities too
pub fn read_fixed_capacities(
    results_dir: &Path,
    network: &Network,
    ids: &KnownIDs,
    heat_enabled: bool,
) -> Result<FixedCapacities> {
    let mut capacities = FixedCapacities::default();

    let file_path = results_dir.join(GENERATOR_CAPACITIES_FILE_NAME);
    for row in read_capacity_file::<GeneratorCapacityRow>(&file_path)? {
        KeyPart::check(&row.node, ids)
            .and_then(|()| KeyPart::check(&row.generator, ids))
            .and_then(|()| {
                insert_capacity(
                    &mut capacities,
                    CapacityAsset::Generator(row.node, row.generator),
                    row.period,
                    row.invested,
                    row.installed,
                )
            })
            .with_context(|| input_err_msg(&file_path))?;
    }

    let file_path = results_dir.join(TRANSMISSION_CAPACITIES_FILE_NAME);
    for row in read_capacity_file::<TransmissionCapacityRow>(&file_path)? {
        let arc = (row.from_node, row.to_node);
        ensure!(
            network.arcs.contains(&arc),
            "{} - {} is not a transmission line in this model ({})",
            arc.0,
            arc.1,
            file_path.display()
        );
        insert_capacity(
            &mut capacities,
            CapacityAsset::Transmission(arc.0, arc.1),
            row.period,
            row.invested,
            row.installed,
        )
        .with_context(|| input_err_msg(&file_path))?;
    }

    let file_path = results_dir.join(STORAGE_CAPACITIES_FILE_NAME);
    for row in read_capacity_file::<StorageCapacityRow>(&file_path)? {
        KeyPart::check(&row.node, ids)
            .and_then(|()| KeyPart::check(&row.storage, ids))
            .and_then(|()| {
                insert_capacity(
                    &mut capacities,
                    CapacityAsset::StoragePower(row.node.clone(), row.storage.clone()),
                    row.period,
                    row.power_invested,
                    row.power_installed,
                )
            })
            .and_then(|()| {
                insert_capacity(
                    &mut capacities,
                    CapacityAsset::StorageEnergy(row.node, row.storage),
                    row.period,
                    row.energy_invested,
                    row.energy_installed,
                )
            })
            .with_context(|| input_err_msg(&file_path))?;
    }

    if heat_enabled {
        let file_path = results_dir.join(CONVERTER_CAPACITIES_FILE_NAME);
        for row in read_capacity_file::<ConverterCapacityRow>(&file_path)? {
            KeyPart::check(&row.node, ids)
                .and_then(|()| KeyPart::check(&row.converter, ids))
                .and_then(|()| {
                    insert_capacity(
                        &mut capacities,
                        CapacityAsset::Converter(row.node, row.converter),
                        row.period,
                        row.invested,
                        row.installed,
                    )
                })
                .with_context(|| input_err_msg(&file_path))?;
        }

        let file_path = results_dir.join(NEIGHBOURHOOD_CAPACITIES_FILE_NAME);
        for row in read_capacity_file::<NeighbourhoodCapacityRow>(&file_path)? {
            KeyPart::check(&row.node, ids)
                .and_then(|()| KeyPart::check(&row.neighbourhood, ids))
                .and_then(|()| {
                    insert_capacity(
                        &mut capacities,
                        CapacityAsset::Neighbourhood(row.node, row.neighbourhood),
                        row.period,
                        row.invested,
                        row.installed,
                    )
                })
                .with_context(|| input_err_msg(&file_path))?;
        }
    }

    Ok(capacities)
}
