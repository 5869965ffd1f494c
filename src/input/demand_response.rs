//! Code for reading the demand response module from the `demand_response` subdirectory.
use super::table::{KnownIDs, fill_param_table};
use super::*;
use crate::demand_response::{
    CostPiece, DemandResponseModule, DemandResponseParameters, is_convex,
};
use crate::storage::{StorageID, StorageMap};
use log::warn;
use std::path::Path;

/// Subdirectory of the model directory containing demand response files
pub const DEMAND_RESPONSE_DIR_NAME: &str = "demand_response";

const COST_PIECES_FILE_NAME: &str = "cost_pieces.csv";

/// Read the demand response module.
///
/// # Arguments
///
/// * `dr_dir` - The demand response subdirectory of the model directory
/// * `storages` - All storage types. Each demand response storage must have cost pieces.
/// * `ids` - Known entity IDs
pub fn read_demand_response_module(
    dr_dir: &Path,
    storages: &StorageMap,
    ids: &KnownIDs,
) -> Result<DemandResponseModule> {
    let file_path = dr_dir.join(COST_PIECES_FILE_NAME);
    let cost_pieces = read_csv_optional(&file_path)?;
    let cost_pieces =
        group_cost_pieces(cost_pieces, storages).with_context(|| input_err_msg(&file_path))?;

    let mut parameters = DemandResponseParameters::default();
    fill_param_table(&mut parameters.demand, &dr_dir.join("demand.csv"), ids)?;
    fill_param_table(&mut parameters.max_level, &dr_dir.join("max_level.csv"), ids)?;
    fill_param_table(
        &mut parameters.discharge_availability,
        &dr_dir.join("discharge_availability.csv"),
        ids,
    )?;
    fill_param_table(
        &mut parameters.charge_availability,
        &dr_dir.join("charge_availability.csv"),
        ids,
    )?;
    fill_param_table(&mut parameters.baseline, &dr_dir.join("baseline.csv"), ids)?;

    Ok(DemandResponseModule {
        cost_pieces,
        parameters,
    })
}

/// Group cost pieces by storage and sort them by piece number
fn group_cost_pieces<I>(iter: I, storages: &StorageMap) -> Result<IndexMap<StorageID, Vec<CostPiece>>>
where
    I: Iterator<Item = CostPiece>,
{
    let mut map: IndexMap<StorageID, Vec<CostPiece>> = IndexMap::new();
    for piece in iter {
        let storage = storages
            .get(&piece.storage_id)
            .with_context(|| format!("Unknown ID {} found", piece.storage_id))?;
        ensure!(
            storage.is_demand_response(),
            "Storage {} has cost pieces but is not a demand response storage",
            storage.id
        );
        ensure!(
            piece.cost.is_finite() && piece.cost >= 0.0,
            "Cost of piece {} of storage {} must be a finite number of at least zero",
            piece.piece,
            storage.id
        );
        ensure!(
            (0.0..=1.0).contains(&piece.activation),
            "Activation of piece {} of storage {} must be between 0 and 1",
            piece.piece,
            storage.id
        );
        map.entry(piece.storage_id.clone()).or_default().push(piece);
    }

    for storage in storages.values().filter(|s| s.is_demand_response()) {
        let pieces = map
            .get_mut(&storage.id)
            .with_context(|| format!("No cost pieces given for demand response storage {}", storage.id))?;
        pieces.sort_by_key(|piece| piece.piece);
        ensure!(
            pieces.windows(2).all(|pair| pair[0].piece != pair[1].piece),
            "Duplicate cost piece for storage {}",
            storage.id
        );
        if !is_convex(pieces) {
            warn!(
                "Cost pieces of demand response storage {} are not convex. The activation cost \
                will be underestimated.",
                storage.id
            );
        }
    }

    Ok(map)
}
