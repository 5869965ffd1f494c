//! Storage types and their parameters.
//!
//! Demand response is modelled as a kind of storage: "charging" and "discharging" shift flexible
//! demand between hours, and the energy level tracks the demand which is still to be served.
use crate::horizon::Period;
use crate::id::{define_id_getter, define_id_type};
use crate::input::deserialise_proportion;
use crate::input::table::ParamTable;
use crate::network::NodeID;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {StorageID}

/// A map of [`Storage`]s, keyed by storage ID
pub type StorageMap = IndexMap<StorageID, Storage>;

/// Default build limit per period, for both power and energy capacity
pub const DEFAULT_STORAGE_MAX_BUILT_CAPACITY: f64 = 500_000.0;

/// Default limit on installed capacity of heat storage, for both power and energy capacity
pub const DEFAULT_HEAT_STORAGE_MAX_INSTALLED_CAPACITY: f64 = 2_000_000.0;

/// The energy balance a storage takes part in
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, DeserializeLabeledStringEnum)]
pub enum StorageCarrier {
    /// Electricity storage
    #[default]
    #[string = "electricity"]
    Electricity,
    /// Heat storage (heat module only)
    #[string = "heat"]
    Heat,
    /// Flexible electricity demand (demand response module only)
    #[string = "demand_response"]
    DemandResponse,
}

fn default_efficiency() -> f64 {
    1.0
}

/// A type of storage which can be built at nodes
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Storage {
    /// Unique identifier (e.g. "Li-Ion_BESS")
    pub id: StorageID,
    /// The energy balance the storage takes part in
    #[serde(default)]
    pub carrier: StorageCarrier,
    /// Technical lifetime in years
    pub lifetime: f64,
    /// Fraction of charged energy which is stored
    #[serde(default = "default_efficiency")]
    pub charge_efficiency: f64,
    /// Fraction of discharged energy which is delivered
    #[serde(default = "default_efficiency")]
    pub discharge_efficiency: f64,
    /// Fraction of the stored energy retained from one hour to the next
    #[serde(default = "default_efficiency")]
    pub bleed_efficiency: f64,
    /// Maximum discharge relative to the installed power capacity
    #[serde(default = "default_efficiency")]
    pub discharge_to_charge_ratio: f64,
    /// Energy level at the start and end of each season, as a fraction of energy capacity
    #[serde(default, deserialize_with = "deserialise_proportion")]
    pub initial_level: f64,
    /// If present, power capacity is fixed at this multiple of energy capacity
    #[serde(default)]
    pub power_to_energy: Option<f64>,
}
define_id_getter! {Storage, StorageID}

impl Storage {
    /// Whether the storage takes part in the electricity balance
    pub fn is_electric(&self) -> bool {
        self.carrier != StorageCarrier::Heat
    }

    /// Whether the storage represents demand response
    pub fn is_demand_response(&self) -> bool {
        self.carrier == StorageCarrier::DemandResponse
    }

    /// The installed capacity limit used where none is given
    pub fn default_max_installed_capacity(&self) -> f64 {
        match self.carrier {
            StorageCarrier::Heat => DEFAULT_HEAT_STORAGE_MAX_INSTALLED_CAPACITY,
            StorageCarrier::Electricity | StorageCarrier::DemandResponse => 0.0,
        }
    }
}

/// Cost and capacity parameters for storage
#[derive(Clone, Debug, PartialEq)]
pub struct StorageParameters {
    /// Capital cost of power capacity (storage, period)
    pub power_capital_cost: ParamTable<(StorageID, Period)>,
    /// Annual fixed O&M cost of power capacity (storage, period)
    pub power_fixed_om_cost: ParamTable<(StorageID, Period)>,
    /// Capital cost of energy capacity (storage, period)
    pub energy_capital_cost: ParamTable<(StorageID, Period)>,
    /// Annual fixed O&M cost of energy capacity (storage, period)
    pub energy_fixed_om_cost: ParamTable<(StorageID, Period)>,
    /// Power capacity present before any investment (node, storage, period)
    pub power_initial_capacity: ParamTable<(NodeID, StorageID, Period)>,
    /// Energy capacity present before any investment (node, storage, period)
    pub energy_initial_capacity: ParamTable<(NodeID, StorageID, Period)>,
    /// Power capacity which can be built in one period (node, storage, period)
    pub power_max_built_capacity: ParamTable<(NodeID, StorageID, Period)>,
    /// Energy capacity which can be built in one period (node, storage, period)
    pub energy_max_built_capacity: ParamTable<(NodeID, StorageID, Period)>,
    /// Raw limit on installed power capacity (node, storage)
    pub power_max_installed_capacity: ParamTable<(NodeID, StorageID)>,
    /// Raw limit on installed energy capacity (node, storage)
    pub energy_max_installed_capacity: ParamTable<(NodeID, StorageID)>,
}

impl Default for StorageParameters {
    fn default() -> Self {
        Self {
            power_capital_cost: ParamTable::new(0.0),
            power_fixed_om_cost: ParamTable::new(0.0),
            energy_capital_cost: ParamTable::new(0.0),
            energy_fixed_om_cost: ParamTable::new(0.0),
            power_initial_capacity: ParamTable::new(0.0),
            energy_initial_capacity: ParamTable::new(0.0),
            power_max_built_capacity: ParamTable::new(DEFAULT_STORAGE_MAX_BUILT_CAPACITY),
            energy_max_built_capacity: ParamTable::new(DEFAULT_STORAGE_MAX_BUILT_CAPACITY),
            power_max_installed_capacity: ParamTable::new(0.0),
            energy_max_installed_capacity: ParamTable::new(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::storage;
    use rstest::rstest;

    #[rstest]
    #[case(StorageCarrier::Electricity, true, false, 0.0)]
    #[case(StorageCarrier::Heat, false, false, DEFAULT_HEAT_STORAGE_MAX_INSTALLED_CAPACITY)]
    #[case(StorageCarrier::DemandResponse, true, true, 0.0)]
    fn test_storage_carrier(
        mut storage: Storage,
        #[case] carrier: StorageCarrier,
        #[case] electric: bool,
        #[case] demand_response: bool,
        #[case] max_installed: f64,
    ) {
        storage.carrier = carrier;
        assert_eq!(storage.is_electric(), electric);
        assert_eq!(storage.is_demand_response(), demand_response);
        assert_eq!(storage.default_max_installed_capacity(), max_installed);
    }

    #[test]
    fn test_storage_deserialise() {
        let csv = "id,lifetime,initial_level,power_to_energy\nbattery,15,0.5,0.25\npumped,60,0,\n";
        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let storages: Vec<Storage> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(storages[0].power_to_energy, Some(0.25));
        assert_eq!(storages[0].initial_level, 0.5);
        assert_eq!(storages[0].charge_efficiency, 1.0);
        assert_eq!(storages[1].power_to_energy, None);
    }
}
