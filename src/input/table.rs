//! Parameter tables keyed by tuples of entity IDs, periods and hours.
//!
//! Each table is read from an optional CSV file whose key columns come first, followed by a final
//! value column. Keys which are absent from the file take the table's declared default.
use super::*;
use crate::generator::{GeneratorID, GeneratorMap, TechnologyID};
use crate::heat::{ConverterID, ConverterMap, NeighbourhoodID, NeighbourhoodMap};
use crate::horizon::{ScenarioID, Season, SeasonID};
use crate::id::IDCollection;
use crate::network::{LineTypeID, NodeID, NodeMap};
use crate::storage::{StorageID, StorageMap};
use indexmap::IndexSet;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// The IDs of all known entities, used to validate the keys of parameter tables
pub struct KnownIDs<'a> {
    /// Nodes
    pub nodes: &'a NodeMap,
    /// Generator types
    pub generators: &'a GeneratorMap,
    /// Technologies which generators belong to
    pub technologies: &'a IndexSet<TechnologyID>,
    /// Storage types
    pub storages: &'a StorageMap,
    /// Transmission line types
    pub line_types: &'a IndexSet<LineTypeID>,
    /// Seasons
    pub seasons: &'a IndexMap<SeasonID, Season>,
    /// Scenarios
    pub scenarios: &'a IndexSet<ScenarioID>,
    /// Converters (heat module only)
    pub converters: Option<&'a ConverterMap>,
    /// Neighbourhoods (heat module only)
    pub neighbourhoods: Option<&'a NeighbourhoodMap>,
}

/// A single column of a parameter table's key
pub trait KeyPart: Eq + Hash + Clone + Debug + DeserializeOwned {
    /// Check that the value refers to a known entity
    fn check(&self, ids: &KnownIDs) -> Result<()>;
}

macro_rules! impl_id_key_part {
    ($id_ty:ty, $field:ident) => {
        impl KeyPart for $id_ty {
            fn check(&self, ids: &KnownIDs) -> Result<()> {
                ids.$field.get_id(self)?;
                Ok(())
            }
        }
    };
}

impl_id_key_part!(NodeID, nodes);
impl_id_key_part!(GeneratorID, generators);
impl_id_key_part!(TechnologyID, technologies);
impl_id_key_part!(StorageID, storages);
impl_id_key_part!(LineTypeID, line_types);
impl_id_key_part!(SeasonID, seasons);
impl_id_key_part!(ScenarioID, scenarios);

impl KeyPart for ConverterID {
    fn check(&self, ids: &KnownIDs) -> Result<()> {
        let converters = ids
            .converters
            .context("Converters can only be used with the heat module")?;
        converters.get_id(self)?;
        Ok(())
    }
}

impl KeyPart for NeighbourhoodID {
    fn check(&self, ids: &KnownIDs) -> Result<()> {
        let neighbourhoods = ids
            .neighbourhoods
            .context("Neighbourhoods can only be used with the heat module")?;
        neighbourhoods.get_id(self)?;
        Ok(())
    }
}

/// Periods and hours are not checked against the horizon; entries outside it are never looked up
impl KeyPart for u32 {
    fn check(&self, _ids: &KnownIDs) -> Result<()> {
        Ok(())
    }
}

/// The key of a [`ParamTable`]
pub trait ParamKey: Eq + Hash + Clone + Debug {
    /// A row of the input file: the key columns followed by the value
    type Row: DeserializeOwned;

    /// Split a row into its key and value
    fn split_row(row: Self::Row) -> (Self, f64);

    /// Check that every part of the key refers to a known entity
    fn check(&self, ids: &KnownIDs) -> Result<()>;
}

macro_rules! impl_single_param_key {
    ($($ty:ty),+) => {
        $(
            impl ParamKey for $ty {
                type Row = ($ty, f64);

                fn split_row(row: Self::Row) -> (Self, f64) {
                    row
                }

                fn check(&self, ids: &KnownIDs) -> Result<()> {
                    KeyPart::check(self, ids)
                }
            }
        )+
    };
}

impl_single_param_key!(
    NodeID,
    GeneratorID,
    TechnologyID,
    StorageID,
    LineTypeID,
    SeasonID,
    ScenarioID,
    ConverterID,
    NeighbourhoodID,
    u32
);

macro_rules! impl_tuple_param_key {
    ($($part:ident $var:ident),+) => {
        impl<$($part: KeyPart),+> ParamKey for ($($part,)+) {
            type Row = ($($part,)+ f64);

            fn split_row(row: Self::Row) -> (Self, f64) {
                let ($($var,)+ value) = row;
                (($($var,)+), value)
            }

            fn check(&self, ids: &KnownIDs) -> Result<()> {
                let ($($var,)+) = self;
                $(KeyPart::check($var, ids)?;)+
                Ok(())
            }
        }
    };
}

impl_tuple_param_key!(A a, B b);
impl_tuple_param_key!(A a, B b, C c);
impl_tuple_param_key!(A a, B b, C c, D d);
impl_tuple_param_key!(A a, B b, C c, D d, E e);

/// A parameter with a value for every key, falling back to a default where none was given
#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable<K: ParamKey> {
    values: HashMap<K, f64>,
    default: f64,
}

impl<K: ParamKey> ParamTable<K> {
    /// Create an empty table with the given default
    pub fn new(default: f64) -> Self {
        Self {
            values: HashMap::new(),
            default,
        }
    }

    /// The value returned for keys without an entry
    pub fn default_value(&self) -> f64 {
        self.default
    }

    /// Look up the value for a key
    pub fn get(&self, key: &K) -> f64 {
        self.get_or(key, self.default)
    }

    /// Look up the value for a key, with an alternative default
    pub fn get_or(&self, key: &K, default: f64) -> f64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    /// Whether the table contains an explicit entry for the key
    pub fn contains(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    /// Set the value for a key, returning the previous entry if there was one
    pub fn insert(&mut self, key: K, value: f64) -> Option<f64> {
        self.values.insert(key, value)
    }

    /// Iterate over the explicit entries of the table
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.values.iter().map(|(key, value)| (key, *value))
    }

    /// Number of explicit entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no explicit entries
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: ParamKey> FromIterator<(K, f64)> for ParamTable<K> {
    /// Collect entries into a table with a default of zero
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
            default: 0.0,
        }
    }
}

/// Fill a parameter table from an optional CSV file.
///
/// # Arguments
///
/// * `table` - The table to fill, whose default is kept
/// * `file_path` - Path to the CSV file. A missing file leaves the table empty.
/// * `ids` - Known entity IDs, used to validate keys
pub fn fill_param_table<K: ParamKey>(
    table: &mut ParamTable<K>,
    file_path: &Path,
    ids: &KnownIDs,
) -> Result<()> {
    let rows = read_csv_optional::<K::Row>(file_path)?;
    fill_param_table_from_iter(table, rows, ids).with_context(|| input_err_msg(file_path))
}

fn fill_param_table_from_iter<K, I>(table: &mut ParamTable<K>, iter: I, ids: &KnownIDs) -> Result<()>
where
    K: ParamKey,
    I: Iterator<Item = K::Row>,
{
    for row in iter {
        let (key, value) = K::split_row(row);
        key.check(ids)?;
        ensure!(value.is_finite(), "Invalid value for {key:?}: {value}");
        ensure!(
            table.insert(key.clone(), value).is_none(),
            "Duplicate entry for {key:?}"
        );
    }

    Ok(())
}

/// Read a relation between two kinds of entity, such as the generators present at each node.
///
/// The file must exist, but may contain no rows.
pub fn read_relation<A: KeyPart, B: KeyPart>(
    file_path: &Path,
    ids: &KnownIDs,
) -> Result<IndexSet<(A, B)>> {
    ensure!(
        file_path.is_file(),
        "Required file {} not found",
        file_path.display()
    );
    let rows = read_csv_optional::<(A, B)>(file_path)?;
    read_relation_from_iter(rows, ids).with_context(|| input_err_msg(file_path))
}

fn read_relation_from_iter<A, B, I>(iter: I, ids: &KnownIDs) -> Result<IndexSet<(A, B)>>
where
    A: KeyPart,
    B: KeyPart,
    I: Iterator<Item = (A, B)>,
{
    let mut relation = IndexSet::new();
    for (a, b) in iter {
        KeyPart::check(&a, ids)?;
        KeyPart::check(&b, ids)?;
        ensure!(
            relation.insert((a.clone(), b.clone())),
            "Duplicate entry for ({a:?}, {b:?})"
        );
    }

    Ok(relation)
}
