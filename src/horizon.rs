//! The planning horizon: investment periods, operational hours grouped into seasons, and the
//! stochastic scenarios that are solved for each period.
//!
//! Operational hours are numbered from 1. Regular seasons come first, each covering
//! `regular_length` consecutive hours, followed by peak seasons of `peak_length` hours each. The
//! seasons therefore tile the operational hours exactly, without gaps or overlaps.
use crate::id::define_id_type;
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use std::ops::RangeInclusive;

define_id_type! {SeasonID}
define_id_type! {ScenarioID}

/// An investment period, numbered from 1
pub type Period = u32;

/// An operational hour, numbered from 1
pub type Hour = u32;

/// Whether a season represents ordinary operation or extreme (peak) conditions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeasonKind {
    /// A season representative of part of the year
    Regular,
    /// A short block of extreme conditions, not representative of the rest of the year
    Peak,
}

/// A contiguous block of operational hours
#[derive(Clone, Debug, PartialEq)]
pub struct Season {
    /// Season name
    pub id: SeasonID,
    /// Regular or peak
    pub kind: SeasonKind,
    /// The first operational hour in the block
    pub first_hour: Hour,
    /// Number of hours in the block
    pub length: u32,
}

impl Season {
    /// The last operational hour in the block
    pub fn last_hour(&self) -> Hour {
        self.first_hour + self.length - 1
    }

    /// All operational hours in the block
    pub fn hours(&self) -> RangeInclusive<Hour> {
        self.first_hour..=self.last_hour()
    }

    /// Whether the block contains the given hour
    pub fn contains(&self, hour: Hour) -> bool {
        self.hours().contains(&hour)
    }
}

/// Periods, seasons and scenarios of a model run
#[derive(Clone, Debug, PartialEq)]
pub struct Horizon {
    /// Number of investment periods
    pub num_periods: u32,
    /// Number of years represented by each investment period
    pub leap_years: u32,
    /// Seasons in order of their first hour
    pub seasons: IndexMap<SeasonID, Season>,
    /// Scenarios, all equally likely
    pub scenarios: IndexSet<ScenarioID>,
}

impl Horizon {
    /// Create a new [`Horizon`].
    ///
    /// # Arguments
    ///
    /// * `num_periods` - Number of investment periods
    /// * `leap_years` - Years per investment period
    /// * `regular_seasons` - Names of the regular seasons, in order
    /// * `regular_length` - Hours per regular season
    /// * `num_peak` - Number of peak seasons, which are named `peak1`, `peak2`, ...
    /// * `peak_length` - Hours per peak season
    /// * `num_scenarios` - Number of scenarios, which are named `scenario1`, `scenario2`, ...
    pub fn new(
        num_periods: u32,
        leap_years: u32,
        regular_seasons: &[SeasonID],
        regular_length: u32,
        num_peak: u32,
        peak_length: u32,
        num_scenarios: u32,
    ) -> Result<Self> {
        ensure!(num_periods > 0, "There must be at least one investment period");
        ensure!(leap_years > 0, "Investment periods must be at least one year long");
        ensure!(
            !regular_seasons.is_empty(),
            "At least one regular season is required"
        );
        ensure!(regular_length > 0, "Regular seasons cannot be empty");
        ensure!(
            num_peak == 0 || peak_length > 0,
            "Peak seasons cannot be empty"
        );
        ensure!(num_scenarios > 0, "At least one scenario is required");

        let mut seasons = IndexMap::new();
        let mut first_hour = 1;
        let regular = regular_seasons
            .iter()
            .map(|id| (id.clone(), SeasonKind::Regular, regular_length));
        let peak = (1..=num_peak).map(|i| (format!("peak{i}").into(), SeasonKind::Peak, peak_length));
        for (id, kind, length) in regular.chain(peak) {
            let season = Season {
                id: id.clone(),
                kind,
                first_hour,
                length,
            };
            first_hour += length;
            ensure!(
                seasons.insert(id.clone(), season).is_none(),
                "Duplicate season: {id}"
            );
        }

        let scenarios = (1..=num_scenarios)
            .map(|i| format!("scenario{i}").into())
            .collect();

        Ok(Self {
            num_periods,
            leap_years,
            seasons,
            scenarios,
        })
    }

    /// All investment periods
    pub fn periods(&self) -> RangeInclusive<Period> {
        1..=self.num_periods
    }

    /// Total number of operational hours
    pub fn num_hours(&self) -> u32 {
        self.seasons.values().map(|season| season.length).sum()
    }

    /// All operational hours
    pub fn hours(&self) -> RangeInclusive<Hour> {
        1..=self.num_hours()
    }

    /// Iterate over every (season, hour) pair, in hour order
    pub fn iter_hours_of_season(&self) -> impl Iterator<Item = (&SeasonID, Hour)> + Clone {
        self.seasons
            .values()
            .flat_map(|season| season.hours().map(move |hour| (&season.id, hour)))
    }

    /// The season containing the given hour.
    ///
    /// Seasons tile the hours in order, so this is a binary search on their first hours.
    pub fn season_of_hour(&self, hour: Hour) -> Option<&Season> {
        let after = self
            .seasons
            .as_slice()
            .partition_point(|_, season| season.first_hour <= hour);
        let (_, season) = self.seasons.get_index(after.checked_sub(1)?)?;
        season.contains(hour).then_some(season)
    }

    /// Whether the hour is the first of a season block
    pub fn is_first_hour(&self, hour: Hour) -> bool {
        self.season_of_hour(hour)
            .is_some_and(|season| season.first_hour == hour)
    }

    /// Iterate over the regular seasons
    pub fn iter_regular_seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons
            .values()
            .filter(|season| season.kind == SeasonKind::Regular)
    }

    /// Iterate over the peak seasons
    pub fn iter_peak_seasons(&self) -> impl Iterator<Item = &Season> {
        self.seasons
            .values()
            .filter(|season| season.kind == SeasonKind::Peak)
    }

    /// The probability of each scenario
    pub fn scenario_probability(&self) -> f64 {
        1.0 / self.scenarios.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use itertools::Itertools;
    use rstest::{fixture, rstest};

    #[fixture]
    fn horizon() -> Horizon {
        Horizon::new(2, 10, &["winter".into(), "summer".into()], 4, 1, 2, 3).unwrap()
    }

    #[rstest]
    fn test_seasons_tile_hours(horizon: Horizon) {
        assert_eq!(horizon.num_hours(), 10);

        // Each hour belongs to exactly one season
        let hours = horizon
            .iter_hours_of_season()
            .map(|(_, hour)| hour)
            .collect_vec();
        assert_eq!(hours, (1..=10).collect_vec());
        for hour in horizon.hours() {
            let count = horizon
                .seasons
                .values()
                .filter(|season| season.contains(hour))
                .count();
            assert_eq!(count, 1);
        }
    }

    #[rstest]
    fn test_first_hours(horizon: Horizon) {
        let firsts = horizon
            .hours()
            .filter(|hour| horizon.is_first_hour(*hour))
            .collect_vec();
        assert_eq!(firsts, [1, 5, 9]);
        assert_eq!(horizon.seasons["peak1"].kind, SeasonKind::Peak);
        assert_eq!(horizon.seasons["peak1"].last_hour(), 10);
    }

    #[rstest]
    #[case(1, "winter")]
    #[case(4, "winter")]
    #[case(5, "summer")]
    #[case(8, "summer")]
    #[case(9, "peak1")]
    #[case(10, "peak1")]
    fn test_season_of_hour(horizon: Horizon, #[case] hour: Hour, #[case] expected: &str) {
        assert_eq!(horizon.season_of_hour(hour).unwrap().id, expected.into());
    }

    #[rstest]
    #[case(0)]
    #[case(11)]
    fn test_season_of_hour_out_of_range(horizon: Horizon, #[case] hour: Hour) {
        assert!(horizon.season_of_hour(hour).is_none());
        assert!(!horizon.is_first_hour(hour));
    }

    #[rstest]
    fn test_scenarios(horizon: Horizon) {
        assert_eq!(
            horizon.scenarios.iter().map(ToString::to_string).collect_vec(),
            ["scenario1", "scenario2", "scenario3"]
        );
        assert!((horizon.scenario_probability() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_horizon_no_regular_seasons() {
        assert_error!(
            Horizon::new(1, 10, &[], 4, 0, 0, 1),
            "At least one regular season is required"
        );
    }

    #[test]
    fn test_horizon_duplicate_season() {
        assert_error!(
            Horizon::new(1, 10, &["a".into(), "a".into()], 4, 0, 0, 1),
            "Duplicate season: a"
        );
    }
}
