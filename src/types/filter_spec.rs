//! Contains the [`FilterSpec`], the user-level selection the dashboard is queried with.

use crate::types::season::Season;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The user's current filter selection.
///
/// A `FilterSpec` is an immutable value rebuilt on every interaction and passed
/// through the whole pipeline; nothing about it is kept between queries except as a
/// cache key. The sets are ordered so two equal selections always encode to the same
/// cache key, regardless of the order in which items were chosen.
///
/// Empty sets mean "no restriction". See [`crate::FilterResolver`] for how countries and
/// cities interact.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use weather_dashboard::{FilterSpec, Season};
///
/// let spec = FilterSpec::new()
///     .with_countries(["Russia"])
///     .with_seasons([Season::Winter])
///     .with_date_range(
///         NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
///         NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
///     );
///
/// assert!(spec.cities.is_empty());
/// assert!(spec.countries.contains("Russia"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSpec {
    pub countries: BTreeSet<String>,
    pub cities: BTreeSet<String>,
    pub seasons: BTreeSet<Season>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl FilterSpec {
    /// A selection without any restriction.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = cities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_seasons(mut self, seasons: impl IntoIterator<Item = Season>) -> Self {
        self.seasons = seasons.into_iter().collect();
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Sets both ends of the date range (both inclusive).
    pub fn with_date_range(self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.with_start_date(start_date).with_end_date(end_date)
    }

    /// Number of days covered by the date range, counting both ends.
    /// `None` unless both ends are set.
    pub fn selected_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days() + 1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_selections_compare_equal_regardless_of_order() {
        let a = FilterSpec::new().with_cities(["Moscow", "Kazan"]);
        let b = FilterSpec::new().with_cities(["Kazan", "Moscow", "Kazan"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_selected_days() {
        let spec = FilterSpec::new().with_date_range(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 12, 31).unwrap(),
        );
        assert_eq!(spec.selected_days(), Some(366));
        assert_eq!(FilterSpec::new().selected_days(), None);
    }
}
