//! The resolved, store-independent row predicate for weather records, and the
//! extension trait applying it to polars `LazyFrame`s.

use crate::types::metric::{COL_CITY, COL_DATE, COL_SEASON};
use crate::types::season::Season;
use crate::types::weather_record::WeatherRecord;
use chrono::NaiveDate;
use polars::prelude::{col, lit, Expr, LazyFrame, NamedFrom, Series};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which cities a query may return.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CitySelection {
    /// No city restriction.
    Any,
    /// Only these cities. An empty set matches nothing.
    Only(BTreeSet<String>),
}

impl CitySelection {
    pub fn contains(&self, city: &str) -> bool {
        match self {
            CitySelection::Any => true,
            CitySelection::Only(cities) => cities.contains(city),
        }
    }

    /// True when the selection can never match a row.
    pub fn is_unsatisfiable(&self) -> bool {
        matches!(self, CitySelection::Only(cities) if cities.is_empty())
    }
}

/// A fully resolved filter over weather records.
///
/// Produced by [`crate::FilterResolver`]; countries have already been turned into cities.
/// All active conditions are combined with AND, date bounds are inclusive and compare
/// calendar dates only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordPredicate {
    pub cities: CitySelection,
    /// Empty means every season.
    pub seasons: BTreeSet<Season>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl RecordPredicate {
    /// A predicate that matches every record.
    pub fn all() -> Self {
        Self {
            cities: CitySelection::Any,
            seasons: BTreeSet::new(),
            start_date: None,
            end_date: None,
        }
    }

    /// Evaluates the predicate against a single record.
    pub fn matches(&self, record: &WeatherRecord) -> bool {
        self.start_date.map_or(true, |start| record.date >= start)
            && self.end_date.map_or(true, |end| record.date <= end)
            && self.cities.contains(&record.city_name)
            && (self.seasons.is_empty() || self.seasons.contains(&record.season))
    }

    /// Renders the predicate as a polars expression.
    ///
    /// Returns `None` when no condition is active. An empty city selection renders as a
    /// literal `false`.
    pub fn to_expr(&self) -> Option<Expr> {
        let mut conditions = Vec::new();

        if let Some(start) = self.start_date {
            conditions.push(col(COL_DATE).gt_eq(lit(start)));
        }
        if let Some(end) = self.end_date {
            conditions.push(col(COL_DATE).lt_eq(lit(end)));
        }
        match &self.cities {
            CitySelection::Any => {}
            CitySelection::Only(cities) if cities.is_empty() => conditions.push(lit(false)),
            CitySelection::Only(cities) => {
                let names: Vec<&str> = cities.iter().map(String::as_str).collect();
                conditions.push(col(COL_CITY).is_in(lit(Series::new("cities".into(), names))));
            }
        }
        if !self.seasons.is_empty() {
            let labels: Vec<&str> = self.seasons.iter().map(Season::as_str).collect();
            conditions.push(col(COL_SEASON).is_in(lit(Series::new("seasons".into(), labels))));
        }

        conditions.into_iter().reduce(|acc, condition| acc.and(condition))
    }
}

pub trait WeatherFrameFilterExt {
    /// Filters a weather LazyFrame with a resolved predicate.
    ///
    /// Assumes the frame has been normalized to the weather schema ('date' as `Date`).
    /// Errors surface on `collect`.
    fn filter_records(self, predicate: &RecordPredicate) -> LazyFrame;

    /// Keeps only the rows of a single calendar date.
    fn filter_date(self, date: NaiveDate) -> LazyFrame;
}

impl WeatherFrameFilterExt for LazyFrame {
    fn filter_records(self, predicate: &RecordPredicate) -> LazyFrame {
        match predicate.to_expr() {
            Some(expr) => self.filter(expr),
            None => self,
        }
    }

    fn filter_date(self, date: NaiveDate) -> LazyFrame {
        self.filter(col(COL_DATE).eq(lit(date)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{frame_to_records, records_to_frame};
    use polars::prelude::IntoLazy;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> Vec<WeatherRecord> {
        vec![
            WeatherRecord::new(date(2019, 12, 31), "Moscow", Season::Winter),
            WeatherRecord::new(date(2020, 1, 1), "Moscow", Season::Winter),
            WeatherRecord::new(date(2020, 6, 1), "Kazan", Season::Summer),
            WeatherRecord::new(date(2020, 12, 31), "Berlin", Season::Winter),
            WeatherRecord::new(date(2021, 1, 1), "Kazan", Season::Winter),
        ]
    }

    fn apply(predicate: &RecordPredicate) -> Result<Vec<WeatherRecord>, Box<dyn std::error::Error>> {
        let df = records_to_frame(&fixture())?
            .lazy()
            .filter_records(predicate)
            .collect()?;
        Ok(frame_to_records(&df)?)
    }

    #[test]
    fn test_unrestricted_predicate_has_no_expr() {
        assert!(RecordPredicate::all().to_expr().is_none());
    }

    #[test]
    fn test_date_bounds_are_inclusive() -> Result<(), Box<dyn std::error::Error>> {
        let predicate = RecordPredicate {
            start_date: Some(date(2020, 1, 1)),
            end_date: Some(date(2020, 12, 31)),
            ..RecordPredicate::all()
        };
        let rows = apply(&predicate)?;
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| predicate.matches(r)));
        Ok(())
    }

    #[test]
    fn test_one_sided_bounds() -> Result<(), Box<dyn std::error::Error>> {
        let only_start = RecordPredicate {
            start_date: Some(date(2020, 12, 31)),
            ..RecordPredicate::all()
        };
        assert_eq!(apply(&only_start)?.len(), 2);

        let only_end = RecordPredicate {
            end_date: Some(date(2019, 12, 31)),
            ..RecordPredicate::all()
        };
        assert_eq!(apply(&only_end)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_city_and_season_conditions_are_combined() -> Result<(), Box<dyn std::error::Error>> {
        let predicate = RecordPredicate {
            cities: CitySelection::Only(["Kazan".to_string()].into()),
            seasons: [Season::Winter].into(),
            ..RecordPredicate::all()
        };
        let rows = apply(&predicate)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, date(2021, 1, 1));
        Ok(())
    }

    #[test]
    fn test_empty_city_selection_matches_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let predicate = RecordPredicate {
            cities: CitySelection::Only(BTreeSet::new()),
            ..RecordPredicate::all()
        };
        assert!(predicate.cities.is_unsatisfiable());
        assert!(apply(&predicate)?.is_empty());
        assert!(!fixture().iter().any(|r| predicate.matches(r)));
        Ok(())
    }

    #[test]
    fn test_filter_date() -> Result<(), Box<dyn std::error::Error>> {
        let df = records_to_frame(&fixture())?
            .lazy()
            .filter_date(date(2020, 6, 1))
            .collect()?;
        assert_eq!(df.height(), 1);
        Ok(())
    }
}
