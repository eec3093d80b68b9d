use crate::filtering::{CitySelection, RecordPredicate};
use crate::stores::{ReferenceStore, StoreError};
use crate::types::filter_spec::FilterSpec;
use log::{debug, info};
use std::collections::BTreeSet;

/// Turns a user-level [`FilterSpec`] into the [`RecordPredicate`] a store executes.
///
/// City resolution:
/// * explicit cities are the only city filter, countries are then ignored;
/// * otherwise selected countries expand to all of their cities;
/// * with neither, every city is eligible.
///
/// Countries that resolve to no city produce an unsatisfiable predicate, so the query
/// returns nothing instead of everything.
pub struct FilterResolver<'a, R> {
    reference: &'a R,
}

impl<'a, R: ReferenceStore + Sync> FilterResolver<'a, R> {
    pub fn new(reference: &'a R) -> Self {
        Self { reference }
    }

    pub async fn resolve(&self, spec: &FilterSpec) -> Result<RecordPredicate, StoreError> {
        let cities = self.resolve_cities(spec).await?;
        let predicate = RecordPredicate {
            cities,
            seasons: spec.seasons.clone(),
            start_date: spec.start_date,
            end_date: spec.end_date,
        };
        debug!("Resolved {:?} to {:?}", spec, predicate);
        Ok(predicate)
    }

    async fn resolve_cities(&self, spec: &FilterSpec) -> Result<CitySelection, StoreError> {
        if !spec.cities.is_empty() {
            return Ok(CitySelection::Only(spec.cities.clone()));
        }
        if spec.countries.is_empty() {
            return Ok(CitySelection::Any);
        }

        let cities: BTreeSet<String> = self
            .reference
            .get_cities(Some(&spec.countries))
            .await?
            .into_iter()
            .map(|city| city.name)
            .collect();
        info!(
            "Countries {:?} resolved to {} cities",
            spec.countries,
            cities.len()
        );
        Ok(CitySelection::Only(cities))
    }
}
