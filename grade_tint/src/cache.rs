//! Route data keyed by route identifier, owned by whoever drives the engine.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::debug;

use crate::{ElevationSeries, GradeError};

#[derive(Debug, Default)]
pub struct RouteCache {
    routes: HashMap<String, ElevationSeries>,
}

impl RouteCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, route_id: &str) -> Option<&ElevationSeries> {
        self.routes.get(route_id)
    }

    pub fn require(&self, route_id: &str) -> Result<&ElevationSeries, GradeError> {
        self.get(route_id)
            .ok_or_else(|| GradeError::MissingRoute(route_id.to_string()))
    }

    /// Stores `series`, replacing any previous data for the route wholesale.
    pub fn insert(
        &mut self,
        route_id: impl Into<String>,
        series: ElevationSeries,
    ) -> Option<ElevationSeries> {
        self.routes.insert(route_id.into(), series)
    }

    /// Cached series for `route_id`, running `loader` only on a miss. A
    /// failed load leaves the cache untouched.
    pub fn get_or_try_insert_with<F>(
        &mut self,
        route_id: &str,
        loader: F,
    ) -> Result<&ElevationSeries, GradeError>
    where
        F: FnOnce() -> Result<ElevationSeries, GradeError>,
    {
        match self.routes.entry(route_id.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let series = loader()?;
                debug!(
                    route_id,
                    points = series.points.len(),
                    full = series.is_full_resolution(),
                    "route loaded"
                );
                Ok(&*entry.insert(series))
            }
        }
    }

    /// Drops every route except `route_id`.
    pub fn retain_only(&mut self, route_id: &str) {
        self.routes.retain(|id, _| id == route_id);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
