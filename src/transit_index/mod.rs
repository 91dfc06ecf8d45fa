// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Read-only view of the static schedule used to vet realtime positions.

use crate::ids::FeedScopedId;
use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use tracing::info;

/// Ordered stops shared by every trip that runs the same path on a route.
#[derive(Clone, Debug)]
pub struct TripPattern {
    pub pattern_id: String,
    pub exemplar_route_id: FeedScopedId,
    pub stop_ids: Vec<FeedScopedId>,
    stop_set: AHashSet<FeedScopedId>,
}

impl TripPattern {
    pub fn new(
        pattern_id: impl Into<String>,
        exemplar_route_id: FeedScopedId,
        stop_ids: Vec<FeedScopedId>,
    ) -> Self {
        let stop_set = stop_ids.iter().cloned().collect();

        TripPattern {
            pattern_id: pattern_id.into(),
            exemplar_route_id,
            stop_ids,
            stop_set,
        }
    }

    pub fn contains_stop(&self, stop_id: &FeedScopedId) -> bool {
        self.stop_set.contains(stop_id)
    }
}

pub trait TransitIndex: Send + Sync {
    fn route_exists(&self, route_id: &FeedScopedId) -> bool;

    fn stop_exists(&self, stop_id: &FeedScopedId) -> bool;

    fn pattern_for_trip(&self, trip_id: &FeedScopedId) -> Option<&TripPattern>;

    /// Route a trip belongs to, resolved through its pattern.
    fn exemplar_route_for_trip(&self, trip_id: &FeedScopedId) -> Option<FeedScopedId> {
        self.pattern_for_trip(trip_id)
            .map(|pattern| pattern.exemplar_route_id.clone())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticTransitIndex {
    routes: AHashSet<FeedScopedId>,
    stops: AHashSet<FeedScopedId>,
    patterns: Vec<TripPattern>,
    trip_to_pattern: AHashMap<FeedScopedId, usize>,
}

impl StaticTransitIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_route(&mut self, route_id: FeedScopedId) {
        self.routes.insert(route_id);
    }

    pub fn add_stop(&mut self, stop_id: FeedScopedId) {
        self.stops.insert(stop_id);
    }

    /// Registers a pattern and points every trip in `trip_ids` at it.
    /// The route and stops are registered too if they were not already.
    pub fn add_pattern(&mut self, pattern: TripPattern, trip_ids: Vec<FeedScopedId>) {
        self.routes.insert(pattern.exemplar_route_id.clone());
        for stop_id in &pattern.stop_ids {
            self.stops.insert(stop_id.clone());
        }

        let pattern_index = self.patterns.len();
        self.patterns.push(pattern);

        for trip_id in trip_ids {
            self.trip_to_pattern.insert(trip_id, pattern_index);
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Builds patterns by grouping the archive's trips on (route, stop list).
    ///
    /// Static ids carry no agency of their own, so they are scoped with the
    /// same `agency_id` the poller uses for the realtime feed.
    pub fn from_gtfs(gtfs: &gtfs_structures::Gtfs, agency_id: &str) -> Self {
        let mut index = StaticTransitIndex::new();

        for route_id in gtfs.routes.keys() {
            index.add_route(FeedScopedId::new(agency_id, route_id.as_str()));
        }

        for stop_id in gtfs.stops.keys() {
            index.add_stop(FeedScopedId::new(agency_id, stop_id.as_str()));
        }

        let grouped = gtfs
            .trips
            .values()
            .map(|trip| {
                let stops = trip
                    .stop_times
                    .iter()
                    .map(|stop_time| stop_time.stop.id.clone())
                    .collect::<Vec<String>>();

                ((trip.route_id.clone(), stops), trip.id.clone())
            })
            .into_group_map();

        for (pattern_number, ((route_id, stops), trip_ids)) in grouped
            .into_iter()
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .enumerate()
        {
            let pattern = TripPattern::new(
                format!("{}:{}", route_id, pattern_number),
                FeedScopedId::new(agency_id, route_id.as_str()),
                stops
                    .iter()
                    .map(|stop_id| FeedScopedId::new(agency_id, stop_id.as_str()))
                    .collect(),
            );

            index.add_pattern(
                pattern,
                trip_ids
                    .into_iter()
                    .map(|trip_id| FeedScopedId::new(agency_id, trip_id))
                    .collect(),
            );
        }

        info!(
            "Built transit index: {} routes, {} stops, {} patterns, {} trips",
            index.routes.len(),
            index.stops.len(),
            index.patterns.len(),
            index.trip_to_pattern.len()
        );

        index
    }
}

impl TransitIndex for StaticTransitIndex {
    fn route_exists(&self, route_id: &FeedScopedId) -> bool {
        self.routes.contains(route_id)
    }

    fn stop_exists(&self, stop_id: &FeedScopedId) -> bool {
        self.stops.contains(stop_id)
    }

    fn pattern_for_trip(&self, trip_id: &FeedScopedId) -> Option<&TripPattern> {
        self.trip_to_pattern
            .get(trip_id)
            .and_then(|pattern_index| self.patterns.get(*pattern_index))
    }
}
