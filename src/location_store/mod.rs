// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Live, queryable set of vehicle locations.
//!
//! Readers never lock: the current [`Snapshot`] sits behind an
//! [`AtomicShared`] pointer and every getter works on whatever snapshot was
//! live when it was called. Writers build a complete replacement off to the
//! side and publish it with a single swap, so a reader sees either all of an
//! update or none of it. Writers are serialized against each other.

use crate::duration_since_unix_epoch;
use crate::ids::FeedScopedId;
use crate::transit_index::TransitIndex;
use crate::vehicle_location::VehicleLocation;
use ahash::AHashMap;
use compact_str::CompactString;
use geo_types::{Coord, Rect};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use scc::ebr::{AtomicShared, Guard, Shared, Tag};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type SpatialEntry = GeomWithData<[f64; 2], FeedScopedId>;

/// An immutable, self-consistent set of vehicle locations and their indices.
#[derive(Clone, Default)]
pub struct Snapshot {
    by_vehicle: AHashMap<FeedScopedId, Arc<VehicleLocation>>,
    by_trip: AHashMap<FeedScopedId, Arc<VehicleLocation>>,
    by_route: AHashMap<FeedScopedId, Vec<Arc<VehicleLocation>>>,
    by_agency: AHashMap<CompactString, Vec<Arc<VehicleLocation>>>,
    //vehicle id -> route it was filed under in by_route
    attributed_routes: AHashMap<FeedScopedId, FeedScopedId>,
    spatial: RTree<SpatialEntry>,
    last_update_time: u64,
}

/// Route a record is filed under: its own route id, otherwise the exemplar
/// route of its trip's pattern.
fn attribute_route(
    location: &VehicleLocation,
    transit_index: &dyn TransitIndex,
) -> Option<FeedScopedId> {
    match (&location.route_id, &location.trip_id) {
        (Some(route_id), _) => Some(route_id.clone()),
        (None, Some(trip_id)) => transit_index.exemplar_route_for_trip(trip_id),
        (None, None) => None,
    }
}

fn spatial_entry(location: &VehicleLocation) -> Option<SpatialEntry> {
    location
        .coordinate()
        .map(|coord| GeomWithData::new([coord.x, coord.y], location.vehicle_id.clone()))
}

// inclusive on every edge, so a zero-area box still matches the point it sits on
fn rect_contains(area: &Rect<f64>, coord: Coord<f64>) -> bool {
    let min = area.min();
    let max = area.max();

    coord.x >= min.x && coord.x <= max.x && coord.y >= min.y && coord.y <= max.y
}

impl Snapshot {
    /// Builds a fresh snapshot from a full batch. If a vehicle appears more
    /// than once, the last occurrence wins. Secondary indices are filled in
    /// batch order, so when two vehicles claim one trip the later one owns it.
    fn build(
        locations: impl IntoIterator<Item = VehicleLocation>,
        transit_index: &dyn TransitIndex,
        last_update_time: u64,
    ) -> Snapshot {
        let mut snapshot = Snapshot {
            last_update_time,
            ..Default::default()
        };

        let batch = locations.into_iter().map(Arc::new).collect::<Vec<_>>();

        for location in &batch {
            snapshot
                .by_vehicle
                .insert(location.vehicle_id.clone(), location.clone());
        }

        let mut spatial_entries = Vec::with_capacity(snapshot.by_vehicle.len());

        for location in &batch {
            //earlier duplicates of a vehicle were replaced in by_vehicle
            let is_final = snapshot
                .by_vehicle
                .get(&location.vehicle_id)
                .is_some_and(|kept| Arc::ptr_eq(kept, location));

            if !is_final {
                continue;
            }

            let route_id = attribute_route(location, transit_index);
            snapshot.index_secondary(location, route_id);

            if let Some(entry) = spatial_entry(location) {
                spatial_entries.push(entry);
            }
        }

        snapshot.spatial = RTree::bulk_load(spatial_entries);

        snapshot
    }

    fn index_secondary(
        &mut self,
        location: &Arc<VehicleLocation>,
        route_id: Option<FeedScopedId>,
    ) {
        self.by_agency
            .entry(location.vehicle_id.agency_id.clone())
            .or_default()
            .push(location.clone());

        if let Some(trip_id) = &location.trip_id {
            self.by_trip.insert(trip_id.clone(), location.clone());
        }

        if let Some(route_id) = route_id {
            self.by_route
                .entry(route_id.clone())
                .or_default()
                .push(location.clone());
            self.attributed_routes
                .insert(location.vehicle_id.clone(), route_id);
        }
    }

    fn insert(&mut self, location: Arc<VehicleLocation>, route_id: Option<FeedScopedId>) {
        self.remove(&location.vehicle_id);

        if let Some(entry) = spatial_entry(&location) {
            self.spatial.insert(entry);
        }

        self.index_secondary(&location, route_id);
        self.by_vehicle
            .insert(location.vehicle_id.clone(), location);
    }

    fn remove(&mut self, vehicle_id: &FeedScopedId) -> Option<Arc<VehicleLocation>> {
        let location = self.by_vehicle.remove(vehicle_id)?;

        if let Some(entry) = spatial_entry(&location) {
            self.spatial.remove(&entry);
        }

        remove_from_list(&mut self.by_agency, &vehicle_id.agency_id, vehicle_id);

        if let Some(trip_id) = &location.trip_id {
            //another vehicle may have claimed the trip since
            let owned_by_this_vehicle = self
                .by_trip
                .get(trip_id)
                .is_some_and(|holder| holder.vehicle_id == *vehicle_id);

            if owned_by_this_vehicle {
                self.by_trip.remove(trip_id);
            }
        }

        if let Some(route_id) = self.attributed_routes.remove(vehicle_id) {
            remove_from_list(&mut self.by_route, &route_id, vehicle_id);
        }

        Some(location)
    }

    pub fn get_for_vehicle(&self, vehicle_id: &FeedScopedId) -> Option<Arc<VehicleLocation>> {
        self.by_vehicle.get(vehicle_id).cloned()
    }

    pub fn get_for_trip(&self, trip_id: &FeedScopedId) -> Option<Arc<VehicleLocation>> {
        self.by_trip.get(trip_id).cloned()
    }

    pub fn get_for_route(&self, route_id: &FeedScopedId) -> Vec<Arc<VehicleLocation>> {
        self.by_route.get(route_id).cloned().unwrap_or_default()
    }

    pub fn get_for_agency(&self, agency_id: &str) -> Vec<Arc<VehicleLocation>> {
        self.by_agency.get(agency_id).cloned().unwrap_or_default()
    }

    /// Vehicles whose coordinate lies inside `area` (x = longitude,
    /// y = latitude), edges included.
    pub fn get_for_area(&self, area: &Rect<f64>) -> Vec<Arc<VehicleLocation>> {
        let min = area.min();
        let max = area.max();
        let envelope = AABB::from_corners([min.x, min.y], [max.x, max.y]);

        self.spatial
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|entry| self.by_vehicle.get(&entry.data))
            .filter(|location| {
                location
                    .coordinate()
                    .is_some_and(|coord| rect_contains(area, coord))
            })
            .cloned()
            .collect()
    }

    pub fn get_all(&self) -> Vec<Arc<VehicleLocation>> {
        self.by_vehicle.values().cloned().collect()
    }

    /// Wall clock seconds of the write that produced this snapshot, 0 if none.
    pub fn last_update_time(&self) -> u64 {
        self.last_update_time
    }

    pub fn len(&self) -> usize {
        self.by_vehicle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_vehicle.is_empty()
    }
}

fn remove_from_list<K>(
    map: &mut AHashMap<K, Vec<Arc<VehicleLocation>>>,
    key: &K,
    vehicle_id: &FeedScopedId,
) where
    K: std::hash::Hash + Eq,
{
    if let Some(list) = map.get_mut(key) {
        list.retain(|location| location.vehicle_id != *vehicle_id);

        if list.is_empty() {
            map.remove(key);
        }
    }
}

pub struct LocationStore {
    live: AtomicShared<Snapshot>,
    transit_index: Arc<dyn TransitIndex>,
    writer: Mutex<()>,
}

impl LocationStore {
    pub fn new(transit_index: Arc<dyn TransitIndex>) -> Self {
        LocationStore {
            live: AtomicShared::new(Snapshot::default()),
            transit_index,
            writer: Mutex::new(()),
        }
    }

    pub fn transit_index(&self) -> &Arc<dyn TransitIndex> {
        &self.transit_index
    }

    /// The live snapshot. Holding on to it keeps it alive and unchanged even
    /// if writers publish newer ones in the meantime.
    pub fn snapshot(&self) -> Shared<Snapshot> {
        let guard = Guard::new();

        self.live
            .get_shared(Ordering::Acquire, &guard)
            .unwrap_or_else(|| Shared::new(Snapshot::default()))
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, snapshot: Snapshot) {
        let _previous = self
            .live
            .swap((Some(Shared::new(snapshot)), Tag::None), Ordering::AcqRel);
    }

    /// Replaces everything with `locations`. Vehicles missing from the batch
    /// are gone afterwards.
    pub fn refresh(&self, locations: impl IntoIterator<Item = VehicleLocation>) {
        let now = duration_since_unix_epoch().as_secs();
        let snapshot = Snapshot::build(locations, self.transit_index.as_ref(), now);

        let _writer = self.lock_writer();
        self.publish(snapshot);
    }

    /// Upserts one location. Returns false, changing nothing, unless it is
    /// strictly newer than what is stored for that vehicle.
    ///
    /// Each call copies the whole live snapshot (R-tree included), so it costs
    /// O(n) in the number of stored vehicles. Prefer [`LocationStore::refresh`]
    /// over a loop of `add` when replacing many vehicles at once.
    pub fn add(&self, location: VehicleLocation) -> bool {
        let _writer = self.lock_writer();
        let current = self.snapshot();

        if let Some(existing) = current.get_for_vehicle(&location.vehicle_id) {
            if !location.is_newer_than(&existing) {
                return false;
            }
        }

        let route_id = attribute_route(&location, self.transit_index.as_ref());

        let mut next = (*current).clone();
        next.insert(Arc::new(location), route_id);
        next.last_update_time = duration_since_unix_epoch().as_secs();

        self.publish(next);
        true
    }

    /// Like [`LocationStore::add`], copies the live snapshot when the vehicle
    /// is present.
    pub fn remove(&self, vehicle_id: &FeedScopedId) -> Option<Arc<VehicleLocation>> {
        let _writer = self.lock_writer();
        let current = self.snapshot();

        current.get_for_vehicle(vehicle_id)?;

        let mut next = (*current).clone();
        let removed = next.remove(vehicle_id);
        self.publish(next);

        removed
    }

    pub fn get_for_vehicle(&self, vehicle_id: &FeedScopedId) -> Option<Arc<VehicleLocation>> {
        self.snapshot().get_for_vehicle(vehicle_id)
    }

    pub fn get_for_trip(&self, trip_id: &FeedScopedId) -> Option<Arc<VehicleLocation>> {
        self.snapshot().get_for_trip(trip_id)
    }

    pub fn get_for_route(&self, route_id: &FeedScopedId) -> Vec<Arc<VehicleLocation>> {
        self.snapshot().get_for_route(route_id)
    }

    pub fn get_for_agency(&self, agency_id: &str) -> Vec<Arc<VehicleLocation>> {
        self.snapshot().get_for_agency(agency_id)
    }

    pub fn get_for_area(&self, area: &Rect<f64>) -> Vec<Arc<VehicleLocation>> {
        self.snapshot().get_for_area(area)
    }

    pub fn get_all(&self) -> Vec<Arc<VehicleLocation>> {
        self.snapshot().get_all()
    }

    pub fn get_last_update_time(&self) -> u64 {
        self.snapshot().last_update_time()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transit_index::{StaticTransitIndex, TripPattern};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;
    use std::thread;

    fn id(local: &str) -> FeedScopedId {
        FeedScopedId::new("ta", local)
    }

    fn service_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn vehicle(vehicle: &str, timestamp: u64) -> VehicleLocation {
        VehicleLocation::new(timestamp, id(vehicle), service_date())
    }

    fn transit_index() -> Arc<dyn TransitIndex> {
        let mut index = StaticTransitIndex::new();
        index.add_pattern(
            TripPattern::new("r1:0", id("r1"), vec![id("s1"), id("s2")]),
            vec![id("t1"), id("t2")],
        );
        index.add_route(id("r2"));
        Arc::new(index)
    }

    fn store() -> LocationStore {
        LocationStore::new(transit_index())
    }

    fn vehicle_ids(locations: &[Arc<VehicleLocation>]) -> BTreeSet<String> {
        locations
            .iter()
            .map(|location| location.vehicle_id.to_string())
            .collect()
    }

    fn id_set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn assert_indices_consistent(store: &LocationStore) {
        let snapshot = store.snapshot();
        let all = snapshot.get_all();

        for location in &all {
            let by_vehicle = snapshot.get_for_vehicle(&location.vehicle_id).unwrap();
            assert!(Arc::ptr_eq(&by_vehicle, location));

            assert!(
                snapshot
                    .get_for_agency(location.agency_id())
                    .iter()
                    .any(|l| Arc::ptr_eq(l, location))
            );

            if let Some(route_id) = snapshot.attributed_routes.get(&location.vehicle_id) {
                assert!(
                    snapshot
                        .get_for_route(route_id)
                        .iter()
                        .any(|l| Arc::ptr_eq(l, location))
                );
            }
        }

        //and the other direction: nothing in a secondary index is missing from the primary one
        let reachable = |location: &Arc<VehicleLocation>| {
            snapshot
                .get_for_vehicle(&location.vehicle_id)
                .is_some_and(|primary| Arc::ptr_eq(&primary, location))
        };

        assert!(snapshot.by_trip.values().all(reachable));
        assert!(snapshot.by_route.values().flatten().all(reachable));
        assert!(snapshot.by_agency.values().flatten().all(reachable));
        assert_eq!(
            snapshot.by_agency.values().map(Vec::len).sum::<usize>(),
            all.len()
        );

        let with_coordinate = all
            .iter()
            .filter(|location| location.coordinate().is_some())
            .count();
        assert_eq!(snapshot.spatial.size(), with_coordinate);
    }

    #[test]
    fn add_only_accepts_strictly_newer() {
        let store = store();

        assert!(store.add(vehicle("v1", 100).with_position(1.0, 1.0)));
        assert!(!store.add(vehicle("v1", 100).with_position(2.0, 2.0)));
        assert!(!store.add(vehicle("v1", 99).with_position(3.0, 3.0)));

        let stored = store.get_for_vehicle(&id("v1")).unwrap();
        assert_eq!(stored.timestamp, 100);
        assert_eq!(stored.latitude, Some(1.0));

        assert!(store.add(vehicle("v1", 101).with_position(4.0, 4.0)));
        assert_eq!(store.get_for_vehicle(&id("v1")).unwrap().timestamp, 101);

        assert_eq!(store.len(), 1);
        assert_indices_consistent(&store);
    }

    #[test]
    fn rejected_add_leaves_update_time_alone() {
        let store = store();
        assert_eq!(store.get_last_update_time(), 0);

        assert!(store.add(vehicle("v1", 100)));
        let after_first = store.get_last_update_time();
        assert!(after_first > 0);

        assert!(!store.add(vehicle("v1", 50)));
        assert_eq!(store.get_last_update_time(), after_first);
    }

    #[test]
    fn add_moves_vehicle_between_indices() {
        let store = store();

        assert!(store.add(
            vehicle("v1", 1)
                .with_trip(id("t1"))
                .with_position(10.0, 10.0)
        ));
        assert_eq!(store.get_for_route(&id("r1")).len(), 1);

        assert!(store.add(
            vehicle("v1", 2)
                .with_route(id("r2"))
                .with_position(20.0, 20.0)
        ));

        assert!(store.get_for_trip(&id("t1")).is_none());
        assert!(store.get_for_route(&id("r1")).is_empty());
        assert_eq!(store.get_for_route(&id("r2")).len(), 1);

        let old_spot = Rect::new(Coord { x: 9.0, y: 9.0 }, Coord { x: 11.0, y: 11.0 });
        assert!(store.get_for_area(&old_spot).is_empty());

        let new_spot = Rect::new(Coord { x: 19.0, y: 19.0 }, Coord { x: 21.0, y: 21.0 });
        assert_eq!(store.get_for_area(&new_spot).len(), 1);

        assert_indices_consistent(&store);
    }

    #[test]
    fn remove_clears_every_index() {
        let store = store();
        store.add(
            vehicle("v1", 1)
                .with_trip(id("t1"))
                .with_position(10.0, 10.0),
        );
        store.add(vehicle("v2", 1).with_route(id("r2")));

        let removed = store.remove(&id("v1")).unwrap();
        assert_eq!(removed.vehicle_id, id("v1"));

        assert!(store.get_for_vehicle(&id("v1")).is_none());
        assert!(store.get_for_trip(&id("t1")).is_none());
        assert!(store.get_for_route(&id("r1")).is_empty());
        assert_eq!(vehicle_ids(&store.get_for_agency("ta")), id_set(&["ta:v2"]));

        let everywhere = Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 });
        assert!(store.get_for_area(&everywhere).is_empty());

        assert!(store.remove(&id("v1")).is_none());
        assert_indices_consistent(&store);
    }

    #[test]
    fn remove_keeps_trip_claimed_by_another_vehicle() {
        let store = store();
        store.add(vehicle("v1", 1).with_trip(id("t1")));
        store.add(vehicle("v2", 1).with_trip(id("t1")));

        store.remove(&id("v1"));

        assert_eq!(store.get_for_trip(&id("t1")).unwrap().vehicle_id, id("v2"));
        assert_indices_consistent(&store);
    }

    #[test]
    fn refresh_is_total_replacement() {
        let store = store();
        store.refresh(vec![vehicle("A", 1), vehicle("B", 1)]);

        store.refresh(vec![
            vehicle("A", 2).with_position(5.0, 5.0),
            vehicle("C", 2),
        ]);

        assert_eq!(
            vehicle_ids(&store.get_all()),
            id_set(&["ta:A", "ta:C"])
        );
        assert_eq!(store.get_for_vehicle(&id("A")).unwrap().timestamp, 2);
        assert!(store.get_for_vehicle(&id("B")).is_none());
        assert_indices_consistent(&store);
    }

    #[test]
    fn refresh_accepts_older_timestamps_wholesale() {
        let store = store();
        store.add(vehicle("v1", 500));

        store.refresh(vec![vehicle("v1", 10)]);

        assert_eq!(store.get_for_vehicle(&id("v1")).unwrap().timestamp, 10);
    }

    #[test]
    fn refresh_keeps_last_duplicate() {
        let store = store();
        store.refresh(vec![
            vehicle("v1", 1).with_trip(id("t1")).with_position(1.0, 1.0),
            vehicle("v1", 2).with_route(id("r2")).with_position(2.0, 2.0),
        ]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get_for_vehicle(&id("v1")).unwrap().timestamp, 2);
        assert!(store.get_for_trip(&id("t1")).is_none());
        assert_indices_consistent(&store);
    }

    #[test]
    fn later_vehicle_in_batch_owns_shared_trip() {
        let store = store();

        for _ in 0..20 {
            store.refresh(vec![
                vehicle("v1", 1).with_trip(id("t1")),
                vehicle("v2", 1).with_trip(id("t1")),
                vehicle("v3", 1).with_trip(id("t2")),
            ]);

            assert_eq!(store.get_for_trip(&id("t1")).unwrap().vehicle_id, id("v2"));
            assert_eq!(store.len(), 3);
            assert_indices_consistent(&store);
        }
    }

    #[test]
    fn non_finite_positions_stay_out_of_the_spatial_index() {
        let store = store();
        let mut locations = (0..100)
            .map(|i| {
                vehicle(&format!("v{}", i), 1).with_position((i % 10) as f32, (i / 10) as f32)
            })
            .collect::<Vec<_>>();
        locations.push(vehicle("nan", 1).with_position(f32::NAN, 200.0));
        store.refresh(locations);

        assert_eq!(store.len(), 101);
        assert!(store.get_for_vehicle(&id("nan")).is_some());
        assert_indices_consistent(&store);

        for i in 0..50 {
            assert!(store.add(vehicle(&format!("w{}", i), 2).with_position(1.5, 1.5)));
        }
        assert!(store.add(vehicle("w0", 3).with_position(f32::NAN, 1.0)));
        assert!(store.add(vehicle("nan2", 3).with_position(1.0, f32::INFINITY)));
        assert_indices_consistent(&store);

        let everywhere = Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 });
        let found = vehicle_ids(&store.get_for_area(&everywhere));
        assert!(!found.contains("ta:nan"));
        assert!(!found.contains("ta:nan2"));
        assert!(!found.contains("ta:w0"));
        assert!(found.contains("ta:w1"));

        assert!(store.remove(&id("w0")).is_some());
        assert!(store.remove(&id("nan")).is_some());
        assert_indices_consistent(&store);
    }

    #[test]
    fn route_attributed_through_trip_pattern() {
        let store = store();
        store.refresh(vec![
            vehicle("v1", 1).with_trip(id("t2")),
            vehicle("v2", 1).with_route(id("r2")).with_trip(id("t1")),
            //unknown trip: still stored, just not under any route
            vehicle("v3", 1).with_trip(id("t404")),
        ]);

        assert_eq!(vehicle_ids(&store.get_for_route(&id("r1"))), id_set(&["ta:v1"]));
        assert_eq!(vehicle_ids(&store.get_for_route(&id("r2"))), id_set(&["ta:v2"]));

        assert!(store.get_for_vehicle(&id("v3")).is_some());
        assert_eq!(store.get_for_trip(&id("t404")).unwrap().vehicle_id, id("v3"));
        assert_indices_consistent(&store);
    }

    #[test]
    fn agency_index_uses_vehicle_agency() {
        let store = store();
        store.refresh(vec![
            vehicle("v1", 1),
            VehicleLocation::new(1, FeedScopedId::new("other", "v1"), service_date()),
        ]);

        assert_eq!(store.get_for_agency("ta").len(), 1);
        assert_eq!(store.get_for_agency("other").len(), 1);
        assert!(store.get_for_agency("nobody").is_empty());
        assert!(store.get_for_route(&id("nowhere")).is_empty());
    }

    #[test]
    fn area_query_matches_exact_filter() {
        let store = store();
        let mut locations = Vec::new();
        for i in 0..20 {
            let lat = (i % 5) as f32;
            let lon = (i / 5) as f32;
            locations.push(vehicle(&format!("v{}", i), 1).with_position(lat, lon));
        }
        locations.push(vehicle("nowhere", 1));
        store.refresh(locations);

        let boxes = [
            Rect::new(Coord { x: 0.5, y: 0.5 }, Coord { x: 2.5, y: 3.5 }),
            Rect::new(Coord { x: 1.0, y: 1.0 }, Coord { x: 3.0, y: 3.0 }),
            Rect::new(Coord { x: 2.0, y: 4.0 }, Coord { x: 2.0, y: 4.0 }),
            Rect::new(Coord { x: 2.5, y: 2.5 }, Coord { x: 2.5, y: 2.5 }),
            Rect::new(Coord { x: -10.0, y: -10.0 }, Coord { x: -5.0, y: -5.0 }),
        ];

        for area in boxes {
            let expected = store
                .get_all()
                .into_iter()
                .filter(|location| {
                    location
                        .coordinate()
                        .is_some_and(|coord| rect_contains(&area, coord))
                })
                .collect::<Vec<_>>();

            assert_eq!(
                vehicle_ids(&store.get_for_area(&area)),
                vehicle_ids(&expected)
            );
        }

        let point = Rect::new(Coord { x: 2.0, y: 4.0 }, Coord { x: 2.0, y: 4.0 });
        assert_eq!(vehicle_ids(&store.get_for_area(&point)), id_set(&["ta:v14"]));
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_writes() {
        let store = store();
        store.refresh(vec![vehicle("A", 1)]);

        let before = store.snapshot();
        store.refresh(vec![vehicle("B", 1)]);
        store.add(vehicle("C", 1));

        assert_eq!(vehicle_ids(&before.get_all()), id_set(&["ta:A"]));
        assert_eq!(
            vehicle_ids(&store.get_all()),
            id_set(&["ta:B", "ta:C"])
        );
    }

    #[test]
    fn readers_never_see_a_torn_refresh() {
        let store = Arc::new(store());
        let batch_a = (0..200)
            .map(|i| vehicle(&format!("a{}", i), 1))
            .collect::<Vec<_>>();
        let batch_b = (0..150)
            .map(|i| vehicle(&format!("b{}", i), 1))
            .collect::<Vec<_>>();
        store.refresh(batch_a.clone());

        let readers = (0..4)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let all = store.get_all();
                        let from_a = all
                            .iter()
                            .filter(|location| location.vehicle_id.id.starts_with('a'))
                            .count();
                        let from_b = all.len() - from_a;

                        assert!(
                            (from_a == 200 && from_b == 0) || (from_a == 0 && from_b == 150),
                            "torn read: {} from a, {} from b",
                            from_a,
                            from_b
                        );
                    }
                })
            })
            .collect::<Vec<_>>();

        for round in 0..100 {
            if round % 2 == 0 {
                store.refresh(batch_b.clone());
            } else {
                store.refresh(batch_a.clone());
            }
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
