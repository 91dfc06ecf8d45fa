// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use crate::gtfs_rt_vehicle_proto;
use crate::ids::FeedScopedId;
use chrono::NaiveDate;
use geo_types::Coord;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum VehicleStopStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
}

impl From<gtfs_rt_vehicle_proto::VehicleStopStatus> for VehicleStopStatus {
    fn from(status: gtfs_rt_vehicle_proto::VehicleStopStatus) -> Self {
        match status {
            gtfs_rt_vehicle_proto::VehicleStopStatus::IncomingAt => VehicleStopStatus::IncomingAt,
            gtfs_rt_vehicle_proto::VehicleStopStatus::StoppedAt => VehicleStopStatus::StoppedAt,
            gtfs_rt_vehicle_proto::VehicleStopStatus::InTransitTo => {
                VehicleStopStatus::InTransitTo
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CongestionLevel {
    Unknown,
    RunningSmoothly,
    StopAndGo,
    Congestion,
    SevereCongestion,
}

impl From<gtfs_rt_vehicle_proto::CongestionLevel> for CongestionLevel {
    fn from(level: gtfs_rt_vehicle_proto::CongestionLevel) -> Self {
        use gtfs_rt_vehicle_proto::CongestionLevel as Wire;

        match level {
            Wire::UnknownCongestionLevel => CongestionLevel::Unknown,
            Wire::RunningSmoothly => CongestionLevel::RunningSmoothly,
            Wire::StopAndGo => CongestionLevel::StopAndGo,
            Wire::Congestion => CongestionLevel::Congestion,
            Wire::SevereCongestion => CongestionLevel::SevereCongestion,
        }
    }
}

/// Last known state of one vehicle.
///
/// Built once by the poller (or another writer) and shared behind an `Arc`
/// afterwards, so it is never mutated once it reaches a store.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VehicleLocation {
    /// Seconds since the unix epoch, as reported by the feed
    pub timestamp: u64,
    pub vehicle_id: FeedScopedId,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub bearing: Option<f32>,
    pub status: Option<VehicleStopStatus>,
    pub route_id: Option<FeedScopedId>,
    pub trip_id: Option<FeedScopedId>,
    pub stop_id: Option<FeedScopedId>,
    pub stop_sequence: Option<u32>,
    pub service_date: NaiveDate,
    pub license_plate: Option<String>,
    pub label: Option<String>,
    pub driver_name: Option<String>,
    pub phone_number: Option<String>,
    pub congestion_level: Option<CongestionLevel>,
    pub deviated: bool,
    pub wheelchair_accessible: Option<bool>,
    //route type of the vehicle, as in routes.txt
    pub vehicle_type: Option<i32>,
    pub block_id: Option<String>,
    pub stop_distance_percent: Option<i32>,
}

impl VehicleLocation {
    pub fn new(timestamp: u64, vehicle_id: FeedScopedId, service_date: NaiveDate) -> Self {
        VehicleLocation {
            timestamp,
            vehicle_id,
            latitude: None,
            longitude: None,
            bearing: None,
            status: None,
            route_id: None,
            trip_id: None,
            stop_id: None,
            stop_sequence: None,
            service_date,
            license_plate: None,
            label: None,
            driver_name: None,
            phone_number: None,
            congestion_level: None,
            deviated: false,
            wheelchair_accessible: None,
            vehicle_type: None,
            block_id: None,
            stop_distance_percent: None,
        }
    }

    pub fn with_position(mut self, latitude: f32, longitude: f32) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_route(mut self, route_id: FeedScopedId) -> Self {
        self.route_id = Some(route_id);
        self
    }

    pub fn with_trip(mut self, trip_id: FeedScopedId) -> Self {
        self.trip_id = Some(trip_id);
        self
    }

    pub fn with_stop(mut self, stop_id: FeedScopedId, stop_sequence: Option<u32>) -> Self {
        self.stop_id = Some(stop_id);
        self.stop_sequence = stop_sequence;
        self
    }

    /// Position as x = longitude, y = latitude.
    ///
    /// `None` when either half of the position is missing from the feed or
    /// is not a finite number.
    pub fn coordinate(&self) -> Option<Coord<f64>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some(Coord {
                x: lon as f64,
                y: lat as f64,
            }),
            _ => None,
        }
    }

    pub fn agency_id(&self) -> &str {
        self.vehicle_id.agency_id()
    }

    /// True if `self` was observed strictly after `other`.
    pub fn is_newer_than(&self, other: &VehicleLocation) -> bool {
        self.timestamp > other.timestamp
    }
}
