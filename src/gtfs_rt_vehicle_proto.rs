// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

// The subset of GTFS-realtime needed to track vehicle positions, declared by hand
// so that the bplanner extension fields on VehicleDescriptor and TripDescriptor
// decode as ordinary optional fields. Field numbers follow gtfs-realtime.proto;
// extension fields use their registered numbers (1061..=1066).
//
// Anything else in the feed (trip updates, alerts, occupancy...) is skipped by
// prost as unknown fields.

use prost::Message;

// ===========================================================================
// FEED
// ===========================================================================

#[derive(Clone, PartialEq, Message)]
pub struct FeedMessage {
    #[prost(message, required, tag = "1")]
    pub header: FeedHeader,

    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedHeader {
    #[prost(string, required, tag = "1")]
    pub gtfs_realtime_version: String,

    /// Absent means FULL_DATASET.
    #[prost(enumeration = "Incrementality", optional, tag = "2")]
    pub incrementality: Option<i32>,

    /// POSIX time in seconds.
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Incrementality {
    FullDataset = 0,
    Differential = 1,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedEntity {
    #[prost(string, required, tag = "1")]
    pub id: String,

    #[prost(bool, optional, tag = "2")]
    pub is_deleted: Option<bool>,

    #[prost(message, optional, tag = "4")]
    pub vehicle: Option<VehiclePosition>,
}

// ===========================================================================
// VEHICLE POSITION
// ===========================================================================

#[derive(Clone, PartialEq, Message)]
pub struct VehiclePosition {
    #[prost(message, optional, tag = "1")]
    pub trip: Option<TripDescriptor>,

    #[prost(message, optional, tag = "2")]
    pub position: Option<Position>,

    #[prost(uint32, optional, tag = "3")]
    pub current_stop_sequence: Option<u32>,

    #[prost(enumeration = "VehicleStopStatus", optional, tag = "4")]
    pub current_status: Option<i32>,

    #[prost(uint64, optional, tag = "5")]
    pub timestamp: Option<u64>,

    #[prost(enumeration = "CongestionLevel", optional, tag = "6")]
    pub congestion_level: Option<i32>,

    #[prost(string, optional, tag = "7")]
    pub stop_id: Option<String>,

    #[prost(message, optional, tag = "8")]
    pub vehicle: Option<VehicleDescriptor>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum VehicleStopStatus {
    IncomingAt = 0,
    StoppedAt = 1,
    InTransitTo = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum CongestionLevel {
    UnknownCongestionLevel = 0,
    RunningSmoothly = 1,
    StopAndGo = 2,
    Congestion = 3,
    SevereCongestion = 4,
}

#[derive(Clone, PartialEq, Message)]
pub struct Position {
    /// WGS-84 degrees.
    #[prost(float, required, tag = "1")]
    pub latitude: f32,

    #[prost(float, required, tag = "2")]
    pub longitude: f32,

    /// Degrees clockwise from true north.
    #[prost(float, optional, tag = "3")]
    pub bearing: Option<f32>,

    #[prost(double, optional, tag = "4")]
    pub odometer: Option<f64>,

    /// Meters per second.
    #[prost(float, optional, tag = "5")]
    pub speed: Option<f32>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TripDescriptor {
    #[prost(string, optional, tag = "1")]
    pub trip_id: Option<String>,

    #[prost(string, optional, tag = "2")]
    pub start_time: Option<String>,

    /// YYYYMMDD
    #[prost(string, optional, tag = "3")]
    pub start_date: Option<String>,

    // enum on the wire, kept as the raw value since nothing here branches on it
    #[prost(int32, optional, tag = "4")]
    pub schedule_relationship: Option<i32>,

    #[prost(string, optional, tag = "5")]
    pub route_id: Option<String>,

    #[prost(uint32, optional, tag = "6")]
    pub direction_id: Option<u32>,

    #[prost(string, optional, tag = "1066")]
    pub block_id: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct VehicleDescriptor {
    #[prost(string, optional, tag = "1")]
    pub id: Option<String>,

    #[prost(string, optional, tag = "2")]
    pub label: Option<String>,

    #[prost(string, optional, tag = "3")]
    pub license_plate: Option<String>,

    /// Vehicle has left its scheduled path.
    #[prost(bool, optional, tag = "1061")]
    pub deviated: Option<bool>,

    /// 0 unknown, 1 accessible, 2 not accessible.
    #[prost(int32, optional, tag = "1062")]
    pub wheelchair_accessible: Option<i32>,

    #[prost(int32, optional, tag = "1063")]
    pub vehicle_type: Option<i32>,

    #[prost(string, optional, tag = "1064")]
    pub phone_number: Option<String>,

    #[prost(string, optional, tag = "1065")]
    pub driver_name: Option<String>,

    #[prost(int32, optional, tag = "1066")]
    pub stop_distance_percent: Option<i32>,
}

// ===========================================================================
// DECODING
// ===========================================================================

pub fn parse_protobuf_message(bytes: &[u8]) -> Result<FeedMessage, prost::DecodeError> {
    FeedMessage::decode(bytes)
}

impl FeedHeader {
    pub fn is_differential(&self) -> bool {
        matches!(
            self.incrementality.map(Incrementality::try_from),
            Some(Ok(Incrementality::Differential))
        )
    }
}
