// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use super::EntityRejection;
use crate::gtfs_rt_vehicle_proto::{self, FeedEntity};
use crate::id_cleanup::gtfs_rt_id_cleanup;
use crate::ids::FeedScopedId;
use crate::vehicle_location::{CongestionLevel, VehicleLocation, VehicleStopStatus};
use chrono::NaiveDate;

/// Feed-wide values every entity of one feed is read against.
pub struct EntityContext<'a> {
    pub agency_id: &'a str,
    pub header_timestamp: Option<u64>,
    pub today: NaiveDate,
}

impl EntityContext<'_> {
    fn scoped(&self, id: &str) -> FeedScopedId {
        FeedScopedId::new(self.agency_id, id)
    }
}

fn parse_service_date(start_date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(start_date, "%Y%m%d").ok()
}

fn wheelchair_accessible(value: i32) -> Option<bool> {
    match value {
        1 => Some(true),
        2 => Some(false),
        _ => None,
    }
}

/// Turns one feed entity into a vehicle location.
///
/// Entities without a vehicle position, or marked deleted, yield `Ok(None)`.
pub fn location_from_entity(
    entity: &FeedEntity,
    context: &EntityContext<'_>,
) -> Result<Option<VehicleLocation>, EntityRejection> {
    if entity.is_deleted == Some(true) {
        return Ok(None);
    }

    let vehicle_position = match &entity.vehicle {
        Some(vehicle_position) => vehicle_position,
        None => return Ok(None),
    };

    let descriptor = vehicle_position.vehicle.as_ref();

    let vehicle_id = match descriptor.and_then(|descriptor| descriptor.id.as_deref()) {
        Some(id) => context.scoped(id),
        None => context.scoped(&gtfs_rt_id_cleanup(context.header_timestamp, &entity.id)),
    };

    let trip = vehicle_position.trip.as_ref();
    let trip_id = trip.and_then(|trip| trip.trip_id.as_deref());

    let service_date = match (trip_id, trip.and_then(|trip| trip.start_date.as_deref())) {
        (Some(_), Some(start_date)) => match parse_service_date(start_date) {
            Some(service_date) => service_date,
            None => {
                return Err(EntityRejection::InvalidStartDate {
                    vehicle_id,
                    start_date: start_date.to_string(),
                });
            }
        },
        _ => context.today,
    };

    let timestamp = vehicle_position
        .timestamp
        .or(context.header_timestamp)
        .unwrap_or(0);

    let mut location = VehicleLocation::new(timestamp, vehicle_id, service_date);

    if let Some(trip) = trip {
        location.trip_id = trip.trip_id.as_deref().map(|id| context.scoped(id));
        location.route_id = trip.route_id.as_deref().map(|id| context.scoped(id));
        location.block_id = trip.block_id.clone();
    }

    //a position that is not a real number is no position at all
    if let Some(position) = &vehicle_position.position {
        if position.latitude.is_finite() && position.longitude.is_finite() {
            location.latitude = Some(position.latitude);
            location.longitude = Some(position.longitude);
        }
        location.bearing = position.bearing.filter(|bearing| bearing.is_finite());
    }

    location.stop_id = vehicle_position
        .stop_id
        .as_deref()
        .map(|id| context.scoped(id));
    location.stop_sequence = vehicle_position.current_stop_sequence;

    location.status = vehicle_position
        .current_status
        .and_then(|status| gtfs_rt_vehicle_proto::VehicleStopStatus::try_from(status).ok())
        .map(VehicleStopStatus::from);

    location.congestion_level = vehicle_position
        .congestion_level
        .and_then(|level| gtfs_rt_vehicle_proto::CongestionLevel::try_from(level).ok())
        .map(CongestionLevel::from);

    if let Some(descriptor) = descriptor {
        location.label = descriptor.label.clone();
        location.license_plate = descriptor.license_plate.clone();
        location.driver_name = descriptor.driver_name.clone();
        location.phone_number = descriptor.phone_number.clone();
        location.deviated = descriptor.deviated.unwrap_or(false);
        location.wheelchair_accessible = descriptor
            .wheelchair_accessible
            .and_then(wheelchair_accessible);
        location.vehicle_type = descriptor.vehicle_type;
        location.stop_distance_percent = descriptor.stop_distance_percent;
    }

    Ok(Some(location))
}
