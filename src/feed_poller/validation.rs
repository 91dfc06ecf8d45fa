// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use super::EntityRejection;
use crate::transit_index::TransitIndex;
use crate::vehicle_location::VehicleLocation;

/// Checks a candidate location against the static schedule.
///
/// Only the fields that are set are checked. A stop is only checked
/// when a trip is set too, since it is validated against that trip's pattern.
pub fn validate_location(
    location: &VehicleLocation,
    transit_index: &dyn TransitIndex,
) -> Result<(), EntityRejection> {
    if let Some(route_id) = &location.route_id {
        if !transit_index.route_exists(route_id) {
            return Err(EntityRejection::UnknownRoute {
                vehicle_id: location.vehicle_id.clone(),
                route_id: route_id.clone(),
            });
        }
    }

    let trip_id = match &location.trip_id {
        Some(trip_id) => trip_id,
        None => return Ok(()),
    };

    let pattern = match transit_index.pattern_for_trip(trip_id) {
        Some(pattern) => pattern,
        None => {
            return Err(EntityRejection::UnknownTrip {
                vehicle_id: location.vehicle_id.clone(),
                trip_id: trip_id.clone(),
            });
        }
    };

    if let Some(stop_id) = &location.stop_id {
        if !transit_index.stop_exists(stop_id) {
            return Err(EntityRejection::UnknownStop {
                vehicle_id: location.vehicle_id.clone(),
                stop_id: stop_id.clone(),
            });
        }

        if !pattern.contains_stop(stop_id) {
            return Err(EntityRejection::StopNotOnTrip {
                vehicle_id: location.vehicle_id.clone(),
                stop_id: stop_id.clone(),
                trip_id: trip_id.clone(),
            });
        }
    }

    Ok(())
}
