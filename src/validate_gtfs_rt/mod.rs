// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use crate::gtfs_rt_vehicle_proto::FeedMessage;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GtfsRtQualityCheckResults {
    pub entities_id_using_timestamp_from_global: usize,
    pub total_entity_count: usize,
    pub vehicle_entity_count: usize,
    pub vehicles_without_position: usize,
    pub vehicles_at_null_island: usize,
}

pub fn validate_gtfs_rt(input: &FeedMessage) -> GtfsRtQualityCheckResults {
    let mut results = GtfsRtQualityCheckResults {
        total_entity_count: input.entity.len(),
        ..Default::default()
    };

    let global_timestamp_string = input
        .header
        .timestamp
        .map(|global_timestamp| global_timestamp.to_string());

    for entity in &input.entity {
        if let Some(global_timestamp_string) = &global_timestamp_string {
            if entity.id.contains(global_timestamp_string) {
                results.entities_id_using_timestamp_from_global += 1;
            }
        }

        if let Some(vehicle) = &entity.vehicle {
            results.vehicle_entity_count += 1;

            match &vehicle.position {
                Some(position) => {
                    if f32::abs(0.0 - position.latitude) < 0.01
                        && f32::abs(0.0 - position.longitude) < 0.01
                    {
                        results.vehicles_at_null_island += 1;
                    }
                }
                None => results.vehicles_without_position += 1,
            }
        }
    }

    results
}
