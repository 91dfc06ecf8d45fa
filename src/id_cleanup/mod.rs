// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref STARTING_DASHES_REGEX: Regex = Regex::new("^(-|_)+").unwrap();
    static ref ENDING_DASHES_REGEX: Regex = Regex::new("(-|_)+$").unwrap();
}

/// Some producers stamp the feed timestamp into every entity id, which makes
/// the same bus look like a new vehicle on each poll. Strip it back out.
pub fn gtfs_rt_id_cleanup(global_timestamp: Option<u64>, id: &str) -> String {
    let new_id = match global_timestamp {
        Some(global_timestamp) => id.replace(&global_timestamp.to_string(), ""),
        None => id.to_string(),
    };

    let cleaned = ENDING_DASHES_REGEX
        .replace(&STARTING_DASHES_REGEX.replace(new_id.as_str(), ""), "")
        .to_string();

    //an id that was only the timestamp is better than an empty one
    if cleaned.is_empty() {
        id.to_string()
    } else {
        cleaned
    }
}
