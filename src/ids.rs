// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use compact_str::CompactString;
use std::fmt;

/// An identifier from a feed, namespaced by the agency it belongs to.
///
/// Realtime feeds only carry bare ids, so the poller qualifies every id it
/// reads with the configured default agency before it touches the stores.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedScopedId {
    pub agency_id: CompactString,
    pub id: CompactString,
}

impl FeedScopedId {
    pub fn new(agency_id: impl Into<CompactString>, id: impl Into<CompactString>) -> Self {
        FeedScopedId {
            agency_id: agency_id.into(),
            id: id.into(),
        }
    }

    pub fn agency_id(&self) -> &str {
        self.agency_id.as_str()
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl fmt::Display for FeedScopedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.agency_id, self.id)
    }
}
