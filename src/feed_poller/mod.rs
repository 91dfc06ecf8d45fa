// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

//! Periodic ingestion of a GTFS-realtime vehicle positions feed.
//!
//! Every accepted feed replaces the whole content of the [`LocationStore`].
//! Failures never escape a cycle; the store keeps its last good snapshot
//! and the next tick tries again.

mod entity;
mod fetch;
mod validation;

pub use entity::{EntityContext, location_from_entity};
pub use fetch::{FeedSource, HttpFeedSource, if_modified_since};
pub use validation::validate_location;

use crate::config::{ConfigError, VehicleFeedConfig};
use crate::gtfs_rt_vehicle_proto::{FeedMessage, parse_protobuf_message};
use crate::ids::FeedScopedId;
use crate::location_store::LocationStore;
use crate::validate_gtfs_rt::validate_gtfs_rt;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Reasons a whole feed is skipped.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("fetch failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    HttpStatus(u16),
    #[error("malformed feed: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("differential feeds are not supported")]
    Differential,
    #[error("feed timestamp {feed_timestamp} is not newer than {cursor}")]
    Stale { feed_timestamp: u64, cursor: u64 },
}

/// Reasons a single vehicle is dropped from an otherwise accepted feed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntityRejection {
    #[error("vehicle {vehicle_id}: unknown route {route_id}")]
    UnknownRoute {
        vehicle_id: FeedScopedId,
        route_id: FeedScopedId,
    },
    #[error("vehicle {vehicle_id}: unknown trip {trip_id}")]
    UnknownTrip {
        vehicle_id: FeedScopedId,
        trip_id: FeedScopedId,
    },
    #[error("vehicle {vehicle_id}: unknown stop {stop_id}")]
    UnknownStop {
        vehicle_id: FeedScopedId,
        stop_id: FeedScopedId,
    },
    #[error("vehicle {vehicle_id}: stop {stop_id} is not served by trip {trip_id}")]
    StopNotOnTrip {
        vehicle_id: FeedScopedId,
        stop_id: FeedScopedId,
        trip_id: FeedScopedId,
    },
    #[error("vehicle {vehicle_id}: unparseable start date '{start_date}'")]
    InvalidStartDate {
        vehicle_id: FeedScopedId,
        start_date: String,
    },
}

#[derive(Debug)]
pub enum PollOutcome {
    /// The source had nothing new.
    NoUpdate,
    /// The feed was fetched but not applied. The store is untouched.
    Skipped(FeedError),
    Applied {
        feed_timestamp: u64,
        accepted: usize,
        rejected: Vec<EntityRejection>,
    },
}

pub fn decode_feed(bytes: &[u8]) -> Result<FeedMessage, FeedError> {
    Ok(parse_protobuf_message(bytes)?)
}

pub struct FeedPoller<S: FeedSource> {
    source: S,
    store: Arc<LocationStore>,
    default_agency_id: String,
    timezone: Tz,
    poll_interval: Duration,
    cursor: Option<u64>,
}

impl<S: FeedSource> FeedPoller<S> {
    pub fn new(
        source: S,
        store: Arc<LocationStore>,
        config: &VehicleFeedConfig,
    ) -> Result<Self, ConfigError> {
        Ok(FeedPoller {
            source,
            store,
            default_agency_id: config.default_agency_id.clone(),
            timezone: config.timezone()?,
            poll_interval: config.poll_interval()?,
            cursor: None,
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Timestamp of the last accepted feed.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Runs one cycle. Errors are logged and reported in the outcome.
    pub async fn poll(&mut self) -> PollOutcome {
        match self.try_poll().await {
            Ok(outcome) => outcome,
            Err(err) => {
                match &err {
                    FeedError::Differential => error!(
                        "Rejecting differential feed for {}, only full datasets are supported",
                        self.default_agency_id
                    ),
                    FeedError::Stale { .. } => {
                        info!("Skipping feed for {}: {}", self.default_agency_id, err)
                    }
                    _ => warn!("Could not load feed for {}: {}", self.default_agency_id, err),
                }

                PollOutcome::Skipped(err)
            }
        }
    }

    async fn try_poll(&mut self) -> Result<PollOutcome, FeedError> {
        let bytes = match self.source.fetch(self.cursor).await? {
            Some(bytes) => bytes,
            None => {
                debug!("No new feed for {}", self.default_agency_id);
                return Ok(PollOutcome::NoUpdate);
            }
        };

        let feed = decode_feed(&bytes)?;

        if feed.header.is_differential() {
            return Err(FeedError::Differential);
        }

        let feed_timestamp = feed.header.timestamp.unwrap_or(0);

        if let Some(cursor) = self.cursor {
            if feed_timestamp <= cursor {
                return Err(FeedError::Stale {
                    feed_timestamp,
                    cursor,
                });
            }
        }

        let quality = validate_gtfs_rt(&feed);
        debug!("Feed quality for {}: {:?}", self.default_agency_id, quality);

        let context = EntityContext {
            agency_id: &self.default_agency_id,
            header_timestamp: feed.header.timestamp,
            today: self.today(),
        };

        let transit_index = self.store.transit_index().clone();

        let mut accepted = Vec::with_capacity(feed.entity.len());
        let mut rejected = Vec::new();

        for entity in &feed.entity {
            let candidate = location_from_entity(entity, &context).and_then(|location| {
                match location {
                    Some(location) => {
                        validate_location(&location, transit_index.as_ref())?;
                        Ok(Some(location))
                    }
                    None => Ok(None),
                }
            });

            match candidate {
                Ok(Some(location)) => accepted.push(location),
                Ok(None) => {}
                Err(rejection) => {
                    warn!("Dropping entity {}: {}", entity.id, rejection);
                    rejected.push(rejection);
                }
            }
        }

        let accepted_count = accepted.len();
        self.store.refresh(accepted);
        self.cursor = Some(feed_timestamp);

        info!(
            "Applied feed for {} at {}: {} vehicles, {} dropped",
            self.default_agency_id,
            feed_timestamp,
            accepted_count,
            rejected.len()
        );

        Ok(PollOutcome::Applied {
            feed_timestamp,
            accepted: accepted_count,
            rejected,
        })
    }

    /// Polls on a fixed interval until `shutdown` resolves. A slow cycle
    /// pushes the next tick back rather than overlapping it.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::pin!(shutdown);

        info!(
            "Polling feed for {} every {:?}",
            self.default_agency_id, self.poll_interval
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping feed poller for {}", self.default_agency_id);
                    break;
                }
                _ = interval.tick() => {
                    self.poll().await;
                }
            }
        }
    }
}
