// Copyright Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Attribution cannot be removed

use super::FeedError;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::IF_MODIFIED_SINCE;
use std::future::Future;
use std::time::Duration;

/// Where feed payloads come from.
///
/// `Ok(None)` means nothing new since `since` (seconds since epoch, the
/// timestamp of the last accepted feed).
pub trait FeedSource: Send + Sync {
    fn fetch(
        &self,
        since: Option<u64>,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, FeedError>> + Send;
}

pub struct HttpFeedSource {
    client: reqwest::Client,
    url: String,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(HttpFeedSource {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// RFC 7231 date for a conditional request.
pub fn if_modified_since(since: u64) -> Option<String> {
    let since = i64::try_from(since).ok()?;

    DateTime::<Utc>::from_timestamp(since, 0)
        .map(|date| date.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

impl FeedSource for HttpFeedSource {
    async fn fetch(&self, since: Option<u64>) -> Result<Option<Vec<u8>>, FeedError> {
        let mut request = self.client.get(&self.url);

        if let Some(header_value) = since.and_then(if_modified_since) {
            request = request.header(IF_MODIFIED_SINCE, header_value);
        }

        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(None),
            StatusCode::OK => {
                let bytes = response.bytes().await?;

                if bytes.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(bytes.to_vec()))
                }
            }
            status => Err(FeedError::HttpStatus(status.as_u16())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_http_date() {
        assert_eq!(
            if_modified_since(1_700_000_000).as_deref(),
            Some("Tue, 14 Nov 2023 22:13:20 GMT")
        );
        assert_eq!(
            if_modified_since(0).as_deref(),
            Some("Thu, 01 Jan 1970 00:00:00 GMT")
        );
    }

    #[test]
    fn out_of_range_timestamp_sends_no_header() {
        assert_eq!(if_modified_since(u64::MAX), None);
    }
}
