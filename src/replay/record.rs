use crate::error::{ReplayError, Result};
use http::{HeaderValue, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header snapshot: lowercase header name to every value sent under it.
pub type HeaderSnapshot = BTreeMap<String, Vec<String>>;

/// A finalized response stored under an idempotency key.
///
/// Records are never mutated. Saving again under the same key replaces the
/// whole record, and `request_hash` decides whether a later request may
/// replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayRecord {
    pub key: String,
    pub request_hash: String,
    pub body: String,
    pub status_code: u16,
    #[serde(default)]
    pub headers: HeaderSnapshot,
}

impl ReplayRecord {
    pub fn new(
        key: impl Into<String>,
        request_hash: impl Into<String>,
        body: impl Into<String>,
        status_code: u16,
        headers: HeaderSnapshot,
    ) -> Self {
        Self {
            key: key.into(),
            request_hash: request_hash.into(),
            body: body.into(),
            status_code,
            headers,
        }
    }

    /// Captures body, status and every header of a finalized response.
    ///
    /// Fails with [`ReplayError::NonUtf8Header`] when a header value could not
    /// be replayed byte for byte.
    pub fn from_response(
        key: impl Into<String>,
        request_hash: impl Into<String>,
        response: &Response<String>,
    ) -> Result<Self> {
        Ok(Self::new(
            key,
            request_hash,
            response.body().clone(),
            response.status().as_u16(),
            snapshot_headers(response.headers())?,
        ))
    }

    /// Rebuilds the stored response for a request presenting `request_hash`.
    pub fn to_response(&self, request_hash: &str) -> Result<Response<String>> {
        if self.request_hash != request_hash {
            return Err(ReplayError::Conflict {
                key: self.key.clone(),
            });
        }

        let mut builder = Response::builder().status(self.status_code);
        for (name, values) in &self.headers {
            for value in values {
                let value = HeaderValue::from_bytes(value.as_bytes()).map_err(http::Error::from)?;
                builder = builder.header(name.as_str(), value);
            }
        }

        Ok(builder.body(self.body.clone())?)
    }

    pub fn matches(&self, request_hash: &str) -> bool {
        self.request_hash == request_hash
    }
}

/// Copies a header map into a serializable snapshot.
pub fn snapshot_headers(headers: &http::HeaderMap) -> Result<HeaderSnapshot> {
    let mut snapshot = HeaderSnapshot::new();
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|value| {
                std::str::from_utf8(value.as_bytes())
                    .map(str::to_string)
                    .map_err(|_| ReplayError::NonUtf8Header {
                        name: name.as_str().to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        snapshot.insert(name.as_str().to_string(), values);
    }
    Ok(snapshot)
}
