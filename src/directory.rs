//! Synchronous asset-directory lookups
//!
//! The asset directory is an external service that returns the full record
//! for a named asset. Lookups are request/response with a per-request
//! correlation id and a bounded timeout; the caller blocks until the reply
//! arrives or the timeout fires.
//!
//! [`DirectoryClient`] is the shipped transport: one half of a paired
//! request/reply channel. The owning process wires the matching
//! [`DirectoryEndpoint`] to the real bus; tests drive it directly.

use std::fmt;
use std::sync::mpsc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::AssetRecord;

/// How long a lookup may block the calling loop before it is abandoned.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

const LOOKUP_VERB: &str = "GET";

/// Result type alias for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Errors that can occur during a directory lookup
///
/// None of these are fatal: the resolver degrades to "topology unknown"
/// and retries on the next relevant event.
#[derive(Debug)]
pub enum DirectoryError {
    /// No open connection to the directory service
    NotConnected,

    /// The reply did not arrive within the timeout
    Timeout,

    /// The reply carried a different correlation id than the request
    CorrelationMismatch { expected: String, received: String },

    /// The reply payload did not decode as an asset record
    Decode(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::NotConnected => {
                write!(f, "no open connection to the asset directory")
            }
            DirectoryError::Timeout => write!(f, "asset directory reply timed out"),
            DirectoryError::CorrelationMismatch { expected, received } => write!(
                f,
                "correlation id mismatch: expected {}, received {}",
                expected, received
            ),
            DirectoryError::Decode(msg) => {
                write!(f, "asset directory reply did not decode: {}", msg)
            }
        }
    }
}

impl std::error::Error for DirectoryError {}

/// Lookup request as sent to the directory service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRequest {
    pub verb: String,
    pub correlation_id: String,
    pub target_name: String,
}

/// Reply from the directory service.
///
/// The asset record is carried undecoded; decoding happens client-side so
/// a malformed payload surfaces as [`DirectoryError::Decode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupReply {
    pub correlation_id: String,
    pub asset_record: serde_json::Value,
}

/// Seam between the resolver and whatever transport reaches the directory.
pub trait AssetDirectory {
    /// Fetch the full record for `name`, blocking until reply or timeout.
    fn lookup(&mut self, name: &str) -> DirectoryResult<AssetRecord>;
}

/// Service side of a [`DirectoryClient`] channel pair.
pub struct DirectoryEndpoint {
    pub requests: mpsc::Receiver<LookupRequest>,
    pub replies: mpsc::Sender<LookupReply>,
}

/// Channel-backed directory client.
pub struct DirectoryClient {
    request_tx: mpsc::Sender<LookupRequest>,
    reply_rx: mpsc::Receiver<LookupReply>,
    timeout: Duration,
}

impl DirectoryClient {
    /// Create a connected client/endpoint pair.
    pub fn channel() -> (Self, DirectoryEndpoint) {
        let (request_tx, request_rx) = mpsc::channel();
        let (reply_tx, reply_rx) = mpsc::channel();

        let client = Self {
            request_tx,
            reply_rx,
            timeout: LOOKUP_TIMEOUT,
        };
        let endpoint = DirectoryEndpoint {
            requests: request_rx,
            replies: reply_tx,
        };

        (client, endpoint)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl AssetDirectory for DirectoryClient {
    fn lookup(&mut self, name: &str) -> DirectoryResult<AssetRecord> {
        let correlation_id = Uuid::new_v4().to_string();

        debug!("asking asset directory for {name} (correlation id {correlation_id})");

        let request = LookupRequest {
            verb: LOOKUP_VERB.to_string(),
            correlation_id: correlation_id.clone(),
            target_name: name.to_string(),
        };
        self.request_tx
            .send(request)
            .map_err(|_| DirectoryError::NotConnected)?;

        let reply = match self.reply_rx.recv_timeout(self.timeout) {
            Ok(reply) => reply,
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(DirectoryError::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(DirectoryError::NotConnected);
            }
        };

        if reply.correlation_id != correlation_id {
            return Err(DirectoryError::CorrelationMismatch {
                expected: correlation_id,
                received: reply.correlation_id,
            });
        }

        serde_json::from_value(reply.asset_record)
            .map_err(|err| DirectoryError::Decode(err.to_string()))
    }
}
