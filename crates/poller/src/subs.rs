//! Subscription store loader.
//!
//! The subscription list is owned by the subscription-management voice menu;
//! this side only reads it. A missing or corrupt store loads as empty so one
//! bad write elsewhere never stops the poller.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::warn;

/// One registered notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Telephony extension to page
    pub extension: String,
    /// SAME codes this extension subscribes to
    #[serde(default)]
    pub codes: Vec<String>,
}

/// Load the endpoint list, treating any failure as an empty store.
pub async fn load(path: &Path) -> Vec<Endpoint> {
    match fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt subscription store, treating as empty");
                vec![]
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => vec![],
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable subscription store, treating as empty");
            vec![]
        }
    }
}
