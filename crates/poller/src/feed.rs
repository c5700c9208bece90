//! NWS active-alert feed client.
//!
//! Fetches the current set of actual (non-test) alert/update messages from
//! the National Weather Service API as a GeoJSON feature collection and
//! flattens each feature's `properties` object into an [`AlertRecord`].
//!
//! The feed is a pure input boundary: a failed fetch is a typed error that
//! the cycle treats as zero alerts for this run. There is no retry; the next
//! scheduled poll is the retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::PollerError;

/// NWS API origin.
const DEFAULT_BASE_URL: &str = "https://api.weather.gov";

/// Active alerts, filtered to actual (non-test) alert/update messages.
/// `message_type` values must be lowercase per the NWS enum.
const ACTIVE_ALERTS_PATH: &str = "/alerts/active?status=actual&message_type=alert,update";

/// Environment variable overriding the identifying User-Agent header.
const ENV_USER_AGENT: &str = "NWS_USER_AGENT";

/// The NWS API requires an identifying User-Agent with contact information.
const DEFAULT_USER_AGENT: &str = "FreePBX-NWS-Alert/1.0 (contact: yourname@example.com)";

/// Upper bound on announcement text handed to synthesis.
const MAX_ANNOUNCEMENT_CHARS: usize = 900;

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// API origin (scheme + host)
    pub base_url: String,
    /// Identifying User-Agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: std::env::var(ENV_USER_AGENT)
                .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
            timeout_secs: 20,
        }
    }
}

/// One alert update, flattened from a feed feature's `properties` object.
///
/// Transient: lives for the duration of one poll cycle. The full property
/// set is retained for the content-hash thread-id fallback.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    /// This update's own identifier
    pub id: Option<String>,
    /// Event name, e.g. "Tornado Warning"
    pub event: Option<String>,
    /// Human-readable affected area
    pub area_desc: Option<String>,
    /// Headline summary
    pub headline: Option<String>,
    /// When the update was sent
    pub sent: Option<DateTime<Utc>>,
    /// CAP correction-chain references, normalized to one string per entry
    pub references: Vec<String>,
    /// SAME geographic codes this alert applies to
    pub same_codes: Vec<String>,
    raw: Value,
}

#[derive(Debug, Deserialize)]
struct RecordProps {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default, rename = "areaDesc")]
    area_desc: Option<String>,
    #[serde(default)]
    headline: Option<String>,
    #[serde(default)]
    sent: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "string_or_list")]
    references: Vec<String>,
    #[serde(default)]
    geocode: Option<Geocode>,
}

#[derive(Debug, Default, Deserialize)]
struct Geocode {
    #[serde(default, rename = "SAME")]
    same: Vec<String>,
}

/// CAP `references` may be a single whitespace-joined string or a list of
/// strings; non-string list entries are dropped.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => vec![],
    })
}

impl AlertRecord {
    /// Build a record from one feature's `properties` object.
    ///
    /// Returns `None` for non-object or unparseable properties; a skipped
    /// record is logged and never aborts the cycle.
    pub fn from_properties(props: Value) -> Option<Self> {
        if !props.is_object() {
            return None;
        }

        let parsed: RecordProps = match serde_json::from_value(props.clone()) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Skipping malformed alert properties");
                return None;
            }
        };

        Some(Self {
            id: parsed.id,
            event: parsed.event,
            area_desc: parsed.area_desc,
            headline: parsed.headline,
            sent: parsed.sent,
            references: parsed.references,
            same_codes: parsed.geocode.unwrap_or_default().same,
            raw: props,
        })
    }

    /// The full property set as received from the feed.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The spoken announcement for this alert, capped to a bounded length.
    pub fn announcement_text(&self) -> String {
        let event = self.event.as_deref().unwrap_or("Weather Alert");
        let area = self.area_desc.as_deref().unwrap_or("");
        let headline = self.headline.as_deref().unwrap_or("");

        let msg = format!("National Weather Service. {event}. Affected area: {area}. {headline}");
        if msg.chars().count() > MAX_ANNOUNCEMENT_CHARS {
            let mut truncated: String = msg.chars().take(MAX_ANNOUNCEMENT_CHARS).collect();
            truncated.push_str("...");
            truncated
        } else {
            msg
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Value,
}

/// Client for the NWS active-alert feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    config: FeedConfig,
    client: reqwest::Client,
}

impl FeedClient {
    /// Create a new feed client with the given configuration.
    ///
    /// # Panics
    /// Panics if the HTTP client cannot be created (should never happen in practice).
    #[must_use]
    pub fn new(config: FeedConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Create a new feed client with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FeedConfig::default())
    }

    /// Fetch the current active alert set.
    ///
    /// Records without any SAME code are dropped here; nothing downstream
    /// can act on them.
    pub async fn fetch_active(&self) -> Result<Vec<AlertRecord>, PollerError> {
        let url = format!("{}{}", self.config.base_url, ACTIVE_ALERTS_PATH);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.config.user_agent)
            .header("Accept", "application/geo+json")
            .send()
            .await?
            .error_for_status()?;

        let collection: FeatureCollection = response.json().await?;

        let mut records = Vec::new();
        for feature in collection.features {
            let Some(record) = AlertRecord::from_properties(feature.properties) else {
                continue;
            };
            if record.same_codes.is_empty() {
                debug!(id = ?record.id, "Dropping alert without SAME codes");
                continue;
            }
            records.push(record);
        }

        debug!(count = records.len(), "Fetched active alerts");
        Ok(records)
    }
}
