//! End-to-end poll cycle tests with a mock feed, stub audio backends, and a
//! recording page channel.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paging::{PageChannel, PageError, Pager};
use poller::audio::{AudioCache, BackendError, Encoder, Synthesizer};
use poller::config::PollerConfig;
use poller::cycle::{run_cycle, CycleDeps};
use poller::feed::{FeedClient, FeedConfig};
use poller::ledger::Ledger;
use poller::thread::ThreadId;

/// Synthesizer stub: counts invocations, optionally failing for artifacts
/// whose path mentions a given code.
struct StubSynth {
    calls: Arc<AtomicUsize>,
    fail_for_code: Option<String>,
}

#[async_trait]
impl Synthesizer for StubSynth {
    async fn synthesize(&self, _text: &str, out_wav: &Path) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = &self.fail_for_code {
            if out_wav.to_string_lossy().contains(code.as_str()) {
                return Err(BackendError::Failed {
                    command: "stub-tts".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "synthesis rejected".to_string(),
                });
            }
        }
        std::fs::write(out_wav, b"RIFFraw").unwrap();
        Ok(())
    }
}

struct CopyEncoder;

#[async_trait]
impl Encoder for CopyEncoder {
    async fn encode(&self, input_wav: &Path, out_wav: &Path) -> Result<(), BackendError> {
        std::fs::copy(input_wav, out_wav).unwrap();
        Ok(())
    }
}

/// Page channel stub: records dispatches, optionally failing every page.
struct StubChannel {
    pages: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl PageChannel for StubChannel {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn page(&self, extension: &str, playback_ref: &str) -> Result<(), PageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PageError::Originate {
                extension: extension.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "originate refused".to_string(),
            });
        }
        self.pages
            .lock()
            .unwrap()
            .push((extension.to_string(), playback_ref.to_string()));
        Ok(())
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    config: PollerConfig,
    pages: Arc<Mutex<Vec<(String, String)>>>,
    page_fail: Arc<AtomicBool>,
    synth_calls: Arc<AtomicUsize>,
    fail_for_code: Option<String>,
}

impl Harness {
    fn new(endpoints: Value) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = PollerConfig {
            subs_file: dir.path().join("subs.json"),
            state_file: dir.path().join("state.json"),
            sounds_dir: dir.path().join("sounds"),
            cache_ttl: std::time::Duration::from_secs(48 * 3600),
        };
        std::fs::write(&config.subs_file, endpoints.to_string()).unwrap();

        Self {
            _dir: dir,
            config,
            pages: Arc::new(Mutex::new(vec![])),
            page_fail: Arc::new(AtomicBool::new(false)),
            synth_calls: Arc::new(AtomicUsize::new(0)),
            fail_for_code: None,
        }
    }

    /// One poll cycle against a feed serving `features`.
    async fn cycle(&self, features: Value) -> poller::cycle::CycleReport {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/alerts/active"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "features": features })))
            .mount(&server)
            .await;

        let deps = CycleDeps {
            feed: FeedClient::new(FeedConfig {
                base_url: server.uri(),
                user_agent: "cycle-test/1.0".to_string(),
                timeout_secs: 5,
            }),
            cache: AudioCache::new(
                &self.config.sounds_dir,
                Box::new(StubSynth {
                    calls: Arc::clone(&self.synth_calls),
                    fail_for_code: self.fail_for_code.clone(),
                }),
                Box::new(CopyEncoder),
            ),
            pager: Pager::with_channel(Arc::new(StubChannel {
                pages: Arc::clone(&self.pages),
                fail: Arc::clone(&self.page_fail),
            })),
        };

        run_cycle(&self.config, &deps).await
    }

    fn paged(&self) -> Vec<(String, String)> {
        self.pages.lock().unwrap().clone()
    }

    async fn ledger(&self) -> Ledger {
        Ledger::load(&self.config.state_file).await
    }
}

fn alert(id: &str, codes: &[&str]) -> Value {
    json!({
        "properties": {
            "id": id,
            "event": "Tornado Warning",
            "areaDesc": "Davidson, TN",
            "headline": "Take cover now",
            "geocode": { "SAME": codes }
        }
    })
}

fn update(id: &str, first_ref: &str, codes: &[&str]) -> Value {
    json!({
        "properties": {
            "id": id,
            "event": "Tornado Warning",
            "areaDesc": "Davidson, TN",
            "headline": "Corrected warning",
            "references": format!("w-nws@noaa.gov,{first_ref},2026-08-07T13:00:00Z"),
            "geocode": { "SAME": codes }
        }
    })
}

#[tokio::test]
async fn test_page_once_then_dedup_across_corrections() {
    let harness = Harness::new(json!([
        { "extension": "204", "codes": ["047001"] }
    ]));

    let report = harness.cycle(json!([alert("A1", &["047001"])])).await;
    assert_eq!(report.pages_sent, 1);
    assert_eq!(
        harness.paged(),
        vec![("204".to_string(), "custom/nws_047001_A1".to_string())]
    );
    assert!(harness.ledger().await.contains(&ThreadId::from("A1"), "204"));

    // The same thread reappears as a correction with a new id
    let report = harness
        .cycle(json!([update("A2", "A1", &["047001"])]))
        .await;
    assert_eq!(report.pages_sent, 0);
    assert_eq!(harness.paged().len(), 1);
}

#[tokio::test]
async fn test_dispatch_failure_is_retried_next_cycle() {
    let harness = Harness::new(json!([
        { "extension": "204", "codes": ["047001"] }
    ]));

    harness.page_fail.store(true, Ordering::SeqCst);
    let report = harness.cycle(json!([alert("A1", &["047001"])])).await;
    assert_eq!(report.pages_sent, 0);
    assert_eq!(report.pages_failed, 1);
    assert!(harness.ledger().await.is_empty());

    harness.page_fail.store(false, Ordering::SeqCst);
    let report = harness.cycle(json!([alert("A1", &["047001"])])).await;
    assert_eq!(report.pages_sent, 1);
    assert!(harness.ledger().await.contains(&ThreadId::from("A1"), "204"));
}

#[tokio::test]
async fn test_synth_failure_skips_only_that_code() {
    let mut harness = Harness::new(json!([
        { "extension": "204", "codes": ["047001"] },
        { "extension": "301", "codes": ["047003"] }
    ]));
    harness.fail_for_code = Some("047003".to_string());

    let report = harness
        .cycle(json!([alert("A1", &["047001", "047003"])]))
        .await;
    assert_eq!(report.pages_sent, 1);
    assert_eq!(report.synth_failures, 1);

    let ledger = harness.ledger().await;
    assert!(ledger.contains(&ThreadId::from("A1"), "204"));
    assert!(!ledger.contains(&ThreadId::from("A1"), "301"));

    // Synthesis recovers; only the skipped endpoint is paged
    harness.fail_for_code = None;
    let report = harness
        .cycle(json!([alert("A1", &["047001", "047003"])]))
        .await;
    assert_eq!(report.pages_sent, 1);
    assert_eq!(
        harness.paged().last().unwrap(),
        &("301".to_string(), "custom/nws_047003_A1".to_string())
    );
}

#[tokio::test]
async fn test_shared_code_synthesizes_once() {
    let harness = Harness::new(json!([
        { "extension": "204", "codes": ["047001", "047003"] },
        { "extension": "301", "codes": ["047001", "012099"] }
    ]));

    let report = harness
        .cycle(json!([alert("A1", &["047001", "047003"])]))
        .await;

    // Both endpoints select the lexicographically smallest code and share
    // one synthesized artifact
    assert_eq!(report.pages_sent, 2);
    assert_eq!(harness.synth_calls.load(Ordering::SeqCst), 1);
    let paged = harness.paged();
    assert!(paged
        .iter()
        .all(|(_, playback)| playback == "custom/nws_047001_A1"));
}

#[tokio::test]
async fn test_feed_failure_is_zero_alerts() {
    let harness = Harness::new(json!([
        { "extension": "204", "codes": ["047001"] }
    ]));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/active"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let deps = CycleDeps {
        feed: FeedClient::new(FeedConfig {
            base_url: server.uri(),
            user_agent: "cycle-test/1.0".to_string(),
            timeout_secs: 5,
        }),
        cache: AudioCache::new(
            &harness.config.sounds_dir,
            Box::new(StubSynth {
                calls: Arc::clone(&harness.synth_calls),
                fail_for_code: None,
            }),
            Box::new(CopyEncoder),
        ),
        pager: Pager::with_channel(Arc::new(StubChannel {
            pages: Arc::clone(&harness.pages),
            fail: Arc::clone(&harness.page_fail),
        })),
    };

    let report = run_cycle(&harness.config, &deps).await;
    assert_eq!(report.alerts, 0);
    assert_eq!(report.pages_sent, 0);
    assert!(harness.paged().is_empty());
}

#[tokio::test]
async fn test_unsubscribed_alert_pages_nobody() {
    let harness = Harness::new(json!([
        { "extension": "204", "codes": ["012099"] }
    ]));

    let report = harness.cycle(json!([alert("A1", &["047001"])])).await;
    assert_eq!(report.pages_sent, 0);
    assert_eq!(harness.synth_calls.load(Ordering::SeqCst), 0);
    assert!(harness.ledger().await.is_empty());
}
