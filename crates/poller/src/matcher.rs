//! Subscription matching.
//!
//! Intersects one alert thread's SAME codes against every registered
//! endpoint's subscriptions and selects at most one code per endpoint. An
//! endpoint already paged for the thread, or with no intersecting code, is
//! silently skipped.

use std::collections::{BTreeMap, BTreeSet};

use crate::ledger::Ledger;
use crate::subs::Endpoint;
use crate::thread::ThreadId;

/// Select the endpoints to page for a thread, mapping extension to the one
/// SAME code used for its announcement.
///
/// When several subscribed codes intersect the alert, the lexicographically
/// smallest wins, keeping one code consistently tied to one cached artifact
/// per endpoint across cycles.
pub fn select_targets(
    same_codes: &[String],
    thread_id: &ThreadId,
    endpoints: &[Endpoint],
    ledger: &Ledger,
) -> BTreeMap<String, String> {
    let alert_codes: BTreeSet<&str> = same_codes.iter().map(String::as_str).collect();

    let mut targets = BTreeMap::new();
    for endpoint in endpoints {
        if endpoint.extension.is_empty() || endpoint.codes.is_empty() {
            continue;
        }
        if ledger.contains(thread_id, &endpoint.extension) {
            continue;
        }

        let selected = endpoint
            .codes
            .iter()
            .filter(|code| alert_codes.contains(code.as_str()))
            .min();

        if let Some(code) = selected {
            targets.insert(endpoint.extension.clone(), code.clone());
        }
    }

    targets
}
