//! Default User-Agent string.
//!
//! Identifies the tool and states that it paces itself, so a server operator
//! reading access logs can tell the traffic apart from a scraper.

/// Contact URL placed in the default User-Agent.
const PROJECT_UA_URL: &str = "https://example.local";

/// Default User-Agent for download requests.
#[must_use]
pub fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("politedl/{version} gentle (+{PROJECT_UA_URL})")
}
