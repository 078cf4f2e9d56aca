use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{normalize_hostname, within_domain, SubdomainSource};
use crate::http_client::{get_with_retries, RetryPolicy};

const CRTSH_BASE: &str = "https://crt.sh";

/// One row of the crt.sh JSON output. `name_value` carries the
/// certificate's subject and SAN hostnames, newline-separated.
#[derive(Debug, Deserialize)]
struct CrtShEntry {
    name_value: Option<String>,
}

/// Certificate-transparency search via crt.sh.
pub struct CrtSh {
    base_url: String,
}

impl Default for CrtSh {
    fn default() -> Self {
        Self {
            base_url: CRTSH_BASE.to_string(),
        }
    }
}

impl CrtSh {
    /// Point the source at a different endpoint (tests use this).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn query_url(&self, domain: &str) -> String {
        // %.domain matches every name under the domain
        let q = format!("%.{domain}");
        format!("{}/?q={}&output=json", self.base_url, urlencoding::encode(&q))
    }
}

#[async_trait]
impl SubdomainSource for CrtSh {
    fn name(&self) -> &'static str {
        "crt.sh"
    }

    async fn fetch(
        &self,
        client: &Client,
        policy: &RetryPolicy,
        domain: &str,
    ) -> Result<HashSet<String>> {
        let url = self.query_url(domain);
        debug!(%url, "querying crt.sh");
        let body = get_with_retries(client, &url, None, policy).await?;
        parse_body(&body, domain)
    }
}

/// Extract, normalize and domain-filter hostnames from a response body.
fn parse_body(body: &str, domain: &str) -> Result<HashSet<String>> {
    let names = parse_records(body)?
        .into_iter()
        .filter_map(|entry| entry.name_value)
        .flat_map(|value| value.split('\n').map(normalize_hostname).collect::<Vec<_>>())
        .filter(|name| !name.is_empty() && within_domain(name, domain))
        .collect();
    Ok(names)
}

/// crt.sh serves a JSON array normally, but has been seen emitting
/// newline-delimited objects instead. Accept both; anything else is an
/// error rather than a silent skip.
fn parse_records(body: &str) -> Result<Vec<CrtShEntry>> {
    if body.trim_start().starts_with('[') {
        return serde_json::from_str(body).context("crt.sh returned a malformed JSON array");
    }
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            serde_json::from_str(line).context("crt.sh returned an unparseable record line")
        })
        .collect()
}
