use std::collections::HashSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{normalize_hostname, within_domain, SubdomainSource};
use crate::config::CirclAuth;
use crate::http_client::{get_with_retries, RetryPolicy};

const CIRCL_BASE: &str = "https://www.circl.lu";

/// One passive-DNS record. The full schema varies by record type; only
/// the owner name matters here.
#[derive(Debug, Deserialize)]
struct PdnsRecord {
    rrname: Option<String>,
}

/// CIRCL passive DNS. Requires an account; the API answers with
/// newline-delimited JSON records.
pub struct Circl {
    base_url: String,
    auth: CirclAuth,
}

impl Circl {
    pub fn new(auth: CirclAuth) -> Self {
        Self {
            base_url: CIRCL_BASE.to_string(),
            auth,
        }
    }

    /// Point the source at a different endpoint (tests use this).
    pub fn with_base_url(auth: CirclAuth, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth,
        }
    }

    fn query_url(&self, domain: &str) -> String {
        format!("{}/pdns/query/{}", self.base_url, urlencoding::encode(domain))
    }
}

#[async_trait]
impl SubdomainSource for Circl {
    fn name(&self) -> &'static str {
        "circl-pdns"
    }

    async fn fetch(
        &self,
        client: &Client,
        policy: &RetryPolicy,
        domain: &str,
    ) -> Result<HashSet<String>> {
        let url = self.query_url(domain);
        debug!(%url, "querying CIRCL passive DNS");
        let auth = (self.auth.user.as_str(), self.auth.password.as_str());
        let body = get_with_retries(client, &url, Some(auth), policy).await?;
        parse_body(&body, domain)
    }
}

fn parse_body(body: &str, domain: &str) -> Result<HashSet<String>> {
    let mut names = HashSet::new();
    for line in body.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let record: PdnsRecord =
            serde_json::from_str(line).context("CIRCL returned an unparseable record line")?;
        let Some(rrname) = record.rrname else { continue };
        let name = normalize_hostname(&rrname);
        if !name.is_empty() && within_domain(&name, domain) {
            names.insert(name);
        }
    }
    Ok(names)
}
