pub mod circl;
pub mod crtsh;

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::FinderConfig;
use crate::http_client::{self, RetryPolicy};

pub use circl::Circl;
pub use crtsh::CrtSh;

/// A passive subdomain data source. Implementations fetch, normalize and
/// domain-filter their own records; merging across sources is the
/// finder's job.
#[async_trait]
pub trait SubdomainSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(
        &self,
        client: &Client,
        policy: &RetryPolicy,
        domain: &str,
    ) -> Result<HashSet<String>>;
}

/// Trim whitespace, lowercase, strip a single leading `*.` wildcard label
/// and any trailing dot. Idempotent.
pub fn normalize_hostname(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    let stripped = trimmed.strip_prefix("*.").unwrap_or(trimmed.as_str());
    stripped.trim_end_matches('.').to_string()
}

/// True when `name` is `domain` itself or a hostname under it. A bare
/// suffix check would also admit lookalikes such as `notexample.com`
/// for `example.com`.
pub fn within_domain(name: &str, domain: &str) -> bool {
    name == domain
        || name
            .strip_suffix(domain)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

/// Queries certificate-transparency logs (and optionally CIRCL passive
/// DNS) for subdomains of a target domain. Holds a pooled HTTP client;
/// carries no per-domain state between calls.
pub struct SubdomainFinder {
    client: Client,
    policy: RetryPolicy,
    crtsh: CrtSh,
    circl: Option<Circl>,
}

impl SubdomainFinder {
    pub fn new(config: FinderConfig) -> Result<Self> {
        let client = http_client::build_client(&config)?;
        let policy = RetryPolicy::from_config(&config);
        let circl = config.circl_auth.map(Circl::new);
        Ok(Self {
            client,
            policy,
            crtsh: CrtSh::default(),
            circl,
        })
    }

    /// Replace the crt.sh source, e.g. to point it at another endpoint.
    pub fn with_crtsh(mut self, crtsh: CrtSh) -> Self {
        self.crtsh = crtsh;
        self
    }

    /// Enable or replace the CIRCL source.
    pub fn with_circl(mut self, circl: Circl) -> Self {
        self.circl = Some(circl);
        self
    }

    fn sources(&self) -> Vec<&dyn SubdomainSource> {
        let mut sources: Vec<&dyn SubdomainSource> = vec![&self.crtsh];
        if let Some(circl) = &self.circl {
            sources.push(circl);
        }
        sources
    }

    /// Query crt.sh only.
    pub async fn crtsh_subdomains(&self, domain: &str) -> Result<Vec<String>> {
        let names = self.crtsh.fetch(&self.client, &self.policy, domain).await?;
        Ok(sorted(names))
    }

    /// Query CIRCL passive DNS only. Fails unless credentials were
    /// configured.
    pub async fn circl_subdomains(&self, domain: &str) -> Result<Vec<String>> {
        let Some(circl) = &self.circl else {
            bail!("CIRCL source is not configured (missing credentials)");
        };
        let names = circl.fetch(&self.client, &self.policy, domain).await?;
        Ok(sorted(names))
    }

    /// Query every configured source in turn and merge the results into
    /// one deduplicated, sorted list.
    pub async fn get_subdomains(&self, domain: &str) -> Result<Vec<String>> {
        let mut merged: HashSet<String> = HashSet::new();
        for source in self.sources() {
            let names = source
                .fetch(&self.client, &self.policy, domain)
                .await
                .with_context(|| format!("{} query failed", source.name()))?;
            debug!(source = source.name(), count = names.len(), "source finished");
            merged.extend(names);
        }
        info!(domain, count = merged.len(), "enumeration finished");
        Ok(sorted(merged))
    }
}

fn sorted(names: HashSet<String>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort();
    names
}
