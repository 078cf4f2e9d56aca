use crate::cli::Cli;
use subscout::{CirclAuth, FinderConfig, SubdomainFinder};

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep external crates (reqwest/hyper) at INFO to avoid flooding the CLI.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };
    let filter_str = format!("subscout={crate_level},reqwest=info,hyper=info,h2=info");
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    let circl_auth = match (cli.circl_user, cli.circl_pass) {
        (Some(user), Some(password)) => Some(CirclAuth { user, password }),
        _ => None,
    };
    let config = FinderConfig {
        retries: cli.retries,
        timeout_secs: cli.timeout,
        circl_auth,
        ..FinderConfig::default()
    };

    let finder = SubdomainFinder::new(config)?;
    let subdomains = if cli.crtsh_only {
        finder.crtsh_subdomains(&cli.domain).await?
    } else {
        finder.get_subdomains(&cli.domain).await?
    };

    for subdomain in &subdomains {
        println!("{subdomain}");
    }
    tracing::info!(domain = %cli.domain, count = subdomains.len(), "done");

    Ok(())
}
