use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target domain (e.g. example.com)
    pub domain: String,

    /// Number of retries for transient HTTP failures
    #[arg(short = 'r', long, default_value_t = 10_u32)]
    pub retries: u32,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 15_u64)]
    pub timeout: u64,

    /// Query crt.sh only, even when other sources are configured
    #[arg(long, default_value_t = false)]
    pub crtsh_only: bool,

    /// CIRCL passive DNS user (enables the CIRCL source)
    #[arg(long, requires = "circl_pass")]
    pub circl_user: Option<String>,

    /// CIRCL passive DNS password
    #[arg(long, requires = "circl_user")]
    pub circl_pass: Option<String>,

    /// Enable detailed debug logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
