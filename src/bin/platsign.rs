use clap::{Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};

#[derive(Parser, Debug)]
#[command(name = "platsign")]
#[command(about = "Mutual TLS client backed by the platform credential store", version)]
pub struct Cli {
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL with mutual TLS, printing the response body
    Get {
        /// URL to request
        url: String,

        /// Common name of the client certificate to present
        #[arg(long, default_value = "testClientTLS")]
        common_name: String,

        /// Present the certificate even if it is expired
        #[arg(long)]
        allow_expired: bool,
    },

    /// List matching certificates in the platform credential store
    Find {
        /// Common name to search for
        #[arg(long, default_value = "testClientTLS")]
        common_name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    match cli.command {
        Commands::Get {
            url,
            common_name,
            allow_expired,
        } => run_get(&url, common_name, allow_expired),
        Commands::Find { common_name } => run_find(common_name),
    }
}

#[cfg(any(target_os = "macos", windows))]
fn run_get(url: &str, common_name: String, allow_expired: bool) -> anyhow::Result<()> {
    use anyhow::Context;
    use std::sync::Arc;

    use platsign::SelectionCriteria;

    let criteria = SelectionCriteria::new(common_name).enforce_expiry(!allow_expired);
    let config = platsign::api::client_config(criteria).context("building TLS configuration")?;

    let agent = ureq::AgentBuilder::new().tls_config(Arc::new(config)).build();
    let body = agent
        .get(url)
        .call()
        .context("request failed")?
        .into_string()
        .context("reading response body")?;
    print!("{}", body);
    Ok(())
}

#[cfg(any(target_os = "macos", windows))]
fn run_find(common_name: String) -> anyhow::Result<()> {
    use std::time::SystemTime;

    use sha2::{Digest, Sha256};

    use platsign::SelectionCriteria;

    #[cfg(target_os = "macos")]
    let store = platsign::adapters::keychain::KeychainStore::new();
    #[cfg(windows)]
    let store = platsign::adapters::cng::CngStore::new();

    let criteria = SelectionCriteria::new(common_name);
    let certificates = platsign::api::list_certificates(&store, &criteria)?;
    if certificates.is_empty() {
        println!("no matching certificates");
        return Ok(());
    }

    let now = SystemTime::now();
    for certificate in certificates {
        println!("subject: {}", certificate.subject());
        println!("  issuer: {}", certificate.issuer());
        let status = if certificate.valid_at(now) {
            "valid"
        } else {
            "expired or not yet valid"
        };
        println!("  status: {}", status);
        println!("  sha256: {}", hex::encode(Sha256::digest(certificate.der())));
    }
    Ok(())
}

#[cfg(not(any(target_os = "macos", windows)))]
fn run_get(_url: &str, _common_name: String, _allow_expired: bool) -> anyhow::Result<()> {
    anyhow::bail!("no supported credential store on this platform")
}

#[cfg(not(any(target_os = "macos", windows)))]
fn run_find(_common_name: String) -> anyhow::Result<()> {
    anyhow::bail!("no supported credential store on this platform")
}

#[cfg(test)]
mod tests {
    use assert_cmd::Command;

    #[test]
    fn test_cli_version_parameter() {
        let mut cmd = Command::cargo_bin("platsign").unwrap();
        let assert = cmd.arg("--version").assert();
        assert.success();
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let mut cmd = Command::cargo_bin("platsign").unwrap();
        let assert = cmd.assert();
        assert.failure();
    }
}
