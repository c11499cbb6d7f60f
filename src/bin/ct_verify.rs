//! Offline CT verification tool
//!
//! Rebuilds a log from a bootstrap file and checks one certificate against it.

use anyhow::Context;
use clap::{ArgGroup, Parser};
use std::path::{Path, PathBuf};

use ct_service::certificate::CertificateInput;
use ct_service::log::{bootstrap_from_file, CtLogStore};
use ct_service::sct::{LogKey, SctIssuer};
use ct_service::verification::{VerificationRequest, VerificationService};

#[derive(Parser)]
#[command(name = "ct-verify")]
#[command(about = "Verify a certificate against a CT log rebuilt from a bootstrap file")]
#[command(version = "0.1.0")]
#[command(group(ArgGroup::new("observed").required(true).args(["fingerprint", "certificate_file"])))]
struct Cli {
    /// JSON Lines file of {"domain", "certificate"} records
    #[arg(short, long)]
    bootstrap: PathBuf,

    /// Domain or URL to check
    #[arg(short, long)]
    domain: String,

    /// Observed fingerprint (hex, optionally SHA256: prefixed)
    #[arg(short, long)]
    fingerprint: Option<String>,

    /// File holding the observed certificate (PEM, base64 DER, or raw DER)
    #[arg(short, long)]
    certificate_file: Option<PathBuf>,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,
}

fn read_certificate(path: &Path) -> anyhow::Result<CertificateInput> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read certificate file {}", path.display()))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => CertificateInput::Encoded(text),
        Err(e) => CertificateInput::from_der(e.into_bytes()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The replayed log only has to agree with itself, so a throwaway key is enough
    let store = CtLogStore::new(SctIssuer::new(LogKey::generate(), "ct-verify"));
    let appended = bootstrap_from_file(&store, &cli.bootstrap)
        .await
        .with_context(|| format!("Failed to load {}", cli.bootstrap.display()))?;

    let mut request = VerificationRequest::new(cli.domain.clone());
    if let Some(fp) = &cli.fingerprint {
        request = request.with_fingerprint(fp.clone());
    }
    if let Some(path) = &cli.certificate_file {
        request = request.with_certificate(read_certificate(path)?);
    }

    let report = VerificationService::new(store).verify(&request).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Replayed {} log entries", appended);
        println!("Domain:      {}", report.domain);
        println!("Verdict:     {}", report.verdict);
        if let Some(fp) = &report.fingerprint {
            println!("Fingerprint: {}", fp);
        }
        if let Some(root) = &report.root {
            println!("Root:        {} (size {})", root, report.tree_size);
        }
        println!("Proof valid: {}", report.proof_valid);
        println!("SCT valid:   {}", report.sct_valid);
        if let Some(issued_at) = report.issued_at {
            println!("Issued at:   {}", issued_at.to_rfc3339());
        }
        println!("{}", report.message);
    }

    if !report.is_valid() {
        std::process::exit(1);
    }

    Ok(())
}
