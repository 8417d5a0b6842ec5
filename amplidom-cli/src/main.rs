use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use amplidom_core::{
    DomainAssociationSpec, MemoryAmplify, MemoryAmplifyConfig, ReconcilerConfig, ResourceKey,
    SubDomain, format_id, parse_id,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod scenario;

#[derive(Parser)]
#[command(name = "amplidom")]
#[command(about = "Amplify domain association reconciler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode or decode persisted domain association ids
    Id {
        #[command(subcommand)]
        command: IdCommands,
    },

    /// Run the acceptance scenario against the simulated service
    Conformance {
        /// JSON file with the declared domain association
        #[arg(long)]
        spec: Option<PathBuf>,

        /// JSON file with reconciler timeouts and backoff
        #[arg(long)]
        config: Option<PathBuf>,

        /// Wait for certificate verification during create
        #[arg(long)]
        wait_for_verification: bool,

        /// Delay before a new association becomes visible
        #[arg(long, default_value = "500")]
        visibility_delay_ms: u64,

        /// Delay before verification finishes
        #[arg(long, default_value = "2000")]
        verification_delay_ms: u64,

        /// Make verification end in FAILED
        #[arg(long)]
        fail_verification: bool,

        /// Region used in generated ARNs
        #[arg(long, default_value = "us-west-2")]
        region: String,
    },
}

#[derive(Subcommand)]
enum IdCommands {
    /// Build the id for an app and domain
    Format {
        /// Amplify app id
        #[arg(long)]
        app_id: String,

        /// Domain name
        #[arg(long)]
        domain_name: String,
    },

    /// Split an id into app and domain
    Parse {
        /// Persisted id
        id: String,
    },
}

fn example_spec(wait_for_verification: bool) -> DomainAssociationSpec {
    DomainAssociationSpec {
        app_id: "app1".to_string(),
        domain_name: "example.com".to_string(),
        sub_domains: vec![SubDomain::new("main", "www")],
        enable_auto_sub_domain: false,
        wait_for_verification,
    }
}

async fn load_spec(
    path: Option<PathBuf>,
    wait_for_verification: bool,
) -> Result<DomainAssociationSpec> {
    let Some(path) = path else {
        return Ok(example_spec(wait_for_verification));
    };
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read spec file {}", path.display()))?;
    let mut spec: DomainAssociationSpec = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid spec file {}", path.display()))?;
    spec.wait_for_verification |= wait_for_verification;
    Ok(spec)
}

async fn load_config(path: Option<PathBuf>) -> Result<ReconcilerConfig> {
    let Some(path) = path else {
        return Ok(ReconcilerConfig {
            verification_timeout_secs: 60,
            visibility_timeout_secs: 10,
            not_found_grace_secs: 5,
            ..Default::default()
        });
    };
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    ReconcilerConfig::from_json(&raw)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amplidom=info,amplidom_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Id { command } => match command {
            IdCommands::Format {
                app_id,
                domain_name,
            } => {
                println!("{}", format_id(&ResourceKey::new(app_id, domain_name)));
            }
            IdCommands::Parse { id } => {
                let key = parse_id(&id).with_context(|| format!("Cannot parse id {:?}", id))?;
                println!("App ID:  {}", key.app_id());
                println!("Domain:  {}", key.domain_name());
            }
        },

        Commands::Conformance {
            spec,
            config,
            wait_for_verification,
            visibility_delay_ms,
            verification_delay_ms,
            fail_verification,
            region,
        } => {
            let spec = load_spec(spec, wait_for_verification).await?;
            let config = load_config(config).await?;

            let amplify = Arc::new(MemoryAmplify::new(MemoryAmplifyConfig {
                region,
                visibility_delay: Duration::from_millis(visibility_delay_ms),
                verification_delay: Duration::from_millis(verification_delay_ms),
                fail_verification,
                ..Default::default()
            }));
            let branches: Vec<&str> = spec
                .sub_domains
                .iter()
                .map(|s| s.branch_name.as_str())
                .collect();
            amplify.add_app(&spec.app_id, &branches).await;

            let report = scenario::run(amplify, config, &spec).await;
            println!("{}", report.table());
            if report.failed() {
                anyhow::bail!("conformance scenario failed");
            }
        }
    }

    Ok(())
}
