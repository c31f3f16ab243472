use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kube::Client;
use tracing_subscriber::EnvFilter;

use pytorch_operator::config::OperatorConfig;
use pytorch_operator::{Result, controller, crd, manifest};

#[derive(Parser, Debug)]
#[command(name = "pytorch-operator")]
#[command(version)]
#[command(about = "Admission and caching of Kubeflow PyTorchJobs")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install the CRD and watch PyTorchJobs
    Run {
        /// Config file (defaults to ~/.pytorch-operator/config.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Only watch this namespace
        #[arg(short, long)]
        namespace: Option<String>,
        /// Assume the CRD is already installed
        #[arg(long)]
        skip_crd_install: bool,
    },
    /// Validate PyTorchJob manifests without a cluster
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(
    config: Option<PathBuf>,
    namespace: Option<String>,
    skip_crd_install: bool,
) -> Result<()> {
    let mut config = OperatorConfig::load(config.as_deref())?;
    if namespace.is_some() {
        config.namespace = namespace;
    }
    if skip_crd_install {
        config.install_crds = false;
    }
    init_tracing(&config.log_filter);

    let client = Client::try_default().await?;
    if config.install_crds {
        crd::install(client.clone(), &config.field_manager, config.establish_timeout()?).await?;
    }
    controller::run(client, &config).await
}

/// Returns whether every document was accepted.
fn validate(files: Vec<PathBuf>) -> Result<bool> {
    init_tracing("error");

    let mut all_accepted = true;
    for file in files {
        let source = fs::read_to_string(&file)?;
        for verdict in manifest::validate_manifests(&source)? {
            match &verdict.outcome {
                Ok(()) => println!(
                    "{}: {} ({}) accepted",
                    file.display(),
                    verdict.name,
                    verdict.api_version
                ),
                Err(err) => {
                    all_accepted = false;
                    println!(
                        "{}: {} ({}) rejected: {} ({})",
                        file.display(),
                        verdict.name,
                        verdict.api_version,
                        err,
                        err.violation()
                    );
                }
            }
        }
    }
    Ok(all_accepted)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Commands::Run {
            config,
            namespace,
            skip_crd_install,
        } => {
            if let Err(e) = run(config, namespace, skip_crd_install).await {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Validate { files } => match validate(files) {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}
