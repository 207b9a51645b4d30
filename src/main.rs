mod cli;
mod controller;
mod engine;
mod errors;
mod namespace;
mod namespace_source;
mod principal;
mod project;
mod rancher;
#[cfg(test)]
mod testing;

use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{filter::EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    // setup logging
    let level_filter = cli.log_level;
    let filter_layer = EnvFilter::from_default_env()
        .add_directive(level_filter.into())
        .add_directive("rustls=off".parse().unwrap()) // this crate generates tracing events we don't care about
        .add_directive("hyper=off".parse().unwrap()) // this crate generates tracing events we don't care about
        .add_directive("tower=off".parse().unwrap()); // this crate generates tracing events we don't care about
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let secret = cli.rancher_secret()?;
    let rancher = rancher::RancherClient::new(&cli.rancher_addr, &cli.rancher_key, &secret);

    // in-cluster configuration when running inside of Kubernetes, the local
    // kubeconfig otherwise
    let client = kube::Client::try_default().await?;
    let source = namespace_source::NamespaceSource::new(client.clone());
    let annotator = namespace::KubeAnnotator::new(client);

    let engine = engine::ReconcileEngine::new(rancher, annotator, cli.settings());

    info!(
        rancher = %cli.rancher_addr,
        "Managing rancher projects for annotated namespaces"
    );
    controller::run(&source, &engine).await?;

    Ok(())
}
