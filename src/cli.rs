use crate::engine::{ManagedRole, Settings, PROJECT_OWNER_ROLE};

use anyhow::Context;
use clap::builder::TypedValueParser;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;

/// Where the API key secret is read from when `--rancher-secret` is not
/// given, e.g. when it is mounted from a Kubernetes Secret.
pub const RANCHER_SECRET_PATH: &str = "/var/rancher-project-mgmt/rancher-secret";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level
    #[arg(
        long,
        default_value_t = LevelFilter::INFO,
        value_parser = clap::builder::PossibleValuesParser::new(["trace", "debug", "info", "warn", "error"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
    )]
    pub log_level: LevelFilter,

    /// Base URL of the Rancher API, including the version path
    /// (e.g. https://rancher.example.com/v3)
    #[arg(long, env = "RANCHER_ADDR")]
    pub rancher_addr: String,

    /// Rancher API access key id, doubles as the basic auth username
    #[arg(long, env = "RANCHER_KEY")]
    pub rancher_key: String,

    /// Rancher API access key secret. Read from the mounted secret file
    /// when omitted
    #[arg(long, env = "RANCHER_SECRET")]
    pub rancher_secret: Option<String>,

    /// Annotation declaring the desired project name
    #[arg(long, default_value = "rancher-project-mgmt.motus.com/project-name")]
    pub project_name_annotation: String,

    /// Annotation the controller writes the project id to
    #[arg(long, default_value = "field.cattle.io/projectId")]
    pub project_id_annotation: String,

    /// Cluster projects are created in when no cluster annotation is present
    #[arg(long, default_value = "local")]
    pub default_cluster: String,

    /// Annotation selecting the cluster to create a missing project in
    #[arg(long, default_value = "rancher-project-mgmt.motus.com/cluster-name")]
    pub cluster_name_annotation: String,

    /// Annotation listing the principals that must hold the project-owner
    /// role on the project
    #[arg(long, default_value = "rancher-project-mgmt.motus.com/owners")]
    pub owners_annotation: String,
}

impl Cli {
    /// The API key secret, from the command line or the mounted secret file.
    pub fn rancher_secret(&self) -> anyhow::Result<String> {
        match &self.rancher_secret {
            Some(secret) => Ok(secret.clone()),
            None => {
                let secret = std::fs::read_to_string(RANCHER_SECRET_PATH).with_context(|| {
                    format!("cannot read the rancher secret from {RANCHER_SECRET_PATH}")
                })?;
                Ok(secret.trim_end().to_string())
            }
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            project_name_annotation: self.project_name_annotation.clone(),
            project_id_annotation: self.project_id_annotation.clone(),
            cluster_name_annotation: self.cluster_name_annotation.clone(),
            default_cluster: self.default_cluster.clone(),
            managed_roles: vec![ManagedRole {
                annotation: self.owners_annotation.clone(),
                role_template_id: PROJECT_OWNER_ROLE.to_string(),
            }],
        }
    }
}
