use crate::errors::{Error, Result};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, Patch},
    client::Client,
    core::params::PatchParams,
};
use serde_json::json;
use tracing::info;

/// Write access to namespace annotations. The controller owns exactly one
/// annotation (the project-id one); everything else on the namespace is left
/// alone.
#[async_trait]
pub trait NamespaceAnnotator {
    async fn set_annotation(&self, namespace: &str, key: &str, value: &str) -> Result<()>;
}

/// [`NamespaceAnnotator`] backed by the Kubernetes API server.
pub struct KubeAnnotator {
    client: Client,
}

impl KubeAnnotator {
    pub fn new(client: Client) -> Self {
        KubeAnnotator { client }
    }
}

#[async_trait]
impl NamespaceAnnotator for KubeAnnotator {
    async fn set_annotation(&self, namespace: &str, key: &str, value: &str) -> Result<()> {
        let patch = json!({
            "metadata": {
                "annotations": {
                    key: value,
                }
            }
        });

        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        namespaces
            .patch(namespace, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(Error::Kube)?;
        info!(namespace, key, value, "Namespace annotated");

        Ok(())
    }
}
