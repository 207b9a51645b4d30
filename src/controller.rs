use crate::engine::ReconcileEngine;
use crate::errors::Result;
use crate::namespace::NamespaceAnnotator;
use crate::namespace_source::NamespaceSource;
use crate::rancher::ProjectDirectory;

use futures::{pin_mut, Stream, StreamExt};
use k8s_openapi::api::core::v1::Namespace;
use kube::core::WatchEvent;
use tracing::{error, info};

/// Reconcile everything that exists, then keep converging on changes.
pub async fn run<D, A>(source: &NamespaceSource, engine: &ReconcileEngine<D, A>) -> Result<()>
where
    D: ProjectDirectory + Send + Sync,
    A: NamespaceAnnotator + Send + Sync,
{
    let (namespaces, resource_version) = source.snapshot().await?;
    info!(
        count = namespaces.len(),
        "Reconciling every namespace in the initial snapshot"
    );
    startup_pass(&namespaces, engine).await?;

    let events = source.stream(resource_version);
    watch_loop(events, engine).await
}

/// Check 'em all at startup.
///
/// Failures here are not isolated: a reconciliation that fails during the
/// bulk pass usually means bad credentials or an unreachable endpoint, and
/// terminating early beats limping along partially operational.
async fn startup_pass<D, A>(namespaces: &[Namespace], engine: &ReconcileEngine<D, A>) -> Result<()>
where
    D: ProjectDirectory + Send + Sync,
    A: NamespaceAnnotator + Send + Sync,
{
    for namespace in namespaces {
        engine.reconcile(namespace).await?;
    }
    Ok(())
}

/// Consume namespace change events until the stream fails.
///
/// Only `MODIFIED` events are acted upon: creations were covered by the
/// startup pass and deletions need no action, since projects outlive their
/// namespaces. Errors that only concern the namespace at hand are logged
/// and the loop moves on; the engine's idempotence means the next event for
/// that namespace re-drives the full reconciliation. Anything else is
/// re-raised and terminates the process.
async fn watch_loop<S, D, A>(events: S, engine: &ReconcileEngine<D, A>) -> Result<()>
where
    S: Stream<Item = Result<WatchEvent<Namespace>>>,
    D: ProjectDirectory + Send + Sync,
    A: NamespaceAnnotator + Send + Sync,
{
    pin_mut!(events);
    while let Some(event) = events.next().await {
        match event? {
            WatchEvent::Modified(namespace) => {
                if let Err(error) = engine.reconcile(&namespace).await {
                    if error.is_recoverable() {
                        error!(
                            namespace = ?namespace,
                            error = %error,
                            "Error processing namespace event"
                        );
                    } else {
                        error!(
                            namespace = ?namespace,
                            error = %error,
                            "Fatal error processing namespace event"
                        );
                        return Err(error);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}
