use crate::errors::{Error, Result};

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{Api, ListParams, ResourceExt, WatchParams},
    client::Client,
    core::WatchEvent,
};
use tracing::debug;

/// Produces the current set of namespaces and the stream of changes to them.
pub struct NamespaceSource {
    api: Api<Namespace>,
}

struct WatchState {
    api: Api<Namespace>,
    version: String,
    events: Option<BoxStream<'static, kube::Result<WatchEvent<Namespace>>>>,
}

impl NamespaceSource {
    pub fn new(client: Client) -> Self {
        NamespaceSource {
            api: Api::all(client),
        }
    }

    /// Point-in-time list of every namespace in the cluster, together with
    /// the resource version to start a watch from.
    pub async fn snapshot(&self) -> Result<(Vec<Namespace>, String)> {
        let list = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(Error::Kube)?;
        let version = list.metadata.resource_version.unwrap_or_default();
        Ok((list.items, version))
    }

    /// Never-ending stream of namespace change events.
    ///
    /// A single watch call expires server-side after a few minutes; the
    /// stream re-establishes it from the last seen resource version, so
    /// consumers observe one uninterrupted sequence of events. Bookmarks are
    /// consumed internally and a watch-level error status ends the stream
    /// with an error.
    pub fn stream(
        &self,
        resource_version: String,
    ) -> impl Stream<Item = Result<WatchEvent<Namespace>>> {
        let state = WatchState {
            api: self.api.clone(),
            version: resource_version,
            events: None,
        };

        futures::stream::try_unfold(state, |mut state| async move {
            loop {
                match state.events.as_mut() {
                    None => {
                        debug!(resource_version = %state.version, "starting namespace watch");
                        let watch = state
                            .api
                            .watch(&WatchParams::default(), &state.version)
                            .await
                            .map_err(Error::Kube)?;
                        state.events = Some(watch.boxed());
                    }
                    Some(events) => match events.next().await {
                        // the watch call expired, pick up where it left off
                        None => state.events = None,
                        Some(Err(error)) => return Err(Error::Kube(error)),
                        Some(Ok(WatchEvent::Bookmark(bookmark))) => {
                            state.version = bookmark.metadata.resource_version;
                        }
                        Some(Ok(WatchEvent::Error(status))) => {
                            return Err(Error::Kube(kube::Error::Api(status)));
                        }
                        Some(Ok(event)) => {
                            if let Some(version) = event_version(&event) {
                                state.version = version;
                            }
                            return Ok(Some((event, state)));
                        }
                    },
                }
            }
        })
    }
}

fn event_version(event: &WatchEvent<Namespace>) -> Option<String> {
    match event {
        WatchEvent::Added(ns) | WatchEvent::Modified(ns) | WatchEvent::Deleted(ns) => {
            ns.resource_version()
        }
        _ => None,
    }
}
