use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::client::{ClientError, HomeClient};
use crate::fragment::{self, FragmentError};
use crate::panel::{Page, Panel, Shelf, ToggleDirection};
use crate::search::{SearchArgs, SearchSetup};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("unknown category: {name}")]
    UnknownCategory { name: String },

    #[error("request for category {name} failed: {source}")]
    Request {
        name: String,
        #[source]
        source: ClientError,
    },

    #[error("fragment for category {name} rejected: {source}")]
    Fragment {
        name: String,
        #[source]
        source: FragmentError,
    },

    #[error("quit page fetch failed: {source}")]
    QuitPage {
        #[source]
        source: ClientError,
    },
}

/// What a toggle request ended up doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The panel was populated with this many rows.
    Loaded { rows: usize },
    /// The panel was cleared and collapsed.
    Unloaded,
    /// A request for this panel was already in flight; nothing was issued.
    InFlight,
}

struct Inner<S: SearchSetup> {
    shelf: Shelf,
    page: Page,
    search: S,
}

/// The page behavior controller. Replaces the original page-ready binding
/// with an explicit initializer over injected collaborators: the endpoint
/// client, the panel shelf, and the search-filter setup.
///
/// Cloneable; clones share state, so toggles on different panels may run
/// concurrently while each panel stays independent. The lock is never held
/// across a network await, so one panel's request cannot stall another's
/// bookkeeping.
pub struct PageController<S: SearchSetup> {
    client: HomeClient,
    inner: Arc<Mutex<Inner<S>>>,
    search_args: SearchArgs,
}

impl<S: SearchSetup> Clone for PageController<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            inner: Arc::clone(&self.inner),
            search_args: self.search_args.clone(),
        }
    }
}

impl<S: SearchSetup> PageController<S> {
    pub fn new(client: HomeClient, search: S) -> Self {
        Self {
            client,
            inner: Arc::new(Mutex::new(Inner {
                shelf: Shelf::new(),
                page: Page::default(),
                search,
            })),
            search_args: SearchArgs::default(),
        }
    }

    /// Registers the known categories and runs the search collaborator once
    /// with the fixed arguments, as the page does on ready.
    pub async fn init(&self, categories: &[String]) {
        let mut inner = self.inner.lock().await;
        for cat in categories {
            let cat = cat.trim();
            if !cat.is_empty() {
                inner.shelf.register(cat);
            }
        }
        let rows = inner.shelf.loaded_rows();
        inner.search.setup(&self.search_args, &rows);
    }

    /// One click on a category title: pick the direction from the panel's
    /// current state, fetch the fragment, install it, flip the state, and
    /// re-run the search setup. The state only changes once the response has
    /// arrived; on failure the panel's indicator flips to error and the
    /// state stays put.
    pub async fn toggle(&self, name: &str) -> Result<ToggleOutcome, ControllerError> {
        let direction = {
            let mut inner = self.inner.lock().await;
            let panel =
                inner
                    .shelf
                    .get_mut(name)
                    .ok_or_else(|| ControllerError::UnknownCategory {
                        name: name.to_string(),
                    })?;
            match panel.begin_toggle() {
                Some(direction) => direction,
                None => return Ok(ToggleOutcome::InFlight),
            }
        };

        let fetched = match direction {
            ToggleDirection::Load => self.client.fetch_load(name).await,
            ToggleDirection::Unload => self.client.fetch_unload(name).await,
        };

        let mut inner = self.inner.lock().await;
        let body = match fetched {
            Ok(body) => body,
            Err(source) => {
                if let Some(panel) = inner.shelf.get_mut(name) {
                    panel.fail();
                }
                return Err(ControllerError::Request {
                    name: name.to_string(),
                    source,
                });
            }
        };

        let rows = match fragment::parse_rows(&body) {
            Ok(rows) => rows,
            Err(source) => {
                if let Some(panel) = inner.shelf.get_mut(name) {
                    panel.fail();
                }
                return Err(ControllerError::Fragment {
                    name: name.to_string(),
                    source,
                });
            }
        };

        let row_count = rows.len();
        if let Some(panel) = inner.shelf.get_mut(name) {
            panel.apply_fragment(rows);
        }
        let loaded = inner.shelf.loaded_rows();
        inner.search.setup(&self.search_args, &loaded);

        Ok(match direction {
            ToggleDirection::Load => ToggleOutcome::Loaded { rows: row_count },
            ToggleDirection::Unload => ToggleOutcome::Unloaded,
        })
    }

    /// The quit trigger: fetch the quit page, replace the page root with its
    /// body, and only then fire `/action/quit`. The action request is
    /// fire-and-forget; a failed page fetch propagates and the action is
    /// never issued.
    pub async fn quit(&self) -> Result<String, ControllerError> {
        let body = self
            .client
            .fetch_quit_page()
            .await
            .map_err(|source| ControllerError::QuitPage { source })?;

        {
            let mut inner = self.inner.lock().await;
            let Inner { shelf, page, .. } = &mut *inner;
            page.replace_root(body.clone(), shelf);
        }

        self.client.fire_quit_action().await;
        Ok(body)
    }

    /// Snapshot of the shelf for display and output rendering.
    pub async fn panels(&self) -> Vec<Panel> {
        let inner = self.inner.lock().await;
        inner.shelf.panels().cloned().collect()
    }

    pub async fn page_root(&self) -> Option<String> {
        let inner = self.inner.lock().await;
        inner.page.root_html().map(|s| s.to_string())
    }

    /// Read access to the injected search collaborator (e.g. to run queries
    /// against the filter it built during setup).
    pub async fn with_search<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.search)
    }
}
