//! Routes hot reload payloads to a [`Document`].

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use swarm_core::error::SwarmResult;
use swarm_socket::{CssReload, Disposer, ServerMessage, SocketClient, SocketPayload};

use crate::document::Document;

/// What applying a payload did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// A new style element was appended.
    StyleCreated { id: String },
    /// An existing style element got new content.
    StyleReplaced { id: String },
    /// The page was reloaded.
    PageReloaded,
    /// The payload type is not a reload message.
    Ignored { kind: String },
}

impl std::fmt::Display for ReloadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StyleCreated { id } => write!(f, "created style '{id}'"),
            Self::StyleReplaced { id } => write!(f, "replaced style '{id}'"),
            Self::PageReloaded => write!(f, "reloaded page"),
            Self::Ignored { kind } => write!(f, "ignored '{kind}'"),
        }
    }
}

/// Applies `reload-css` and `reload` payloads to a document.
///
/// Cloning yields another handle to the same document.
pub struct HotReloader<D> {
    document: Arc<Mutex<D>>,
}

impl<D> Clone for HotReloader<D> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
        }
    }
}

impl<D: Document + 'static> HotReloader<D> {
    pub fn new(document: D) -> Self {
        Self {
            document: Arc::new(Mutex::new(document)),
        }
    }

    /// Lock the document for inspection.
    pub fn document(&self) -> MutexGuard<'_, D> {
        self.document.lock()
    }

    /// Apply one payload.
    ///
    /// `reload-css` replaces the full text of the element with the given id,
    /// creating the element first when the document has none.
    pub fn apply(&self, payload: &SocketPayload) -> SwarmResult<ReloadOutcome> {
        match payload.decode()? {
            ServerMessage::ReloadCss(CssReload { id, css }) => {
                let mut document = self.document.lock();
                if document.has_style(&id) {
                    document.replace_style_text(&id, &css)?;
                    Ok(ReloadOutcome::StyleReplaced { id })
                } else {
                    document.append_style(&id, &css)?;
                    Ok(ReloadOutcome::StyleCreated { id })
                }
            }
            ServerMessage::Reload => {
                self.document.lock().reload()?;
                Ok(ReloadOutcome::PageReloaded)
            }
            ServerMessage::Other { kind, .. } => Ok(ReloadOutcome::Ignored { kind }),
        }
    }

    /// Apply every payload `client` emits from now on.
    pub fn attach(&self, client: &SocketClient) -> Disposer {
        let reloader = self.clone();
        client.on(move |payload: &SocketPayload| match reloader.apply(payload) {
            Ok(ReloadOutcome::Ignored { kind }) => debug!("ignoring '{kind}' payload"),
            Ok(outcome) => info!("hot reload: {outcome}"),
            Err(e) => warn!("failed to apply '{}' payload: {e}", payload.kind),
        })
    }
}
