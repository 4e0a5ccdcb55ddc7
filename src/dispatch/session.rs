//! The per-session speech configuration: detected [`Mode`] plus the
//! matching [`VoiceCatalog`] snapshot.

use std::sync::Arc;

use crate::speech::{ConnectivityProbe, EngineFactory, Mode, VoiceCatalog};

/// Mode and catalog fixed for the lifetime of a session.
///
/// Built once at startup and replaced only by an explicit refresh; no
/// submission ever re-probes the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSession {
    catalog: VoiceCatalog,
}

impl SpeechSession {
    pub fn new(catalog: VoiceCatalog) -> Self {
        Self { catalog }
    }

    pub fn online() -> Self {
        Self::new(VoiceCatalog::cloud())
    }

    /// Enumerates local voices. Blocking.
    pub fn offline(factory: &dyn EngineFactory) -> Self {
        Self::new(VoiceCatalog::local(factory))
    }

    /// Probe connectivity once and build the matching catalog.
    ///
    /// Voice enumeration talks to the host engine synchronously, so it runs
    /// on the blocking pool.
    pub async fn detect(probe: &ConnectivityProbe, factory: Arc<dyn EngineFactory>) -> Self {
        let mode = Mode::from_reachability(probe.is_online().await);
        log::info!("Speech mode: {}", mode.label());

        match mode {
            Mode::Online => Self::online(),
            Mode::Offline => {
                match tokio::task::spawn_blocking(move || Self::offline(factory.as_ref())).await {
                    Ok(session) => session,
                    Err(e) => {
                        log::error!("voice enumeration task failed: {e}");
                        Self::new(VoiceCatalog::new(Mode::Offline, Vec::new()))
                    }
                }
            }
        }
    }

    pub fn mode(&self) -> Mode {
        self.catalog.mode()
    }

    pub fn catalog(&self) -> &VoiceCatalog {
        &self.catalog
    }
}
