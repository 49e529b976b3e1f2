//! Selection-driven inspector state with a stale-response guard.
//!
//! [`InspectorSession`] is the synchronous state machine: every new selection
//! (or new collections) re-runs local resolution and, when a lexicon id is
//! known, issues a [`BundleTicket`]. The bundle result is applied only if the
//! ticket is still the latest one issued. [`Inspector`] drives a session
//! against a [`LexiconBundleClient`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quran_lexicon_client::{LexiconBundleClient, LexiconError};
use quran_lexicon_types::{LexiconBundle, MorphologySelection};
use quran_morphology::{LocalCollections, LocalResolution, RemoteView, ResolvedProfile, Resolver};
use serde::Serialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    ResolvingLocal,
    ResolvingRemote,
    Resolved,
}

/// A remote bundle request issued for one selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BundleTicket {
    pub sequence: u64,
    pub lexicon_id: String,
}

#[derive(Clone, Debug, Default)]
enum RemoteState {
    #[default]
    None,
    Loading,
    Ready(Arc<LexiconBundle>),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct InspectorSession {
    resolver: Resolver,
    collections: LocalCollections,
    selection: Option<MorphologySelection>,
    local: Option<LocalResolution>,
    remote: RemoteState,
    sequence: u64,
    phase: Phase,
}

impl InspectorSession {
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Sequence number of the latest issued request.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn selection(&self) -> Option<&MorphologySelection> {
        self.selection.as_ref()
    }

    pub fn local(&self) -> Option<&LocalResolution> {
        self.local.as_ref()
    }

    pub fn set_selection(&mut self, selection: MorphologySelection) -> Option<BundleTicket> {
        self.selection = Some(selection);
        self.rerun()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
        self.rerun();
    }

    pub fn set_collections(&mut self, collections: LocalCollections) -> Option<BundleTicket> {
        self.collections = collections;
        self.rerun()
    }

    /// Re-resolve locally. Every call supersedes any outstanding ticket.
    fn rerun(&mut self) -> Option<BundleTicket> {
        self.sequence += 1;
        self.remote = RemoteState::None;
        self.phase = Phase::ResolvingLocal;

        self.local = self
            .selection
            .as_ref()
            .and_then(|selection| self.resolver.resolve_local(selection, &self.collections));
        let Some(local) = &self.local else {
            self.phase = Phase::Idle;
            return None;
        };

        match local.lexicon_id() {
            Some(lexicon_id) => {
                self.remote = RemoteState::Loading;
                self.phase = Phase::ResolvingRemote;
                Some(BundleTicket {
                    sequence: self.sequence,
                    lexicon_id: lexicon_id.to_string(),
                })
            }
            None => {
                self.phase = Phase::Resolved;
                None
            }
        }
    }

    /// Apply a bundle result if `ticket` is still current. Returns whether it was applied.
    pub fn apply_bundle(
        &mut self,
        ticket: &BundleTicket,
        result: Result<Arc<LexiconBundle>, LexiconError>,
    ) -> bool {
        if ticket.sequence != self.sequence {
            debug!(
                lexicon_id = %ticket.lexicon_id,
                ticket = ticket.sequence,
                latest = self.sequence,
                "discarding stale bundle response"
            );
            return false;
        }
        self.remote = match result {
            Ok(bundle) => RemoteState::Ready(bundle),
            Err(err) => RemoteState::Failed(err.to_string()),
        };
        self.phase = Phase::Resolved;
        true
    }

    /// The display profile for the current state, rebuilt on every call.
    pub fn profile(&self) -> ResolvedProfile {
        let Some(local) = &self.local else {
            return ResolvedProfile::default();
        };
        let view = match &self.remote {
            RemoteState::None => RemoteView::default(),
            RemoteState::Loading => RemoteView {
                loading: true,
                ..RemoteView::default()
            },
            RemoteState::Ready(bundle) => RemoteView::ready(bundle),
            RemoteState::Failed(message) => RemoteView {
                error: Some(message.as_str()),
                ..RemoteView::default()
            },
        };
        ResolvedProfile::build(local, view)
    }
}

/// A session shared between callers, fetching bundles through the client.
pub struct Inspector {
    session: Mutex<InspectorSession>,
    client: Arc<LexiconBundleClient>,
}

impl Inspector {
    pub fn new(resolver: Resolver, client: Arc<LexiconBundleClient>) -> Self {
        Self {
            session: Mutex::new(InspectorSession::new(resolver)),
            client,
        }
    }

    fn session(&self) -> MutexGuard<'_, InspectorSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> Phase {
        self.session().phase()
    }

    pub fn profile(&self) -> ResolvedProfile {
        self.session().profile()
    }

    /// Replace the collections and settle the remote fetch they trigger.
    pub async fn set_collections(&self, collections: LocalCollections, refresh: bool) -> ResolvedProfile {
        let ticket = self.session().set_collections(collections);
        self.settle(ticket, refresh).await
    }

    /// Select a word and settle its remote fetch.
    ///
    /// Returns the profile as of when this call's fetch settled; if another
    /// selection arrived meanwhile, that is the newer selection's profile.
    pub async fn select(&self, selection: MorphologySelection, refresh: bool) -> ResolvedProfile {
        let ticket = self.session().set_selection(selection);
        self.settle(ticket, refresh).await
    }

    async fn settle(&self, ticket: Option<BundleTicket>, refresh: bool) -> ResolvedProfile {
        let Some(ticket) = ticket else {
            return self.profile();
        };
        if !refresh && let Some(bundle) = self.client.cached(&ticket.lexicon_id) {
            let mut session = self.session();
            session.apply_bundle(&ticket, Ok(bundle));
            return session.profile();
        }
        let result = self.client.get_lexicon_bundle(&ticket.lexicon_id, refresh).await;
        let mut session = self.session();
        session.apply_bundle(&ticket, result);
        session.profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quran_lexicon_types::LexiconLinkRecord;
    use serde_json::json;

    fn collections() -> LocalCollections {
        serde_json::from_value(json!({
            "morphology_items": [
                { "surface_ar": "كتب", "word_location": "2:5:3", "ar_u_lexicon": "LX-a" },
                { "surface_ar": "قال", "word_location": "2:6:1", "ar_u_lexicon": "LX-b" },
                { "surface_ar": "ذلك", "word_location": "2:2:1" }
            ]
        }))
        .unwrap()
    }

    fn bundle(id: &str, verb_form: &str) -> Arc<LexiconBundle> {
        Arc::new(LexiconBundle {
            lexicon_id: id.into(),
            morphology_links: vec![LexiconLinkRecord {
                ar_u_lexicon: Some(id.into()),
                verb_form: Some(verb_form.into()),
                ..LexiconLinkRecord::default()
            }],
            ..LexiconBundle::default()
        })
    }

    #[test]
    fn phases_follow_the_selection() {
        let mut session = InspectorSession::new(Resolver::default());
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.set_collections(collections()).is_none());

        let ticket = session
            .set_selection(MorphologySelection::new("كتب", "2:5:3"))
            .unwrap();
        assert_eq!(ticket.lexicon_id, "LX-a");
        assert_eq!(session.phase(), Phase::ResolvingRemote);
        assert!(session.profile().remote_loading);

        assert!(session.apply_bundle(&ticket, Ok(bundle("LX-a", "I"))));
        assert_eq!(session.phase(), Phase::Resolved);
        assert!(!session.profile().remote_loading);

        // No lexicon id anywhere: resolved locally, nothing to fetch.
        assert!(session.set_selection(MorphologySelection::new("ذلك", "2:2:1")).is_none());
        assert_eq!(session.phase(), Phase::Resolved);

        session.clear_selection();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.profile().has_selection());
    }

    #[test]
    fn stale_bundle_is_discarded() {
        let mut session = InspectorSession::new(Resolver::default());
        session.set_collections(collections());
        let first = session
            .set_selection(MorphologySelection::new("كتب", "2:5:3"))
            .unwrap();
        let second = session
            .set_selection(MorphologySelection::new("قال", "2:6:1"))
            .unwrap();
        assert!(second.sequence > first.sequence);

        assert!(!session.apply_bundle(&first, Ok(bundle("LX-a", "I"))));
        let profile = session.profile();
        assert_eq!(profile.lexicon_id.as_deref(), Some("LX-b"));
        assert!(profile.remote_loading);
        assert_eq!(profile.verb_form, None);

        assert!(session.apply_bundle(&second, Ok(bundle("LX-b", "II"))));
        assert_eq!(session.profile().lexicon_id.as_deref(), Some("LX-b"));
    }

    #[test]
    fn failures_surface_as_profile_errors() {
        let mut session = InspectorSession::new(Resolver::default());
        session.set_collections(collections());
        let ticket = session
            .set_selection(MorphologySelection::new("كتب", "2:5:3"))
            .unwrap();
        session.apply_bundle(
            &ticket,
            Err(LexiconError::Api {
                message: "Lexicon not found".into(),
            }),
        );
        let profile = session.profile();
        assert_eq!(profile.remote_error.as_deref(), Some("Lexicon not found"));
        assert_eq!(profile.root, None);
        assert_eq!(profile.word, "كتب");
    }
}
