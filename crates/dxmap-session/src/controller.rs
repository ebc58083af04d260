//! The interaction controller: one [`Session`] per clinician sitting.
//!
//! The session owns the store, the id allocator, and the aggregation ledger,
//! maps surface gestures onto protocol operations, and gates the one
//! suspendable operation -- the oracle call -- behind a busy flag so at most
//! one call is ever in flight. An aggregation point is converted optimistically
//! before the call starts; if the oracle fails, the fallback expansion runs, so
//! every activation terminates in a new branch.

use tracing::{debug, warn};

use dxmap_core::{GraphStore, IdAllocator, NodeId, NodeKind};

use crate::aggregator::{symptom_union, AggregatorLedger};
use crate::error::SessionError;
use crate::expansion::{expand, seed};
use crate::oracle::{Oracle, OracleRequest, OracleResponse};
use crate::surface::{GraphSurface, HoverCard, SurfaceEvent};

/// Request to open the note-entry dialog for a clicked test node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPrompt {
    pub test: NodeId,
    pub name: String,
}

/// Payload handed to the external literature-lookup view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteratureHandoff {
    pub diagnosis: String,
    pub symptoms: Vec<String>,
}

/// What a click gesture resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// Nothing actionable (unknown node, symptom node, gesture while busy).
    Ignored,
    /// A test node: the shell should collect a note and call
    /// [`Session::complete_test`].
    TestPrompt(TestPrompt),
    /// An aggregation point was activated and its branch expanded.
    Activated,
    /// A diagnosis node: route to the literature view.
    Handoff(LiteratureHandoff),
}

/// One decision-map session.
pub struct Session<O> {
    store: GraphStore,
    alloc: IdAllocator,
    ledger: AggregatorLedger,
    oracle: O,
    busy: bool,
    rendered_revision: u64,
}

impl<O: Oracle> Session<O> {
    /// Creates an empty session around an oracle.
    pub fn new(oracle: O) -> Self {
        Session {
            store: GraphStore::new(),
            alloc: IdAllocator::new(),
            ledger: AggregatorLedger::new(),
            oracle,
            busy: false,
            rendered_revision: 0,
        }
    }

    /// Read-only view of the map.
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// `true` while an oracle call is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Seeds the map from the intake symptom list and expands the first
    /// branch. Returns the root symptom node id.
    pub async fn start(
        &mut self,
        intake: Vec<String>,
        surface: &mut dyn GraphSurface,
    ) -> Result<NodeId, SessionError> {
        let root = seed(&mut self.store, &mut self.alloc, intake)?;
        self.render_if_dirty(surface);

        self.busy = true;
        let response = self.query_oracle().await;
        let result = expand(&mut self.store, &mut self.alloc, &root, response.as_ref());
        self.busy = false;
        self.render_if_dirty(surface);
        result?;
        Ok(root)
    }

    /// Routes one surface gesture.
    pub async fn handle_event(
        &mut self,
        event: SurfaceEvent,
        surface: &mut dyn GraphSurface,
    ) -> Result<ClickOutcome, SessionError> {
        match event {
            SurfaceEvent::Hover(id) => {
                if self.busy {
                    // No hover cards while converting: a card could reference
                    // a node the in-flight expansion is about to reshape.
                    return Ok(ClickOutcome::Ignored);
                }
                if let Some(card) = self.hover_card(&id) {
                    surface.show_hover_card(card);
                }
                Ok(ClickOutcome::Ignored)
            }
            SurfaceEvent::Blur => {
                surface.hide_hover_card();
                Ok(ClickOutcome::Ignored)
            }
            SurfaceEvent::Click(id) => self.handle_click(id, surface).await,
        }
    }

    async fn handle_click(
        &mut self,
        id: NodeId,
        surface: &mut dyn GraphSurface,
    ) -> Result<ClickOutcome, SessionError> {
        let Some(node) = self.store.node(&id) else {
            debug!(node = %id, "click on unknown node ignored");
            return Ok(ClickOutcome::Ignored);
        };
        match node.kind() {
            NodeKind::Test => {
                let name = node
                    .payload
                    .as_test()
                    .map(|t| t.name.clone())
                    .unwrap_or_default();
                Ok(ClickOutcome::TestPrompt(TestPrompt { test: id, name }))
            }
            NodeKind::Pending => {
                if self.activate_aggregator(&id, surface).await? {
                    Ok(ClickOutcome::Activated)
                } else {
                    Ok(ClickOutcome::Ignored)
                }
            }
            NodeKind::Diagnosis => {
                let label = node
                    .payload
                    .as_diagnosis()
                    .map(|d| d.label.clone())
                    .unwrap_or_default();
                Ok(ClickOutcome::Handoff(self.force_diagnosis(&label)))
            }
            NodeKind::Symptom => Ok(ClickOutcome::Ignored),
        }
    }

    /// Commits a test-completion dialog: buffers the note through the
    /// aggregation protocol. Never queries the oracle directly.
    pub fn complete_test(
        &mut self,
        test: &NodeId,
        note: &str,
        surface: &mut dyn GraphSurface,
    ) -> Result<(), SessionError> {
        self.ledger
            .record_completion(&mut self.store, &mut self.alloc, test, note)?;
        self.render_if_dirty(surface);
        Ok(())
    }

    /// Activates an aggregation point: converts it in place, queries the
    /// oracle with the merged symptom set, and expands the branch (fallback
    /// on failure). Returns `false` for a no-op activation -- already
    /// converted, unknown id, or a call already in flight.
    pub async fn activate_aggregator(
        &mut self,
        id: &NodeId,
        surface: &mut dyn GraphSurface,
    ) -> Result<bool, SessionError> {
        if self.busy {
            debug!(node = %id, "activation ignored; oracle call in flight");
            return Ok(false);
        }
        let Some(_merged) = self.ledger.activate(&mut self.store, id)? else {
            return Ok(false);
        };

        // Optimistic conversion is already committed; the map stays visually
        // consistent while the call is outstanding.
        self.busy = true;
        surface.hide_hover_card();
        self.render_if_dirty(surface);

        let response = self.query_oracle().await;
        let result = expand(&mut self.store, &mut self.alloc, id, response.as_ref());
        self.busy = false;
        self.render_if_dirty(surface);
        result?;
        Ok(true)
    }

    /// Bypasses the graph: hands the supplied label plus the current
    /// graph-wide symptom set to the literature view.
    pub fn force_diagnosis(&self, label: &str) -> LiteratureHandoff {
        LiteratureHandoff {
            diagnosis: label.to_string(),
            symptoms: symptom_union(&self.store),
        }
    }

    /// One oracle round trip; failures collapse to `None` (fallback path).
    async fn query_oracle(&self) -> Option<OracleResponse> {
        let mut request = OracleRequest::for_symptoms(symptom_union(&self.store));
        request.previous_tests = self
            .store
            .nodes()
            .filter_map(|n| n.payload.as_test().map(|t| t.name.clone()))
            .collect();
        match self.oracle.next_step(&request).await {
            Ok(response) => Some(response),
            Err(err) => {
                warn!(error = %err, "oracle unavailable; falling back");
                None
            }
        }
    }

    fn hover_card(&self, id: &NodeId) -> Option<HoverCard> {
        let node = self.store.node(id)?;
        let card = match &node.payload {
            dxmap_core::NodePayload::Symptom(p) => HoverCard::Symptom {
                id: id.clone(),
                symptoms: p.symptoms.clone(),
            },
            dxmap_core::NodePayload::Diagnosis(p) => HoverCard::Diagnosis {
                id: id.clone(),
                label: p.label.clone(),
                confidence: p.confidence,
            },
            dxmap_core::NodePayload::Test(p) => HoverCard::Test {
                id: id.clone(),
                name: p.name.clone(),
                description: p.description.clone(),
                cost: p.cost,
            },
            dxmap_core::NodePayload::Pending(p) => HoverCard::Pending {
                id: id.clone(),
                noted_tests: p.notes.len(),
            },
        };
        Some(card)
    }

    fn render_if_dirty(&mut self, surface: &mut dyn GraphSurface) {
        let revision = self.store.revision();
        if revision != self.rendered_revision {
            surface.render(&self.store);
            self.rendered_revision = revision;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OracleError, TestAdvice};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Oracle returning scripted results in order; exhausted scripts fail
    /// like an unreachable service.
    struct ScriptedOracle {
        script: RefCell<VecDeque<Result<OracleResponse, OracleError>>>,
        calls: RefCell<Vec<OracleRequest>>,
    }

    impl ScriptedOracle {
        fn new(script: Vec<Result<OracleResponse, OracleError>>) -> Self {
            ScriptedOracle {
                script: RefCell::new(script.into()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self::new(Vec::new())
        }
    }

    impl Oracle for ScriptedOracle {
        async fn next_step(
            &self,
            request: &OracleRequest,
        ) -> Result<OracleResponse, OracleError> {
            self.calls.borrow_mut().push(request.clone());
            self.script.borrow_mut().pop_front().unwrap_or_else(|| {
                Err(OracleError::Transport {
                    reason: "script exhausted".into(),
                })
            })
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        renders: usize,
        cards: Vec<HoverCard>,
        hides: usize,
    }

    impl GraphSurface for RecordingSurface {
        fn render(&mut self, _store: &GraphStore) {
            self.renders += 1;
        }
        fn show_hover_card(&mut self, card: HoverCard) {
            self.cards.push(card);
        }
        fn hide_hover_card(&mut self) {
            self.hides += 1;
        }
    }

    fn influenza_response() -> OracleResponse {
        OracleResponse {
            all_symptoms: None,
            diseases: vec!["Influenza".into()],
            tests: vec![TestAdvice {
                test_name: "Rapid antigen".into(),
                test_description: "Nasal swab".into(),
                cost_weight: 10.0,
            }],
        }
    }

    #[tokio::test]
    async fn start_builds_the_seed_scenario() {
        let oracle = ScriptedOracle::new(vec![Ok(influenza_response())]);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();

        let root = session
            .start(vec!["fever".into(), "cough".into()], &mut surface)
            .await
            .unwrap();

        let store = session.store();
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 2);
        assert_eq!(
            store
                .node(&root)
                .unwrap()
                .payload
                .as_symptom()
                .unwrap()
                .symptoms,
            vec!["fever", "cough"]
        );
        let diagnoses = store.nodes_where(|n| n.kind() == NodeKind::Diagnosis);
        assert_eq!(diagnoses.len(), 1);
        assert_eq!(diagnoses[0].payload.as_diagnosis().unwrap().label, "Influenza");
        let tests = store.nodes_where(|n| n.kind() == NodeKind::Test);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].payload.as_test().unwrap().name, "Rapid antigen");
        assert!(surface.renders >= 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn unreachable_oracle_seeds_with_the_fallback_branch() {
        let mut session = Session::new(ScriptedOracle::unreachable());
        let mut surface = RecordingSurface::default();

        session
            .start(vec!["fever".into()], &mut surface)
            .await
            .unwrap();

        let store = session.store();
        // Root + one placeholder diagnosis + one placeholder test.
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.edge_count(), 2);
        let d = store.nodes_where(|n| n.kind() == NodeKind::Diagnosis);
        assert_eq!(
            d[0].payload.as_diagnosis().unwrap().label,
            crate::expansion::FALLBACK_DIAGNOSIS
        );
    }

    #[tokio::test]
    async fn complete_then_activate_merges_the_note() {
        let oracle = ScriptedOracle::new(vec![Ok(influenza_response())]);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();
        session
            .start(vec!["fever".into(), "cough".into()], &mut surface)
            .await
            .unwrap();

        let test_id = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Test)[0]
            .id
            .clone();

        // Clicking the test asks the shell for a note.
        let outcome = session
            .handle_event(SurfaceEvent::Click(test_id.clone()), &mut surface)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::TestPrompt(TestPrompt {
                test: test_id.clone(),
                name: "Rapid antigen".into(),
            })
        );

        session
            .complete_test(&test_id, "positive", &mut surface)
            .unwrap();
        let pending = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Pending);
        assert_eq!(pending.len(), 1);
        let agg_id = pending[0].id.clone();

        let outcome = session
            .handle_event(SurfaceEvent::Click(agg_id.clone()), &mut surface)
            .await
            .unwrap();
        assert_eq!(outcome, ClickOutcome::Activated);

        // Converted id now carries the merged symptom set (fallback branch:
        // the script is exhausted by the seed call).
        let merged = session
            .store()
            .node(&agg_id)
            .unwrap()
            .payload
            .as_symptom()
            .unwrap()
            .symptoms
            .clone();
        assert_eq!(merged, vec!["fever", "cough", "positive"]);
        // The failed oracle call still expanded a fallback branch under it.
        assert_eq!(session.store().children_of(&agg_id).len(), 2);
    }

    #[tokio::test]
    async fn second_activation_of_a_converted_id_is_a_no_op() {
        let oracle = ScriptedOracle::new(vec![Ok(influenza_response())]);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();
        session
            .start(vec!["fever".into()], &mut surface)
            .await
            .unwrap();
        let test_id = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Test)[0]
            .id
            .clone();
        session
            .complete_test(&test_id, "positive", &mut surface)
            .unwrap();
        let agg_id = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Pending)[0]
            .id
            .clone();

        assert!(session
            .activate_aggregator(&agg_id, &mut surface)
            .await
            .unwrap());
        let nodes_after = session.store().node_count();
        let edges_after = session.store().edge_count();

        assert!(!session
            .activate_aggregator(&agg_id, &mut surface)
            .await
            .unwrap());
        assert_eq!(session.store().node_count(), nodes_after);
        assert_eq!(session.store().edge_count(), edges_after);
    }

    #[tokio::test]
    async fn activation_sends_the_graph_wide_symptom_union() {
        let responses = vec![Ok(influenza_response()), Ok(influenza_response())];
        let oracle = ScriptedOracle::new(responses);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();
        session
            .start(vec!["fever".into(), "cough".into()], &mut surface)
            .await
            .unwrap();
        let test_id = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Test)[0]
            .id
            .clone();
        session
            .complete_test(&test_id, "positive", &mut surface)
            .unwrap();
        let agg_id = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Pending)[0]
            .id
            .clone();
        session
            .activate_aggregator(&agg_id, &mut surface)
            .await
            .unwrap();

        let calls = session.oracle.calls.borrow();
        assert_eq!(calls.len(), 2);
        // The second request carries the union plus the merged note, and
        // reports the already-performed test.
        assert_eq!(calls[1].symptoms, vec!["fever", "cough", "positive"]);
        assert!(calls[1]
            .previous_tests
            .contains(&"Rapid antigen".to_string()));
    }

    #[tokio::test]
    async fn hover_and_blur_drive_the_info_panel() {
        let oracle = ScriptedOracle::new(vec![Ok(influenza_response())]);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();
        let root = session
            .start(vec!["fever".into()], &mut surface)
            .await
            .unwrap();

        session
            .handle_event(SurfaceEvent::Hover(root.clone()), &mut surface)
            .await
            .unwrap();
        assert_eq!(surface.cards.len(), 1);
        assert!(matches!(surface.cards[0], HoverCard::Symptom { .. }));

        session
            .handle_event(SurfaceEvent::Blur, &mut surface)
            .await
            .unwrap();
        assert_eq!(surface.hides, 1);

        // Hovering something the store has never seen shows nothing.
        session
            .handle_event(SurfaceEvent::Hover(NodeId::from("D-99")), &mut surface)
            .await
            .unwrap();
        assert_eq!(surface.cards.len(), 1);
    }

    #[tokio::test]
    async fn diagnosis_click_hands_off_to_literature() {
        let oracle = ScriptedOracle::new(vec![Ok(influenza_response())]);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();
        session
            .start(vec!["fever".into(), "cough".into()], &mut surface)
            .await
            .unwrap();
        let dx_id = session
            .store()
            .nodes_where(|n| n.kind() == NodeKind::Diagnosis)[0]
            .id
            .clone();

        let outcome = session
            .handle_event(SurfaceEvent::Click(dx_id), &mut surface)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClickOutcome::Handoff(LiteratureHandoff {
                diagnosis: "Influenza".into(),
                symptoms: vec!["fever".into(), "cough".into()],
            })
        );
    }

    #[tokio::test]
    async fn force_diagnosis_bypasses_the_graph() {
        let oracle = ScriptedOracle::new(vec![Ok(influenza_response())]);
        let mut session = Session::new(oracle);
        let mut surface = RecordingSurface::default();
        session
            .start(vec!["fever".into()], &mut surface)
            .await
            .unwrap();

        let handoff = session.force_diagnosis("Atypical pneumonia");
        assert_eq!(handoff.diagnosis, "Atypical pneumonia");
        assert_eq!(handoff.symptoms, vec!["fever"]);
    }
}
