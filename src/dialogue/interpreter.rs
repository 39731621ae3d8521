use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{Action, DialogueError, Frontier, Npc, NodeKey, PresentAction};
use crate::backend::{
    ChoiceHandle, EpisodeId, InputBackend, InputEvent, PresentHandle, Selection,
};
use crate::collection::{CollectionRegistry, Item};

/// Where the interpreter stands between two events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No node is on screen waiting for a selection.
    Idle,
    /// A node was rendered and waits for exactly one selection.
    Presenting,
    /// The host tore the session down.
    Ended,
}

/// A navigation request made by an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Resume,
    Jump(NodeKey),
    Restart(NodeKey),
}

/// Handed to every action; the only way an action can steer the conversation.
///
/// Requests are carried out in call order once the action returns.
#[derive(Debug, Default)]
pub struct ActionContext {
    requests: Vec<Navigation>,
}

impl ActionContext {
    /// Continue with a random node from the frontier.
    pub fn resume(&mut self) {
        self.requests.push(Navigation::Resume);
    }

    /// Continue with `key` directly.
    pub fn jump(&mut self, key: impl Into<NodeKey>) {
        self.requests.push(Navigation::Jump(key.into()));
    }

    /// Make `key` eligible for a later random draw. Does not move the
    /// conversation by itself; pair it with [`resume`](Self::resume) to leave.
    pub fn restart(&mut self, key: impl Into<NodeKey>) {
        self.requests.push(Navigation::Restart(key.into()));
    }

    pub fn requests(&self) -> &[Navigation] {
        &self.requests
    }
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The conversation moved on and now presents `key`.
    Presenting(NodeKey),
    /// The action navigated nowhere; the conversation waits forever.
    Stalled,
}

struct Episode {
    id: EpisodeId,
    key: NodeKey,
    actions: Vec<Action>,
    present: Option<(Vec<Item>, PresentAction)>,
}

/// Drives one conversation at a time through an input backend.
pub struct Interpreter<B> {
    backend: B,
    collections: CollectionRegistry,
    frontier: Frontier,
    rng: StdRng,
    phase: Phase,
    episode: Option<Episode>,
    episodes_started: u64,
}

impl<B: InputBackend> Interpreter<B> {
    pub fn new(backend: B, collections: CollectionRegistry) -> Self {
        Self {
            backend,
            collections,
            frontier: Frontier::new(),
            rng: StdRng::from_entropy(),
            phase: Phase::Idle,
            episode: None,
            episodes_started: 0,
        }
    }

    /// Replace the random source used for text variants and frontier draws.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Begin a fresh session: the frontier becomes `entry_keys`, nothing is shown yet.
    pub fn start_session<I>(&mut self, npc: &Npc, entry_keys: I)
    where
        I: IntoIterator<Item = NodeKey>,
    {
        self.frontier = entry_keys.into_iter().collect();
        self.episode = None;
        self.phase = Phase::Idle;
        info!(
            "Session started with {} (frontier={:?})",
            npc.identity(),
            self.frontier
        );
    }

    /// Tear the session down. Pending selections become protocol violations.
    pub fn end_session(&mut self) {
        self.episode = None;
        self.phase = Phase::Ended;
        self.backend.reset();
        info!("Session ended");
    }

    /// Render `key` and wait for a selection.
    ///
    /// On failure the frontier is left exactly as it was before the call and
    /// the previous episode (if any) stays live.
    pub fn visit(&mut self, npc: &Npc, key: NodeKey) -> Result<(), DialogueError> {
        if self.phase == Phase::Ended {
            return Err(DialogueError::SessionEnded);
        }

        let removed_at = self.frontier.remove_if_present(&key);
        if let Err(err) = self.present(npc, &key) {
            if let Some(index) = removed_at {
                self.frontier.restore(index, key);
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn visit_random_frontier_member(&mut self, npc: &Npc) -> Result<(), DialogueError> {
        if self.phase == Phase::Ended {
            return Err(DialogueError::SessionEnded);
        }
        let key = self.draw()?;
        self.visit(npc, key)
    }

    fn draw(&mut self) -> Result<NodeKey, DialogueError> {
        let key = self.frontier.pick_random_or_fail(&mut self.rng)?.clone();
        debug!("Drew '{key}' from frontier {:?}", self.frontier);
        Ok(key)
    }

    fn present(&mut self, npc: &Npc, key: &NodeKey) -> Result<(), DialogueError> {
        let node = npc.graph().lookup(key)?;
        let text = node.render_text(npc, &mut self.rng);
        let choices = node.render_choices(npc);

        let present = match choices.presentation {
            Some(presentation) => {
                let items = self.collections.resolve(&presentation.collection_kind)?;
                Some((items.to_vec(), presentation.action))
            }
            None => None,
        };

        self.episodes_started += 1;
        let id = EpisodeId(self.episodes_started);
        info!("Visiting {}:{key} (episode {})", npc.identity(), id.0);

        self.backend.reset();
        self.backend.add_text(&text);
        let mut actions = Vec::with_capacity(choices.fixed_choices.len());
        for (index, choice) in choices.fixed_choices.into_iter().enumerate() {
            self.backend
                .add_choice(&choice.label, ChoiceHandle { episode: id, index });
            actions.push(choice.action);
        }
        if let Some((items, _)) = &present {
            self.backend.add_present(items, PresentHandle { episode: id });
        }

        self.episode = Some(Episode {
            id,
            key: key.clone(),
            actions,
            present,
        });
        self.phase = Phase::Presenting;
        Ok(())
    }

    /// Feed an input event to the backend and act on whatever it selects.
    pub fn handle_event(
        &mut self,
        npc: &mut Npc,
        event: &InputEvent,
    ) -> Result<Option<Transition>, DialogueError> {
        match self.backend.respond(event) {
            Some(selection) => self.select(npc, selection).map(Some),
            None => Ok(None),
        }
    }

    /// Run the action behind `selection` and follow its navigation requests.
    pub fn select(
        &mut self,
        npc: &mut Npc,
        selection: Selection,
    ) -> Result<Transition, DialogueError> {
        self.check_selection(&selection).inspect_err(|err| warn!("{err}"))?;
        let Some(episode) = self.episode.take() else {
            return Err(DialogueError::BackendProtocolViolation(
                "no episode is presenting".into(),
            ));
        };
        self.phase = Phase::Idle;
        debug!("Selection {selection:?} in episode {} ({})", episode.id.0, episode.key);

        let mut ctx = ActionContext::default();
        match selection {
            Selection::Choice(handle) => {
                if let Some(action) = episode.actions.into_iter().nth(handle.index) {
                    action(&mut npc.state, &mut ctx);
                }
            }
            Selection::Present(_, item) => {
                if let Some((_, action)) = episode.present {
                    action(&mut npc.state, &mut ctx, &item);
                }
            }
        }

        self.follow(npc, ctx.requests)
    }

    fn check_selection(&self, selection: &Selection) -> Result<(), DialogueError> {
        if self.phase == Phase::Ended {
            return Err(DialogueError::BackendProtocolViolation(
                "selection after the session ended".into(),
            ));
        }
        let Some(episode) = &self.episode else {
            return Err(DialogueError::BackendProtocolViolation(
                "selection while no node is presenting".into(),
            ));
        };
        if selection.episode() != episode.id {
            return Err(DialogueError::BackendProtocolViolation(format!(
                "selection for episode {} but episode {} is live",
                selection.episode().0,
                episode.id.0
            )));
        }
        match selection {
            Selection::Choice(handle) if handle.index >= episode.actions.len() => {
                Err(DialogueError::BackendProtocolViolation(format!(
                    "choice {} out of {}",
                    handle.index,
                    episode.actions.len()
                )))
            }
            Selection::Present(_, item) => match &episode.present {
                Some((items, _)) if items.contains(item) => Ok(()),
                Some(_) => Err(DialogueError::BackendProtocolViolation(format!(
                    "'{item}' was not offered"
                ))),
                None => Err(DialogueError::BackendProtocolViolation(
                    "nothing can be presented here".into(),
                )),
            },
            Selection::Choice(_) => Ok(()),
        }
    }

    fn follow(
        &mut self,
        npc: &Npc,
        requests: Vec<Navigation>,
    ) -> Result<Transition, DialogueError> {
        let moves = requests
            .iter()
            .filter(|r| !matches!(r, Navigation::Restart(_)))
            .count();
        if moves > 1 {
            warn!("Action navigated {moves} times; the last one wins");
        }

        let mut transition = Transition::Stalled;
        for request in requests {
            trace!("Navigation: {request:?}");
            match request {
                Navigation::Restart(key) => self.frontier.push(key),
                Navigation::Jump(key) => {
                    self.visit(npc, key.clone())?;
                    transition = Transition::Presenting(key);
                }
                Navigation::Resume => {
                    let key = self.draw()?;
                    self.visit(npc, key.clone())?;
                    transition = Transition::Presenting(key);
                }
            }
        }

        if transition == Transition::Stalled {
            warn!("Conversation with {} stalled", npc.identity());
        }
        Ok(transition)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The node currently waiting for a selection.
    pub fn current_key(&self) -> Option<&NodeKey> {
        self.episode.as_ref().map(|e| &e.key)
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Page, Pick};
    use crate::dialogue::{ChoiceSet, ConversationGraph, DialogueNode};

    /// Keeps whatever the interpreter renders; never selects on its own.
    #[derive(Default)]
    struct Recorder {
        page: Page,
        resets: usize,
    }

    impl InputBackend for Recorder {
        fn reset(&mut self) {
            self.page = Page::default();
            self.resets += 1;
        }

        fn add_text(&mut self, text: &str) {
            self.page.text.push(text.to_owned());
        }

        fn add_choice(&mut self, label: &str, on_select: ChoiceHandle) {
            self.page.choices.push((label.to_owned(), on_select));
        }

        fn add_present(&mut self, collection: &[Item], on_select: PresentHandle) {
            self.page.present = Some((collection.to_vec(), on_select));
        }

        fn respond(&mut self, _event: &InputEvent) -> Option<Selection> {
            None
        }
    }

    fn interpreter() -> Interpreter<Recorder> {
        Interpreter::new(
            Recorder::default(),
            CollectionRegistry::new().with_collection("things", ["goblet", "pants"]),
        )
        .with_rng(StdRng::seed_from_u64(42))
    }

    fn npc() -> Npc {
        let graph = ConversationGraph::new()
            .with_node(
                0,
                DialogueNode::new("root").with_choices(|_| {
                    ChoiceSet::new()
                        .choice("go", |_, ctx| ctx.jump("a"))
                        .choice("count", |state, ctx| {
                            state.increment("count", 1);
                            ctx.jump(0);
                        })
                        .present("things", |state, ctx, item| {
                            state.set("presented", item.name());
                            ctx.resume();
                        })
                }),
            )
            .with_node("a", DialogueNode::new("leaf"))
            .with_node(
                "back",
                DialogueNode::new("back").with_choices(|_| {
                    ChoiceSet::new().choice("back", |_, ctx| {
                        ctx.restart(0);
                        ctx.resume();
                    })
                }),
            )
            .with_node(
                "loop",
                DialogueNode::new("loop").with_choices(|_| {
                    ChoiceSet::new().choice("again", |_, ctx| {
                        ctx.jump("loop");
                        ctx.restart("loop");
                    })
                }),
            )
            .with_node(
                "queue",
                DialogueNode::new("queue")
                    .with_choices(|_| ChoiceSet::new().choice("later", |_, ctx| ctx.restart("a"))),
            )
            .with_node(
                "hang",
                DialogueNode::new("hang").with_choices(|_| {
                    ChoiceSet::new().choice("wait", |state, _| {
                        state.increment("waited", 1);
                    })
                }),
            )
            .with_node(
                "bad",
                DialogueNode::new("bad")
                    .with_choices(|_| ChoiceSet::new().present("people", |_, ctx, _| ctx.resume())),
            );
        Npc::new("catelyn", graph)
    }

    fn pick(interp: &Interpreter<Recorder>, pick: Pick) -> Selection {
        interp.backend().page.selection_for(pick).unwrap()
    }

    #[test]
    fn test_visit_renders_node() {
        let mut interp = interpreter();
        let npc = npc();
        interp.start_session(&npc, [NodeKey::entry()]);
        assert_eq!(interp.phase(), Phase::Idle);

        interp.visit(&npc, NodeKey::entry()).unwrap();

        let page = &interp.backend().page;
        assert_eq!(page.text, vec!["root".to_string()]);
        assert_eq!(page.labels().collect::<Vec<_>>(), vec!["go", "count"]);
        assert_eq!(page.items(), &[Item::from("goblet"), Item::from("pants")]);
        assert_eq!(interp.phase(), Phase::Presenting);
        assert!(interp.frontier().is_empty());
    }

    #[test]
    fn test_jump_moves_to_target() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, []);
        interp.visit(&npc, NodeKey::entry()).unwrap();

        let selection = pick(&interp, Pick::Choice(0));
        let transition = interp.select(&mut npc, selection).unwrap();

        assert_eq!(transition, Transition::Presenting(NodeKey::from("a")));
        assert_eq!(interp.backend().page.text, vec!["leaf".to_string()]);
        assert!(interp.backend().page.is_stalled());
    }

    #[test]
    fn test_action_mutates_state() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, []);
        interp.visit(&npc, NodeKey::entry()).unwrap();

        for _ in 0..3 {
            let selection = pick(&interp, Pick::Choice(1));
            interp.select(&mut npc, selection).unwrap();
        }
        assert_eq!(npc.state.get_i64("count"), Some(3));
        assert!(interp.frontier().is_empty());
    }

    #[test]
    fn test_present_passes_item() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, ["a".into()]);
        interp.visit(&npc, NodeKey::entry()).unwrap();

        let selection = pick(&interp, Pick::Present(1));
        let transition = interp.select(&mut npc, selection).unwrap();

        assert_eq!(
            npc.state.get("presented"),
            Some(&serde_json::Value::from("pants"))
        );
        assert_eq!(transition, Transition::Presenting(NodeKey::from("a")));
    }

    #[test]
    fn test_restart_then_resume_returns_to_key() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, []);
        interp.visit(&npc, "back".into()).unwrap();

        let selection = pick(&interp, Pick::Choice(0));
        let transition = interp.select(&mut npc, selection).unwrap();

        assert_eq!(transition, Transition::Presenting(NodeKey::entry()));
        assert_eq!(interp.backend().page.text, vec!["root".to_string()]);
        assert!(interp.frontier().is_empty());
    }

    #[test]
    fn test_restart_after_jump_keeps_key_in_frontier() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, []);
        interp.visit(&npc, "loop".into()).unwrap();

        let selection = pick(&interp, Pick::Choice(0));
        interp.select(&mut npc, selection).unwrap();

        assert_eq!(interp.frontier().count(&NodeKey::from("loop")), 1);
    }

    #[test]
    fn test_resume_on_empty_frontier_fails() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, []);
        interp.visit(&npc, NodeKey::entry()).unwrap();

        let selection = pick(&interp, Pick::Present(0));
        assert_eq!(
            interp.select(&mut npc, selection),
            Err(DialogueError::FrontierExhausted)
        );
        assert_eq!(
            interp.visit_random_frontier_member(&npc),
            Err(DialogueError::FrontierExhausted)
        );
    }

    #[test]
    fn test_unsupported_collection_leaves_frontier_untouched() {
        let mut interp = interpreter();
        let npc = npc();
        interp.start_session(&npc, ["a".into(), "bad".into(), "a".into()]);
        let before = interp.frontier().clone();

        assert_eq!(
            interp.visit(&npc, "bad".into()),
            Err(DialogueError::UnsupportedCollection("people".into()))
        );
        assert_eq!(interp.frontier(), &before);
        assert_eq!(interp.backend().resets, 0);
        assert_eq!(interp.phase(), Phase::Idle);
    }

    #[test]
    fn test_unknown_node_is_reported() {
        let mut interp = interpreter();
        let npc = npc();
        interp.start_session(&npc, ["nowhere".into()]);

        assert_eq!(
            interp.visit_random_frontier_member(&npc),
            Err(DialogueError::UnknownNode("nowhere".into()))
        );
        assert_eq!(interp.frontier().len(), 1);
    }

    #[test]
    fn test_second_selection_is_a_protocol_violation() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, ["a".into()]);
        interp.visit(&npc, NodeKey::entry()).unwrap();

        let stale = pick(&interp, Pick::Choice(1));
        interp.select(&mut npc, stale.clone()).unwrap();
        let frontier = interp.frontier().clone();

        assert!(matches!(
            interp.select(&mut npc, stale),
            Err(DialogueError::BackendProtocolViolation(_))
        ));
        assert_eq!(interp.frontier(), &frontier);
        assert_eq!(npc.state.get_i64("count"), Some(1));
        assert_eq!(interp.phase(), Phase::Presenting);
    }

    #[test]
    fn test_action_without_navigation_stalls() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, [NodeKey::entry()]);
        interp.visit(&npc, "hang".into()).unwrap();

        let selection = pick(&interp, Pick::Choice(0));
        assert_eq!(
            interp.select(&mut npc, selection.clone()),
            Ok(Transition::Stalled)
        );
        assert_eq!(interp.phase(), Phase::Idle);
        assert_eq!(interp.current_key(), None);
        assert_eq!(npc.state.get_i64("waited"), Some(1));
        assert!(matches!(
            interp.select(&mut npc, selection),
            Err(DialogueError::BackendProtocolViolation(_))
        ));
        assert_eq!(interp.frontier().len(), 1);
    }

    #[test]
    fn test_restart_alone_stalls_and_queues_key() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, Vec::<NodeKey>::new());
        interp.visit(&npc, "queue".into()).unwrap();
        let shown = interp.backend().page.clone();
        let resets = interp.backend().resets;
        let state = npc.state.clone();

        let selection = pick(&interp, Pick::Choice(0));
        assert_eq!(interp.select(&mut npc, selection), Ok(Transition::Stalled));
        assert_eq!(interp.backend().page, shown);
        assert_eq!(interp.backend().resets, resets);
        assert_eq!(npc.state, state);
        assert_eq!(interp.frontier().count(&"a".into()), 1);
        assert_eq!(interp.phase(), Phase::Idle);
    }

    #[test]
    fn test_stale_episode_selection_is_rejected() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, []);
        interp.visit(&npc, "a".into()).unwrap();
        interp.visit(&npc, NodeKey::entry()).unwrap();
        let selection = pick(&interp, Pick::Choice(0));
        interp.select(&mut npc, selection.clone()).unwrap();

        assert!(matches!(
            interp.select(&mut npc, selection),
            Err(DialogueError::BackendProtocolViolation(_))
        ));
    }

    #[test]
    fn test_unoffered_item_is_rejected() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, ["a".into()]);
        interp.visit(&npc, NodeKey::entry()).unwrap();

        let Selection::Present(handle, _) = pick(&interp, Pick::Present(0)) else {
            panic!("expected a present selection");
        };
        assert!(matches!(
            interp.select(&mut npc, Selection::Present(handle, Item::from("crown"))),
            Err(DialogueError::BackendProtocolViolation(_))
        ));
        assert_eq!(interp.phase(), Phase::Presenting);
        assert!(npc.state.get("presented").is_none());
    }

    #[test]
    fn test_ended_session_rejects_visits() {
        let mut interp = interpreter();
        let mut npc = npc();
        interp.start_session(&npc, [NodeKey::entry()]);
        interp.visit(&npc, NodeKey::entry()).unwrap();
        let selection = pick(&interp, Pick::Choice(0));

        interp.end_session();

        assert_eq!(interp.phase(), Phase::Ended);
        assert_eq!(
            interp.visit(&npc, NodeKey::entry()),
            Err(DialogueError::SessionEnded)
        );
        assert!(matches!(
            interp.select(&mut npc, selection),
            Err(DialogueError::BackendProtocolViolation(_))
        ));

        interp.start_session(&npc, [NodeKey::entry()]);
        assert!(interp.visit_random_frontier_member(&npc).is_ok());
    }
}
