use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::backend::{
    AutomatedBackend, InputEvent, Page, Pick, RandomPolicy, ScriptedPolicy, SelectionPolicy,
    TerminalBackend,
};
use crate::collection::CollectionRegistry;
use crate::dialogue::{DialogueError, Interpreter, NodeKey, Npc, Transition};
use crate::modal::{Dispatch, Flow, HandlerSet, ModalInputStack};
use crate::scenario::Scenario;

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// A person picks choices at the terminal.
    Interactive,
    /// A policy picks; an empty script means random picks.
    Automated { script: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Seed for text variants, frontier draws and random policies.
    pub seed: Option<u64>,
    /// Upper bound on selections in an automated playthrough.
    pub max_turns: usize,
    pub mode: Mode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_turns: 32,
            mode: Mode::Interactive,
        }
    }
}

impl SessionConfig {
    pub fn rng(&self) -> StdRng {
        self.seed
            .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
    }
}

// ---------------------------------------------------------------------------
// Host state shared by the input layers
// ---------------------------------------------------------------------------

pub struct Host {
    pub npcs: Vec<Npc>,
    pub entry_keys: Vec<NodeKey>,
    pub interpreter: Interpreter<TerminalBackend>,
    /// Index of the NPC currently talked to.
    talking_to: Option<usize>,
}

impl Host {
    pub fn new(scenario: Scenario, rng: StdRng) -> Self {
        Self {
            npcs: scenario.npcs,
            entry_keys: scenario.entry_keys,
            interpreter: Interpreter::new(TerminalBackend::new(), scenario.collections)
                .with_rng(rng),
            talking_to: None,
        }
    }

    /// Start talking to `index`: fresh frontier, random entry node.
    pub fn talk_to(&mut self, index: usize) -> Result<(), DialogueError> {
        let npc = self.npcs.get(index).ok_or(DialogueError::UnknownNpc(index))?;
        self.talking_to = Some(index);
        self.interpreter
            .start_session(npc, self.entry_keys.iter().cloned());
        self.interpreter.visit_random_frontier_member(npc)
    }

    pub fn leave(&mut self) {
        self.interpreter.end_session();
        self.talking_to = None;
    }

    fn partner(&self) -> &str {
        self.talking_to
            .and_then(|i| self.npcs.get(i))
            .map_or("nobody", Npc::identity)
    }

    /// Words for a conversation that broke off with `err`.
    pub fn describe(&self, err: &DialogueError) -> String {
        match err {
            DialogueError::FrontierExhausted => {
                format!("{} has nothing more to say.", self.partner())
            }
            other => format!("The conversation with {} breaks off ({other}).", self.partner()),
        }
    }
}

// ---------------------------------------------------------------------------
// Input layers
// ---------------------------------------------------------------------------

type Layer = Box<dyn HandlerSet<Host, DialogueError>>;

/// "Pick someone to talk to".
struct MenuLayer;

impl HandlerSet<Host, DialogueError> for MenuLayer {
    fn name(&self) -> &str {
        "menu"
    }

    fn handle(
        &mut self,
        host: &mut Host,
        event: &InputEvent,
    ) -> Result<Flow<Host, DialogueError>, DialogueError> {
        match event {
            InputEvent::Number(n) if *n >= 1 && *n <= host.npcs.len() => {
                match host.talk_to(n - 1) {
                    Ok(()) => Ok(Flow::Push(Box::new(ConversationLayer { npc: n - 1 }))),
                    Err(err) => {
                        warn!("Could not start conversation: {err}");
                        let message = host.describe(&err);
                        host.leave();
                        Ok(Flow::Push(notice(message)))
                    }
                }
            }
            InputEvent::Key('q') => Ok(Flow::Quit),
            _ => Ok(Flow::Continue),
        }
    }

    fn draw(&mut self, host: &mut Host, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "\npick someone to talk to")?;
        for (i, npc) in host.npcs.iter().enumerate() {
            writeln!(out, "  [{}] {}", i + 1, npc.identity())?;
        }
        writeln!(out, "  [q] quit")
    }
}

/// A live conversation; selections go to the interpreter.
struct ConversationLayer {
    npc: usize,
}

impl HandlerSet<Host, DialogueError> for ConversationLayer {
    fn name(&self) -> &str {
        "conversation"
    }

    fn handle(
        &mut self,
        host: &mut Host,
        event: &InputEvent,
    ) -> Result<Flow<Host, DialogueError>, DialogueError> {
        if *event == InputEvent::Key('l') {
            info!("Player left {}", host.partner());
            let message = format!("You walk away from {}.", host.partner());
            host.leave();
            return Ok(Flow::Replace(notice(message)));
        }

        let npc = host
            .npcs
            .get_mut(self.npc)
            .ok_or(DialogueError::UnknownNpc(self.npc))?;
        match host.interpreter.handle_event(npc, event)? {
            Some(Transition::Stalled) => {
                let message = format!("{} falls silent.", host.partner());
                host.leave();
                Ok(Flow::Replace(notice(message)))
            }
            Some(Transition::Presenting(_)) | None => Ok(Flow::Continue),
        }
    }

    fn draw(&mut self, host: &mut Host, out: &mut dyn Write) -> io::Result<()> {
        let backend = host.interpreter.backend_mut();
        if backend.is_dirty() {
            backend.draw(out)?;
            writeln!(out, "  [l] leave")?;
        }
        Ok(())
    }
}

/// A message that waits for enter, layered over whatever was live.
struct NoticeLayer {
    message: String,
    shown: bool,
}

fn notice(message: String) -> Layer {
    Box::new(NoticeLayer {
        message,
        shown: false,
    })
}

impl HandlerSet<Host, DialogueError> for NoticeLayer {
    fn name(&self) -> &str {
        "notice"
    }

    fn handle(
        &mut self,
        _host: &mut Host,
        event: &InputEvent,
    ) -> Result<Flow<Host, DialogueError>, DialogueError> {
        match event {
            InputEvent::Confirm => Ok(Flow::Pop),
            _ => Ok(Flow::Continue),
        }
    }

    fn draw(&mut self, _host: &mut Host, out: &mut dyn Write) -> io::Result<()> {
        if !self.shown {
            self.shown = true;
            writeln!(out, "\n{} [press enter to continue]", self.message)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Interactive play
// ---------------------------------------------------------------------------

/// Feed one event through the layers, turning conversation failures into a notice.
pub fn step(
    stack: &mut ModalInputStack<Host, DialogueError>,
    host: &mut Host,
    event: &InputEvent,
) -> Dispatch {
    match stack.dispatch(host, event) {
        Ok(dispatch) => dispatch,
        Err(err) => {
            warn!("Conversation failed: {err}");
            let message = host.describe(&err);
            host.leave();
            stack.push(notice(message));
            Dispatch::Handled
        }
    }
}

fn play_interactive(scenario: Scenario, config: &SessionConfig) -> Result<()> {
    let mut host = Host::new(scenario, config.rng());
    let mut stack: ModalInputStack<Host, DialogueError> = ModalInputStack::new();
    stack.push(Box::new(MenuLayer));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    while !stack.is_empty() {
        stack.draw(&mut host, &mut stdout)?;
        print!("> ");
        stdout.flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read input")?;
        let Some(event) = InputEvent::parse_line(&line) else {
            continue;
        };

        if step(&mut stack, &mut host, &event) == Dispatch::Quit {
            break;
        }
    }

    println!("Farewell.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Automated playthroughs
// ---------------------------------------------------------------------------

/// Why an automated playthrough stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoOutcome {
    /// The current node offers nothing to pick.
    DeadEnd,
    /// The policy declined to pick anything.
    PolicyIdle,
    /// An action navigated nowhere.
    Stalled,
    /// `resume` found the frontier empty.
    Exhausted,
    TurnLimit,
}

#[derive(Debug, Clone)]
pub struct Playthrough {
    pub transcript: Vec<String>,
    pub outcome: AutoOutcome,
    pub turns: usize,
}

/// Drive a conversation with `npc` through an [`AutomatedBackend`].
pub fn play_automated<P: SelectionPolicy>(
    npc: &mut Npc,
    collections: CollectionRegistry,
    entry_keys: &[NodeKey],
    policy: P,
    config: &SessionConfig,
) -> Result<Playthrough, DialogueError> {
    let mut interpreter =
        Interpreter::new(AutomatedBackend::new(policy), collections).with_rng(config.rng());
    let mut transcript = Vec::new();

    interpreter.start_session(npc, entry_keys.iter().cloned());
    match interpreter.visit_random_frontier_member(npc) {
        Ok(()) => {}
        Err(DialogueError::FrontierExhausted) => {
            return Ok(Playthrough {
                transcript,
                outcome: AutoOutcome::Exhausted,
                turns: 0,
            })
        }
        Err(err) => return Err(err),
    }

    let mut turns = 0;
    let outcome = loop {
        let page = interpreter.backend().page().clone();
        transcript.extend(page.text.iter().cloned());
        if turns == config.max_turns {
            break AutoOutcome::TurnLimit;
        }

        let result = interpreter.handle_event(npc, &InputEvent::Tick);
        if let Some(label) = interpreter
            .backend_mut()
            .take_pick()
            .and_then(|pick| describe_pick(&page, pick))
        {
            transcript.push(format!("  > {label}"));
        }

        match result {
            Ok(Some(Transition::Presenting(_))) => turns += 1,
            Ok(Some(Transition::Stalled)) => break AutoOutcome::Stalled,
            Ok(None) if page.is_stalled() => break AutoOutcome::DeadEnd,
            Ok(None) => break AutoOutcome::PolicyIdle,
            Err(DialogueError::FrontierExhausted) => break AutoOutcome::Exhausted,
            Err(err) => return Err(err),
        }
    };

    info!("Automated playthrough ended after {turns} turn(s): {outcome:?}");
    interpreter.end_session();
    Ok(Playthrough {
        transcript,
        outcome,
        turns,
    })
}

fn describe_pick(page: &Page, pick: Pick) -> Option<String> {
    match pick {
        Pick::Choice(i) => page.choices.get(i).map(|(label, _)| label.clone()),
        Pick::Present(i) => page.items().get(i).map(|item| format!("present {item}")),
    }
}

fn run_automated(mut scenario: Scenario, config: &SessionConfig, script: &[String]) -> Result<()> {
    let npc = scenario
        .npcs
        .first_mut()
        .context("scenario has nobody to talk to")?;

    let playthrough = if script.is_empty() {
        let policy = config
            .seed
            .map_or_else(RandomPolicy::new, RandomPolicy::seeded);
        play_automated(npc, scenario.collections, &scenario.entry_keys, policy, config)?
    } else {
        let policy = ScriptedPolicy::parse(script).context("invalid script step")?;
        play_automated(npc, scenario.collections, &scenario.entry_keys, policy, config)?
    };

    for line in &playthrough.transcript {
        println!("{line}");
    }
    println!(
        "\n({} turn(s), ended: {:?})",
        playthrough.turns, playthrough.outcome
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

pub fn run(scenario: Scenario, config: SessionConfig) -> Result<()> {
    match &config.mode {
        Mode::Interactive => play_interactive(scenario, &config),
        Mode::Automated { script } => run_automated(scenario, &config, script),
    }
}
