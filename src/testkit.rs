//! Scripted in-memory transport and factory for engine tests.

use async_trait::async_trait;
use rollcall_core::{
    config::{AccountConfig, PolicyConfig, TransportKind},
    error::CheckinError,
    message::{Affordance, AffordanceSelector, ReplyMessage},
    traits::{MessagingTransport, TransportFactory},
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

pub const AGENT: &str = "@CheckinBot";

/// What the agent does in response to one command.
#[derive(Clone)]
pub enum Step {
    Reply(String),
    ReplyWith(String, Vec<Affordance>),
    Silent,
    /// `send` itself fails with a transport error.
    Fail,
}

/// What pressing an affordance does.
#[derive(Clone)]
pub enum Click {
    /// Edit the clicked message in place; the first `stale_reads` refetches
    /// still return the old content.
    Edit {
        text: String,
        affordances: Vec<Affordance>,
        stale_reads: u32,
    },
    /// Post a fresh message instead of editing.
    NewMessage(String),
}

struct PendingEdit {
    message_id: String,
    text: String,
    affordances: Vec<Affordance>,
    stale_reads: u32,
}

#[derive(Default)]
struct State {
    /// Oldest first.
    history: Vec<ReplyMessage>,
    next_id: u64,
    steps: HashMap<String, VecDeque<Step>>,
    clicks: HashMap<String, Click>,
    pending: Vec<PendingEdit>,
    sent: Vec<String>,
    pressed: Vec<String>,
    connects: u32,
    connect_failures: u32,
    disconnects: u32,
}

impl State {
    fn push(&mut self, sender: &str, text: &str, affordances: Vec<Affordance>) -> String {
        self.next_id += 1;
        let id = self.next_id.to_string();
        self.history
            .push(ReplyMessage::new(id.clone(), sender, text).with_affordances(affordances));
        id
    }
}

pub struct ScriptedTransport {
    state: Mutex<State>,
    unauthorized: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            unauthorized: false,
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            unauthorized: true,
            ..Self::new()
        }
    }

    /// Fail the first `n` connects with a retryable transport error.
    pub fn failing_connects(self, n: u32) -> Self {
        self.state.lock().unwrap().connect_failures = n;
        self
    }

    /// Queue the agent's behaviour for the next `command`.
    pub fn on(self, command: &str, step: Step) -> Self {
        self.state
            .lock()
            .unwrap()
            .steps
            .entry(command.to_string())
            .or_default()
            .push_back(step);
        self
    }

    pub fn on_click(self, label: &str, click: Click) -> Self {
        self.state
            .lock()
            .unwrap()
            .clicks
            .insert(label.to_string(), click);
        self
    }

    /// Seed an old agent message into the history.
    pub fn with_history(self, text: &str) -> Self {
        self.state.lock().unwrap().push(AGENT, text, Vec::new());
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn pressed(&self) -> Vec<String> {
        self.state.lock().unwrap().pressed.clone()
    }

    pub fn disconnects(&self) -> u32 {
        self.state.lock().unwrap().disconnects
    }

    pub fn connects(&self) -> u32 {
        self.state.lock().unwrap().connects
    }
}

#[async_trait]
impl MessagingTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(&self) -> Result<(), CheckinError> {
        let mut state = self.state.lock().unwrap();
        state.connects += 1;
        if self.unauthorized {
            return Err(CheckinError::Unauthorized("session revoked".into()));
        }
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(CheckinError::Transport("connection reset".into()));
        }
        Ok(())
    }

    async fn send(&self, _agent: &str, text: &str) -> Result<(), CheckinError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push(text.to_string());
        let step = state
            .steps
            .get_mut(text)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Step::Silent);
        match step {
            Step::Fail => return Err(CheckinError::Transport("connection reset".into())),
            Step::Silent => {
                state.push("me", text, Vec::new());
            }
            Step::Reply(reply) => {
                state.push("me", text, Vec::new());
                state.push(AGENT, &reply, Vec::new());
            }
            Step::ReplyWith(reply, affordances) => {
                state.push("me", text, Vec::new());
                state.push(AGENT, &reply, affordances);
            }
        }
        Ok(())
    }

    async fn fetch_recent(
        &self,
        _agent: &str,
        limit: usize,
    ) -> Result<Vec<ReplyMessage>, CheckinError> {
        let state = self.state.lock().unwrap();
        Ok(state.history.iter().rev().take(limit).cloned().collect())
    }

    async fn fetch_by_id(
        &self,
        _agent: &str,
        message_id: &str,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.pending.iter().position(|p| p.message_id == message_id) {
            if state.pending[pos].stale_reads > 0 {
                state.pending[pos].stale_reads -= 1;
            } else {
                let edit = state.pending.remove(pos);
                if let Some(msg) = state.history.iter_mut().find(|m| m.id == message_id) {
                    msg.text = edit.text;
                    msg.affordances = edit.affordances;
                }
            }
        }
        Ok(state.history.iter().find(|m| m.id == message_id).cloned())
    }

    async fn activate_affordance(
        &self,
        _agent: &str,
        message_id: &str,
        selector: &AffordanceSelector,
    ) -> Result<(), CheckinError> {
        let mut state = self.state.lock().unwrap();
        let label = state
            .history
            .iter()
            .find(|m| m.id == message_id)
            .and_then(|m| {
                m.affordances
                    .iter()
                    .find(|a| a.row == selector.row && a.col == selector.col)
            })
            .map(|a| a.label.clone())
            .ok_or_else(|| CheckinError::AffordanceUnavailable(format!("{selector:?}")))?;
        state.pressed.push(label.clone());
        let click = state.clicks.get(&label).cloned();
        match click {
            Some(Click::Edit {
                text,
                affordances,
                stale_reads,
            }) => state.pending.push(PendingEdit {
                message_id: message_id.to_string(),
                text,
                affordances,
                stale_reads,
            }),
            Some(Click::NewMessage(text)) => {
                state.push(AGENT, &text, Vec::new());
            }
            None => {}
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CheckinError> {
        self.state.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

/// Hands out scripted transports by account name.
#[derive(Default)]
pub struct ScriptedFactory {
    transports: HashMap<String, Arc<ScriptedTransport>>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    opened: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedFactory {
    pub fn with(mut self, account: &str, transport: ScriptedTransport) -> Self {
        self.transports
            .insert(account.to_string(), Arc::new(transport));
        self
    }

    pub fn failing(mut self, account: &str) -> Self {
        self.failing.insert(account.to_string());
        self
    }

    pub fn panicking(mut self, account: &str) -> Self {
        self.panicking.insert(account.to_string());
        self
    }

    pub fn transport(&self, account: &str) -> Arc<ScriptedTransport> {
        self.transports[account].clone()
    }

    pub fn opened(&self) -> Vec<(String, Instant)> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransportFactory for ScriptedFactory {
    async fn open(
        &self,
        account: &AccountConfig,
    ) -> Result<Arc<dyn MessagingTransport>, CheckinError> {
        self.opened
            .lock()
            .unwrap()
            .push((account.name.clone(), Instant::now()));
        if self.panicking.contains(&account.name) {
            panic!("factory blew up for {}", account.name);
        }
        if self.failing.contains(&account.name) {
            return Err(CheckinError::Transport(format!(
                "cannot build session for {}",
                account.name
            )));
        }
        let transport: Arc<dyn MessagingTransport> = self
            .transports
            .get(&account.name)
            .cloned()
            .ok_or_else(|| CheckinError::Config(format!("no script for {}", account.name)))?;
        Ok(transport)
    }
}

/// A relay account talking to [`AGENT`].
pub fn account(name: &str) -> AccountConfig {
    AccountConfig {
        name: name.to_string(),
        enabled: true,
        transport: TransportKind::Relay,
        agent: AGENT.to_string(),
        agent_id: None,
        command: "/checkin".to_string(),
        status_command: None,
        session: None,
        settle_secs: None,
        fetch_limit: None,
        drill: Vec::new(),
        patterns: Vec::new(),
        web: None,
    }
}

/// Default pacing: 3 attempts, 5s backoff unit, 5s settle, 1 staleness retry.
pub fn policy() -> PolicyConfig {
    PolicyConfig::default()
}
