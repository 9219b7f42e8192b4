//! Executing derived actions: the application boundary and the dispatch loop.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::source::RuleSource;
use crate::template::expand;
use crate::types::{ActionList, Chatplan, Message, Settings, fields};

/// What an application reported after running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppResult {
    Accepted,
    Rejected,
    Terminate,
}

impl AppResult {
    /// Only [`AppResult::Accepted`] lets the dispatch loop run the next action.
    #[must_use]
    pub fn permits_continue(self) -> bool {
        match self {
            AppResult::Accepted => true,
            AppResult::Rejected | AppResult::Terminate => false,
        }
    }
}

/// Runs a named application with its data against a message.
///
/// Implemented for any `FnMut(&mut Message, &str, &str) -> AppResult`.
pub trait Dispatcher {
    fn dispatch(&mut self, message: &mut Message, application: &str, data: &str) -> AppResult;
}

impl<F> Dispatcher for F
where
    F: FnMut(&mut Message, &str, &str) -> AppResult,
{
    fn dispatch(&mut self, message: &mut Message, application: &str, data: &str) -> AppResult {
        self(message, application, data)
    }
}

type Handler = Box<dyn FnMut(&mut Message, &str) -> AppResult + Send>;

/// A name-to-handler registry.
///
/// Before a handler runs, `${field}` placeholders in its data are expanded
/// against the message. Unknown applications are rejected.
///
/// ```
/// use chatplan::{AppResult, Applications, Dispatcher, Message};
///
/// let mut apps = Applications::new().register("set", |msg, data| {
///     if let Some((name, value)) = data.split_once('=') {
///         msg.set(name, value);
///     }
///     AppResult::Accepted
/// });
/// let mut msg = Message::new().with("from", "alice");
/// apps.dispatch(&mut msg, "set", "owner=${from}");
/// assert_eq!(msg.get("owner"), Some("alice"));
/// ```
#[derive(Default)]
pub struct Applications {
    handlers: HashMap<String, Handler>,
}

impl Applications {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, replacing any previous one.
    #[must_use]
    pub fn register<F>(mut self, name: &str, handler: F) -> Self
    where
        F: FnMut(&mut Message, &str) -> AppResult + Send + 'static,
    {
        self.handlers.insert(name.to_owned(), Box::new(handler));
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Dispatcher for Applications {
    fn dispatch(&mut self, message: &mut Message, application: &str, data: &str) -> AppResult {
        let Some(handler) = self.handlers.get_mut(application) else {
            warn!(application, "unknown application");
            return AppResult::Rejected;
        };
        let data = expand(message, data).into_owned();
        handler(message, &data)
    }
}

impl fmt::Debug for Applications {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Applications").field("handlers", &names).finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("max forwards reached")]
    MaxForwardsReached,
}

/// How a successful dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The walk produced no actions.
    NoActions,
    /// Every action ran and accepted.
    Completed { executed: usize },
    /// `application` declined to continue; the remaining actions were skipped.
    Halted { executed: usize, application: String },
}

/// The dispatch loop: guards the forwarding counter, hunts the message
/// against a rule source, and runs the resulting actions in order.
///
/// ```
/// use std::sync::Arc;
/// use chatplan::{AppResult, Chatplan, Message, Router, SendOutcome};
///
/// let plan = Chatplan::from_dsl(
///     r#"
/// context default {
///     extension echo {
///         condition field=to expression="^1000$" {
///             action reply "pong"
///         }
///     }
/// }
/// "#,
/// )
/// .unwrap();
/// let router = Router::new(Arc::new(plan));
/// let mut replies = Vec::new();
/// let mut apps = |_: &mut Message, app: &str, data: &str| {
///     replies.push(format!("{app}:{data}"));
///     AppResult::Accepted
/// };
/// let mut msg = Message::new().with("to", "1000");
/// let outcome = router.send(&mut msg, &mut apps).unwrap();
/// assert_eq!(outcome, SendOutcome::Completed { executed: 1 });
/// assert_eq!(replies, ["reply:pong"]);
/// ```
#[derive(Debug)]
pub struct Router<S> {
    source: S,
    settings: Settings,
}

impl<S: RuleSource> Router<S> {
    pub fn new(source: S) -> Self {
        Self::with_settings(source, Settings::default())
    }

    pub fn with_settings(source: S, settings: Settings) -> Self {
        Self { source, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Dispatch `message` at the current time.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MaxForwardsReached`] when the message's
    /// forwarding counter is exhausted. No rule is evaluated in that case.
    pub fn send(
        &self,
        message: &mut Message,
        apps: &mut dyn Dispatcher,
    ) -> Result<SendOutcome, DispatchError> {
        self.send_at(message, apps, Utc::now())
    }

    /// Like [`send`](Self::send), evaluating time windows at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MaxForwardsReached`] when the message's
    /// forwarding counter is exhausted.
    pub fn send_at(
        &self,
        message: &mut Message,
        apps: &mut dyn Dispatcher,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, DispatchError> {
        take_forward(message, self.settings.max_forwards)?;

        let actions = self.hunt_at(message, apps, now);
        if actions.is_empty() {
            debug!("no actions found");
            return Ok(SendOutcome::NoActions);
        }

        let mut executed = 0;
        for action in &actions {
            let result = apps.dispatch(message, action.application(), action.data());
            executed += 1;
            if !result.permits_continue() {
                debug!(application = action.application(), ?result, "execution halted");
                return Ok(SendOutcome::Halted {
                    executed,
                    application: action.application().to_owned(),
                });
            }
        }
        Ok(SendOutcome::Completed { executed })
    }

    /// Derive the action list without executing it. The forwarding counter is
    /// left alone.
    pub fn hunt_at(
        &self,
        message: &mut Message,
        apps: &mut dyn Dispatcher,
        now: DateTime<Utc>,
    ) -> ActionList {
        match self.load(message) {
            Some(chatplan) => chatplan.hunt_with(message, apps, &self.settings, now),
            None => ActionList::new(),
        }
    }

    fn load(&self, message: &Message) -> Option<Arc<Chatplan>> {
        let loaded = match message.get(fields::ALT_PATH).filter(|p| !p.is_empty()) {
            Some(path) => {
                debug!(path, "getting chatplan from alternate path");
                Chatplan::from_file(path).map(Arc::new)
            }
            None => self.source.locate(message),
        };
        loaded
            .map_err(|err| error!("open of chatplan failed: {err}"))
            .ok()
    }
}

/// Consume one hop of the message's forwarding budget.
fn take_forward(message: &mut Message, default: u32) -> Result<(), DispatchError> {
    let forwards = match message.get(fields::MAX_FORWARDS) {
        None => default,
        Some(raw) => {
            let remaining = leading_count(raw).saturating_sub(1);
            if remaining == 0 {
                error!(max_forwards = raw, "max forwards reached");
                return Err(DispatchError::MaxForwardsReached);
            }
            remaining
        }
    };
    message.set(fields::MAX_FORWARDS, forwards.to_string());
    Ok(())
}

/// Leading decimal digits of `raw`, ignoring leading whitespace. Anything
/// else, including a negative number, counts as zero.
fn leading_count(raw: &str) -> u32 {
    let raw = raw.trim_start();
    let raw = raw.strip_prefix('+').unwrap_or(raw);
    let end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    raw[..end].parse().unwrap_or(if end == 0 { 0 } else { u32::MAX })
}
