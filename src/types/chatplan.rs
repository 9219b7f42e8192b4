use std::fmt;

use chrono::{DateTime, Utc};

use super::action_list::ActionList;
use super::break_policy::BreakPolicy;
use super::definition::{ActionDef, ConditionDef, ContextDef, ExtensionDef};
use super::error::CompileError;
use super::message::Message;
use super::report::HuntReport;
use super::rule::Context;
use super::settings::Settings;
use crate::dispatch::Dispatcher;

/// Builder for constructing a [`Chatplan`].
///
/// Contexts, extensions and conditions are defined via nested closures and
/// compiled into an immutable plan that can be shared behind `Arc`.
///
/// # Example
///
/// ```
/// use chatplan::{BreakPolicy, Chatplan};
///
/// let plan = Chatplan::builder()
///     .context("default", |c| {
///         c.extension("echo", |e| {
///             e.condition(|c| {
///                 c.field("to")
///                     .expression(r"^(\d+)$")
///                     .break_on(BreakPolicy::OnFalse)
///                     .action("reply", "you wrote to $1")
///             })
///         })
///     })
///     .compile()
///     .unwrap();
/// assert!(plan.context("default").is_some());
/// ```
#[derive(Debug, Default)]
pub struct ChatplanBuilder {
    contexts: Vec<ContextDef>,
}

/// Passed to the closure given to [`ChatplanBuilder::context`].
#[derive(Debug)]
pub struct ContextBuilder {
    def: ContextDef,
}

/// Passed to the closure given to [`ContextBuilder::extension`].
#[derive(Debug)]
pub struct ExtensionBuilder {
    def: ExtensionDef,
}

/// Passed to the closure given to [`ExtensionBuilder::condition`].
#[derive(Debug, Default)]
pub struct ConditionBuilder {
    def: ConditionDef,
}

impl ChatplanBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a context. Later contexts with the same name are shadowed by
    /// the first one.
    #[must_use]
    pub fn context(mut self, name: &str, f: impl FnOnce(ContextBuilder) -> ContextBuilder) -> Self {
        let builder = f(ContextBuilder {
            def: ContextDef {
                name: name.to_owned(),
                extensions: Vec::new(),
            },
        });
        self.contexts.push(builder.def);
        self
    }

    /// Add an already assembled context definition.
    #[must_use]
    pub fn context_def(mut self, def: ContextDef) -> Self {
        self.contexts.push(def);
        self
    }

    /// Compile the definitions into an immutable `Chatplan`.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if a context is unnamed, a static expression
    /// is not a valid regex, a time window is malformed, or an action has no
    /// application.
    pub fn compile(self) -> Result<Chatplan, CompileError> {
        crate::compile::compile(self.contexts)
    }
}

impl ContextBuilder {
    /// Define a named extension.
    #[must_use]
    pub fn extension(self, name: &str, f: impl FnOnce(ExtensionBuilder) -> ExtensionBuilder) -> Self {
        self.push_extension(Some(name.to_owned()), f)
    }

    /// Define an extension without a name. It is reported as `_anon_`.
    #[must_use]
    pub fn anonymous_extension(self, f: impl FnOnce(ExtensionBuilder) -> ExtensionBuilder) -> Self {
        self.push_extension(None, f)
    }

    fn push_extension(
        mut self,
        name: Option<String>,
        f: impl FnOnce(ExtensionBuilder) -> ExtensionBuilder,
    ) -> Self {
        let builder = f(ExtensionBuilder {
            def: ExtensionDef {
                name,
                ..ExtensionDef::default()
            },
        });
        self.def.extensions.push(builder.def);
        self
    }
}

impl ExtensionBuilder {
    /// Keep walking later extensions after this one produced actions.
    #[must_use]
    pub fn continue_on_match(mut self, value: bool) -> Self {
        self.def.continue_on_match = value;
        self
    }

    #[must_use]
    pub fn condition(mut self, f: impl FnOnce(ConditionBuilder) -> ConditionBuilder) -> Self {
        let builder = f(ConditionBuilder::default());
        self.def.conditions.push(builder.def);
        self
    }
}

impl ConditionBuilder {
    /// Header to test, or a `${...}` template expanded against the message.
    #[must_use]
    pub fn field(mut self, field: &str) -> Self {
        self.def.field = Some(field.to_owned());
        self
    }

    #[must_use]
    pub fn expression(mut self, expression: &str) -> Self {
        self.def.expression = expression.to_owned();
        self
    }

    #[must_use]
    pub fn break_on(mut self, policy: BreakPolicy) -> Self {
        self.def.break_on = Some(policy.as_str().to_owned());
        self
    }

    /// Add a date/time window attribute such as `("wday", "2-6")`.
    #[must_use]
    pub fn time(mut self, attribute: &str, value: &str) -> Self {
        self.def.time.push((attribute.to_owned(), value.to_owned()));
        self
    }

    #[must_use]
    pub fn action(self, application: &str, data: &str) -> Self {
        self.action_def(ActionDef::new(application, data))
    }

    #[must_use]
    pub fn action_def(mut self, action: ActionDef) -> Self {
        self.def.actions.push(action);
        self
    }

    #[must_use]
    pub fn anti_action(self, application: &str, data: &str) -> Self {
        self.anti_action_def(ActionDef::new(application, data))
    }

    #[must_use]
    pub fn anti_action_def(mut self, action: ActionDef) -> Self {
        self.def.anti_actions.push(action);
        self
    }

    /// Declare a condition inside this one. Nesting is accepted here but
    /// aborts the enclosing extension when it is walked.
    #[must_use]
    pub fn condition(mut self, f: impl FnOnce(ConditionBuilder) -> ConditionBuilder) -> Self {
        let builder = f(ConditionBuilder::default());
        self.def.nested.push(builder.def);
        self
    }
}

/// A compiled, immutable chatplan. Thread-safe and designed to live behind
/// `Arc`; every hunt works on its own message and action list.
#[derive(Debug, Clone)]
pub struct Chatplan {
    pub(crate) contexts: Vec<Context>,
}

impl Chatplan {
    #[must_use]
    pub fn builder() -> ChatplanBuilder {
        ChatplanBuilder::new()
    }

    /// Parse DSL text and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`ChatplanError`](crate::ChatplanError) on parse or compile
    /// failure.
    pub fn from_dsl(input: &str) -> Result<Self, crate::ChatplanError> {
        let parsed = crate::parse::parse(input)?;
        let chatplan = crate::compile::compile(parsed.contexts)?;
        Ok(chatplan)
    }

    /// Read a DSL file and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`ChatplanError`](crate::ChatplanError) on I/O, parse, or
    /// compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::ChatplanError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }

    /// The first context with exactly this name.
    #[must_use]
    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn contexts(&self) -> &[Context] {
        &self.contexts
    }

    /// Derive the action list for `message` with default settings at the
    /// current time.
    ///
    /// Inline actions are handed to `apps` during the walk. Matching
    /// conditions with groups publish their captures into `DP_MATCH`.
    pub fn hunt(&self, message: &mut Message, apps: &mut dyn Dispatcher) -> ActionList {
        self.hunt_with(message, apps, &Settings::default(), Utc::now())
    }

    /// Like [`hunt`](Self::hunt), evaluating time windows at `now`.
    pub fn hunt_at(
        &self,
        message: &mut Message,
        apps: &mut dyn Dispatcher,
        now: DateTime<Utc>,
    ) -> ActionList {
        self.hunt_with(message, apps, &Settings::default(), now)
    }

    /// Hunt with explicit settings and clock.
    pub fn hunt_with(
        &self,
        message: &mut Message,
        apps: &mut dyn Dispatcher,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> ActionList {
        crate::evaluate::hunt(self, message, apps, settings, now).actions
    }

    /// Hunt and report which context and extensions were walked, how each
    /// extension ended, and how long the walk took.
    pub fn hunt_detailed(
        &self,
        message: &mut Message,
        apps: &mut dyn Dispatcher,
        settings: &Settings,
        now: DateTime<Utc>,
    ) -> HuntReport {
        let start = std::time::Instant::now();
        let walk = crate::evaluate::hunt(self, message, apps, settings, now);
        HuntReport::new(walk.context, walk.extensions, walk.actions, start.elapsed())
    }

    /// The definitions this plan was compiled from. Compiling them again
    /// yields an equivalent plan.
    #[must_use]
    pub fn to_defs(&self) -> Vec<ContextDef> {
        self.contexts.iter().map(Context::to_def).collect()
    }
}

#[cfg(feature = "binary-cache")]
impl Chatplan {
    /// Serialize this plan to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata so callers can detect a stale cache.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a plan previously produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for Chatplan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extensions: usize = self.contexts.iter().map(|c| c.extensions.len()).sum();
        let conditions: usize = self
            .contexts
            .iter()
            .flat_map(|c| &c.extensions)
            .map(|e| e.conditions.len())
            .sum();
        write!(
            f,
            "Chatplan({} contexts, {extensions} extensions, {conditions} conditions)",
            self.contexts.len(),
        )
    }
}
