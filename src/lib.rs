//! A chatplan interpreter: routes text messages through ordered, declarative
//! rule contexts and derives the list of applications to run on them.
//!
//! A [`Chatplan`] is built with [`Chatplan::builder`] or parsed from the DSL
//! with [`Chatplan::from_dsl`]. [`Chatplan::hunt`] walks a [`Message`] through
//! it and returns an [`ActionList`]; a [`Router`] adds the forwarding guard
//! and runs that list against a [`Dispatcher`].

mod compile;
mod error;
mod evaluate;
mod types;

pub mod dispatch;
pub mod matcher;
pub mod parse;
pub mod source;
pub mod substitute;
pub mod template;

#[cfg(feature = "binary-cache")]
pub mod serial;

pub use dispatch::{AppResult, Applications, DispatchError, Dispatcher, Router, SendOutcome};
pub use error::ChatplanError;
pub use parse::ParseError;
pub use source::{FileSource, ReloadableSource, RuleSource};
pub use types::{
    Action, ActionDef, ActionList, BreakPolicy, Chatplan, ChatplanBuilder, CompileError,
    Condition, ConditionBuilder, ConditionDef, ConfigError, Context, ContextBuilder, ContextDef,
    DEFAULT_CONTEXT, DEFAULT_MAX_FORWARDS, Expression, Extension, ExtensionBuilder, ExtensionDef,
    ExtensionStatus, ExtensionTrace, FALLBACK_CONTEXT, FieldSpec, HuntReport, Message,
    PlannedAction, Settings, SettingsError, TIME_ATTRIBUTES, TimeMatch, TimeWindow,
    TimeWindowError, UnknownBreakPolicy, Zone, check_window, fields, is_true, named_zone,
    resolve_zone,
};
