mod action_list;
mod break_policy;
mod chatplan;
mod definition;
mod error;
mod message;
mod report;
mod rule;
mod settings;
mod time_window;

pub use action_list::{ActionList, PlannedAction};
pub use break_policy::{BreakPolicy, UnknownBreakPolicy};
pub use chatplan::{Chatplan, ChatplanBuilder, ConditionBuilder, ContextBuilder, ExtensionBuilder};
pub use definition::{ActionDef, ConditionDef, ContextDef, ExtensionDef};
pub use error::{CompileError, ConfigError};
pub use message::{Message, fields, is_true};
pub use report::{ExtensionStatus, ExtensionTrace, HuntReport};
pub use rule::{Action, Condition, Context, Expression, Extension, FieldSpec};
pub use settings::{
    DEFAULT_CONTEXT, DEFAULT_MAX_FORWARDS, FALLBACK_CONTEXT, Settings, SettingsError,
};
pub use time_window::{
    TIME_ATTRIBUTES, TimeMatch, TimeWindow, TimeWindowError, Zone, check_window, named_zone,
    resolve_zone,
};
