use regex::Regex;

use super::break_policy::BreakPolicy;
use super::definition::{ActionDef, ConditionDef, ContextDef, ExtensionDef};
use super::time_window::TimeWindow;

/// A compiled rule context: a name and its extensions in document order.
#[derive(Debug, Clone)]
pub struct Context {
    pub(crate) name: String,
    pub(crate) extensions: Vec<Extension>,
}

impl Context {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub(crate) fn to_def(&self) -> ContextDef {
        ContextDef {
            name: self.name.clone(),
            extensions: self.extensions.iter().map(Extension::to_def).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extension {
    pub(crate) name: Option<String>,
    pub(crate) continue_on_match: bool,
    pub(crate) conditions: Vec<Condition>,
}

impl Extension {
    /// The extension name, or `_anon_` when none was given.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("_anon_")
    }

    #[must_use]
    pub fn continue_on_match(&self) -> bool {
        self.continue_on_match
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub(crate) fn to_def(&self) -> ExtensionDef {
        ExtensionDef {
            name: self.name.clone(),
            continue_on_match: self.continue_on_match,
            conditions: self.conditions.iter().map(Condition::to_def).collect(),
        }
    }
}

/// What a condition tests: a header looked up by name, or a template
/// expanded against the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    Header(String),
    Template(String),
}

impl FieldSpec {
    #[must_use]
    pub fn new(spec: &str) -> Self {
        if spec.contains('$') {
            FieldSpec::Template(spec.to_owned())
        } else {
            FieldSpec::Header(spec.to_owned())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            FieldSpec::Header(s) | FieldSpec::Template(s) => s,
        }
    }
}

/// A condition expression. Expressions without placeholders are compiled
/// once; templated ones are compiled after expansion on every evaluation.
#[derive(Debug, Clone)]
pub struct Expression {
    pub(crate) source: String,
    pub(crate) compiled: Option<Regex>,
}

impl Expression {
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// `true` when the expression carries `${...}` placeholders and is
    /// compiled per evaluation.
    #[must_use]
    pub fn is_templated(&self) -> bool {
        self.compiled.is_none()
    }

    /// `true` when the expression declares at least one group.
    #[must_use]
    pub fn has_groups(&self) -> bool {
        crate::matcher::declares_groups(&self.source)
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub(crate) field: Option<FieldSpec>,
    pub(crate) expression: Expression,
    pub(crate) break_policy: BreakPolicy,
    pub(crate) time_window: Option<TimeWindow>,
    pub(crate) actions: Vec<Action>,
    pub(crate) anti_actions: Vec<Action>,
    pub(crate) nested: Vec<ConditionDef>,
}

impl Condition {
    #[must_use]
    pub fn field(&self) -> Option<&FieldSpec> {
        self.field.as_ref()
    }

    #[must_use]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    #[must_use]
    pub fn break_policy(&self) -> BreakPolicy {
        self.break_policy
    }

    #[must_use]
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    #[must_use]
    pub fn anti_actions(&self) -> &[Action] {
        &self.anti_actions
    }

    /// `true` if the condition illegally declares conditions of its own.
    #[must_use]
    pub fn has_nested(&self) -> bool {
        !self.nested.is_empty()
    }

    pub(crate) fn to_def(&self) -> ConditionDef {
        ConditionDef {
            field: self.field.as_ref().map(|f| f.as_str().to_owned()),
            expression: self.expression.source.clone(),
            break_on: Some(self.break_policy.as_str().to_owned()),
            time: self
                .time_window
                .as_ref()
                .map(|w| w.attributes().to_vec())
                .unwrap_or_default(),
            actions: self.actions.iter().map(Action::to_def).collect(),
            anti_actions: self.anti_actions.iter().map(Action::to_def).collect(),
            nested: self.nested.clone(),
        }
    }
}

/// An action or anti-action: which application to run with which data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub(crate) application: String,
    pub(crate) data: String,
    pub(crate) inline: bool,
    pub(crate) loop_count: u32,
}

impl Action {
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Inline actions run during the walk instead of being deferred.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    #[must_use]
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    pub(crate) fn from_def(def: &ActionDef) -> Self {
        Self {
            application: def.application.clone(),
            data: def.data.clone(),
            inline: def.inline,
            loop_count: def.loop_count,
        }
    }

    pub(crate) fn to_def(&self) -> ActionDef {
        ActionDef {
            application: self.application.clone(),
            data: self.data.clone(),
            inline: self.inline,
            loop_count: self.loop_count,
        }
    }
}
