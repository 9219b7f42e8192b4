use serde::{Deserialize, Serialize};

/// A named rule context as written by the user, before compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDef {
    pub name: String,
    pub extensions: Vec<ExtensionDef>,
}

/// An extension definition. `continue_on_match` keeps the walk going after
/// this extension produced actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDef {
    pub name: Option<String>,
    pub continue_on_match: bool,
    pub conditions: Vec<ConditionDef>,
}

/// A condition definition. Attribute values are kept as raw text;
/// compilation turns them into typed values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDef {
    /// Header name, or a template when it contains `$`.
    pub field: Option<String>,
    /// Regular expression, possibly containing `${field}` placeholders.
    pub expression: String,
    /// Raw `break` attribute.
    pub break_on: Option<String>,
    /// Date/time window attributes in source order.
    pub time: Vec<(String, String)>,
    pub actions: Vec<ActionDef>,
    pub anti_actions: Vec<ActionDef>,
    /// Conditions declared inside this one. Never valid; kept so the walker
    /// can report it.
    pub nested: Vec<ConditionDef>,
}

/// An action or anti-action definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDef {
    pub application: String,
    pub data: String,
    pub inline: bool,
    pub loop_count: u32,
}

impl ActionDef {
    pub fn new(application: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            data: data.into(),
            inline: false,
            loop_count: 1,
        }
    }

    /// Run during the walk instead of deferring to the action list.
    #[must_use]
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// Emit the action `count` times. Zero emits nothing.
    #[must_use]
    pub fn repeat(mut self, count: u32) -> Self {
        self.loop_count = count;
        self
    }
}

impl Default for ActionDef {
    fn default() -> Self {
        Self::new("", "")
    }
}
