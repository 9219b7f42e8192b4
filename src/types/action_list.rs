use std::fmt;

/// One deferred `(application, data)` pair produced by a hunt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAction {
    application: String,
    data: String,
}

impl PlannedAction {
    pub fn new(application: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.application, self.data)
    }
}

/// Ordered list of deferred actions accumulated while walking a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[must_use]
pub struct ActionList {
    actions: Vec<PlannedAction>,
}

impl ActionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, application: impl Into<String>, data: impl Into<String>) {
        self.actions.push(PlannedAction::new(application, data));
    }

    /// Append every action of `other`, keeping encounter order.
    pub fn append(&mut self, other: ActionList) {
        self.actions.extend(other.actions);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlannedAction> {
        self.actions.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PlannedAction] {
        &self.actions
    }
}

impl IntoIterator for ActionList {
    type Item = PlannedAction;
    type IntoIter = std::vec::IntoIter<PlannedAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a PlannedAction;
    type IntoIter = std::slice::Iter<'a, PlannedAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl FromIterator<PlannedAction> for ActionList {
    fn from_iter<I: IntoIterator<Item = PlannedAction>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for ActionList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.actions.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}
