use std::fmt;
use std::time::Duration;

use super::action_list::ActionList;

/// How an extension's walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionStatus {
    /// At least one action or anti-action list was reached.
    Proceeded,
    NoMatch,
    /// The walk was aborted by a configuration error.
    Misconfigured,
}

/// One visited extension in a [`HuntReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionTrace {
    pub name: String,
    pub status: ExtensionStatus,
    /// Deferred actions this extension contributed.
    pub actions: usize,
}

/// Detailed result of
/// [`Chatplan::hunt_detailed()`](super::chatplan::Chatplan::hunt_detailed).
#[derive(Debug, Clone)]
#[must_use]
pub struct HuntReport {
    context: Option<String>,
    extensions: Vec<ExtensionTrace>,
    actions: ActionList,
    duration: Duration,
}

impl HuntReport {
    pub(crate) fn new(
        context: Option<String>,
        extensions: Vec<ExtensionTrace>,
        actions: ActionList,
        duration: Duration,
    ) -> Self {
        Self {
            context,
            extensions,
            actions,
            duration,
        }
    }

    /// The context that was walked, `None` if neither the requested nor the
    /// fallback context exists.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Extensions visited, in walk order.
    #[must_use]
    pub fn extensions(&self) -> &[ExtensionTrace] {
        &self.extensions
    }

    pub fn actions(&self) -> &ActionList {
        &self.actions
    }

    pub fn into_actions(self) -> ActionList {
        self.actions
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for HuntReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(c) => write!(f, "context: {c}")?,
            None => write!(f, "context: none")?,
        }
        let visited: Vec<&str> = self.extensions.iter().map(|e| e.name.as_str()).collect();
        write!(f, ", extensions: [{}]", visited.join(", "))?;
        write!(f, ", actions: {}", self.actions)?;
        write!(f, ", duration: {:?}", self.duration)?;
        Ok(())
    }
}
