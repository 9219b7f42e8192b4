//! Where a [`Router`](crate::Router) gets the chatplan for each message.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::ChatplanError;
use crate::types::{Chatplan, Message, Settings};

/// Supplies an immutable chatplan snapshot for one message.
///
/// The returned `Arc` stays valid for the whole evaluation even if the
/// source changes meanwhile.
pub trait RuleSource {
    /// # Errors
    ///
    /// Returns [`ChatplanError`] when no chatplan can be produced. The router
    /// logs it and treats the message as having no actions.
    fn locate(&self, message: &Message) -> Result<Arc<Chatplan>, ChatplanError>;
}

impl RuleSource for Arc<Chatplan> {
    fn locate(&self, _message: &Message) -> Result<Arc<Chatplan>, ChatplanError> {
        Ok(Arc::clone(self))
    }
}

impl<S: RuleSource + ?Sized> RuleSource for Box<S> {
    fn locate(&self, message: &Message) -> Result<Arc<Chatplan>, ChatplanError> {
        (**self).locate(message)
    }
}

/// Reads and compiles a DSL file on every lookup, so edits take effect on
/// the next message.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A source for [`Settings::chatplan_path`], if one is configured.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        settings.chatplan_path.as_ref().map(Self::new)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for FileSource {
    fn locate(&self, _message: &Message) -> Result<Arc<Chatplan>, ChatplanError> {
        Chatplan::from_file(&self.path).map(Arc::new)
    }
}

/// A chatplan that can be swapped while messages are being routed.
///
/// Each lookup clones the current `Arc`; [`replace`](Self::replace) installs
/// a new plan without disturbing evaluations already holding the old one.
#[derive(Debug)]
pub struct ReloadableSource {
    current: RwLock<Arc<Chatplan>>,
}

impl ReloadableSource {
    pub fn new(chatplan: Chatplan) -> Self {
        Self {
            current: RwLock::new(Arc::new(chatplan)),
        }
    }

    /// The plan new lookups will see.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Chatplan> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Install `chatplan` and return the previous one.
    pub fn replace(&self, chatplan: Chatplan) -> Arc<Chatplan> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Arc::new(chatplan))
    }
}

impl RuleSource for ReloadableSource {
    fn locate(&self, _message: &Message) -> Result<Arc<Chatplan>, ChatplanError> {
        Ok(self.snapshot())
    }
}
