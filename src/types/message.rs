use std::fmt;

/// Field names the interpreter reads or writes on a [`Message`].
pub mod fields {
    /// Name of the rule context to hunt in.
    pub const CONTEXT: &str = "context";
    pub const TO: &str = "to";
    pub const TO_USER: &str = "to_user";
    pub const FROM: &str = "from";
    pub const FROM_USER: &str = "from_user";
    /// Path of a chatplan file that overrides the configured rule source.
    pub const ALT_PATH: &str = "alt_path";
    /// Hop counter guarding against dispatch loops.
    pub const MAX_FORWARDS: &str = "max_forwards";
    /// Integer hour offset from UTC used by time windows.
    pub const TOD_TZ_OFFSET: &str = "tod_tz_offset";
    /// Named timezone used by time windows when no offset is given.
    pub const TIMEZONE: &str = "timezone";
    /// Capture list published by the last matching condition with groups.
    pub const DP_MATCH: &str = "DP_MATCH";
    /// Marker telling the transport not to route the message globally again.
    pub const SKIP_GLOBAL_PROCESS: &str = "skip_global_process";
    /// Pseudo-field resolving to the message body.
    pub const BODY: &str = "_body";
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    name: String,
    values: Vec<String>,
}

/// An inbound text message: ordered, case-insensitive header fields (each
/// holding one or more values) and an optional body.
///
/// Fields keep their insertion order. Lookups compare names ASCII
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    headers: Vec<Header>,
    body: Option<String>,
}

impl Message {
    /// Create an empty message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous values (builder form).
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set the body (builder form).
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Replace all values of `name` with a single value.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(idx) => self.headers[idx].values = vec![value],
            None => self.headers.push(Header {
                name: name.to_owned(),
                values: vec![value],
            }),
        }
    }

    /// Append a value to `name`, creating the field if it does not exist.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.position(name) {
            Some(idx) => self.headers[idx].values.push(value),
            None => self.headers.push(Header {
                name: name.to_owned(),
                values: vec![value],
            }),
        }
    }

    /// Remove a field and all of its values. Returns `true` if it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.headers.remove(idx);
                true
            }
            None => false,
        }
    }

    /// First value of a field. `_body` resolves to the body.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        if name.eq_ignore_ascii_case(fields::BODY) {
            return self.body.as_deref();
        }
        self.position(name)
            .and_then(|idx| self.headers[idx].values.first())
            .map(String::as_str)
    }

    /// Every value of a field, in insertion order. Empty if unset.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.position(name)
            .map_or(&[][..], |idx| self.headers[idx].values.as_slice())
    }

    /// `true` if the field is present (the body pseudo-field included).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    #[must_use]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(|h| h.name.as_str())
    }

    /// Flag the message so the transport skips further global routing.
    pub fn mark_skip_global_process(&mut self) {
        self.set(fields::SKIP_GLOBAL_PROCESS, "true");
    }

    #[must_use]
    pub fn skips_global_process(&self) -> bool {
        self.get(fields::SKIP_GLOBAL_PROCESS).is_some_and(is_true)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for header in &self.headers {
            writeln!(f, "{}: {}", header.name, header.values.join(", "))?;
        }
        if let Some(body) = &self.body {
            write!(f, "\n{body}")?;
        }
        Ok(())
    }
}

/// Truthiness used for flag attributes and marker fields.
#[must_use]
pub fn is_true(value: &str) -> bool {
    ["true", "yes", "on", "1", "enabled", "active", "allow"]
        .iter()
        .any(|t| value.trim().eq_ignore_ascii_case(t))
}
