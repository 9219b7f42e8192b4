//! `${field}` placeholder expansion and condition field resolution.

use std::borrow::Cow;

use crate::types::{FieldSpec, Message};

/// Replace every `${name}` in `template` with the message's value for `name`
/// (empty when unset). `${name[N]}` selects the N-th value of a multi-valued
/// field.
///
/// Returns [`Cow::Borrowed`] holding `template` itself when nothing was
/// expanded, so callers can tell whether expansion happened without
/// comparing strings.
///
/// ```
/// use chatplan::{Message, template::expand};
///
/// let msg = Message::new().with("to", "1000");
/// assert_eq!(expand(&msg, "^${to}$"), "^1000$");
/// ```
#[must_use]
pub fn expand<'a>(message: &Message, template: &'a str) -> Cow<'a, str> {
    if !template.contains("${") {
        return Cow::Borrowed(template);
    }

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut expanded = false;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        out.push_str(lookup(message, &after[..end]));
        rest = &after[end + 1..];
        expanded = true;
    }

    if !expanded {
        return Cow::Borrowed(template);
    }
    out.push_str(rest);
    Cow::Owned(out)
}

fn lookup<'m>(message: &'m Message, reference: &str) -> &'m str {
    let reference = reference.trim();
    let indexed = reference
        .strip_suffix(']')
        .and_then(|r| r.split_once('['))
        .and_then(|(name, idx)| Some((name.trim(), idx.trim().parse::<usize>().ok()?)));
    match indexed {
        Some((name, idx)) => message.get_all(name).get(idx).map_or("", String::as_str),
        None => message.get(reference).unwrap_or(""),
    }
}

/// Resolve the value a condition tests. Missing fields resolve to `""`.
#[must_use]
pub fn resolve_field<'a>(message: &'a Message, spec: &'a FieldSpec) -> Cow<'a, str> {
    match spec {
        FieldSpec::Header(name) => Cow::Borrowed(message.get(name).unwrap_or("")),
        FieldSpec::Template(template) => expand(message, template),
    }
}
