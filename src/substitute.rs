//! Backreference substitution of regex captures into action data.

use std::borrow::Cow;

use crate::matcher::Captures;

/// Replace `$N` / `${N}` in `template` with capture N. `\$` yields a literal
/// `$`; any other backslash is kept as is, as is a `$` not followed by
/// digits. Missing captures substitute as empty.
///
/// Without captures the template is returned unchanged.
///
/// ```
/// use chatplan::{matcher::Captures, substitute::substitute};
///
/// let caps = Captures::new(vec!["42-7".into(), "42".into(), "7".into()]);
/// assert_eq!(substitute(Some(&caps), "$1:$2"), "42:7");
/// ```
#[must_use]
pub fn substitute<'a>(captures: Option<&Captures>, template: &'a str) -> Cow<'a, str> {
    let Some(captures) = captures else {
        return Cow::Borrowed(template);
    };
    if !template.contains('$') {
        return Cow::Borrowed(template);
    }

    let bytes = template.as_bytes();
    let mut out = String::with_capacity(template.len() + captures.total_len());
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'$') => {
                out.push_str(&template[literal_start..i]);
                out.push('$');
                i += 2;
                literal_start = i;
            }
            b'$' => match backreference(&bytes[i + 1..]) {
                Some((index, consumed)) => {
                    out.push_str(&template[literal_start..i]);
                    out.push_str(captures.get(index).unwrap_or(""));
                    i += 1 + consumed;
                    literal_start = i;
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    out.push_str(&template[literal_start..]);
    Cow::Owned(out)
}

/// Parse the part after `$`: `12` or `{12}`. Returns the capture index and
/// the number of bytes consumed.
fn backreference(rest: &[u8]) -> Option<(usize, usize)> {
    let braced = rest.first() == Some(&b'{');
    let digits_start = usize::from(braced);
    let digits = rest[digits_start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    let mut consumed = digits_start + digits;
    if braced {
        if rest.get(consumed) != Some(&b'}') {
            return None;
        }
        consumed += 1;
    }
    let index = rest[digits_start..digits_start + digits]
        .iter()
        .try_fold(0_usize, |acc, b| {
            acc.checked_mul(10)?.checked_add(usize::from(b - b'0'))
        })
        .unwrap_or(usize::MAX);
    Some((index, consumed))
}
