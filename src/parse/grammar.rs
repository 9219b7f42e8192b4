use winnow::ascii::till_line_ending;
use winnow::combinator::{alt, cut_err, not, opt, preceded, repeat, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

/// Element keywords. They end an element's attribute list.
const KEYWORDS: &[&str] = &["context", "extension", "condition", "action", "anti-action"];
/// Flag attributes that may appear without a value.
const FLAGS: &[&str] = &["continue", "inline"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Kind {
    Context,
    Extension,
    Condition,
    Action,
    AntiAction,
}

impl Kind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Kind::Context => "context",
            Kind::Extension => "extension",
            Kind::Condition => "condition",
            Kind::Action => "action",
            Kind::AntiAction => "anti-action",
        }
    }
}

/// One element as written: `kind positional* name[=value]* { children }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub kind: Kind,
    pub positional: Vec<String>,
    pub attributes: Vec<(String, Option<String>)>,
    pub children: Option<Vec<Element>>,
}

// -- Whitespace & comments --------------------------------------------------

fn ws(input: &mut &str) -> ModalResult<()> {
    let _: () = repeat(
        0..,
        alt((
            take_while(1.., |c: char| c.is_whitespace()).void(),
            ('#', till_line_ending).void(),
        )),
    )
    .parse_next(input)?;
    Ok(())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

// -- Values -----------------------------------------------------------------

fn string_literal(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = cut_err(any)
            .context(StrContext::Expected(StrContextValue::CharLiteral('"')))
            .parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = cut_err(any).parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

/// An unquoted token. Names stop at `=`; attribute values may contain it.
fn bare<'i>(allow_equals: bool) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    take_while(1.., move |c: char| {
        !c.is_whitespace() && !matches!(c, '{' | '}' | '"') && (allow_equals || c != '=')
    })
}

fn attr_value(input: &mut &str) -> ModalResult<String> {
    alt((string_literal, bare(true).map(str::to_owned)))
        .context(StrContext::Expected(StrContextValue::Description(
            "attribute value",
        )))
        .parse_next(input)
}

// -- Element parts ----------------------------------------------------------

fn keyword(input: &mut &str) -> ModalResult<Kind> {
    terminated(
        alt((
            "context".value(Kind::Context),
            "extension".value(Kind::Extension),
            "condition".value(Kind::Condition),
            "anti-action".value(Kind::AntiAction),
            "action".value(Kind::Action),
        )),
        not(one_of(is_name_char)),
    )
    .parse_next(input)
}

/// A value given without an attribute name, e.g. the context name in
/// `context default { ... }`.
fn positional(input: &mut &str) -> ModalResult<String> {
    ws.parse_next(input)?;
    if input.starts_with('"') {
        return string_literal.parse_next(input);
    }
    let checkpoint = input.checkpoint();
    let token = bare(false).parse_next(input)?;
    if KEYWORDS.contains(&token) || FLAGS.contains(&token) || input.starts_with('=') {
        input.reset(&checkpoint);
        return Err(ErrMode::from_input(input));
    }
    Ok(token.to_owned())
}

fn attribute(input: &mut &str) -> ModalResult<(String, Option<String>)> {
    ws.parse_next(input)?;
    let name = take_while(1.., is_name_char)
        .verify(|name: &str| !KEYWORDS.contains(&name))
        .parse_next(input)?;
    let value = opt(preceded('=', cut_err(attr_value))).parse_next(input)?;
    Ok((name.to_owned(), value))
}

fn block(input: &mut &str) -> ModalResult<Vec<Element>> {
    ws.parse_next(input)?;
    '{'.parse_next(input)?;
    let children: Vec<Element> = repeat(0.., element).parse_next(input)?;
    ws.parse_next(input)?;
    cut_err('}')
        .context(StrContext::Expected(StrContextValue::CharLiteral('}')))
        .parse_next(input)?;
    Ok(children)
}

fn element(input: &mut &str) -> ModalResult<Element> {
    ws.parse_next(input)?;
    let kind = keyword.parse_next(input)?;
    let positional: Vec<String> = repeat(0..=2, positional).parse_next(input)?;
    let attributes: Vec<(String, Option<String>)> = repeat(0.., attribute).parse_next(input)?;
    let children = opt(block).parse_next(input)?;
    Ok(Element {
        kind,
        positional,
        attributes,
        children,
    })
}

// -- Top-level parser -------------------------------------------------------

pub(crate) fn parse_document(input: &mut &str) -> ModalResult<Vec<Element>> {
    let elements: Vec<Element> = repeat(0.., element).parse_next(input)?;
    ws.parse_next(input)?;
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(input: &str) -> Vec<Element> {
        parse_document.parse(input).unwrap()
    }

    #[test]
    fn positional_name_and_block() {
        let elements = doc("context default { }");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, Kind::Context);
        assert_eq!(elements[0].positional, vec!["default"]);
        assert_eq!(elements[0].children.as_deref(), Some(&[][..]));
    }

    #[test]
    fn named_attribute_is_not_positional() {
        let elements = doc("extension name=echo continue {}");
        let ext = &elements[0];
        assert!(ext.positional.is_empty());
        assert_eq!(
            ext.attributes,
            vec![("name".into(), Some("echo".into())), ("continue".into(), None)]
        );
    }

    #[test]
    fn flags_are_not_positional() {
        let elements = doc("action reply \"hi there\" inline loop=2");
        let action = &elements[0];
        assert_eq!(action.kind, Kind::Action);
        assert_eq!(action.positional, vec!["reply", "hi there"]);
        assert_eq!(
            action.attributes,
            vec![("inline".into(), None), ("loop".into(), Some("2".into()))]
        );
        assert!(action.children.is_none());
    }

    #[test]
    fn keyword_ends_attribute_list() {
        let elements = doc("action reply\nanti-action log");
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].positional, vec!["reply"]);
        assert_eq!(elements[1].kind, Kind::AntiAction);
    }

    #[test]
    fn quoted_regex_keeps_backslashes() {
        let elements = doc(r#"condition expression="^(\d+)\"x\"$" {}"#);
        assert_eq!(
            elements[0].attributes[0].1.as_deref(),
            Some(r#"^(\d+)"x"$"#)
        );
    }

    #[test]
    fn bare_value_may_contain_equals() {
        let elements = doc("action application=set data=office=open");
        assert_eq!(elements[0].attributes[1].1.as_deref(), Some("office=open"));
    }

    #[test]
    fn comments_ignored() {
        let elements = doc("# top\ncontext a { # inside\n}\n# tail");
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn keyword_prefix_is_not_keyword() {
        assert!(parse_document.parse("contexts a {}").is_err());
    }

    #[test]
    fn unclosed_block_fails() {
        assert!(parse_document.parse("context a {").is_err());
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(parse_document.parse("context \"a {}").is_err());
    }
}
