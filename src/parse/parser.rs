use crate::types::{
    ActionDef, ConditionDef, ContextDef, ExtensionDef, TIME_ATTRIBUTES, is_true,
};

use super::error::ParseError;
use super::grammar::{Element, Kind};

/// The result of parsing a DSL input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChatplan {
    pub contexts: Vec<ContextDef>,
}

pub(crate) fn build(elements: Vec<Element>) -> Result<ParsedChatplan, ParseError> {
    let contexts = elements
        .into_iter()
        .map(|element| match element.kind {
            Kind::Context => build_context(element),
            other => Err(misplaced(other, "the top level")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ParsedChatplan { contexts })
}

fn build_context(element: Element) -> Result<ContextDef, ParseError> {
    let mut name = positional_at_most(&element, 1)?.first().cloned();
    for (attr, value) in &element.attributes {
        match attr.as_str() {
            "name" => name = Some(required(element.kind, attr, value.as_deref())?.to_owned()),
            _ => return Err(unknown_attribute(element.kind, attr)),
        }
    }
    let name = name.ok_or_else(|| ParseError::UnnamedContext)?;

    let extensions = children(element.children)
        .into_iter()
        .map(|child| match child.kind {
            Kind::Extension => build_extension(child),
            other => Err(misplaced(other, "a context")),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ContextDef { name, extensions })
}

fn build_extension(element: Element) -> Result<ExtensionDef, ParseError> {
    let mut def = ExtensionDef {
        name: positional_at_most(&element, 1)?.first().cloned(),
        ..ExtensionDef::default()
    };
    for (attr, value) in &element.attributes {
        match attr.as_str() {
            "name" => def.name = Some(required(element.kind, attr, value.as_deref())?.to_owned()),
            "continue" => def.continue_on_match = value.as_deref().map_or(true, is_true),
            _ => return Err(unknown_attribute(element.kind, attr)),
        }
    }

    def.conditions = children(element.children)
        .into_iter()
        .map(|child| match child.kind {
            Kind::Condition => build_condition(child),
            other => Err(misplaced(other, "an extension")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(def)
}

fn build_condition(element: Element) -> Result<ConditionDef, ParseError> {
    positional_at_most(&element, 0)?;
    let mut def = ConditionDef::default();
    for (attr, value) in &element.attributes {
        let value = required(element.kind, attr, value.as_deref())?;
        match attr.as_str() {
            "field" => def.field = Some(value.to_owned()),
            "expression" => value.clone_into(&mut def.expression),
            "break" => def.break_on = Some(value.to_owned()),
            time if TIME_ATTRIBUTES.contains(&time) => {
                def.time.push((time.to_owned(), value.to_owned()));
            }
            _ => return Err(unknown_attribute(element.kind, attr)),
        }
    }

    for child in children(element.children) {
        match child.kind {
            Kind::Action => def.actions.push(build_action(child)?),
            Kind::AntiAction => def.anti_actions.push(build_action(child)?),
            Kind::Condition => def.nested.push(build_condition(child)?),
            other => return Err(misplaced(other, "a condition")),
        }
    }
    Ok(def)
}

fn build_action(element: Element) -> Result<ActionDef, ParseError> {
    if element.children.is_some() {
        return Err(ParseError::UnexpectedBlock(element.kind.as_str()));
    }
    let positional = positional_at_most(&element, 2)?;
    let mut def = ActionDef::new(
        positional.first().map_or("", String::as_str),
        positional.get(1).map_or("", String::as_str),
    );
    for (attr, value) in &element.attributes {
        match attr.as_str() {
            "application" => {
                required(element.kind, attr, value.as_deref())?.clone_into(&mut def.application);
            }
            "data" => required(element.kind, attr, value.as_deref())?.clone_into(&mut def.data),
            "inline" => def.inline = value.as_deref().map_or(true, is_true),
            "loop" => {
                let raw = required(element.kind, attr, value.as_deref())?;
                def.loop_count = raw
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::InvalidLoop(raw.to_owned()))?;
            }
            _ => return Err(unknown_attribute(element.kind, attr)),
        }
    }
    Ok(def)
}

fn children(children: Option<Vec<Element>>) -> Vec<Element> {
    children.unwrap_or_default()
}

fn positional_at_most(element: &Element, max: usize) -> Result<&[String], ParseError> {
    if element.positional.len() > max {
        return Err(ParseError::TooManyValues {
            element: element.kind.as_str(),
            max,
            found: element.positional.len(),
        });
    }
    Ok(&element.positional)
}

fn required<'a>(kind: Kind, attr: &str, value: Option<&'a str>) -> Result<&'a str, ParseError> {
    value.ok_or_else(|| ParseError::MissingValue {
        element: kind.as_str(),
        attribute: attr.to_owned(),
    })
}

fn unknown_attribute(kind: Kind, attr: &str) -> ParseError {
    ParseError::UnknownAttribute {
        element: kind.as_str(),
        attribute: attr.to_owned(),
    }
}

fn misplaced(kind: Kind, place: &'static str) -> ParseError {
    ParseError::Misplaced {
        element: kind.as_str(),
        place,
    }
}
