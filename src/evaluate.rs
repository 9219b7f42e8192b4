use std::borrow::Cow;
use std::ops::ControlFlow;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::dispatch::Dispatcher;
use crate::matcher::{self, Captures, MatchOutcome};
use crate::substitute::substitute;
use crate::template::{expand, resolve_field};
use crate::types::{
    Action, ActionList, Chatplan, Condition, ConfigError, ExtensionStatus, ExtensionTrace,
    Extension, Message, Settings, TimeMatch, check_window, fields,
};

/// Everything one hunt produced.
#[derive(Debug)]
pub(crate) struct Walk {
    pub context: Option<String>,
    pub extensions: Vec<ExtensionTrace>,
    pub actions: ActionList,
}

/// How a single extension's walk ended.
#[derive(Debug)]
pub(crate) enum ExtensionOutcome {
    /// At least one action or anti-action list was reached.
    Proceeded(ActionList),
    NoMatch,
    Misconfigured(ConfigError),
}

/// Names used in log records for the extension being walked.
struct Scope<'a> {
    context: &'a str,
    extension: &'a str,
    to: &'a str,
}

pub(crate) fn hunt(
    chatplan: &Chatplan,
    message: &mut Message,
    apps: &mut dyn Dispatcher,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Walk {
    let requested = message
        .get(fields::CONTEXT)
        .unwrap_or(settings.default_context.as_str())
        .to_owned();

    info!(
        from = message
            .get(fields::FROM_USER)
            .or_else(|| message.get(fields::FROM))
            .unwrap_or(""),
        to = message
            .get(fields::TO_USER)
            .or_else(|| message.get(fields::TO))
            .unwrap_or(""),
        context = %requested,
        "processing text message"
    );

    let Some(context) = chatplan
        .context(&requested)
        .or_else(|| chatplan.context(&settings.fallback_context))
    else {
        warn!(context = %requested, "context not found");
        return Walk {
            context: None,
            extensions: Vec::new(),
            actions: ActionList::new(),
        };
    };

    let mut traces = Vec::new();
    let flow = context
        .extensions()
        .iter()
        .try_fold(ActionList::new(), |mut acc, extension| {
            let outcome = walk_extension(context.name(), extension, message, apps, now);
            let (status, produced) = match outcome {
                ExtensionOutcome::Proceeded(list) => (ExtensionStatus::Proceeded, list),
                ExtensionOutcome::NoMatch => (ExtensionStatus::NoMatch, ActionList::new()),
                ExtensionOutcome::Misconfigured(_) => {
                    (ExtensionStatus::Misconfigured, ActionList::new())
                }
            };
            traces.push(ExtensionTrace {
                name: extension.name().to_owned(),
                status,
                actions: produced.len(),
            });
            acc.append(produced);

            let stop = status != ExtensionStatus::NoMatch && !extension.continue_on_match();
            if stop {
                ControlFlow::Break(acc)
            } else {
                ControlFlow::Continue(acc)
            }
        });
    let actions = match flow {
        ControlFlow::Break(actions) | ControlFlow::Continue(actions) => actions,
    };

    Walk {
        context: Some(context.name().to_owned()),
        extensions: traces,
        actions,
    }
}

/// Walk one extension's conditions in order, collecting deferred actions.
pub(crate) fn walk_extension(
    context: &str,
    extension: &Extension,
    message: &mut Message,
    apps: &mut dyn Dispatcher,
    now: DateTime<Utc>,
) -> ExtensionOutcome {
    let to = message.get(fields::TO).unwrap_or("nobody").to_owned();
    let scope = Scope {
        context,
        extension: extension.name(),
        to: &to,
    };

    let mut list = ActionList::new();
    let mut proceeded = false;

    for condition in extension.conditions() {
        if condition.has_nested() {
            let err = ConfigError::NestedCondition {
                context: context.to_owned(),
                extension: scope.extension.to_owned(),
            };
            error!(context, extension = scope.extension, "{err}");
            return ExtensionOutcome::Misconfigured(err);
        }

        let outcome = evaluate_condition(condition, message, now, &scope);
        let candidates = if outcome.matched {
            if let Some(captures) = &outcome.captures {
                captures.publish(message);
            }
            condition.actions()
        } else {
            condition.anti_actions()
        };
        let captures = outcome.captures.as_ref().filter(|_| outcome.matched);

        for action in candidates {
            emit(action, captures, message, apps, &mut list, &scope);
            proceeded = true;
        }

        if condition.break_policy().should_stop(outcome.matched) {
            break;
        }
    }

    if proceeded {
        ExtensionOutcome::Proceeded(list)
    } else {
        ExtensionOutcome::NoMatch
    }
}

fn evaluate_condition(
    condition: &Condition,
    message: &Message,
    now: DateTime<Utc>,
    scope: &Scope<'_>,
) -> MatchOutcome {
    let time = check_window(condition.time_window(), message, now);
    match time {
        TimeMatch::Matched => debug!(
            context = scope.context,
            extension = scope.extension,
            to = scope.to,
            "date/time match (PASS)"
        ),
        TimeMatch::NotMatched => debug!(
            context = scope.context,
            extension = scope.extension,
            to = scope.to,
            "date/time match (FAIL)"
        ),
        TimeMatch::NotApplicable => {}
    }

    let Some(field) = condition.field() else {
        return match time {
            TimeMatch::NotApplicable => {
                debug!(
                    context = scope.context,
                    extension = scope.extension,
                    to = scope.to,
                    "absolute condition"
                );
                MatchOutcome::unconditional(true)
            }
            TimeMatch::Matched => MatchOutcome::unconditional(true),
            TimeMatch::NotMatched => MatchOutcome::unconditional(false),
        };
    };

    let value = resolve_field(message, field);
    let expression = condition.expression();
    let source = if expression.is_templated() {
        expand(message, expression.source())
    } else {
        Cow::Borrowed(expression.source())
    };

    let outcome = match &expression.compiled {
        Some(regex) => matcher::perform(&value, regex, expression.has_groups()),
        None => match Regex::new(&source) {
            Ok(regex) => matcher::perform(&value, &regex, matcher::declares_groups(&source)),
            Err(err) => {
                warn!(
                    context = scope.context,
                    extension = scope.extension,
                    expression = %source,
                    "invalid expression: {err}"
                );
                MatchOutcome::no_match()
            }
        },
    };

    debug!(
        context = scope.context,
        extension = scope.extension,
        to = scope.to,
        field = field.as_str(),
        value = %value,
        expression = %source,
        "regex ({})",
        if outcome.matched { "PASS" } else { "FAIL" }
    );
    outcome
}

fn emit(
    action: &Action,
    captures: Option<&Captures>,
    message: &mut Message,
    apps: &mut dyn Dispatcher,
    list: &mut ActionList,
    scope: &Scope<'_>,
) {
    let data = substitute(captures, action.data());
    for _ in 0..action.loop_count() {
        if action.is_inline() {
            let result = apps.dispatch(message, action.application(), &data);
            debug!(
                extension = scope.extension,
                application = action.application(),
                data = %data,
                ?result,
                "inline action"
            );
        } else {
            debug!(
                extension = scope.extension,
                application = action.application(),
                data = %data,
                "action"
            );
            list.push(action.application(), &*data);
        }
    }
}
