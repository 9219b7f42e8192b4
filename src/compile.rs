use regex::Regex;
use tracing::warn;

use crate::types::{
    Action, ActionDef, BreakPolicy, Chatplan, CompileError, Condition, ConditionDef, Context,
    ContextDef, Expression, Extension, ExtensionDef, FieldSpec, TimeWindow,
};

pub(crate) fn compile(contexts: Vec<ContextDef>) -> Result<Chatplan, CompileError> {
    let contexts = contexts
        .into_iter()
        .map(compile_context)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Chatplan { contexts })
}

fn compile_context(def: ContextDef) -> Result<Context, CompileError> {
    if def.name.is_empty() {
        return Err(CompileError::EmptyContextName);
    }
    let extensions = def
        .extensions
        .into_iter()
        .map(|ext| compile_extension(&def.name, ext))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Context {
        name: def.name,
        extensions,
    })
}

fn compile_extension(context: &str, def: ExtensionDef) -> Result<Extension, CompileError> {
    let ext_name = def.name.as_deref().unwrap_or("_anon_");
    let conditions = def
        .conditions
        .into_iter()
        .map(|cond| compile_condition(context, ext_name, cond))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Extension {
        name: def.name,
        continue_on_match: def.continue_on_match,
        conditions,
    })
}

fn compile_condition(
    context: &str,
    extension: &str,
    def: ConditionDef,
) -> Result<Condition, CompileError> {
    let compiled = if def.expression.contains("${") {
        None
    } else {
        let regex = Regex::new(&def.expression).map_err(|source| {
            CompileError::InvalidExpression {
                context: context.to_owned(),
                extension: extension.to_owned(),
                expression: def.expression.clone(),
                source,
            }
        })?;
        Some(regex)
    };

    let break_policy = match def.break_on.as_deref() {
        None => BreakPolicy::default(),
        Some(raw) => raw.parse().unwrap_or_else(|err| {
            warn!(context, extension, "{err}, using on-false");
            BreakPolicy::OnFalse
        }),
    };

    let time_window =
        TimeWindow::parse(&def.time).map_err(|source| CompileError::InvalidTimeWindow {
            context: context.to_owned(),
            extension: extension.to_owned(),
            source,
        })?;

    let actions = compile_actions(context, extension, &def.actions)?;
    let anti_actions = compile_actions(context, extension, &def.anti_actions)?;

    Ok(Condition {
        field: def.field.as_deref().map(FieldSpec::new),
        expression: Expression {
            source: def.expression,
            compiled,
        },
        break_policy,
        time_window,
        actions,
        anti_actions,
        nested: def.nested,
    })
}

fn compile_actions(
    context: &str,
    extension: &str,
    defs: &[ActionDef],
) -> Result<Vec<Action>, CompileError> {
    defs.iter()
        .map(|def| {
            if def.application.is_empty() {
                return Err(CompileError::EmptyApplication {
                    context: context.to_owned(),
                    extension: extension.to_owned(),
                });
            }
            Ok(Action::from_def(def))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimeWindowError;

    fn single_condition(cond: ConditionDef) -> Vec<ContextDef> {
        vec![ContextDef {
            name: "default".into(),
            extensions: vec![ExtensionDef {
                name: Some("x".into()),
                continue_on_match: false,
                conditions: vec![cond],
            }],
        }]
    }

    #[test]
    fn static_expression_is_precompiled() {
        let plan = compile(single_condition(ConditionDef {
            field: Some("to".into()),
            expression: "^1000$".into(),
            ..ConditionDef::default()
        }))
        .unwrap();
        let cond = &plan.contexts[0].extensions[0].conditions[0];
        assert!(!cond.expression().is_templated());
        assert_eq!(cond.field(), Some(&FieldSpec::Header("to".into())));
    }

    #[test]
    fn templated_expression_is_deferred() {
        let plan = compile(single_condition(ConditionDef {
            field: Some("to".into()),
            expression: "^${from}$".into(),
            ..ConditionDef::default()
        }))
        .unwrap();
        assert!(plan.contexts[0].extensions[0].conditions[0]
            .expression()
            .is_templated());
    }

    #[test]
    fn invalid_static_expression() {
        let err = compile(single_condition(ConditionDef {
            field: Some("to".into()),
            expression: "^(1000$".into(),
            ..ConditionDef::default()
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidExpression { ref context, ref extension, ref expression, .. }
                if context == "default" && extension == "x" && expression == "^(1000$"
        ));
    }

    #[test]
    fn unknown_break_falls_back_to_on_false() {
        let plan = compile(single_condition(ConditionDef {
            break_on: Some("sometimes".into()),
            ..ConditionDef::default()
        }))
        .unwrap();
        assert_eq!(
            plan.contexts[0].extensions[0].conditions[0].break_policy(),
            BreakPolicy::OnFalse
        );
    }

    #[test]
    fn unknown_time_attribute() {
        let err = compile(single_condition(ConditionDef {
            time: vec![("weekday".into(), "1".into())],
            ..ConditionDef::default()
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            CompileError::InvalidTimeWindow {
                source: TimeWindowError::UnknownAttribute(ref a),
                ..
            } if a == "weekday"
        ));
    }

    #[test]
    fn empty_application_rejected() {
        let err = compile(single_condition(ConditionDef {
            anti_actions: vec![ActionDef::new("", "data")],
            ..ConditionDef::default()
        }))
        .unwrap_err();
        assert!(matches!(err, CompileError::EmptyApplication { .. }));
    }

    #[test]
    fn empty_context_name_rejected() {
        let err = compile(vec![ContextDef::default()]).unwrap_err();
        assert!(matches!(err, CompileError::EmptyContextName));
    }

    #[test]
    fn anonymous_extension_named_in_errors() {
        let err = compile(vec![ContextDef {
            name: "default".into(),
            extensions: vec![ExtensionDef {
                conditions: vec![ConditionDef {
                    expression: "[".into(),
                    ..ConditionDef::default()
                }],
                ..ExtensionDef::default()
            }],
        }])
        .unwrap_err();
        assert!(
            matches!(err, CompileError::InvalidExpression { ref extension, .. } if extension == "_anon_")
        );
    }
}
