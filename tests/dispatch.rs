use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chatplan::{
    AppResult, Applications, Chatplan, DispatchError, FileSource, Message, Router, SendOutcome,
    Settings,
};
use chrono::{DateTime, TimeZone, Utc};

// Wednesday 2024-05-15 14:30:00 UTC
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap()
}

const PLAN: &str = r#"
context default {
    extension greet {
        condition field=_body expression="^hello (\w+)$" {
            action set "greeted=$1"
            action reply "hi $1, this is ${to}"
            action stop ""
            action reply unreachable
        }
    }
    extension help {
        condition field=_body expression="^help$" {
            action reply "commands: hello <name>"
            action log "help for ${from}"
        }
    }
}
"#;

/// Applications that record every call into a shared log.
fn recording_apps() -> (Applications, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let record = |name: &'static str, log: &Arc<Mutex<Vec<String>>>, result: AppResult| {
        let log = Arc::clone(log);
        move |_: &mut Message, data: &str| {
            log.lock().unwrap().push(format!("{name}:{data}"));
            result
        }
    };
    let apps = Applications::new()
        .register("set", |msg: &mut Message, data: &str| {
            if let Some((name, value)) = data.split_once('=') {
                msg.set(name, value);
            }
            AppResult::Accepted
        })
        .register("reply", record("reply", &log, AppResult::Accepted))
        .register("log", record("log", &log, AppResult::Accepted))
        .register("stop", record("stop", &log, AppResult::Terminate));
    (apps, log)
}

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("chatplan_test_dispatch");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn halted_by_application() {
    let router = Router::new(Arc::new(Chatplan::from_dsl(PLAN).unwrap()));
    let (mut apps, log) = recording_apps();
    let mut msg = Message::new().with("to", "1000").with_body("hello bob");

    let outcome = router.send_at(&mut msg, &mut apps, now()).unwrap();
    assert_eq!(
        outcome,
        SendOutcome::Halted {
            executed: 3,
            application: "stop".into(),
        }
    );
    assert_eq!(
        *log.lock().unwrap(),
        ["reply:hi bob, this is 1000", "stop:"]
    );
    assert_eq!(msg.get("greeted"), Some("bob"));
}

#[test]
fn completed_with_expanded_data() {
    let router = Router::new(Arc::new(Chatplan::from_dsl(PLAN).unwrap()));
    let (mut apps, log) = recording_apps();
    let mut msg = Message::new().with("from", "carol").with_body("help");

    let outcome = router.send_at(&mut msg, &mut apps, now()).unwrap();
    assert_eq!(outcome, SendOutcome::Completed { executed: 2 });
    assert_eq!(
        *log.lock().unwrap(),
        ["reply:commands: hello <name>", "log:help for carol"]
    );
}

#[test]
fn no_actions() {
    let router = Router::new(Arc::new(Chatplan::from_dsl(PLAN).unwrap()));
    let (mut apps, log) = recording_apps();
    let mut msg = Message::new().with_body("what?");

    let outcome = router.send_at(&mut msg, &mut apps, now()).unwrap();
    assert_eq!(outcome, SendOutcome::NoActions);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn unknown_application_halts() {
    let plan = Chatplan::from_dsl("context default { extension x { condition { action teleport now } } }")
        .unwrap();
    let router = Router::new(Arc::new(plan));
    let (mut apps, _) = recording_apps();
    let mut msg = Message::new();

    assert_eq!(
        router.send_at(&mut msg, &mut apps, now()).unwrap(),
        SendOutcome::Halted {
            executed: 1,
            application: "teleport".into(),
        }
    );
}

#[test]
fn alternate_path_overrides_source() {
    let path = temp_file(
        "alternate.chatplan",
        "context default { extension alt { condition { action reply alternate } } }",
    );
    let router = Router::new(Arc::new(Chatplan::from_dsl(PLAN).unwrap()));
    let (mut apps, log) = recording_apps();
    let mut msg = Message::new()
        .with_body("help")
        .with("alt_path", path.to_string_lossy());

    let outcome = router.send_at(&mut msg, &mut apps, now()).unwrap();
    assert_eq!(outcome, SendOutcome::Completed { executed: 1 });
    assert_eq!(*log.lock().unwrap(), ["reply:alternate"]);

    std::fs::remove_file(&path).ok();
}

#[test]
fn unreadable_alternate_path_yields_no_actions() {
    let router = Router::new(Arc::new(Chatplan::from_dsl(PLAN).unwrap()));
    let (mut apps, _) = recording_apps();
    let mut msg = Message::new()
        .with_body("help")
        .with("alt_path", "/nonexistent/alternate.chatplan");

    assert_eq!(
        router.send_at(&mut msg, &mut apps, now()).unwrap(),
        SendOutcome::NoActions
    );
}

#[test]
fn empty_alternate_path_is_ignored() {
    let router = Router::new(Arc::new(Chatplan::from_dsl(PLAN).unwrap()));
    let (mut apps, _) = recording_apps();
    let mut msg = Message::new().with_body("help").with("alt_path", "");

    assert_eq!(
        router.send_at(&mut msg, &mut apps, now()).unwrap(),
        SendOutcome::Completed { executed: 2 }
    );
}

#[test]
fn file_source_picks_up_edits() {
    let path = temp_file(
        "reloaded.chatplan",
        "context default { extension v { condition { action reply one } } }",
    );
    let router = Router::new(FileSource::new(&path));
    let mut seen = Vec::new();
    let mut apps = |_: &mut Message, _: &str, data: &str| {
        seen.push(data.to_owned());
        AppResult::Accepted
    };

    router.send_at(&mut Message::new(), &mut apps, now()).unwrap();
    std::fs::write(
        &path,
        "context default { extension v { condition { action reply two } } }",
    )
    .unwrap();
    router.send_at(&mut Message::new(), &mut apps, now()).unwrap();

    assert_eq!(seen, ["one", "two"]);
    std::fs::remove_file(&path).ok();
}

#[test]
fn settings_change_contexts_and_forward_budget() {
    let settings = Settings::from_toml_str(
        r#"
default_context = "sms"
fallback_context = "catchall"
max_forwards = 2
"#,
    )
    .unwrap();
    let plan = Chatplan::builder()
        .context("sms", |c| {
            c.extension("s", |e| e.condition(|c| c.action("reply", "sms")))
        })
        .context("catchall", |c| {
            c.extension("f", |e| e.condition(|c| c.action("reply", "catchall")))
        })
        .compile()
        .unwrap();
    let router = Router::with_settings(Arc::new(plan), settings);
    let mut replies = Vec::new();
    let mut apps = |_: &mut Message, _: &str, data: &str| {
        replies.push(data.to_owned());
        AppResult::Accepted
    };

    let mut msg = Message::new();
    router.send_at(&mut msg, &mut apps, now()).unwrap();
    assert_eq!(msg.get("max_forwards"), Some("2"));
    assert_eq!(
        router.send_at(&mut msg, &mut apps, now()),
        Ok(SendOutcome::Completed { executed: 1 })
    );
    assert_eq!(msg.get("max_forwards"), Some("1"));
    assert_eq!(
        router.send_at(&mut msg, &mut apps, now()),
        Err(DispatchError::MaxForwardsReached)
    );

    let mut elsewhere = Message::new().with("context", "default");
    router.send_at(&mut elsewhere, &mut apps, now()).unwrap();

    assert_eq!(replies, ["sms", "sms", "catchall"]);
}
