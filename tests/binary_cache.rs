#![cfg(feature = "binary-cache")]

use chatplan::serial::{is_fresh, DeserializeError};
use chatplan::{ActionDef, AppResult, BreakPolicy, Chatplan, Message};
use chrono::{DateTime, TimeZone, Utc};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DSL: &str = r#"
context default {
    extension echo {
        condition field=to expression="^(\d+)$" {
            action reply "you wrote to $1"
        }
    }
}
"#;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 14, 30, 0).unwrap()
}

fn accept(_: &mut Message, _: &str, _: &str) -> AppResult {
    AppResult::Accepted
}

fn hunt(plan: &Chatplan, msg: &Message) -> String {
    plan.hunt_at(&mut msg.clone(), &mut accept, now()).to_string()
}

fn simple_chatplan() -> Chatplan {
    Chatplan::from_dsl(DSL).unwrap()
}

fn complex_chatplan() -> Chatplan {
    Chatplan::builder()
        .context("default", |c| {
            c.extension("office", |e| {
                e.continue_on_match(true).condition(|c| {
                    c.time("wday", "mon-fri")
                        .time("time-of-day", "09:00-17:00")
                        .action("notify", "desk")
                        .anti_action("notify", "voicemail")
                })
            })
            .extension("pair", |e| {
                e.condition(|c| {
                    c.field("to")
                        .expression(r"^(\d+)-(\d+)$")
                        .break_on(BreakPolicy::Never)
                        .action_def(ActionDef::new("reply", "$2/$1").repeat(2))
                })
                .condition(|c| {
                    c.field("${from}")
                        .expression("^${to}$")
                        .action_def(ActionDef::new("log", "self").inline())
                })
            })
            .anonymous_extension(|e| e.condition(|c| c.action("log", "tail")))
        })
        .context("global", |c| {
            c.extension("fallback", |e| e.condition(|c| c.action("reply", "global")))
        })
        .compile()
        .unwrap()
}

fn eval_messages() -> Vec<Message> {
    vec![
        Message::new().with("to", "1000"),
        Message::new().with("to", "42-7").with("tod_tz_offset", "0"),
        Message::new().with("to", "42-7").with("tod_tz_offset", "-12"),
        Message::new().with("to", "bob").with("from", "bob"),
        Message::new().with("context", "elsewhere"),
    ]
}

// ---------------------------------------------------------------------------
// Round-trips
// ---------------------------------------------------------------------------

#[test]
fn round_trip_simple() {
    let original = simple_chatplan();
    let bytes = original.to_bytes(None).unwrap();
    let restored = Chatplan::from_bytes(&bytes).unwrap();

    for msg in eval_messages() {
        assert_eq!(hunt(&original, &msg), hunt(&restored, &msg));
    }
    assert_eq!(
        hunt(&restored, &Message::new().with("to", "1000")),
        "[reply(you wrote to 1000)]"
    );
}

#[test]
fn round_trip_complex() {
    let original = complex_chatplan();
    let bytes = original.to_bytes(None).unwrap();
    let restored = Chatplan::from_bytes(&bytes).unwrap();

    assert_eq!(original.to_defs(), restored.to_defs());
    for msg in eval_messages() {
        assert_eq!(hunt(&original, &msg), hunt(&restored, &msg));
    }
    assert_eq!(
        hunt(&restored, &eval_messages()[1]),
        "[notify(desk), reply(7/42), reply(7/42)]"
    );
}

#[test]
fn source_digest_tracks_freshness() {
    let original = simple_chatplan();
    let bytes = original.to_bytes(Some(DSL)).unwrap();

    assert!(is_fresh(&bytes, DSL).unwrap());
    assert!(!is_fresh(&bytes, "context default {}").unwrap());

    let undigested = original.to_bytes(None).unwrap();
    assert!(!is_fresh(&undigested, DSL).unwrap());
}

// ---------------------------------------------------------------------------
// Corruption
// ---------------------------------------------------------------------------

#[test]
fn corruption_byte_flip() {
    let bytes = simple_chatplan().to_bytes(None).unwrap();
    let mut corrupted = bytes.clone();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0xFF;

    let err = Chatplan::from_bytes(&corrupted).unwrap_err();
    assert!(
        matches!(err, DeserializeError::ChecksumMismatch),
        "expected ChecksumMismatch, got: {err}"
    );
}

#[test]
fn corruption_truncation() {
    let bytes = simple_chatplan().to_bytes(None).unwrap();
    let truncated = &bytes[..33];

    let err = Chatplan::from_bytes(truncated).unwrap_err();
    assert!(
        matches!(err, DeserializeError::LengthMismatch { .. }),
        "expected LengthMismatch, got: {err}"
    );
}

#[test]
fn bad_magic() {
    let mut bad = simple_chatplan().to_bytes(None).unwrap();
    bad[0..4].copy_from_slice(b"BAAD");

    let err = Chatplan::from_bytes(&bad).unwrap_err();
    assert!(
        matches!(err, DeserializeError::BadMagic),
        "expected BadMagic, got: {err}"
    );
}

#[test]
fn version_mismatch() {
    let mut bad = simple_chatplan().to_bytes(None).unwrap();
    bad[4] = 99;
    bad[5] = 0;

    let err = Chatplan::from_bytes(&bad).unwrap_err();
    assert!(
        matches!(
            err,
            DeserializeError::IncompatibleVersion {
                blob: 99,
                supported: 1
            }
        ),
        "expected IncompatibleVersion, got: {err}"
    );
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

#[test]
fn file_round_trip() {
    let dir = std::env::temp_dir().join("chatplan_test_binary_cache");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("test.chplbin");

    let original = complex_chatplan();
    original.to_binary_file(&path, None).unwrap();
    let restored = Chatplan::from_binary_file(&path).unwrap();

    for msg in eval_messages() {
        assert_eq!(hunt(&original, &msg), hunt(&restored, &msg));
    }

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_file() {
    let err = Chatplan::from_binary_file("/nonexistent/cache.chplbin").unwrap_err();
    assert!(matches!(err, DeserializeError::Io(_)));
}
