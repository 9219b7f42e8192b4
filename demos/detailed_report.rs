use chatplan::{ActionDef, AppResult, Chatplan, Message, Settings};
use chrono::Utc;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let plan = Chatplan::builder()
        .context("default", |c| {
            c.extension("office-hours", |e| {
                e.continue_on_match(true).condition(|c| {
                    c.time("wday", "mon-fri")
                        .time("time-of-day", "09:00-17:00")
                        .action("notify", "desk")
                        .anti_action("notify", "voicemail")
                })
            })
            .extension("numbers", |e| {
                e.condition(|c| {
                    c.field("to")
                        .expression(r"^(\d+)$")
                        .action_def(ActionDef::new("set", "last_number=$1").inline())
                        .action("reply", "thanks for writing to $1")
                })
            })
            .extension("never-reached", |e| e.condition(|c| c.action("log", "tail")))
        })
        .compile()
        .expect("failed to compile chatplan");

    let mut apps = |msg: &mut Message, app: &str, data: &str| {
        if app == "set" {
            if let Some((name, value)) = data.split_once('=') {
                msg.set(name, value);
            }
        }
        AppResult::Accepted
    };
    let mut msg = Message::new()
        .with("from", "alice")
        .with("to", "1000")
        .with("tod_tz_offset", "0");

    let report = plan.hunt_detailed(&mut msg, &mut apps, &Settings::default(), Utc::now());

    println!("{report}");
    println!();
    for trace in report.extensions() {
        println!(
            "  {:<14} {:?} ({} actions)",
            trace.name, trace.status, trace.actions
        );
    }
    println!("Captures: {:?}", msg.get_all("DP_MATCH"));
    println!("Set inline: {:?}", msg.get("last_number"));
    println!("Duration: {:?}", report.duration());
}
