use chatplan::{AppResult, Applications, FileSource, Message, Router, Settings};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let settings = Settings::from_file("demos/settings.toml").expect("failed to load settings");
    let source = FileSource::from_settings(&settings).expect("settings name no chatplan file");
    let router = Router::with_settings(source, settings);

    let mut apps = Applications::new()
        .register("reply", |_, data| {
            println!("  -> reply: {data}");
            AppResult::Accepted
        })
        .register("notify", |_, data| {
            println!("  -> notify {data}");
            AppResult::Accepted
        })
        .register("log", |_, data| {
            println!("  -> log: {data}");
            AppResult::Accepted
        })
        .register("unsubscribe", |msg, data| {
            println!("  -> unsubscribe {data}");
            msg.mark_skip_global_process();
            AppResult::Terminate
        });

    let messages = [
        Message::new().with("from", "1000").with("to", "5551234"),
        Message::new().with("from", "1000").with("to", "911"),
        Message::new()
            .with("context", "support")
            .with("from", "2000")
            .with_body("HELP"),
        Message::new()
            .with("context", "support")
            .with("from", "2000")
            .with_body("stop"),
        Message::new().with("context", "sales").with("from", "3000"),
    ];

    for mut msg in messages {
        println!("{msg}");
        match router.send(&mut msg, &mut apps) {
            Ok(outcome) => println!("  {outcome:?}"),
            Err(err) => println!("  error: {err}"),
        }
    }
}
