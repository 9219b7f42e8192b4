use std::sync::Arc;
use std::thread;

use chatplan::{AppResult, Chatplan, Message, ReloadableSource, Router};

fn plan(greeting: &str) -> Chatplan {
    Chatplan::builder()
        .context("default", |c| {
            c.extension("greet", |e| {
                e.condition(|c| {
                    c.field("from")
                        .expression(r"^user(\d+)$")
                        .action("reply", &format!("{greeting}, user $1"))
                })
            })
        })
        .compile()
        .expect("failed to compile chatplan")
}

fn main() {
    let router = Arc::new(Router::new(ReloadableSource::new(plan("hello"))));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let r = Arc::clone(&router);
            thread::spawn(move || {
                // Each thread owns its message; the plan is shared.
                let mut msg = Message::new().with("from", format!("user{i}"));
                let mut apps = |_: &mut Message, app: &str, data: &str| {
                    println!("Thread {i}: {app}({data})");
                    AppResult::Accepted
                };
                let outcome = r.send(&mut msg, &mut apps);
                println!("Thread {i}: {outcome:?}");
            })
        })
        .collect();

    // Swap in a new plan while the workers run.
    router.source().replace(plan("welcome back"));

    for h in handles {
        h.join().unwrap();
    }
}
