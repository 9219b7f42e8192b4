use chatplan::{AppResult, BreakPolicy, Chatplan, Message};

fn main() {
    // Define the chatplan
    let plan = Chatplan::builder()
        .context("default", |c| {
            c.extension("echo", |e| {
                e.condition(|c| {
                    c.field("to")
                        .expression(r"^(\d{3})(\d{4})$")
                        .break_on(BreakPolicy::OnFalse)
                        .action("reply", "area $1, line $2")
                        .anti_action("log", "not a local number")
                })
            })
        })
        .compile()
        .expect("failed to compile chatplan");

    println!("{plan}");

    // Hunt a message; inline actions would be handed to this closure
    let mut apps = |_: &mut Message, app: &str, data: &str| {
        println!("inline {app}({data})");
        AppResult::Accepted
    };
    let mut msg = Message::new().with("from", "1000").with("to", "5551234");

    let actions = plan.hunt(&mut msg, &mut apps);
    if actions.is_empty() {
        println!("No actions.");
    }
    for action in &actions {
        println!("Action: {action}");
    }
}
