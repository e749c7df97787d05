//! Awaiting sub-tasks synchronously, with a custom command in the table.

use cotask::{CommandExecutionError, EventLoop, Params, Task, Value, signal};
use std::time::Duration;

fn fetch(_: &mut EventLoop, params: &Params) -> Result<Value, CommandExecutionError> {
    let key = params
        .require("fetch", "key")?
        .as_str()
        .ok_or_else(|| CommandExecutionError::Failed("key must be a string".into()))?;

    Ok(Value::from(format!("value of {key}")))
}

fn lookup(key: &'static str) -> Task {
    Task::named(key, move |co| async move {
        co.await_time(Duration::from_millis(50)).await;
        co.signal(signal!(fetch, key = key)).await
    })
}

fn main() {
    env_logger::init();

    let mut event_loop = EventLoop::builder()
        .command("fetch", fetch, "could not fetch the key")
        .build();

    let entry = Task::named("main", |co| async move {
        let first = co.await_coroutine(lookup("alpha")).await;
        println!("got {first}");

        let second = co.await_coroutine(lookup("beta")).await;
        println!("got {second}");

        // Reported and recovered: the key is missing.
        let missing = co.signal(signal!(fetch)).await;
        println!("missing key resumed with {missing}");
    });

    match event_loop.run(entry) {
        Ok(_) => println!("{} recovered failure(s)", event_loop.failures().len()),
        Err(err) => eprintln!("event loop failed: {err}"),
    }
}
