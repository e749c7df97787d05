//! Two workers sleeping side by side under one entry task.
//!
//! Run with `RUST_LOG=debug` to watch the scheduler pick tasks.

use cotask::Task;
use std::time::{Duration, Instant};

fn worker(name: &'static str, sleep: Duration) -> Task {
    Task::named(name, move |co| async move {
        println!("Starting {name}...");
        co.await_time(sleep).await;
        println!("Ending {name}...");
        name
    })
}

#[cotask::main]
async fn main(co: Co) {
    env_logger::init();

    println!("Starting main...");
    let start = Instant::now();

    co.create_task(worker("task1", Duration::from_millis(500))).await;
    co.create_task(worker("task2", Duration::from_millis(500))).await;

    let finished = co.await_all_tasks().await;

    println!("Finished {finished:?} in {:?}", start.elapsed());
    println!("Ending main...");
}
