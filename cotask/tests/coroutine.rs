use cotask::{COROUTINE_FAILED, EventLoop, EventLoopBuilder, NestedQueue, Task, Value, signal};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

type Log = Rc<RefCell<Vec<String>>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_await_coroutine_returns_the_result() {
    let mut event_loop = EventLoop::new();

    let result = event_loop
        .run(Task::new(|co| async move {
            let sub = Task::new(|co| async move {
                co.await_time(Duration::from_millis(5)).await;
                "sub result"
            });
            co.await_coroutine(sub).await
        }))
        .unwrap();

    assert_eq!(result, Value::from("sub result"));
}

#[test]
fn test_caller_is_blocked_until_the_target_finishes() {
    let log: Log = Rc::default();
    let mut event_loop = EventLoop::new();

    let outer = log.clone();
    event_loop
        .run(Task::new(move |co| async move {
            let inner = outer.clone();
            let sub = Task::new(move |co| async move {
                inner.borrow_mut().push("sub start".to_owned());
                co.await_time(Duration::from_millis(10)).await;
                co.none().await;
                inner.borrow_mut().push("sub end".to_owned());
            });

            outer.borrow_mut().push("caller before".to_owned());
            co.await_coroutine(sub).await;
            outer.borrow_mut().push("caller after".to_owned());
        }))
        .unwrap();

    assert_eq!(
        *log.borrow(),
        ["caller before", "sub start", "sub end", "caller after"]
    );
}

#[test]
fn test_sub_tasks_run_on_their_own_queue() {
    let mut event_loop = EventLoop::new();

    let result = event_loop
        .run(Task::new(|co| async move {
            co.create_task(Task::named("outer child", |_| async { "outer" }))
                .await;

            let sub = Task::new(|co| async move {
                co.create_task(Task::named("inner child", |_| async { "inner" }))
                    .await;
                co.await_all_tasks().await
            });

            co.await_coroutine(sub).await
        }))
        .unwrap();

    assert_eq!(result, Value::List(vec![Value::from("inner")]));
    assert_eq!(event_loop.queued(), 1);
    assert_eq!(event_loop.pending_tasks()[0].name(), Some("outer child"));
}

#[test]
fn test_isolated_nested_queue_drains_leftovers() {
    let log: Log = Rc::default();
    let mut event_loop = EventLoop::new();

    let outer = log.clone();
    let result = event_loop
        .run(Task::new(move |co| async move {
            let inner = outer.clone();
            let sub = Task::new(move |co| async move {
                let child_log = inner.clone();
                co.create_task(Task::new(move |co| async move {
                    co.await_time(Duration::from_millis(5)).await;
                    child_log.borrow_mut().push("child ran".to_owned());
                }))
                .await;
                inner.borrow_mut().push("sub done".to_owned());
                "sub"
            });

            let value = co.await_coroutine(sub).await;
            outer.borrow_mut().push("caller resumed".to_owned());
            value
        }))
        .unwrap();

    assert_eq!(result, Value::from("sub"));
    assert_eq!(*log.borrow(), ["sub done", "child ran", "caller resumed"]);
    assert_eq!(event_loop.queued(), 0);
}

#[test]
fn test_shared_nested_queue_keeps_leftovers() {
    let mut event_loop = EventLoopBuilder::new()
        .nested_queue(NestedQueue::Shared)
        .build();

    let result = event_loop
        .run(Task::new(|co| async move {
            let sub = Task::new(|co| async move {
                co.create_task(Task::new(|_| async { "left behind" })).await;
            });
            co.await_coroutine(sub).await;
            co.await_all_tasks().await
        }))
        .unwrap();

    assert_eq!(result, Value::List(vec![Value::from("left behind")]));
}

#[test]
fn test_failing_coroutine_is_reported_not_raised() {
    init_logging();
    let mut event_loop = EventLoop::new();

    let result = event_loop
        .run(Task::new(|co| async move {
            let broken = Task::new(|co| async move {
                co.signal(signal!(does_not_exist)).await;
            });
            let value = co.await_coroutine(broken).await;
            value.is_null().then_some("caller survived")
        }))
        .unwrap();

    assert_eq!(result, Value::from("caller survived"));

    let failure = &event_loop.failures()[0];
    assert_eq!(failure.command, "await_coroutine");
    assert_eq!(failure.context, COROUTINE_FAILED);
    assert!(failure.error.contains("does_not_exist"));
}

#[test]
fn test_awaiting_a_finished_task_is_recovered() {
    let mut event_loop = EventLoop::new();
    let done = Task::new(|_| async { 1 });
    event_loop.run(done.clone()).unwrap();

    let result = event_loop
        .run(Task::new(move |co| async move {
            co.await_coroutine(done).await;
            "ok"
        }))
        .unwrap();

    assert_eq!(result, Value::from("ok"));
    assert_eq!(event_loop.failures().len(), 1);
    assert!(event_loop.failures()[0].error.contains("already completed"));
}

#[test]
fn test_coroutines_nest_several_levels() {
    fn level(n: i64) -> Task {
        Task::new(move |co| async move {
            if n == 0 {
                return 0;
            }
            let below = co.await_coroutine(level(n - 1)).await;
            below.as_int().unwrap_or(-100) + 1
        })
    }

    let mut event_loop = EventLoop::new();
    let result = event_loop.run(level(5)).unwrap();

    assert_eq!(result, Value::Int(5));
}

#[test]
fn test_custom_commands_reach_nested_loops() {
    fn answer(_: &mut EventLoop, _: &cotask::Params) -> Result<Value, cotask::CommandExecutionError> {
        Ok(Value::Int(42))
    }

    let mut event_loop = EventLoop::builder()
        .command("answer", answer, "no answer")
        .build();

    let result = event_loop
        .run(Task::new(|co| async move {
            let sub = Task::new(|co| async move { co.signal(signal!(answer)).await });
            co.await_coroutine(sub).await
        }))
        .unwrap();

    assert_eq!(result, Value::Int(42));
}

#[test]
fn test_awaited_queued_task_is_not_run_twice() {
    let mut event_loop = EventLoop::new();

    let result = event_loop
        .run(Task::new(|co| async move {
            let target = Task::new(|_| async { "target" });

            co.create_task(Task::new(|_| async { "sibling" })).await;
            co.create_task(target.clone()).await;

            let awaited = co.await_coroutine(target).await;
            let rest = co.await_all_tasks().await;
            Value::List(vec![awaited, Value::List(rest)])
        }))
        .unwrap();

    assert_eq!(
        result,
        Value::List(vec![
            Value::from("target"),
            Value::List(vec![Value::from("sibling")])
        ])
    );
    assert!(event_loop.failures().is_empty());
}

#[test]
fn test_task_cannot_be_driven_while_its_command_runs() {
    init_logging();
    let log: Log = Rc::default();
    let slot: Rc<RefCell<Option<Task>>> = Rc::default();
    let mut event_loop = EventLoop::new();

    let child_slot = slot.clone();
    let child_log = log.clone();
    let parent_log = log.clone();
    let parent = Task::named("parent", move |co| async move {
        let child = Task::new(move |co| async move {
            let parent = child_slot.borrow().clone();
            child_log.borrow_mut().push("child awaits parent".to_owned());
            match parent {
                Some(parent) => co.await_coroutine(parent).await,
                None => Value::from("no parent"),
            }
        });

        co.create_task(child).await;
        let results = co.await_all_tasks().await;
        parent_log.borrow_mut().push("parent resumed".to_owned());
        results
    });
    *slot.borrow_mut() = Some(parent.clone());

    let result = event_loop.run(parent);
    slot.borrow_mut().take();

    assert_eq!(result.unwrap(), Value::List(vec![Value::Null]));
    assert_eq!(*log.borrow(), ["child awaits parent", "parent resumed"]);

    let failure = &event_loop.failures()[0];
    assert_eq!(failure.command, "await_coroutine");
    assert!(failure.error.contains("already being driven"));
}
