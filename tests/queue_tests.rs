use std::thread;
use std::time::Duration;

use vacuum_bridge::error::BridgeError;
use vacuum_bridge::queue::command_queue::CommandQueue;
use vacuum_bridge::queue::timer::RefreshTimer;

type Log = Vec<&'static str>;

fn tick(log: &mut Log) -> Result<(), BridgeError> {
    log.push("tick");
    Ok(())
}

#[test]
fn tasks_run_in_order_despite_failures() {
    let queue: CommandQueue<Log> = CommandQueue::new();
    let handle = queue.handle();

    assert!(handle.enqueue("x", |log: &mut Log| {
        log.push("x");
        Err(BridgeError::Transport("broker down".into()))
    }));
    assert!(handle.enqueue("boom", |log: &mut Log| {
        log.push("boom");
        panic!("task blew up");
    }));
    assert!(handle.enqueue("y", |log: &mut Log| {
        log.push("y");
        Ok(())
    }));
    assert_eq!(handle.pending(), 3);
    assert!(handle.stop());

    let worker = queue.start_worker(Vec::new()).unwrap();
    let log = worker.join().unwrap();
    assert_eq!(log, vec!["x", "boom", "y"]);
}

#[test]
fn stop_runs_after_queued_tasks_and_closes_queue() {
    let queue: CommandQueue<Log> = CommandQueue::new();
    let handle = queue.handle();
    let worker = queue.start_worker(Vec::new()).unwrap();

    handle.enqueue("a", |log: &mut Log| {
        log.push("a");
        Ok(())
    });
    handle.stop();
    let log = worker.join().unwrap();
    assert_eq!(log, vec!["a"]);

    assert!(!handle.enqueue("late", |_: &mut Log| Ok(())));
}

#[test]
fn timer_enqueues_after_delay() {
    let queue: CommandQueue<Log> = CommandQueue::new();
    let handle = queue.handle();
    let mut timer = RefreshTimer::new(queue.handle());
    let worker = queue.start_worker(Vec::new()).unwrap();

    timer.schedule("tick", Duration::from_millis(10), tick);
    assert!(timer.is_armed());
    thread::sleep(Duration::from_millis(300));

    timer.cancel();
    assert!(!timer.is_armed());
    handle.stop();
    assert_eq!(worker.join().unwrap(), vec!["tick"]);
}

#[test]
fn cancelled_timer_never_fires() {
    let queue: CommandQueue<Log> = CommandQueue::new();
    let handle = queue.handle();
    let mut timer = RefreshTimer::new(queue.handle());
    let worker = queue.start_worker(Vec::new()).unwrap();

    timer.schedule("tick", Duration::from_millis(50), tick);
    timer.cancel();
    thread::sleep(Duration::from_millis(200));

    handle.stop();
    assert!(worker.join().unwrap().is_empty());
}

#[test]
fn rescheduling_replaces_pending_timer() {
    let queue: CommandQueue<Log> = CommandQueue::new();
    let handle = queue.handle();
    let mut timer = RefreshTimer::new(queue.handle());
    let worker = queue.start_worker(Vec::new()).unwrap();

    timer.schedule("tick", Duration::from_millis(50), tick);
    timer.schedule("tick", Duration::from_millis(50), tick);
    thread::sleep(Duration::from_millis(300));

    handle.stop();
    assert_eq!(worker.join().unwrap(), vec!["tick"]);
}
