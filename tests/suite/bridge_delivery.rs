//! Bridge delivery guarantees with many concurrent submissions.

use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};

use tether_runtime::ui_queue::channel;
use tether_runtime::{Bridge, TaskError, TaskOutcome, Worker, launch};
use tokio::time::sleep;

#[derive(Default)]
struct Tally {
    ok: Vec<usize>,
    cancelled: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, outcome: TaskOutcome<usize>) {
        match outcome {
            Ok(i) => self.ok.push(i),
            Err(TaskError::Cancelled) => self.cancelled += 1,
            Err(_) => self.failed += 1,
        }
    }

    fn total(&self) -> usize {
        self.ok.len() + self.cancelled + self.failed
    }
}

#[test]
fn every_submission_is_delivered_exactly_once() {
    let worker = Worker::start("bridge-it").unwrap();
    let (tx, mut queue) = channel::<Tally>();
    let bridge = Bridge::new(worker.handle().clone(), tx);

    let mut aborts = Vec::new();
    for i in 0..100_usize {
        let abort = bridge.run(
            async move {
                sleep(Duration::from_millis((i % 7) as u64)).await;
                if i % 10 == 9 {
                    return Err(TaskError::Failed(format!("unit {i} failed")));
                }
                if i % 25 == 0 {
                    // Long enough that the abort below always wins.
                    sleep(Duration::from_secs(60)).await;
                }
                Ok(i)
            },
            Tally::record,
        );
        if i % 25 == 0 {
            aborts.push(abort);
        }
    }
    for abort in &aborts {
        abort.abort();
    }

    let mut tally = Tally::default();
    let deadline = Instant::now() + Duration::from_secs(10);
    while tally.total() < 100 && Instant::now() < deadline {
        queue.drain(&mut tally, 64);
        thread::sleep(Duration::from_millis(5));
    }
    thread::sleep(Duration::from_millis(50));
    queue.drain(&mut tally, 64);

    assert_eq!(tally.total(), 100);
    assert_eq!(tally.cancelled, 4);
    assert_eq!(tally.failed, 10);
    let unique: HashSet<_> = tally.ok.iter().copied().collect();
    assert_eq!(unique.len(), tally.ok.len());
    worker.shutdown();
}

#[test]
fn task_set_launched_from_ui_thread_runs_on_worker() {
    let worker = Worker::start("bridge-it-set").unwrap();
    let set = launch(worker.handle(), 5, |i, _ctx| async move {
        Ok::<_, TaskError>((i, thread::current().name().map(str::to_string)))
    })
    .unwrap();
    assert_eq!(set.len(), 5);

    let (tx, mut queue) = channel::<Vec<(usize, Option<String>)>>();
    let bridge = Bridge::new(worker.handle().clone(), tx);
    bridge.run(
        async move {
            let results = set.join_all().await;
            results
                .into_iter()
                .map(|(_, outcome)| outcome)
                .collect::<Result<Vec<_>, _>>()
        },
        |out: &mut Vec<(usize, Option<String>)>, outcome| {
            if let Ok(values) = outcome {
                *out = values;
            }
        },
    );

    let mut out = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while out.is_empty() && Instant::now() < deadline {
        queue.drain(&mut out, 64);
        thread::sleep(Duration::from_millis(5));
    }

    assert_eq!(out.len(), 5);
    for (index, (i, name)) in out.iter().enumerate() {
        assert_eq!(*i, index);
        assert_eq!(name.as_deref(), Some("bridge-it-set"));
    }
    worker.shutdown();
}
