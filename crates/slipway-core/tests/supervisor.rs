use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use slipway_core::{
    Event, EventKind, Process, Subscribe, Supervisor, SupervisorConfig, SupervisorError, TaskError,
    TaskFn, TaskState, Worker, bind_task,
};
use tokio::time::Instant;

#[derive(Default)]
struct Collector {
    events: Mutex<Vec<Event>>,
}

#[async_trait]
impl Subscribe for Collector {
    async fn on_event(&self, event: &Event) {
        self.events.lock().unwrap().push(event.clone());
    }
    fn name(&self) -> &'static str {
        "collector"
    }
    fn queue_capacity(&self) -> usize {
        1 << 16
    }
}

impl Collector {
    async fn wait_terminated(&self, n: usize) -> Vec<Event> {
        for _ in 0..500 {
            {
                let events = self.events.lock().unwrap();
                let done = events
                    .iter()
                    .filter(|e| e.kind == EventKind::TaskTerminated)
                    .count();
                if done >= n {
                    let mut out = events.clone();
                    out.sort_by_key(|e| e.seq);
                    return out;
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("events for {n} terminated tasks never arrived");
    }
}

fn seq_of(events: &[Event], task: &str, kind: EventKind) -> Option<u64> {
    events
        .iter()
        .find(|e| e.kind == kind && e.task_name() == Some(task))
        .map(|e| e.seq)
}

/// Small deterministic generator so graphs are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

fn ordered_worker(name: String, requires: Vec<String>, explicit: bool) -> Worker {
    let task = TaskFn::arc(name, |p: Process| async move {
        tokio::task::yield_now().await;
        p.ready();
        tokio::task::yield_now().await;
        Ok(())
    });
    let worker = Worker::new(task).requires(requires);
    if explicit { worker.explicit_ready() } else { worker }
}

async fn check_graph(graph: Vec<(String, Vec<String>)>, rng: &mut Lcg) {
    let collector = Arc::new(Collector::default());
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscriber(collector.clone())
        .build();

    // Register in shuffled order so some tasks block on names not registered yet.
    let mut order: Vec<usize> = (0..graph.len()).collect();
    for i in (1..order.len()).rev() {
        let j = rng.below(i as u64 + 1) as usize;
        order.swap(i, j);
    }
    for idx in order {
        let (name, requires) = graph[idx].clone();
        let explicit = rng.below(2) == 0;
        sup.supervise(ordered_worker(name, requires, explicit)).unwrap();
    }

    let failures = sup.run().await;
    assert!(failures.is_empty(), "unexpected failures: {failures:?}");

    let events = collector.wait_terminated(graph.len()).await;
    for (name, requires) in &graph {
        let running = seq_of(&events, name, EventKind::TaskRunning)
            .unwrap_or_else(|| panic!("{name} never ran"));
        for dep in requires {
            let ready = seq_of(&events, dep, EventKind::TaskReady)
                .unwrap_or_else(|| panic!("{dep} never became ready"));
            assert!(ready < running, "{name} ran before its requirement {dep} was ready");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn dependents_start_after_requirements_are_ready() {
    let mut rng = Lcg(0x5eed);
    for _ in 0..25 {
        let n = 2 + rng.below(9) as usize;
        let graph: Vec<(String, Vec<String>)> = (0..n)
            .map(|i| {
                let requires = (0..i)
                    .filter(|_| rng.below(3) == 0)
                    .map(|j| format!("t{j}"))
                    .collect();
                (format!("t{i}"), requires)
            })
            .collect();
        check_graph(graph, &mut rng).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn diamond_and_independent_chains() {
    let mut rng = Lcg(7);
    let s = |v: &str| v.to_string();
    let graph = vec![
        (s("top"), vec![]),
        (s("left"), vec![s("top")]),
        (s("right"), vec![s("top")]),
        (s("bottom"), vec![s("left"), s("right")]),
        (s("a1"), vec![]),
        (s("a2"), vec![s("a1")]),
        (s("a3"), vec![s("a2")]),
    ];
    check_graph(graph, &mut rng).await;
}

fn failing_worker(name: &str, stamps: Arc<Mutex<Vec<Instant>>>, ready_on: Option<usize>, stop_after: usize) -> Worker {
    let task = bind_task(name, stamps, move |p: Process, stamps: Arc<Mutex<Vec<Instant>>>| async move {
        let attempt = {
            let mut stamps = stamps.lock().unwrap();
            stamps.push(Instant::now());
            stamps.len()
        };
        if Some(attempt) == ready_on {
            p.ready();
        }
        if attempt >= stop_after {
            p.supervisor().shutdown();
        }
        Err::<(), _>(TaskError::fail(format!("attempt {attempt} failed")))
    });
    Worker::new(task).retry(true)
}

fn gaps_ms(stamps: &[Instant]) -> Vec<u128> {
    stamps.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect()
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_doubles_and_caps() {
    let sup = Supervisor::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));
    sup.supervise(failing_worker("flaky", stamps.clone(), None, 8).explicit_ready())
        .unwrap();

    let failures = sup.run().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].task, "flaky");
    assert_eq!(failures[0].error, TaskError::fail("attempt 8 failed"));

    let stamps = stamps.lock().unwrap();
    assert_eq!(gaps_ms(&stamps), vec![100, 200, 400, 800, 1600, 3000, 3000]);
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_resets_after_ready() {
    let sup = Supervisor::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));
    sup.supervise(failing_worker("flaky", stamps.clone(), Some(3), 5).explicit_ready())
        .unwrap();

    sup.run().await;

    let stamps = stamps.lock().unwrap();
    assert_eq!(gaps_ms(&stamps), vec![100, 200, 100, 200]);
}

#[tokio::test(start_paused = true)]
async fn retry_backoff_grows_for_on_start_workers() {
    let sup = Supervisor::new();
    let stamps = Arc::new(Mutex::new(Vec::new()));
    sup.supervise(failing_worker("starter", stamps.clone(), None, 6))
        .unwrap();

    let failures = sup.run().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, TaskError::fail("attempt 6 failed"));

    let stamps = stamps.lock().unwrap();
    assert_eq!(gaps_ms(&stamps), vec![100, 200, 400, 800, 1600]);
}

#[tokio::test]
async fn duplicate_name_rejected_while_live() {
    let sup = Supervisor::new();
    let idle = || {
        Worker::new(TaskFn::arc("idle", |p: Process| async move {
            p.cancelled().await;
            Ok(())
        }))
    };

    sup.supervise(idle()).unwrap();
    assert_eq!(
        sup.supervise(idle()),
        Err(SupervisorError::DuplicateName("idle".into()))
    );

    assert!(sup.stop("idle"));
    sup.wait("idle").await;
    assert_eq!(sup.state("idle"), Some(TaskState::Terminated));

    // A drained name can be reused.
    sup.supervise(idle()).unwrap();
    sup.shutdown();
    assert!(sup.run().await.is_empty());
}

#[tokio::test]
async fn failure_without_retry_is_isolated() {
    let sup = Supervisor::new();
    sup.supervise(Worker::new(TaskFn::arc("broken", |_p: Process| async move {
        Err::<(), _>(TaskError::fail("no iptables"))
    })))
    .unwrap();
    sup.supervise(Worker::new(TaskFn::arc("steady", |p: Process| async move {
        p.cancelled().await;
        Ok(())
    })))
    .unwrap();

    sup.wait("broken").await;
    assert!(sup.is_live("steady"));
    assert!(!sup.is_shutting_down());

    sup.shutdown();
    let failures = sup.run().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].to_string(), "broken: no iptables");
}

fn explode() -> Result<(), TaskError> {
    panic!("kaboom")
}

#[tokio::test]
async fn panic_becomes_attributed_failure() {
    let sup = Supervisor::new();
    sup.supervise(Worker::new(TaskFn::arc("crashy", |_p: Process| async move { explode() })))
    .unwrap();

    let failures = sup.run().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].task, "crashy");
    assert_eq!(
        failures[0].error,
        TaskError::Panicked {
            reason: "kaboom".into()
        }
    );
}

#[tokio::test]
async fn failures_are_reported_in_termination_order() {
    let sup = Supervisor::new();
    for (name, ms) in [("slow", 60u64), ("fast", 5), ("middle", 30)] {
        sup.supervise(Worker::new(TaskFn::arc(name, move |_p: Process| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Err::<(), _>(TaskError::fail("done"))
        })))
        .unwrap();
    }

    let order: Vec<String> = sup.run().await.into_iter().map(|f| f.task).collect();
    assert_eq!(order, vec!["fast", "middle", "slow"]);
}

#[tokio::test]
async fn unregistered_requirement_stays_blocked() {
    let sup = Supervisor::new();
    sup.supervise(
        Worker::new(TaskFn::arc("orphan", |_p: Process| async move { Ok(()) })).requires(["ghost"]),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sup.state("orphan"), Some(TaskState::Blocked));
    assert_eq!(
        sup.unsatisfied(),
        vec![SupervisorError::DependencyUnsatisfiable {
            task: "orphan".into(),
            missing: vec!["ghost".into()],
        }]
    );

    sup.shutdown();
    assert!(sup.run().await.is_empty());
    assert_eq!(sup.state("orphan"), Some(TaskState::Terminated));
}

#[tokio::test]
async fn late_registration_unblocks_dependent() {
    let sup = Supervisor::new();
    let ran = Arc::new(AtomicUsize::new(0));

    let counter = ran.clone();
    sup.supervise(
        Worker::new(TaskFn::arc("api", move |_p: Process| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }))
        .requires(["nat"]),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(ran.load(Ordering::SeqCst), 0);

    sup.supervise(
        Worker::new(TaskFn::arc("nat", |p: Process| async move {
            p.ready();
            p.cancelled().await;
            Ok(())
        }))
        .explicit_ready(),
    )
    .unwrap();

    sup.wait("api").await;
    assert_eq!(ran.load(Ordering::SeqCst), 1);
    sup.shutdown();
    assert!(sup.run().await.is_empty());
}

#[tokio::test]
async fn sub_units_are_drained_and_their_errors_surface() {
    let sup = Supervisor::new();
    let drained = Arc::new(AtomicUsize::new(0));

    let seen = drained.clone();
    sup.supervise(Worker::new(TaskFn::arc("parent", move |p: Process| {
        let seen = seen.clone();
        async move {
            for i in 0..3 {
                let seen = seen.clone();
                p.go(move |child: Process| async move {
                    child.cancelled().await;
                    seen.fetch_add(1, Ordering::SeqCst);
                    if i == 1 {
                        return Err(TaskError::fail("child 1 broke"));
                    }
                    Ok(())
                });
            }
            Ok(())
        }
    })))
    .unwrap();

    let failures = sup.run().await;
    assert_eq!(drained.load(Ordering::SeqCst), 3);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].to_string(), "parent: child 1 broke");
}

#[tokio::test]
async fn shutdown_is_idempotent_and_cleanup_always_runs() {
    let sup = Supervisor::new();
    let cleaned = Arc::new(AtomicUsize::new(0));

    let flag = cleaned.clone();
    sup.supervise(Worker::new(TaskFn::arc("listener", move |p: Process| {
        let flag = flag.clone();
        async move {
            p.do_clean(std::future::pending::<Result<(), TaskError>>(), async {
                flag.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await
        }
    })))
    .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    sup.shutdown();
    sup.shutdown();

    assert!(sup.run().await.is_empty());
    assert_eq!(cleaned.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn states_follow_the_lifecycle() {
    let collector = Arc::new(Collector::default());
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscriber(collector.clone())
        .build();

    sup.supervise(
        Worker::new(TaskFn::arc("svc", |p: Process| async move {
            p.ready();
            p.cancelled().await;
            Ok(())
        }))
        .explicit_ready(),
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sup.state("svc"), Some(TaskState::Ready));

    sup.shutdown();
    sup.run().await;

    let kinds: Vec<EventKind> = collector
        .wait_terminated(1)
        .await
        .into_iter()
        .filter(|e| e.task_name() == Some("svc"))
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::TaskAdded,
            EventKind::TaskBlocked,
            EventKind::TaskStarting,
            EventKind::TaskRunning,
            EventKind::TaskReady,
            EventKind::TaskShuttingDown,
            EventKind::TaskTerminated,
        ]
    );
}
