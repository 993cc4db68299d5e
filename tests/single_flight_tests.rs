// Integration tests for the single-flight gate under real concurrency

use flightstage::{FlightError, SingleFlight};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_gate(
    name: &str,
    latency: Duration,
) -> (SingleFlight<usize, String>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let gate = SingleFlight::new(name, move |owner: &usize| {
        counter.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(latency);
        format!("path-for-{owner}")
    })
    .unwrap();
    (gate, calls)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ten_units_polling_every_frame_compute_ten_paths() {
    let (gate, calls) = counting_gate("units", Duration::from_millis(80));
    let units: Vec<usize> = (0..10).collect();
    let mut frames = 0;

    loop {
        let ready = units.iter().filter(|unit| gate.poll(unit).is_some()).count();
        if ready == units.len() {
            break;
        }
        frames += 1;
        assert!(frames < 1000, "paths never arrived");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(frames > 1, "first frame cannot already have results");
    assert_eq!(calls.load(Ordering::SeqCst), 10);
    assert_eq!(gate.stats().dispatched, 10);
    assert_eq!(gate.stats().completed, 10);
    for unit in &units {
        assert_eq!(gate.peek(unit), Some(format!("path-for-{unit}")));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pollers_trigger_one_computation() {
    let (gate, calls) = counting_gate("contended", Duration::from_millis(50));

    let pollers: Vec<_> = (0..16)
        .map(|_| {
            let gate = gate.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    if gate.poll(&7).is_some() {
                        return true;
                    }
                    tokio::task::yield_now().await;
                }
                false
            })
        })
        .collect();

    for poller in pollers {
        poller.await.unwrap();
    }
    let artifact = gate.wait_ready(&7, Duration::from_secs(5)).await.unwrap();

    assert_eq!(artifact, "path-for-7");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(gate.stats().peak_in_flight, 1);
}

#[test]
fn test_pollers_on_plain_threads_trigger_one_computation() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let gate = SingleFlight::with_handle(
        "threads",
        move |owner: &usize| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(30));
            *owner * 2
        },
        runtime.handle().clone(),
    );

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                while gate.poll(&21).is_none() {
                    std::thread::sleep(Duration::from_millis(1));
                }
            });
        }
    });

    assert_eq!(gate.peek(&21), Some(42));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_worker_releases_slot() {
    let panicked = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&panicked);
    let gate = SingleFlight::new("flaky", move |owner: &usize| {
        if !flag.swap(true, Ordering::SeqCst) {
            panic!("path finder crashed");
        }
        *owner
    })
    .unwrap();

    let first = gate.wait_ready(&3, Duration::from_secs(5)).await;
    assert!(matches!(first, Err(FlightError::WorkerFailed { .. })));
    assert!(!gate.is_in_flight(&3));
    assert_eq!(gate.stats().failed, 1);

    let second = gate.wait_ready(&3, Duration::from_secs(5)).await;
    assert_eq!(second, Ok(3));
    assert_eq!(gate.stats().dispatched, 2);
}

#[tokio::test]
async fn test_wait_ready_times_out_while_computation_runs() {
    let (gate, calls) = counting_gate("slow", Duration::from_millis(300));

    let result = gate.wait_ready(&1, Duration::from_millis(20)).await;
    assert_eq!(
        result,
        Err(FlightError::Timeout {
            owner: "1".to_string(),
            waited_ms: 20
        })
    );
    assert!(gate.is_in_flight(&1));
    assert_eq!(gate.poll(&1), None);

    gate.wait_idle(Duration::from_secs(5)).await.unwrap();
    assert_eq!(gate.peek(&1), Some("path-for-1".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_late_completion_cannot_replace_worker_result() {
    let (gate, calls) = counting_gate("manual", Duration::from_millis(100));

    let manual = gate.try_claim(&5).unwrap();
    gate.complete(&5, manual, "manual".to_string()).unwrap();
    assert_eq!(gate.invalidate(&5), Some("manual".to_string()));

    // Re-poll dispatches the worker; the spent ticket must not finish its claim.
    assert_eq!(gate.poll(&5), None);
    assert_eq!(
        gate.complete(&5, manual, "forged".to_string()),
        Err(FlightError::DoubleCompletion {
            owner: "5".to_string()
        })
    );
    assert!(gate.is_in_flight(&5));
    assert_eq!(gate.in_flight(), 1);
    assert_eq!(gate.poll(&5), None);

    let artifact = gate.wait_ready(&5, Duration::from_secs(5)).await.unwrap();
    assert_eq!(artifact, "path-for-5");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(gate.stats().rejected_completions, 1);
}

#[tokio::test]
async fn test_invalidate_allows_recompute() {
    let (gate, calls) = counting_gate("recompute", Duration::from_millis(5));

    gate.wait_ready(&2, Duration::from_secs(5)).await.unwrap();
    assert_eq!(gate.invalidate(&2), Some("path-for-2".to_string()));
    assert_eq!(gate.poll(&2), None);

    gate.wait_ready(&2, Duration::from_secs(5)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
