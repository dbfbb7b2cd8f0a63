//! Integration tests for stateholder
//!
//! These tests exercise the public StateController API end to end.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use serde_json::{Value, json};
use serial_test::serial;
use stateholder::stress::run_stress;
use stateholder::{Operation, StateConfig, StateController, StateError, WriteMode, set_event_logging};

#[derive(Debug, Clone, PartialEq, Default)]
struct Person {
    name: String,
    age: u32,
}

fn poll_config() -> StateConfig {
    StateConfig::default().with_poll_interval(Duration::from_millis(1))
}

// =============================================================================
// Read / write
// =============================================================================

#[tokio::test]
async fn test_write_then_read() {
    let state = StateController::<String>::default();
    state.start().await.unwrap();

    let echoed = state.write("foo", "bar".to_string()).await.unwrap();
    assert_eq!(echoed, Some("bar".to_string()));
    assert_eq!(state.read("foo").await.unwrap(), Some("bar".to_string()));

    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_read_missing_key_is_none() {
    let state = StateController::<String>::default();
    state.start().await.unwrap();

    assert_eq!(state.read("never-written").await.unwrap(), None);

    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_last_write_wins_in_program_order() {
    for config in [
        StateConfig::default(),
        StateConfig::default().with_write_mode(WriteMode::FireAndForget),
        poll_config(),
    ] {
        let state = StateController::<String>::new(config);
        state.start().await.unwrap();

        for value in ["Bar1", "Bar2", "Bar3"] {
            state.write("Foo", value.to_string()).await.unwrap();
        }
        assert_eq!(state.read("Foo").await.unwrap(), Some("Bar3".to_string()));

        state.stop().await.unwrap();
    }
}

#[tokio::test]
async fn test_fire_and_forget_returns_immediately_but_reads_see_writes() {
    let state = StateController::<u64>::new(StateConfig::default().with_write_mode(WriteMode::FireAndForget));
    state.start().await.unwrap();

    for i in 0..100u64 {
        assert_eq!(state.write(format!("k{}", i), i).await.unwrap(), None);
    }
    for i in 0..100u64 {
        assert_eq!(state.read(format!("k{}", i)).await.unwrap(), Some(i));
    }

    state.stop().await.unwrap();
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_error_messages() {
    let state = StateController::<String>::default();

    state.start().await.unwrap();
    let err = state.start().await.unwrap_err();
    assert_eq!(err.to_string(), "State already running, nothing to start");

    assert_eq!(state.write("foo", "bar".to_string()).await.unwrap(), Some("bar".to_string()));
    assert_eq!(state.read("foo").await.unwrap(), Some("bar".to_string()));

    state.stop().await.unwrap();
    let err = state.stop().await.unwrap_err();
    assert_eq!(err.to_string(), "State not running, nothing to stop");

    let err = state.write("foo", "bar".to_string()).await.unwrap_err();
    assert_eq!(err.to_string(), "State not running, no write");

    let err = state.read("foo").await.unwrap_err();
    assert_eq!(err.to_string(), "State not running, no read");

    let err = state.restart().await.unwrap_err();
    assert_eq!(err.to_string(), "State not running, nothing to restart");
}

#[tokio::test]
async fn test_restart_clears_state() {
    let state = StateController::<String>::default();
    state.start().await.unwrap();
    state.write("foo", "bar".to_string()).await.unwrap();

    state.restart().await.unwrap();
    assert!(state.is_running().await);
    assert_eq!(state.read("foo").await.unwrap(), None);

    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_reset_clears_all_keys_and_keeps_worker() {
    let state = StateController::<String>::default();
    state.start().await.unwrap();

    for i in 0..20 {
        state.write(format!("key-{}", i), format!("value-{}", i)).await.unwrap();
    }
    state.reset().await.unwrap();

    for i in 0..20 {
        assert_eq!(state.read(format!("key-{}", i)).await.unwrap(), None);
    }
    assert!(state.is_running().await);
    assert_eq!(state.write("after", "reset".to_string()).await.unwrap(), Some("reset".to_string()));

    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_then_start_begins_empty() {
    let state = StateController::<u32>::new(poll_config());
    state.start().await.unwrap();
    state.write("n", 1).await.unwrap();
    state.stop().await.unwrap();

    state.start().await.unwrap();
    assert_eq!(state.read("n").await.unwrap(), None);
    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_independent_controllers() {
    let a = StateController::<String>::default();
    let b = StateController::<String>::default();
    a.start().await.unwrap();
    b.start().await.unwrap();

    a.write("k", "from-a".to_string()).await.unwrap();
    assert_eq!(b.read("k").await.unwrap(), None);

    b.stop().await.unwrap();
    assert_eq!(a.read("k").await.unwrap(), Some("from-a".to_string()));
    assert_eq!(b.read("k").await, Err(StateError::NotRunning(Operation::Read)));

    a.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_only_one_wins() {
    let state = StateController::<u32>::default();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let state = state.clone();
        handles.push(tokio::spawn(async move { state.start().await }));
    }

    let mut started = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => started += 1,
            Err(e) => assert_eq!(e, StateError::AlreadyRunning),
        }
    }
    assert_eq!(started, 1);

    state.stop().await.unwrap();
}

// =============================================================================
// Value semantics
// =============================================================================

#[tokio::test]
async fn test_value_stored_by_value_is_isolated() {
    let state = StateController::<Person>::default();
    state.start().await.unwrap();

    let mut person = Person {
        name: "baz".to_string(),
        age: 33,
    };
    state.write("personByVal", person.clone()).await.unwrap();
    person = Person::default();
    assert_eq!(person.name, "");

    let stored = state.read("personByVal").await.unwrap().unwrap();
    assert_eq!(stored.name, "baz");
    assert_eq!(stored.age, 33);

    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_shared_handle_aliasing_is_observable() {
    let state = StateController::<Arc<Mutex<Person>>>::default();
    state.start().await.unwrap();

    let person = Arc::new(Mutex::new(Person {
        name: "foo".to_string(),
        age: 99,
    }));
    state.write("personByRef", Arc::clone(&person)).await.unwrap();

    // Mutating through the caller's handle changes what the worker holds
    *person.lock().unwrap() = Person::default();

    let stored = state.read("personByRef").await.unwrap().unwrap();
    assert_eq!(stored.lock().unwrap().name, "");
    assert!(Arc::ptr_eq(&stored, &person));

    state.stop().await.unwrap();
}

#[tokio::test]
async fn test_structured_values() {
    let state = StateController::<Value>::default();
    state.start().await.unwrap();

    let persons = json!([{ "name": "One", "age": 53 }, { "name": "Two", "age": 51 }]);
    state.write("personsByVal", persons.clone()).await.unwrap();
    state.write("personsMap", json!({ "data": persons })).await.unwrap();

    let list = state.read("personsByVal").await.unwrap().unwrap();
    assert_eq!(list[0]["name"], "One");
    let map = state.read("personsMap").await.unwrap().unwrap();
    assert_eq!(map["data"][0]["name"], "One");

    state.stop().await.unwrap();
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_callers_do_not_corrupt_state() {
    let state = StateController::<Value>::default();
    state.start().await.unwrap();

    let report = run_stress(&state, 32, 200).await.unwrap();
    assert!(report.is_clean(), "{:?}", report);

    state.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_callers_fire_and_forget_and_poll() {
    let config = StateConfig::default()
        .with_write_mode(WriteMode::FireAndForget)
        .with_poll_interval(Duration::from_millis(1));
    let state = StateController::<Value>::new(config);
    state.start().await.unwrap();

    let report = run_stress(&state, 16, 50).await.unwrap();
    assert!(report.is_clean(), "{:?}", report);

    state.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_counter_increments_are_serialized_per_key() {
    let state = StateController::<u64>::default();
    state.start().await.unwrap();

    let mut handles = Vec::new();
    for task in 0..8u64 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            let key = format!("counter-{}", task);
            for i in 1..=100u64 {
                state.write(key.clone(), i).await.unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for task in 0..8u64 {
        assert_eq!(state.read(format!("counter-{}", task)).await.unwrap(), Some(100));
    }

    state.stop().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_requests_racing_stop_never_hang() {
    let state = StateController::<u64>::default();
    state.start().await.unwrap();

    let mut handles = Vec::new();
    for task in 0..8u64 {
        let state = state.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..1000u64 {
                match state.write(format!("k{}", task), i).await {
                    Ok(_) => {}
                    Err(StateError::NotRunning(Operation::Write)) | Err(StateError::Disconnected) => break,
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
        }));
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    state.stop().await.unwrap();

    for handle in handles {
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("caller hung after stop")
            .unwrap();
    }
}

// =============================================================================
// Event trace toggle
// =============================================================================

#[tokio::test]
#[serial]
async fn test_event_logging_does_not_change_behavior() {
    set_event_logging(true);

    let state = StateController::<String>::default();
    state.start().await.unwrap();
    state.write("k", "v".to_string()).await.unwrap();
    assert_eq!(state.read("k").await.unwrap(), Some("v".to_string()));
    state.reset().await.unwrap();
    assert_eq!(state.read("k").await.unwrap(), None);
    state.stop().await.unwrap();

    set_event_logging(false);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_read_after_write_returns_last_value(
        writes in proptest::collection::vec(("[a-z]{1,4}", any::<i64>()), 1..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let (expected, observed) = rt.block_on(async {
            let state = StateController::<i64>::default();
            state.start().await.unwrap();

            let mut expected = HashMap::new();
            for (key, value) in &writes {
                state.write(key.clone(), *value).await.unwrap();
                expected.insert(key.clone(), *value);
            }

            let mut observed = HashMap::new();
            for key in expected.keys() {
                observed.insert(key.clone(), state.read(key.clone()).await.unwrap().unwrap());
            }

            state.stop().await.unwrap();
            (expected, observed)
        });

        prop_assert_eq!(expected, observed);
    }
}
