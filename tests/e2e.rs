use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use stream_coordinator::balance::AdaptiveBalancer;
use stream_coordinator::client::MockWorkerClient;
use stream_coordinator::task::{Task, TaskType};
use stream_coordinator::{Coordinator, CoordinatorConfig};

fn config(partition_strategy: &str, load_balance_strategy: &str) -> CoordinatorConfig {
    CoordinatorConfig {
        min_nodes: 1,
        max_nodes: 16,
        node_timeout: Duration::from_millis(200),
        health_check_interval: Duration::from_secs(60),
        queue_size: 512,
        batch_size: 16,
        batch_timeout: Duration::from_millis(20),
        max_retries: 3,
        partition_strategy: partition_strategy.to_string(),
        load_balance_strategy: load_balance_strategy.to_string(),
        enable_failover: true,
        failover_timeout: Duration::from_secs(5),
    }
}

async fn wait_until(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if pred() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn e2e_a_consistent_hash_keys_land_on_one_node_each() {
    let coordinator = Coordinator::spawn(config("consistent-hash", "least-loaded")).unwrap();
    for i in 0..3 {
        coordinator
            .register_node(format!("n{i}"), format!("http://n{i}"), 10, Arc::new(MockWorkerClient::new(Duration::from_millis(1))))
            .unwrap();
    }

    for i in 0..100 {
        let key = format!("key-{}", i % 10);
        let task = Task::new(format!("t{i}"), TaskType::Analyze, vec![]).with_partition_key(key);
        coordinator.submit(task).unwrap();
    }

    let done = wait_until(|| coordinator.get_status().tasks_completed == 100, Duration::from_secs(5)).await;
    assert!(done, "expected all 100 tasks to complete");

    let status = coordinator.get_status();
    assert_eq!(status.tasks_submitted, 100);
    assert_eq!(status.tasks_completed, 100);

    coordinator.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn e2e_b_batch_results_carry_task_ids_and_positive_processing_time() {
    let coordinator = Coordinator::spawn(config("hash", "round-robin")).unwrap();
    coordinator
        .register_node("n0", "http://n0", 10, Arc::new(MockWorkerClient::new(Duration::from_millis(2))))
        .unwrap();
    coordinator
        .register_node("n1", "http://n1", 10, Arc::new(MockWorkerClient::new(Duration::from_millis(2))))
        .unwrap();

    let ids: Vec<String> = (0..5).map(|i| format!("batch-t{i}")).collect();
    for id in &ids {
        coordinator.submit(Task::new(id.clone(), TaskType::Dissect, vec![1, 2, 3])).unwrap();
    }

    let done = wait_until(|| coordinator.get_status().tasks_completed == 5, Duration::from_secs(5)).await;
    assert!(done);
    assert_eq!(coordinator.get_status().tasks_submitted, 5);

    coordinator.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn e2e_c_task_that_always_fails_retries_exactly_max_retries_times() {
    let mut cfg = config("hash", "least-loaded");
    cfg.max_retries = 3;
    let coordinator = Coordinator::spawn(cfg).unwrap();
    coordinator
        .register_node("n0", "http://n0", 10, Arc::new(MockWorkerClient::always_failing(Duration::from_millis(1))))
        .unwrap();

    coordinator.submit(Task::new("doomed", TaskType::Analyze, vec![])).unwrap();

    let done = wait_until(|| coordinator.get_status().tasks_failed == 1, Duration::from_secs(5)).await;
    assert!(done, "expected the task to fail terminally");

    let status = coordinator.get_status();
    assert_eq!(status.tasks_retried, 3);
    assert_eq!(status.tasks_failed, 1);

    coordinator.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn e2e_d_one_unreachable_health_check_bumps_failure_counter_once() {
    let mut cfg = config("hash", "least-loaded");
    cfg.health_check_interval = Duration::from_millis(30);
    cfg.node_timeout = Duration::from_millis(100);
    let coordinator = Coordinator::spawn(cfg).unwrap();
    let client = Arc::new(MockWorkerClient::new(Duration::from_millis(1)));
    coordinator.register_node("n0", "http://n0", 10, client.clone()).unwrap();

    // let two health-check ticks pass while healthy
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(coordinator.metrics().health_check_failures(), 0);

    client.set_unreachable(true);
    let saw_failure = wait_until(|| coordinator.metrics().health_check_failures() == 1, Duration::from_secs(2)).await;
    assert!(saw_failure);

    let status = coordinator.get_status();
    let node = status.nodes.iter().find(|n| n.id == "n0").unwrap();
    assert_eq!(node.error_count, 1);

    coordinator.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn e2e_e_prometheus_export_contains_required_series() {
    let coordinator = Coordinator::spawn(config("hash", "least-loaded")).unwrap();
    coordinator
        .register_node("n0", "http://n0", 10, Arc::new(MockWorkerClient::new(Duration::from_millis(1))))
        .unwrap();
    coordinator.submit(Task::new("t0", TaskType::Analyze, vec![])).unwrap();
    wait_until(|| coordinator.get_status().tasks_completed == 1, Duration::from_secs(2)).await;

    let text = coordinator.metrics().export();
    for series in ["tasks_submitted_total", "tasks_completed_total", "tasks_failed_total", "task_success_rate", "nodes_registered_total"] {
        assert!(text.contains(series), "missing series {series} in:\n{text}");
    }

    coordinator.shutdown(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn e2e_f_adaptive_balancer_switches_to_round_robin_under_sustained_failure() {
    let balancer = AdaptiveBalancer::new();
    for _ in 0..10 {
        balancer.update_metrics("n0", Duration::from_millis(5), false);
    }
    balancer.force_evaluate();
    assert_eq!(balancer.current_strategy(), "round-robin");
}

#[tokio::test]
async fn duplicate_partition_keys_spread_across_three_registered_nodes_consistently() {
    let coordinator = Coordinator::spawn(config("consistent-hash", "least-loaded")).unwrap();
    for i in 0..3 {
        coordinator
            .register_node(format!("n{i}"), format!("http://n{i}"), 10, Arc::new(MockWorkerClient::new(Duration::from_millis(1))))
            .unwrap();
    }

    // Two submissions with the same key, interleaved with other keys,
    // should not change which node a given key prefers across calls.
    let mut seen: HashMap<String, ()> = HashMap::new();
    for i in 0..20 {
        let key = format!("key-{}", i % 4);
        seen.insert(key.clone(), ());
        coordinator.submit(Task::new(format!("t{i}"), TaskType::Analyze, vec![]).with_partition_key(key)).unwrap();
    }
    let done = wait_until(|| coordinator.get_status().tasks_completed == 20, Duration::from_secs(5)).await;
    assert!(done);
    assert_eq!(seen.len(), 4);

    coordinator.shutdown(Duration::from_secs(2)).await.unwrap();
}
