//! Sync controller behavior against a scripted HTTP server.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use simdeck::charts::{ChartBindings, ChartSpec, DatasetSpec};
use simdeck::config::ConfigTracker;
use simdeck::policy::{ArgKind, ArgSpec, PolicySpec, PolicyTracker};
use simdeck::prelude::*;
use simdeck::sync::SimulationStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record(step: u64) -> Value {
    json!({
        "step": step,
        "shares": {"mean": step as f64 * 0.5, "max": step as f64},
        "agents": [{"values": [step as f64, -(step as f64)]}],
    })
}

fn shares_dashboard() -> Arc<RwLock<Dashboard>> {
    let chart = ChartSpec {
        title: "Shares per Content".into(),
        datasets: vec![DatasetSpec {
            label: "mean".into(),
            key: "shares.mean".into(),
        }],
    };
    Arc::new(RwLock::new(Dashboard::new(
        ChartBindings::new(vec![chart], vec![]),
        ConfigTracker::new(vec![], vec![], json!({})),
        PolicyTracker::new(vec![PolicySpec {
            name: "TaxAdvertising",
            desc: "Implement a tax on all advertising.",
            args: vec![ArgSpec {
                name: "tax",
                kind: ArgKind::Float,
                min: Some(0.0),
                default: 0.1,
            }],
        }]),
    )))
}

fn controller_for(server: &MockServer) -> (SyncController, Arc<RwLock<Dashboard>>) {
    let client = ApiClient::new(&server.uri()).unwrap();
    let state = shares_dashboard();
    (SyncController::new(client, Arc::clone(&state)), state)
}

async fn mount_status(server: &MockServer, status: &str) {
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": status})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn incremental_sync_fetches_only_new_history() {
    let server = MockServer::start().await;
    mount_status(&server, "running").await;

    // First tick reports step 1 (as a numeric string, like the reference
    // server), second tick reports step 3.
    Mock::given(method("GET"))
        .and(path("/state/step"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"step": "1"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/state/step"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"step": 3})))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/state/history"))
        .and(query_param("from", "0"))
        .and(query_param("to", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"history": [record(0), record(1)]})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/state/history"))
        .and(query_param("from", "2"))
        .and(query_param("to", "3"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"history": [record(2), record(3)]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (controller, state) = controller_for(&server);
    controller.tick().await;
    controller.tick().await;
    // A third tick sees nothing new (3 < 4) and must not refetch.
    controller.tick().await;

    let d = state.read().await;
    assert_eq!(d.history.len(), 4);
    for (i, r) in d.history.records().iter().enumerate() {
        assert_eq!(r.step, i as u64);
    }

    let (_, chart) = &d.charts.charts()[0];
    let points = chart.series(0);
    assert_eq!(points.len(), 4);
    assert_eq!(points[3].value, 1.5);
    assert!(points.windows(2).all(|w| w[0].step < w[1].step));
}

#[tokio::test]
async fn status_hooks_fire_once_per_registration() {
    let server = MockServer::start().await;
    mount_status(&server, "ready").await;

    let (controller, state) = controller_for(&server);
    let fired = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    {
        let mut d = state.write().await;
        let f = Arc::clone(&fired);
        d.on(SimulationStatus::Ready, move |_| {
            f.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
    }

    controller.poll_status().await;
    controller.poll_status().await;
    assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(state.read().await.status(), SimulationStatus::Ready);
}

#[tokio::test]
async fn transport_failures_leave_state_unchanged() {
    // Nothing is listening here.
    let client = ApiClient::new("http://127.0.0.1:9").unwrap();
    let state = shares_dashboard();
    let controller = SyncController::new(client, Arc::clone(&state));

    controller.tick().await;

    let d = state.read().await;
    assert_eq!(d.status(), SimulationStatus::Loading);
    assert!(d.history.is_empty());
    assert!(!d.fetching());
}

#[tokio::test]
async fn concurrent_history_polls_coalesce() {
    let server = MockServer::start().await;
    mount_status(&server, "running").await;

    Mock::given(method("GET"))
        .and(path("/state/step"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"step": 0}))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/state/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"history": [record(0)]})))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, state) = controller_for(&server);
    let a = controller.clone();
    let b = controller.clone();
    // The second poll arrives while the first is parked on the slow step
    // response; it must drop out without issuing anything.
    tokio::join!(a.poll_history(), async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        b.poll_history().await;
    });

    assert_eq!(state.read().await.history.len(), 1);
}

#[tokio::test]
async fn reset_clears_dashboard_and_discards_inflight_fetch() {
    let server = MockServer::start().await;
    mount_status(&server, "ready").await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"config": {"SIMULATION": {"POPULATION": 100, "PUBLISHERS": []}}}),
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/policies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"policies": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    // The history fetch is slow enough that the reset lands mid-flight.
    Mock::given(method("GET"))
        .and(path("/state/step"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"step": 1}))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/state/history"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"history": [record(0), record(1)]})),
        )
        .mount(&server)
        .await;

    let (controller, state) = controller_for(&server);
    controller.load_initial().await;
    controller.poll_status().await;
    assert!(state.read().await.actions_enabled());

    let inflight = {
        let c = controller.clone();
        tokio::spawn(async move { c.poll_history().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    controller.reset().await.unwrap();
    // Next ready poll runs the one-shot hook: clear + epoch bump.
    controller.poll_status().await;

    inflight.await.unwrap();

    let d = state.read().await;
    assert!(
        d.history.is_empty(),
        "stale in-flight records must be discarded after reset"
    );
    let (_, chart) = &d.charts.charts()[0];
    assert!(chart.series(0).is_empty());
    assert!(!d.config.dirty());
}

#[tokio::test]
async fn mutating_actions_require_ready_status() {
    let server = MockServer::start().await;
    mount_status(&server, "loading").await;

    let (controller, _state) = controller_for(&server);
    controller.poll_status().await;

    assert!(matches!(
        controller.run_steps(5).await,
        Err(simdeck::sync::SyncError::NotReady(_))
    ));
    assert!(controller.reset().await.is_err());
    assert!(controller.enact_policy("TaxAdvertising").await.is_err());
}

#[tokio::test]
async fn enacting_a_policy_posts_values_and_queues_a_batch() {
    let server = MockServer::start().await;
    mount_status(&server, "ready").await;
    Mock::given(method("POST"))
        .and(path("/policies"))
        .and(body_json(json!({"name": "TaxAdvertising", "args": [0.25]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let (controller, state) = controller_for(&server);
    controller.poll_status().await;
    {
        let mut d = state.write().await;
        d.policies.edit("TaxAdvertising", 0, "0.25").unwrap();
    }

    let invocation = controller.enact_policy("TaxAdvertising").await.unwrap();
    assert_eq!(invocation.values(), vec![0.25]);

    let d = state.read().await;
    let batches = d.policies.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].step, 0);
    assert_eq!(batches[0].invocations.len(), 1);
}

#[tokio::test]
async fn invalid_policy_args_never_reach_the_server() {
    let server = MockServer::start().await;
    mount_status(&server, "ready").await;
    Mock::given(method("POST"))
        .and(path("/policies"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (controller, state) = controller_for(&server);
    controller.poll_status().await;
    {
        let mut d = state.write().await;
        d.policies.edit("TaxAdvertising", 0, "-1").unwrap();
    }
    assert!(controller.enact_policy("TaxAdvertising").await.is_err());
}

#[tokio::test]
async fn config_reloads_after_reset_completes() {
    let server = MockServer::start().await;
    mount_status(&server, "ready").await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"config": {"SIMULATION": {"POPULATION": 100, "PUBLISHERS": []}}}),
        ))
        // Initial load plus the post-reset reload.
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/policies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"policies": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/reset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    let (controller, state) = controller_for(&server);
    controller.load_initial().await;
    controller.poll_status().await;

    controller.reset().await.unwrap();
    controller.poll_status().await;

    assert!(state.read().await.config.is_loaded());
}
