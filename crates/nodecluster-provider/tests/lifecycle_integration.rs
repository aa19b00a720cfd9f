//! End-to-end lifecycle tests against the in-process provisioning service.
//!
//! Time is paused, so waits that would take minutes run instantly.

use nodecluster_provider::resource::{self, ClusterError};
use nodecluster_provider::wait::WaitError;
use nodecluster_test_utils::fake::cluster;
use nodecluster_test_utils::{
    FakeCall, FakeNodeClusterApi, FakeRead, fast_timeouts, test_cluster_config,
};

#[tokio::test(start_paused = true)]
async fn full_lifecycle() {
    let api = FakeNodeClusterApi::new()
        .on_deploy([
            FakeRead::Missing,
            FakeRead::Missing,
            FakeRead::State("Deploying"),
            FakeRead::State("Deployed"),
        ])
        .on_update([FakeRead::State("Scaling"), FakeRead::State("Deployed")])
        .on_terminate([
            FakeRead::State("Terminating"),
            FakeRead::State("Empty cluster"),
            FakeRead::State("Terminated"),
        ]);
    let timeouts = fast_timeouts();
    let config = test_cluster_config();

    let created = resource::create(&api, &config, &timeouts).await.unwrap();
    assert_eq!(created.state, "Deployed");
    assert_eq!(created.node_count, 2);
    assert_eq!(api.read_count(&created.id), 4);
    assert!(resource::exists(&api, &created.id).await.unwrap());

    let scaled = config.clone().with_node_count(4);
    let updated = resource::update(&api, &created.id, &config, &scaled, &timeouts)
        .await
        .unwrap();
    assert_eq!(updated.node_count, 4);

    resource::delete(&api, &created.id, &timeouts).await.unwrap();
    assert_eq!(resource::read(&api, &created.id).await.unwrap(), None);

    let mutations: Vec<_> = api
        .calls()
        .into_iter()
        .filter(|c| !matches!(c, FakeCall::Get { .. }))
        .collect();
    assert!(matches!(mutations[0], FakeCall::Create { .. }));
    assert!(matches!(mutations[1], FakeCall::Deploy { .. }));
    assert!(matches!(
        &mutations[2],
        FakeCall::Update { update, .. } if update.target_num_nodes == Some(4) && update.tags.is_none()
    ));
    assert!(matches!(mutations[3], FakeCall::Terminate { .. }));
    assert_eq!(mutations.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn create_that_never_becomes_visible() {
    let api = FakeNodeClusterApi::new().on_deploy(std::iter::repeat_n(FakeRead::Missing, 100));
    let timeouts = fast_timeouts();

    let err = resource::create(&api, &test_cluster_config(), &timeouts)
        .await
        .unwrap_err();

    let id = err.resource_id().unwrap().to_string();
    // The create call succeeded, so the caller must keep the id for cleanup
    assert!(err.resource_exists());
    assert!(api.cluster(&id).is_some());
    assert!(matches!(
        err,
        ClusterError::Wait {
            source: WaitError::NotFoundExhausted { checks: 6, .. },
            ..
        }
    ));
    assert_eq!(api.read_count(&id), 6);
}

#[tokio::test(start_paused = true)]
async fn create_with_failing_first_read_keeps_handle() {
    let api = FakeNodeClusterApi::new().on_deploy([FakeRead::Error]);

    let err = resource::create(&api, &test_cluster_config(), &fast_timeouts())
        .await
        .unwrap_err();

    let id = err.resource_id().unwrap().to_string();
    assert!(api.cluster(&id).is_some());
    assert!(err.resource_exists());
    assert!(matches!(
        err,
        ClusterError::Wait {
            source: WaitError::Remote { attempts: 1, .. },
            ..
        }
    ));
    assert_eq!(api.read_count(&id), 1);
}

#[tokio::test(start_paused = true)]
async fn create_stuck_deploying_times_out() {
    let api = FakeNodeClusterApi::new().on_deploy([FakeRead::State("Deploying")]);
    let timeouts = fast_timeouts();

    let err = resource::create(&api, &test_cluster_config(), &timeouts)
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.resource_exists());
    let id = err.resource_id().unwrap();
    // 1s initial delay, 1s interval, 30s budget
    assert!(api.read_count(id) <= 31);
    assert!(api.cluster(id).is_some());
}

#[tokio::test(start_paused = true)]
async fn delete_accepts_disappearance() {
    let api = FakeNodeClusterApi::new()
        .with_cluster(cluster("nc-9", "Deployed"))
        .on_terminate([FakeRead::State("Terminating"), FakeRead::Removed]);

    resource::delete(&api, "nc-9", &fast_timeouts()).await.unwrap();

    assert!(api.cluster("nc-9").is_none());
    assert!(!resource::exists(&api, "nc-9").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn delete_is_idempotent() {
    let api = FakeNodeClusterApi::new().with_cluster(cluster("nc-1", "Terminated"));
    let timeouts = fast_timeouts();

    resource::delete(&api, "nc-1", &timeouts).await.unwrap();
    resource::delete(&api, "nc-missing", &timeouts).await.unwrap();
    assert_eq!(api.mutation_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn delete_all_runs_independently() {
    let api = FakeNodeClusterApi::new()
        .with_cluster(cluster("nc-1", "Deployed"))
        .with_cluster(cluster("nc-2", "Deployed"))
        .on_terminate([FakeRead::State("Terminating"), FakeRead::State("Terminated")]);
    let ids = vec!["nc-1".to_string(), "nc-2".to_string(), "nc-3".to_string()];

    let results = resource::delete_all(&api, &ids, &fast_timeouts()).await;

    assert!(results.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(api.read_count("nc-1"), 3);
    assert_eq!(api.read_count("nc-2"), 3);
    assert_eq!(api.read_count("nc-3"), 1);
}

#[tokio::test(start_paused = true)]
async fn remote_failure_during_wait_is_not_retried() {
    let api = FakeNodeClusterApi::new()
        .with_cluster(cluster("nc-1", "Deployed"))
        .on_update([FakeRead::State("Scaling"), FakeRead::Error]);
    let config = test_cluster_config();

    let err = resource::update(
        &api,
        "nc-1",
        &config,
        &config.clone().with_tags(["test", "gpu"]),
        &fast_timeouts(),
    )
    .await
    .unwrap_err();

    assert!(!err.is_timeout());
    assert!(matches!(
        err,
        ClusterError::Wait {
            source: WaitError::Remote { attempts: 2, .. },
            ..
        }
    ));
    assert_eq!(api.read_count("nc-1"), 2);
}

#[tokio::test(start_paused = true)]
async fn rejected_mutation_surfaces_api_error() {
    let api = FakeNodeClusterApi::new()
        .with_cluster(cluster("nc-1", "Deployed"))
        .failing_mutations();

    let err = resource::delete(&api, "nc-1", &fast_timeouts())
        .await
        .unwrap_err();

    assert!(matches!(err, ClusterError::Api { action: "terminating", .. }));
    assert!(err.resource_exists());
    assert_eq!(api.read_count("nc-1"), 1);
}
