mod common;

use common::{page, FakeCloudflareServer, WORKER};
use statussaas::cloudflare::{
    run_connectivity_test, CheckStatus, CloudflareApi, CloudflareError, Deployer, DomainLocks,
};
use statussaas::database::models::page::PageStatus;
use statussaas::edge::{respond, EdgeReply};

#[tokio::test]
async fn deploy_publishes_page_to_the_edge() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let page = page("example.com", PageStatus::Published);

    let report = Deployer::new(&client, &locks).deploy(&page).await.unwrap();
    assert!(report.route_created);
    assert_eq!(report.worker_name, WORKER);

    let stored = server.kv_json("example.com").unwrap();
    assert_eq!(stored["status"], "published");
    assert_eq!(stored["isActive"], true);
    assert_eq!(stored["title"], "Scheduled Maintenance");
    assert!(server.account().bindings.contains_key(WORKER));
    assert_eq!(server.routes_for("*example.com/*"), vec![Some(WORKER.to_string())]);

    // What the worker would serve for that host
    let raw = server.kv("example.com");
    match respond("example.com", raw.as_deref()) {
        EdgeReply::Page(html) => assert!(html.contains("We will be back shortly.")),
        other => panic!("expected page, got {:?}", other),
    }
}

#[tokio::test]
async fn redeploy_converges_to_one_route() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let page = page("example.com", PageStatus::Published);
    let deployer = Deployer::new(&client, &locks);

    let first = deployer.deploy(&page).await.unwrap();
    let kv = server.kv("example.com");
    let second = deployer.deploy(&page).await.unwrap();

    assert!(!second.route_created);
    assert_eq!(first.route_id, second.route_id);
    assert_eq!(server.kv("example.com"), kv);
    assert_eq!(server.routes_for("*example.com/*").len(), 1);
}

#[tokio::test]
async fn route_failure_keeps_kv_value() {
    let server = FakeCloudflareServer::start().await;
    server.fail_routes(true);
    let client = server.client();
    let locks = DomainLocks::new();

    let err = Deployer::new(&client, &locks)
        .deploy(&page("example.com", PageStatus::Published))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudflareError::Route(_)));
    assert!(err.to_string().contains("Route pattern is not allowed"));
    assert!(server.kv("example.com").is_some());
    assert!(server.script(WORKER).is_some());
}

#[tokio::test]
async fn toggling_detaches_and_restores_the_route() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let page = page("example.com", PageStatus::Published);
    let deployer = Deployer::new(&client, &locks);
    deployer.deploy(&page).await.unwrap();

    let off = deployer.set_activation(&page, PageStatus::Draft).await.unwrap();
    assert!(!off.is_active);
    assert!(server.routes_for("*example.com/*").is_empty());
    assert_eq!(server.kv_json("example.com").unwrap()["isActive"], false);
    assert_eq!(
        respond("example.com", server.kv("example.com").as_deref()),
        EdgeReply::Redirect("https://example.com".to_string())
    );

    let on = deployer.set_activation(&page, PageStatus::Published).await.unwrap();
    assert!(on.is_active);
    assert!(on.route_updated);
    assert_eq!(server.routes_for("*example.com/*").len(), 1);
    assert_eq!(server.kv_json("example.com").unwrap()["status"], "published");
}

#[tokio::test]
async fn toggle_keeps_kv_when_route_step_fails() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let page = page("example.com", PageStatus::Published);
    let deployer = Deployer::new(&client, &locks);
    deployer.deploy(&page).await.unwrap();
    server.fail_routes(true);

    let report = deployer.set_activation(&page, PageStatus::Draft).await.unwrap();
    assert!(!report.route_updated);
    assert!(report.route_error.is_some());
    assert_eq!(server.kv_json("example.com").unwrap()["status"], "draft");
}

#[tokio::test]
async fn teardown_removes_every_edge_resource() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let deployer = Deployer::new(&client, &locks);
    deployer
        .deploy(&page("example.com", PageStatus::Published))
        .await
        .unwrap();
    server.add_cname("example.com");
    server.add_cname("status.example.com");

    let report = deployer.teardown("example.com").await.unwrap();
    assert!(report.kv_existed);
    assert!(report.route_removed);
    assert_eq!(report.dns_records_removed, 1);
    assert!(report.warnings.is_empty());
    assert!(server.kv("example.com").is_none());
    assert!(server.routes_for("*example.com/*").is_empty());
    assert_eq!(server.cname_names(), vec!["status.example.com".to_string()]);
    assert_eq!(respond("example.com", None), EdgeReply::NotFound);
}

#[tokio::test]
async fn teardown_of_never_deployed_domain_is_clean() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();

    let report = Deployer::new(&client, &locks).teardown("never.example.com").await.unwrap();
    assert!(!report.kv_existed);
    assert!(!report.route_removed);
    assert_eq!(report.dns_records_removed, 0);
    assert!(report.warnings.is_empty());
}

#[tokio::test]
async fn connectivity_test_provisions_placeholder_worker() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();

    let report = run_connectivity_test(&client).await;
    assert!(report.success, "{:?}", report.failure());
    assert_eq!(report.checks.len(), 5);
    assert!(report.checks.iter().all(|c| c.status == CheckStatus::Success));
    assert!(server
        .script(WORKER)
        .unwrap()
        .contains("Maintenance worker is provisioned"));
}

#[tokio::test]
async fn connectivity_test_stops_at_bad_zone() {
    let server = FakeCloudflareServer::start().await;
    let mut credentials = server.credentials();
    credentials.zone_id = "zone-missing".to_string();
    let client = server.client_with(credentials);

    let report = run_connectivity_test(&client).await;
    assert!(!report.success);
    let statuses: Vec<(&str, CheckStatus)> = report.checks.iter().map(|c| (c.name, c.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("token", CheckStatus::Success),
            ("account", CheckStatus::Success),
            ("zone", CheckStatus::Failed),
            ("kv_namespace", CheckStatus::Skipped),
            ("worker", CheckStatus::Skipped),
        ]
    );
    assert!(server.script(WORKER).is_none());
}

#[tokio::test]
async fn moving_a_deployed_page_leaves_nothing_at_the_old_domain() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let deployer = Deployer::new(&client, &locks);
    let mut page = page("old.example.com", PageStatus::Published);
    deployer.deploy(&page).await.unwrap();

    // Same order as the page update: old domain first, then the new one
    deployer.teardown("old.example.com").await.unwrap();
    page.domain = "new.example.com".to_string();
    deployer.deploy(&page).await.unwrap();

    assert!(server.kv("old.example.com").is_none());
    assert!(server.routes_for("*old.example.com/*").is_empty());
    assert_eq!(server.kv_json("new.example.com").unwrap()["domain"], "new.example.com");
    assert_eq!(server.routes_for("*new.example.com/*").len(), 1);

    deployer.teardown("new.example.com").await.unwrap();
    assert!(server.kv("new.example.com").is_none());
    assert!(server.account().routes.is_empty());
}

#[tokio::test]
async fn failed_first_deploy_is_cleaned_up_by_teardown() {
    let server = FakeCloudflareServer::start().await;
    server.fail_routes(true);
    let client = server.client();
    let locks = DomainLocks::new();
    let deployer = Deployer::new(&client, &locks);

    deployer
        .deploy(&page("example.com", PageStatus::Published))
        .await
        .unwrap_err();
    assert!(server.kv("example.com").is_some());

    let report = deployer.teardown("example.com").await.unwrap();
    assert!(report.kv_existed);
    assert!(!report.route_removed);
    assert!(server.kv("example.com").is_none());
}

#[tokio::test]
async fn archived_page_is_no_longer_served() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();
    let locks = DomainLocks::new();
    let page = page("example.com", PageStatus::Published);
    let deployer = Deployer::new(&client, &locks);
    deployer.deploy(&page).await.unwrap();

    let report = deployer.set_activation(&page, PageStatus::Archived).await.unwrap();
    assert!(!report.is_active);
    assert!(server.routes_for("*example.com/*").is_empty());
    assert_eq!(server.kv_json("example.com").unwrap()["status"], "archived");
    assert!(matches!(
        respond("example.com", server.kv("example.com").as_deref()),
        EdgeReply::Redirect(_)
    ));
}

#[tokio::test]
async fn worker_names_with_spaces_are_path_encoded() {
    let server = FakeCloudflareServer::start().await;
    let mut credentials = server.credentials();
    credentials.worker_name = "status worker".to_string();
    let client = server.client_with(credentials);

    client.upload_script("status worker", "// script").await.unwrap();
    assert!(server.script("status worker").is_some());
    assert!(server.script("status+worker").is_none());
}
