mod common;

use common::{FakeCloudflareServer, NAMESPACE, WORKER};
use statussaas::cloudflare::{CloudflareApi, CloudflareError, KV_BINDING_NAME};

#[tokio::test]
async fn token_verification_reads_status() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();

    let token = client.verify_token().await.unwrap();
    assert!(token.is_active());

    server.account().token_status = Some("disabled".to_string());
    let token = client.verify_token().await.unwrap();
    assert!(!token.is_active());
}

#[tokio::test]
async fn wrong_token_surfaces_api_error() {
    let server = FakeCloudflareServer::start().await;
    let mut credentials = server.credentials();
    credentials.api_token = "someone-elses-token".to_string();
    let client = server.client_with(credentials);

    let err = client.get_account().await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert!(err.to_string().contains("Authentication error"));
}

#[tokio::test]
async fn unknown_zone_is_not_found() {
    let server = FakeCloudflareServer::start().await;
    let mut credentials = server.credentials();
    credentials.zone_id = "zone-missing".to_string();
    let client = server.client_with(credentials);

    let err = client.get_zone().await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn kv_values_are_stored_raw() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();

    assert_eq!(client.kv_get("example.com").await.unwrap(), None);

    client.kv_put("example.com", r#"{"isActive":true}"#).await.unwrap();
    assert_eq!(server.kv("example.com").as_deref(), Some(r#"{"isActive":true}"#));
    assert_eq!(
        client.kv_get("example.com").await.unwrap().as_deref(),
        Some(r#"{"isActive":true}"#)
    );

    assert!(client.kv_delete("example.com").await.unwrap());
    assert!(!client.kv_delete("example.com").await.unwrap());
    assert!(server.kv("example.com").is_none());
}

#[tokio::test]
async fn scripts_upload_bind_and_delete() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();

    assert!(!client.script_exists(WORKER).await.unwrap());
    assert!(!client.delete_script(WORKER).await.unwrap());

    client
        .upload_script(WORKER, "addEventListener('fetch', () => {})")
        .await
        .unwrap();
    assert!(client.script_exists(WORKER).await.unwrap());

    client.bind_kv_namespace(WORKER).await.unwrap();
    let binding = server.account().bindings.get(WORKER).cloned().unwrap();
    assert_eq!(binding["bindings"][0]["type"], "kv_namespace");
    assert_eq!(binding["bindings"][0]["name"], KV_BINDING_NAME);
    assert_eq!(binding["bindings"][0]["namespace_id"], NAMESPACE);

    assert!(client.delete_script(WORKER).await.unwrap());
    assert!(server.script(WORKER).is_none());
}

#[tokio::test]
async fn binding_a_missing_script_fails() {
    let server = FakeCloudflareServer::start().await;
    let err = server.client().bind_kv_namespace(WORKER).await.unwrap_err();
    assert!(matches!(err, CloudflareError::Api { status: 404, .. }));
}

#[tokio::test]
async fn routes_are_created_updated_and_deleted() {
    let server = FakeCloudflareServer::start().await;
    let client = server.client();

    let created = client.create_route("*example.com/*", WORKER).await.unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.pattern, "*example.com/*");

    let duplicate = client.create_route("*example.com/*", WORKER).await.unwrap_err();
    assert_eq!(duplicate.status(), Some(409));

    let routes = client.list_routes().await.unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].script.as_deref(), Some(WORKER));

    client
        .update_route(&created.id, "*example.com/*", "other-worker")
        .await
        .unwrap();
    assert_eq!(server.routes_for("*example.com/*"), vec![Some("other-worker".to_string())]);

    client.delete_route(&created.id).await.unwrap();
    assert!(client.list_routes().await.unwrap().is_empty());
}

#[tokio::test]
async fn dns_lookup_filters_by_name() {
    let server = FakeCloudflareServer::start().await;
    server.add_cname("example.com");
    server.add_cname("www.example.com");
    let client = server.client();

    let records = client.list_dns_records("example.com").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record_type, "CNAME");

    client.delete_dns_record(&records[0].id).await.unwrap();
    assert_eq!(server.cname_names(), vec!["www.example.com".to_string()]);
}
