use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

use nakama_api::auth::Capability;

mod common;
use common::TestServer;

#[tokio::test]
async fn anonymous_reads_are_public() -> Result<()> {
    let server = TestServer::start().await?;

    for path in ["boards", "phases", "cards", "kanbancards", "tasks", "taskslists", "options", "license"] {
        let res = server.get(path).await?;
        assert_eq!(res.status, StatusCode::OK, "GET {} should be public: {}", path, res.body);
    }
    Ok(())
}

#[tokio::test]
async fn anonymous_writes_are_method_not_allowed() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .call(Method::POST, &server.api("boards"), None, Some(json!({ "title": "Launch" })))
        .await?;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.body["code"], "invalid-method");
    assert_eq!(res.body["message"], "Do not have permission to create entry in the database.");

    let res = server.call(Method::DELETE, &server.api("boards/1"), None, None).await?;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.body["message"], "Do not have permission to delete entry in the database.");

    // Nothing was written
    let res = server.get("boards").await?;
    assert_eq!(res.body, json!([]));
    Ok(())
}

#[tokio::test]
async fn forged_nonce_is_rejected_even_on_reads() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.call(Method::GET, &server.api("boards"), Some("not-a-nonce"), None).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["code"], "rest_cookie_invalid_nonce");
    Ok(())
}

#[tokio::test]
async fn capabilities_are_checked_per_verb() -> Result<()> {
    let server = TestServer::start().await?;
    let editor = server.nonce(&[Capability::EditPosts])?;

    let res = server
        .call(Method::POST, &server.api("boards"), Some(&editor), Some(json!({ "title": "Launch" })))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "edit_posts may create: {}", res.body);
    let board_id = res.body["data"]["board_id"].as_i64().unwrap();

    let res = server
        .call(Method::DELETE, &server.api(&format!("boards/{}", board_id)), Some(&editor), None)
        .await?;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED, "delete needs delete_posts");

    let deleter = server.nonce(&[Capability::DeletePosts])?;
    let res = server
        .call(Method::DELETE, &server.api(&format!("boards/{}", board_id)), Some(&deleter), None)
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    Ok(())
}

#[tokio::test]
async fn unknown_route_and_non_numeric_id_are_not_found() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("nothing-here").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = server.get("boards/abc").await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn health_and_service_info() -> Result<()> {
    let server = TestServer::start().await?;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client.get(format!("{}/health", server.base_url)).send().await?.json().await?;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["database"], "ok");

    let info: serde_json::Value = client.get(format!("{}/", server.base_url)).send().await?.json().await?;
    assert_eq!(info["name"], "Nakama API");
    assert_eq!(info["namespace"], server.config.route_base());
    Ok(())
}
