use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde_json::json;

mod common;
use common::{TestServer, GOOD_KEY};

#[tokio::test]
async fn options_bundle_and_whitelist() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("options").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["wpnakama_update_indicator"], "3");
    assert_eq!(res.body["using_permalinks"], true);

    let res = server.get("options?option_name=blogname").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!(server.config.site.blogname));

    let res = server.get("options?option_name=wpnakama_license_key").await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Invaild options name passed.");
    Ok(())
}

#[tokio::test]
async fn options_write_needs_a_writable_option() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server
        .write(Method::PUT, "options", json!({ "wpnakama_rating": { "status": "rated" } }))
        .await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["message"], "Successfully updated!");

    let res = server.get("options?option_name=wpnakama_rating").await?;
    assert_eq!(res.body["status"], "rated");

    let res = server.write(Method::PUT, "options", json!({ "blogname": "hijack" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = server
        .call(Method::PUT, &server.api("options"), None, Some(json!({ "wpnakama_rating": "x" })))
        .await?;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    Ok(())
}

#[tokio::test]
async fn license_key_lifecycle() -> Result<()> {
    let server = TestServer::start().await?;

    let res = server.get("license").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "not found");

    let res = server.write(Method::PUT, "license", json!({})).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", res.body);
    assert_eq!(res.body["message"], "License key is required.");

    let res = server.write(Method::PUT, "license", json!({ "license_key": "bad-key" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["message"], "Invalid License Key.");

    let res = server.write(Method::PUT, "license", json!({ "license_key": GOOD_KEY })).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["message"], "Successfully added the license key!");

    let res = server.write(Method::POST, "license/activate", json!({})).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["status"], "active");
    assert_eq!(res.body["data"]["usage"], 2);
    assert_eq!(res.body["data"]["limit"], 5);

    let res = server.write(Method::POST, "license/activate", json!({})).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN, "already active");

    let res = server.write(Method::POST, "license/deactivate", json!({})).await?;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(res.body["data"]["status"], "inactive");

    let res = server.write(Method::DELETE, "license", json!({})).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Successfully deleted the license key!");
    Ok(())
}
