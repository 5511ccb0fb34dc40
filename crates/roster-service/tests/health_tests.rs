//! Health and metrics endpoint integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use anyhow::Result;
use common::TestServer;

#[tokio::test]
async fn test_health_endpoint_is_public() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["healthy"], true);
    assert_eq!(body["dependencies"][0]["name"], "db");
    assert_eq!(body["dependencies"][0]["healthy"], true);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    // Generate at least one recorded request first.
    client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404() -> Result<()> {
    let server = TestServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/nope", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    Ok(())
}
