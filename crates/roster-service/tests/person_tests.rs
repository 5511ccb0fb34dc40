//! Person CRUD integration tests.
//!
//! Runs against the in-memory store with an allow-everything policy so
//! the tests exercise handler semantics rather than the auth pipeline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use anyhow::Result;
use common::TestServer;

struct Api {
    base: String,
    token: String,
    client: reqwest::Client,
}

impl Api {
    fn new(server: &TestServer) -> Self {
        Self {
            base: server.url(),
            token: server.valid_token(),
            client: reqwest::Client::new(),
        }
    }

    async fn create(&self, name: &str, email: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/person", self.base))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({"name": name, "email": email}))
            .send()
            .await
            .expect("request should succeed")
    }

    async fn get(&self, id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/person/{}", self.base, id))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .expect("request should succeed")
    }

    async fn put(&self, id: &str, name: &str, email: &str) -> reqwest::Response {
        self.client
            .put(format!("{}/person/{}", self.base, id))
            .header("Authorization", format!("Bearer {}", self.token))
            .json(&serde_json::json!({"name": name, "email": email}))
            .send()
            .await
            .expect("request should succeed")
    }

    async fn delete(&self, id: &str) -> reqwest::Response {
        self.client
            .delete(format!("{}/person/{}", self.base, id))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .expect("request should succeed")
    }

    async fn list(&self) -> reqwest::Response {
        self.client
            .get(format!("{}/person", self.base))
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .expect("request should succeed")
    }
}

#[tokio::test]
async fn test_create_then_get_round_trip() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let response = api.create("Ada Lovelace", "ada@example.com").await;
    assert_eq!(response.status(), 202);
    let body: serde_json::Value = response.json().await?;
    let id = body["id"].as_i64().unwrap();

    let response = api.get(&id.to_string()).await;
    assert_eq!(response.status(), 200);
    let person: serde_json::Value = response.json().await?;
    assert_eq!(person["name"], "Ada Lovelace");
    assert_eq!(person["email"], "ada@example.com");

    Ok(())
}

#[tokio::test]
async fn test_get_missing_person_is_404() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let response = api.get("999").await;
    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_non_numeric_id_is_400() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let response = api.get("not-a-number").await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["message"], "ID is invalid");

    Ok(())
}

#[tokio::test]
async fn test_create_rejects_invalid_payload() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let response = api.create("Al", "al@example.com").await;
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    Ok(())
}

#[tokio::test]
async fn test_create_duplicate_email_is_409() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    assert_eq!(
        api.create("Ada Lovelace", "ada@example.com").await.status(),
        202
    );

    let response = api.create("Other Person", "ada@example.com").await;
    assert_eq!(response.status(), 409);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"]["code"], "CONFLICT");

    Ok(())
}

#[tokio::test]
async fn test_update_existing_person() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let created: serde_json::Value = api
        .create("Ada Lovelace", "ada@example.com")
        .await
        .json()
        .await?;
    let id = created["id"].as_i64().unwrap().to_string();

    let response = api.put(&id, "Ada King", "ada@example.com").await;
    assert_eq!(response.status(), 202);

    let person: serde_json::Value = api.get(&id).await.json().await?;
    assert_eq!(person["name"], "Ada King");

    Ok(())
}

#[tokio::test]
async fn test_update_missing_person_is_404() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let response = api.put("999", "Nobody Here", "nobody@example.com").await;
    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_delete_person() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    let created: serde_json::Value = api
        .create("Ada Lovelace", "ada@example.com")
        .await
        .json()
        .await?;
    let id = created["id"].as_i64().unwrap().to_string();

    assert_eq!(api.delete(&id).await.status(), 202);
    assert_eq!(api.get(&id).await.status(), 404);
    assert_eq!(api.delete(&id).await.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_list_reflects_inserts() -> Result<()> {
    let server = TestServer::spawn().await?;
    let api = Api::new(&server);

    api.create("Ada Lovelace", "ada@example.com").await;
    api.create("Grace Hopper", "grace@example.com").await;

    let response = api.list().await;
    assert_eq!(response.status(), 200);

    let people: serde_json::Value = response.json().await?;
    let people = people.as_array().unwrap();
    assert_eq!(people.len(), 2);
    assert_eq!(people[0]["name"], "Ada Lovelace");
    assert_eq!(people[1]["name"], "Grace Hopper");

    Ok(())
}
