//! Wiremock mounts for a fake identity provider.
//!
//! Stands up the two endpoints the service contacts at startup: the
//! OpenID discovery document and the JWKS endpoint.

use crate::keys::TestKeypair;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the JWKS document is mounted at.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Path the discovery document is mounted at.
pub const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Mount a JWKS document publishing the given keypairs.
pub async fn mount_jwks(server: &MockServer, keypairs: &[&TestKeypair]) {
    let body = serde_json::json!({
        "keys": keypairs.iter().map(|k| k.jwk_json()).collect::<Vec<_>>()
    });

    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(server)
        .await;
}

/// Mount a discovery document pointing at this server's JWKS endpoint.
///
/// Returns the discovery document URL to hand to the service
/// configuration.
pub async fn mount_discovery(server: &MockServer, algorithms: &[&str]) -> String {
    let body = serde_json::json!({
        "issuer": format!("{}/", server.uri()),
        "jwks_uri": format!("{}{}", server.uri(), JWKS_PATH),
        "id_token_signing_alg_values_supported": algorithms,
    });

    Mock::given(method("GET"))
        .and(path(DISCOVERY_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(server)
        .await;

    format!("{}{}", server.uri(), DISCOVERY_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mounted_endpoints_serve_json() {
        let server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "mock-key");

        mount_jwks(&server, &[&keypair]).await;
        let discovery_url = mount_discovery(&server, &["RS256"]).await;

        let jwks: serde_json::Value =
            reqwest_get(&format!("{}{}", server.uri(), JWKS_PATH)).await;
        assert_eq!(jwks["keys"][0]["kid"], "mock-key");

        let discovery: serde_json::Value = reqwest_get(&discovery_url).await;
        assert_eq!(
            discovery["jwks_uri"],
            format!("{}{}", server.uri(), JWKS_PATH)
        );
    }

    // Minimal GET helper; wiremock guarantees a local listener.
    async fn reqwest_get(url: &str) -> serde_json::Value {
        let body = reqwest::get(url)
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body should read");
        serde_json::from_str(&body).expect("body should be JSON")
    }
}
