use std::collections::HashMap;

use reqwest::StatusCode;
use serde_json::{Value, json};

use stockledger_api::app::{build_app, services::AppServices};
use stockledger_infra::AppConfig;

const ADMIN_PASSWORD: &str = "correct horse";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory stores, bound to an ephemeral port.
        let vars: HashMap<&str, &str> = HashMap::from([
            ("JWT_SECRET", "test-secret"),
            ("ADMIN_USERNAME", "admin"),
            ("ADMIN_PASSWORD", ADMIN_PASSWORD),
            ("COOKIE_TIME", "600"),
        ]);
        let config = AppConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        let services = AppServices::from_config(&config).await.unwrap();
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `name=value` pairs from the response's `Set-Cookie` headers.
fn set_cookies(res: &reqwest::Response) -> HashMap<String, String> {
    res.headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn login(client: &reqwest::Client, srv: &TestServer) -> (String, String) {
    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    (
        body["access"].as_str().unwrap().to_string(),
        body["refresh"].as_str().unwrap().to_string(),
    )
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, token: &str, price: i64) -> String {
    let res = client
        .post(srv.url("/products"))
        .bearer_auth(token)
        .json(&json!({ "name": "Widget", "price": price }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn purchase(client: &reqwest::Client, srv: &TestServer, token: &str, product: &str, quantity: i64, date: &str) {
    let res = client
        .post(srv.url("/purchases"))
        .bearer_auth(token)
        .json(&json!({ "product": product, "quantity": quantity, "purchase_date": date }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

async fn sell(client: &reqwest::Client, srv: &TestServer, token: &str, product: &str, quantity: i64) -> reqwest::Response {
    client
        .post(srv.url("/sales"))
        .bearer_auth(token)
        .json(&json!({ "product": product, "quantity": quantity }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_public_and_resources_are_not() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    for path in ["/products", "/purchases", "/sales", "/whoami"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
    }
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "username": "admin", "password": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "authentication_failed");
}

#[tokio::test]
async fn login_sets_cookies_that_authenticate() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/login"))
        .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let raw: Vec<String> = res
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(raw.iter().all(|c| c.contains("HttpOnly") && c.contains("Max-Age=600")));
    let cookies = set_cookies(&res);

    let res = client
        .get(srv.url("/whoami"))
        .header(reqwest::header::COOKIE, format!("access={}", cookies["access"]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "admin");
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (_, refresh) = login(&client, &srv).await;

    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn retry_mints_access_cookie_from_refresh_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (access, refresh) = login(&client, &srv).await;

    let res = client
        .post(srv.url("/retry"))
        .header("Refresh-Token", &refresh)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);
    assert_eq!(cookies["refresh"], refresh);

    let res = client
        .get(srv.url("/products"))
        .bearer_auth(&cookies["access"])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // An access token is not accepted in place of a refresh token.
    let res = client
        .post(srv.url("/retry"))
        .header("Refresh-Token", &access)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let cleared = set_cookies(&res);
    assert_eq!(cleared.get("access").map(String::as_str), Some(""));
    assert_eq!(cleared.get("refresh").map(String::as_str), Some(""));
}

#[tokio::test]
async fn logout_clears_cookies() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookies = set_cookies(&res);
    assert_eq!(cookies.get("access").map(String::as_str), Some(""));
    assert_eq!(cookies.get("refresh").map(String::as_str), Some(""));
}

#[tokio::test]
async fn product_crud_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let id = create_product(&client, &srv, &token, 120).await;

    let res = client
        .put(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "  Gadget  ", "price": 150 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Gadget");
    assert_eq!(updated["price"], 150);

    let res = client.get(srv.url("/products")).bearer_auth(&token).send().await.unwrap();
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_product_input_is_a_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    for body in [json!({ "name": "   ", "price": 1 }), json!({ "name": "Widget", "price": -1 }), json!({ "name": "Widget" })] {
        let res = client
            .post(srv.url("/products"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "validation_error");
    }
}

#[tokio::test]
async fn referenced_product_cannot_be_deleted() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let id = create_product(&client, &srv, &token, 10).await;
    purchase(&client, &srv, &token, &id, 1, "2024-01-01T00:00:00Z").await;

    let res = client
        .delete(srv.url(&format!("/products/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn sales_are_admitted_only_within_stock() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let id = create_product(&client, &srv, &token, 10).await;
    purchase(&client, &srv, &token, &id, 10, "2024-01-01T00:00:00Z").await;

    assert_eq!(sell(&client, &srv, &token, &id, 5).await.status(), StatusCode::CREATED);

    let res = sell(&client, &srv, &token, &id, 6).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "stock_exceeded");
    assert!(err["message"].as_str().unwrap().contains("cannot exceed stock on hand"));

    // Selling down to exactly zero is allowed; one more unit is not.
    assert_eq!(sell(&client, &srv, &token, &id, 5).await.status(), StatusCode::CREATED);
    assert_eq!(sell(&client, &srv, &token, &id, 1).await.status(), StatusCode::BAD_REQUEST);

    let res = client.get(srv.url("/sales")).bearer_auth(&token).send().await.unwrap();
    let listed: Value = res.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn zero_quantity_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let id = create_product(&client, &srv, &token, 10).await;
    let res = sell(&client, &srv, &token, &id, 0).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "validation_error");
}

#[tokio::test]
async fn unknown_product_is_reported_for_movements() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;
    let ghost = "0190a5c8-0000-7000-8000-000000000000";

    let res = sell(&client, &srv, &token, ghost, 1).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "unknown_product");

    let res = client
        .post(srv.url("/purchases"))
        .bearer_auth(&token)
        .json(&json!({ "product": ghost, "quantity": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let err: Value = res.json().await.unwrap();
    assert_eq!(err["error"], "unknown_product");
}

#[tokio::test]
async fn inventory_ledger_is_chronological() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let id = create_product(&client, &srv, &token, 25).await;
    purchase(&client, &srv, &token, &id, 4, "2024-03-01T11:00:00Z").await;
    purchase(&client, &srv, &token, &id, 5, "2024-03-01T09:00:00Z").await;
    let res = client
        .post(srv.url("/sales"))
        .bearer_auth(&token)
        .json(&json!({ "product": id, "quantity": 2, "sales_date": "2024-03-01T10:00:00Z" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(srv.url(&format!("/inventory/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<Value> = res.json().await.unwrap();
    let shape: Vec<(String, u64)> = rows
        .iter()
        .map(|r| (r["type"].as_str().unwrap().to_string(), r["quantity"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("purchase".to_string(), 5),
            ("sale".to_string(), 2),
            ("purchase".to_string(), 4),
        ]
    );
    assert!(rows.iter().all(|r| r["unit_price"] == 25));
}

#[tokio::test]
async fn inventory_requires_a_product_id() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let res = client.get(srv.url("/inventory")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/inventory/0190a5c8-0000-7000-8000-000000000000"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<Value> = res.json().await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn concurrent_sales_cannot_oversell() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (token, _) = login(&client, &srv).await;

    let id = create_product(&client, &srv, &token, 10).await;
    purchase(&client, &srv, &token, &id, 10, "2024-01-01T00:00:00Z").await;

    let (a, b) = tokio::join!(
        sell(&client, &srv, &token, &id, 6),
        sell(&client, &srv, &token, &id, 6)
    );
    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);
}
