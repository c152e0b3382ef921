//! Tests against a real listener.

use std::time::Duration;

use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_session_survives_across_requests() {
    let (addr, shutdown, handle) = common::start_server().await;
    let base = format!("http://{addr}/api");

    let client = reqwest::Client::builder()
        .cookie_store(true)
        .no_proxy()
        .build()
        .unwrap();

    let res = client
        .post(format!("{base}/users"))
        .json(&json!({ "username": "alice", "password": "pw" }))
        .send()
        .await
        .expect("server reachable");
    assert_eq!(res.status(), 200);

    let res = client
        .post(format!("{base}/login"))
        .json(&json!({ "username": "alice", "password": "pw" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("set-cookie"));

    let res = client.get(format!("{base}/session")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "alice");

    let res = client
        .get(format!("{base}/posts"))
        .query(&[("author", "alice")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!([]));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server stops after shutdown")
        .unwrap();
}
