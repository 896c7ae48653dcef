use std::collections::BTreeMap;
use std::time::Duration;

use tempfile::TempDir;

use tiplink_node::client::{ClientConfig, TipClient};
use tiplink_node::store::local::LocalStore;
use tiplink_node::store::{PaymentKind, PaymentMethod, TipPageInput};


fn binary_available() -> bool {
    let ok = std::path::Path::new(harness::node_binary()).exists();
    if !ok {
        eprintln!(
            "Skipping integration test: {} not found",
            harness::node_binary()
        );
    }
    ok
}

fn input(name: &str) -> TipPageInput {
    let mut methods = BTreeMap::new();
    methods.insert(PaymentKind::Bitcoin, PaymentMethod::address("bc1xyz"));
    TipPageInput {
        display_name: name.to_string(),
        message: None,
        payment_methods: methods,
    }
}

#[tokio::test]
async fn remote_configured_client_round_trips_through_backend() {
    if !binary_available() {
        return;
    }
    let server_tmp = TempDir::new().unwrap();
    let (base, mut child) =
        harness::spawn_node(harness::free_port(), &server_tmp.path().to_string_lossy()).await;

    // Device one creates through the backend.
    let dev1 = TempDir::new().unwrap();
    let client1 = TipClient::new(
        ClientConfig::remote(base.parse().unwrap()),
        LocalStore::open(dev1.path()).unwrap(),
    )
    .unwrap();
    let served = client1.create_tip_page(input("Alice")).await.unwrap();
    assert!(!served.is_local(), "live backend must serve the create");
    let token = served.into_inner();

    assert_eq!(client1.tip_page_url(&token), format!("{base}/tip/{token}"));

    // A different device resolves the same link remotely.
    let dev2 = TempDir::new().unwrap();
    let client2 = TipClient::new(
        ClientConfig::remote(base.parse().unwrap()),
        LocalStore::open(dev2.path()).unwrap(),
    )
    .unwrap();
    let page = client2.get_tip_page(&token).await.unwrap();
    assert!(!page.is_local());
    assert_eq!(page.inner().display_name, "Alice");
    assert_eq!(page.inner().message, "Support my work anonymously");

    let _ = child.kill().await;
}

#[tokio::test]
async fn unreachable_backend_degrades_to_device_local_page() {
    if !binary_available() {
        return;
    }
    // The backend the creator is configured for never answers.
    let dead_base = format!("http://127.0.0.1:{}", harness::free_port());
    let dev = TempDir::new().unwrap();
    let client = TipClient::new(
        ClientConfig::remote(dead_base.parse().unwrap())
            .with_timeout(Duration::from_millis(300)),
        LocalStore::open(dev.path()).unwrap(),
    )
    .unwrap();

    let served = client.create_tip_page(input("Alice")).await.unwrap();
    assert!(served.is_local(), "create must degrade to offline success");
    let token = served.into_inner();

    // Same device: the page resolves from the local store.
    let page = client.get_tip_page(&token).await.unwrap();
    assert!(page.is_local());
    assert_eq!(page.inner().display_name, "Alice");

    // Any other device asking a real backend finds nothing: the create
    // committed to the local path only.
    let server_tmp = TempDir::new().unwrap();
    let (base, mut child) =
        harness::spawn_node(harness::free_port(), &server_tmp.path().to_string_lossy()).await;
    let resp = reqwest::get(format!("{base}/api/tip/{token}")).await.unwrap();
    assert_eq!(resp.status(), 404);

    let _ = child.kill().await;
}
