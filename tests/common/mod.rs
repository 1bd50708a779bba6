use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use raktmap::config::{
    Config, CorsConfig, GeofenceConfig, IpLookupConfig, IpLookupFailurePolicy,
};
use raktmap::geo::GeoPoint;
use raktmap::ip_lookup::{IpLookup, IpLookupError, IpLookupResult};
use raktmap::store::MemoryDonorStore;

/// Hospital center used by the default geofence.
#[allow(dead_code)]
pub const CENTER: (f64, f64) = (22.6023, 72.8205);

/// Canned IP lookup answers, switchable per test.
#[derive(Clone, Debug)]
#[allow(dead_code)]
pub enum LookupReply {
    At { lat: f64, lon: f64 },
    Proxy,
    Unresolved,
}

pub struct StubLookup {
    reply: Mutex<LookupReply>,
    pub seen: Mutex<Vec<IpAddr>>,
}

impl StubLookup {
    #[allow(dead_code)]
    pub fn set_reply(&self, reply: LookupReply) {
        *self.reply.lock().unwrap() = reply;
    }

    #[allow(dead_code)]
    pub fn seen(&self) -> Vec<IpAddr> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl IpLookup for StubLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<IpLookupResult, IpLookupError> {
        self.seen.lock().unwrap().push(ip);
        let reply = self.reply.lock().unwrap().clone();
        match reply {
            LookupReply::At { lat, lon } => Ok(IpLookupResult {
                location: GeoPoint::new(lat, lon).unwrap(),
                is_proxy: false,
                is_hosting: false,
            }),
            LookupReply::Proxy => Ok(IpLookupResult {
                location: GeoPoint::new(CENTER.0, CENTER.1).unwrap(),
                is_proxy: true,
                is_hosting: false,
            }),
            LookupReply::Unresolved => Err(IpLookupError::Unresolved("reserved range".to_string())),
        }
    }
}

/// A running test server backed by an in-memory store and a stub IP lookup.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub store: Arc<MemoryDonorStore>,
    pub lookup: Arc<StubLookup>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Post a JSON submission, return (body, status).
    pub async fn submit(&self, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/save-location"))
            .json(data)
            .send()
            .await
            .expect("submit request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Post a raw body with an explicit content type, return (body, status).
    #[allow(dead_code)]
    pub async fn submit_raw(&self, content_type: &str, body: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/save-location"))
            .header("content-type", content_type)
            .body(body.to_string())
            .send()
            .await
            .expect("submit raw request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }
}

/// A submission from just north of the hospital.
#[allow(dead_code)]
pub fn donor_submission() -> Value {
    json!({
        "latitude": 22.6123,
        "longitude": 72.8305,
        "accuracy": 18.0,
        "userName": "Asha Patel",
        "rollNumber": "21CE042",
        "mobileNumber": "9876543210",
        "requestId": "REQ-2041",
        "token": "sms-3f9c"
    })
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        geofence: GeofenceConfig::default(),
        ip_lookup: IpLookupConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(1),
            failure_policy: IpLookupFailurePolicy::FailClosed,
        },
        id_max_attempts: 10,
        max_body_size: 4096,
        trusted_proxies: vec!["127.0.0.1/32".parse().unwrap()],
        cors: CorsConfig {
            origins: vec!["http://localhost:3000".to_string()],
            origin_patterns: vec![r"^https://.*\.vercel\.app$".to_string()],
        },
        rate_limit: 100,
        rate_limit_window_secs: 60,
        static_dir: "tests/fixtures/public".to_string(),
        log_level: "warn".to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let store = Arc::new(MemoryDonorStore::new());
    let lookup = Arc::new(StubLookup {
        reply: Mutex::new(LookupReply::At {
            lat: 22.3072,
            lon: 73.1812,
        }),
        seen: Mutex::new(Vec::new()),
    });

    let (app, _state) = raktmap::build_app(config, store.clone(), lookup.clone());

    // Bind to random port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    // Spawn server in background
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        store,
        lookup,
    }
}
