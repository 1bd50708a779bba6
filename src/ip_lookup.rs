use std::net::IpAddr;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::IpLookupConfig;
use crate::geo::GeoPoint;

const FIELDS: &str = "status,message,lat,lon,proxy,hosting";

/// Approximate location and reputation flags for a network address.
/// Best-effort data from a third party, never ground truth.
#[derive(Debug, Clone, PartialEq)]
pub struct IpLookupResult {
    pub location: GeoPoint,
    pub is_proxy: bool,
    pub is_hosting: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum IpLookupError {
    #[error("ip lookup request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("ip lookup returned HTTP {0}")]
    Status(u16),
    #[error("ip lookup could not resolve address: {0}")]
    Unresolved(String),
    #[error("ip lookup returned a malformed body: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait IpLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<IpLookupResult, IpLookupError>;
}

/// Raw ip-api.com response shape.
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    proxy: Option<bool>,
    hosting: Option<bool>,
}

impl TryFrom<IpApiResponse> for IpLookupResult {
    type Error = IpLookupError;

    fn try_from(resp: IpApiResponse) -> Result<Self, Self::Error> {
        let status = resp
            .status
            .ok_or_else(|| IpLookupError::Malformed("missing status".to_string()))?;
        if status != "success" {
            return Err(IpLookupError::Unresolved(
                resp.message.unwrap_or(status),
            ));
        }

        let location = match (resp.lat, resp.lon) {
            (Some(lat), Some(lon)) => GeoPoint::new(lat, lon)
                .ok_or_else(|| IpLookupError::Malformed("non-finite coordinates".to_string()))?,
            _ => return Err(IpLookupError::Malformed("missing coordinates".to_string())),
        };

        // Absent flags must not read as a clean address
        let (Some(is_proxy), Some(is_hosting)) = (resp.proxy, resp.hosting) else {
            return Err(IpLookupError::Malformed(
                "missing proxy/hosting flags".to_string(),
            ));
        };

        Ok(IpLookupResult {
            location,
            is_proxy,
            is_hosting,
        })
    }
}

/// Looks addresses up against an ip-api.com compatible JSON service.
pub struct HttpIpLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIpLookup {
    pub fn new(config: &IpLookupConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IpLookup for HttpIpLookup {
    async fn lookup(&self, ip: IpAddr) -> Result<IpLookupResult, IpLookupError> {
        let url = format!("{}/{ip}?fields={FIELDS}", self.base_url);

        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IpLookupError::Status(status.as_u16()));
        }

        let body = resp.bytes().await?;
        let parsed: IpApiResponse = serde_json::from_slice(&body)
            .map_err(|e| IpLookupError::Malformed(e.to_string()))?;

        let result = IpLookupResult::try_from(parsed)?;
        tracing::debug!(
            %ip,
            lat = result.location.latitude,
            lon = result.location.longitude,
            proxy = result.is_proxy,
            hosting = result.is_hosting,
            "IP lookup resolved"
        );
        Ok(result)
    }
}
