use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{Config, GeofenceConfig, IpLookupFailurePolicy};
use crate::donor_id;
use crate::geo::{self, GeoPoint};
use crate::ip_lookup::{IpLookup, IpLookupError};
use crate::models::{DonorRecord, NewDonorRecord};
use crate::store::{DonorStore, StoreError};

use super::SubmissionRequest;

/// Why a submission was turned away. These are expected business outcomes,
/// reported verbatim to the client and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    CoordinatesRequired,
    OutsideAllowedArea,
    ProxyDetected,
    IpGpsMismatch,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::CoordinatesRequired => "Coordinates required",
            Rejection::OutsideAllowedArea => "Outside allowed area",
            Rejection::ProxyDetected => "VPN/Proxy detected",
            Rejection::IpGpsMismatch => "IP and GPS mismatch",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

/// Collaborator failures. Unlike [`Rejection`], these say nothing about the
/// submission itself.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("unable to verify location: {0}")]
    IpLookup(#[from] IpLookupError),
    #[error("store failure: {0}")]
    Store(#[from] StoreError),
    #[error("no free donor id after {attempts} attempts")]
    DonorIdExhausted { attempts: u32 },
}

/// Fields handed back to the client for its QR donor card.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub donor_id: String,
    pub user_name: String,
    pub roll_number: String,
    pub mobile_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub request_id: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedSubmission {
    pub donor_id: String,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub qr_data: QrPayload,
}

impl From<DonorRecord> for AcceptedSubmission {
    fn from(record: DonorRecord) -> Self {
        let qr_data = QrPayload {
            donor_id: record.donor_id.clone(),
            user_name: record.user_name,
            roll_number: record.roll_number,
            mobile_number: record.mobile_number,
            latitude: record.latitude,
            longitude: record.longitude,
            timestamp: record.created_at,
            request_id: record.request_id,
            token: record.token,
        };
        AcceptedSubmission {
            donor_id: record.donor_id,
            accuracy: record.accuracy,
            timestamp: record.created_at,
            qr_data,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(AcceptedSubmission),
    Rejected(Rejection),
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub geofence: GeofenceConfig,
    pub ip_failure_policy: IpLookupFailurePolicy,
    pub id_max_attempts: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            geofence: GeofenceConfig::default(),
            ip_failure_policy: IpLookupFailurePolicy::FailClosed,
            id_max_attempts: 10,
        }
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            geofence: config.geofence.clone(),
            ip_failure_policy: config.ip_lookup.failure_policy,
            id_max_attempts: config.id_max_attempts,
        }
    }
}

pub type IdSource = Arc<dyn Fn() -> String + Send + Sync>;

/// Early exit from the validation stages.
enum Halt {
    Rejected(Rejection),
    Failed(PipelineError),
}

impl From<Rejection> for Halt {
    fn from(r: Rejection) -> Self {
        Halt::Rejected(r)
    }
}

impl From<PipelineError> for Halt {
    fn from(e: PipelineError) -> Self {
        Halt::Failed(e)
    }
}

/// Submission validation and persistence.
///
/// Stages run in order and stop at the first rejection: presence, geofence,
/// IP reputation, IP/GPS consistency, donor id assignment, persistence.
/// Nothing is written unless every check passes.
pub struct Pipeline {
    settings: PipelineSettings,
    store: Arc<dyn DonorStore>,
    ip_lookup: Arc<dyn IpLookup>,
    next_id: IdSource,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        store: Arc<dyn DonorStore>,
        ip_lookup: Arc<dyn IpLookup>,
    ) -> Self {
        Self {
            settings,
            store,
            ip_lookup,
            next_id: Arc::new(donor_id::generate_random),
        }
    }

    /// Replace the donor id candidate source.
    pub fn with_id_source(mut self, next_id: IdSource) -> Self {
        self.next_id = next_id;
        self
    }

    pub async fn run(
        &self,
        request: &SubmissionRequest,
        client_ip: IpAddr,
    ) -> Result<ValidationOutcome, PipelineError> {
        let point = match self.validate(request, client_ip).await {
            Ok(point) => point,
            Err(Halt::Rejected(rejection)) => {
                tracing::info!(%client_ip, reason = rejection.reason(), "Submission rejected");
                return Ok(ValidationOutcome::Rejected(rejection));
            }
            Err(Halt::Failed(err)) => return Err(err),
        };

        let stored = self.persist(request, point).await?;
        tracing::info!(
            %client_ip,
            donor_id = %stored.donor_id,
            request_id = stored.request_id.as_deref().unwrap_or(""),
            "Submission accepted"
        );

        Ok(ValidationOutcome::Accepted(stored.into()))
    }

    async fn validate(
        &self,
        request: &SubmissionRequest,
        client_ip: IpAddr,
    ) -> Result<GeoPoint, Halt> {
        let point = request.location().ok_or(Rejection::CoordinatesRequired)?;
        self.check_geofence(point)?;
        self.cross_check_ip(point, client_ip).await?;
        Ok(point)
    }

    fn check_geofence(&self, point: GeoPoint) -> Result<(), Rejection> {
        let fence = &self.settings.geofence;
        if geo::within_radius(point, fence.center, fence.radius_km) {
            Ok(())
        } else {
            Err(Rejection::OutsideAllowedArea)
        }
    }

    async fn cross_check_ip(&self, point: GeoPoint, client_ip: IpAddr) -> Result<(), Halt> {
        let found = match self.ip_lookup.lookup(client_ip).await {
            Ok(found) => found,
            Err(err) => {
                return match self.settings.ip_failure_policy {
                    IpLookupFailurePolicy::FailClosed => {
                        tracing::warn!(%client_ip, "IP lookup failed: {err}");
                        Err(PipelineError::IpLookup(err).into())
                    }
                    IpLookupFailurePolicy::FailOpen => {
                        tracing::warn!(%client_ip, "IP lookup failed, skipping IP checks: {err}");
                        Ok(())
                    }
                };
            }
        };

        if found.is_proxy || found.is_hosting {
            return Err(Rejection::ProxyDetected.into());
        }

        let gap_km = geo::distance_km(found.location, point);
        if gap_km > self.settings.geofence.ip_mismatch_km {
            tracing::debug!(%client_ip, gap_km, "IP location far from reported GPS point");
            return Err(Rejection::IpGpsMismatch.into());
        }

        Ok(())
    }

    /// Draw candidates until one is not in the store.
    async fn assign_donor_id(&self) -> Result<String, PipelineError> {
        let attempts = self.settings.id_max_attempts;
        for attempt in 1..=attempts {
            let candidate = (self.next_id)();
            if !self.store.exists(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(attempt, donor_id = %candidate, "Donor id collision, regenerating");
        }

        tracing::error!(attempts, "Donor id space exhausted");
        Err(PipelineError::DonorIdExhausted { attempts })
    }

    async fn persist(
        &self,
        request: &SubmissionRequest,
        point: GeoPoint,
    ) -> Result<DonorRecord, PipelineError> {
        let mut record = NewDonorRecord {
            donor_id: self.assign_donor_id().await?,
            latitude: point.latitude,
            longitude: point.longitude,
            accuracy: request.accuracy(),
            user_name: request.user_name.clone().unwrap_or_default(),
            roll_number: request.roll_number.clone().unwrap_or_default(),
            mobile_number: request.mobile_number.clone().unwrap_or_default(),
            request_id: request.request_id.clone(),
            token: request.token.clone(),
            created_at: Utc::now(),
        };

        // A concurrent submission can claim the id between the exists check
        // and the insert. The store's unique constraint catches that; redraw once.
        match self.store.insert(record.clone()).await {
            Ok(stored) => Ok(stored),
            Err(StoreError::DuplicateDonorId(taken)) => {
                tracing::warn!(donor_id = %taken, "Donor id claimed concurrently, redrawing");
                record.donor_id = self.assign_donor_id().await?;
                Ok(self.store.insert(record).await?)
            }
            Err(err) => Err(err.into()),
        }
    }
}
