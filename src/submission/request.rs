use serde::{Deserialize, Deserializer, de};
use serde_json::Value;

use crate::geo::GeoPoint;

/// Body of a location submission.
///
/// Coordinates stay loosely typed until the presence check so that a missing
/// or garbled value becomes a rejection instead of a parse error. Form posts
/// deliver them as strings. Text fields take any JSON scalar so that a
/// numeric `requestId` or `mobileNumber` is carried through as text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub accuracy: Option<Value>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub roll_number: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub mobile_number: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "opaque_string")]
    pub token: Option<String>,
}

impl SubmissionRequest {
    /// The submitted point, if both coordinates are present and finite.
    pub fn location(&self) -> Option<GeoPoint> {
        let lat = number(self.latitude.as_ref()?)?;
        let lon = number(self.longitude.as_ref()?)?;
        GeoPoint::new(lat, lon)
    }

    /// Reported accuracy in meters. Unusable values are dropped.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
            .as_ref()
            .and_then(number)
            .filter(|a| a.is_finite())
    }
}

fn opaque_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string or number, got {other}"
        ))),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
