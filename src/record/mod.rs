use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;


/// Display name used when the feed omits `shipName`
pub const DEFAULT_NAME: &str = "unknown";

/// Code used when the feed omits `shipNumber`
pub const DEFAULT_CODE: &str = "N/A";

/// EntityRecord is the latest known state of one tracked object.
///
/// Records are keyed by `id`; a newer payload for the same id fully
/// replaces the older record, with no field-level merge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Stable unique identifier
    pub id: String,

    /// Display name, defaulted when the feed omits it
    pub name: String,

    /// Descriptive code, defaulted when the feed omits it
    pub code: String,

    pub longitude: f64,
    pub latitude: f64,

    /// Height above the reference surface; 0 when not reported
    pub height: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub allegiance: Option<i64>,

    /// Local receipt time. The sender-supplied `time` field is never
    /// used here; expiry is always measured from receipt.
    pub last_updated: DateTime<Utc>,
}

/// Wire shape of one feed element, exactly as the contract names it.
///
/// Every field is optional at this layer; required-field and finiteness
/// checks happen in [`EntityRecord::from_raw`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawRecord {
    pub id: Option<String>,

    #[serde(rename = "shipName")]
    pub ship_name: Option<String>,

    #[serde(rename = "shipNumber")]
    pub ship_number: Option<String>,

    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub height: Option<f64>,
    pub heading: Option<f64>,
    pub country: Option<String>,

    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub attr: Option<i64>,

    /// Sender timestamp (epoch millis); accepted but discarded
    pub time: Option<i64>,
}

/// Validation errors for a single feed element
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    MissingId,
    EmptyId,
    MissingCoordinate(&'static str),
    NonFiniteCoordinate(&'static str),
    Malformed(String),
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::MissingId => write!(f, "id is required"),
            RecordError::EmptyId => write!(f, "id must be non-empty"),
            RecordError::MissingCoordinate(field) => {
                write!(f, "{} is required", field)
            }
            RecordError::NonFiniteCoordinate(field) => {
                write!(f, "{} must be a finite number", field)
            }
            RecordError::Malformed(msg) => write!(f, "malformed record: {}", msg),
        }
    }
}

impl std::error::Error for RecordError {}

impl EntityRecord {
    /// Validates and normalizes one wire element.
    ///
    /// Rules:
    /// - `id` required and non-empty
    /// - `longitude`/`latitude` required and finite
    /// - `shipName`/`shipNumber` defaulted, `height` defaults to 0
    /// - `last_updated` is `received_at`, never the sender's `time`
    pub fn from_raw(raw: RawRecord, received_at: DateTime<Utc>) -> Result<Self, RecordError> {
        let id = raw.id.ok_or(RecordError::MissingId)?;
        if id.is_empty() {
            return Err(RecordError::EmptyId);
        }

        let longitude = raw
            .longitude
            .ok_or(RecordError::MissingCoordinate("longitude"))?;
        let latitude = raw
            .latitude
            .ok_or(RecordError::MissingCoordinate("latitude"))?;
        if !longitude.is_finite() {
            return Err(RecordError::NonFiniteCoordinate("longitude"));
        }
        if !latitude.is_finite() {
            return Err(RecordError::NonFiniteCoordinate("latitude"));
        }

        Ok(Self {
            id,
            name: raw.ship_name.unwrap_or_else(|| DEFAULT_NAME.to_string()),
            code: raw.ship_number.unwrap_or_else(|| DEFAULT_CODE.to_string()),
            longitude,
            latitude,
            height: raw.height.unwrap_or(0.0),
            heading: raw.heading,
            origin: raw.country,
            category: raw.kind,
            allegiance: raw.attr,
            last_updated: received_at,
        })
    }
}

/// Decodes one feed frame into its elements.
///
/// A frame is either a single JSON object or an array of objects. Elements
/// decode independently: a malformed element yields an `Err` in its slot
/// without invalidating the rest of the batch. An unparseable frame is a
/// frame-level error.
pub fn decode_frame(text: &str) -> Result<Vec<Result<RawRecord, RecordError>>, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    let elements = match value {
        Value::Array(items) => items,
        other => vec![other],
    };

    Ok(elements
        .into_iter()
        .map(|element| {
            serde_json::from_value::<RawRecord>(element)
                .map_err(|e| RecordError::Malformed(e.to_string()))
        })
        .collect())
}
