use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CivicError;

// --- Geo Types ---

/// A WGS84 point. Stored as lon/lat to match the wire order used by
/// geospatial queries ([longitude, latitude]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Result<Self, CivicError> {
        validate_coordinates(lon, lat)?;
        Ok(Self { lon, lat })
    }
}

/// Reject out-of-range coordinates before they reach any store.
pub fn validate_coordinates(lon: f64, lat: f64) -> Result<(), CivicError> {
    if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
        return Err(CivicError::Validation(format!(
            "longitude out of range: {lon}"
        )));
    }
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(CivicError::Validation(format!(
            "latitude out of range: {lat}"
        )));
    }
    Ok(())
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

// --- Issue Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Roads,
    Water,
    Electricity,
    Garbage,
    Healthcare,
    Education,
    Other,
}

impl Category {
    /// Declaration order is load-bearing: classifier ties resolve to the
    /// first-declared category.
    pub const ALL: [Category; 7] = [
        Category::Roads,
        Category::Water,
        Category::Electricity,
        Category::Garbage,
        Category::Healthcare,
        Category::Education,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Roads => "roads",
            Category::Water => "water",
            Category::Electricity => "electricity",
            Category::Garbage => "garbage",
            Category::Healthcare => "healthcare",
            Category::Education => "education",
            Category::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "roads" => Ok(Category::Roads),
            "water" => Ok(Category::Water),
            "electricity" => Ok(Category::Electricity),
            "garbage" => Ok(Category::Garbage),
            "healthcare" => Ok(Category::Healthcare),
            "education" => Ok(Category::Education),
            "other" => Ok(Category::Other),
            other => Err(CivicError::Validation(format!("unknown category: {other}"))),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(CivicError::Validation(format!("unknown priority: {other}"))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Issue workflow state. Backward moves (e.g. in-progress -> acknowledged)
/// are allowed; the timeline records them rather than a DAG forbidding them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Pending,
    Acknowledged,
    #[serde(rename = "in-progress")]
    InProgress,
    Resolved,
    Rejected,
    Duplicate,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 6] = [
        IssueStatus::Pending,
        IssueStatus::Acknowledged,
        IssueStatus::InProgress,
        IssueStatus::Resolved,
        IssueStatus::Rejected,
        IssueStatus::Duplicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Pending => "pending",
            IssueStatus::Acknowledged => "acknowledged",
            IssueStatus::InProgress => "in-progress",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Rejected => "rejected",
            IssueStatus::Duplicate => "duplicate",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CivicError> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(IssueStatus::Pending),
            "acknowledged" => Ok(IssueStatus::Acknowledged),
            "in-progress" | "in_progress" => Ok(IssueStatus::InProgress),
            "resolved" => Ok(IssueStatus::Resolved),
            "rejected" => Ok(IssueStatus::Rejected),
            "duplicate" => Ok(IssueStatus::Duplicate),
            other => Err(CivicError::Validation(format!("unknown status: {other}"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IssueStatus::Resolved | IssueStatus::Rejected | IssueStatus::Duplicate
        )
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// Supported report/notification languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    Hindi,
    English,
    Punjabi,
    Gujarati,
    Marathi,
    Tamil,
    Bengali,
    Telugu,
    Kannada,
    Malayalam,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Hindi => "hindi",
            Language::English => "english",
            Language::Punjabi => "punjabi",
            Language::Gujarati => "gujarati",
            Language::Marathi => "marathi",
            Language::Tamil => "tamil",
            Language::Bengali => "bengali",
            Language::Telugu => "telugu",
            Language::Kannada => "kannada",
            Language::Malayalam => "malayalam",
        }
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "english" | "en" => Language::English,
            "punjabi" | "pa" => Language::Punjabi,
            "gujarati" | "gu" => Language::Gujarati,
            "marathi" | "mr" => Language::Marathi,
            "tamil" | "ta" => Language::Tamil,
            "bengali" | "bn" => Language::Bengali,
            "telugu" | "te" => Language::Telugu,
            "kannada" | "kn" => Language::Kannada,
            "malayalam" | "ml" => Language::Malayalam,
            _ => Language::Hindi,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Auth context ---

/// Caller role supplied by the auth layer; the engine trusts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Citizen,
    Official,
    Admin,
}

impl Role {
    /// Status transitions and assignment are restricted to elevated roles.
    pub fn can_manage_issues(&self) -> bool {
        matches!(self, Role::Official | Role::Admin)
    }

    pub fn from_str_loose(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "official" => Role::Official,
            "admin" => Role::Admin,
            _ => Role::Citizen,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Citizen => write!(f, "citizen"),
            Role::Official => write!(f, "official"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

/// Per-request identity as resolved by the upstream auth collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_shimla_ridge_to_mall_road_is_short() {
        // Two points on Shimla's Ridge, a few hundred meters apart
        let dist = haversine_km(31.1048, 77.1734, 31.1041, 77.1717);
        assert!(dist < 0.5, "expected sub-km distance, got {dist}");
    }

    #[test]
    fn haversine_shimla_to_delhi() {
        // Shimla to Delhi is ~270km great-circle
        let dist = haversine_km(31.1048, 77.1734, 28.6139, 77.209);
        assert!((dist - 277.0).abs() < 10.0, "got {dist}");
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let dist = haversine_km(31.1048, 77.1734, 31.1048, 77.1734);
        assert!(dist < 0.001);
    }

    #[test]
    fn coordinates_out_of_range_rejected() {
        assert!(validate_coordinates(181.0, 0.0).is_err());
        assert!(validate_coordinates(-181.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 91.0).is_err());
        assert!(validate_coordinates(0.0, -91.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(77.1734, 31.1048).is_ok());
        assert!(validate_coordinates(180.0, 90.0).is_ok());
    }

    #[test]
    fn status_serializes_hyphenated_in_progress() {
        let json = serde_json::to_string(&IssueStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(IssueStatus::parse("in-progress").unwrap(), IssueStatus::InProgress);
    }

    #[test]
    fn bad_enum_values_are_validation_errors() {
        assert!(matches!(
            Category::parse("potholes"),
            Err(CivicError::Validation(_))
        ));
        assert!(matches!(
            Priority::parse("urgent"),
            Err(CivicError::Validation(_))
        ));
        assert!(matches!(
            IssueStatus::parse("closed"),
            Err(CivicError::Validation(_))
        ));
    }

    #[test]
    fn terminal_states() {
        assert!(IssueStatus::Resolved.is_terminal());
        assert!(IssueStatus::Rejected.is_terminal());
        assert!(IssueStatus::Duplicate.is_terminal());
        assert!(!IssueStatus::Pending.is_terminal());
        assert!(!IssueStatus::InProgress.is_terminal());
    }

    #[test]
    fn role_permissions() {
        assert!(Role::Official.can_manage_issues());
        assert!(Role::Admin.can_manage_issues());
        assert!(!Role::Citizen.can_manage_issues());
    }
}
