use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    Substitution,
    Absence,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestType::Substitution => "substitution",
            RequestType::Absence => "absence",
        }
    }

    pub fn parse(s: &str) -> Option<RequestType> {
        match s {
            "substitution" => Some(RequestType::Substitution),
            "absence" => Some(RequestType::Absence),
            _ => None,
        }
    }
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<RequestStatus> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "denied" => Some(RequestStatus::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Request {
    pub request_id: String,
    pub user_id: String,
    pub menu_id: String,
    #[serde(rename = "type")]
    pub kind: RequestType,
    pub status: RequestStatus,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-(menu, user) meal status. `Standard` is never stored: no record means standard.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MealStatus {
    #[default]
    Standard,
    LatePlate,
    Served,
    Skipped,
}

impl MealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MealStatus::Standard => "standard",
            MealStatus::LatePlate => "late_plate",
            MealStatus::Served => "served",
            MealStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Option<MealStatus> {
        match s {
            "standard" => Some(MealStatus::Standard),
            "late_plate" => Some(MealStatus::LatePlate),
            "served" => Some(MealStatus::Served),
            "skipped" => Some(MealStatus::Skipped),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MealAttendance {
    pub menu_id: String,
    pub user_id: String,
    pub status: MealStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Info,
    Alert,
    Success,
}

impl NotificationType {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Info => "info",
            NotificationType::Alert => "alert",
            NotificationType::Success => "success",
        }
    }

    pub fn parse(s: &str) -> Option<NotificationType> {
        match s {
            "info" => Some(NotificationType::Info),
            "alert" => Some(NotificationType::Alert),
            "success" => Some(NotificationType::Success),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(rename = "type")]
    pub kind: NotificationType,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationType,
    ) -> Notification {
        Notification {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            read: false,
            kind,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct WasteConfig {
    pub container_volume_m3: f64,
    pub container_weight_kg: f64,
}

impl Default for WasteConfig {
    fn default() -> Self {
        WasteConfig {
            container_volume_m3: crate::constants::DEFAULT_CONTAINER_VOLUME_M3,
            container_weight_kg: crate::constants::DEFAULT_CONTAINER_WEIGHT_KG,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WasteLog {
    pub log_id: String,
    pub date: NaiveDate,
    pub container_count: u32,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
    pub logged_by: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MonthlyWaste {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub container_count: u64,
    pub total_weight_kg: f64,
    pub total_volume_m3: f64,
}
