//! Row types for the backend tables.
//!
//! Server-assigned columns (`id`, `created_at`, ...) are optional and left
//! out of request bodies when unset. Ids are kept as raw JSON since tables
//! differ in id type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub user_id: String,
    pub service: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub user_id: String,
    pub agent: String,
    pub action: String,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: String,
    pub preferences: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// The `preferences` column alone, as returned by a preferences lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferencesRow {
    pub preferences: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A reading as supplied by a weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub temperature: f64,
    pub humidity: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub location: String,
    #[serde(flatten)]
    pub reading: WeatherReading,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A measurement to record, e.g. `{type: "heart_rate", value: 62, unit: "bpm"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMeasurement {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub user_id: String,
    #[serde(flatten)]
    pub measurement: HealthMeasurement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

pub const TASK_PENDING: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub user_id: String,
    #[serde(flatten)]
    pub task: NewTask,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReflection {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub user_id: String,
    #[serde(flatten)]
    pub reflection: NewReflection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_server_columns_are_omitted() {
        let row = ApiKeyRecord {
            id: None,
            user_id: "u1".into(),
            service: "openai".into(),
            key: "sk-1".into(),
            created_at: None,
            updated_at: None,
        };
        assert_eq!(
            serde_json::to_value(&row).unwrap(),
            json!({"user_id": "u1", "service": "openai", "key": "sk-1"})
        );
    }

    #[test]
    fn test_health_record_flattens_type_column() {
        let row: HealthRecord = serde_json::from_value(json!({
            "id": 7,
            "user_id": "u1",
            "type": "weight",
            "value": 70.5,
            "unit": "kg",
            "notes": null,
            "recorded_at": "2025-01-02T03:04:05Z"
        }))
        .unwrap();
        assert_eq!(row.measurement.kind, "weight");
        assert_eq!(row.id, Some(json!(7)));
        assert!(row.recorded_at.is_some());

        let back = serde_json::to_value(&row).unwrap();
        assert_eq!(back["type"], "weight");
    }

    #[test]
    fn test_task_row_reads_due_date() {
        let task: Task = serde_json::from_value(json!({
            "id": "b3c1",
            "user_id": "u1",
            "title": "Rotate keys",
            "description": null,
            "priority": "high",
            "due_date": "2025-03-01",
            "status": "pending",
            "created_at": "2025-01-02T03:04:05+00:00"
        }))
        .unwrap();
        assert_eq!(task.task.due_date, NaiveDate::from_ymd_opt(2025, 3, 1));
        assert_eq!(task.status, TASK_PENDING);
    }
}
