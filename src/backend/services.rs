//! One-call wrappers per table.
//!
//! Each method issues exactly one backend request and hands back whatever the
//! backend returned; `limit` arguments are passed straight through.

use chrono::Utc;
use serde_json::{Value, json};

use super::client::BackendClient;
use super::error::BackendResult;
use super::query::Order;
use super::records::{
    AgentLog, ApiKeyRecord, HealthMeasurement, HealthRecord, NewReflection, NewTask, NewsArticle,
    PreferencesRow, Reflection, TASK_PENDING, Task, UserPreferences, WeatherReading,
    WeatherSnapshot,
};
use super::tables::Table;
use crate::fetch::HttpClient;

pub use super::auth::UserService;

pub const DEFAULT_AGENT_LOG_LIMIT: usize = 50;
pub const DEFAULT_NEWS_LIMIT: usize = 20;
pub const DEFAULT_HEALTH_LIMIT: usize = 100;
pub const DEFAULT_REFLECTION_LIMIT: usize = 50;

pub struct ApiKeyService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> ApiKeyService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    /// Creates or replaces the user's key for `service`.
    pub async fn save_api_key(
        &self,
        user_id: &str,
        service: &str,
        key: &str,
    ) -> BackendResult<Vec<ApiKeyRecord>> {
        let row = ApiKeyRecord {
            id: None,
            user_id: user_id.to_string(),
            service: service.to_string(),
            key: key.to_string(),
            created_at: None,
            updated_at: Some(Utc::now()),
        };
        self.client
            .from(Table::ApiKeys)
            .upsert(&row, "user_id,service")
            .await
    }

    pub async fn get_user_api_keys(&self, user_id: &str) -> BackendResult<Vec<ApiKeyRecord>> {
        self.client
            .from(Table::ApiKeys)
            .eq("user_id", user_id)
            .select("*")
            .await
    }

    pub async fn delete_api_key(&self, user_id: &str, service: &str) -> BackendResult<()> {
        self.client
            .from(Table::ApiKeys)
            .eq("user_id", user_id)
            .eq("service", service)
            .delete()
            .await
    }
}

pub struct AgentLogService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> AgentLogService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    pub async fn log_agent_activity(
        &self,
        user_id: &str,
        agent: &str,
        action: &str,
        details: Value,
    ) -> BackendResult<Vec<AgentLog>> {
        let row = AgentLog {
            id: None,
            user_id: user_id.to_string(),
            agent: agent.to_string(),
            action: action.to_string(),
            details,
            created_at: Some(Utc::now()),
        };
        self.client.from(Table::AgentLogs).insert(&row).await
    }

    /// Newest first.
    pub async fn get_user_agent_logs(
        &self,
        user_id: &str,
        limit: usize,
    ) -> BackendResult<Vec<AgentLog>> {
        self.client
            .from(Table::AgentLogs)
            .eq("user_id", user_id)
            .order("created_at", Order::Descending)
            .limit(limit)
            .select("*")
            .await
    }
}

pub struct PreferenceService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> PreferenceService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    pub async fn save_user_preferences(
        &self,
        user_id: &str,
        preferences: Value,
    ) -> BackendResult<Vec<UserPreferences>> {
        let row = UserPreferences {
            user_id: user_id.to_string(),
            preferences,
            updated_at: Some(Utc::now()),
        };
        self.client
            .from(Table::UserPreferences)
            .upsert(&row, "user_id")
            .await
    }

    pub async fn get_user_preferences(&self, user_id: &str) -> BackendResult<PreferencesRow> {
        self.client
            .from(Table::UserPreferences)
            .eq("user_id", user_id)
            .single("preferences")
            .await
    }
}

pub struct NewsService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> NewsService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    pub async fn save_news_article(&self, article: &NewsArticle) -> BackendResult<Vec<NewsArticle>> {
        let row = NewsArticle {
            id: None,
            created_at: Some(Utc::now()),
            ..article.clone()
        };
        self.client.from(Table::NewsArticles).insert(&row).await
    }

    /// Most recently published first, optionally restricted to `category`.
    pub async fn get_news_articles(
        &self,
        category: Option<&str>,
        limit: usize,
    ) -> BackendResult<Vec<NewsArticle>> {
        let mut query = self
            .client
            .from(Table::NewsArticles)
            .order("published_at", Order::Descending)
            .limit(limit);
        if let Some(category) = category {
            query = query.eq("category", category);
        }
        query.select("*").await
    }
}

pub struct WeatherService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> WeatherService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    pub async fn save_weather_data(
        &self,
        location: &str,
        reading: &WeatherReading,
    ) -> BackendResult<Vec<WeatherSnapshot>> {
        let row = WeatherSnapshot {
            id: None,
            location: location.to_string(),
            reading: reading.clone(),
            created_at: Some(Utc::now()),
        };
        self.client.from(Table::WeatherData).insert(&row).await
    }

    pub async fn get_latest_weather_data(&self, location: &str) -> BackendResult<WeatherSnapshot> {
        self.client
            .from(Table::WeatherData)
            .eq("location", location)
            .order("created_at", Order::Descending)
            .limit(1)
            .single("*")
            .await
    }
}

pub struct HealthService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> HealthService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    pub async fn save_health_record(
        &self,
        user_id: &str,
        measurement: &HealthMeasurement,
    ) -> BackendResult<Vec<HealthRecord>> {
        let row = HealthRecord {
            id: None,
            user_id: user_id.to_string(),
            measurement: measurement.clone(),
            recorded_at: Some(Utc::now()),
        };
        self.client.from(Table::HealthRecords).insert(&row).await
    }

    pub async fn get_user_health_records(
        &self,
        user_id: &str,
        kind: Option<&str>,
        limit: usize,
    ) -> BackendResult<Vec<HealthRecord>> {
        let mut query = self
            .client
            .from(Table::HealthRecords)
            .eq("user_id", user_id)
            .order("recorded_at", Order::Descending)
            .limit(limit);
        if let Some(kind) = kind {
            query = query.eq("type", kind);
        }
        query.select("*").await
    }
}

pub struct TaskService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> TaskService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    /// New tasks always start as `pending`.
    pub async fn create_task(&self, user_id: &str, task: &NewTask) -> BackendResult<Vec<Task>> {
        let row = Task {
            id: None,
            user_id: user_id.to_string(),
            task: task.clone(),
            status: TASK_PENDING.to_string(),
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.client.from(Table::Tasks).insert(&row).await
    }

    pub async fn get_user_tasks(
        &self,
        user_id: &str,
        status: Option<&str>,
    ) -> BackendResult<Vec<Task>> {
        let mut query = self
            .client
            .from(Table::Tasks)
            .eq("user_id", user_id)
            .order("created_at", Order::Descending);
        if let Some(status) = status {
            query = query.eq("status", status);
        }
        query.select("*").await
    }

    pub async fn update_task_status(
        &self,
        task_id: &str,
        status: &str,
    ) -> BackendResult<Vec<Task>> {
        let patch = json!({ "status": status, "updated_at": Utc::now() });
        self.client
            .from(Table::Tasks)
            .eq("id", task_id)
            .update(&patch)
            .await
    }
}

pub struct ReflectionService<'a, C> {
    client: &'a BackendClient<C>,
}

impl<'a, C: HttpClient> ReflectionService<'a, C> {
    pub(crate) fn new(client: &'a BackendClient<C>) -> Self {
        Self { client }
    }

    pub async fn save_reflection(
        &self,
        user_id: &str,
        reflection: &NewReflection,
    ) -> BackendResult<Vec<Reflection>> {
        let row = Reflection {
            id: None,
            user_id: user_id.to_string(),
            reflection: reflection.clone(),
            created_at: Some(Utc::now()),
        };
        self.client.from(Table::Reflections).insert(&row).await
    }

    pub async fn get_user_reflections(
        &self,
        user_id: &str,
        limit: usize,
    ) -> BackendResult<Vec<Reflection>> {
        self.client
            .from(Table::Reflections)
            .eq("user_id", user_id)
            .order("created_at", Order::Descending)
            .limit(limit)
            .select("*")
            .await
    }
}
