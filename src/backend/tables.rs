use std::fmt;

/// Tables known to the backend. None of them are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    ApiKeys,
    AgentLogs,
    UserPreferences,
    NewsArticles,
    WeatherData,
    HealthRecords,
    Tasks,
    Reflections,
}

impl Table {
    pub const ALL: [Table; 9] = [
        Table::Users,
        Table::ApiKeys,
        Table::AgentLogs,
        Table::UserPreferences,
        Table::NewsArticles,
        Table::WeatherData,
        Table::HealthRecords,
        Table::Tasks,
        Table::Reflections,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::ApiKeys => "api_keys",
            Table::AgentLogs => "agent_logs",
            Table::UserPreferences => "user_preferences",
            Table::NewsArticles => "news_articles",
            Table::WeatherData => "weather_data",
            Table::HealthRecords => "health_records",
            Table::Tasks => "tasks",
            Table::Reflections => "reflections",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
