//! Built-in list of well-known services and their human-readable labels.

/// `(name, label, description)` for each service offered by the selector.
pub const KNOWN_SERVICES: &[(&str, &str, &str)] = &[
    ("openai", "OpenAI", "OpenAI API"),
    ("anthropic", "Anthropic", "Anthropic Claude API"),
    ("news_api", "News API", "News API"),
    ("weather_api", "Weather API", "OpenWeatherMap API"),
    ("feishu", "Feishu", "Feishu webhook"),
];

/// Label shown for `service`; unknown services are shown by their raw name.
pub fn display_name(service: &str) -> &str {
    KNOWN_SERVICES
        .iter()
        .find(|(name, _, _)| *name == service)
        .map(|(_, label, _)| *label)
        .unwrap_or(service)
}
