use thiserror::Error;

use crate::services::keys_api::Credential;

/// Reasons a save is refused before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("enter a name for the custom service")]
    MissingCustomName,

    #[error("both service and key are required")]
    Incomplete,
}

/// What the service selector is set to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ServiceSelection {
    #[default]
    None,
    Known(String),
    Custom,
}

/// The add-key form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyForm {
    pub selection: ServiceSelection,
    pub custom_name: String,
    pub key: String,
}

impl KeyForm {
    pub fn known(service: &str, key: &str) -> Self {
        Self {
            selection: ServiceSelection::Known(service.to_string()),
            custom_name: String::new(),
            key: key.to_string(),
        }
    }

    pub fn custom(name: &str, key: &str) -> Self {
        Self {
            selection: ServiceSelection::Custom,
            custom_name: name.to_string(),
            key: key.to_string(),
        }
    }

    /// Resolves the selector and inputs into the pair to send.
    pub fn resolve(&self) -> Result<Credential, FormError> {
        let service = match &self.selection {
            ServiceSelection::Custom => {
                let name = self.custom_name.trim();
                if name.is_empty() {
                    return Err(FormError::MissingCustomName);
                }
                name.to_string()
            }
            ServiceSelection::Known(name) => name.clone(),
            ServiceSelection::None => String::new(),
        };

        if service.is_empty() || self.key.is_empty() {
            return Err(FormError::Incomplete);
        }

        Ok(Credential {
            service,
            key: self.key.clone(),
        })
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_service_resolves() {
        let cred = KeyForm::known("openai", "sk-1").resolve().unwrap();
        assert_eq!(cred.service, "openai");
        assert_eq!(cred.key, "sk-1");
    }

    #[test]
    fn test_custom_name_is_trimmed() {
        let cred = KeyForm::custom("  my_api ", "k").resolve().unwrap();
        assert_eq!(cred.service, "my_api");
    }

    #[test]
    fn test_blank_custom_name_rejected() {
        assert_eq!(
            KeyForm::custom("   ", "k").resolve(),
            Err(FormError::MissingCustomName)
        );
    }

    #[test]
    fn test_missing_key_or_service_rejected() {
        assert_eq!(KeyForm::known("openai", "").resolve(), Err(FormError::Incomplete));
        assert_eq!(KeyForm::known("", "k").resolve(), Err(FormError::Incomplete));
        assert_eq!(KeyForm::default().resolve(), Err(FormError::Incomplete));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut form = KeyForm::custom("x", "y");
        form.clear();
        assert_eq!(form, KeyForm::default());
    }
}
