//! Waiter persona — the configurable parts of the system prompt.
//!
//! Defaults describe the "La Cachamita de Oro" waiter. A YAML file may
//! override any field:
//!
//! ```yaml
//! restaurant: La Cachamita de Oro
//! images: on_request
//! purchase_link: https://wa.me/580000000000
//! schedule:
//!   mode: hours
//!   breakfast: { from: "06:00:00", until: "11:00:00" }
//!   lunch: { from: "11:30:00", until: "16:00:00" }
//! ```

use std::path::Path;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persona loading errors.
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Persona file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persona parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid persona: {0}")]
    Validation(String),
}

/// When the model may include dish photos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePolicy {
    Never,
    #[default]
    OnRequest,
    Always,
}

/// A daily serving window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    pub from: NaiveTime,
    pub until: NaiveTime,
}

impl ServiceWindow {
    pub fn contains(&self, t: NaiveTime) -> bool {
        self.from <= t && t < self.until
    }
}

/// Whether menu sections are gated by time of day.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Breakfast and lunch items are offered at any hour.
    #[default]
    AllDay,
    /// Sections are served only inside their windows.
    Hours {
        breakfast: ServiceWindow,
        lunch: ServiceWindow,
    },
}

/// Persona fields merged into the system prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Persona {
    pub restaurant: String,
    pub location: String,
    pub role: String,
    pub tone: String,
    pub catchphrases: Vec<String>,
    pub goal: String,
    pub greeting: String,
    pub images: ImagePolicy,
    /// Photos live at `<image_base_url>/<id>.png`.
    pub image_base_url: String,
    /// Messaging deep link offered to users who try to place an order.
    pub purchase_link: Option<String>,
    pub schedule: SchedulePolicy,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            restaurant: "La Cachamita de Oro".to_string(),
            location: "Barinas, Venezuela".to_string(),
            role: "mesero virtual".to_string(),
            tone: "Muy amable, llanero".to_string(),
            catchphrases: vec![
                "Epa".to_string(),
                "Camarita".to_string(),
                "A la orden".to_string(),
            ],
            goal: "Tu objetivo es vender.".to_string(),
            greeting: "¡Hola como estas ! 🤠 Bienvenido a La Cachamita de Oro. \
                       ¿Le provoco unos Desayunos o prefiere ver los Almuerzos?"
                .to_string(),
            images: ImagePolicy::OnRequest,
            image_base_url: "https://cachamachat.estilosgrado33.workers.dev/fotos".to_string(),
            purchase_link: None,
            schedule: SchedulePolicy::AllDay,
        }
    }
}

impl Persona {
    /// Load a persona from YAML; missing fields keep their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, PersonaError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, PersonaError> {
        let persona: Persona = serde_yaml::from_str(raw)?;
        persona.validate()?;
        Ok(persona)
    }

    /// Check that configured links are absolute URLs and windows are ordered.
    pub fn validate(&self) -> Result<(), PersonaError> {
        url::Url::parse(&self.image_base_url).map_err(|e| {
            PersonaError::Validation(format!("image_base_url '{}': {e}", self.image_base_url))
        })?;
        if let Some(link) = &self.purchase_link {
            url::Url::parse(link)
                .map_err(|e| PersonaError::Validation(format!("purchase_link '{link}': {e}")))?;
        }
        if let SchedulePolicy::Hours { breakfast, lunch } = &self.schedule {
            for (name, w) in [("breakfast", breakfast), ("lunch", lunch)] {
                if w.from >= w.until {
                    return Err(PersonaError::Validation(format!(
                        "{name} window must start before it ends"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Photo URL template shown to the model; `ID` stands for the item id.
    pub fn image_url_template(&self) -> String {
        self.image_url("ID")
    }

    /// Photo URL for a menu item id.
    pub fn image_url(&self, id: &str) -> String {
        format!("{}/{id}.png", self.image_base_url.trim_end_matches('/'))
    }
}
