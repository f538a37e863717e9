use std::fmt;

use crates::payments::mpesa_client::{PRODUCTION_BASE_URL, SANDBOX_BASE_URL};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Stage {
    #[default]
    Local,
    Development,
    Production,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Local => "Local",
            Stage::Development => "Development",
            Stage::Production => "Production",
        };

        write!(f, "{}", stage)
    }
}

impl TryFrom<&String> for Stage {
    type Error = anyhow::Error;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Stage::Local),
            "development" => Ok(Stage::Development),
            "production" => Ok(Stage::Production),
            other => Err(anyhow::anyhow!("Invalid stage: {}", other)),
        }
    }
}

impl Stage {
    /// Daraja host used for OAuth and STK push. Only production talks to the live API.
    pub fn mpesa_base_url(&self) -> &'static str {
        match self {
            Stage::Production => PRODUCTION_BASE_URL,
            Stage::Local | Stage::Development => SANDBOX_BASE_URL,
        }
    }
}
