use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl RegistrationPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationPaymentStatus::Pending => "pending",
            RegistrationPaymentStatus::Paid => "paid",
            RegistrationPaymentStatus::Failed => "failed",
        }
    }
}

impl Display for RegistrationPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
