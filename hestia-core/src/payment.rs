use serde::{Deserialize, Serialize};

/// How the guest settles the booking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    MobileWallet,
    CardGateway,
}

impl PaymentMethod {
    /// The external gateway this method redirects through, if any.
    pub fn gateway_provider(&self) -> Option<GatewayProvider> {
        match self {
            PaymentMethod::MobileWallet => Some(GatewayProvider::Wallet),
            PaymentMethod::CardGateway => Some(GatewayProvider::Card),
            PaymentMethod::Cash | PaymentMethod::BankTransfer => None,
        }
    }
}

/// External payment gateway providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayProvider {
    Wallet,
    Card,
}

impl GatewayProvider {
    /// URL path segment used by the gateway creation endpoint.
    pub fn slug(&self) -> &'static str {
        match self {
            GatewayProvider::Wallet => "wallet",
            GatewayProvider::Card => "card",
        }
    }
}

/// Payment state as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Canceled,
    Expired,
}

impl PaymentStatus {
    /// No further transitions occur once a status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Bank-transfer instructions shown to the guest while the deadline runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransferInstructions {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub transfer_note: String,
}
