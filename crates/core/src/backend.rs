//! HTTP client for the account backend API.
//!
//! Every request carries the caller's bearer token; the client itself holds
//! no authentication state. Responses arrive in a `{success, data}` envelope.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Backend calls must complete within this window.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// A failed backend call, classified for the tool layer.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend rejected the session token")]
    Unauthenticated,
    #[error("backend request timed out")]
    Timeout,
    #[error("backend returned HTTP {0}")]
    Http(u16),
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend response malformed: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[allow(dead_code)]
    success: bool,
    data: T,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoneyBucket {
    pub balance: f64,
    pub currency: String,
    #[serde(default)]
    pub interest_rate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceData {
    pub account_number: String,
    pub main_account: MoneyBucket,
    pub savings_account: MoneyBucket,
    pub total_balance: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDetails {
    pub name: String,
    pub email: String,
    pub account_type: String,
    pub account_number: String,
    pub account_status: String,
    pub opened_date: String,
    pub main_account: MoneyBucket,
    pub savings_account: MoneyBucket,
    #[serde(default)]
    pub business_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub date: String,
    pub description: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
struct TransactionsData {
    transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub card_number: String,
    pub card_status: String,
    pub credit_limit: f64,
    pub available_credit: f64,
    pub used_credit: f64,
    pub expiry_date: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardState {
    pub card_status: String,
}

/// Client for the account backend.
#[derive(Clone)]
pub struct AccountApi {
    http: reqwest::Client,
    base_url: String,
}

impl AccountApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    /// Client with a custom timeout. Tests use short windows.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        token: &str,
        path: &str,
    ) -> Result<T, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .request(method, &url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else {
                    BackendError::Unreachable(e.to_string())
                }
            })?;

        match response.status().as_u16() {
            200 => {
                let envelope: Envelope<T> = response
                    .json()
                    .await
                    .map_err(|e| BackendError::Malformed(e.to_string()))?;
                Ok(envelope.data)
            }
            401 => Err(BackendError::Unauthenticated),
            status => Err(BackendError::Http(status)),
        }
    }

    pub async fn balance(&self, token: &str) -> Result<BalanceData, BackendError> {
        self.request(reqwest::Method::GET, token, "/api/account/balance")
            .await
    }

    pub async fn details(&self, token: &str) -> Result<AccountDetails, BackendError> {
        self.request(reqwest::Method::GET, token, "/api/account/details")
            .await
    }

    pub async fn recent_transactions(
        &self,
        token: &str,
        limit: u32,
    ) -> Result<Vec<Transaction>, BackendError> {
        let data: TransactionsData = self
            .request(
                reqwest::Method::GET,
                token,
                &format!("/api/transactions/recent?limit={limit}"),
            )
            .await?;
        Ok(data.transactions)
    }

    pub async fn card_details(&self, token: &str) -> Result<CardDetails, BackendError> {
        self.request(reqwest::Method::GET, token, "/api/card/details")
            .await
    }

    pub async fn freeze_card(&self, token: &str) -> Result<CardState, BackendError> {
        self.request(reqwest::Method::POST, token, "/api/card/freeze")
            .await
    }

    pub async fn unfreeze_card(&self, token: &str) -> Result<CardState, BackendError> {
        self.request(reqwest::Method::POST, token, "/api/card/unfreeze")
            .await
    }
}

/// Formats an amount as SGD with thousands separators and two decimals,
/// e.g. `15234.5` becomes `"15,234.50"`.
pub fn format_sgd(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped}.{frac:02}")
}
