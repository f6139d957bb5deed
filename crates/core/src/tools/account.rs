//! Account tools: balance, details, transactions, and card management.
//!
//! All of these are auth-gated; the registry refuses them before any network
//! traffic when the session carries no token. Each handler turns the backend
//! payload into conversational text the model can read aloud.

use super::{ToolError, ToolHandler, ToolOutput};
use crate::backend::{format_sgd, AccountApi, BackendError};
use crate::session::SessionContext;
use async_trait::async_trait;
use std::sync::Arc;

/// Hard cap on the `limit` argument of `get_recent_transactions`.
const MAX_TRANSACTIONS: u64 = 20;
const DEFAULT_TRANSACTIONS: u64 = 5;

/// Products every customer of the mock backend holds. Anything else is a
/// cross-sell opportunity for the general assistant.
const OWNED_PRODUCTS: &[&str] = &["account", "savings account", "card", "credit card"];

fn map_backend_error(e: BackendError) -> ToolError {
    match e {
        BackendError::Unauthenticated => ToolError::Unauthenticated,
        BackendError::Timeout => ToolError::BackendTimeout,
        BackendError::Http(status) => ToolError::Backend(format!("HTTP {status}")),
        BackendError::Unreachable(reason) => ToolError::Backend(reason),
        BackendError::Malformed(reason) => ToolError::Backend(reason),
    }
}

fn token(session: &SessionContext) -> Result<&str, ToolError> {
    session
        .auth_token
        .as_deref()
        .ok_or(ToolError::Unauthenticated)
}

pub struct GetAccountBalance {
    api: Arc<AccountApi>,
}

impl GetAccountBalance {
    pub fn new(api: Arc<AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ToolHandler for GetAccountBalance {
    fn name(&self) -> &'static str {
        "get_account_balance"
    }

    fn describe(&self) -> &'static str {
        "current main, savings, and total balances"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        session: &SessionContext,
        _args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let data = self
            .api
            .balance(token(session)?)
            .await
            .map_err(map_backend_error)?;
        let mut text = format!(
            "Here's the account balance:\n\n\
             Main account: SGD {}\n\
             Savings account: SGD {}",
            format_sgd(data.main_account.balance),
            format_sgd(data.savings_account.balance),
        );
        if let Some(rate) = data.savings_account.interest_rate {
            text.push_str(&format!(" ({rate}% p.a.)"));
        }
        text.push_str(&format!(
            "\nTotal balance: SGD {}\n\nIs there anything else you'd like to know about the accounts?",
            format_sgd(data.total_balance)
        ));
        Ok(ToolOutput::Text(text))
    }
}

pub struct GetAccountDetails {
    api: Arc<AccountApi>,
}

impl GetAccountDetails {
    pub fn new(api: Arc<AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ToolHandler for GetAccountDetails {
    fn name(&self) -> &'static str {
        "get_account_details"
    }

    fn describe(&self) -> &'static str {
        "holder, type, number, and status of the account"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        session: &SessionContext,
        _args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let data = self
            .api
            .details(token(session)?)
            .await
            .map_err(map_backend_error)?;
        let mut text = format!(
            "Here are the account details:\n\n\
             Name: {}\n\
             Email: {}\n\
             Account type: {}\n\
             Account number: {}\n\
             Status: {}\n\
             Opened: {}\n\n\
             Main account: SGD {}\n\
             Savings account: SGD {}",
            data.name,
            data.email,
            data.account_type,
            data.account_number,
            data.account_status,
            data.opened_date,
            format_sgd(data.main_account.balance),
            format_sgd(data.savings_account.balance),
        );
        if let Some(business) = &data.business_name {
            text.push_str(&format!("\nBusiness: {business}"));
        }
        text.push_str("\n\nHow else can I help today?");
        Ok(ToolOutput::Text(text))
    }
}

pub struct GetRecentTransactions {
    api: Arc<AccountApi>,
}

impl GetRecentTransactions {
    pub fn new(api: Arc<AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ToolHandler for GetRecentTransactions {
    fn name(&self) -> &'static str {
        "get_recent_transactions"
    }

    fn describe(&self) -> &'static str {
        "most recent account transactions"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        match args.get("limit") {
            None => Ok(()),
            Some(v) if v.is_null() || v.as_u64().is_some() => Ok(()),
            Some(v) => Err(ToolError::BadArguments(format!(
                "'limit' must be a positive integer, got {v}"
            ))),
        }
    }

    async fn execute(
        &self,
        session: &SessionContext,
        args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let limit = args
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_TRANSACTIONS)
            .clamp(1, MAX_TRANSACTIONS);
        let transactions = self
            .api
            .recent_transactions(token(session)?, limit as u32)
            .await
            .map_err(map_backend_error)?;

        if transactions.is_empty() {
            return Ok(ToolOutput::Text(
                "There are no recent transactions on the account.".to_string(),
            ));
        }

        let mut text = format!("Here are the last {} transactions:\n\n", transactions.len());
        for txn in &transactions {
            let direction = if txn.amount < 0.0 { "out" } else { "in" };
            text.push_str(&format!(
                "{} - {}: SGD {} ({direction})\n",
                txn.date,
                txn.description,
                format_sgd(txn.amount.abs()),
            ));
        }
        text.push_str("\nWould you like to see more transactions or check anything else?");
        Ok(ToolOutput::Text(text))
    }
}

pub struct GetCardDetails {
    api: Arc<AccountApi>,
}

impl GetCardDetails {
    pub fn new(api: Arc<AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ToolHandler for GetCardDetails {
    fn name(&self) -> &'static str {
        "get_card_details"
    }

    fn describe(&self) -> &'static str {
        "card status, limits, and expiry"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        session: &SessionContext,
        _args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let data = self
            .api
            .card_details(token(session)?)
            .await
            .map_err(map_backend_error)?;
        let text = format!(
            "Here are the card details:\n\n\
             Status: {}\n\
             Card: {}\n\
             Expires: {}\n\n\
             Credit limit: SGD {}\n\
             Available: SGD {}\n\
             Used: SGD {}\n\n\
             Need help with the card?",
            data.card_status,
            data.card_number,
            data.expiry_date,
            format_sgd(data.credit_limit),
            format_sgd(data.available_credit),
            format_sgd(data.used_credit),
        );
        Ok(ToolOutput::Text(text))
    }
}

pub struct FreezeCard {
    api: Arc<AccountApi>,
}

impl FreezeCard {
    pub fn new(api: Arc<AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ToolHandler for FreezeCard {
    fn name(&self) -> &'static str {
        "freeze_card"
    }

    fn describe(&self) -> &'static str {
        "temporarily blocks all card transactions"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        session: &SessionContext,
        _args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let state = self
            .api
            .freeze_card(token(session)?)
            .await
            .map_err(map_backend_error)?;
        Ok(ToolOutput::Text(format!(
            "The card is now {}. All new transactions are blocked. \
             Just ask whenever you want it unfrozen.",
            state.card_status
        )))
    }
}

pub struct UnfreezeCard {
    api: Arc<AccountApi>,
}

impl UnfreezeCard {
    pub fn new(api: Arc<AccountApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ToolHandler for UnfreezeCard {
    fn name(&self) -> &'static str {
        "unfreeze_card"
    }

    fn describe(&self) -> &'static str {
        "re-enables a frozen card"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        session: &SessionContext,
        _args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let state = self
            .api
            .unfreeze_card(token(session)?)
            .await
            .map_err(map_backend_error)?;
        Ok(ToolOutput::Text(format!(
            "The card is {} again and ready for transactions. \
             Is there anything else I can help with?",
            state.card_status
        )))
    }
}

/// Answers whether the customer already holds a given product type and
/// whether the conversation should move to the general assistant.
pub struct CheckProductOwnership;

#[async_trait]
impl ToolHandler for CheckProductOwnership {
    fn name(&self) -> &'static str {
        "check_product_ownership"
    }

    fn describe(&self) -> &'static str {
        "whether the customer already holds a product type"
    }

    fn requires_auth(&self) -> bool {
        true
    }

    fn validate(&self, args: &serde_json::Value) -> Result<(), ToolError> {
        super::require_str(args, "product_type").map(|_| ())
    }

    async fn execute(
        &self,
        _session: &SessionContext,
        args: &serde_json::Value,
    ) -> Result<ToolOutput, ToolError> {
        let product_type = super::require_str(args, "product_type")?
            .trim()
            .to_lowercase();
        let has_product = OWNED_PRODUCTS.contains(&product_type.as_str());
        let next_action = if has_product {
            "The customer already holds this product; answer their question about it."
        } else {
            "The customer does not hold this product; offer to transfer them to the general assistant for product information."
        };
        let payload = serde_json::json!({
            "has_product": has_product,
            "product_type": product_type,
            "should_handoff": !has_product,
            "recommended_next_action": next_action,
        });
        Ok(ToolOutput::Text(payload.to_string()))
    }
}
