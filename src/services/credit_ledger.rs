//! Customer debt settlement and charges.
//!
//! Every balance change goes through [`CreditLedgerRepository::post`], which
//! updates the debt and appends the ledger entry in one transaction.

use crate::{
    entities::credit_transaction::{self, TransactionKind},
    errors::ServiceError,
    repositories::{CreditLedgerRepository, LedgerPosting},
};
use metrics::counter;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_PAYMENT_METHOD: &str = "CASH";
const MAX_PAYMENT_METHOD_LEN: usize = 32;
const MONEY_SCALE: u32 = 2;

/// Parses a JSON amount (number or numeric string) into a strictly positive cent value.
pub fn parse_amount(raw: Option<&Value>) -> Result<Decimal, ServiceError> {
    let parsed = match raw {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .ok()
        }
        None | Some(Value::Null) => {
            return Err(ServiceError::InvalidInput("amount is required".to_string()))
        }
        Some(_) => None,
    };

    match parsed {
        Some(amount) => ensure_money_amount(amount),
        None => Err(ServiceError::InvalidInput(
            "amount must be a number".to_string(),
        )),
    }
}

/// Checks that `amount` is a positive value in whole cents.
///
/// Debt and ledger columns hold two decimal places; a sub-cent amount would
/// round differently in each and break the balance/ledger equality.
pub fn ensure_money_amount(amount: Decimal) -> Result<Decimal, ServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "amount must be greater than zero".to_string(),
        ));
    }
    let amount = amount.normalize();
    if amount.scale() > MONEY_SCALE {
        return Err(ServiceError::InvalidInput(format!(
            "amount must have at most {} decimal places",
            MONEY_SCALE
        )));
    }
    Ok(amount)
}

/// Parses a customer id given as a JSON string.
pub fn parse_customer_id(raw: Option<&Value>) -> Result<Uuid, ServiceError> {
    match raw {
        Some(Value::String(s)) if !s.trim().is_empty() => Uuid::parse_str(s.trim())
            .map_err(|_| ServiceError::InvalidInput("customerId must be a valid UUID".to_string())),
        _ => Err(ServiceError::InvalidInput(
            "customerId is required".to_string(),
        )),
    }
}

/// Upper-cased payment method, `CASH` when absent or blank.
pub fn normalize_payment_method(method: Option<&str>) -> Result<String, ServiceError> {
    let method = method.map(str::trim).filter(|m| !m.is_empty());
    match method {
        None => Ok(DEFAULT_PAYMENT_METHOD.to_string()),
        Some(m) if m.len() > MAX_PAYMENT_METHOD_LEN => Err(ServiceError::InvalidInput(format!(
            "paymentMethod must be at most {} characters",
            MAX_PAYMENT_METHOD_LEN
        ))),
        Some(m) => Ok(m.to_ascii_uppercase()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub new_debt: Decimal,
}

pub struct CreditLedgerService {
    repository: Arc<dyn CreditLedgerRepository>,
    allow_overpayment: bool,
}

impl CreditLedgerService {
    pub fn new(repository: Arc<dyn CreditLedgerRepository>, allow_overpayment: bool) -> Self {
        Self {
            repository,
            allow_overpayment,
        }
    }

    /// Reduces a customer's debt by `amount` and records a `PAYMENT` entry of `-amount`.
    ///
    /// Unless overpayment is enabled, a payment larger than the outstanding
    /// debt is rejected and nothing is written.
    #[instrument(skip(self))]
    pub async fn settle_debt_payment(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
        amount: Decimal,
        payment_method: Option<&str>,
    ) -> Result<Settlement, ServiceError> {
        let amount = ensure_money_amount(amount)?;
        let method = normalize_payment_method(payment_method)?;

        let outcome = self
            .repository
            .post(LedgerPosting {
                store_id,
                customer_id,
                delta: -amount,
                kind: TransactionKind::Payment,
                description: format!("Debt payment via {}", method),
                forbid_negative_debt: !self.allow_overpayment,
            })
            .await?;

        counter!("pos_ledger.postings", 1, "kind" => "payment");
        info!(
            %customer_id,
            %amount,
            new_debt = %outcome.new_debt,
            transaction_id = %outcome.transaction.id,
            "Debt payment settled"
        );

        Ok(Settlement {
            new_debt: outcome.new_debt,
        })
    }

    /// Adds `amount` to a customer's debt with a `CHARGE` entry.
    /// The credit limit is informational and does not block charges.
    #[instrument(skip(self))]
    pub async fn record_charge(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
        amount: Decimal,
        description: Option<String>,
    ) -> Result<credit_transaction::Model, ServiceError> {
        let amount = ensure_money_amount(amount)?;

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "Credit sale".to_string());

        let outcome = self
            .repository
            .post(LedgerPosting {
                store_id,
                customer_id,
                delta: amount,
                kind: TransactionKind::Charge,
                description,
                forbid_negative_debt: false,
            })
            .await?;

        counter!("pos_ledger.postings", 1, "kind" => "charge");
        info!(%customer_id, %amount, new_debt = %outcome.new_debt, "Charge recorded");

        Ok(outcome.transaction)
    }

    /// Ledger history of a customer, newest first
    #[instrument(skip(self))]
    pub async fn list_transactions(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Vec<credit_transaction::Model>, ServiceError> {
        self.repository.transactions(store_id, customer_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::PostingOutcome;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::sync::Mutex;

    #[rstest]
    #[case(json!(150), dec!(150))]
    #[case(json!(150.25), dec!(150.25))]
    #[case(json!("99.90"), dec!(99.90))]
    #[case(json!(" 12 "), dec!(12))]
    #[case(json!("7.500"), dec!(7.5))]
    fn parses_positive_amounts(#[case] raw: Value, #[case] expected: Decimal) {
        assert_eq!(parse_amount(Some(&raw)).unwrap(), expected);
    }

    #[rstest]
    #[case(json!(0))]
    #[case(json!("0.00"))]
    #[case(json!(-5))]
    #[case(json!("abc"))]
    #[case(json!(""))]
    #[case(json!(true))]
    #[case(json!(null))]
    #[case(json!({"value": 1}))]
    #[case(json!("0.004"))]
    #[case(json!("0.005"))]
    #[case(json!(12.345))]
    fn rejects_unusable_amounts(#[case] raw: Value) {
        assert_matches!(parse_amount(Some(&raw)), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn missing_amount_is_invalid() {
        assert_matches!(parse_amount(None), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn customer_id_must_be_a_uuid() {
        assert_matches!(
            parse_customer_id(Some(&json!("not-a-uuid"))),
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(parse_customer_id(None), Err(ServiceError::InvalidInput(_)));
        assert_matches!(
            parse_customer_id(Some(&json!(42))),
            Err(ServiceError::InvalidInput(_))
        );

        let id = Uuid::new_v4();
        assert_eq!(
            parse_customer_id(Some(&json!(id.to_string()))).unwrap(),
            id
        );
    }

    #[rstest]
    #[case(None, "CASH")]
    #[case(Some("  "), "CASH")]
    #[case(Some("card"), "CARD")]
    #[case(Some("Mobile_Money"), "MOBILE_MONEY")]
    fn payment_method_defaults_and_upper_cases(
        #[case] input: Option<&str>,
        #[case] expected: &str,
    ) {
        assert_eq!(normalize_payment_method(input).unwrap(), expected);
    }

    #[derive(Default)]
    struct CapturingLedger {
        postings: Mutex<Vec<LedgerPosting>>,
    }

    #[async_trait]
    impl CreditLedgerRepository for CapturingLedger {
        async fn post(&self, posting: LedgerPosting) -> Result<PostingOutcome, ServiceError> {
            let transaction = credit_transaction::Model {
                id: Uuid::new_v4(),
                customer_id: posting.customer_id,
                amount: posting.delta,
                kind: posting.kind,
                description: posting.description.clone(),
                created_at: chrono::Utc::now(),
            };
            let new_debt = dec!(500) + posting.delta;
            self.postings.lock().unwrap().push(posting);
            Ok(PostingOutcome {
                new_debt,
                transaction,
            })
        }

        async fn transactions(
            &self,
            _store_id: Uuid,
            _customer_id: Uuid,
        ) -> Result<Vec<credit_transaction::Model>, ServiceError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn payment_posts_negative_amount_with_method_in_description() {
        let ledger = Arc::new(CapturingLedger::default());
        let service = CreditLedgerService::new(ledger.clone(), false);

        let settlement = service
            .settle_debt_payment(Uuid::new_v4(), Uuid::new_v4(), dec!(150), Some("card"))
            .await
            .unwrap();

        assert_eq!(settlement.new_debt, dec!(350));
        let postings = ledger.postings.lock().unwrap();
        assert_eq!(postings.len(), 1);
        assert_eq!(postings[0].delta, dec!(-150));
        assert_eq!(postings[0].kind, TransactionKind::Payment);
        assert_eq!(postings[0].description, "Debt payment via CARD");
        assert!(postings[0].forbid_negative_debt);
    }

    #[tokio::test]
    async fn overpayment_flag_lifts_the_floor() {
        let ledger = Arc::new(CapturingLedger::default());
        let service = CreditLedgerService::new(ledger.clone(), true);

        service
            .settle_debt_payment(Uuid::new_v4(), Uuid::new_v4(), dec!(10), None)
            .await
            .unwrap();

        let postings = ledger.postings.lock().unwrap();
        assert!(!postings[0].forbid_negative_debt);
        assert_eq!(postings[0].description, "Debt payment via CASH");
    }

    #[tokio::test]
    async fn non_positive_amounts_never_reach_the_repository() {
        let ledger = Arc::new(CapturingLedger::default());
        let service = CreditLedgerService::new(ledger.clone(), false);

        let err = service
            .settle_debt_payment(Uuid::new_v4(), Uuid::new_v4(), Decimal::ZERO, None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));

        let err = service
            .record_charge(Uuid::new_v4(), Uuid::new_v4(), dec!(-1), None)
            .await
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidInput(_));

        assert!(ledger.postings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sub_cent_amounts_never_reach_the_repository() {
        let ledger = Arc::new(CapturingLedger::default());
        let service = CreditLedgerService::new(ledger.clone(), false);

        for amount in [dec!(0.004), dec!(0.005), dec!(10.001)] {
            let err = service
                .settle_debt_payment(Uuid::new_v4(), Uuid::new_v4(), amount, None)
                .await
                .unwrap_err();
            assert_matches!(err, ServiceError::InvalidInput(_));

            let err = service
                .record_charge(Uuid::new_v4(), Uuid::new_v4(), amount, None)
                .await
                .unwrap_err();
            assert_matches!(err, ServiceError::InvalidInput(_));
        }

        assert!(ledger.postings.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn charge_posts_positive_amount() {
        let ledger = Arc::new(CapturingLedger::default());
        let service = CreditLedgerService::new(ledger.clone(), false);

        let entry = service
            .record_charge(Uuid::new_v4(), Uuid::new_v4(), dec!(42.50), None)
            .await
            .unwrap();

        assert_eq!(entry.amount, dec!(42.50));
        assert_eq!(entry.kind, TransactionKind::Charge);
        assert_eq!(entry.description, "Credit sale");
    }
}
