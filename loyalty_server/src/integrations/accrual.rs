//! Connects the accrual service client to the reconciliation engine.
use accrual_tools::{AccrualApi, AccrualApiError, AccrualLookup, AccrualStatus};
use log::*;
use loyalty_engine::{
    db_types::{AccrualResult, OrderNumber},
    AccrualOutcome,
    AccrualSource,
};

/// An [`AccrualSource`] backed by the HTTP accrual service.
#[derive(Debug, Clone)]
pub struct AccrualServiceSource {
    api: AccrualApi,
}

impl AccrualServiceSource {
    pub fn new(api: AccrualApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &AccrualApi {
        &self.api
    }
}

impl AccrualSource for AccrualServiceSource {
    async fn fetch_accrual(&self, number: &OrderNumber) -> AccrualOutcome {
        let result = self.api.fetch_order(number.as_str()).await;
        outcome_from_result(result)
    }
}

pub fn outcome_from_result(result: Result<AccrualLookup, AccrualApiError>) -> AccrualOutcome {
    match result {
        Ok(lookup) => outcome_from_lookup(lookup),
        Err(e) if e.is_fatal() => AccrualOutcome::FatalError(e.to_string()),
        Err(e) => AccrualOutcome::TransientError(e.to_string()),
    }
}

pub fn outcome_from_lookup(lookup: AccrualLookup) -> AccrualOutcome {
    match lookup {
        AccrualLookup::NotRegistered => AccrualOutcome::NotYetKnown,
        AccrualLookup::Throttled { retry_after } => AccrualOutcome::Throttled { retry_after },
        AccrualLookup::Registered(response) => match response.status {
            AccrualStatus::Registered | AccrualStatus::Processing => {
                AccrualOutcome::Resolved(AccrualResult::processing())
            },
            AccrualStatus::Invalid => AccrualOutcome::Resolved(AccrualResult::invalid()),
            AccrualStatus::Processed => match response.accrual_points() {
                Ok(points) => AccrualOutcome::Resolved(AccrualResult::processed(points)),
                Err(e) => {
                    warn!("🌐️ Order [{}] was processed with an unusable accrual. {e}", response.order);
                    AccrualOutcome::TransientError(e.to_string())
                },
            },
        },
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use accrual_tools::AccrualResponse;
    use loyalty_engine::db_types::{OrderStatusType, Points};

    use super::*;

    fn registered(status: AccrualStatus, accrual: Option<f64>) -> AccrualLookup {
        AccrualLookup::Registered(AccrualResponse { order: "79927398713".into(), status, accrual })
    }

    fn resolved(outcome: AccrualOutcome) -> AccrualResult {
        match outcome {
            AccrualOutcome::Resolved(result) => result,
            other => panic!("Expected a resolved outcome, got {other:?}"),
        }
    }

    #[test]
    fn processed_orders_carry_their_accrual() {
        let result = resolved(outcome_from_lookup(registered(AccrualStatus::Processed, Some(500.0))));
        assert_eq!(result.status(), OrderStatusType::Processed);
        assert_eq!(result.accrual(), Points::from(50_000));

        let result = resolved(outcome_from_lookup(registered(AccrualStatus::Processed, None)));
        assert_eq!(result.accrual(), Points::from(0));
    }

    #[test]
    fn registered_and_processing_both_mean_processing() {
        for status in [AccrualStatus::Registered, AccrualStatus::Processing] {
            let result = resolved(outcome_from_lookup(registered(status, None)));
            assert_eq!(result.status(), OrderStatusType::Processing);
            assert!(result.accrual().is_zero());
        }
    }

    #[test]
    fn invalid_orders_earn_nothing() {
        let result = resolved(outcome_from_lookup(registered(AccrualStatus::Invalid, Some(10.0))));
        assert_eq!(result.status(), OrderStatusType::Invalid);
        assert!(result.accrual().is_zero());
    }

    #[test]
    fn negative_accrual_is_retried() {
        let outcome = outcome_from_lookup(registered(AccrualStatus::Processed, Some(-1.0)));
        assert!(matches!(outcome, AccrualOutcome::TransientError(_)));
    }

    #[test]
    fn unknown_and_throttled_pass_through() {
        assert!(matches!(outcome_from_lookup(AccrualLookup::NotRegistered), AccrualOutcome::NotYetKnown));
        let retry_after = Duration::from_secs(60);
        let outcome = outcome_from_lookup(AccrualLookup::Throttled { retry_after });
        assert!(matches!(outcome, AccrualOutcome::Throttled { retry_after: d } if d == retry_after));
    }

    #[test]
    fn errors_are_classified() {
        let outcome = outcome_from_result(Err(AccrualApiError::InvalidRetryAfter("missing".into())));
        assert!(matches!(outcome, AccrualOutcome::FatalError(_)));
        let outcome = outcome_from_result(Err(AccrualApiError::QueryError { status: 500, message: "oops".into() }));
        assert!(matches!(outcome, AccrualOutcome::TransientError(_)));
        let outcome = outcome_from_result(Err(AccrualApiError::RestRequestError("refused".into())));
        assert!(matches!(outcome, AccrualOutcome::TransientError(_)));
        let outcome = outcome_from_result(Err(AccrualApiError::JsonError("truncated".into())));
        assert!(matches!(outcome, AccrualOutcome::TransientError(_)));
    }
}
