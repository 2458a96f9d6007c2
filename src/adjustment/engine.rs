use std::sync::Arc;

use futures_util::future::join_all;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use super::safety::SafetyLimits;
use super::types::{
    AdjustOptions, AdjustmentOrderResult, AdjustmentOutcome, AdjustmentRequest, AdjustmentStatus,
    BatchOutcome, FailureReason,
};
use crate::common::math::apply_rounding;
use crate::common::traits::{Brokerage, OrderGateway, PositionProvider, QuoteProvider};
use crate::common::types::{AccountId, Instruction, NumericalOrder, Position, Quote};
use crate::ordering::sort_by_instruction;

/// Order sizing for one holding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizing {
    pub current: Decimal,
    pub target: Decimal,
    /// Signed change, `target - current`
    pub delta: Decimal,
    pub instruction: Instruction,
    /// `|delta|`
    pub quantity: Decimal,
    /// `max(|current|, |target|)`
    pub total_position_size: Decimal,
}

/// Size the order that moves `current` shares by the fraction `adjustment`.
///
/// The target is `current * (1 + adjustment)`, truncated toward zero when
/// `round_down` is set. `None` when the target does not fit in a `Decimal`.
pub fn size_adjustment(current: Decimal, adjustment: Decimal, round_down: bool) -> Option<Sizing> {
    let factor = Decimal::ONE.checked_add(adjustment)?;
    let target = apply_rounding(current.checked_mul(factor)?, round_down);
    let delta = target.checked_sub(current)?;
    Some(Sizing {
        current,
        target,
        delta,
        instruction: Instruction::for_delta(current, delta),
        quantity: delta.abs(),
        total_position_size: current.abs().max(target.abs()),
    })
}

/// Where planning left one request
enum Plan {
    /// Terminal without touching the order gateway
    Resolved(AdjustmentOrderResult),
    /// Passed every check, waiting for submission
    Ready(AdjustmentOrderResult, NumericalOrder),
}

/// Turns fractional adjustment requests into orders
///
/// Reads positions and quotes, checks safety limits, and submits through
/// the order gateway unless previewing. One engine serves every account the
/// collaborators can reach.
#[derive(Clone)]
pub struct AdjustmentEngine {
    positions: Arc<dyn PositionProvider>,
    quotes: Arc<dyn QuoteProvider>,
    orders: Arc<dyn OrderGateway>,
}

impl AdjustmentEngine {
    pub fn new(
        positions: Arc<dyn PositionProvider>,
        quotes: Arc<dyn QuoteProvider>,
        orders: Arc<dyn OrderGateway>,
    ) -> Self {
        Self {
            positions,
            quotes,
            orders,
        }
    }

    /// Engine backed by a single brokerage connection
    pub fn from_brokerage<B: Brokerage + 'static>(brokerage: Arc<B>) -> Self {
        Self::new(brokerage.clone(), brokerage.clone(), brokerage)
    }

    /// Adjust one holding.
    ///
    /// Every failure is reported in the returned result; this never errors.
    #[instrument(skip(self, request, limits), fields(symbol = %request.symbol))]
    pub async fn adjust_one(
        &self,
        account: &AccountId,
        request: &AdjustmentRequest,
        options: AdjustOptions,
        limits: &SafetyLimits,
    ) -> AdjustmentOrderResult {
        match self.plan(account, request, options, limits).await {
            Plan::Resolved(result) => result,
            Plan::Ready(result, order) => self.submit(account, result, &order).await,
        }
    }

    /// Adjust many holdings.
    ///
    /// Planning runs concurrently. Submissions then go out one at a time,
    /// sells before buys, and results come back in input order. Dropping the
    /// returned future stops any submission not yet started.
    #[instrument(skip(self, requests, limits), fields(count = requests.len()))]
    pub async fn adjust_batch(
        &self,
        account: &AccountId,
        requests: &[AdjustmentRequest],
        options: AdjustOptions,
        limits: &SafetyLimits,
    ) -> BatchOutcome {
        let plans = join_all(
            requests
                .iter()
                .map(|request| self.plan(account, request, options, limits)),
        )
        .await;

        let mut results = Vec::with_capacity(plans.len());
        let mut ready = Vec::new();
        for (index, plan) in plans.into_iter().enumerate() {
            match plan {
                Plan::Resolved(result) => results.push(result),
                Plan::Ready(result, order) => {
                    results.push(result.clone());
                    ready.push((index, result, order));
                }
            }
        }

        for (index, result, order) in sort_by_instruction(ready, |(_, _, order)| order.instruction) {
            results[index] = self.submit(account, result, &order).await;
        }

        let outcome = BatchOutcome::from_results(results);
        info!(
            total = outcome.len(),
            succeeded = outcome.count(AdjustmentStatus::Succeeded),
            failed = outcome.count(AdjustmentStatus::Failed),
            ignored = outcome.count(AdjustmentStatus::Ignored),
            preview = outcome.count(AdjustmentStatus::Preview),
            "Adjustment batch finished"
        );
        outcome
    }

    async fn plan(
        &self,
        account: &AccountId,
        request: &AdjustmentRequest,
        options: AdjustOptions,
        limits: &SafetyLimits,
    ) -> Plan {
        let symbols = [request.symbol.clone()];
        let fallback = Instruction::for_delta(Decimal::ZERO, request.adjustment);

        let position = match self.positions.fetch_positions(account, Some(&symbols)).await {
            Ok(positions) => find_position(positions, &request.symbol),
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "Position lookup failed");
                return Plan::Resolved(failed(
                    request,
                    fallback,
                    Decimal::ZERO,
                    Decimal::ZERO,
                    FailureReason::PositionUnavailable,
                ));
            }
        };

        let Some(position) = position else {
            debug!(symbol = %request.symbol, "No existing position");
            return Plan::Resolved(failed(
                request,
                fallback,
                Decimal::ZERO,
                Decimal::ZERO,
                FailureReason::NoPosition,
            ));
        };

        let Some(sizing) = size_adjustment(position.quantity, request.adjustment, options.round_down)
        else {
            warn!(
                symbol = %request.symbol,
                current = %position.quantity,
                adjustment = %request.adjustment,
                "Adjustment target out of range"
            );
            return Plan::Resolved(failed(
                request,
                fallback,
                Decimal::ZERO,
                position.quantity.abs(),
                FailureReason::OutOfRange,
            ));
        };
        debug!(
            symbol = %request.symbol,
            current = %sizing.current,
            target = %sizing.target,
            delta = %sizing.delta,
            "Sized adjustment"
        );

        if sizing.delta.is_zero() {
            return Plan::Resolved(AdjustmentOrderResult {
                symbol: request.symbol.clone(),
                instruction: sizing.instruction,
                quantity: Decimal::ZERO,
                price: request.price,
                total_position_size: sizing.total_position_size,
                outcome: AdjustmentOutcome::Ignored,
            });
        }

        let quote = match self.quotes.fetch_quotes(account, &symbols).await {
            Ok(quotes) => find_quote(quotes, &request.symbol),
            Err(e) => {
                warn!(symbol = %request.symbol, error = %e, "Quote lookup failed");
                None
            }
        };

        let Some(quote) = quote else {
            return Plan::Resolved(failed(
                request,
                sizing.instruction,
                sizing.quantity,
                sizing.total_position_size,
                FailureReason::QuoteUnavailable,
            ));
        };

        let result = AdjustmentOrderResult {
            symbol: request.symbol.clone(),
            instruction: sizing.instruction,
            quantity: sizing.quantity,
            price: request.price.or(Some(quote.price)),
            total_position_size: sizing.total_position_size,
            outcome: AdjustmentOutcome::Preview,
        };
        let order = result.to_order(request);

        if let Err(violation) = limits.check(&order, Some(&quote)) {
            warn!(symbol = %request.symbol, %violation, "Safety limit violated");
            return Plan::Resolved(
                result.with_outcome(AdjustmentOutcome::Failed(FailureReason::Safety(violation))),
            );
        }

        if options.preview {
            Plan::Resolved(result)
        } else {
            Plan::Ready(result, order)
        }
    }

    async fn submit(
        &self,
        account: &AccountId,
        result: AdjustmentOrderResult,
        order: &NumericalOrder,
    ) -> AdjustmentOrderResult {
        match self.orders.submit_order(account, order).await {
            Ok(receipt) if receipt.accepted => {
                info!(
                    symbol = %order.symbol,
                    instruction = %order.instruction,
                    quantity = %order.quantity,
                    broker_order_id = ?receipt.broker_order_id,
                    "Order accepted"
                );
                result.with_outcome(AdjustmentOutcome::Succeeded {
                    broker_order_id: receipt.broker_order_id,
                })
            }
            Ok(receipt) => {
                warn!(symbol = %order.symbol, detail = ?receipt.error_detail, "Order rejected");
                result.with_outcome(AdjustmentOutcome::Failed(FailureReason::Submission))
            }
            Err(e) => {
                warn!(
                    symbol = %order.symbol,
                    error = %e,
                    transport = e.is_transport(),
                    "Order submission failed"
                );
                result.with_outcome(AdjustmentOutcome::Failed(FailureReason::Submission))
            }
        }
    }
}

fn find_position(positions: Vec<Position>, symbol: &str) -> Option<Position> {
    positions
        .into_iter()
        .find(|p| p.symbol.eq_ignore_ascii_case(symbol) && p.is_held())
}

fn find_quote(quotes: Vec<Quote>, symbol: &str) -> Option<Quote> {
    quotes.into_iter().find(|q| q.symbol.eq_ignore_ascii_case(symbol))
}

fn failed(
    request: &AdjustmentRequest,
    instruction: Instruction,
    quantity: Decimal,
    total_position_size: Decimal,
    reason: FailureReason,
) -> AdjustmentOrderResult {
    AdjustmentOrderResult {
        symbol: request.symbol.clone(),
        instruction,
        quantity,
        price: request.price,
        total_position_size,
        outcome: AdjustmentOutcome::Failed(reason),
    }
}
