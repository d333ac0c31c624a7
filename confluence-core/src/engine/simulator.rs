//! Event-driven bar-by-bar simulator.
//!
//! The loop advances one bar at a time through a fixed sequence: settle
//! pending orders at this bar's open, check protective exits against this
//! bar's range, mark to market, evaluate sources on history up to this bar,
//! then hand the fused signal to the risk manager, whose orders rest until
//! the NEXT bar's open. Decisions at bar t can only ever execute at t+1,
//! so the no-lookahead property holds by construction rather than by audit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{
    Bar, Direction, ExitReason, Order, OrderIdGen, OrderSide, Portfolio, Position, TradeRecord,
};
use crate::engine::cost_model::CostModel;
use crate::error::ConfigError;
use crate::fusion::FusionEngine;
use crate::indicators::{average_true_range, IndicatorSet};
use crate::notify::Notifier;
use crate::patterns::PatternMatcher;
use crate::risk::{RiskDecision, RiskManager};
use crate::sentiment::SentimentAdapter;
use crate::store::BarStore;

/// Run-level simulator parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub initial_capital: f64,
    /// Seed for the cost model jitter; same seed, same run.
    pub seed: u64,
    /// Abort when more than this fraction of ingested bars were rejected.
    pub max_skipped_fraction: f64,
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.initial_capital));
        }
        if !self.max_skipped_fraction.is_finite()
            || !(0.0..=1.0).contains(&self.max_skipped_fraction)
        {
            return Err(ConfigError::FractionOutOfRange {
                name: "simulator.max_skipped_fraction",
                value: self.max_skipped_fraction,
            });
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            seed: 42,
            max_skipped_fraction: 0.05,
        }
    }
}

/// Lifecycle phase of a run. Transitions are one-way:
/// Initializing -> Running -> Completed | Aborted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Initializing,
    Running,
    Completed,
    Aborted,
}

/// Terminal outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    /// The run stopped early; everything settled up to the abort point is
    /// preserved in the result.
    Aborted { reason: String },
}

/// Everything a run produced.
#[derive(Debug)]
pub struct SimulationResult {
    pub status: RunStatus,
    pub portfolio: Portfolio,
    pub trades: Vec<TradeRecord>,
    pub orders: Vec<Order>,
    pub bars_processed: usize,
}

impl SimulationResult {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// What a resting order will do when it fills.
#[derive(Debug, Clone)]
enum OrderIntent {
    Open {
        direction: Direction,
        stop_loss: f64,
        take_profit: f64,
    },
    Close,
}

#[derive(Debug)]
struct RestingOrder {
    order: Order,
    intent: OrderIntent,
}

/// Entry-side friction carried until the round trip closes.
#[derive(Debug, Clone, Copy)]
struct EntryCosts {
    raw_price: f64,
    commission: f64,
    slippage: f64,
}

/// Single-symbol backtest simulator.
pub struct Simulator {
    config: SimulatorConfig,
    indicators: IndicatorSet,
    sentiment: SentimentAdapter,
    patterns: PatternMatcher,
    fusion: FusionEngine,
    risk: RiskManager,
    costs: CostModel,
}

impl Simulator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SimulatorConfig,
        indicators: IndicatorSet,
        sentiment: SentimentAdapter,
        patterns: PatternMatcher,
        fusion: FusionEngine,
        risk: RiskManager,
        costs: CostModel,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            indicators,
            sentiment,
            patterns,
            fusion,
            risk,
            costs,
        })
    }

    pub fn sentiment_mut(&mut self) -> &mut SentimentAdapter {
        &mut self.sentiment
    }

    /// Run the full bar loop over `store`.
    ///
    /// `cancel` is polled once per bar; a cancelled run settles nothing
    /// further and returns `Aborted` with partial results intact.
    pub fn run(
        &mut self,
        store: &BarStore,
        notifier: &mut dyn Notifier,
        cancel: &AtomicBool,
    ) -> SimulationResult {
        let mut phase = RunPhase::Initializing;
        info!(?phase, symbol = store.symbol(), "initializing run");
        let mut portfolio = Portfolio::new(self.config.initial_capital);
        let mut trades = Vec::new();
        let mut orders = Vec::new();
        let mut id_gen = OrderIdGen::default();
        let mut resting: Option<RestingOrder> = None;
        let mut entry_costs: Option<EntryCosts> = None;
        let mut prev_direction = Direction::Flat;

        let total_seen = store.len() + store.skipped();
        if total_seen > 0 {
            let skipped_fraction = store.skipped() as f64 / total_seen as f64;
            if skipped_fraction > self.config.max_skipped_fraction {
                warn!(
                    skipped = store.skipped(),
                    total = total_seen,
                    "rejected-bar fraction exceeds tolerance; aborting before run"
                );
                return SimulationResult {
                    status: RunStatus::Aborted {
                        reason: format!(
                            "data integrity: {}/{} bars rejected at ingestion",
                            store.skipped(),
                            total_seen
                        ),
                    },
                    portfolio,
                    trades,
                    orders,
                    bars_processed: 0,
                };
            }
        }

        phase = RunPhase::Running;
        info!(?phase, bars = store.len(), "run started");

        let symbol = store.symbol().to_string();
        let indicator_lookback = self.indicators.max_lookback();
        let mut bars_processed = 0usize;

        for i in 0..store.len() {
            if cancel.load(Ordering::Relaxed) {
                phase = RunPhase::Aborted;
                info!(?phase, bar = i, "run cancelled");
                self.reject_resting(&mut resting, &mut orders, "run cancelled");
                return SimulationResult {
                    status: RunStatus::Aborted {
                        reason: "cancelled".into(),
                    },
                    portfolio,
                    trades,
                    orders,
                    bars_processed,
                };
            }

            // Indexing is guarded by the loop bound.
            let bar = store.bars()[i].clone();

            // 1. Settle the order decided on the previous bar at this open.
            if let Some(mut pending) = resting.take() {
                self.settle_order(
                    &mut pending,
                    &bar,
                    &mut portfolio,
                    &mut trades,
                    &mut entry_costs,
                    notifier,
                );
                orders.push(pending.order);
            }

            // 2. Protective exits against this bar's range. Stop wins when
            // both levels sit inside the same bar.
            if let Some(position) = portfolio.open_position(&symbol).cloned() {
                let exit = if position.stop_breached(bar.low, bar.high) {
                    Some((position.stop_loss, ExitReason::StopLoss))
                } else if position.take_breached(bar.low, bar.high) {
                    Some((position.take_profit, ExitReason::TakeProfit))
                } else {
                    None
                };
                if let Some((level, reason)) = exit {
                    self.close_position(
                        &position,
                        level,
                        bar.timestamp,
                        reason,
                        &mut portfolio,
                        &mut trades,
                        &mut entry_costs,
                        notifier,
                    );
                }
            }

            // 3. Mark to market at the close.
            let prices = HashMap::from([(symbol.clone(), bar.close)]);
            portfolio.record_equity(bar.timestamp, &prices);

            // 4. Evaluate sources on history up to and including this bar.
            let mut signals = Vec::new();
            if let Some(s) = self.indicators.evaluate(
                &symbol,
                bar.timestamp,
                store.window(indicator_lookback, i),
            ) {
                signals.push(s);
            }
            if let Some(s) = self.sentiment.signal_at(&symbol, bar.timestamp) {
                signals.push(s);
            }
            if let Some(s) = self.patterns.signal_at(
                &symbol,
                bar.timestamp,
                store.window(self.patterns.window_len(), i),
            ) {
                signals.push(s);
            }
            let composite = self.fusion.fuse(&signals);

            if let Some(ref c) = composite {
                if c.direction != prev_direction {
                    notifier.direction_changed(prev_direction, c);
                    prev_direction = c.direction;
                }
            }

            // 5. Risk decision; any resulting order rests until the next open.
            let atr = average_true_range(store.up_to(i), self.risk.atr_period());
            let equity = portfolio.equity(&prices);
            let drawdown = portfolio.current_drawdown(&prices);
            let decision = self.risk.decide(
                composite.as_ref(),
                portfolio.open_position(&symbol),
                &portfolio,
                drawdown,
                bar.close,
                atr,
                equity,
            );

            match decision {
                RiskDecision::Open {
                    direction,
                    quantity,
                    stop_loss,
                    take_profit,
                } => {
                    let side = match direction {
                        Direction::Short => OrderSide::Sell,
                        _ => OrderSide::Buy,
                    };
                    resting = Some(RestingOrder {
                        order: Order::pending(
                            id_gen.next_id(),
                            symbol.clone(),
                            side,
                            quantity,
                            bar.timestamp,
                        ),
                        intent: OrderIntent::Open {
                            direction,
                            stop_loss,
                            take_profit,
                        },
                    });
                }
                RiskDecision::Close => {
                    if let Some(position) = portfolio.open_position(&symbol) {
                        let side = if position.is_long() {
                            OrderSide::Sell
                        } else {
                            OrderSide::Buy
                        };
                        resting = Some(RestingOrder {
                            order: Order::pending(
                                id_gen.next_id(),
                                symbol.clone(),
                                side,
                                position.quantity.abs(),
                                bar.timestamp,
                            ),
                            intent: OrderIntent::Close,
                        });
                    }
                }
                RiskDecision::Hold => {}
            }

            bars_processed += 1;
        }

        // End of data: the resting order never fills, and any open position
        // is settled at the final close.
        self.reject_resting(&mut resting, &mut orders, "end of data");
        if let (Some(position), Some(last)) =
            (portfolio.open_position(&symbol).cloned(), store.bars().last())
        {
            self.close_position(
                &position,
                last.close,
                last.timestamp,
                ExitReason::EndOfData,
                &mut portfolio,
                &mut trades,
                &mut entry_costs,
                notifier,
            );
            // The loop already marked this timestamp; fold the settlement
            // into that point instead of recording a duplicate.
            let prices = HashMap::from([(symbol.clone(), last.close)]);
            let settled = portfolio.equity(&prices);
            if let Some(point) = portfolio.equity_curve.last_mut() {
                point.equity = settled;
            }
        }

        phase = RunPhase::Completed;
        info!(
            ?phase,
            bars = bars_processed,
            trades = trades.len(),
            "run finished"
        );
        SimulationResult {
            status: RunStatus::Completed,
            portfolio,
            trades,
            orders,
            bars_processed,
        }
    }

    fn reject_resting(
        &self,
        resting: &mut Option<RestingOrder>,
        orders: &mut Vec<Order>,
        reason: &str,
    ) {
        if let Some(mut pending) = resting.take() {
            pending.order.reject(reason);
            orders.push(pending.order);
        }
    }

    /// Fill a resting order at this bar's open.
    fn settle_order(
        &mut self,
        pending: &mut RestingOrder,
        bar: &Bar,
        portfolio: &mut Portfolio,
        trades: &mut Vec<TradeRecord>,
        entry_costs: &mut Option<EntryCosts>,
        notifier: &mut dyn Notifier,
    ) {
        if !bar.is_sane() {
            pending.order.reject("fill bar failed sanity check");
            return;
        }
        let raw_price = bar.open;
        match pending.intent {
            OrderIntent::Open {
                direction,
                stop_loss,
                take_profit,
            } => {
                let (fill_price, slip) =
                    self.costs
                        .apply_slippage(raw_price, pending.order.side, pending.order.quantity);
                let commission = self.costs.commission(fill_price, pending.order.quantity);
                let signed_quantity = direction.sign() * pending.order.quantity;

                portfolio.cash -= signed_quantity * fill_price;
                portfolio.cash -= commission;
                portfolio.total_commission += commission;
                portfolio.total_slippage += slip;
                portfolio.positions.insert(
                    bar.symbol.clone(),
                    Position {
                        symbol: bar.symbol.clone(),
                        quantity: signed_quantity,
                        entry_price: fill_price,
                        stop_loss,
                        take_profit,
                        opened_at: bar.timestamp,
                        closed_at: None,
                    },
                );
                *entry_costs = Some(EntryCosts {
                    raw_price,
                    commission,
                    slippage: slip,
                });
                pending.order.fill(fill_price, bar.timestamp);
            }
            OrderIntent::Close => {
                if let Some(position) = portfolio.open_position(&bar.symbol).cloned() {
                    self.close_position(
                        &position,
                        raw_price,
                        bar.timestamp,
                        ExitReason::Signal,
                        portfolio,
                        trades,
                        entry_costs,
                        notifier,
                    );
                    pending.order.fill(raw_price, bar.timestamp);
                } else {
                    // Protective exit beat the signal exit to it.
                    pending.order.reject("position already closed");
                }
            }
        }
    }

    /// Settle a position exit at `raw_price`, record the round trip.
    #[allow(clippy::too_many_arguments)]
    fn close_position(
        &mut self,
        position: &Position,
        raw_price: f64,
        timestamp: DateTime<Utc>,
        reason: ExitReason,
        portfolio: &mut Portfolio,
        trades: &mut Vec<TradeRecord>,
        entry_costs: &mut Option<EntryCosts>,
        notifier: &mut dyn Notifier,
    ) {
        let side = if position.is_long() {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let (fill_price, exit_slip) =
            self.costs
                .apply_slippage(raw_price, side, position.quantity);
        let exit_commission = self.costs.commission(fill_price, position.quantity);

        portfolio.cash += position.quantity * fill_price;
        portfolio.cash -= exit_commission;
        portfolio.total_commission += exit_commission;
        portfolio.total_slippage += exit_slip;

        let entry = entry_costs.take().unwrap_or(EntryCosts {
            raw_price: position.entry_price,
            commission: 0.0,
            slippage: 0.0,
        });
        let gross_pnl = position.quantity * (raw_price - entry.raw_price);
        let commission = entry.commission + exit_commission;
        let slippage = entry.slippage + exit_slip;
        let trade = TradeRecord {
            symbol: position.symbol.clone(),
            direction: position.direction(),
            quantity: position.quantity.abs(),
            entry_timestamp: position.opened_at,
            entry_price: position.entry_price,
            exit_timestamp: timestamp,
            exit_price: fill_price,
            exit_reason: reason,
            gross_pnl,
            commission,
            slippage,
            net_pnl: gross_pnl - commission - slippage,
        };
        notifier.trade_closed(&trade);
        trades.push(trade);

        if let Some(p) = portfolio.open_position_mut(&position.symbol) {
            p.close(timestamp);
        }
    }
}
