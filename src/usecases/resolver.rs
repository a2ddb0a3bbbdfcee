//! Resolver Use Case - Market Resolution Loop
//!
//! Drives open markets past their deadline to a terminal outcome once
//! the linked pull request has concluded.
//!
//! Cycle flow:
//! 1. List every market account from the ledger (a transport failure
//!    skips the whole cycle, nothing is assumed)
//! 2. Decode, skipping undecodable records
//! 3. Keep open markets and process each one independently
//! 4. Past deadline + merged PR -> resolve Ship, closed PR -> Slip
//!
//! The ledger is the only source of truth. Nothing is cached between
//! cycles; a duplicate resolution is refused by the ledger and counted
//! as already settled.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::StreamExt;
use futures_util::stream;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};

use crate::config::OracleConfig;
use crate::domain::codec::{self, MARKET_DISCRIMINATOR};
use crate::domain::instructions;
use crate::domain::market::{Market, Side};
use crate::ports::ledger::{AccountFilter, Ledger, LedgerError};
use crate::ports::pr_status::PrStatusSource;

/// Process-wide oracle settings, built once at startup.
#[derive(Debug, Clone)]
pub struct OracleContext {
  /// Ship or Slip program id.
  pub program_id: Pubkey,
  /// Key signing resolve instructions.
  pub oracle: Pubkey,
  /// Log decisions without submitting.
  pub dry_run: bool,
  /// Markets processed in parallel within a cycle.
  pub max_concurrent_markets: usize,
}

impl OracleContext {
  /// Context with submission enabled and four markets in flight.
  pub fn new(program_id: Pubkey, oracle: Pubkey) -> Self {
    Self {
      program_id,
      oracle,
      dry_run: false,
      max_concurrent_markets: 4,
    }
  }

  /// Context from the `[oracle]` config section.
  pub fn from_config(config: &OracleConfig, program_id: Pubkey, oracle: Pubkey) -> Self {
    Self {
      program_id,
      oracle,
      dry_run: config.dry_run,
      max_concurrent_markets: config.max_concurrent_markets,
    }
  }
}

/// What a cycle did with one open market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarketDisposition {
  /// Deadline not reached; the PR was not looked up.
  NotDue,
  /// PR still open or its status unknown.
  Undecided,
  /// Resolve instruction confirmed.
  Resolved { side: Side, signature: Signature },
  /// Decided, but dry-run mode suppressed submission.
  WouldResolve { side: Side },
  /// Ledger refused the resolution (typically already resolved).
  AlreadySettled,
  /// Submission outcome unknown; revisited next cycle.
  Deferred,
  /// Instruction could not be built.
  Failed(String),
}

/// Per-market line of a cycle report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketResult {
  /// Market account key.
  pub market: Pubkey,
  /// GitHub repository.
  pub repo: String,
  /// Pull request number.
  pub pr_number: u64,
  /// What happened this cycle.
  pub disposition: MarketDisposition,
}

/// Summary of a single resolution cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
  /// Market accounts returned by the ledger.
  pub listed: usize,
  /// Accounts skipped because they failed to decode.
  pub undecodable: usize,
  /// Decoded markets still open.
  pub open: usize,
  /// One entry per open market, in completion order.
  pub results: Vec<MarketResult>,
}

/// Disposition counts for a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTally {
  pub not_due: usize,
  pub undecided: usize,
  pub resolved: usize,
  pub would_resolve: usize,
  pub already_settled: usize,
  pub deferred: usize,
  pub failed: usize,
}

impl CycleTally {
  /// Markets whose PR status was looked up.
  pub fn lookups(&self) -> usize {
    self.undecided
      + self.resolved
      + self.would_resolve
      + self.already_settled
      + self.deferred
      + self.failed
  }
}

impl CycleReport {
  /// Count markets by disposition.
  pub fn tally(&self) -> CycleTally {
    let mut tally = CycleTally::default();
    for result in &self.results {
      match result.disposition {
        MarketDisposition::NotDue => tally.not_due += 1,
        MarketDisposition::Undecided => tally.undecided += 1,
        MarketDisposition::Resolved { .. } => tally.resolved += 1,
        MarketDisposition::WouldResolve { .. } => tally.would_resolve += 1,
        MarketDisposition::AlreadySettled => tally.already_settled += 1,
        MarketDisposition::Deferred => tally.deferred += 1,
        MarketDisposition::Failed(_) => tally.failed += 1,
      }
    }
    tally
  }

  /// Disposition of `market`, if it was open this cycle.
  pub fn disposition_of(&self, market: &Pubkey) -> Option<&MarketDisposition> {
    self
      .results
      .iter()
      .find(|r| &r.market == market)
      .map(|r| &r.disposition)
  }
}

/// Receives the outcome of every cycle (metrics, health).
pub trait CycleObserver: Send + Sync {
  fn on_cycle(&self, result: &Result<CycleReport, LedgerError>, elapsed: Duration);
}

impl CycleObserver for () {
  fn on_cycle(&self, _result: &Result<CycleReport, LedgerError>, _elapsed: Duration) {}
}

/// Resolution loop over a ledger and a PR status source.
pub struct Resolver<L: Ledger, S: PrStatusSource> {
  ledger: Arc<L>,
  status: Arc<S>,
  ctx: OracleContext,
  observer: Arc<dyn CycleObserver>,
}

impl<L: Ledger, S: PrStatusSource> Resolver<L, S> {
  /// Create a resolver with no cycle observer.
  pub fn new(ledger: Arc<L>, status: Arc<S>, ctx: OracleContext) -> Self {
    Self {
      ledger,
      status,
      ctx,
      observer: Arc::new(()),
    }
  }

  /// Report every cycle to `observer`.
  pub fn with_observer(mut self, observer: Arc<dyn CycleObserver>) -> Self {
    self.observer = observer;
    self
  }

  /// Oracle settings in use.
  pub fn context(&self) -> &OracleContext {
    &self.ctx
  }

  /// Run one resolution pass at Unix time `now`.
  ///
  /// # Errors
  /// Returns the ledger error if market accounts could not be listed.
  /// Per-market failures never fail the cycle.
  #[instrument(skip(self), fields(dry_run = self.ctx.dry_run))]
  pub async fn run_cycle(&self, now: i64) -> Result<CycleReport, LedgerError> {
    let accounts = self
      .ledger
      .list_accounts(&[AccountFilter::discriminator(MARKET_DISCRIMINATOR)])
      .await?;

    let listed = accounts.len();
    let mut undecodable = 0;
    let mut open = Vec::new();

    for account in accounts {
      match codec::decode_market(account.address, &account.data) {
        Ok(market) if market.is_open() => open.push(market),
        Ok(_) => {}
        Err(e) => {
          undecodable += 1;
          warn!(market = %account.address, error = %e, "Skipping undecodable market account");
        }
      }
    }

    let open_count = open.len();
    let results: Vec<MarketResult> = stream::iter(open)
      .map(|market| async move {
        let disposition = self.process_market(&market, now).await;
        MarketResult {
          market: market.address,
          repo: market.repo,
          pr_number: market.pr_number,
          disposition,
        }
      })
      .buffer_unordered(self.ctx.max_concurrent_markets.max(1))
      .collect()
      .await;

    Ok(CycleReport {
      listed,
      undecodable,
      open: open_count,
      results,
    })
  }

  /// Decide and, when due, resolve a single open market.
  #[instrument(
    skip(self, market),
    fields(market = %market.address, repo = %market.repo, pr = market.pr_number)
  )]
  async fn process_market(&self, market: &Market, now: i64) -> MarketDisposition {
    if !market.is_past_deadline(now) {
      debug!(deadline = market.deadline, "Deadline not reached");
      return MarketDisposition::NotDue;
    }

    let Some(pr) = self.status.pull_request(&market.repo, market.pr_number).await else {
      debug!("PR status unknown, deferring");
      return MarketDisposition::Undecided;
    };

    let Some(side) = pr.state.decision() else {
      debug!("PR still open");
      return MarketDisposition::Undecided;
    };

    if self.ctx.dry_run {
      info!(%side, title = %pr.title, "Dry run, would resolve market");
      return MarketDisposition::WouldResolve { side };
    }

    let instruction = match instructions::resolve_market(
      &self.ctx.program_id,
      &market.address,
      &self.ctx.oracle,
      side,
    ) {
      Ok(instruction) => instruction,
      Err(e) => {
        error!(error = %e, "Failed to build resolve instruction");
        return MarketDisposition::Failed(e.to_string());
      }
    };

    match self.ledger.submit_and_confirm(instruction).await {
      Ok(signature) => {
        info!(
          %side,
          %signature,
          title = %pr.title,
          author = %pr.author,
          "Market resolved"
        );
        MarketDisposition::Resolved { side, signature }
      }
      Err(LedgerError::Rejected(reason)) => {
        info!(%side, reason = %reason, "Resolution refused by ledger, treating as settled");
        MarketDisposition::AlreadySettled
      }
      Err(LedgerError::Transport(reason)) => {
        warn!(%side, reason = %reason, "Resolution not confirmed, retrying next cycle");
        MarketDisposition::Deferred
      }
    }
  }

  /// Run cycles every `interval` until `shutdown` fires.
  ///
  /// Cycles never overlap: a slow cycle delays the next tick. Errors
  /// are logged and never end the loop.
  pub async fn run(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
      interval_secs = interval.as_secs(),
      oracle = %self.ctx.oracle,
      dry_run = self.ctx.dry_run,
      "Resolution loop started"
    );

    loop {
      tokio::select! {
        biased;

        _ = shutdown.recv() => {
          info!("Resolution loop shutting down");
          break;
        }

        _ = ticker.tick() => {
          let started = Instant::now();
          let result = self.run_cycle(Utc::now().timestamp()).await;
          let elapsed = started.elapsed();

          match &result {
            Ok(report) => {
              let tally = report.tally();
              info!(
                listed = report.listed,
                open = report.open,
                undecodable = report.undecodable,
                resolved = tally.resolved,
                settled = tally.already_settled,
                deferred = tally.deferred,
                elapsed_ms = elapsed.as_millis(),
                "Cycle complete"
              );
            }
            Err(e) => warn!(error = %e, "Cycle skipped, could not list markets"),
          }

          self.observer.on_cycle(&result, elapsed);
        }
      }
    }
  }
}
