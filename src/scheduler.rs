//! Once-per-second refresh of the selected account's code.
//!
//! Every tick takes a [`Ticket`]: a strictly increasing sequence number plus
//! the store's selection epoch at the moment the tick was issued. Codes may be
//! computed asynchronously, so results can land out of order. A result is only
//! published if it is newer than the last published one and the selection has
//! not changed since its tick was issued.

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, PoisonError},
    time::Duration,
};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::debug;

use crate::{
    account::Account,
    totp::{self, Clock, SystemClock},
    SharedStore, ERROR_CODE, PLACEHOLDER_CODE, REFRESH_INTERVAL,
};

/// What the display surface should show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayState {
    pub code: String,
    /// Seconds until `code` expires; `None` while nothing is selected.
    pub remaining: Option<u64>,
    pub selected: Option<usize>,
    /// Tick that produced this state.
    pub seq: u64,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::cleared(0)
    }
}

impl DisplayState {
    pub fn cleared(seq: u64) -> Self {
        Self {
            code: PLACEHOLDER_CODE.to_string(),
            remaining: None,
            selected: None,
            seq,
        }
    }

    /// Whether `code` is a real code rather than a placeholder.
    pub fn is_copyable(&self) -> bool {
        self.code != PLACEHOLDER_CODE && self.code != ERROR_CODE
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub epoch: u64,
}

/// Hands out tickets and decides which results may still be applied.
#[derive(Debug, Default)]
pub struct TickGuard {
    issued: u64,
    applied: u64,
}

impl TickGuard {
    pub fn issue(&mut self, epoch: u64) -> Ticket {
        self.issued += 1;
        Ticket {
            seq: self.issued,
            epoch,
        }
    }

    /// Records `ticket` as applied if it is newer than everything applied so
    /// far and was issued under `current_epoch`.
    pub fn accept(&mut self, ticket: Ticket, current_epoch: u64) -> bool {
        if ticket.epoch != current_epoch || ticket.seq <= self.applied {
            return false;
        }

        self.applied = ticket.seq;
        true
    }

    pub fn last_issued(&self) -> u64 {
        self.issued
    }

    pub fn last_applied(&self) -> u64 {
        self.applied
    }
}

#[derive(Clone, Debug)]
pub struct CodeRequest {
    pub account: Account,
    pub now: u64,
}

impl CodeRequest {
    pub fn compute(&self) -> String {
        self.account.code_at(self.now)
    }
}

pub type CodeFuture = Pin<Box<dyn Future<Output = String> + Send + 'static>>;

/// Computes codes, possibly asynchronously. Failures resolve to
/// [`ERROR_CODE`], never to a panic or a hang.
pub trait CodeProvider: Send + Sync + 'static {
    fn compute(&self, request: CodeRequest) -> CodeFuture;
}

/// Computes on the scheduler's task.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineProvider;

impl CodeProvider for InlineProvider {
    fn compute(&self, request: CodeRequest) -> CodeFuture {
        Box::pin(std::future::ready(request.compute()))
    }
}

/// Computes on tokio's blocking pool.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockingProvider;

impl CodeProvider for BlockingProvider {
    fn compute(&self, request: CodeRequest) -> CodeFuture {
        Box::pin(async move {
            tokio::task::spawn_blocking(move || request.compute())
                .await
                .unwrap_or_else(|err| {
                    debug!(%err, "code computation did not finish");
                    ERROR_CODE.to_string()
                })
        })
    }
}

enum Command {
    Refresh,
    Shutdown,
}

pub struct RefreshScheduler {
    store: SharedStore,
    provider: Arc<dyn CodeProvider>,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl RefreshScheduler {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            provider: Arc::new(InlineProvider),
            clock: Arc::new(SystemClock),
            interval: REFRESH_INTERVAL,
        }
    }

    pub fn with_provider(mut self, provider: impl CodeProvider) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Starts ticking on the current tokio runtime. Must be called from
    /// within a runtime context.
    pub fn spawn(self) -> SchedulerHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (display_tx, display_rx) = watch::channel(DisplayState::default());

        let task = tokio::spawn(self.run(commands_rx, display_tx));

        SchedulerHandle {
            commands: commands_tx,
            display: display_rx,
            task,
        }
    }

    async fn run(
        self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        display: watch::Sender<DisplayState>,
    ) {
        let mut guard = TickGuard::default();
        let (results_tx, mut results_rx) = mpsc::unbounded_channel::<(Ticket, DisplayState)>();

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick(&mut guard, &results_tx),
                command = commands.recv() => match command {
                    Some(Command::Refresh) => {
                        ticker.reset();
                        self.tick(&mut guard, &results_tx);
                    }
                    Some(Command::Shutdown) | None => break,
                },
                Some((ticket, state)) = results_rx.recv() => {
                    if guard.accept(ticket, self.epoch()) {
                        display.send_replace(state);
                    } else {
                        debug!(
                            seq = ticket.seq,
                            applied = guard.last_applied(),
                            "discarding stale code"
                        );
                    }
                }
            }
        }

        debug!(ticks = guard.last_issued(), "refresh scheduler stopped");
    }

    fn epoch(&self) -> u64 {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .epoch()
    }

    fn tick(&self, guard: &mut TickGuard, results: &mpsc::UnboundedSender<(Ticket, DisplayState)>) {
        let now = self.clock.now();

        let (epoch, selection) = {
            let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
            let selection = store
                .selected_index()
                .zip(store.selected().cloned());
            (store.epoch(), selection)
        };

        let ticket = guard.issue(epoch);

        let Some((index, account)) = selection else {
            let _ = results.send((ticket, DisplayState::cleared(ticket.seq)));
            return;
        };

        let remaining = totp::remaining(now, account.period);
        let pending = self.provider.compute(CodeRequest { account, now });
        let results = results.clone();

        tokio::spawn(async move {
            let code = pending.await;
            let _ = results.send((
                ticket,
                DisplayState {
                    code,
                    remaining: Some(remaining),
                    selected: Some(index),
                    seq: ticket.seq,
                },
            ));
        });
    }
}

/// Controls a spawned [`RefreshScheduler`]. Dropping it stops the scheduler.
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    display: watch::Receiver<DisplayState>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ticks immediately, e.g. right after the selection changed, and
    /// restarts the one second cadence from now.
    pub fn refresh_now(&self) -> bool {
        self.commands.send(Command::Refresh).is_ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.clone()
    }

    pub fn current(&self) -> DisplayState {
        self.display.borrow().clone()
    }

    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tickets_are_strictly_increasing() {
        let mut guard = TickGuard::default();
        let first = guard.issue(0);
        let second = guard.issue(0);
        let third = guard.issue(3);

        assert!(first.seq < second.seq && second.seq < third.seq);
        assert_eq!(guard.last_issued(), 3);
    }

    #[test]
    fn older_results_never_overwrite_newer_ones() {
        let mut guard = TickGuard::default();
        let slow = guard.issue(0);
        let fast = guard.issue(0);

        assert!(guard.accept(fast, 0));
        assert!(!guard.accept(slow, 0));
        assert!(!guard.accept(fast, 0));
        assert_eq!(guard.last_applied(), fast.seq);
    }

    #[test]
    fn selection_change_invalidates_pending_results() {
        let mut guard = TickGuard::default();
        let applied = guard.issue(0);
        assert!(guard.accept(applied, 0));

        // newer than anything applied, but issued before the selection moved
        let pending = guard.issue(0);
        assert!(!guard.accept(pending, 1));

        let fresh = guard.issue(1);
        assert!(guard.accept(fresh, 1));
    }

    #[test]
    fn cleared_state_is_not_copyable() {
        assert!(!DisplayState::default().is_copyable());

        let mut state = DisplayState::cleared(4);
        state.code = ERROR_CODE.to_string();
        assert!(!state.is_copyable());

        state.code = "123456".to_string();
        assert!(state.is_copyable());
    }

    #[test]
    fn request_computes_account_code() {
        let request = CodeRequest {
            account: Account::demo(),
            now: 59,
        };
        assert_eq!(request.compute(), "996554");
    }

    #[tokio::test]
    async fn blocking_provider_matches_inline() {
        let request = CodeRequest {
            account: Account::demo(),
            now: 30,
        };

        let inline = InlineProvider.compute(request.clone()).await;
        let blocking = BlockingProvider.compute(request).await;
        assert_eq!(inline, "996554");
        assert_eq!(blocking, inline);
    }
}
