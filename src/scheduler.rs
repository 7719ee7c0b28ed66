use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, TimeZone};
use chrono_tz::Tz;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::dispatch::{DispatchSink, Reminder};
use crate::models::{ClassEvent, ScheduleMap};
use crate::store::ScheduleStore;

/// Minutes between the reminder and the class start.
pub const REMINDER_LEAD_MIN: i64 = 10;

/// Tolerance around the reminder instant. The tick cadence is one minute and
/// not phase-aligned with wall-clock minutes, so each qualifying class is
/// caught by exactly one tick under normal jitter. A tick delayed past the
/// tolerance can miss or double-fire; accepted, no retry state is kept.
pub const TOLERANCE_SECS: i64 = 30;

const TICK_PERIOD: Duration = Duration::from_secs(60);

/// Source of "now" in the fixed service timezone. Injected so tests can pin
/// the clock.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Tz>;
}

pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        chrono::Utc::now().with_timezone(&self.tz)
    }
}

/// Classes whose reminder window contains `now`.
///
/// Matching is anchored on today: only events with `event.day ==
/// now.weekday()` are considered, and the class instant is built from
/// today's date. A class between 00:00 and 00:10 therefore puts its
/// reminder instant on the previous calendar day, where no tick matches it;
/// this mirrors the original bot.
pub fn due_events<'a>(
    now: DateTime<Tz>,
    schedule: &'a ScheduleMap,
) -> Vec<(&'a str, &'a ClassEvent)> {
    let weekday = now.weekday();
    let today = now.date_naive();
    let tz = now.timezone();

    let mut due = Vec::new();
    for (group_id, events) in schedule {
        for event in events.values() {
            if event.day != weekday {
                continue;
            }
            // Skipped or ambiguous local datetimes (DST gaps) skip the event
            // for this tick.
            let Some(class_instant) = tz.from_local_datetime(&today.and_time(event.time)).single()
            else {
                continue;
            };
            let reminder_instant = class_instant - chrono::Duration::minutes(REMINDER_LEAD_MIN);
            if (now - reminder_instant).num_milliseconds().abs() <= TOLERANCE_SECS * 1000 {
                due.push((group_id.as_str(), event));
            }
        }
    }
    due
}

/// Recurring one-minute scan over the schedule store. Each tick only reads;
/// all mutation goes through the store's own lock.
pub struct ReminderScheduler<C, D> {
    store: Arc<ScheduleStore>,
    clock: C,
    sink: D,
}

impl<C, D> ReminderScheduler<C, D>
where
    C: Clock,
    D: DispatchSink + Send + Sync + 'static,
{
    pub fn new(store: Arc<ScheduleStore>, clock: C, sink: D) -> Self {
        Self { store, clock, sink }
    }

    /// Starts the tick loop. The first scan runs immediately, then once per
    /// minute until the handle shuts it down.
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.scan(self.clock.now()).await,
                    _ = &mut shutdown_rx => {
                        info!("reminder scheduler stopped");
                        break;
                    }
                }
            }
        });
        SchedulerHandle { shutdown_tx, task }
    }

    /// One tick: snapshot the schedule and dispatch a reminder for every
    /// matched class. A failed dispatch is logged and never aborts the
    /// remaining events or the loop.
    pub async fn scan(&self, now: DateTime<Tz>) {
        let schedule = self.store.snapshot().await;
        for (group_id, event) in due_events(now, &schedule) {
            let reminder = Reminder::for_class(event, now);
            match self.sink.dispatch(&reminder).await {
                Ok(()) => info!(
                    group_id,
                    class = %event.name,
                    channel_id = event.channel_id,
                    "reminder sent"
                ),
                Err(err) => warn!(
                    group_id,
                    class = %event.name,
                    channel_id = event.channel_id,
                    error = %err,
                    "failed to deliver reminder"
                ),
            }
        }
    }
}

/// Cancels the tick loop exactly once at process shutdown.
pub struct SchedulerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// A scan already in progress finishes before the task exits; ticks
    /// never mutate state, so nothing is left half-applied.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}
