use log::{debug, error, info};
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::mpsc::UnboundedReceiver,
    task::JoinHandle,
    time::{interval, interval_at, timeout, Instant, MissedTickBehavior},
};

use crate::{
    db::EventStore,
    error::ShutdownError,
    platform::{FocusPoller, WindowDescriptor},
    service::ActivityService,
};

#[derive(Debug, Clone, Copy)]
pub struct Schedule {
    pub window_check_interval: Duration,
    pub save_interval: Duration,
    pub shutdown_timeout: Duration,
}

/// Runs one poll on the blocking pool, bounded by `limit`. A poll that
/// overruns is left in `in_flight`; no new poll starts until it returns, so
/// a hung backend holds at most one blocking thread.
async fn poll_window(
    poller: &Arc<dyn FocusPoller>,
    in_flight: &mut Option<JoinHandle<Option<WindowDescriptor>>>,
    limit: Duration,
) -> Option<WindowDescriptor> {
    if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
        debug!("Previous window poll still running, skipping this tick");
        return None;
    }
    // a late result describes a past tick, drop it
    in_flight.take();

    let poller = Arc::clone(poller);
    let mut handle = tokio::task::spawn_blocking(move || poller.current_window());
    match timeout(limit, &mut handle).await {
        Ok(Ok(descriptor)) => descriptor,
        Ok(Err(err)) => {
            debug!("Window poll worker failed: {err}");
            None
        }
        Err(_) => {
            debug!("Window poll took longer than {limit:?}");
            *in_flight = Some(handle);
            None
        }
    }
}

/// Drives window checks and periodic saves until a shutdown message arrives
/// (or every sender is gone), then performs the final flush. Returns how
/// many rows the final flush wrote.
pub async fn run<S: EventStore>(
    service: ActivityService<S>,
    poller: Arc<dyn FocusPoller>,
    schedule: Schedule,
    mut shutdown_rx: UnboundedReceiver<()>,
) -> Result<usize, ShutdownError> {
    let mut window_check = interval(schedule.window_check_interval);
    window_check.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut save = interval_at(Instant::now() + schedule.save_interval, schedule.save_interval);
    save.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutdown signal received. Exiting tracking loop.");
                break;
            }
            _ = window_check.tick() => {
                let descriptor = poll_window(&poller, &mut in_flight, schedule.window_check_interval).await;
                if service.observe(descriptor).await {
                    debug!("Focus moved, {} events pending", service.pending_events().await);
                }
            }
            _ = save.tick() => {
                if let Err(err) = service.save_pending().await {
                    error!("Failed to save activity data, retrying next cycle: {err}");
                }
            }
        }
    }

    match timeout(schedule.shutdown_timeout, service.shutdown()).await {
        Ok(Ok(count)) => {
            info!("Final flush wrote {count} events");
            Ok(count)
        }
        Ok(Err(err)) => Err(ShutdownError::Flush(err)),
        Err(_) => Err(ShutdownError::TimedOut(schedule.shutdown_timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        service::TrackingOptions,
        test_utils::{at, window, MemoryStore, ScriptedPoller, TokioClock},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc::unbounded_channel;

    fn schedule(save_secs: u64) -> Schedule {
        Schedule {
            window_check_interval: Duration::from_secs(5),
            save_interval: Duration::from_secs(save_secs),
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    fn service(store: &Arc<MemoryStore>) -> ActivityService<MemoryStore> {
        ActivityService::with_clock(
            Arc::clone(store),
            TrackingOptions::default(),
            Arc::new(TokioClock::new()),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_window_for_two_hours_is_one_row() {
        let store = Arc::new(MemoryStore::new());
        let poller: Arc<dyn FocusPoller> = Arc::new(ScriptedPoller::fixed(window("1", "editor")));
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(run(service(&store), poller, schedule(3600), rx));

        tokio::time::sleep(Duration::from_secs(7200)).await;
        tx.send(()).unwrap();
        let written = handle.await.unwrap().unwrap();

        let rows = store.rows();
        assert_eq!(written, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].program_name, "editor");
        assert!((7195..=7200).contains(&rows[0].duration_secs), "{rows:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_tick_persists_completed_sessions() {
        let store = Arc::new(MemoryStore::new());
        let script = [
            Some(window("1", "editor")),
            Some(window("1", "editor")),
            Some(window("2", "shell")),
        ];
        let poller: Arc<dyn FocusPoller> = Arc::new(ScriptedPoller::new(script));
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(run(service(&store), poller, schedule(60), rx));

        tokio::time::sleep(Duration::from_secs(90)).await;
        let saved = store.rows();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].program_name, "editor");
        assert_eq!(saved[0].start_time, at(0).timestamp());
        assert_eq!(saved[0].duration_secs, 10);
        assert_eq!(saved[1].program_name, "shell");

        drop(tx);
        handle.await.unwrap().unwrap();
        let total: i64 = store.rows().iter().map(|r| r.duration_secs).sum();
        assert_eq!(total, 90);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failures_keep_session_open() {
        let store = Arc::new(MemoryStore::new());
        let script = [Some(window("1", "editor")), None, None, Some(window("1", "editor"))];
        let poller: Arc<dyn FocusPoller> = Arc::new(ScriptedPoller::new(script));
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(run(service(&store), poller, schedule(3600), rx));

        tokio::time::sleep(Duration::from_secs(30)).await;
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();

        let rows = store.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].duration_secs, 30);
    }

    struct StuckPoller {
        calls: AtomicUsize,
    }

    impl FocusPoller for StuckPoller {
        fn current_window(&self) -> Option<WindowDescriptor> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(800));
            Some(window("1", "editor"))
        }
    }

    #[tokio::test]
    async fn test_hung_poll_is_not_stacked() {
        let store = Arc::new(MemoryStore::new());
        let stuck = Arc::new(StuckPoller {
            calls: AtomicUsize::new(0),
        });
        let poller: Arc<dyn FocusPoller> = stuck.clone();
        let schedule = Schedule {
            window_check_interval: Duration::from_millis(50),
            save_interval: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(5),
        };
        let service = ActivityService::new(Arc::clone(&store), TrackingOptions::default());
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(run(service.clone(), poller, schedule, rx));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(stuck.calls.load(Ordering::SeqCst), 1);
        assert!(service.current_window().await.is_none());

        tx.send(()).unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_final_flush_is_reported() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let poller: Arc<dyn FocusPoller> = Arc::new(ScriptedPoller::fixed(window("1", "editor")));
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(run(service(&store), poller, schedule(3600), rx));

        tokio::time::sleep(Duration::from_secs(20)).await;
        tx.send(()).unwrap();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(ShutdownError::Flush(_))));
        assert!(store.rows().is_empty());
    }
}
