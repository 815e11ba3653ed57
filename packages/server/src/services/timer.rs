use std::time::Duration;
use tokio::{
    sync::watch,
    time::{self, Instant},
};
use tokio_util::sync::CancellationToken;

/// Tick-driven countdown running on its own task. `on_tick(remaining)` fires
/// once per tick while time is left; `on_expire` fires exactly once when the
/// count reaches zero unless the timer was cancelled first. Pausing freezes
/// the count mid-tick. Dropping the handle cancels the timer.
pub struct CountdownTimer {
    cancel: CancellationToken,
    paused: watch::Sender<bool>,
}

impl CountdownTimer {
    pub fn start<T, E>(duration_ticks: u32, tick: Duration, mut on_tick: T, on_expire: E) -> Self
    where
        T: FnMut(u32) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let (paused, mut paused_rx) = watch::channel(false);
        let token = cancel.clone();
        let mut next_tick = Instant::now() + tick;

        tokio::spawn(async move {
            let mut remaining = duration_ticks;
            // what was left of the current tick when the pause began
            let mut frozen: Option<Duration> = None;

            while remaining > 0 {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    changed = paused_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        let now = Instant::now();
                        let paused = *paused_rx.borrow_and_update();
                        if paused && frozen.is_none() {
                            frozen = Some(next_tick.saturating_duration_since(now));
                        } else if !paused {
                            if let Some(left) = frozen.take() {
                                next_tick = now + left;
                            }
                        }
                    }
                    _ = time::sleep_until(next_tick), if frozen.is_none() => {
                        remaining -= 1;
                        next_tick += tick;
                        if remaining > 0 {
                            on_tick(remaining);
                        }
                    }
                }
            }

            if !token.is_cancelled() {
                on_expire();
            }
        });

        Self { cancel, paused }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn pause(&self) {
        self.paused.send_replace(true);
    }

    pub fn resume(&self) {
        self.paused.send_replace(false);
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The single phase timer a game may have running. Starting a new one
/// cancels the previous one so two expirations can never race.
#[derive(Default)]
pub struct PhaseTimer {
    current: Option<CountdownTimer>,
}

impl PhaseTimer {
    pub fn start<T, E>(&mut self, duration_ticks: u32, tick: Duration, on_tick: T, on_expire: E)
    where
        T: FnMut(u32) + Send + 'static,
        E: FnOnce() + Send + 'static,
    {
        self.cancel();
        self.current = Some(CountdownTimer::start(
            duration_ticks,
            tick,
            on_tick,
            on_expire,
        ));
    }

    pub fn cancel(&mut self) {
        if let Some(timer) = self.current.take() {
            timer.cancel();
        }
    }

    pub fn pause(&self) {
        if let Some(timer) = &self.current {
            timer.pause();
        }
    }

    pub fn resume(&self) {
        if let Some(timer) = &self.current {
            timer.resume();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    };
    use tokio::sync::oneshot;

    const TICK: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn ticks_then_expires_once() {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let seen = ticks.clone();
        let (tx, rx) = oneshot::channel();

        let started = Instant::now();
        let _timer = CountdownTimer::start(
            3,
            TICK,
            move |remaining| seen.lock().unwrap().push(remaining),
            move || {
                let _ = tx.send(());
            },
        );

        rx.await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(*ticks.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_expiry() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let timer = CountdownTimer::start(
            5,
            TICK,
            |_| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        time::sleep(Duration::from_secs(2)).await;
        timer.cancel();
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_the_countdown() {
        let (tx, rx) = oneshot::channel();
        let started = Instant::now();
        let timer = CountdownTimer::start(
            4,
            TICK,
            |_| {},
            move || {
                let _ = tx.send(());
            },
        );

        time::sleep(Duration::from_millis(2500)).await;
        timer.pause();
        time::sleep(Duration::from_secs(30)).await;
        timer.resume();

        rx.await.unwrap();
        // the half tick left at the pause is still owed after it
        assert_eq!(started.elapsed(), Duration::from_secs(34));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_pauses_do_not_add_time() {
        let (tx, rx) = oneshot::channel();
        let started = Instant::now();
        let timer = CountdownTimer::start(
            3,
            TICK,
            |_| {},
            move || {
                let _ = tx.send(());
            },
        );

        for _ in 0..4 {
            time::sleep(Duration::from_millis(400)).await;
            timer.pause();
            time::sleep(Duration::from_secs(5)).await;
            timer.resume();
        }

        rx.await.unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(3 + 4 * 5));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_from_the_start_holds_the_full_count() {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let timer = CountdownTimer::start(
            2,
            TICK,
            |_| {},
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        timer.pause();

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        timer.resume();
        time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn phase_timer_replaces_previous() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut phase = PhaseTimer::default();

        let first = fired.clone();
        phase.start(2, TICK, |_| {}, move || {
            first.fetch_add(1, Ordering::SeqCst);
        });
        let second = fired.clone();
        phase.start(3, TICK, |_| {}, move || {
            second.fetch_add(10, Ordering::SeqCst);
        });

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }
}
