use rand::Rng;
use rand::rngs::StdRng;

use crate::error::Result;

use super::{FeedConfig, TransactionEvent};

type Listener = Box<dyn FnMut(&TransactionEvent)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Debug)]
struct Burst {
    remaining: usize,
    interval_ms: u64,
    next_due: u64,
}

#[derive(Clone, Copy)]
enum Due {
    Scheduled,
    Burst(usize),
}

/// Bursts keep their own timers, so [`TransactionSource::stop`] leaves a
/// running burst to finish.
pub struct TransactionSource<R = StdRng> {
    config: FeedConfig,
    rng: R,
    running: bool,
    next_scheduled: Option<u64>,
    bursts: Vec<Burst>,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
    emitted_scheduled: u64,
    emitted_burst: u64,
}

impl<R: Rng> TransactionSource<R> {
    pub fn new(config: FeedConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            rng,
            running: false,
            next_scheduled: None,
            bursts: Vec::new(),
            listeners: Vec::new(),
            next_subscription: 0,
            emitted_scheduled: 0,
            emitted_burst: 0,
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn configure(&mut self, config: FeedConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self, now_ms: u64) {
        if self.running {
            return;
        }
        self.running = true;
        self.schedule_next(now_ms);
        log::debug!(
            "transaction source started, first emission at {:?}",
            self.next_scheduled
        );
    }

    pub fn stop(&mut self) {
        self.running = false;
        if self.next_scheduled.take().is_some() {
            log::debug!("transaction source stopped, pending timer cancelled");
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(&TransactionEvent) + 'static,
    {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription, Box::new(listener)));
        subscription
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn generate_burst(&mut self, count: usize, interval_ms: u64, now_ms: u64) {
        if count == 0 {
            return;
        }
        let Some(next_due) = now_ms.checked_add(interval_ms) else {
            log::warn!("burst starting past the end of the clock dropped");
            return;
        };
        log::info!("burst of {count} transactions every {interval_ms}ms requested");
        self.bursts.push(Burst {
            remaining: count,
            interval_ms,
            next_due,
        });
    }

    pub fn pending_bursts(&self) -> usize {
        self.bursts.len()
    }

    pub fn next_due(&self) -> Option<u64> {
        let burst_due = self.bursts.iter().map(|burst| burst.next_due).min();
        match (self.next_scheduled, burst_due) {
            (Some(scheduled), Some(burst)) => Some(scheduled.min(burst)),
            (scheduled, burst) => scheduled.or(burst),
        }
    }

    pub fn emitted_scheduled(&self) -> u64 {
        self.emitted_scheduled
    }

    pub fn emitted_burst(&self) -> u64 {
        self.emitted_burst
    }

    /// Fires every emission due at or before `now_ms` and hands each event to
    /// the listeners. Returns how many events fired.
    pub fn tick(&mut self, now_ms: u64) -> usize {
        let mut fired = 0;

        while let Some((due_at, due)) = self.earliest_due(now_ms) {
            let event = TransactionEvent::generate(&self.config, due_at, &mut self.rng);

            match due {
                Due::Scheduled => {
                    self.emitted_scheduled += 1;
                    self.next_scheduled = None;
                    if self.running {
                        self.schedule_next(due_at);
                    }
                }
                Due::Burst(index) => {
                    self.emitted_burst += 1;
                    let burst = &mut self.bursts[index];
                    burst.remaining -= 1;
                    let next_due = due_at
                        .checked_add(burst.interval_ms)
                        .filter(|_| burst.remaining > 0);
                    match next_due {
                        Some(next_due) => burst.next_due = next_due,
                        None => {
                            self.bursts.remove(index);
                        }
                    }
                }
            }

            for (_, listener) in &mut self.listeners {
                listener(&event);
            }
            fired += 1;
        }

        fired
    }

    fn earliest_due(&self, now_ms: u64) -> Option<(u64, Due)> {
        let mut earliest = self
            .next_scheduled
            .filter(|&due_at| due_at <= now_ms)
            .map(|due_at| (due_at, Due::Scheduled));

        for (index, burst) in self.bursts.iter().enumerate() {
            if burst.next_due > now_ms {
                continue;
            }
            if earliest.is_none_or(|(due_at, _)| burst.next_due < due_at) {
                earliest = Some((burst.next_due, Due::Burst(index)));
            }
        }

        earliest
    }

    fn schedule_next(&mut self, from_ms: u64) {
        let delay = self
            .rng
            .gen_range(self.config.min_interval_ms..=self.config.max_interval_ms);
        self.next_scheduled = from_ms.checked_add(delay);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use rand::SeedableRng;

    use super::*;
    use crate::error::LightsError;

    fn fixed_interval(interval_ms: u64) -> FeedConfig {
        FeedConfig {
            min_interval_ms: interval_ms,
            max_interval_ms: interval_ms,
            ..FeedConfig::default()
        }
    }

    fn source(config: FeedConfig) -> TransactionSource {
        TransactionSource::new(config, StdRng::seed_from_u64(11)).unwrap()
    }

    fn record(source: &mut TransactionSource) -> Rc<RefCell<Vec<TransactionEvent>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        source.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        seen
    }

    #[test]
    fn rejects_invalid_config() {
        let config = FeedConfig {
            min_interval_ms: 10,
            max_interval_ms: 5,
            ..FeedConfig::default()
        };
        let result = TransactionSource::new(config, StdRng::seed_from_u64(1));
        assert!(matches!(result, Err(LightsError::InvalidConfig(_))));

        let mut valid = source(FeedConfig::default());
        assert!(valid.configure(config).is_err());
        assert_eq!(*valid.config(), FeedConfig::default());
    }

    #[test]
    fn schedules_within_interval_bounds() {
        let config = FeedConfig::default();
        let mut source = source(config);
        let seen = record(&mut source);
        source.start(1_000);

        let due = source.next_due().unwrap();
        assert!(due >= 1_000 + config.min_interval_ms);
        assert!(due <= 1_000 + config.max_interval_ms);
        assert_eq!(source.tick(due - 1), 0);

        assert_eq!(source.tick(due), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].timestamp, due);
        assert!(source.next_due().unwrap() >= due + config.min_interval_ms);
    }

    #[test]
    fn start_is_idempotent() {
        let mut source = source(FeedConfig::default());
        source.start(0);
        let due = source.next_due();
        source.start(250);
        assert_eq!(source.next_due(), due);
    }

    #[test]
    fn stop_cancels_pending_timer() {
        let mut source = source(fixed_interval(100));
        source.start(0);
        assert_eq!(source.tick(250), 2);

        source.stop();
        source.stop();
        assert!(!source.is_running());
        assert_eq!(source.next_due(), None);
        assert_eq!(source.tick(10_000), 0);
        assert_eq!(source.emitted_scheduled(), 2);
    }

    #[test]
    fn catches_up_on_every_missed_emission_in_order() {
        let mut source = source(fixed_interval(100));
        let seen = record(&mut source);
        source.start(0);
        assert_eq!(source.tick(1_000), 10);
        let timestamps = seen
            .borrow()
            .iter()
            .map(|event| event.timestamp)
            .collect::<Vec<_>>();
        assert_eq!(
            timestamps,
            vec![100, 200, 300, 400, 500, 600, 700, 800, 900, 1_000]
        );
    }

    #[test]
    fn listeners_receive_events_in_order_until_unsubscribed() {
        let mut source = source(fixed_interval(100));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first_seen = Rc::clone(&seen);
        let first = source.subscribe(move |event| {
            first_seen.borrow_mut().push(("first", event.timestamp));
        });
        let second_seen = Rc::clone(&seen);
        source.subscribe(move |event| {
            second_seen.borrow_mut().push(("second", event.timestamp));
        });

        source.start(0);
        source.tick(200);
        assert!(source.unsubscribe(first));
        assert!(!source.unsubscribe(first));
        source.tick(300);

        assert_eq!(
            *seen.borrow(),
            vec![
                ("first", 100),
                ("second", 100),
                ("first", 200),
                ("second", 200),
                ("second", 300),
            ]
        );
        assert_eq!(source.listener_count(), 1);
    }

    #[test]
    fn burst_delivers_exact_count_with_spacing() {
        let mut source = source(FeedConfig::default());
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        source.subscribe(move |event| sink.borrow_mut().push(event.timestamp));

        source.generate_burst(5, 50, 0);
        assert_eq!(source.next_due(), Some(50));
        source.tick(10_000);

        let timestamps = received.borrow().clone();
        assert_eq!(timestamps.len(), 5);
        assert!(timestamps.windows(2).all(|pair| pair[1] - pair[0] >= 50));
        assert_eq!(source.emitted_burst(), 5);
        assert_eq!(source.emitted_scheduled(), 0);
        assert_eq!(source.pending_bursts(), 0);
    }

    #[test]
    fn burst_leaves_regular_schedule_untouched() {
        let mut plain = source(fixed_interval(100));
        plain.start(0);
        plain.tick(1_000);

        let mut bursting = source(fixed_interval(100));
        let seen = record(&mut bursting);
        bursting.start(0);
        bursting.generate_burst(5, 50, 120);
        assert_eq!(bursting.tick(1_000), 15);

        assert_eq!(bursting.emitted_scheduled(), plain.emitted_scheduled());
        assert_eq!(bursting.emitted_burst(), 5);
        assert!(
            seen.borrow()
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp)
        );
    }

    #[test]
    fn timers_past_the_end_of_the_clock_are_dropped() {
        let mut source = source(fixed_interval(100));
        source.generate_burst(1, 10, u64::MAX - 5);
        assert_eq!(source.pending_bursts(), 0);

        source.generate_burst(2, 60, u64::MAX - 100);
        source.start(u64::MAX - 150);
        assert_eq!(source.next_due(), Some(u64::MAX - 50));

        assert_eq!(source.tick(u64::MAX), 2);
        assert_eq!(source.next_due(), None);
        assert_eq!(source.pending_bursts(), 0);
        assert_eq!(source.emitted_burst(), 1);
    }

    #[test]
    fn burst_survives_stop() {
        let mut source = source(fixed_interval(100));
        source.start(0);
        source.generate_burst(3, 40, 0);
        source.stop();

        assert_eq!(source.tick(1_000), 3);
        assert_eq!(source.emitted_scheduled(), 0);
    }
}
