use std::cell::RefCell;
use std::mem;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;

use crate::config::LightsConfig;
use crate::error::Result;
use crate::feed::{TransactionEvent, TransactionSource};
use crate::graph::TreeGraph;
use crate::stage::SceneCoordinator;

pub trait Clock {
    fn wait_until(&mut self, target_ms: u64);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualClock;

impl Clock for VirtualClock {
    fn wait_until(&mut self, _target_ms: u64) {}
}

#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
    origin_ms: u64,
}

impl WallClock {
    pub fn starting_at(origin_ms: u64) -> Self {
        Self {
            origin: Instant::now(),
            origin_ms,
        }
    }
}

impl Clock for WallClock {
    fn wait_until(&mut self, target_ms: u64) {
        let elapsed = self.origin.elapsed().as_millis() as u64;
        let target_offset = target_ms.saturating_sub(self.origin_ms);
        if target_offset > elapsed {
            thread::sleep(Duration::from_millis(target_offset - elapsed));
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub events: u64,
    pub burst_events: u64,
    pub linked: u64,
    pub isolated: u64,
    pub evicted: u64,
    pub dropped_connections: u64,
    pub scale_changes: u64,
}

pub struct Simulation {
    source: TransactionSource,
    inbox: Rc<RefCell<Vec<TransactionEvent>>>,
    graph: TreeGraph,
    scene: SceneCoordinator,
    placement_rng: StdRng,
    now_ms: u64,
    stats: RunStats,
}

impl Simulation {
    pub fn new(config: &LightsConfig, start_ms: u64) -> Result<Self> {
        config.validate()?;

        let (feed_rng, placement_rng) = match config.seed {
            Some(seed) => (
                StdRng::seed_from_u64(seed),
                StdRng::seed_from_u64(seed.wrapping_add(1)),
            ),
            None => (StdRng::from_entropy(), StdRng::from_entropy()),
        };

        let mut source = TransactionSource::new(config.feed, feed_rng)?;
        let inbox = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&inbox);
        source.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        Ok(Self {
            source,
            inbox,
            graph: TreeGraph::new(config.graph)?,
            scene: SceneCoordinator::new(),
            placement_rng,
            now_ms: start_ms,
            stats: RunStats::default(),
        })
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn graph(&self) -> &TreeGraph {
        &self.graph
    }

    pub fn scene(&self) -> &SceneCoordinator {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneCoordinator {
        &mut self.scene
    }

    pub fn source(&self) -> &TransactionSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut TransactionSource {
        &mut self.source
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn start(&mut self) {
        self.source.start(self.now_ms);
    }

    pub fn stop(&mut self) {
        self.source.stop();
    }

    pub fn burst(&mut self, count: usize, interval_ms: u64) {
        self.source.generate_burst(count, interval_ms, self.now_ms);
    }

    pub fn run_until<C: Clock>(&mut self, end_ms: u64, clock: &mut C) -> RunStats {
        while let Some(due) = self.source.next_due().filter(|&due| due <= end_ms) {
            clock.wait_until(due);
            self.now_ms = self.now_ms.max(due);
            self.process_due();
            self.scene.tick(self.now_ms);
        }

        clock.wait_until(end_ms);
        self.now_ms = self.now_ms.max(end_ms);
        self.scene.tick(self.now_ms);
        self.stats
    }

    fn process_due(&mut self) {
        let burst_before = self.source.emitted_burst();
        self.source.tick(self.now_ms);
        self.stats.burst_events += self.source.emitted_burst() - burst_before;

        let events = mem::take(&mut *self.inbox.borrow_mut());

        for event in events {
            let update = self.graph.handle_transaction(&event, &mut self.placement_rng);
            self.stats.events += 1;
            self.stats.linked += update.connections.len() as u64;
            if update.connections.is_empty() {
                self.stats.isolated += 1;
            }
            if update.evicted.is_some() {
                self.stats.evicted += 1;
            }
            self.stats.dropped_connections += update.dropped_connections as u64;
            if update.scale_changed {
                self.stats.scale_changes += 1;
            }
        }
    }
}
