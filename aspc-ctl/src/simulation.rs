//! Synthetic demand
//!
//! Stands in for the sensing layer when no detector feed is attached.
//! Periodically pushes randomized vehicle mixes into every observed
//! junction, occasionally surging one approach to mimic a platoon.

use std::sync::Arc;
use std::time::Duration;

use aspc_common::events::Direction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::runtime::JunctionRegistry;
use crate::signal::{VehicleClass, VehicleCounts};

/// Typical share of each class in mixed urban traffic
const TRAFFIC_MIX: [(VehicleClass, f64); 6] = [
    (VehicleClass::Car, 0.45),
    (VehicleClass::TwoWheeler, 0.30),
    (VehicleClass::AutoRickshaw, 0.10),
    (VehicleClass::Bus, 0.05),
    (VehicleClass::Truck, 0.05),
    (VehicleClass::Bicycle, 0.05),
];

/// Vehicles per approach per reading, before any spike
const BASE_VEHICLES: std::ops::RangeInclusive<u32> = 5..=30;

/// One full set of approach readings
#[derive(Debug, Clone)]
pub struct DemandReading {
    pub counts: Vec<(Direction, VehicleCounts)>,
    /// Approach that surged this round, if any
    pub spike: Option<(Direction, u32)>,
}

/// Random demand source; seedable for reproducible runs
pub struct DemandGenerator {
    rng: StdRng,
    spike_probability: f64,
}

impl DemandGenerator {
    pub fn new(spike_probability: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let spike_probability = if spike_probability.is_nan() {
            0.0
        } else {
            spike_probability.clamp(0.0, 1.0)
        };
        Self {
            rng,
            spike_probability,
        }
    }

    /// Readings for all four approaches
    pub fn next_reading(&mut self) -> DemandReading {
        let spike = if self.rng.gen_bool(self.spike_probability) {
            let direction = Direction::ALL[self.rng.gen_range(0..Direction::ALL.len())];
            let factor = self.rng.gen_range(3..=5);
            Some((direction, factor))
        } else {
            None
        };

        let counts = Direction::ALL
            .iter()
            .map(|d| {
                let mut vehicles = self.rng.gen_range(BASE_VEHICLES);
                if let Some((spiked, factor)) = spike {
                    if spiked == *d {
                        vehicles *= factor;
                    }
                }
                (*d, self.compose(vehicles))
            })
            .collect();

        DemandReading { counts, spike }
    }

    /// Split a vehicle total across classes with some jitter
    fn compose(&mut self, vehicles: u32) -> VehicleCounts {
        let mut counts = VehicleCounts::new();
        for (class, share) in TRAFFIC_MIX {
            let jitter = self.rng.gen_range(0.8..1.2);
            let n = (f64::from(vehicles) * share * jitter).round() as i64;
            counts.set(class, n);
        }
        counts
    }
}

/// Feed every observed junction until cancelled
pub fn spawn_simulator(
    registry: Arc<JunctionRegistry>,
    config: &SimulationConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut generator = DemandGenerator::new(config.spike_probability, config.seed);
    let period = Duration::from_millis(config.interval_ms.max(1));
    info!(
        "Demand simulator running (every {:?}, spike probability {})",
        period, config.spike_probability
    );

    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            for junction_id in registry.observed_junctions().await {
                let reading = generator.next_reading();
                if let Some((direction, factor)) = reading.spike {
                    debug!("Simulated x{} surge on {} {}", factor, junction_id, direction);
                }
                for (direction, counts) in reading.counts {
                    // Junction may stop between listing and update; nothing to do then
                    let _ = registry
                        .update_approach_demand(&junction_id, direction, counts)
                        .await;
                }
            }
        }
        info!("Demand simulator stopped");
    })
}
