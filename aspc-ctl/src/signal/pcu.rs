//! Passenger Car Unit weighting
//!
//! Converts per-class vehicle counts into a single demand figure. Output
//! is non-negative and monotonic in every count for any non-negative
//! weight table; negative or non-finite weights are treated as zero.

use serde::{Deserialize, Serialize};

use super::approach::{VehicleClass, VehicleCounts};

/// Conversion factor per vehicle class
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PcuWeights {
    pub two_wheeler: f64,
    pub car: f64,
    pub bus: f64,
    pub truck: f64,
    pub auto_rickshaw: f64,
    pub bicycle: f64,
}

impl Default for PcuWeights {
    fn default() -> Self {
        Self {
            two_wheeler: 0.5,
            car: 1.0,
            bus: 3.0,
            truck: 3.0,
            auto_rickshaw: 0.8,
            bicycle: 0.2,
        }
    }
}

impl PcuWeights {
    fn raw(&self, class: VehicleClass) -> f64 {
        match class {
            VehicleClass::TwoWheeler => self.two_wheeler,
            VehicleClass::Car => self.car,
            VehicleClass::Bus => self.bus,
            VehicleClass::Truck => self.truck,
            VehicleClass::AutoRickshaw => self.auto_rickshaw,
            VehicleClass::Bicycle => self.bicycle,
        }
    }

    /// Effective factor for a class, never negative
    pub fn factor(&self, class: VehicleClass) -> f64 {
        let raw = self.raw(class);
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for class in VehicleClass::ALL {
            let raw = self.raw(class);
            if !raw.is_finite() || raw < 0.0 {
                return Err(format!(
                    "pcu weight for {} must be a non-negative number (got {})",
                    class.as_str(),
                    raw
                ));
            }
        }
        Ok(())
    }
}

/// Weighted sum of counts
pub fn weigh(counts: &VehicleCounts, weights: &PcuWeights) -> f64 {
    counts
        .iter()
        .map(|(class, count)| f64::from(count) * weights.factor(class))
        .sum()
}

/// Display-only queue length for a PCU figure
pub fn queue_estimate(pcu: f64, meters_per_pcu: f64) -> f64 {
    if !pcu.is_finite() || !meters_per_pcu.is_finite() {
        return 0.0;
    }
    pcu.max(0.0) * meters_per_pcu.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let counts = VehicleCounts::new()
            .with(VehicleClass::Car, 10)
            .with(VehicleClass::Bus, 2)
            .with(VehicleClass::TwoWheeler, 4);
        let pcu = weigh(&counts, &PcuWeights::default());
        assert!((pcu - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_counts_weigh_zero() {
        assert_eq!(weigh(&VehicleCounts::new(), &PcuWeights::default()), 0.0);
    }

    #[test]
    fn test_negative_weight_treated_as_zero() {
        let weights = PcuWeights {
            bus: -3.0,
            ..Default::default()
        };
        let counts = VehicleCounts::new().with(VehicleClass::Bus, 5);
        assert_eq!(weigh(&counts, &weights), 0.0);
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_monotonic_in_each_class() {
        let weights = PcuWeights::default();
        for class in VehicleClass::ALL {
            let base = VehicleCounts::new().with(class, 3).with(VehicleClass::Car, 1);
            let more = base.clone().with(class, 4);
            assert!(weigh(&more, &weights) >= weigh(&base, &weights));
        }
    }

    #[test]
    fn test_queue_estimate_never_negative() {
        assert_eq!(queue_estimate(-4.0, 7.0), 0.0);
        assert_eq!(queue_estimate(f64::NAN, 7.0), 0.0);
        assert!((queue_estimate(10.0, 7.0) - 70.0).abs() < 1e-9);
    }
}
