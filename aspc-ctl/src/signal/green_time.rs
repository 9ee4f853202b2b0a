//! Green duration
//!
//! Share of the cycle budget proportional to the selected approach's share
//! of demand, bounded to `[min_green_s, max_green_s]`. Light traffic is
//! kept from producing short cycles by flooring the total.

use super::tuning::ControllerTuning;

fn finite_non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Green time in whole seconds
pub fn green_time(selected_pcu: f64, total_pcu: f64, tuning: &ControllerTuning) -> u32 {
    let selected = finite_non_negative(selected_pcu);
    let total = finite_non_negative(total_pcu)
        .max(finite_non_negative(tuning.floor_total_pcu))
        .max(f64::MIN_POSITIVE);

    let raw = (selected / total * f64::from(tuning.cycle_budget_s)).round();
    let raw = finite_non_negative(raw);

    // clamp() would panic on inverted bounds
    let bounded = raw
        .max(f64::from(tuning.min_green_s))
        .min(f64::from(tuning.max_green_s));

    bounded as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_light_traffic_floored_to_min() {
        let tuning = ControllerTuning::default();
        // 5/80*120 = 7.5 -> 8 -> raised to 15
        assert_eq!(green_time(5.0, 10.0, &tuning), 15);
    }

    #[test]
    fn test_proportional_share() {
        let tuning = ControllerTuning::default();
        // 40/120*120 = 40
        assert_eq!(green_time(40.0, 120.0, &tuning), 40);
    }

    #[test]
    fn test_heavy_share_capped_at_max() {
        let tuning = ControllerTuning::default();
        assert_eq!(green_time(90.0, 100.0, &tuning), 60);
    }

    #[test]
    fn test_garbage_inputs_stay_in_bounds() {
        let tuning = ControllerTuning::default();
        assert_eq!(green_time(f64::NAN, 10.0, &tuning), 15);
        assert_eq!(green_time(-5.0, -10.0, &tuning), 15);
        assert_eq!(green_time(f64::INFINITY, 0.0, &tuning), 15);
    }

    #[test]
    fn test_inverted_bounds_do_not_panic() {
        let tuning = ControllerTuning {
            min_green_s: 50,
            max_green_s: 20,
            ..Default::default()
        };
        assert_eq!(green_time(10.0, 100.0, &tuning), 20);
    }
}
