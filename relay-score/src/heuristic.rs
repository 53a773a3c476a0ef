/// Deterministic, side-effect-free fallback used whenever the scorer has
/// no trained model. `vector` is `[padded_size, interval, dest_count,
/// device_change_flag]`.
pub fn heuristic_fallback(vector: &[f64]) -> i64 {
    let padded_size = vector.first().copied().unwrap_or(0.0);
    let interval = vector.get(1).copied().unwrap_or(0.0);
    let dest_count = vector.get(2).copied().unwrap_or(1.0);
    let device_change_flag = vector.get(3).copied().unwrap_or(0.0);

    let mut risk: i64 = 70;

    if padded_size >= 50.0 * 1024.0 {
        risk -= 35;
    } else if padded_size >= 10.0 * 1024.0 {
        risk -= 20;
    } else if padded_size >= 2.0 * 1024.0 {
        risk -= 10;
    }

    if interval < 1.0 {
        risk -= 30;
    } else if interval < 5.0 {
        risk -= 10;
    }

    if dest_count >= 10.0 {
        risk -= 30;
    } else if dest_count >= 3.0 {
        risk -= 12;
    }

    if device_change_flag != 0.0 {
        risk -= 30;
    }

    risk.clamp(0, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_concrete_untrained_scenario() {
        // start 70, -10 (>=2 KiB), -30 (<1s), -12 (>=3 dest), -30 (device
        // change) = -12, clamped to 0.
        assert_eq!(heuristic_fallback(&[2048.0, 0.5, 3.0, 1.0]), 0);
    }

    #[test]
    fn clean_submission_scores_high() {
        assert_eq!(heuristic_fallback(&[800.0, 30.0, 1.0, 0.0]), 70);
    }

    #[test]
    fn result_always_in_bounds() {
        for padded in [0.0, 1024.0, 20_000.0, 100_000.0] {
            for interval in [0.1, 2.0, 10.0] {
                for dest in [1.0, 5.0, 20.0] {
                    for device in [0.0, 1.0] {
                        let v = heuristic_fallback(&[padded, interval, dest, device]);
                        assert!((0..=100).contains(&v));
                    }
                }
            }
        }
    }
}
