//! Jittered exponential backoff.
//!
//! The delay before attempt `n` (0-based) is drawn uniformly from
//! `[min, max]`, scaled by `multiplier^n`, and then raised to at least
//! `previous * multiplier`. It therefore stays inside
//! `[min * m^n, max * m^n]` while never shrinking between attempts.

use std::time::Duration;

use card_stash_core::AcquireConfig;
use card_stash_core::config::secs;
use rand::Rng;

/// Delay and penalty windows, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub min_delay: f64,
    pub max_delay: f64,
    pub multiplier: f64,
    pub penalty_min: f64,
    pub penalty_max: f64,
}

impl BackoffPolicy {
    pub fn from_config(config: &AcquireConfig) -> Self {
        Self {
            min_delay: config.min_delay_secs,
            max_delay: config.max_delay_secs,
            multiplier: config.backoff_multiplier,
            penalty_min: config.penalty_min_secs,
            penalty_max: config.penalty_max_secs,
        }
    }

    /// Fresh per-asset schedule.
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule {
            policy: *self,
            attempt: 0,
            previous: 0.0,
        }
    }

    /// Extra wait after a rate-limited attempt `attempt`, doubling per attempt.
    pub fn penalty<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = uniform(rng, self.penalty_min, self.penalty_max);
        secs(base * 2f64.powi(attempt as i32))
    }
}

/// Monotonic delay sequence for one asset.
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    policy: BackoffPolicy,
    attempt: u32,
    previous: f64,
}

impl BackoffSchedule {
    pub fn next_delay<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Duration {
        let p = &self.policy;
        let scale = p.multiplier.powi(self.attempt as i32);
        let drawn = uniform(rng, p.min_delay, p.max_delay) * scale;
        let delay = drawn.max(self.previous * p.multiplier);

        self.previous = delay;
        self.attempt += 1;
        secs(delay)
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if max > min && (max - min).is_finite() {
        rng.random_range(min..=max)
    } else {
        min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn policy(min: f64, max: f64, multiplier: f64) -> BackoffPolicy {
        BackoffPolicy {
            min_delay: min,
            max_delay: max,
            multiplier,
            penalty_min: 10.0,
            penalty_max: 20.0,
        }
    }

    #[test]
    fn delays_stay_in_scaled_window() {
        let p = policy(2.0, 5.0, 1.5);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut schedule = p.schedule();
            for n in 0..6 {
                let d = schedule.next_delay(&mut rng).as_secs_f64();
                let scale = 1.5f64.powi(n);
                assert!(d >= 2.0 * scale - 1e-9, "attempt {n}: {d}");
                assert!(d <= 5.0 * scale + 1e-9, "attempt {n}: {d}");
            }
        }
    }

    #[test]
    fn delays_strictly_increase_with_growth() {
        let p = policy(2.0, 5.0, 1.5);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut schedule = p.schedule();
            let delays: Vec<Duration> = (0..5).map(|_| schedule.next_delay(&mut rng)).collect();
            assert!(delays.windows(2).all(|w| w[1] > w[0]), "{delays:?}");
        }
    }

    #[test]
    fn delays_never_shrink_without_growth() {
        let p = policy(2.0, 5.0, 1.0);
        let mut rng = StdRng::seed_from_u64(7);
        let mut schedule = p.schedule();
        let delays: Vec<Duration> = (0..8).map(|_| schedule.next_delay(&mut rng)).collect();
        assert!(delays.windows(2).all(|w| w[1] >= w[0]), "{delays:?}");
    }

    #[test]
    fn fixed_window_is_deterministic() {
        let p = policy(1.0, 1.0, 2.0);
        let mut rng = StdRng::seed_from_u64(0);
        let mut schedule = p.schedule();
        assert_eq!(schedule.next_delay(&mut rng), Duration::from_secs(1));
        assert_eq!(schedule.next_delay(&mut rng), Duration::from_secs(2));
        assert_eq!(schedule.next_delay(&mut rng), Duration::from_secs(4));
    }

    #[test]
    fn oversized_window_saturates() {
        let p = policy(0.0, 1e300, 1e10);
        let mut rng = StdRng::seed_from_u64(3);
        let mut schedule = p.schedule();
        for _ in 0..4 {
            schedule.next_delay(&mut rng);
        }
        assert_eq!(schedule.next_delay(&mut rng), Duration::MAX);
    }

    #[test]
    fn penalty_doubles_per_attempt() {
        let p = BackoffPolicy {
            penalty_min: 10.0,
            penalty_max: 10.0,
            ..policy(0.0, 0.0, 1.0)
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(p.penalty(0, &mut rng), Duration::from_secs(10));
        assert_eq!(p.penalty(2, &mut rng), Duration::from_secs(40));
    }
}
