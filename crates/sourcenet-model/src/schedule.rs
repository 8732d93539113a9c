//! Learning-rate adaptation policies.
//!
//! Two mutually exclusive strategies: monitored-plateau reduction
//! (multiplicative decay when the monitored loss stagnates, with a
//! floor) and deterministic per-epoch exponential decay.

use sourcenet_core::LrPolicy;

const IMPROVEMENT_EPS: f64 = 1e-8;

/// Stateful schedule, stepped once per epoch with the monitored loss.
#[derive(Debug, Clone)]
pub enum LrSchedule {
    Plateau {
        factor: f64,
        patience: usize,
        min_lr: f64,
        best: f64,
        stale: usize,
    },
    Exponential {
        gamma: f64,
        base_lr: f64,
    },
}

impl LrSchedule {
    pub fn new(policy: LrPolicy, base_lr: f64) -> Self {
        match policy {
            LrPolicy::Plateau {
                factor,
                patience,
                min_lr,
            } => LrSchedule::Plateau {
                factor,
                patience,
                min_lr,
                best: f64::INFINITY,
                stale: 0,
            },
            LrPolicy::Exponential { gamma } => LrSchedule::Exponential { gamma, base_lr },
        }
    }

    /// Learning rate to use for the next epoch, given this epoch's index,
    /// monitored loss, and current learning rate.
    pub fn step(&mut self, epoch: usize, monitored_loss: f64, current_lr: f64) -> f64 {
        match self {
            LrSchedule::Plateau {
                factor,
                patience,
                min_lr,
                best,
                stale,
            } => {
                if monitored_loss < *best - IMPROVEMENT_EPS {
                    *best = monitored_loss;
                    *stale = 0;
                    current_lr
                } else {
                    *stale += 1;
                    if *stale >= *patience {
                        *stale = 0;
                        (current_lr * *factor).max(*min_lr)
                    } else {
                        current_lr
                    }
                }
            }
            LrSchedule::Exponential { gamma, base_lr } => {
                *base_lr * gamma.powi(epoch as i32 + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plateau_reduces_after_patience() {
        let policy = LrPolicy::Plateau {
            factor: 0.5,
            patience: 3,
            min_lr: 1e-6,
        };
        let mut schedule = LrSchedule::new(policy, 1e-3);
        let mut lr = 1e-3;

        lr = schedule.step(0, 1.0, lr); // improvement
        assert_eq!(lr, 1e-3);

        for epoch in 1..=2 {
            lr = schedule.step(epoch, 1.0, lr); // stagnating
            assert_eq!(lr, 1e-3);
        }

        lr = schedule.step(3, 1.0, lr); // third stale epoch trips it
        assert!((lr - 5e-4).abs() < 1e-12);
    }

    #[test]
    fn plateau_respects_floor() {
        let policy = LrPolicy::Plateau {
            factor: 0.1,
            patience: 1,
            min_lr: 1e-4,
        };
        let mut schedule = LrSchedule::new(policy, 1e-3);
        let mut lr = schedule.step(0, 1.0, 1e-3);
        for epoch in 1..20 {
            lr = schedule.step(epoch, 1.0, lr);
        }
        assert!((lr - 1e-4).abs() < 1e-15);
    }

    #[test]
    fn plateau_resets_on_improvement() {
        let policy = LrPolicy::Plateau {
            factor: 0.5,
            patience: 2,
            min_lr: 1e-6,
        };
        let mut schedule = LrSchedule::new(policy, 1e-3);
        let mut lr = 1e-3;

        lr = schedule.step(0, 1.0, lr);
        lr = schedule.step(1, 1.1, lr); // stale 1
        lr = schedule.step(2, 0.5, lr); // improvement resets
        lr = schedule.step(3, 0.6, lr); // stale 1 again
        assert_eq!(lr, 1e-3);
    }

    #[test]
    fn exponential_matches_closed_form() {
        let mut schedule = LrSchedule::new(LrPolicy::Exponential { gamma: 0.9 }, 1e-2);
        for epoch in 0..10 {
            let lr = schedule.step(epoch, 1.0, 0.0);
            let expected = 1e-2 * 0.9f64.powi(epoch as i32 + 1);
            assert!((lr - expected).abs() < 1e-15);
        }
    }
}
