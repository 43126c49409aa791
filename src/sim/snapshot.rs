//! Render-facing frame snapshots
//!
//! The simulation runs at a fixed 1 ms step, the display at whatever rate it
//! likes. A renderer keeps the last two snapshots and blends them with
//! [`FrameSnapshot::interpolate`].

use std::f32::consts::{PI, TAU};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::hit::HitKind;
use super::state::{BallId, ItemId};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub id: BallId,
    pub pos: Vec3,
    pub vel: Vec3,
    pub orientation: Quat,
    pub radius: f32,
    pub frozen: bool,
}

/// Angle of a flipper, gate or spinner (radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoverSnapshot {
    pub item: ItemId,
    pub kind: HitKind,
    pub angle: f32,
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    /// Simulated time in microseconds
    pub time_us: u64,
    pub balls: Vec<BallSnapshot>,
    pub movers: Vec<MoverSnapshot>,
}

impl FrameSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Blend two snapshots, `alpha` 0 giving `prev` and 1 giving `next`
    ///
    /// Balls are matched by id. A ball missing from `prev` is shown at its
    /// `next` state; one missing from `next` is gone.
    pub fn interpolate(prev: &FrameSnapshot, next: &FrameSnapshot, alpha: f32) -> FrameSnapshot {
        let alpha = alpha.clamp(0.0, 1.0);
        let dt = next.time_us.saturating_sub(prev.time_us) as f64;

        let balls = next
            .balls
            .iter()
            .map(|b| match prev.balls.iter().find(|p| p.id == b.id) {
                Some(p) => BallSnapshot {
                    pos: p.pos.lerp(b.pos, alpha),
                    vel: p.vel.lerp(b.vel, alpha),
                    orientation: p.orientation.slerp(b.orientation, alpha),
                    ..*b
                },
                None => *b,
            })
            .collect();

        let movers = next
            .movers
            .iter()
            .map(|m| match prev.movers.iter().find(|p| p.item == m.item) {
                Some(p) => {
                    let mut delta = m.angle - p.angle;
                    if m.kind == HitKind::Spinner {
                        // spinners wrap around, take the short way
                        delta = (delta + PI).rem_euclid(TAU) - PI;
                    }
                    MoverSnapshot {
                        angle: p.angle + delta * alpha,
                        ..*m
                    }
                }
                None => *m,
            })
            .collect();

        FrameSnapshot {
            time_us: prev.time_us + (dt * alpha as f64) as u64,
            balls,
            movers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(id: u32, x: f32) -> BallSnapshot {
        BallSnapshot {
            id: BallId(id),
            pos: Vec3::new(x, 0.0, 25.0),
            vel: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            radius: 25.0,
            frozen: false,
        }
    }

    fn frame(time_us: u64, balls: Vec<BallSnapshot>, angle: f32) -> FrameSnapshot {
        FrameSnapshot {
            time_us,
            balls,
            movers: vec![MoverSnapshot {
                item: ItemId(1),
                kind: HitKind::Flipper,
                angle,
            }],
        }
    }

    #[test]
    fn test_interpolate_halfway() {
        let prev = frame(1000, vec![ball(1, 0.0)], 0.0);
        let next = frame(2000, vec![ball(1, 10.0), ball(2, 50.0)], 1.0);
        let mid = FrameSnapshot::interpolate(&prev, &next, 0.5);

        assert_eq!(mid.time_us, 1500);
        assert!((mid.balls[0].pos.x - 5.0).abs() < 1e-5);
        // new ball appears at its current position
        assert_eq!(mid.balls[1], ball(2, 50.0));
        assert!((mid.movers[0].angle - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_interpolate_clamps_alpha() {
        let prev = frame(0, vec![ball(1, 0.0)], 0.0);
        let next = frame(1000, vec![ball(1, 10.0)], 1.0);
        let out = FrameSnapshot::interpolate(&prev, &next, 3.0);
        assert_eq!(out, next);
    }

    #[test]
    fn test_spinner_takes_short_way() {
        let spinner = |angle| FrameSnapshot {
            time_us: 0,
            balls: Vec::new(),
            movers: vec![MoverSnapshot {
                item: ItemId(4),
                kind: HitKind::Spinner,
                angle,
            }],
        };
        let prev = spinner(TAU - 0.1);
        let next = spinner(0.1);
        let mid = FrameSnapshot::interpolate(&prev, &next, 0.5);
        assert!((mid.movers[0].angle - TAU).abs() < 1e-4);
    }

    #[test]
    fn test_json_round_trip() {
        let snap = frame(42, vec![ball(3, 1.5)], 0.25);
        let back = FrameSnapshot::from_json(&snap.to_json().unwrap()).unwrap();
        assert_eq!(snap, back);
    }
}
