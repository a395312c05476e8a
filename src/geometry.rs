use std::f64::consts::{PI, TAU};
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::error::{LightsError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    pub fn lerp(self, other: Self, t: f64) -> Self {
        self + (other - self) * t
    }

    pub fn radial(self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn azimuth(self) -> f64 {
        self.z.atan2(self.x)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

pub fn angular_distance(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().rem_euclid(TAU);
    if diff > PI { TAU - diff } else { diff }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeShape {
    pub tree_height: f64,
    pub base_width: f64,
    pub levels: usize,
}

impl Default for TreeShape {
    fn default() -> Self {
        Self {
            tree_height: 8.0,
            base_width: 4.0,
            levels: 10,
        }
    }
}

impl TreeShape {
    pub fn validate(&self) -> Result<()> {
        if !(self.tree_height.is_finite() && self.tree_height > 0.0) {
            return Err(LightsError::InvalidConfig(format!(
                "tree_height must be positive, got {}",
                self.tree_height
            )));
        }
        if !(self.base_width.is_finite() && self.base_width > 0.0) {
            return Err(LightsError::InvalidConfig(format!(
                "base_width must be positive, got {}",
                self.base_width
            )));
        }
        if self.levels < 2 {
            return Err(LightsError::InvalidConfig(format!(
                "levels must be at least 2, got {}",
                self.levels
            )));
        }
        Ok(())
    }

    pub fn scaled_height(&self, scale: f64) -> f64 {
        self.tree_height * scale
    }

    pub fn surface_radius(&self, y: f64, scale: f64) -> f64 {
        self.base_width * (1.0 - y / self.scaled_height(scale)) * scale
    }

    pub fn surface_point(&self, azimuth: f64, y: f64, scale: f64) -> Vec3 {
        let radius = self.surface_radius(y, scale);
        Vec3::new(azimuth.cos() * radius, y, azimuth.sin() * radius)
    }

    pub fn project(&self, position: Vec3, scale: f64) -> Vec3 {
        self.surface_point(position.azimuth(), position.y, scale)
    }

    pub fn surface_deviation(&self, position: Vec3, scale: f64) -> f64 {
        (position.radial() - self.surface_radius(position.y, scale)).abs()
    }

    pub fn ring_size(&self, level: usize) -> usize {
        let fraction = 1.0 - level as f64 / self.levels as f64;
        ((16.0 * fraction).floor() as usize).max(8)
    }

    pub fn base_node_count(&self) -> usize {
        (0..self.levels).map(|level| self.ring_size(level)).sum()
    }
}
