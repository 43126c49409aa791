//! Physics settings
//!
//! Table-wide tuning that the simulation context is built from. Serialized
//! as JSON so tables can ship their own tuning.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::deg_to_rad;
use crate::error::{PhysicsError, Result};

/// Difficulty preset levels
///
/// Difficulty weights the random scatter applied on wall impacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DifficultyPreset {
    Easy,
    #[default]
    Medium,
    Hard,
    Custom,
}

impl DifficultyPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyPreset::Easy => "Easy",
            DifficultyPreset::Medium => "Medium",
            DifficultyPreset::Hard => "Hard",
            DifficultyPreset::Custom => "Custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(DifficultyPreset::Easy),
            "medium" | "med" => Some(DifficultyPreset::Medium),
            "hard" => Some(DifficultyPreset::Hard),
            "custom" => Some(DifficultyPreset::Custom),
            _ => None,
        }
    }

    /// Scatter weight for this preset (`None` keeps a custom value)
    pub fn scatter_weight(&self) -> Option<f32> {
        match self {
            DifficultyPreset::Easy => Some(0.0),
            DifficultyPreset::Medium => Some(0.2),
            DifficultyPreset::Hard => Some(1.0),
            DifficultyPreset::Custom => None,
        }
    }

    /// Table slope in degrees (steeper tables play faster)
    pub fn slope_deg(&self) -> Option<f32> {
        match self {
            DifficultyPreset::Easy => Some(5.0),
            DifficultyPreset::Medium => Some(6.0),
            DifficultyPreset::Hard => Some(7.0),
            DifficultyPreset::Custom => None,
        }
    }
}

/// Surface response coefficients shared by every hit shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Fraction of normal velocity kept after impact
    pub elasticity: f32,
    /// Reduces elasticity at high impact speed (0 = off)
    pub elasticity_falloff: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
    /// Random deflection in radians (negative = table hard scatter)
    pub scatter: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.3,
            elasticity_falloff: 0.0,
            friction: 0.3,
            scatter: 0.0,
        }
    }
}

impl Material {
    pub fn new(elasticity: f32, friction: f32) -> Self {
        Self {
            elasticity,
            friction,
            ..Default::default()
        }
    }

    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.elasticity_falloff = falloff;
        self
    }

    pub fn with_scatter(mut self, scatter: f32) -> Self {
        self.scatter = scatter;
        self
    }
}

/// Physics settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Difficulty preset
    pub difficulty: DifficultyPreset,

    // === Gravity ===
    /// Gravity strength as a multiple of earth gravity
    pub gravity_strength: f32,
    /// Playfield slope toward the player (degrees)
    pub slope_deg: f32,

    // === Table ===
    /// Playfield surface height
    pub playfield_height: f32,
    /// Absolute z of the glass, must be above `playfield_height`
    pub glass_height: f32,
    /// Playfield surface material
    pub playfield: Material,
    /// Glass elasticity (the glass is frictionless)
    pub glass_elasticity: f32,

    // === Randomness ===
    /// Scatter weight applied to every wall impact (0 - 1)
    pub scatter_weight: f32,
    /// Scatter used by materials with a negative scatter value (radians)
    pub hard_scatter: f32,
    /// Seed for the default random source
    pub seed: u64,

    // === Timing ===
    /// Fixed physics step in microseconds
    pub step_time_us: u64,
    /// Physics steps between two animation ticks
    pub animation_interval_steps: u32,

    // === Balls ===
    pub ball_radius: f32,
    pub ball_mass: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            difficulty: DifficultyPreset::Medium,

            gravity_strength: 1.0,
            slope_deg: 6.0,

            playfield_height: 0.0,
            glass_height: 400.0,
            playfield: Material {
                elasticity: 0.25,
                elasticity_falloff: 0.0,
                friction: 0.075,
                scatter: 0.0,
            },
            glass_elasticity: 0.2,

            scatter_weight: 0.2,
            hard_scatter: 0.0,
            seed: 0x5EED,

            step_time_us: PHYSICS_STEPTIME,
            animation_interval_steps: 10,

            ball_radius: BALL_RADIUS,
            ball_mass: BALL_MASS,
        }
    }
}

impl PhysicsSettings {
    /// Create settings from a difficulty preset (applies preset defaults)
    pub fn from_preset(preset: DifficultyPreset) -> Self {
        let mut settings = Self::default();
        settings.apply_preset(preset);
        settings
    }

    /// Apply a difficulty preset (updates difficulty-dependent settings)
    pub fn apply_preset(&mut self, preset: DifficultyPreset) {
        self.difficulty = preset;
        if let Some(weight) = preset.scatter_weight() {
            self.scatter_weight = weight;
        }
        if let Some(slope) = preset.slope_deg() {
            self.slope_deg = slope;
        }
    }

    /// Gravity vector for the sloped playfield (table units per tick²)
    pub fn gravity(&self) -> Vec3 {
        let slope = deg_to_rad(self.slope_deg);
        let g = GRAVITYCONST * self.gravity_strength;
        Vec3::new(0.0, slope.sin() * g, -slope.cos() * g)
    }

    /// Check the settings describe a usable table
    pub fn validate(&self) -> Result<()> {
        if !(self.ball_radius > 0.0) {
            return Err(PhysicsError::InvalidSettings(format!(
                "ball_radius must be positive, got {}",
                self.ball_radius
            )));
        }
        if !(self.ball_mass > 0.0) {
            return Err(PhysicsError::InvalidSettings(format!(
                "ball_mass must be positive, got {}",
                self.ball_mass
            )));
        }
        if self.step_time_us == 0 || self.step_time_us > DEFAULT_STEPTIME {
            // swept ball bounds cover one time unit of travel
            return Err(PhysicsError::InvalidSettings(format!(
                "step_time_us must be in 1..={DEFAULT_STEPTIME}, got {}",
                self.step_time_us
            )));
        }
        if self.glass_height <= self.playfield_height {
            return Err(PhysicsError::InvalidSettings(format!(
                "glass_height {} must be above playfield_height {}",
                self.glass_height, self.playfield_height
            )));
        }
        if !(-90.0..=90.0).contains(&self.slope_deg) {
            return Err(PhysicsError::InvalidSettings(format!(
                "slope_deg out of range: {}",
                self.slope_deg
            )));
        }
        Ok(())
    }

    /// Parse and validate settings from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded physics settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        log::info!("Physics settings saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(PhysicsSettings::default().validate().is_ok());
    }

    #[test]
    fn test_gravity_points_down_and_toward_player() {
        let g = PhysicsSettings::default().gravity();
        assert!(g.z < 0.0);
        assert!(g.y > 0.0);
        assert!((g.length() - GRAVITYCONST).abs() < 1e-4);
    }

    #[test]
    fn test_preset_applies_scatter() {
        let s = PhysicsSettings::from_preset(DifficultyPreset::Hard);
        assert_eq!(s.scatter_weight, 1.0);
        assert_eq!(s.slope_deg, 7.0);

        let mut custom = PhysicsSettings::default();
        custom.scatter_weight = 0.42;
        custom.apply_preset(DifficultyPreset::Custom);
        assert_eq!(custom.scatter_weight, 0.42);
    }

    #[test]
    fn test_preset_parse() {
        assert_eq!(DifficultyPreset::parse("MED"), Some(DifficultyPreset::Medium));
        assert_eq!(DifficultyPreset::parse("nope"), None);
        assert_eq!(DifficultyPreset::Hard.as_str(), "Hard");
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let s = PhysicsSettings::from_json(r#"{ "slope_deg": 4.5, "seed": 7 }"#).unwrap();
        assert_eq!(s.slope_deg, 4.5);
        assert_eq!(s.seed, 7);
        assert_eq!(s.ball_radius, BALL_RADIUS);
    }

    #[test]
    fn test_json_rejects_invalid() {
        let err = PhysicsSettings::from_json(r#"{ "ball_radius": 0.0 }"#).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidSettings(_)));
        let err = PhysicsSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, PhysicsError::Json(_)));
    }

    #[test]
    fn test_step_time_range() {
        let mut settings = PhysicsSettings::default();
        settings.step_time_us = 2000;
        assert!(settings.validate().is_ok());
        settings.step_time_us = 0;
        assert!(settings.validate().is_err());
        settings.step_time_us = DEFAULT_STEPTIME + 1;
        assert!(matches!(settings.validate(), Err(PhysicsError::InvalidSettings(_))));
    }

    #[test]
    fn test_glass_height_is_absolute() {
        let mut settings = PhysicsSettings {
            playfield_height: 100.0,
            glass_height: 150.0,
            ..Default::default()
        };
        assert!(settings.validate().is_ok());
        // 50 above the playfield would be fine, z = 50 is not
        settings.glass_height = 50.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_file() {
        let path = std::env::temp_dir().join("pinball_physics_settings_test.json");
        let mut s = PhysicsSettings::default();
        s.glass_height = 321.0;
        s.save(&path).unwrap();
        let loaded = PhysicsSettings::load(&path).unwrap();
        assert_eq!(loaded.glass_height, 321.0);
        let _ = std::fs::remove_file(&path);
    }
}
