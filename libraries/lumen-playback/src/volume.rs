//! Volume control
//!
//! Stored level and mute flag are independent: muting never touches the
//! stored level, and a level of zero never implies muted.

use crate::types::clamp_unit;

/// Volume controller
#[derive(Debug, Clone)]
pub struct Volume {
    /// Volume level (0.0-1.0)
    level: f32,

    /// Mute state (preserves volume level)
    muted: bool,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial volume, clamped to 0.0-1.0
    pub fn new(level: f32) -> Self {
        Self {
            level: clamp_unit(level, 1.0),
            muted: false,
        }
    }

    /// Set volume level, clamped to 0.0-1.0
    ///
    /// NaN leaves the level unchanged.
    pub fn set_level(&mut self, level: f32) {
        self.level = clamp_unit(level, self.level);
    }

    /// Get current volume level (0.0-1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Toggle mute state
    pub fn toggle_mute(&mut self) {
        self.muted = !self.muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_volume() {
        let vol = Volume::new(0.8);
        assert_eq!(vol.level(), 0.8);
        assert!(!vol.is_muted());
    }

    #[test]
    fn set_volume_level_clamps() {
        let mut vol = Volume::new(0.5);

        vol.set_level(-0.5);
        assert_eq!(vol.level(), 0.0);

        vol.set_level(1.7);
        assert_eq!(vol.level(), 1.0);

        vol.set_level(f32::NAN);
        assert_eq!(vol.level(), 1.0);
    }

    #[test]
    fn zero_volume_does_not_mute() {
        let mut vol = Volume::new(0.8);
        vol.set_level(0.0);
        assert!(!vol.is_muted());
    }

    #[test]
    fn mute_preserves_level() {
        let mut vol = Volume::new(0.8);

        vol.set_muted(true);
        assert!(vol.is_muted());
        assert_eq!(vol.level(), 0.8);

        vol.toggle_mute();
        assert!(!vol.is_muted());
        assert_eq!(vol.level(), 0.8);
    }
}
