//! Combined configuration document

use crate::error::Result;
use lumen_analysis::AnalyserConfig;
use lumen_playback::PlayerConfig;
use serde::{Deserialize, Serialize};

/// Playback and analyser settings loaded together
///
/// ```json
/// { "playback": { "volume": 0.5, "repeat": "all" }, "analyser": { "fftSize": 512 } }
/// ```
///
/// Either section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LumenConfig {
    pub playback: PlayerConfig,
    pub analyser: AnalyserConfig,
}

impl LumenConfig {
    /// Parse from JSON, clamping out-of-range values
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LumenConfig = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    pub fn normalized(self) -> Self {
        Self {
            playback: self.playback.normalized(),
            analyser: self.analyser.normalized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_playback::RepeatMode;

    #[test]
    fn partial_document_keeps_defaults() {
        let config = LumenConfig::from_json(r#"{"playback": {"repeat": "all"}}"#).unwrap();
        assert_eq!(config.playback.repeat, RepeatMode::All);
        assert_eq!(config.analyser, AnalyserConfig::default());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config =
            LumenConfig::from_json(r#"{"playback": {"volume": 3.0}, "analyser": {"fftSize": 7}}"#)
                .unwrap();
        assert_eq!(config.playback.volume, 1.0);
        assert!(config.analyser.fft_size.is_power_of_two());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(LumenConfig::from_json("{ nope").is_err());
    }
}
