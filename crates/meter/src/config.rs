use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::levels::MAX_CHANNELS;

/// Lowest accepted `minimum_level`, in dB.
pub const MIN_LEVEL_FLOOR: f32 = -200.0;
/// Upper bound for every duration and rate, in seconds (or dB per second).
pub const MAX_SECONDS: f32 = 3600.0;
/// Upper bound for every [`LayoutConfig`] size, in pixels.
pub const MAX_LAYOUT_PIXELS: i32 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Foreground (active) and background (inactive) shades of one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandColors {
    pub foreground: Rgb,
    pub background: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZonePalette {
    pub nominal: BandColors,
    pub warning: BandColors,
    pub error: BandColors,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub active: ZonePalette,
    pub muted: ZonePalette,
    pub clip: Rgb,
    pub major_tick: Rgb,
    pub minor_tick: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            active: ZonePalette {
                nominal: BandColors {
                    foreground: Rgb(0x4c, 0xff, 0x4c),
                    background: Rgb(0x26, 0x7f, 0x26),
                },
                warning: BandColors {
                    foreground: Rgb(0xff, 0xff, 0x4c),
                    background: Rgb(0x7f, 0x7f, 0x26),
                },
                error: BandColors {
                    foreground: Rgb(0xff, 0x4c, 0x4c),
                    background: Rgb(0x7f, 0x26, 0x26),
                },
            },
            muted: ZonePalette {
                nominal: BandColors {
                    foreground: Rgb(0xa3, 0xa3, 0xa3),
                    background: Rgb(0x5a, 0x5a, 0x5a),
                },
                warning: BandColors {
                    foreground: Rgb(0xd9, 0xd9, 0xd9),
                    background: Rgb(0x75, 0x75, 0x75),
                },
                error: BandColors {
                    foreground: Rgb(0x71, 0x71, 0x71),
                    background: Rgb(0x41, 0x41, 0x41),
                },
            },
            clip: Rgb(0xff, 0xff, 0xff),
            major_tick: Rgb(0xff, 0xff, 0xff),
            minor_tick: Rgb(0xcc, 0xcc, 0xcc),
        }
    }
}

/// Pixel sizes of the lanes, strips and marks. All values are in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub lane_thickness: i32,
    pub lane_gap: i32,
    pub input_strip_length: i32,
    pub input_strip_gap: i32,
    pub mark_width: i32,
    pub scale_gap: i32,
    pub major_tick_length: i32,
    pub minor_tick_length: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            lane_thickness: 4,
            lane_gap: 1,
            input_strip_length: 4,
            input_strip_gap: 1,
            mark_width: 3,
            scale_gap: 1,
            major_tick_length: 3,
            minor_tick_length: 1,
        }
    }
}

/// Thresholds are in dB, durations in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    pub channels: usize,

    pub minimum_level: f32,
    pub warning_level: f32,
    pub error_level: f32,
    pub clip_level: f32,
    pub minimum_input_level: f32,

    pub peak_decay_rate: f32,
    pub magnitude_integration_time: f32,
    pub peak_hold_duration: f32,
    pub input_peak_hold_duration: f32,

    pub idle_timeout: f32,
    pub clip_hold: f32,
    pub refresh_interval: f32,
    pub max_tick_interval: f32,

    pub layout: LayoutConfig,
    pub palette: Palette,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            minimum_level: -60.0,
            warning_level: -20.0,
            error_level: -9.0,
            clip_level: -0.5,
            minimum_input_level: -50.0,
            // 20 dB over 1.7 seconds
            peak_decay_rate: 11.76,
            magnitude_integration_time: 0.3,
            peak_hold_duration: 20.0,
            input_peak_hold_duration: 1.0,
            idle_timeout: 0.5,
            clip_hold: 1.0,
            refresh_interval: 1.0 / 60.0,
            max_tick_interval: 0.1,
            layout: LayoutConfig::default(),
            palette: Palette::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid meter config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("minimum_level must be in {floor}..0 dB, got {0}", floor = MIN_LEVEL_FLOOR)]
    MinimumLevel(f32),

    #[error(
        "thresholds must satisfy minimum_level <= warning_level <= error_level <= clip_level <= 0"
    )]
    ThresholdOrder,

    #[error("{name} must be in (0, {max}], got {value}", max = MAX_SECONDS)]
    Duration { name: &'static str, value: f32 },

    #[error("layout.{name} must be in {min}..={max} px, got {value}", max = MAX_LAYOUT_PIXELS)]
    Layout {
        name: &'static str,
        min: i32,
        value: i32,
    },

    #[error("channel count {0} is out of range")]
    Channels(usize),
}

impl MeterConfig {
    /// Parses a (possibly partial) JSON override on top of the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(ConfigError::Channels(self.channels));
        }

        if !(MIN_LEVEL_FLOOR..0.0).contains(&self.minimum_level) {
            return Err(ConfigError::MinimumLevel(self.minimum_level));
        }

        let ordered = [
            self.minimum_level,
            self.warning_level,
            self.error_level,
            self.clip_level,
            0.0,
        ]
        .windows(2)
        .all(|w| w[0].is_finite() && w[0] <= w[1]);

        if !ordered || !self.minimum_input_level.is_finite() {
            return Err(ConfigError::ThresholdOrder);
        }

        for (name, value) in [
            ("peak_decay_rate", self.peak_decay_rate),
            (
                "magnitude_integration_time",
                self.magnitude_integration_time,
            ),
            ("peak_hold_duration", self.peak_hold_duration),
            ("input_peak_hold_duration", self.input_peak_hold_duration),
            ("idle_timeout", self.idle_timeout),
            ("clip_hold", self.clip_hold),
            ("refresh_interval", self.refresh_interval),
            ("max_tick_interval", self.max_tick_interval),
        ] {
            if !(value > 0.0 && value <= MAX_SECONDS) {
                return Err(ConfigError::Duration { name, value });
            }
        }

        self.layout.validate()
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, min, value) in [
            ("lane_thickness", 1, self.lane_thickness),
            ("lane_gap", 0, self.lane_gap),
            ("input_strip_length", 0, self.input_strip_length),
            ("input_strip_gap", 0, self.input_strip_gap),
            ("mark_width", 0, self.mark_width),
            ("scale_gap", 0, self.scale_gap),
            ("major_tick_length", 0, self.major_tick_length),
            ("minor_tick_length", 0, self.minor_tick_length),
        ] {
            if !(min..=MAX_LAYOUT_PIXELS).contains(&value) {
                return Err(ConfigError::Layout { name, min, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        MeterConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = MeterConfig::from_json(
            r#"{ "peak_hold_duration": 5.0, "layout": { "lane_thickness": 8 } }"#,
        )
        .unwrap();

        assert_eq!(config.peak_hold_duration, 5.0);
        assert_eq!(config.layout.lane_thickness, 8);
        assert_eq!(config.layout.mark_width, 3);
        assert_eq!(config.minimum_level, -60.0);
        assert_eq!(config.palette, Palette::default());
    }

    #[test]
    fn palette_colors_parse_as_arrays() {
        let config = MeterConfig::from_json(r#"{ "palette": { "clip": [1, 2, 3] } }"#).unwrap();

        assert_eq!(config.palette.clip, Rgb(1, 2, 3));
        assert_eq!(config.palette.active, Palette::default().active);
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = MeterConfig::from_json("{ \"channels\": ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_order_thresholds_are_rejected() {
        let err = MeterConfig::from_json(r#"{ "warning_level": -5.0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOrder));
    }

    #[test]
    fn minimum_level_must_be_negative() {
        let config = MeterConfig {
            minimum_level: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinimumLevel(_))
        ));
    }

    #[test]
    fn durations_must_be_positive() {
        let config = MeterConfig {
            magnitude_integration_time: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Duration {
                name: "magnitude_integration_time",
                ..
            })
        ));
    }

    #[test]
    fn huge_durations_are_rejected() {
        let err = MeterConfig::from_json(r#"{ "peak_hold_duration": 1e30 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duration {
                name: "peak_hold_duration",
                ..
            }
        ));

        let err = MeterConfig::from_json(r#"{ "refresh_interval": 3601.0 }"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Duration {
                name: "refresh_interval",
                ..
            }
        ));
    }

    #[test]
    fn longest_duration_is_accepted() {
        let config = MeterConfig {
            clip_hold: MAX_SECONDS,
            idle_timeout: MAX_SECONDS,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn minimum_level_has_a_floor() {
        let err = MeterConfig::from_json(r#"{ "minimum_level": -1e9, "warning_level": -20.0 }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MinimumLevel(_)));

        let config = MeterConfig {
            minimum_level: MIN_LEVEL_FLOOR,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn negative_layout_sizes_are_rejected() {
        let err =
            MeterConfig::from_json(r#"{ "layout": { "lane_gap": -10, "input_strip_length": -50 } }"#)
                .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Layout {
                name: "lane_gap",
                value: -10,
                ..
            }
        ));
    }

    #[test]
    fn oversized_layout_is_rejected() {
        let err = MeterConfig::from_json(r#"{ "layout": { "lane_thickness": 2147483647 } }"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Layout {
                name: "lane_thickness",
                ..
            }
        ));
    }

    #[test]
    fn lanes_need_thickness() {
        let config = MeterConfig {
            layout: LayoutConfig {
                lane_thickness: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Layout {
                name: "lane_thickness",
                min: 1,
                value: 0,
            })
        ));
    }

    #[test]
    fn channel_count_is_bounded() {
        let config = MeterConfig {
            channels: MAX_CHANNELS + 1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Channels(_))));
    }
}
