use std::time::Duration;

use crate::{
    config::MeterConfig,
    levels::{LevelSnapshot, NO_SIGNAL, RawLevel},
};

/// Share of the gap to the raw magnitude closed per integration window.
const INTEGRATION_GAIN: f32 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallisticsParams {
    pub minimum_level: f32,
    pub peak_decay_rate: f32,
    pub magnitude_integration_time: f32,
    pub peak_hold_duration: Duration,
    pub input_peak_hold_duration: Duration,
}

impl From<&MeterConfig> for BallisticsParams {
    fn from(config: &MeterConfig) -> Self {
        Self {
            minimum_level: config.minimum_level,
            peak_decay_rate: config.peak_decay_rate,
            magnitude_integration_time: config.magnitude_integration_time,
            peak_hold_duration: Duration::from_secs_f32(config.peak_hold_duration),
            input_peak_hold_duration: Duration::from_secs_f32(config.input_peak_hold_duration),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevels {
    pub raw: RawLevel,

    pub magnitude: f32,
    pub peak: f32,
    pub peak_hold: f32,
    pub input_peak_hold: f32,

    pub peak_hold_since: Duration,
    pub input_peak_hold_since: Duration,
}

impl ChannelLevels {
    pub const NO_SIGNAL: Self = Self {
        raw: RawLevel::NO_SIGNAL,
        magnitude: NO_SIGNAL,
        peak: NO_SIGNAL,
        peak_hold: NO_SIGNAL,
        input_peak_hold: NO_SIGNAL,
        peak_hold_since: Duration::ZERO,
        input_peak_hold_since: Duration::ZERO,
    };
}

impl Default for ChannelLevels {
    fn default() -> Self {
        Self::NO_SIGNAL
    }
}

/// Turns raw levels into display levels, one step per render tick.
#[derive(Debug, Clone)]
pub struct Ballistics {
    params: BallisticsParams,
    channels: Vec<ChannelLevels>,
}

impl Ballistics {
    pub fn new(params: BallisticsParams, channels: usize) -> Self {
        Self {
            params,
            channels: vec![ChannelLevels::NO_SIGNAL; channels],
        }
    }

    pub fn channels(&self) -> &[ChannelLevels] {
        &self.channels
    }

    /// Takes the raw levels of a snapshot. Channels the snapshot lacks get no
    /// signal.
    pub fn load(&mut self, snapshot: &LevelSnapshot) {
        for (channel, levels) in self.channels.iter_mut().enumerate() {
            levels.raw = snapshot
                .levels
                .get(channel)
                .copied()
                .unwrap_or(RawLevel::NO_SIGNAL);
        }
    }

    pub fn reset(&mut self) {
        self.channels.fill(ChannelLevels::NO_SIGNAL);
    }

    /// Advances every channel by `dt` seconds, `now` being the tick time.
    pub fn step(&mut self, now: Duration, dt: f32) {
        let params = self.params;
        for levels in &mut self.channels {
            step_channel(&params, levels, now, dt);
        }
    }
}

fn step_channel(params: &BallisticsParams, levels: &mut ChannelLevels, now: Duration, dt: f32) {
    let min = params.minimum_level;
    let raw = sanitize(levels.raw);

    levels.peak = decay_peak(levels.peak, raw.peak, params.peak_decay_rate * dt, min);

    (levels.peak_hold, levels.peak_hold_since) = hold(
        levels.peak_hold,
        levels.peak_hold_since,
        raw.peak,
        now,
        params.peak_hold_duration,
        min,
    );

    (levels.input_peak_hold, levels.input_peak_hold_since) = hold(
        levels.input_peak_hold,
        levels.input_peak_hold_since,
        raw.input_peak,
        now,
        params.input_peak_hold_duration,
        min,
    );

    levels.magnitude = integrate_magnitude(
        levels.magnitude,
        raw.magnitude,
        dt / params.magnitude_integration_time,
        min,
    );
}

fn sanitize(raw: RawLevel) -> RawLevel {
    let level = |value: f32| if value.is_finite() { value } else { NO_SIGNAL };
    RawLevel {
        magnitude: level(raw.magnitude),
        peak: level(raw.peak),
        input_peak: level(raw.input_peak),
    }
}

fn clamp_level(value: f32, minimum_level: f32) -> f32 {
    value.clamp(minimum_level, 0.0)
}

fn decay_peak(display: f32, raw: f32, decay: f32, minimum_level: f32) -> f32 {
    if !raw.is_finite() {
        return NO_SIGNAL;
    }

    let peak = if !display.is_finite() || raw >= display {
        raw
    } else {
        (display - decay).max(raw.min(0.0))
    };

    clamp_level(peak, minimum_level)
}

fn hold(
    held: f32,
    since: Duration,
    raw: f32,
    now: Duration,
    duration: Duration,
    minimum_level: f32,
) -> (f32, Duration) {
    if !raw.is_finite() {
        return (NO_SIGNAL, now);
    }

    // Once the hold expires it drops straight to the current peak.
    let expired = now.saturating_sub(since) > duration;
    if !held.is_finite() || raw >= held || expired {
        (clamp_level(raw, minimum_level), now)
    } else {
        (clamp_level(held, minimum_level), since)
    }
}

fn integrate_magnitude(display: f32, raw: f32, fraction: f32, minimum_level: f32) -> f32 {
    if !raw.is_finite() {
        return NO_SIGNAL;
    }

    let magnitude = if display.is_finite() {
        display + (raw - display) * fraction * INTEGRATION_GAIN
    } else {
        raw
    };

    clamp_level(magnitude, minimum_level)
}
