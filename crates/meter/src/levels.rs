use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

pub const MAX_CHANNELS: usize = 8;

/// Marks a level that has not been sampled yet. Rendered as silence, but kept
/// apart from a real `minimum_level` reading so the first sample attacks.
pub const NO_SIGNAL: f32 = f32::NEG_INFINITY;

/// One channel's levels as delivered by the audio engine, in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawLevel {
    pub magnitude: f32,
    pub peak: f32,
    pub input_peak: f32,
}

impl RawLevel {
    pub const NO_SIGNAL: Self = Self {
        magnitude: NO_SIGNAL,
        peak: NO_SIGNAL,
        input_peak: NO_SIGNAL,
    };
}

impl Default for RawLevel {
    fn default() -> Self {
        Self::NO_SIGNAL
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LevelSnapshot {
    pub levels: Vec<RawLevel>,
    /// When the levels were written. `None` until the first write.
    pub timestamp: Option<Duration>,
}

/// Latest raw levels of every channel. Writers replace everything, readers get
/// a copy; nothing is queued.
#[derive(Debug)]
pub struct LevelSampleBuffer {
    channels: usize,
    inner: Mutex<LevelSnapshot>,
}

impl LevelSampleBuffer {
    pub fn new(channels: usize) -> Self {
        let clamped = channels.clamp(1, MAX_CHANNELS);
        if clamped != channels {
            log::warn!("level buffer channel count {channels} clamped to {clamped}");
        }

        Self {
            channels: clamped,
            inner: Mutex::new(LevelSnapshot {
                levels: vec![RawLevel::NO_SIGNAL; clamped],
                timestamp: None,
            }),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Replaces every channel's raw levels. Channels missing from the slices
    /// become `NO_SIGNAL`.
    pub fn write(&self, magnitude: &[f32], peak: &[f32], input_peak: &[f32], timestamp: Duration) {
        let level = |values: &[f32], channel: usize| values.get(channel).copied().unwrap_or(NO_SIGNAL);

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        for (channel, raw) in inner.levels.iter_mut().enumerate() {
            *raw = RawLevel {
                magnitude: level(magnitude, channel),
                peak: level(peak, channel),
                input_peak: level(input_peak, channel),
            };
        }
        inner.timestamp = Some(timestamp);
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Like `snapshot`, reusing `snapshot`'s allocation.
    pub fn snapshot_into(&self, snapshot: &mut LevelSnapshot) {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        snapshot.levels.clone_from(&inner.levels);
        snapshot.timestamp = inner.timestamp;
    }
}

#[cfg(test)]
mod test {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn starts_without_signal() {
        let buffer = LevelSampleBuffer::new(2);
        let snapshot = buffer.snapshot();

        assert_eq!(snapshot.timestamp, None);
        assert_eq!(snapshot.levels, vec![RawLevel::NO_SIGNAL; 2]);
    }

    #[test]
    fn latest_write_wins() {
        let buffer = LevelSampleBuffer::new(2);

        buffer.write(&[-30.0, -31.0], &[-20.0, -21.0], &[-10.0, -11.0], Duration::from_millis(10));
        buffer.write(&[-40.0, -41.0], &[-35.0, -36.0], &[-5.0, -6.0], Duration::from_millis(20));

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.timestamp, Some(Duration::from_millis(20)));
        assert_eq!(
            snapshot.levels[1],
            RawLevel {
                magnitude: -41.0,
                peak: -36.0,
                input_peak: -6.0
            }
        );
    }

    #[test]
    fn short_writes_clear_remaining_channels() {
        let buffer = LevelSampleBuffer::new(3);

        buffer.write(&[-1.0; 3], &[-1.0; 3], &[-1.0; 3], Duration::ZERO);
        buffer.write(&[-12.0], &[-6.0, -7.0], &[], Duration::ZERO);

        let levels = buffer.snapshot().levels;
        assert_eq!(levels[0].magnitude, -12.0);
        assert_eq!(levels[1].magnitude, NO_SIGNAL);
        assert_eq!(levels[1].peak, -7.0);
        assert_eq!(levels[0].input_peak, NO_SIGNAL);
        assert_eq!(levels[2], RawLevel::NO_SIGNAL);
    }

    #[test]
    fn extra_channels_are_ignored() {
        let buffer = LevelSampleBuffer::new(1);
        buffer.write(&[-1.0, -2.0], &[-1.0, -2.0], &[-1.0, -2.0], Duration::ZERO);
        assert_eq!(buffer.snapshot().levels.len(), 1);
    }

    #[test]
    fn channel_count_is_clamped() {
        assert_eq!(LevelSampleBuffer::new(0).channels(), 1);
        assert_eq!(LevelSampleBuffer::new(64).channels(), MAX_CHANNELS);
    }

    #[test]
    fn snapshot_into_reuses_buffer() {
        let buffer = LevelSampleBuffer::new(2);
        buffer.write(&[-3.0, -4.0], &[-3.0, -4.0], &[-3.0, -4.0], Duration::from_secs(1));

        let mut snapshot = LevelSnapshot::default();
        buffer.snapshot_into(&mut snapshot);

        assert_eq!(snapshot, buffer.snapshot());
    }

    #[test]
    fn concurrent_writers_never_mix_channels() {
        let buffer = Arc::new(LevelSampleBuffer::new(4));

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    let value = -(writer as f32) - 1.0;
                    for i in 0..1000 {
                        buffer.write(&[value; 4], &[value; 4], &[value; 4], Duration::from_micros(i));
                    }
                })
            })
            .collect();

        for _ in 0..1000 {
            let snapshot = buffer.snapshot();
            let first = snapshot.levels[0];
            assert!(snapshot.levels.iter().all(|level| *level == first));
        }

        for writer in writers {
            writer.join().unwrap();
        }
    }
}
