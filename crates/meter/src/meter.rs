use std::{sync::Arc, time::Duration};

use crate::{
    ballistics::{Ballistics, BallisticsParams, ChannelLevels},
    clip::{ClipLatch, ClipState},
    clock::{Clock, MonotonicClock},
    config::{ConfigError, MeterConfig},
    idle::IdleDetector,
    levels::{LevelSampleBuffer, LevelSnapshot},
    render::{MeterFrame, MeterSize, Orientation, RenderInput, Renderer},
};

/// A live level meter: producers write into its sample buffer from any
/// thread, the UI calls [`Meter::tick`] once per frame.
pub struct Meter {
    config: MeterConfig,
    clock: Arc<dyn Clock>,
    samples: Arc<LevelSampleBuffer>,

    snapshot: LevelSnapshot,
    ballistics: Ballistics,
    idle_detector: IdleDetector,
    clip_latch: ClipLatch,
    renderer: Renderer,
    frame: MeterFrame,

    muted: bool,
    orientation: Orientation,
    size: MeterSize,
    last_tick: Option<Duration>,
    idle: bool,
}

impl Meter {
    pub fn new(config: MeterConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(config: MeterConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        config.validate()?;

        let samples = Arc::new(LevelSampleBuffer::new(config.channels));
        let channels = samples.channels();

        Ok(Self {
            snapshot: samples.snapshot(),
            ballistics: Ballistics::new(BallisticsParams::from(&config), channels),
            idle_detector: IdleDetector::new(Duration::from_secs_f32(config.idle_timeout)),
            clip_latch: ClipLatch::new(Duration::from_secs_f32(config.clip_hold)),
            renderer: Renderer::new(&config),
            frame: MeterFrame::default(),
            muted: false,
            orientation: Orientation::default(),
            size: MeterSize::default(),
            last_tick: None,
            idle: true,
            config,
            clock,
            samples,
        })
    }

    pub fn config(&self) -> &MeterConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The ingestion handle for producers. Writes must be stamped with this
    /// meter's clock.
    pub fn sample_buffer(&self) -> Arc<LevelSampleBuffer> {
        self.samples.clone()
    }

    pub fn set_levels(&self, magnitude: &[f32], peak: &[f32], input_peak: &[f32]) {
        self.samples
            .write(magnitude, peak, input_peak, self.clock.now());
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn resize(&mut self, width: i32, height: i32) {
        self.size = MeterSize::new(width, height);
    }

    pub fn channels(&self) -> &[ChannelLevels] {
        self.ballistics.channels()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn clip_state(&self) -> ClipState {
        self.clip_latch.state()
    }

    pub fn frame(&self) -> &MeterFrame {
        &self.frame
    }

    /// Runs one render tick: idle check, ballistics, clip latch, render.
    pub fn tick(&mut self) -> &MeterFrame {
        let now = self.clock.now();
        let dt = self
            .last_tick
            .map(|last| now.saturating_sub(last).as_secs_f32())
            .unwrap_or(0.0)
            .min(self.config.max_tick_interval);
        self.last_tick = Some(now);

        self.samples.snapshot_into(&mut self.snapshot);

        let idle = self.idle_detector.is_idle(self.snapshot.timestamp, now);
        if idle != self.idle {
            log::debug!("meter {}", if idle { "went idle" } else { "resumed" });
            self.idle = idle;
        }

        if idle {
            self.ballistics.reset();
        } else {
            self.ballistics.load(&self.snapshot);
            self.ballistics.step(now, dt);
        }

        let channels = self.ballistics.channels();
        let Some(layout) = self
            .renderer
            .layout(self.size, self.orientation, channels.len())
        else {
            self.clip_latch.update(now, false);

            let frame = &mut self.frame;
            frame.regions.clear();
            frame.labels.clear();
            frame.orientation = self.orientation;
            frame.size = self.size;
            frame.idle = idle;
            frame.clipping = self.clip_latch.is_clipping();
            return &self.frame;
        };

        let over = self.renderer.peak_reaches_clip(&layout, channels);
        let clipping = self.clip_latch.update(now, over);

        self.renderer.render(
            &layout,
            &RenderInput {
                channels,
                muted: self.muted,
                idle,
                clipping,
            },
            &mut self.frame,
        );

        &self.frame
    }
}
