mod ballistics;
mod clip;
mod clock;
mod config;
mod idle;
mod levels;
mod meter;
mod render;

pub use ballistics::{Ballistics, BallisticsParams, ChannelLevels};
pub use clip::{ClipLatch, ClipState};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{
    BandColors, ConfigError, LayoutConfig, MAX_LAYOUT_PIXELS, MAX_SECONDS, MIN_LEVEL_FLOOR,
    MeterConfig, Palette, Rgb, ZonePalette,
};
pub use idle::IdleDetector;
pub use levels::{LevelSampleBuffer, LevelSnapshot, MAX_CHANNELS, NO_SIGNAL, RawLevel};
pub use meter::Meter;
pub use render::{
    MeterFrame, MeterLayout, MeterSize, Orientation, PixelPoint, PixelRect, Region, RegionKind,
    RenderInput, Renderer, ScaleLabel, Zone,
};
