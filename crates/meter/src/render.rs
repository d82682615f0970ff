use serde::{Deserialize, Serialize};

use crate::{
    ballistics::ChannelLevels,
    config::{BandColors, LayoutConfig, MeterConfig, Palette, Rgb, ZonePalette},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeterSize {
    pub width: i32,
    pub height: i32,
}

impl MeterSize {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Nominal,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    Band { zone: Zone, active: bool },
    Clipped,
    PeakHold,
    Magnitude,
    InputPeak,
    MajorTick,
    MinorTick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// `None` for scale ticks.
    pub channel: Option<usize>,
    pub kind: RegionKind,
    pub rect: PixelRect,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleLabel {
    pub db: i32,
    pub anchor: PixelPoint,
}

/// Everything needed to paint one tick, in widget-local pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeterFrame {
    pub orientation: Orientation,
    pub size: MeterSize,
    pub regions: Vec<Region>,
    pub labels: Vec<ScaleLabel>,
    pub idle: bool,
    pub clipping: bool,
}

impl MeterFrame {
    fn clear(&mut self) {
        self.regions.clear();
        self.labels.clear();
    }

    pub fn regions_of(&self, kind: RegionKind) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(move |region| region.kind == kind)
    }
}

pub struct RenderInput<'a> {
    pub channels: &'a [ChannelLevels],
    pub muted: bool,
    pub idle: bool,
    pub clipping: bool,
}

/// Meter-space rectangle: `along` runs from silence towards full scale,
/// `across` runs over the lanes.
#[derive(Debug, Clone, Copy)]
struct AxisRect {
    along: i32,
    along_len: i32,
    across: i32,
    across_len: i32,
}

#[derive(Debug, Clone, Copy)]
struct Axis {
    orientation: Orientation,
    along_extent: i32,
}

impl Axis {
    fn new(orientation: Orientation, size: MeterSize) -> (Self, i32) {
        let (along_extent, across_extent) = match orientation {
            Orientation::Horizontal => (size.width, size.height),
            Orientation::Vertical => (size.height, size.width),
        };

        (
            Self {
                orientation,
                along_extent,
            },
            across_extent,
        )
    }

    fn rect(&self, r: AxisRect) -> PixelRect {
        match self.orientation {
            Orientation::Horizontal => PixelRect {
                x: r.along,
                y: r.across,
                width: r.along_len,
                height: r.across_len,
            },
            // full scale at the top
            Orientation::Vertical => PixelRect {
                x: r.across,
                y: self.along_extent - r.along - r.along_len,
                width: r.across_len,
                height: r.along_len,
            },
        }
    }

    fn point(&self, along: i32, across: i32) -> PixelPoint {
        match self.orientation {
            Orientation::Horizontal => PixelPoint {
                x: along,
                y: across,
            },
            Orientation::Vertical => PixelPoint {
                x: across,
                y: self.along_extent - along,
            },
        }
    }
}

/// Pixel mapping for one tick's geometry.
#[derive(Debug, Clone, Copy)]
pub struct MeterLayout {
    axis: Axis,
    size: MeterSize,
    minimum_level: f32,
    meter_start: i32,
    meter_length: i32,
    lane_pitch: i32,
    lane_thickness: i32,
    scale_across: i32,
}

impl MeterLayout {
    pub fn meter_length(&self) -> i32 {
        self.meter_length
    }

    /// Offset of `db` from the silent end of the meter. Not clamped: levels
    /// outside the range map outside `0..=meter_length`.
    pub fn position(&self, db: f32) -> i32 {
        if !db.is_finite() {
            return 0;
        }

        let length = self.meter_length as f32;
        // `as` saturates instead of overflowing
        (length - length * db / self.minimum_level) as i32
    }

    fn clamped_position(&self, db: f32) -> i32 {
        self.position(db).clamp(0, self.meter_length)
    }

    /// Cross-axis pixels from the first lane's edge to the last lane's edge.
    fn lanes_across(&self, channels: usize) -> i32 {
        channels as i32 * self.lane_pitch - (self.lane_pitch - self.lane_thickness)
    }

    fn lane(&self, channel: usize, along: i32, along_len: i32) -> PixelRect {
        self.axis.rect(AxisRect {
            along: self.meter_start + along,
            along_len,
            across: channel as i32 * self.lane_pitch,
            across_len: self.lane_thickness,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Bands {
    warning: i32,
    error: i32,
    length: i32,
}

impl Bands {
    fn zone_at(&self, pixel: i32) -> Zone {
        if pixel < self.warning {
            Zone::Nominal
        } else if pixel < self.error {
            Zone::Warning
        } else {
            Zone::Error
        }
    }

    fn spans(&self) -> [(Zone, i32, i32); 3] {
        [
            (Zone::Nominal, 0, self.warning),
            (Zone::Warning, self.warning, self.error),
            (Zone::Error, self.error, self.length),
        ]
    }
}

/// Per-frame state shared by every lane.
#[derive(Clone, Copy)]
struct Lane<'a> {
    layout: &'a MeterLayout,
    bands: Bands,
    palette: &'a ZonePalette,
    input: &'a RenderInput<'a>,
}

fn zone_colors(palette: &ZonePalette, zone: Zone) -> &BandColors {
    match zone {
        Zone::Nominal => &palette.nominal,
        Zone::Warning => &palette.warning,
        Zone::Error => &palette.error,
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    minimum_level: f32,
    warning_level: f32,
    error_level: f32,
    clip_level: f32,
    minimum_input_level: f32,
    layout: LayoutConfig,
    palette: Palette,
}

impl Renderer {
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            minimum_level: config.minimum_level,
            warning_level: config.warning_level,
            error_level: config.error_level,
            clip_level: config.clip_level,
            minimum_input_level: config.minimum_input_level,
            layout: config.layout,
            palette: config.palette,
        }
    }

    fn lane_pitch(&self) -> i32 {
        self.layout.lane_thickness + self.layout.lane_gap
    }

    fn scale_across(&self, channels: usize) -> i32 {
        channels as i32 * self.lane_pitch() - self.layout.lane_gap + self.layout.scale_gap
    }

    /// Cross-axis pixels taken by the lanes and the scale ticks. Labels are
    /// placed beyond this.
    pub fn cross_extent(&self, channels: usize) -> i32 {
        self.scale_across(channels) + self.layout.major_tick_length
    }

    /// `None` when the geometry leaves no room for the meter.
    pub fn layout(
        &self,
        size: MeterSize,
        orientation: Orientation,
        channels: usize,
    ) -> Option<MeterLayout> {
        let (axis, across_extent) = Axis::new(orientation, size);

        let meter_start = self.layout.input_strip_length + self.layout.input_strip_gap;
        let meter_length = axis.along_extent - meter_start;

        if meter_length <= 0 || across_extent <= 0 || self.layout.lane_thickness <= 0 {
            return None;
        }

        Some(MeterLayout {
            axis,
            size,
            minimum_level: self.minimum_level,
            meter_start,
            meter_length,
            lane_pitch: self.lane_pitch(),
            lane_thickness: self.layout.lane_thickness,
            scale_across: self.scale_across(channels),
        })
    }

    /// Whether any channel's peak reaches the clip boundary pixel.
    pub fn peak_reaches_clip(&self, layout: &MeterLayout, channels: &[ChannelLevels]) -> bool {
        let clip = layout.position(self.clip_level);
        channels
            .iter()
            .any(|levels| levels.peak.is_finite() && layout.position(levels.peak) >= clip)
    }

    pub fn render(&self, layout: &MeterLayout, input: &RenderInput, frame: &mut MeterFrame) {
        frame.clear();
        frame.orientation = layout.axis.orientation;
        frame.size = layout.size;
        frame.idle = input.idle;
        frame.clipping = input.clipping;

        let palette = if input.muted {
            &self.palette.muted
        } else {
            &self.palette.active
        };

        let warning = layout.clamped_position(self.warning_level);
        let bands = Bands {
            warning,
            error: layout.clamped_position(self.error_level).max(warning),
            length: layout.meter_length,
        };

        if input.clipping && !input.channels.is_empty() {
            frame.regions.push(Region {
                channel: None,
                kind: RegionKind::Clipped,
                rect: layout.axis.rect(AxisRect {
                    along: layout.meter_start,
                    along_len: layout.meter_length,
                    across: 0,
                    across_len: layout.lanes_across(input.channels.len()),
                }),
                color: palette.error.foreground,
            });
        }

        let lane = Lane {
            layout,
            bands,
            palette,
            input,
        };
        for (channel, levels) in input.channels.iter().enumerate() {
            self.render_lane(&lane, channel, levels, frame);
        }

        self.render_scale(layout, frame);
    }

    fn render_lane(
        &self,
        lane: &Lane,
        channel: usize,
        levels: &ChannelLevels,
        frame: &mut MeterFrame,
    ) {
        let Lane {
            layout,
            bands,
            palette,
            input,
        } = *lane;

        let mut push = |kind, rect, color| {
            frame.regions.push(Region {
                channel: Some(channel),
                kind,
                rect,
                color,
            })
        };

        if !input.clipping {
            let peak = layout.clamped_position(levels.peak);

            for (zone, start, end) in bands.spans() {
                let split = peak.clamp(start, end);
                let colors = zone_colors(palette, zone);

                if split > start {
                    push(
                        RegionKind::Band { zone, active: true },
                        layout.lane(channel, start, split - start),
                        colors.foreground,
                    );
                }
                if end > split {
                    push(
                        RegionKind::Band {
                            zone,
                            active: false,
                        },
                        layout.lane(channel, split, end - split),
                        colors.background,
                    );
                }
            }
        }

        let mark_width = self.layout.mark_width;
        let marks = [
            (RegionKind::PeakHold, levels.peak_hold),
            (RegionKind::Magnitude, levels.magnitude),
        ];
        for (kind, level) in marks {
            if !level.is_finite() || mark_width <= 0 {
                continue;
            }

            let end = layout.clamped_position(level);
            if end < mark_width {
                continue;
            }

            let colors = zone_colors(palette, bands.zone_at(end - 1));
            let color = match kind {
                RegionKind::PeakHold => colors.foreground,
                _ => colors.background,
            };
            push(kind, layout.lane(channel, end - mark_width, mark_width), color);
        }

        if !input.idle && self.layout.input_strip_length > 0 {
            let rect = layout.axis.rect(AxisRect {
                along: 0,
                along_len: self.layout.input_strip_length,
                across: channel as i32 * layout.lane_pitch,
                across_len: layout.lane_thickness,
            });
            push(
                RegionKind::InputPeak,
                rect,
                self.input_peak_color(palette, levels.input_peak_hold),
            );
        }
    }

    fn input_peak_color(&self, palette: &ZonePalette, input_peak_hold: f32) -> Rgb {
        if !input_peak_hold.is_finite() || input_peak_hold < self.minimum_input_level {
            palette.nominal.background
        } else if input_peak_hold < self.warning_level {
            palette.nominal.foreground
        } else if input_peak_hold < self.error_level {
            palette.warning.foreground
        } else if input_peak_hold <= self.clip_level {
            palette.error.foreground
        } else {
            self.palette.clip
        }
    }

    fn render_scale(&self, layout: &MeterLayout, frame: &mut MeterFrame) {
        let lowest = self.minimum_level.ceil() as i32;
        let with_minor = layout.meter_length as f32 / -self.minimum_level >= 3.0;

        for db in (lowest..=0).rev() {
            let major = db % 5 == 0;
            if !major && !with_minor {
                continue;
            }

            let (kind, length, color) = if major {
                (
                    RegionKind::MajorTick,
                    self.layout.major_tick_length,
                    self.palette.major_tick,
                )
            } else {
                (
                    RegionKind::MinorTick,
                    self.layout.minor_tick_length,
                    self.palette.minor_tick,
                )
            };

            let along = layout.meter_start + layout.position(db as f32).min(layout.meter_length - 1);

            if length > 0 {
                frame.regions.push(Region {
                    channel: None,
                    kind,
                    rect: layout.axis.rect(AxisRect {
                        along,
                        along_len: 1,
                        across: layout.scale_across,
                        across_len: length,
                    }),
                    color,
                });
            }

            if major {
                frame.labels.push(ScaleLabel {
                    db,
                    anchor: layout
                        .axis
                        .point(along, layout.scale_across + self.layout.major_tick_length + 1),
                });
            }
        }
    }
}
