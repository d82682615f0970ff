use std::time::Duration;

use egui::{Align2, Color32, FontId, Pos2, Rect, Response, Sense, StrokeKind, Ui, Widget, vec2};
use meter::{Meter, MeterFrame, Orientation, PixelRect, Rgb};

const LABEL_FONT_SIZE: f32 = 9.0;

/// Paints a [`Meter`], running one tick of it per frame.
pub struct LevelMeter<'a> {
    meter: &'a mut Meter,
    length: Option<f32>,
}

impl<'a> LevelMeter<'a> {
    pub fn new(meter: &'a mut Meter) -> Self {
        Self {
            meter,
            length: None,
        }
    }

    /// Size along the meter axis. Defaults to the available width (horizontal)
    /// or height (vertical).
    pub fn length(self, length: f32) -> Self {
        Self {
            length: Some(length),
            ..self
        }
    }
}

impl Widget for LevelMeter<'_> {
    fn ui(self, ui: &mut Ui) -> Response {
        let Self { meter, length } = self;

        let orientation = meter.orientation();
        let channels = meter.channels().len();
        let cross = meter.renderer().cross_extent(channels) as f32 + label_space(orientation);

        let size = match orientation {
            Orientation::Horizontal => vec2(length.unwrap_or_else(|| ui.available_width()), cross),
            Orientation::Vertical => vec2(cross, length.unwrap_or_else(|| ui.available_height())),
        };

        let (rect, response) = ui.allocate_exact_size(size.round(), Sense::hover());
        let refresh = Duration::from_secs_f32(meter.config().refresh_interval);

        meter.resize(rect.width() as i32, rect.height() as i32);
        let frame = meter.tick();

        paint(ui, rect, frame);

        ui.ctx().request_repaint_after(refresh);

        response
    }
}

fn label_space(orientation: Orientation) -> f32 {
    match orientation {
        Orientation::Horizontal => LABEL_FONT_SIZE + 2.0,
        // room for "-60"
        Orientation::Vertical => LABEL_FONT_SIZE * 2.0 + 2.0,
    }
}

fn paint(ui: &Ui, rect: Rect, frame: &MeterFrame) {
    let p = ui.painter_at(rect);
    let visuals = ui.visuals();

    // background
    p.rect_filled(rect, 0.0, visuals.extreme_bg_color);

    for region in &frame.regions {
        p.rect_filled(
            to_rect(rect.min, region.rect),
            0.0,
            to_color32(region.color),
        );
    }

    let font = FontId::monospace(LABEL_FONT_SIZE);
    let last = frame.labels.len().saturating_sub(1);
    for (i, label) in frame.labels.iter().enumerate() {
        // keep the end labels inside the widget
        let align = match (frame.orientation, i) {
            (Orientation::Horizontal, 0) => Align2::RIGHT_TOP,
            (Orientation::Horizontal, i) if i == last => Align2::LEFT_TOP,
            (Orientation::Horizontal, _) => Align2::CENTER_TOP,
            (Orientation::Vertical, 0) => Align2::LEFT_TOP,
            (Orientation::Vertical, i) if i == last => Align2::LEFT_BOTTOM,
            (Orientation::Vertical, _) => Align2::LEFT_CENTER,
        };

        p.text(
            rect.min + vec2(label.anchor.x as f32, label.anchor.y as f32),
            align,
            label.db.to_string(),
            font.clone(),
            visuals.weak_text_color(),
        );
    }

    if frame.clipping {
        p.rect_stroke(
            rect,
            0.0,
            visuals.widgets.active.fg_stroke,
            StrokeKind::Inside,
        );
    }
}

pub fn to_rect(origin: Pos2, rect: PixelRect) -> Rect {
    Rect::from_min_size(
        origin + vec2(rect.x as f32, rect.y as f32),
        vec2(rect.width as f32, rect.height as f32),
    )
}

pub fn to_color32(Rgb(r, g, b): Rgb) -> Color32 {
    Color32::from_rgb(r, g, b)
}
