use std::{
    f32::consts::TAU,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{Context, Result};
use eframe::egui::{self, Vec2};
use futures::StreamExt;
use meter::{Clock, LevelSampleBuffer, Meter, MeterConfig, Orientation};
use mixdock_widgets::level_meter::LevelMeter;
use rand::Rng;
use smol::Timer;

const CONFIG_ENV: &str = "MIXDOCK_METER_CONFIG";
const PRODUCER_INTERVAL: Duration = Duration::from_millis(23);
const METER_LENGTH: f32 = 300.0;

fn main() -> Result<()> {
    env_logger::init();

    let config = load_config()?;

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(640.0, 480.0));

    eframe::run_native(
        "Mixdock meters",
        native_options,
        Box::new(|_| Ok(Box::new(App::new(config)?))),
    )
    .map_err(|e| anyhow::anyhow!("running meter window: {e}"))
}

fn load_config() -> Result<MeterConfig> {
    let Ok(path) = std::env::var(CONFIG_ENV) else {
        return Ok(MeterConfig::default());
    };

    let json = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let config = MeterConfig::from_json(&json).with_context(|| format!("parsing {path}"))?;

    log::info!("loaded meter config from {path}");
    Ok(config)
}

/// A fake source: a slow wobble around `level`, with optional clipping bursts
/// and silent gaps.
#[derive(Debug, Clone, Copy)]
struct Signal {
    level: f32,
    swing: f32,
    period: f32,
    burst_every: Option<f32>,
    pause_every: Option<f32>,
}

impl Signal {
    /// `(magnitude, peak, input_peak)` at `t` seconds, `None` while paused.
    fn levels(&self, t: f32, rng: &mut impl Rng) -> Option<(f32, f32, f32)> {
        if let Some(every) = self.pause_every
            && t % every > every - 1.0
        {
            return None;
        }

        let wobble = (t * TAU / self.period).sin() * self.swing;
        let mut peak = self.level + wobble + rng.random_range(-1.5..1.5);

        if let Some(every) = self.burst_every
            && t % every < 0.15
        {
            peak = 0.0;
        }

        Some((peak - 6.0, peak, peak + 2.0))
    }
}

struct Producer {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Producer {
    fn spawn(
        name: &str,
        samples: Arc<LevelSampleBuffer>,
        clock: Arc<dyn Clock>,
        signal: Signal,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));

        let thread = thread::Builder::new()
            .name(format!("producer: {name}"))
            .spawn({
                let running = running.clone();
                move || smol::block_on(produce(samples, clock, signal, running))
            })
            .context("spawning producer thread")?;

        Ok(Self {
            running,
            thread: Some(thread),
        })
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);

        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::warn!("producer thread panicked");
        }
    }
}

async fn produce(
    samples: Arc<LevelSampleBuffer>,
    clock: Arc<dyn Clock>,
    signal: Signal,
    running: Arc<AtomicBool>,
) {
    let mut rng = rand::rng();
    let mut timer = Timer::interval(PRODUCER_INTERVAL);
    let channels = samples.channels();

    // right channel sits a little lower so the lanes are distinguishable
    let spread = |value: f32| -> Vec<f32> {
        (0..channels)
            .map(|channel| value - channel as f32 * 1.5)
            .collect()
    };

    while running.load(Ordering::Relaxed) {
        timer.next().await;

        let now = clock.now();
        let Some((magnitude, peak, input_peak)) = signal.levels(now.as_secs_f32(), &mut rng)
        else {
            continue;
        };

        samples.write(&spread(magnitude), &spread(peak), &spread(input_peak), now);
    }
}

struct Source {
    // Fields drop in order: the producer stops before its meter goes away.
    _producer: Producer,
    name: String,
    muted: bool,
    meter: Meter,
}

impl Source {
    fn new(name: &str, config: MeterConfig, signal: Signal) -> Result<Self> {
        let meter = Meter::new(config).context("creating meter")?;
        let producer = Producer::spawn(name, meter.sample_buffer(), meter.clock().clone(), signal)?;

        Ok(Self {
            _producer: producer,
            name: name.to_owned(),
            muted: false,
            meter,
        })
    }

    fn show(&mut self, ui: &mut egui::Ui, orientation: Orientation) {
        ui.horizontal(|ui| {
            ui.label(self.name.as_str());
            ui.checkbox(&mut self.muted, "Mute");
        });

        self.meter.set_muted(self.muted);
        self.meter.set_orientation(orientation);

        ui.add(LevelMeter::new(&mut self.meter).length(METER_LENGTH));
    }
}

struct App {
    orientation: Orientation,
    sources: Vec<Source>,
}

impl App {
    fn new(config: MeterConfig) -> Result<Self> {
        let sources = [
            (
                "Mic/Aux",
                Signal {
                    level: -24.0,
                    swing: 10.0,
                    period: 3.0,
                    burst_every: Some(7.0),
                    pause_every: None,
                },
            ),
            (
                "Desktop Audio",
                Signal {
                    level: -14.0,
                    swing: 6.0,
                    period: 1.3,
                    burst_every: None,
                    pause_every: Some(6.0),
                },
            ),
        ]
        .into_iter()
        .map(|(name, signal)| Source::new(name, config.clone(), signal))
        .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            orientation: Orientation::Horizontal,
            sources,
        })
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Mixdock meters");

            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.orientation, Orientation::Horizontal, "Horizontal");
                ui.selectable_value(&mut self.orientation, Orientation::Vertical, "Vertical");
            });
            ui.separator();

            let orientation = self.orientation;
            match orientation {
                Orientation::Horizontal => {
                    for source in &mut self.sources {
                        source.show(ui, orientation);
                        ui.add_space(8.0);
                    }
                }
                Orientation::Vertical => {
                    ui.horizontal(|ui| {
                        for source in &mut self.sources {
                            ui.vertical(|ui| source.show(ui, orientation));
                        }
                    });
                }
            }
        });
    }
}
