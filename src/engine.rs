use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::Timelike;
use image::RgbaImage;
use serde::Serialize;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::rng::SeededRng;
use crate::schema::{Scene, MAX_SHAPE_SIZE};
use crate::sequencer::{command_of, value_of, Sequencer, TimerFire, TimerKind, COUNTDOWN_STEP_MS};
use crate::shapes::{ShapeRasterizer, TargetCloud};
use crate::text::TextPainter;
use crate::transition::Transitioner;

/// One shape switch, for the trace log.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SwitchRecord {
    pub at_ms: u64,
    pub shape: String,
    pub points: usize,
}

/// Headless run of a scene: the sequencer decides when shapes switch, the
/// transitioner moves the dots, and `tick_frame` rasterizes one frame onto
/// the output canvas.
pub struct Engine {
    fps: u32,
    rasterizer: ShapeRasterizer,
    transitioner: Transitioner,
    sequencer: Sequencer,
    canvas: Pixmap,
    rng: SeededRng,
    custom_grid: Vec<Vec<u8>>,
    images: BTreeMap<String, RgbaImage>,
    clock: Box<dyn Fn() -> (u32, u32)>,
    last_time: Option<String>,
    log: Vec<SwitchRecord>,
    running: bool,
}

impl Engine {
    pub fn new(scene: &Scene, painter: TextPainter) -> Result<Self> {
        let canvas = Pixmap::new(scene.canvas.width, scene.canvas.height).ok_or_else(|| {
            anyhow!(
                "invalid canvas size {}x{}",
                scene.canvas.width,
                scene.canvas.height
            )
        })?;

        let mut images = BTreeMap::new();
        for (name, path) in &scene.images {
            let decoded = image::ImageReader::open(path)
                .with_context(|| format!("failed to open image '{}': {}", name, path.display()))?
                .decode()
                .with_context(|| format!("failed to decode image '{}': {}", name, path.display()))?
                .to_rgba8();
            images.insert(name.clone(), decoded);
        }

        Ok(Self {
            fps: scene.fps,
            rasterizer: ShapeRasterizer::new(scene.canvas.width, scene.canvas.height, painter)?,
            transitioner: Transitioner::new(),
            sequencer: Sequencer::from_sequence(&scene.sequence),
            canvas,
            rng: SeededRng::new(scene.seed),
            custom_grid: scene.custom_shape.grid.clone(),
            images,
            clock: Box::new(local_clock),
            last_time: None,
            log: Vec::new(),
            running: false,
        })
    }

    /// Swaps the wall-clock source; tests inject a fixed clock here.
    pub fn set_clock(&mut self, clock: Box<dyn Fn() -> (u32, u32)>) {
        self.clock = clock;
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    pub fn switch_log(&self) -> &[SwitchRecord] {
        &self.log
    }

    pub fn dot_count(&self) -> usize {
        self.transitioner.pool().len()
    }

    /// Begins the script. The first token runs on the next `advance` call.
    pub fn start(&mut self) {
        self.running = true;
        self.sequencer.start_script(0);
    }

    /// Stops the run and cancels any pending timer.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.sequencer.cancel();
    }

    /// Fires every timer step that became due by `now_ms`, in order.
    pub fn advance(&mut self, now_ms: u64) -> Result<()> {
        if !self.running {
            return Ok(());
        }
        while let Some(fire) = self.sequencer.poll(now_ms) {
            self.handle_fire(fire, now_ms)?;
            if !self.running {
                break;
            }
        }
        Ok(())
    }

    /// Advances every dot one frame and redraws the canvas.
    pub fn tick_frame(&mut self) {
        self.transitioner.update(&mut self.rng);

        self.canvas.fill(Color::BLACK);
        for dot in self.transitioner.pool().dots() {
            let mut builder = PathBuilder::new();
            builder.push_circle(dot.x, dot.y, dot.z.max(1.0));
            let Some(path) = builder.finish() else {
                continue;
            };
            let mut paint = Paint::default();
            let alpha = (dot.a.clamp(0.0, 1.0) * 255.0) as u8;
            paint.set_color_rgba8(dot.rgb.0, dot.rgb.1, dot.rgb.2, alpha);
            paint.anti_alias = true;
            self.canvas
                .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        }
    }

    pub fn save_frame(&self, path: &Path) -> Result<()> {
        self.canvas
            .save_png(path)
            .with_context(|| format!("failed to write frame {}", path.display()))
    }

    fn handle_fire(&mut self, fire: TimerFire, now_ms: u64) -> Result<()> {
        match fire.kind {
            TimerKind::Script => {
                if let Some(token) = self.sequencer.next_token() {
                    self.run_token(&token, now_ms)?;
                }
            }
            TimerKind::Countdown => {
                if fire.index > 0 || self.sequencer.tokens_remaining() > 0 {
                    self.switch_text(&fire.index.to_string(), true, now_ms);
                } else {
                    // Nothing left to show after the countdown; go blank.
                    self.switch_text("", true, now_ms);
                }
                if fire.index == 0 {
                    // Hold the zero frame for one step before the script
                    // takes over, so it actually forms on screen.
                    self.sequencer.start_script(now_ms + COUNTDOWN_STEP_MS);
                }
            }
            TimerKind::Clock => {
                let formatted = format_time((self.clock)());
                if self.last_time.as_deref() != Some(formatted.as_str()) {
                    self.last_time = Some(formatted.clone());
                    self.switch_text(&formatted, false, now_ms);
                }
            }
        }
        Ok(())
    }

    fn run_token(&mut self, token: &str, now_ms: u64) -> Result<()> {
        let Some(command) = command_of(token) else {
            // Plain text, including the empty token which shows nothing.
            self.switch_text(token, false, now_ms);
            return Ok(());
        };
        let value = value_of(token);

        match command {
            "countdown" => {
                let from = value
                    .and_then(|v| v.parse::<i64>().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(10);
                self.sequencer.start_countdown(now_ms, from);
            }
            "customShape" => {
                let grid = self.custom_grid.clone();
                let cloud = self.rasterizer.render_custom_grid(&grid);
                self.switch_cloud(cloud, false, token, now_ms);
            }
            "rectangle" => {
                let (w, h) = value
                    .and_then(parse_rectangle_size)
                    .unwrap_or((MAX_SHAPE_SIZE, MAX_SHAPE_SIZE / 2));
                let cloud = self.rasterizer.render_rectangle(w, h);
                self.switch_cloud(cloud, false, token, now_ms);
            }
            "circle" => {
                let diameter = value
                    .and_then(|v| v.parse::<u32>().ok())
                    .filter(|v| *v > 0)
                    .unwrap_or(MAX_SHAPE_SIZE)
                    .min(MAX_SHAPE_SIZE);
                let cloud = self.rasterizer.render_circle(diameter);
                self.switch_cloud(cloud, false, token, now_ms);
            }
            "time" => {
                if self.sequencer.tokens_remaining() > 0 {
                    let formatted = format_time((self.clock)());
                    self.switch_text(&formatted, false, now_ms);
                } else {
                    // Last token: keep showing the clock, re-rendering on
                    // minute changes.
                    self.sequencer.start_clock(now_ms);
                }
            }
            "image" => match value.and_then(|name| self.images.get(name).cloned()) {
                Some(image) => {
                    let cloud = self.rasterizer.render_image(&image);
                    self.switch_cloud(cloud, false, token, now_ms);
                }
                None => self.switch_text("What?", false, now_ms),
            },
            _ => self.switch_text("What?", false, now_ms),
        }
        Ok(())
    }

    fn switch_text(&mut self, text: &str, fast: bool, now_ms: u64) {
        let cloud = self.rasterizer.render_text(text);
        self.switch_cloud(cloud, fast, text, now_ms);
    }

    fn switch_cloud(&mut self, cloud: TargetCloud, fast: bool, label: &str, now_ms: u64) {
        let points = cloud.points.len();
        self.transitioner.switch_shape(
            cloud,
            fast,
            self.canvas.width() as f32,
            self.canvas.height() as f32,
            &mut self.rng,
        );
        self.log.push(SwitchRecord {
            at_ms: now_ms,
            shape: label.to_owned(),
            points,
        });
    }
}

fn parse_rectangle_size(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

/// Hours without a leading zero, minutes always two digits.
fn format_time((hours, minutes): (u32, u32)) -> String {
    format!("{hours}:{minutes:02}")
}

fn local_clock() -> (u32, u32) {
    let now = chrono::Local::now();
    (now.hour(), now.minute())
}

#[cfg(test)]
mod tests {
    use super::{format_time, parse_rectangle_size, Engine};
    use crate::schema::Scene;
    use crate::shapes::ShapeRasterizer;
    use crate::text::TextPainter;

    fn engine_for(sequence: &str) -> Engine {
        let scene = Scene {
            sequence: sequence.to_owned(),
            ..Scene::default()
        };
        let mut engine = Engine::new(&scene, TextPainter::embedded()).expect("engine");
        engine.set_clock(Box::new(|| (7, 5)));
        engine
    }

    fn shapes(engine: &Engine) -> Vec<String> {
        engine
            .switch_log()
            .iter()
            .map(|record| record.shape.clone())
            .collect()
    }

    #[test]
    fn countdown_runs_to_zero_then_resumes_script() {
        let mut engine = engine_for("#countdown 2|Hi|");
        engine.start();
        for step in 0..14u64 {
            engine.advance(step * 500).expect("advance");
        }
        assert_eq!(shapes(&engine), vec!["2", "1", "0", "Hi", ""]);

        let log = engine.switch_log();
        assert_eq!(log[2].at_ms, 2000, "zero fires on the countdown beat");
        assert_eq!(log[3].at_ms, 3000, "zero holds a full step before the script resumes");
    }

    #[test]
    fn countdown_with_nothing_after_ends_blank() {
        let mut engine = engine_for("#countdown 1");
        engine.start();
        engine.advance(0).expect("advance");
        engine.advance(1000).expect("advance");
        assert_eq!(shapes(&engine), vec!["1", ""]);
        assert_eq!(engine.switch_log()[1].points, 0);
    }

    #[test]
    fn blank_token_renders_empty_shape() {
        let mut engine = engine_for("");
        engine.start();
        engine.advance(0).expect("advance");
        let log = engine.switch_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].shape, "");
        assert_eq!(log[0].points, 0);
    }

    #[test]
    fn unknown_command_shows_question() {
        let mut engine = engine_for("#bogus thing");
        engine.start();
        engine.advance(0).expect("advance");
        assert_eq!(shapes(&engine), vec!["What?"]);
    }

    #[test]
    fn circle_with_bad_argument_falls_back_to_max_diameter() {
        let mut engine = engine_for("#circle abc");
        engine.start();
        engine.advance(0).expect("advance");

        let mut raster =
            ShapeRasterizer::new(1280, 720, TextPainter::embedded()).expect("rasterizer");
        let expected = raster.render_circle(30).points.len();
        assert_eq!(engine.switch_log()[0].points, expected);
    }

    #[test]
    fn rectangle_with_bad_argument_uses_defaults() {
        let mut engine = engine_for("#rectangle nope");
        engine.start();
        engine.advance(0).expect("advance");
        assert_eq!(engine.switch_log()[0].points, 30 * 15);
    }

    #[test]
    fn time_mid_sequence_renders_once() {
        let mut engine = engine_for("#time|x");
        engine.start();
        engine.advance(0).expect("advance");
        assert_eq!(shapes(&engine), vec!["7:05"]);
        engine.advance(2000).expect("advance");
        assert_eq!(shapes(&engine), vec!["7:05", "x"]);
    }

    #[test]
    fn trailing_time_rerenders_only_on_minute_change() {
        let mut engine = engine_for("#time");
        engine.start();
        engine.advance(0).expect("advance");
        assert_eq!(shapes(&engine), vec!["7:05"]);
        engine.advance(3000).expect("advance");
        assert_eq!(shapes(&engine), vec!["7:05"], "same minute, no re-render");

        engine.set_clock(Box::new(|| (7, 6)));
        engine.advance(5000).expect("advance");
        assert_eq!(shapes(&engine), vec!["7:05", "7:06"]);
    }

    #[test]
    fn shutdown_stops_all_switches() {
        let mut engine = engine_for("a|b|c");
        engine.start();
        engine.advance(0).expect("advance");
        engine.shutdown();
        engine.advance(10_000).expect("advance");
        assert_eq!(shapes(&engine), vec!["a"]);
    }

    #[test]
    fn unknown_image_name_shows_question() {
        let mut engine = engine_for("#image missing");
        engine.start();
        engine.advance(0).expect("advance");
        assert_eq!(shapes(&engine), vec!["What?"]);
    }

    #[test]
    fn same_seed_gives_identical_runs() {
        let run = |seed: u64| {
            let scene = Scene {
                sequence: "#countdown 2|Hi|#circle 8".to_owned(),
                seed,
                ..Scene::default()
            };
            let mut engine = Engine::new(&scene, TextPainter::embedded()).expect("engine");
            engine.start();
            for frame in 0..240u64 {
                let now = frame * 1000 / 60;
                engine.advance(now).expect("advance");
                engine.tick_frame();
            }
            engine.switch_log().to_vec()
        };
        assert_eq!(run(9), run(9));
    }

    #[test]
    fn tick_frame_keeps_canvas_and_pool_consistent() {
        let mut engine = engine_for("Hi");
        engine.start();
        engine.advance(0).expect("advance");
        let dots = engine.dot_count();
        assert!(dots > 0);
        for _ in 0..120 {
            engine.tick_frame();
        }
        assert_eq!(engine.dot_count(), dots);
    }

    #[test]
    fn helpers_parse_and_format() {
        assert_eq!(parse_rectangle_size("10x4"), Some((10, 4)));
        assert_eq!(parse_rectangle_size("10"), None);
        assert_eq!(parse_rectangle_size("ax4"), None);
        assert_eq!(format_time((7, 5)), "7:05");
        assert_eq!(format_time((23, 59)), "23:59");
        assert_eq!(format_time((0, 0)), "0:00");
    }
}
