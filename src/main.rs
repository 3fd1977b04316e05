use std::any::Any;
use std::env;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use glam::{Vec2, Vec3};
use log::{error, info};
use pollster::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use render_playground::{
    demos, CameraSettings, Engine, EngineConfig, GraphicsContext, HeadlessContext, InputState,
    KeyCode, Movement, SceneDescription, WgpuContext,
};

const DEFAULT_DEMO: &str = "test_cube";
const DEFAULT_HEADLESS_FRAMES: u64 = 60;

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let description = options.load_description()?;

    println!(
        "Loaded scene `{}` with {} model(s)",
        description.name,
        description.models.len()
    );
    for model in &description.models {
        println!(" - {} ({})", model.name, model.program.name());
    }

    if options.headless {
        return run_headless(&options, &description);
    }
    match run_interactive(&options, &description) {
        Ok(()) => Ok(()),
        Err(err) => {
            if err.downcast_ref::<WindowInitError>().is_some() {
                eprintln!(
                    "{err}. Falling back to --headless mode (set DISPLAY or install a GPU driver to enable rendering)."
                );
                run_headless(&options, &description)
            } else {
                Err(err)
            }
        }
    }
}

fn run_headless(options: &CliOptions, description: &SceneDescription) -> Result<()> {
    let config = options.config();
    let ctx = HeadlessContext::new(config.window_size);
    let mut engine = Engine::new(ctx, config, CameraSettings::default());
    engine.load_scene(description)?;

    let mut input = InputState::new();
    for movement in &options.hold {
        let key = engine
            .bindings()
            .key_for(*movement)
            .ok_or_else(|| anyhow!("no key is bound to {movement:?}"))?;
        input.set_key_down(key);
    }

    let dt = 1.0 / config.fps.max(1) as f32;
    let frames = options.frames.unwrap_or(DEFAULT_HEADLESS_FRAMES);
    for frame in 0..frames {
        engine
            .tick(dt, &mut input)
            .with_context(|| format!("frame {frame} failed"))?;
    }
    info!(
        "rendered {} frame(s), {} draw(s) in total, {} in the last one",
        engine.frames(),
        engine.ctx().draw_count(),
        engine.ctx().frame_draws().len()
    );

    engine.shutdown()?;
    print_final_state(&engine);
    Ok(())
}

fn run_interactive(options: &CliOptions, description: &SceneDescription) -> Result<()> {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(|_| {}));
    let event_loop = panic::catch_unwind(AssertUnwindSafe(EventLoop::new));
    panic::set_hook(default_hook);
    let event_loop = event_loop
        .map_err(|panic| WindowInitError::from_panic("event loop", panic))?
        .map_err(|err| WindowInitError::from_error("event loop", err))?;

    let mut app = App::new(options.config(), description.clone());
    event_loop
        .run_app(&mut app)
        .context("event loop terminated abnormally")?;

    if let Some(engine) = app.engine.as_mut() {
        engine.shutdown()?;
        print_final_state(engine);
    }
    match app.last_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    config: EngineConfig,
    description: SceneDescription,
    engine: Option<Engine<WgpuContext>>,
    input: InputState,
    last_frame: Instant,
    next_frame: Instant,
    last_error: Option<anyhow::Error>,
}

impl App {
    fn new(config: EngineConfig, description: SceneDescription) -> Self {
        let now = Instant::now();
        Self {
            config,
            description,
            engine: None,
            input: InputState::new(),
            last_frame: now,
            next_frame: now,
            last_error: None,
        }
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> Result<Engine<WgpuContext>> {
        let (width, height) = self.config.window_size;
        let attributes = Window::default_attributes()
            .with_title(format!("Render Playground - {}", self.description.name))
            .with_inner_size(LogicalSize::new(f64::from(width), f64::from(height)));
        let window = Arc::new(
            event_loop
                .create_window(attributes)
                .map_err(|err| WindowInitError::from_error("window", err))?,
        );
        let ctx = block_on(WgpuContext::new(window, self.config.cull_face))
            .map_err(|err| WindowInitError::from_error("graphics", format!("{err:#}")))?;

        let mut engine = Engine::new(ctx, self.config, CameraSettings::default());
        engine.load_scene(&self.description)?;
        Ok(engine)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        self.last_error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.engine.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(engine) => {
                self.last_frame = Instant::now();
                self.next_frame = self.last_frame;
                self.engine = Some(engine);
            }
            Err(err) => self.fail(event_loop, err),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if window_id != engine.ctx().window_id() {
            return;
        }
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => engine.ctx_mut().resize(size),
            WindowEvent::Focused(false) => self.input.clear(),
            WindowEvent::CursorMoved { position, .. } => {
                self.input
                    .set_mouse_position(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.logical_key == Key::Named(NamedKey::Escape)
                {
                    event_loop.exit();
                    return;
                }
                let Some(key) = KeyCode::from_winit(&event.logical_key) else {
                    return;
                };
                match event.state {
                    ElementState::Pressed => {
                        self.input.set_key_down(key);
                        if !event.repeat {
                            engine.handle_key_press(key);
                        }
                    }
                    ElementState::Released => self.input.set_key_up(key),
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;
                if let Err(err) = engine.tick(dt, &mut self.input) {
                    error!("{err:#}");
                    self.last_error = Some(err);
                    event_loop.exit();
                }
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            // Vertical motion is y-up for the camera.
            self.input
                .add_mouse_delta(Vec2::new(dx as f32, -(dy as f32)));
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let now = Instant::now();
        if now >= self.next_frame {
            engine.ctx().window().request_redraw();
            self.next_frame = now + self.config.frame_interval();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame));
    }
}

#[derive(Debug)]
struct WindowInitError {
    message: String,
}

impl WindowInitError {
    fn from_panic(stage: &str, panic: Box<dyn Any + Send>) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {}", panic_message(panic)),
        }
    }

    fn from_error(stage: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("failed to initialize {stage}: {err}"),
        }
    }
}

impl fmt::Display for WindowInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WindowInitError {}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(msg) => *msg,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(msg) => (*msg).to_string(),
            Err(_) => "unknown panic".into(),
        },
    }
}

fn print_final_state<G: GraphicsContext>(engine: &Engine<G>) {
    let camera = engine.camera();
    let position = tidy(camera.position());
    println!(
        "Final camera: pos=({:.2}, {:.2}, {:.2}) yaw={:.2} pitch={:.2}",
        position.x,
        position.y,
        position.z,
        camera.yaw(),
        camera.pitch()
    );
    println!("Final model states after {} frame(s):", engine.frames());
    for scene in engine.scenes() {
        for model in scene.models() {
            let position = tidy(model.position());
            println!(
                " - {} pos=({:.2}, {:.2}, {:.2})",
                model.name(),
                position.x,
                position.y,
                position.z
            );
        }
    }
}

/// Rounds float noise to zero so it does not print as `-0.00`.
fn tidy(v: Vec3) -> Vec3 {
    let clean = |c: f32| if c.abs() < 0.005 { 0.0 } else { c };
    Vec3::new(clean(v.x), clean(v.y), clean(v.z))
}

struct CliOptions {
    scene: Option<String>,
    demo: Option<String>,
    headless: bool,
    frames: Option<u64>,
    hold: Vec<Movement>,
    mouse: bool,
    wire: bool,
    no_cull: bool,
    debug: bool,
}

const USAGE: &str = "Usage: render-playground [scene.xml] [--demo NAME] [--headless] [--frames N] \
[--hold DIRECTION]... [--mouse] [--wire] [--no-cull] [--debug]";

impl CliOptions {
    fn parse() -> Result<Self> {
        Self::parse_from(env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            scene: None,
            demo: None,
            headless: false,
            frames: None,
            hold: Vec::new(),
            mouse: false,
            wire: false,
            no_cull: false,
            debug: false,
        };
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--demo" => {
                    let name = args
                        .next()
                        .ok_or_else(|| anyhow!("--demo needs a name\n{USAGE}"))?;
                    options.demo = Some(name);
                }
                "--headless" => options.headless = true,
                "--frames" => {
                    let count = args
                        .next()
                        .ok_or_else(|| anyhow!("--frames needs a count\n{USAGE}"))?;
                    let count = count
                        .parse::<u64>()
                        .map_err(|err| anyhow!("invalid frame count `{count}`: {err}"))?;
                    options.frames = Some(count);
                }
                "--hold" => {
                    let direction = args
                        .next()
                        .ok_or_else(|| anyhow!("--hold needs a direction\n{USAGE}"))?;
                    let movement = Movement::from_name(&direction)
                        .ok_or_else(|| anyhow!("unknown direction `{direction}`"))?;
                    options.hold.push(movement);
                }
                "--mouse" => options.mouse = true,
                "--wire" => options.wire = true,
                "--no-cull" => options.no_cull = true,
                "--debug" => options.debug = true,
                other if other.starts_with("--") => {
                    return Err(anyhow!("Unknown argument: {other}\n{USAGE}"));
                }
                path => {
                    if options.scene.is_some() {
                        return Err(anyhow!("only one scene file may be given\n{USAGE}"));
                    }
                    options.scene = Some(path.to_string());
                }
            }
        }
        if options.scene.is_some() && options.demo.is_some() {
            return Err(anyhow!("give either a scene file or --demo, not both\n{USAGE}"));
        }
        Ok(options)
    }

    fn load_description(&self) -> Result<SceneDescription> {
        if let Some(path) = &self.scene {
            return SceneDescription::from_file(path);
        }
        let name = self.demo.as_deref().unwrap_or(DEFAULT_DEMO);
        demos::by_name(name).ok_or_else(|| {
            anyhow!(
                "unknown demo `{name}`, expected one of: {}",
                demos::NAMES.join(", ")
            )
        })
    }

    fn config(&self) -> EngineConfig {
        EngineConfig {
            debug: self.debug,
            mouse_controls: self.mouse,
            cull_face: !self.no_cull,
            wireframe: self.wire,
            ..EngineConfig::default()
        }
    }
}
