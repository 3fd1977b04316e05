use std::time::Duration;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraSettings};
use crate::description::SceneDescription;
use crate::input::{Command, InputState, KeyBindings, KeyCode};
use crate::render::GraphicsContext;
use crate::scene::Scene;

/// Host settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub window_size: (u32, u32),
    /// Frame rate cap.
    pub fps: u32,
    pub debug: bool,
    pub mouse_controls: bool,
    pub cull_face: bool,
    pub wireframe: bool,
    pub clear_color: Vec3,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            fps: 60,
            debug: false,
            mouse_controls: false,
            cull_face: true,
            wireframe: false,
            clear_color: Vec3::new(0.9, 0.8, 0.01),
        }
    }
}

impl EngineConfig {
    /// Time between two frames at the configured cap.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// Owns the graphics context, the camera and the scenes, and drives them
/// one tick at a time.
pub struct Engine<G: GraphicsContext> {
    ctx: G,
    config: EngineConfig,
    camera: Camera,
    bindings: KeyBindings,
    scenes: Vec<Scene>,
    time: f32,
    frames: u64,
    shut_down: bool,
}

impl<G: GraphicsContext> Engine<G> {
    pub fn new(mut ctx: G, config: EngineConfig, camera: CameraSettings) -> Self {
        ctx.set_wireframe(config.wireframe);
        let camera = Camera::with_settings(ctx.viewport(), camera);
        info!(
            "engine ready: viewport {:?}, {} fps cap",
            ctx.viewport(),
            config.fps
        );
        Self {
            ctx,
            config,
            camera,
            bindings: KeyBindings::default(),
            scenes: Vec::new(),
            time: 0.0,
            frames: 0,
            shut_down: false,
        }
    }

    pub fn ctx(&self) -> &G {
        &self.ctx
    }

    pub fn ctx_mut(&mut self) -> &mut G {
        &mut self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Seconds of simulated time.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Builds `description` against the engine's context and camera.
    pub fn load_scene(&mut self, description: &SceneDescription) -> Result<usize> {
        let scene = description.build(&mut self.ctx, &self.camera)?;
        self.scenes.push(scene);
        Ok(self.scenes.len() - 1)
    }

    /// Runs the command bound to `key`, if any.
    pub fn handle_key_press(&mut self, key: KeyCode) -> Option<Command> {
        let command = self.bindings.command(key)?;
        self.apply(command);
        Some(command)
    }

    pub fn apply(&mut self, command: Command) {
        match command {
            Command::ToggleDebug => {
                self.config.debug = !self.config.debug;
                info!("debug mode {}", state_name(self.config.debug));
            }
            Command::ToggleWireframe => {
                self.config.wireframe = !self.config.wireframe;
                self.ctx.set_wireframe(self.config.wireframe);
                if self.config.debug {
                    info!("wire mode {}", state_name(self.config.wireframe));
                }
            }
            Command::ResetCamera => {
                self.camera.reset();
                if self.config.debug {
                    info!("camera reset to {}", self.camera.default_position());
                }
            }
            Command::LookAtScene => self.camera.look_at_scene(),
            Command::ToggleNullCamera => {
                self.camera.set_null_camera(!self.camera.is_null());
                if self.config.debug {
                    info!("null camera {}", state_name(self.camera.is_null()));
                }
            }
            Command::ToggleMouseControls => {
                self.config.mouse_controls = !self.config.mouse_controls;
                if self.config.debug {
                    info!(
                        "camera controls with mouse {}",
                        state_name(self.config.mouse_controls)
                    );
                }
            }
        }
    }

    /// Applies held keys and accumulated mouse motion to the camera.
    ///
    /// `dt` is in seconds.
    pub fn update(&mut self, dt: f32, input: &mut InputState) {
        self.time += dt;
        for movement in self.bindings.held_movements(input) {
            self.camera.move_by(movement, dt);
        }
        let delta = input.take_mouse_delta();
        if self.config.mouse_controls && delta != Vec2::ZERO {
            let cursor = input.mouse_position();
            self.camera.rotate(cursor.x, cursor.y, delta.x, delta.y);
        }
    }

    /// Clears the target and renders every scene.
    pub fn render_frame(&mut self) -> Result<()> {
        self.ctx
            .begin_frame(self.config.clear_color)
            .context("failed to begin frame")?;
        for scene in &mut self.scenes {
            scene
                .render(&mut self.ctx, &self.camera)
                .with_context(|| format!("failed to render scene `{}`", scene.name()))?;
        }
        self.ctx.end_frame().context("failed to present frame")?;
        self.frames += 1;
        Ok(())
    }

    pub fn tick(&mut self, dt: f32, input: &mut InputState) -> Result<()> {
        self.update(dt, input);
        self.render_frame()
    }

    /// Destroys every scene. Later calls do nothing.
    ///
    /// A scene that fails to release does not stop the others; the first
    /// failure is returned and the next call retries.
    pub fn shutdown(&mut self) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }
        let mut first_error = None;
        for scene in &mut self.scenes {
            if let Err(err) = scene.destroy(&mut self.ctx) {
                let err = anyhow::Error::new(err)
                    .context(format!("failed to destroy scene `{}`", scene.name()));
                first_error.get_or_insert(err);
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        self.shut_down = true;
        debug!("engine stopped after {} frame(s)", self.frames);
        Ok(())
    }
}

fn state_name(enabled: bool) -> &'static str {
    if enabled {
        "activated"
    } else {
        "deactivated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Movement;
    use crate::demos;
    use crate::input::NamedKey;
    use crate::render::HeadlessContext;

    fn engine() -> Engine<HeadlessContext> {
        Engine::new(
            HeadlessContext::new((1280, 720)),
            EngineConfig::default(),
            CameraSettings::default(),
        )
    }

    #[test]
    fn defaults_match_the_playground() {
        let config = EngineConfig::default();
        assert_eq!(config.window_size, (1280, 720));
        assert_eq!(config.fps, 60);
        assert!(config.cull_face);
        assert!(!config.wireframe);
        assert_eq!(config.frame_interval(), Duration::from_secs_f64(1.0 / 60.0));
    }

    #[test]
    fn held_keys_move_the_camera() {
        let mut engine = engine();
        let mut input = InputState::new();
        input.set_key_down(KeyCode::Character('Z'));
        engine.update(1.0, &mut input);
        assert!(engine
            .camera()
            .position()
            .abs_diff_eq(Vec3::new(0.0, 0.0, 1.5), 1e-5));
        assert_eq!(engine.time(), 1.0);

        input.set_key_up(KeyCode::Character('Z'));
        input.set_key_down(KeyCode::Named(NamedKey::Left));
        engine.update(0.4, &mut input);
        assert!((engine.camera().yaw() - (-100.0)).abs() < 1e-4);
    }

    #[test]
    fn mouse_motion_requires_mouse_controls() {
        let mut engine = engine();
        let mut input = InputState::new();
        input.add_mouse_delta(Vec2::new(10.0, 0.0));
        engine.update(0.0, &mut input);
        assert_eq!(engine.camera().yaw(), -90.0);

        engine.apply(Command::ToggleMouseControls);
        input.add_mouse_delta(Vec2::new(10.0, 5.0));
        engine.update(0.0, &mut input);
        assert!((engine.camera().yaw() - (-89.0)).abs() < 1e-5);
        assert!((engine.camera().pitch() - (-0.5)).abs() < 1e-5);
    }

    #[test]
    fn key_commands_toggle_state() {
        let mut engine = engine();
        assert_eq!(
            engine.handle_key_press(KeyCode::Character('K')),
            Some(Command::ToggleWireframe)
        );
        assert!(engine.ctx().wireframe());
        engine.camera_mut().move_by(Movement::Forward, 1.0);
        engine.handle_key_press(KeyCode::Character('R'));
        assert_eq!(engine.camera().position(), Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(engine.handle_key_press(KeyCode::Character('X')), None);
    }

    #[test]
    fn null_camera_command_reaches_the_gpu() {
        let mut engine = engine();
        engine.load_scene(&demos::hello_triangle()).unwrap();
        let program = engine.scenes()[0].models()[0].program();
        let mut input = InputState::new();

        assert_eq!(
            engine.handle_key_press(KeyCode::Character('N')),
            Some(Command::ToggleNullCamera)
        );
        assert!(engine.camera().is_null());
        engine.tick(1.0 / 60.0, &mut input).unwrap();
        let identity_cols = glam::Mat4::IDENTITY.to_cols_array();
        let identity: &[u8] = bytemuck::cast_slice(&identity_cols);
        assert_eq!(engine.ctx().uniform(program, "projection_matrix").unwrap(), identity);

        engine.apply(Command::ToggleNullCamera);
        engine.tick(1.0 / 60.0, &mut input).unwrap();
        assert!(!engine.camera().is_null());
        assert_ne!(engine.ctx().uniform(program, "projection_matrix").unwrap(), identity);
    }

    #[test]
    fn shutdown_releases_every_scene_despite_a_failure() {
        let mut engine = engine();
        engine.load_scene(&demos::hello_triangle()).unwrap();
        engine.load_scene(&demos::test_cube()).unwrap();
        let stolen = engine.scenes()[0].models()[0].program();
        engine
            .ctx_mut()
            .release(crate::render::Handle::Program(stolen))
            .unwrap();

        let err = engine.shutdown().unwrap_err();
        assert!(format!("{err:#}").contains("hello_triangle"));
        assert_eq!(engine.ctx().live_handles(), 0);
        assert!(engine.scenes()[1].is_destroyed());
    }

    #[test]
    fn frames_render_every_scene_and_shutdown_once() {
        let mut engine = engine();
        engine.load_scene(&demos::test_cube()).unwrap();
        engine.load_scene(&demos::hello_triangle()).unwrap();
        let mut input = InputState::new();
        engine.tick(1.0 / 60.0, &mut input).unwrap();
        assert_eq!(engine.frames(), 1);
        assert_eq!(engine.ctx().frame_draws().len(), 3);
        assert_eq!(engine.ctx().clear_color(), Vec3::new(0.9, 0.8, 0.01));

        engine.shutdown().unwrap();
        engine.shutdown().unwrap();
        assert_eq!(engine.ctx().live_handles(), 0);
    }
}
