use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Reference up vector used to build the view matrix.
pub const WORLD_UP: Vec3 = Vec3::Y;

/// Yaw that makes the camera face down the -Z axis.
pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;

/// Pitch is clamped to this many degrees on either side of the horizon.
pub const PITCH_LIMIT: f32 = 89.0;

/// Construction parameters for a [`Camera`].
///
/// `speed` is expressed in world units per second and `sensitivity` in degrees
/// per unit of mouse motion. Keyboard rotation turns at
/// `sensitivity * 100 * speed` degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSettings {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub speed: f32,
    pub sensitivity: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 4.0),
            fov: 50.0,
            near: 0.1,
            far: 100.0,
            speed: 2.5,
            sensitivity: 0.1,
        }
    }
}

/// Direction token accepted by [`Camera::move_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Movement {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    StrafeUp,
    StrafeDown,
    TurnLeft,
    TurnRight,
    LookUp,
    LookDown,
}

impl Movement {
    pub const ALL: [Movement; 10] = [
        Movement::Forward,
        Movement::Backward,
        Movement::StrafeLeft,
        Movement::StrafeRight,
        Movement::StrafeUp,
        Movement::StrafeDown,
        Movement::TurnLeft,
        Movement::TurnRight,
        Movement::LookUp,
        Movement::LookDown,
    ];

    /// Parses the textual direction names used by the input host.
    ///
    /// Both the `straf_*` spelling and `strafe_*` are accepted; `left`/`right`
    /// turn and `up`/`down` look.
    pub fn from_name(name: &str) -> Option<Self> {
        let movement = match name {
            "forward" => Self::Forward,
            "backward" => Self::Backward,
            "straf_left" | "strafe_left" => Self::StrafeLeft,
            "straf_right" | "strafe_right" => Self::StrafeRight,
            "straf_up" | "strafe_up" => Self::StrafeUp,
            "straf_down" | "strafe_down" => Self::StrafeDown,
            "left" | "turn_left" => Self::TurnLeft,
            "right" | "turn_right" => Self::TurnRight,
            "up" | "look_up" => Self::LookUp,
            "down" | "look_down" => Self::LookDown,
            _ => return None,
        };
        Some(movement)
    }

    pub fn is_rotation(self) -> bool {
        matches!(
            self,
            Self::TurnLeft | Self::TurnRight | Self::LookUp | Self::LookDown
        )
    }
}

/// First-person perspective camera driven by yaw and pitch.
///
/// Every mutator rebuilds the derived basis vectors and both matrices before
/// returning, so the accessors never observe stale state.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    view_matrix: Mat4,
    projection_matrix: Mat4,
    aspect_ratio: f32,
    settings: CameraSettings,
    null: bool,
}

impl Camera {
    /// Creates a camera with default settings for a viewport of the given size.
    pub fn new(viewport: (u32, u32)) -> Self {
        Self::with_settings(viewport, CameraSettings::default())
    }

    /// Creates a camera; the aspect ratio is derived once from `viewport`.
    pub fn with_settings(viewport: (u32, u32), settings: CameraSettings) -> Self {
        let aspect_ratio = viewport.0.max(1) as f32 / viewport.1.max(1) as f32;
        let mut camera = Self {
            position: settings.position,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: WORLD_UP,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            aspect_ratio,
            settings,
            null: false,
        };
        camera.rebuild();
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Position restored by [`Camera::reset`].
    pub fn default_position(&self) -> Vec3 {
        self.settings.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view_matrix
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    /// Moves or turns the camera for `dt` seconds in the given direction.
    pub fn move_by(&mut self, direction: Movement, dt: f32) {
        let velocity = self.settings.speed * dt;
        let angular = self.settings.sensitivity * 100.0 * velocity;
        match direction {
            Movement::Forward => self.position += self.forward * velocity,
            Movement::Backward => self.position -= self.forward * velocity,
            Movement::StrafeLeft => self.position -= self.right * velocity,
            Movement::StrafeRight => self.position += self.right * velocity,
            Movement::StrafeUp => self.position += self.up * velocity,
            Movement::StrafeDown => self.position -= self.up * velocity,
            Movement::TurnLeft => self.yaw -= angular,
            Movement::TurnRight => self.yaw += angular,
            Movement::LookUp => self.pitch += angular,
            Movement::LookDown => self.pitch -= angular,
        }
        self.rebuild();
    }

    /// Same as [`Camera::move_by`] for a textual direction.
    ///
    /// Unrecognised names leave the camera untouched and return `false`.
    pub fn move_named(&mut self, direction: &str, dt: f32) -> bool {
        match Movement::from_name(direction) {
            Some(movement) => {
                self.move_by(movement, dt);
                true
            }
            None => false,
        }
    }

    /// Mouse look. Horizontal motion adds to yaw while vertical motion is
    /// subtracted from pitch.
    pub fn rotate(&mut self, _cursor_x: f32, _cursor_y: f32, delta_x: f32, delta_y: f32) {
        self.yaw += delta_x * self.settings.sensitivity;
        self.pitch -= delta_y * self.settings.sensitivity;
        self.rebuild();
    }

    /// Restores the construction-time position and orientation.
    pub fn reset(&mut self) {
        self.position = self.settings.position;
        self.yaw = DEFAULT_YAW;
        self.pitch = DEFAULT_PITCH;
        self.null = false;
        self.rebuild();
    }

    /// Turns the camera so that it faces the world origin.
    pub fn look_at_scene(&mut self) {
        let to_origin = -self.position;
        if to_origin.length_squared() <= f32::EPSILON {
            return;
        }
        let direction = to_origin.normalize();
        self.pitch = direction.y.asin().to_degrees();
        self.yaw = direction.z.atan2(direction.x).to_degrees();
        self.rebuild();
    }

    /// Switches to identity view and projection matrices.
    pub fn set_null_camera(&mut self, enabled: bool) {
        self.null = enabled;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw %= 360.0;

        self.forward = euler_to_forward(self.yaw, self.pitch);
        self.right = self.forward.cross(WORLD_UP).normalize();

        if self.null {
            self.up = Vec3::ZERO;
            self.view_matrix = Mat4::IDENTITY;
            self.projection_matrix = Mat4::IDENTITY;
            return;
        }

        self.up = self.right.cross(self.forward).normalize();
        self.view_matrix =
            Mat4::look_at_rh(self.position, self.position + self.forward, WORLD_UP);
        self.projection_matrix = Mat4::perspective_rh(
            self.settings.fov.to_radians(),
            self.aspect_ratio,
            self.settings.near,
            self.settings.far,
        );
    }
}

/// Spherical to Cartesian conversion of a yaw/pitch pair given in degrees.
pub fn euler_to_forward(yaw: f32, pitch: f32) -> Vec3 {
    let (sin_yaw, cos_yaw) = yaw.to_radians().sin_cos();
    let (sin_pitch, cos_pitch) = pitch.to_radians().sin_cos();
    Vec3::new(cos_yaw * cos_pitch, sin_pitch, sin_yaw * cos_pitch).normalize()
}
