use glam::{Mat4, Vec3};
use log::{debug, info};
use thiserror::Error;

use crate::camera::Camera;
use crate::light::Light;
use crate::model::Model;
use crate::render::{GraphicsContext, GraphicsError, ProgramHandle, Scalar};
use crate::shader::ProgramKind;

/// A value headed for a shader uniform.
///
/// Scalars go through the graphics API's scalar setter, vectors and matrices
/// are uploaded as packed bytes (matrices column-major).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Int(i32),
    Vec3(Vec3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn upload<G: GraphicsContext + ?Sized>(
        self,
        ctx: &mut G,
        program: ProgramHandle,
        name: &str,
    ) -> Result<(), GraphicsError> {
        match self {
            Self::Float(value) => ctx.set_uniform_scalar(program, name, Scalar::Float(value)),
            Self::Int(value) => ctx.set_uniform_scalar(program, name, Scalar::Int(value)),
            Self::Vec3(value) => {
                ctx.set_uniform_bytes(program, name, bytemuck::cast_slice(&value.to_array()))
            }
            Self::Mat4(value) => {
                ctx.set_uniform_bytes(program, name, bytemuck::cast_slice(&value.to_cols_array()))
            }
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene `{scene}` has no model #{index}")]
    UnknownModel { scene: String, index: usize },
    #[error("scene `{0}` has been destroyed")]
    Destroyed(String),
    #[error("model `{model}`: {source}")]
    Graphics {
        model: String,
        #[source]
        source: GraphicsError,
    },
}

/// An ordered set of models lit by a single light.
///
/// The scene keeps every model's uniforms in step with the camera, the light
/// and the model's own transform. The projection matrix is written when a
/// model joins the scene and again only when the camera's projection changes
/// (null camera mode); everything that moves is rewritten each frame.
#[derive(Debug)]
pub struct Scene {
    name: String,
    light: Light,
    models: Vec<Model>,
    /// Projection last written to the models.
    projection: Mat4,
    frames: u64,
    destroyed: bool,
}

impl Scene {
    /// Takes ownership of `models` and primes their uniforms.
    ///
    /// On failure every model is released before the error is returned.
    pub fn new<G: GraphicsContext + ?Sized>(
        ctx: &mut G,
        camera: &Camera,
        name: &str,
        light: Light,
        models: Vec<Model>,
    ) -> Result<Self, SceneError> {
        let mut scene = Self {
            name: name.to_string(),
            light,
            models: Vec::new(),
            projection: camera.projection_matrix(),
            frames: 0,
            destroyed: false,
        };
        scene.set_models(ctx, camera, models)?;
        Ok(scene)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn light(&self) -> &Light {
        &self.light
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn model(&self, index: usize) -> Option<&Model> {
        self.models.get(index)
    }

    /// Frames rendered so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Primes `model` and appends it; returns its index.
    ///
    /// The model is released when it cannot join the scene.
    pub fn add_model<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut G,
        camera: &Camera,
        mut model: Model,
    ) -> Result<usize, SceneError> {
        if let Err(err) = self
            .ensure_live()
            .and_then(|()| self.prime(ctx, camera, &model))
        {
            let _ = model.destroy(ctx);
            return Err(err);
        }
        self.models.push(model);
        Ok(self.models.len() - 1)
    }

    /// Replaces the scene's models, releasing the previous ones.
    ///
    /// The new models are released when they cannot join the scene. Once
    /// they are primed they replace the previous models even if releasing one
    /// of those fails; the first such failure is returned.
    pub fn set_models<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut G,
        camera: &Camera,
        mut models: Vec<Model>,
    ) -> Result<(), SceneError> {
        let primed = self.ensure_live().and_then(|()| {
            models
                .iter()
                .try_for_each(|model| self.prime(ctx, camera, model))
        });
        if let Err(err) = primed {
            for model in &mut models {
                let _ = model.destroy(ctx);
            }
            return Err(err);
        }
        let mut previous = std::mem::replace(&mut self.models, models);
        debug!("scene `{}` now holds {} model(s)", self.name, self.models.len());
        destroy_all(ctx, &mut previous)
    }

    /// Writes `value` into the uniform `name` of the model at `model_index`.
    pub fn load_uniform<G: GraphicsContext + ?Sized>(
        &self,
        ctx: &mut G,
        model_index: usize,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), SceneError> {
        self.ensure_live()?;
        let model = self
            .models
            .get(model_index)
            .ok_or_else(|| SceneError::UnknownModel {
                scene: self.name.clone(),
                index: model_index,
            })?;
        upload(ctx, model, name, value.into())
    }

    /// Animates, re-uploads and draws every model, in order.
    pub fn render<G: GraphicsContext + ?Sized>(
        &mut self,
        ctx: &mut G,
        camera: &Camera,
    ) -> Result<(), SceneError> {
        self.ensure_live()?;
        let projection = camera.projection_matrix();
        if projection != self.projection {
            for model in &self.models {
                upload(ctx, model, "projection_matrix", projection.into())?;
            }
            self.projection = projection;
        }
        for model in &mut self.models {
            model.animate();
            upload(ctx, model, "model_matrix", model.model_matrix().into())?;
            upload(ctx, model, "view_matrix", camera.view_matrix().into())?;
            if model.is_lit() {
                upload(ctx, model, "camera_position", camera.position().into())?;
            }
            if let Some(texture) = model.texture() {
                ctx.bind_texture(model.program(), texture)
                    .map_err(|source| graphics_error(model, source))?;
            }
            ctx.draw(model.vertex_array(), model.topology())
                .map_err(|source| graphics_error(model, source))?;
        }
        self.frames += 1;
        Ok(())
    }

    /// Releases every model's GPU resources. Later calls do nothing.
    ///
    /// Every model is released even when one fails; the scene only counts as
    /// destroyed once all of them are, so a failed call can be retried.
    pub fn destroy<G: GraphicsContext + ?Sized>(&mut self, ctx: &mut G) -> Result<(), SceneError> {
        if self.destroyed {
            return Ok(());
        }
        destroy_all(ctx, &mut self.models)?;
        self.destroyed = true;
        info!("scene `{}` destroyed after {} frame(s)", self.name, self.frames);
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), SceneError> {
        if self.destroyed {
            return Err(SceneError::Destroyed(self.name.clone()));
        }
        Ok(())
    }

    fn prime<G: GraphicsContext + ?Sized>(
        &self,
        ctx: &mut G,
        camera: &Camera,
        model: &Model,
    ) -> Result<(), SceneError> {
        upload(ctx, model, "projection_matrix", camera.projection_matrix().into())?;
        upload(ctx, model, "view_matrix", camera.view_matrix().into())?;
        upload(ctx, model, "model_matrix", model.model_matrix().into())?;
        match model.program_kind() {
            ProgramKind::Flat => upload(ctx, model, "color", model.color().into())?,
            ProgramKind::VertexColor => {}
            ProgramKind::Lit => {
                let light = &self.light;
                upload(ctx, model, "light.position", light.position().into())?;
                upload(ctx, model, "light.color", light.color().into())?;
                upload(ctx, model, "light.ambient_intensity", light.ambient_intensity().into())?;
                upload(ctx, model, "light.diffuse_intensity", light.diffuse_intensity().into())?;
                upload(ctx, model, "light.specular_intensity", light.specular_intensity().into())?;

                let material = model.material();
                let fields: [(&str, UniformValue); 4] = [
                    ("material.surface_brightness", material.surface_brightness.into()),
                    ("material.ambient_incidence", material.ambient_incidence.into()),
                    ("material.diffuse_incidence", material.diffuse_incidence.into()),
                    ("material.specular_incidence", material.specular_incidence.into()),
                ];
                for (name, value) in fields {
                    upload(ctx, model, name, value)?;
                }

                upload(ctx, model, "use_texture", i32::from(model.texture().is_some()).into())?;
                upload(ctx, model, "camera_position", camera.position().into())?;
            }
        }
        if let Some(texture) = model.texture() {
            ctx.bind_texture(model.program(), texture)
                .map_err(|source| graphics_error(model, source))?;
        }
        Ok(())
    }
}

/// Releases every model, returning the first failure.
fn destroy_all<G: GraphicsContext + ?Sized>(
    ctx: &mut G,
    models: &mut [Model],
) -> Result<(), SceneError> {
    let mut first_error = None;
    for model in models {
        if let Err(source) = model.destroy(ctx) {
            first_error.get_or_insert_with(|| graphics_error(model, source));
        }
    }
    first_error.map_or(Ok(()), Err)
}

fn upload<G: GraphicsContext + ?Sized>(
    ctx: &mut G,
    model: &Model,
    name: &str,
    value: UniformValue,
) -> Result<(), SceneError> {
    value
        .upload(ctx, model.program(), name)
        .map_err(|source| graphics_error(model, source))
}

fn graphics_error(model: &Model, source: GraphicsError) -> SceneError {
    SceneError::Graphics {
        model: model.name().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Movement;
    use crate::mesh::MeshKind;
    use crate::model::{Animation, ModelDescriptor};
    use crate::render::{Handle, HeadlessContext, Topology};

    fn model(ctx: &mut HeadlessContext, descriptor: ModelDescriptor) -> Model {
        Model::new(ctx, &descriptor).unwrap()
    }

    fn mat4_bytes(matrix: Mat4) -> Vec<u8> {
        bytemuck::cast_slice(&matrix.to_cols_array()).to_vec()
    }

    #[test]
    fn construction_primes_every_uniform() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let lit = model(
            &mut ctx,
            ModelDescriptor::new("lit", MeshKind::TexturedCube).at(Vec3::new(0.0, 1.0, 0.0)),
        );
        let program = lit.program();
        let scene = Scene::new(&mut ctx, &camera, "primed", Light::default(), vec![lit]).unwrap();

        assert_eq!(
            ctx.uniform(program, "projection_matrix").unwrap(),
            mat4_bytes(camera.projection_matrix())
        );
        assert_eq!(
            ctx.uniform(program, "model_matrix").unwrap(),
            mat4_bytes(Mat4::from_translation(Vec3::Y))
        );
        assert_eq!(
            ctx.uniform(program, "light.diffuse_intensity").unwrap(),
            bytemuck::cast_slice::<f32, u8>(&[0.8, 0.8, 0.8])
        );
        assert_eq!(
            ctx.uniform(program, "material.surface_brightness").unwrap(),
            42.0f32.to_ne_bytes()
        );
        assert_eq!(ctx.uniform(program, "use_texture").unwrap(), 0i32.to_ne_bytes());
        assert_eq!(scene.frames(), 0);
    }

    #[test]
    fn load_uniform_uses_both_paths() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let lit = model(&mut ctx, ModelDescriptor::new("lit", MeshKind::TexturedCube));
        let program = lit.program();
        let scene = Scene::new(&mut ctx, &camera, "paths", Light::default(), vec![lit]).unwrap();

        scene.load_uniform(&mut ctx, 0, "material.surface_brightness", 56.0f32).unwrap();
        scene.load_uniform(&mut ctx, 0, "use_texture", 1i32).unwrap();
        scene
            .load_uniform(&mut ctx, 0, "camera_position", Vec3::new(1.0, 2.0, 3.0))
            .unwrap();
        assert_eq!(
            ctx.uniform(program, "material.surface_brightness").unwrap(),
            56.0f32.to_ne_bytes()
        );
        assert_eq!(ctx.uniform(program, "use_texture").unwrap(), 1i32.to_ne_bytes());
        assert_eq!(
            ctx.uniform(program, "camera_position").unwrap(),
            bytemuck::cast_slice::<f32, u8>(&[1.0, 2.0, 3.0])
        );
    }

    #[test]
    fn load_uniform_reports_bad_targets() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let cube = model(&mut ctx, ModelDescriptor::new("cube", MeshKind::SolidCube));
        let scene = Scene::new(&mut ctx, &camera, "errors", Light::default(), vec![cube]).unwrap();

        assert!(matches!(
            scene.load_uniform(&mut ctx, 3, "model_matrix", Mat4::IDENTITY),
            Err(SceneError::UnknownModel { index: 3, .. })
        ));
        assert!(matches!(
            scene.load_uniform(&mut ctx, 0, "light.position", Vec3::ONE),
            Err(SceneError::Graphics {
                source: GraphicsError::UnknownUniform { .. },
                ..
            })
        ));
    }

    #[test]
    fn render_follows_the_camera_and_animation() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let mut camera = Camera::new(ctx.viewport());
        let cube = model(
            &mut ctx,
            ModelDescriptor::new("cube", MeshKind::SolidCube)
                .with_animation(Animation::demo_spin()),
        );
        let wire = model(&mut ctx, ModelDescriptor::new("wire", MeshKind::WireCube));
        let mut scene =
            Scene::new(&mut ctx, &camera, "moving", Light::default(), vec![cube, wire]).unwrap();

        camera.move_by(Movement::Forward, 0.5);
        ctx.begin_frame(Vec3::ZERO).unwrap();
        scene.render(&mut ctx, &camera).unwrap();
        ctx.end_frame().unwrap();

        let draws = ctx.frame_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].topology, Topology::Triangles);
        assert_eq!(draws[1].topology, Topology::LineStrip);
        assert_eq!(
            ctx.uniform(scene.models()[0].program(), "model_matrix").unwrap(),
            mat4_bytes(Animation::demo_spin().step().unwrap())
        );
        assert_eq!(
            ctx.uniform(scene.models()[1].program(), "view_matrix").unwrap(),
            mat4_bytes(camera.view_matrix())
        );
        assert_eq!(scene.frames(), 1);
    }

    #[test]
    fn set_models_releases_the_previous_ones() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let first = model(&mut ctx, ModelDescriptor::new("first", MeshKind::SolidCube));
        let mut scene =
            Scene::new(&mut ctx, &camera, "swap", Light::default(), vec![first]).unwrap();
        let second = model(&mut ctx, ModelDescriptor::new("second", MeshKind::Triangle));
        scene.set_models(&mut ctx, &camera, vec![second]).unwrap();
        assert_eq!(scene.models().len(), 1);
        assert_eq!(scene.models()[0].name(), "second");
        assert_eq!(ctx.live_handles(), 3);

        let third = model(&mut ctx, ModelDescriptor::new("third", MeshKind::WireCube));
        assert_eq!(scene.add_model(&mut ctx, &camera, third).unwrap(), 1);
        assert_eq!(ctx.live_handles(), 6);
    }

    #[test]
    fn destroyed_scene_refuses_to_render() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let cube = model(&mut ctx, ModelDescriptor::new("cube", MeshKind::SolidCube));
        let mut scene =
            Scene::new(&mut ctx, &camera, "gone", Light::default(), vec![cube]).unwrap();
        scene.destroy(&mut ctx).unwrap();
        scene.destroy(&mut ctx).unwrap();
        assert_eq!(ctx.live_handles(), 0);
        ctx.begin_frame(Vec3::ZERO).unwrap();
        assert!(matches!(
            scene.render(&mut ctx, &camera),
            Err(SceneError::Destroyed(_))
        ));
    }

    #[test]
    fn destroyed_scene_releases_models_it_refuses() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let mut scene =
            Scene::new(&mut ctx, &camera, "closed", Light::default(), Vec::new()).unwrap();
        scene.destroy(&mut ctx).unwrap();

        let late = model(&mut ctx, ModelDescriptor::new("late", MeshKind::SolidCube));
        assert!(matches!(
            scene.add_model(&mut ctx, &camera, late),
            Err(SceneError::Destroyed(_))
        ));
        assert_eq!(ctx.live_handles(), 0);

        let batch = vec![
            model(&mut ctx, ModelDescriptor::new("a", MeshKind::Triangle)),
            model(&mut ctx, ModelDescriptor::new("b", MeshKind::WireCube)),
        ];
        assert!(scene.set_models(&mut ctx, &camera, batch).is_err());
        assert_eq!(ctx.live_handles(), 0);
    }

    #[test]
    fn destroy_releases_the_remaining_models_after_a_failure() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let first = model(&mut ctx, ModelDescriptor::new("first", MeshKind::SolidCube));
        let second = model(&mut ctx, ModelDescriptor::new("second", MeshKind::Triangle));
        let stolen = first.program();
        let mut scene =
            Scene::new(&mut ctx, &camera, "partial", Light::default(), vec![first, second])
                .unwrap();
        ctx.release(Handle::Program(stolen)).unwrap();

        let err = scene.destroy(&mut ctx).unwrap_err();
        assert!(matches!(err, SceneError::Graphics { ref model, .. } if model == "first"));
        assert_eq!(ctx.live_handles(), 0);
        assert!(!scene.is_destroyed());
        assert!(scene.models()[1].is_destroyed());
    }

    #[test]
    fn set_models_installs_the_new_models_when_a_release_fails() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let camera = Camera::new(ctx.viewport());
        let old = model(&mut ctx, ModelDescriptor::new("old", MeshKind::SolidCube));
        let stolen = old.vertex_array();
        let mut scene =
            Scene::new(&mut ctx, &camera, "swap", Light::default(), vec![old]).unwrap();
        ctx.release(Handle::VertexArray(stolen)).unwrap();

        let new = model(&mut ctx, ModelDescriptor::new("new", MeshKind::Triangle));
        let new_handles = new.handles();
        assert!(scene.set_models(&mut ctx, &camera, vec![new]).is_err());
        assert_eq!(scene.models()[0].name(), "new");
        assert!(new_handles.iter().all(|handle| ctx.is_live(*handle)));
        assert_eq!(ctx.live_handles(), new_handles.len());
    }

    #[test]
    fn null_camera_projection_reaches_the_models() {
        let mut ctx = HeadlessContext::new((1280, 720));
        let mut camera = Camera::new(ctx.viewport());
        let cube = model(&mut ctx, ModelDescriptor::new("cube", MeshKind::SolidCube));
        let program = cube.program();
        let mut scene =
            Scene::new(&mut ctx, &camera, "null", Light::default(), vec![cube]).unwrap();

        camera.set_null_camera(true);
        ctx.begin_frame(Vec3::ZERO).unwrap();
        scene.render(&mut ctx, &camera).unwrap();
        ctx.end_frame().unwrap();
        assert_eq!(
            ctx.uniform(program, "projection_matrix").unwrap(),
            mat4_bytes(Mat4::IDENTITY)
        );
        assert_eq!(&ctx.frame_draws()[0].uniforms[..64], &mat4_bytes(Mat4::IDENTITY)[..]);

        camera.reset();
        ctx.begin_frame(Vec3::ZERO).unwrap();
        scene.render(&mut ctx, &camera).unwrap();
        ctx.end_frame().unwrap();
        assert_eq!(
            ctx.uniform(program, "projection_matrix").unwrap(),
            mat4_bytes(camera.projection_matrix())
        );
    }
}
