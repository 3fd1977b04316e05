use glam::{Mat4, Vec3};
use render_playground::render::{GraphicsContext, GraphicsError, HeadlessContext};
use render_playground::{
    demos, Camera, Light, Material, MeshKind, Model, ModelDescriptor, Movement, Scene,
    SceneError,
};

fn setup() -> (HeadlessContext, Camera) {
    let ctx = HeadlessContext::new((1280, 720));
    let camera = Camera::new(ctx.viewport());
    (ctx, camera)
}

fn render_frame(ctx: &mut HeadlessContext, scene: &mut Scene, camera: &Camera) {
    ctx.begin_frame(Vec3::ZERO).unwrap();
    scene.render(ctx, camera).unwrap();
    ctx.end_frame().unwrap();
}

fn mat4_bytes(matrix: Mat4) -> Vec<u8> {
    bytemuck::cast_slice(&matrix.to_cols_array()).to_vec()
}

#[test]
fn models_share_the_exact_view_matrix() {
    let (mut ctx, mut camera) = setup();
    let mut scene = demos::test_cube().build(&mut ctx, &camera).unwrap();

    camera.move_by(Movement::Forward, 0.5);
    camera.move_by(Movement::TurnRight, 0.3);
    camera.move_by(Movement::LookUp, 0.2);
    render_frame(&mut ctx, &mut scene, &camera);

    let expected = mat4_bytes(camera.view_matrix());
    let draws = ctx.frame_draws();
    assert_eq!(draws.len(), 2);
    for model in scene.models() {
        assert_eq!(ctx.uniform(model.program(), "view_matrix").unwrap(), &expected[..]);
    }
    for draw in draws {
        assert_eq!(&draw.uniforms[64..128], &expected[..]);
    }
}

#[test]
fn draws_follow_model_order_with_their_own_transform() {
    let (mut ctx, camera) = setup();
    let mut scene = demos::material_boxes().build(&mut ctx, &camera).unwrap();
    render_frame(&mut ctx, &mut scene, &camera);

    let draws = ctx.frame_draws();
    assert_eq!(draws.len(), 3);
    for (draw, model) in draws.iter().zip(scene.models()) {
        assert_eq!(draw.program, model.program());
        assert_eq!(draw.vertex_array, model.vertex_array());
        assert_eq!(draw.texture, model.texture());
        assert_eq!(&draw.uniforms[128..192], &mat4_bytes(model.model_matrix())[..]);
    }
    assert_eq!(scene.frames(), 1);
}

#[test]
fn load_uniform_is_idempotent() {
    let (mut ctx, camera) = setup();
    let mut scene = demos::hello_triangle().build(&mut ctx, &camera).unwrap();
    let program = scene.models()[0].program();

    scene
        .load_uniform(&mut ctx, 0, "color", Vec3::new(0.1, 0.2, 0.3))
        .unwrap();
    let once = ctx.uniform_block(program).unwrap().to_vec();
    scene
        .load_uniform(&mut ctx, 0, "color", Vec3::new(0.1, 0.2, 0.3))
        .unwrap();
    assert_eq!(ctx.uniform_block(program).unwrap(), &once[..]);

    let color: &[u8] = bytemuck::cast_slice(&[0.1f32, 0.2, 0.3]);
    assert_eq!(ctx.uniform(program, "color").unwrap(), color);

    render_frame(&mut ctx, &mut scene, &camera);
    assert_eq!(ctx.uniform(program, "color").unwrap(), color);
}

#[test]
fn load_uniform_reports_unknown_names_and_models() {
    let (mut ctx, camera) = setup();
    let scene = demos::companion_cube().build(&mut ctx, &camera).unwrap();

    let err = scene
        .load_uniform(&mut ctx, 0, "material.shininess", 32.0f32)
        .unwrap_err();
    assert!(matches!(
        err,
        SceneError::Graphics {
            source: GraphicsError::UnknownUniform { .. },
            ..
        }
    ));

    let err = scene
        .load_uniform(&mut ctx, 4, "use_texture", 1i32)
        .unwrap_err();
    assert!(matches!(err, SceneError::UnknownModel { index: 4, .. }));
}

#[test]
fn lit_models_are_primed_with_light_and_material() {
    let (mut ctx, camera) = setup();
    let scene = demos::companion_cube().build(&mut ctx, &camera).unwrap();
    let program = scene.models()[0].program();
    let light = Light::default();

    let read_vec3 = |name: &str| -> Vec3 {
        Vec3::from_array(bytemuck::pod_read_unaligned(ctx.uniform(program, name).unwrap()))
    };
    assert_eq!(read_vec3("light.position"), light.position());
    assert_eq!(read_vec3("light.color"), light.color());
    assert_eq!(read_vec3("camera_position"), camera.position());

    let brightness: f32 =
        bytemuck::pod_read_unaligned(ctx.uniform(program, "material.surface_brightness").unwrap());
    assert_eq!(brightness, 56.0);
    let use_texture: i32 =
        bytemuck::pod_read_unaligned(ctx.uniform(program, "use_texture").unwrap());
    assert_eq!(use_texture, 1);
    assert_eq!(
        ctx.uniform(program, "projection_matrix").unwrap(),
        &mat4_bytes(camera.projection_matrix())[..]
    );
}

#[test]
fn destroy_releases_every_handle_once() {
    let (mut ctx, camera) = setup();
    let mut scene = demos::material_boxes().build(&mut ctx, &camera).unwrap();
    let handles: Vec<_> = scene.models().iter().flat_map(Model::handles).collect();
    assert_eq!(ctx.live_handles(), handles.len());

    scene.destroy(&mut ctx).unwrap();
    assert!(scene.is_destroyed());
    assert!(handles.iter().all(|handle| !ctx.is_live(*handle)));
    assert_eq!(ctx.live_handles(), 0);

    scene.destroy(&mut ctx).unwrap();
    assert_eq!(ctx.live_handles(), 0);

    ctx.begin_frame(Vec3::ZERO).unwrap();
    assert!(matches!(
        scene.render(&mut ctx, &camera),
        Err(SceneError::Destroyed(_))
    ));
}

#[test]
fn models_added_later_are_primed_against_the_camera() {
    let (mut ctx, mut camera) = setup();
    let mut scene = Scene::new(&mut ctx, &camera, "late", Light::default(), Vec::new()).unwrap();
    camera.move_by(Movement::StrafeUp, 1.0);

    let descriptor = ModelDescriptor::new("box", MeshKind::TexturedCube)
        .with_material(Material::preset("emerald").unwrap())
        .at(Vec3::new(0.0, 0.0, -2.0));
    let model = Model::new(&mut ctx, &descriptor).unwrap();
    let index = scene.add_model(&mut ctx, &camera, model).unwrap();
    let program = scene.models()[index].program();

    assert_eq!(
        ctx.uniform(program, "view_matrix").unwrap(),
        &mat4_bytes(camera.view_matrix())[..]
    );
    let use_texture: i32 =
        bytemuck::pod_read_unaligned(ctx.uniform(program, "use_texture").unwrap());
    assert_eq!(use_texture, 0);
    assert_eq!(scene.models()[index].position(), Vec3::new(0.0, 0.0, -2.0));
}

#[test]
fn pitch_stays_clamped_while_looking_around() {
    let (_, mut camera) = setup();
    camera.move_by(Movement::LookUp, 10.0);
    assert_eq!(camera.pitch(), 89.0);
    camera.move_by(Movement::LookDown, 20.0);
    assert_eq!(camera.pitch(), -89.0);
    assert!(camera.forward().is_normalized());
}
