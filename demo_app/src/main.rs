//! Spinning cubes demo
//!
//! Builds a scene of textured cubes around a camera and drives it for a few
//! hundred frames on the headless backend, then reports what was drawn.
//!
//! Usage: `spinning_cubes [config.toml|config.ron]`

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use dusk_engine::events::ObjectKey;
use dusk_engine::foundation::logging;
use dusk_engine::foundation::math::{constants, Vec3};
use dusk_engine::prelude::*;
use dusk_engine::render::ResourceKind;
use dusk_engine::scene::ActorLink;
use thiserror::Error;

const CUBE_COUNT: usize = 8;
const FRAMES: u32 = 240;
const RING_RADIUS: f32 = 6.0;

#[derive(Error, Debug)]
enum DemoError {
    #[error(transparent)]
    Engine(#[from] AppError),

    #[error(transparent)]
    Scene(#[from] SceneError),
}

/// Turns its actor around the Y axis every update
struct Spinner {
    link: ActorLink,
    speed: f32,
    angle: Cell<f32>,
}

impl Spinner {
    fn new(speed: f32) -> Rc<Self> {
        Rc::new(Self {
            link: ActorLink::new(),
            speed,
            angle: Cell::new(0.0),
        })
    }

    fn on_update(&self, event: &Event) {
        let (Some(actor), Some(context)) = (self.link.get(), event.update_context()) else {
            return;
        };

        let angle = (self.angle.get() + self.speed * context.delta_time) % constants::TWO_PI;
        self.angle.set(angle);
        actor.set_rotation(Vec3::new(0.0, angle, 0.0));
    }
}

impl Component for Spinner {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Custom("spinner")
    }

    fn actor(&self) -> Option<Rc<Actor>> {
        self.link.get()
    }

    fn attach(self: Rc<Self>, actor: &Rc<Actor>) {
        if self.link.rebind(actor, ObjectKey::of(&*self)) {
            actor
                .dispatcher()
                .add_method(Actor::UPDATE, Rc::downgrade(&self), Self::on_update);
        }
    }

    fn detach(&self) {
        self.link.release(ObjectKey::of(self));
    }

    fn duplicate(&self) -> Option<Rc<dyn Component>> {
        Some(Self::new(self.speed))
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn std::any::Any> {
        self
    }
}

fn load_config() -> EngineConfig {
    let Some(path) = std::env::args().nth(1) else {
        return EngineConfig::default();
    };

    match EngineConfig::load_from_file(&path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Using default configuration, '{}' could not be loaded: {}", path, e);
            EngineConfig::default()
        }
    }
}

fn build_scene(app: &Rc<App>) -> Result<Rc<Scene>, DemoError> {
    let scene = Scene::new("cubes", app);
    let meshes = app.mesh_factory();
    let materials = app.material_factory(Rc::new(FileLoader::from_config(&app.config().assets)));
    let program = app.shader("basic");

    let eye = Actor::new("eye");
    eye.set_position(Vec3::new(0.0, 3.0, 12.0));
    let camera = CameraComponent::new(&scene, Camera::new(app.config().window.aspect_ratio()));
    eye.add_component(camera.clone());
    camera.make_current()?;
    scene.add_actor(eye)?;

    let template = Actor::new_template("cube");
    template.add_tag("spinning");
    let crate_material = materials.material(&MaterialDesc {
        diffuse_map: Some("textures/crate.png".to_string()),
        ..MaterialDesc::colored("crate", [0.8, 0.6, 0.4, 1.0])
    });
    template.add_component(MeshComponent::new(
        meshes.cuboid_with_material(1.0, 1.0, 1.0, &crate_material),
        program,
        Rc::clone(app.backend()),
    ));
    template.add_component(Spinner::new(1.5));
    scene.add_actor_template("cube", template)?;

    for i in 0..CUBE_COUNT {
        let cube = scene.instantiate_template("cube", &format!("cube_{}", i))?;
        let angle = constants::TWO_PI * i as f32 / CUBE_COUNT as f32;
        cube.set_position(Vec3::new(angle.cos() * RING_RADIUS, 0.0, angle.sin() * RING_RADIUS));
    }

    let floor = Actor::new("floor");
    floor.set_position(Vec3::new(0.0, -1.0, 0.0));
    floor.add_component(MeshComponent::new(meshes.plane(20.0, 20.0), None, Rc::clone(app.backend())));
    scene.add_actor(floor)?;

    Ok(scene)
}

fn run() -> Result<(), DemoError> {
    let config = load_config();
    logging::init_with_level(config.log.level_filter());

    let headless = HeadlessBackend::new_shared();
    let app = App::new(config, headless.clone());
    let loader = FileLoader::from_config(&app.config().assets);
    app.load_shaders(&loader);

    let scene = build_scene(&app)?;
    app.add_scene(scene)?;
    let start = app
        .config()
        .start_scene
        .clone()
        .unwrap_or_else(|| "cubes".to_string());
    app.set_current_scene(&start)?;

    let step = app
        .config()
        .frame
        .render_interval()
        .map_or(Duration::from_millis(16), Duration::from_secs_f32);
    for _ in 0..FRAMES {
        app.tick(step);
    }

    let (meshes, materials, textures) = app.assets().cached_counts();
    {
        let backend = headless.borrow();
        log::info!(
            "{} frames in {:.2}s: {} draw calls, {} live meshes",
            app.frame_count(),
            app.total_time(),
            backend.draw_count(),
            backend.live_count(ResourceKind::Mesh)
        );
    }
    log::info!("Cached assets: {} meshes, {} materials, {} textures", meshes, materials, textures);

    app.shutdown();
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}
