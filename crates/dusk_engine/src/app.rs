//! Window-less frame driver
//!
//! [`App`] owns the engine services and the named scenes, and turns time
//! steps into `App::UPDATE` and `App::RENDER` events. Platform code (or a
//! test) decides how steps are produced: [`App::tick`] takes an explicit
//! step, [`App::run_frames`] samples the wall clock.

use std::cell::{Cell, Ref, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};
use std::time::Duration;

use thiserror::Error;

use crate::assets::{AssetError, Assets, ResourceLoader};
use crate::config::{Config, ConfigError, EngineConfig, ShaderConfig};
use crate::events::{Dispatcher, Event, EventData, EventDispatcher, EventId, EventTarget, UpdateContext};
use crate::foundation::time::Timer;
use crate::render::{
    MaterialFactory, MeshFactory, RenderError, ShaderProgram, ShaderRegistry, ShaderSource, SharedBackend,
};
use crate::scene::{Scene, SceneError};
use crate::script::ScriptError;

/// Frame driver errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Asset loading failed
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Backend rejected a resource
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Scene operation failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Script host failed
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// No scene registered under the name
    #[error("Scene '{0}' not found")]
    UnknownScene(String),

    /// Another scene already uses the name
    #[error("Scene '{0}' already exists")]
    DuplicateScene(String),
}

/// Engine root: services, scenes and the frame clock
pub struct App {
    config: EngineConfig,
    dispatcher: Dispatcher,
    timer: RefCell<Timer>,
    since_render: Cell<f32>,
    assets: Rc<Assets>,
    shaders: RefCell<ShaderRegistry>,
    backend: SharedBackend,
    scenes: RefCell<Vec<Rc<Scene>>>,
    current_scene: RefCell<Option<Rc<Scene>>>,
    self_ref: Weak<App>,
}

impl App {
    /// Fired once per tick with an [`UpdateContext`]
    pub const UPDATE: EventId = EventId::namespaced(EventId::APP_PREFIX, 1);
    /// Fired at the configured render rate
    pub const RENDER: EventId = EventId::namespaced(EventId::APP_PREFIX, 2);

    /// Create the frame driver around a graphics backend
    pub fn new(config: EngineConfig, backend: SharedBackend) -> Rc<Self> {
        log::info!(
            "Initializing engine: {}x{} '{}', target {} fps",
            config.window.width,
            config.window.height,
            config.window.title,
            config.frame.target_fps
        );

        let mut timer = Timer::new();
        timer.set_max_step(config.frame.max_delta);

        Rc::new_cyclic(|self_ref| Self {
            config,
            dispatcher: Dispatcher::new(),
            timer: RefCell::new(timer),
            since_render: Cell::new(0.0),
            assets: Rc::new(Assets::new()),
            shaders: RefCell::new(ShaderRegistry::new()),
            backend,
            scenes: RefCell::new(Vec::new()),
            current_scene: RefCell::new(None),
            self_ref: self_ref.clone(),
        })
    }

    /// Load an [`EngineConfig`] from `path` and create the frame driver
    pub fn from_config_file(path: impl AsRef<Path>, backend: SharedBackend) -> Result<Rc<Self>, AppError> {
        let config = EngineConfig::load_from_file(path)?;
        Ok(Self::new(config, backend))
    }

    /// Configuration the driver was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared asset stores
    pub fn assets(&self) -> &Rc<Assets> {
        &self.assets
    }

    /// Graphics backend shared with every resource
    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Compiled shader programs
    pub fn shaders(&self) -> Ref<'_, ShaderRegistry> {
        self.shaders.borrow()
    }

    /// Program registered under `name`
    pub fn shader(&self, name: &str) -> Option<Rc<ShaderProgram>> {
        self.shaders.borrow().get(name)
    }

    /// Mesh factory over the shared asset stores
    pub fn mesh_factory(&self) -> MeshFactory {
        MeshFactory::new(Rc::clone(&self.assets), Rc::clone(&self.backend))
    }

    /// Material factory over the shared asset stores
    pub fn material_factory(&self, loader: Rc<dyn ResourceLoader>) -> MaterialFactory {
        MaterialFactory::new(Rc::clone(&self.assets), Rc::clone(&self.backend), loader)
    }

    /// Compile every configured shader program into the registry
    ///
    /// Programs whose sources cannot be read or that fail to link are
    /// registered unloaded. Returns the number that linked.
    pub fn load_shaders(&self, loader: &dyn ResourceLoader) -> usize {
        let mut linked = 0;
        for shader in &self.config.shaders {
            let program = match self.compile_shader(shader, loader) {
                Ok(program) => {
                    linked += 1;
                    program
                }
                Err(e) => {
                    log::error!("Failed to build shader program '{}': {}", shader.name, e);
                    ShaderProgram::unloaded(&shader.name)
                }
            };
            self.shaders.borrow_mut().insert(program);
        }

        log::info!("Loaded {}/{} shader programs", linked, self.config.shaders.len());
        linked
    }

    fn compile_shader(&self, shader: &ShaderConfig, loader: &dyn ResourceLoader) -> Result<ShaderProgram, AppError> {
        let stages = shader
            .files
            .iter()
            .map(|file| {
                Ok(ShaderSource {
                    stage: file.stage,
                    path: file.path.clone(),
                    source: loader.load_shader_source(&file.path)?,
                })
            })
            .collect::<Result<Vec<_>, AssetError>>()?;

        Ok(ShaderProgram::compile(&shader.name, &stages, &self.backend)?)
    }

    /// Register a scene under its name
    pub fn add_scene(&self, scene: Rc<Scene>) -> Result<(), AppError> {
        if self.scene(scene.name()).is_some() {
            return Err(AppError::DuplicateScene(scene.name().to_string()));
        }

        log::debug!("Added scene '{}'", scene.name());
        self.scenes.borrow_mut().push(scene);
        Ok(())
    }

    /// Scene registered under `name`
    pub fn scene(&self, name: &str) -> Option<Rc<Scene>> {
        self.scenes
            .borrow()
            .iter()
            .find(|scene| scene.name() == name)
            .cloned()
    }

    /// Registered scene names, in registration order
    pub fn scene_names(&self) -> Vec<String> {
        self.scenes.borrow().iter().map(|scene| scene.name().to_string()).collect()
    }

    /// Stop the current scene and start `name`
    ///
    /// Selecting the current scene again only restarts it if it was stopped
    /// directly.
    pub fn set_current_scene(&self, name: &str) -> Result<(), AppError> {
        let next = self
            .scene(name)
            .ok_or_else(|| AppError::UnknownScene(name.to_string()))?;

        let previous = self.current_scene.replace(Some(Rc::clone(&next)));
        if let Some(previous) = previous {
            if !Rc::ptr_eq(&previous, &next) {
                previous.stop();
            }
        }

        if !next.is_started() {
            next.start();
        }
        Ok(())
    }

    /// Scene receiving frame events
    pub fn current_scene(&self) -> Option<Rc<Scene>> {
        self.current_scene.borrow().clone()
    }

    /// Advance by `step` and fire the frame events
    ///
    /// The step is clamped to `frame.max_delta`. UPDATE is always fired;
    /// RENDER follows once the time since the last render reaches the
    /// configured interval.
    pub fn tick(&self, step: Duration) {
        self.timer.borrow_mut().advance(step);
        self.fire_frame_events();
    }

    /// Drive `frames` ticks from the wall clock
    pub fn run_frames(&self, frames: u32) {
        for _ in 0..frames {
            self.timer.borrow_mut().update();
            self.fire_frame_events();
        }
    }

    fn fire_frame_events(&self) {
        let context = {
            let timer = self.timer.borrow();
            self.since_render.set(self.since_render.get() + timer.delta_time());
            UpdateContext {
                delta_time: timer.delta_time(),
                elapsed_time: self.since_render.get(),
                total_time: timer.total_time(),
                fps: timer.current_fps(),
            }
        };

        let target = EventTarget::App(self.self_ref.clone());
        self.dispatcher.dispatch(
            &Event::new(Self::UPDATE)
                .with_data(EventData::Update(context))
                .with_target(target.clone()),
        );

        let due = self
            .config
            .frame
            .render_interval()
            .map_or(true, |interval| self.since_render.get() >= interval);
        if due {
            self.since_render.set(0.0);
            self.dispatcher.dispatch(&Event::new(Self::RENDER).with_target(target));
        }
    }

    /// Frames stepped so far
    pub fn frame_count(&self) -> u64 {
        self.timer.borrow().frame_count()
    }

    /// Seconds stepped so far
    pub fn total_time(&self) -> f32 {
        self.timer.borrow().total_time()
    }

    /// Stop the current scene and release unused assets
    pub fn shutdown(&self) {
        if let Some(scene) = self.current_scene.take() {
            scene.stop();
        }

        let purged = self.assets.purge();
        log::info!("Engine shutdown complete after {} frames ({} assets purged)", self.frame_count(), purged);
    }
}

impl EventDispatcher for App {
    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(scene) = self.current_scene.get_mut().take() {
            scene.stop();
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("scenes", &self.scene_names())
            .field("current_scene", &self.current_scene().map(|scene| scene.name().to_string()))
            .field("frames", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrameConfig, ShaderFileConfig};
    use crate::render::{HeadlessBackend, ShaderStage};
    use std::collections::HashMap;

    thread_local! {
        static FRAME_EVENTS: RefCell<Vec<(EventId, Option<UpdateContext>)>> = RefCell::new(Vec::new());
    }

    fn record(event: &Event) {
        FRAME_EVENTS.with(|events| events.borrow_mut().push((event.id, event.update_context().copied())));
    }

    fn take_events() -> Vec<(EventId, Option<UpdateContext>)> {
        FRAME_EVENTS.with(|events| events.take())
    }

    fn app_at(target_fps: u32) -> Rc<App> {
        let config = EngineConfig {
            frame: FrameConfig {
                target_fps,
                max_delta: 0.25,
            },
            ..EngineConfig::default()
        };
        let app = App::new(config, HeadlessBackend::new_shared());
        app.dispatcher().add_function(App::UPDATE, record);
        app.dispatcher().add_function(App::RENDER, record);
        app
    }

    #[test]
    fn test_render_follows_target_rate() {
        take_events();
        let app = app_at(10);
        for _ in 0..4 {
            app.tick(Duration::from_millis(60));
        }

        let ids: Vec<_> = take_events().into_iter().map(|(id, _)| id).collect();
        assert_eq!(
            ids,
            vec![App::UPDATE, App::UPDATE, App::RENDER, App::UPDATE, App::UPDATE, App::RENDER]
        );
        assert_eq!(app.frame_count(), 4);
    }

    #[test]
    fn test_zero_target_renders_every_tick() {
        take_events();
        let app = app_at(0);
        app.tick(Duration::from_millis(5));
        app.tick(Duration::from_millis(5));

        let events = take_events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].0, App::RENDER);
        assert_eq!(events[3].0, App::RENDER);
    }

    #[test]
    fn test_update_context_is_clamped() {
        take_events();
        let app = app_at(0);
        app.tick(Duration::from_secs(3));

        let (id, context) = take_events()[0];
        assert_eq!(id, App::UPDATE);
        let context = context.unwrap();
        assert!((context.delta_time - 0.25).abs() < 1e-6);
        assert!((context.total_time - 0.25).abs() < 1e-6);
        assert!((context.fps - 4.0).abs() < 1e-3);
    }

    #[test]
    fn test_current_scene_switch() {
        let app = app_at(60);
        let menu = Scene::new("menu", &app);
        let level = Scene::new("level", &app);
        app.add_scene(Rc::clone(&menu)).unwrap();
        app.add_scene(Rc::clone(&level)).unwrap();
        assert!(matches!(app.add_scene(Scene::new("menu", &app)), Err(AppError::DuplicateScene(_))));

        app.set_current_scene("menu").unwrap();
        assert!(menu.is_started());
        app.set_current_scene("level").unwrap();
        assert!(!menu.is_started());
        assert!(level.is_started());
        assert!(matches!(app.set_current_scene("credits"), Err(AppError::UnknownScene(_))));
        assert!(level.is_started());

        app.shutdown();
        assert!(!level.is_started());
        assert!(app.current_scene().is_none());
    }

    #[test]
    fn test_reselecting_stopped_current_scene_restarts_it() {
        let app = app_at(60);
        let level = Scene::new("level", &app);
        app.add_scene(Rc::clone(&level)).unwrap();
        app.set_current_scene("level").unwrap();

        app.set_current_scene("level").unwrap();
        assert_eq!(app.dispatcher().listener_count(App::UPDATE), 1);

        level.stop();
        app.set_current_scene("level").unwrap();
        assert!(level.is_started());
        assert_eq!(app.dispatcher().listener_count(App::UPDATE), 1);
    }

    struct Sources(HashMap<String, String>);

    impl ResourceLoader for Sources {
        fn load_image(&self, path: &str) -> Result<crate::assets::ImageData, AssetError> {
            Err(AssetError::NotFound(path.to_string()))
        }

        fn load_shader_source(&self, path: &str) -> Result<String, AssetError> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| AssetError::NotFound(path.to_string()))
        }
    }

    fn shader(name: &str, vertex: &str, fragment: &str) -> ShaderConfig {
        ShaderConfig {
            name: name.to_string(),
            files: vec![
                ShaderFileConfig {
                    path: vertex.to_string(),
                    stage: ShaderStage::Vertex,
                },
                ShaderFileConfig {
                    path: fragment.to_string(),
                    stage: ShaderStage::Fragment,
                },
            ],
        }
    }

    #[test]
    fn test_load_shaders_registers_failures_unloaded() {
        let config = EngineConfig {
            shaders: vec![
                shader("basic", "basic.vert", "basic.frag"),
                shader("broken", "basic.vert", "missing.frag"),
            ],
            ..EngineConfig::default()
        };
        let app = App::new(config, HeadlessBackend::new_shared());
        let loader = Sources(HashMap::from([
            ("basic.vert".to_string(), "void main() {}".to_string()),
            ("basic.frag".to_string(), "void main() {}".to_string()),
        ]));

        assert_eq!(app.load_shaders(&loader), 1);
        assert_eq!(app.shaders().names(), vec!["basic", "broken"]);
        assert!(app.shader("basic").is_some_and(|program| program.is_loaded()));
        assert!(app.shader("broken").is_some_and(|program| !program.is_loaded()));
    }

    #[test]
    fn test_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "[frame]\ntarget_fps = 30\n").unwrap();

        let app = App::from_config_file(&path, HeadlessBackend::new_shared()).unwrap();
        assert_eq!(app.config().frame.target_fps, 30);

        let missing = App::from_config_file(dir.path().join("engine.yaml"), HeadlessBackend::new_shared());
        assert!(matches!(missing, Err(AppError::Config(ConfigError::UnsupportedFormat(_)))));
    }
}
