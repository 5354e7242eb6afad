//! Scenes
//!
//! A scene owns its actors, cameras and actor templates. While started it
//! listens to the frame driver's UPDATE and RENDER events, advances its
//! cameras, and republishes scoped events that its actors subscribe to.
//!
//! ```text
//! Stopped --start()--> Started --stop()--> Stopped
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::{Actor, Camera};
use crate::app::App;
use crate::events::{Dispatcher, Event, EventDispatcher, EventId, EventTarget, ObjectKey};
use crate::foundation::collections::{CameraId, HandleMap};
use crate::foundation::math::Mat4;
use crate::script::{ScriptError, ScriptHost};

/// Scene errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Another actor already uses the name
    #[error("Actor '{0}' already exists in the scene")]
    DuplicateActor(String),

    /// Camera handle does not belong to the scene
    #[error("Camera is not owned by the scene")]
    UnknownCamera,

    /// No template registered under the id
    #[error("Actor template '{0}' not found")]
    UnknownTemplate(String),

    /// Actor passed as a template was created as a live actor
    #[error("Actor '{0}' is not a template")]
    NotATemplate(String),
}

/// Owner of actors and cameras
pub struct Scene {
    name: String,
    app: Weak<App>,
    dispatcher: Dispatcher,
    actors: RefCell<Vec<Rc<Actor>>>,
    templates: RefCell<HashMap<String, Rc<Actor>>>,
    cameras: RefCell<HandleMap<CameraId, Camera>>,
    current_camera: Cell<Option<CameraId>>,
    scripts: RefCell<Vec<Rc<dyn ScriptHost>>>,
    started: Cell<bool>,
    self_ref: Weak<Scene>,
}

impl Scene {
    /// Fired after the scene subscribes to the frame driver
    pub const START: EventId = EventId::namespaced(EventId::SCENE_PREFIX, 1);
    /// Fired after the scene unsubscribes from the frame driver
    pub const STOP: EventId = EventId::namespaced(EventId::SCENE_PREFIX, 2);
    /// Fired once per frame driver update, same payload
    pub const UPDATE: EventId = EventId::namespaced(EventId::SCENE_PREFIX, 3);
    /// Fired once per frame driver render
    pub const RENDER: EventId = EventId::namespaced(EventId::SCENE_PREFIX, 4);

    /// Create a stopped scene driven by `app`
    pub fn new(name: impl Into<String>, app: &Rc<App>) -> Rc<Self> {
        let name = name.into();
        Rc::new_cyclic(|self_ref| Self {
            name,
            app: Rc::downgrade(app),
            dispatcher: Dispatcher::new(),
            actors: RefCell::new(Vec::new()),
            templates: RefCell::new(HashMap::new()),
            cameras: RefCell::new(HandleMap::with_key()),
            current_camera: Cell::new(None),
            scripts: RefCell::new(Vec::new()),
            started: Cell::new(false),
            self_ref: self_ref.clone(),
        })
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Frame driver, if alive
    pub fn app(&self) -> Option<Rc<App>> {
        self.app.upgrade()
    }

    /// Take ownership of `actor` and subscribe it to this scene
    pub fn add_actor(self: &Rc<Self>, actor: Rc<Actor>) -> Result<(), SceneError> {
        if self.actor_by_name(actor.name()).is_some() {
            return Err(SceneError::DuplicateActor(actor.name().to_string()));
        }

        actor.set_scene(self);
        self.actors.borrow_mut().push(actor);
        Ok(())
    }

    /// Unsubscribe and release the actor named `name`
    pub fn remove_actor(&self, name: &str) -> Option<Rc<Actor>> {
        let actor = {
            let mut actors = self.actors.borrow_mut();
            let index = actors.iter().position(|actor| actor.name() == name)?;
            actors.remove(index)
        };

        actor.leave_scene();
        Some(actor)
    }

    /// Actor named `name`
    pub fn actor_by_name(&self, name: &str) -> Option<Rc<Actor>> {
        self.actors
            .borrow()
            .iter()
            .find(|actor| actor.name() == name)
            .cloned()
    }

    /// Actors carrying `tag`, in insertion order
    pub fn actors_by_tag(&self, tag: &str) -> Vec<Rc<Actor>> {
        self.actors
            .borrow()
            .iter()
            .filter(|actor| actor.has_tag(tag))
            .cloned()
            .collect()
    }

    /// Names of all actors, in insertion order
    pub fn actor_names(&self) -> Vec<String> {
        self.actors
            .borrow()
            .iter()
            .map(|actor| actor.name().to_string())
            .collect()
    }

    /// Number of owned actors
    pub fn actor_count(&self) -> usize {
        self.actors.borrow().len()
    }

    /// Register a prototype under `id`, replacing any previous one
    ///
    /// Only actors created with [`Actor::new_template`] are accepted, so a
    /// registered template never receives frame events.
    pub fn add_actor_template(self: &Rc<Self>, id: impl Into<String>, actor: Rc<Actor>) -> Result<(), SceneError> {
        if !actor.is_template() {
            return Err(SceneError::NotATemplate(actor.name().to_string()));
        }

        actor.set_scene(self);
        self.templates.borrow_mut().insert(id.into(), actor);
        Ok(())
    }

    /// Prototype registered under `id`
    pub fn actor_template(&self, id: &str) -> Option<Rc<Actor>> {
        self.templates.borrow().get(id).cloned()
    }

    /// Copy the template `id` into a live actor named `name`
    pub fn instantiate_template(self: &Rc<Self>, id: &str, name: &str) -> Result<Rc<Actor>, SceneError> {
        let template = self
            .actor_template(id)
            .ok_or_else(|| SceneError::UnknownTemplate(id.to_string()))?;
        if self.actor_by_name(name).is_some() {
            return Err(SceneError::DuplicateActor(name.to_string()));
        }

        let actor = template.duplicate(name);
        self.add_actor(Rc::clone(&actor))?;
        Ok(actor)
    }

    /// Take ownership of `camera`
    pub fn add_camera(&self, camera: Camera) -> CameraId {
        self.cameras.borrow_mut().insert(camera)
    }

    /// Release a camera, clearing the current camera if it was this one
    pub fn remove_camera(&self, id: CameraId) -> Option<Camera> {
        if self.current_camera.get() == Some(id) {
            self.current_camera.set(None);
        }
        self.cameras.borrow_mut().remove(id)
    }

    /// Number of owned cameras
    pub fn camera_count(&self) -> usize {
        self.cameras.borrow().len()
    }

    /// Make an owned camera current
    pub fn set_current_camera(&self, id: CameraId) -> Result<(), SceneError> {
        if !self.cameras.borrow().contains_key(id) {
            return Err(SceneError::UnknownCamera);
        }
        self.current_camera.set(Some(id));
        Ok(())
    }

    /// Render without a camera
    pub fn clear_current_camera(&self) {
        self.current_camera.set(None);
    }

    /// Current camera handle
    pub fn current_camera(&self) -> Option<CameraId> {
        self.current_camera.get()
    }

    /// Read an owned camera
    pub fn with_camera<R>(&self, id: CameraId, f: impl FnOnce(&Camera) -> R) -> Option<R> {
        self.cameras.borrow().get(id).map(f)
    }

    /// Modify an owned camera
    pub fn with_camera_mut<R>(&self, id: CameraId, f: impl FnOnce(&mut Camera) -> R) -> Option<R> {
        self.cameras.borrow_mut().get_mut(id).map(f)
    }

    /// Read the current camera
    pub fn with_current_camera<R>(&self, f: impl FnOnce(&Camera) -> R) -> Option<R> {
        self.with_camera(self.current_camera.get()?, f)
    }

    /// View and projection matrices of the current camera
    pub fn camera_matrices(&self) -> Option<(Mat4, Mat4)> {
        self.with_current_camera(|camera| (camera.view(), camera.projection()))
    }

    /// Run a scene-level script in `host`
    ///
    /// The host is bound to this scene first, so the script can look actors
    /// up by name and subscribe to scene events. The scene keeps the host
    /// alive until [`Scene::clear_scripts`] or drop. A failed file leaves no
    /// listeners of the host's context behind.
    pub fn run_script(self: &Rc<Self>, host: &Rc<dyn ScriptHost>, path: &str) -> Result<(), ScriptError> {
        host.bind_scene(self);
        if let Err(e) = host.run_file(path) {
            log::error!("Scene '{}' script failed: {}", self.name, e);
            if !self.owns_script(host) {
                self.remove_script_listeners(host.as_ref());
            }
            return Err(e);
        }

        if !self.owns_script(host) {
            self.scripts.borrow_mut().push(Rc::clone(host));
        }
        log::debug!("Scene '{}' ran script '{}'", self.name, path);
        Ok(())
    }

    /// Number of script contexts kept by the scene
    pub fn script_count(&self) -> usize {
        self.scripts.borrow().len()
    }

    /// Release every scene script and the listeners its context registered
    /// on the scene and its actors
    pub fn clear_scripts(&self) {
        let hosts = std::mem::take(&mut *self.scripts.borrow_mut());
        for host in &hosts {
            self.remove_script_listeners(host.as_ref());
        }
    }

    fn owns_script(&self, host: &Rc<dyn ScriptHost>) -> bool {
        self.scripts
            .borrow()
            .iter()
            .any(|owned| owned.context_id() == host.context_id())
    }

    fn remove_script_listeners(&self, host: &dyn ScriptHost) {
        let context = host.context_id();
        let mut removed = self.dispatcher.remove_script_listeners(context);
        for actor in self.actors.borrow().iter() {
            removed += actor.dispatcher().remove_script_listeners(context);
        }
        if removed > 0 {
            log::debug!("Removed {} listeners of script context {:?} from scene '{}'", removed, context, self.name);
        }
    }

    /// Whether the scene receives frame events
    pub fn is_started(&self) -> bool {
        self.started.get()
    }

    /// Subscribe to the frame driver and fire [`Scene::START`]
    pub fn start(&self) {
        if self.started.get() {
            log::warn!("Scene '{}' is already started", self.name);
            return;
        }

        match self.app.upgrade() {
            Some(app) => {
                app.dispatcher()
                    .add_method(App::UPDATE, self.self_ref.clone(), Self::on_update);
                app.dispatcher()
                    .add_method(App::RENDER, self.self_ref.clone(), Self::on_render);
            }
            None => log::warn!("Scene '{}' started without a frame driver", self.name),
        }

        self.started.set(true);
        log::info!("Scene '{}' started", self.name);
        self.dispatcher
            .dispatch(&Event::new(Self::START).with_target(self.target()));
    }

    /// Unsubscribe from the frame driver and fire [`Scene::STOP`]
    pub fn stop(&self) {
        if !self.started.get() {
            return;
        }

        self.unsubscribe();
        self.started.set(false);
        log::info!("Scene '{}' stopped", self.name);
        self.dispatcher
            .dispatch(&Event::new(Self::STOP).with_target(self.target()));
    }

    fn unsubscribe(&self) {
        if let Some(app) = self.app.upgrade() {
            app.dispatcher().remove_listeners_of(ObjectKey::of(self));
        }
    }

    fn target(&self) -> EventTarget {
        EventTarget::Scene(self.self_ref.clone())
    }

    fn on_update(&self, event: &Event) {
        for (_, camera) in self.cameras.borrow_mut().iter_mut() {
            camera.update();
        }
        self.dispatcher
            .dispatch(&event.forward(Self::UPDATE, self.target()));
    }

    fn on_render(&self, _event: &Event) {
        self.dispatcher
            .dispatch(&Event::new(Self::RENDER).with_target(self.target()));
    }
}

impl EventDispatcher for Scene {
    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("started", &self.started.get())
            .field("actors", &self.actors.borrow().len())
            .field("cameras", &self.cameras.borrow().len())
            .field("scripts", &self.scripts.borrow().len())
            .finish()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        if self.started.get() {
            log::error!("Scene '{}' dropped while started", self.name);
            self.unsubscribe();
        }
        self.clear_scripts();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::events::EventData;
    use crate::render::HeadlessBackend;
    use std::cell::Cell;

    thread_local! {
        static SCENE_EVENTS: RefCell<Vec<EventId>> = RefCell::new(Vec::new());
    }

    fn record(event: &Event) {
        SCENE_EVENTS.with(|events| events.borrow_mut().push(event.id));
    }

    fn app() -> Rc<App> {
        App::new(EngineConfig::default(), HeadlessBackend::new_shared())
    }

    #[test]
    fn test_start_stop_cycle() {
        let app = app();
        let scene = Scene::new("main", &app);
        scene.add_function_listeners();

        scene.start();
        scene.start();
        assert!(scene.is_started());
        assert_eq!(app.dispatcher().listener_count(App::UPDATE), 1);

        scene.stop();
        scene.stop();
        assert!(!scene.is_started());
        assert!(!app.dispatcher().has_listeners(App::UPDATE));
        assert!(!app.dispatcher().has_listeners(App::RENDER));

        scene.start();
        scene.stop();
        SCENE_EVENTS.with(|events| {
            assert_eq!(*events.borrow(), vec![Scene::START, Scene::STOP, Scene::START, Scene::STOP]);
        });
    }

    impl Scene {
        fn add_function_listeners(&self) {
            self.dispatcher.add_function(Self::START, record);
            self.dispatcher.add_function(Self::STOP, record);
        }
    }

    #[test]
    fn test_actor_lookup() {
        let app = app();
        let scene = Scene::new("main", &app);
        let hero = Actor::new("hero");
        hero.add_tag("player");
        scene.add_actor(Rc::clone(&hero)).unwrap();
        scene.add_actor(Actor::new("rock")).unwrap();

        assert!(scene.actor_by_name("hero").is_some_and(|found| Rc::ptr_eq(&found, &hero)));
        assert!(scene.actor_by_name("ghost").is_none());
        assert_eq!(scene.actors_by_tag("player").len(), 1);
        assert_eq!(scene.actor_names(), vec!["hero", "rock"]);
        assert_eq!(
            scene.add_actor(Actor::new("hero")),
            Err(SceneError::DuplicateActor("hero".to_string()))
        );
    }

    #[test]
    fn test_actor_listeners_follow_ownership() {
        let app = app();
        let scene = Scene::new("main", &app);
        let before = scene.dispatcher().listener_count(Scene::UPDATE);

        scene.add_actor(Actor::new("hero")).unwrap();
        assert_eq!(scene.dispatcher().listener_count(Scene::UPDATE), before + 1);
        assert_eq!(scene.dispatcher().listener_count(Scene::RENDER), before + 1);

        let removed = scene.remove_actor("hero");
        assert!(removed.is_some());
        assert_eq!(scene.dispatcher().listener_count(Scene::UPDATE), before);
        assert!(removed.is_some_and(|actor| actor.scene().is_none()));
        assert!(scene.remove_actor("hero").is_none());
    }

    #[test]
    fn test_current_camera_must_be_owned() {
        let app = app();
        let scene = Scene::new("main", &app);
        let other = Scene::new("other", &app);
        other.add_camera(Camera::new(1.0));
        let foreign = other.add_camera(Camera::new(1.0));
        let own = scene.add_camera(Camera::new(2.0));

        assert!(scene.camera_matrices().is_none());
        assert_eq!(scene.set_current_camera(foreign), Err(SceneError::UnknownCamera));
        scene.set_current_camera(own).unwrap();
        assert_eq!(scene.with_current_camera(Camera::aspect), Some(2.0));

        scene.remove_camera(own);
        assert!(scene.current_camera().is_none());
        assert_eq!(scene.camera_count(), 0);
    }

    #[test]
    fn test_update_advances_cameras_and_forwards_payload() {
        let app = app();
        let scene = Scene::new("main", &app);
        let camera = scene.add_camera(Camera::new(1.0));
        scene.with_camera_mut(camera, |camera| camera.add_velocity(crate::foundation::math::Vec3::x()));

        thread_local! {
            static PAYLOAD: Cell<u32> = Cell::new(0);
        }
        fn capture(event: &Event) {
            if let Some(value) = event.value::<u32>() {
                PAYLOAD.with(|payload| payload.set(*value));
            }
            assert!(event.target.scene().is_some());
        }
        scene.dispatcher().add_function(Scene::UPDATE, capture);

        scene.start();
        app.dispatch_event(&Event::new(App::UPDATE).with_data(EventData::value(42u32)));
        scene.stop();

        assert_eq!(PAYLOAD.with(Cell::get), 42);
        assert_eq!(scene.with_camera(camera, |camera| camera.position().x), Some(1.0));
    }

    #[test]
    fn test_templates_do_not_subscribe() {
        let app = app();
        let scene = Scene::new("main", &app);
        let template = Actor::new_template("crate");
        template.add_tag("prop");
        scene.add_actor_template("crate", template).unwrap();
        assert!(!scene.dispatcher().has_listeners(Scene::UPDATE));

        let instance = scene.instantiate_template("crate", "crate_1").unwrap();
        assert!(instance.has_tag("prop"));
        assert_eq!(scene.dispatcher().listener_count(Scene::UPDATE), 1);
        assert_eq!(
            scene.instantiate_template("crate", "crate_1").err(),
            Some(SceneError::DuplicateActor("crate_1".to_string()))
        );
        assert_eq!(
            scene.instantiate_template("barrel", "barrel_1").err(),
            Some(SceneError::UnknownTemplate("barrel".to_string()))
        );
    }

    #[test]
    fn test_live_actor_rejected_as_template() {
        let app = app();
        let scene = Scene::new("main", &app);
        let live = Actor::new("crate");

        assert_eq!(
            scene.add_actor_template("crate", Rc::clone(&live)),
            Err(SceneError::NotATemplate("crate".to_string()))
        );
        assert!(scene.actor_template("crate").is_none());
        assert!(live.scene().is_none());
        assert!(!scene.dispatcher().has_listeners(Scene::UPDATE));
        assert!(!scene.dispatcher().has_listeners(Scene::RENDER));
    }

    #[test]
    fn test_dropping_started_scene_unsubscribes() {
        let app = app();
        let scene = Scene::new("main", &app);
        scene.start();
        assert!(app.dispatcher().has_listeners(App::UPDATE));

        drop(scene);
        assert!(!app.dispatcher().has_listeners(App::UPDATE));
    }
}
