//! The per-frame loop: pre-move, collision resolution, post-move, draw.
//!
//! The scheduler owns the [`World`] and the [`Compositor`], the movable and collision
//! candidate registries, and the input subscriber lists. A frame runs to completion
//! inside [`Scheduler::step`]; since it takes `&mut self`, nothing can change scene
//! membership while a frame is iterating it.

use std::time::Instant;

use crate::entities::Entity;
use crate::input::{InputEvent, KeyEvent, MouseEvent};
use crate::physics;
use crate::render::{Canvas, Compositor};
use crate::world::{EntityId, World};

/// Identifies a registered input handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// What input handlers may touch while they run.
pub struct HandlerContext<'a> {
    pub world: &'a mut World,
    pub compositor: &'a mut Compositor,
}

type KeyHandler = Box<dyn FnMut(&KeyEvent, &mut HandlerContext<'_>)>;
type MouseHandler = Box<dyn FnMut(&MouseEvent, &mut HandlerContext<'_>)>;

pub struct Scheduler {
    world: World,
    compositor: Compositor,
    movables: Vec<EntityId>,
    candidates: Vec<EntityId>,
    key_handlers: Vec<(HandlerId, KeyHandler)>,
    mouse_handlers: Vec<(HandlerId, MouseHandler)>,
    next_handler: u64,
    last_frame: Option<Instant>,
    frame_count: u64,
}

impl Scheduler {
    pub fn new(compositor: Compositor) -> Self {
        Self {
            world: World::new(),
            compositor,
            movables: Vec::new(),
            candidates: Vec::new(),
            key_handlers: Vec::new(),
            mouse_handlers: Vec::new(),
            next_handler: 1,
            last_frame: None,
            frame_count: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut Compositor {
        &mut self.compositor
    }

    /// Borrow the world and the compositor at the same time.
    pub fn context(&mut self) -> HandlerContext<'_> {
        HandlerContext {
            world: &mut self.world,
            compositor: &mut self.compositor,
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.world.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.world.get_mut(id)
    }

    /// Add an entity to the scene.
    ///
    /// Every entity is registered for drawing. Physical entities (and actors) are also
    /// registered as movable and as collision candidates.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let physical = entity.is_physical();
        let id = self.world.spawn(entity);
        self.compositor.register_drawable(id);
        if physical {
            self.movables.push(id);
            self.candidates.push(id);
        }
        log::debug!("spawned entity {} (physical: {physical})", id.to_u32());
        id
    }

    /// Remove an entity from the world and from every registry.
    pub fn despawn(&mut self, id: EntityId) -> Option<Entity> {
        self.compositor.unregister_drawable(id);
        self.movables.retain(|other| *other != id);
        self.candidates.retain(|other| *other != id);
        let entity = self.world.despawn(id);
        if entity.is_none() {
            log::warn!("despawn: unknown entity {}", id.to_u32());
        }
        entity
    }

    fn check_physical(&self, id: EntityId, operation: &str) -> bool {
        match self.world.get(id) {
            Some(entity) if entity.is_physical() => true,
            Some(_) => {
                log::warn!("{operation}: entity {} is not physical", id.to_u32());
                false
            }
            None => {
                log::warn!("{operation}: unknown entity {}", id.to_u32());
                false
            }
        }
    }

    /// Include a physical entity in the pre-move and post-move passes.
    ///
    /// Returns `false`, and changes nothing, for unknown or non-physical entities.
    pub fn register_movable(&mut self, id: EntityId) -> bool {
        if !self.check_physical(id, "register_movable") {
            return false;
        }
        if !self.movables.contains(&id) {
            self.movables.push(id);
        }
        true
    }

    /// Include a physical entity in collision resolution.
    ///
    /// Returns `false`, and changes nothing, for unknown or non-physical entities.
    pub fn register_collision_candidate(&mut self, id: EntityId) -> bool {
        if !self.check_physical(id, "register_collision_candidate") {
            return false;
        }
        if !self.candidates.contains(&id) {
            self.candidates.push(id);
        }
        true
    }

    /// Drop an entity from the movable and collision candidate registries.
    ///
    /// The entity stays in the world and keeps being drawn. Returns `false` when it was in
    /// neither registry.
    pub fn unregister(&mut self, id: EntityId) -> bool {
        let before = self.movables.len() + self.candidates.len();
        self.movables.retain(|other| *other != id);
        self.candidates.retain(|other| *other != id);
        let removed = self.movables.len() + self.candidates.len() != before;
        if !removed {
            log::warn!("unregister: entity {} was not registered", id.to_u32());
        }
        removed
    }

    pub fn is_movable(&self, id: EntityId) -> bool {
        self.movables.contains(&id)
    }

    pub fn is_collision_candidate(&self, id: EntityId) -> bool {
        self.candidates.contains(&id)
    }

    pub fn movables(&self) -> &[EntityId] {
        &self.movables
    }

    pub fn collision_candidates(&self) -> &[EntityId] {
        &self.candidates
    }

    fn next_handler_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        id
    }

    /// Subscribe to key events. Handlers run in registration order.
    pub fn register_key_handler<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&KeyEvent, &mut HandlerContext<'_>) + 'static,
    {
        let id = self.next_handler_id();
        self.key_handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unregister_key_handler(&mut self, id: HandlerId) -> bool {
        let before = self.key_handlers.len();
        self.key_handlers.retain(|(other, _)| *other != id);
        let removed = self.key_handlers.len() != before;
        if !removed {
            log::warn!("unregister_key_handler: unknown handler {id:?}");
        }
        removed
    }

    /// Subscribe to mouse events. Handlers run in registration order.
    pub fn register_mouse_handler<F>(&mut self, handler: F) -> HandlerId
    where
        F: FnMut(&MouseEvent, &mut HandlerContext<'_>) + 'static,
    {
        let id = self.next_handler_id();
        self.mouse_handlers.push((id, Box::new(handler)));
        id
    }

    pub fn unregister_mouse_handler(&mut self, id: HandlerId) -> bool {
        let before = self.mouse_handlers.len();
        self.mouse_handlers.retain(|(other, _)| *other != id);
        let removed = self.mouse_handlers.len() != before;
        if !removed {
            log::warn!("unregister_mouse_handler: unknown handler {id:?}");
        }
        removed
    }

    /// Forward key events to an actor's controller.
    ///
    /// Returns the key handler doing the forwarding, or `None` if `actor` has no controller.
    pub fn route_keys_to(&mut self, actor: EntityId) -> Option<HandlerId> {
        if self.world.get(actor).and_then(Entity::controller).is_none() {
            log::warn!("route_keys_to: entity {} is not an actor", actor.to_u32());
            return None;
        }
        Some(self.register_key_handler(move |event, ctx| {
            if let Some(action) = ctx.world.get_mut(actor).and_then(|e| e.handle_key(event)) {
                log::trace!("entity {} action {action:?}", actor.to_u32());
            }
        }))
    }

    /// Deliver an event to every subscriber of its kind.
    pub fn dispatch(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Key(key) => self.dispatch_key(key),
            InputEvent::Mouse(mouse) => self.dispatch_mouse(mouse),
        }
    }

    pub fn dispatch_key(&mut self, event: &KeyEvent) {
        let mut ctx = HandlerContext {
            world: &mut self.world,
            compositor: &mut self.compositor,
        };
        for (_, handler) in &mut self.key_handlers {
            handler(event, &mut ctx);
        }
    }

    pub fn dispatch_mouse(&mut self, event: &MouseEvent) {
        let mut ctx = HandlerContext {
            world: &mut self.world,
            compositor: &mut self.compositor,
        };
        for (_, handler) in &mut self.mouse_handlers {
            handler(event, &mut ctx);
        }
    }

    /// Start (or restart) the clock. The next [`frame`](Self::frame) measures from `now`.
    pub fn start(&mut self, now: Instant) {
        if self.last_frame.is_some() {
            log::debug!("scheduler clock restarted");
        } else {
            log::info!("scheduler started");
        }
        self.last_frame = Some(now);
    }

    pub fn is_started(&self) -> bool {
        self.last_frame.is_some()
    }

    /// Number of frames run so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Run one frame using the wall time elapsed since the previous frame. Returns the
    /// delta in seconds.
    ///
    /// Before [`start`](Self::start) the delta is zero, so nothing moves.
    pub fn frame(&mut self, now: Instant, canvas: &mut dyn Canvas) -> f32 {
        let dt = match self.last_frame {
            Some(last) => now.saturating_duration_since(last).as_secs_f32(),
            None => {
                log::warn!("frame called before start");
                0.0
            }
        };
        self.step(dt, canvas);
        self.last_frame = Some(now);
        dt
    }

    /// Run one frame with an explicit delta in seconds.
    pub fn step(&mut self, dt: f32, canvas: &mut dyn Canvas) {
        for &id in &self.movables {
            if let Some(entity) = self.world.get_mut(id) {
                entity.pre_move(dt);
            }
        }

        physics::resolve_collisions(&mut self.world, &self.candidates);

        for &id in &self.movables {
            if let Some(entity) = self.world.get_mut(id) {
                entity.post_move();
            }
        }

        self.compositor.draw(canvas, &self.world);
        self.frame_count += 1;
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Compositor::default())
    }
}
