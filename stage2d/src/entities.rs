//! Scene entities: a sprite, optionally with a physics body, optionally with a controller.
//!
//! The three capability levels refine each other:
//! - drawable: [`Sprite`] only
//! - physical: [`Sprite`] + [`Body`] (obstacles, props, anything that collides)
//! - actor: [`Sprite`] + [`Body`] + [`Controller`] (moved by routed key events)

use crate::actor::{Action, Controller};
use crate::assets::ImageHandle;
use crate::input::KeyEvent;
use crate::math::{Bounds, Vec2};

/// Border size used when a physical entity has neither an explicit border nor a sized image.
pub const DEFAULT_BORDER: f32 = 64.0;

/// Position, pivot, scale and image of anything that can be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    pub position: Vec2,
    /// Anchor inside the sprite as a fraction of its size; (0.5, 0.5) is the center and
    /// Y is measured from the bottom.
    pub pivot: Vec2,
    pub scale: Vec2,
    /// Higher layers draw on top.
    pub layer: i32,
    pub visible: bool,
    image: Option<ImageHandle>,
    original_size: Option<Vec2>,
}

impl Sprite {
    pub fn new(image: Option<ImageHandle>) -> Self {
        Self {
            position: Vec2::ZERO,
            pivot: Vec2::HALF,
            scale: Vec2::ONE,
            layer: 0,
            visible: true,
            image,
            original_size: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn with_pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    /// Same scale on both axes.
    #[must_use]
    pub fn with_uniform_scale(self, scale: f32) -> Self {
        self.with_scale(Vec2::splat(scale))
    }

    #[must_use]
    pub fn with_layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn image(&self) -> Option<&ImageHandle> {
        self.image.as_ref()
    }

    pub fn set_image(&mut self, image: Option<ImageHandle>) {
        self.image = image;
    }

    /// Override the unscaled size instead of taking it from the image.
    pub fn set_original_size(&mut self, size: Vec2) {
        self.original_size = Some(size);
    }

    /// Unscaled size: the override if set, else the loaded image's size, else zero.
    pub fn original_size(&self) -> Vec2 {
        self.original_size
            .or_else(|| self.image.as_ref().and_then(ImageHandle::size))
            .unwrap_or(Vec2::ZERO)
    }

    /// Displayed size, `original_size * scale`.
    pub fn size(&self) -> Vec2 {
        self.original_size().mul_elements(self.scale)
    }

    /// Has a loaded image and is visible.
    pub fn may_render(&self) -> bool {
        self.visible && self.image.as_ref().is_some_and(ImageHandle::is_loaded)
    }
}

impl Default for Sprite {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Physics component: velocity, collision border and per-frame pending step.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub velocity: Vec2,
    /// Inactive bodies neither move, collide nor render.
    pub active: bool,
    /// Walkable bodies never block movers.
    pub walkable: bool,
    /// Dynamic bodies are tested against every other collision candidate each frame.
    pub dynamic: bool,
    border_size: Option<Vec2>,
    step: Vec2,
}

impl Body {
    /// A passive obstacle: solid, not tested against others.
    pub fn obstacle() -> Self {
        Self {
            velocity: Vec2::ZERO,
            active: true,
            walkable: false,
            dynamic: false,
            border_size: None,
            step: Vec2::ZERO,
        }
    }

    /// Body used by actors: walkable and dynamic.
    pub fn mover() -> Self {
        Self {
            walkable: true,
            dynamic: true,
            ..Self::obstacle()
        }
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    #[must_use]
    pub fn with_border_size(mut self, size: Vec2) -> Self {
        self.border_size = Some(size);
        self
    }

    #[must_use]
    pub fn with_walkable(mut self, walkable: bool) -> Self {
        self.walkable = walkable;
        self
    }

    #[must_use]
    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Displacement computed by the last pre-move pass.
    pub fn pending_step(&self) -> Vec2 {
        self.step
    }

    pub fn set_pending_step(&mut self, step: Vec2) {
        self.step = step;
    }

    pub fn set_border_size(&mut self, size: Vec2) {
        self.border_size = Some(size);
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::obstacle()
    }
}

/// Which capability level an entity has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Drawable,
    Physical,
    Actor,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub sprite: Sprite,
    body: Option<Body>,
    controller: Option<Controller>,
}

impl Entity {
    /// Drawn only; never moves or collides.
    pub fn drawable(sprite: Sprite) -> Self {
        Self {
            sprite,
            body: None,
            controller: None,
        }
    }

    pub fn physical(sprite: Sprite, body: Body) -> Self {
        Self {
            sprite,
            body: Some(body),
            controller: None,
        }
    }

    /// Keyboard-driven mover with a walkable, dynamic body.
    pub fn actor(sprite: Sprite, controller: Controller) -> Self {
        Self {
            sprite,
            body: Some(Body::mover()),
            controller: Some(controller),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match (&self.body, &self.controller) {
            (None, _) => EntityKind::Drawable,
            (Some(_), None) => EntityKind::Physical,
            (Some(_), Some(_)) => EntityKind::Actor,
        }
    }

    pub fn is_physical(&self) -> bool {
        self.body.is_some()
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut Body> {
        self.body.as_mut()
    }

    pub fn controller(&self) -> Option<&Controller> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut Controller> {
        self.controller.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.body.as_ref().map_or(true, |body| body.active)
    }

    /// Unscaled collision border size. Falls back per axis to the sprite size, then to
    /// [`DEFAULT_BORDER`].
    pub fn border_size(&self) -> Option<Vec2> {
        let body = self.body.as_ref()?;
        Some(body.border_size.unwrap_or_else(|| {
            let size = self.sprite.original_size();
            Vec2::new(
                if size.x != 0.0 { size.x } else { DEFAULT_BORDER },
                if size.y != 0.0 { size.y } else { DEFAULT_BORDER },
            )
        }))
    }

    /// Collision rectangle at the current position, scaled with the sprite.
    pub fn border(&self) -> Option<Bounds> {
        let half = self.border_size()?.mul_elements(self.sprite.scale) * 0.5;
        Some(Bounds::from_center(self.sprite.position, half))
    }

    /// Pre-move pass: record `velocity * dt` as the pending step. Inactive bodies get none.
    pub fn pre_move(&mut self, dt: f32) {
        if let Some(body) = self.body.as_mut() {
            body.step = if body.active {
                body.velocity * dt
            } else {
                Vec2::ZERO
            };
        }
    }

    /// Post-move pass: apply the (possibly clamped) pending step.
    pub fn post_move(&mut self) {
        if let Some(body) = self.body.as_mut() {
            if body.active {
                self.sprite.position += body.step;
            }
            body.step = Vec2::ZERO;
        }
    }

    /// Loaded image, visible, and active when physical.
    pub fn may_render(&self) -> bool {
        self.sprite.may_render() && self.is_active()
    }

    /// Route a key event to the controller, updating the body's velocity.
    ///
    /// Entities without a controller ignore key events.
    pub fn handle_key(&mut self, event: &KeyEvent) -> Option<Action> {
        let controller = self.controller.as_mut()?;
        let body = self.body.as_mut()?;
        controller.handle_key(event, &mut body.velocity)
    }
}
