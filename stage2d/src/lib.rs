//! Stage2D - a small 2D sprite runtime.
//!
//! A [`Scheduler`] runs each frame in fixed order: every movable entity computes its
//! pending step, dynamic entities are clamped against solid obstacles, the clamped steps
//! are applied, and the [`Compositor`] draws terrain, debug overlays and depth-sorted
//! sprites into a [`Canvas`](render::Canvas).

pub mod actor;
pub mod assets;
pub mod engine;
pub mod entities;
pub mod error;
pub mod input;
pub mod math;
pub mod physics;
pub mod render;
pub mod scheduler;
pub mod terrain;
pub mod viewport;
pub mod world;

pub use crate::actor::{Action, Controller, Direction, KeyBindings};
pub use crate::assets::{all_settled, ImageHandle, ImageStatus, Resources};
pub use crate::engine::{Engine, EngineConfig, EngineContext, Game};
pub use crate::entities::{Body, Entity, EntityKind, Sprite};
pub use crate::error::{AssetError, HostError};
pub use crate::input::{InputEvent, KeyEvent, KeyState, MouseEvent, MouseEventKind};
pub use crate::math::{Bounds, Vec2};
pub use crate::render::{Compositor, DebugOverlays};
pub use crate::scheduler::{HandlerContext, HandlerId, Scheduler};
pub use crate::terrain::{Terrain, Tile};
pub use crate::viewport::Viewport;
pub use crate::world::{EntityId, World};
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
