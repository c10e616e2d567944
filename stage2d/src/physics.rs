//! Axis-aligned box collision against static obstacles.
//!
//! Resolution is discrete and single-step: each mover's pending step is clamped once per
//! obstacle per frame. Fast movers can tunnel through obstacles thinner than their step.

use crate::entities::Entity;
use crate::math::{Bounds, Vec2};
use crate::world::{EntityId, World};

/// Distance left between a clamped mover and the obstacle it ran into.
pub const CONTACT_GAP: f32 = 1.0;

/// Snapshot of an entity's collision state for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    pub border: Bounds,
    pub step: Vec2,
    pub walkable: bool,
    pub dynamic: bool,
}

impl Collider {
    /// Collision state of `entity`, or `None` when it is not physical or not active.
    pub fn of(entity: &Entity) -> Option<Self> {
        let body = entity.body().filter(|body| body.active)?;
        Some(Self {
            border: entity.border()?,
            step: body.pending_step(),
            walkable: body.walkable,
            dynamic: body.dynamic,
        })
    }
}

/// Clamp `mover.step` so the mover does not end up overlapping `obstacle`.
///
/// X is checked first; the Y check then uses the already clamped X step. A clamped axis
/// leaves the mover exactly [`CONTACT_GAP`] outside the obstacle's facing edge. Walkable
/// obstacles never clamp.
pub fn resolve(mover: &Collider, obstacle: &Collider) -> Vec2 {
    let mut step = mover.step;
    if obstacle.walkable {
        return step;
    }

    let target = &obstacle.border;
    let border = &mover.border;

    if step.x != 0.0 && border.translated(Vec2::new(step.x, 0.0)).overlaps(target) {
        step.x = if step.x > 0.0 {
            target.left - border.right - CONTACT_GAP
        } else {
            target.right - border.left + CONTACT_GAP
        };
    }

    if step.y != 0.0 && border.translated(step).overlaps(target) {
        step.y = if step.y > 0.0 {
            target.bottom - border.top - CONTACT_GAP
        } else {
            target.top - border.bottom + CONTACT_GAP
        };
    }

    step
}

/// Resolve every dynamic candidate against every other candidate, in candidate order.
///
/// Obstacles are taken at their pre-move positions; only pending steps change.
pub fn resolve_collisions(world: &mut World, candidates: &[EntityId]) {
    let colliders: Vec<(EntityId, Collider)> = candidates
        .iter()
        .filter_map(|&id| world.get(id).and_then(Collider::of).map(|c| (id, c)))
        .collect();

    for (id, collider) in &colliders {
        if !collider.dynamic {
            continue;
        }

        let mut mover = *collider;
        for (other_id, obstacle) in &colliders {
            if other_id != id {
                mover.step = resolve(&mover, obstacle);
            }
        }

        if mover.step != collider.step {
            log::trace!("entity {} step clamped to {:?}", id.to_u32(), mover.step);
            if let Some(body) = world.get_mut(*id).and_then(Entity::body_mut) {
                body.set_pending_step(mover.step);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Body, Sprite};

    fn collider(center: Vec2, half: Vec2, step: Vec2) -> Collider {
        Collider {
            border: Bounds::from_center(center, half),
            step,
            walkable: false,
            dynamic: true,
        }
    }

    fn wall(center: Vec2, half: Vec2) -> Collider {
        Collider {
            dynamic: false,
            ..collider(center, half, Vec2::ZERO)
        }
    }

    #[test]
    fn rightward_step_stops_one_unit_short() {
        // Mover right edge at 10, wall left edge at 20.
        let mover = collider(Vec2::new(0.0, 0.0), Vec2::splat(10.0), Vec2::new(30.0, 0.0));
        let obstacle = wall(Vec2::new(30.0, 0.0), Vec2::splat(10.0));
        assert_eq!(resolve(&mover, &obstacle), Vec2::new(9.0, 0.0));
    }

    #[test]
    fn leftward_step_stops_one_unit_short() {
        let mover = collider(Vec2::new(0.0, 0.0), Vec2::splat(10.0), Vec2::new(-25.0, 0.0));
        let obstacle = wall(Vec2::new(-30.0, 0.0), Vec2::splat(5.0));
        // Wall right edge at -25, mover left edge at -10.
        assert_eq!(resolve(&mover, &obstacle), Vec2::new(-14.0, 0.0));
    }

    #[test]
    fn vertical_steps_clamp_on_top_and_bottom() {
        let up = collider(Vec2::ZERO, Vec2::splat(4.0), Vec2::new(0.0, 15.0));
        let ceiling = wall(Vec2::new(0.0, 20.0), Vec2::splat(4.0));
        assert_eq!(resolve(&up, &ceiling), Vec2::new(0.0, 11.0));

        let down = collider(Vec2::ZERO, Vec2::splat(4.0), Vec2::new(0.0, -15.0));
        let floor = wall(Vec2::new(0.0, -20.0), Vec2::splat(4.0));
        assert_eq!(resolve(&down, &floor), Vec2::new(0.0, -11.0));
    }

    #[test]
    fn clamped_step_is_a_fixed_point() {
        let mover = collider(Vec2::ZERO, Vec2::splat(10.0), Vec2::new(30.0, 12.0));
        let obstacle = wall(Vec2::new(30.0, 5.0), Vec2::splat(10.0));
        let once = resolve(&mover, &obstacle);
        let twice = resolve(&Collider { step: once, ..mover }, &obstacle);
        assert_eq!(once, twice);

        let moved = mover.border.translated(Vec2::new(once.x, 0.0));
        assert!(!moved.overlaps(&obstacle.border));
        assert_eq!(obstacle.border.left - moved.right, CONTACT_GAP);
    }

    #[test]
    fn walkable_obstacles_never_block() {
        let mover = collider(Vec2::ZERO, Vec2::splat(10.0), Vec2::new(30.0, -30.0));
        let grass = Collider {
            walkable: true,
            ..wall(Vec2::new(20.0, -20.0), Vec2::splat(10.0))
        };
        assert_eq!(resolve(&mover, &grass), mover.step);
    }

    #[test]
    fn diagonal_motion_slides_along_a_wall() {
        // Wall directly to the right, spanning far up and down.
        let mover = collider(Vec2::ZERO, Vec2::splat(10.0), Vec2::new(30.0, 15.0));
        let obstacle = wall(Vec2::new(30.0, 0.0), Vec2::new(10.0, 500.0));
        assert_eq!(resolve(&mover, &obstacle), Vec2::new(9.0, 15.0));
    }

    #[test]
    fn corner_approach_is_blocked_vertically() {
        // Neither axis alone overlaps, the combined step does.
        let mover = collider(Vec2::ZERO, Vec2::splat(10.0), Vec2::new(15.0, 15.0));
        let obstacle = wall(Vec2::new(30.0, 30.0), Vec2::splat(10.0));
        assert_eq!(resolve(&mover, &obstacle), Vec2::new(15.0, 9.0));
    }

    #[test]
    fn zero_steps_are_left_alone() {
        let mover = collider(Vec2::ZERO, Vec2::splat(10.0), Vec2::ZERO);
        let obstacle = wall(Vec2::new(5.0, 0.0), Vec2::splat(10.0));
        assert_eq!(resolve(&mover, &obstacle), Vec2::ZERO);
    }

    #[test]
    fn inactive_and_drawable_entities_have_no_collider() {
        let drawable = Entity::drawable(Sprite::default());
        assert_eq!(Collider::of(&drawable), None);

        let mut body = Body::obstacle();
        body.active = false;
        assert_eq!(Collider::of(&Entity::physical(Sprite::default(), body)), None);
    }

    #[test]
    fn resolve_collisions_updates_only_dynamic_movers() {
        let mut world = World::new();
        let mover = world.spawn(Entity::physical(
            Sprite::default(),
            Body::mover().with_border_size(Vec2::splat(20.0)),
        ));
        let rock = world.spawn(Entity::physical(
            Sprite::default().with_position(Vec2::new(30.0, 0.0)),
            Body::obstacle()
                .with_border_size(Vec2::splat(20.0))
                .with_velocity(Vec2::new(-100.0, 0.0)),
        ));

        for id in [mover, rock] {
            if let Some(body) = world.get_mut(id).and_then(Entity::body_mut) {
                body.set_pending_step(if id == mover {
                    Vec2::new(30.0, 0.0)
                } else {
                    Vec2::new(-5.0, 0.0)
                });
            }
        }

        resolve_collisions(&mut world, &[mover, rock]);

        let step = |id| world.get(id).and_then(Entity::body).map(Body::pending_step);
        assert_eq!(step(mover), Some(Vec2::new(9.0, 0.0)));
        // Not dynamic: its own step is never resolved.
        assert_eq!(step(rock), Some(Vec2::new(-5.0, 0.0)));
    }
}
