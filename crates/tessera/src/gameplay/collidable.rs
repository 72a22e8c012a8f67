//! Hit sphere around an object.

use tessera_core::{Component, Vec3};

/// Marks an object as something projectiles can hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Collidable {
    /// Radius of the hit sphere around the owner's position.
    pub radius: f32,
}

impl Collidable {
    /// Creates a hit sphere.
    #[must_use]
    pub const fn new(radius: f32) -> Self {
        Self { radius }
    }

    /// Returns `true` if `point` lies inside the sphere centered at `center`.
    #[inline]
    #[must_use]
    pub fn contains(&self, center: Vec3, point: Vec3) -> bool {
        center.distance_squared(point) <= self.radius * self.radius
    }
}

impl Component for Collidable {
    fn duplicate(&self) -> Option<Self> {
        Some(*self)
    }
}
