//! Core value structs shared across the Kickback workspace.

use serde::{Deserialize, Serialize};

use crate::enums::HurtType;

// ---------------------------------------------------------------------------
// Requirement slots
// ---------------------------------------------------------------------------

/// One slot in a mob's required hit pattern.
///
/// A sequence of requirements is immutable once assigned to a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HurtRequirement {
    /// Satisfied by any single hit of the given type.
    Single(HurtType),
    /// Satisfied only by two distinct buffered hits, one of each type.
    ///
    /// `left` and `right` may be equal, in which case two separate hits of
    /// that type are needed.
    Split {
        /// Type matched against the earliest buffered hit.
        left: HurtType,
        /// Type matched against the latest buffered hit.
        right: HurtType,
    },
}

impl HurtRequirement {
    /// Whether this slot needs two distinct hits.
    pub const fn is_split(&self) -> bool {
        matches!(self, Self::Split { .. })
    }

    /// The type drawn on the primary half of the ring.
    pub const fn left(&self) -> HurtType {
        match *self {
            Self::Single(ty) | Self::Split { left: ty, .. } => ty,
        }
    }

    /// The type drawn on the secondary half of the ring.
    ///
    /// Equal to [`left`](Self::left) for single requirements.
    pub const fn right(&self) -> HurtType {
        match *self {
            Self::Single(ty) | Self::Split { right: ty, .. } => ty,
        }
    }
}

impl core::fmt::Display for HurtRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Single(ty) => write!(f, "{}", ty.letter()),
            Self::Split { left, right } => write!(f, "{}{}", left.letter(), right.letter()),
        }
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A point in world space, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal axis (positive is right).
    pub x: f32,
    /// Vertical axis (positive is up).
    pub y: f32,
    /// Depth axis (positive is away from the player).
    pub z: f32,
}

impl Position {
    /// Create a position from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dz.mul_add(dz, dx.mul_add(dx, dy * dy)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Linear RGBA color handed to the renderer collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: f32,
    /// Green channel.
    pub g: f32,
    /// Blue channel.
    pub b: f32,
    /// Alpha channel.
    #[serde(default = "opaque")]
    pub a: f32,
}

const fn opaque() -> f32 {
    1.0
}

impl Color {
    /// Opaque black, used for consumed rings.
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// Create an opaque color.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Scale every channel (alpha included) by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
            a: self.a * factor,
        }
    }

    /// Whether every channel is a finite number.
    pub const fn is_finite(&self) -> bool {
        self.r.is_finite() && self.g.is_finite() && self.b.is_finite() && self.a.is_finite()
    }
}
