//! Rigid placements of volumes.
//!
//! A placement maps local coordinates of a volume to the frame of its
//! mother: x_master = R·x_local + t. Directions and accelerations only see
//! the rotation.

use crate::types::{Mat3, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    rotation: Mat3,
    translation: Vec3,
}

impl Transform {
    pub const fn identity() -> Self {
        Self {
            rotation: Mat3::identity(),
            translation: Vec3::zero(),
        }
    }

    pub fn new(rotation: Mat3, translation: Vec3) -> Self {
        Self { rotation, translation }
    }

    /// Pure translation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self::new(Mat3::identity(), Vec3::new(x, y, z))
    }

    /// Pure rotation
    pub fn rotation(rotation: Mat3) -> Self {
        Self::new(rotation, Vec3::zero())
    }

    pub fn rotation_matrix(&self) -> &Mat3 {
        &self.rotation
    }

    pub fn offset(&self) -> Vec3 {
        self.translation
    }

    pub fn is_identity(&self) -> bool {
        self.rotation.is_identity() && self.translation == Vec3::zero()
    }

    /// Point: local → master
    #[inline]
    pub fn local_to_master(&self, point: &Vec3) -> Vec3 {
        self.rotation.mul_vec(point) + self.translation
    }

    /// Direction or acceleration: local → master
    #[inline]
    pub fn local_to_master_vect(&self, v: &Vec3) -> Vec3 {
        self.rotation.mul_vec(v)
    }

    /// Point: master → local
    #[inline]
    pub fn master_to_local(&self, point: &Vec3) -> Vec3 {
        self.rotation.transpose().mul_vec(&(*point - self.translation))
    }

    /// Direction or acceleration: master → local
    #[inline]
    pub fn master_to_local_vect(&self, v: &Vec3) -> Vec3 {
        self.rotation.transpose().mul_vec(v)
    }

    /// Placement of `inner` (given in this frame) expressed in this frame's master
    pub fn compose(&self, inner: &Transform) -> Transform {
        Transform {
            rotation: self.rotation * inner.rotation,
            translation: self.rotation.mul_vec(&inner.translation) + self.translation,
        }
    }
}
