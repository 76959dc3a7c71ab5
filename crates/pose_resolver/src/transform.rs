//! Rigid transform composition

use contracts::{Matrix4x4, Quaternion, Vector3f};
use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion};

/// Build `rotation * translation` in the row-vector convention
///
/// A point is rotated by `orientation` first, then moved by `position`.
/// The quaternion is normalized; a degenerate (zero-length) quaternion is
/// treated as no rotation.
pub fn compose_transform(orientation: Quaternion, position: Vector3f) -> Matrix4x4 {
    let q = nalgebra::Quaternion::new(orientation.w, orientation.x, orientation.y, orientation.z);
    let rotation = UnitQuaternion::try_new(q, f32::EPSILON).unwrap_or_else(UnitQuaternion::identity);
    let translation = Translation3::new(position.x, position.y, position.z);

    // nalgebra uses column vectors: [[R, t], [0, 1]]
    let homogeneous: Matrix4<f32> = Isometry3::from_parts(translation, rotation).to_homogeneous();
    to_row_vector_convention(&homogeneous)
}

/// Transpose a column-vector matrix into the row-vector layout
fn to_row_vector_convention(m: &Matrix4<f32>) -> Matrix4x4 {
    let mut rows = [[0.0f32; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = m[(c, r)];
        }
    }
    Matrix4x4 { rows }
}
