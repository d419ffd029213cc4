//! Scalar vector helpers. Summation order is fixed so that scores are
//! reproducible bit-for-bit for identical inputs.

pub const EPSILON: f32 = 1e-12;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).fold(0.0f32, |acc, (x, y)| acc + x * y)
}

/// Scales `vector` to unit length. Vectors with (near-)zero magnitude are
/// left untouched.
pub fn normalize(vector: &mut [f32]) {
    let magnitude = dot(vector, vector).sqrt();
    if magnitude > EPSILON {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

pub fn is_finite(vector: &[f32]) -> bool {
    vector.iter().all(|x| x.is_finite())
}
