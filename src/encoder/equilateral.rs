use nalgebra::DVector;

use super::*;
use crate::utils::euclidean_distance;

/// Encodes `n` classes as the vertices of a regular simplex in `n - 1` dimensions.
///
/// The simplex is built with an edge length of 1, then every coordinate `x` of every vertex
/// is mapped to `x * (high - low) + low`. Decoding returns the closest vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraEquilateral {
    points: Vec<DVector<f64>>,
}

impl NeuraEquilateral {
    pub fn new(classes: usize, low: f64, high: f64) -> Result<Self, NeuraEncoderErr> {
        if classes < 2 {
            return Err(NeuraEncoderErr::TooFewClasses {
                min: 2,
                got: classes,
            });
        }

        let dimension = classes - 1;
        let mut points: Vec<DVector<f64>> = Vec::with_capacity(classes);
        points.push(DVector::zeros(dimension));

        let mut first = DVector::zeros(dimension);
        first[0] = 1.0;
        points.push(first);

        // Vertex `i` sits above the centroid of the first `i` vertices, on axis `i - 1`
        for vertex in 2..classes {
            let mut center: DVector<f64> = DVector::zeros(dimension);
            for point in points.iter() {
                center += point;
            }
            center /= vertex as f64;

            let distance = euclidean_distance(center.as_slice(), points[0].as_slice());
            center[vertex - 1] = (1.0 - distance * distance).sqrt();
            points.push(center);
        }

        let range = high - low;
        for point in points.iter_mut() {
            point.apply(|x| *x = *x * range + low);
        }

        Ok(Self { points })
    }

    /// Same as `new`, with coordinates in `[0, 1]`
    pub fn with_classes(classes: usize) -> Result<Self, NeuraEncoderErr> {
        Self::new(classes, 0.0, 1.0)
    }

    pub fn points(&self) -> &[DVector<f64>] {
        &self.points
    }
}

impl NeuraEncoder for NeuraEquilateral {
    fn encode(&self, class: usize) -> Result<DVector<f64>, NeuraEncoderErr> {
        check_class(class, self.points.len())?;
        Ok(self.points[class].clone())
    }

    fn decode(&self, vector: &[f64]) -> Result<usize, NeuraEncoderErr> {
        check_len(vector, self.dimension())?;

        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (class, point) in self.points.iter().enumerate() {
            let distance = euclidean_distance(point.as_slice(), vector);
            if distance < best_distance {
                best = class;
                best_distance = distance;
            }
        }

        Ok(best)
    }

    fn classes(&self) -> usize {
        self.points.len()
    }

    fn dimension(&self) -> usize {
        self.points.len() - 1
    }
}
