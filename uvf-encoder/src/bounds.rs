/// Axis-aligned bounds over flattened vertex triplets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl MeshBounds {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Bounds of a flattened `[x, y, z, x, y, z, ...]` buffer.
    /// Returns `None` when the buffer holds no complete vertex.
    pub fn from_vertices(vertices: &[f32]) -> Option<Self> {
        if vertices.len() < 3 {
            return None;
        }

        let mut bounds = Self::new();
        for point in vertices.chunks_exact(3) {
            bounds.update(point[0], point[1], point[2]);
        }
        Some(bounds)
    }

    /// Update bounds with a new point
    pub fn update(&mut self, x: f32, y: f32, z: f32) {
        for (axis, value) in [x, y, z].into_iter().enumerate() {
            self.min[axis] = self.min[axis].min(value);
            self.max[axis] = self.max[axis].max(value);
        }
    }

    /// Per-axis extents (max - min)
    pub fn extents(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        let [ex, ey, ez] = self.extents();
        (ex * ex + ey * ey + ez * ez).sqrt()
    }
}

impl Default for MeshBounds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn empty_buffer_has_no_bounds() {
        assert!(MeshBounds::from_vertices(&[]).is_none());
        assert!(MeshBounds::from_vertices(&[1.0, 2.0]).is_none());
    }

    #[test]
    fn unit_square_extents() {
        let vertices = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let bounds = MeshBounds::from_vertices(&vertices).unwrap();

        assert_eq!(bounds.extents(), [1.0, 1.0, 0.0]);
        assert_relative_eq!(bounds.diagonal(), 2.0f32.sqrt());
    }

    #[test]
    fn single_point_is_degenerate() {
        let bounds = MeshBounds::from_vertices(&[3.0, -1.0, 2.0]).unwrap();
        assert_eq!(bounds.min, bounds.max);
        assert_eq!(bounds.diagonal(), 0.0);
    }
}
