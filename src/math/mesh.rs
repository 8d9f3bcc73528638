use glam::DVec3;

pub const FLOATS_PER_VERTEX: usize = 3;
pub const VERTICES_PER_SEGMENT: usize = 2;

/// Flat xyz vertex list drawn as a line list: every two vertices form one
/// independent segment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LineMesh {
    pub vertices: Vec<f32>,
}

impl LineMesh {
    pub fn with_segment_capacity(segments: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(segments * VERTICES_PER_SEGMENT * FLOATS_PER_VERTEX),
        }
    }

    pub fn push_segment(&mut self, start: DVec3, end: DVec3) {
        self.vertices.extend_from_slice(&[
            start.x as f32,
            start.y as f32,
            start.z as f32,
            end.x as f32,
            end.y as f32,
            end.z as f32,
        ]);
    }

    pub fn extend(&mut self, other: &LineMesh) {
        self.vertices.extend_from_slice(&other.vertices);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    pub fn segment_count(&self) -> usize {
        self.vertex_count() / VERTICES_PER_SEGMENT
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    #[cfg(test)]
    pub fn segments(&self) -> impl Iterator<Item = ([f32; 3], [f32; 3])> + '_ {
        self.vertices
            .chunks_exact(VERTICES_PER_SEGMENT * FLOATS_PER_VERTEX)
            .map(|s| ([s[0], s[1], s[2]], [s[3], s[4], s[5]]))
    }
}

pub struct DirectionMarkers {
    pub u: LineMesh,
    pub v: LineMesh,
}

pub const DEFAULT_MARKER_SCALE: f64 = 10.0;

/// Two segments from the origin showing the u and v axis directions.
pub fn direction_markers(scale: f64) -> DirectionMarkers {
    let origin = DVec3::ZERO;

    let mut u = LineMesh::with_segment_capacity(1);
    u.push_segment(origin, origin + DVec3::X * scale);

    let mut v = LineMesh::with_segment_capacity(1);
    v.push_segment(origin, origin + DVec3::Y * scale);

    DirectionMarkers { u, v }
}
