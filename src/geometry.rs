pub mod stl;

pub use stl::{MeshLoader, StlLoader};

use crate::global_variables::*;
use glam::{DMat3, DVec3};

pub trait Shape: Sync {
    /// Inclusive inside test: points on the surface count as inside.
    fn contains(&self, point: DVec3) -> bool;

    fn bounding_box(&self) -> Aabb;
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a DVec3>,
    {
        let mut points = points.into_iter();
        let first = *points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        0.5 * (self.min + self.max)
    }
}

impl Shape for Aabb {
    fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    fn bounding_box(&self) -> Aabb {
        *self
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [DVec3; 3],
}

impl Triangle {
    pub fn new(a: DVec3, b: DVec3, c: DVec3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }

    pub fn normal(&self) -> DVec3 {
        let [a, b, c] = self.vertices;
        (b - a).cross(c - a).normalize_or_zero()
    }

    fn touches(&self, point: DVec3) -> bool {
        let [a, b, c] = self.vertices;
        let n = (b - a).cross(c - a);
        let double_area = n.length();
        if double_area == 0.0 {
            return false;
        }
        if (n.dot(point - a) / double_area).abs() > SURFACE_TOLERANCE {
            return false;
        }
        [(a, b), (b, c), (c, a)].iter().all(|&(u, v)| {
            let edge = v - u;
            edge.cross(point - u).dot(n) >= -SURFACE_TOLERANCE * double_area * edge.length()
        })
    }

    /// Moeller-Trumbore; only hits strictly in front of the origin count.
    fn intersects_ray(&self, origin: DVec3, direction: DVec3) -> bool {
        let [a, b, c] = self.vertices;
        let edge_1 = b - a;
        let edge_2 = c - a;
        let p = direction.cross(edge_2);
        let determinant = edge_1.dot(p);
        if determinant.abs() <= Float::EPSILON * edge_1.length() * edge_2.length() {
            return false;
        }
        let inverse = 1.0 / determinant;
        let s = origin - a;
        let u = s.dot(p) * inverse;
        if !(0.0..=1.0).contains(&u) {
            return false;
        }
        let q = s.cross(edge_1);
        let v = direction.dot(q) * inverse;
        if v < 0.0 || u + v > 1.0 {
            return false;
        }
        edge_2.dot(q) * inverse > SURFACE_TOLERANCE
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeshPlacement {
    pub box_size: DVec3,
    pub center: DVec3,
    pub rotation: DMat3,
    /// Target length of the largest bounding-box side; 0 fits the mesh into `box_size`.
    pub size: Float,
}

impl MeshPlacement {
    pub fn new(box_size: [Float; D], center: [Float; D], rotation: DMat3, size: Float) -> Self {
        Self {
            box_size: DVec3::from_array(box_size),
            center: DVec3::from_array(center),
            rotation,
            size,
        }
    }
}

pub fn rotation_from_degrees(angles: [Float; D]) -> DMat3 {
    let [x, y, z] = angles;
    DMat3::from_axis_angle(DVec3::X, x.to_radians())
        * DMat3::from_axis_angle(DVec3::Y, y.to_radians())
        * DMat3::from_axis_angle(DVec3::Z, z.to_radians())
}

#[derive(Clone, Debug)]
pub struct Mesh {
    triangles: Vec<Triangle>,
    bounds: Aabb,
}

impl Mesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| t.vertices.iter()))
            .unwrap_or(Aabb::new(DVec3::ZERO, DVec3::ZERO));
        Self { triangles, bounds }
    }

    pub fn cuboid(min: DVec3, max: DVec3) -> Self {
        let corner = |i: usize| {
            DVec3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 2 == 0 { min.y } else { max.y },
                if i & 4 == 0 { min.z } else { max.z },
            )
        };
        let faces: [[usize; 4]; 6] = [
            [0, 2, 6, 4],
            [1, 5, 7, 3],
            [0, 4, 5, 1],
            [2, 3, 7, 6],
            [0, 1, 3, 2],
            [4, 6, 7, 5],
        ];
        let triangles = faces
            .iter()
            .flat_map(|&[a, b, c, d]| {
                [
                    Triangle::new(corner(a), corner(b), corner(c)),
                    Triangle::new(corner(a), corner(c), corner(d)),
                ]
            })
            .collect();
        Self::new(triangles)
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn number_of_triangles(&self) -> usize {
        self.triangles.len()
    }

    pub fn pmin(&self) -> DVec3 {
        self.bounds.min
    }

    pub fn pmax(&self) -> DVec3 {
        self.bounds.max
    }

    pub fn translate(&mut self, offset: DVec3) {
        self.transform(|v| v + offset);
    }

    pub fn scale(&mut self, factor: Float) {
        self.transform(|v| v * factor);
    }

    pub fn rotate(&mut self, rotation: DMat3) {
        self.transform(|v| rotation * v);
    }

    pub fn place(&mut self, placement: &MeshPlacement) {
        self.rotate(placement.rotation);
        let extent = self.bounds.size();
        let factor = if placement.size > 0.0 {
            placement.size / extent.max_element()
        } else {
            (placement.box_size / extent).min_element()
        };
        if factor.is_finite() && factor > 0.0 {
            self.scale(factor);
        }
        let offset = placement.center - self.bounds.center();
        self.translate(offset);
    }

    fn transform<F>(&mut self, function: F)
    where
        F: Fn(DVec3) -> DVec3,
    {
        for triangle in self.triangles.iter_mut() {
            for vertex in triangle.vertices.iter_mut() {
                *vertex = function(*vertex);
            }
        }
        if let Some(bounds) = Aabb::from_points(self.triangles.iter().flat_map(|t| t.vertices.iter())) {
            self.bounds = bounds;
        }
    }
}

impl Shape for Mesh {
    fn contains(&self, point: DVec3) -> bool {
        if !self.bounds.contains(point) {
            return false;
        }
        if self.triangles.iter().any(|t| t.touches(point)) {
            return true;
        }
        // Skewed so rays from lattice points do not graze axis-aligned edges.
        let direction = DVec3::new(0.5773, 0.5779, 0.5767).normalize();
        let crossings = self
            .triangles
            .iter()
            .filter(|t| t.intersects_ray(point, direction))
            .count();
        crossings % 2 == 1
    }

    fn bounding_box(&self) -> Aabb {
        self.bounds
    }
}
