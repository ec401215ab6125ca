use crate::error::{CaseError, Result};
use crate::geometry::Shape;
use crate::global_variables::*;
use crate::lattice::CellFieldsMut;
use crate::resolution::GridExtent;
use crate::CellFlag;
use glam::DVec3;
use rayon::prelude::*;
use tracing::debug;

#[derive(Hash, Eq, PartialEq, Clone, Copy, Debug)]
pub enum BoundaryFace {
    East,
    West,
    North,
    South,
    Top,
    Bottom,
}

impl BoundaryFace {
    pub const ALL: [BoundaryFace; 6] = [
        BoundaryFace::West,
        BoundaryFace::East,
        BoundaryFace::South,
        BoundaryFace::North,
        BoundaryFace::Bottom,
        BoundaryFace::Top,
    ];

    pub fn contains(&self, extent: &GridExtent, index: [usize; D]) -> bool {
        let [i, j, k] = index;
        match self {
            BoundaryFace::West => i == 0,
            BoundaryFace::East => i == extent.nx - 1,
            BoundaryFace::South => j == 0,
            BoundaryFace::North => j == extent.ny - 1,
            BoundaryFace::Bottom => k == 0,
            BoundaryFace::Top => k == extent.nz - 1,
        }
    }

    pub fn inward_normal(&self) -> [Float; D] {
        match self {
            BoundaryFace::West => [1.0, 0.0, 0.0],
            BoundaryFace::East => [-1.0, 0.0, 0.0],
            BoundaryFace::South => [0.0, 1.0, 0.0],
            BoundaryFace::North => [0.0, -1.0, 0.0],
            BoundaryFace::Bottom => [0.0, 0.0, 1.0],
            BoundaryFace::Top => [0.0, 0.0, -1.0],
        }
    }

    pub fn parse(face: &str) -> Result<Self> {
        match face {
            "east" => Ok(BoundaryFace::East),
            "west" => Ok(BoundaryFace::West),
            "north" => Ok(BoundaryFace::North),
            "south" => Ok(BoundaryFace::South),
            "top" => Ok(BoundaryFace::Top),
            "bottom" => Ok(BoundaryFace::Bottom),
            _ => Err(CaseError::invalid(
                "boundary face",
                format!("{face} is not one of east, west, north, south, top, bottom"),
            )),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FloorMode {
    /// The floor keeps whatever the geometry pass produced.
    #[default]
    Unchanged,
    Solid,
    Open,
}

impl FloorMode {
    pub fn parse(mode: &str) -> Result<Self> {
        match mode {
            "unchanged" => Ok(FloorMode::Unchanged),
            "solid" => Ok(FloorMode::Solid),
            "open" => Ok(FloorMode::Open),
            _ => Err(CaseError::invalid(
                "floor",
                format!("{mode} is not one of unchanged, solid, open"),
            )),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Inflow {
    pub face: BoundaryFace,
    /// Lattice velocity magnitude, directed along the face's inward normal.
    pub speed: Float,
}

impl Inflow {
    pub fn velocity(&self) -> [Float; D] {
        self.face.inward_normal().map(|n| n * self.speed)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DomainRules {
    pub floor: BoundaryFace,
    pub floor_mode: FloorMode,
    pub inflow: Option<Inflow>,
}

impl DomainRules {
    pub fn new(lattice_velocity: Float) -> Self {
        Self {
            floor: BoundaryFace::Bottom,
            floor_mode: FloorMode::Unchanged,
            inflow: Some(Inflow {
                face: BoundaryFace::South,
                speed: lattice_velocity,
            }),
        }
    }

    pub fn open_faces(&self) -> Vec<BoundaryFace> {
        BoundaryFace::ALL
            .into_iter()
            .filter(|&face| face != self.floor || self.floor_mode == FloorMode::Open)
            .collect()
    }

    pub fn rules<'a>(&self) -> Vec<Rule<'a>> {
        let mut rules = Vec::new();
        if self.floor_mode == FloorMode::Solid {
            rules.push(Rule::SolidFaces(vec![self.floor]));
        }
        rules.push(Rule::OpenFaces(self.open_faces()));
        if let Some(inflow) = self.inflow {
            rules.push(Rule::Inflow(inflow));
        }
        rules
    }
}

pub enum Rule<'a> {
    Solid(&'a dyn Shape),
    SolidFaces(Vec<BoundaryFace>),
    OpenFaces(Vec<BoundaryFace>),
    Inflow(Inflow),
}

impl Rule<'_> {
    fn apply(
        &self,
        extent: &GridExtent,
        index: [usize; D],
        flag: &mut CellFlag,
        velocity: &mut [Float; D],
    ) {
        match self {
            Rule::Solid(shape) => {
                if *flag == CellFlag::Fluid {
                    let [i, j, k] = index;
                    let center = DVec3::new(i as Float, j as Float, k as Float);
                    if shape.contains(center) {
                        *flag = CellFlag::Solid;
                    }
                }
            }
            Rule::SolidFaces(faces) => {
                if faces.iter().any(|face| face.contains(extent, index)) {
                    *flag = CellFlag::Solid;
                }
            }
            Rule::OpenFaces(faces) => {
                if *flag != CellFlag::Solid && faces.iter().any(|face| face.contains(extent, index))
                {
                    *flag = CellFlag::OpenBoundary;
                }
            }
            Rule::Inflow(inflow) => {
                if *flag == CellFlag::OpenBoundary && inflow.face.contains(extent, index) {
                    *velocity = inflow.velocity();
                }
            }
        }
    }
}

#[derive(Default)]
pub struct Classifier<'a> {
    rules: Vec<Rule<'a>>,
}

impl<'a> Classifier<'a> {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: Rule<'a>) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_geometry(self, shape: &'a dyn Shape) -> Self {
        self.with_rule(Rule::Solid(shape))
    }

    pub fn with_domain_rules(mut self, domain: &DomainRules) -> Self {
        self.rules.extend(domain.rules());
        self
    }

    pub fn apply(&self, extent: &GridExtent, fields: CellFieldsMut<'_>) -> usize {
        debug_assert_eq!(fields.flags.len(), extent.number_of_cells());
        debug_assert_eq!(fields.velocity.len(), extent.number_of_cells());
        let changed = fields
            .flags
            .par_iter_mut()
            .zip(fields.velocity.par_iter_mut())
            .enumerate()
            .map(|(n, (flag, velocity))| {
                let index = extent.coordinates(n);
                let before = *flag;
                for rule in &self.rules {
                    rule.apply(extent, index, flag, velocity);
                }
                usize::from(*flag != before)
            })
            .sum::<usize>();
        debug!(rules = self.rules.len(), changed, "classification pass");
        changed
    }
}

pub fn classify(extent: &GridExtent, shape: &dyn Shape, fields: CellFieldsMut<'_>) -> usize {
    Classifier::new().with_geometry(shape).apply(extent, fields)
}

pub fn apply_domain_rules(
    extent: &GridExtent,
    domain: &DomainRules,
    fields: CellFieldsMut<'_>,
) -> usize {
    Classifier::new()
        .with_domain_rules(domain)
        .apply(extent, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Aabb, Mesh};
    use crate::lattice::{Lattice, LatticeSolver};

    const N: usize = 8;

    fn cube_lattice() -> Lattice {
        Lattice::new(GridExtent::new(N, N, N), 0.1)
    }

    fn on_open_face(index: [usize; D]) -> bool {
        let [i, j, k] = index;
        i == 0 || i == N - 1 || j == 0 || j == N - 1 || k == N - 1
    }

    #[test]
    fn domain_rules_open_five_faces() {
        let mut lattice = cube_lattice();
        let extent = lattice.extent;
        let domain = DomainRules::new(0.05);
        apply_domain_rules(&extent, &domain, lattice.fields_mut());
        for n in 0..extent.number_of_cells() {
            let index = extent.coordinates(n);
            let expected = if on_open_face(index) {
                CellFlag::OpenBoundary
            } else {
                CellFlag::Fluid
            };
            assert_eq!(lattice.flags[n], expected, "cell {index:?}");
        }
        let open = lattice
            .flags
            .iter()
            .filter(|&&f| f == CellFlag::OpenBoundary)
            .count();
        assert_eq!(open, N * N * N - (N - 2) * (N - 2) * (N - 1));
    }

    #[test]
    fn solid_geometry_wins_over_open_faces() {
        let mut lattice = cube_lattice();
        let extent = lattice.extent;
        let corner = Aabb::new(DVec3::ZERO, DVec3::splat(2.0));
        Classifier::new()
            .with_geometry(&corner)
            .with_domain_rules(&DomainRules::new(0.05))
            .apply(&extent, lattice.fields_mut());
        assert_eq!(lattice.get_flag(&[0, 0, 0]), CellFlag::Solid);
        assert_eq!(lattice.get_flag(&[2, 0, 1]), CellFlag::Solid);
        assert_eq!(lattice.get_velocity(&[2, 0, 1]), [0.0; D]);
        assert_eq!(lattice.get_flag(&[3, 0, 1]), CellFlag::OpenBoundary);
        for n in 0..extent.number_of_cells() {
            let index = extent.coordinates(n);
            let inside = corner.contains(DVec3::new(
                index[0] as Float,
                index[1] as Float,
                index[2] as Float,
            ));
            if on_open_face(index) && !inside {
                assert_eq!(lattice.flags[n], CellFlag::OpenBoundary);
            }
        }
    }

    #[test]
    fn inflow_only_on_south_layer() {
        let mut lattice = cube_lattice();
        let extent = lattice.extent;
        apply_domain_rules(&extent, &DomainRules::new(0.05), lattice.fields_mut());
        for n in 0..extent.number_of_cells() {
            let [_, j, _] = extent.coordinates(n);
            let expected = if j == 0 { [0.0, 0.05, 0.0] } else { [0.0; D] };
            assert_eq!(lattice.velocity[n], expected);
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let mesh = Mesh::cuboid(DVec3::new(2.0, 1.5, 0.0), DVec3::new(5.5, 6.0, 3.0));
        let domain = DomainRules::new(0.05);
        let mut once = cube_lattice();
        let extent = once.extent;
        let classifier = Classifier::new().with_geometry(&mesh).with_domain_rules(&domain);
        classifier.apply(&extent, once.fields_mut());
        let mut twice = cube_lattice();
        classifier.apply(&extent, twice.fields_mut());
        let changed = classifier.apply(&extent, twice.fields_mut());
        assert_eq!(changed, 0);
        assert_eq!(once.flags, twice.flags);
        assert_eq!(once.velocity, twice.velocity);
    }

    #[test]
    fn second_geometry_only_adds_solids() {
        let mut lattice = cube_lattice();
        let extent = lattice.extent;
        let bucket = Mesh::cuboid(DVec3::new(2.0, 2.0, 0.0), DVec3::new(5.0, 5.0, 2.0));
        Classifier::new()
            .with_geometry(&bucket)
            .with_domain_rules(&DomainRules::new(0.05))
            .apply(&extent, lattice.fields_mut());
        let before = lattice.flags.clone();
        let velocity_before = lattice.velocity.clone();
        let wall = Aabb::new(DVec3::new(0.0, 6.0, 0.0), DVec3::new(7.0, 7.0, 7.0));
        let changed = classify(&extent, &wall, lattice.fields_mut());
        assert!(changed > 0);
        for (old, new) in before.iter().zip(lattice.flags.iter()) {
            match old {
                CellFlag::Fluid => assert!(*new == CellFlag::Fluid || *new == CellFlag::Solid),
                _ => assert_eq!(old, new),
            }
        }
        assert_eq!(velocity_before, lattice.velocity);
    }

    #[test]
    fn floor_modes() {
        let extent = GridExtent::new(N, N, N);
        let interior_floor = [3, 3, 0];

        let mut lattice = cube_lattice();
        apply_domain_rules(&extent, &DomainRules::new(0.05), lattice.fields_mut());
        assert_eq!(lattice.get_flag(&interior_floor), CellFlag::Fluid);

        let mut lattice = cube_lattice();
        let solid_floor = DomainRules {
            floor_mode: FloorMode::Solid,
            ..DomainRules::new(0.05)
        };
        apply_domain_rules(&extent, &solid_floor, lattice.fields_mut());
        assert_eq!(lattice.get_flag(&interior_floor), CellFlag::Solid);
        assert_eq!(lattice.get_flag(&[0, 3, 0]), CellFlag::Solid);
        assert_eq!(lattice.get_flag(&[0, 3, 1]), CellFlag::OpenBoundary);

        let mut lattice = cube_lattice();
        let open_floor = DomainRules {
            floor_mode: FloorMode::Open,
            ..DomainRules::new(0.05)
        };
        apply_domain_rules(&extent, &open_floor, lattice.fields_mut());
        assert_eq!(lattice.get_flag(&interior_floor), CellFlag::OpenBoundary);
        assert_eq!(open_floor.open_faces().len(), 6);
    }

    #[test]
    fn result_does_not_depend_on_thread_count() {
        let mesh = Mesh::cuboid(DVec3::new(1.5, 2.0, 0.5), DVec3::new(6.0, 4.5, 5.0));
        let domain = DomainRules::new(0.05);
        let classify_with = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            pool.install(|| {
                let mut lattice = cube_lattice();
                let extent = lattice.extent;
                Classifier::new()
                    .with_geometry(&mesh)
                    .with_domain_rules(&domain)
                    .apply(&extent, lattice.fields_mut());
                (lattice.flags, lattice.velocity)
            })
        };
        assert_eq!(classify_with(1), classify_with(4));
    }

    #[test]
    fn face_parsing() {
        assert_eq!(BoundaryFace::parse("south").unwrap(), BoundaryFace::South);
        assert!(BoundaryFace::parse("up").is_err());
        assert_eq!(FloorMode::parse("open").unwrap(), FloorMode::Open);
        assert!(FloorMode::parse("lava").is_err());
    }
}
