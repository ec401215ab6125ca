use crate::global_variables::*;
use crate::resolution::GridExtent;
use crate::CellFlag;
use tracing::debug;

pub struct CellFieldsMut<'a> {
    pub flags: &'a mut [CellFlag],
    pub velocity: &'a mut [[Float; D]],
}

pub trait LatticeSolver {
    fn extent(&self) -> GridExtent;

    fn viscosity(&self) -> Float;

    fn flags(&self) -> &[CellFlag];

    fn velocity(&self) -> &[[Float; D]];

    fn fields_mut(&mut self) -> CellFieldsMut<'_>;

    /// Advances `steps` time steps; `run(0)` only initializes the state.
    fn run(&mut self, steps: u64);

    fn time_step(&self) -> u64;
}

pub struct Lattice {
    pub extent: GridExtent,
    pub viscosity: Float,
    pub tau: Float,
    pub flags: Vec<CellFlag>,
    pub velocity: Vec<[Float; D]>,
    pub time_step: u64,
    pub initialized: bool,
}

impl Lattice {
    pub fn new(extent: GridExtent, viscosity: Float) -> Self {
        let number_of_cells = extent.number_of_cells();
        Self {
            extent,
            viscosity,
            tau: crate::units::relaxation_time(viscosity),
            flags: vec![CellFlag::Fluid; number_of_cells],
            velocity: vec![[0.0; D]; number_of_cells],
            time_step: 0,
            initialized: false,
        }
    }

    pub fn get_flag(&self, index: &[usize]) -> CellFlag {
        self.flags[self.extent.index(index[0], index[1], index[2])]
    }

    pub fn get_velocity(&self, index: &[usize]) -> [Float; D] {
        self.velocity[self.extent.index(index[0], index[1], index[2])]
    }
}

impl LatticeSolver for Lattice {
    fn extent(&self) -> GridExtent {
        self.extent
    }

    fn viscosity(&self) -> Float {
        self.viscosity
    }

    fn flags(&self) -> &[CellFlag] {
        &self.flags
    }

    fn velocity(&self) -> &[[Float; D]] {
        &self.velocity
    }

    fn fields_mut(&mut self) -> CellFieldsMut<'_> {
        CellFieldsMut {
            flags: &mut self.flags,
            velocity: &mut self.velocity,
        }
    }

    fn run(&mut self, steps: u64) {
        if !self.initialized {
            debug!(cells = self.flags.len(), tau = self.tau, "initializing lattice");
            self.initialized = true;
        }
        self.time_step += steps;
    }

    fn time_step(&self) -> u64 {
        self.time_step
    }
}
