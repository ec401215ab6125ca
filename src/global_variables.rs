pub const CASE_NAME: &'static str = "Bucket Inflow";

pub type Float = f64;

pub const D: usize = 3;

pub const BYTES_PER_MB: Float = 1_048_576.0;

pub const MEMORY_BUDGET_MB: usize = 1000;

pub const ASPECT_RATIO: [Float; D] = [0.2, 1.0, 0.2];

/// Density, velocity and flag bytes stored per cell on top of the distributions.
pub const AUXILIARY_BYTES_PER_CELL: usize = 17;

pub const SI_LENGTH: Float = 8.2;

pub const SI_VELOCITY: Float = 1.0;

pub const SI_DENSITY: Float = 1.225;

pub const SI_VISCOSITY: Float = 1.48e-5;

pub const LATTICE_VELOCITY: Float = 0.05;

pub const LATTICE_DENSITY: Float = 1.0;

pub const LATTICE_LENGTH_RATIO: Float = 0.2;

pub const CS_2_INV: Float = 3.0;

pub const STEPS: u64 = 10_000;

pub const INSERTION_STEP: u64 = 1_000;

pub const DURATION: Float = 30.0;

pub const VIDEO_LENGTH: Float = 10.0;

pub const FRAMES_PER_SECOND: Float = 60.0;

pub const MESH_OFFSET_LENGTHS: Float = -4.2;

pub const SURFACE_TOLERANCE: Float = 1e-9;

pub const PRINT_EVERY: u64 = 100;
