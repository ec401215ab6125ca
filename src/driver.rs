use crate::boundary::{Classifier, DomainRules};
use crate::config::CaseConfig;
use crate::error::Result;
use crate::export::{Camera, FrameExporter, VisualizationModes};
use crate::geometry::{rotation_from_degrees, Mesh, MeshLoader, MeshPlacement, Shape};
use crate::global_variables::*;
use crate::lattice::LatticeSolver;
use crate::resolution::{self, GridExtent};
use crate::units::UnitSystem;
use colored::*;
use glam::DVec3;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RunMode {
    Offline { duration: Float, video_length: Float },
    Scripted { steps: u64, insertion_step: u64 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverState {
    Init,
    Running,
    Terminated,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CasePlan {
    pub extent: GridExtent,
    pub units: UnitSystem,
    pub lattice_length: Float,
    pub viscosity: Float,
    pub termination_step: u64,
}

impl CasePlan {
    pub fn new(config: &CaseConfig) -> Result<Self> {
        let extent = resolution::plan(config.aspect_ratio, config.memory_budget_mb, &config.storage)?;
        let lattice_length = config.lattice_length_ratio * extent.ny as Float;
        let units = UnitSystem::calibrate(
            lattice_length,
            config.lattice_velocity,
            config.lattice_density,
            config.si_length,
            config.si_velocity,
            config.si_density,
        )?;
        let viscosity = units.nu(config.si_viscosity);
        let termination_step = match config.run_mode {
            RunMode::Offline { duration, .. } => units.t(duration),
            RunMode::Scripted { steps, .. } => steps,
        };
        info!(
            nx = extent.nx,
            ny = extent.ny,
            nz = extent.nz,
            viscosity,
            termination_step,
            "case planned"
        );
        Ok(Self {
            extent,
            units,
            lattice_length,
            viscosity,
            termination_step,
        })
    }

    pub fn placement(&self, config: &CaseConfig) -> MeshPlacement {
        MeshPlacement::new(
            self.extent.size(),
            self.extent.center(),
            rotation_from_degrees(config.mesh_rotation),
            self.lattice_length,
        )
    }

    pub fn load_mesh<L>(&self, config: &CaseConfig, loader: &L, path: &Path) -> Result<Mesh>
    where
        L: MeshLoader,
    {
        let mut mesh = loader.load(path, &self.placement(config))?;
        let offset_y = mesh.pmin().y + config.mesh_offset_lengths * self.lattice_length;
        mesh.translate(DVec3::new(0.0, offset_y, 0.0));
        debug!(
            path = %path.display(),
            triangles = mesh.number_of_triangles(),
            pmin = %mesh.pmin(),
            pmax = %mesh.pmax(),
            "mesh placed"
        );
        Ok(mesh)
    }
}

/// Emits a frame whenever the step counter enters a new frame interval.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameSchedule {
    steps_per_frame: u64,
    last_frame: Option<u64>,
}

impl FrameSchedule {
    pub fn new(total_steps: u64, video_length: Float) -> Self {
        let frames = (video_length * FRAMES_PER_SECOND).max(1.0);
        let steps_per_frame = ((total_steps as Float / frames).round() as u64).max(1);
        Self {
            steps_per_frame,
            last_frame: None,
        }
    }

    pub fn steps_per_frame(&self) -> u64 {
        self.steps_per_frame
    }

    pub fn frame_due(&mut self, time_step: u64) -> bool {
        let frame = time_step / self.steps_per_frame;
        match self.last_frame {
            Some(last) if frame <= last => false,
            _ => {
                self.last_frame = Some(frame);
                true
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverSummary {
    pub final_step: u64,
    pub secondary_applied_at: Option<u64>,
    pub frames_exported: usize,
    pub solid_cells_added: usize,
}

pub struct Driver<'a, S: LatticeSolver> {
    solver: S,
    state: DriverState,
    domain: DomainRules,
    termination_step: u64,
    insertion_step: Option<u64>,
    primary: Option<&'a dyn Shape>,
    secondary: Option<&'a dyn Shape>,
    exporter: Option<&'a mut dyn FrameExporter>,
    schedule: Option<FrameSchedule>,
    visualization_modes: VisualizationModes,
    camera: Camera,
    summary: DriverSummary,
    verbose: bool,
}

impl<'a, S: LatticeSolver> Driver<'a, S> {
    pub fn new(solver: S, config: &CaseConfig, plan: &CasePlan) -> Self {
        let (insertion_step, schedule) = match config.run_mode {
            RunMode::Scripted { insertion_step, .. } => (Some(insertion_step), None),
            RunMode::Offline { video_length, .. } => (
                None,
                Some(FrameSchedule::new(plan.termination_step, video_length)),
            ),
        };
        Self {
            solver,
            state: DriverState::Init,
            domain: config.domain_rules(),
            termination_step: plan.termination_step,
            insertion_step,
            primary: None,
            secondary: None,
            exporter: None,
            schedule,
            visualization_modes: config.visualization_modes,
            camera: config.camera,
            summary: DriverSummary {
                final_step: 0,
                secondary_applied_at: None,
                frames_exported: 0,
                solid_cells_added: 0,
            },
            verbose: false,
        }
    }

    pub fn with_primary(mut self, shape: &'a dyn Shape) -> Self {
        self.primary = Some(shape);
        self
    }

    pub fn with_secondary(mut self, shape: &'a dyn Shape) -> Self {
        self.secondary = Some(shape);
        self
    }

    pub fn with_exporter(mut self, exporter: &'a mut dyn FrameExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    pub fn summary(&self) -> &DriverSummary {
        &self.summary
    }

    pub fn initialize(&mut self) {
        if self.state != DriverState::Init {
            return;
        }
        let extent = self.solver.extent();
        let mut classifier = Classifier::new();
        if let Some(primary) = self.primary {
            classifier = classifier.with_geometry(primary);
        }
        let classifier = classifier.with_domain_rules(&self.domain);
        let changed = classifier.apply(&extent, self.solver.fields_mut());
        info!(
            changed,
            viscosity = self.solver.viscosity(),
            "initial classification"
        );
        if let Some(exporter) = self.exporter.as_deref_mut() {
            if self.schedule.is_some() {
                exporter.set_visualization_modes(self.visualization_modes);
                exporter.set_camera(self.camera);
            }
        }
        self.solver.run(0);
        self.export_if_due();
        self.state = if self.solver.time_step() >= self.termination_step {
            DriverState::Terminated
        } else {
            DriverState::Running
        };
        self.summary.final_step = self.solver.time_step();
    }

    pub fn step(&mut self) -> DriverState {
        if self.state != DriverState::Running {
            return self.state;
        }
        self.solver.run(1);
        let time_step = self.solver.time_step();
        self.insert_secondary_if_due(time_step);
        self.export_if_due();
        self.summary.final_step = time_step;
        if time_step >= self.termination_step {
            self.state = DriverState::Terminated;
            info!(time_step, "terminated");
        }
        self.state
    }

    pub fn run(&mut self) -> DriverSummary {
        self.initialize();
        let start = Instant::now();
        while self.step() == DriverState::Running {
            let time_step = self.solver.time_step();
            if self.verbose && time_step % PRINT_EVERY == 0 {
                crate::post::print_progress(time_step, self.termination_step, start.elapsed());
            }
        }
        self.summary.clone()
    }

    fn insert_secondary_if_due(&mut self, time_step: u64) {
        let (Some(insertion_step), Some(secondary)) = (self.insertion_step, self.secondary) else {
            return;
        };
        if self.summary.secondary_applied_at.is_some() || time_step < insertion_step {
            return;
        }
        let extent = self.solver.extent();
        let changed = Classifier::new()
            .with_geometry(secondary)
            .apply(&extent, self.solver.fields_mut());
        self.summary.secondary_applied_at = Some(time_step);
        self.summary.solid_cells_added = changed;
        if self.verbose {
            println!(
                "\n{} secondary geometry at step {} ({} cells).\n",
                "Inserted".cyan().bold(),
                time_step,
                changed
            );
        }
        info!(time_step, changed, "secondary geometry inserted");
    }

    fn export_if_due(&mut self) {
        let (Some(schedule), Some(exporter)) = (self.schedule.as_mut(), self.exporter.as_deref_mut())
        else {
            return;
        };
        if !schedule.frame_due(self.solver.time_step()) {
            return;
        }
        match exporter.write_frame(&self.solver) {
            Ok(()) => self.summary.frames_exported += 1,
            Err(e) => warn!(time_step = self.solver.time_step(), "frame export failed: {e}"),
        }
    }
}
