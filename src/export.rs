use crate::error::{CaseError, Result};
use crate::global_variables::*;
use crate::lattice::LatticeSolver;
use crate::resolution::GridExtent;
use crate::CellFlag;
use colored::*;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct VisualizationModes: u32 {
        const FLAG_LATTICE = 1 << 0;
        const FLAG_SURFACE = 1 << 1;
        const FIELD = 1 << 2;
        const STREAMLINES = 1 << 3;
        const Q_CRITERION = 1 << 4;
    }
}

impl VisualizationModes {
    /// Parses names joined by `|`, e.g. `flag_surface|q_criterion`.
    pub fn parse(value: &str) -> Result<Self> {
        value
            .split('|')
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .try_fold(VisualizationModes::empty(), |modes, name| {
                let mode = match name {
                    "flag_lattice" => VisualizationModes::FLAG_LATTICE,
                    "flag_surface" => VisualizationModes::FLAG_SURFACE,
                    "field" => VisualizationModes::FIELD,
                    "streamlines" => VisualizationModes::STREAMLINES,
                    "q_criterion" => VisualizationModes::Q_CRITERION,
                    _ => {
                        return Err(CaseError::invalid(
                            "visualization_modes",
                            format!("unknown mode {name}"),
                        ))
                    }
                };
                Ok(modes | mode)
            })
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pub rx: Float,
    pub ry: Float,
    pub fov: Float,
    pub zoom: Float,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            rx: -40.0,
            ry: 20.0,
            fov: 78.0,
            zoom: 1.25,
        }
    }
}

pub trait FrameExporter {
    fn set_visualization_modes(&mut self, modes: VisualizationModes);

    fn set_camera(&mut self, camera: Camera);

    fn write_frame(&mut self, solver: &dyn LatticeSolver) -> io::Result<()>;
}

pub struct VtkExporter {
    directory: PathBuf,
    case_name: String,
    modes: VisualizationModes,
    camera: Camera,
    pub frames_written: usize,
}

impl VtkExporter {
    pub fn new<P>(directory: P, case_name: &str) -> Self
    where
        P: AsRef<Path>,
    {
        Self {
            directory: directory.as_ref().to_path_buf(),
            case_name: case_name.replace(" ", "_").to_lowercase(),
            modes: VisualizationModes::FLAG_LATTICE,
            camera: Camera::default(),
            frames_written: 0,
        }
    }

    pub fn frame_path(&self, time_step: u64) -> PathBuf {
        self.directory
            .join(format!("{}_frame_{:08}.vtk", self.case_name, time_step))
    }
}

impl FrameExporter for VtkExporter {
    fn set_visualization_modes(&mut self, modes: VisualizationModes) {
        self.modes = modes;
    }

    fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    fn write_frame(&mut self, solver: &dyn LatticeSolver) -> io::Result<()> {
        let time_step = solver.time_step();
        let path = self.frame_path(time_step);
        debug!(path = %path.display(), "writing frame");
        let title = format!(
            "LBM frame t={} modes={:?} camera=({}, {}, {}, {})",
            time_step, self.modes, self.camera.rx, self.camera.ry, self.camera.fov, self.camera.zoom
        );
        let with_velocity = self.modes.intersects(
            VisualizationModes::FIELD
                | VisualizationModes::STREAMLINES
                | VisualizationModes::Q_CRITERION,
        );
        let velocity = with_velocity.then(|| solver.velocity());
        let file = File::create(path)?;
        write_vtk(
            BufWriter::new(file),
            &title,
            &solver.extent(),
            solver.flags(),
            velocity,
        )?;
        self.frames_written += 1;
        Ok(())
    }
}

pub fn write_flag_field_vtk<P>(
    path: P,
    case_name: &str,
    extent: &GridExtent,
    flags: &[CellFlag],
) -> io::Result<()>
where
    P: AsRef<Path>,
{
    println!(
        "Writing node type vtk file: {}.\n",
        path.as_ref().display().to_string().yellow().bold()
    );
    let file = File::create(path)?;
    write_vtk(BufWriter::new(file), case_name, extent, flags, None)
}

fn write_vtk<W>(
    mut file: W,
    title: &str,
    extent: &GridExtent,
    flags: &[CellFlag],
    velocity: Option<&[[Float; D]]>,
) -> io::Result<()>
where
    W: Write,
{
    writeln!(file, "# vtk DataFile Version 3.0")?;
    writeln!(file, "{}", title)?;
    writeln!(file, "ASCII")?;
    writeln!(file, "DATASET STRUCTURED_POINTS")?;
    writeln!(file, "DIMENSIONS {} {} {}", extent.nx, extent.ny, extent.nz)?;
    writeln!(file, "ORIGIN 0 0 0")?;
    writeln!(file, "SPACING 1 1 1")?;
    writeln!(file, "POINT_DATA {}", extent.number_of_cells())?;
    writeln!(file, "SCALARS flags int 1")?;
    writeln!(file, "LOOKUP_TABLE default")?;
    for flag in flags {
        writeln!(file, "{}", *flag as u8)?;
    }
    if let Some(velocity) = velocity {
        writeln!(file, "VECTORS velocity float")?;
        for [ux, uy, uz] in velocity {
            writeln!(file, "{:>.8e} {:>.8e} {:>.8e}", ux, uy, uz)?;
        }
    }
    file.flush()?;
    Ok(())
}
