use crate::config::CaseConfig;
use crate::driver::CasePlan;
use crate::global_variables::*;
use crate::units::relaxation_time;
use crate::CellFlag;
use colored::*;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

pub struct PostResult {
    pub name: String,
    pub label: String,
    pub value: Float,
    pub unit: Option<String>,
}

impl PostResult {
    pub fn new(name: String, label: String, value: Float, unit: Option<String>) -> Self {
        Self {
            name,
            label,
            value,
            unit,
        }
    }
}

pub struct CaseParameters {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub memory_mb: Float,
    pub bytes_per_cell: usize,
    pub length_conversion_factor: Float,
    pub time_conversion_factor: Float,
    pub density_conversion_factor: Float,
    pub velocity_conversion_factor: Float,
    pub mass_conversion_factor: Float,
    pub viscosity_conversion_factor: Float,
    pub lattice_length: Float,
    pub viscosity: Float,
    pub physical_viscosity: Float,
    pub tau: Float,
    pub reynolds_number: Float,
    pub termination_step: u64,
}

impl CaseParameters {
    pub fn new(config: &CaseConfig, plan: &CasePlan) -> Self {
        let units = &plan.units;
        CaseParameters {
            nx: plan.extent.nx,
            ny: plan.extent.ny,
            nz: plan.extent.nz,
            memory_mb: plan.extent.memory_mb(&config.storage),
            bytes_per_cell: config.storage.bytes_per_cell(),
            length_conversion_factor: units.length_factor(),
            time_conversion_factor: units.time_factor(),
            density_conversion_factor: units.density_factor(),
            velocity_conversion_factor: units.velocity_factor(),
            mass_conversion_factor: units.mass_factor(),
            viscosity_conversion_factor: units.viscosity_factor(),
            lattice_length: plan.lattice_length,
            viscosity: plan.viscosity,
            physical_viscosity: config.si_viscosity,
            tau: relaxation_time(plan.viscosity),
            reynolds_number: units.si_reynolds_number(
                config.si_length,
                config.si_velocity,
                config.si_viscosity,
            ),
            termination_step: plan.termination_step,
        }
    }

    pub fn to_jou(&self) -> String {
        let nx = self.nx;
        let ny = self.ny;
        let nz = self.nz;
        let memory_mb = self.memory_mb;
        let bytes_per_cell = self.bytes_per_cell;
        let length_conversion_factor = self.length_conversion_factor;
        let time_conversion_factor = self.time_conversion_factor;
        let density_conversion_factor = self.density_conversion_factor;
        let velocity_conversion_factor = self.velocity_conversion_factor;
        let mass_conversion_factor = self.mass_conversion_factor;
        let viscosity_conversion_factor = self.viscosity_conversion_factor;
        let lattice_length = self.lattice_length;
        let viscosity = self.viscosity;
        let physical_viscosity = self.physical_viscosity;
        let tau = self.tau;
        let reynolds_number = self.reynolds_number;
        let termination_step = self.termination_step;
        format!(
            r#"nx                               = {nx}
ny                               = {ny}
nz                               = {nz}
memory_mb                        = {memory_mb:.2}
bytes_per_cell                   = {bytes_per_cell}

length_conversion_factor         = {length_conversion_factor:.8e}
time_conversion_factor           = {time_conversion_factor:.8e}
density_conversion_factor        = {density_conversion_factor:.8e}
velocity_conversion_factor       = {velocity_conversion_factor:.8e}
mass_conversion_factor           = {mass_conversion_factor:.8e}
viscosity_conversion_factor      = {viscosity_conversion_factor:.8e}

lattice_length                   = {lattice_length:.8e}
viscosity                        = {viscosity:.8e}
physical_viscosity               = {physical_viscosity:.8e}
tau                              = {tau:.8e}
reynolds_number                  = {reynolds_number:.8e}
termination_step                 = {termination_step}"#
        )
    }

    pub fn write<P>(&self, path: P) -> io::Result<()>
    where
        P: AsRef<Path>,
    {
        println!(
            "Writing the case parameters file: {}.\n",
            path.as_ref().display().to_string().yellow().bold()
        );
        let mut file = File::create(path)?;
        writeln!(file, "{}", self.to_jou())?;
        Ok(())
    }

    pub fn print(&self) {
        println!("{}\n", "Case parameters".cyan().bold());
        println!(
            "{:>24} {} x {} x {} ({:.2} MB)",
            "grid:".cyan().bold(),
            self.nx,
            self.ny,
            self.nz,
            self.memory_mb
        );
        println!("{:>24} {:.8e}", "viscosity:".cyan().bold(), self.viscosity);
        println!("{:>24} {:.8e}", "tau:".cyan().bold(), self.tau);
        println!(
            "{:>24} {}",
            "Reynolds number:".cyan().bold(),
            self.reynolds_number.round() as u64
        );
        println!("{:>24} {}\n", "steps:".cyan().bold(), self.termination_step);
    }
}

pub fn compute_flag_statistics(flags: &[CellFlag]) -> Vec<PostResult> {
    let count = |target: CellFlag| flags.par_iter().filter(|&&flag| flag == target).count() as Float;
    let number_of_fluid_cells = count(CellFlag::Fluid);
    let number_of_solid_cells = count(CellFlag::Solid);
    let number_of_open_cells = count(CellFlag::OpenBoundary);
    let porosity = if flags.is_empty() {
        0.0
    } else {
        (number_of_fluid_cells + number_of_open_cells) / flags.len() as Float
    };
    vec![
        PostResult::new(
            "n_fluid_cells".to_string(),
            "number of fluid cells".to_string(),
            number_of_fluid_cells,
            None,
        ),
        PostResult::new(
            "n_solid_cells".to_string(),
            "number of solid cells".to_string(),
            number_of_solid_cells,
            None,
        ),
        PostResult::new(
            "n_open_cells".to_string(),
            "number of open boundary cells".to_string(),
            number_of_open_cells,
            None,
        ),
        PostResult::new(
            "porosity".to_string(),
            "porosity".to_string(),
            porosity,
            None,
        ),
    ]
}

pub fn print_post_results(post_results: &[PostResult]) {
    for post_result in post_results {
        let unit = post_result.unit.as_deref().unwrap_or("");
        println!(
            "{:>32} {:>16.8e} {}",
            format!("{}:", post_result.label).cyan().bold(),
            post_result.value,
            unit
        );
    }
    println!();
}

pub fn write_post_results<P>(path: P, time_step: u64, post_results: &[PostResult]) -> io::Result<()>
where
    P: AsRef<Path>,
{
    let mut file = File::create(path)?;
    write!(file, "{:>8}", "step")?;
    for post_result in post_results {
        write!(file, " {:>16}", post_result.name)?;
    }
    writeln!(file)?;
    write!(file, "{:>8}", time_step)?;
    for post_result in post_results {
        write!(file, " {:>16.8e}", post_result.value)?;
    }
    writeln!(file)?;
    Ok(())
}

pub fn print_progress(time_step: u64, termination_step: u64, elapsed: Duration) {
    println!(
        "{:>8} / {:<8} {} {:.2} s",
        time_step,
        termination_step,
        "elapsed".cyan().bold(),
        elapsed.as_secs_f64()
    );
}
