use clap::{arg, command, value_parser, Command};
use colored::*;
use lbm_case as lbm;
use lbm::boundary::Classifier;
use lbm::config::CaseConfig;
use lbm::driver::{CasePlan, Driver, RunMode};
use lbm::export::{write_flag_field_vtk, VtkExporter};
use lbm::geometry::{stl, Mesh, Shape, StlLoader};
use lbm::io::CasePaths;
use lbm::lattice::{Lattice, LatticeSolver};
use lbm::post::{self, CaseParameters};
use rayon::ThreadPoolBuilder;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = command!()
        .arg(
            arg!(
                -n --number_of_threads <NUMBER_OF_THREADS> "Sets the number of worker threads used for classification"
            )
            .required(false)
            .value_parser(value_parser!(usize)),
        )
        .subcommand(
            Command::new("setup")
                .about("Plans the grid, calibrates the units and writes the classified flag field"),
        )
        .subcommand(
            Command::new("run")
                .about("Runs the case")
                .arg(arg!(-q --quiet "Suppresses the progress lines").required(false)),
        )
        .get_matches();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    if let Some(&num_threads) = matches.get_one::<usize>("number_of_threads") {
        if let Err(e) = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
        {
            eprintln!("{} {e}.", "Error while building the thread pool:".red().bold());
            process::exit(1);
        }
    }

    let result = match matches.subcommand() {
        Some(("setup", _)) => setup(),
        Some(("run", sub_matches)) => run(!sub_matches.get_flag("quiet")),
        _ => Ok(()),
    };
    if let Err(e) = result {
        eprintln!("{} {e}.", "Error:".red().bold());
        process::exit(1);
    }
}

struct Case {
    paths: CasePaths,
    config: CaseConfig,
    plan: CasePlan,
    primary: Option<Mesh>,
    secondary: Option<Mesh>,
}

fn prepare() -> lbm::Result<Case> {
    let paths = CasePaths::default();
    lbm::io::create_case_directories(&paths)?;
    let parameters = lbm::io::read_case_setup(&paths, &CaseConfig::default_case_setup())?;
    let config = CaseConfig::from_parameters(&parameters)?;
    let plan = CasePlan::new(&config)?;
    let case_parameters = CaseParameters::new(&config, &plan);
    case_parameters.print();
    case_parameters.write(paths.case_parameters())?;
    println!(
        "{}\n",
        plan.units
            .reynolds_report(config.si_length, config.si_velocity, config.si_viscosity)
            .green()
            .bold()
    );
    let loader = StlLoader;
    let primary = config
        .primary_mesh
        .as_deref()
        .map(|path| plan.load_mesh(&config, &loader, path))
        .transpose()?;
    let secondary = match config.run_mode {
        RunMode::Scripted { .. } => config
            .secondary_mesh
            .as_deref()
            .map(|path| plan.load_mesh(&config, &loader, path))
            .transpose()?,
        RunMode::Offline { .. } => None,
    };
    Ok(Case {
        paths,
        config,
        plan,
        primary,
        secondary,
    })
}

fn setup() -> lbm::Result<()> {
    let case = prepare()?;
    let extent = case.plan.extent;
    let mut lattice = Lattice::new(extent, case.plan.viscosity);
    let mut classifier = Classifier::new();
    if let Some(primary) = case.primary.as_ref() {
        classifier = classifier.with_geometry(primary as &dyn Shape);
    }
    let domain = case.config.domain_rules();
    classifier
        .with_domain_rules(&domain)
        .apply(&extent, lattice.fields_mut());
    let flag_statistics = post::compute_flag_statistics(lattice.flags());
    post::print_post_results(&flag_statistics);
    post::write_post_results(case.paths.flag_statistics(), 0, &flag_statistics)?;
    let case_name = case.config.case_name.replace(" ", "_").to_lowercase();
    write_flag_field_vtk(
        case.paths.vtk.join(format!("{case_name}_node_type.vtk")),
        &case.config.case_name,
        &extent,
        lattice.flags(),
    )?;
    for (name, mesh) in [("primary", &case.primary), ("secondary", &case.secondary)] {
        if let Some(mesh) = mesh {
            stl::write_stl(mesh, case.paths.post_processing.join(format!("{case_name}_{name}.stl")))?;
        }
    }
    Ok(())
}

fn run(verbose: bool) -> lbm::Result<()> {
    let case = prepare()?;
    let lattice = Lattice::new(case.plan.extent, case.plan.viscosity);
    let mut exporter = VtkExporter::new(&case.paths.vtk, &case.config.case_name);
    let mut driver = Driver::new(lattice, &case.config, &case.plan)
        .with_exporter(&mut exporter)
        .verbose(verbose);
    if let Some(primary) = case.primary.as_ref() {
        driver = driver.with_primary(primary);
    }
    if let Some(secondary) = case.secondary.as_ref() {
        driver = driver.with_secondary(secondary);
    }
    let summary = driver.run();
    post::print_post_results(&post::compute_flag_statistics(driver.solver().flags()));
    println!(
        "{} step {}, {} frames exported.",
        "Finished at".green().bold(),
        summary.final_step,
        summary.frames_exported
    );
    if let Some(step) = summary.secondary_applied_at {
        println!(
            "{} at step {} ({} cells).",
            "Secondary geometry inserted".green().bold(),
            step,
            summary.solid_cells_added
        );
    }
    Ok(())
}
