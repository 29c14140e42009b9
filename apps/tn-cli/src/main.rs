use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tn_project::Project;
use tn_sim::{Directions, check_derivatives, run_sim};
use tracing_subscriber::EnvFilter;

mod csv;
mod error;

use error::{CliError, CliResult};

#[derive(Parser)]
#[command(name = "tn-cli")]
#[command(about = "TankNet CLI - theta-method simulation of tank grids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and structure
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Print the model's parameters and derived coefficients
    Params {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// March the project's trajectory
    Run {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Write recorded levels as CSV to this path
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Record every N-th step (overrides the project)
        #[arg(long)]
        record_every: Option<usize>,
        /// Number of steps (overrides the project)
        #[arg(long)]
        steps: Option<usize>,
    },
    /// Compare analytic Jacobians with finite differences on the first step
    Check {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
        /// Finite difference scale
        #[arg(long, default_value_t = 1e-6)]
        step: f64,
        /// Largest accepted relative error
        #[arg(long, default_value_t = 1e-5)]
        tol: f64,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Params { project_path } => cmd_params(&project_path),
        Commands::Run {
            project_path,
            output,
            record_every,
            steps,
        } => cmd_run(&project_path, output.as_deref(), record_every, steps),
        Commands::Check {
            project_path,
            step,
            tol,
        } => cmd_check(&project_path, step, tol),
    }
}

fn load(project_path: &Path) -> CliResult<Project> {
    Ok(tn_project::load(project_path)?)
}

fn cmd_validate(project_path: &Path) -> CliResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = load(project_path)?;
    let model = project.build_model()?;
    println!(
        "✓ Project is valid: {} ({} tanks)",
        project.name,
        model.tanks()
    );
    Ok(())
}

fn cmd_params(project_path: &Path) -> CliResult<()> {
    let project = load(project_path)?;
    let model = project.build_model()?;
    println!("Project: {}", project.name);
    print!("{model}");
    Ok(())
}

fn cmd_run(
    project_path: &Path,
    output: Option<&Path>,
    record_every: Option<usize>,
    steps: Option<usize>,
) -> CliResult<()> {
    let project = load(project_path)?;
    let model = project.build_model()?;
    let mut opts = project.sim_options();
    if let Some(n) = record_every {
        opts.record_every = n;
    }
    if steps.is_some() {
        opts.steps = steps;
    }

    println!("Running project: {}", project.name);
    let started = Instant::now();
    let rec = run_sim(
        &model,
        &project.initial_state(&model),
        &project.schedule(model.tanks()),
        &opts,
    )?;
    let elapsed = started.elapsed().as_secs_f64();

    println!("✓ Simulation completed in {:.3}s", elapsed);
    println!("  Steps:             {}", rec.residual_norms.len());
    println!("  Time points:       {}", rec.t.len());
    println!(
        "  Final time:        {:.3} s",
        rec.t.last().copied().unwrap_or(0.0)
    );
    println!("  Corrected steps:   {}", rec.corrected_steps);
    println!("  Max residual:      {:.3e}", rec.max_residual());
    if let (Some(first), Some(last)) = (rec.volume.first(), rec.volume.last()) {
        println!("  Volume:            {:.4} -> {:.4} m^3", first, last);
    }
    if rec.overflow_steps > 0 {
        println!("  Overflow steps:    {}", rec.overflow_steps);
    }

    if let Some(path) = output {
        std::fs::write(path, csv::levels_csv(&model, &rec))?;
        println!("✓ Exported {} time points to {}", rec.t.len(), path.display());
    }

    Ok(())
}

fn cmd_check(project_path: &Path, step: f64, tol: f64) -> CliResult<()> {
    let project = load(project_path)?;
    let model = project.build_model()?;
    let schedule = project.schedule(model.tanks());
    let z = schedule.control(0);

    let mut u_old = project.initial_state(&model);
    model.compute_flow(&mut u_old, z)?;
    let mut u_new = model.zero_state();
    let mut c = model.zero_control();
    model.solve_level(&mut c, &mut u_new, &u_old, z)?;

    let report = check_derivatives(
        &model,
        &u_old,
        &u_new,
        z,
        &Directions::sample(&model),
        step,
    )?;

    println!("Derivative check (step = {:.1e}):", report.step);
    println!("  dc/du_old        {:.3e}", report.jacobian_old);
    println!("  dc/du_new        {:.3e}", report.jacobian_new);
    println!("  dc/dz            {:.3e}", report.jacobian_control);
    println!("  adjoint du_old   {:.3e}", report.adjoint_old);
    println!("  adjoint du_new   {:.3e}", report.adjoint_new);
    println!("  adjoint dz       {:.3e}", report.adjoint_control);

    let worst = report.worst();
    if worst > tol {
        return Err(CliError::CheckFailed {
            worst,
            tolerance: tol,
        });
    }
    println!("✓ All products within {:.1e}", tol);
    Ok(())
}
