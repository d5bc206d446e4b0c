use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use nalgebra::Vector3;
use tracing::error;

use virial_overlap::{
    gaussian_pair, read_config, GaussianCluster, OverlapReport, OverlapSimulation, OverlapSystem, Result,
    SimulationConfig, SquareWellPair,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum SystemKind {
    /// Three-point Gaussian clusters of different widths
    Gaussian,
    /// Square-well second virial coefficient against hard spheres
    SquareWell,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// YAML run configuration; defaults are used without one
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Production macro-steps
    #[arg(long)]
    steps: Option<u64>,

    #[arg(long, value_enum, default_value_t = SystemKind::Gaussian)]
    system: SystemKind,
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => SimulationConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(steps) = args.steps {
        config.production_steps = steps;
    }

    match args.system {
        SystemKind::Gaussian => {
            let reference = GaussianCluster::new(3, 1.0)?;
            let target = GaussianCluster::new(3, 0.8)?;
            let (ref_system, target_system) = gaussian_pair(reference, target, config.moves)?;
            // <r_1^2> under the target weight, scaled back to an integral
            let target_system = target_system
                .with_extra_value(move |c: &Vec<Vector3<f64>>| c[1].norm_squared() * target.weight(c));
            let report = drive(ref_system, target_system, &config, reference.integral(), Some(&["r1^2"][..]))?;

            println!("Gaussian cluster overlap");
            println!("----------------------------------------");
            println!("Integral: {:.6e} ± {:.6e}", report.full_average, report.full_error);
            println!("Exact integral: {:.6e}", target.integral());
            println!(
                "Exact r1^2 integral: {:.6e}",
                3.0 * target.sigma * target.sigma * target.integral()
            );
        }
        SystemKind::SquareWell => {
            let model = SquareWellPair::new(1.0, 1.5, 0.5)?;
            let (ref_system, target_system) = model.pair(config.moves)?;
            let report = drive(ref_system, target_system, &config, model.hard_sphere_b2(), None)?;

            println!("Square-well second virial coefficient");
            println!("----------------------------------------");
            println!("B2: {:.6} ± {:.6}", report.full_average, report.full_error);
            println!("Exact B2: {:.6}", model.b2());
        }
    }
    Ok(())
}

fn drive<C>(
    reference: OverlapSystem<C>,
    target: OverlapSystem<C>,
    config: &SimulationConfig,
    reference_integral: f64,
    labels: Option<&[&str]>,
) -> Result<OverlapReport> {
    let mut sim = OverlapSimulation::from_config(reference, target, config)?;
    let ref_pref_file = config.ref_pref_file.as_deref();
    sim.init_ref_pref(ref_pref_file, config.calibration.steps)?;
    sim.equilibrate(ref_pref_file, config.calibration.equilibration_steps)?;
    sim.run(config.production_steps)?;
    sim.print_results(reference_integral, labels)
}
