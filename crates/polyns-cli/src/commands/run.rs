use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::Result;
use crate::traj::ExtxyzWriter;
use crate::utils::progress::CliProgressHandler;
use polyns::engine::progress::ProgressReporter;
use polyns::workflows::sample::{self, Termination};
use tracing::info;

pub fn run(args: RunArgs) -> Result<()> {
    let partial = PartialRunConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let app_config = partial.merge_with_run(&args)?;

    std::fs::create_dir_all(&args.output_dir)?;
    let mut sink = ExtxyzWriter::create(&app_config.trajectory_path)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Starting nested sampling: {} walkers, {} chains x {} beads, {} iterations.",
        app_config.core.n_walkers,
        app_config.core.n_chains,
        app_config.core.n_beads,
        app_config.core.total_iterations
    );
    info!("Invoking the core sampling workflow...");

    let result = sample::run(&app_config.core, &reporter, &mut sink)?;
    progress_handler.finish();

    match result.termination {
        Termination::Completed => {
            println!(
                "Run complete: {} iterations, final volume threshold {:.6}.",
                result.iterations_completed, result.final_threshold
            );
        }
        Termination::TimeBudgetExhausted => {
            println!(
                "Time budget exhausted after {} iterations; checkpoint written to {}.",
                result.iterations_completed,
                app_config.core.checkpoint_path.display()
            );
            println!("Resume with: polyns resume -c <config> -o <output-dir>");
        }
    }

    Ok(())
}
