use crate::cli::ResumeArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::traj::ExtxyzWriter;
use crate::utils::progress::CliProgressHandler;
use polyns::engine::progress::ProgressReporter;
use polyns::workflows::sample::{self, Termination};
use tracing::info;

pub fn run(args: ResumeArgs) -> Result<()> {
    let partial = PartialRunConfig::from_file(&args.config)?;
    let app_config = partial.merge_with_resume(&args)?;

    if !app_config.core.checkpoint_path.exists() {
        return Err(CliError::Argument(format!(
            "no checkpoint at {}",
            app_config.core.checkpoint_path.display()
        )));
    }
    let mut sink = ExtxyzWriter::append(&app_config.trajectory_path)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Resuming nested sampling from {}.",
        app_config.core.checkpoint_path.display()
    );
    info!("Invoking the core sampling workflow in resume mode...");

    let result = sample::resume(&app_config.core, &reporter, &mut sink)?;
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
                "Time budget exhausted after {} iterations; checkpoint updated at {}.",
                result.iterations_completed,
                app_config.core.checkpoint_path.display()
            );
        }
    }

    Ok(())
}
