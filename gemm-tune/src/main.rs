use facet_args as args;
use gemm_tune::{Args, ProcessToolchain, TuneConfig};
use miette::Report;
use owo_colors::OwoColorize;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_tracing() {
    let filter = std::env::var("GEMM_TUNE_LOG")
        .ok()
        .and_then(|s| s.parse::<Targets>().ok())
        .unwrap_or_else(|| Targets::new().with_default(tracing::Level::INFO));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .without_time()
                .compact(),
        )
        .with(filter)
        .try_init()
        .ok();
}

fn main() {
    let args: Args = match args::from_std_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{:?}", Report::from_err(e));
            std::process::exit(1);
        }
    };

    init_tracing();

    let config = TuneConfig::from_args(args);
    match gemm_tune::run(&config, &mut ProcessToolchain) {
        Ok(outcome) => {
            println!();
            println!(
                "{} {} shapes, {} above {}% of total time, {} tuning configs",
                "✓".green().bold(),
                outcome.shapes,
                outcome.unique_shapes,
                config.threshold,
                outcome.tuning_configs.len()
            );
            println!("   ranked:  {}", outcome.ranked_csv.display());
            println!("   unique:  {}", outcome.unique_csv.display());
            for path in &outcome.tuning_configs {
                println!("   tuning:  {}", path.display());
            }
        }
        Err(e) => {
            eprintln!("{:?}", Report::new(e));
            std::process::exit(1);
        }
    }
}
