use clap::Parser;
use pr_wizard_core::{execute_cli, style, CoreCliArgs};
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    // stdout carries descriptions and native-messaging frames, logs go to stderr
    let default = if verbose { "pr_wizard_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli_args = CoreCliArgs::parse();
    init_logging(cli_args.verbose);

    match execute_cli(cli_args).await {
        Ok(Some(_)) => {
            println!("\n{}", style("✨ description ready ✨").green().bold());
            println!(
                "{}",
                style("pass --out plan.json to save the injection plan for the browser extension").cyan()
            );
        }
        Ok(None) => {}
        Err(e) => {
            eprintln!(
                "{} {} {}",
                style("❌"),
                style("pr-wizard failed:").red().bold(),
                style(format!("{e:#}")).red()
            );
            std::process::exit(1);
        }
    }
}
