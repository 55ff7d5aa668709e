use clap::Parser;
use log::info;
use std::process::ExitCode;

use gbtick::{
    RunError,
    cli::Args,
    format_serial,
    run_config::{self, RunConfig},
    run_file,
};

fn run(args: &Args) -> Result<bool, RunError> {
    let mut cfg = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => run_config::load_or_default(&run_config::default_run_config_path()),
    };
    args.apply(&mut cfg);

    info!("Loading {}", args.program.display());
    let report = run_file(&cfg, &args.program)?;

    if !report.serial.is_empty() {
        println!("[SERIAL] {}", format_serial(&report.serial));
    }
    if cfg.show_registers {
        println!("{}", report.registers);
    }
    println!("ran {} cycles", report.cycles);

    Ok(cfg.until_serial.is_none() || report.matched)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("serial output never matched");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
