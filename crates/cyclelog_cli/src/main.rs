//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `cyclelog_core` linkage.
//! - Optionally open a database and print one owner's history and stats.
//!
//! Usage: `cyclelog_cli [DB_PATH [user|demo]]`

use cyclelog_core::{
    core_version, default_log_level, init_stderr_logging, ping, Owner, PeriodService,
    SqlitePeriodStore,
};
use log::error;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("cyclelog_core ping={}", ping());
    println!("cyclelog_core version={}", core_version());

    let mut args = std::env::args().skip(1);
    let Some(db_path) = args.next() else {
        return ExitCode::SUCCESS;
    };
    let owner = match args.next().map(|value| value.parse::<Owner>()) {
        None => Owner::User,
        Some(Ok(owner)) => owner,
        Some(Err(err)) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = init_stderr_logging(default_log_level()) {
        eprintln!("logging disabled: {err}");
    }

    match report(&db_path, owner) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_report module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn report(db_path: &str, owner: Owner) -> Result<(), Box<dyn std::error::Error>> {
    let service = PeriodService::new(SqlitePeriodStore::open(db_path)?);

    for period in service.list(owner)? {
        let end = period
            .end_date
            .map_or_else(|| "ongoing".to_string(), |date| date.to_string());
        println!("{owner} #{} {} .. {}", period.id, period.start_date, end);
    }

    let stats = service.stats(owner)?;
    println!(
        "average_cycle_length={}",
        format_optional(stats.average_cycle_length)
    );
    println!(
        "average_period_length={}",
        format_optional(stats.average_period_length)
    );
    println!(
        "current_period={}",
        stats
            .current_period
            .map_or_else(|| "none".to_string(), |period| period.start_date.to_string())
    );
    println!(
        "predicted_next_start={}",
        format_optional(stats.predicted_next_start)
    );
    Ok(())
}

fn format_optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "none".to_string(), |value| value.to_string())
}
