//! CLI demo entry point.
//!
//! # Responsibility
//! - Exercise the referral ledger end to end against a file database.
//! - Print the tracked profile of the first user.
//!
//! Environment:
//! - `REFERRAL_DB_PATH`: database file, defaults to `referral_system.db`.
//! - `REFERRAL_LOG_DIR`: absolute directory for rolling logs; unset disables logging.

use referral_core::{
    core_version, default_log_level, init_logging, ReferralStore, RepoError, StoreConfig, UserId,
    UserReport, DEFAULT_DB_FILE_NAME,
};
use std::path::PathBuf;
use std::process::ExitCode;

type DemoUser = (&'static str, &'static str, &'static str);

const REFERRER: DemoUser = ("John Doe", "john@example.com", "hashedpassword123");
const REFERRED: DemoUser = ("Jane Smith", "jane@example.com", "hashedpassword456");

fn main() -> ExitCode {
    if let Some(log_dir) = env_value("REFERRAL_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), RepoError> {
    let db_path = env_value("REFERRAL_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));
    println!("referral_core {}", core_version());
    let store = ReferralStore::open(StoreConfig::new(db_path))?;
    println!("opened {}", store.db_path().display());

    let referrer = ensure_user(&store, REFERRER)?;
    let referred = ensure_user(&store, REFERRED)?;
    let receipt = store.record_referral(referrer, referred)?;
    println!(
        "referral {} recorded; user {} now has {} points",
        receipt.referral.id, referrer, receipt.referrer_points
    );

    print_report(&store.track_user(referrer)?);
    Ok(())
}

/// Registers the demo user, or reuses the id from an earlier run.
fn ensure_user(store: &ReferralStore, user: DemoUser) -> Result<UserId, RepoError> {
    let (name, email, password_hash) = user;
    if let Some(existing) = store.find_user_by_email(email)? {
        println!("{name} is already registered as user {}", existing.id);
        return Ok(existing.id);
    }
    let id = store.register_user(name, email, password_hash)?;
    println!("registered {name} as user {id}");
    Ok(id)
}

fn print_report(report: &UserReport) {
    println!("User ID: {}", report.user.id);
    println!("Name: {}", report.user.name);
    println!("Email: {}", report.user.email);
    println!("Points: {}", report.user.points);
    println!("Referrals:");
    for referral in &report.referrals {
        println!("Referral ID: {}", referral.id);
        println!("Referred ID: {}", referral.referred_id);
        println!("Created At: {}", referral.created_at);
        println!("-----------------");
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}
