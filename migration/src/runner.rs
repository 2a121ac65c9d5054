use colored::*;
use migration::Migrator;
use sea_orm::DatabaseConnection;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 80;

pub async fn connect(url: &str) -> DatabaseConnection {
    sea_orm::Database::connect(url)
        .await
        .expect("DB connection failed")
}

/// Applies pending migrations one at a time so each gets its own status line.
pub async fn run_pending(db: &DatabaseConnection) {
    let pending = Migrator::get_pending_migrations(db)
        .await
        .expect("Failed to read migration state");

    if pending.is_empty() {
        println!("{}", "Nothing to migrate".dimmed());
        return;
    }

    println!("Running {} migration(s)...", pending.len());
    for migration in pending {
        let label = format!("Applying {}", migration.name().bold());
        report(&label, Migrator::up(db, Some(1))).await;
    }
}

/// Reverts the most recently applied migration.
pub async fn rollback_last(db: &DatabaseConnection) {
    let applied = Migrator::get_applied_migrations(db)
        .await
        .expect("Failed to read migration state");

    match applied.last() {
        Some(last) => {
            let label = format!("Reverting {}", last.name().bold());
            report(&label, Migrator::down(db, Some(1))).await;
        }
        None => println!("{}", "Nothing to roll back".dimmed()),
    }
}

pub async fn print_status(db: &DatabaseConnection) {
    let applied = Migrator::get_applied_migrations(db)
        .await
        .expect("Failed to read migration state");
    let pending = Migrator::get_pending_migrations(db)
        .await
        .expect("Failed to read migration state");

    for m in &applied {
        println!("{} {}", "applied".green(), m.name());
    }
    for m in &pending {
        println!("{} {}", "pending".yellow(), m.name());
    }
}

async fn report<F>(label: &str, step: F)
where
    F: std::future::Future<Output = Result<(), DbErr>>,
{
    let dots = ".".repeat(STATUS_COLUMN.saturating_sub(label.len()));
    print!("{}{} ", label, dots);
    io::stdout().flush().ok();

    let start = Instant::now();
    match step.await {
        Ok(()) => {
            let time_str = format!("({:.2?})", start.elapsed()).dimmed();
            println!("{} {}", "done".green(), time_str);
        }
        Err(e) => {
            println!("{} {}", "failed".red(), e);
            std::process::exit(1);
        }
    }
}
