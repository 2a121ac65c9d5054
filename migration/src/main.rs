use std::{env, fs, path::Path};

mod runner;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = env::var("DATABASE_PATH").expect("DATABASE_PATH must be set");
    let url = format!("sqlite://{}?mode=rwc", db_path);

    match env::args().nth(1).as_deref() {
        Some("clean") => remove_db_file(&db_path),
        Some("fresh") => {
            remove_db_file(&db_path);
            create_db_dir(&db_path);
            runner::run_pending(&runner::connect(&url).await).await;
        }
        Some("rollback") => runner::rollback_last(&runner::connect(&url).await).await,
        Some("status") => runner::print_status(&runner::connect(&url).await).await,
        None | Some("up") => {
            create_db_dir(&db_path);
            runner::run_pending(&runner::connect(&url).await).await;
        }
        Some(other) => {
            eprintln!("Unknown command `{other}`. Use one of: up, fresh, clean, rollback, status");
            std::process::exit(2);
        }
    }
}

fn remove_db_file(path: &str) {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
}

fn create_db_dir(path: &str) {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).expect("Failed to create DB directory");
    }
}
