//! CLI tool to manage apps registered with the add-on.
//!
//! Usage:
//!   cargo run --bin manage-apps -- list
//!   cargo run --bin manage-apps -- register --app <app-slug> --token <api-token>
//!   cargo run --bin manage-apps -- remove --app <app-slug>
//!   cargo run --bin manage-apps -- build-status --app <app-slug> --build <build-slug>

use std::env;
use std::sync::Arc;

use secrecy::SecretString;

use testlab_addon_lib::config::Config;
use testlab_addon_lib::db::{AppRegistry, DbPool};
use testlab_addon_lib::services::{BuildStatusSync, HttpCiClient};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match DbPool::new(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = pool.run_migrations().await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    match command.as_str() {
        "list" | "ls" => list_apps(&pool).await,
        "register" => {
            let app = required_arg(&args, &["--app", "-a"], "--app");
            // Prefer the environment so tokens stay out of shell history
            let token = env::var("ADDON_APP_TOKEN")
                .ok()
                .or_else(|| parse_arg(&args, &["--token", "-t"]))
                .unwrap_or_else(|| {
                    eprintln!("Error: --token or ADDON_APP_TOKEN is required");
                    std::process::exit(1);
                });
            register_app(&pool, &app, SecretString::from(token)).await;
        }
        "remove" | "rm" => {
            let app = required_arg(&args, &["--app", "-a"], "--app");
            remove_app(&pool, &app).await;
        }
        "build-status" => {
            let app = required_arg(&args, &["--app", "-a"], "--app");
            let build = required_arg(&args, &["--build", "-b"], "--build");
            build_status(pool, &config, &app, &build).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn parse_arg(args: &[String], flags: &[&str]) -> Option<String> {
    let mut i = 2;
    while i < args.len() {
        if flags.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn required_arg(args: &[String], flags: &[&str], name: &str) -> String {
    parse_arg(args, flags).unwrap_or_else(|| {
        eprintln!("Error: {} is required", name);
        std::process::exit(1);
    })
}

async fn list_apps(pool: &DbPool) {
    let apps = match pool.list_apps().await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error listing apps: {}", e);
            std::process::exit(1);
        }
    };

    if apps.is_empty() {
        println!("No apps registered.");
        return;
    }

    println!();
    println!("{:<40} {:<25}", "APP", "REGISTERED");
    println!("{}", "─".repeat(66));
    for app in apps {
        println!(
            "{:<40} {:<25}",
            app.app_slug,
            app.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();
}

async fn register_app(pool: &DbPool, app_slug: &str, token: SecretString) {
    match pool.upsert_app(app_slug, &token).await {
        Ok(app) => println!("App {} registered.", app.app_slug),
        Err(e) => {
            eprintln!("Error registering app: {}", e);
            std::process::exit(1);
        }
    }
}

async fn remove_app(pool: &DbPool, app_slug: &str) {
    match pool.delete_app(app_slug).await {
        Ok(true) => println!("App {} removed.", app_slug),
        Ok(false) => {
            eprintln!("App {} not found.", app_slug);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error removing app: {}", e);
            std::process::exit(1);
        }
    }
}

async fn build_status(pool: DbPool, config: &Config, app_slug: &str, build_slug: &str) {
    let pool = Arc::new(pool);
    let ci = Arc::new(HttpCiClient::new(reqwest::Client::new(), &config.ci));
    let sync = BuildStatusSync::new(pool.clone(), pool, ci);

    match sync.refresh(app_slug, build_slug).await {
        Ok(build) => {
            let status = build.status.map(|s| s.to_string()).unwrap_or_default();
            println!("Build {} status: {} (recorded)", build_slug, status);
        }
        Err(e) => {
            eprintln!("Error refreshing build status: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Manage apps registered with the add-on");
    println!();
    println!("Usage: manage-apps <command> [options]");
    println!();
    println!("Commands:");
    println!("  list, ls                       List registered apps");
    println!("  register --app <slug>          Register an app or replace its CI token");
    println!("           --token <token>       (or set ADDON_APP_TOKEN)");
    println!("  remove, rm --app <slug>        Remove an app");
    println!("  build-status --app <slug> --build <slug>");
    println!("                                 Fetch a build's status from the CI host and store it");
    println!("  help                           Show this help message");
}
