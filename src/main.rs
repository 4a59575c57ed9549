use bombe::cli::{Cli, Commands};
use bombe::config::Settings;
use bombe::indexing::IndexFacade;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

fn load_settings(cli: &Cli) -> Settings {
    let mut settings = Settings::load().unwrap_or_default();
    if let Some(db_path) = &cli.db_path {
        settings.db_path = db_path.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.logging.default = level.clone();
    }
    settings
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("{{\"error\":\"failed to serialize output: {e}\"}}"),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let repo_root = cli.repo.clone().unwrap_or_else(|| PathBuf::from("."));
    let settings = load_settings(&cli);
    bombe::logging::init_with_config(&settings.logging);

    match &cli.command {
        None | Some(Commands::Serve { .. }) => {
            let http = matches!(cli.command, Some(Commands::Serve { http: true, .. }));
            let bind = match &cli.command {
                Some(Commands::Serve { bind, .. }) => bind.clone(),
                _ => "127.0.0.1:8080".to_string(),
            };
            run_serve(&repo_root, settings, http, &bind)
        }
        Some(Commands::IndexFull { init_only, hybrid_sync }) => run_index_full(&repo_root, settings, *init_only, *hybrid_sync),
        Some(Commands::IndexIncremental { hybrid_sync }) => run_index_incremental(&repo_root, settings, *hybrid_sync),
        Some(Commands::Status) => run_status(&repo_root, settings),
        Some(Commands::Doctor) => run_doctor(&repo_root, settings),
        Some(Commands::Watch { max_cycles, poll_interval_ms, hybrid_sync }) => {
            run_watch(&repo_root, settings, *max_cycles, *poll_interval_ms, *hybrid_sync)
        }
    }
}

fn run_serve(repo_root: &PathBuf, settings: Settings, http: bool, bind: &str) -> ExitCode {
    let facade = match IndexFacade::open(repo_root, settings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open graph store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = tokio::runtime::Runtime::new().expect("failed to start async runtime");
    let result = if http {
        runtime.block_on(bombe::cli::commands::serve::run_http(facade, bind))
    } else {
        runtime.block_on(bombe::cli::commands::serve::run_stdio(facade))
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("serve failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_index_full(repo_root: &PathBuf, settings: Settings, init_only: bool, hybrid_sync: bool) -> ExitCode {
    if init_only {
        return match Settings::init_config_file(false) {
            Ok(path) => {
                print_json(&serde_json::json!({ "initialized": path.display().to_string() }));
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let mut facade = match IndexFacade::open(repo_root, settings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open graph store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let stats = match bombe::cli::commands::index::run_full(&mut facade) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("indexing failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    print_json(&stats);

    if hybrid_sync {
        return run_hybrid_sync(repo_root, &mut facade, &[]);
    }
    ExitCode::SUCCESS
}

fn run_index_incremental(repo_root: &PathBuf, settings: Settings, hybrid_sync: bool) -> ExitCode {
    let mut facade = match IndexFacade::open(repo_root, settings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open graph store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (stats, changes) = match bombe::cli::commands::index::run_incremental(repo_root, &mut facade) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("incremental indexing failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    print_json(&stats);

    if hybrid_sync {
        return run_hybrid_sync(repo_root, &mut facade, &changes);
    }
    ExitCode::SUCCESS
}

fn run_hybrid_sync(repo_root: &PathBuf, facade: &mut IndexFacade, changes: &[bombe::indexing::FileChange]) -> ExitCode {
    let runtime_cfg = facade.runtime().clone();
    let runtime = tokio::runtime::Runtime::new().expect("failed to start async runtime");
    let result = runtime.block_on(bombe::cli::commands::sync_cycle::run(repo_root, &mut facade.store, changes, &runtime_cfg));
    match result {
        Ok(report) => {
            print_json(&serde_json::json!({
                "push_ok": report.push_ok,
                "push_mode": report.push_mode,
                "pull_mode": report.pull_mode,
                "pinned_artifact_id": report.pinned_artifact_id,
            }));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("hybrid sync failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_status(repo_root: &PathBuf, settings: Settings) -> ExitCode {
    let facade = match IndexFacade::open(repo_root, settings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open graph store: {e}");
            return ExitCode::FAILURE;
        }
    };
    match bombe::cli::commands::status::run(repo_root, &facade) {
        Ok(report) => {
            print_json(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("status failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_doctor(repo_root: &PathBuf, settings: Settings) -> ExitCode {
    let facade = match IndexFacade::open(repo_root, settings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open graph store: {e}");
            return ExitCode::FAILURE;
        }
    };
    match bombe::cli::commands::doctor::run(repo_root, &facade) {
        Ok(report) => {
            print_json(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("doctor failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_watch(repo_root: &PathBuf, settings: Settings, max_cycles: Option<usize>, poll_interval_ms: u64, hybrid_sync: bool) -> ExitCode {
    let mut facade = match IndexFacade::open(repo_root, settings) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open graph store: {e}");
            return ExitCode::FAILURE;
        }
    };

    let touched = match bombe::cli::commands::watch::run(repo_root, &mut facade, poll_interval_ms, max_cycles) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("watch failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if hybrid_sync && !touched.is_empty() {
        let changes: Vec<bombe::indexing::FileChange> = touched
            .into_iter()
            .map(|path| bombe::indexing::FileChange { status: bombe::indexing::ChangeStatus::Modified, path, old_path: None })
            .collect();
        return run_hybrid_sync(repo_root, &mut facade, &changes);
    }
    ExitCode::SUCCESS
}
