use clap::Parser;
use colored::*;
use voxtask_server::{serve, AppState};

#[derive(Parser)]
#[command(name = "voxtask-server")]
#[command(about = "Reference VoxTask task service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
    bind: String,

    /// Maximum tasks per owner; creates beyond it are refused with 403
    #[arg(short = 'q', long, env = "VOXTASK_TASK_QUOTA")]
    task_quota: Option<usize>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voxtask_server=debug,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    tracing::info!("{}", "VoxTask Task Server".bold().cyan());
    match args.task_quota {
        Some(quota) => tracing::info!("Task quota: {} per owner", quota.to_string().yellow()),
        None => tracing::info!("Task quota: {}", "unlimited".green()),
    }

    let listener = match tokio::net::TcpListener::bind(&args.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%e, addr = %args.bind, "Failed to bind");
            return;
        }
    };

    if let Err(e) = serve(listener, AppState::new(args.task_quota)).await {
        tracing::error!(%e, addr = %args.bind);
    }
}
