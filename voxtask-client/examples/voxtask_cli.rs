use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::*;
use voxtask_client::{ClientConfig, Session, SyncEngine};
use voxtask_core::models::{is_local_id, Task, TaskFormData, TaskStatus, TaskUpdate};

#[derive(Parser)]
#[command(name = "voxtask")]
#[command(about = "Offline-first task list client", long_about = None)]
struct Cli {
    /// Task service URL (falls back to VOXTASK_API_URL)
    #[arg(short, long)]
    server: Option<String>,

    /// Identity the local cache and queue are kept under
    #[arg(short, long, env = "VOXTASK_USER")]
    user: Option<String>,

    /// Bearer token sent to the task service
    #[arg(short, long, env = "VOXTASK_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show tasks (from the service when reachable, else from the cache)
    List,
    /// Add a task
    Add {
        title: String,
        /// Deadline as YYYY-MM-DD
        #[arg(short, long)]
        deadline: NaiveDate,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Set the status of a task
    Status { id: String, status: TaskStatus },
    /// Delete a task
    Rm { id: String },
    /// Replay pending changes
    Sync,
    /// Show reachability and the pending queue
    Pending,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(server) = cli.server {
        config = config.with_base_url(server);
    }
    let engine = SyncEngine::connect(&config).await?;
    let session = Session::new(cli.user, cli.token);

    let online = engine.check_health().await;
    println!(
        "{} {}",
        "Service:".bold(),
        if online {
            config.base_url.green()
        } else {
            format!("{} (offline)", config.base_url).yellow()
        }
    );

    match cli.command {
        Command::List => {
            for task in engine.get_tasks(&session).await {
                print_task(&task);
            }
        }
        Command::Add {
            title,
            deadline,
            description,
            tags,
        } => {
            let mut data = TaskFormData::new(title, deadline);
            data.description = description;
            data.tags = tags;
            let task = engine.create_task(&session, data).await?;
            print_task(&task);
        }
        Command::Status { id, status } => {
            match engine
                .update_task(&session, &id, TaskUpdate::status(status))
                .await?
            {
                Some(task) => print_task(&task),
                None => println!("⏳ {} queued", id.yellow()),
            }
        }
        Command::Rm { id } => {
            engine.delete_task(&session, &id).await?;
            println!("🗑️  {}", id.red());
        }
        Command::Sync => {
            let report = engine.process_sync_queue(&session).await;
            println!(
                "✅ {} synced, {} skipped, {} refused, {} left",
                report.processed.to_string().green(),
                report.skipped,
                report.rejected,
                report.remaining.to_string().yellow()
            );
            if let Some(halted) = report.halted {
                println!("⚠️  {}", format!("{:?}", halted).yellow());
            }
        }
        Command::Pending => {
            for action in engine.pending_actions(&session).await? {
                println!(
                    "{:<7} {} {}",
                    action.kind().to_string().cyan(),
                    action.task_id(),
                    action.enqueued_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
                );
            }
        }
    }

    Ok(())
}

fn print_task(task: &Task) {
    let id = if is_local_id(&task.id) {
        task.id.yellow()
    } else {
        task.id.normal()
    };
    println!(
        "{} [{}] {} (due {}) {}",
        id,
        task.status.to_string().cyan(),
        task.title.bold(),
        task.deadline,
        task.tags.join(", ").dimmed()
    );
}
