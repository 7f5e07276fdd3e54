use std::path::PathBuf;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use taskclient::net::tasks::TaskClient;
use taskclient::net::types::{Id, SortOrder, TaskDraft, TaskFilter, TaskStatus};
use taskclient::{AppContext, AuthError, ClientConfig, ConfigError, Credentials, Registration};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Auth(#[from] AuthError),
    #[error("not logged in; run `taskclient login` first")]
    NotLoggedIn,
    #[error("this backend does not offer an external login URL")]
    NoOauthUrl,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "taskclient", about = "Task manager API client")]
struct Cli {
    /// Overrides TASKCLIENT_BASE_URL.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides TASKCLIENT_TOKEN_FILE.
    #[arg(long)]
    token_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login(LoginArgs),
    Logout,
    Whoami,
    Register {
        #[arg(long)]
        name: String,
        #[command(flatten)]
        login: LoginArgs,
    },
    Rename {
        name: String,
    },
    Passwd {
        #[arg(long, env = "TASKCLIENT_OLD_PASSWORD")]
        old: String,
        #[arg(long, env = "TASKCLIENT_NEW_PASSWORD")]
        new: String,
    },
    DeleteAccount,
    /// Print the URL that starts the Google login flow.
    GoogleUrl,
    Tasks(TasksCommand),
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "TASKCLIENT_PASSWORD")]
    password: String,
}

#[derive(Args, Debug)]
struct TasksCommand {
    #[command(subcommand)]
    command: TasksSubcommand,
}

#[derive(Subcommand, Debug)]
enum TasksSubcommand {
    List {
        #[arg(long, default_value_t = false)]
        expand_user: bool,
    },
    Show {
        id: String,
    },
    Add {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, help = "Due date, e.g. 2024-05-01T09:00:00")]
        due: Option<NaiveDateTime>,
    },
    Edit {
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<NaiveDateTime>,
    },
    Toggle {
        id: String,
    },
    Status {
        id: String,
        status: TaskStatus,
    },
    Delete {
        id: String,
    },
    Filter {
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(long)]
        before: Option<NaiveDateTime>,
        #[arg(long)]
        after: Option<NaiveDateTime>,
    },
    Sort {
        #[arg(default_value = "asc")]
        order: SortOrder,
    },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Users,
    DeleteUser { id: String },
    Tasks,
    DeleteTask { id: String },
    Reassign { task_id: String, user_id: String },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = ClientConfig::new(base_url)?.base_url;
    }
    if cli.token_file.is_some() {
        config.token_file = cli.token_file;
    }
    tracing::debug!(base_url = %config.base_url, "configuration loaded");

    let ctx = AppContext::from_config(config)?;
    ctx.session.initialize().await;

    match cli.command {
        Command::Login(args) => {
            let user = ctx.session.login(Credentials::new(args.email, args.password)).await?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Logout => {
            ctx.session.logout().await;
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            let user = ctx.session.user().ok_or(CliError::NotLoggedIn)?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Register { name, login } => {
            let registration = Registration { name, email: login.email, password: login.password };
            let user = ctx.session.register(registration).await?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Rename { name } => {
            require_login(&ctx)?;
            let user = ctx.session.update_name(&name).await?;
            print_json(&serde_json::to_value(user)?)
        }
        Command::Passwd { old, new } => {
            require_login(&ctx)?;
            ctx.session.change_password(&old, &new).await?;
            println!("password updated");
            Ok(())
        }
        Command::DeleteAccount => {
            require_login(&ctx)?;
            ctx.session.delete_account().await?;
            println!("account deleted");
            Ok(())
        }
        Command::GoogleUrl => {
            let url = ctx.session.google_login_url().ok_or(CliError::NoOauthUrl)?;
            println!("{url}");
            Ok(())
        }
        Command::Tasks(tasks) => {
            require_login(&ctx)?;
            run_tasks(&ctx.tasks(), tasks).await
        }
        Command::Admin(admin) => {
            require_login(&ctx)?;
            run_admin(&ctx.tasks(), admin).await
        }
    }
}

fn require_login(ctx: &AppContext) -> Result<(), CliError> {
    if ctx.session.is_authenticated() {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

async fn run_tasks(client: &TaskClient, tasks: TasksCommand) -> Result<(), CliError> {
    match tasks.command {
        TasksSubcommand::List { expand_user } => {
            let list = client.list(expand_user).await?;
            print_json(&serde_json::to_value(list)?)
        }
        TasksSubcommand::Show { id } => {
            let task = client.get(&Id::from(id)).await?;
            print_json(&serde_json::to_value(task)?)
        }
        TasksSubcommand::Add { title, description, due } => {
            let draft = TaskDraft { title, description, due_date: due, status: None };
            let task = client.create(&draft).await?;
            print_json(&serde_json::to_value(task)?)
        }
        TasksSubcommand::Edit { id, title, description, due } => {
            let draft = TaskDraft { title, description, due_date: due, status: None };
            let task = client.update(&Id::from(id), &draft).await?;
            print_json(&serde_json::to_value(task)?)
        }
        TasksSubcommand::Toggle { id } => {
            let current = client.get(&Id::from(id)).await?;
            let task = client.toggle_status(&current).await?;
            print_json(&serde_json::to_value(task)?)
        }
        TasksSubcommand::Status { id, status } => {
            let task = client.set_status(&Id::from(id), status).await?;
            print_json(&serde_json::to_value(task)?)
        }
        TasksSubcommand::Delete { id } => {
            client.delete(&Id::from(id)).await?;
            println!("deleted");
            Ok(())
        }
        TasksSubcommand::Filter { status, before, after } => {
            let filter = TaskFilter { status, due_date_before: before, due_date_after: after };
            let list = client.filter(&filter).await?;
            print_json(&serde_json::to_value(list)?)
        }
        TasksSubcommand::Sort { order } => {
            let list = client.sorted(order).await?;
            print_json(&serde_json::to_value(list)?)
        }
    }
}

async fn run_admin(client: &TaskClient, admin: AdminCommand) -> Result<(), CliError> {
    let admin_client = client.admin()?;
    match admin.command {
        AdminSubcommand::Users => {
            let users = admin_client.users().await?;
            print_json(&serde_json::to_value(users)?)
        }
        AdminSubcommand::DeleteUser { id } => {
            admin_client.delete_user(&Id::from(id)).await?;
            println!("deleted");
            Ok(())
        }
        AdminSubcommand::Tasks => {
            let tasks = admin_client.tasks().await?;
            print_json(&serde_json::to_value(tasks)?)
        }
        AdminSubcommand::DeleteTask { id } => {
            admin_client.delete_task(&Id::from(id)).await?;
            println!("deleted");
            Ok(())
        }
        AdminSubcommand::Reassign { task_id, user_id } => {
            let task = admin_client.reassign_task(&Id::from(task_id), &Id::from(user_id)).await?;
            print_json(&serde_json::to_value(task)?)
        }
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
