use clap::{Parser, Subcommand, ValueEnum};
use coursemsg::config::Labels;
use coursemsg::widget::InitArgs;
use coursemsg::widget::controller::{Controller, ToggleError};
use coursemsg::widget::page::PageModel;
use coursemsg::widget::transport::{HttpTransport, Transport, TransportError};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set COURSEMSG_SESSION_TOKEN")]
    MissingSessionToken,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    HealthCheck(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Toggle(#[from] ToggleError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "coursemsg-cli", about = "Course messaging toggle CLI")]
struct Cli {
    #[arg(long, env = "COURSEMSG_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "COURSEMSG_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the server is up.
    Ping,
    /// Show whether messaging is enabled for a course.
    Status { course_id: i64 },
    /// Store an explicit state for a course.
    Set { course_id: i64, state: Switch },
    /// Flip the current state, the way the block button does.
    Toggle { course_id: i64 },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Ping => run_ping(&cli.base_url).await,
        Command::Status { course_id } => {
            let transport = transport(&cli.base_url, cli.session_token)?;
            let flag = transport.fetch_state(course_id).await?;
            print_json(&serde_json::json!({ "course_id": flag.course_id, "enabled": flag.enabled }))
        }
        Command::Set { course_id, state } => {
            let transport = transport(&cli.base_url, cli.session_token)?;
            let enabled = matches!(state, Switch::On);
            transport.set_state(course_id, enabled).await?;
            print_json(&serde_json::json!({ "course_id": course_id, "enabled": enabled }))
        }
        Command::Toggle { course_id } => {
            let transport = transport(&cli.base_url, cli.session_token)?;
            let current = transport.fetch_state(course_id).await?;
            let args = InitArgs::for_course(&cli.base_url, course_id, current.enabled);
            let mut controller = Controller::new(args, Labels::default(), transport);
            let enabled = controller.toggle(&mut PageModel::default()).await?;
            print_json(&serde_json::json!({ "course_id": course_id, "enabled": enabled }))
        }
    }
}

fn transport(base_url: &str, session_token: Option<String>) -> Result<HttpTransport, CliError> {
    let token = session_token
        .filter(|token| !token.is_empty())
        .ok_or(CliError::MissingSessionToken)?;
    Ok(HttpTransport::new(base_url).with_session_token(token))
}

async fn run_ping(base_url: &str) -> Result<(), CliError> {
    let url = format!("{}/healthz", base_url.trim_end_matches('/'));
    let response = reqwest::Client::new().get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::HealthCheck(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
