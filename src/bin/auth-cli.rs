use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "auth-cli")]
#[command(about = "Management CLI for the hireme-auth credential service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },
    /// Check a user's credentials
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Look up a user by id
    User { id: String },
    /// Show tier chain, breaker and pool status
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Register { email, password, name } => {
            client
                .post(format!("{}/api/auth/register", base))
                .json(&json!({ "email": email, "password": password, "name": name }))
                .send()
                .await?
        }
        Commands::Login { email, password } => {
            client
                .post(format!("{}/api/auth/login", base))
                .json(&json!({ "email": email, "password": password }))
                .send()
                .await?
        }
        Commands::User { id } => client.get(format!("{}/api/users/{}", base, id)).send().await?,
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = serde_json::from_str::<Value>(&text)
        .map(|json| serde_json::to_string_pretty(&json))
        .unwrap_or_else(|_| Ok(text))?;

    if status.is_success() {
        println!("{}", body);
    } else {
        eprintln!("Error: service returned status {}", status);
        eprintln!("{}", body);
        std::process::exit(1);
    }
    Ok(())
}
