use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use ctxlog::http::{generate_id, X_REQUEST_ID};
use ctxlog::logging::Level;

#[derive(Parser)]
#[command(name = "ctxlog-cli")]
#[command(about = "Management CLI for the ctxlog demo server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Path of the level endpoint
    #[arg(long, default_value = "/log/level")]
    level_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the server's current log level
    Level,
    /// Change the server's log level
    SetLevel {
        /// debug, info, warn, error, dpanic, panic or fatal
        level: Level,
    },
    /// Send a body to /echo and print the X-Request-ID the server used
    Echo {
        body: String,
        /// Send a fresh X-Request-ID instead of letting the server assign one
        #[arg(long)]
        with_id: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let level_url = format!("{}{}", cli.url, cli.level_path);

    match cli.command {
        Commands::Level => {
            let res = client.get(&level_url).send().await?;
            print_response(res).await?;
        }
        Commands::SetLevel { level } => {
            let res = client
                .put(&level_url)
                .json(&json!({ "level": level }))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Echo { body, with_id } => {
            let mut req = client.post(format!("{}/echo", cli.url)).body(body);
            if with_id {
                req = req.header(X_REQUEST_ID.as_str(), generate_id()?);
            }
            let res = req.send().await?;
            let id = res
                .headers()
                .get(X_REQUEST_ID.as_str())
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<none>")
                .to_string();
            println!("X-Request-ID: {}", id);
            println!("{}", res.text().await?);
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: server returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
