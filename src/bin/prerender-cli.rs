use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "prerender-cli")]
#[command(about = "Client for the prerender daemon", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:9009")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a page and print its HTML
    Render {
        source: String,
        /// Deadline across all attempts, in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Retries after the first failed attempt
        #[arg(long)]
        repeat: Option<u32>,
        /// Cache TTL in seconds (0 disables caching)
        #[arg(long)]
        cache: Option<i64>,
    },
    /// Drop one cached page, or the whole cache when no source is given
    Invalidate { source: Option<String> },
    /// Show daemon status
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let endpoint = format!("{}/prerender", cli.url.trim_end_matches('/'));

    match cli.command {
        Commands::Render {
            source,
            timeout,
            repeat,
            cache,
        } => {
            let mut query = vec![("source", source)];
            if let Some(timeout) = timeout {
                query.push(("timeout", timeout.to_string()));
            }
            if let Some(repeat) = repeat {
                query.push(("repeat", repeat.to_string()));
            }
            if let Some(cache) = cache {
                query.push(("cache", cache.to_string()));
            }

            let res = client.get(&endpoint).query(&query).send().await?;
            if let Some(status) = res.headers().get("x-cache-status") {
                eprintln!("x-cache-status: {}", status.to_str().unwrap_or("?"));
            }
            let res = check_status(res).await?;
            print!("{}", res.text().await?);
        }
        Commands::Invalidate { source } => {
            let body = json!({ "source": source.unwrap_or_default() });
            let res = client.delete(&endpoint).json(&body).send().await?;
            check_status(res).await?;
            eprintln!("Invalidated");
        }
        Commands::Status => {
            let res = client
                .get(format!("{}/status", cli.url.trim_end_matches('/')))
                .send()
                .await?;
            let json: Value = check_status(res).await?.json().await?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let text = res.text().await.unwrap_or_default();
    Err(format!("daemon returned {status}: {text}").into())
}
