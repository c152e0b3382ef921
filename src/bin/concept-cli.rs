use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderValue, COOKIE, SET_COOKIE};
use reqwest::Method;
use serde_json::{Map, Value};

use concept_server::dispatch::binder::unflatten;

#[derive(Parser)]
#[command(name = "concept-cli")]
#[command(about = "Call concept-server routes from the command line", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// File holding the session cookie between invocations.
    #[arg(short, long, default_value = ".concept-cli-session")]
    cookie_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call one route, e.g. `call PATCH /api/posts/:id id=... content=hi options.backgroundColor=red`
    Call {
        method: String,
        endpoint: String,
        /// `name=text` or `name:=json`; `:name` placeholders in the endpoint are filled first
        fields: Vec<String>,
    },
    /// List the server's routes
    Routes {
        #[arg(short, long, default_value = "/api")]
        prefix: String,
    },
    /// Forget the stored session cookie
    Forget,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Call {
            method,
            endpoint,
            fields,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
            let fields = parse_fields(&fields)?;
            let (path, fields) = fill_path(&endpoint, fields);
            let fields = unflatten(fields)?;

            let mut request = client.request(method.clone(), format!("{}{}", cli.url, path));
            if method == Method::GET {
                let query: Vec<(String, String)> = fields
                    .into_iter()
                    .map(|(k, v)| (k, as_text(v)))
                    .collect();
                request = request.query(&query);
            } else {
                request = request.json(&Value::Object(fields));
            }
            if let Some(cookie) = read_cookie(&cli.cookie_file) {
                request = request.header(COOKIE, HeaderValue::from_str(&cookie)?);
            }

            let res = request.send().await?;
            if let Some(cookie) = res.headers().get(SET_COOKIE).and_then(|v| v.to_str().ok()) {
                if let Some(pair) = cookie.split(';').next() {
                    fs::write(&cli.cookie_file, pair)?;
                }
            }
            print_response(res).await?;
        }
        Commands::Routes { prefix } => {
            let res = client.get(format!("{}{}/routes", cli.url, prefix)).send().await?;
            let routes: Value = res.error_for_status()?.json().await?;
            for route in routes.as_array().into_iter().flatten() {
                let params: Vec<String> = route["params"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .map(|p| {
                        let optional = if p["required"] == Value::Bool(true) { "" } else { "?" };
                        format!("{}{} ({})", p["name"].as_str().unwrap_or(""), optional, p["source"].as_str().unwrap_or(""))
                    })
                    .collect();
                println!(
                    "{:<7} {:<40} {}",
                    route["method"].as_str().unwrap_or(""),
                    route["pattern"].as_str().unwrap_or(""),
                    params.join(", ")
                );
            }
        }
        Commands::Forget => {
            if cli.cookie_file.exists() {
                fs::remove_file(&cli.cookie_file)?;
            }
            println!("Session forgotten");
        }
    }

    Ok(())
}

/// Parse `name=text` and `name:=json` arguments. Empty values are dropped.
fn parse_fields(args: &[String]) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let mut fields = Map::new();
    for arg in args {
        if let Some((name, raw)) = arg.split_once(":=") {
            if !raw.is_empty() {
                let value: Value = serde_json::from_str(raw)
                    .map_err(|e| format!("field `{name}` is not valid JSON: {e}"))?;
                fields.insert(name.to_string(), value);
            }
        } else if let Some((name, value)) = arg.split_once('=') {
            if !value.is_empty() {
                fields.insert(name.to_string(), Value::String(value.to_string()));
            }
        } else {
            return Err(format!("expected name=value or name:=json, got `{arg}`").into());
        }
    }
    Ok(fields)
}

/// Substitute `:name` segments from the fields, consuming the fields used.
fn fill_path(endpoint: &str, mut fields: Map<String, Value>) -> (String, Map<String, Value>) {
    let path = endpoint
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => match fields.remove(name) {
                Some(value) => as_text(value),
                None => segment.to_string(),
            },
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");
    (path, fields)
}

fn as_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn read_cookie(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    println!("{status}");

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
