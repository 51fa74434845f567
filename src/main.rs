use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use postecho::config::{DEFAULT_HOST, DEFAULT_PORT};
use postecho::{BodyFormat, EchoListener, ListenerConfig, PostClient};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Sample body posted by `send` when no data is given, shaped like the
/// voltage telemetry devices push at this listener
const SAMPLE_TELEMETRY: &str = r#"{"nodeId":"","level":"info","Voltage_min":0.000000,"Voltage_max":0.000000,"Voltage_avg":0.000000,"Voltage_sd":0.000000}"#;

#[derive(Parser)]
#[command(name = "postecho", version)]
#[command(about = "Print POSTed request bodies to the console", long_about = None)]
struct Cli {
    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the listener (the default)
    Serve(ServeArgs),
    /// POST a body to a running listener and print the reply
    Send(SendArgs),
}

#[derive(Args)]
struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "POSTECHO_HOST", default_value_t = DEFAULT_HOST)]
    host: std::net::IpAddr,

    /// Port to bind to
    #[arg(short, long, env = "POSTECHO_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// How POST bodies are printed: raw or json
    #[arg(short, long, env = "POSTECHO_FORMAT", default_value_t = BodyFormat::Json)]
    format: BodyFormat,

    /// Maximum number of connections handled at once
    #[arg(long, env = "POSTECHO_MAX_CONNECTIONS")]
    max_connections: Option<usize>,

    /// Largest accepted Content-Length in bytes
    #[arg(long, env = "POSTECHO_MAX_BODY_SIZE")]
    max_body_size: Option<usize>,

    /// Seconds to wait for a complete request; waits forever when unset
    #[arg(long, env = "POSTECHO_READ_TIMEOUT")]
    read_timeout: Option<u64>,
}

impl ServeArgs {
    fn into_config(self) -> ListenerConfig {
        let defaults = ListenerConfig::default();
        ListenerConfig {
            bind_addr: SocketAddr::new(self.host, self.port),
            body_format: self.format,
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            max_body_size: self.max_body_size.unwrap_or(defaults.max_body_size),
            read_timeout: self.read_timeout.map(Duration::from_secs),
            ..defaults
        }
    }
}

#[derive(Args)]
struct SendArgs {
    /// Listener URL
    #[arg(short, long, default_value = "http://127.0.0.1:8000/")]
    url: url::Url,

    /// Body to send
    #[arg(short, long, conflicts_with = "file")]
    data: Option<String>,

    /// File whose contents are sent as the body
    #[arg(long)]
    file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Logs go to stderr, stdout is reserved for POST data
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("postecho=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Command::Send(args)) => send(args).await,
        Some(Command::Serve(args)) => serve(args).await,
        None => serve(cli.serve).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = args.into_config();

    info!(
        address = %config.bind_addr,
        format = %config.body_format,
        max_connections = config.max_connections,
        "Starting echo listener"
    );

    let listener = EchoListener::bind(config)
        .await
        .wrap_err("Failed to start echo listener")?;
    listener.run().await.wrap_err("Echo listener failed")?;
    Ok(())
}

async fn send(args: SendArgs) -> Result<()> {
    let body = match (&args.data, &args.file) {
        (Some(data), _) => data.clone().into_bytes(),
        (None, Some(path)) => tokio::fs::read(path)
            .await
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?,
        (None, None) => SAMPLE_TELEMETRY.as_bytes().to_vec(),
    };

    let host = args
        .url
        .host_str()
        .ok_or_else(|| eyre!("URL {} has no host", args.url))?;
    let port = args
        .url
        .port_or_known_default()
        .ok_or_else(|| eyre!("URL {} has no port", args.url))?;
    let addr = tokio::net::lookup_host((host, port))
        .await
        .wrap_err_with(|| format!("Failed to resolve {host}"))?
        .next()
        .ok_or_else(|| eyre!("{host} did not resolve to any address"))?;

    let path = match args.url.query() {
        Some(query) => format!("{}?{}", args.url.path(), query),
        None => args.url.path().to_string(),
    };

    let client = PostClient::new(addr).with_host(format!("{host}:{port}"));
    let response = client
        .post(&path, &body)
        .await
        .wrap_err_with(|| format!("POST to {} failed", args.url))?;

    println!("{}", response.status);
    println!("{}", response.body_text());
    Ok(())
}
