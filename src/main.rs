use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;

use tracing::info;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use podcast_gateway::{
    ServerConfig, VolcengineTts, core::dialogue::parse_dialogue_script, routes, state::AppState,
};

/// Podcast gateway - Volcengine TTS synthesis server and CLI
#[derive(Parser, Debug)]
#[command(name = "podcast-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server
    Serve,

    /// Synthesize a text and write the audio to a file
    Speak {
        /// Text to synthesize
        text: String,

        /// Output file
        #[arg(short = 'o', long = "output", default_value = "output.mp3")]
        output: PathBuf,

        /// Voice type (defaults to the configured voice)
        #[arg(long = "voice")]
        voice: Option<String>,

        /// Speed ratio (0.2-3.0)
        #[arg(long = "speed")]
        speed: Option<f32>,
    },

    /// Synthesize a two-host dialogue script (`主持人A:` / `主持人B:` lines)
    Dialogue {
        /// Script file
        script: PathBuf,

        /// Output file
        #[arg(short = 'o', long = "output", default_value = "dialogue.mp3")]
        output: PathBuf,
    },

    /// Check credentials and connectivity with a short synthesis
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Speak {
            text,
            output,
            voice,
            speed,
        } => speak(config, &text, output, voice, speed).await,
        Commands::Dialogue { script, output } => dialogue(config, script, output).await,
        Commands::Check => check(config).await,
    }
}

fn provider(config: &ServerConfig) -> anyhow::Result<VolcengineTts> {
    let tts_config = config.tts_config()?;
    Ok(VolcengineTts::new(tts_config)?)
}

async fn speak(
    config: ServerConfig,
    text: &str,
    output: PathBuf,
    voice: Option<String>,
    speed: Option<f32>,
) -> anyhow::Result<()> {
    let tts = provider(&config)?;

    let mut params = config.default_voice();
    if let Some(voice) = voice {
        params.voice_type = voice;
    }
    if let Some(speed) = speed {
        params.speed_ratio = speed;
    }
    params.validate()?;

    let started = Instant::now();
    let audio = tts.synthesize(text, &params).await?;
    tokio::fs::write(&output, &audio)
        .await
        .map_err(|e| anyhow!("Failed to write to {}: {}", output.display(), e))?;

    println!(
        "Wrote {} bytes to {} in {:.2?}",
        audio.len(),
        output.display(),
        started.elapsed()
    );
    Ok(())
}

async fn dialogue(config: ServerConfig, script: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let tts = provider(&config)?;

    let content = tokio::fs::read_to_string(&script)
        .await
        .map_err(|e| anyhow!("Failed to read {}: {}", script.display(), e))?;
    let segments = parse_dialogue_script(&content);
    if segments.is_empty() {
        anyhow::bail!(
            "No 主持人A / 主持人B lines found in {}",
            script.display()
        );
    }
    println!("Parsed {} dialogue segments", segments.len());

    let started = Instant::now();
    let audio = tts
        .synthesize_sequence(&segments, &config.dialogue_voices())
        .await?;
    tokio::fs::write(&output, &audio)
        .await
        .map_err(|e| anyhow!("Failed to write to {}: {}", output.display(), e))?;

    println!(
        "Wrote {} bytes ({} segments) to {} in {:.2?}",
        audio.len(),
        segments.len(),
        output.display(),
        started.elapsed()
    );
    Ok(())
}

async fn check(config: ServerConfig) -> anyhow::Result<()> {
    let tts = provider(&config)?;
    let result = tts.check_connection(&config.default_voice()).await?;
    println!(
        "Connection OK: received {} bytes of test audio",
        result.audio_bytes
    );
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let address = config.address();
    let rate_limit_rps = config.rate_limit_requests_per_second;
    let rate_limit_burst = config.rate_limit_burst_size;
    let cors_origins = config.cors_allowed_origins.clone();
    println!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config)?;

    // Per-client rate limiting
    let governor_config = GovernorConfigBuilder::default()
        .per_second(rate_limit_rps as u64)
        .burst_size(rate_limit_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;

    // Configure CORS
    let cors_layer = if let Some(ref origins) = cors_origins {
        if origins == "*" {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(false)
        } else {
            // Parse comma-separated origins
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
    } else {
        info!(
            "CORS not configured, defaulting to same-origin only. \
             Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
        );
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(false)
    };

    // Security headers
    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    let app = routes::api::create_app_router()
        .with_state(app_state)
        .layer(cors_layer)
        .layer(GovernorLayer::new(governor_config))
        .layer(security_headers);

    // Parse socket address
    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    println!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
