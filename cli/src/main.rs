//! Crossing monitor terminal client
//!
//! ```sh
//! # Validate config (~/.config/crossing-monitor/config.toml)
//! crossing-monitor check
//!
//! # Sign in; the session is kept for later commands
//! crossing-monitor login ops@rail.cl
//!
//! # Stream alerts until Ctrl+C or the inactivity timeout.
//! # Every line typed on stdin counts as activity.
//! crossing-monitor watch
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crossing_monitor::domain::ChannelNotification;
use crossing_monitor::{
    default_config_path, init_tracing, ActivitySignal, AlertEvent, AppConfig, ClientHandle,
    ClientOptions, SessionEvent,
};

/// Terminal client for the railway crossing monitor.
#[derive(Parser, Debug)]
#[command(name = "crossing-monitor", version)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "MONITOR_CONFIG")]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate the configuration and exit.
    Check,
    /// Sign in and store the session.
    Login {
        email: String,
        /// Read from stdin when omitted.
        #[arg(long, env = "MONITOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// End the stored session.
    Logout,
    /// Show the signed-in user and what they may do.
    Whoami,
    /// Stream alerts and channel state changes.
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(url) = cli.api_url {
        config.api.base_url = url;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    init_tracing(&config);
    info!("Configuration loaded from {}", config_path.display());

    if let Command::Check = cli.command {
        println!("✅ Configuration is valid");
        println!("   Config file  : {}", config_path.display());
        println!("   API          : {}", config.api.base_url);
        println!("   Realtime     : {}{}", config.realtime_url(), config.realtime.path);
        println!("   Auto logout  : {} min", config.session.auto_logout_minutes);
        println!("   Log level    : {}", config.log_directive());
        return ExitCode::SUCCESS;
    }

    let handle = match ClientHandle::start(ClientOptions::new(config)).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.command {
        Command::Check => ExitCode::SUCCESS,
        Command::Login { email, password } => login(&handle, &email, password).await,
        Command::Logout => logout(&handle).await,
        Command::Whoami => whoami(&handle),
        Command::Watch => watch(&handle).await,
    };

    handle.shutdown().await;
    code
}

async fn login(handle: &ClientHandle, email: &str, password: Option<String>) -> ExitCode {
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            match lines.next_line().await {
                Ok(Some(line)) => line,
                _ => {
                    eprintln!("No password given");
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    match handle.session.login(email, &password).await {
        Ok(user) => {
            println!("Signed in as {} ({})", user.display_name(), user.role);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn logout(handle: &ClientHandle) -> ExitCode {
    if !handle.session.is_authenticated() {
        println!("Not signed in");
        return ExitCode::SUCCESS;
    }
    handle.session.logout().await;
    println!("Signed out");
    ExitCode::SUCCESS
}

fn whoami(handle: &ClientHandle) -> ExitCode {
    let Some(user) = handle.session.current_user() else {
        println!("Not signed in");
        return ExitCode::FAILURE;
    };

    println!("User   : {} <{}>", user.display_name(), user.email);
    println!("Role   : {}", user.role);
    let granted: Vec<&str> = handle
        .session
        .capabilities()
        .granted()
        .iter()
        .map(|c| c.name())
        .collect();
    println!("Grants : {}", granted.join(", "));
    let views: Vec<String> = handle
        .gate
        .visible_views()
        .iter()
        .map(|v| format!("{:?}", v).to_lowercase())
        .collect();
    println!("Views  : {}", views.join(", "));
    ExitCode::SUCCESS
}

async fn watch(handle: &ClientHandle) -> ExitCode {
    if !handle.session.is_authenticated() {
        eprintln!("Not signed in. Run `crossing-monitor login <email>` first.");
        return ExitCode::FAILURE;
    }

    handle.install_signal_handler();
    let shutdown = handle.shutdown_signal();
    let mut alerts = handle.channel.alerts();
    let mut states = handle.channel.notifications();
    let mut session_events = handle.session.events();

    let feed = handle.activity.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            feed.emit(ActivitySignal::KeyDown);
        }
    });

    println!(
        "👀 Watching alerts (auto logout after {} min idle, Ctrl+C to quit)",
        handle.config.session.auto_logout_minutes
    );

    loop {
        tokio::select! {
            Some(alert) = alerts.recv() => print_alert(&alert),
            Some(ChannelNotification::StateChanged { from, to, timestamp }) = states.recv() => {
                println!("[{}] channel {} -> {}", timestamp.format("%H:%M:%S"), from, to);
                if let Some(message) = handle.channel.error_message() {
                    println!("          {}", message);
                }
            }
            Some(event) = session_events.recv() => {
                if let SessionEvent::LoggedOut { reason } = event {
                    println!("Session ended ({})", reason);
                    return ExitCode::SUCCESS;
                }
            }
            _ = shutdown.wait() => return ExitCode::SUCCESS,
        }
    }
}

fn print_alert(alert: &AlertEvent) {
    match alert {
        AlertEvent::NewAlert(alert) => println!(
            "🚨 alert {} crossing {} [{}] {}",
            alert.id().unwrap_or_else(|| "?".into()),
            alert.crossing_id().unwrap_or_else(|| "?".into()),
            alert.severity().unwrap_or("-"),
            alert.message().unwrap_or(""),
        ),
        AlertEvent::AlertResolved(resolved) => println!("✅ alert {} resolved", resolved.alert_id),
    }
}
