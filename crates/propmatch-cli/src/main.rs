//! PropMatch CLI - sign in, inspect the session, and check route access
//! against the PropMatch identity service from a terminal.

mod app;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use propmatch_core::Role;

/// Directory for daily-rolling log files, when set
const LOG_DIR_ENV: &str = "PROPMATCH_LOG_DIR";

const USAGE: &str = "\
Usage: propmatch <command> [args]

Commands:
  login [email]                 Sign in and store the credential
  signup <name> <email> <role>  Create an account (role: client | developer | admin)
  whoami                        Resolve and show the current session
  logout                        Sign out and forget the credential
  verify <code>                 Confirm your email address
  resend-verification           Send a new verification code
  forgot-password <email>       Request a password reset link
  open <route>...               Show how each route would be handled";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer on drop and must be held for
/// the life of the program.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "propmatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    info!(command = %command, "PropMatch CLI starting");
    let mut app = App::new()?;

    match (command.as_str(), &args[1..]) {
        ("login", [email]) => app.login(Some(email.clone())).await,
        ("login", []) => app.login(None).await,
        ("signup", [name, email, role]) => {
            let role: Role = role.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            app.signup(name.clone(), email.clone(), role).await
        }
        ("whoami", []) => app.whoami().await,
        ("logout", []) => app.logout().await,
        ("verify", [code]) => app.verify(code).await,
        ("resend-verification", []) => app.resend_verification().await,
        ("forgot-password", [email]) => app.forgot_password(email).await,
        ("open", routes) if !routes.is_empty() => app.open(routes).await,
        _ => {
            eprintln!("{}", USAGE);
            anyhow::bail!("Unrecognized command: {}", args.join(" "))
        }
    }
}
