use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand};
use tikit_client::{
    state::CategoryFilter, CheckinContext, ScanOutcome, ScanSession, Services,
};

use crate::{config::GlobalArgs, output};

#[derive(Debug, Parser)]
#[command(name = "tikit", author, version, about = "Tikit check-in client", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Sign in with email and password")]
    Login {
        #[arg(long, required = true)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    #[command(about = "Forget the stored session")]
    Logout,
    #[command(about = "Show the signed-in user")]
    Whoami,
    #[command(subcommand, about = "Temporary session from a session code")]
    Session(SessionCommand),
    #[command(about = "Register one guest check-in", alias = "ci")]
    Checkin {
        #[command(flatten)]
        target: TargetArgs,
        /// Scanned guest payload; read from stdin when omitted
        payload: Option<String>,
    },
    #[command(about = "List the latest check-ins of a session", alias = "ls")]
    Checkins {
        #[command(flatten)]
        target: TargetArgs,
        /// Show the local cache without calling the API
        #[arg(long)]
        cached: bool,
    },
    #[command(subcommand, about = "Ticket categories accepted per session")]
    Filter(FilterCommand),
    #[command(about = "List events")]
    Events {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    #[command(about = "Validate a session code and start a temporary session")]
    Start {
        #[arg(required = true)]
        code: String,
    },
    #[command(about = "Show the active temporary session")]
    Show,
    #[command(about = "Reload session data without extending expiry")]
    Refresh,
    #[command(about = "End the temporary session")]
    End,
}

#[derive(Debug, Subcommand)]
pub enum FilterCommand {
    Show {
        #[arg(long)]
        session: Option<i64>,
    },
    Set {
        #[arg(long)]
        session: Option<i64>,
        #[arg(long, value_delimiter = ',', conflicts_with = "all", required_unless_present = "all")]
        ids: Vec<i64>,
        #[arg(long)]
        all: bool,
    },
}

/// Explicit event session for the signed-in user. When absent the active
/// temporary session is used.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct TargetArgs {
    #[arg(long, requires = "session")]
    pub event: Option<i64>,
    #[arg(long, requires = "event")]
    pub session: Option<i64>,
}

pub async fn run(command: Command, services: &Services) -> anyhow::Result<()> {
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Contraseña: ")?,
            };
            let profile = services.auth.login(&email, &password).await.map_err(|err| {
                match err.field_errors() {
                    Some(fields) => anyhow!(
                        "{}",
                        fields
                            .iter()
                            .map(|(field, message)| format!("{}: {}", field, message))
                            .collect::<Vec<_>>()
                            .join("; ")
                    ),
                    None => anyhow!(err),
                }
            })?;
            match profile {
                Some(profile) => println!("Sesión iniciada como {}", output::profile(&profile)),
                None => println!("Sesión iniciada (perfil no disponible)"),
            }
        }
        Command::Logout => {
            services.auth.logout();
            println!("Sesión cerrada");
        }
        Command::Whoami => {
            services.auth.restore().await;
            match services.auth.current_user() {
                Some(profile) if services.auth.is_logged_in() => {
                    println!("{}", output::profile(&profile))
                }
                _ if services.auth.is_logged_in() => println!("Sesión activa (perfil no disponible)"),
                _ => println!("Sin sesión"),
            }
        }
        Command::Session(command) => run_session(command, services).await?,
        Command::Checkin { target, payload } => {
            let context = resolve_context(services, target).await?;
            let payload = match payload {
                Some(payload) => payload,
                None => match scan_from_stdin().await {
                    ScanOutcome::Scanned(text) => text,
                    ScanOutcome::Cancelled => {
                        println!("Escaneo cancelado");
                        return Ok(());
                    }
                },
            };
            let filter = services.category_filters.load(context.session_id)?;
            let record = services
                .checkins
                .register_checkin(&context, &payload, &filter)
                .await?;
            println!("Check-in registrado: {}", output::checkin(&record));
        }
        Command::Checkins { target, cached } => {
            let context = resolve_context(services, target).await?;
            let records = if cached {
                services.checkins.cached_checkins(&context)
            } else {
                services.checkins.list_checkins(&context).await
            };
            if records.is_empty() {
                println!("Sin check-ins");
            }
            for record in &records {
                println!("{}", output::checkin(record));
            }
        }
        Command::Filter(command) => run_filter(command, services)?,
        Command::Events { page } => {
            require_user(services).await?;
            let events = services.checkins.list_events(page).await?;
            for event in &events.data {
                println!("{}", output::event(event));
            }
            println!(
                "Página {}/{} ({} eventos)",
                events.pagination.current_page,
                events.pagination.total_pages,
                events.pagination.total_items
            );
        }
    }
    Ok(())
}

async fn run_session(command: SessionCommand, services: &Services) -> anyhow::Result<()> {
    let now = services.temporary_sessions.now();
    match command {
        SessionCommand::Start { code } => {
            let grant = services.auth.validate_session_code(&code).await?;
            println!("{}", output::grant(&grant, now));
        }
        SessionCommand::Show => match services.auth.temporary_session()? {
            Some(grant) => println!("{}", output::grant(&grant, now)),
            None => println!("Sin sesión temporal activa"),
        },
        SessionCommand::Refresh => match services.auth.refresh_temporary_session().await {
            Some(grant) => println!("{}", output::grant(&grant, now)),
            None => println!("No se pudo actualizar la sesión temporal"),
        },
        SessionCommand::End => {
            services.auth.end_temporary_session()?;
            println!("Sesión temporal finalizada");
        }
    }
    Ok(())
}

fn run_filter(command: FilterCommand, services: &Services) -> anyhow::Result<()> {
    match command {
        FilterCommand::Show { session } => {
            let session_id = resolve_session_id(services, session)?;
            let filter = services.category_filters.load(session_id)?;
            println!("{}", output::filter(session_id, &filter));
        }
        FilterCommand::Set { session, ids, all } => {
            let session_id = resolve_session_id(services, session)?;
            let filter = if all {
                CategoryFilter::all()
            } else {
                CategoryFilter::only(ids)
            };
            services.category_filters.save(session_id, &filter)?;
            println!("{}", output::filter(session_id, &filter));
        }
    }
    Ok(())
}

async fn require_user(services: &Services) -> anyhow::Result<()> {
    if services.auth.is_logged_in() || services.auth.restore().await {
        Ok(())
    } else {
        bail!("No hay sesión iniciada. Ejecuta `tikit login` primero.")
    }
}

async fn resolve_context(services: &Services, target: TargetArgs) -> anyhow::Result<CheckinContext> {
    match (target.event, target.session) {
        (Some(event_id), Some(session_id)) => {
            require_user(services).await?;
            Ok(CheckinContext::user(event_id, session_id))
        }
        _ => match services.auth.temporary_session()? {
            Some(grant) => Ok(CheckinContext::temporary(&grant)),
            None => bail!("Indica --event y --session o inicia una sesión temporal"),
        },
    }
}

fn resolve_session_id(services: &Services, session: Option<i64>) -> anyhow::Result<i64> {
    if let Some(session_id) = session {
        return Ok(session_id);
    }
    services
        .auth
        .temporary_session()?
        .map(|grant| grant.session_id)
        .ok_or_else(|| anyhow!("Indica --session o inicia una sesión temporal"))
}

/// Reads one scanned line from stdin. EOF or an empty line cancels.
async fn scan_from_stdin() -> ScanOutcome {
    let (session, receiver) = ScanSession::new();
    tokio::task::spawn_blocking(move || {
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => session.on_cancelled(),
            Ok(_) => {
                let text = line.trim_end_matches(['\r', '\n']);
                if text.is_empty() {
                    session.on_cancelled()
                } else {
                    session.on_code_scanned(text)
                }
            }
        }
    });
    receiver.outcome().await
}

fn prompt(label: &str) -> anyhow::Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
