mod config;
mod realtime_adapter;

use crate::config::Config;
use crate::realtime_adapter::RealtimeProvider;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use clap::{Parser, Subcommand};
use medvoice_core::Notice;
use medvoice_core::call_session::CallSession;
use medvoice_core::channel_event::ChannelEvent;
use medvoice_core::gateway::{HttpSessionGateway, SessionGateway};
use medvoice_core::report::{ReportView, time_ago};
use medvoice_core::session::{DoctorAgent, NewSession};
use medvoice_core::voice_channel::VoiceChannelProvider;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Voice consultations with an AI medical agent")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a consultation with a doctor persona
    New {
        /// The doctor's specialization, e.g. "General Physician"
        #[arg(long)]
        specialist: String,
        /// What the patient wants to talk about
        #[arg(long, default_value = "")]
        notes: String,
        #[arg(long, default_value_t = 1)]
        doctor_id: u32,
        /// System prompt for the doctor persona
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        voice: Option<String>,
    },
    /// Run the voice call of a consultation
    Call { session_id: String },
    /// Print the stored report of a consultation
    Report { session_id: String },
    /// List your consultations
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let cli = Cli::parse();

    let mut gateway = HttpSessionGateway::new(&config.api_url);
    if let Some(email) = &config.user_email {
        gateway = gateway.with_user_email(email);
    }
    tracing::debug!("using session store at {}", config.api_url);

    match cli.command {
        Command::New {
            specialist,
            notes,
            doctor_id,
            prompt,
            voice,
        } => {
            let doctor = DoctorAgent {
                id: doctor_id,
                specialist,
                description: String::new(),
                image: String::new(),
                agent_prompt: prompt,
                voice_id: voice,
            };
            create(&gateway, notes, doctor).await
        }
        Command::Call { session_id } => call(config, gateway, &session_id).await,
        Command::Report { session_id } => report(&gateway, &session_id).await,
        Command::List => list(&gateway).await,
    }
}

async fn create(gateway: &impl SessionGateway, notes: String, doctor: DoctorAgent) -> Result<()> {
    let detail = gateway
        .create_session(NewSession {
            notes,
            selected_doctor: doctor,
        })
        .await
        .context("Failed to create session")?;
    println!("Created session {}", detail.session_id);
    println!("Start the call with: medvoice-agent call {}", detail.session_id);
    Ok(())
}

async fn call(mut config: Config, gateway: HttpSessionGateway, session_id: &str) -> Result<()> {
    let (api_key, assistant_id) = config.take_voice_credentials()?;
    let mut provider = RealtimeProvider::new(api_key, &assistant_id);
    if let Some(base_url) = &config.voice_base_url {
        provider = provider.with_base_url(base_url);
    }

    // Notices are rendered by their own task so the session never blocks on stdout.
    let (notice_tx, mut notice_rx) = tokio::sync::mpsc::channel::<Notice>(32);
    let printer = tokio::spawn(async move {
        while let Some(notice) = notice_rx.recv().await {
            match notice {
                Notice::Success(message) => println!("[ok] {}", message),
                Notice::Error(message) => eprintln!("[error] {}", message),
            }
        }
    });

    let mut session = CallSession::new(session_id, provider, gateway, notice_tx);
    if let Some(timeout) = config.report_timeout {
        session = session.with_report_timeout(timeout);
    }

    let result = drive(&mut session).await;

    // Dropping the session closes the notice channel so the printer drains and exits.
    drop(session);
    if let Err(e) = printer.await {
        tracing::warn!("notice printer failed: {}", e);
    }
    result
}

/// Runs one call to completion: events from the channel and the user's
/// `end` command (or Ctrl-C) are handled one at a time by a single loop.
async fn drive<P, G>(session: &mut CallSession<P, G>) -> Result<()>
where
    P: VoiceChannelProvider,
    G: SessionGateway,
{
    let doctor = session
        .load_session()
        .await
        .map(|detail| detail.selected_doctor.clone());
    let Some(doctor) = doctor else {
        return Err(anyhow!("session {} is not available", session.session_id()));
    };

    println!("Consulting the {}. Connecting...", doctor.specialist);
    session
        .start_call(&doctor)
        .await
        .context("Failed to start the call")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let report = loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => {
                    render(&event);
                    let remote_hangup = event == ChannelEvent::CallEnded;
                    session.handle_event(event);
                    if remote_hangup {
                        break session.end_call().await;
                    }
                }
                None => {
                    tracing::info!("voice channel closed");
                    break session.end_call().await;
                }
            },
            line = lines.next_line() => match line {
                Ok(Some(line)) if line.trim().eq_ignore_ascii_case("end") => {
                    break session.end_call().await;
                }
                Ok(Some(_)) => println!("Type `end` and press Enter to finish the call."),
                Ok(None) => break session.end_call().await,
                Err(e) => {
                    tracing::warn!("failed to read stdin: {}", e);
                    break session.end_call().await;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break session.end_call().await;
            }
        }
    };

    match (report, session.session_detail().cloned()) {
        (Some(report), Some(mut detail)) => {
            detail.report = Some(report);
            println!();
            println!("{}", ReportView::new(&detail, Utc::now()));
        }
        _ => println!("No report was generated."),
    }
    Ok(())
}

fn render(event: &ChannelEvent) {
    match event {
        ChannelEvent::CallStarted => {
            println!("Connected. Type `end` and press Enter to finish the call.")
        }
        ChannelEvent::CallEnded => println!("The call was ended."),
        ChannelEvent::PartialTranscript { role, text } => {
            print!("\r\x1b[2K{}: {}", role, text);
            if let Err(e) = std::io::stdout().flush() {
                tracing::debug!("failed to flush stdout: {}", e);
            }
        }
        ChannelEvent::FinalTranscript { role, text } => println!("\r\x1b[2K{}: {}", role, text),
        ChannelEvent::SpeechStarted | ChannelEvent::SpeechEnded => {}
    }
}

async fn report(gateway: &impl SessionGateway, session_id: &str) -> Result<()> {
    let detail = gateway
        .fetch_session(session_id)
        .await
        .context("Failed to fetch session")?
        .ok_or_else(|| anyhow!("session {} not found", session_id))?;
    println!("{}", ReportView::new(&detail, Utc::now()));
    Ok(())
}

async fn list(gateway: &impl SessionGateway) -> Result<()> {
    let sessions = gateway
        .list_sessions()
        .await
        .context("Failed to list sessions")?;
    if sessions.is_empty() {
        println!("No consultations yet.");
        return Ok(());
    }

    let now = Utc::now();
    for session in &sessions {
        println!(
            "{}  {:<24} {:<18} {}",
            session.session_id,
            session.selected_doctor.specialist,
            time_ago(session.created_on, now),
            if session.report.is_some() {
                "report ready"
            } else {
                "no report"
            }
        );
    }
    Ok(())
}
