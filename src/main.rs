use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use voice_signup::kernel::event::{Event, KeyboardAction};
use voice_signup::kernel::time::SystemClock;
use voice_signup::nlu::Field;
use voice_signup::outputs::{ConsoleCapture, ConsoleSynthesizer, ListeningFlag, ScriptedCapture};
use voice_signup::services::{
    IdentityToolkitClient, InMemoryListingStore, InMemoryRegistry, ListingStore, NewListing,
    RegistrationService,
};
use voice_signup::speech::SpeechCapture;
use voice_signup::{
    session_channel, SessionHandle, SessionIo, SignupConfig, SignupSession, UiUpdate,
};

const DEMO_SCRIPT: [&str; 4] = [
    "이름은 김철수이고 이메일은 kim@test.com 입니다",
    "비밀번호는 123456",
    "공 일 공 일 이 삼 사 오 육 칠 팔",
    "네",
];

const HELP: &str = "commands: /kbd /voice /set <field> <value> /next /confirm /cancel /resume \
                    /sell <price> <title> /list /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let mut demo = false;
    let mut config_path = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--demo" => demo = true,
            other => config_path = Some(PathBuf::from(other)),
        }
    }

    let config = SignupConfig::load(config_path.as_deref()).context("loading config")?;
    let registry: Arc<dyn RegistrationService> = if config.identity.api_key.is_some() {
        Arc::new(IdentityToolkitClient::new(&config.identity)?)
    } else {
        tracing::info!("no identity key configured; accounts are kept in memory");
        Arc::new(InMemoryRegistry::new())
    };
    let listings = InMemoryListingStore::new();

    let (handle, inbox) = session_channel(64);
    let (capture, listening): (Box<dyn SpeechCapture>, Option<ListeningFlag>) = if demo {
        let scripted = ScriptedCapture::saying(handle.clone(), DEMO_SCRIPT);
        (Box::new(scripted) as Box<dyn SpeechCapture>, None)
    } else {
        let (capture, flag) = ConsoleCapture::new();
        (Box::new(capture) as Box<dyn SpeechCapture>, Some(flag))
    };

    let (ui_tx, mut ui_rx) = mpsc::unbounded_channel();
    let session = SignupSession::new(
        &config,
        inbox,
        SessionIo {
            capture,
            synthesizer: Arc::new(ConsoleSynthesizer::quiet()),
            registry,
            clock: Arc::new(SystemClock::new()),
        },
    )
    .with_ui(ui_tx);

    tokio::spawn(async move {
        while let Some(update) = ui_rx.recv().await {
            match update {
                UiUpdate::Display { stage, message } => println!("[{stage}] {message}"),
                UiUpdate::Transcript { text, is_final: true } => println!("  > {text}"),
                UiUpdate::Transcript { .. } => {}
                UiUpdate::Ended(status) => println!("-- {status:?} --"),
            }
        }
    });

    println!("{HELP}");
    let mut running = tokio::spawn(session.run());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let outcome = loop {
        tokio::select! {
            outcome = &mut running => break outcome?,
            line = lines.next_line() => {
                let Some(line) = line? else {
                    handle.shutdown();
                    break running.await?;
                };
                if !handle_line(line.trim(), &handle, listening.as_ref(), &listings).await? {
                    handle.shutdown();
                    break running.await?;
                }
            }
        }
    };

    println!("signup ended: {:?}", outcome.status);
    println!("{}", serde_json::to_string_pretty(&outcome.telemetry)?);
    Ok(())
}

/// Returns false when the user asked to quit.
async fn handle_line(
    line: &str,
    handle: &SessionHandle,
    listening: Option<&ListeningFlag>,
    listings: &InMemoryListingStore,
) -> anyhow::Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }
    let Some(command) = line.strip_prefix('/') else {
        match listening {
            Some(flag) if flag.is_listening() => handle.heard(line).await?,
            Some(_) => println!("(not listening; /resume restarts the microphone)"),
            None => println!("(demo mode ignores typed speech)"),
        }
        return Ok(true);
    };

    let mut parts = command.splitn(3, ' ');
    match (parts.next().unwrap_or_default(), parts.next(), parts.next()) {
        ("quit", _, _) => return Ok(false),
        ("kbd", _, _) => handle.send(Event::SwitchToKeyboard).await?,
        ("voice", _, _) => handle.send(Event::SwitchToVoice).await?,
        ("resume", _, _) => handle.send(Event::ResumeCapture).await?,
        ("next", _, _) => handle.keyboard(KeyboardAction::Next).await?,
        ("confirm", _, _) => handle.keyboard(KeyboardAction::Confirm).await?,
        ("cancel", _, _) => handle.keyboard(KeyboardAction::Cancel).await?,
        ("set", Some(field), Some(value)) => match Field::parse(field) {
            Some(field) => {
                handle
                    .keyboard(KeyboardAction::Edit {
                        field,
                        value: value.to_string(),
                    })
                    .await?
            }
            None => println!("unknown field {field:?}"),
        },
        ("sell", Some(price), Some(title)) => match price.parse::<u64>() {
            Ok(price) => {
                let listing = NewListing {
                    title: title.to_string(),
                    price,
                    seller_name: "guest".to_string(),
                    ..NewListing::default()
                };
                match listings.create(listing).await {
                    Ok(listing) => println!("listed {} ({})", listing.title, listing.id),
                    Err(e) => println!("{e}"),
                }
            }
            Err(_) => println!("price must be a whole number"),
        },
        ("list", _, _) => {
            for listing in listings.list().await? {
                println!("{:>10}원  {}", listing.price, listing.title);
            }
        }
        _ => println!("{HELP}"),
    }
    Ok(true)
}
