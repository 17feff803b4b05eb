use crate::{api, gate::GateConfig, quiz::QuestionSource};
use anyhow::Result;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub password: Option<SecretString>,
    pub questions: QuestionSource,
    pub static_dir: Option<PathBuf>,
    pub bypass_prefix: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    if args.password.is_none() {
        warn!("no password configured, the quiz is open to everyone");
    }

    let gate = GateConfig::new(args.password, args.bypass_prefix);

    api::new(args.port, gate, args.questions, args.static_dir).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("questions", args.questions.to_string()),
        ("password_set", args.password.is_some().to_string()),
        (
            "static_dir",
            args.static_dir
                .as_ref()
                .map_or_else(|| "none".to_string(), |dir| dir.display().to_string()),
        ),
        ("bypass_prefix", args.bypass_prefix.clone()),
    ];
    info!("{}", startup_message("Startup configuration", &entries));
}

pub(crate) fn startup_message(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

const BANNER: &str = r"
    .-.
   (   )   S P E E C H   Q U I Z {VERSION}
    `-'
     |";
