use crate::{
    cli::{
        actions::{play, server, Action},
        commands::{self, ARG_QUESTIONS},
    },
    quiz::QuestionSource,
};
use anyhow::{anyhow, Context, Result};
use clap::ArgMatches;
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::server::NAME, sub_m)) => server_args(sub_m).map(Action::Server),
        Some((commands::play::NAME, sub_m)) => play_args(sub_m).map(Action::Play),
        Some((name, _)) => Err(anyhow!("unknown subcommand: {name}")),
        None => Err(anyhow!("missing subcommand")),
    }
}

fn questions(matches: &ArgMatches) -> Result<QuestionSource> {
    let questions = matches
        .get_one::<String>(ARG_QUESTIONS)
        .context("missing required argument: --questions")?;
    QuestionSource::parse(questions).context("invalid SPEECH_QUIZ_QUESTIONS")
}

fn server_args(matches: &ArgMatches) -> Result<server::Args> {
    use commands::server::{ARG_BYPASS_PREFIX, ARG_PASSWORD, ARG_PORT, ARG_STATIC_DIR};

    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    // An empty password means no password, like an unset variable.
    let password = matches
        .get_one::<String>(ARG_PASSWORD)
        .filter(|password| !password.is_empty())
        .map(|password| SecretString::from(password.clone()));

    let bypass_prefix = matches
        .get_one::<String>(ARG_BYPASS_PREFIX)
        .cloned()
        .unwrap_or_default();

    Ok(server::Args {
        port,
        password,
        questions: questions(matches)?,
        static_dir: matches.get_one::<PathBuf>(ARG_STATIC_DIR).cloned(),
        bypass_prefix,
    })
}

fn play_args(matches: &ArgMatches) -> Result<play::Args> {
    use commands::play::{ARG_NO_SHUFFLE, ARG_NO_SPEECH_AFTER, ARG_SILENCE_TIMEOUT};

    let millis = |name: &str| -> Result<Duration> {
        matches
            .get_one::<u64>(name)
            .copied()
            .map(Duration::from_millis)
            .with_context(|| format!("missing required argument: --{name}"))
    };

    Ok(play::Args {
        questions: questions(matches)?,
        shuffle: !matches.get_flag(ARG_NO_SHUFFLE),
        silence_timeout: millis(ARG_SILENCE_TIMEOUT)?,
        no_speech_after: millis(ARG_NO_SPEECH_AFTER)?,
    })
}
