use clap::{Arg, ArgAction, Command};

pub const NAME: &str = "play";
pub const ARG_NO_SHUFFLE: &str = "no-shuffle";
pub const ARG_SILENCE_TIMEOUT: &str = "silence-timeout-ms";
pub const ARG_NO_SPEECH_AFTER: &str = "no-speech-after-ms";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Play the quiz in the terminal, typed lines stand in for speech")
        .arg(
            Arg::new(ARG_NO_SHUFFLE)
                .long("no-shuffle")
                .help("Ask the questions in file order")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_SILENCE_TIMEOUT)
                .long("silence-timeout-ms")
                .help("Quiet period after the last line that submits the answer")
                .default_value("1500")
                .env("SPEECH_QUIZ_SILENCE_TIMEOUT_MS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_NO_SPEECH_AFTER)
                .long("no-speech-after-ms")
                .help("How long to wait for the first line before reporting no speech")
                .default_value("8000")
                .env("SPEECH_QUIZ_NO_SPEECH_AFTER_MS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
