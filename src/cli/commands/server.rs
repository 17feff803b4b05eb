use crate::gate::DEFAULT_BYPASS_PREFIX;
use clap::{Arg, Command};
use std::path::PathBuf;

pub const NAME: &str = "server";
pub const ARG_PORT: &str = "port";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_STATIC_DIR: &str = "static-dir";
pub const ARG_BYPASS_PREFIX: &str = "bypass-prefix";

#[must_use]
pub fn command() -> Command {
    Command::new(NAME)
        .about("Serve the quiz over HTTP behind the password gate")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("SPEECH_QUIZ_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long("password")
                .help("Shared password for the access gate")
                .long_help(
                    "Shared password for the access gate. When unset or empty every route is open.",
                )
                .env("SPEECH_QUIZ_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long("static-dir")
                .help("Directory with the front-end assets, served for unknown paths")
                .env("SPEECH_QUIZ_STATIC_DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_BYPASS_PREFIX)
                .long("bypass-prefix")
                .help("Path prefix that is never gated")
                .default_value(DEFAULT_BYPASS_PREFIX)
                .env("SPEECH_QUIZ_BYPASS_PREFIX"),
        )
}
