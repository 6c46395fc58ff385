mod cli;
mod config;
mod crypto;
mod props;

use std::path::Path;

use crate::cli::ConfigCommand;
use clap::{CommandFactory, Parser};
use color_eyre::Result;
use keyseal_core::{EnvelopeCodec, PasswordGenerator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// Entry point wiring the CLI to the codec.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    run(cli, config::load)
}

/// Dispatch a parsed command. Config is only loaded by commands that need it,
/// so help and `version` keep working with a broken config file.
fn run(cli: cli::Cli, load_config: impl FnOnce() -> Result<config::Config>) -> Result<()> {
    let Some(command) = cli.command else {
        cli::Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        cli::Command::Version => print_version(),
        command => run_with_config(command, cli.secret.as_deref(), &load_config()?)?,
    }
    Ok(())
}

fn run_with_config(
    command: cli::Command,
    secret_flag: Option<&Path>,
    config: &config::Config,
) -> Result<()> {
    let shared = crypto::shared_codec(&crypto::resolve_secret_path(secret_flag, config));
    match command {
        cli::Command::Version => print_version(),
        cli::Command::Config(ConfigCommand::Init) => init_config(config)?,
        cli::Command::Encrypt { text } => {
            print_encrypted(crypto::codec(&shared)?, &text)?;
        }
        cli::Command::Decrypt { encrypted } => {
            let codec = crypto::codec(&shared)?;
            println!("encrypted text = \"{encrypted}\"");
            println!("text = \"{}\"", codec.decrypt_text(&encrypted)?);
        }
        cli::Command::Pwgen { length } => {
            let codec = crypto::codec(&shared)?;
            let length = length
                .or(config.password_length)
                .unwrap_or(DEFAULT_PASSWORD_LENGTH);
            println!("random password");
            print_encrypted(codec, &PasswordGenerator::new().generate(length))?;
        }
        cli::Command::DecryptProps { file } => {
            let codec = crypto::codec(&shared)?;
            for line in props::render_decrypted(&file, codec)? {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so command output stays pipeable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("keyseal {}", env!("CARGO_PKG_VERSION"));
}

fn print_encrypted(codec: &EnvelopeCodec, text: &str) -> Result<()> {
    println!("text = \"{text}\"");
    println!("encrypted text = \"{}\"", codec.encrypt_text(text)?);
    Ok(())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broken_config() -> Result<config::Config> {
        Err(color_eyre::eyre::eyre!("malformed config.toml"))
    }

    #[test]
    fn help_and_version_ignore_broken_config() {
        let help = cli::Cli::try_parse_from(["keyseal"]).expect("parse");
        run(help, broken_config).expect("help without config");

        let version = cli::Cli::try_parse_from(["keyseal", "version"]).expect("parse");
        run(version, broken_config).expect("version without config");
    }

    #[test]
    fn key_commands_surface_broken_config() {
        let encrypt = cli::Cli::try_parse_from(["keyseal", "encrypt", "x"]).expect("parse");
        let err = run(encrypt, broken_config).expect_err("config is required");
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn encrypt_uses_configured_secret_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let secret = dir.path().join("keys").join("secret.bin");
        let config = config::Config {
            secret_path: Some(secret.clone()),
            password_length: None,
        };

        let encrypt = cli::Cli::try_parse_from(["keyseal", "encrypt", "x"]).expect("parse");
        run(encrypt, || Ok(config)).expect("encrypt");
        assert_eq!(std::fs::read(&secret).expect("key file").len(), 32);
    }

    #[test]
    fn generated_password_round_trips_through_codec() {
        let codec = EnvelopeCodec::from_key(&[0u8; 32]).expect("codec");
        let password = PasswordGenerator::new().generate(DEFAULT_PASSWORD_LENGTH);

        let encrypted = codec.encrypt_text(&password).expect("encrypt");
        assert_eq!(codec.decrypt_text(&encrypted).expect("decrypt"), password);
    }
}
