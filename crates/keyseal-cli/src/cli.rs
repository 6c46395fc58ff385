use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "keyseal",
    about = "Encrypt configuration values and generate passwords",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Secret key file (created with a fresh key when missing).
    #[arg(long, global = true, env = "KEYSEAL_SECRET")]
    pub secret: Option<PathBuf>,

    /// Optional subcommand; prints help when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Encrypt clear text, e.g. a password.
    Encrypt {
        /// Clear text.
        text: String,
    },
    /// Decrypt an `{AES256}` value (other values are echoed unchanged).
    Decrypt {
        /// Encrypted text.
        encrypted: String,
    },
    /// Generate a random password and print it encrypted.
    #[command(alias = "password-generator")]
    Pwgen {
        /// Number of characters (defaults to the configured length, else 16).
        length: Option<usize>,
    },
    /// Print a TOML or JSON property file with encrypted values decrypted.
    DecryptProps {
        /// Flat key/value file (`.toml` or `.json`).
        file: PathBuf,
    },
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
