use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::config::{mask, Config, ConfigValue};

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

const DEFAULT_CONFIG: &str = r#"# postsync configuration

# Directory holding local drafts (default: platform data dir + /postsync)
# data_dir: ~/.local/share/postsync

# Author written into new posts
author: default

# Remote repository
# remote:
#   provider: github            # github or gitea
#   api_url: https://git.example.com   # required for gitea
#   owner: your-name
#   repo: your-blog
#   branch: main                # default branch if unset
#   content_dir: src/content/blog
#   token: ...                  # or set POSTSYNC_TOKEN
"#;

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        cli_config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_config(config),
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let config_path = cli_config_path.unwrap_or_else(Config::default_config_path);

                if write_default_config(&config_path)? {
                    println!("Created config file: {}", config_path.display());
                    println!("\nEdit this file to customize your settings.");
                } else {
                    println!("Config file already exists: {}", config_path.display());
                    println!("Use 'postsync config show' to view current configuration.");
                }
                Ok(())
            }
        }
    }
}

fn print_config(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    print_value("data_dir", &config.data_dir.value.display(), &config.data_dir);
    print_value("author", &config.author.value, &config.author);

    let remote = &config.remote;
    println!("remote:");
    println!("  provider: {}", remote.provider);
    println!("  api_url: {}", remote.api_url().unwrap_or("(not set)"));
    println!("  owner: {}", remote.owner.as_deref().unwrap_or("(not set)"));
    println!("  repo: {}", remote.repo.as_deref().unwrap_or("(not set)"));
    println!(
        "  branch: {}",
        remote.branch.as_deref().unwrap_or("(repository default)")
    );
    println!("  content_dir: {}", remote.content_dir());
    println!(
        "  token: {}",
        remote
            .token
            .as_deref()
            .map(mask)
            .unwrap_or_else(|| "(not set)".to_string())
    );
}

fn print_value<T>(name: &str, shown: &dyn std::fmt::Display, value: &ConfigValue<T>) {
    println!("{}: {}", name, shown);
    println!("  source: {}", value.source);
    println!();
}

/// Writes the commented default config. Returns false if the file exists.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())?;
    Ok(true)
}
