use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand};
use postsync_core::remote::validate_filename;
use postsync_core::{frontmatter, DeleteOutcome, FrontMatter, FrontMatterValue, SyncError};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{error_hint, open_drafts, open_reconciler, OutputFormat};
use crate::config::Config;

#[derive(Args)]
pub struct PostCommand {
    #[command(subcommand)]
    pub command: PostSubcommand,
}

#[derive(Subcommand)]
pub enum PostSubcommand {
    /// List local drafts with their sync state
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a draft as a Markdown document
    Show {
        /// Post filename (e.g. 20240501_hello.md)
        filename: String,
    },

    /// Create a new draft
    New {
        /// Post title
        #[arg(long, short)]
        title: String,

        /// Add a tag (can be repeated)
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Read the body from a file ('-' for stdin)
        #[arg(long, short)]
        file: Option<PathBuf>,
    },

    /// Edit a draft's body or front matter
    Edit {
        /// Post filename
        filename: String,

        /// Replace the body from a file ('-' for stdin)
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Set a front-matter key (key=value, can be repeated)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        assignments: Vec<String>,

        /// Replace tags (comma-separated)
        #[arg(long)]
        tags: Option<String>,
    },

    /// Import a Markdown file from disk as a draft
    Import {
        /// Path to the Markdown file
        path: PathBuf,
    },

    /// Delete a post remotely and locally
    Delete {
        /// Post filename
        filename: String,
    },
}

impl PostCommand {
    pub async fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            PostSubcommand::List { format } => self.list(format, config),
            PostSubcommand::Show { filename } => self.show(filename, config),
            PostSubcommand::New { title, tags, file } => self.create(title, tags, file, config),
            PostSubcommand::Edit {
                filename,
                file,
                assignments,
                tags,
            } => self.edit(filename, file, assignments, tags, config),
            PostSubcommand::Import { path } => self.import(path, config),
            PostSubcommand::Delete { filename } => self.delete(filename, config).await,
        }
    }

    fn list(
        &self,
        format: &OutputFormat,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let statuses = open_drafts(config).status()?;

        match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
            }
            OutputFormat::Text => {
                if statuses.is_empty() {
                    println!("No drafts. Create one with 'postsync post new' or run 'postsync sync pull'.");
                    return Ok(());
                }

                println!("{:<40} {:<12} TITLE", "FILENAME", "STATE");
                for status in &statuses {
                    println!(
                        "{:<40} {:<12} {}",
                        status.filename,
                        status.state.to_string(),
                        status.title.as_deref().unwrap_or("-")
                    );
                }
            }
        }

        Ok(())
    }

    fn show(&self, filename: &str, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let post = open_drafts(config)
            .get(filename)?
            .ok_or_else(|| format!("Draft not found: {}", filename))?;

        print!("{}", frontmatter::encode(&post.front_matter, &post.content));
        if !post.content.ends_with('\n') {
            println!();
        }
        Ok(())
    }

    fn create(
        &self,
        title: &str,
        tags: &[String],
        file: &Option<PathBuf>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let today = Local::now().date_naive();
        let filename = slug_filename(title, today);
        let drafts = open_drafts(config);

        if drafts.get(&filename)?.is_some() {
            return Err(format!("Draft already exists: {}", filename).into());
        }

        let mut front_matter = default_front_matter(title, today, &config.author.value, tags);
        let mut body = String::new();
        if let Some(path) = file {
            let (file_front_matter, file_body) = frontmatter::decode(&read_source(path)?);
            for (key, value) in file_front_matter.iter() {
                front_matter.insert(key.clone(), value.clone());
            }
            body = file_body;
        }

        let post = drafts.save_draft(&filename, &body, front_matter)?;
        tracing::debug!("Created draft {}", post.filename);

        println!("Created draft: {}", post.filename);
        Ok(())
    }

    fn edit(
        &self,
        filename: &str,
        file: &Option<PathBuf>,
        assignments: &[String],
        tags: &Option<String>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if file.is_none() && assignments.is_empty() && tags.is_none() {
            return Err("Nothing to change. Use --file, --set or --tags.".into());
        }

        let drafts = open_drafts(config);
        let existing = drafts
            .get(filename)?
            .ok_or_else(|| format!("Draft not found: {}", filename))?;

        let mut front_matter = existing.front_matter;
        let mut body = existing.content;

        if let Some(path) = file {
            let (file_front_matter, file_body) = frontmatter::decode(&read_source(path)?);
            if !file_front_matter.is_empty() {
                front_matter = file_front_matter;
            }
            body = file_body;
        }
        for assignment in assignments {
            let (key, value) = parse_assignment(assignment)?;
            front_matter.insert(key, value);
        }
        if let Some(tags) = tags {
            front_matter.insert("tags", parse_tags(tags));
        }

        let post = drafts.save_draft(filename, &body, front_matter)?;

        println!("Updated draft: {} ({})", post.filename, post.state());
        Ok(())
    }

    fn import(&self, path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format!("Invalid path: {}", path.display()))?;
        validate_filename(filename)?;

        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        let (front_matter, body) = frontmatter::decode(&raw);

        let post = open_drafts(config).save_draft(filename, &body, front_matter)?;

        println!("Imported draft: {} ({})", post.filename, post.state());
        Ok(())
    }

    async fn delete(
        &self,
        filename: &str,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let drafts = open_drafts(config);
        let post = drafts
            .get(filename)?
            .ok_or_else(|| format!("Draft not found: {}", filename))?;

        // Never-synced drafts do not need the remote.
        if post.revision_token.is_none() {
            drafts.delete(filename)?;
            println!("Deleted local draft: {}", filename);
            return Ok(());
        }

        let reconciler = open_reconciler(config)?;
        match reconciler.delete(filename).await {
            Ok(DeleteOutcome::Remote) => {
                println!("Deleted: {} (remote and local)", filename);
                Ok(())
            }
            Ok(DeleteOutcome::LocalOnly) => {
                println!("Deleted local draft: {}", filename);
                Ok(())
            }
            Err(SyncError::Gateway(e)) => {
                eprintln!("The local draft was kept.");
                if let Some(hint) = error_hint(&e) {
                    eprintln!("Hint: {}", hint);
                }
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Derives a post filename from its title: `YYYYMMDD_words_joined.md`.
fn slug_filename(title: &str, date: NaiveDate) -> String {
    let mut slug = String::new();
    let mut prev_sep = true;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            prev_sep = false;
        } else if !prev_sep {
            slug.push('_');
            prev_sep = true;
        }
    }
    if slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }

    format!("{}_{}.md", date.format("%Y%m%d"), slug)
}

fn default_front_matter(
    title: &str,
    date: NaiveDate,
    author: &str,
    tags: &[String],
) -> FrontMatter {
    FrontMatter::new()
        .with("title", title)
        .with("date", date.format("%Y-%m-%d").to_string())
        .with("author", author)
        .with("tags", tags.to_vec())
}

/// Parses `key=value`. A bracketed value is read as a list.
fn parse_assignment(assignment: &str) -> Result<(String, FrontMatterValue), String> {
    let (key, value) = assignment
        .split_once('=')
        .ok_or_else(|| format!("Invalid assignment '{}'. Use key=value.", assignment))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Invalid assignment '{}': empty key", assignment));
    }

    let value = value.trim();
    let value = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
        Some(inner) => FrontMatterValue::List(parse_tags(inner)),
        None => FrontMatterValue::Scalar(value.to_string()),
    };

    Ok((key.to_string(), value))
}

fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(|t| t.trim().trim_matches('"').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Reads a file, or stdin when the path is `-`.
fn read_source(path: &Path) -> Result<String, String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("Failed to read stdin: {}", e))?;
        return Ok(buf);
    }

    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}
