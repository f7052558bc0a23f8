//! Snippet commands

use anyhow::{Context, Result};
use clap::Args;
use cq_core::{Snippet, SnippetDraft, SnippetService};
use std::io::Read;
use std::path::PathBuf;

/// Arguments for listing snippets
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl ListArgs {
    pub async fn run(self, service: &SnippetService) -> Result<()> {
        let snippets = service.list().await.context("Failed to list snippets")?;
        print_snippets(&snippets, self.json)
    }
}

/// Arguments for printing one snippet
#[derive(Args, Debug)]
pub struct GetArgs {
    /// Snippet id
    #[arg(value_name = "ID")]
    pub id: String,

    /// Print the whole record as JSON instead of just the code
    #[arg(long)]
    pub json: bool,
}

impl GetArgs {
    pub async fn run(self, service: &SnippetService) -> Result<()> {
        let snippet = service
            .get(&self.id)
            .await
            .with_context(|| format!("Failed to read snippet {}", self.id))?
            .with_context(|| format!("Snippet {} not found", self.id))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&snippet)?);
        } else {
            print!("{}", snippet.code);
            if !snippet.code.ends_with('\n') {
                println!();
            }
        }
        Ok(())
    }
}

/// Arguments for saving a snippet
#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Update the snippet with this id (a new id is generated when omitted)
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,

    /// File name shown in the sidebar
    #[arg(long, value_name = "NAME", default_value = SnippetDraft::UNTITLED)]
    pub filename: String,

    /// Language tag, e.g. javascript
    #[arg(long, value_name = "LANG")]
    pub language: String,

    /// Snippet code (read from stdin when neither --code nor --code-file is given)
    #[arg(long, value_name = "TEXT", conflicts_with = "code_file")]
    pub code: Option<String>,

    /// Read the snippet code from FILE
    #[arg(long = "code-file", value_name = "FILE")]
    pub code_file: Option<PathBuf>,
}

impl SaveArgs {
    pub async fn run(self, service: &SnippetService) -> Result<()> {
        let code = self.read_code().await?;
        let draft = match self.id {
            Some(id) => SnippetDraft::with_id(id, self.filename, self.language, code),
            None => SnippetDraft::new(self.filename, self.language, code),
        };
        let id = draft.id.clone();

        service
            .save(draft)
            .await
            .with_context(|| format!("Failed to save snippet {}", id))?;
        println!("{}", id);
        Ok(())
    }

    async fn read_code(&self) -> Result<String> {
        if let Some(code) = &self.code {
            return Ok(code.clone());
        }
        if let Some(path) = &self.code_file {
            return tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()));
        }

        let mut code = String::new();
        std::io::stdin()
            .read_to_string(&mut code)
            .context("Failed to read code from stdin")?;
        Ok(code)
    }
}

/// Arguments for deleting a snippet
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Snippet id
    #[arg(value_name = "ID")]
    pub id: String,
}

impl DeleteArgs {
    pub async fn run(self, service: &SnippetService) -> Result<()> {
        service
            .delete(&self.id)
            .await
            .with_context(|| format!("Failed to delete snippet {}", self.id))
    }
}

/// Arguments for searching snippets
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text to look for in filenames and languages
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    pub async fn run(self, service: &SnippetService) -> Result<()> {
        let snippets = service
            .search(&self.query)
            .await
            .context("Failed to search snippets")?;
        print_snippets(&snippets, self.json)
    }
}

fn print_snippets(snippets: &[Snippet], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(snippets)?);
        return Ok(());
    }
    for line in table_lines(snippets) {
        println!("{}", line);
    }
    Ok(())
}

/// One tab-separated line per snippet: id, filename, language, last update.
pub fn table_lines(snippets: &[Snippet]) -> Vec<String> {
    snippets
        .iter()
        .map(|s| {
            format!(
                "{}\t{}\t{}\t{}",
                s.id,
                s.filename,
                s.language,
                s.updated_at.format("%Y-%m-%d %H:%M:%S")
            )
        })
        .collect()
}
