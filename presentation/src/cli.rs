use crate::services::{self, Answers};
use crate::web;
use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input};
use domain::error::PipelineError;
use domain::models::Answer;
use infrastructure::config::Config;
use infrastructure::document_loader::DocumentLoader;
use infrastructure::index_store::IndexStore;
use shared::confirmation::{ask_confirmation, is_interactive};
use shared::types::Result;
use shared::utils::preview;
use std::path::PathBuf;

const SOURCE_PREVIEW_CHARS: usize = 160;

#[derive(Parser)]
#[command(name = "chat_pdf")]
#[command(about = "Ask questions about your PDF files, answered by Gemini")]
pub struct Cli {
    /// Log debug output (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract, chunk and embed PDFs, replacing the current index
    Process {
        /// PDF files or directories containing PDFs, in upload order
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Replace an existing index without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask one question against the current index
    Ask {
        /// Print the passages the answer was based on
        #[arg(long)]
        sources: bool,

        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },

    /// Ask questions interactively until "exit"
    Chat {
        /// Print the passages each answer was based on
        #[arg(long)]
        sources: bool,
    },

    /// Show what the current index was built from
    Status,

    /// Serve the upload-and-ask web form
    Serve {
        /// Address to listen on (defaults to CHAT_PDF_BIND)
        #[arg(long)]
        bind: Option<String>,
    },
}

pub struct CliApp {
    config: Config,
}

impl CliApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self, cli: Cli) -> Result<()> {
        match cli.command {
            Command::Process { paths, yes } => self.handle_process(&paths, yes).await,
            Command::Ask { sources, question } => self.handle_ask(&question.join(" "), sources).await,
            Command::Chat { sources } => self.handle_chat(sources).await,
            Command::Status => self.handle_status(),
            Command::Serve { bind } => {
                let bind = bind.unwrap_or_else(|| self.config.bind_addr.clone());
                web::serve(&self.config, &bind).await
            }
        }
    }

    async fn handle_process(&self, paths: &[PathBuf], yes: bool) -> Result<()> {
        let store = IndexStore::new(self.config.index_path());
        if store.exists() && !yes && is_interactive() {
            let prompt = format!("Replace the existing index at {}?", store.path().display());
            if !ask_confirmation(&prompt, true)? {
                println!("{}", "Processing cancelled.".yellow());
                return Ok(());
            }
        }

        let documents = DocumentLoader::new()
            .load(paths)
            .context("failed to read documents")?;
        let (ingest, _) = services::build(&self.config)?;

        eprintln!("Processing {} document(s)...", documents.len());
        let report = ingest.process(&documents).await?;
        println!("{}", "Done".green().bold());
        println!(
            "  {} characters, {} chunks, {}-dimensional vectors ({})",
            report.characters,
            report.chunks,
            report.manifest.dimension,
            report.manifest.embedding_model
        );
        println!("  index: {}", store.path().display());
        Ok(())
    }

    async fn handle_ask(&self, question: &str, show_sources: bool) -> Result<()> {
        let (_, answers) = services::build(&self.config)?;
        self.ask_once(&answers, question, show_sources).await?;
        Ok(())
    }

    async fn handle_chat(&self, show_sources: bool) -> Result<()> {
        let (_, answers) = services::build(&self.config)?;
        println!("Ask a question about the processed PDFs. Type 'exit' to quit.");
        loop {
            let input: String = Input::with_theme(&ColorfulTheme::default())
                .with_prompt("Question")
                .allow_empty(true)
                .interact_text()?;
            let input = input.trim();
            if input.is_empty() {
                continue;
            }
            if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
                break;
            }
            match self.ask_once(&answers, input, show_sources).await {
                Ok(_) => {}
                // Nothing to ask against; every further question would fail the same way.
                Err(e @ PipelineError::IndexNotFound(_)) => return Err(e.into()),
                Err(e) => eprintln!("{}", format!("Error: {e}").red()),
            }
        }
        Ok(())
    }

    fn handle_status(&self) -> Result<()> {
        let store = IndexStore::new(self.config.index_path());
        let manifest = store.load_manifest()?;
        println!("{} {}", "Index:".bold(), store.path().display());
        println!("  built at:        {}", manifest.built_at.to_rfc3339());
        println!("  embedding model: {}", manifest.embedding_model);
        if manifest.embedding_model != self.config.embedding_model {
            println!(
                "  {}",
                format!(
                    "configured model is '{}'; questions will be rejected until you re-process",
                    self.config.embedding_model
                )
                .yellow()
            );
        }
        println!("  dimension:       {}", manifest.dimension);
        println!("  chunks:          {}", manifest.chunk_count);
        println!(
            "  chunking:        {} chars, {} overlap",
            manifest.chunk_size, manifest.chunk_overlap
        );
        println!("  source digest:   {}", manifest.source_digest);
        Ok(())
    }

    async fn ask_once(
        &self,
        answers: &Answers,
        question: &str,
        show_sources: bool,
    ) -> std::result::Result<Answer, PipelineError> {
        let answer = answers.answer(question).await?;
        print_answer(&answer, show_sources);
        Ok(answer)
    }
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{} {}", "Reply:".green().bold(), answer.text);
    if answer.is_sentinel() {
        println!(
            "{}",
            "The processed documents do not seem to cover this question.".yellow()
        );
    }
    if show_sources {
        for source in &answer.sources {
            println!(
                "  {} {}",
                format!("[chunk {} | {:.3}]", source.position, source.score).blue(),
                preview(&source.text, SOURCE_PREVIEW_CHARS).replace('\n', " ")
            );
        }
    }
    eprintln!("Response time: {} ms", answer.elapsed_ms);
}
