//! Argos CLI entry point.
//!
//! Provides `start` and `resume` for interactive dialogue sessions, plus
//! `instructions` and `rubric` for inspecting what the tutor is told.

#![forbid(unsafe_code)]
#![allow(missing_docs)]

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use argos::config::ArgosConfig;
use argos::credentials::load_api_key;
use argos::export::SessionExport;
use argos::logging::{self, LoggingGuard};
use argos::providers::gemini::GeminiProvider;
use argos::providers::LlmProvider;
use argos::report::prompt::normalize_declaration;
use argos::report::{render_text, ReportSynthesizer};
use argos::rubric::{Domain, RubricTable};
use argos::transcript::{SessionConfig, SocraticMode, Transcript, TurnRole};
use argos::tutor::instructions::{build_instruction, InstructionOptions};
use argos::tutor::{SessionConfigurator, TutorSession};

/// Command that ends the dialogue.
const END_COMMAND: &str = "/fin";

/// Argos: Socratic evaluative dialogue tutor.
#[derive(Parser)]
#[command(name = "argos", version, about)]
struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Start a new dialogue session.
    Start {
        /// Student display name.
        #[arg(long)]
        student: String,
        /// Topic under discussion.
        #[arg(long)]
        topic: String,
        /// Pedagogical mode: defense or audit.
        #[arg(long)]
        mode: SocraticMode,
        /// Disciplinary domain: closed_notion, debate_thesis, scientific_technical.
        #[arg(long)]
        domain: Domain,
        /// Directory the export is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Resume a session from an export file.
    Resume {
        /// Export file to continue from.
        file: PathBuf,
        /// Domain to use when the export does not record one.
        #[arg(long)]
        domain: Option<Domain>,
        /// Directory the new export is written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Print the system instruction a session would receive.
    Instructions {
        /// Pedagogical mode: defense or audit.
        #[arg(long)]
        mode: SocraticMode,
        /// Disciplinary domain.
        #[arg(long)]
        domain: Domain,
        /// Topic under discussion.
        #[arg(long)]
        topic: String,
    },
    /// Print the discipline rubrics.
    Rubric {
        /// Only print this domain.
        #[arg(long)]
        domain: Option<Domain>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ArgosConfig::load().context("failed to load configuration")?;
    let _logging_guard = init_logging(&config)?;

    match cli.command {
        Command::Start {
            student,
            topic,
            mode,
            domain,
            out,
        } => {
            let session = SessionConfig {
                student_name: student,
                topic,
                mode,
                domain,
            };
            handle_session(&config, session, Transcript::new(), &out).await
        }
        Command::Resume { file, domain, out } => handle_resume(&config, &file, domain, &out).await,
        Command::Instructions {
            mode,
            domain,
            topic,
        } => handle_instructions(&config, mode, domain, &topic),
        Command::Rubric { domain } => handle_rubric(domain),
    }
}

fn init_logging(config: &ArgosConfig) -> anyhow::Result<Option<LoggingGuard>> {
    match &config.logging.dir {
        Some(dir) => logging::init_file(dir, &config.logging.level).map(Some),
        None => {
            logging::init_cli(&config.logging.level);
            Ok(None)
        }
    }
}

/// Continue a session from an export file.
async fn handle_resume(
    config: &ArgosConfig,
    file: &Path,
    domain: Option<Domain>,
    out: &Path,
) -> anyhow::Result<()> {
    let export = SessionExport::read_from(file)
        .with_context(|| format!("failed to read export {}", file.display()))?;
    let session = export.session_config(domain)?;
    info!(
        file = %file.display(),
        turns = export.transcript.len(),
        "resuming session"
    );
    handle_session(config, session, export.transcript(), out).await
}

/// Run a dialogue to completion, then analyze and export it.
async fn handle_session(
    config: &ArgosConfig,
    session: SessionConfig,
    mut transcript: Transcript,
    out: &Path,
) -> anyhow::Result<()> {
    let api_key = load_api_key()?;
    let rubrics = Arc::new(RubricTable::builtin());

    let chat: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::with_api_base(
        config.models.chat_model.clone(),
        config.models.api_base.clone(),
        api_key.clone(),
    ));
    let analysis: Arc<dyn LlmProvider> = Arc::new(GeminiProvider::with_api_base(
        config.models.analysis_model.clone(),
        config.models.api_base.clone(),
        api_key,
    ));

    let configurator = SessionConfigurator::new(chat, Arc::clone(&rubrics), config);
    let mut tutor = configurator.create_session(
        session.mode,
        &session.topic,
        session.domain,
        transcript.turns(),
    )?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!(
        "Session {} | {} | {} (tape {END_COMMAND} pour terminer)",
        session.mode, session.domain, session.topic
    );
    for turn in transcript.turns() {
        let author = match turn.role {
            TurnRole::Student => session.student_name.as_str(),
            TurnRole::Agent => config.tutor.name.as_str(),
        };
        println!("[{author}] {}", turn.text);
    }

    run_dialogue(&mut tutor, &mut transcript, &mut lines).await?;

    prompt("Déclaration d'usage de l'IA (Entrée si aucune) : ");
    let raw_declaration = lines.next_line().await?.unwrap_or_default();
    let declaration = normalize_declaration(&raw_declaration);

    println!("Analyse en cours...");
    let synthesizer = ReportSynthesizer::new(analysis, rubrics, config);
    let result = synthesizer
        .analyze(&transcript, &session.topic, session.domain, &declaration)
        .await;

    println!("{}", render_text(&session, &result));

    let export = SessionExport::new(
        &session,
        result,
        &transcript,
        &declaration,
        Some(&config.tutor.prompt_version),
        Utc::now(),
    );
    std::fs::create_dir_all(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    let path = out.join(export.suggested_file_name());
    export.write_to(&path)?;
    println!("Export : {}", path.display());

    Ok(())
}

/// Forward stdin lines to the tutor until `/fin` or end of input.
async fn run_dialogue(
    tutor: &mut TutorSession,
    transcript: &mut Transcript,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<()> {
    if let Some(reply) = tutor.open().await {
        println!("\n{}\n", reply.text);
        if reply.is_delivered() {
            transcript.push_agent(reply.text, Utc::now());
        }
    }

    loop {
        prompt("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == END_COMMAND {
            break;
        }

        let submitted_at = Utc::now();
        let reply = tutor.send(&line).await;
        println!("\n{}\n", reply.text);

        if reply.is_delivered() {
            transcript.push_student(line, submitted_at);
            transcript.push_agent(reply.text, Utc::now());
        }
    }

    Ok(())
}

/// Print the system instruction without any network call.
fn handle_instructions(
    config: &ArgosConfig,
    mode: SocraticMode,
    domain: Domain,
    topic: &str,
) -> anyhow::Result<()> {
    let rubrics = RubricTable::builtin();
    let rubric = rubrics.get(domain)?;
    let options = InstructionOptions {
        tutor_name: config.tutor.name.clone(),
        include_level_descriptions: true,
    };
    println!("{}", build_instruction(mode, rubric, topic, &options));
    Ok(())
}

/// Print one or all rubric tables.
fn handle_rubric(domain: Option<Domain>) -> anyhow::Result<()> {
    let rubrics = RubricTable::builtin();
    let selected: Vec<_> = match domain {
        Some(domain) => vec![rubrics.get(domain)?],
        None => rubrics.iter().collect(),
    };

    for rubric in selected {
        println!("{} ({}) : {} pts", rubric.label, rubric.domain, rubric.max_total());
        for criterion in &rubric.criteria {
            println!("  {}", criterion.label());
            for level in criterion.levels() {
                println!("    {:>2} pts  {}", level.score, level.description);
            }
        }
        println!();
    }
    Ok(())
}

fn prompt(text: &str) {
    print!("{text}");
    let _ = std::io::stdout().flush();
}
