mod activity;
mod ai;
mod analysis;
mod auth;
mod chat;
mod cli;
mod coding;
mod config;
mod db;
mod error;
mod interpret;
mod problems;
mod profile;
mod progress;
mod qa;
mod recommend;
mod stats;
mod teaching;

use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    ActivityOp, AnalysisOp, AuthOp, ChatOp, Cli, CodingOp, Command, ProblemOp, ProfileOp,
    ProgressOp, QaOp, RecommendOp, StatsOp, TeachingOp,
};
use crate::error::Error;

fn main() {
    // Stdout is reserved for the result JSON; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Argument errors must still produce a failure object on stdout; callers
    // never parse stderr.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                let _ = err.print();
                return;
            }
            _ => {
                println!(
                    "{}",
                    json!({ "success": false, "message": err.to_string() })
                );
                std::process::exit(1);
            }
        },
    };
    match run(cli) {
        Ok(payload) => {
            let mut out = json!({ "success": true });
            merge(&mut out, payload);
            println!("{}", out);
        }
        Err(err) => {
            tracing::error!(%err, "operation failed");
            println!("{}", json!({ "success": false, "message": err.to_string() }));
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<serde_json::Value, Error> {
    let config = config::Config::load()?;
    let db_path = config.resolve_db_path(cli.db.as_ref());
    let conn = db::open_db(&db_path)?;

    match cli.command {
        Command::Init => Ok(json!({
            "message": format!("database initialized at {}", db_path.display())
        })),
        Command::Auth { op } => match op {
            AuthOp::Register(c) => auth::register(&conn, c.role, &c.email, &c.password),
            AuthOp::Login(c) => auth::login(&conn, c.role, &c.email, &c.password),
        },
        Command::Profile { op } => match op {
            ProfileOp::SaveStudent { email, data } => profile::save_student(&conn, &email, &data),
            ProfileOp::GetStudent { email } => profile::get_student(&conn, &email),
            ProfileOp::SaveTeacher { email, data } => profile::save_teacher(&conn, &email, &data),
            ProfileOp::GetTeacher { email } => profile::get_teacher(&conn, &email),
        },
        Command::Chat { op } => match op {
            ChatOp::Save { email, messages } => chat::save(&conn, &email, &messages),
            ChatOp::History { email } => chat::history(&conn, &email),
            ChatOp::Get { chat_id } => chat::get(&conn, &chat_id),
            ChatOp::Update { chat_id, messages } => chat::update(&conn, &chat_id, &messages),
            ChatOp::Delete { chat_id } => chat::delete(&conn, &chat_id),
        },
        Command::Problem { op } => match op {
            ProblemOp::Add { data } => problems::add(&conn, &data),
            ProblemOp::List { teacher_email } => problems::list(&conn, &teacher_email),
            ProblemOp::Update { data } => problems::update(&conn, &data),
            ProblemOp::Delete { problem_id } => problems::delete(&conn, &problem_id),
            ProblemOp::SetChapter {
                problem_id,
                chapter_id,
            } => problems::set_chapter(&conn, &problem_id, &chapter_id),
        },
        Command::Teaching { op } => match op {
            TeachingOp::Add { data } => teaching::add(&conn, &data),
            TeachingOp::List => teaching::list(&conn),
            TeachingOp::Get { chapter_id } => teaching::get(&conn, &chapter_id),
            TeachingOp::Update { data } => teaching::update(&conn, &data),
            TeachingOp::Delete { chapter_id } => teaching::delete(&conn, &chapter_id),
        },
        Command::Qa { op } => match op {
            QaOp::Submit {
                email,
                title,
                content,
            } => qa::submit(&conn, &email, &title, &content),
            QaOp::StudentQuestions { email } => qa::student_questions(&conn, &email),
            QaOp::AllQuestions => qa::all_questions(&conn),
            QaOp::Answer {
                question_id,
                answer,
            } => qa::answer(&conn, &question_id, &answer),
            QaOp::DeleteAnswer { question_id } => qa::delete_answer(&conn, &question_id),
        },
        Command::Coding { op } => match op {
            CodingOp::Submit { data } => coding::submit(&conn, &data),
            CodingOp::StudentStats { student_id } => coding::student_stats(&conn, &student_id),
            CodingOp::ClassStats { class_name } => coding::class_stats(&conn, &class_name),
            CodingOp::ProblemStats { problem_id } => coding::problem_stats(&conn, &problem_id),
        },
        Command::Stats { op } => match op {
            StatsOp::ClassList => stats::class_list(&conn),
            StatsOp::LearningPatterns { class_name } => {
                stats::learning_patterns(&conn, class_name.as_deref())
            }
        },
        Command::Recommend { op } => match op {
            RecommendOp::Save { student_id, data } => recommend::save(&conn, &student_id, &data),
            RecommendOp::List { student_id } => recommend::list(&conn, &student_id),
            RecommendOp::MarkRead {
                student_id,
                recommendation_id,
            } => recommend::mark_read(&conn, &student_id, &recommendation_id),
        },
        Command::Analysis { op } => match op {
            AnalysisOp::Run { student_id } => analysis::run(&conn, &config.ai, &student_id),
            AnalysisOp::Save { student_id, data } => analysis::save(&conn, &student_id, &data),
            AnalysisOp::Latest { student_id } => analysis::latest(&conn, &student_id),
        },
        Command::Progress { op } => match op {
            ProgressOp::Save {
                student_id,
                section_id,
            } => progress::save(&conn, &student_id, &section_id),
            ProgressOp::Completed { student_id } => progress::completed(&conn, &student_id),
            ProgressOp::Import { student_id, data } => {
                progress::import(&conn, &student_id, &data)
            }
        },
        Command::Activity { op } => match op {
            ActivityOp::Recent { student_id } => activity::recent(&conn, &student_id),
            ActivityOp::Chapters { student_id } => activity::chapters(&conn, &student_id),
        },
    }
}

/// Fold the handler payload into the success envelope.
fn merge(out: &mut serde_json::Value, payload: serde_json::Value) {
    if let (Some(out_map), serde_json::Value::Object(payload_map)) =
        (out.as_object_mut(), payload)
    {
        for (key, value) in payload_map {
            out_map.insert(key, value);
        }
    }
}
