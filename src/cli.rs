//! Command-line surface.
//!
//! Every operation the platform front end can invoke is a typed subcommand;
//! the string-to-handler dispatch happens once, in `main`, against this enum.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eduplat")]
#[command(about = "One-shot backend CLI for the education platform")]
#[command(version)]
pub struct Cli {
    /// Path to the SQLite database file (overrides config)
    #[arg(long, global = true, env = "EDUPLAT_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the database and all tables
    Init,

    /// User registration and login
    Auth {
        #[command(subcommand)]
        op: AuthOp,
    },

    /// Student and teacher profiles
    Profile {
        #[command(subcommand)]
        op: ProfileOp,
    },

    /// Chat history
    Chat {
        #[command(subcommand)]
        op: ChatOp,
    },

    /// Problem bank
    Problem {
        #[command(subcommand)]
        op: ProblemOp,
    },

    /// Teaching content chapters
    Teaching {
        #[command(subcommand)]
        op: TeachingOp,
    },

    /// Student questions and teacher answers
    Qa {
        #[command(subcommand)]
        op: QaOp,
    },

    /// Coding submissions and solving statistics
    Coding {
        #[command(subcommand)]
        op: CodingOp,
    },

    /// Cross-class analytics
    Stats {
        #[command(subcommand)]
        op: StatsOp,
    },

    /// Learning recommendations
    Recommend {
        #[command(subcommand)]
        op: RecommendOp,
    },

    /// AI learning-behavior analysis
    Analysis {
        #[command(subcommand)]
        op: AnalysisOp,
    },

    /// Section completion progress
    Progress {
        #[command(subcommand)]
        op: ProgressOp,
    },

    /// Per-student activity views
    Activity {
        #[command(subcommand)]
        op: ActivityOp,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
        }
    }
}

#[derive(Args)]
pub struct Credentials {
    #[arg(long, value_enum)]
    pub role: Role,
    pub email: String,
    pub password: String,
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Register a new account
    Register(Credentials),
    /// Verify credentials
    Login(Credentials),
}

#[derive(Subcommand)]
pub enum ProfileOp {
    /// Create or update a student profile from a JSON object
    SaveStudent { email: String, data: String },
    /// Fetch a student profile
    GetStudent { email: String },
    /// Create or update a teacher profile from a JSON object
    SaveTeacher { email: String, data: String },
    /// Fetch a teacher profile
    GetTeacher { email: String },
}

#[derive(Subcommand)]
pub enum ChatOp {
    /// Store a new chat (messages is a JSON array)
    Save { email: String, messages: String },
    /// List a user's chats, newest first
    History { email: String },
    /// Fetch one chat with its messages
    Get { chat_id: String },
    /// Replace a chat's messages
    Update { chat_id: String, messages: String },
    /// Delete a chat
    Delete { chat_id: String },
}

#[derive(Subcommand)]
pub enum ProblemOp {
    /// Add a problem from a JSON object
    Add { data: String },
    /// List all problems, flagging ownership for the given teacher
    List { teacher_email: String },
    /// Update a problem from a JSON object (must contain "id")
    Update { data: String },
    /// Delete a problem
    Delete { problem_id: String },
    /// Link a problem to a chapter
    SetChapter {
        problem_id: String,
        chapter_id: String,
    },
}

#[derive(Subcommand)]
pub enum TeachingOp {
    /// Add a chapter from a JSON object
    Add { data: String },
    /// List all chapters in chapter-number order
    List,
    /// Fetch one chapter
    Get { chapter_id: String },
    /// Update a chapter from a JSON object (must contain "chapter_id")
    Update { data: String },
    /// Delete a chapter
    Delete { chapter_id: String },
}

#[derive(Subcommand)]
pub enum QaOp {
    /// Submit a new question
    Submit {
        email: String,
        title: String,
        content: String,
    },
    /// List one student's questions
    StudentQuestions { email: String },
    /// List every question (teacher view)
    AllQuestions,
    /// Answer a question
    Answer { question_id: String, answer: String },
    /// Withdraw the answer of an answered question
    DeleteAnswer { question_id: String },
}

#[derive(Subcommand)]
pub enum CodingOp {
    /// Record a graded submission (JSON object) and update solving stats
    Submit { data: String },
    /// Per-student solving statistics
    StudentStats { student_id: String },
    /// Per-class statistics and rankings
    ClassStats { class_name: String },
    /// Per-problem statistics
    ProblemStats { problem_id: String },
}

#[derive(Subcommand)]
pub enum StatsOp {
    /// List all known class names
    ClassList,
    /// Learning pattern analytics, optionally scoped to one class
    LearningPatterns { class_name: Option<String> },
}

#[derive(Subcommand)]
pub enum RecommendOp {
    /// Replace a student's unread recommendations with a new batch (JSON array)
    Save { student_id: String, data: String },
    /// List a student's unread recommendations
    List { student_id: String },
    /// Mark one recommendation as read
    MarkRead {
        student_id: String,
        recommendation_id: String,
    },
}

#[derive(Subcommand)]
pub enum AnalysisOp {
    /// Analyze a student's learning behavior with the AI service
    Run { student_id: String },
    /// Persist an analysis result (JSON object with the four fields)
    Save { student_id: String, data: String },
    /// Fetch the most recent analysis for a student
    Latest { student_id: String },
}

#[derive(Subcommand)]
pub enum ProgressOp {
    /// Mark a section as completed
    Save {
        student_id: String,
        section_id: String,
    },
    /// List completed sections
    Completed { student_id: String },
    /// Import a JSON array of completed section ids
    Import { student_id: String, data: String },
}

#[derive(Subcommand)]
pub enum ActivityOp {
    /// Recent submissions and questions, newest first
    Recent { student_id: String },
    /// Per-chapter section completion
    Chapters { student_id: String },
}
