use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use docucollect_core::auth::OAuthProvider;
use docucollect_core::{DocumentId, FileType, NoteId};

#[derive(Parser)]
#[command(name = "docucollect")]
#[command(about = "Keep personal documents and notes in one place")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name (backend project and stored session)
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in, sign up and manage the stored session
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage documents
    #[command(alias = "documents")]
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },
    /// Manage notes
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ProviderArg {
    Github,
    Google,
}

impl From<ProviderArg> for OAuthProvider {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Github => Self::GitHub,
            ProviderArg::Google => Self::Google,
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Site origin used in email and OAuth redirect links
        #[arg(long, value_name = "URL")]
        site_url: Option<String>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Show the resolved profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account (a confirmation email is sent)
    Signup {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Email a password reset link
    Forgot {
        #[arg(long, value_name = "EMAIL")]
        email: String,
    },
    /// Email a one-time sign-in link
    MagicLink {
        #[arg(long, value_name = "EMAIL")]
        email: String,
    },
    /// Print the URL that starts an OAuth sign-in
    Oauth {
        #[arg(value_enum)]
        provider: ProviderArg,
    },
    /// Finish a magic-link, OAuth or recovery sign-in from the redirect URL
    Complete {
        /// Full URL the browser was redirected to
        url: String,
    },
    /// Set a new password for the current (recovery) session
    UpdatePassword {
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for the profile
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum DocsCommands {
    /// List documents, newest first
    List {
        /// Only favorites
        #[arg(long)]
        favorites: bool,
        /// Only this file type (pdf, doc, jpg, png, gif, unknown)
        #[arg(long = "type", value_name = "TYPE")]
        file_type: Option<FileType>,
        /// Case-insensitive name filter
        #[arg(long, value_name = "QUERY")]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload a file or save a link
    Add {
        /// Display name
        #[arg(long)]
        name: String,
        /// File to upload
        #[arg(long, value_name = "PATH", conflicts_with = "link")]
        file: Option<PathBuf>,
        /// External http(s) link
        #[arg(long, value_name = "URL")]
        link: Option<String>,
    },
    /// Delete a document and its uploaded file
    Delete { id: DocumentId },
    /// Toggle the favorite flag
    Favorite { id: DocumentId },
}

#[derive(Subcommand)]
pub enum NotesCommands {
    /// List notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a note
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
    /// Edit a note's title and/or content
    Edit {
        id: NoteId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a note
    Delete { id: NoteId },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the profile, creating it on first use
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the display name (empty clears it)
    Name { name: String },
    /// Upload a new avatar image (max 5 MB)
    Avatar { path: PathBuf },
}
