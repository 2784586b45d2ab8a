use std::io::Write;

use docucollect_core::db::{DocumentRepository, NoteRepository};
use docucollect_core::gate::{Route, SessionGate, View, WorkspaceTab};
use docucollect_core::Account;

use crate::commands::common::AppContext;
use crate::error::CliError;

const LANDING: &str = "DocuCollect keeps your documents and notes in one place.

  docucollect auth signup --email <email> --password <password>
  docucollect auth login --email <email> --password <password>
  docucollect auth magic-link --email <email>";

/// Bare `docucollect`: the landing text, or a summary of the workspace.
pub async fn run_home(global_profile: Option<&str>) -> Result<(), CliError> {
    let mut out = std::io::stdout();
    let context = match AppContext::open(global_profile).await {
        Ok(context) => context,
        Err(CliError::Config(message)) => {
            writeln!(out, "{LANDING}")?;
            writeln!(out)?;
            writeln!(out, "{message}")?;
            return Ok(());
        }
        Err(error) => return Err(error),
    };

    match SessionGate::resolve(Route::Home, context.session().as_ref()) {
        View::Workspace(account) => {
            let repository = context.repository()?;
            write_workspace(&account, &repository, &mut out).await
        }
        _ => {
            writeln!(out, "{LANDING}")?;
            if context.session().is_some() {
                writeln!(out)?;
                writeln!(
                    out,
                    "Confirm your email address, then sign in again to open your workspace."
                )?;
            }
            Ok(())
        }
    }
}

pub async fn write_workspace<R>(
    account: &Account,
    repository: &R,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    R: DocumentRepository + NoteRepository,
{
    let documents = repository.list_documents(&account.id).await?;
    let notes = repository.list_notes(&account.id).await?;
    let favorites = documents.iter().filter(|document| document.is_favorite).count();

    writeln!(
        out,
        "Signed in as {}",
        account.email.as_deref().unwrap_or(&account.id)
    )?;
    writeln!(
        out,
        "{}: {} ({favorites} favorite)",
        WorkspaceTab::Documents.label(),
        documents.len()
    )?;
    writeln!(out, "{}: {}", WorkspaceTab::Notes.label(), notes.len())?;
    Ok(())
}
