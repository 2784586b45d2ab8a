use std::io::Write;

use chrono::Utc;
use docucollect_core::db::DocumentRepository;
use docucollect_core::gate::Route;
use docucollect_core::services::{AddDocument, DocumentCollection, DocumentFilter};
use docucollect_core::storage::ObjectStorage;

use crate::cli::DocsCommands;
use crate::commands::common::{format_document_lines, read_upload, AppContext, DocumentListItem};
use crate::error::CliError;

pub async fn run_docs(command: DocsCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    let context = AppContext::open(global_profile).await?;
    let account = context.require_account(Route::Home)?;
    let mut documents = DocumentCollection::new(account, context.repository()?, context.storage()?);
    execute_docs(command, &mut documents, &mut std::io::stdout()).await
}

pub async fn execute_docs<R, S>(
    command: DocsCommands,
    documents: &mut DocumentCollection<R, S>,
    out: &mut impl Write,
) -> Result<(), CliError>
where
    R: DocumentRepository,
    S: ObjectStorage,
{
    match command {
        DocsCommands::List {
            favorites,
            file_type,
            search,
            json,
        } => {
            documents.load().await?;
            let filter = DocumentFilter {
                favorites_only: favorites,
                file_type,
                query: search,
            };
            let matches = documents.filtered(&filter);
            if json {
                let items = matches
                    .iter()
                    .map(|document| DocumentListItem::from(*document))
                    .collect::<Vec<_>>();
                writeln!(out, "{}", serde_json::to_string_pretty(&items)?)?;
            } else if matches.is_empty() {
                writeln!(out, "No documents found.")?;
            } else {
                for line in format_document_lines(&matches, Utc::now()) {
                    writeln!(out, "{line}")?;
                }
            }
        }
        DocsCommands::Add { name, file, link } => {
            let file = file.as_deref().map(read_upload).transpose()?;
            let document = documents.add(AddDocument { name, file, link }).await?;
            writeln!(
                out,
                "Added document {} ({}): {}",
                document.id, document.file_type, document.file_url
            )?;
        }
        DocsCommands::Delete { id } => {
            documents.load().await?;
            documents.delete(id).await?;
            writeln!(out, "Deleted document {id}")?;
        }
        DocsCommands::Favorite { id } => {
            documents.load().await?;
            let is_favorite = documents.toggle_favorite(id).await?;
            let state = if is_favorite { "added to" } else { "removed from" };
            writeln!(out, "Document {id} {state} favorites")?;
        }
    }
    Ok(())
}
