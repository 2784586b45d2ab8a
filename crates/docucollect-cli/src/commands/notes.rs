use std::io::Write;

use chrono::Utc;
use docucollect_core::db::NoteRepository;
use docucollect_core::gate::Route;
use docucollect_core::services::{NoteDraft, NotesBoard};

use crate::cli::NotesCommands;
use crate::commands::common::{format_note_lines, AppContext, NoteListItem};
use crate::error::CliError;

pub async fn run_notes(
    command: NotesCommands,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let context = AppContext::open(global_profile).await?;
    let account = context.require_account(Route::Home)?;
    let mut board = NotesBoard::new(account, context.repository()?);
    execute_notes(command, &mut board, &mut std::io::stdout()).await
}

pub async fn execute_notes<R: NoteRepository>(
    command: NotesCommands,
    board: &mut NotesBoard<R>,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        NotesCommands::List { json } => {
            board.load().await?;
            if json {
                let items = board
                    .notes()
                    .iter()
                    .map(NoteListItem::from)
                    .collect::<Vec<_>>();
                writeln!(out, "{}", serde_json::to_string_pretty(&items)?)?;
            } else if board.notes().is_empty() {
                writeln!(out, "No notes yet.")?;
            } else {
                for line in format_note_lines(board.notes(), Utc::now()) {
                    writeln!(out, "{line}")?;
                }
            }
        }
        NotesCommands::Add { title, content } => {
            *board.draft_mut() = NoteDraft::new(title, content);
            let note = board.submit().await?;
            writeln!(out, "Created note {}", note.id)?;
        }
        NotesCommands::Edit { id, title, content } => {
            board.load().await?;
            board.begin_edit(id)?;
            let draft = board.draft_mut();
            if let Some(title) = title {
                draft.title = title;
            }
            if let Some(content) = content {
                draft.content = content;
            }
            let note = board.submit().await?;
            writeln!(out, "Updated note {}", note.id)?;
        }
        NotesCommands::Delete { id } => {
            board.delete(id).await?;
            writeln!(out, "Deleted note {id}")?;
        }
    }
    Ok(())
}
