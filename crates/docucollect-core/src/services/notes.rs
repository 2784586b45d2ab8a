//! Notes board: list, create, edit and delete notes for one account.

use super::track;
use crate::db::NoteRepository;
use crate::models::{Account, NewNote, Note, NoteId};
use crate::{Error, Result};

/// Form fields of the note editor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
}

impl NoteDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }

    /// Trimmed title and content, both required
    fn validated(&self) -> Result<(String, String)> {
        let title = self.title.trim();
        let content = self.content.trim();
        if title.is_empty() || content.is_empty() {
            return Err(Error::InvalidInput(
                "Note title and content are required".to_string(),
            ));
        }
        Ok((title.to_string(), content.to_string()))
    }
}

pub struct NotesBoard<R> {
    account: Account,
    repository: R,
    notes: Vec<Note>,
    draft: NoteDraft,
    editing: Option<NoteId>,
    error: Option<String>,
}

impl<R: NoteRepository> NotesBoard<R> {
    pub fn new(account: Account, repository: R) -> Self {
        Self {
            account,
            repository,
            notes: Vec::new(),
            draft: NoteDraft::default(),
            editing: None,
            error: None,
        }
    }

    /// Notes, newest first
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub const fn draft(&self) -> &NoteDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut NoteDraft {
        &mut self.draft
    }

    /// Note currently loaded into the form, if any
    pub const fn editing(&self) -> Option<NoteId> {
        self.editing
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load(&mut self) -> Result<()> {
        let result = self.repository.list_notes(&self.account.id).await;
        let notes = track(&mut self.error, result)?;
        self.notes = notes;
        Ok(())
    }

    /// Load a note's fields into the form. No network call.
    pub fn begin_edit(&mut self, id: NoteId) -> Result<()> {
        let result = self
            .notes
            .iter()
            .find(|note| note.id == id)
            .map(|note| NoteDraft::new(&note.title, &note.content))
            .ok_or_else(|| Error::NotFound(format!("note {id}")));
        let draft = track(&mut self.error, result)?;
        self.draft = draft;
        self.editing = Some(id);
        Ok(())
    }

    /// Leave edit mode and reset the form. No network call.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
        self.draft = NoteDraft::default();
        self.error = None;
    }

    /// Create a note, or update the one being edited.
    pub async fn submit(&mut self) -> Result<Note> {
        let result = self.submit_inner().await;
        track(&mut self.error, result)
    }

    /// Delete an owned note and drop it from the list.
    pub async fn delete(&mut self, id: NoteId) -> Result<()> {
        let result = self.delete_inner(id).await;
        track(&mut self.error, result)
    }

    async fn submit_inner(&mut self) -> Result<Note> {
        let (title, content) = self.draft.validated()?;

        let note = match self.editing {
            Some(id) => {
                let note = self
                    .repository
                    .update_note(&self.account.id, id, &title, &content)
                    .await?;
                if let Some(local) = self.notes.iter_mut().find(|local| local.id == note.id) {
                    *local = note.clone();
                }
                tracing::info!("Updated note {}", note.id);
                note
            }
            None => {
                let note = self
                    .repository
                    .insert_note(&NewNote {
                        title,
                        content,
                        owner_id: self.account.id.clone(),
                    })
                    .await?;
                self.notes.insert(0, note.clone());
                tracing::info!("Created note {}", note.id);
                note
            }
        };

        self.editing = None;
        self.draft = NoteDraft::default();
        Ok(note)
    }

    async fn delete_inner(&mut self, id: NoteId) -> Result<()> {
        let removed = self.repository.delete_note(&self.account.id, id).await?;
        if !removed {
            return Err(Error::NotFound(format!("note {id}")));
        }
        self.notes.retain(|note| note.id != id);
        if self.editing == Some(id) {
            self.editing = None;
            self.draft = NoteDraft::default();
        }
        tracing::info!("Deleted note {id}");
        Ok(())
    }
}
