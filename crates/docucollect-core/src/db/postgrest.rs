//! Repository implementations over the hosted row API

use chrono::Utc;
use serde_json::json;

use super::{
    DocumentRepository, NoteRepository, ProfileRepository, DOCUMENTS_TABLE, NOTES_TABLE,
    PROFILES_TABLE,
};
use crate::models::{Document, DocumentId, NewDocument, NewNote, Note, NoteId, Profile};
use crate::rest::{Order, PostgrestClient, TableQuery};
use crate::{Error, Result};

const DOCUMENT_OWNER_COLUMN: &str = "user_id1";
const NOTE_OWNER_COLUMN: &str = "user_id";

/// Row API implementation of every repository trait
#[derive(Clone)]
pub struct PostgrestRepository {
    client: PostgrestClient,
}

impl PostgrestRepository {
    #[must_use]
    pub const fn new(client: PostgrestClient) -> Self {
        Self { client }
    }

    fn owned_document(owner_id: &str, id: DocumentId) -> TableQuery {
        TableQuery::new()
            .eq("id", id)
            .eq(DOCUMENT_OWNER_COLUMN, owner_id)
    }

    fn owned_note(owner_id: &str, id: NoteId) -> TableQuery {
        TableQuery::new().eq("id", id).eq(NOTE_OWNER_COLUMN, owner_id)
    }
}

/// First returned row, or `NotFound` when the filter matched nothing.
fn single_row<T>(rows: Vec<T>, what: &str) -> Result<T> {
    rows.into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(what.to_string()))
}

impl DocumentRepository for PostgrestRepository {
    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let query = TableQuery::new()
            .eq(DOCUMENT_OWNER_COLUMN, owner_id)
            .order("created_at", Order::Descending);
        self.client.select(DOCUMENTS_TABLE, &query).await
    }

    async fn insert_document(&self, document: &NewDocument) -> Result<Document> {
        let rows = self.client.insert(DOCUMENTS_TABLE, document).await?;
        single_row(rows, "inserted document")
    }

    async fn set_favorite(
        &self,
        owner_id: &str,
        id: DocumentId,
        is_favorite: bool,
    ) -> Result<Document> {
        let rows = self
            .client
            .update(
                DOCUMENTS_TABLE,
                &Self::owned_document(owner_id, id),
                &json!({ "is_favorite": is_favorite }),
            )
            .await?;
        single_row(rows, &format!("document {id}"))
    }

    async fn delete_document(&self, owner_id: &str, id: DocumentId) -> Result<bool> {
        let removed = self
            .client
            .delete(DOCUMENTS_TABLE, &Self::owned_document(owner_id, id))
            .await?;
        Ok(removed > 0)
    }
}

impl NoteRepository for PostgrestRepository {
    async fn list_notes(&self, owner_id: &str) -> Result<Vec<Note>> {
        let query = TableQuery::new()
            .eq(NOTE_OWNER_COLUMN, owner_id)
            .order("created_at", Order::Descending);
        self.client.select(NOTES_TABLE, &query).await
    }

    async fn insert_note(&self, note: &NewNote) -> Result<Note> {
        let rows = self.client.insert(NOTES_TABLE, note).await?;
        single_row(rows, "inserted note")
    }

    async fn update_note(
        &self,
        owner_id: &str,
        id: NoteId,
        title: &str,
        content: &str,
    ) -> Result<Note> {
        let rows = self
            .client
            .update(
                NOTES_TABLE,
                &Self::owned_note(owner_id, id),
                &json!({ "title": title, "content": content }),
            )
            .await?;
        single_row(rows, &format!("note {id}"))
    }

    async fn delete_note(&self, owner_id: &str, id: NoteId) -> Result<bool> {
        let removed = self
            .client
            .delete(NOTES_TABLE, &Self::owned_note(owner_id, id))
            .await?;
        Ok(removed > 0)
    }
}

impl ProfileRepository for PostgrestRepository {
    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>> {
        let query = TableQuery::new()
            .columns("id,avatar_url,full_name,updated_at")
            .eq("id", id);
        match self.client.select_single(PROFILES_TABLE, &query).await {
            Ok(profile) => Ok(Some(profile)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_profile(&self, profile: &Profile) -> Result<Profile> {
        let rows = self.client.upsert(PROFILES_TABLE, profile).await?;
        single_row(rows, "created profile")
    }

    async fn update_profile_name(&self, id: &str, full_name: Option<&str>) -> Result<Profile> {
        let rows = self
            .client
            .update(
                PROFILES_TABLE,
                &TableQuery::new().eq("id", id),
                &json!({ "full_name": full_name, "updated_at": Utc::now() }),
            )
            .await?;
        single_row(rows, &format!("profile {id}"))
    }

    async fn upsert_profile_avatar(&self, id: &str, avatar_url: &str) -> Result<Profile> {
        let rows = self
            .client
            .upsert(
                PROFILES_TABLE,
                &json!({ "id": id, "avatar_url": avatar_url, "updated_at": Utc::now() }),
            )
            .await?;
        single_row(rows, &format!("profile {id}"))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn owned_queries_filter_by_id_and_owner() {
        let query = PostgrestRepository::owned_document("user-a", DocumentId(3));
        let pairs = query.to_query_pairs();
        assert!(pairs.contains(&("id".to_string(), "eq.3".to_string())));
        assert!(pairs.contains(&("user_id1".to_string(), "eq.user-a".to_string())));

        let query = PostgrestRepository::owned_note("user-a", NoteId(9));
        let pairs = query.to_query_pairs();
        assert!(pairs.contains(&("user_id".to_string(), "eq.user-a".to_string())));
    }

    #[test]
    fn single_row_reports_missing_rows() {
        assert_eq!(single_row(vec![1, 2], "x").unwrap(), 1);
        assert!(matches!(
            single_row::<i32>(Vec::new(), "note 4"),
            Err(Error::NotFound(what)) if what == "note 4"
        ));
    }
}
