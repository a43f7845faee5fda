use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::{MongoDocument, MongoDocumentChunk};
use crate::error::Result;

/// Documents and their embedded chunks
#[derive(Clone)]
pub struct MongoDocumentRepository {
    documents: Collection<MongoDocument>,
    chunks: Collection<MongoDocumentChunk>,
}

impl MongoDocumentRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let database = client.database(db_name);
        Self {
            documents: database.collection("documents"),
            chunks: database.collection("document_chunks"),
        }
    }

    pub async fn insert(&self, document: &MongoDocument) -> Result<()> {
        self.documents.insert_one(document).await?;
        Ok(())
    }

    pub async fn insert_chunks(&self, chunks: &[MongoDocumentChunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.chunks.insert_many(chunks).await?;
        Ok(())
    }

    pub async fn list_for_thread(&self, user_id: &str, thread_id: &str) -> Result<Vec<MongoDocument>> {
        let filter = doc! { "userId": user_id, "threadId": thread_id, "isDeleted": { "$ne": true } };
        let documents = self
            .documents
            .find(filter)
            .sort(doc! { "createdAt": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(documents)
    }

    pub async fn chunks_for_thread(&self, user_id: &str, thread_id: &str) -> Result<Vec<MongoDocumentChunk>> {
        let filter = doc! { "userId": user_id, "threadId": thread_id, "isDeleted": { "$ne": true } };
        let chunks = self
            .chunks
            .find(filter)
            .sort(doc! { "chunkIndex": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(chunks)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<MongoDocument>> {
        let filter = doc! { "userId": user_id, "isDeleted": { "$ne": true } };
        let documents = self
            .documents
            .find(filter)
            .sort(doc! { "createdAt": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(documents)
    }

    pub async fn soft_delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let filter = doc! { "userId": user_id, "threadId": thread_id };
        let update = doc! { "$set": { "isDeleted": true } };
        self.documents.update_many(filter.clone(), update.clone()).await?;
        self.chunks.update_many(filter, update).await?;
        Ok(())
    }
}
