use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn insert(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    /// Messages of a thread, oldest first
    pub async fn list_for_thread(&self, user_id: &str, thread_id: &str) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "userId": user_id, "threadId": thread_id, "isDeleted": { "$ne": true } };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    /// The `limit` newest messages of a thread, newest first
    pub async fn recent(&self, user_id: &str, thread_id: &str, limit: usize) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "userId": user_id, "threadId": thread_id, "isDeleted": { "$ne": true } };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<MongoMessage>> {
        let filter = doc! { "userId": user_id, "isDeleted": { "$ne": true } };
        let messages = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn soft_delete_thread(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let filter = doc! { "userId": user_id, "threadId": thread_id };
        self.collection
            .update_many(filter, doc! { "$set": { "isDeleted": true } })
            .await?;
        Ok(())
    }
}
