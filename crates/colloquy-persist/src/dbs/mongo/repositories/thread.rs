use bson::doc;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoThread;
use crate::error::{PersistError, Result};

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    pub async fn insert(&self, thread: &MongoThread) -> Result<()> {
        self.collection.insert_one(thread).await?;
        Ok(())
    }

    pub async fn find(&self, user_id: &str, thread_id: &str) -> Result<Option<MongoThread>> {
        let filter = doc! { "_id": thread_id, "userId": user_id, "isDeleted": { "$ne": true } };
        Ok(self.collection.find_one(filter).await?)
    }

    /// Live threads of a user, most recent activity first
    pub async fn list(&self, user_id: &str) -> Result<Vec<MongoThread>> {
        let filter = doc! { "userId": user_id, "isDeleted": { "$ne": true } };
        let threads = self
            .collection
            .find(filter)
            .sort(doc! { "lastMessageAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    pub async fn replace(&self, thread: &MongoThread) -> Result<()> {
        let filter = doc! { "_id": &thread.id, "userId": &thread.user_id };
        let result = self.collection.replace_one(filter, thread).await?;
        if result.matched_count == 0 {
            return Err(PersistError::ThreadNotFound(thread.id.clone()));
        }
        Ok(())
    }

    pub async fn touch(&self, user_id: &str, thread_id: &str, at: DateTime<Utc>) -> Result<()> {
        let filter = doc! { "_id": thread_id, "userId": user_id };
        let update = doc! {
            "$set": { "lastMessageAt": bson::DateTime::from_millis(at.timestamp_millis()) }
        };
        self.collection.update_one(filter, update).await?;
        Ok(())
    }

    pub async fn soft_delete(&self, user_id: &str, thread_id: &str) -> Result<()> {
        let filter = doc! { "_id": thread_id, "userId": user_id };
        self.collection
            .update_one(filter, doc! { "$set": { "isDeleted": true } })
            .await?;
        Ok(())
    }
}
