use bson::doc;
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoExtension;
use crate::error::{PersistError, Result};

#[derive(Clone)]
pub struct MongoExtensionRepository {
    collection: Collection<MongoExtension>,
}

impl MongoExtensionRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("extensions");
        Self { collection }
    }

    /// Insert or replace by id
    pub async fn upsert(&self, extension: &MongoExtension) -> Result<()> {
        self.collection
            .replace_one(doc! { "_id": &extension.id }, extension)
            .upsert(true)
            .await?;
        Ok(())
    }

    pub async fn find_visible(&self, user_id: &str, extension_id: &str) -> Result<Option<MongoExtension>> {
        let filter = doc! {
            "_id": extension_id,
            "$or": [ { "userId": user_id }, { "isPublished": true } ],
        };
        Ok(self.collection.find_one(filter).await?)
    }

    pub async fn list_visible(&self, user_id: &str) -> Result<Vec<MongoExtension>> {
        let filter = doc! { "$or": [ { "userId": user_id }, { "isPublished": true } ] };
        let extensions = self
            .collection
            .find(filter)
            .sort(doc! { "createdAt": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(extensions)
    }

    pub async fn delete(&self, user_id: &str, extension_id: &str) -> Result<()> {
        let result = self
            .collection
            .delete_one(doc! { "_id": extension_id, "userId": user_id })
            .await?;
        if result.deleted_count == 0 {
            return Err(PersistError::ExtensionNotFound(extension_id.to_string()));
        }
        Ok(())
    }
}
