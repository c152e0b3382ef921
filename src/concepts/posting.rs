//! Posts authored by users.

use serde::{Deserialize, Serialize};

use super::error::{ConceptError, ConceptResult};
use super::store::{Doc, DocCollection, ObjectId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDoc {
    pub author: ObjectId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<PostOptions>,
}

#[derive(Clone)]
pub struct Posting {
    posts: DocCollection<PostDoc>,
}

impl Posting {
    pub fn new(collection: &'static str) -> Self {
        Self {
            posts: DocCollection::new(collection),
        }
    }

    pub fn create(
        &self,
        author: &ObjectId,
        content: &str,
        options: Option<PostOptions>,
    ) -> Doc<PostDoc> {
        self.posts.create_one(PostDoc {
            author: author.clone(),
            content: content.to_string(),
            options,
        })
    }

    pub fn get_posts(&self) -> Vec<Doc<PostDoc>> {
        self.posts.read_many(|_| true)
    }

    pub fn get_by_author(&self, author: &ObjectId) -> Vec<Doc<PostDoc>> {
        self.posts.read_many(|p| &p.author == author)
    }

    pub fn get_post(&self, id: &ObjectId) -> ConceptResult<Doc<PostDoc>> {
        self.posts.read_one(id).ok_or_else(|| not_found(id))
    }

    /// Overwrite only the fields that were provided.
    pub fn update(
        &self,
        id: &ObjectId,
        content: Option<String>,
        options: Option<PostOptions>,
    ) -> ConceptResult<()> {
        self.posts
            .update_one(id, |post| {
                if let Some(content) = content {
                    post.content = content;
                }
                if let Some(options) = options {
                    post.options = Some(options);
                }
            })
            .ok_or_else(|| not_found(id))
    }

    pub fn delete(&self, id: &ObjectId) -> ConceptResult<()> {
        self.posts.delete_one(id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    pub fn assert_post_exists(&self, id: &ObjectId) -> ConceptResult<()> {
        self.get_post(id).map(|_| ())
    }

    pub fn assert_author_is_user(&self, id: &ObjectId, user: &ObjectId) -> ConceptResult<()> {
        let post = self.get_post(id)?;
        if &post.data.author != user {
            return Err(ConceptError::NotAllowed(format!(
                "{user} is not the author of post {id}!"
            )));
        }
        Ok(())
    }
}

fn not_found(id: &ObjectId) -> ConceptError {
    ConceptError::NotFound(format!("Post {id} does not exist!"))
}
