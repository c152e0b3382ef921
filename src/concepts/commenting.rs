//! Comments on posts or on other comments.

use serde::Serialize;

use super::error::{ConceptError, ConceptResult};
use super::store::{Doc, DocCollection, ObjectId};

#[derive(Debug, Clone, Serialize)]
pub struct CommentDoc {
    pub author: ObjectId,
    pub content: String,
    /// A post or another comment.
    pub parent: ObjectId,
}

#[derive(Clone)]
pub struct Commenting {
    comments: DocCollection<CommentDoc>,
}

impl Commenting {
    pub fn new(collection: &'static str) -> Self {
        Self {
            comments: DocCollection::new(collection),
        }
    }

    pub fn create(&self, author: &ObjectId, content: &str, parent: &ObjectId) -> Doc<CommentDoc> {
        self.comments.create_one(CommentDoc {
            author: author.clone(),
            content: content.to_string(),
            parent: parent.clone(),
        })
    }

    pub fn get_comments(&self) -> Vec<Doc<CommentDoc>> {
        self.comments.read_many(|_| true)
    }

    pub fn get_by_author(&self, author: &ObjectId) -> Vec<Doc<CommentDoc>> {
        self.comments.read_many(|c| &c.author == author)
    }

    pub fn get_by_parent(&self, parent: &ObjectId) -> Vec<Doc<CommentDoc>> {
        self.comments.read_many(|c| &c.parent == parent)
    }

    pub fn get_comment(&self, id: &ObjectId) -> ConceptResult<Doc<CommentDoc>> {
        self.comments.read_one(id).ok_or_else(|| not_found(id))
    }

    pub fn update(&self, id: &ObjectId, content: Option<String>) -> ConceptResult<()> {
        self.comments
            .update_one(id, |comment| {
                if let Some(content) = content {
                    comment.content = content;
                }
            })
            .ok_or_else(|| not_found(id))
    }

    /// Delete a comment and its replies.
    pub fn delete(&self, id: &ObjectId) -> ConceptResult<()> {
        self.comments.delete_one(id).ok_or_else(|| not_found(id))?;
        let mut orphans = vec![id.clone()];
        while let Some(parent) = orphans.pop() {
            for reply in self.get_by_parent(&parent) {
                self.comments.delete_one(&reply.id);
                orphans.push(reply.id);
            }
        }
        Ok(())
    }

    pub fn assert_comment_exists(&self, id: &ObjectId) -> ConceptResult<()> {
        self.get_comment(id).map(|_| ())
    }

    pub fn assert_author_is_user(&self, id: &ObjectId, user: &ObjectId) -> ConceptResult<()> {
        let comment = self.get_comment(id)?;
        if &comment.data.author != user {
            return Err(ConceptError::NotAllowed(format!(
                "{user} is not the author of comment {id}!"
            )));
        }
        Ok(())
    }
}

fn not_found(id: &ObjectId) -> ConceptError {
    ConceptError::NotFound(format!("Comment {id} does not exist!"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threads() {
        let commenting = Commenting::new("comments");
        let author = ObjectId::new();
        let post = ObjectId::new();

        let top = commenting.create(&author, "first", &post);
        let reply = commenting.create(&author, "reply", &top.id);
        commenting.create(&author, "nested", &reply.id);

        assert_eq!(commenting.get_by_parent(&post).len(), 1);
        assert_eq!(commenting.get_by_parent(&top.id).len(), 1);

        commenting.delete(&top.id).unwrap();
        assert!(commenting.get_comments().is_empty());
    }

    #[test]
    fn test_update_and_author_check() {
        let commenting = Commenting::new("comments");
        let author = ObjectId::new();
        let comment = commenting.create(&author, "first", &ObjectId::new());

        commenting.update(&comment.id, None).unwrap();
        assert_eq!(commenting.get_comment(&comment.id).unwrap().data.content, "first");
        commenting.update(&comment.id, Some("second".into())).unwrap();
        assert_eq!(commenting.get_comment(&comment.id).unwrap().data.content, "second");

        assert!(matches!(
            commenting.assert_author_is_user(&comment.id, &ObjectId::new()),
            Err(ConceptError::NotAllowed(_))
        ));
    }
}
