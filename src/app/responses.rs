//! Response shaping: user ids become usernames before leaving the server.

use serde::Serialize;
use serde_json::Value;

use crate::concepts::{Authing, ObjectId};
use crate::dispatch::Failure;

/// Serializes concept documents for the wire.
pub struct Responses<'a> {
    authing: &'a Authing,
}

impl<'a> Responses<'a> {
    pub fn new(authing: &'a Authing) -> Self {
        Self { authing }
    }

    /// Posts and comments: `author` becomes a username.
    pub fn authored<T: Serialize>(&self, doc: &T) -> Result<Value, Failure> {
        self.with_usernames(doc, &["author"])
    }

    pub fn authored_all<T: Serialize>(&self, docs: &[T]) -> Result<Value, Failure> {
        self.all(docs, |doc| self.authored(doc))
    }

    /// Groups: `founder` and `members` become usernames.
    pub fn group<T: Serialize>(&self, doc: &T) -> Result<Value, Failure> {
        self.with_usernames(doc, &["founder", "members"])
    }

    pub fn groups<T: Serialize>(&self, docs: &[T]) -> Result<Value, Failure> {
        self.all(docs, |doc| self.group(doc))
    }

    /// Friend requests: `from` and `to` become usernames.
    pub fn friend_requests<T: Serialize>(&self, docs: &[T]) -> Result<Value, Failure> {
        self.all(docs, |doc| self.with_usernames(doc, &["from", "to"]))
    }

    /// Events: `creator`, `attendees` and every voter list become usernames.
    pub fn event<T: Serialize>(&self, doc: &T) -> Result<Value, Failure> {
        let mut value = self.with_usernames(doc, &["creator", "attendees"])?;
        for votes in ["votesOnTimes", "votesOnLocations"] {
            if let Some(Value::Object(options)) = value.get_mut(votes) {
                for voters in options.values_mut() {
                    self.replace_ids(voters);
                }
            }
        }
        Ok(value)
    }

    pub fn events<T: Serialize>(&self, docs: &[T]) -> Result<Value, Failure> {
        self.all(docs, |doc| self.event(doc))
    }

    pub fn usernames(&self, ids: &[ObjectId]) -> Value {
        Value::from(self.authing.ids_to_usernames(ids))
    }

    fn all<T>(
        &self,
        docs: &[T],
        f: impl Fn(&T) -> Result<Value, Failure>,
    ) -> Result<Value, Failure> {
        docs.iter().map(f).collect::<Result<Vec<_>, _>>().map(Value::Array)
    }

    fn with_usernames<T: Serialize>(&self, doc: &T, fields: &[&str]) -> Result<Value, Failure> {
        let mut value = serde_json::to_value(doc)
            .map_err(|e| Failure::internal(format!("failed to serialize document: {e}")))?;
        for field in fields {
            if let Some(slot) = value.get_mut(*field) {
                self.replace_ids(slot);
            }
        }
        Ok(value)
    }

    /// Replace an id, or every id in an array, with its username.
    fn replace_ids(&self, slot: &mut Value) {
        match slot {
            Value::String(id) => {
                if let Ok(id) = ObjectId::parse(id) {
                    *slot = Value::String(self.authing.id_to_username(&id));
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.replace_ids(item)),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concepts::{authing::DELETED_USER, Posting};

    #[test]
    fn test_author_becomes_username() {
        let authing = Authing::new("users");
        let alice = authing.create("alice", "pw").unwrap();
        let posting = Posting::new("posts");
        let post = posting.create(&alice.id, "hello", None);

        let responses = Responses::new(&authing);
        let value = responses.authored(&post).unwrap();
        assert_eq!(value["author"], "alice");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["_id"], post.id.as_str());
    }

    #[test]
    fn test_deleted_user_and_lists() {
        let authing = Authing::new("users");
        let ghost = ObjectId::new();
        let responses = Responses::new(&authing);

        assert_eq!(responses.usernames(&[ghost]), serde_json::json!([DELETED_USER]));
    }
}
