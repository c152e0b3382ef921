//! Communities that members join and share content in.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;

use super::error::{ConceptError, ConceptResult};
use super::store::{Doc, DocCollection, ObjectId};

#[derive(Debug, Clone, Serialize)]
pub struct GroupDoc {
    pub name: String,
    pub founder: ObjectId,
    pub members: Vec<ObjectId>,
    pub content: Vec<ObjectId>,
}

impl GroupDoc {
    fn is_member(&self, user: &ObjectId) -> bool {
        self.members.contains(user)
    }
}

#[derive(Clone)]
pub struct Grouping {
    groups: DocCollection<GroupDoc>,
    by_name: Arc<DashMap<String, ObjectId>>,
}

impl Grouping {
    pub fn new(collection: &'static str) -> Self {
        Self {
            groups: DocCollection::new(collection),
            by_name: Arc::new(DashMap::new()),
        }
    }

    /// Found a group; the founder is its first member.
    pub fn create(&self, name: &str, founder: &ObjectId) -> ConceptResult<Doc<GroupDoc>> {
        if name.is_empty() {
            return Err(ConceptError::BadValues("Group name must be non-empty!".into()));
        }
        match self.by_name.entry(name.to_string()) {
            Entry::Occupied(_) => {
                return Err(ConceptError::AlreadyExists(format!(
                    "Group {name} already exists!"
                )))
            }
            Entry::Vacant(slot) => {
                let group = self.groups.create_one(GroupDoc {
                    name: name.to_string(),
                    founder: founder.clone(),
                    members: vec![founder.clone()],
                    content: Vec::new(),
                });
                slot.insert(group.id.clone());
                Ok(group)
            }
        }
    }

    pub fn get_communities(&self) -> Vec<Doc<GroupDoc>> {
        self.groups.read_many(|_| true)
    }

    pub fn get_by_founder(&self, founder: &ObjectId) -> Vec<Doc<GroupDoc>> {
        self.groups.read_many(|g| &g.founder == founder)
    }

    pub fn get_by_membership(&self, user: &ObjectId) -> Vec<Doc<GroupDoc>> {
        self.groups.read_many(|g| g.is_member(user))
    }

    pub fn get_group(&self, id: &ObjectId) -> ConceptResult<Doc<GroupDoc>> {
        self.groups.read_one(id).ok_or_else(|| not_found(id))
    }

    pub fn join_community(&self, user: &ObjectId, id: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |group| {
            if group.is_member(user) {
                return Err(ConceptError::AlreadyExists(format!(
                    "{user} is already a member of group {id}!"
                )));
            }
            group.members.push(user.clone());
            Ok(())
        })
    }

    pub fn leave_community(&self, user: &ObjectId, id: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |group| {
            if &group.founder == user {
                return Err(ConceptError::NotAllowed(format!(
                    "The founder cannot leave group {id}!"
                )));
            }
            if !group.is_member(user) {
                return Err(not_member(user, id));
            }
            group.members.retain(|m| m != user);
            Ok(())
        })
    }

    /// Share content with a group. Adding the same content twice is a no-op.
    pub fn add_content(&self, user: &ObjectId, id: &ObjectId, content: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |group| {
            if !group.is_member(user) {
                return Err(not_member(user, id));
            }
            if !group.content.contains(content) {
                group.content.push(content.clone());
            }
            Ok(())
        })
    }

    pub fn remove_content(
        &self,
        user: &ObjectId,
        id: &ObjectId,
        content: &ObjectId,
    ) -> ConceptResult<()> {
        self.modify(id, |group| {
            if !group.is_member(user) {
                return Err(not_member(user, id));
            }
            let before = group.content.len();
            group.content.retain(|c| c != content);
            if group.content.len() == before {
                return Err(ConceptError::NotFound(format!(
                    "Content {content} is not in group {id}!"
                )));
            }
            Ok(())
        })
    }

    pub fn assert_user_is_founder(&self, user: &ObjectId, id: &ObjectId) -> ConceptResult<()> {
        let group = self.get_group(id)?;
        if &group.data.founder != user {
            return Err(ConceptError::NotAllowed(format!(
                "{user} is not the founder of group {id}!"
            )));
        }
        Ok(())
    }

    pub fn assert_group_exists(&self, id: &ObjectId) -> ConceptResult<()> {
        self.get_group(id).map(|_| ())
    }

    pub fn delete_community(&self, user: &ObjectId, id: &ObjectId) -> ConceptResult<()> {
        self.assert_user_is_founder(user, id)?;
        if let Some(group) = self.groups.delete_one(id) {
            self.by_name.remove(&group.data.name);
        }
        Ok(())
    }

    fn modify(
        &self,
        id: &ObjectId,
        f: impl FnOnce(&mut GroupDoc) -> ConceptResult<()>,
    ) -> ConceptResult<()> {
        self.groups.update_one(id, f).ok_or_else(|| not_found(id))?
    }
}

fn not_found(id: &ObjectId) -> ConceptError {
    ConceptError::NotFound(format!("Group {id} does not exist!"))
}

fn not_member(user: &ObjectId, id: &ObjectId) -> ConceptError {
    ConceptError::NotAllowed(format!("{user} is not a member of group {id}!"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership() {
        let grouping = Grouping::new("groups");
        let (founder, member) = (ObjectId::new(), ObjectId::new());
        let group = grouping.create("rustaceans", &founder).unwrap();

        assert!(matches!(
            grouping.create("rustaceans", &member),
            Err(ConceptError::AlreadyExists(_))
        ));

        grouping.join_community(&member, &group.id).unwrap();
        assert!(grouping.join_community(&member, &group.id).is_err());
        assert_eq!(grouping.get_by_membership(&member).len(), 1);

        assert!(matches!(
            grouping.leave_community(&founder, &group.id),
            Err(ConceptError::NotAllowed(_))
        ));
        grouping.leave_community(&member, &group.id).unwrap();
        assert!(grouping.get_by_membership(&member).is_empty());
    }

    #[test]
    fn test_content_requires_membership() {
        let grouping = Grouping::new("groups");
        let (founder, outsider) = (ObjectId::new(), ObjectId::new());
        let group = grouping.create("g", &founder).unwrap();
        let post = ObjectId::new();

        assert!(matches!(
            grouping.add_content(&outsider, &group.id, &post),
            Err(ConceptError::NotAllowed(_))
        ));
        grouping.add_content(&founder, &group.id, &post).unwrap();
        grouping.add_content(&founder, &group.id, &post).unwrap();
        assert_eq!(grouping.get_group(&group.id).unwrap().data.content.len(), 1);

        grouping.remove_content(&founder, &group.id, &post).unwrap();
        assert!(grouping.remove_content(&founder, &group.id, &post).is_err());
    }

    #[test]
    fn test_delete_is_founder_only() {
        let grouping = Grouping::new("groups");
        let (founder, other) = (ObjectId::new(), ObjectId::new());
        let group = grouping.create("g", &founder).unwrap();

        assert!(grouping.delete_community(&other, &group.id).is_err());
        grouping.delete_community(&founder, &group.id).unwrap();
        assert!(grouping.get_group(&group.id).is_err());
        assert!(grouping.create("g", &other).is_ok());
    }
}
