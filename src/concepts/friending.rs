//! Friend requests and friendships.

use serde::Serialize;

use super::error::{ConceptError, ConceptResult};
use super::store::{Doc, DocCollection, ObjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestDoc {
    pub from: ObjectId,
    pub to: ObjectId,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendshipDoc {
    pub user1: ObjectId,
    pub user2: ObjectId,
}

impl FriendshipDoc {
    fn joins(&self, a: &ObjectId, b: &ObjectId) -> bool {
        (&self.user1 == a && &self.user2 == b) || (&self.user1 == b && &self.user2 == a)
    }

    fn other(&self, user: &ObjectId) -> Option<&ObjectId> {
        if &self.user1 == user {
            Some(&self.user2)
        } else if &self.user2 == user {
            Some(&self.user1)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct Friending {
    friends: DocCollection<FriendshipDoc>,
    requests: DocCollection<FriendRequestDoc>,
}

impl Friending {
    pub fn new(collection: &'static str) -> Self {
        Self {
            friends: DocCollection::new(collection),
            requests: DocCollection::new("friendRequests"),
        }
    }

    /// Requests sent or received by `user`, newest first.
    pub fn get_requests(&self, user: &ObjectId) -> Vec<Doc<FriendRequestDoc>> {
        self.requests
            .read_many(|r| &r.from == user || &r.to == user)
    }

    pub fn send_request(&self, from: &ObjectId, to: &ObjectId) -> ConceptResult<()> {
        self.can_send_request(from, to)?;
        self.requests.create_one(FriendRequestDoc {
            from: from.clone(),
            to: to.clone(),
            status: RequestStatus::Pending,
        });
        Ok(())
    }

    pub fn accept_request(&self, from: &ObjectId, to: &ObjectId) -> ConceptResult<()> {
        self.remove_pending_request(from, to)?;
        self.requests.create_one(FriendRequestDoc {
            from: from.clone(),
            to: to.clone(),
            status: RequestStatus::Accepted,
        });
        self.add_friend(from, to);
        Ok(())
    }

    pub fn reject_request(&self, from: &ObjectId, to: &ObjectId) -> ConceptResult<()> {
        self.remove_pending_request(from, to)?;
        self.requests.create_one(FriendRequestDoc {
            from: from.clone(),
            to: to.clone(),
            status: RequestStatus::Rejected,
        });
        Ok(())
    }

    /// Withdraw a pending request.
    pub fn remove_request(&self, from: &ObjectId, to: &ObjectId) -> ConceptResult<()> {
        self.remove_pending_request(from, to)
    }

    pub fn remove_friend(&self, user: &ObjectId, friend: &ObjectId) -> ConceptResult<()> {
        if self.friends.delete_many(|f| f.joins(user, friend)) == 0 {
            return Err(ConceptError::NotFound(format!(
                "Friendship between {user} and {friend} does not exist!"
            )));
        }
        Ok(())
    }

    pub fn get_friends(&self, user: &ObjectId) -> Vec<ObjectId> {
        self.friends
            .read_many(|f| f.other(user).is_some())
            .into_iter()
            .filter_map(|f| f.data.other(user).cloned())
            .collect()
    }

    pub fn are_friends(&self, a: &ObjectId, b: &ObjectId) -> bool {
        self.friends.find_one(|f| f.joins(a, b)).is_some()
    }

    fn add_friend(&self, a: &ObjectId, b: &ObjectId) {
        self.friends.create_one(FriendshipDoc {
            user1: a.clone(),
            user2: b.clone(),
        });
    }

    fn remove_pending_request(&self, from: &ObjectId, to: &ObjectId) -> ConceptResult<()> {
        let removed = self.requests.delete_many(|r| {
            &r.from == from && &r.to == to && r.status == RequestStatus::Pending
        });
        if removed == 0 {
            return Err(ConceptError::NotFound(format!(
                "Friend request from {from} to {to} does not exist!"
            )));
        }
        Ok(())
    }

    fn can_send_request(&self, from: &ObjectId, to: &ObjectId) -> ConceptResult<()> {
        if from == to {
            return Err(ConceptError::NotAllowed(
                "Cannot send a friend request to yourself!".into(),
            ));
        }
        if self.are_friends(from, to) {
            return Err(ConceptError::AlreadyExists(format!(
                "{from} and {to} are already friends!"
            )));
        }
        let pending = self.requests.find_one(|r| {
            r.status == RequestStatus::Pending
                && ((&r.from == from && &r.to == to) || (&r.from == to && &r.to == from))
        });
        if pending.is_some() {
            return Err(ConceptError::AlreadyExists(format!(
                "Friend request between {from} and {to} already exists!"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accept_unfriend() {
        let friending = Friending::new("friends");
        let (a, b) = (ObjectId::new(), ObjectId::new());

        friending.send_request(&a, &b).unwrap();
        assert!(matches!(
            friending.send_request(&b, &a),
            Err(ConceptError::AlreadyExists(_))
        ));
        assert_eq!(friending.get_requests(&b).len(), 1);

        friending.accept_request(&a, &b).unwrap();
        assert!(friending.are_friends(&b, &a));
        assert_eq!(friending.get_friends(&a), vec![b.clone()]);
        assert_eq!(friending.get_requests(&a)[0].data.status, RequestStatus::Accepted);
        assert!(matches!(
            friending.send_request(&a, &b),
            Err(ConceptError::AlreadyExists(_))
        ));

        friending.remove_friend(&b, &a).unwrap();
        assert!(friending.get_friends(&a).is_empty());
        assert!(friending.remove_friend(&a, &b).is_err());
    }

    #[test]
    fn test_reject_and_withdraw() {
        let friending = Friending::new("friends");
        let (a, b) = (ObjectId::new(), ObjectId::new());

        assert!(friending.send_request(&a, &a).is_err());
        assert!(friending.accept_request(&a, &b).is_err());

        friending.send_request(&a, &b).unwrap();
        friending.reject_request(&a, &b).unwrap();
        assert!(!friending.are_friends(&a, &b));

        friending.send_request(&a, &b).unwrap();
        friending.remove_request(&a, &b).unwrap();
        assert!(friending.remove_request(&a, &b).is_err());
    }
}
