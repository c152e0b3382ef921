//! Group events with proposed times and locations put to a vote.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use super::error::{ConceptError, ConceptResult};
use super::store::{Doc, DocCollection, ObjectId};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDoc {
    pub creator: ObjectId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<ObjectId>,
    pub time: DateTime<Utc>,
    pub location: String,
    pub attendees: Vec<ObjectId>,
    pub possible_times: Vec<DateTime<Utc>>,
    pub possible_locations: Vec<String>,
    /// Keyed by RFC 3339 time.
    pub votes_on_times: BTreeMap<String, Vec<ObjectId>>,
    pub votes_on_locations: BTreeMap<String, Vec<ObjectId>>,
}

/// What one user voted for on an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserVotes {
    pub times: Vec<String>,
    pub locations: Vec<String>,
}

/// The winning options, if anyone voted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestOptions {
    pub best_time: Option<String>,
    pub best_location: Option<String>,
}

/// Canonical key for a time: UTC, second precision.
pub fn time_key(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_time(s: &str) -> ConceptResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ConceptError::BadValues(format!("{s} is not a valid RFC 3339 time!")))
}

#[derive(Clone)]
pub struct Scheduling {
    events: DocCollection<EventDoc>,
}

impl Scheduling {
    pub fn new(collection: &'static str) -> Self {
        Self {
            events: DocCollection::new(collection),
        }
    }

    /// The creator attends, and the initial time and location are the first proposals.
    pub fn create_event(
        &self,
        creator: &ObjectId,
        name: &str,
        group: Option<ObjectId>,
        time: DateTime<Utc>,
        location: &str,
    ) -> Doc<EventDoc> {
        self.events.create_one(EventDoc {
            creator: creator.clone(),
            name: name.to_string(),
            group,
            time,
            location: location.to_string(),
            attendees: vec![creator.clone()],
            possible_times: vec![time],
            possible_locations: vec![location.to_string()],
            votes_on_times: BTreeMap::new(),
            votes_on_locations: BTreeMap::new(),
        })
    }

    /// All events, soonest first.
    pub fn get_events(&self) -> Vec<Doc<EventDoc>> {
        let mut events = self.events.read_many(|_| true);
        events.sort_by_key(|e| e.data.time);
        events
    }

    pub fn get_by_group(&self, group: &ObjectId) -> Vec<Doc<EventDoc>> {
        let mut events = self.events.read_many(|e| e.group.as_ref() == Some(group));
        events.sort_by_key(|e| e.data.time);
        events
    }

    pub fn get_event(&self, id: &ObjectId) -> ConceptResult<Doc<EventDoc>> {
        self.events.read_one(id).ok_or_else(|| not_found(id))
    }

    pub fn delete_event(&self, id: &ObjectId) -> ConceptResult<()> {
        self.events.delete_one(id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    pub fn assert_creator_is_user(&self, id: &ObjectId, user: &ObjectId) -> ConceptResult<()> {
        let event = self.get_event(id)?;
        if &event.data.creator != user {
            return Err(ConceptError::NotAllowed(format!(
                "{user} is not the creator of event {id}!"
            )));
        }
        Ok(())
    }

    pub fn update_name(&self, id: &ObjectId, name: &str) -> ConceptResult<()> {
        self.modify(id, |event| {
            event.name = name.to_string();
            Ok(())
        })
    }

    pub fn add_attendee(&self, id: &ObjectId, user: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |event| {
            add_to_set(&mut event.attendees, user.clone());
            Ok(())
        })
    }

    /// Leaving also withdraws the user's votes.
    pub fn remove_attendee(&self, id: &ObjectId, user: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |event| {
            if !event.attendees.contains(user) {
                return Err(ConceptError::NotFound(format!(
                    "{user} is not attending event {id}!"
                )));
            }
            event.attendees.retain(|a| a != user);
            for voters in event
                .votes_on_times
                .values_mut()
                .chain(event.votes_on_locations.values_mut())
            {
                voters.retain(|v| v != user);
            }
            Ok(())
        })
    }

    pub fn get_attendees(&self, id: &ObjectId) -> ConceptResult<Vec<ObjectId>> {
        Ok(self.get_event(id)?.data.attendees)
    }

    pub fn add_possible_time(&self, id: &ObjectId, time: DateTime<Utc>) -> ConceptResult<()> {
        self.modify(id, |event| {
            add_to_set(&mut event.possible_times, time);
            Ok(())
        })
    }

    pub fn remove_possible_time(&self, id: &ObjectId, time: DateTime<Utc>) -> ConceptResult<()> {
        self.modify(id, |event| {
            event.possible_times.retain(|t| *t != time);
            event.votes_on_times.remove(&time_key(&time));
            Ok(())
        })
    }

    pub fn add_possible_location(&self, id: &ObjectId, location: &str) -> ConceptResult<()> {
        self.modify(id, |event| {
            add_to_set(&mut event.possible_locations, location.to_string());
            Ok(())
        })
    }

    pub fn remove_possible_location(&self, id: &ObjectId, location: &str) -> ConceptResult<()> {
        self.modify(id, |event| {
            event.possible_locations.retain(|l| l != location);
            event.votes_on_locations.remove(location);
            Ok(())
        })
    }

    pub fn vote_on_time(&self, id: &ObjectId, time: DateTime<Utc>, user: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |event| {
            if !event.possible_times.contains(&time) {
                return Err(not_proposed(&time_key(&time), id));
            }
            add_to_set(
                event.votes_on_times.entry(time_key(&time)).or_default(),
                user.clone(),
            );
            Ok(())
        })
    }

    pub fn vote_on_location(&self, id: &ObjectId, location: &str, user: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |event| {
            if !event.possible_locations.iter().any(|l| l == location) {
                return Err(not_proposed(location, id));
            }
            add_to_set(
                event.votes_on_locations.entry(location.to_string()).or_default(),
                user.clone(),
            );
            Ok(())
        })
    }

    pub fn unvote_on_time(&self, id: &ObjectId, time: DateTime<Utc>, user: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |event| {
            if let Some(voters) = event.votes_on_times.get_mut(&time_key(&time)) {
                voters.retain(|v| v != user);
            }
            Ok(())
        })
    }

    pub fn unvote_on_location(&self, id: &ObjectId, location: &str, user: &ObjectId) -> ConceptResult<()> {
        self.modify(id, |event| {
            if let Some(voters) = event.votes_on_locations.get_mut(location) {
                voters.retain(|v| v != user);
            }
            Ok(())
        })
    }

    pub fn get_user_votes(&self, id: &ObjectId, user: &ObjectId) -> ConceptResult<UserVotes> {
        let event = self.get_event(id)?.data;
        let voted = |votes: &BTreeMap<String, Vec<ObjectId>>| -> Vec<String> {
            votes
                .iter()
                .filter(|(_, voters)| voters.contains(user))
                .map(|(option, _)| option.clone())
                .collect()
        };
        Ok(UserVotes {
            times: voted(&event.votes_on_times),
            locations: voted(&event.votes_on_locations),
        })
    }

    /// Most-voted time and location. Ties go to the earlier proposal.
    pub fn calculate_best(&self, id: &ObjectId) -> ConceptResult<BestOptions> {
        let event = self.get_event(id)?.data;
        let times: Vec<String> = event.possible_times.iter().map(time_key).collect();
        Ok(BestOptions {
            best_time: most_voted(&times, &event.votes_on_times),
            best_location: most_voted(&event.possible_locations, &event.votes_on_locations),
        })
    }

    pub fn set_time(&self, id: &ObjectId, time: DateTime<Utc>) -> ConceptResult<()> {
        self.modify(id, |event| {
            event.time = time;
            add_to_set(&mut event.possible_times, time);
            Ok(())
        })
    }

    pub fn set_location(&self, id: &ObjectId, location: &str) -> ConceptResult<()> {
        self.modify(id, |event| {
            event.location = location.to_string();
            add_to_set(&mut event.possible_locations, location.to_string());
            Ok(())
        })
    }

    fn modify(
        &self,
        id: &ObjectId,
        f: impl FnOnce(&mut EventDoc) -> ConceptResult<()>,
    ) -> ConceptResult<()> {
        self.events.update_one(id, f).ok_or_else(|| not_found(id))?
    }
}

fn add_to_set<T: PartialEq>(set: &mut Vec<T>, item: T) {
    if !set.contains(&item) {
        set.push(item);
    }
}

fn most_voted(options: &[String], votes: &BTreeMap<String, Vec<ObjectId>>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for option in options {
        let count = votes.get(option).map_or(0, Vec::len);
        if count > 0 && best.map_or(true, |(_, n)| count > n) {
            best = Some((option, count));
        }
    }
    best.map(|(option, _)| option.clone())
}

fn not_found(id: &ObjectId) -> ConceptError {
    ConceptError::NotFound(format!("Event {id} does not exist!"))
}

fn not_proposed(option: &str, id: &ObjectId) -> ConceptError {
    ConceptError::BadValues(format!("{option} is not proposed for event {id}!"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        parse_time(s).unwrap()
    }

    #[test]
    fn test_create_event_seeds_proposals() {
        let scheduling = Scheduling::new("events");
        let creator = ObjectId::new();
        let event = scheduling.create_event(&creator, "Study", None, at("2024-05-01T18:00:00Z"), "Library");

        assert_eq!(event.data.attendees, vec![creator]);
        assert_eq!(event.data.possible_times.len(), 1);
        assert_eq!(event.data.possible_locations, vec!["Library".to_string()]);
    }

    #[test]
    fn test_votes_and_best_options() {
        let scheduling = Scheduling::new("events");
        let (a, b, c) = (ObjectId::new(), ObjectId::new(), ObjectId::new());
        let first = at("2024-05-01T18:00:00Z");
        let second = at("2024-05-02T18:00:00+00:00");
        let event = scheduling.create_event(&a, "Study", None, first, "Library");
        let id = event.id;

        assert_eq!(scheduling.calculate_best(&id).unwrap(), BestOptions::default());

        scheduling.add_possible_time(&id, second).unwrap();
        scheduling.add_possible_location(&id, "Cafe").unwrap();
        assert!(matches!(
            scheduling.vote_on_location(&id, "Park", &a),
            Err(ConceptError::BadValues(_))
        ));

        scheduling.vote_on_time(&id, first, &a).unwrap();
        scheduling.vote_on_time(&id, second, &b).unwrap();
        scheduling.vote_on_time(&id, second, &c).unwrap();
        scheduling.vote_on_time(&id, second, &c).unwrap();
        scheduling.vote_on_location(&id, "Cafe", &b).unwrap();

        let best = scheduling.calculate_best(&id).unwrap();
        assert_eq!(best.best_time.as_deref(), Some("2024-05-02T18:00:00Z"));
        assert_eq!(best.best_location.as_deref(), Some("Cafe"));

        scheduling.unvote_on_time(&id, second, &b).unwrap();
        scheduling.unvote_on_time(&id, second, &c).unwrap();
        let best = scheduling.calculate_best(&id).unwrap();
        assert_eq!(best.best_time.as_deref(), Some("2024-05-01T18:00:00Z"));

        let votes = scheduling.get_user_votes(&id, &b).unwrap();
        assert!(votes.times.is_empty());
        assert_eq!(votes.locations, vec!["Cafe".to_string()]);
    }

    #[test]
    fn test_ties_go_to_earlier_proposal() {
        let scheduling = Scheduling::new("events");
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let event = scheduling.create_event(&a, "Study", None, at("2024-05-01T18:00:00Z"), "Library");
        scheduling.add_possible_location(&event.id, "Cafe").unwrap();
        scheduling.vote_on_location(&event.id, "Cafe", &a).unwrap();
        scheduling.vote_on_location(&event.id, "Library", &b).unwrap();

        let best = scheduling.calculate_best(&event.id).unwrap();
        assert_eq!(best.best_location.as_deref(), Some("Library"));
    }

    #[test]
    fn test_leaving_withdraws_votes() {
        let scheduling = Scheduling::new("events");
        let (a, b) = (ObjectId::new(), ObjectId::new());
        let event = scheduling.create_event(&a, "Study", None, at("2024-05-01T18:00:00Z"), "Library");

        scheduling.add_attendee(&event.id, &b).unwrap();
        scheduling.vote_on_location(&event.id, "Library", &b).unwrap();
        scheduling.remove_attendee(&event.id, &b).unwrap();

        assert_eq!(scheduling.get_attendees(&event.id).unwrap(), vec![a]);
        assert_eq!(scheduling.get_user_votes(&event.id, &b).unwrap(), UserVotes::default());
        assert!(scheduling.remove_attendee(&event.id, &b).is_err());
    }

    #[test]
    fn test_events_sorted_by_time() {
        let scheduling = Scheduling::new("events");
        let a = ObjectId::new();
        scheduling.create_event(&a, "later", None, at("2024-06-01T00:00:00Z"), "x");
        scheduling.create_event(&a, "sooner", None, at("2024-05-01T00:00:00Z"), "x");

        let names: Vec<_> = scheduling.get_events().into_iter().map(|e| e.data.name).collect();
        assert_eq!(names, vec!["sooner", "later"]);
    }
}
