//! Events: attendance, proposed times and locations, and voting on them.

use axum::http::Method;
use serde_json::{json, Value};

use crate::app::responses::Responses;
use crate::concepts::scheduling::parse_time;
use crate::concepts::{ConceptError, Concepts, ObjectId};
use crate::dispatch::{BoundArguments, Check, Failure, ParamSpec, Schema};
use crate::routing::{RouteError, RouteTable};

use super::{current_user, id_arg, ids, msg, path_id, with};

fn time() -> Schema {
    ids(&["id"]).field("time", [Check::DateTime])
}

pub(super) fn register(table: &mut RouteTable, concepts: &Concepts) -> Result<(), RouteError> {
    table
        .route(Method::GET, "/events")
        .handler(with(concepts, get_events))?;

    table
        .route(Method::GET, "/events/:id")
        .param(path_id())
        .validate(ids(&["id"]))
        .handler(with(concepts, get_event))?;

    table
        .route(Method::POST, "/events")
        .params([
            ParamSpec::user(),
            ParamSpec::text("name").required(),
            ParamSpec::text("time").required(),
            ParamSpec::text("location").required(),
            ParamSpec::text("group"),
        ])
        .validate(
            ids(&["group"])
                .field("name", [Check::MinLen(1)])
                .field("time", [Check::DateTime]),
        )
        .handler(with(concepts, create_event))?;

    table
        .route(Method::PATCH, "/events/:id")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("name").required()])
        .validate(ids(&["id"]).field("name", [Check::MinLen(1)]))
        .handler(with(concepts, update_name))?;

    table
        .route(Method::DELETE, "/events/:id")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, delete_event))?;

    table
        .route(Method::PATCH, "/events/:id/join")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, join_event))?;

    table
        .route(Method::PATCH, "/events/:id/leave")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, leave_event))?;

    table
        .route(Method::GET, "/events/:id/attendees")
        .param(path_id())
        .validate(ids(&["id"]))
        .handler(with(concepts, get_attendees))?;

    table
        .route(Method::POST, "/events/:id/times")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("time").required()])
        .validate(time())
        .handler(with(concepts, add_time))?;

    table
        .route(Method::DELETE, "/events/:id/times")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("time").required()])
        .validate(time())
        .handler(with(concepts, remove_time))?;

    table
        .route(Method::POST, "/events/:id/locations")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("location").required()])
        .validate(ids(&["id"]))
        .handler(with(concepts, add_location))?;

    table
        .route(Method::DELETE, "/events/:id/locations")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("location").required()])
        .validate(ids(&["id"]))
        .handler(with(concepts, remove_location))?;

    table
        .route(Method::PATCH, "/events/:id/voteTime")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("time").required()])
        .validate(time())
        .handler(with(concepts, vote_time))?;

    table
        .route(Method::PATCH, "/events/:id/unvoteTime")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("time").required()])
        .validate(time())
        .handler(with(concepts, unvote_time))?;

    table
        .route(Method::PATCH, "/events/:id/voteLocation")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("location").required()])
        .validate(ids(&["id"]))
        .handler(with(concepts, vote_location))?;

    table
        .route(Method::PATCH, "/events/:id/unvoteLocation")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("location").required()])
        .validate(ids(&["id"]))
        .handler(with(concepts, unvote_location))?;

    table
        .route(Method::GET, "/events/:id/votes")
        .param(path_id())
        .validate(ids(&["id"]))
        .handler(with(concepts, get_votes))?;

    table
        .route(Method::GET, "/events/:id/votes/mine")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, get_my_votes))?;

    table
        .route(Method::GET, "/events/:id/best")
        .param(path_id())
        .validate(ids(&["id"]))
        .handler(with(concepts, get_best))?;

    table
        .route(Method::PUT, "/events/:id/best")
        .params([
            path_id(),
            ParamSpec::user(),
            ParamSpec::text("time"),
            ParamSpec::text("location"),
        ])
        .validate(time())
        .handler(with(concepts, set_best))?;

    Ok(())
}

/// The caller must attend the event to vote on it.
fn assert_attending(c: &Concepts, id: &ObjectId, user: &ObjectId) -> Result<(), Failure> {
    if !c.scheduling.get_attendees(id)?.contains(user) {
        return Err(ConceptError::NotAllowed(format!("{user} is not attending event {id}!")).into());
    }
    Ok(())
}

async fn get_events(c: Concepts, _args: BoundArguments) -> Result<Value, Failure> {
    Responses::new(&c.authing).events(&c.scheduling.get_events())
}

async fn get_event(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let event = c.scheduling.get_event(&id_arg(&args, "id")?)?;
    Responses::new(&c.authing).event(&event)
}

async fn create_event(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let group = match args.text("group") {
        Some(group) => {
            let group = c.grouping.get_group(&ObjectId::parse(&group)?)?;
            if !group.data.members.contains(&user) {
                return Err(ConceptError::NotAllowed(format!(
                    "{user} is not a member of group {}!",
                    group.id
                ))
                .into());
            }
            Some(group.id)
        }
        None => None,
    };

    let event = c.scheduling.create_event(
        &user,
        &args.required_text("name")?,
        group,
        parse_time(&args.required_text("time")?)?,
        &args.required_text("location")?,
    );
    Ok(json!({
        "msg": "Event created successfully!",
        "event": Responses::new(&c.authing).event(&event)?,
    }))
}

async fn update_name(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling.assert_creator_is_user(&id, &user)?;
    c.scheduling.update_name(&id, &args.required_text("name")?)?;
    Ok(msg("Event name updated successfully!"))
}

async fn delete_event(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling.assert_creator_is_user(&id, &user)?;
    c.scheduling.delete_event(&id)?;
    Ok(msg("Event deleted successfully!"))
}

async fn join_event(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.scheduling.add_attendee(&id_arg(&args, "id")?, &user)?;
    Ok(msg("Attendee added successfully!"))
}

async fn leave_event(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.scheduling.remove_attendee(&id_arg(&args, "id")?, &user)?;
    Ok(msg("Attendee removed successfully!"))
}

async fn get_attendees(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let attendees = c.scheduling.get_attendees(&id_arg(&args, "id")?)?;
    Ok(Responses::new(&c.authing).usernames(&attendees))
}

async fn add_time(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    assert_attending(&c, &id, &user)?;
    c.scheduling
        .add_possible_time(&id, parse_time(&args.required_text("time")?)?)?;
    Ok(msg("Possible time added successfully!"))
}

async fn remove_time(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling.assert_creator_is_user(&id, &user)?;
    c.scheduling
        .remove_possible_time(&id, parse_time(&args.required_text("time")?)?)?;
    Ok(msg("Possible time removed successfully!"))
}

async fn add_location(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    assert_attending(&c, &id, &user)?;
    c.scheduling
        .add_possible_location(&id, &args.required_text("location")?)?;
    Ok(msg("Possible location added successfully!"))
}

async fn remove_location(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling.assert_creator_is_user(&id, &user)?;
    c.scheduling
        .remove_possible_location(&id, &args.required_text("location")?)?;
    Ok(msg("Possible location removed successfully!"))
}

async fn vote_time(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    assert_attending(&c, &id, &user)?;
    c.scheduling
        .vote_on_time(&id, parse_time(&args.required_text("time")?)?, &user)?;
    Ok(msg("Voted on time successfully!"))
}

async fn unvote_time(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling
        .unvote_on_time(&id, parse_time(&args.required_text("time")?)?, &user)?;
    Ok(msg("Unvoted on time successfully!"))
}

async fn vote_location(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    assert_attending(&c, &id, &user)?;
    c.scheduling
        .vote_on_location(&id, &args.required_text("location")?, &user)?;
    Ok(msg("Voted on location successfully!"))
}

async fn unvote_location(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling
        .unvote_on_location(&id, &args.required_text("location")?, &user)?;
    Ok(msg("Unvoted on location successfully!"))
}

async fn get_votes(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let event = Responses::new(&c.authing).event(&c.scheduling.get_event(&id_arg(&args, "id")?)?)?;
    Ok(json!({
        "votesOnTimes": event["votesOnTimes"],
        "votesOnLocations": event["votesOnLocations"],
    }))
}

async fn get_my_votes(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    Ok(json!(c.scheduling.get_user_votes(&id_arg(&args, "id")?, &user)?))
}

async fn get_best(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    Ok(json!(c.scheduling.calculate_best(&id_arg(&args, "id")?)?))
}

async fn set_best(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.scheduling.assert_creator_is_user(&id, &user)?;

    let time = args.text("time");
    let location = args.text("location");
    if time.is_none() && location.is_none() {
        return Err(Failure::bad_values("Provide a time or a location!"));
    }
    if let Some(time) = time {
        c.scheduling.set_time(&id, parse_time(&time)?)?;
    }
    if let Some(location) = location {
        c.scheduling.set_location(&id, &location)?;
    }
    Ok(msg("Best options set successfully!"))
}
