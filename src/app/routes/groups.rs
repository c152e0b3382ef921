//! Groups and the content shared in them.

use axum::http::Method;
use serde_json::{json, Value};

use crate::app::responses::Responses;
use crate::concepts::Concepts;
use crate::dispatch::{BoundArguments, Check, Failure, ParamSpec, Schema};
use crate::routing::{RouteError, RouteTable};

use super::{current_user, id_arg, ids, msg, path_id, with};

pub(super) fn register(table: &mut RouteTable, concepts: &Concepts) -> Result<(), RouteError> {
    table
        .route(Method::GET, "/groups")
        .param(ParamSpec::text("member"))
        .handler(with(concepts, get_groups))?;

    table
        .route(Method::GET, "/groups/:founder")
        .param(ParamSpec::path("founder"))
        .handler(with(concepts, get_groups_by_founder))?;

    table
        .route(Method::GET, "/groups/:id/events")
        .param(path_id())
        .validate(ids(&["id"]))
        .handler(with(concepts, get_group_events))?;

    table
        .route(Method::POST, "/groups")
        .params([ParamSpec::user(), ParamSpec::text("name").required()])
        .validate(Schema::new().field("name", [Check::MinLen(1)]))
        .handler(with(concepts, create_group))?;

    table
        .route(Method::PATCH, "/groups/:id")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("contentId").required()])
        .validate(ids(&["id", "contentId"]))
        .handler(with(concepts, add_content))?;

    table
        .route(Method::PATCH, "/groups/:id/remove")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("contentId").required()])
        .validate(ids(&["id", "contentId"]))
        .handler(with(concepts, remove_content))?;

    table
        .route(Method::PATCH, "/groups/:id/join")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, join_group))?;

    table
        .route(Method::PATCH, "/groups/:id/leave")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, leave_group))?;

    table
        .route(Method::DELETE, "/groups/:id")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, delete_group))?;

    Ok(())
}

async fn get_groups(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let groups = match args.text("member") {
        Some(member) => {
            let member = c.authing.get_user_by_username(&member)?;
            c.grouping.get_by_membership(&member.id)
        }
        None => c.grouping.get_communities(),
    };
    Responses::new(&c.authing).groups(&groups)
}

async fn get_groups_by_founder(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let founder = c
        .authing
        .get_user_by_username(&args.required_text("founder")?)?;
    Responses::new(&c.authing).groups(&c.grouping.get_by_founder(&founder.id))
}

async fn get_group_events(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let id = id_arg(&args, "id")?;
    c.grouping.assert_group_exists(&id)?;
    Responses::new(&c.authing).events(&c.scheduling.get_by_group(&id))
}

async fn create_group(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let group = c.grouping.create(&args.required_text("name")?, &user)?;
    Ok(json!({
        "msg": "Group successfully created!",
        "group": Responses::new(&c.authing).group(&group)?,
    }))
}

async fn add_content(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.grouping
        .add_content(&user, &id, &id_arg(&args, "contentId")?)?;
    Ok(msg("Content added to group!"))
}

async fn remove_content(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.grouping
        .remove_content(&user, &id, &id_arg(&args, "contentId")?)?;
    Ok(msg("Content removed from group!"))
}

async fn join_group(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.grouping.join_community(&user, &id_arg(&args, "id")?)?;
    Ok(msg("Joined group!"))
}

async fn leave_group(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.grouping.leave_community(&user, &id_arg(&args, "id")?)?;
    Ok(msg("Left group!"))
}

async fn delete_group(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.grouping.delete_community(&user, &id_arg(&args, "id")?)?;
    Ok(msg("Group deleted!"))
}
