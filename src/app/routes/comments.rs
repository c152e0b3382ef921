//! Comments on posts and on other comments.

use axum::http::Method;
use serde_json::{json, Value};

use crate::app::responses::Responses;
use crate::concepts::{Concepts, ObjectId};
use crate::dispatch::{BoundArguments, Check, Failure, ParamSpec};
use crate::routing::{RouteError, RouteTable};

use super::{current_user, id_arg, ids, msg, path_id, with};

pub(super) fn register(table: &mut RouteTable, concepts: &Concepts) -> Result<(), RouteError> {
    table
        .route(Method::GET, "/comments")
        .param(ParamSpec::text("author"))
        .handler(with(concepts, get_comments))?;

    table
        .route(Method::GET, "/comments/:parent")
        .param(ParamSpec::path("parent"))
        .validate(ids(&["parent"]))
        .handler(with(concepts, get_comments_by_parent))?;

    table
        .route(Method::POST, "/comments")
        .params([
            ParamSpec::user(),
            ParamSpec::text("content").required(),
            ParamSpec::text("parent").required(),
        ])
        .validate(ids(&["parent"]).field("content", [Check::MinLen(1)]))
        .handler(with(concepts, create_comment))?;

    table
        .route(Method::PATCH, "/comments/:id")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("content")])
        .validate(ids(&["id"]))
        .handler(with(concepts, update_comment))?;

    table
        .route(Method::DELETE, "/comments/:id")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, delete_comment))?;

    Ok(())
}

/// A comment's parent is a post or another comment.
fn assert_parent_exists(c: &Concepts, parent: &ObjectId) -> Result<(), Failure> {
    if c.posting.assert_post_exists(parent).is_ok() {
        return Ok(());
    }
    c.commenting.assert_comment_exists(parent)?;
    Ok(())
}

async fn get_comments(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let comments = match args.text("author") {
        Some(author) => {
            let author = c.authing.get_user_by_username(&author)?;
            c.commenting.get_by_author(&author.id)
        }
        None => c.commenting.get_comments(),
    };
    Responses::new(&c.authing).authored_all(&comments)
}

async fn get_comments_by_parent(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let parent = id_arg(&args, "parent")?;
    assert_parent_exists(&c, &parent)?;
    Responses::new(&c.authing).authored_all(&c.commenting.get_by_parent(&parent))
}

async fn create_comment(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let parent = id_arg(&args, "parent")?;
    assert_parent_exists(&c, &parent)?;

    let comment = c
        .commenting
        .create(&user, &args.required_text("content")?, &parent);
    Ok(json!({
        "msg": "Comment successfully created!",
        "comment": Responses::new(&c.authing).authored(&comment)?,
    }))
}

async fn update_comment(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.commenting.assert_author_is_user(&id, &user)?;
    c.commenting.update(&id, args.text("content"))?;
    Ok(msg("Comment successfully updated!"))
}

async fn delete_comment(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.commenting.assert_author_is_user(&id, &user)?;
    c.commenting.delete(&id)?;
    Ok(msg("Comment deleted successfully!"))
}
