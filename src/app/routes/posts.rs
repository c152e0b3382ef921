//! Posts.

use axum::http::Method;
use serde_json::{json, Value};

use crate::app::responses::Responses;
use crate::concepts::{Concepts, PostOptions};
use crate::dispatch::{BoundArguments, Check, Failure, FieldSpec, ParamSpec, Schema};
use crate::routing::{RouteError, RouteTable};

use super::{current_user, id_arg, ids, msg, path_id, with};

fn options() -> ParamSpec {
    ParamSpec::group("options", [FieldSpec::text("backgroundColor")])
}

pub(super) fn register(table: &mut RouteTable, concepts: &Concepts) -> Result<(), RouteError> {
    table
        .route(Method::GET, "/posts")
        .param(ParamSpec::text("author"))
        .handler(with(concepts, get_posts))?;

    table
        .route(Method::POST, "/posts")
        .params([ParamSpec::user(), ParamSpec::text("content").required(), options()])
        .validate(Schema::new().field("content", [Check::MinLen(1)]))
        .handler(with(concepts, create_post))?;

    table
        .route(Method::PATCH, "/posts/:id")
        .params([path_id(), ParamSpec::user(), ParamSpec::text("content"), options()])
        .validate(ids(&["id"]))
        .handler(with(concepts, update_post))?;

    table
        .route(Method::DELETE, "/posts/:id")
        .params([path_id(), ParamSpec::user()])
        .validate(ids(&["id"]))
        .handler(with(concepts, delete_post))?;

    Ok(())
}

async fn get_posts(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let posts = match args.text("author") {
        Some(author) => {
            let author = c.authing.get_user_by_username(&author)?;
            c.posting.get_by_author(&author.id)
        }
        None => c.posting.get_posts(),
    };
    Responses::new(&c.authing).authored_all(&posts)
}

async fn create_post(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let content = args.required_text("content")?;
    let options = args.json::<PostOptions>("options")?;

    let post = c.posting.create(&user, &content, options);
    Ok(json!({
        "msg": "Post successfully created!",
        "post": Responses::new(&c.authing).authored(&post)?,
    }))
}

async fn update_post(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.posting.assert_author_is_user(&id, &user)?;
    c.posting
        .update(&id, args.text("content"), args.json::<PostOptions>("options")?)?;
    Ok(msg("Post successfully updated!"))
}

async fn delete_post(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let id = id_arg(&args, "id")?;
    c.posting.assert_author_is_user(&id, &user)?;
    c.posting.delete(&id)?;
    Ok(msg("Post deleted successfully!"))
}
