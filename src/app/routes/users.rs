//! Accounts and login state.

use axum::http::Method;
use serde_json::{json, Value};

use crate::concepts::Concepts;
use crate::dispatch::{BoundArguments, Check, Failure, ParamSpec, Schema};
use crate::routing::{RouteError, RouteTable};

use super::{current_user, msg, with};

pub(super) fn register(table: &mut RouteTable, concepts: &Concepts) -> Result<(), RouteError> {
    table
        .route(Method::GET, "/session")
        .param(ParamSpec::user())
        .handler(with(concepts, get_session_user))?;

    table
        .route(Method::GET, "/users")
        .handler(with(concepts, get_users))?;

    table
        .route(Method::GET, "/users/:username")
        .param(ParamSpec::path("username"))
        .validate(Schema::new().field("username", [Check::MinLen(1)]))
        .handler(with(concepts, get_user))?;

    table
        .route(Method::POST, "/users")
        .params([
            ParamSpec::session(),
            ParamSpec::text("username").required(),
            ParamSpec::text("password").required(),
        ])
        .handler(with(concepts, create_user))?;

    table
        .route(Method::PATCH, "/users/username")
        .params([ParamSpec::user(), ParamSpec::text("username").required()])
        .handler(with(concepts, update_username))?;

    table
        .route(Method::PATCH, "/users/password")
        .params([
            ParamSpec::user(),
            ParamSpec::text("currentPassword").required(),
            ParamSpec::text("newPassword").required(),
        ])
        .handler(with(concepts, update_password))?;

    table
        .route(Method::DELETE, "/users")
        .params([ParamSpec::user(), ParamSpec::session()])
        .handler(with(concepts, delete_user))?;

    table
        .route(Method::POST, "/login")
        .params([
            ParamSpec::session(),
            ParamSpec::text("username").required(),
            ParamSpec::text("password").required(),
        ])
        .handler(with(concepts, log_in))?;

    table
        .route(Method::POST, "/logout")
        .param(ParamSpec::session())
        .handler(with(concepts, log_out))?;

    Ok(())
}

async fn get_session_user(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    let user = c.authing.get_user_by_id(&user)?;
    Ok(json!(user))
}

async fn get_users(c: Concepts, _args: BoundArguments) -> Result<Value, Failure> {
    Ok(json!(c.authing.get_users(None)))
}

async fn get_user(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let username = args.required_text("username")?;
    Ok(json!(c.authing.get_user_by_username(&username)?))
}

async fn create_user(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    c.sessioning.is_logged_out(args.session()?)?;
    let user = c.authing.create(
        &args.required_text("username")?,
        &args.required_text("password")?,
    )?;
    Ok(json!({ "msg": "User created successfully!", "user": user }))
}

async fn update_username(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.authing
        .update_username(&user, &args.required_text("username")?)?;
    Ok(msg("Username updated successfully!"))
}

async fn update_password(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.authing.update_password(
        &user,
        &args.required_text("currentPassword")?,
        &args.required_text("newPassword")?,
    )?;
    Ok(msg("Password updated successfully!"))
}

async fn delete_user(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = current_user(&args)?;
    c.sessioning.end(args.session()?)?;
    c.authing.delete(&user)?;
    Ok(msg("User deleted!"))
}

async fn log_in(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    let user = c.authing.authenticate(
        &args.required_text("username")?,
        &args.required_text("password")?,
    )?;
    c.sessioning.start(args.session()?, &user.id)?;
    Ok(msg("Logged in!"))
}

async fn log_out(c: Concepts, args: BoundArguments) -> Result<Value, Failure> {
    c.sessioning.end(args.session()?)?;
    Ok(msg("Logged out!"))
}
