/// HTTP handlers module
/// Provides the REST endpoints

pub mod rest;

pub use rest::{
    compose_message, create_group, get_mailbox, get_message, health, list_replies, post_reply,
    register_user,
};
