//! Portal flow tests over an in-memory store and the canned gateway.

mod common;
mod credential_delegates;
