//! SeaORM data model for cardhub: users, enterprises, cards, sessions and
//! license requests. All relationships are plain foreign keys resolved per
//! query; nothing here caches state.

pub mod entities;
