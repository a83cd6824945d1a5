pub mod admin;
pub mod auth;
pub mod cards;
pub mod enterprise;
pub mod health;
pub mod pages;
pub mod public;
