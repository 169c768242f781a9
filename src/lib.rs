pub mod client;
pub mod comm;
pub mod command;
pub mod config;
pub mod consts;
pub mod controller;
pub mod gate;
pub mod reader;
pub mod reply;
pub mod servo;
