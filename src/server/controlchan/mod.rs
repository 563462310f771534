//! Contains code pertaining to the FTP *control* channel

mod auth;
mod codecs;
mod command;
mod commands;
mod control_loop;
pub(crate) mod error;
mod event;
mod handler;
mod line_parser;
mod log;
mod middleware;
mod notify;
mod reply;

pub(crate) use control_loop::{Config, spawn_loop};
pub(crate) use event::Event;
pub(crate) use reply::{Reply, ReplyCode};
