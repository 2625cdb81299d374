//! IPC module for bridge and UI clients

mod protocol;
mod server;

pub use protocol::{
    read_frame, read_message, write_message, DaemonStatus, Notification, Request, Response,
    MAX_FRAME_LEN,
};
pub use server::Server;
