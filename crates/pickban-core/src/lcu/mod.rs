// Connection to the live game client: credential discovery and event stream.

pub mod client;
pub mod lockfile;
