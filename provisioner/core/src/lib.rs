#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod error;
pub mod gateway;
pub mod network;
pub mod security;
pub mod target;
pub mod workload;

pub use self::error::Error;
pub use ipnet::{IpNet, Ipv4Net, Ipv6Net};

pub const PROVISIONER_NAME: &str = "vidsite.io/provisioner";

pub type Result<T, E = Error> = std::result::Result<T, E>;
