pub mod seed;

pub use seed::{cluster_from_url, is_home_url, login, LoginResult};
