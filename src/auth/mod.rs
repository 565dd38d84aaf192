//! Account lifecycle: signup, email verification and login.

pub mod authenticator;
pub mod error;
pub mod models;
pub mod password;
pub mod postgres;
pub mod service;
pub mod store;
mod utils;

pub use authenticator::{Authenticator, StoreAuthenticator};
pub use error::AuthError;
pub use models::{AuthenticationResponse, Principal, User};
pub use password::PasswordEncoder;
pub use postgres::PgStore;
pub use service::{AuthConfig, AuthService};
pub use store::{MemoryStore, UserStore};
