//! Infrastructure layer.

pub mod database;
pub mod listings;

pub use self::database::Database;
#[cfg(feature = "postgres")]
pub use self::database::{postgres, Postgres};
#[cfg(feature = "listings")]
pub use self::listings::Http;
pub use self::listings::Listings;
