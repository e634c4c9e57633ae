//! External service integrations.

pub mod provider {
    pub use crate::provider::*;
}

pub mod geocoding {
    pub use crate::geocoding::*;
}

pub mod db_storage {
    pub use crate::db_storage::*;
}
