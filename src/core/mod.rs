// Soil estimation engine, leaves first
pub mod coordinates {
    pub use crate::coordinates::*;
}

pub mod synthetic {
    pub use crate::synthetic::*;
}

pub mod merger {
    pub use crate::merger::*;
}

pub mod classifier {
    pub use crate::classifier::*;
}

pub mod scorer {
    pub use crate::scorer::*;
}

pub mod estimator {
    pub use crate::estimator::*;
}

pub mod models {
    pub use crate::models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
