pub use telecall_core::model::{RoomId, SessionConfig, UserId};
pub use telecall_session::CallSessionController;

pub mod model {
    pub use telecall_core::model::*;
}

pub mod error {
    pub use telecall_core::error::*;
}

pub mod session {
    pub use telecall_session::*;
}
