mod call;
mod controller;
mod event;
mod state;
mod timer;

pub use call::CallSession;
pub use controller::CallSessionController;
pub use event::SessionEvent;
pub use state::SessionState;
