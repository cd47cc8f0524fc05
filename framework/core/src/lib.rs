mod clock;
mod fault;
mod shutdown;

pub mod prelude {
    pub use crate::clock::{Clock, TokioClock};
    pub use crate::fault::ConfigError;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle};
}
