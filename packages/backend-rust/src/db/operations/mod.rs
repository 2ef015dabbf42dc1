pub mod lessons;
pub mod messages;
pub mod mistakes;
pub mod stats;
pub mod users;

pub use lessons::*;
pub use messages::*;
pub use mistakes::*;
pub use stats::*;
pub use users::*;
