pub mod config;
pub mod error;
pub mod presence;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;

pub use config::{ServerConfig, DEFAULT_CONFIG_NAME};
pub use error::{WorkspaceError, WorkspaceResult};
pub use presence::{Presence, Range, UserContext};
pub use protocol::{Acknowledgement, ResyncNotice, SelectionUpdate, SessionEvent, SnapshotResponse};
pub use registry::DocumentRegistry;
pub use server::router;
pub use session::{DocumentSession, SessionState};
