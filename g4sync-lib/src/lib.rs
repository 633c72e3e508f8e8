pub mod adapter;
pub mod command;
pub mod constants;
pub mod crc;
pub mod device;
pub mod error;
pub mod export;
pub mod frame;
pub mod message;
pub mod model;
pub mod page;
pub mod planner;
pub mod probe;
pub mod records;
pub mod state;
pub mod time;
pub mod transport;

// Re-export the main entry points for easy access
pub use adapter::{ReceiverSyncData, adapt};
pub use device::{Receiver, SyncState};
pub use error::G4Error;
pub use export::{DataExporter, JsonExporter};
pub use probe::{DiscoveryConfig, SyncCoordinator, find_receiver, probe_port};
pub use state::LastSyncStore;
pub use transport::{SerialConfig, SerialTransport, Transport};
