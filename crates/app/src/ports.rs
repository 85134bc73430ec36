//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod correlation;
pub mod partitions;
pub mod telemetry;
pub mod window_scan;

pub use correlation::{DeviceCorrelation, FleetWide, StaticCorrelation};
pub use partitions::PartitionCatalog;
pub use telemetry::{DualPathStore, HistoryStore, StatusStore, UnitReceipt};
pub use window_scan::{ScanResult, WindowScanner};
