pub mod devices;
pub mod error;
pub mod sector;
pub mod stress;

pub use devices::{
    locate_msc_device, locate_with, platform_enumerator, DeviceEnumerator,
    ExternalPhysicalEnumerator, UsbTransportEnumerator,
};
pub use error::DeviceError;
pub use sector::{
    cluster_heap_offset, probe_cluster_heap, read_sector, ClusterHeapProbe, SECTOR_SIZE,
};
pub use stress::{
    DeviceSectorSource, SectorSource, Sleeper, StressConfig, StressOutcome, StressReport,
    ThreadSleeper,
};
