//! Locks with a runtime-checked acquisition order.

mod api;
mod hierarchical;
pub mod hierarchy;
mod parkinglock;
mod spinlock;

pub use api::{RawLock, RawTryLock};
pub use hierarchical::{HierarchicalLock, HierarchyGuard};
pub use parkinglock::ParkingLock;
pub use spinlock::SpinLock;
