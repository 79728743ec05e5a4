pub mod hashmap;
pub mod prio_queue;

pub use hashmap::GitHashMapExt;
pub use prio_queue::PriorityQueue;
