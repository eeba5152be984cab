pub mod filter;
pub mod threshold;
pub mod morphology;
pub mod proposal;
pub mod extraction;

pub use filter::*;
pub use threshold::*;
pub use morphology::*;
pub use proposal::*;
pub use extraction::*;
