//! Graph assembly: the region stack and the cursor-based assembler.

pub mod graph_assembler;
pub mod region;

pub use graph_assembler::GraphAssembler;
pub use region::{ConditionalRegion, ConditionalState, DispatchRegion, DispatchState, Region, RegionStack};
