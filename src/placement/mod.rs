pub mod slot;

pub use slot::{AdSlot, DismissedAdSet, SlotHandle, SlotSettings, SlotState, SlotView};
