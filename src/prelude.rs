//! The `tvm-boc` prelude.
//!
//! This brings into scope a number of traits and commonly used types.

pub use crate::boc::Boc;
pub use crate::cell::{
    Cell, CellBuilder, CellDescriptor, CellHash, CellSlice, CellType, LevelMask, Load, Store,
};
pub use crate::dict::{DictKey, Hashmap, HashmapE};
pub use crate::models::{Address, AddressFormat};
