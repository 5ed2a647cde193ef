//! TVM cells, dictionaries and Bag of Cells serialization.
//!
//! ## Basic usage
//!
//! ```
//! use tvm_boc::prelude::*;
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0xdeadbeef).unwrap();
//! let cell = builder.build().unwrap();
//!
//! let encoded = Boc::encode_base64(&cell);
//! let decoded = Boc::decode_base64(&encoded).unwrap();
//! assert_eq!(cell.repr_hash(), decoded.repr_hash());
//! ```

macro_rules! ok {
    ($e:expr $(,)?) => {
        match $e {
            core::result::Result::Ok(val) => val,
            core::result::Result::Err(err) => return core::result::Result::Err(err),
        }
    };
}

pub use self::boc::{Boc, Error as BocError};
pub use self::cell::{Cell, CellBuilder, CellDescriptor, CellSlice, LevelMask};
pub use self::error::Error;

pub mod boc;
pub mod cell;
pub mod dict;
pub mod error;
pub mod models;
pub mod prelude;
pub mod util;
