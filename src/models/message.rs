//! Message models.

use crate::cell::*;
use crate::dict::HashmapE;
use crate::error::Error;
use crate::models::Address;

/// Special account flags.
///
/// ```text
/// tick_tock$_ tick:Bool tock:Bool = TickTock;
/// ```
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct TickTock {
    /// Called in the start of the block.
    pub tick: bool,
    /// Called in the end of the block.
    pub tock: bool,
}

impl TickTock {
    pub const BITS: u16 = 2;
}

impl Store for TickTock {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(Self::BITS, 0) {
            return Err(Error::CapacityExceeded);
        }
        ok!(builder.store_bit(self.tick));
        builder.store_bit(self.tock)
    }
}

impl Load for TickTock {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let bits = ok!(slice.load_uint(Self::BITS));
        Ok(Self {
            tick: bits & 0b10 != 0,
            tock: bits & 0b01 != 0,
        })
    }
}

/// Simple TVM library.
///
/// ```text
/// simple_lib$_ public:Bool root:^Cell = SimpleLib;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SimpleLib {
    /// Whether this library is accessible from other accounts.
    pub public: bool,
    /// Library code.
    pub root: Cell,
}

impl Store for SimpleLib {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(1, 1) {
            return Err(if builder.spare_refs_capacity() == 0 {
                Error::RefLimitExceeded
            } else {
                Error::CapacityExceeded
            });
        }
        ok!(builder.store_bit(self.public));
        builder.store_reference(self.root.clone())
    }
}

impl Load for SimpleLib {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        if slice.remaining_refs() == 0 {
            return Err(Error::BoundsExceeded);
        }
        Ok(Self {
            public: ok!(slice.load_bit()),
            root: ok!(slice.load_reference()),
        })
    }
}

/// Deployed account state.
///
/// ```text
/// _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
///   code:(Maybe ^Cell) data:(Maybe ^Cell)
///   library:(HashmapE 256 SimpleLib) = StateInit;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StateInit {
    /// Optional split depth for large smart contracts.
    pub split_depth: Option<u8>,
    /// Optional special contract flags.
    pub special: Option<TickTock>,
    /// Optional contract code.
    pub code: Option<Cell>,
    /// Optional contract data.
    pub data: Option<Cell>,
    /// Libraries used in smart-contract.
    pub library: HashmapE<CellHash, SimpleLib>,
}

impl StateInit {
    /// Key length of the libraries dictionary.
    pub const LIBRARY_KEY_BITS: u16 = 256;

    const SPLIT_DEPTH_BITS: u16 = 5;
}

impl Default for StateInit {
    fn default() -> Self {
        Self {
            split_depth: None,
            special: None,
            code: None,
            data: None,
            library: HashmapE::new(Self::LIBRARY_KEY_BITS),
        }
    }
}

impl Store for StateInit {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        // Validate everything on a copy to keep the builder untouched on failure
        let mut b = builder.clone();

        match self.split_depth {
            Some(depth) => {
                ok!(b.store_bit_one());
                ok!(b.store_uint(depth as u64, Self::SPLIT_DEPTH_BITS));
            }
            None => ok!(b.store_bit_zero()),
        }

        match &self.special {
            Some(special) => {
                ok!(b.store_bit_one());
                ok!(special.store_into(&mut b));
            }
            None => ok!(b.store_bit_zero()),
        }

        ok!(b.store_maybe_reference(self.code.clone()));
        ok!(b.store_maybe_reference(self.data.clone()));
        ok!(self.library.store_into(&mut b));

        *builder = b;
        Ok(())
    }
}

impl Load for StateInit {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let mut s = slice.clone();

        let split_depth = if ok!(s.load_bit()) {
            Some(ok!(s.load_uint(Self::SPLIT_DEPTH_BITS)) as u8)
        } else {
            None
        };

        let special = if ok!(s.load_bit()) {
            Some(ok!(TickTock::load_from(&mut s)))
        } else {
            None
        };

        let code = ok!(s.load_maybe_reference());
        let data = ok!(s.load_maybe_reference());
        let library = ok!(s.load_dict(Self::LIBRARY_KEY_BITS));

        *slice = s;
        Ok(Self {
            split_depth,
            special,
            code,
            data,
            library,
        })
    }
}

/// Internal message info.
///
/// ```text
/// int_msg_info$0 ihr_disabled:Bool bounce:Bool bounced:Bool
///   src:MsgAddressInt dest:MsgAddressInt
///   value:CurrencyCollection ihr_fee:Grams fwd_fee:Grams
///   created_lt:uint64 created_at:uint32 = CommonMsgInfo;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct IntMsgInfo {
    /// Whether IHR is disabled for the message.
    pub ihr_disabled: bool,
    /// Whether to bounce this message back if the destination transaction fails.
    pub bounce: bool,
    /// Whether this message is a bounced message from some failed transaction.
    pub bounced: bool,
    /// Internal source address, `None` when it is filled in by the sender.
    pub src: Option<Address>,
    /// Internal destination address.
    pub dest: Option<Address>,
    /// Attached amount of nanotokens. Extra currencies are always empty.
    pub value: u128,
    /// IHR fee.
    pub ihr_fee: u128,
    /// Forwarding fee.
    pub fwd_fee: u128,
    /// Logical time when the message was created.
    pub created_lt: u64,
    /// Unix timestamp when the message was created.
    pub created_at: u32,
}

/// External incoming message info.
///
/// ```text
/// ext_in_msg_info$10 src:MsgAddressExt dest:MsgAddressInt
///   import_fee:Grams = CommonMsgInfo;
/// ```
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct ExtInMsgInfo {
    /// Optional external source address.
    pub src: Option<Address>,
    /// Internal destination address.
    pub dest: Option<Address>,
    /// External message import fee.
    pub import_fee: u128,
}

/// Message info.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CommonMsgInfo {
    /// Internal message info.
    Int(IntMsgInfo),
    /// External incoming message info.
    ExtIn(ExtInMsgInfo),
}

impl Store for CommonMsgInfo {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let mut b = builder.clone();
        match self {
            Self::Int(info) => {
                ok!(b.store_uint(0b0, 1));
                ok!(b.store_bit(info.ihr_disabled));
                ok!(b.store_bit(info.bounce));
                ok!(b.store_bit(info.bounced));
                ok!(b.store_address(info.src.as_ref()));
                ok!(b.store_address(info.dest.as_ref()));
                ok!(b.store_coins(info.value));
                // Empty extra currencies dictionary
                ok!(b.store_bit_zero());
                ok!(b.store_coins(info.ihr_fee));
                ok!(b.store_coins(info.fwd_fee));
                ok!(b.store_u64(info.created_lt));
                ok!(b.store_u32(info.created_at));
            }
            Self::ExtIn(info) => {
                ok!(b.store_uint(0b10, 2));
                ok!(b.store_address(info.src.as_ref()));
                ok!(b.store_address(info.dest.as_ref()));
                ok!(b.store_coins(info.import_fee));
            }
        }
        *builder = b;
        Ok(())
    }
}

impl Load for CommonMsgInfo {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let mut s = slice.clone();

        let info = if !ok!(s.load_bit()) {
            let ihr_disabled = ok!(s.load_bit());
            let bounce = ok!(s.load_bit());
            let bounced = ok!(s.load_bit());
            let src = ok!(s.load_address());
            let dest = ok!(s.load_address());
            let value = ok!(s.load_coins());
            // Extra currencies are not supported
            ok!(s.skip_dict());
            Self::Int(IntMsgInfo {
                ihr_disabled,
                bounce,
                bounced,
                src,
                dest,
                value,
                ihr_fee: ok!(s.load_coins()),
                fwd_fee: ok!(s.load_coins()),
                created_lt: ok!(s.load_u64()),
                created_at: ok!(s.load_u32()),
            })
        } else if !ok!(s.load_bit()) {
            Self::ExtIn(ExtInMsgInfo {
                src: ok!(s.load_address()),
                dest: ok!(s.load_address()),
                import_fee: ok!(s.load_coins()),
            })
        } else {
            // ext_out_msg_info$11
            return Err(Error::InvalidTag);
        };

        *slice = s;
        Ok(info)
    }
}

/// Blockchain message.
///
/// ```text
/// message$_ {X:Type} info:CommonMsgInfo
///   init:(Maybe (Either StateInit ^StateInit))
///   body:(Either X ^X) = Message X;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    /// Message info.
    pub info: CommonMsgInfo,
    /// Optional state init.
    pub init: Option<StateInit>,
    /// Optional payload.
    pub body: Option<Cell>,
}

impl Store for Message {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        let mut b = builder.clone();
        ok!(self.info.store_into(&mut b));

        match &self.init {
            Some(init) => {
                let init = ok!(CellBuilder::build_from(init));
                ok!(b.store_bit_one());
                if b.has_capacity(1 + init.bit_len(), init.reference_count()) {
                    ok!(b.store_bit_zero());
                    ok!(b.store_slice(&init.as_slice()));
                } else {
                    ok!(b.store_bit_one());
                    ok!(b.store_reference(init));
                }
            }
            None => ok!(b.store_bit_zero()),
        }

        match &self.body {
            Some(body) if !b.has_capacity(1 + body.bit_len(), body.reference_count()) => {
                ok!(b.store_bit_one());
                ok!(b.store_reference(body.clone()));
            }
            Some(body) => {
                ok!(b.store_bit_zero());
                ok!(b.store_slice(&body.as_slice()));
            }
            None => ok!(b.store_bit_zero()),
        }

        *builder = b;
        Ok(())
    }
}

impl Load for Message {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let mut s = slice.clone();
        let info = ok!(CommonMsgInfo::load_from(&mut s));

        let init = if ok!(s.load_bit()) {
            if ok!(s.load_bit()) {
                let cell = ok!(s.load_reference());
                Some(ok!(StateInit::load_from(&mut cell.as_slice())))
            } else {
                Some(ok!(StateInit::load_from(&mut s)))
            }
        } else {
            None
        };

        let body = if ok!(s.load_bit()) {
            Some(ok!(s.load_reference()))
        } else if s.is_data_empty() && s.is_refs_empty() {
            None
        } else {
            Some(ok!(s.load_remaining_as_cell()))
        };

        *slice = s;
        Ok(Self { info, init, body })
    }
}
