use bitflags::bitflags;

use crate::cell::*;
use crate::error::Error;
use crate::models::Message;

bitflags! {
    /// Mode flags for `SendMsg` output action.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct SendMsgFlags: u8 {
        /// The sender will pay transfer fees separately.
        const PAY_FEE_SEPARATELY = 1;
        /// Any errors arising while processing this message during
        /// the action phase should be ignored.
        const IGNORE_ERROR = 2;
        /// Causes bounce if action fails.
        const BOUNCE_ON_ERROR = 16;
        /// The current account must be destroyed if its resulting balance is zero.
        const DELETE_IF_EMPTY = 32;
        /// Message will carry all the remaining value of the inbound message
        /// in addition to the value initially indicated in the new message.
        const WITH_REMAINING_BALANCE = 64;
        /// Message will carry all the remaining balance of the current smart contract.
        const ALL_BALANCE = 128;
    }
}

impl Store for SendMsgFlags {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        builder.store_u8(self.bits())
    }
}

impl Load for SendMsgFlags {
    #[inline]
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        Ok(Self::from_bits_retain(ok!(slice.load_u8())))
    }
}

/// Output action.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OutAction {
    /// Sends a message stored in a child cell.
    ///
    /// ```text
    /// action_send_msg#0ec3c86d mode:(## 8) out_msg:^(MessageRelaxed Any) = OutAction;
    /// ```
    SendMsg {
        /// Behavior flags.
        mode: SendMsgFlags,
        /// Message to send.
        out_msg: Message,
    },
    /// Replaces the smart contract code.
    ///
    /// ```text
    /// action_set_code#ad4de08e new_code:^Cell = OutAction;
    /// ```
    SetCode {
        /// A cell with new code.
        new_code: Cell,
    },
}

impl OutAction {
    /// Tag for [`OutAction::SendMsg`].
    pub const TAG_SEND_MSG: u32 = 0x0ec3c86d;
    /// Tag for [`OutAction::SetCode`].
    pub const TAG_SET_CODE: u32 = 0xad4de08e;
}

impl Store for OutAction {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        match self {
            Self::SendMsg { mode, out_msg } => {
                let out_msg = ok!(CellBuilder::build_from(out_msg));
                if !builder.has_capacity(32 + 8, 1) {
                    return Err(Error::CapacityExceeded);
                }
                ok!(builder.store_u32(Self::TAG_SEND_MSG));
                ok!(mode.store_into(builder));
                builder.store_reference(out_msg)
            }
            Self::SetCode { new_code } => {
                if !builder.has_capacity(32, 1) {
                    return Err(Error::CapacityExceeded);
                }
                ok!(builder.store_u32(Self::TAG_SET_CODE));
                builder.store_reference(new_code.clone())
            }
        }
    }
}

impl Load for OutAction {
    fn load_from(slice: &mut CellSlice) -> Result<Self, Error> {
        let mut s = slice.clone();
        let action = match ok!(s.load_u32()) {
            Self::TAG_SEND_MSG => Self::SendMsg {
                mode: ok!(SendMsgFlags::load_from(&mut s)),
                out_msg: {
                    let cell = ok!(s.load_reference());
                    ok!(Message::load_from(&mut cell.as_slice()))
                },
            },
            Self::TAG_SET_CODE => Self::SetCode {
                new_code: ok!(s.load_reference()),
            },
            _ => return Err(Error::InvalidTag),
        };
        *slice = s;
        Ok(action)
    }
}

/// List of output actions.
///
/// ```text
/// out_list_empty$_ = OutList 0;
/// out_list$_ {n:#} prev:^(OutList n) action:OutAction = OutList (n + 1);
/// ```
///
/// Actions are kept in the order in which they are performed.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct OutList {
    pub actions: Vec<OutAction>,
}

impl OutList {
    /// Builds the list cell. An empty list is an empty cell.
    pub fn build(&self) -> Result<Cell, Error> {
        let mut cell = Cell::empty_cell();
        for action in &self.actions {
            let mut builder = CellBuilder::new();
            ok!(builder.store_reference(cell));
            ok!(action.store_into(&mut builder));
            cell = ok!(builder.build());
        }
        Ok(cell)
    }

    /// Parses the list starting from its head cell.
    pub fn parse(cell: &Cell) -> Result<Self, Error> {
        let mut actions = Vec::new();
        let mut cell = cell.clone();
        loop {
            let mut slice = cell.as_slice();
            if slice.is_data_empty() && slice.is_refs_empty() {
                break;
            }

            let prev = ok!(slice.load_reference());
            actions.push(ok!(OutAction::load_from(&mut slice)));
            if !slice.is_data_empty() || !slice.is_refs_empty() {
                return Err(Error::InvalidData);
            }
            cell = prev;
        }

        actions.reverse();
        Ok(Self { actions })
    }
}
