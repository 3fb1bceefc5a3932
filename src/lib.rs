//! Host-side transport for hardware security tokens.
//!
//! Two independent stacks reach the same class of device:
//!
//! - **Smart cards** via the PC/SC resource manager: [`Context`] enumerates
//!   [`Reader`]s, which connect to a [`Card`]. Commands are built as
//!   [`Apdu`]s; status words are resolved into [`StatusError`]s and
//!   structured responses decoded with the [`tlv`] module, using the
//!   [`data_object`] catalogue to interpret them.
//! - **HID OTP** via 8-byte feature reports: an [`OtpProtocol`] session
//!   runs slot commands over any [`hid::Channel`].
//!
//! ## Example
//!
//! ```no_run
//! use hwtoken::{aid::Aid, data_object, Context};
//!
//! let context = Context::establish()?;
//! let reader = context.wait_for_card_present()?;
//! let card = reader.connect()?;
//!
//! card.select(Aid::OPENPGP)?;
//! let data = card.get_data(&data_object::APPLICATION_DATA)?;
//!
//! if let Some(aid) = data_object::AID.find_in(&data) {
//!     println!("ATR {}, AID {:02x?}", card.atr(), aid);
//! }
//!
//! card.disconnect()?;
//! context.release()?;
//! # Ok::<(), hwtoken::Error>(())
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod aid;
pub mod apdu;
mod card;
mod context;
pub mod data_object;
mod error;
pub mod hid;
pub mod management;
mod reader;
pub mod status;
pub mod tlv;
mod version;

pub use crate::{
    apdu::{Apdu, ApduOptions, Ins, Transmit},
    card::{Atr, Card},
    context::{Context, Scope, CARD_POLL_INTERVAL},
    data_object::DataObject,
    error::{Error, Result, TimeoutKind},
    hid::{CancellationToken, Keepalive, OtpProtocol, Slot, Timing},
    reader::Reader,
    status::StatusError,
    version::Version,
};
pub use pcsc::Protocol;

/// Buffer type (self-zeroizing byte vector)
pub type Buffer = zeroize::Zeroizing<Vec<u8>>;
