//! Connection to a smart card

// Adapted from yubico-piv-tool:
// <https://github.com/Yubico/yubico-piv-tool/>
//
// Copyright (c) 2014-2016 Yubico AB
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
//   * Redistributions of source code must retain the above copyright
//     notice, this list of conditions and the following disclaimer.
//
//   * Redistributions in binary form must reproduce the above
//     copyright notice, this list of conditions and the following
//     disclaimer in the documentation and/or other materials provided
//     with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// OWNER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use crate::{
    aid::Aid,
    apdu::{Apdu, Ins, Transmit},
    context::Context,
    data_object::DataObject,
    management::DeviceInfo,
    Buffer, Error, Result,
};
use log::{debug, trace, warn};
use std::{
    borrow::Cow,
    ffi::CString,
    fmt,
    marker::PhantomData,
    sync::{Mutex, PoisonError},
};

/// Answer-To-Reset of a connected card
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Atr(Vec<u8>);

impl Atr {
    /// Borrow the raw ATR bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Atr {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<&[u8]> for Atr {
    fn from(bytes: &[u8]) -> Self {
        Atr(bytes.to_vec())
    }
}

impl fmt::Display for Atr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::lower::encode_string(&self.0))
    }
}

/// A card connected through a [`Reader`](crate::Reader).
///
/// Commands are serialized: only one APDU exchange is in flight at a time.
pub struct Card<'ctx> {
    inner: Mutex<pcsc::Card>,
    reader: CString,
    atr: Atr,
    protocol: Option<pcsc::Protocol>,
    ctx: PhantomData<&'ctx Context>,
}

impl<'ctx> Card<'ctx> {
    pub(crate) fn new(card: pcsc::Card, reader: CString) -> Result<Self> {
        let status = card.status2_owned()?;
        let atr = Atr::from(status.atr());
        let protocol = status.protocol2();

        debug!(
            "connected to '{}' (ATR {}, protocol {:?})",
            reader.to_string_lossy(),
            atr,
            protocol
        );

        Ok(Self {
            inner: Mutex::new(card),
            reader,
            atr,
            protocol,
            ctx: PhantomData,
        })
    }

    /// Answer-To-Reset captured when the card was connected
    pub fn atr(&self) -> &Atr {
        &self.atr
    }

    /// Protocol negotiated with the card
    pub fn protocol(&self) -> Option<pcsc::Protocol> {
        self.protocol
    }

    /// Name of the reader this card is connected through
    pub fn reader_name(&self) -> Cow<'_, str> {
        self.reader.to_string_lossy()
    }

    /// Transmit an APDU and return the response data
    pub fn transmit(&self, apdu: &Apdu) -> Result<Buffer> {
        apdu.transmit(self)
    }

    /// Select an application.
    pub fn select(&self, aid: Aid) -> Result<()> {
        Apdu::new(Ins::SelectApplication)
            .p1(0x04)
            .data(aid)
            .transmit(self)
            .map_err(|e| {
                warn!("failed selecting application {}: {}", aid, e);
                e
            })?;

        Ok(())
    }

    /// Request `len` bytes of randomness from the card
    pub fn get_challenge(&self, len: u8) -> Result<Buffer> {
        Apdu::new(Ins::GetChallenge)
            .data([len])
            .expected_len(len)
            .transmit(self)
    }

    /// Read a data object from the currently selected application
    pub fn get_data(&self, object: &DataObject) -> Result<Buffer> {
        let [p1, p2] = object.tag_bytes();
        Apdu::new(Ins::GetData).params(p1, p2).transmit(self)
    }

    /// Read the device configuration from the management application
    pub fn device_info(&self) -> Result<DeviceInfo> {
        self.select(Aid::YUBICO_MANAGEMENT)?;
        let response = Apdu::new(Ins::ReadConfig).transmit(self)?;
        DeviceInfo::parse(&response)
    }

    /// Disconnect from the card, leaving it in its current state.
    ///
    /// Dropping a `Card` disconnects it as well, ignoring any error.
    pub fn disconnect(self) -> Result<()> {
        let card = self
            .inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);

        card.disconnect(pcsc::Disposition::LeaveCard)
            .map_err(|(_, e)| Error::from(e))?;

        debug!("disconnected from '{}'", self.reader.to_string_lossy());
        Ok(())
    }
}

impl Transmit for Card<'_> {
    /// Transmit a single serialized APDU to the card and receive a response.
    fn transmit_raw(&self, command: &[u8], recv_len: usize) -> Result<Vec<u8>> {
        trace!(">>> {}", hex::upper::encode_string(command));

        let mut recv_buffer = vec![0u8; recv_len];

        let len = {
            let card = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            card.transmit(command, &mut recv_buffer)?.len()
        };

        recv_buffer.truncate(len);
        trace!("<<< {}", hex::upper::encode_string(&recv_buffer));
        Ok(recv_buffer)
    }
}

impl fmt::Debug for Card<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("reader", &self.reader)
            .field("atr", &self.atr)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Atr;

    #[test]
    fn atr_display() {
        let atr = Atr::from(&[0x3b, 0xfd, 0x13, 0x00, 0x00, 0x81][..]);
        assert_eq!(atr.to_string(), "3bfd13000081");
        assert_eq!(atr.as_bytes().len(), 6);
    }
}
