//! Application Protocol Data Unit (APDU)

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
    status::{self, StatusError},
    Buffer, Error, Result,
};
use log::trace;
use zeroize::{Zeroize, Zeroizing};

/// Maximum amount of command data that can be included in a short APDU
const APDU_DATA_MAX: usize = 0xFF;

/// Maximum amount of command data that can be included in an extended APDU
const APDU_EXTENDED_DATA_MAX: usize = 0xFFFF;

/// Size of the receive buffer: 256 bytes of data plus the status words
pub const RESPONSE_BUFFER_SIZE: usize = 258;

/// Transport capable of exchanging raw APDUs with a card.
pub trait Transmit {
    /// Send a serialized command APDU and return the raw response, including
    /// the trailing status words. At most `recv_len` bytes are returned.
    fn transmit_raw(&self, command: &[u8], recv_len: usize) -> Result<Vec<u8>>;
}

/// Encoding options for an [`Apdu`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ApduOptions {
    /// The last byte of the command data is a padding indicator byte and is
    /// excluded from `Lc`.
    ///
    /// This assumes the caller has appended exactly one such byte.
    pub padding_indicator: bool,

    /// Encode `Lc` in the three byte extended form `00 Lc_hi Lc_lo`.
    pub extended_length: bool,
}

/// Application Protocol Data Unit (APDU).
///
/// Command messages sent to a card: `CLA INS P1 P2 [Lc DATA] Le`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Apdu {
    /// Instruction class: indicates the type of command (e.g. inter-industry or proprietary)
    cla: u8,

    /// Instruction code: indicates the specific command (e.g. "write data")
    ins: Ins,

    /// Instruction parameter 1 for the command (e.g. offset into file at which to write the data)
    p1: u8,

    /// Instruction parameter 2 for the command
    p2: u8,

    /// Command data to be sent
    data: Vec<u8>,

    /// Expected length of the response data (`Le`), where `0` means 256
    le: u8,

    /// Length encoding options
    options: ApduOptions,
}

impl Apdu {
    /// Create a new APDU with the given instruction code
    pub fn new(ins: impl Into<Ins>) -> Self {
        Self {
            cla: 0,
            ins: ins.into(),
            p1: 0,
            p2: 0,
            data: vec![],
            le: 0,
            options: ApduOptions::default(),
        }
    }

    /// Set this APDU's class
    pub fn cla(&mut self, value: u8) -> &mut Self {
        self.cla = value;
        self
    }

    /// Set this APDU's first parameter only
    pub fn p1(&mut self, value: u8) -> &mut Self {
        self.p1 = value;
        self
    }

    /// Set this APDU's second parameter only
    pub fn p2(&mut self, value: u8) -> &mut Self {
        self.p2 = value;
        self
    }

    /// Set both parameters for this APDU
    pub fn params(&mut self, p1: u8, p2: u8) -> &mut Self {
        self.p1 = p1;
        self.p2 = p2;
        self
    }

    /// Set the command data for this APDU.
    pub fn data(&mut self, bytes: impl AsRef<[u8]>) -> &mut Self {
        self.data.zeroize();
        self.data = bytes.as_ref().to_vec();
        self
    }

    /// Set the expected response length (`Le`)
    pub fn expected_len(&mut self, le: u8) -> &mut Self {
        self.le = le;
        self
    }

    /// Set the length encoding options
    pub fn options(&mut self, options: ApduOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Mark the last data byte as a padding indicator
    pub fn padding_indicator(&mut self, enabled: bool) -> &mut Self {
        self.options.padding_indicator = enabled;
        self
    }

    /// Use extended length encoding for `Lc`
    pub fn extended_length(&mut self, enabled: bool) -> &mut Self {
        self.options.extended_length = enabled;
        self
    }

    /// Instruction of this APDU
    pub fn ins(&self) -> Ins {
        self.ins
    }

    /// Serialize this APDU as a self-zeroizing byte buffer.
    ///
    /// Returns [`Error::SizeError`] if the data does not fit the selected
    /// length encoding.
    pub fn to_bytes(&self) -> Result<Buffer> {
        let mut bytes = Vec::with_capacity(8 + self.data.len());
        bytes.extend_from_slice(&[self.cla, self.ins.code(), self.p1, self.p2]);

        if !self.data.is_empty() {
            let mut lc = self.data.len();

            if self.options.padding_indicator {
                lc -= 1;
            }

            if self.options.extended_length {
                if lc > APDU_EXTENDED_DATA_MAX {
                    return Err(Error::SizeError);
                }

                bytes.push(0);
                bytes.extend_from_slice(&(lc as u16).to_be_bytes());
            } else {
                if lc > APDU_DATA_MAX {
                    return Err(Error::SizeError);
                }

                bytes.push(lc as u8);
            }

            bytes.extend_from_slice(&self.data);
        }

        bytes.push(self.le);
        Ok(Zeroizing::new(bytes))
    }

    /// Transmit this APDU and return the response data.
    ///
    /// Fails with [`Error::ResponseTooShort`] if the card did not return
    /// status words, or with [`Error::Status`] if they do not indicate
    /// success; the response data is discarded in both cases.
    pub fn transmit<T: Transmit + ?Sized>(&self, card: &T) -> Result<Buffer> {
        trace!(">>> {:?}", self);
        let response = Response::from_bytes(card.transmit_raw(&self.to_bytes()?, RESPONSE_BUFFER_SIZE)?)?;
        trace!("<<< {:?}", &response);
        response.into_data()
    }
}

impl Drop for Apdu {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for Apdu {
    fn zeroize(&mut self) {
        // Only `data` may contain secrets
        self.data.zeroize();
    }
}

/// APDU instruction codes
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Ins {
    /// Verify
    Verify,

    /// Change reference data
    ChangeReference,

    /// Reset retry counter
    ResetRetry,

    /// Perform security operation
    PerformSecurityOperation,

    /// Generate asymmetric key pair
    GenerateAsymmetric,

    /// Get challenge
    GetChallenge,

    /// Internal authenticate
    InternalAuthenticate,

    /// Select application
    SelectApplication,

    /// Get response APDU
    GetResponse,

    /// Get data
    GetData,

    /// Put data
    PutData,

    /// Management // Read Config
    ReadConfig,

    /// Management // Write Config
    WriteConfig,

    /// Other/unrecognized instruction codes
    Other(u8),
}

impl Ins {
    /// Get the code that corresponds to this instruction
    pub fn code(self) -> u8 {
        match self {
            Ins::Verify => 0x20,
            Ins::ChangeReference => 0x24,
            Ins::ResetRetry => 0x2c,
            Ins::PerformSecurityOperation => 0x2a,
            Ins::GenerateAsymmetric => 0x47,
            Ins::GetChallenge => 0x84,
            Ins::InternalAuthenticate => 0x88,
            Ins::SelectApplication => 0xa4,
            Ins::GetResponse => 0xc0,
            Ins::GetData => 0xca,
            Ins::PutData => 0xda,

            // Management
            Ins::ReadConfig => 0x1d,
            Ins::WriteConfig => 0x1c,

            Ins::Other(code) => code,
        }
    }
}

impl From<u8> for Ins {
    fn from(code: u8) -> Self {
        match code {
            0x20 => Ins::Verify,
            0x24 => Ins::ChangeReference,
            0x2c => Ins::ResetRetry,
            0x2a => Ins::PerformSecurityOperation,
            0x47 => Ins::GenerateAsymmetric,
            0x84 => Ins::GetChallenge,
            0x88 => Ins::InternalAuthenticate,
            0xa4 => Ins::SelectApplication,
            0xc0 => Ins::GetResponse,
            0xca => Ins::GetData,
            0xda => Ins::PutData,
            0x1d => Ins::ReadConfig,
            0x1c => Ins::WriteConfig,
            code => Ins::Other(code),
        }
    }
}

impl From<Ins> for u8 {
    fn from(ins: Ins) -> u8 {
        ins.code()
    }
}

/// APDU responses: `DATA SW1 SW2`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Response {
    /// Status words
    sw: [u8; 2],

    /// Response data
    data: Buffer,
}

impl Response {
    /// Split the status words off a raw response.
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < 2 {
            bytes.zeroize();
            return Err(Error::ResponseTooShort);
        }

        let len = bytes.len() - 2;
        let sw = [bytes[len], bytes[len + 1]];
        bytes.truncate(len);

        Ok(Response {
            sw,
            data: Zeroizing::new(bytes),
        })
    }

    /// Get the raw status words for this response.
    pub fn code(&self) -> u16 {
        u16::from_be_bytes(self.sw)
    }

    /// Resolve the status words of this response.
    pub fn status(&self) -> core::result::Result<(), StatusError> {
        status::resolve(self.sw[0], self.sw[1])
    }

    /// Do the status words for this response indicate success?
    pub fn is_success(&self) -> bool {
        self.status().is_ok()
    }

    /// Borrow the response data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume this response, returning its data if the status words
    /// indicate success.
    pub fn into_data(self) -> Result<Buffer> {
        self.status()?;
        Ok(self.data)
    }
}

impl AsRef<[u8]> for Response {
    fn as_ref(&self) -> &[u8] {
        self.data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use std::cell::RefCell;

    /// Card which answers every command with a canned response
    struct MockCard {
        response: Vec<u8>,
        commands: RefCell<Vec<Vec<u8>>>,
    }

    impl MockCard {
        fn new(response: &[u8]) -> Self {
            Self {
                response: response.to_vec(),
                commands: RefCell::new(vec![]),
            }
        }
    }

    impl Transmit for MockCard {
        fn transmit_raw(&self, command: &[u8], recv_len: usize) -> Result<Vec<u8>> {
            assert_eq!(recv_len, RESPONSE_BUFFER_SIZE);
            self.commands.borrow_mut().push(command.to_vec());
            Ok(self.response.clone())
        }
    }

    #[test]
    fn select_encoding() {
        let aid = hex!("a0 00 00 03 08 00 00 10 00 01 00 02 03 04 05 06");
        let bytes = Apdu::new(Ins::SelectApplication)
            .p1(0x04)
            .data(aid)
            .to_bytes()
            .unwrap();

        let mut expected = hex!("00 a4 04 00 10").to_vec();
        expected.extend_from_slice(&aid);
        expected.push(0x00);
        assert_eq!(bytes.as_slice(), expected.as_slice());
    }

    #[test]
    fn no_data_encoding() {
        let bytes = Apdu::new(Ins::GetData)
            .params(0x00, 0x6e)
            .expected_len(0xfe)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes.as_slice(), hex!("00 ca 00 6e fe"));
    }

    #[test]
    fn extended_length_encoding() {
        let data = vec![0x5a; 300];
        let bytes = Apdu::new(Ins::PutData)
            .params(0x3f, 0xff)
            .data(&data)
            .extended_length(true)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes[..7], hex!("00 da 3f ff 00 01 2c"));
        assert_eq!(bytes.len(), 7 + 300 + 1);

        assert_eq!(
            Apdu::new(Ins::PutData).data(&data).to_bytes(),
            Err(Error::SizeError)
        );
    }

    #[test]
    fn padding_indicator_encoding() {
        let bytes = Apdu::new(Ins::PerformSecurityOperation)
            .params(0x80, 0x86)
            .data(hex!("00 11 22 33"))
            .padding_indicator(true)
            .to_bytes()
            .unwrap();
        assert_eq!(bytes.as_slice(), hex!("00 2a 80 86 03 00 11 22 33 00"));

        let bytes = Apdu::new(Ins::PerformSecurityOperation)
            .data(hex!("00 11 22 33"))
            .options(ApduOptions {
                padding_indicator: true,
                extended_length: true,
            })
            .to_bytes()
            .unwrap();
        assert_eq!(bytes.as_slice(), hex!("00 2a 00 00 00 00 03 00 11 22 33 00"));
    }

    #[test]
    fn transmit_success_without_body() {
        let card = MockCard::new(&hex!("90 00"));
        let data = Apdu::new(Ins::SelectApplication)
            .p1(0x04)
            .data(hex!("d2 76 00 01 24 01"))
            .transmit(&card)
            .unwrap();
        assert!(data.is_empty());
        assert_eq!(
            card.commands.borrow()[0],
            hex!("00 a4 04 00 06 d2 76 00 01 24 01 00")
        );
    }

    #[test]
    fn transmit_success_with_body() {
        let card = MockCard::new(&hex!("01 02 03 90 00"));
        let data = Apdu::new(Ins::GetChallenge).transmit(&card).unwrap();
        assert_eq!(data.as_slice(), hex!("01 02 03"));
    }

    #[test]
    fn transmit_status_error() {
        let card = MockCard::new(&hex!("de ad 6a 82"));
        assert_eq!(
            Apdu::new(Ins::SelectApplication).transmit(&card),
            Err(Error::Status(StatusError::FileOrApplicationNotFound))
        );
    }

    #[test]
    fn transmit_response_too_short() {
        for response in [&[][..], &[0x90][..]] {
            let card = MockCard::new(response);
            assert_eq!(
                Apdu::new(Ins::GetData).transmit(&card),
                Err(Error::ResponseTooShort)
            );
        }
    }

    #[test]
    fn response_status_words() {
        let response = Response::from_bytes(hex!("aa 63 c2").to_vec()).unwrap();
        assert_eq!(response.code(), 0x63c2);
        assert_eq!(response.data(), [0xaa]);
        assert!(!response.is_success());
        assert_eq!(
            response.into_data(),
            Err(Error::Status(StatusError::Unmapped { sw1: 0x63, sw2: 0xc2 }))
        );
    }

    #[test]
    fn ins_round_trip() {
        for code in 0..=u8::MAX {
            assert_eq!(Ins::from(code).code(), code);
        }
    }
}
