//! ISO 7816-4 status word taxonomy

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

use std::fmt;

macro_rules! status_errors {
    ($($(#[$attr:meta])* $name:ident = $code:literal, $msg:literal;)+) => {
        /// Failure reported by a card through its status words (SW1/SW2).
        ///
        /// See ISO/IEC 7816-4, section 5.1.3. Status words which are not
        /// catalogued here are carried verbatim by [`StatusError::Unmapped`].
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum StatusError {
            $($(#[$attr])* $name,)+

            /// Status words not found in the catalogue
            Unmapped {
                /// First status byte
                sw1: u8,
                /// Second status byte
                sw2: u8,
            },
        }

        impl StatusError {
            /// All catalogued status errors.
            pub const ALL: &'static [StatusError] = &[$(StatusError::$name,)+];

            /// Get the raw status words for this error
            pub fn code(self) -> u16 {
                match self {
                    $(StatusError::$name => $code,)+
                    StatusError::Unmapped { sw1, sw2 } => u16::from_be_bytes([sw1, sw2]),
                }
            }

            /// Description of this error
            pub fn msg(self) -> &'static str {
                match self {
                    $(StatusError::$name => $msg,)+
                    StatusError::Unmapped { .. } => "unspecified status",
                }
            }

            fn from_code(sw: u16) -> Self {
                match sw {
                    $($code => StatusError::$name,)+
                    _ => {
                        let [sw1, sw2] = sw.to_be_bytes();
                        StatusError::Unmapped { sw1, sw2 }
                    }
                }
            }
        }
    };
}

/// Status words signalling successful execution.
pub const SW_SUCCESS: u16 = 0x9000;

status_errors! {
    /// No information given (warning)
    UnspecifiedWarning = 0x6200, "no information given (warning)";
    /// No information given (warning), non-volatile memory has changed
    UnspecifiedWarningModified = 0x6300, "no information given (warning), non-volatile memory has changed";
    /// No information given (error)
    UnspecifiedError = 0x6400, "no information given (error)";
    /// No information given (error), non-volatile memory has changed
    UnspecifiedErrorModified = 0x6500, "no information given (error), non-volatile memory has changed";
    /// Wrong length; no further indication
    WrongLength = 0x6700, "wrong length; no further indication";
    /// Function in CLA not supported
    UnsupportedFunction = 0x6800, "function in CLA not supported";
    /// Command not allowed
    CommandNotAllowed = 0x6900, "command not allowed";
    /// Wrong parameters P1-P2, no information given
    WrongParamsNoInfo = 0x6A00, "wrong parameters P1-P2 (no information given)";
    /// Wrong parameters P1-P2
    WrongParams = 0x6B00, "wrong parameters P1-P2";
    /// Instruction code not supported or invalid
    UnsupportedInstruction = 0x6D00, "instruction code not supported or invalid";
    /// Class not supported
    UnsupportedClass = 0x6E00, "class not supported";
    /// No precise diagnosis
    NoPreciseDiagnosis = 0x6F00, "no precise diagnosis";
    /// Part of returned data may be corrupted
    ResponseMayBeCorrupted = 0x6281, "part of returned data may be corrupted";
    /// End of file or record reached before reading Ne bytes
    EndOfFile = 0x6282, "end of file or record reached before reading Ne bytes";
    /// Selected file deactivated
    SelectedFileDeactivated = 0x6283, "selected file deactivated";
    /// File control information not formatted according to 5.3.3
    InvalidFileControlInfo = 0x6284, "file control information not formatted according to 5.3.3";
    /// Selected file in termination state
    SelectedFileInTermination = 0x6285, "selected file in termination state";
    /// No input data available from a sensor on the card
    NoSensorData = 0x6286, "no input data available from a sensor on the card";
    /// File filled up by the last write
    FileFilledUp = 0x6381, "file filled up by the last write";
    /// Immediate response required by the card
    ImmediateResponseRequired = 0x6401, "immediate response required by the card";
    /// Memory failure
    MemoryFailure = 0x6581, "memory failure";
    /// Logical channel not supported
    LogicalChannelNotSupported = 0x6881, "logical channel not supported";
    /// Secure messaging not supported
    SecureMessagingNotSupported = 0x6882, "secure messaging not supported";
    /// Last command of the chain expected
    ExpectedLastCommand = 0x6883, "last command of the chain expected";
    /// Command chaining not supported
    CommandChainingNotSupported = 0x6884, "command chaining not supported";
    /// Command incompatible with file structure
    CommandIncompatibleWithFile = 0x6981, "command incompatible with file structure";
    /// Security status not satisfied
    SecurityStatusNotSatisfied = 0x6982, "security status not satisfied";
    /// Authentication method blocked
    AuthenticationMethodBlocked = 0x6983, "authentication method blocked";
    /// Reference data not usable
    ReferenceDataNotUsable = 0x6984, "reference data not usable";
    /// Conditions of use not satisfied
    ConditionsOfUseNotSatisfied = 0x6985, "conditions of use not satisfied";
    /// Command not allowed (no current EF)
    CommandNotAllowedNoCurrentEf = 0x6986, "command not allowed (no current EF)";
    /// Expected secure messaging data objects missing
    ExpectedSecureMessaging = 0x6987, "expected secure messaging data objects missing";
    /// Incorrect secure messaging data objects
    IncorrectSecureMessagingDataObjects = 0x6988, "incorrect secure messaging data objects";
    /// Incorrect parameters in the command data field
    IncorrectData = 0x6A80, "incorrect parameters in the command data field";
    /// Function not supported
    FunctionNotSupported = 0x6A81, "function not supported";
    /// File or application not found
    FileOrApplicationNotFound = 0x6A82, "file or application not found";
    /// Record not found
    RecordNotFound = 0x6A83, "record not found";
    /// Not enough memory space in the file
    NoSpace = 0x6A84, "not enough memory space in the file";
    /// Nc inconsistent with TLV structure
    InvalidNcWithTlv = 0x6A85, "nc inconsistent with TLV structure";
    /// Incorrect parameters P1-P2
    IncorrectParams = 0x6A86, "incorrect parameters P1-P2";
    /// Nc inconsistent with parameters P1-P2
    InvalidNcWithParams = 0x6A87, "nc inconsistent with parameters P1-P2";
    /// Referenced data or reference data not found (exact meaning depending on the command)
    ReferenceDataNotFound = 0x6A88, "referenced data or reference data not found (exact meaning depending on the command)";
    /// File already exists
    FileAlreadyExists = 0x6A89, "file already exists";
    /// DF name already exists
    DfNameAlreadyExists = 0x6A8A, "DF name already exists";
}

/// Resolve the status words of a response.
///
/// Returns `Ok(())` for `90 00` and the catalogued [`StatusError`] for any
/// other value.
pub fn resolve(sw1: u8, sw2: u8) -> Result<(), StatusError> {
    match u16::from_be_bytes([sw1, sw2]) {
        SW_SUCCESS => Ok(()),
        sw => Err(StatusError::from_code(sw)),
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:04X})", self.msg(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, StatusError};

    #[test]
    fn success() {
        assert_eq!(resolve(0x90, 0x00), Ok(()));
    }

    #[test]
    fn catalogued_status_words() {
        assert_eq!(resolve(0x6a, 0x82), Err(StatusError::FileOrApplicationNotFound));
        assert_eq!(resolve(0x69, 0x82), Err(StatusError::SecurityStatusNotSatisfied));
        assert_eq!(resolve(0x67, 0x00), Err(StatusError::WrongLength));
        assert_eq!(resolve(0x6a, 0x88), Err(StatusError::ReferenceDataNotFound));
        assert_eq!(resolve(0x69, 0x81), Err(StatusError::CommandIncompatibleWithFile));

        assert_eq!(StatusError::ALL.len(), 44);
        for &sw in StatusError::ALL {
            let [sw1, sw2] = sw.code().to_be_bytes();
            assert_eq!(resolve(sw1, sw2), Err(sw));
        }
    }

    #[test]
    fn unmapped_status_words_are_errors() {
        assert_eq!(
            resolve(0x63, 0xc2),
            Err(StatusError::Unmapped { sw1: 0x63, sw2: 0xc2 })
        );
        assert_eq!(
            resolve(0x61, 0x10),
            Err(StatusError::Unmapped { sw1: 0x61, sw2: 0x10 })
        );
        assert_eq!(StatusError::Unmapped { sw1: 0x12, sw2: 0x34 }.code(), 0x1234);
    }
}
