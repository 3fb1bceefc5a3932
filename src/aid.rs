//! Application identifiers (AIDs) and registered application provider
//! identifiers (RIDs)

use std::fmt;

/// Registered application provider identifier.
///
/// List of registered RIDs:
/// <https://www.eftlab.com/knowledge-base/complete-list-of-registered-application-provider-identifiers-rid>
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Rid(pub [u8; 5]);

impl Rid {
    /// National Institute of Standards and Technology
    pub const NIST: Rid = Rid([0xa0, 0x00, 0x00, 0x03, 0x08]);
    /// Free Software Foundation Europe
    pub const FSFE: Rid = Rid([0xd2, 0x76, 0x00, 0x01, 0x24]);
    /// Yubico
    pub const YUBICO: Rid = Rid([0xa0, 0x00, 0x00, 0x05, 0x27]);
    /// FIDO Alliance
    pub const FIDO: Rid = Rid([0xa0, 0x00, 0x00, 0x06, 0x47]);
    /// SoloKeys
    pub const SOLOKEYS: Rid = Rid([0xa0, 0x00, 0x00, 0x08, 0x47]);
    /// GlobalPlatform
    pub const GLOBAL_PLATFORM: Rid = Rid([0xa0, 0x00, 0x00, 0x01, 0x51]);
    /// NXP NFC
    pub const NXP_NFC: Rid = Rid([0xd2, 0x76, 0x00, 0x00, 0x85]);

    /// Name of the application provider, if known
    pub fn name(&self) -> Option<&'static str> {
        Some(match *self {
            Rid::NIST => "NIST",
            Rid::FSFE => "FSFE",
            Rid::YUBICO => "Yubico",
            Rid::FIDO => "FIDO",
            Rid::SOLOKEYS => "Solokeys",
            Rid::GLOBAL_PLATFORM => "GlobalPlatform",
            Rid::NXP_NFC => "NXP NFC",
            _ => return None,
        })
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or("<unknown>"))
    }
}

/// Application identifier, used to select an application on a card.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Aid(pub &'static [u8]);

impl Aid {
    /// PIV
    /// <https://nvlpubs.nist.gov/nistpubs/specialpublications/nist.sp.800-73-4.pdf>
    pub const PIV: Aid = Aid(&[0xa0, 0x00, 0x00, 0x03, 0x08, 0x00, 0x00, 0x10, 0x00]);

    /// OpenPGP
    /// <https://gnupg.org/ftp/specs/OpenPGP-smart-card-application-3.4.1.pdf>
    pub const OPENPGP: Aid = Aid(&[0xd2, 0x76, 0x00, 0x01, 0x24, 0x01]);

    /// FIDO (U2F/CTAP over NFC)
    pub const FIDO: Aid = Aid(&[0xa0, 0x00, 0x00, 0x06, 0x47, 0x2f, 0x00, 0x01]);

    /// YubiKey OTP
    pub const YUBICO_OTP: Aid = Aid(&[0xa0, 0x00, 0x00, 0x05, 0x27, 0x20, 0x01]);

    /// YubiKey management
    pub const YUBICO_MANAGEMENT: Aid = Aid(&[0xa0, 0x00, 0x00, 0x05, 0x27, 0x47, 0x11, 0x17]);

    /// YubiKey OATH
    pub const YUBICO_OATH: Aid = Aid(&[0xa0, 0x00, 0x00, 0x05, 0x27, 0x21, 0x01]);

    /// YubiHSM Auth
    pub const YUBICO_HSMAUTH: Aid = Aid(&[0xa0, 0x00, 0x00, 0x05, 0x27, 0x21, 0x07, 0x01]);

    /// SoloKeys admin
    pub const SOLOKEYS_ADMIN: Aid = Aid(&[0xa0, 0x00, 0x00, 0x08, 0x47, 0x00, 0x00, 0x00, 0x01]);

    /// SoloKeys provisioner
    pub const SOLOKEYS_PROVISIONER: Aid =
        Aid(&[0xa0, 0x00, 0x00, 0x08, 0x47, 0x01, 0x00, 0x00, 0x01]);

    /// GlobalPlatform card manager
    pub const CARD_MANAGER: Aid = Aid(&[0xa0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00]);

    /// NFC Forum NDEF
    pub const NDEF: Aid = Aid(&[0xd2, 0x76, 0x00, 0x00, 0x85, 0x01, 0x01]);

    /// Registered application provider of this application
    pub fn rid(&self) -> Option<Rid> {
        self.0.get(..5)?.try_into().ok().map(Rid)
    }
}

impl AsRef<[u8]> for Aid {
    fn as_ref(&self) -> &[u8] {
        self.0
    }
}

impl fmt::Display for Aid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::upper::encode_string(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{Aid, Rid};

    #[test]
    fn rid_prefixes() {
        assert_eq!(Aid::PIV.rid(), Some(Rid::NIST));
        assert_eq!(Aid::OPENPGP.rid(), Some(Rid::FSFE));
        assert_eq!(Aid::FIDO.rid(), Some(Rid::FIDO));
        assert_eq!(Aid::YUBICO_MANAGEMENT.rid(), Some(Rid::YUBICO));
        assert_eq!(Aid::SOLOKEYS_ADMIN.rid(), Some(Rid::SOLOKEYS));
        assert_eq!(Aid::CARD_MANAGER.rid(), Some(Rid::GLOBAL_PLATFORM));
        assert_eq!(Aid::NDEF.rid(), Some(Rid::NXP_NFC));
        assert_eq!(Aid(&[0xa0]).rid(), None);
    }

    #[test]
    fn display() {
        assert_eq!(Rid::YUBICO.to_string(), "Yubico");
        assert_eq!(Rid([1, 2, 3, 4, 5]).to_string(), "<unknown>");
        assert_eq!(Aid::OPENPGP.to_string(), "D27600012401");
    }
}
