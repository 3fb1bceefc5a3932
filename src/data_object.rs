//! Catalogue of known OpenPGP card data objects
//!
//! See the OpenPGP smart card application specification, version 3.4,
//! section 4.4.1:
//! <https://gnupg.org/ftp/specs/OpenPGP-smart-card-application-3.4.1.pdf>

use crate::tlv;
use std::fmt;

/// Tag value used as the parent of top-level data objects.
pub const ROOT: u16 = 0;

/// A known data object.
///
/// Data objects refer to their enclosing template by tag; the relation is a
/// lookup aid only, every entry is a standalone `'static` value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DataObject {
    tag: u16,
    constructed: bool,
    parent: u16,
    binary: bool,
    extended_length: u8,
    description: &'static str,
}

impl DataObject {
    const fn new(
        tag: u16,
        constructed: bool,
        parent: u16,
        binary: bool,
        extended_length: u8,
        description: &'static str,
    ) -> Self {
        Self {
            tag,
            constructed,
            parent,
            binary,
            extended_length,
            description,
        }
    }

    /// Look up a data object by its tag
    pub fn by_tag(tag: u16) -> Option<&'static DataObject> {
        DATA_OBJECTS.iter().find(|object| object.tag == tag)
    }

    /// Data objects contained in the template with the given tag, in
    /// catalogue order
    pub fn children_of(tag: u16) -> Vec<&'static DataObject> {
        DATA_OBJECTS
            .iter()
            .filter(|object| object.parent == tag)
            .collect()
    }

    /// Tag of this data object
    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// Tag as the `P1`/`P2` pair of a GET DATA / PUT DATA command
    pub fn tag_bytes(&self) -> [u8; 2] {
        self.tag.to_be_bytes()
    }

    /// Is this a constructed data object (template)?
    pub fn is_constructed(&self) -> bool {
        self.constructed
    }

    /// Tag of the enclosing template, or [`ROOT`]
    pub fn parent_tag(&self) -> u16 {
        self.parent
    }

    /// Enclosing template, if any
    pub fn parent(&self) -> Option<&'static DataObject> {
        match self.parent {
            ROOT => None,
            tag => Self::by_tag(tag),
        }
    }

    /// Data objects contained in this template
    pub fn children(&self) -> Vec<&'static DataObject> {
        Self::children_of(self.tag)
    }

    /// Does this data object hold binary data (as opposed to text)?
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Extended length behaviour: `0` never needs extended length, `1` may
    /// need it, `2` requires it when the card supports it
    pub fn extended_length_bytes(&self) -> u8 {
        self.extended_length
    }

    /// Human readable description
    pub fn description(&self) -> &'static str {
        self.description
    }

    /// Find the value of this data object within a card response
    pub fn find_in<'a>(&self, buffer: &'a [u8]) -> Option<&'a [u8]> {
        tlv::find(self.tag, buffer)
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} ({})", self.tag, self.description)
    }
}

/// URL
pub const URL: DataObject = DataObject::new(0x5f50, false, ROOT, false, 2, "URL");
/// Historical bytes
pub const HISTORICAL_BYTES: DataObject =
    DataObject::new(0x5f52, false, ROOT, true, 0, "Historical Bytes");
/// Cardholder related data
pub const CARDHOLDER_DATA: DataObject =
    DataObject::new(0x0065, true, ROOT, true, 0, "Cardholder Related Data");
/// Cardholder name
pub const NAME: DataObject = DataObject::new(0x005b, false, 0x0065, false, 0, "Name");
/// Language preferences
pub const LANGUAGE_PREFS: DataObject =
    DataObject::new(0x5f2d, false, 0x0065, false, 0, "Language preferences");
/// Salutation
pub const SALUTATION: DataObject = DataObject::new(0x5f35, false, 0x0065, false, 0, "Salutation");
/// Application related data
pub const APPLICATION_DATA: DataObject =
    DataObject::new(0x006e, true, ROOT, true, 0, "Application Related Data");
/// Login data
pub const LOGIN_DATA: DataObject = DataObject::new(0x005e, false, ROOT, true, 2, "Login Data");
/// Application identifier
pub const AID: DataObject =
    DataObject::new(0x004f, false, 0x006e, true, 0, "Application Identifier (AID)");
/// Discretionary data objects
pub const DISCRETIONARY_DATA: DataObject =
    DataObject::new(0x0073, true, ROOT, true, 0, "Discretionary Data Objects");
/// Card capabilities
pub const CARD_CAPABILITIES: DataObject =
    DataObject::new(0x0047, false, 0x006e, true, 0, "Card Capabilities");
/// Extended card capabilities
pub const EXTENDED_CAPABILITIES: DataObject =
    DataObject::new(0x00c0, false, 0x006e, true, 0, "Extended Card Capabilities");
/// Algorithm attributes of the signature key
pub const ALGORITHM_ATTRIBUTES_SIGN: DataObject =
    DataObject::new(0x00c1, false, 0x006e, true, 0, "Algorithm Attributes Signature");
/// Algorithm attributes of the decryption key
pub const ALGORITHM_ATTRIBUTES_DEC: DataObject =
    DataObject::new(0x00c2, false, 0x006e, true, 0, "Algorithm Attributes Encryption");
/// Algorithm attributes of the authentication key
pub const ALGORITHM_ATTRIBUTES_AUTH: DataObject = DataObject::new(
    0x00c3,
    false,
    0x006e,
    true,
    0,
    "Algorithm Attributes Authentication",
);
/// PW status bytes
pub const PW_STATUS: DataObject =
    DataObject::new(0x00c4, false, 0x006e, true, 0, "Password Status Bytes");
/// Key fingerprints
pub const FINGERPRINTS: DataObject =
    DataObject::new(0x00c5, false, 0x006e, true, 0, "Fingerprints");
/// CA fingerprints
pub const CA_FINGERPRINTS: DataObject =
    DataObject::new(0x00c6, false, 0x006e, true, 0, "CA Fingerprints");
/// Key generation timestamps
pub const KEY_GENERATION_DATES: DataObject =
    DataObject::new(0x00cd, false, 0x006e, true, 0, "Generation times of key pairs");
/// Security support template
pub const SECURITY_SUPPORT: DataObject =
    DataObject::new(0x007a, true, ROOT, true, 0, "Security Support Template");
/// Digital signature counter
pub const SIGNATURE_COUNTER: DataObject =
    DataObject::new(0x0093, false, 0x007a, true, 0, "Digital Signature Counter");
/// Private use data object 1
pub const PRIVATE_DO_1: DataObject = DataObject::new(0x0101, false, ROOT, false, 2, "Private DO 1");
/// Private use data object 2
pub const PRIVATE_DO_2: DataObject = DataObject::new(0x0102, false, ROOT, false, 2, "Private DO 2");
/// Private use data object 3
pub const PRIVATE_DO_3: DataObject = DataObject::new(0x0103, false, ROOT, false, 2, "Private DO 3");
/// Private use data object 4
pub const PRIVATE_DO_4: DataObject = DataObject::new(0x0104, false, ROOT, false, 2, "Private DO 4");
/// Cardholder certificate
pub const CARDHOLDER_CERTIFICATE: DataObject =
    DataObject::new(0x7f21, true, ROOT, true, 1, "Cardholder certificate");
/// General feature management (v3.0)
pub const GENERAL_FEATURE_MANAGEMENT: DataObject =
    DataObject::new(0x7f74, true, 0x006e, true, 0, "General Feature Management");
/// AES key data (v3.0)
pub const AES_KEY_DATA: DataObject = DataObject::new(0x00d5, false, ROOT, true, 0, "AES key data");
/// User interaction flag of the signature key (v3.0)
pub const UIF_SIGN: DataObject =
    DataObject::new(0x00d6, false, 0x006e, true, 0, "UIF for Signature");
/// User interaction flag of the decryption key (v3.0)
pub const UIF_DEC: DataObject =
    DataObject::new(0x00d7, false, 0x006e, true, 0, "UIF for Decryption");
/// User interaction flag of the authentication key (v3.0)
pub const UIF_AUTH: DataObject =
    DataObject::new(0x00d8, false, 0x006e, true, 0, "UIF for Authentication");
/// User interaction flag of the attestation key (Yubico extension)
pub const UIF_ATTESTATION: DataObject = DataObject::new(
    0x00d9,
    false,
    0x006e,
    true,
    0,
    "UIF for Yubico Attestation key",
);
/// KDF data object (v3.0)
pub const KDF: DataObject = DataObject::new(0x00f9, true, ROOT, true, 0, "KDF data object");
/// Algorithm information (v3.0)
pub const ALGORITHM_INFORMATION: DataObject =
    DataObject::new(0x00fa, true, ROOT, true, 2, "Algorithm Information");

/// Every known data object.
pub static DATA_OBJECTS: &[DataObject] = &[
    URL,
    HISTORICAL_BYTES,
    CARDHOLDER_DATA,
    NAME,
    LANGUAGE_PREFS,
    SALUTATION,
    APPLICATION_DATA,
    LOGIN_DATA,
    AID,
    DISCRETIONARY_DATA,
    CARD_CAPABILITIES,
    EXTENDED_CAPABILITIES,
    ALGORITHM_ATTRIBUTES_SIGN,
    ALGORITHM_ATTRIBUTES_DEC,
    ALGORITHM_ATTRIBUTES_AUTH,
    PW_STATUS,
    FINGERPRINTS,
    CA_FINGERPRINTS,
    KEY_GENERATION_DATES,
    SECURITY_SUPPORT,
    SIGNATURE_COUNTER,
    PRIVATE_DO_1,
    PRIVATE_DO_2,
    PRIVATE_DO_3,
    PRIVATE_DO_4,
    CARDHOLDER_CERTIFICATE,
    GENERAL_FEATURE_MANAGEMENT,
    AES_KEY_DATA,
    UIF_SIGN,
    UIF_DEC,
    UIF_AUTH,
    UIF_ATTESTATION,
    KDF,
    ALGORITHM_INFORMATION,
];
