use serde::{Deserialize, Serialize};
use std::fmt;

/// WebSocket close codes as defined in RFC 6455 (and the IANA registry)
///
/// Any integer outside the enumerated set maps to [`CloseCode::Custom`], so
/// converting to and from the wire integer never fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum CloseCode {
    /// 1000: normal closure
    #[default]
    Normal,
    /// 1001: endpoint going away (server shutdown, page navigation)
    GoingAway,
    /// 1002: protocol error
    ProtocolError,
    /// 1003: received a data type it cannot accept
    UnsupportedData,
    /// 1005: no status code was present in the close frame
    NoStatusReceived,
    /// 1006: connection dropped without a close frame
    AbnormalClosure,
    /// 1007: payload inconsistent with the message type
    InvalidPayload,
    /// 1008: policy violation
    PolicyViolation,
    /// 1009: message too big to process
    MessageTooBig,
    /// 1010: client expected an extension the server did not negotiate
    MandatoryExtension,
    /// 1011: unexpected server condition
    InternalError,
    /// 1012: service restart
    ServiceRestart,
    /// 1013: try again later
    TryAgainLater,
    /// 1014: bad gateway
    BadGateway,
    /// 1015: TLS handshake failure
    TlsHandshake,
    /// Any other code, typically application-defined (3000-4999)
    ///
    /// `Custom(1000)` and `Normal` describe the same close but do not compare
    /// equal; use [`normalized`](CloseCode::normalized) or compare
    /// [`as_u16`](CloseCode::as_u16) values.
    Custom(u16),
}

impl CloseCode {
    /// Numeric close code as sent on the wire
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Normal => 1000,
            Self::GoingAway => 1001,
            Self::ProtocolError => 1002,
            Self::UnsupportedData => 1003,
            Self::NoStatusReceived => 1005,
            Self::AbnormalClosure => 1006,
            Self::InvalidPayload => 1007,
            Self::PolicyViolation => 1008,
            Self::MessageTooBig => 1009,
            Self::MandatoryExtension => 1010,
            Self::InternalError => 1011,
            Self::ServiceRestart => 1012,
            Self::TryAgainLater => 1013,
            Self::BadGateway => 1014,
            Self::TlsHandshake => 1015,
            Self::Custom(code) => code,
        }
    }

    /// Map a numeric close code to its variant
    pub fn from_u16(code: u16) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::GoingAway,
            1002 => Self::ProtocolError,
            1003 => Self::UnsupportedData,
            1005 => Self::NoStatusReceived,
            1006 => Self::AbnormalClosure,
            1007 => Self::InvalidPayload,
            1008 => Self::PolicyViolation,
            1009 => Self::MessageTooBig,
            1010 => Self::MandatoryExtension,
            1011 => Self::InternalError,
            1012 => Self::ServiceRestart,
            1013 => Self::TryAgainLater,
            1014 => Self::BadGateway,
            1015 => Self::TlsHandshake,
            other => Self::Custom(other),
        }
    }

    /// Canonical variant for this code (`Custom(1000)` becomes `Normal`)
    pub fn normalized(self) -> Self {
        Self::from_u16(self.as_u16())
    }

    /// Every enumerated (non-custom) code
    pub const STANDARD: [CloseCode; 15] = [
        Self::Normal,
        Self::GoingAway,
        Self::ProtocolError,
        Self::UnsupportedData,
        Self::NoStatusReceived,
        Self::AbnormalClosure,
        Self::InvalidPayload,
        Self::PolicyViolation,
        Self::MessageTooBig,
        Self::MandatoryExtension,
        Self::InternalError,
        Self::ServiceRestart,
        Self::TryAgainLater,
        Self::BadGateway,
        Self::TlsHandshake,
    ];
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_u16(code)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}
