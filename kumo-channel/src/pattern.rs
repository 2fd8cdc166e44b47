//! Handshake patterns as data.
//!
//! A pattern lists the static keys each side knows about the other before
//! the handshake starts (pre-messages) and the ordered messages of the
//! handshake itself, each tagged with the [`Role`] that sends it.
//!
//! ```text
//! KK:                    XK:                    XX:                 IK:
//!   -> s                   <- s                   -> e                <- s
//!   <- s                   ...                    <- e, ee, s, es     ...
//!   ...                    -> e, es               -> s, se            -> e, es, s, ss
//!   -> e, es, ss           <- e, ee                                   <- e, ee, se
//!   <- e, ee, se           -> s, se
//! ```

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigError;

/// Which side of the handshake a peer plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Sends the first handshake message.
    Initiator,
    Responder,
}

impl Role {
    pub fn from_initiator(is_initiator: bool) -> Self {
        if is_initiator { Self::Initiator } else { Self::Responder }
    }

    pub fn peer(self) -> Self {
        match self {
            Self::Initiator => Self::Responder,
            Self::Responder => Self::Initiator,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => f.write_str("initiator"),
            Self::Responder => f.write_str("responder"),
        }
    }
}

/// One operation within a handshake message.
///
/// DH tokens name the initiator's key first: `es` is DH(initiator's
/// ephemeral, responder's static) regardless of who is sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    E,
    S,
    EE,
    ES,
    SE,
    SS,
}

/// A single handshake message: who sends it and what it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessagePattern {
    pub sender: Role,
    pub tokens: &'static [Token],
}

impl MessagePattern {
    const fn from_initiator(tokens: &'static [Token]) -> Self {
        Self {
            sender: Role::Initiator,
            tokens,
        }
    }

    const fn from_responder(tokens: &'static [Token]) -> Self {
        Self {
            sender: Role::Responder,
            tokens,
        }
    }
}

/// A named Noise handshake pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakePattern {
    name: &'static str,
    initiator_pre: bool,
    responder_pre: bool,
    messages: &'static [MessagePattern],
}

impl HandshakePattern {
    /// Both static keys are known to both sides in advance.
    pub const KK: Self = Self {
        name: "KK",
        initiator_pre: true,
        responder_pre: true,
        messages: &[
            MessagePattern::from_initiator(&[Token::E, Token::ES, Token::SS]),
            MessagePattern::from_responder(&[Token::E, Token::EE, Token::SE]),
        ],
    };

    /// The initiator knows the responder's static key and transmits its
    /// own, encrypted, in the final message.
    pub const XK: Self = Self {
        name: "XK",
        initiator_pre: false,
        responder_pre: true,
        messages: &[
            MessagePattern::from_initiator(&[Token::E, Token::ES]),
            MessagePattern::from_responder(&[Token::E, Token::EE]),
            MessagePattern::from_initiator(&[Token::S, Token::SE]),
        ],
    };

    /// No static key is known in advance; both are transmitted.
    pub const XX: Self = Self {
        name: "XX",
        initiator_pre: false,
        responder_pre: false,
        messages: &[
            MessagePattern::from_initiator(&[Token::E]),
            MessagePattern::from_responder(&[Token::E, Token::EE, Token::S, Token::ES]),
            MessagePattern::from_initiator(&[Token::S, Token::SE]),
        ],
    };

    /// The initiator knows the responder's static key and sends its own in
    /// the first message.
    pub const IK: Self = Self {
        name: "IK",
        initiator_pre: false,
        responder_pre: true,
        messages: &[
            MessagePattern::from_initiator(&[Token::E, Token::ES, Token::S, Token::SS]),
            MessagePattern::from_responder(&[Token::E, Token::EE, Token::SE]),
        ],
    };

    /// All patterns this crate implements.
    pub const ALL: [Self; 4] = [Self::KK, Self::XK, Self::XX, Self::IK];

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Full Noise protocol name for this pattern and the fixed ciphersuite.
    pub fn protocol_name(&self) -> String {
        format!("Noise_{}_25519_ChaChaPoly_BLAKE2s", self.name)
    }

    pub fn messages(&self) -> &'static [MessagePattern] {
        self.messages
    }

    /// Number of handshake messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether `role`'s static key is a pre-message, i.e. known to the peer
    /// before the handshake starts.
    pub fn static_is_premessage(&self, role: Role) -> bool {
        match role {
            Role::Initiator => self.initiator_pre,
            Role::Responder => self.responder_pre,
        }
    }

    /// Whether `role` transmits its static key during the handshake.
    pub fn transmits_static(&self, role: Role) -> bool {
        self.messages
            .iter()
            .any(|m| m.sender == role && m.tokens.contains(&Token::S))
    }
}

impl fmt::Display for HandshakePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl FromStr for HandshakePattern {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name.eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownPattern(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_names() {
        assert_eq!("KK".parse::<HandshakePattern>().unwrap(), HandshakePattern::KK);
        assert_eq!("xk".parse::<HandshakePattern>().unwrap(), HandshakePattern::XK);
        assert_eq!(
            "NN".parse::<HandshakePattern>(),
            Err(ConfigError::UnknownPattern("NN".into()))
        );
    }

    #[test]
    fn protocol_names() {
        assert_eq!(
            HandshakePattern::KK.protocol_name(),
            "Noise_KK_25519_ChaChaPoly_BLAKE2s"
        );
        assert_eq!(
            HandshakePattern::XK.protocol_name(),
            "Noise_XK_25519_ChaChaPoly_BLAKE2s"
        );
    }

    #[test]
    fn messages_alternate_starting_with_initiator() {
        for pattern in HandshakePattern::ALL {
            let mut expected = Role::Initiator;
            for message in pattern.messages() {
                assert_eq!(message.sender, expected, "{pattern}");
                expected = expected.peer();
            }
        }
    }

    #[test]
    fn every_static_is_known_or_transmitted() {
        for pattern in HandshakePattern::ALL {
            for role in [Role::Initiator, Role::Responder] {
                assert_ne!(
                    pattern.static_is_premessage(role),
                    pattern.transmits_static(role),
                    "{pattern} {role}"
                );
            }
        }
    }

    #[test]
    fn message_counts() {
        assert_eq!(HandshakePattern::KK.len(), 2);
        assert_eq!(HandshakePattern::XK.len(), 3);
        assert_eq!(HandshakePattern::XX.len(), 3);
        assert_eq!(HandshakePattern::IK.len(), 2);
    }
}
