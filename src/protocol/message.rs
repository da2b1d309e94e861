//! Protocol message definitions
//!
//! Defines every message kind exchanged between a game client and the
//! game server, and the closed set of wire discriminants.

use std::fmt;

/// Identifier of an axiom offered during a round
pub type AxiomId = u8;

/// Number of axioms offered at the start of each round
pub const AXIOMS_PER_ROUND: usize = 6;

/// Wire discriminant of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum MessageType {
    ReadyStatusChanged = 0x00,
    GameInit = 0x01,
    RoundInit = 0x02,
    PlayerTurnStart = 0x03,
    SelectionMade = 0x04,
    EvaluateSelections = 0x05,
}

impl MessageType {
    /// All defined message types, in discriminant order
    pub const ALL: [MessageType; 6] = [
        MessageType::ReadyStatusChanged,
        MessageType::GameInit,
        MessageType::RoundInit,
        MessageType::PlayerTurnStart,
        MessageType::SelectionMade,
        MessageType::EvaluateSelections,
    ];

    /// Exact payload length this message type carries on the wire
    pub fn payload_len(self) -> usize {
        match self {
            MessageType::ReadyStatusChanged => 1,
            MessageType::GameInit => 0,
            MessageType::RoundInit => AXIOMS_PER_ROUND,
            MessageType::PlayerTurnStart => 0,
            MessageType::SelectionMade => 1,
            MessageType::EvaluateSelections => 0,
        }
    }
}

impl From<MessageType> for u8 {
    fn from(value: MessageType) -> u8 {
        value as u8
    }
}

impl TryFrom<u8> for MessageType {
    /// The unrecognised discriminant
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(MessageType::ReadyStatusChanged),
            0x01 => Ok(MessageType::GameInit),
            0x02 => Ok(MessageType::RoundInit),
            0x03 => Ok(MessageType::PlayerTurnStart),
            0x04 => Ok(MessageType::SelectionMade),
            0x05 => Ok(MessageType::EvaluateSelections),
            other => Err(other),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02x})", self, *self as u8)
    }
}

/// All possible protocol messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Message {
    /// Player toggled "ready" in the waiting room
    ReadyStatusChanged {
        ready: bool,
    },

    /// All players are ready, the game is starting
    GameInit,

    /// A new round begins with these axioms on offer
    RoundInit {
        available_axioms: [AxiomId; AXIOMS_PER_ROUND],
    },

    /// It is the receiving player's turn
    PlayerTurnStart,

    /// A player picked an axiom
    SelectionMade {
        selection: AxiomId,
    },

    /// Round is over, score the selections
    EvaluateSelections,
}

impl Message {
    /// Get the message type discriminant
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::ReadyStatusChanged { .. } => MessageType::ReadyStatusChanged,
            Message::GameInit => MessageType::GameInit,
            Message::RoundInit { .. } => MessageType::RoundInit,
            Message::PlayerTurnStart => MessageType::PlayerTurnStart,
            Message::SelectionMade { .. } => MessageType::SelectionMade,
            Message::EvaluateSelections => MessageType::EvaluateSelections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_discriminants() {
        for (i, ty) in MessageType::ALL.iter().enumerate() {
            assert_eq!(u8::from(*ty), i as u8);
            assert_eq!(MessageType::try_from(i as u8), Ok(*ty));
        }
    }

    #[test]
    fn test_unknown_discriminant() {
        assert_eq!(MessageType::try_from(0x06), Err(0x06));
        assert_eq!(MessageType::try_from(0xFF), Err(0xFF));
    }

    #[test]
    fn test_message_type_of_variants() {
        let msg = Message::ReadyStatusChanged { ready: true };
        assert_eq!(msg.message_type(), MessageType::ReadyStatusChanged);
        assert_eq!(Message::GameInit.message_type().payload_len(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(MessageType::SelectionMade.to_string(), "SelectionMade(0x04)");
    }
}
