//! Artifact descriptor and the packed result word returned by `assemble`.

use serde::{Deserialize, Serialize};

/// Packed result word that signals assembly failure.
///
/// This is the only value treated as failure; every other word carries an
/// artifact length in its high half and an origin in its low half.
pub const FAILURE_SENTINEL: u32 = 0xFFFF_FFFF;

/// Location and entry point of a successfully assembled program.
///
/// The three fields only ever exist together: a session holds either a
/// complete descriptor or none at all.
///
/// The guest VM addresses 16 bits. `pointer` is kept as `u32` so that a
/// program filling a larger memory is still reported exactly; such a
/// descriptor fails [`ArtifactDescriptor::fits_word_address_space`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Offset of the artifact in guest memory, one past the encoded program.
    pub pointer: u32,

    /// Length of the artifact in bytes.
    pub length: u16,

    /// Address execution starts at.
    pub origin: u16,
}

impl ArtifactDescriptor {
    /// Returns `true` if `pointer` is addressable by the 16-bit guest VM.
    pub fn fits_word_address_space(&self) -> bool {
        self.pointer <= u32::from(u16::MAX)
    }
}

/// Decoded form of the word returned by `assemble`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedResult {
    /// The guest rejected the program.
    Failure,

    /// The guest produced an artifact.
    Artifact {
        /// High 16 bits of the word.
        length: u16,
        /// Low 16 bits of the word.
        origin: u16,
    },
}

impl PackedResult {
    /// Split a result word into its halves, or recognise the sentinel.
    #[allow(clippy::cast_possible_truncation)]
    pub fn decode(word: u32) -> Self {
        if word == FAILURE_SENTINEL {
            return Self::Failure;
        }

        Self::Artifact {
            length: (word >> 16) as u16,
            origin: (word & 0xFFFF) as u16,
        }
    }

    /// Attach the artifact's location, if the guest produced one.
    pub fn into_descriptor(self, pointer: u32) -> Option<ArtifactDescriptor> {
        match self {
            Self::Failure => None,
            Self::Artifact { length, origin } => Some(ArtifactDescriptor {
                pointer,
                length,
                origin,
            }),
        }
    }
}
