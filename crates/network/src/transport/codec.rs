use std::io;

use agora_network_primitives::messages::Envelope;
use bytes::{Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

#[derive(Debug, Error)]
#[error("CodecError")]
#[non_exhaustive]
pub enum CodecError {
    StdIo(#[from] io::Error),
    Borsh(io::Error),
}

/// Borsh-encoded [`Envelope`]s inside length-delimited frames.
#[derive(Debug)]
pub struct EnvelopeCodec {
    length_codec: LengthDelimitedCodec,
}

impl EnvelopeCodec {
    #[must_use]
    pub fn new() -> Self {
        Self {
            length_codec: LengthDelimitedCodec::new(),
        }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.length_codec.decode(src)? else {
            return Ok(None);
        };

        borsh::from_slice(&frame)
            .map(Some)
            .map_err(CodecError::Borsh)
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = borsh::to_vec(&item).map_err(CodecError::Borsh)?;

        self.length_codec
            .encode(Bytes::from(bytes), dst)
            .map_err(CodecError::StdIo)
    }
}
