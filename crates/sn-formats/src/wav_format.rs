//! WAV encoding and decoding for 16-bit stereo PCM.

use std::io::{Read, Seek, Write};

use binrw::{BinRead, BinWrite};
use sn_engine::Frame;

use crate::FormatError;

const CHANNELS: u16 = 2;
const BITS_PER_SAMPLE: u16 = 16;
const BLOCK_ALIGN: u16 = CHANNELS * (BITS_PER_SAMPLE / 8);

/// Canonical 44-byte RIFF/WAVE header with a single `fmt ` and `data` chunk.
#[derive(Clone, Debug, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little, magic = b"RIFF")]
struct WavHeader {
    riff_size: u32,
    #[brw(magic = b"WAVEfmt ")]
    fmt_size: u32,
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    #[brw(magic = b"data")]
    data_size: u32,
}

impl WavHeader {
    fn pcm16_stereo(sample_rate: u32, frames: usize) -> Self {
        let data_size = frames as u32 * BLOCK_ALIGN as u32;
        Self {
            riff_size: 36 + data_size,
            fmt_size: 16,
            format_tag: 1,
            channels: CHANNELS,
            sample_rate,
            byte_rate: sample_rate * BLOCK_ALIGN as u32,
            block_align: BLOCK_ALIGN,
            bits_per_sample: BITS_PER_SAMPLE,
            data_size,
        }
    }
}

// --- Writing ---

pub fn write_wav<W: Write + Seek>(w: &mut W, frames: &[Frame], sample_rate: u32) -> Result<(), FormatError> {
    WavHeader::pcm16_stereo(sample_rate, frames.len()).write(w)?;
    for frame in frames {
        let (left, right) = frame.to_i16();
        w.write_all(&left.to_le_bytes())?;
        w.write_all(&right.to_le_bytes())?;
    }
    Ok(())
}

pub fn frames_to_wav(frames: &[Frame], sample_rate: u32) -> Result<Vec<u8>, FormatError> {
    let mut buf = std::io::Cursor::new(Vec::with_capacity(44 + frames.len() * BLOCK_ALIGN as usize));
    write_wav(&mut buf, frames, sample_rate)?;
    Ok(buf.into_inner())
}

// --- Reading ---

/// Decode a file written by [`write_wav`]: returns the sample rate and frames.
pub fn read_wav<R: Read + Seek>(r: &mut R) -> Result<(u32, Vec<Frame>), FormatError> {
    let header = WavHeader::read(r)?;
    if header.format_tag != 1 || header.channels != CHANNELS || header.bits_per_sample != BITS_PER_SAMPLE {
        return Err(FormatError::UnsupportedWav(format!(
            "format {} with {} channels at {} bits",
            header.format_tag, header.channels, header.bits_per_sample
        )));
    }

    let mut data = vec![0u8; header.data_size as usize];
    r.read_exact(&mut data)?;
    let frames = data
        .chunks_exact(BLOCK_ALIGN as usize)
        .map(|c| Frame {
            left: i16::from_le_bytes([c[0], c[1]]) as f32 / 32767.0,
            right: i16::from_le_bytes([c[2], c[3]]) as f32 / 32767.0,
        })
        .collect();
    Ok((header.sample_rate, frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn header_layout_is_canonical() {
        let bytes = frames_to_wav(&[Frame::silence(); 3], 44100).unwrap();
        assert_eq!(bytes.len(), 44 + 3 * 4);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 36 + 12);
        assert_eq!(&bytes[8..16], b"WAVEfmt ");
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2);
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 44100);
        assert_eq!(u32::from_le_bytes(bytes[28..32].try_into().unwrap()), 44100 * 4);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 12);
    }

    #[test]
    fn samples_are_clamped_pcm16() {
        let frames = [Frame { left: 1.5, right: -0.5 }];
        let bytes = frames_to_wav(&frames, 8000).unwrap();
        assert_eq!(i16::from_le_bytes([bytes[44], bytes[45]]), 32767);
        assert_eq!(i16::from_le_bytes([bytes[46], bytes[47]]), -16383);
    }

    #[test]
    fn read_back_written_file() {
        let frames = [Frame::mono(0.5), Frame { left: -1.0, right: 0.25 }];
        let bytes = frames_to_wav(&frames, 22050).unwrap();
        let (rate, decoded) = read_wav(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(decoded.len(), 2);
        assert!((decoded[1].left + 1.0).abs() < 1e-4);
        assert!((decoded[1].right - 0.25).abs() < 1e-4);
    }

    #[test]
    fn bad_magic_rejected() {
        assert!(matches!(
            read_wav(&mut Cursor::new(b"not a wav file at all, not even close....".to_vec())),
            Err(FormatError::Binary(_))
        ));
    }

    #[test]
    fn mono_file_rejected() {
        let mut header = WavHeader::pcm16_stereo(8000, 0);
        header.channels = 1;
        let mut buf = Cursor::new(Vec::new());
        header.write(&mut buf).unwrap();
        buf.set_position(0);
        assert!(matches!(read_wav(&mut buf), Err(FormatError::UnsupportedWav(_))));
    }
}
