//! Shared fixtures for unit tests.

/// Smallest taggable FLAC container: the `fLaC` marker, a STREAMINFO block
/// (44.1 kHz, stereo, 16-bit, total samples unknown), a PADDING block, and a
/// stub audio frame section. The frame bytes matter: lofty's FLAC writer
/// indexes into the audio stream when rewriting metadata, so a container that
/// ends at the metadata boundary cannot be saved. The PADDING block matters
/// too: lofty 0.18's FLAC writer corrupts the last-metadata-block flag when
/// STREAMINFO is the final block, leaving written tags unreadable.
pub(crate) fn minimal_flac() -> Vec<u8> {
    let mut data = Vec::with_capacity(126);
    data.extend_from_slice(b"fLaC");
    // Block header: type 0 (STREAMINFO), len 34, not the last block.
    data.push(0x00);
    data.extend_from_slice(&[0x00, 0x00, 0x22]);

    let mut info = [0u8; 34];
    info[0..2].copy_from_slice(&4096u16.to_be_bytes()); // min block size
    info[2..4].copy_from_slice(&4096u16.to_be_bytes()); // max block size
    // Frame sizes unknown (zero). Packed fields: sample rate 44100 (20 bits),
    // channels-1 = 1 (3 bits), bits-per-sample-1 = 15 (5 bits), total
    // samples 0 (36 bits).
    info[10] = 0x0A;
    info[11] = 0xC4;
    info[12] = 0x42;
    info[13] = 0xF0;
    // MD5 of the audio left as zeroes (unknown).
    data.extend_from_slice(&info);

    // Block header: last-metadata-block flag set, type 1 (PADDING), len 16.
    data.push(0x81);
    data.extend_from_slice(&[0x00, 0x00, 0x10]);
    data.extend_from_slice(&[0u8; 16]);

    // Audio stream: frame sync code followed by stub frame bytes.
    let mut frames = [0u8; 64];
    frames[0] = 0xFF;
    frames[1] = 0xF8;
    data.extend_from_slice(&frames);
    data
}
