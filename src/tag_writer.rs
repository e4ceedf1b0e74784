//! Container tag rewriting via lofty.
//!
//! One writer handles both FLAC (Vorbis comments) and MP4 (iTunes-style
//! ilst atoms); the container variant decides the tag type, everything else
//! is shared.

use std::path::Path;

use anyhow::{Context, Result};
use lofty::{
    Accessor, AudioFile, ItemKey, MimeType, Picture, PictureType, Tag, TaggedFileExt,
    read_from_path,
};

use crate::format::AudioFormat;
use crate::models::TrackMetadata;

/// Rewrite the tag fields present in `meta` into the container at `path`,
/// embedding `cover` as the front-cover picture when supplied. Fields absent
/// from `meta` are left untouched; existing tag state is never wiped.
pub fn write_track_tags(
    path: &Path,
    format: AudioFormat,
    meta: &TrackMetadata,
    cover: Option<&[u8]>,
) -> Result<()> {
    let mut tagged_file = read_from_path(path).context("read container")?;
    let mut tag_type = tagged_file.primary_tag_type();
    if tagged_file.tag(tag_type).is_none() {
        if let Some(tag) = tagged_file.first_tag() {
            tag_type = tag.tag_type();
        } else {
            tag_type = format.tag_type();
        }
    }
    let tag = match tagged_file.tag_mut(tag_type) {
        Some(tag) => tag,
        None => {
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file
                .tag_mut(tag_type)
                .context("create tag container")?
        }
    };

    apply_text_fields(tag, meta);
    if let Some(data) = cover {
        apply_front_cover(tag, data.to_vec());
    }

    tagged_file.save_to_path(path).context("write tags")?;
    Ok(())
}

/// Apply the populated fields of `meta` to `tag`. Empty strings count as
/// absent; writing an empty tag value is a distinct, incorrect state.
///
/// For Vorbis comments the numeric fields land as decimal text
/// (TRACKNUMBER/TRACKTOTAL, DISCNUMBER/DISCTOTAL); for ilst the track and
/// disc numbers render as (current, total) pair atoms where a missing total
/// is written as 0, meaning "total unknown".
pub(crate) fn apply_text_fields(tag: &mut Tag, meta: &TrackMetadata) {
    if let Some(value) = present(&meta.title) {
        tag.set_title(value.to_string());
    }
    if let Some(value) = present(&meta.artist) {
        tag.set_artist(value.to_string());
    }
    if let Some(value) = present(&meta.album) {
        tag.set_album(value.to_string());
    }
    if let Some(value) = present(&meta.album_artist) {
        tag.insert_text(ItemKey::AlbumArtist, value.to_string());
    }
    if let Some(value) = present(&meta.date) {
        tag.insert_text(ItemKey::RecordingDate, value.to_string());
    }
    if let Some(value) = present(&meta.genre) {
        tag.set_genre(value.to_string());
    }
    if let Some(value) = meta.track_number.filter(|n| *n > 0) {
        tag.set_track(value);
    }
    if let Some(value) = meta.total_tracks.filter(|n| *n > 0) {
        tag.set_track_total(value);
    }
    if let Some(value) = meta.disc_number.filter(|n| *n > 0) {
        tag.set_disk(value);
    }
    if let Some(value) = meta.total_discs.filter(|n| *n > 0) {
        tag.set_disk_total(value);
    }
}

/// Embed `data` as the front cover, replacing any existing front cover so
/// repeated tagging never accumulates picture blocks.
pub(crate) fn apply_front_cover(tag: &mut Tag, data: Vec<u8>) {
    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(Picture::new_unchecked(
        PictureType::CoverFront,
        Some(MimeType::Jpeg),
        Some("Cover".to_string()),
        data,
    ));
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.is_empty())
}
