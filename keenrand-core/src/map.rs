//! The Vorticons map file codec and tile access.
//!
//! A map file is a 4-byte little-endian decompressed length followed by an
//! RLE stream of little-endian 16-bit words. The decompressed words start
//! with a 16-word header (width, height, plane count, plane byte size) and
//! carry two tile planes: terrain and sprites.

use byteorder::{LittleEndian, ReadBytesExt};
use log::debug;
use std::fs;
use std::path::Path;

use crate::{RandomiserError, Result};

/// Escape word that introduces a `(length, value)` run record in the RLE
/// stream.
pub(crate) const RLE_TAG: u16 = 0xFEFE;

const WORD_WIDTH: usize = 0;
const WORD_HEIGHT: usize = 1;
const WORD_PLANE_COUNT: usize = 2;
const WORD_PLANE_BYTES: usize = 7;
const HEADER_WORDS: usize = 16;
const HEADER_BYTES: u32 = 2 * HEADER_WORDS as u32;

/// Largest decompressed size a valid file can declare: two maximal planes
/// (the plane byte size is a 16-bit header word, rounded to 16) plus header.
const MAX_DECOMPRESSED_BYTES: u32 = 2 * 0xFFF0 + HEADER_BYTES;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Plane {
    /// Terrain/background tiles.
    Tiles,
    /// Sprite spawns and level-entry markers.
    Sprites,
}

impl Plane {
    fn index(self) -> usize {
        match self {
            Plane::Tiles => 0,
            Plane::Sprites => 1,
        }
    }
}

/// A decoded level map: two owned `width * height` tile planes in row-major
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct TileMap {
    width: u16,
    height: u16,
    planes: [Vec<u16>; 2],
}

/// Decodes `decompressed_len` bytes worth of 16-bit words from the stream.
/// The declared length comes from the file header and is trusted as the
/// target; a stream that ends early or a run that would overshoot it is
/// malformed.
pub(crate) fn rle_decode(
    reader: &mut &[u8],
    decompressed_len: u32,
) -> std::result::Result<Vec<u16>, String> {
    if decompressed_len % 2 != 0 {
        return Err(format!(
            "odd decompressed length {} (the stream is 16-bit words)",
            decompressed_len
        ));
    }
    let total_words = (decompressed_len / 2) as usize;
    let mut words = Vec::with_capacity(total_words);

    while words.len() < total_words {
        let val = reader
            .read_u16::<LittleEndian>()
            .map_err(|_| "truncated RLE stream".to_string())?;
        if val == RLE_TAG {
            let run = reader
                .read_u16::<LittleEndian>()
                .map_err(|_| "truncated RLE run record".to_string())? as usize;
            let fill = reader
                .read_u16::<LittleEndian>()
                .map_err(|_| "truncated RLE run record".to_string())?;
            if words.len() + run > total_words {
                return Err(format!(
                    "run of {} words overruns the declared {} bytes",
                    run, decompressed_len
                ));
            }
            words.extend(std::iter::repeat(fill).take(run));
        } else {
            words.push(val);
        }
    }
    Ok(words)
}

/// Greedy run-length encoding: a maximal run longer than three words becomes
/// a `(tag, length, value)` record, shorter runs are written as literals.
///
/// A run of three or fewer tag words is written literally and will re-read
/// as an escape record. Vorticons tile data never uses 0xFEFE, and encoding
/// it differently would change the on-disk format.
pub(crate) fn rle_encode(words: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 2);
    let mut i = 0usize;
    while i < words.len() {
        let val = words[i];
        let mut run = 1usize;
        while i + run < words.len() && words[i + run] == val {
            run += 1;
        }
        i += run;

        // The record length is a single word; split oversized runs rather
        // than letting the count wrap.
        while run > 0 {
            let chunk = run.min(u16::MAX as usize);
            if chunk > 3 {
                out.extend_from_slice(&RLE_TAG.to_le_bytes());
                out.extend_from_slice(&(chunk as u16).to_le_bytes());
                out.extend_from_slice(&val.to_le_bytes());
            } else {
                for _ in 0..chunk {
                    out.extend_from_slice(&val.to_le_bytes());
                }
            }
            run -= chunk;
        }
    }
    out
}

fn map_error(path: &Path, detail: String) -> RandomiserError {
    RandomiserError::Map {
        file: path.display().to_string(),
        detail,
    }
}

impl TileMap {
    /// A zero-filled map, mainly for building fixtures and synthetic planes.
    pub fn new(width: u16, height: u16) -> TileMap {
        let tiles = width as usize * height as usize;
        TileMap {
            width,
            height,
            planes: [vec![0; tiles], vec![0; tiles]],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn plane(&self, plane: Plane) -> &[u16] {
        &self.planes[plane.index()]
    }

    /// Reads and decodes a map file, validating the header geometry before
    /// anything downstream can act on it.
    pub fn load(path: &Path) -> Result<TileMap> {
        let bytes = fs::read(path).map_err(|e| map_error(path, format!("cannot read: {}", e)))?;
        let mut reader = &bytes[..];
        let decompressed_len = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| map_error(path, "file too short for a length header".to_string()))?;
        if decompressed_len < HEADER_BYTES || decompressed_len > MAX_DECOMPRESSED_BYTES {
            return Err(map_error(
                path,
                format!(
                    "implausible decompressed length {} (expected {}..={})",
                    decompressed_len, HEADER_BYTES, MAX_DECOMPRESSED_BYTES
                ),
            ));
        }
        let words =
            rle_decode(&mut reader, decompressed_len).map_err(|detail| map_error(path, detail))?;

        let width = words[WORD_WIDTH];
        let height = words[WORD_HEIGHT];
        let plane_bytes = words[WORD_PLANE_BYTES] as usize;
        if width == 0 || height == 0 {
            return Err(map_error(
                path,
                format!("implausible geometry {}x{}", width, height),
            ));
        }
        let tile_words = width as usize * height as usize;
        if plane_bytes % 2 != 0 || tile_words * 2 > plane_bytes {
            return Err(map_error(
                path,
                format!(
                    "plane size of {} bytes cannot hold a {}x{} plane ({} bytes)",
                    plane_bytes,
                    width,
                    height,
                    tile_words * 2
                ),
            ));
        }
        let plane0 = HEADER_WORDS;
        let plane1 = HEADER_WORDS + plane_bytes / 2;
        if plane1 + tile_words > words.len() {
            return Err(map_error(
                path,
                format!(
                    "decompressed data holds {} words, need {} for two {}x{} planes",
                    words.len(),
                    plane1 + tile_words,
                    width,
                    height
                ),
            ));
        }

        debug!(
            "loaded {}: {}x{}, plane size {} bytes",
            path.display(),
            width,
            height,
            plane_bytes
        );

        Ok(TileMap {
            width,
            height,
            planes: [
                words[plane0..plane0 + tile_words].to_vec(),
                words[plane1..plane1 + tile_words].to_vec(),
            ],
        })
    }

    /// Re-encodes the map. The plane byte size is the tile data rounded up
    /// to 16 bytes; unused header words and plane padding are written as
    /// zero.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tile_bytes = self.width as u32 * self.height as u32 * 2;
        let plane_bytes = (tile_bytes + 15) & !15;
        if plane_bytes > u16::MAX as u32 {
            return Err(map_error(
                path,
                format!(
                    "{}x{} map needs a {}-byte plane, which overflows the 16-bit header field",
                    self.width, self.height, plane_bytes
                ),
            ));
        }
        let data_len = plane_bytes * 2 + HEADER_BYTES;

        let mut words = vec![0u16; (data_len / 2) as usize];
        words[WORD_WIDTH] = self.width;
        words[WORD_HEIGHT] = self.height;
        words[WORD_PLANE_COUNT] = 2;
        words[WORD_PLANE_BYTES] = plane_bytes as u16;
        let tile_words = self.width as usize * self.height as usize;
        let plane0 = HEADER_WORDS;
        let plane1 = HEADER_WORDS + (plane_bytes / 2) as usize;
        words[plane0..plane0 + tile_words].copy_from_slice(&self.planes[0]);
        words[plane1..plane1 + tile_words].copy_from_slice(&self.planes[1]);

        let mut out = Vec::with_capacity(data_len as usize + 4);
        out.extend_from_slice(&data_len.to_le_bytes());
        out.extend_from_slice(&rle_encode(&words));
        fs::write(path, &out).map_err(|e| map_error(path, format!("cannot write: {}", e)))?;
        Ok(())
    }

    fn offset(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.width as usize || y >= self.height as usize {
            return Err(RandomiserError::TileOutOfRange {
                x: x as i64,
                y: y as i64,
                width: self.width,
                height: self.height,
            });
        }
        Ok(y * self.width as usize + x)
    }

    pub fn get(&self, x: usize, y: usize, plane: Plane) -> Result<u16> {
        let off = self.offset(x, y)?;
        Ok(self.planes[plane.index()][off])
    }

    pub fn set(&mut self, x: usize, y: usize, plane: Plane, value: u16) -> Result<()> {
        let off = self.offset(x, y)?;
        self.planes[plane.index()][off] = value;
        Ok(())
    }

    /// Forward row-major scan for `tile` from `(start_x, start_y)`
    /// (inclusive) to the end of the plane.
    pub fn find_from(
        &self,
        tile: u16,
        plane: Plane,
        start_x: usize,
        start_y: usize,
    ) -> Option<(usize, usize)> {
        let width = self.width as usize;
        for y in start_y..self.height as usize {
            let from_x = if y == start_y { start_x } else { 0 };
            for x in from_x..width {
                if self.planes[plane.index()][y * width + x] == tile {
                    return Some((x, y));
                }
            }
        }
        None
    }

    /// Replaces every occurrence of `from` with `to` by re-searching from
    /// the last hit after each replacement. Returns the replacement count.
    pub fn replace_all(&mut self, from: u16, to: u16, plane: Plane) -> Result<usize> {
        if from == to {
            return Ok(0);
        }
        let mut replaced = 0usize;
        let (mut x, mut y) = (0usize, 0usize);
        while let Some((fx, fy)) = self.find_from(from, plane, x, y) {
            debug!("found tile {} at ({}, {})", from, fx, fy);
            self.set(fx, fy, plane, to)?;
            replaced += 1;
            x = fx;
            y = fy;
        }
        Ok(replaced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn decode_bytes(bytes: &[u8], decompressed_len: u32) -> Vec<u16> {
        let mut reader = bytes;
        rle_decode(&mut reader, decompressed_len).unwrap()
    }

    fn words_of(bytes: &[u8]) -> Vec<u16> {
        bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect()
    }

    #[test]
    fn full_plane_of_one_value_encodes_to_one_record() {
        // A 4x2 plane of tile 5: eight words become (tag, 8, 5).
        let plane = [5u16; 8];
        let encoded = rle_encode(&plane);
        assert_eq!(words_of(&encoded), vec![RLE_TAG, 8, 5]);
        assert_eq!(decode_bytes(&encoded, 16), plane);
    }

    #[test]
    fn short_runs_stay_literal() {
        let data = [7u16, 7, 7, 9, 9];
        let encoded = rle_encode(&data);
        assert_eq!(words_of(&encoded), vec![7, 7, 7, 9, 9]);
    }

    #[test]
    fn run_of_four_uses_an_escape_record() {
        let data = [7u16, 7, 7, 7];
        let encoded = rle_encode(&data);
        assert_eq!(words_of(&encoded), vec![RLE_TAG, 4, 7]);
    }

    #[test]
    fn zero_length_run_record_emits_nothing() {
        let mut bytes = Vec::new();
        for w in [RLE_TAG, 0, 42, 13] {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        assert_eq!(decode_bytes(&bytes, 2), vec![13]);
    }

    #[test]
    fn short_run_of_tag_words_is_ambiguous() {
        // The format cannot represent a literal 0xFEFE: it is written as-is
        // and re-reads as an escape record.
        let data = [RLE_TAG, 1, 2];
        let encoded = rle_encode(&data);
        assert_eq!(words_of(&encoded), vec![RLE_TAG, 1, 2]);
        let mut reader = &encoded[..];
        let reread = rle_decode(&mut reader, 6);
        assert!(reread.is_err() || reread.unwrap() != data);
    }

    #[test]
    fn overshooting_run_is_rejected() {
        let mut bytes = Vec::new();
        for w in [RLE_TAG, 9, 5] {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        let mut reader = &bytes[..];
        assert!(rle_decode(&mut reader, 16).is_err());
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let bytes = 7u16.to_le_bytes();
        let mut reader = &bytes[..];
        assert!(rle_decode(&mut reader, 8).is_err());
    }

    #[test]
    fn random_planes_round_trip() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..50 {
            let len = rng.gen_range(1..400usize);
            let mut plane = Vec::with_capacity(len);
            for i in 0..len {
                // Runs are common in real planes; bias toward repeats.
                if i > 0 && rng.gen_bool(0.6) {
                    plane.push(plane[i - 1]);
                } else {
                    plane.push(rng.gen_range(0..600u16));
                }
            }
            let encoded = rle_encode(&plane);
            assert_eq!(decode_bytes(&encoded, plane.len() as u32 * 2), plane);
        }
    }

    #[test]
    fn reencoding_decoded_data_is_stable() {
        let plane = [1u16, 1, 1, 1, 1, 8, 8, 3, 3, 3, 3, 3, 9];
        let once = rle_encode(&plane);
        let decoded = decode_bytes(&once, plane.len() as u32 * 2);
        let twice = rle_encode(&decoded);
        assert_eq!(once, twice);
    }

    #[test]
    fn save_load_round_trip_preserves_geometry_and_planes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LEVEL01.CK1");

        let mut map = TileMap::new(9, 5);
        map.set(0, 0, Plane::Tiles, 143).unwrap();
        map.set(8, 4, Plane::Tiles, 331).unwrap();
        map.set(3, 2, Plane::Sprites, 4).unwrap();
        map.save(&path).unwrap();

        let reloaded = TileMap::load(&path).unwrap();
        assert_eq!(reloaded, map);
    }

    #[test]
    fn saved_header_sets_only_the_known_words() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LEVEL02.CK1");

        let map = TileMap::new(4, 2);
        map.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let declared = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let words = decode_bytes(&bytes[4..], declared);
        // 4x2 tiles = 16 bytes, already a multiple of 16.
        assert_eq!(declared, 16 * 2 + 32);
        assert_eq!(words[0], 4);
        assert_eq!(words[1], 2);
        assert_eq!(words[2], 2);
        assert_eq!(words[7], 16);
        for unused in [3, 4, 5, 6, 8, 9, 10, 11, 12, 13, 14, 15] {
            assert_eq!(words[unused], 0, "header word {} should be zero", unused);
        }
    }

    #[test]
    fn zero_width_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LEVEL03.CK1");

        let words = vec![0u16; 16 + 8];
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(words.len() as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&rle_encode(&words));
        std::fs::write(&path, &bytes).unwrap();

        let err = TileMap::load(&path).unwrap_err();
        assert!(err.to_string().contains("implausible geometry"));
    }

    #[test]
    fn undersized_plane_header_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("LEVEL04.CK1");

        let mut words = vec![0u16; 16 + 8];
        words[0] = 4;
        words[1] = 2;
        words[7] = 8; // 16 bytes of tiles will not fit in 8.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(words.len() as u32 * 2).to_le_bytes());
        bytes.extend_from_slice(&rle_encode(&words));
        std::fs::write(&path, &bytes).unwrap();

        let err = TileMap::load(&path).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("LEVEL04.CK1"));
        assert!(msg.contains("plane size"));
    }

    #[test]
    fn missing_file_error_names_the_file() {
        let err = TileMap::load(Path::new("NOSUCH.CK1")).unwrap_err();
        assert!(err.to_string().contains("NOSUCH.CK1"));
    }

    #[test]
    fn tile_access_is_bounds_checked() {
        let mut map = TileMap::new(4, 3);
        assert!(map.get(3, 2, Plane::Tiles).is_ok());
        assert!(map.get(4, 0, Plane::Tiles).is_err());
        assert!(map.get(0, 3, Plane::Sprites).is_err());
        assert!(map.set(9, 9, Plane::Tiles, 1).is_err());
    }

    #[test]
    fn find_from_scans_forward_inclusively() {
        let mut map = TileMap::new(4, 3);
        map.set(1, 0, Plane::Tiles, 7).unwrap();
        map.set(2, 2, Plane::Tiles, 7).unwrap();

        assert_eq!(map.find_from(7, Plane::Tiles, 0, 0), Some((1, 0)));
        assert_eq!(map.find_from(7, Plane::Tiles, 1, 0), Some((1, 0)));
        assert_eq!(map.find_from(7, Plane::Tiles, 2, 0), Some((2, 2)));
        assert_eq!(map.find_from(7, Plane::Tiles, 3, 2), None);
    }

    #[test]
    fn replace_all_rewrites_every_occurrence() {
        let mut map = TileMap::new(4, 2);
        for x in 0..4 {
            map.set(x, 0, Plane::Tiles, 5).unwrap();
        }
        map.set(2, 1, Plane::Tiles, 5).unwrap();

        let replaced = map.replace_all(5, 6, Plane::Tiles).unwrap();
        assert_eq!(replaced, 5);
        assert_eq!(map.find_from(5, Plane::Tiles, 0, 0), None);
        assert_eq!(map.plane(Plane::Tiles).iter().filter(|&&t| t == 6).count(), 5);
    }
}
