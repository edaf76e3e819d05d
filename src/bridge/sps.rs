//! H.264 parameter set parsing (ITU-T H.264 7.3.2.1.1 and 7.3.2.2).
//!
//! Only the fields needed to derive the cropped frame size and to build an
//! `avcC` record are kept.

use crate::{Error, Result};

const NAL_TYPE_SPS: u8 = 7;
const NAL_TYPE_PPS: u8 = 8;

/// Profiles whose SPS carries chroma format, bit depth and scaling lists
const HIGH_PROFILES: [u8; 13] = [100, 110, 122, 244, 44, 83, 86, 118, 128, 138, 139, 134, 135];

/// MaxFS of the highest level (6.2, Table A-1), in macroblocks
const MAX_FRAME_MBS: u64 = 139_264;

/// Largest frame width or height in macroblocks, `sqrt(8 * MaxFS)` (A.3.1)
const MAX_DIMENSION_MBS: u64 = 1_055;

/// Strip a leading Annex-B start code (3 or 4 bytes) if present.
pub fn strip_start_code(nal: &[u8]) -> &[u8] {
    if nal.starts_with(&[0, 0, 0, 1]) {
        &nal[4..]
    } else if nal.starts_with(&[0, 0, 1]) {
        &nal[3..]
    } else {
        nal
    }
}

/// Remove emulation prevention bytes (`00 00 03` becomes `00 00`).
fn unescape(ebsp: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(ebsp.len());
    let mut zeros = 0;
    for &byte in ebsp {
        if zeros >= 2 && byte == 3 {
            zeros = 0;
            continue;
        }
        zeros = if byte == 0 { zeros + 1 } else { 0 };
        rbsp.push(byte);
    }
    rbsp
}

fn nal_type(nal: &[u8]) -> Option<u8> {
    nal.first().map(|header| header & 0x1F)
}

/// MSB-first bit reader with Exp-Golomb support
struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bit(&mut self) -> Result<u32> {
        let byte = self
            .data
            .get(self.pos / 8)
            .ok_or_else(|| Error::ParameterSets("truncated parameter set".into()))?;
        let bit = (byte >> (7 - (self.pos % 8))) & 1;
        self.pos += 1;
        Ok(bit as u32)
    }

    fn flag(&mut self) -> Result<bool> {
        Ok(self.bit()? == 1)
    }

    fn bits(&mut self, n: u32) -> Result<u32> {
        let mut value = 0;
        for _ in 0..n {
            value = (value << 1) | self.bit()?;
        }
        Ok(value)
    }

    /// ue(v)
    fn ue(&mut self) -> Result<u32> {
        let mut leading_zeros = 0;
        while self.bit()? == 0 {
            leading_zeros += 1;
            if leading_zeros > 31 {
                return Err(Error::ParameterSets("invalid Exp-Golomb code".into()));
            }
        }
        let suffix = self.bits(leading_zeros)? as u64;
        let value = (1u64 << leading_zeros) - 1 + suffix;
        u32::try_from(value).map_err(|_| Error::ParameterSets("Exp-Golomb overflow".into()))
    }

    /// se(v)
    fn se(&mut self) -> Result<i32> {
        let k = self.ue()? as i64;
        let value = if k % 2 == 1 { (k + 1) / 2 } else { -(k / 2) };
        Ok(value as i32)
    }
}

/// Parsed sequence parameter set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceParameterSet {
    pub id: u32,
    pub profile_idc: u8,
    pub constraint_flags: u8,
    pub level_idc: u8,
    pub chroma_format_idc: u32,
    pub bit_depth_luma: u32,
    pub bit_depth_chroma: u32,
    pub frame_mbs_only: bool,
    /// Cropped display width in pixels
    pub width: u32,
    /// Cropped display height in pixels
    pub height: u32,
}

impl SequenceParameterSet {
    /// Parse an SPS NAL unit, with or without a start code.
    pub fn parse(nal: &[u8]) -> Result<Self> {
        let nal = strip_start_code(nal);
        match nal_type(nal) {
            Some(NAL_TYPE_SPS) => {}
            Some(other) => {
                return Err(Error::ParameterSets(format!(
                    "expected SPS (type 7), got NAL type {}",
                    other
                )))
            }
            None => return Err(Error::ParameterSets("empty SPS".into())),
        }

        let rbsp = unescape(&nal[1..]);
        let mut r = BitReader::new(&rbsp);

        let profile_idc = r.bits(8)? as u8;
        let constraint_flags = r.bits(8)? as u8;
        let level_idc = r.bits(8)? as u8;
        let id = r.ue()?;
        if id > 31 {
            return Err(Error::ParameterSets(format!("SPS id {} out of range", id)));
        }

        let mut chroma_format_idc = 1;
        let mut bit_depth_luma = 8;
        let mut bit_depth_chroma = 8;

        if HIGH_PROFILES.contains(&profile_idc) {
            chroma_format_idc = r.ue()?;
            if chroma_format_idc == 3 {
                // separate_colour_plane_flag
                r.flag()?;
            }
            bit_depth_luma = r.ue()? + 8;
            bit_depth_chroma = r.ue()? + 8;
            // qpprime_y_zero_transform_bypass_flag
            r.flag()?;
            if r.flag()? {
                let lists = if chroma_format_idc == 3 { 12 } else { 8 };
                for i in 0..lists {
                    if r.flag()? {
                        skip_scaling_list(&mut r, if i < 6 { 16 } else { 64 })?;
                    }
                }
            }
        }

        // log2_max_frame_num_minus4
        r.ue()?;

        match r.ue()? {
            0 => {
                // log2_max_pic_order_cnt_lsb_minus4
                r.ue()?;
            }
            1 => {
                // delta_pic_order_always_zero_flag
                r.flag()?;
                // offset_for_non_ref_pic, offset_for_top_to_bottom_field
                r.se()?;
                r.se()?;
                let cycle = r.ue()?;
                if cycle > 255 {
                    return Err(Error::ParameterSets("POC cycle too long".into()));
                }
                for _ in 0..cycle {
                    r.se()?;
                }
            }
            2 => {}
            other => {
                return Err(Error::ParameterSets(format!(
                    "invalid pic_order_cnt_type {}",
                    other
                )))
            }
        }

        // max_num_ref_frames, gaps_in_frame_num_value_allowed_flag
        r.ue()?;
        r.flag()?;

        let width_in_mbs = r.ue()? as u64 + 1;
        let height_in_map_units = r.ue()? as u64 + 1;
        let frame_mbs_only = r.flag()?;
        if !frame_mbs_only {
            // mb_adaptive_frame_field_flag
            r.flag()?;
        }
        // direct_8x8_inference_flag
        r.flag()?;

        let field_factor: u64 = if frame_mbs_only { 1 } else { 2 };
        let height_in_mbs = field_factor * height_in_map_units;
        if width_in_mbs > MAX_DIMENSION_MBS
            || height_in_mbs > MAX_DIMENSION_MBS
            || width_in_mbs * height_in_mbs > MAX_FRAME_MBS
        {
            return Err(Error::ParameterSets(format!(
                "frame of {}x{} macroblocks exceeds level 6.2",
                width_in_mbs, height_in_mbs
            )));
        }

        let mut width = width_in_mbs * 16;
        let mut height = height_in_mbs * 16;

        if r.flag()? {
            let left = r.ue()? as u64;
            let right = r.ue()? as u64;
            let top = r.ue()? as u64;
            let bottom = r.ue()? as u64;

            let (crop_x, crop_y) = match chroma_format_idc {
                0 => (1, field_factor),
                1 => (2, 2 * field_factor),
                2 => (2, field_factor),
                _ => (1, field_factor),
            };

            let crop_w = (left + right) * crop_x;
            let crop_h = (top + bottom) * crop_y;
            if crop_w >= width || crop_h >= height {
                return Err(Error::ParameterSets("cropping exceeds frame size".into()));
            }
            width -= crop_w;
            height -= crop_h;
        }

        let width = u32::try_from(width)
            .map_err(|_| Error::ParameterSets("frame width out of range".into()))?;
        let height = u32::try_from(height)
            .map_err(|_| Error::ParameterSets("frame height out of range".into()))?;

        Ok(Self {
            id,
            profile_idc,
            constraint_flags,
            level_idc,
            chroma_format_idc,
            bit_depth_luma,
            bit_depth_chroma,
            frame_mbs_only,
            width,
            height,
        })
    }

    /// 8-bit 4:2:0, the only layout the packed output supports
    pub fn is_8bit_420(&self) -> bool {
        self.chroma_format_idc == 1 && self.bit_depth_luma == 8 && self.bit_depth_chroma == 8
    }
}

fn skip_scaling_list(r: &mut BitReader<'_>, size: usize) -> Result<()> {
    let mut last = 8i32;
    let mut next = 8i32;
    for _ in 0..size {
        if next != 0 {
            let delta = r.se()?;
            next = (last + delta + 256).rem_euclid(256);
        }
        if next != 0 {
            last = next;
        }
    }
    Ok(())
}

/// Parsed picture parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureParameterSet {
    pub id: u32,
    pub sps_id: u32,
}

impl PictureParameterSet {
    /// Parse a PPS NAL unit, with or without a start code.
    pub fn parse(nal: &[u8]) -> Result<Self> {
        let nal = strip_start_code(nal);
        match nal_type(nal) {
            Some(NAL_TYPE_PPS) => {}
            Some(other) => {
                return Err(Error::ParameterSets(format!(
                    "expected PPS (type 8), got NAL type {}",
                    other
                )))
            }
            None => return Err(Error::ParameterSets("empty PPS".into())),
        }

        let rbsp = unescape(&nal[1..]);
        let mut r = BitReader::new(&rbsp);
        let id = r.ue()?;
        let sps_id = r.ue()?;
        if id > 255 || sps_id > 31 {
            return Err(Error::ParameterSets(format!(
                "PPS id {} / SPS id {} out of range",
                id, sps_id
            )));
        }

        Ok(Self { id, sps_id })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Bit writer for building parameter sets in tests
    #[derive(Default)]
    pub(crate) struct BitWriter {
        bytes: Vec<u8>,
        bits: usize,
    }

    impl BitWriter {
        pub(crate) fn bit(&mut self, bit: bool) -> &mut Self {
            if self.bits % 8 == 0 {
                self.bytes.push(0);
            }
            if bit {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 1 << (7 - (self.bits % 8));
            }
            self.bits += 1;
            self
        }

        pub(crate) fn bits(&mut self, value: u32, n: u32) -> &mut Self {
            for i in (0..n).rev() {
                self.bit((value >> i) & 1 == 1);
            }
            self
        }

        pub(crate) fn ue(&mut self, value: u32) -> &mut Self {
            let v = value as u64 + 1;
            let len = 64 - v.leading_zeros();
            for _ in 0..len - 1 {
                self.bit(false);
            }
            for i in (0..len).rev() {
                self.bit((v >> i) & 1 == 1);
            }
            self
        }

        pub(crate) fn se(&mut self, value: i32) -> &mut Self {
            let k = if value > 0 {
                (value as u32) * 2 - 1
            } else {
                (-value as u32) * 2
            };
            self.ue(k)
        }

        /// rbsp_trailing_bits
        pub(crate) fn finish(&mut self) -> Vec<u8> {
            self.bit(true);
            while self.bits % 8 != 0 {
                self.bit(false);
            }
            std::mem::take(&mut self.bytes)
        }
    }

    /// Baseline SPS for `width`x`height` (multiples of 2), cropped from macroblocks
    pub(crate) fn baseline_sps(width: u32, height: u32) -> Vec<u8> {
        let mbs_w = width.div_ceil(16);
        let mbs_h = height.div_ceil(16);
        let crop_right = (mbs_w * 16 - width) / 2;
        let crop_bottom = (mbs_h * 16 - height) / 2;

        let mut w = BitWriter::default();
        w.bits(66, 8) // profile_idc: baseline
            .bits(0xC0, 8) // constraint_set0/1
            .bits(30, 8) // level 3.0
            .ue(0) // sps id
            .ue(0) // log2_max_frame_num_minus4
            .ue(2) // pic_order_cnt_type
            .ue(1) // max_num_ref_frames
            .bit(false) // gaps
            .ue(mbs_w - 1)
            .ue(mbs_h - 1)
            .bit(true) // frame_mbs_only
            .bit(true); // direct_8x8_inference
        if crop_right > 0 || crop_bottom > 0 {
            w.bit(true).ue(0).ue(crop_right).ue(0).ue(crop_bottom);
        } else {
            w.bit(false);
        }
        w.bit(false); // vui_parameters_present

        let mut nal = vec![0x67];
        nal.extend(w.finish());
        nal
    }

    pub(crate) fn pps(id: u32, sps_id: u32) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.ue(id).ue(sps_id).bit(false);
        let mut nal = vec![0x68];
        nal.extend(w.finish());
        nal
    }

    fn high_sps(chroma_format_idc: u32, bit_depth_minus8: u32, scaling: bool) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.bits(100, 8) // High
            .bits(0, 8)
            .bits(40, 8)
            .ue(0)
            .ue(chroma_format_idc);
        if chroma_format_idc == 3 {
            w.bit(false);
        }
        w.ue(bit_depth_minus8).ue(bit_depth_minus8).bit(false);
        if scaling {
            w.bit(true);
            // First list present with a few deltas then terminated by a zero next
            w.bit(true).se(2).se(-3).se(-7);
            for _ in 1..8 {
                w.bit(false);
            }
        } else {
            w.bit(false);
        }
        w.ue(0) // log2_max_frame_num_minus4
            .ue(0) // poc type 0
            .ue(2) // log2_max_poc_lsb_minus4
            .ue(4)
            .bit(false)
            .ue(119) // 1920
            .ue(67) // 1088
            .bit(true)
            .bit(true)
            .bit(true)
            .ue(0)
            .ue(0)
            .ue(0)
            .ue(4) // 1088 - 8 = 1080
            .bit(false);
        let mut nal = vec![0x67];
        nal.extend(w.finish());
        nal
    }

    /// Baseline SPS straight from macroblock counts, no cropping
    pub(crate) fn sized_sps(
        width_in_mbs_minus1: u32,
        height_in_map_units_minus1: u32,
        frame_mbs_only: bool,
    ) -> Vec<u8> {
        let mut w = BitWriter::default();
        w.bits(66, 8)
            .bits(0, 8)
            .bits(62, 8)
            .ue(0)
            .ue(0)
            .ue(2)
            .ue(1)
            .bit(false)
            .ue(width_in_mbs_minus1)
            .ue(height_in_map_units_minus1)
            .bit(frame_mbs_only);
        if !frame_mbs_only {
            w.bit(false); // mb_adaptive_frame_field
        }
        w.bit(true).bit(false).bit(false);
        let mut nal = vec![0x67];
        nal.extend(w.finish());
        nal
    }

    #[test]
    fn test_strip_start_code() {
        assert_eq!(strip_start_code(&[0, 0, 0, 1, 0x67]), &[0x67]);
        assert_eq!(strip_start_code(&[0, 0, 1, 0x68]), &[0x68]);
        assert_eq!(strip_start_code(&[0x67, 0]), &[0x67, 0]);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(&[0, 0, 3, 1]), vec![0, 0, 1]);
        assert_eq!(unescape(&[0, 0, 3, 0, 0, 3]), vec![0, 0, 0, 0]);
        assert_eq!(unescape(&[0, 3, 1]), vec![0, 3, 1]);
    }

    #[test]
    fn test_exp_golomb() {
        let mut w = BitWriter::default();
        w.ue(0).ue(1).ue(2).ue(255).se(0).se(1).se(-1).se(-20);
        let data = w.finish();

        let mut r = BitReader::new(&data);
        assert_eq!(r.ue().unwrap(), 0);
        assert_eq!(r.ue().unwrap(), 1);
        assert_eq!(r.ue().unwrap(), 2);
        assert_eq!(r.ue().unwrap(), 255);
        assert_eq!(r.se().unwrap(), 0);
        assert_eq!(r.se().unwrap(), 1);
        assert_eq!(r.se().unwrap(), -1);
        assert_eq!(r.se().unwrap(), -20);
    }

    #[test]
    fn test_baseline_dimensions() {
        let sps = SequenceParameterSet::parse(&baseline_sps(640, 480)).unwrap();
        assert_eq!(sps.profile_idc, 66);
        assert_eq!(sps.level_idc, 30);
        assert_eq!((sps.width, sps.height), (640, 480));
        assert!(sps.is_8bit_420());
    }

    #[test]
    fn test_cropped_dimensions() {
        let sps = SequenceParameterSet::parse(&baseline_sps(1280, 720)).unwrap();
        assert_eq!((sps.width, sps.height), (1280, 720));

        let sps = SequenceParameterSet::parse(&baseline_sps(1918, 1078)).unwrap();
        assert_eq!((sps.width, sps.height), (1918, 1078));
    }

    #[test]
    fn test_start_code_accepted() {
        let mut nal = vec![0, 0, 0, 1];
        nal.extend(baseline_sps(320, 240));
        let sps = SequenceParameterSet::parse(&nal).unwrap();
        assert_eq!((sps.width, sps.height), (320, 240));
    }

    #[test]
    fn test_high_profile_with_scaling_lists() {
        let sps = SequenceParameterSet::parse(&high_sps(1, 0, true)).unwrap();
        assert_eq!(sps.profile_idc, 100);
        assert_eq!((sps.width, sps.height), (1920, 1080));
        assert!(sps.is_8bit_420());
    }

    #[test]
    fn test_high_profile_non_420() {
        let sps = SequenceParameterSet::parse(&high_sps(2, 0, false)).unwrap();
        assert_eq!(sps.chroma_format_idc, 2);
        assert!(!sps.is_8bit_420());

        let sps = SequenceParameterSet::parse(&high_sps(1, 2, false)).unwrap();
        assert_eq!(sps.bit_depth_luma, 10);
        assert!(!sps.is_8bit_420());
    }

    #[test]
    fn test_wrong_nal_type() {
        assert!(matches!(
            SequenceParameterSet::parse(&pps(0, 0)),
            Err(Error::ParameterSets(_))
        ));
        assert!(matches!(
            PictureParameterSet::parse(&baseline_sps(64, 64)),
            Err(Error::ParameterSets(_))
        ));
    }

    #[test]
    fn test_truncated_sps() {
        let sps = baseline_sps(640, 480);
        for len in 0..5 {
            assert!(SequenceParameterSet::parse(&sps[..len]).is_err());
        }
    }

    #[test]
    fn test_garbage_does_not_panic() {
        let inputs: [&[u8]; 4] = [
            &[0x67, 0xFF, 0xFF, 0xFF, 0xFF],
            &[0x67, 0x42, 0, 0x1E, 0, 0, 0, 0, 0, 0],
            &[0x68],
            &[],
        ];
        for input in inputs {
            let _ = SequenceParameterSet::parse(input);
            let _ = PictureParameterSet::parse(input);
        }
    }

    #[test]
    fn test_oversized_frame_rejected() {
        // 2^28 - 1 macroblocks wide, interlaced: wraps any 32-bit size computation
        let huge = sized_sps((1 << 28) - 2, (1 << 28) - 2, false);
        assert!(matches!(
            SequenceParameterSet::parse(&huge),
            Err(Error::ParameterSets(_))
        ));

        // Each dimension fits on its own, the area does not
        let wide = sized_sps(1_054, 1_054, true);
        assert!(matches!(
            SequenceParameterSet::parse(&wide),
            Err(Error::ParameterSets(_))
        ));
    }

    #[test]
    fn test_largest_level_frame_accepted() {
        // 8192x4320, 138240 macroblocks
        let sps = SequenceParameterSet::parse(&sized_sps(511, 269, true)).unwrap();
        assert_eq!((sps.width, sps.height), (8192, 4320));

        // Interlaced: map units are field pairs
        let sps = SequenceParameterSet::parse(&sized_sps(119, 33, false)).unwrap();
        assert_eq!((sps.width, sps.height), (1920, 1088));
    }

    #[test]
    fn test_pps_ids() {
        let pps = PictureParameterSet::parse(&pps(3, 1)).unwrap();
        assert_eq!(pps, PictureParameterSet { id: 3, sps_id: 1 });
    }
}
