//! 基本流的访问单元切分.
//!
//! 规则做了简化: 一个 VCL NAL 之后出现的非 VCL NAL 开始一个新的访问单元.
//! 切分结果保持输入的分帧方式, NAL 内容不变.

use bytes::BufMut;
use tao_codec::HxxxCodec;
use tao_codec::parsers::nal::{NalFraming, NalIter, START_CODE};

/// NAL 是否属于 VCL
fn is_vcl(codec: HxxxCodec, nal: &[u8]) -> bool {
    match codec {
        HxxxCodec::H264 => matches!(nal[0] & 0x1F, 1..=5),
        HxxxCodec::Hevc => (nal[0] >> 1) & 0x3F < 32,
    }
}

/// 按访问单元切分, 每个单元重新按 `framing` 拼接
pub fn split(data: &[u8], framing: NalFraming, codec: HxxxCodec) -> Vec<Vec<u8>> {
    let mut units = Vec::new();
    let mut current: Vec<&[u8]> = Vec::new();
    let mut seen_vcl = false;

    for nal in NalIter::new(data, framing).filter(|nal| !nal.is_empty()) {
        let vcl = is_vcl(codec, nal);
        if seen_vcl && !vcl {
            units.push(join(&current, framing));
            current.clear();
            seen_vcl = false;
        }
        seen_vcl |= vcl;
        current.push(nal);
    }
    if !current.is_empty() {
        units.push(join(&current, framing));
    }
    units
}

fn join(nals: &[&[u8]], framing: NalFraming) -> Vec<u8> {
    let mut out = Vec::with_capacity(nals.iter().map(|n| n.len() + 4).sum());
    for nal in nals {
        match framing {
            NalFraming::AnnexB => out.extend_from_slice(&START_CODE),
            NalFraming::LengthPrefixed(n) => out.put_uint(nal.len() as u64, n),
        }
        out.extend_from_slice(nal);
    }
    out
}
