//! H.264 / HEVC 码流适配层.
//!
//! 让只认识一种分帧方式 (Annex B 起始码, 或 avcC/hvcC 长度前缀) 的解码器
//! 能消费任意分帧的基本流, 同时维护一份已解析参数集的缓存,
//! 随时可查询当前码流的尺寸、宽高比、profile/level、DPB 与色彩信息.
//!
//! # 使用流程
//! ```text
//! HxxxHelper::new(codec, need_length_prefixed)
//!     -> configure(extra_data)       // 仅一次, 选定管线并预填缓存
//!     -> process(packet) ...         // 逐帧, 返回转换后的帧与配置是否变化
//!     -> picture_size() / sar() ...  // 任意时刻查询
//! ```
//!
//! # 示例
//! ```rust
//! use tao_codec::hxxx::{HxxxCodec, HxxxHelper};
//! use tao_codec::Packet;
//!
//! let mut helper = HxxxHelper::new(HxxxCodec::H264, true);
//! helper.configure(&[]).unwrap();
//! assert_eq!(helper.nal_length_size(), 4);
//!
//! // AUD, 不含参数集
//! let out = helper.process(Packet::from_data(vec![0, 0, 0, 1, 0x09, 0xF0])).unwrap();
//! assert!(!out.config_changed);
//! assert_eq!(&out.packet.data[..], &[0, 0, 0, 2, 0x09, 0xF0]);
//! assert!(helper.picture_size().is_none());
//! ```

pub mod cache;
pub mod pipeline;
mod query;
mod state;

use bytes::Bytes;
use log::{debug, warn};
use tao_core::{TaoError, TaoResult};

use crate::packet::Packet;
use crate::parsers::h265::{self, HevcNalUnitType};
use crate::parsers::nal::NalIter;
use crate::parsers::{h264, nal::NalFraming};

pub use cache::{ParameterSet, ParameterSetTable, StoreOutcome};
pub use pipeline::Pipeline;
pub use query::{AnnexBConfig, Colorimetry, PictureSize};

use state::{CodecState, H264State, HevcState, ScanStep};

/// Annex B 源的默认长度前缀宽度
const DEFAULT_NAL_LENGTH_SIZE: usize = 4;

/// 适配的编解码器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HxxxCodec {
    /// H.264/AVC
    H264,
    /// H.265/HEVC
    Hevc,
}

impl std::fmt::Display for HxxxCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::H264 => write!(f, "H.264"),
            Self::Hevc => write!(f, "HEVC"),
        }
    }
}

/// 单帧处理结果
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// 转换后的帧
    pub packet: Packet,
    /// 本帧是否带来了新的参数集或切换了当前参数集
    pub config_changed: bool,
}

/// H.264 / HEVC 码流适配器
pub struct HxxxHelper {
    codec: HxxxCodec,
    need_length_prefixed: bool,
    length_prefixed_source: bool,
    nal_length_size: usize,
    state: CodecState,
    /// 配置完成后才有值
    pipeline: Option<Pipeline>,
}

impl HxxxHelper {
    /// 创建适配器
    ///
    /// `need_length_prefixed` 表示消费方需要长度前缀分帧 (avcC/hvcC).
    pub fn new(codec: HxxxCodec, need_length_prefixed: bool) -> Self {
        let state = match codec {
            HxxxCodec::H264 => CodecState::H264(H264State::default()),
            HxxxCodec::Hevc => CodecState::Hevc(HevcState::default()),
        };
        Self {
            codec,
            need_length_prefixed,
            length_prefixed_source: false,
            nal_length_size: DEFAULT_NAL_LENGTH_SIZE,
            state,
            pipeline: None,
        }
    }

    /// 用带外配置记录配置适配器, 只能调用一次
    ///
    /// 空记录表示 Annex B 源. 否则 H.264 需要 avcC, HEVC 需要 hvcC;
    /// 记录中的参数集会预先存入缓存.
    pub fn configure(&mut self, extra_data: &[u8]) -> TaoResult<()> {
        if self.pipeline.is_some() {
            return Err(TaoError::InvalidArgument(format!(
                "{}: 适配器已配置",
                self.codec
            )));
        }

        if extra_data.is_empty() {
            self.length_prefixed_source = false;
            self.nal_length_size = DEFAULT_NAL_LENGTH_SIZE;
        } else {
            self.nal_length_size = match &mut self.state {
                CodecState::H264(state) => configure_avcc(state, extra_data)?,
                CodecState::Hevc(state) => {
                    configure_hvcc(state, extra_data, self.need_length_prefixed)?
                }
            };
            self.length_prefixed_source = true;
        }

        let pipeline = Pipeline::select(self.length_prefixed_source, self.need_length_prefixed);
        debug!(
            "{}: 配置完成, pipeline={}, nal_length_size={}",
            self.codec, pipeline, self.nal_length_size
        );
        self.pipeline = Some(pipeline);
        Ok(())
    }

    /// 处理一帧
    ///
    /// 先扫描参数集更新缓存, 再按管线转换分帧. 出错时帧被丢弃,
    /// 出错前已存入缓存的参数集保留.
    pub fn process(&mut self, packet: Packet) -> TaoResult<ProcessOutput> {
        let Some(pipeline) = self.pipeline else {
            return Err(TaoError::InvalidArgument(format!(
                "{}: 处理数据前必须先调用 configure",
                self.codec
            )));
        };

        let scan_data = pipeline.before_scan(packet.data.clone(), self.nal_length_size)?;
        let config_changed = self.scan(&scan_data, pipeline.scan_framing(self.nal_length_size))?;
        let out_data = pipeline.after_scan(scan_data, self.nal_length_size)?;

        Ok(ProcessOutput {
            packet: packet.with_data(out_data),
            config_changed,
        })
    }

    /// 扫描 NAL 直到第一个 slice
    fn scan(&mut self, data: &[u8], framing: NalFraming) -> TaoResult<bool> {
        let mut config_changed = false;
        for nal in NalIter::new(data, framing) {
            if nal.len() < 2 {
                continue;
            }
            match self.state.scan_nal(nal)? {
                ScanStep::Continue { changed } => config_changed |= changed,
                ScanStep::SliceFound { changed } => {
                    config_changed |= changed;
                    break;
                }
            }
        }
        Ok(config_changed)
    }

    /// 编解码器
    pub fn codec(&self) -> HxxxCodec {
        self.codec
    }

    /// 是否已配置
    pub fn is_configured(&self) -> bool {
        self.pipeline.is_some()
    }

    /// 选定的管线, 配置前为 `None`
    pub fn pipeline(&self) -> Option<Pipeline> {
        self.pipeline
    }

    /// 消费方是否需要长度前缀分帧
    pub fn need_length_prefixed(&self) -> bool {
        self.need_length_prefixed
    }

    /// 源是否为长度前缀分帧
    pub fn is_length_prefixed_source(&self) -> bool {
        self.length_prefixed_source
    }

    /// NAL 长度前缀宽度 (字节)
    pub fn nal_length_size(&self) -> usize {
        self.nal_length_size
    }

    /// 当前 SPS id
    pub fn active_sps_id(&self) -> Option<u32> {
        match &self.state {
            CodecState::H264(state) => state.active_sps,
            CodecState::Hevc(state) => state.active_sps,
        }
    }

    /// 当前 PPS id (仅 H.264, 取最近一个 slice 引用且已缓存的 PPS)
    pub fn active_pps_id(&self) -> Option<u32> {
        match &self.state {
            CodecState::H264(state) => state.active_pps,
            CodecState::Hevc(_) => None,
        }
    }

    /// 当前 VPS id (仅 HEVC)
    pub fn active_vps_id(&self) -> Option<u32> {
        match &self.state {
            CodecState::H264(_) => None,
            CodecState::Hevc(state) => state.active_vps,
        }
    }

    /// 已缓存的 SPS 数量
    pub fn sps_count(&self) -> usize {
        match &self.state {
            CodecState::H264(state) => state.sps.len(),
            CodecState::Hevc(state) => state.sps.len(),
        }
    }

    /// 已缓存的 PPS 数量
    pub fn pps_count(&self) -> usize {
        match &self.state {
            CodecState::H264(state) => state.pps.len(),
            CodecState::Hevc(state) => state.pps.len(),
        }
    }

    /// 已缓存的 VPS 数量 (H.264 恒为 0)
    pub fn vps_count(&self) -> usize {
        match &self.state {
            CodecState::H264(_) => 0,
            CodecState::Hevc(state) => state.vps.len(),
        }
    }
}

/// 校验并解析 avcC, 将其中的 SPS/PPS 存入缓存, 返回长度前缀宽度
fn configure_avcc(state: &mut H264State, extra_data: &[u8]) -> TaoResult<usize> {
    if !h264::is_avcc(extra_data) {
        warn!("H.264: 带外配置不是 avcC, len={}", extra_data.len());
        return Err(TaoError::Unsupported(
            "H.264: 只支持 avcC 格式的带外配置".into(),
        ));
    }
    let config = h264::parse_avcc_config(extra_data)?;
    for nal in config.sps_list.iter().chain(&config.pps_list) {
        if nal.len() < 2 {
            continue;
        }
        state.scan_nal(nal)?;
    }
    Ok(config.length_size)
}

/// 校验并解析 hvcC, 将其中的 VPS/SPS/PPS 存入缓存, 返回长度前缀宽度
///
/// 消费方需要 Annex B 时同时渲染 Annex B 形式的配置.
fn configure_hvcc(
    state: &mut HevcState,
    extra_data: &[u8],
    need_length_prefixed: bool,
) -> TaoResult<usize> {
    if !h265::is_hvcc(extra_data) {
        warn!("HEVC: 带外配置不是 hvcC, len={}", extra_data.len());
        return Err(TaoError::Unsupported(
            "HEVC: 只支持 hvcC 格式的带外配置".into(),
        ));
    }
    let config = h265::parse_hvcc_config(extra_data)?;
    let parameter_sets = [HevcNalUnitType::Vps, HevcNalUnitType::Sps, HevcNalUnitType::Pps];
    for nal_type in parameter_sets {
        for nal in config.nals_of_type(nal_type) {
            if nal.len() < 2 {
                continue;
            }
            state.scan_nal(nal)?;
        }
    }

    if !need_length_prefixed {
        state.annexb_config = Some(Bytes::from(h265::hvcc_to_annex_b(extra_data)?));
    }
    Ok(config.length_size)
}
